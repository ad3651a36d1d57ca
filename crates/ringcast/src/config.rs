/// Configuration for a broadcast ring.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Ring capacity as a power of 2 (default: 10 = 1024 slots)
    pub ring_bits: u8,
    /// Enable ring-level metrics collection (slight overhead)
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a new configuration with custom settings.
    pub const fn new(ring_bits: u8, enable_metrics: bool) -> Self {
        Self {
            ring_bits,
            enable_metrics,
        }
    }

    /// Returns the capacity of the ring buffer.
    #[inline]
    pub const fn capacity(&self) -> usize {
        1 << self.ring_bits
    }

    /// Returns the mask for index wrapping.
    #[inline]
    pub const fn mask(&self) -> usize {
        self.capacity() - 1
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ring_bits: 10, // 1024 slots
            enable_metrics: false,
        }
    }
}

/// Low-rate streams (64 slots): property channels, control-plane data.
pub const LOW_RATE_CONFIG: Config = Config::new(6, false);

/// High-rate streams (4K slots): raw device samples at kHz rates.
pub const HIGH_RATE_CONFIG: Config = Config::new(12, false);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_and_mask() {
        let config = Config::new(4, false);
        assert_eq!(config.capacity(), 16);
        assert_eq!(config.mask(), 15);
    }

    #[test]
    fn test_presets() {
        assert_eq!(LOW_RATE_CONFIG.capacity(), 64);
        assert_eq!(HIGH_RATE_CONFIG.capacity(), 4096);
    }
}
