//! Debug assertion macros for ring buffer invariants.
//!
//! Only active in debug builds (`debug_assert!`), zero overhead in release.

/// Assert that a sequence number only increases.
///
/// Used for the write cursor in `Ring::write` and the read cursor in
/// `Reader` after every advance.
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "{} decreased from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

/// Assert that a reader cursor never passes the write cursor.
macro_rules! debug_assert_cursor_not_past_tail {
    ($cursor:expr, $tail:expr) => {
        debug_assert!(
            $cursor <= $tail,
            "read cursor {} beyond write cursor {}",
            $cursor,
            $tail
        )
    };
}

/// Assert that a reader's lag is within capacity after resynchronization.
macro_rules! debug_assert_lag_bounded {
    ($lag:expr, $capacity:expr) => {
        debug_assert!(
            $lag <= $capacity,
            "reader lag {} exceeds capacity {} after resync",
            $lag,
            $capacity
        )
    };
}

pub(crate) use debug_assert_cursor_not_past_tail;
pub(crate) use debug_assert_lag_bounded;
pub(crate) use debug_assert_monotonic;
