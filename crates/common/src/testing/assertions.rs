//! Custom assertions for timing-sensitive tests

use std::time::Duration;

/// Assert that a duration is within `tolerance` of `expected`
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use steadfast_common::testing::assertions::assert_duration_in_range;
///
/// let actual = Duration::from_millis(105);
/// assert_duration_in_range(actual, Duration::from_millis(100), Duration::from_millis(10));
/// ```
pub fn assert_duration_in_range(actual: Duration, expected: Duration, tolerance: Duration) {
    assert_duration_between(actual, expected.saturating_sub(tolerance), expected + tolerance);
}

/// Assert that `min <= actual <= max`
pub fn assert_duration_between(actual: Duration, min: Duration, max: Duration) {
    assert!(
        actual >= min && actual <= max,
        "Duration {:?} not in range [{:?}, {:?}]",
        actual,
        min,
        max
    );
}
