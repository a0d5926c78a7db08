//! Simulation time.
//!
//! The engine runs on a discrete time axis. A time point is an integer,
//! typically a calendar year or a period index; the engine itself only
//! requires ordering.

use crate::error::ConfigError;

/// A discrete point on the simulation time axis.
pub type TimePoint = i32;

/// Builds the inclusive periodic time axis `initial, initial + step, .., last`.
///
/// The last point is included when it falls on the step grid, matching how
/// multi-year treatment schedules are declared (initial year, final year,
/// period length).
///
/// # Errors
///
/// Returns `ConfigError::InvalidTimeAxis` when `step` is not positive or
/// `last` precedes `initial`.
///
/// # Examples
///
/// ```
/// use silvasim::time::periodic_axis;
///
/// let points = periodic_axis(2025, 2040, 5).unwrap();
/// assert_eq!(points, vec![2025, 2030, 2035, 2040]);
/// ```
pub fn periodic_axis(
    initial: TimePoint,
    last: TimePoint,
    step: i32,
) -> Result<Vec<TimePoint>, ConfigError> {
    if step <= 0 || last < initial {
        return Err(ConfigError::InvalidTimeAxis {
            initial,
            last,
            step,
        });
    }
    Ok((initial..=last).step_by(step as usize).collect())
}
