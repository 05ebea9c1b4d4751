/// This library uses a simple discrete time model.
pub type Time = u64;

/// Syntactic sugar to give a hint that a time value indicates a
/// point in time or some offset.
pub type Instant = Time;

/// Syntactic sugar to give a hint that a time value denotes an
/// interval length.
pub type Duration = Time;

/// Syntactic sugar to give a hint that a time value represents some
/// amount of processor service.
pub type Service = Time;

/// Syntactic sugar for relative deadlines, measured from the
/// activation of a job.
pub type Deadline = Duration;

/// Integer division rounding up.
pub(crate) fn divide_with_ceil(a: Time, b: Time) -> u64 {
    a / b + (a % b > 0) as u64
}
