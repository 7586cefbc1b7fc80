//! Clock port - uptime and wall-clock time

/// Port for time sources
///
/// `uptime_ms` is a free-running 32-bit millisecond counter that wraps after
/// ~49.7 days; compare readings with [`elapsed_ms`], never directly.
pub trait Clock {
    /// Milliseconds since boot, wrapping
    fn uptime_ms(&self) -> u32;

    /// Seconds since the Unix epoch, `None` until synchronized
    fn unix_time(&self) -> Option<u64>;
}

/// Milliseconds from `since` to `now`, correct across counter wraparound
#[inline]
pub const fn elapsed_ms(since: u32, now: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Whether at least `period_ms` has passed between `since` and `now`
#[inline]
pub const fn period_elapsed(since: u32, now: u32, period_ms: u32) -> bool {
    elapsed_ms(since, now) >= period_ms
}
