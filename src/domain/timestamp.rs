//! Capture timestamps
//!
//! Readings are stamped with UTC wall-clock time when the clock has been
//! synchronized, and with the Unix epoch otherwise. Calendar conversion uses
//! Howard Hinnant's `civil_from_days` so no date crate is needed on the device.

use core::fmt::Write;
use heapless::String;

/// Length of `YYYY-MM-DDTHH:MM:SSZ`
pub const ISO8601_LEN: usize = 20;

/// Timestamp published when the clock has never been synchronized
pub const UNSYNCED_ISO8601: &str = "1970-01-01T00:00:00Z";

const SECS_PER_DAY: u64 = 86_400;

/// UTC capture time of a reading
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UtcTimestamp {
    unix_secs: Option<u64>,
}

impl UtcTimestamp {
    /// Timestamp for a clock that has not been synchronized
    pub const UNSYNCED: Self = Self { unix_secs: None };

    /// Create from seconds since the Unix epoch
    pub const fn from_unix(unix_secs: u64) -> Self {
        Self {
            unix_secs: Some(unix_secs),
        }
    }

    /// Create from an optional clock reading (`None` means unsynchronized)
    pub const fn from_clock(unix_secs: Option<u64>) -> Self {
        Self { unix_secs }
    }

    pub const fn is_synced(&self) -> bool {
        self.unix_secs.is_some()
    }

    pub const fn unix_secs(&self) -> Option<u64> {
        self.unix_secs
    }

    /// Format as `YYYY-MM-DDTHH:MM:SSZ`
    ///
    /// An unsynchronized timestamp formats as [`UNSYNCED_ISO8601`].
    pub fn to_iso8601(&self) -> String<ISO8601_LEN> {
        let mut out = String::new();
        let secs = self.unix_secs.unwrap_or(0);

        let days = secs / SECS_PER_DAY;
        let rem = secs % SECS_PER_DAY;
        let (year, month, day) = civil_from_days(days);

        // Years past 9999 do not fit the fixed-width format.
        if year > 9999 || write_iso8601(&mut out, year, month, day, rem).is_err() {
            out.clear();
            let _ = out.push_str(UNSYNCED_ISO8601);
        }
        out
    }
}

fn write_iso8601(
    out: &mut String<ISO8601_LEN>,
    year: u64,
    month: u8,
    day: u8,
    secs_of_day: u64,
) -> core::fmt::Result {
    write!(
        out,
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year,
        month,
        day,
        secs_of_day / 3600,
        (secs_of_day % 3600) / 60,
        secs_of_day % 60
    )
}

/// Convert days since 1970-01-01 into a (year, month, day) civil date
fn civil_from_days(days: u64) -> (u64, u8, u8) {
    // Shift the epoch to 0000-03-01 so leap days land at the end of the era year.
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}
