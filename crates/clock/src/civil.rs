//! Unix timestamps, UTC calendar time, and leap seconds.
//!
//! Calendar conversions work on the 400-year repetition cycle of the Gregorian calendar,
//! with the year rotated to start in March so the leap day falls at the end of the rotated
//! year. See <http://howardhinnant.github.io/date_algorithms.html> for the underlying
//! arithmetic.

use std::time::Duration;

/// Seconds per minute.
const SECS_PER_MINUTE: i64 = 60;
/// Seconds per day.
const SECS_PER_DAY: i64 = 86400;
/// Days in one 400-year era (97 of them are leap days).
const DAYS_PER_ERA: i64 = 146097;
/// Days from 0000-03-01 to 1970-01-01, the rotated-calendar offset of the Unix epoch.
const EPOCH_SHIFT: i64 = 719468;

/// All leap seconds currently set and approved by IERS.
///
/// Each entry holds the timestamp at which a leap second takes effect and the cumulative
/// TAI-UTC offset from that timestamp on. The inserted second itself occupies the last
/// instant of the *previous* UTC month.
const LEAP_SECONDS: [(i64, u8); 28] = [
	(63072000,   10), (78796800,   11), (94694400,   12), (126230400,  13),
	(157766400,  14), (189302400,  15), (220924800,  16), (252460800,  17),
	(283996800,  18), (315532800,  19), (362793600,  20), (394329600,  21),
	(425865600,  22), (489024000,  23), (567993600,  24), (631152000,  25),
	(662688000,  26), (709948800,  27), (741484800,  28), (773020800,  29),
	(820454400,  30), (867715200,  31), (915148800,  32), (1136073600, 33),
	(1230768000, 34), (1341100800, 35), (1435708800, 36), (1483228800, 37),
];

/// Get the first scheduled leap second on or after `time`.
///
/// Returns the leap second timestamp and the cumulative offset it introduces, or `None`
/// when no leap second is scheduled after `time` (currently anything past 2017-01-01).
///
/// # Examples
///
/// ```
/// # use clock::next_leap_second;
/// assert_eq!(next_leap_second(525323527), Some((567993600, 24)));
/// assert_eq!(next_leap_second(1483228801), None);
/// ```
pub fn next_leap_second(time: i64) -> Option<(i64, u8)> {
	let mut next = None;
	for entry in LEAP_SECONDS.iter().rev() {
		if entry.0 < time {
			break;
		}
		next = Some(*entry);
	}
	next
}

/// Unix time with nanosecond granularity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeSpec {
	/// Seconds since the Unix epoch
	pub sec: i64,
	/// Nanoseconds since the beginning of `sec`, ranged [0, 999999999]
	pub nsec: i64,
}

impl TimeSpec {
	/// Truncate to the start of the containing minute.
	///
	/// # Examples
	///
	/// ```
	/// # use clock::TimeSpec;
	/// let t = TimeSpec { sec: 125, nsec: 500000000 };
	/// assert_eq!(t.minute_start(), TimeSpec { sec: 120, nsec: 0 });
	/// ```
	pub fn minute_start(self) -> TimeSpec {
		TimeSpec {
			sec: self.sec - self.sec.rem_euclid(SECS_PER_MINUTE),
			nsec: 0,
		}
	}

	/// Time remaining until the top of the next minute.
	///
	/// A timestamp exactly on a minute boundary yields a full minute.
	///
	/// # Examples
	///
	/// ```
	/// # use clock::TimeSpec;
	/// # use std::time::Duration;
	/// let t = TimeSpec { sec: 125, nsec: 500000000 };
	/// assert_eq!(t.until_next_minute(), Duration::from_millis(34500));
	/// ```
	pub fn until_next_minute(self) -> Duration {
		let into = self.sec.rem_euclid(SECS_PER_MINUTE) * 1_000_000_000 + self.nsec;
		Duration::from_nanos((60_000_000_000 - into) as u64)
	}
}

/// Get the current time as a Unix timestamp with nanosecond granularity.
///
/// Returns `None` if `libc::clock_gettime` fails.
pub fn now() -> Option<TimeSpec> {
	let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
	// Safety: clock_gettime only writes to ts, and a zero return means it succeeded.
	match unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut ts) } {
		0 => Some(TimeSpec {
			sec: ts.tv_sec,
			nsec: ts.tv_nsec,
		}),
		_ => None,
	}
}

/// Check whether `year` is a Gregorian leap year.
#[inline]
pub fn is_leap_year(year: u16) -> bool {
	year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// The number of days in a month.
///
/// `year` is the absolute Gregorian year and `mon` the 1-indexed month.
///
/// # Examples
///
/// ```
/// # use clock::days_in_month;
/// assert_eq!(days_in_month(2024, 2), 29);
/// assert_eq!(days_in_month(2023, 2), 28);
/// assert_eq!(days_in_month(2023, 9), 30);
/// ```
pub fn days_in_month(year: u16, mon: u8) -> u8 {
	match mon {
		2 => {
			if is_leap_year(year) {
				29
			} else {
				28
			}
		}
		4 | 6 | 9 | 11 => 30,
		_ => 31,
	}
}

/// Days since the Unix epoch for a given calendar date.
///
/// `year` is the absolute Gregorian year, `mon` the 1-indexed month, `day` the day of the
/// month. Dates before the epoch yield negative values.
pub fn days_from_civil(year: u16, mon: u8, day: u8) -> i64 {
	// Rotate so the year runs Mar-Feb; January and February then belong to the prior year.
	let y = if mon <= 2 { year as i64 - 1 } else { year as i64 };
	let era = y.div_euclid(400);
	let yoe = y - era * 400;
	let mp = if mon > 2 { mon as i64 - 3 } else { mon as i64 + 9 };
	// Linear equation for the number of days before rotated month mp
	let doy = (153 * mp + 2) / 5 + day as i64 - 1;
	let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
	era * DAYS_PER_ERA + doe - EPOCH_SHIFT
}

/// Unix timestamp of 00:00:00 UTC on a given calendar date.
///
/// # Examples
///
/// ```
/// # use clock::timestamp_from_ymd;
/// assert_eq!(timestamp_from_ymd(2024, 2, 28), 1709078400);
/// assert_eq!(timestamp_from_ymd(2024, 2, 29), 1709164800);
/// assert_eq!(timestamp_from_ymd(2024, 3, 1), 1709251200);
/// ```
pub fn timestamp_from_ymd(year: u16, mon: u8, day: u8) -> i64 {
	days_from_civil(year, mon, day) * SECS_PER_DAY
}

/// Weekday (0-6 => Sunday-Saturday) for a given calendar date.
///
/// # Examples
///
/// ```
/// # use clock::weekday_from_ymd;
/// assert_eq!(weekday_from_ymd(2024, 1, 1), 1);   // Monday
/// assert_eq!(weekday_from_ymd(2024, 10, 27), 0); // Sunday
/// ```
pub fn weekday_from_ymd(year: u16, mon: u8, day: u8) -> u8 {
	// Jan 1, 1970 was a Thursday
	(days_from_civil(year, mon, day) + 4).rem_euclid(7) as u8
}

/// The absolute Gregorian year containing a Unix timestamp.
///
/// Unlike [`UtcTime::from_unix`] this also accepts pre-epoch timestamps, which matters for
/// evaluating timezone rules against arbitrary transition times.
///
/// # Examples
///
/// ```
/// # use clock::year_from_timestamp;
/// assert_eq!(year_from_timestamp(0), 1970);
/// assert_eq!(year_from_timestamp(1704067199), 2023);
/// assert_eq!(year_from_timestamp(1704067200), 2024);
/// assert_eq!(year_from_timestamp(-1), 1969);
/// ```
pub fn year_from_timestamp(time: i64) -> u16 {
	let z = time.div_euclid(SECS_PER_DAY) + EPOCH_SHIFT;
	let era = z.div_euclid(DAYS_PER_ERA);
	let doe = z.rem_euclid(DAYS_PER_ERA);
	let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
	let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
	let y = yoe + era * 400;
	// The rotated year runs Mar-Dec-Feb; days past December belong to the next calendar year
	if doy >= 306 {
		(y + 1) as u16
	} else {
		y as u16
	}
}

/// UTC calendar time.
///
/// Unlike `libc::tm`, the month is 1-indexed, the day of year starts at 1, and the year is
/// the absolute Gregorian year rather than an offset from 1900.
///
/// # Examples
///
/// ```
/// # use clock::UtcTime;
/// let date = UtcTime::from_unix(1718617807).unwrap();
/// assert_eq!(date, UtcTime {
/// 	sec: 7,
/// 	min: 50,
/// 	hour: 9,
/// 	day: 17,
/// 	mon: 6,
/// 	year: 2024,
/// 	yday: 169
/// });
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UtcTime {
	/// Seconds, ranged [0, 59]
	pub sec: u8,
	/// Minutes, ranged [0, 59]
	pub min: u8,
	/// Hours, ranged [0, 23]
	pub hour: u8,
	/// Day of the month, ranged [1, 31]
	pub day: u8,
	/// Month of the year, ranged [1, 12]
	pub mon: u8,
	/// Absolute Gregorian year
	pub year: u16,
	/// Day of the year, ranged [1, 366]
	pub yday: u16,
}

impl UtcTime {
	/// Convert a Unix timestamp into UTC calendar time.
	///
	/// Only timestamps on or after the Unix epoch are supported; negative inputs yield
	/// `None`.
	pub fn from_unix(timestamp: i64) -> Option<UtcTime> {
		if timestamp < 0 {
			return None;
		}
		let days = timestamp / SECS_PER_DAY;
		let secs = timestamp % SECS_PER_DAY;

		let z = days + EPOCH_SHIFT;
		let era = z / DAYS_PER_ERA;
		let doe = z % DAYS_PER_ERA;
		let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
		let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
		let mp = (5 * doy + 2) / 153;
		let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
		// Un-rotate from the Mar-Feb year back to Jan-Dec
		let mon = if mp < 10 { mp + 3 } else { mp - 9 } as u8;
		let year = (yoe + era * 400 + (mon <= 2) as i64) as u16;

		Some(UtcTime {
			sec: (secs % 60) as u8,
			min: (secs / 60 % 60) as u8,
			hour: (secs / 3600) as u8,
			day,
			mon,
			year,
			yday: (days - days_from_civil(year, 1, 1) + 1) as u16,
		})
	}

	/// Check whether this date falls in a leap year.
	#[inline]
	pub fn is_leap_year(&self) -> bool {
		is_leap_year(self.year)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn from_unix_test() {
		assert!(UtcTime::from_unix(-1).is_none());

		assert_eq!(
			UtcTime::from_unix(0),
			Some(UtcTime { sec: 0, min: 0, hour: 0, day: 1, mon: 1, year: 1970, yday: 1 })
		);

		// Mon, Jun 17, 2024. 09:50:07 UTC.
		assert_eq!(
			UtcTime::from_unix(1718617807),
			Some(UtcTime { sec: 7, min: 50, hour: 9, day: 17, mon: 6, year: 2024, yday: 169 })
		);

		// Leap day, Thu, Feb 29, 2024.
		assert_eq!(
			UtcTime::from_unix(1709164800),
			Some(UtcTime { sec: 0, min: 0, hour: 0, day: 29, mon: 2, year: 2024, yday: 60 })
		);

		// Sun, Jan 1, 2017. The most recent leap second landed just before this instant.
		assert_eq!(
			UtcTime::from_unix(1483228800),
			Some(UtcTime { sec: 0, min: 0, hour: 0, day: 1, mon: 1, year: 2017, yday: 1 })
		);

		// Tue, Aug 15, 2017. 10:04:00 UTC. Day 227 of the year.
		assert_eq!(
			UtcTime::from_unix(1502791440),
			Some(UtcTime { sec: 0, min: 4, hour: 10, day: 15, mon: 8, year: 2017, yday: 227 })
		);

		// Dec 31 wraps the year correctly in leap and non-leap years
		assert_eq!(
			UtcTime::from_unix(1735689599),
			Some(UtcTime { sec: 59, min: 59, hour: 23, day: 31, mon: 12, year: 2024, yday: 366 })
		);

		// Extreme input must not panic
		UtcTime::from_unix(i64::MAX / 2);
	}

	#[test]
	fn timestamp_from_ymd_test() {
		assert_eq!(timestamp_from_ymd(1970, 1, 1), 0);
		assert_eq!(timestamp_from_ymd(2024, 1, 1), 1704067200);
		assert_eq!(timestamp_from_ymd(2024, 2, 28), 1709078400);
		assert_eq!(timestamp_from_ymd(2024, 2, 29), 1709164800);
		assert_eq!(timestamp_from_ymd(2024, 3, 1), 1709251200);
		assert_eq!(timestamp_from_ymd(2017, 8, 15), 1502755200);
		// Pre-epoch dates are negative
		assert_eq!(timestamp_from_ymd(1969, 12, 31), -SECS_PER_DAY);
	}

	#[test]
	fn round_trip_test() {
		// from_unix and days_from_civil must agree across month and year boundaries
		for &ts in &[0, 86399, 86400, 1483228800, 1502791440, 1709164800, 1735689599, 4102444800] {
			let utc = UtcTime::from_unix(ts).unwrap();
			let back = timestamp_from_ymd(utc.year, utc.mon, utc.day)
				+ utc.hour as i64 * 3600
				+ utc.min as i64 * 60
				+ utc.sec as i64;
			assert_eq!(back, ts, "round trip failed for {}", ts);
		}
	}

	#[test]
	fn weekday_test() {
		assert_eq!(weekday_from_ymd(1970, 1, 1), 4); // Thursday
		assert_eq!(weekday_from_ymd(2024, 1, 1), 1); // Monday
		assert_eq!(weekday_from_ymd(2024, 2, 29), 4); // Thursday
		assert_eq!(weekday_from_ymd(2024, 3, 1), 5); // Friday
		assert_eq!(weekday_from_ymd(2024, 10, 27), 0); // Sunday
	}

	#[test]
	fn leap_year_test() {
		assert!(!is_leap_year(1900));
		assert!(is_leap_year(2000));
		assert!(is_leap_year(2024));
		assert!(!is_leap_year(2023));
	}

	#[test]
	fn days_in_month_test() {
		let lengths = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
		for (i, &len) in lengths.iter().enumerate() {
			assert_eq!(days_in_month(2024, i as u8 + 1), len);
		}
		assert_eq!(days_in_month(2023, 2), 28);
	}

	#[test]
	fn next_leap_second_test() {
		assert_eq!(next_leap_second(0), Some((63072000, 10)));
		assert_eq!(next_leap_second(525323527), Some((567993600, 24)));
		// A leap second timestamp is its own next leap second
		assert_eq!(next_leap_second(1483228800), Some((1483228800, 37)));
		assert_eq!(next_leap_second(1483228801), None);
	}

	#[test]
	fn minute_math_test() {
		let t = TimeSpec { sec: 125, nsec: 500000000 };
		assert_eq!(t.minute_start(), TimeSpec { sec: 120, nsec: 0 });
		assert_eq!(t.until_next_minute(), Duration::from_millis(34500));

		let boundary = TimeSpec { sec: 120, nsec: 0 };
		assert_eq!(boundary.minute_start(), boundary);
		assert_eq!(boundary.until_next_minute(), Duration::from_secs(60));
	}

	#[test]
	fn now_test() {
		let t = now().expect("failed to read the system clock");
		assert!(t.sec > 0);
		assert!(t.nsec < 1000000000);
	}
}
