//! Support for POSIX TZ strings such as `EST5EDT,M3.2.0,M11.1.0`.
//!
//! A TZ string names standard time with its UTC offset and, optionally, daylight savings
//! time with its offset and the pair of rules describing when the zone switches. This
//! module parses such strings into [`TzSpec`] values that can answer "is DST in effect at
//! this instant" for any timestamp.
//!
//! Special timezone names enclosed in `<...>` are not supported.
//!
//! # Examples
//!
//! ```
//! # use clock::tz::{parse_tzstring, TzInfo};
//! let timezone = parse_tzstring(b"EST5EDT,M3.2.0,M11.1.0").unwrap();
//! assert_eq!(timezone.info(1710053999), TzInfo { utoff: -18000, isdst: false });
//! assert_eq!(timezone.info(1710054000), TzInfo { utoff: -14400, isdst: true });
//! ```

use super::{Timezone, TzInfo};
use crate::civil::{days_from_civil, days_in_month, is_leap_year, weekday_from_ymd, year_from_timestamp};
use std::{error, fmt};

/// The error type for parsing TZ strings.
#[derive(Debug, PartialEq)]
pub enum TzStringError {
	/// The TZ string was empty.
	Empty,
	/// The TZ string was malformed or uses an unsupported feature.
	Invalid,
	/// A transition date component was out of range.
	DateOutOfRange,
	/// A time or UTC offset component was out of range.
	TimeOutOfRange,
	/// DST was named but one or both transition rules were missing.
	MissingRule,
	/// Valid input was followed by unexpected trailing bytes.
	TrailingInput,
}

impl fmt::Display for TzStringError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TzStringError::Empty => write!(f, "Empty TZ string"),
			TzStringError::Invalid => write!(f, "Invalid or unsupported TZ string"),
			TzStringError::DateOutOfRange => write!(f, "Date component out of range"),
			TzStringError::TimeOutOfRange => write!(f, "Time component out of range"),
			TzStringError::MissingRule => write!(f, "Missing DST transition rule"),
			TzStringError::TrailingInput => write!(f, "Unexpected input at end of TZ string"),
		}
	}
}

impl error::Error for TzStringError {}

/// Read a run of decimal digits, returning the value and the number of bytes consumed.
fn scan_num(bytes: &[u8]) -> (u32, usize) {
	let mut r: u32 = 0;
	let mut i = 0;
	while let Some(v @ b'0'..=b'9') = bytes.get(i) {
		r = r.saturating_mul(10).saturating_add((v - b'0') as u32);
		i += 1;
	}
	(r, i)
}

/// A TZ string transition date.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TzDate {
	/// `Jn`: Julian day 1-365, never counting the leap day. Day 60 is always March 1.
	Julian(u16),
	/// `n`: zero-based day 0-365, counting the leap day in leap years.
	Day(u16),
	/// `Mm.w.d`: day of week `d` (0-6 => Sunday-Saturday) of occurrence `w` (1-5, 5 meaning
	/// "last") in month `m` (1-12).
	MonthWeekDay(u8, u8, u8),
}

impl TzDate {
	/// Parse a transition date, returning it and the number of bytes consumed.
	fn parse(bytes: &[u8]) -> Result<(TzDate, usize), TzStringError> {
		match bytes.first() {
			Some(b'J') => {
				let (n, used) = scan_num(&bytes[1..]);
				if used == 0 {
					Err(TzStringError::Invalid)
				} else if n == 0 || n > 365 {
					Err(TzStringError::DateOutOfRange)
				} else {
					Ok((TzDate::Julian(n as u16), used + 1))
				}
			}
			Some(b'0'..=b'9') => {
				let (n, used) = scan_num(bytes);
				if n > 365 {
					Err(TzStringError::DateOutOfRange)
				} else {
					Ok((TzDate::Day(n as u16), used))
				}
			}
			Some(b'M') => {
				let mut parts = [0u32; 3];
				let mut total = 1;
				for (i, part) in parts.iter_mut().enumerate() {
					if i > 0 {
						if bytes.get(total) != Some(&b'.') {
							return Err(TzStringError::Invalid);
						}
						total += 1;
					}
					let (n, used) = scan_num(&bytes[total..]);
					if used == 0 {
						return Err(TzStringError::Invalid);
					}
					*part = n;
					total += used;
				}
				let [m, w, d] = parts;
				if !(1..=12).contains(&m) || !(1..=5).contains(&w) || d > 6 {
					Err(TzStringError::DateOutOfRange)
				} else {
					Ok((TzDate::MonthWeekDay(m as u8, w as u8, d as u8), total))
				}
			}
			_ => Err(TzStringError::MissingRule),
		}
	}

	/// Midnight (local time, expressed as a UTC-based timestamp) of this date in `year`.
	///
	/// # Examples
	///
	/// ```
	/// # use clock::tz::TzDate;
	/// assert_eq!(TzDate::Julian(59).timestamp(2024), 1709078400);        // Feb 28
	/// assert_eq!(TzDate::Julian(60).timestamp(2024), 1709251200);        // Mar 1
	/// assert_eq!(TzDate::Day(59).timestamp(2024), 1709164800);           // Feb 29
	/// assert_eq!(TzDate::MonthWeekDay(2, 5, 4).timestamp(2024), 1709164800); // last Thu of Feb
	/// ```
	pub fn timestamp(&self, year: u16) -> i64 {
		let days = match *self {
			TzDate::Julian(n) => {
				// Zero-based day in a 365-day year; re-insert the leap day when needed
				let mut doy = n as i64 - 1;
				if doy >= 59 && is_leap_year(year) {
					doy += 1;
				}
				days_from_civil(year, 1, 1) + doy
			}
			TzDate::Day(n) => days_from_civil(year, 1, 1) + n as i64,
			TzDate::MonthWeekDay(m, w, d) => {
				// Day of week the month starts on, then the target weekday relative to it
				let first = weekday_from_ymd(year, m, 1);
				let offset = if d < first { 7 + d - first } else { d - first };
				let day = if w < 5 {
					7 * (w - 1) + offset + 1
				} else {
					// "Last" occurrence: the 5th if the month is long enough, else the 4th
					let day = 29 + offset;
					if day > days_in_month(year, m) {
						day - 7
					} else {
						day
					}
				};
				days_from_civil(year, m, day)
			}
		};
		days * 86400
	}
}

/// One endpoint of a DST period: a transition date plus the local time of the switch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TzTransition {
	/// Transition date rule
	pub date: TzDate,
	/// Local time of day of the switch, in seconds (may be negative or beyond 24h)
	pub time: i32,
}

/// Daylight savings configuration of a TZ string.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DstSpec {
	/// UTC offset while DST is in effect, in seconds
	pub utoff: i32,
	/// Switch to DST
	pub start: TzTransition,
	/// Switch back to standard time
	pub end: TzTransition,
}

/// A parsed TZ string: the standard UTC offset and optional DST configuration.
///
/// Offsets are stored ready to *add* to UTC, the opposite sign convention of the TZ string
/// itself (`EST5` means UTC-5, stored as `-18000`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TzSpec {
	/// UTC offset for standard time, in seconds
	pub utoff: i32,
	/// Optional daylight savings configuration
	pub dst: Option<DstSpec>,
}

/// Default local switch time when a rule omits one: 02:00:00.
const DEFAULT_SWITCH_TIME: i32 = 7200;

impl TzSpec {
	/// Parse a TZ spec from a TZ string.
	///
	/// # Errors
	///
	/// Returns a [`TzStringError`] when the input is empty, malformed, out of range, uses
	/// an unsupported feature (such as `<...>` names), or has trailing bytes.
	///
	/// # Examples
	///
	/// ```
	/// # use clock::tz::{TzSpec, TzDate, TzTransition, DstSpec, TzStringError};
	/// assert_eq!(TzSpec::parse(b"EST5"), Ok(TzSpec { utoff: -18000, dst: None }));
	/// assert_eq!(TzSpec::parse(b"EST5EDT,M3.2.0,M11.1.0"), Ok(TzSpec {
	/// 	utoff: -18000,
	/// 	dst: Some(DstSpec {
	/// 		utoff: -14400,
	/// 		start: TzTransition { date: TzDate::MonthWeekDay(3, 2, 0), time: 7200 },
	/// 		end: TzTransition { date: TzDate::MonthWeekDay(11, 1, 0), time: 7200 },
	/// 	})
	/// }));
	/// assert_eq!(TzSpec::parse(b""), Err(TzStringError::Empty));
	/// ```
	pub fn parse(bytes: &[u8]) -> Result<TzSpec, TzStringError> {
		if bytes.is_empty() {
			return Err(TzStringError::Empty);
		}

		// Standard time name and offset
		let used = match_name(bytes);
		if used == 0 {
			return Err(TzStringError::Invalid);
		}
		let bytes = &bytes[used..];
		let (std_west, used) = parse_time(bytes, false)?;
		let mut bytes = &bytes[used..];

		// Optional DST name
		let used = match_name(bytes);
		let dst = if used == 0 {
			None
		} else {
			bytes = &bytes[used..];

			// Optional DST offset; the default advances standard time by one hour. Offsets
			// here still follow the TZ string's west-positive convention.
			let dst_west = match parse_time(bytes, false) {
				Ok((t, used)) => {
					bytes = &bytes[used..];
					t
				}
				Err(_) => std_west - 3600,
			};

			// Both transition rules are required once DST is named
			let mut rule = || -> Result<TzTransition, TzStringError> {
				if bytes.first() != Some(&b',') {
					return Err(TzStringError::MissingRule);
				}
				let (date, used) = TzDate::parse(&bytes[1..])?;
				bytes = &bytes[1 + used..];
				let time = if bytes.first() == Some(&b'/') {
					let (t, used) = parse_time(&bytes[1..], true)?;
					bytes = &bytes[1 + used..];
					t
				} else {
					DEFAULT_SWITCH_TIME
				};
				Ok(TzTransition { date, time })
			};
			let start = rule()?;
			let end = rule()?;

			Some(DstSpec {
				utoff: -dst_west,
				start,
				end,
			})
		};

		if bytes.is_empty() {
			Ok(TzSpec {
				utoff: -std_west,
				dst,
			})
		} else {
			Err(TzStringError::TrailingInput)
		}
	}

	/// Get timezone info for a given moment in time.
	///
	/// # Examples
	///
	/// ```
	/// # use clock::tz::{TzSpec, TzInfo};
	/// let spec = TzSpec::parse(b"EST5EDT,M3.2.0,M11.1.0").unwrap();
	/// assert_eq!(spec.info(1710053999), TzInfo { utoff: -18000, isdst: false });
	/// assert_eq!(spec.info(1710054000), TzInfo { utoff: -14400, isdst: true });
	/// assert_eq!(spec.info(1730613599), TzInfo { utoff: -14400, isdst: true });
	/// assert_eq!(spec.info(1730613600), TzInfo { utoff: -18000, isdst: false });
	/// ```
	pub fn info(&self, time: i64) -> TzInfo {
		let Some(dst) = self.dst else {
			return TzInfo {
				utoff: self.utoff,
				isdst: false,
			};
		};

		// Transition instants for the year containing `time`. The switch into DST happens
		// at local standard time and the switch out at local DST time, so each converts to
		// UTC with its own offset.
		let year = year_from_timestamp(time);
		let start = dst.start.date.timestamp(year) + dst.start.time as i64 - self.utoff as i64;
		let end = dst.end.date.timestamp(year) + dst.end.time as i64 - dst.utoff as i64;

		// When the end precedes the start within a calendar year, DST spans the new year
		// (southern hemisphere) and the test inverts.
		let isdst = if start <= end {
			start <= time && time < end
		} else {
			time < end || start <= time
		};

		TzInfo {
			utoff: if isdst { dst.utoff } else { self.utoff },
			isdst,
		}
	}
}

/// Length of a leading timezone name: anything up to a digit, sign, colon, or comma.
fn match_name(bytes: &[u8]) -> usize {
	bytes
		.iter()
		.position(|b| matches!(b, b'0'..=b'9' | b':' | b',' | b'-' | b'+' | b'\n' | b'<'))
		.unwrap_or(bytes.len())
}

/// Parse a signed `h[:mm[:ss]]` time, returning seconds and the number of bytes consumed.
///
/// Hours are limited to 24 for UTC offsets and 167 for transition times (`extended`).
fn parse_time(bytes: &[u8], extended: bool) -> Result<(i32, usize), TzStringError> {
	let (sign, mut used) = match bytes.first() {
		Some(b'-') => (-1, 1),
		Some(b'+') => (1, 1),
		_ => (1, 0),
	};

	let (hours, n) = scan_num(&bytes[used..]);
	if n == 0 {
		return Err(TzStringError::Invalid);
	}
	if hours > if extended { 167 } else { 24 } {
		return Err(TzStringError::TimeOutOfRange);
	}
	used += n;
	let mut seconds = hours as i32 * 3600;

	// Optional minutes and seconds
	for unit in [60, 1] {
		if bytes.get(used) != Some(&b':') {
			break;
		}
		let (v, n) = scan_num(&bytes[used + 1..]);
		if n == 0 {
			return Err(TzStringError::Invalid);
		}
		if v > 59 {
			return Err(TzStringError::TimeOutOfRange);
		}
		used += n + 1;
		seconds += v as i32 * unit;
	}

	Ok((sign * seconds, used))
}

/// Parse a TZ string into a [`Timezone`] with no precomputed transitions.
///
/// # Examples
///
/// ```
/// # use clock::tz::{parse_tzstring, TzInfo};
/// let timezone = parse_tzstring(b"EST5EDT,M3.2.0,M11.1.0").unwrap();
/// assert_eq!(timezone.info(1710054000), TzInfo { utoff: -14400, isdst: true });
/// ```
pub fn parse_tzstring(tzstring: &[u8]) -> Result<Timezone, TzStringError> {
	Ok(Timezone::new(Vec::new(), Some(TzSpec::parse(tzstring)?)))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_time_test() {
		assert_eq!(parse_time(b"5", false), Ok((18000, 1)));
		assert_eq!(parse_time(b"-5", false), Ok((-18000, 2)));
		assert_eq!(parse_time(b"+5", false), Ok((18000, 2)));
		assert_eq!(parse_time(b"05:23:17", false), Ok((19397, 8)));
		assert_eq!(parse_time(b"30", true), Ok((108000, 2)));
		assert_eq!(parse_time(b"-30", true), Ok((-108000, 3)));
		assert_eq!(parse_time(b"5EDT", false), Ok((18000, 1)));
		assert_eq!(parse_time(b"", false), Err(TzStringError::Invalid));
		assert_eq!(parse_time(b"5:", false), Err(TzStringError::Invalid));
		assert_eq!(parse_time(b"25", false), Err(TzStringError::TimeOutOfRange));
		assert_eq!(parse_time(b"200", true), Err(TzStringError::TimeOutOfRange));
		assert_eq!(parse_time(b"5:70", false), Err(TzStringError::TimeOutOfRange));
	}

	#[test]
	fn tz_date_parse_test() {
		assert_eq!(TzDate::parse(b"57"), Ok((TzDate::Day(57), 2)));
		assert_eq!(TzDate::parse(b"578"), Err(TzStringError::DateOutOfRange));
		assert_eq!(TzDate::parse(b"J57"), Ok((TzDate::Julian(57), 3)));
		assert_eq!(TzDate::parse(b"J0"), Err(TzStringError::DateOutOfRange));
		assert_eq!(TzDate::parse(b"J366"), Err(TzStringError::DateOutOfRange));
		assert_eq!(TzDate::parse(b"M12.5.6"), Ok((TzDate::MonthWeekDay(12, 5, 6), 7)));
		assert_eq!(TzDate::parse(b"M12.5.6/2"), Ok((TzDate::MonthWeekDay(12, 5, 6), 7)));
		assert_eq!(TzDate::parse(b"M12.5."), Err(TzStringError::Invalid));
		assert_eq!(TzDate::parse(b"M13.5.6"), Err(TzStringError::DateOutOfRange));
		assert_eq!(TzDate::parse(b"M3.2.7"), Err(TzStringError::DateOutOfRange));
		assert_eq!(TzDate::parse(b""), Err(TzStringError::MissingRule));
	}

	#[test]
	fn tz_date_timestamp_test() {
		// Julian days never count Feb 29
		assert_eq!(TzDate::Julian(59).timestamp(2024), 1709078400); // Feb 28, 2024
		assert_eq!(TzDate::Julian(60).timestamp(2024), 1709251200); // Mar 1, 2024
		assert_eq!(TzDate::Julian(60).timestamp(2023), 1677628800); // Mar 1, 2023
		// Plain days do
		assert_eq!(TzDate::Day(59).timestamp(2024), 1709164800); // Feb 29, 2024
		assert_eq!(TzDate::Day(59).timestamp(2023), 1677628800); // Mar 1, 2023
		// Month/week/day rules
		assert_eq!(TzDate::MonthWeekDay(3, 2, 0).timestamp(2024), 1710028800); // Mar 10, 2024
		assert_eq!(TzDate::MonthWeekDay(11, 1, 0).timestamp(2024), 1730592000); // Nov 3, 2024
		assert_eq!(TzDate::MonthWeekDay(2, 5, 4).timestamp(2024), 1709164800); // Feb 29, 2024
	}

	#[test]
	fn tz_spec_parse_test() {
		assert_eq!(TzSpec::parse(b""), Err(TzStringError::Empty));
		assert_eq!(TzSpec::parse(b"EST"), Err(TzStringError::Invalid));
		assert_eq!(TzSpec::parse(b"EST5"), Ok(TzSpec { utoff: -18000, dst: None }));
		assert_eq!(TzSpec::parse(b"<5>6"), Err(TzStringError::Invalid));
		assert_eq!(TzSpec::parse(b"EST5EDT"), Err(TzStringError::MissingRule));
		assert_eq!(TzSpec::parse(b"EST5EDT,M3.2.0"), Err(TzStringError::MissingRule));

		assert_eq!(
			TzSpec::parse(b"EST5EDT,M3.2.0,M11.1.0"),
			Ok(TzSpec {
				utoff: -18000,
				dst: Some(DstSpec {
					utoff: -14400,
					start: TzTransition { date: TzDate::MonthWeekDay(3, 2, 0), time: 7200 },
					end: TzTransition { date: TzDate::MonthWeekDay(11, 1, 0), time: 7200 },
				})
			})
		);

		// Explicit DST offset and switch times
		assert_eq!(
			TzSpec::parse(b"XXX4:30YYY6:45,25/3:10:30,280/-1:20"),
			Ok(TzSpec {
				utoff: -16200,
				dst: Some(DstSpec {
					utoff: -24300,
					start: TzTransition { date: TzDate::Day(25), time: 11430 },
					end: TzTransition { date: TzDate::Day(280), time: -4800 },
				})
			})
		);

		// East-of-UTC zone with negative (ahead) offsets
		assert_eq!(
			TzSpec::parse(b"CET-1CEST,M3.5.0,M10.5.0/3"),
			Ok(TzSpec {
				utoff: 3600,
				dst: Some(DstSpec {
					utoff: 7200,
					start: TzTransition { date: TzDate::MonthWeekDay(3, 5, 0), time: 7200 },
					end: TzTransition { date: TzDate::MonthWeekDay(10, 5, 0), time: 10800 },
				})
			})
		);

		assert_eq!(
			TzSpec::parse(b"EST5EDT,M3.2.0,M11.1.0 "),
			Err(TzStringError::TrailingInput)
		);
	}

	#[test]
	fn tz_spec_info_test() {
		// No DST configuration
		let spec = TzSpec::parse(b"EST5").unwrap();
		assert_eq!(spec.info(1710054000), TzInfo { utoff: -18000, isdst: false });

		// US eastern rules around the 2024 transitions
		let spec = TzSpec::parse(b"EST5EDT,M3.2.0,M11.1.0").unwrap();
		assert_eq!(spec.info(1704672000), TzInfo { utoff: -18000, isdst: false });
		assert_eq!(spec.info(1710053999), TzInfo { utoff: -18000, isdst: false });
		assert_eq!(spec.info(1710054000), TzInfo { utoff: -14400, isdst: true });
		assert_eq!(spec.info(1730613599), TzInfo { utoff: -14400, isdst: true });
		assert_eq!(spec.info(1730613600), TzInfo { utoff: -18000, isdst: false });

		// Summer 2017, used by the WWV DST bits
		assert_eq!(spec.info(1502755200), TzInfo { utoff: -14400, isdst: true });

		// Southern hemisphere: DST spans the new year
		let spec = TzSpec::parse(b"AEST-10AEDT,M10.1.0,M4.1.0/3").unwrap();
		// Jan 15, 2024 00:00 UTC is during southern DST
		assert_eq!(spec.info(1705276800).isdst, true);
		// Jul 1, 2024 00:00 UTC is not
		assert_eq!(spec.info(1719792000).isdst, false);
	}
}
