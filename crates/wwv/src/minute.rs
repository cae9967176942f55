//! The WWV per-minute time code.
//!
//! Every minute of the broadcast carries the date, time, daylight savings status, a leap
//! second warning, and the DUT1 correction, encoded one symbol per second. Position
//! markers P1-P6 sit on seconds 9, 19, 29, 39, 49, and 59; second 0 carries the minute
//! mark tone instead of a code symbol.
//!
//! # Examples
//!
//! ```
//! # use wwv::minute::Minute;
//! # use wwv::bcd::Bit;
//! # use clock::TimeSpec;
//! let tz = clock::tz::parse_tzstring(b"EST5EDT,M3.2.0,M11.1.0").unwrap();
//! // Tue, Aug 15, 2017. 10:04:00 UTC.
//! let time = TimeSpec { sec: 1502791440, nsec: 0 };
//! let minute = Minute::new(time, false, 0, &tz).unwrap();
//! assert_eq!(minute.bits[0], Bit::Silence);
//! assert_eq!(minute.bits[9], Bit::Marker);
//! assert_eq!(minute.bits[3], Bit::Zero); // no leap second warning
//! assert_eq!(minute.last_second, 59);
//! ```

use crate::bcd::{BcdEncoder, Bit, EncodeError, FieldDef};
use clock::tz::Timezone;
use clock::{days_in_month, TimeSpec, UtcTime};
use std::sync::LazyLock;
use std::{error, fmt};

/// Seconds carrying the position markers P1-P6.
const MARKERS: [usize; 6] = [9, 19, 29, 39, 49, 59];

/// The WWV time code schema: 26 fields covering seconds 0-59.
///
/// Zero-weight fields are placeholders for the minute mark, the markers, and unused
/// seconds; those positions are seeded before encoding and never written by the encoder.
static MINUTE_ENCODER: LazyLock<BcdEncoder> = LazyLock::new(|| {
	BcdEncoder::new(vec![
		FieldDef::new("minute mark", &[0]),
		FieldDef::new("bit 1: unused", &[0]),
		FieldDef::new("DST1", &[1]),
		FieldDef::new("LSW", &[1]),
		FieldDef::new("year ones", &[1, 2, 4, 8]),
		FieldDef::new("bit 8: unused", &[0]),
		FieldDef::new("P1", &[0]),
		FieldDef::new("minute ones", &[1, 2, 4, 8, 0]),
		FieldDef::new("minute tens", &[10, 20, 40]),
		FieldDef::new("bit 18: unused", &[0]),
		FieldDef::new("P2", &[0]),
		FieldDef::new("hour ones", &[1, 2, 4, 8, 0]),
		FieldDef::new("hour tens", &[10, 20]),
		FieldDef::new("bits 27-28: unused", &[0, 0]),
		FieldDef::new("P3", &[0]),
		FieldDef::new("day of year ones", &[1, 2, 4, 8, 0]),
		FieldDef::new("day of year tens", &[10, 20, 40, 80]),
		FieldDef::new("P4", &[0]),
		FieldDef::new("day of year hundreds", &[100, 200]),
		FieldDef::new("bits 42-48: unused", &[0, 0, 0, 0, 0, 0, 0]),
		FieldDef::new("P5", &[0]),
		FieldDef::new("DUT1 sign", &[1]),
		FieldDef::new("year tens", &[10, 20, 40, 80]),
		FieldDef::new("DST2", &[1]),
		FieldDef::new("DUT1 magnitude", &[1, 2, 4]),
		FieldDef::new("P6", &[0]),
	])
	.expect("the WWV schema weights are sorted")
});

/// The error type for building a [`Minute`].
#[cfg_attr(test, derive(PartialEq))]
pub enum MinuteError {
	/// The input time is before the Unix epoch and not supported. The timestamp is the
	/// payload.
	UnsupportedTime(i64),
	/// The time code could not be encoded. The payload carries the minute as `HH:MM` and
	/// the underlying error.
	Encode(String, EncodeError),
}

impl fmt::Display for MinuteError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MinuteError::UnsupportedTime(t) => write!(f, "Unsupported time: {}", t),
			MinuteError::Encode(at, e) => write!(f, "Cannot encode minute {}: {}", at, e),
		}
	}
}

impl fmt::Debug for MinuteError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

impl error::Error for MinuteError {}

/// One minute of broadcast time with its encoded WWV time code.
///
/// The bit array has 61 entries so leap second minutes can transmit a symbol on second
/// 60; that second is not covered by the schema and keeps its seeded `Zero`.
#[derive(Clone, Copy)]
pub struct Minute {
	/// The instant this minute was built for, sub-minute offset included
	pub time: TimeSpec,
	/// UTC calendar time of `time`
	pub utc: UtcTime,
	/// The encoded time code, one symbol per second
	pub bits: [Bit; 61],
	/// The last second of this minute: 59, or 60 when a leap second is inserted
	pub last_second: u8,
	/// Leap second warning: a leap second will be inserted at the end of this UTC month
	pub lsw: bool,
	/// UT1-UTC in units of 100 ms
	pub dut1: i32,
}

impl Minute {
	/// Build the minute containing `time`.
	///
	/// `lsw` is the leap second warning bit. `dut1` is the UT1-UTC correction in units of
	/// 100 ms; its magnitude is clamped to 7 in the three-bit code field. `tz` must
	/// describe US eastern time (America/New_York), which is what the broadcast's DST
	/// bits report: DST1 is the status at 00:00 UTC of the current UTC date, DST2 at
	/// 24:00 UTC.
	///
	/// # Errors
	///
	/// Returns [`MinuteError::UnsupportedTime`] for pre-epoch times and wraps any
	/// [`EncodeError`] with the failing minute.
	pub fn new(time: TimeSpec, lsw: bool, dut1: i32, tz: &Timezone) -> Result<Minute, MinuteError> {
		let utc = UtcTime::from_unix(time.sec).ok_or(MinuteError::UnsupportedTime(time.sec))?;

		let mut bits = [Bit::Zero; 61];
		bits[0] = Bit::Silence;
		for marker in MARKERS {
			bits[marker] = Bit::Marker;
		}

		let midnight = time.sec
			- utc.hour as i64 * 3600
			- utc.min as i64 * 60
			- utc.sec as i64;
		let dst1 = tz.info(midnight).isdst as u16;
		let dst2 = tz.info(midnight + 86400).isdst as u16;

		let year_ones = utc.year % 10;
		let year_tens = utc.year % 100 - year_ones;
		let minute_ones = utc.min as u16 % 10;
		let minute_tens = utc.min as u16 - minute_ones;
		let hour_ones = utc.hour as u16 % 10;
		let hour_tens = utc.hour as u16 - hour_ones;
		let yday_ones = utc.yday % 10;
		let yday_tens = utc.yday % 100 - yday_ones;
		let yday_hundreds = utc.yday - yday_ones - yday_tens;

		let dut1_sign = (dut1 >= 0) as u16;
		let dut1_magnitude = dut1.unsigned_abs().min(7) as u16;

		MINUTE_ENCODER
			.encode(&mut bits, &[
				0, 0, dst1, lsw as u16, year_ones, 0, 0,
				minute_ones, minute_tens, 0, 0,
				hour_ones, hour_tens, 0, 0,
				yday_ones, yday_tens, 0,
				yday_hundreds, 0, 0,
				dut1_sign, year_tens, dst2, dut1_magnitude, 0,
			])
			.map_err(|e| {
				MinuteError::Encode(format!("{:02}:{:02}", utc.hour, utc.min), e)
			})?;

		Ok(Minute {
			time,
			utc,
			bits,
			last_second: last_second(&utc, lsw),
			lsw,
			dut1,
		})
	}
}

/// The last second of the minute containing `utc`.
///
/// Returns 60 only when a leap second is pending and this is the final minute of the UTC
/// month; 59 otherwise.
fn last_second(utc: &UtcTime, lsw: bool) -> u8 {
	if lsw && utc.hour == 23 && utc.min == 59 && utc.day == days_in_month(utc.year, utc.mon) {
		60
	} else {
		59
	}
}
