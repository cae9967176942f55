//! Support for parsing compiled timezone (TZif) files.
//!
//! TZif files carry precomputed transition instants, the timezone info taking effect at
//! each, and (from version 2 on) a trailing TZ string for instants past the last
//! transition. This module reads versions 2-4; version 1 files, which only carry 32-bit
//! transition times, are rejected. Leap second records and timezone names are skipped.
//!
//! # Examples
//!
//! ```no_run
//! # use clock::tz::parse_file;
//! let timezone = parse_file("/usr/share/zoneinfo/America/New_York").unwrap();
//! let info = timezone.info(1502755200);
//! assert!(info.isdst);
//! ```

use super::tzstring::{TzSpec, TzStringError};
use super::{Timezone, TzInfo};
use std::path::Path;
use std::{error, fmt, fs, io};

/// The error type for parsing TZif files.
#[derive(Debug, PartialEq)]
pub enum TzFileError {
	/// Error reading the file. The reason is returned as the payload.
	FileReadError(String),
	/// The data does not begin with the `TZif` magic bytes.
	NotATzFile,
	/// The file version is unsupported. The version byte is returned as the payload.
	UnsupportedVersion(u8),
	/// The data is not a valid TZif file.
	InvalidTzFile,
	/// The trailing TZ string is invalid or unsupported.
	InvalidTzString(TzStringError),
}

impl From<io::Error> for TzFileError {
	fn from(error: io::Error) -> Self {
		TzFileError::FileReadError(error.to_string())
	}
}

impl From<TzStringError> for TzFileError {
	fn from(error: TzStringError) -> Self {
		TzFileError::InvalidTzString(error)
	}
}

impl fmt::Display for TzFileError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TzFileError::FileReadError(s) => write!(f, "{}", s),
			TzFileError::NotATzFile => write!(f, "Not a TZif file"),
			TzFileError::UnsupportedVersion(v) => write!(f, "Unsupported TZif version: {0} ({0:#04x})", v),
			TzFileError::InvalidTzFile => write!(f, "Invalid TZif file"),
			TzFileError::InvalidTzString(e) => write!(f, "{}", e),
		}
	}
}

impl error::Error for TzFileError {}

/// Get a subslice, or fail with [`TzFileError::InvalidTzFile`] when out of bounds.
fn slice(bytes: &[u8], from: usize, len: usize) -> Result<&[u8], TzFileError> {
	bytes
		.get(from..from + len)
		.ok_or(TzFileError::InvalidTzFile)
}

/// Read a big endian u32.
fn be_u32(bytes: &[u8], at: usize) -> Result<u32, TzFileError> {
	Ok(u32::from_be_bytes(slice(bytes, at, 4)?.try_into().unwrap()))
}

/// Read a big endian i32.
fn be_i32(bytes: &[u8], at: usize) -> Result<i32, TzFileError> {
	Ok(i32::from_be_bytes(slice(bytes, at, 4)?.try_into().unwrap()))
}

/// Read a big endian i64.
fn be_i64(bytes: &[u8], at: usize) -> Result<i64, TzFileError> {
	Ok(i64::from_be_bytes(slice(bytes, at, 8)?.try_into().unwrap()))
}

/// TZif header counts, excluding the magic and version bytes.
#[cfg_attr(test, derive(Debug, PartialEq))]
struct TzHeader {
	/// Count of UT/local indicators
	isutcnt: usize,
	/// Count of standard/wall indicators
	isstdcnt: usize,
	/// Count of leap second records
	leapcnt: usize,
	/// Count of transition times
	timecnt: usize,
	/// Count of timezone info records
	typecnt: usize,
	/// Bytes of timezone name data
	charcnt: usize,
}

impl TzHeader {
	/// Parse the six header counts beginning at `at` (offset +20 of a TZif header).
	fn parse(bytes: &[u8], at: usize) -> Result<TzHeader, TzFileError> {
		Ok(TzHeader {
			isutcnt: be_u32(bytes, at)? as usize,
			isstdcnt: be_u32(bytes, at + 4)? as usize,
			leapcnt: be_u32(bytes, at + 8)? as usize,
			timecnt: be_u32(bytes, at + 12)? as usize,
			typecnt: be_u32(bytes, at + 16)? as usize,
			charcnt: be_u32(bytes, at + 20)? as usize,
		})
	}

	/// Size of the data block following this header, with `timesize`-byte transition times.
	fn data_size(&self, timesize: usize) -> usize {
		self.timecnt * (timesize + 1)
			+ self.typecnt * 6
			+ self.charcnt
			+ self.leapcnt * (timesize + 4)
			+ self.isstdcnt
			+ self.isutcnt
	}
}

/// Parse a byte slice containing a TZif file.
///
/// # Errors
///
/// - [`TzFileError::NotATzFile`] if the `TZif` magic bytes are missing
/// - [`TzFileError::UnsupportedVersion`] for version 1 files or unknown versions
/// - [`TzFileError::InvalidTzFile`] if the data is malformed
/// - [`TzFileError::InvalidTzString`] if the trailing TZ string does not parse
pub fn parse_bytes(bytes: &[u8]) -> Result<Timezone, TzFileError> {
	if slice(bytes, 0, 4)? != &b"TZif"[..] {
		return Err(TzFileError::NotATzFile);
	}
	match slice(bytes, 4, 1)?[0] {
		b'2'..=b'4' => (),
		v => return Err(TzFileError::UnsupportedVersion(v)),
	}

	// The version 1 header and data block precede the 64-bit data; skip them
	let v1 = TzHeader::parse(bytes, 20)?;
	let at = 44 + v1.data_size(4) + 20;
	let h = TzHeader::parse(bytes, at)?;
	let mut at = at + 24;

	// Transition times, then the index of the info record for each
	let mut times = Vec::with_capacity(h.timecnt);
	for i in 0..h.timecnt {
		times.push(be_i64(bytes, at + i * 8)?);
	}
	at += h.timecnt * 8;
	let indices = slice(bytes, at, h.timecnt)?;
	at += h.timecnt;

	// Timezone info records: utoff (i32), isdst (u8), name index (u8, unused here)
	let mut types = Vec::with_capacity(h.typecnt);
	for i in 0..h.typecnt {
		let rec = slice(bytes, at + i * 6, 6)?;
		types.push(TzInfo {
			utoff: i32::from_be_bytes(rec[0..4].try_into().unwrap()),
			isdst: rec[4] > 0,
		});
	}
	at += h.typecnt * 6;

	// Skip names, leap second records, and the standard/UT indicators
	at += h.charcnt + h.leapcnt * 12 + h.isstdcnt + h.isutcnt;

	// Newline-enclosed TZ string, possibly empty
	let footer = bytes.get(at..).ok_or(TzFileError::InvalidTzFile)?;
	let spec = match footer {
		[b'\n', b'\n'] => None,
		[b'\n', tzstring @ .., b'\n'] => Some(TzSpec::parse(tzstring)?),
		_ => return Err(TzFileError::InvalidTzFile),
	};

	let transitions = times
		.into_iter()
		.zip(indices)
		.map(|(t, &i)| Some((t, *types.get(i as usize)?)))
		.collect::<Option<Vec<_>>>()
		.ok_or(TzFileError::InvalidTzFile)?;

	if transitions.is_empty() && spec.is_none() {
		// No transitions and no rule: treat the first info record as applying always
		match types.first() {
			Some(&info) => Ok(Timezone::new(vec![(i64::MIN, info)], None)),
			None => Err(TzFileError::InvalidTzFile),
		}
	} else {
		Ok(Timezone::new(transitions, spec))
	}
}

/// Parse a TZif file from disk.
///
/// # Errors
///
/// As [`parse_bytes`], plus [`TzFileError::FileReadError`] if the file cannot be read.
pub fn parse_file<P>(file: P) -> Result<Timezone, TzFileError>
where
	P: AsRef<Path>,
{
	let bytes = fs::read(file)?;
	parse_bytes(bytes.as_slice())
}
