//! Support for command line argument parsing.
//!
//! See [crate] documentation for details on command line arguments and examples.

use clock::tz::{self, Timezone, TzFileError};
use clock::{parse_timestamp, ParseError, TimeSpec};
use std::error::Error;
use std::ffi::OsString;
use std::fmt::{Debug, Display};
use std::num::NonZero;
use std::path::PathBuf;

/// The error type for parsing command line arguments.
#[cfg_attr(test, derive(PartialEq))]
pub enum ArgumentsError {
	/// The option was unrecognized. The option is returned as the payload of this variant.
	UnrecognizedOption(String),
	/// Error converting an option or parameter to UTF-8. The argument index and original
	/// [`OsString`] that could not be converted are returned as the payload of this
	/// variant.
	InvalidUTF8(usize, OsString),
	/// A numeric parameter did not parse. The payload carries the option and the supplied
	/// parameter.
	InvalidNumber(String, String),
	/// The parameter for an option was not supplied. The option is returned as the
	/// payload for this variant.
	MissingParameter(String),
	/// An error occurred while parsing the provided timezone. The underlying timezone
	/// error is returned as the payload for this variant.
	TimezoneError(TzFileError),
	/// An error occurred while parsing the provided date time string. The underlying
	/// parse error is returned as the payload for this variant.
	DateTimeParseError(ParseError),
	/// Help option (-h) was included, so print help details and exit.
	Help,
}

impl Display for ArgumentsError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ArgumentsError::UnrecognizedOption(s) => write!(f, "Unrecognized option: {}", s),
			ArgumentsError::InvalidUTF8(i, v) => write!(f, "Invalid UTF-8 in argument {}: {:?}", i, v),
			ArgumentsError::InvalidNumber(o, v) => write!(f, "Invalid parameter for option {}: {}", o, v),
			ArgumentsError::MissingParameter(s) => write!(f, "Missing parameter for option {}", s),
			ArgumentsError::TimezoneError(t) => write!(f, "Timezone error: {}", t),
			ArgumentsError::DateTimeParseError(e) => write!(f, "Datetime parsing error: {}", e),
			ArgumentsError::Help => write!(f, "Help requested"),
		}
	}
}

impl Debug for ArgumentsError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		Display::fmt(self, f)
	}
}

impl Error for ArgumentsError {}

/// Convert an argument to [`&str`].
///
/// The function takes the argument index `i`, the owning option `name`, and the argument.
///
/// # Errors
///
/// Returns [`ArgumentsError::InvalidUTF8`] if the argument could not be converted to
/// UTF-8 or [`ArgumentsError::MissingParameter`] if the argument is `None`.
fn arg_to_str<'a>(i: usize, name: &str, arg: Option<&'a OsString>) -> Result<&'a str, ArgumentsError> {
	match arg {
		Some(v) => v.to_str().ok_or_else(|| ArgumentsError::InvalidUTF8(i, v.clone())),
		None => Err(ArgumentsError::MissingParameter(name.to_string())),
	}
}

/// Parse a numeric parameter, reporting the owning option on failure.
fn parse_number<T: std::str::FromStr>(name: &str, v: &str) -> Result<T, ArgumentsError> {
	v.parse()
		.map_err(|_| ArgumentsError::InvalidNumber(name.to_string(), v.to_string()))
}

/// Parsed command line arguments.
#[cfg_attr(test, derive(Debug, PartialEq))]
pub struct Arguments {
	/// Output amplitude in dBFS.
	pub amplitude: f64,
	/// Directory holding the voice announcement clips.
	pub announcements: PathBuf,
	/// The configured timezone for the DST bits (if provided).
	pub timezone: Option<Timezone>,
	/// Replay start time (if provided); otherwise the wall clock drives the output.
	pub time: Option<TimeSpec>,
	/// Stop after this many minutes (if provided).
	pub count: Option<NonZero<usize>>,
	/// UT1-UTC in units of 100 ms.
	pub dut1: i32,
	/// Force the leap second warning bit.
	pub lsw: bool,
	/// Mix white noise under the program at this dBFS level (if provided).
	pub noise: Option<f64>,
	/// Play on the default audio device instead of writing PCM to stdout.
	pub device: bool,
}

impl Default for Arguments {
	fn default() -> Arguments {
		Arguments {
			amplitude: -6.0,
			announcements: PathBuf::from("announcements"),
			timezone: None,
			time: None,
			count: None,
			dut1: 0,
			lsw: false,
			noise: None,
			device: false,
		}
	}
}

impl Arguments {
	/// Parse command line arguments.
	///
	/// The input can be any [`Iterator`] yielding [`OsString`], typically
	/// [`std::env::args_os`]. This function assumes the application name is **not**
	/// supplied as the first item.
	///
	/// # Errors
	///
	/// This function can return any of the variants in [`ArgumentsError`]. See that
	/// documentation for more details.
	///
	/// # Examples
	///
	/// ```ignore
	/// let args = match Arguments::parse(std::env::args_os().skip(1)) {
	/// 	Ok(args) => args,
	/// 	Err(e) => {
	/// 		// Handle error
	/// 		panic!("{}", e);
	/// 	}
	/// };
	/// ```
	pub fn parse(mut args: impl Iterator<Item = OsString>) -> Result<Arguments, ArgumentsError> {
		let mut parsed = Arguments::default();
		let mut arg = args.next();
		let mut i = 0;
		while let Some(current) = arg.as_ref() {
			match arg_to_str(i, "", Some(current))? {
				name @ ("-a" | "--amplitude") => {
					let next_arg = args.next();
					let v = arg_to_str(i + 1, name, next_arg.as_ref())?;
					parsed.amplitude = parse_number(name, v)?;
					i += 1;
				}
				name @ "--announcements" => {
					parsed.announcements = args
						.next()
						.map(PathBuf::from)
						.ok_or_else(|| ArgumentsError::MissingParameter(name.to_string()))?;
					i += 1;
				}
				name @ ("-z" | "--timezone") => {
					let Some(a) = args.next() else {
						return Err(ArgumentsError::MissingParameter(name.to_string()));
					};
					// A parameter that is not a readable file may still be a TZ string
					parsed.timezone = Some(
						tz::parse_file(a.as_os_str())
							.or_else(|e| {
								if let TzFileError::FileReadError(_) = e {
									tz::parse_tzstring(a.as_encoded_bytes()).map_err(TzFileError::from)
								} else {
									Err(e)
								}
							})
							.map_err(ArgumentsError::TimezoneError)?,
					);
					i += 1;
				}
				name @ ("-t" | "--time") => {
					let Some(a) = args.next() else {
						return Err(ArgumentsError::MissingParameter(name.to_string()));
					};
					parsed.time = Some(
						parse_timestamp(a.as_encoded_bytes())
							.map_err(ArgumentsError::DateTimeParseError)?,
					);
					i += 1;
				}
				name @ ("-n" | "-c" | "--count") => {
					let next_arg = args.next();
					let v = arg_to_str(i + 1, name, next_arg.as_ref())?;
					parsed.count = Some(parse_number(name, v)?);
					i += 1;
				}
				name @ "--dut1" => {
					let next_arg = args.next();
					let v = arg_to_str(i + 1, name, next_arg.as_ref())?;
					parsed.dut1 = parse_number(name, v)?;
					i += 1;
				}
				name @ "--noise" => {
					let next_arg = args.next();
					let v = arg_to_str(i + 1, name, next_arg.as_ref())?;
					parsed.noise = Some(parse_number(name, v)?);
					i += 1;
				}
				"--lsw" => parsed.lsw = true,
				"--device" => parsed.device = true,
				"-h" | "--help" => return Err(ArgumentsError::Help),
				v => return Err(ArgumentsError::UnrecognizedOption(v.to_string())),
			}
			arg = args.next();
			i += 1;
		}

		Ok(parsed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::str::FromStr;

	fn parse(args: &[&str]) -> Result<Arguments, ArgumentsError> {
		Arguments::parse(args.iter().map(OsString::from))
	}

	#[test]
	fn defaults_test() {
		assert_eq!(
			parse(&[]),
			Ok(Arguments {
				amplitude: -6.0,
				announcements: PathBuf::from("announcements"),
				timezone: None,
				time: None,
				count: None,
				dut1: 0,
				lsw: false,
				noise: None,
				device: false,
			})
		);
	}

	#[test]
	fn full_parse_test() {
		let args = parse(&[
			"-a", "-12.5",
			"--announcements", "/opt/voice",
			"-z", "EST5EDT,M3.2.0,M11.1.0",
			"-t", "2017-08-15 10:04:30.500",
			"-n", "5",
			"--dut1", "-3",
			"--lsw",
			"--noise", "-40",
		])
		.unwrap();

		assert_eq!(args.amplitude, -12.5);
		assert_eq!(args.announcements, PathBuf::from("/opt/voice"));
		assert_eq!(args.timezone, tz::parse_tzstring(b"EST5EDT,M3.2.0,M11.1.0").ok());
		assert_eq!(args.time, Some(TimeSpec { sec: 1502791470, nsec: 500000000 }));
		assert_eq!(args.count, NonZero::new(5));
		assert_eq!(args.dut1, -3);
		assert!(args.lsw);
		assert_eq!(args.noise, Some(-40.0));
		assert!(!args.device);
	}

	#[test]
	fn count_alias_test() {
		assert_eq!(parse(&["-c", "7"]).unwrap().count, NonZero::new(7));
		assert_eq!(parse(&["--count", "7"]).unwrap().count, NonZero::new(7));
		// Later options override earlier ones
		assert_eq!(parse(&["-n", "5", "-c", "7"]).unwrap().count, NonZero::new(7));
	}

	#[test]
	fn error_test() {
		assert_eq!(
			parse(&["--frequency"]),
			Err(ArgumentsError::UnrecognizedOption(String::from("--frequency")))
		);
		assert_eq!(
			parse(&["-a"]),
			Err(ArgumentsError::MissingParameter(String::from("-a")))
		);
		assert_eq!(
			parse(&["-a", "loud"]),
			Err(ArgumentsError::InvalidNumber(String::from("-a"), String::from("loud")))
		);
		assert_eq!(
			parse(&["-n", "0"]),
			Err(ArgumentsError::InvalidNumber(String::from("-n"), String::from("0")))
		);
		assert_eq!(
			parse(&["--dut1", "x"]),
			Err(ArgumentsError::InvalidNumber(String::from("--dut1"), String::from("x")))
		);
		assert_eq!(parse(&["-h"]), Err(ArgumentsError::Help));
		assert_eq!(parse(&["--help"]), Err(ArgumentsError::Help));

		assert!(matches!(
			parse(&["-t", "not a time"]),
			Err(ArgumentsError::DateTimeParseError(_))
		));
		// Neither a readable file nor a valid TZ string
		assert!(matches!(
			parse(&["-z", "!!!"]),
			Err(ArgumentsError::TimezoneError(_))
		));
	}

	#[test]
	fn invalid_utf8_test() {
		let bad = unsafe { OsString::from_encoded_bytes_unchecked(vec![b'x', 0xff, b'y']) };
		let args = vec![OsString::from_str("-a").unwrap(), bad.clone()];
		assert_eq!(
			Arguments::parse(args.into_iter()),
			Err(ArgumentsError::InvalidUTF8(1, bad))
		);
	}
}
