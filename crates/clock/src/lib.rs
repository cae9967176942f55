//! Utilities for dealing with time.
//!
//! This crate has three parts: [`civil`] converts between Unix timestamps and UTC calendar
//! time and carries the IERS leap second table; [`tz`] parses and evaluates timezone data
//! (TZif files and POSIX TZ strings); [`parse`] reads date time strings like
//! `2024-04-12 10:27:00.519 -07:00` into timestamps.
//!
//! The calendar functions do not go through libc's `gmtime`/`mktime`, so they are thread
//! safe and need no environment. Only [`now`] touches the OS, via
//! `clock_gettime(CLOCK_REALTIME)`.
//!
//! # Examples
//!
//! ```
//! # use clock::UtcTime;
//! let date = UtcTime::from_unix(1718617807).unwrap();
//! assert_eq!(date, UtcTime {
//! 	sec: 7,
//! 	min: 50,
//! 	hour: 9,
//! 	day: 17,
//! 	mon: 6,
//! 	year: 2024,
//! 	yday: 169
//! });
//! ```

pub mod civil;
pub mod parse;
pub mod tz;

pub use civil::*;
pub use parse::*;
