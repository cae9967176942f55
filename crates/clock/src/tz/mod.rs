//! Timezone parsing and evaluation.
//!
//! A [`Timezone`] answers "what UTC offset applies, and is daylight savings time in
//! effect, at this instant". It can be built from compiled TZif data ([`parse_file`],
//! [`parse_bytes`]) or from a POSIX TZ string ([`parse_tzstring`]). TZif data carries a
//! list of precomputed transition instants plus an optional trailing TZ string for times
//! beyond the last transition; a bare TZ string computes every transition from its rules.
//!
//! Unsupported TZif features: version 1 files (32-bit transition times only), leap second
//! records, and timezone names.
//!
//! # Examples
//!
//! ```
//! # use clock::tz::{parse_tzstring, TzInfo};
//! let timezone = parse_tzstring(b"EST5EDT,M3.2.0,M11.1.0").unwrap();
//! assert_eq!(timezone.info(1710053999), TzInfo { utoff: -18000, isdst: false });
//! assert_eq!(timezone.info(1710054000), TzInfo { utoff: -14400, isdst: true });
//! ```

pub mod tzfile;
pub mod tzstring;

pub use tzfile::*;
pub use tzstring::*;

/// Timezone information at a moment in time.
///
/// The UTC offset is added to UTC to obtain local time: New York standard time has
/// `utoff == -18000`, so 16:00 UTC is 11:00 EST.
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct TzInfo {
	/// The UTC offset in seconds
	pub utoff: i32,
	/// Whether daylight savings time is in effect
	pub isdst: bool,
}

/// Timezone configuration.
///
/// Holds precomputed transition instants (from TZif data, possibly empty) and an optional
/// TZ rule for instants beyond them.
#[derive(Debug, PartialEq)]
pub struct Timezone {
	/// Precomputed transition instants and the info taking effect at each, ascending
	transitions: Vec<(i64, TzInfo)>,
	/// Rule for computing info past the precomputed transitions
	spec: Option<TzSpec>,
}

impl Timezone {
	pub(crate) fn new(transitions: Vec<(i64, TzInfo)>, spec: Option<TzSpec>) -> Timezone {
		Timezone { transitions, spec }
	}

	/// Get timezone info for a given moment in time.
	///
	/// Instants before the first precomputed transition use the first transition's info;
	/// instants at or past the last one use the TZ rule when present. With neither
	/// transitions nor a rule the default `TzInfo` (UTC, no DST) is returned.
	pub fn info(&self, time: i64) -> TzInfo {
		let i = self.transitions.partition_point(|&(t, _)| t <= time);
		if i == self.transitions.len() {
			match &self.spec {
				Some(spec) => spec.info(time),
				None => self.transitions.last().map(|&(_, v)| v).unwrap_or_default(),
			}
		} else if i == 0 {
			self.transitions[0].1
		} else {
			self.transitions[i - 1].1
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn timezone_info_test() {
		let mut tz = Timezone::new(Vec::new(), None);
		assert_eq!(tz.info(1704672000), TzInfo::default());

		// Rule only
		tz.spec = Some(TzSpec::parse(b"EST5EDT,M3.2.0,M11.1.0").unwrap());
		assert_eq!(tz.info(1704672000), TzInfo { utoff: -18000, isdst: false });
		assert_eq!(tz.info(1710053999), TzInfo { utoff: -18000, isdst: false });
		assert_eq!(tz.info(1710054000), TzInfo { utoff: -14400, isdst: true });

		// Precomputed transitions take precedence until they run out
		tz.transitions = vec![
			(1710054000, TzInfo { utoff: -20000, isdst: false }),
			(1720054000, TzInfo { utoff: -10000, isdst: true }),
		];
		assert_eq!(tz.info(1704672000), TzInfo { utoff: -20000, isdst: false });
		assert_eq!(tz.info(1710054000), TzInfo { utoff: -20000, isdst: false });
		assert_eq!(tz.info(1715054000), TzInfo { utoff: -20000, isdst: false });
		// At and past the last transition the rule takes over
		assert_eq!(tz.info(1730613599), TzInfo { utoff: -14400, isdst: true });
		assert_eq!(tz.info(1730613600), TzInfo { utoff: -18000, isdst: false });

		// Without a rule the last transition extends forever
		tz.spec = None;
		assert_eq!(tz.info(1730613600), TzInfo { utoff: -10000, isdst: true });
	}
}
