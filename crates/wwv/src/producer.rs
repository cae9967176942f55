//! Feeding the composer with freshly built minutes.
//!
//! The live producer runs on its own thread: it builds a [`Minute`] from the wall clock,
//! hands it over a bounded channel, then sleeps on a one-shot timeout until the top of
//! the next minute and repeats. The timeout is computed from the produced minute's own
//! instant rather than a periodic ticker, so a stepped system clock realigns the producer
//! to the true minute boundary on the next round.
//!
//! The replay producer emits minutes for a fixed start instant and the boundaries after
//! it, back to back, for deterministic offline rendering.
//!
//! Either producer stops when its [`Handle`] signals it, when it has produced its
//! configured count, or when the consumer goes away; the minute channel closes when it
//! stops, which the composer reports as end of stream.

use crate::minute::Minute;
use clock::tz::Timezone;
use clock::{next_leap_second, timestamp_from_ymd, TimeSpec, UtcTime};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread;

/// Inputs the time code carries that are not derivable from the clock.
#[derive(Clone, Copy, Default)]
pub struct Config {
	/// UT1-UTC in units of 100 ms
	pub dut1: i32,
	/// Force the leap second warning bit instead of consulting the leap second table
	pub force_lsw: bool,
	/// Stop after this many minutes; `None` runs until stopped
	pub count: Option<usize>,
}

/// Stops a producer. Dropping the handle stops it too.
pub struct Handle {
	stop: SyncSender<()>,
}

impl Handle {
	/// Ask the producer to stop. Its minute channel closes once the current handoff
	/// completes.
	pub fn stop(&self) {
		let _ = self.stop.try_send(());
	}
}

/// Whether a leap second lands exactly at the end of the UTC month containing `time`.
fn leap_second_pending(time: i64) -> bool {
	let Some(utc) = UtcTime::from_unix(time) else {
		return false;
	};
	let (year, mon) = if utc.mon == 12 {
		(utc.year + 1, 1)
	} else {
		(utc.year, utc.mon + 1)
	};
	let month_end = timestamp_from_ymd(year, mon, 1);
	next_leap_second(time).map(|(t, _)| t) == Some(month_end)
}

/// Build the minute for `time` under `config`.
fn build(time: TimeSpec, config: &Config, tz: &Timezone) -> Result<Minute, crate::minute::MinuteError> {
	let lsw = config.force_lsw || leap_second_pending(time.sec);
	Minute::new(time, lsw, config.dut1, tz)
}

/// Common producer loop: emit minutes from `next`, pacing and stopping via `wait`.
fn run<N, W>(tx: SyncSender<Minute>, config: Config, tz: Timezone, mut next: N, wait: W)
where
	N: FnMut() -> Option<TimeSpec>,
	W: Fn(&Minute) -> bool,
{
	let mut produced = 0;
	loop {
		let Some(time) = next() else {
			eprintln!("Failed to get the current time; no more minutes will be produced");
			break;
		};
		let min = match build(time, &config, &tz) {
			Ok(min) => min,
			Err(e) => {
				eprintln!("Error building minute: {}", e);
				break;
			}
		};
		if tx.send(min).is_err() {
			break; // consumer went away
		}
		produced += 1;
		if config.count.is_some_and(|count| produced >= count) {
			break;
		}
		if !wait(&min) {
			break;
		}
	}
}

/// Produce a minute at each wall-clock minute boundary until stopped.
///
/// The first minute is built for the current instant, so the composer starts mid-minute
/// and seeks; every following minute is built at its boundary.
pub fn live(tz: Timezone, config: Config) -> (Receiver<Minute>, Handle) {
	let (tx, rx) = mpsc::sync_channel(1);
	let (stop_tx, stop_rx) = mpsc::sync_channel(1);

	thread::spawn(move || {
		run(tx, config, tz, clock::now, |min: &Minute| {
			// One-shot timeout to the top of the next minute; a stop signal or a dropped
			// handle ends the wait early
			matches!(
				stop_rx.recv_timeout(min.time.until_next_minute()),
				Err(RecvTimeoutError::Timeout)
			)
		})
	});

	(rx, Handle { stop: stop_tx })
}

/// Produce minutes from a fixed start instant, back to back, until stopped.
///
/// The first minute carries the start instant itself (sub-minute offset included); each
/// following minute lands on the next boundary.
pub fn replay(start: TimeSpec, tz: Timezone, config: Config) -> (Receiver<Minute>, Handle) {
	let (tx, rx) = mpsc::sync_channel(1);
	let (stop_tx, stop_rx) = mpsc::sync_channel(1);

	thread::spawn(move || {
		let mut upcoming = Some(start);
		run(
			tx,
			config,
			tz,
			move || {
				let time = upcoming?;
				upcoming = Some(TimeSpec {
					sec: time.minute_start().sec + 60,
					nsec: 0,
				});
				Some(time)
			},
			|_| !matches!(stop_rx.try_recv(), Ok(()) | Err(mpsc::TryRecvError::Disconnected)),
		)
	});

	(rx, Handle { stop: stop_tx })
}

#[cfg(test)]
mod tests {
	use super::*;
	use clock::tz::parse_tzstring;
	use std::time::Duration;

	fn nyc() -> Timezone {
		parse_tzstring(b"EST5EDT,M3.2.0,M11.1.0").unwrap()
	}

	#[test]
	fn replay_test() {
		// Tue, Aug 15, 2017. 10:04:30.5 UTC.
		let start = TimeSpec { sec: 1502791470, nsec: 500_000_000 };
		let config = Config { dut1: 3, count: Some(3), ..Config::default() };
		let (minutes, _handle) = replay(start, nyc(), config);

		let first = minutes.recv().unwrap();
		assert_eq!(first.time, start);
		assert_eq!(first.utc.min, 4);
		assert_eq!(first.dut1, 3);

		let second = minutes.recv().unwrap();
		assert_eq!(second.time, TimeSpec { sec: 1502791500, nsec: 0 });
		assert_eq!(second.utc.min, 5);

		let third = minutes.recv().unwrap();
		assert_eq!(third.time, TimeSpec { sec: 1502791560, nsec: 0 });

		// Count reached: the channel closes
		assert!(minutes.recv().is_err());
	}

	#[test]
	fn replay_stop_test() {
		let start = TimeSpec { sec: 1502791440, nsec: 0 };
		let (minutes, handle) = replay(start, nyc(), Config::default());

		assert!(minutes.recv().is_ok());
		handle.stop();
		// At most one already-queued minute, then the channel closes
		let mut remaining = 0;
		while minutes.recv_timeout(Duration::from_secs(5)).is_ok() {
			remaining += 1;
			assert!(remaining < 4, "producer did not stop");
		}
	}

	#[test]
	fn live_first_minute_test() {
		let config = Config { count: Some(1), ..Config::default() };
		let (minutes, _handle) = live(nyc(), config);

		let min = minutes.recv().unwrap();
		let now = clock::now().unwrap();
		// The produced minute is the one containing "now"
		assert!(now.sec - min.time.sec < 120);
		assert!(minutes.recv().is_err());
	}

	#[test]
	fn live_stop_test() {
		let (minutes, handle) = live(nyc(), Config::default());
		assert!(minutes.recv().is_ok());
		// The producer is now waiting out the minute; stopping must end it promptly
		handle.stop();
		assert!(minutes.recv_timeout(Duration::from_secs(5)).is_err());
	}

	#[test]
	fn leap_second_pending_test() {
		// Jun 30, 2015 precedes a real leap second; Jun 1 is in the same month
		assert!(leap_second_pending(1435708740));
		assert!(leap_second_pending(1433116800));
		// May 2015 does not
		assert!(!leap_second_pending(1430438400));
		// Dec 2016 rolls the month into the next year
		assert!(leap_second_pending(1482969600));
		// Nothing is scheduled after 2017
		assert!(!leap_second_pending(1502791440));
	}

	#[test]
	fn forced_lsw_test() {
		let start = TimeSpec { sec: 1502791440, nsec: 0 };
		let config = Config { force_lsw: true, count: Some(1), ..Config::default() };
		let (minutes, _handle) = replay(start, nyc(), config);
		assert!(minutes.recv().unwrap().lsw);
	}
}
