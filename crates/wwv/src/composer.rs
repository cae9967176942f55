//! Per-second synthesis of the broadcast signal.
//!
//! The composer pulls [`Minute`]s from a channel and renders them into audio one second
//! at a time, layering onto a scratch buffer of exactly one second:
//!
//! 1. The minute mark on second 0: 800 ms at 1000 Hz, or 1500 Hz at the top of the hour.
//! 2. A 5 ms 1000 Hz tick at the start of most seconds, doubled 100 ms later on the
//!    seconds that signal DUT1.
//! 3. The standard audio tone (440, 500, or 600 Hz) from 30 ms to 990 ms.
//! 4. The 100 Hz sub-carrier carrying one time code symbol, its high-level duration
//!    encoding the symbol.
//! 5. The voice announcement of the upcoming minute, from 52.5 seconds on.
//!
//! The first minute pulled may start anywhere inside the minute; the composer seeks to
//! the exact sub-second offset so the emitted stream lines up with the instant the minute
//! was built for. On leap second minutes the per-minute sample counter runs to 61
//! seconds.

use crate::announce::Announce;
use crate::bcd::Bit;
use crate::minute::Minute;
use audio::{dbfs_to_linear, Sine, Source, SourceError};
use clock::UtcTime;
use std::sync::mpsc::Receiver;

/// Fade length for ticks, in seconds.
const TICK_FADE: f64 = 0.0003;
/// Fade length for the standard tone.
const TONE_FADE: f64 = 0.01;
/// Fade length for the minute mark.
const MINUTE_FADE: f64 = 0.005;
/// Fade length into and out of the sub-carrier.
const CODE_FADE: f64 = 0.01;
/// Fade length of the sub-carrier's high-to-low step.
const CODE_REDUCE_FADE: f64 = 0.01;

/// Fade floor low enough to be inaudible.
const SILENT_DBFS: f64 = -1000.0;
/// Standard tone level.
const TONE_DBFS: f64 = -6.0;
/// Sub-carrier high level.
const CODE_HIGH_DBFS: f64 = -15.0;
/// Sub-carrier low level.
const CODE_LOW_DBFS: f64 = -30.0;

/// The announcement begins this many milliseconds after the minute mark.
const ANNOUNCE_AT_MS: usize = 52_500;

/// Read from a source and add the result into `dst`.
///
/// `scratch` must be at least as long as `dst`; any tail the source leaves unwritten is
/// not mixed.
fn mix_from<S: Source>(source: &mut S, dst: &mut [f32], scratch: &mut [f32]) -> Result<usize, SourceError> {
	let scratch = &mut scratch[..dst.len()];
	let n = source.read(scratch)?;
	for (out, s) in dst.iter_mut().zip(scratch[..n].iter()) {
		*out += s;
	}
	Ok(n)
}

/// Renders a stream of [`Minute`]s into the WWV audio signal.
///
/// Implements [`Source`]; each read fills the whole buffer unless the minute channel has
/// closed, in which case the read returns short once and the next read fails with
/// [`SourceError::Exhausted`].
pub struct Composer<A> {
	amplitude: f64,
	minutes: Receiver<Minute>,
	/// The minute being emitted; `None` until the first pull
	minute: Option<Minute>,
	/// Audio for the current second, exactly one second long
	sec_buf: Vec<f32>,
	/// Scratch for mixing a single layer
	mix_buf: Vec<f32>,
	/// Samples emitted within the current minute, wrapping at `(last_second + 1) * rate`
	samples_read: usize,
	sine: Sine,
	announcer: A,
	/// Samples of the current minute's utterance consumed, counting skips
	announcer_offset: usize,
	sample_rate: usize,
}

impl<A: Announce> Composer<A> {
	/// Create a composer reading minutes from `minutes` and voice audio from `announcer`.
	pub fn new(minutes: Receiver<Minute>, announcer: A, amplitude_dbfs: f64, sample_rate: usize) -> Composer<A> {
		Composer {
			amplitude: dbfs_to_linear(amplitude_dbfs),
			minutes,
			minute: None,
			sec_buf: vec![0.0; sample_rate],
			mix_buf: vec![0.0; sample_rate],
			samples_read: 0,
			sine: Sine::new(440.0, 0.0, sample_rate),
			announcer,
			announcer_offset: 0,
			sample_rate,
		}
	}

	/// Convert milliseconds into samples at the composer's rate, truncating.
	fn ms(&self, millis: usize) -> usize {
		millis * self.sample_rate / 1000
	}

	fn current(&self) -> Result<Minute, SourceError> {
		self.minute
			.ok_or_else(|| SourceError::Synthesis(String::from("No minute is active")))
	}

	/// Take the next minute from the channel and seek to its instant.
	///
	/// The announcement always names the *next* minute, so the announcer is pointed one
	/// minute past the pulled one. When the minute starts mid-way (live startup), the
	/// per-minute sample counter jumps straight to the minute's own sub-second offset.
	fn begin_minute(&mut self, min: Minute) -> Result<(), SourceError> {
		let next = UtcTime::from_unix(min.time.sec + 60).ok_or_else(|| {
			SourceError::Synthesis(String::from("Cannot announce a time before the Unix epoch"))
		})?;
		self.announcer.set_time(next);
		self.announcer_offset = 0;
		self.samples_read = min.time.sec.rem_euclid(60) as usize * self.sample_rate
			+ (min.time.nsec * self.sample_rate as i64 / 1_000_000_000) as usize;
		self.minute = Some(min);
		self.render_second(self.samples_read / self.sample_rate)
	}

	/// Render one second of the current minute into the scratch buffer.
	fn render_second(&mut self, second: usize) -> Result<(), SourceError> {
		let min = self.current()?;
		self.sec_buf.fill(0.0);
		self.layer_second(&min, second).map_err(|e| match e {
			SourceError::Synthesis(msg) => SourceError::Synthesis(format!(
				"Cannot generate audio for {:02}:{:02}:{:02}: {}",
				min.utc.hour, min.utc.min, second, msg
			)),
			e => e,
		})
	}

	fn layer_second(&mut self, min: &Minute, second: usize) -> Result<(), SourceError> {
		self.write_minute_mark(min, second)?;
		self.write_tick(min, second)?;
		self.write_tone(min, second)?;
		self.write_time_code(min, second)?;
		self.write_announcement(second)
	}

	/// The 800 ms minute mark on second 0: 1500 Hz at the top of the hour, 1000 Hz
	/// otherwise.
	fn write_minute_mark(&mut self, min: &Minute, second: usize) -> Result<(), SourceError> {
		if second != 0 {
			return Ok(());
		}

		let freq = if min.utc.min == 0 { 1500.0 } else { 1000.0 };
		self.sine.set_amplitude_dbfs(0.0);
		self.sine.set_freq(freq);
		self.sine.set_fade_in(MINUTE_FADE, SILENT_DBFS);
		self.sine.set_fade_out(MINUTE_FADE, SILENT_DBFS);
		let end = self.ms(800);
		mix_from(&mut self.sine, &mut self.sec_buf[..end], &mut self.mix_buf)?;
		Ok(())
	}

	/// The 5 ms second tick, plus the DUT1 double tick at 100 ms on signalling seconds.
	///
	/// No tick on second 0 (minute mark), second 29, or second 59 on (markers P3/P6 and
	/// the leap second). Positive DUT1 doubles seconds 1 through |DUT1|, negative DUT1
	/// seconds 9 through 8+|DUT1|, |DUT1| clamped to 8 either way.
	fn write_tick(&mut self, min: &Minute, second: usize) -> Result<(), SourceError> {
		if second == 0 || second == 29 || second >= 59 {
			return Ok(());
		}

		self.sine.set_amplitude_dbfs(0.0);
		self.sine.set_freq(1000.0);
		self.sine.set_fade_in(TICK_FADE, SILENT_DBFS);
		self.sine.set_fade_out(TICK_FADE, SILENT_DBFS);
		let end = self.ms(5);
		mix_from(&mut self.sine, &mut self.sec_buf[..end], &mut self.mix_buf)?;

		let mut dut1 = min.dut1;
		if dut1 == 0 {
			return Ok(());
		}
		let mut index = second as i32;
		if dut1 < 0 {
			// The 9th second carries the first tick for a negative DUT1
			index -= 8;
			dut1 = -dut1;
		}
		if dut1 > 8 {
			// Cannot signal more than 0.8 s
			dut1 = 8;
		}
		if index <= 0 || dut1 < index {
			return Ok(());
		}

		self.sine.set_fade_in(TICK_FADE, SILENT_DBFS);
		self.sine.set_fade_out(TICK_FADE, SILENT_DBFS);
		let (start, end) = (self.ms(100), self.ms(105));
		mix_from(&mut self.sine, &mut self.sec_buf[start..end], &mut self.mix_buf)?;
		Ok(())
	}

	/// The standard audio tone, seconds 1 through 44.
	///
	/// Minute 2 carries the 440 Hz standard except during the 00:00 hour; other even
	/// minutes carry 500 Hz and odd minutes 600 Hz.
	fn write_tone(&mut self, min: &Minute, second: usize) -> Result<(), SourceError> {
		if second == 0 || second >= 45 {
			return Ok(());
		}

		let freq = if min.utc.min == 2 && min.utc.hour != 0 {
			440.0
		} else if min.utc.min % 2 == 0 {
			500.0
		} else {
			600.0
		};
		self.sine.set_amplitude_dbfs(TONE_DBFS);
		self.sine.set_freq(freq);
		self.sine.set_fade_in(TONE_FADE, SILENT_DBFS);
		self.sine.set_fade_out(TONE_FADE, SILENT_DBFS);
		let (start, end) = (self.ms(30), self.ms(990));
		mix_from(&mut self.sine, &mut self.sec_buf[start..end], &mut self.mix_buf)?;
		Ok(())
	}

	/// One symbol of the time code on the 100 Hz sub-carrier.
	///
	/// The symbol is carried by how long the sub-carrier stays at the high level before
	/// stepping down: 200 ms for a zero, 500 ms for a one, 800 ms for a marker. The step
	/// itself is a 10 ms fade between the levels.
	fn write_time_code(&mut self, min: &Minute, second: usize) -> Result<(), SourceError> {
		let reduce_at = match min.bits[second] {
			Bit::Zero => self.ms(200),
			Bit::One => self.ms(500),
			Bit::Marker => self.ms(800),
			Bit::Silence => return Ok(()),
		};

		self.sine.set_amplitude_dbfs(CODE_HIGH_DBFS);
		self.sine.set_freq(100.0);
		self.sine.set_fade_in(CODE_FADE, SILENT_DBFS);
		self.sine.set_fade_out(CODE_REDUCE_FADE, CODE_LOW_DBFS);
		let (start, end) = (self.ms(30), self.ms(990));
		mix_from(&mut self.sine, &mut self.sec_buf[start..reduce_at], &mut self.mix_buf)?;

		self.sine.set_amplitude_dbfs(CODE_LOW_DBFS);
		self.sine.set_fade_out(CODE_FADE, SILENT_DBFS);
		mix_from(&mut self.sine, &mut self.sec_buf[reduce_at..end], &mut self.mix_buf)?;
		Ok(())
	}

	/// The voice announcement, beginning 52.5 seconds into the minute.
	///
	/// The announcer tracks how much of the utterance has been consumed; when the stream
	/// starts mid-minute the difference is skipped so the words still land at their
	/// broadcast positions.
	fn write_announcement(&mut self, second: usize) -> Result<(), SourceError> {
		if second < 52 {
			return Ok(());
		}
		let start = if second == 52 { self.ms(500) } else { 0 };

		// Utterance samples that lie before this second's start
		let expected = second as i64 * self.sample_rate as i64 - self.ms(ANNOUNCE_AT_MS) as i64;
		let skip = expected - self.announcer_offset as i64;
		if skip > 0 {
			self.announcer.skip(skip as usize);
			self.announcer_offset += skip as usize;
		}

		let n = mix_from(&mut self.announcer, &mut self.sec_buf[start..], &mut self.mix_buf)?;
		self.announcer_offset += n;
		Ok(())
	}
}

impl<A: Announce> Source for Composer<A> {
	fn read(&mut self, buf: &mut [f32]) -> Result<usize, SourceError> {
		let amplitude = self.amplitude as f32;
		let rate = self.sample_rate;

		let mut n = 0;
		while n < buf.len() {
			if self.samples_read == 0 {
				match self.minutes.recv() {
					Ok(min) => self.begin_minute(min)?,
					Err(_) => {
						return if n > 0 {
							Ok(n)
						} else {
							Err(SourceError::Exhausted)
						}
					}
				}
			}
			let min = self.current()?;

			// Copy up to the end of the current second or the caller's buffer
			let pos = self.samples_read % rate;
			let take = (buf.len() - n).min(rate - pos);
			for (out, s) in buf[n..n + take].iter_mut().zip(&self.sec_buf[pos..pos + take]) {
				*out = s * amplitude;
			}
			n += take;
			self.samples_read += take;

			if self.samples_read == (min.last_second as usize + 1) * rate {
				// Minute complete; the next iteration pulls a fresh one
				self.samples_read = 0;
			} else if self.samples_read % rate == 0 {
				self.render_second(self.samples_read / rate)?;
			}
		}

		Ok(buf.len())
	}

	fn set_amplitude_dbfs(&mut self, dbfs: f64) {
		self.amplitude = dbfs_to_linear(dbfs);
	}

	fn amplitude(&self) -> f64 {
		self.amplitude
	}
}
