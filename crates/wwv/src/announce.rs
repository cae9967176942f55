//! The spoken time announcement.
//!
//! Each minute, starting 52.5 seconds in, the station announces the upcoming minute:
//! "At the tone, fifteen hours, four minutes, Coordinated Universal Time." The utterance
//! is spliced together from pre-recorded clips, with fixed pauses between the minutes
//! phrase and "Coordinated Universal Time".
//!
//! Clips are raw 16-bit signed little-endian PCM mono at the session sample rate, stored
//! one per file with a fixed 44-byte header that is skipped on load.

use audio::{dbfs_to_linear, Source, SourceError};
use clock::UtcTime;
use std::path::Path;
use std::{error, fmt, fs};

/// Length of the header skipped at the start of every clip file.
const HEADER_LEN: usize = 44;

/// Pause between "... hours" and the minutes phrase, in milliseconds.
const PAUSE_AFTER_HOURS_MS: usize = 100;
/// Pause between "... minutes" and "Coordinated Universal Time", in milliseconds.
const PAUSE_BEFORE_UTC_MS: usize = 800;

/// The composer's view of an announcer: a [`Source`] whose utterance can be retargeted to
/// a new time and skipped into with sample accuracy.
pub trait Announce: Source {
	/// Assemble the utterance for the given time and rewind to its start.
	fn set_time(&mut self, t: UtcTime);

	/// Advance the read position by `n` samples, possibly past the end.
	fn skip(&mut self, n: usize);
}

/// The error type for loading voice clips.
#[cfg_attr(test, derive(PartialEq))]
pub enum AssetError {
	/// A clip file could not be read. The payload carries the path and the reason.
	Unreadable(String, String),
	/// A clip file is shorter than its header.
	Truncated(String),
}

impl fmt::Display for AssetError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AssetError::Unreadable(path, reason) => {
				write!(f, "Cannot read voice clip {}: {}", path, reason)
			}
			AssetError::Truncated(path) => write!(f, "Voice clip {} is truncated", path),
		}
	}
}

impl fmt::Debug for AssetError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

impl error::Error for AssetError {}

/// The fixed set of voice clips an announcer speaks from.
pub struct VoiceClips {
	/// "At the tone,"
	pub at_the_tone: Vec<f32>,
	/// "hour" (spoken after one)
	pub hour: Vec<f32>,
	/// "hours"
	pub hours: Vec<f32>,
	/// "minute" (spoken after one)
	pub minute: Vec<f32>,
	/// "minutes"
	pub minutes: Vec<f32>,
	/// "Coordinated Universal Time"
	pub utc: Vec<f32>,
	/// Spoken numbers zero through fifty-nine, used for both hours and minutes
	pub numbers: Vec<Vec<f32>>,
}

impl VoiceClips {
	/// Load all 66 clips from a directory.
	///
	/// The directory must contain `att.wav`, `hour.wav`, `hours.wav`, `minute.wav`,
	/// `minutes.wav`, `utc.wav`, and `0.wav` through `59.wav`.
	///
	/// # Errors
	///
	/// Returns an [`AssetError`] if any clip is missing, unreadable, or shorter than its
	/// header.
	pub fn from_dir(dir: &Path) -> Result<VoiceClips, AssetError> {
		Ok(VoiceClips {
			at_the_tone: read_clip(&dir.join("att.wav"))?,
			hour: read_clip(&dir.join("hour.wav"))?,
			hours: read_clip(&dir.join("hours.wav"))?,
			minute: read_clip(&dir.join("minute.wav"))?,
			minutes: read_clip(&dir.join("minutes.wav"))?,
			utc: read_clip(&dir.join("utc.wav"))?,
			numbers: (0..60)
				.map(|n| read_clip(&dir.join(format!("{}.wav", n))))
				.collect::<Result<_, _>>()?,
		})
	}
}

/// Load one clip file into normalized float samples.
fn read_clip(path: &Path) -> Result<Vec<f32>, AssetError> {
	let bytes = fs::read(path)
		.map_err(|e| AssetError::Unreadable(path.display().to_string(), e.to_string()))?;
	let data = bytes
		.get(HEADER_LEN..)
		.ok_or_else(|| AssetError::Truncated(path.display().to_string()))?;

	Ok(data
		.chunks_exact(2)
		.map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 / 32768.0)
		.collect())
}

/// Announces the time from a set of voice clips.
///
/// Set the target time with [`set_time`](Announce::set_time), then read the audio. Once
/// the utterance has been read completely, reads return silence indefinitely until the
/// next `set_time`, which also discards whatever was left of the previous utterance.
pub struct WaveAnnouncer {
	amplitude: f64,
	clips: VoiceClips,
	utterance: Vec<f32>,
	offset: usize,
	sample_rate: usize,
}

impl WaveAnnouncer {
	/// Create an announcer over pre-loaded clips.
	pub fn new(clips: VoiceClips, amplitude_dbfs: f64, sample_rate: usize) -> WaveAnnouncer {
		WaveAnnouncer {
			amplitude: dbfs_to_linear(amplitude_dbfs),
			clips,
			utterance: Vec::new(),
			offset: 0,
			sample_rate,
		}
	}

	/// Create an announcer loading its clips from a directory.
	///
	/// # Errors
	///
	/// Returns an [`AssetError`] if any clip is missing, unreadable, or truncated.
	pub fn from_dir(dir: &Path, amplitude_dbfs: f64, sample_rate: usize) -> Result<WaveAnnouncer, AssetError> {
		Ok(WaveAnnouncer::new(VoiceClips::from_dir(dir)?, amplitude_dbfs, sample_rate))
	}
}

impl Announce for WaveAnnouncer {
	fn set_time(&mut self, t: UtcTime) {
		let clips = &self.clips;
		let hours = if t.hour == 1 { &clips.hour } else { &clips.hours };
		let minutes = if t.min == 1 { &clips.minute } else { &clips.minutes };
		let number_h = &clips.numbers[t.hour as usize];
		let number_m = &clips.numbers[t.min as usize];
		let pause_hours = PAUSE_AFTER_HOURS_MS * self.sample_rate / 1000;
		let pause_utc = PAUSE_BEFORE_UTC_MS * self.sample_rate / 1000;

		let len = clips.at_the_tone.len()
			+ number_h.len()
			+ hours.len()
			+ pause_hours
			+ number_m.len()
			+ minutes.len()
			+ pause_utc
			+ clips.utc.len();
		let mut utterance = vec![0.0; len];

		let mut i = 0;
		for (clip, pause) in [
			(&clips.at_the_tone, 0),
			(number_h, 0),
			(hours, pause_hours),
			(number_m, 0),
			(minutes, pause_utc),
			(&clips.utc, 0),
		] {
			utterance[i..i + clip.len()].copy_from_slice(clip);
			i += clip.len() + pause;
		}

		self.utterance = utterance;
		self.offset = 0;
	}

	fn skip(&mut self, n: usize) {
		self.offset += n;
	}
}

impl Source for WaveAnnouncer {
	fn read(&mut self, buf: &mut [f32]) -> Result<usize, SourceError> {
		let amplitude = self.amplitude as f32;
		for sample in buf.iter_mut() {
			match self.utterance.get(self.offset) {
				Some(&v) => {
					*sample = v * amplitude;
					self.offset += 1;
				}
				None => *sample = 0.0,
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
