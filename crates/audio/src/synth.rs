//! Sine and white noise oscillators.

use crate::{dbfs_to_linear, Source, SourceError};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use std::f64::consts::TAU;
use std::time::{SystemTime, UNIX_EPOCH};

/// A sine wave generator with one-shot fade envelopes.
///
/// Frequency, amplitude, and fade changes take effect on the next [`read`](Source::read).
/// The oscillator phase is preserved across reads, so consecutive reads produce a
/// continuous waveform.
///
/// Fades apply to a single read and are consumed by it: a fade-in ramps the first samples
/// of the buffer up from a floor amplitude, a fade-out ramps the last samples down to one.
/// They exist to keep pulse boundaries from clicking.
///
/// # Examples
///
/// ```
/// # use audio::{Source, Sine};
/// let mut sine = Sine::new(1000.0, 0.0, 44100);
/// sine.set_fade_in(0.0003, -1000.0);
/// sine.set_fade_out(0.0003, -1000.0);
/// let mut pulse = vec![0f32; 220]; // 5 ms
/// sine.read(&mut pulse).unwrap();
/// ```
pub struct Sine {
	amplitude: f64,
	/// Phase increment per sample, `freq / sample_rate`
	step: f64,
	/// Current phase, ranged [0, 1)
	phase: f64,
	/// Pending fade lengths in samples; zero means no fade
	fade_in: usize,
	fade_out: usize,
	/// Linear amplitude floors the fades ramp from / to
	fade_in_floor: f64,
	fade_out_floor: f64,
	sample_rate: usize,
}

impl Sine {
	/// Create a sine wave generator.
	pub fn new(freq: f64, amplitude_dbfs: f64, sample_rate: usize) -> Sine {
		Sine {
			amplitude: dbfs_to_linear(amplitude_dbfs),
			step: freq / sample_rate as f64,
			phase: 0.0,
			fade_in: 0,
			fade_out: 0,
			fade_in_floor: 0.0,
			fade_out_floor: 0.0,
			sample_rate,
		}
	}

	/// Set the frequency. Takes effect on the next read.
	pub fn set_freq(&mut self, freq: f64) {
		self.step = freq / self.sample_rate as f64;
	}

	/// Configure a fade-in for the next read only.
	///
	/// The first `seconds` of the read ramp linearly from `floor_dbfs` up to the full
	/// amplitude. A floor at or above the current amplitude disables the ramp; -1000 dBFS
	/// is low enough to be inaudible.
	pub fn set_fade_in(&mut self, seconds: f64, floor_dbfs: f64) {
		self.fade_in = (seconds * self.sample_rate as f64) as usize;
		self.fade_in_floor = dbfs_to_linear(floor_dbfs);
	}

	/// Configure a fade-out for the next read only.
	///
	/// The last `seconds` of the read ramp linearly from the full amplitude down to
	/// `floor_dbfs`. A floor at or above the current amplitude disables the ramp.
	pub fn set_fade_out(&mut self, seconds: f64, floor_dbfs: f64) {
		self.fade_out = (seconds * self.sample_rate as f64) as usize;
		self.fade_out_floor = dbfs_to_linear(floor_dbfs);
	}
}

impl Source for Sine {
	fn read(&mut self, buf: &mut [f32]) -> Result<usize, SourceError> {
		let amplitude = self.amplitude;
		let (fade_in, fade_out) = (self.fade_in, self.fade_out);
		let (in_floor, out_floor) = (self.fade_in_floor, self.fade_out_floor);
		// Fades are one-shot; consume them now
		self.fade_in = 0;
		self.fade_out = 0;
		self.fade_in_floor = 0.0;
		self.fade_out_floor = 0.0;

		let len = buf.len();
		for (i, sample) in buf.iter_mut().enumerate() {
			let mut a = amplitude;
			if i < fade_in && a > in_floor {
				a -= (a - in_floor) * (fade_in - i) as f64 / fade_in as f64;
			}
			if i + fade_out >= len && a > out_floor {
				a -= (a - out_floor) * (fade_out + i - len) as f64 / fade_out as f64;
			}

			*sample = ((TAU * self.phase).sin() * a) as f32;
			self.phase = (self.phase + self.step).fract();
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

/// A white noise generator.
///
/// Produces uniform noise in `[0, amplitude)` from a PCG32 stream.
pub struct WhiteNoise {
	amplitude: f64,
	rng: Pcg32,
}

impl WhiteNoise {
	/// Create a white noise generator seeded from the system clock.
	pub fn new(amplitude_dbfs: f64) -> WhiteNoise {
		let seed = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_nanos() as u64)
			.unwrap_or(0x853c49e6748fea9b);
		WhiteNoise::with_seed(amplitude_dbfs, seed)
	}

	/// Create a white noise generator with a fixed seed, for reproducible output.
	pub fn with_seed(amplitude_dbfs: f64, seed: u64) -> WhiteNoise {
		WhiteNoise {
			amplitude: dbfs_to_linear(amplitude_dbfs),
			rng: Pcg32::seed_from_u64(seed),
		}
	}
}

impl Source for WhiteNoise {
	fn read(&mut self, buf: &mut [f32]) -> Result<usize, SourceError> {
		let amplitude = self.amplitude as f32;
		for sample in buf.iter_mut() {
			*sample = self.rng.gen::<f32>() * amplitude;
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

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sine_continuity_test() {
		// Two consecutive reads must produce the same samples as one long read
		let mut split = Sine::new(440.0, 0.0, 44100);
		let mut joined = Sine::new(440.0, 0.0, 44100);

		let mut a = vec![0f32; 200];
		let mut b = vec![0f32; 100];
		joined.read(&mut a).unwrap();
		split.read(&mut b[..]).unwrap();
		assert_eq!(a[..100], b[..]);
		split.read(&mut b[..]).unwrap();
		assert_eq!(a[100..], b[..]);
	}

	#[test]
	fn sine_waveform_test() {
		// 100 Hz at 1000 Hz sampling: a full cycle every 10 samples
		let mut sine = Sine::new(100.0, 0.0, 1000);
		let mut buf = vec![0f32; 20];
		sine.read(&mut buf).unwrap();

		assert_eq!(buf[0], 0.0); // phase starts at zero
		assert!((buf[2] - 0.951).abs() < 0.001); // sin(0.4 pi)
		assert!(buf[..10].iter().zip(&buf[10..]).all(|(a, b)| (a - b).abs() < 1e-5));
		assert!(buf.iter().all(|v| v.abs() <= 1.0));
	}

	#[test]
	fn sine_amplitude_test() {
		// 250 Hz at 1000 Hz sampling lands samples exactly on the waveform peaks
		let mut sine = Sine::new(250.0, -20.0, 1000);
		assert!((sine.amplitude() - 0.1).abs() < 1e-9);

		let mut buf = vec![0f32; 100];
		sine.read(&mut buf).unwrap();
		let peak = buf.iter().fold(0f32, |m, v| m.max(v.abs()));
		assert!((peak - 0.1).abs() < 0.001);

		// Amplitude changes apply to the next read
		sine.set_amplitude_dbfs(0.0);
		sine.read(&mut buf).unwrap();
		let peak = buf.iter().fold(0f32, |m, v| m.max(v.abs()));
		assert!((peak - 1.0).abs() < 0.01);
	}

	#[test]
	fn sine_fade_test() {
		// A fade-in from a very low floor pins the first sample near zero and leaves the
		// last untouched; sample 25 of a 100 Hz wave at 1000 Hz would be at full scale
		let mut faded = Sine::new(100.0, 0.0, 1000);
		faded.set_fade_in(0.05, -1000.0);
		let mut buf = vec![0f32; 100];
		faded.read(&mut buf).unwrap();
		assert!(buf[2].abs() < 0.1); // heavily attenuated early
		assert!((buf[52].abs() - 0.951).abs() < 0.05); // past the ramp

		// Fade-out mirrors it
		let mut faded = Sine::new(100.0, 0.0, 1000);
		faded.set_fade_out(0.05, -1000.0);
		faded.read(&mut buf).unwrap();
		assert!(buf[97].abs() < 0.15);
		assert!((buf[2].abs() - 0.951).abs() < 0.05);

		// Fades are consumed by the read
		let mut again = vec![0f32; 100];
		faded.read(&mut again).unwrap();
		assert!((again[97] - buf[97]).abs() > 0.1);

		// A floor at or above the amplitude is a no-op
		let mut flat = Sine::new(100.0, -20.0, 1000);
		flat.set_fade_in(0.05, 0.0);
		flat.read(&mut buf).unwrap();
		assert!((buf[2].abs() - 0.0951).abs() < 0.005);
	}

	#[test]
	fn white_noise_test() {
		let mut noise = WhiteNoise::with_seed(0.0, 12345);
		let mut buf = vec![0f32; 1000];
		noise.read(&mut buf).unwrap();
		assert!(buf.iter().all(|&v| (0.0..1.0).contains(&v)));
		// Not all equal
		assert!(buf.iter().any(|&v| (v - buf[0]).abs() > 1e-3));

		// Same seed, same stream
		let mut twin = WhiteNoise::with_seed(0.0, 12345);
		let mut other = vec![0f32; 1000];
		twin.read(&mut other).unwrap();
		assert_eq!(buf, other);

		// Amplitude scales the range
		let mut quiet = WhiteNoise::with_seed(-20.0, 12345);
		quiet.read(&mut other).unwrap();
		assert!(other.iter().all(|&v| (0.0..0.11).contains(&v)));
	}
}
