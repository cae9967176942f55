//! Additive mixing of child sources.

use crate::{dbfs_to_linear, Source, SourceError};

/// Mixes several child sources into one.
///
/// Every child is mixed at the mixer's amplitude; set each child's own amplitude to
/// balance them against each other. A child that writes fewer samples than requested has
/// the unwritten tail treated as silence for that read.
pub struct Mixer {
	amplitude: f64,
	sources: Vec<Box<dyn Source + Send>>,
	scratch: Vec<f32>,
}

impl Mixer {
	/// Create a mixer over the given child sources.
	pub fn new(amplitude_dbfs: f64, sources: Vec<Box<dyn Source + Send>>) -> Mixer {
		Mixer {
			amplitude: dbfs_to_linear(amplitude_dbfs),
			sources,
			scratch: Vec::new(),
		}
	}
}

impl Source for Mixer {
	fn read(&mut self, buf: &mut [f32]) -> Result<usize, SourceError> {
		// Erase whatever the caller had in the buffer before accumulating
		buf.fill(0.0);
		if self.scratch.len() < buf.len() {
			self.scratch.resize(buf.len(), 0.0);
		}

		let amplitude = self.amplitude as f32;
		for source in self.sources.iter_mut() {
			let scratch = &mut self.scratch[..buf.len()];
			let n = source.read(scratch)?;
			// Silence the unwritten tail so stale samples aren't mixed twice
			scratch[n..].fill(0.0);
			for (out, s) in buf.iter_mut().zip(scratch.iter()) {
				*out += s * amplitude;
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

#[cfg(test)]
mod tests {
	use super::*;

	/// Emits a constant value, optionally cutting off after a set number of samples.
	struct Steady {
		value: f32,
		remaining: Option<usize>,
	}

	impl Source for Steady {
		fn read(&mut self, buf: &mut [f32]) -> Result<usize, SourceError> {
			let n = match self.remaining.as_mut() {
				Some(r) => {
					let n = buf.len().min(*r);
					*r -= n;
					n
				}
				None => buf.len(),
			};
			buf[..n].fill(self.value);
			Ok(n)
		}

		fn set_amplitude_dbfs(&mut self, _dbfs: f64) {}

		fn amplitude(&self) -> f64 {
			self.value as f64
		}
	}

	#[test]
	fn mix_test() {
		let a = Steady { value: 0.25, remaining: None };
		let b = Steady { value: 0.5, remaining: None };
		let mut mixer = Mixer::new(0.0, vec![Box::new(a), Box::new(b)]);

		let mut buf = vec![9.9f32; 64];
		assert_eq!(mixer.read(&mut buf), Ok(64));
		assert!(buf.iter().all(|&v| (v - 0.75).abs() < 1e-6));
	}

	#[test]
	fn mix_amplitude_test() {
		let a = Steady { value: 0.5, remaining: None };
		let mut mixer = Mixer::new(-20.0, vec![Box::new(a)]);

		let mut buf = vec![0f32; 16];
		mixer.read(&mut buf).unwrap();
		assert!(buf.iter().all(|&v| (v - 0.05).abs() < 1e-6));
	}

	#[test]
	fn short_read_tail_test() {
		// A child that ends mid-buffer contributes silence for the tail
		let a = Steady { value: 0.25, remaining: None };
		let b = Steady { value: 0.5, remaining: Some(10) };
		let mut mixer = Mixer::new(0.0, vec![Box::new(a), Box::new(b)]);

		let mut buf = vec![0f32; 16];
		assert_eq!(mixer.read(&mut buf), Ok(16));
		assert!(buf[..10].iter().all(|&v| (v - 0.75).abs() < 1e-6));
		assert!(buf[10..].iter().all(|&v| (v - 0.25).abs() < 1e-6));
	}
}
