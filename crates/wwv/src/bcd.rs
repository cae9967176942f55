//! Binary coded decimal encoding for digital time codes.
//!
//! A time code assigns each transmitted second one symbol: a zero bit, a one bit, a
//! position marker, or nothing at all. The numeric parts of the code are classic weighted
//! BCD: a value like 38 is sent as weighted bits `8*0 + 4*0 + 2*0 + 1*1` for the ones
//! digit and `40*0 + 20*1 + 10*1` for the tens.
//!
//! One symbol occupies one element of the output buffer rather than one bit. That wastes
//! space but keeps the output directly indexable by second number and able to carry the
//! marker and silence symbols alongside plain bits.
//!
//! # Examples
//!
//! ```
//! # use wwv::bcd::{Bit, BcdEncoder, FieldDef};
//! let encoder = BcdEncoder::new(vec![
//! 	FieldDef::new("ones", &[1, 2, 4, 8]),
//! 	FieldDef::new("tens", &[10, 20, 40]),
//! ]).unwrap();
//!
//! let mut out = [Bit::Silence; 7];
//! encoder.encode(&mut out, &[5, 30]).unwrap();
//! assert_eq!(out, [
//! 	Bit::One, Bit::Zero, Bit::One, Bit::Zero, // 5 = 1 + 4
//! 	Bit::One, Bit::One, Bit::Zero,            // 30 = 10 + 20
//! ]);
//! ```

use std::{error, fmt};

/// One symbol of a digital time code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bit {
	/// Binary zero.
	Zero,
	/// Binary one.
	One,
	/// Position marker.
	Marker,
	/// Nothing is transmitted on this second.
	Silence,
}

/// The encoding of a single value: a label for error reporting and its bit weights.
///
/// Weights must be non-negative, and the non-zero weights sorted ascending. A zero weight
/// marks a placeholder position: it consumes one output element but the encoder never
/// writes to it, so callers may pre-seed such positions with markers or silence.
///
/// Valid weights: `[1, 2, 4, 8, 0, 10, 20, 40, 80]`. Invalid: `[2, 8, 1, 4]`.
pub struct FieldDef {
	label: &'static str,
	weights: &'static [u16],
	max: u16,
}

impl FieldDef {
	/// Create a field definition. The field's maximum value is the sum of its weights.
	pub fn new(label: &'static str, weights: &'static [u16]) -> FieldDef {
		FieldDef {
			label,
			weights,
			max: weights.iter().sum(),
		}
	}
}

/// The error type for constructing a [`BcdEncoder`].
#[cfg_attr(test, derive(PartialEq))]
pub enum SchemaError {
	/// A field's non-zero weights were not sorted ascending. The field label is the
	/// payload.
	UnsortedWeights(&'static str),
}

impl fmt::Display for SchemaError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SchemaError::UnsortedWeights(label) => {
				write!(f, "Weights must be sorted in ascending order for field {}", label)
			}
		}
	}
}

impl fmt::Debug for SchemaError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

impl error::Error for SchemaError {}

/// The error type for [`BcdEncoder::encode`].
#[cfg_attr(test, derive(PartialEq))]
pub enum EncodeError {
	/// The number of values does not match the number of fields.
	ValueCountMismatch(usize, usize),
	/// The output buffer is shorter than the encoded size.
	BufferTooSmall(usize, usize),
	/// A value exceeds its field's maximum. The payload carries the field label, the
	/// value, and the maximum.
	ValueTooLarge(&'static str, u16, u16),
}

impl fmt::Display for EncodeError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			EncodeError::ValueCountMismatch(values, fields) => {
				write!(f, "Cannot encode {} values into {} fields", values, fields)
			}
			EncodeError::BufferTooSmall(needed, got) => {
				write!(f, "The encoded output is {} symbols, but the buffer only holds {}", needed, got)
			}
			EncodeError::ValueTooLarge(label, value, max) => {
				write!(f, "The value {} is too large for field {} (max {})", value, label, max)
			}
		}
	}
}

impl fmt::Debug for EncodeError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

impl error::Error for EncodeError {}

/// Encodes a list of values into a buffer of [`Bit`] symbols, one field per value.
pub struct BcdEncoder {
	fields: Vec<FieldDef>,
	encoded_len: usize,
}

impl BcdEncoder {
	/// Create an encoder over the given fields.
	///
	/// # Errors
	///
	/// Returns [`SchemaError::UnsortedWeights`] if any field's non-zero weights are not
	/// sorted ascending.
	pub fn new(fields: Vec<FieldDef>) -> Result<BcdEncoder, SchemaError> {
		let mut encoded_len = 0;
		for field in &fields {
			encoded_len += field.weights.len();
			let mut last = 0;
			for &w in field.weights {
				if w == 0 {
					continue;
				}
				if w < last {
					return Err(SchemaError::UnsortedWeights(field.label));
				}
				last = w;
			}
		}

		Ok(BcdEncoder { fields, encoded_len })
	}

	/// Total number of output symbols `encode` writes, counting placeholder positions.
	pub fn encoded_len(&self) -> usize {
		self.encoded_len
	}

	/// Encode one value per field into `out`, starting at index 0.
	///
	/// Greedy highest-weight-first subtraction; exact because non-zero weights ascend.
	/// Placeholder (zero-weight) positions are left untouched.
	///
	/// # Errors
	///
	/// Returns an [`EncodeError`] if the value count differs from the field count, `out`
	/// is shorter than [`encoded_len`](BcdEncoder::encoded_len), or a value exceeds its
	/// field's maximum.
	pub fn encode(&self, out: &mut [Bit], values: &[u16]) -> Result<(), EncodeError> {
		if values.len() != self.fields.len() {
			return Err(EncodeError::ValueCountMismatch(values.len(), self.fields.len()));
		}
		if out.len() < self.encoded_len {
			return Err(EncodeError::BufferTooSmall(self.encoded_len, out.len()));
		}

		let mut seek = 0;
		for (field, &value) in self.fields.iter().zip(values) {
			if value > field.max {
				return Err(EncodeError::ValueTooLarge(field.label, value, field.max));
			}

			let mut v = value;
			for (i, &w) in field.weights.iter().enumerate().rev() {
				if w == 0 {
					continue;
				}
				if v >= w {
					v -= w;
					out[seek + i] = Bit::One;
				} else {
					out[seek + i] = Bit::Zero;
				}
			}
			seek += field.weights.len();
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn schema_test() {
		assert!(BcdEncoder::new(vec![FieldDef::new("ok", &[1, 2, 4, 8, 0, 10, 20])]).is_ok());
		assert!(BcdEncoder::new(vec![FieldDef::new("empty", &[0])]).is_ok());
		assert_eq!(
			BcdEncoder::new(vec![FieldDef::new("bad", &[2, 1])]).err(),
			Some(SchemaError::UnsortedWeights("bad"))
		);
		// Zero weights may appear anywhere without breaking the ordering rule
		assert!(BcdEncoder::new(vec![FieldDef::new("gaps", &[1, 2, 0, 4, 8])]).is_ok());
	}

	#[test]
	fn encoded_len_test() {
		let encoder = BcdEncoder::new(vec![
			FieldDef::new("a", &[1, 2, 4, 8, 0]),
			FieldDef::new("b", &[10, 20, 40]),
			FieldDef::new("c", &[0]),
		])
		.unwrap();
		assert_eq!(encoder.encoded_len(), 9);
	}

	#[test]
	fn encode_test() {
		let encoder = BcdEncoder::new(vec![
			FieldDef::new("ones", &[1, 2, 4, 8]),
			FieldDef::new("tens", &[10, 20, 40]),
		])
		.unwrap();

		let mut out = [Bit::Silence; 7];
		encoder.encode(&mut out, &[5, 30]).unwrap();
		assert_eq!(
			out,
			[Bit::One, Bit::Zero, Bit::One, Bit::Zero, Bit::One, Bit::One, Bit::Zero]
		);

		encoder.encode(&mut out, &[9, 0]).unwrap();
		assert_eq!(
			out,
			[Bit::One, Bit::Zero, Bit::Zero, Bit::One, Bit::Zero, Bit::Zero, Bit::Zero]
		);

		// Maximum values saturate every bit
		encoder.encode(&mut out, &[15, 70]).unwrap();
		assert_eq!(out, [Bit::One; 7]);
	}

	#[test]
	fn encode_preserves_placeholders_test() {
		let encoder = BcdEncoder::new(vec![
			FieldDef::new("marker", &[0]),
			FieldDef::new("value", &[1, 2, 0, 4]),
		])
		.unwrap();

		let mut out = [Bit::Silence; 5];
		out[0] = Bit::Marker;
		out[3] = Bit::Marker;
		encoder.encode(&mut out, &[0, 7]).unwrap();
		assert_eq!(out, [Bit::Marker, Bit::One, Bit::One, Bit::Marker, Bit::One]);
	}

	#[test]
	fn encode_error_test() {
		let encoder = BcdEncoder::new(vec![FieldDef::new("v", &[1, 2, 4])]).unwrap();
		let mut out = [Bit::Silence; 3];

		assert_eq!(
			encoder.encode(&mut out, &[1, 2]).err(),
			Some(EncodeError::ValueCountMismatch(2, 1))
		);
		assert_eq!(
			encoder.encode(&mut out[..2], &[1]).err(),
			Some(EncodeError::BufferTooSmall(3, 2))
		);
		assert_eq!(
			encoder.encode(&mut out, &[8]).err(),
			Some(EncodeError::ValueTooLarge("v", 8, 7))
		);
	}
}
