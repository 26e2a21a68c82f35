//! Wire-level input for the decode driver
//!
//! The driver needs very little from its input: zig-zag varints,
//! little-endian fixed-width buffers, length-delimited chunks it can look
//! at without keeping, and the ability to drop bytes when skipping
//! writer-only data. [`WireRead`] captures exactly that, with one
//! implementation over byte slices and one over arbitrary
//! [`BufRead`](std::io::BufRead)ers.

use super::DeError;

use {
	integer_encoding::{VarInt, VarIntReader},
	std::io::BufRead,
};

/// What the decode driver reads from
///
/// Implemented by [`SliceSource`] (decoding from memory) and [`IoSource`]
/// (decoding from a buffered reader). The driver is generic over this, so
/// both paths share all decoding logic.
pub trait WireRead {
	/// The next zig-zag varint, decoded as a 64-bit value
	///
	/// Longs, lengths, block counts, and union/enum discriminants are all
	/// encoded this way.
	fn varint_long(&mut self) -> Result<i64, DeError>;

	/// The next zig-zag varint, decoded as a 32-bit value
	fn varint_int(&mut self) -> Result<i32, DeError>;

	/// The next `N` bytes (booleans, floats, doubles)
	fn fixed_buf<const N: usize>(&mut self) -> Result<[u8; N], DeError>;

	/// Hand the next `len` bytes to `consume`
	///
	/// The chunk is only valid for the duration of the call; whoever needs
	/// the data copies it out (typically into a reusable target buffer).
	fn delimited<T, F>(&mut self, len: usize, consume: F) -> Result<T, DeError>
	where
		F: FnOnce(&[u8]) -> Result<T, DeError>;

	/// Drop the next `len` bytes
	fn skip(&mut self, len: usize) -> Result<(), DeError>;
}

/// Decode input over an in-memory byte slice
pub struct SliceSource<'a> {
	bytes: &'a [u8],
	position: usize,
}

impl<'a> SliceSource<'a> {
	/// Wrap `bytes` for decoding
	pub fn new(bytes: &'a [u8]) -> Self {
		Self { bytes, position: 0 }
	}

	/// How many bytes have been consumed so far
	pub fn position(&self) -> usize {
		self.position
	}

	fn take(&mut self, len: usize) -> Result<&'a [u8], DeError> {
		let end = self
			.position
			.checked_add(len)
			.filter(|&end| end <= self.bytes.len())
			.ok_or_else(DeError::unexpected_eof)?;
		let chunk = &self.bytes[self.position..end];
		self.position = end;
		Ok(chunk)
	}
}

impl WireRead for SliceSource<'_> {
	fn varint_long(&mut self) -> Result<i64, DeError> {
		match i64::decode_var(&self.bytes[self.position..]) {
			Some((value, used)) => {
				self.position += used;
				Ok(value)
			}
			None => Err(DeError::new("Truncated or overlong varint in stream")),
		}
	}

	fn varint_int(&mut self) -> Result<i32, DeError> {
		match i32::decode_var(&self.bytes[self.position..]) {
			Some((value, used)) => {
				self.position += used;
				Ok(value)
			}
			None => Err(DeError::new("Truncated or overlong varint in stream")),
		}
	}

	fn fixed_buf<const N: usize>(&mut self) -> Result<[u8; N], DeError> {
		let chunk = self.take(N)?;
		let mut buf = [0u8; N];
		buf.copy_from_slice(chunk);
		Ok(buf)
	}

	fn delimited<T, F>(&mut self, len: usize, consume: F) -> Result<T, DeError>
	where
		F: FnOnce(&[u8]) -> Result<T, DeError>,
	{
		consume(self.take(len)?)
	}

	fn skip(&mut self, len: usize) -> Result<(), DeError> {
		self.take(len).map(drop)
	}
}

/// Decode input over any [`BufRead`](std::io::BufRead)
///
/// Delimited values are served straight out of the reader's buffer when it
/// already holds them whole; otherwise they go through an internal scratch
/// buffer that is reused across values.
pub struct IoSource<R> {
	reader: R,
	scratch: Vec<u8>,
	/// Upper bound on a single value's size (string, bytes, fixed...)
	///
	/// Malformed data could otherwise declare a multi-gigabyte length and
	/// have us allocate it. Default is 256 MB.
	pub max_item_size: usize,
}

impl<R: BufRead> IoSource<R> {
	/// Wrap `reader` for decoding
	///
	/// If you only have an `impl Read`, wrap it in a
	/// [`BufReader`](std::io::BufReader) first.
	pub fn new(reader: R) -> Self {
		Self {
			reader,
			scratch: Vec::new(),
			max_item_size: 256 * 1024 * 1024,
		}
	}
}

impl<R> IoSource<R> {
	/// Consume the `IoSource` and return the inner reader
	pub fn into_inner(self) -> R {
		self.reader
	}
}

impl<R: BufRead> WireRead for IoSource<R> {
	fn varint_long(&mut self) -> Result<i64, DeError> {
		self.reader.read_varint().map_err(DeError::io)
	}

	fn varint_int(&mut self) -> Result<i32, DeError> {
		self.reader.read_varint().map_err(DeError::io)
	}

	fn fixed_buf<const N: usize>(&mut self) -> Result<[u8; N], DeError> {
		let mut buf = [0u8; N];
		self.reader.read_exact(&mut buf).map_err(DeError::io)?;
		Ok(buf)
	}

	fn delimited<T, F>(&mut self, len: usize, consume: F) -> Result<T, DeError>
	where
		F: FnOnce(&[u8]) -> Result<T, DeError>,
	{
		if len > self.max_item_size {
			return Err(DeError::custom(format_args!(
				"Value of {len} bytes exceeds the configured limit of {} - \
					this is probably due to malformed data",
				self.max_item_size
			)));
		}
		let buffered = self.reader.fill_buf().map_err(DeError::io)?;
		if buffered.len() >= len {
			let value = consume(&buffered[..len])?;
			self.reader.consume(len);
			return Ok(value);
		}
		self.scratch.resize(len, 0);
		self.reader
			.read_exact(self.scratch.as_mut_slice())
			.map_err(DeError::io)?;
		consume(self.scratch.as_slice())
	}

	fn skip(&mut self, mut len: usize) -> Result<(), DeError> {
		// drain straight out of the reader's buffer, refilling as needed
		while len > 0 {
			let buffered = self.reader.fill_buf().map_err(DeError::io)?;
			if buffered.is_empty() {
				return Err(DeError::unexpected_eof());
			}
			let step = buffered.len().min(len);
			self.reader.consume(step);
			len -= step;
		}
		Ok(())
	}
}
