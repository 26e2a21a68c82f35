//! Resolver-driven decoding
//!
//! The decoder walks a compiled [`Resolved`] plan in lock-step with the
//! wire data: the writer schema retained inside the plan dictates what to
//! read, and each consumer's action dictates where (and whether) the value
//! lands on the target. The target is any `&mut dyn Value` — a
//! [`GenericValue`](crate::value::GenericValue), a generated specific
//! layout, or a bare primitive slot.
//!
//! You typically want to use the top-level functions such as
//! [`decode_datum_slice`](crate::decode_datum_slice), but access to this
//! may be necessary for more advanced usage, notably to set configuration
//! parameters meant to prevent DOS:
//! - [`DecoderConfig::max_seq_size`]
//! - [`read::IoSource::max_item_size`]
//!
//! Such usage would go as follows:
//! ```
//! let schema: avro_specific::Schema = r#""long""#.parse().unwrap();
//! let resolved = avro_specific::resolve::Resolved::new(&schema, &schema).unwrap();
//!
//! let mut source = avro_specific::de::read::IoSource::new(&[6u8][..]);
//! source.max_item_size = 32 * 1024;
//!
//! let mut config = avro_specific::de::DecoderConfig::default();
//! config.max_seq_size = 1_000_000;
//!
//! let mut state = avro_specific::de::DecoderState::with_config(source, config);
//! let mut slot: i64 = 0;
//! state.decode(&resolved, &mut slot).unwrap();
//! assert_eq!(slot, 3);
//! ```

mod error;
pub mod read;

pub use error::{DeError, DeErrorKind};

use read::{IoSource, SliceSource, WireRead};

use crate::{
	resolve::{Action, Consumer, ConsumerKey, FieldAction, NumericDest, Resolved, TextDest},
	schema::self_referential::SchemaNode,
	value::Value,
};

use std::num::NonZeroUsize;

/// Limits applied while decoding, to keep malformed data from driving
/// unbounded work
#[derive(Clone, Debug)]
pub struct DecoderConfig {
	/// If a sequence turns out to be longer than this during decoding, we
	/// will throw an error instead.
	///
	/// This is to avoid running into an infinite loop at decode time.
	/// Default for this is `1 000 000 000` (~1s CPU time)
	///
	/// Note that if you're decoding from an `impl BufRead` instead of a
	/// slice (consequently using [`IoSource`]), there's an additional
	/// similar parameter [there](IoSource::max_item_size) that you may
	/// want to configure.
	pub max_seq_size: usize,
	/// If a datum turns out to be deeper than this during decoding, we
	/// will throw an error instead.
	///
	/// This is to avoid running into a stack overflow at decode time.
	/// Default for this is `64`.
	pub allowed_depth: usize,
}

impl Default for DecoderConfig {
	fn default() -> Self {
		Self {
			max_seq_size: 1_000_000_000,
			allowed_depth: 64,
		}
	}
}

/// All state necessary for decoding: the input plus a [`DecoderConfig`]
pub struct DecoderState<R> {
	pub(crate) reader: R,
	config: DecoderConfig,
}

impl<R> DecoderState<R> {
	/// Construct a `DecoderState` with default configuration
	pub fn new(reader: R) -> Self {
		Self::with_config(reader, DecoderConfig::default())
	}

	/// Construct a `DecoderState` with the given configuration
	pub fn with_config(reader: R, config: DecoderConfig) -> Self {
		Self { reader, config }
	}

	/// Turn the `DecoderState` back into the input it was built from
	pub fn into_reader(self) -> R {
		self.reader
	}

	/// The configuration this `DecoderState` was built with
	pub fn config(&self) -> &DecoderConfig {
		&self.config
	}
}

impl<'a> DecoderState<SliceSource<'a>> {
	/// Construct a `DecoderState` decoding from a byte slice
	pub fn from_slice(slice: &'a [u8]) -> Self {
		Self::new(SliceSource::new(slice))
	}
}

impl<R: std::io::BufRead> DecoderState<IoSource<R>> {
	/// Construct a `DecoderState` decoding from an
	/// [`impl BufRead`](std::io::BufRead)
	///
	/// Prefer [`DecoderState::from_slice`] if you have a slice: it is more
	/// performant.
	pub fn from_reader(reader: R) -> Self {
		Self::new(IoSource::new(reader))
	}
}

impl<R> std::ops::Deref for DecoderState<R> {
	type Target = R;
	fn deref(&self) -> &Self::Target {
		&self.reader
	}
}

impl<R> std::ops::DerefMut for DecoderState<R> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.reader
	}
}

impl<R: WireRead> DecoderState<R> {
	/// Run the decode plan `resolved` against this state's input,
	/// depositing the decoded value into `target`
	pub fn decode(
		&mut self,
		resolved: &Resolved<'_>,
		target: &mut dyn Value,
	) -> Result<(), DeError> {
		let depth = AllowedDepth::new(self.config.allowed_depth);
		decode_consumer(self, resolved, resolved.root_key(), target, depth)
	}
}

/// Allowed additional depth of the decoding
///
/// This is decremented as we advance in depth to prevent stack overflow
#[derive(Clone, Copy)]
struct AllowedDepth {
	allowed_additional_depth: usize,
}

impl AllowedDepth {
	fn new(allowed_depth: usize) -> Self {
		Self {
			allowed_additional_depth: allowed_depth,
		}
	}

	fn dec(self) -> Result<Self, DeError> {
		match self.allowed_additional_depth.checked_sub(1) {
			Some(allowed_additional_depth) => Ok(Self {
				allowed_additional_depth,
			}),
			None => Err(DeError::new(
				"Decoding recursivity limit reached (stack overflow prevention)",
			)),
		}
	}
}

fn decode_consumer<R: WireRead>(
	state: &mut DecoderState<R>,
	resolved: &Resolved<'_>,
	key: ConsumerKey,
	target: &mut dyn Value,
	depth: AllowedDepth,
) -> Result<(), DeError> {
	let consumer = resolved
		.consumer(key)
		.ok_or_else(|| DeError::new("Decode plan references a consumer that was never completed"))?;
	match consumer.reader_branch {
		Some(branch) => {
			// The reader side wraps this position in a union: select the
			// branch and narrow to its storage before delegating.
			target.set_branch(branch).map_err(DeError::value)?;
			if matches!(consumer.action, Action::Null) {
				// null carries no payload and needs no storage
				Ok(())
			} else {
				let branch_target = target.current_branch_mut().map_err(DeError::value)?;
				execute_action(state, resolved, consumer, branch_target, depth)
			}
		}
		None => execute_action(state, resolved, consumer, target, depth),
	}
}

fn execute_action<R: WireRead>(
	state: &mut DecoderState<R>,
	resolved: &Resolved<'_>,
	consumer: &Consumer<'_>,
	target: &mut dyn Value,
	depth: AllowedDepth,
) -> Result<(), DeError> {
	match &consumer.action {
		Action::Null => Ok(()),
		Action::Boolean => {
			let [byte] = state.reader.fixed_buf::<1>()?;
			let value = match byte {
				0 => false,
				1 => true,
				other => {
					return Err(DeError::custom(format_args!(
						"Invalid byte value {other} when decoding boolean"
					)))
				}
			};
			target.set_boolean(value).map_err(DeError::value)
		}
		Action::Int(dest) => {
			let value = state.reader.varint_int()?;
			match dest {
				NumericDest::Int => target.set_int(value),
				NumericDest::Long => target.set_long(value.into()),
				NumericDest::Float => target.set_float(value as f32),
				NumericDest::Double => target.set_double(value.into()),
			}
			.map_err(DeError::value)
		}
		Action::Long(dest) => {
			let value = state.reader.varint_long()?;
			match dest {
				NumericDest::Long => target.set_long(value),
				NumericDest::Float => target.set_float(value as f32),
				NumericDest::Double => target.set_double(value as f64),
				NumericDest::Int => {
					return Err(DeError::new(
						"Decode plan carries an impossible numeric destination",
					))
				}
			}
			.map_err(DeError::value)
		}
		Action::Float(dest) => {
			let value = f32::from_le_bytes(state.reader.fixed_buf()?);
			match dest {
				NumericDest::Float => target.set_float(value),
				NumericDest::Double => target.set_double(value.into()),
				NumericDest::Int | NumericDest::Long => {
					return Err(DeError::new(
						"Decode plan carries an impossible numeric destination",
					))
				}
			}
			.map_err(DeError::value)
		}
		Action::Double => {
			let value = f64::from_le_bytes(state.reader.fixed_buf()?);
			target.set_double(value).map_err(DeError::value)
		}
		Action::Bytes(dest) | Action::String(dest) => {
			let n = read_len(state)?;
			match dest {
				TextDest::Bytes => state.reader.delimited(n, |bytes: &[u8]| {
					target.set_bytes(bytes).map_err(DeError::value)
				}),
				TextDest::String => state.reader.delimited(n, |bytes: &[u8]| {
					let s = std::str::from_utf8(bytes)
						.map_err(|e| DeError::custom(format_args!("String is not valid UTF-8: {e}")))?;
					target.set_string(s).map_err(DeError::value)
				}),
			}
		}
		Action::Fixed { size } => state.reader.delimited(*size, |bytes: &[u8]| {
			target.set_fixed(bytes).map_err(DeError::value)
		}),
		Action::Enum { mapping } => {
			let discriminant = state.reader.varint_long()?;
			let discriminant = usize::try_from(discriminant).map_err(|_| {
				DeError::custom(format_args!("Got negative enum discriminant: {discriminant}"))
			})?;
			match mapping.get(discriminant) {
				Some(Some(reader_index)) => target.set_enum(*reader_index).map_err(DeError::value),
				Some(None) => Err(DeError::custom(format_args!(
					"Writer enum symbol {discriminant} has no counterpart on the reader side"
				))),
				None => Err(DeError::custom(format_args!(
					"Enum discriminant {discriminant} is out of range ({} symbols)",
					mapping.len()
				))),
			}
		}
		Action::Array { items } => {
			let depth = depth.dec()?;
			target.reset().map_err(DeError::value)?;
			let mut blocks = BlockCounter::new();
			while blocks.has_more(state)? {
				let element = target.append().map_err(DeError::value)?;
				decode_consumer(state, resolved, *items, element, depth)?;
			}
			Ok(())
		}
		Action::Map { values } => {
			let depth = depth.dec()?;
			target.reset().map_err(DeError::value)?;
			let mut blocks = BlockCounter::new();
			while blocks.has_more(state)? {
				let key = read_string_key(state)?;
				let (element, _is_new) = target.add(&key).map_err(DeError::value)?;
				decode_consumer(state, resolved, *values, element, depth)?;
			}
			Ok(())
		}
		Action::Record { fields, .. } => {
			let depth = depth.dec()?;
			for field in fields {
				match field {
					FieldAction::Read { index, consumer } => {
						let field_target = target.get_by_index_mut(*index).map_err(DeError::value)?;
						decode_consumer(state, resolved, *consumer, field_target, depth)?;
					}
					FieldAction::Skip { consumer } => {
						let mut discard = ();
						decode_consumer(state, resolved, *consumer, &mut discard, depth)?;
					}
				}
			}
			Ok(())
		}
		Action::WriterUnion { branches } => {
			let discriminant = state.reader.varint_long()?;
			let discriminant = usize::try_from(discriminant).map_err(|_| {
				DeError::custom(format_args!("Got negative union discriminant: {discriminant}"))
			})?;
			match branches.get(discriminant) {
				None => Err(DeError::custom(format_args!(
					"Union discriminant {discriminant} is out of range ({} branches)",
					branches.len()
				))),
				Some(None) => Err(DeError::incompatible_branch(discriminant)),
				Some(Some(branch_key)) => {
					decode_consumer(state, resolved, *branch_key, target, depth.dec()?)
				}
			}
		}
		Action::Skip => skip_node(state, consumer.writer.as_ref(), depth),
	}
}

/// Advance the input past one value of schema `node` without producing
/// anything
///
/// Every byte of the skipped value is consumed, so whatever follows it in
/// the stream (e.g. the next record field) stays correctly aligned.
fn skip_node<R: WireRead>(
	state: &mut DecoderState<R>,
	node: &SchemaNode<'_>,
	depth: AllowedDepth,
) -> Result<(), DeError> {
	match node {
		SchemaNode::Null => Ok(()),
		SchemaNode::Boolean => {
			state.reader.fixed_buf::<1>()?;
			Ok(())
		}
		SchemaNode::Int => {
			state.reader.varint_int()?;
			Ok(())
		}
		SchemaNode::Long => {
			state.reader.varint_long()?;
			Ok(())
		}
		SchemaNode::Float => {
			state.reader.fixed_buf::<4>()?;
			Ok(())
		}
		SchemaNode::Double => {
			state.reader.fixed_buf::<8>()?;
			Ok(())
		}
		SchemaNode::Bytes | SchemaNode::String => {
			let n = read_len(state)?;
			state.reader.skip(n)
		}
		SchemaNode::Fixed(fixed) => state.reader.skip(fixed.size),
		SchemaNode::Enum(_) => {
			state.reader.varint_long()?;
			Ok(())
		}
		SchemaNode::Array(items) => {
			let depth = depth.dec()?;
			let mut blocks = BlockCounter::new();
			while blocks.has_more(state)? {
				skip_node(state, items.as_ref(), depth)?;
			}
			Ok(())
		}
		SchemaNode::Map(values) => {
			let depth = depth.dec()?;
			let mut blocks = BlockCounter::new();
			while blocks.has_more(state)? {
				let n = read_len(state)?;
				state.reader.skip(n)?;
				skip_node(state, values.as_ref(), depth)?;
			}
			Ok(())
		}
		SchemaNode::Union(union) => {
			let discriminant = state.reader.varint_long()?;
			let branch = usize::try_from(discriminant)
				.ok()
				.and_then(|d| union.variants.get(d))
				.ok_or_else(|| {
					DeError::custom(format_args!(
						"Union discriminant {discriminant} is out of range while skipping"
					))
				})?;
			skip_node(state, branch.as_ref(), depth.dec()?)
		}
		SchemaNode::Record(record) => {
			let depth = depth.dec()?;
			for field in &record.fields {
				skip_node(state, field.schema.as_ref(), depth)?;
			}
			Ok(())
		}
	}
}

fn read_len<R: WireRead>(state: &mut DecoderState<R>) -> Result<usize, DeError> {
	let len = state.reader.varint_long()?;
	usize::try_from(len)
		.map_err(|_| DeError::custom(format_args!("Invalid negative length in stream: {len}")))
}

fn read_string_key<R: WireRead>(state: &mut DecoderState<R>) -> Result<String, DeError> {
	let n = read_len(state)?;
	state.reader.delimited(n, |bytes: &[u8]| {
		String::from_utf8(bytes.to_owned()).map_err(|_| DeError::new("Map key is not valid UTF-8"))
	})
}

fn read_block_len<R: WireRead>(state: &mut DecoderState<R>) -> Result<Option<NonZeroUsize>, DeError> {
	let len = state.reader.varint_long()?;
	let res;
	if len < 0 {
		// res = -len, properly handling i64::MIN
		res = u64::from_ne_bytes(len.to_ne_bytes()).wrapping_neg();
		// A negative count is followed by the block's size in bytes; we
		// don't use that value, so drop it to properly advance the input
		state.reader.varint_long()?;
	} else {
		res = len as u64;
	}
	res.try_into()
		.map_err(|e| DeError::custom(format_args!("Invalid sequence length in stream: {e}")))
		.map(NonZeroUsize::new)
}

/// Tracks progress through the block sequence that encodes an array or a
/// map
struct BlockCounter {
	current_block_len: usize,
	n_read: usize,
}

impl BlockCounter {
	fn new() -> Self {
		Self {
			current_block_len: 0,
			n_read: 0,
		}
	}

	fn has_more<R: WireRead>(&mut self, state: &mut DecoderState<R>) -> Result<bool, DeError> {
		self.current_block_len = match self.current_block_len.checked_sub(1) {
			None => {
				let new_len = read_block_len(state)?;
				match new_len {
					None => return Ok(false),
					Some(new_len) => {
						let l = new_len.get();
						let n_read = self.n_read.saturating_add(l);
						if n_read > state.config.max_seq_size {
							return Err(DeError::new(
								"Exceeding max sequence size while decoding",
							));
						}
						self.n_read = n_read;
						l - 1
					}
				}
			}
			Some(new_len) => new_len,
		};
		Ok(true)
	}
}
