//! Schema-driven encoding
//!
//! The encoder walks a schema and pulls the corresponding data out of any
//! [`Value`] through its getters, writing the wire representation as it
//! goes. There is no resolution on this path: data is always written under
//! its own schema (resolution happens on the decode side).
//!
//! You typically want to use the top-level functions such as
//! [`encode_datum`](crate::encode_datum); [`EncoderState`] is only needed
//! to reuse a writer across encodings.

mod error;

pub use error::SerError;

use crate::{
	schema::self_referential::{NodeRef, SchemaNode},
	value::Value,
	Schema,
};

use {integer_encoding::VarIntWriter, std::io::Write};

/// All state necessary for encoding: just the writer
pub struct EncoderState<W> {
	writer: W,
}

impl<W: Write> EncoderState<W> {
	/// Construct an `EncoderState` writing to `writer`
	pub fn from_writer(writer: W) -> Self {
		Self { writer }
	}

	/// Encode `value` under `schema` into this state's writer
	pub fn encode(&mut self, schema: &Schema, value: &dyn Value) -> Result<(), SerError> {
		self.encode_node(schema.root(), value)
	}

	fn encode_node(&mut self, node: NodeRef<'_>, value: &dyn Value) -> Result<(), SerError> {
		match node.as_ref() {
			SchemaNode::Null => {
				value.get_null().map_err(SerError::value)?;
				Ok(())
			}
			SchemaNode::Boolean => {
				let v = value.get_boolean().map_err(SerError::value)?;
				self.writer.write_all(&[v as u8]).map_err(SerError::io)
			}
			SchemaNode::Int => {
				let v = value.get_int().map_err(SerError::value)?;
				self.write_varint(v)
			}
			SchemaNode::Long => {
				let v = value.get_long().map_err(SerError::value)?;
				self.write_varint(v)
			}
			SchemaNode::Float => {
				let v = value.get_float().map_err(SerError::value)?;
				self.writer
					.write_all(&v.to_le_bytes())
					.map_err(SerError::io)
			}
			SchemaNode::Double => {
				let v = value.get_double().map_err(SerError::value)?;
				self.writer
					.write_all(&v.to_le_bytes())
					.map_err(SerError::io)
			}
			SchemaNode::Bytes => {
				let bytes = value.get_bytes().map_err(SerError::value)?;
				self.write_length_delimited(bytes)
			}
			SchemaNode::String => {
				let s = value.get_string().map_err(SerError::value)?;
				self.write_length_delimited(s.as_bytes())
			}
			SchemaNode::Fixed(fixed) => {
				let bytes = value.get_fixed().map_err(SerError::value)?;
				if bytes.len() != fixed.size {
					return Err(SerError::custom(format_args!(
						"Fixed value for {} has {} bytes, schema requires {}",
						fixed.name.fully_qualified_name(),
						bytes.len(),
						fixed.size
					)));
				}
				self.writer.write_all(bytes).map_err(SerError::io)
			}
			SchemaNode::Enum(enum_) => {
				let symbol = value.get_enum().map_err(SerError::value)?;
				if symbol >= enum_.symbols.len() {
					return Err(SerError::custom(format_args!(
						"Enum symbol index {} is out of range for {} ({} symbols)",
						symbol,
						enum_.name.fully_qualified_name(),
						enum_.symbols.len()
					)));
				}
				self.write_varint(symbol as i64)
			}
			SchemaNode::Array(items) => {
				let n = value.size().map_err(SerError::value)?;
				if n > 0 {
					self.write_varint(n as i64)?;
					for index in 0..n {
						let (element, _) = value.get_by_index(index).map_err(SerError::value)?;
						self.encode_node(*items, element)?;
					}
				}
				self.write_varint(0i64)
			}
			SchemaNode::Map(values) => {
				let n = value.size().map_err(SerError::value)?;
				if n > 0 {
					self.write_varint(n as i64)?;
					for index in 0..n {
						let (element, key) = value.get_by_index(index).map_err(SerError::value)?;
						let key = key.ok_or_else(|| {
							SerError::new("Map value did not report a key for its element")
						})?;
						self.write_length_delimited(key.as_bytes())?;
						self.encode_node(*values, element)?;
					}
				}
				self.write_varint(0i64)
			}
			SchemaNode::Record(record) => {
				for (index, field) in record.fields.iter().enumerate() {
					let (field_value, _) = value.get_by_index(index).map_err(SerError::value)?;
					self.encode_node(field.schema, field_value)?;
				}
				Ok(())
			}
			SchemaNode::Union(union) => {
				let discriminant = value.discriminant().map_err(SerError::value)?;
				let branch = match union.variants.get(discriminant) {
					Some(&branch) => branch,
					None => {
						return Err(SerError::custom(format_args!(
							"Union discriminant {} is out of range ({} branches)",
							discriminant,
							union.variants.len()
						)))
					}
				};
				self.write_varint(discriminant as i64)?;
				match branch.as_ref() {
					// null branches carry no payload, and the value may
					// not even have storage for them
					SchemaNode::Null => Ok(()),
					_ => {
						let branch_value = value.current_branch().map_err(SerError::value)?;
						self.encode_node(branch, branch_value)
					}
				}
			}
		}
	}

	fn write_varint<I: integer_encoding::VarInt>(&mut self, v: I) -> Result<(), SerError> {
		self.writer.write_varint(v).map_err(SerError::io)?;
		Ok(())
	}

	fn write_length_delimited(&mut self, bytes: &[u8]) -> Result<(), SerError> {
		self.write_varint(bytes.len() as i64)?;
		self.writer.write_all(bytes).map_err(SerError::io)
	}
}

impl<W> EncoderState<W> {
	/// Get the writer back
	pub fn into_writer(self) -> W {
		self.writer
	}

	/// Get the writer by reference
	pub fn writer(&self) -> &W {
		&self.writer
	}

	/// Get the writer by mutable reference
	///
	/// This may be useful to clear the inner buffer when re-using an
	/// `EncoderState`.
	pub fn writer_mut(&mut self) -> &mut W {
		&mut self.writer
	}
}
