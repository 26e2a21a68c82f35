//! # Getting started
//!
//! ```
//! let schema: avro_specific::Schema = r#"
//! {
//! 	"type": "record",
//! 	"name": "Test",
//! 	"fields": [
//! 		{
//! 			"type": {
//! 				"type": "string"
//! 			},
//! 			"name": "field"
//! 		}
//! 	]
//! }
//! "#
//! .parse()
//! .expect("Failed to parse schema");
//!
//! use avro_specific::value::{GenericValue, Value};
//!
//! // Build a value for the schema and fill it through the polymorphic
//! // value interface
//! let mut value = GenericValue::new(&schema).expect("Failed to build value");
//! value
//! 	.get_by_name_mut("field")
//! 	.unwrap()
//! 	.unwrap()
//! 	.set_string("foo")
//! 	.unwrap();
//!
//! // Datum encoding
//! let datum = avro_specific::encode_datum_vec(&schema, &value).expect("Failed to encode");
//! assert_eq!(datum, &[6, 102, 111, 111]);
//!
//! // Datum decoding goes through a compiled decode plan: the writer
//! // schema resolved against the reader side (here, the same schema)
//! let resolved =
//! 	avro_specific::resolve::Resolved::new(&schema, &schema).expect("Failed to resolve");
//! let mut decoded = GenericValue::new(&schema).expect("Failed to build value");
//! avro_specific::decode_datum_slice(&resolved, &datum, &mut decoded)
//! 	.expect("Failed to decode");
//! assert_eq!(decoded, value);
//! ```
//!
//! # A schema-directed value engine
//!
//! Everything revolves around three pieces:
//! - the [`value::Value`] trait, the polymorphic access protocol through
//!   which any in-memory representation (a [`value::GenericValue`], a
//!   generated specific layout, or a bare `i32`) is read and written;
//! - the [`resolve`] module, which compiles a *writer* schema against a
//!   decode target into a [`resolve::Resolved`] plan, honoring the schema
//!   evolution rules (numeric promotion, bytes/string interchange, enums
//!   matched by symbol name, record fields matched by name, unions on
//!   either or both sides) and closing recursive schemas into cycles via
//!   memoization;
//! - the [`specific`] module, which generates fixed Rust layouts from a
//!   schema — decode then writes directly into your own structs, with no
//!   intermediate generic tree. The `avrosc` binary drives it from schema
//!   files.
//!
//! Encoding always writes under the value's own schema
//! ([`encode_datum`]); all resolution work happens on the decode side.

pub mod data;
pub mod de;
pub mod resolve;
pub mod schema;
pub mod ser;
pub mod specific;
pub mod value;

pub use schema::Schema;

use {de::DeError, resolve::Resolved, ser::SerError, value::Value};

/// Decode one datum from a slice into `target`, following the decode plan
/// `resolved`
///
/// The plan's writer schema dictates the wire layout; the plan's target
/// side must be what `target` implements (see
/// [`Resolved::new`](resolve::Resolved::new) /
/// [`Resolved::new_raw`](resolve::Resolved::new_raw)).
pub fn decode_datum_slice(
	resolved: &Resolved<'_>,
	slice: &[u8],
	target: &mut dyn Value,
) -> Result<(), DeError> {
	de::DecoderState::from_slice(slice).decode(resolved, target)
}

/// Decode one datum from an [`impl BufRead`](std::io::BufRead) into
/// `target`, following the decode plan `resolved`
///
/// If you only have an `impl Read`, wrap it in a
/// [`BufReader`](std::io::BufReader) first. If decoding from a slice,
/// prefer [`decode_datum_slice`].
pub fn decode_datum_reader<R>(
	resolved: &Resolved<'_>,
	reader: R,
	target: &mut dyn Value,
) -> Result<(), DeError>
where
	R: std::io::BufRead,
{
	de::DecoderState::from_reader(reader).decode(resolved, target)
}

/// Encode `value` under `schema`, writing to the provided writer
///
/// Returns the writer back.
pub fn encode_datum<W>(schema: &Schema, value: &dyn Value, writer: W) -> Result<W, SerError>
where
	W: std::io::Write,
{
	let mut state = ser::EncoderState::from_writer(writer);
	state.encode(schema, value)?;
	Ok(state.into_writer())
}

/// Encode `value` under `schema` into a newly allocated `Vec`
///
/// Note that unless you would otherwise allocate a new `Vec` anyway, it
/// will be more efficient to use [`encode_datum`] with a reused buffer.
pub fn encode_datum_vec(schema: &Schema, value: &dyn Value) -> Result<Vec<u8>, SerError> {
	encode_datum(schema, value, Vec::new())
}
