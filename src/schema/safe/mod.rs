//! Defines a fully-safe counterpart of the [`Schema`](crate::Schema) that is
//! used for its initialization, for validation, and as the input of the
//! specific-type generator

mod check_for_cycles;
mod parsing;
pub(crate) mod serialize;

use super::{Fixed, Name, SchemaError};

use std::collections::{HashMap, HashSet};

pub use check_for_cycles::UnconditionalCycle;

/// An editable representation of a schema
///
/// In there, references to other nodes are represented as [`SchemaKey`],
/// which allow to index into [`SchemaMut`].
///
/// It is implemented this way because, due to how referencing named types
/// works, the most faithful representation of a schema is not a tree but a
/// possibly-cyclic general directed graph: a name reference resolves to a
/// key of an already-registered node, and recursion arises only through
/// such references.
#[derive(Clone, Debug)]
pub struct SchemaMut {
	// First node in the array is considered to be the root
	pub(crate) nodes: Vec<SchemaNode>,
}

impl SchemaMut {
	/// Obtain the underlying graph storage
	///
	/// The first node (index `0`) is the root of the schema.
	///
	/// [`SchemaKey`]s can be converted to indexes of this `Vec`.
	pub fn nodes(&self) -> &[SchemaNode] {
		&self.nodes
	}

	/// Obtain the underlying graph storage mutably
	///
	/// The first node (index `0`) is the root of the schema.
	pub fn nodes_mut(&mut self) -> &mut Vec<SchemaNode> {
		&mut self.nodes
	}

	/// Obtain the root of the schema
	///
	/// # Panics
	/// If the `nodes` `Vec` is empty. This can only happen if you have
	/// updated it through [`nodes_mut`](Self::nodes_mut), as parsing
	/// otherwise guarantees that this cannot happen.
	pub fn root(&self) -> &SchemaNode {
		self.nodes.first().expect(
			"Schema should have nodes - have you updated it \
				in such a way that all of its nodes were removed?",
		)
	}

	/// Initialize a [`SchemaMut`] from a set of nodes
	///
	/// The first node (index `0`) is the root of the schema.
	pub fn from_nodes(nodes: Vec<SchemaNode>) -> Self {
		Self { nodes }
	}

	/// Turn this [`SchemaMut`] into a [`Schema`](crate::Schema)
	///
	/// [`Schema`](crate::Schema) is what the resolver compiler, the
	/// encoder, the decoder and [`GenericValue`](crate::value::GenericValue)
	/// operate on.
	///
	/// This will fail if the schema is invalid (e.g. out-of-bounds
	/// [`SchemaKey`], duplicate record field...).
	pub fn freeze(self) -> Result<super::Schema, SchemaError> {
		self.try_into()
	}

	/// Try to get the node at the given [`SchemaKey`]
	///
	/// (or return `None` if the key is invalid)
	///
	/// If you want to panic on invalid keys, use `schema[key]` instead.
	pub fn get(&self, key: SchemaKey) -> Option<&SchemaNode> {
		self.nodes.get(key.idx)
	}

	/// Check the structural invariants that make this graph a usable schema
	///
	/// This is called by [`freeze`](Self::freeze) and by the specific-type
	/// generator. Violations are reported as [`SchemaError`]s: dangling
	/// [`SchemaKey`]s, duplicate definitions of a named type, duplicate
	/// record field names, duplicate enum symbols, union branches that are
	/// not pairwise distinguishable, and records that unconditionally
	/// contain themselves.
	pub fn validate(&self) -> Result<(), SchemaError> {
		if self.nodes.is_empty() {
			return Err(SchemaError::new(
				"Schema must have at least one node (the root)",
			));
		}

		let check_key = |key: SchemaKey| -> Result<(), SchemaError> {
			if key.idx >= self.nodes.len() {
				return Err(SchemaError::msg(format_args!(
					"SchemaKey index {} is out of bounds (len: {})",
					key.idx,
					self.nodes.len()
				)));
			}
			Ok(())
		};

		let mut named_nodes: HashMap<&str, usize> = HashMap::new();
		for (idx, node) in self.nodes.iter().enumerate() {
			match node {
				SchemaNode::Null
				| SchemaNode::Boolean
				| SchemaNode::Int
				| SchemaNode::Long
				| SchemaNode::Float
				| SchemaNode::Double
				| SchemaNode::Bytes
				| SchemaNode::String => {}
				SchemaNode::Array(array) => check_key(array.items)?,
				SchemaNode::Map(map) => check_key(map.values)?,
				SchemaNode::Union(union) => {
					let mut unnamed_kinds = HashSet::new();
					let mut named_branches = HashSet::new();
					for &variant in &union.variants {
						check_key(variant)?;
						match &self.nodes[variant.idx] {
							SchemaNode::Union(_) => {
								return Err(SchemaError::new(
									"Unions may not immediately contain other unions",
								));
							}
							named @ (SchemaNode::Record(_)
							| SchemaNode::Enum(_)
							| SchemaNode::Fixed(_)) => {
								let name = named
									.name()
									.map(Name::fully_qualified_name)
									.unwrap_or_default();
								if !named_branches.insert(name.to_owned()) {
									return Err(SchemaError::msg(format_args!(
										"Union contains duplicate branches for named type {}",
										name
									)));
								}
							}
							other => {
								if !unnamed_kinds.insert(other.kind_name()) {
									return Err(SchemaError::msg(format_args!(
										"Union contains multiple branches of type {}",
										other.kind_name()
									)));
								}
							}
						}
					}
				}
				SchemaNode::Record(record) => {
					let mut field_names = HashSet::new();
					for field in &record.fields {
						check_key(field.type_)?;
						if !field_names.insert(field.name.as_str()) {
							return Err(SchemaError::msg(format_args!(
								"Record {} contains duplicate field {}",
								record.name.fully_qualified_name(),
								field.name
							)));
						}
					}
				}
				SchemaNode::Enum(enum_) => {
					let mut symbols = HashSet::new();
					for symbol in &enum_.symbols {
						if !symbols.insert(symbol.as_str()) {
							return Err(SchemaError::msg(format_args!(
								"Enum {} contains duplicate symbol {}",
								enum_.name.fully_qualified_name(),
								symbol
							)));
						}
					}
				}
				SchemaNode::Fixed(_) => {}
			}
			if let Some(name) = node.name() {
				if let Some(&other) = named_nodes.get(name.fully_qualified_name()) {
					if other != idx {
						return Err(SchemaError::msg(format_args!(
							"The Schema contains duplicate definitions for {}",
							name.fully_qualified_name()
						)));
					}
				}
				named_nodes.insert(name.fully_qualified_name(), idx);
			}
		}

		self.check_for_cycles()
			.map_err(|e: UnconditionalCycle| SchemaError::display(e))?;

		Ok(())
	}
}

/// The location of a node in a [`SchemaMut`]
///
/// This can be used to [`Index`](std::ops::Index) into the [`SchemaMut`].
///
/// (Note that `Index`ing into a `SchemaMut` with an invalid index would
/// cause a panic.)
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaKey {
	pub(crate) idx: usize,
}

impl SchemaKey {
	/// Construct a new SchemaKey
	///
	/// This is expected to be an index in the
	/// [`nodes`](SchemaMut::nodes_mut) `Vec` of a [`SchemaMut`].
	pub const fn from_idx(idx: usize) -> Self {
		Self { idx }
	}

	/// Obtain the index in the [`nodes`](SchemaMut::nodes) `Vec` of a
	/// [`SchemaMut`] that this [`SchemaKey`] points to
	pub const fn idx(self) -> usize {
		self.idx
	}

	/// Construct a new SchemaKey representing the root of the schema
	///
	/// This is equivalent to `SchemaKey::from_idx(0)`, since the root of
	/// the schema is always simply the first element of the `nodes` array.
	pub const fn root() -> Self {
		Self { idx: 0 }
	}
}

impl std::ops::Index<SchemaKey> for SchemaMut {
	type Output = SchemaNode;
	fn index(&self, key: SchemaKey) -> &Self::Output {
		&self.nodes[key.idx]
	}
}

impl std::fmt::Debug for SchemaKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&self.idx, f)
	}
}

/// A node of a schema, stored in a [`SchemaMut`]
///
/// In there, references to other nodes are represented as [`SchemaKey`],
/// which allow to index into [`SchemaMut`]. In the schema JSON, such a
/// reference is written as the name of a previously-defined named type;
/// that is the only mechanism through which a schema may be recursive.
#[derive(Clone, Debug)]
pub enum SchemaNode {
	/// A `null` schema
	Null,
	/// A `boolean` schema
	Boolean,
	/// An `int` schema (32-bit signed)
	Int,
	/// A `long` schema (64-bit signed)
	Long,
	/// A `float` schema
	Float,
	/// A `double` schema
	Double,
	/// A `bytes` schema: a sequence of 8-bit unsigned bytes
	Bytes,
	/// A `string` schema: a unicode character sequence
	String,
	/// An `array` schema, with all elements of a single type
	Array(Array),
	/// A `map` schema; keys are always strings
	Map(Map),
	/// A `union` schema: a discriminated choice among its branches
	Union(Union),
	/// A `record` schema: ordered named fields
	Record(Record),
	/// An `enum` schema: one symbol out of an ordered set
	Enum(Enum),
	/// A `fixed` schema: exactly `size` bytes
	Fixed(Fixed),
}

impl SchemaNode {
	/// If the node is a named type, returns its name
	pub fn name(&self) -> Option<&Name> {
		match self {
			SchemaNode::Record(record) => Some(&record.name),
			SchemaNode::Enum(enum_) => Some(&enum_.name),
			SchemaNode::Fixed(fixed) => Some(&fixed.name),
			_ => None,
		}
	}

	/// The name of this node's kind, as spelled in schema JSON
	pub fn kind_name(&self) -> &'static str {
		match self {
			SchemaNode::Null => "null",
			SchemaNode::Boolean => "boolean",
			SchemaNode::Int => "int",
			SchemaNode::Long => "long",
			SchemaNode::Float => "float",
			SchemaNode::Double => "double",
			SchemaNode::Bytes => "bytes",
			SchemaNode::String => "string",
			SchemaNode::Array(_) => "array",
			SchemaNode::Map(_) => "map",
			SchemaNode::Union(_) => "union",
			SchemaNode::Record(_) => "record",
			SchemaNode::Enum(_) => "enum",
			SchemaNode::Fixed(_) => "fixed",
		}
	}
}

/// Component of a [`SchemaMut`]
#[derive(Clone, Debug)]
pub struct Array {
	/// The key (in the [`SchemaMut`]) of the schema of each item that will
	/// be in the array
	pub items: SchemaKey,
}
impl Array {
	/// `items` is the key (in the [`SchemaMut`]) of the schema of each
	/// item that will be in the array
	pub fn new(items: SchemaKey) -> Self {
		Self { items }
	}
}

/// Component of a [`SchemaMut`]
///
/// A map is a collection of key-value pairs, where the keys are strings.
#[derive(Clone, Debug)]
pub struct Map {
	/// The key (in the [`SchemaMut`]) of the schema of each value that
	/// will be in the map
	pub values: SchemaKey,
}
impl Map {
	/// `values` is the key (in the [`SchemaMut`]) of the schema of each
	/// value that will be in the map
	pub fn new(values: SchemaKey) -> Self {
		Self { values }
	}
}

/// Component of a [`SchemaMut`]
#[derive(Clone, Debug)]
pub struct Union {
	/// The keys (in the [`SchemaMut`]) of the schemas of each branch that
	/// this *union* supports
	pub variants: Vec<SchemaKey>,
}
impl Union {
	/// `variants` is the keys (in the [`SchemaMut`]) of the schemas of
	/// each branch that this *union* supports
	pub fn new(variants: Vec<SchemaKey>) -> Self {
		Self { variants }
	}
}

/// Component of a [`SchemaMut`]
///
/// A `record` is ~equivalent to a Rust struct.
#[derive(Clone, Debug)]
pub struct Record {
	/// The list of fields in this *record* (~= `struct`)
	pub fields: Vec<RecordField>,
	/// The name of the record (including namespace)
	pub name: Name,
}
impl Record {
	/// `name` is the name of the record (including namespace), and
	/// `fields` is the list of fields in this record
	pub fn new(name: Name, fields: Vec<RecordField>) -> Self {
		Self { fields, name }
	}
}

/// Component of a [`SchemaMut`]
#[derive(Clone, Debug)]
pub struct RecordField {
	/// Name of the field
	pub name: String,
	/// The key (in the [`SchemaMut`]) of the schema of the type of this
	/// field
	pub type_: SchemaKey,
	/// The JSON default declared for this field, if any
	///
	/// The resolver compiler consults this when a reader field has no
	/// counterpart on the writer side.
	pub default: Option<serde_json::Value>,
}
impl RecordField {
	/// `schema` is the key (in the [`SchemaMut`]) of the schema of the
	/// type of this field
	pub fn new(name: impl Into<String>, schema: SchemaKey) -> Self {
		Self {
			name: name.into(),
			type_: schema,
			default: None,
		}
	}
}

/// Component of a [`SchemaMut`]
///
/// This is the ~equivalent of a Rust `enum` where none of the variants
/// would hold any inner value. (e.g. `enum Foo { Bar, Baz }`)
#[derive(Clone, Debug)]
pub struct Enum {
	/// All the symbols of the enum (e.g. `["Bar", "Baz"]`)
	pub symbols: Vec<String>,
	/// The name of the enum (including namespace)
	pub name: Name,
}
impl Enum {
	/// `name` is the name of the enum (including namespace), and `symbols`
	/// is the ordered list of its symbols
	pub fn new(name: Name, symbols: Vec<String>) -> Self {
		Self { symbols, name }
	}
}

macro_rules! impl_froms_for_schema_node {
	($($variant: ident)*) => {
		$(
			impl From<$variant> for SchemaNode {
				fn from(variant: $variant) -> Self {
					Self::$variant(variant)
				}
			}
		)*
	};
}
impl_froms_for_schema_node! { Array Map Union Record Enum Fixed }
