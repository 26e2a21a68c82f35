//! The default, fully-general value implementation

use super::{Value, ValueError, ValueKind};

use crate::{
	data::{OrderedMap, PackedArray, RawString},
	schema::self_referential::{NodeRef, SchemaNode},
	Schema,
};

/// Bound on schema nesting when building a value, to prevent stack
/// overflow on pathologically deep schemas
const MAX_VALUE_DEPTH: usize = 64;

/// A value backed by tagged heap nodes, supporting every operation of its
/// schema's kind
///
/// This is the implementation of [`Value`] used when no specific layout
/// has been generated for a schema, and the reference implementation that
/// specific layouts and the resolver compiler are tested against.
///
/// A `GenericValue` is created default-initialized from a schema:
/// primitives are zero, containers are empty, and a union starts with no
/// branch selected ([`set_branch`](Value::set_branch) creates branch
/// storage lazily, which is also what keeps recursive schemas finite).
/// Record fields are built eagerly in declaration order.
pub struct GenericValue<'s> {
	schema: NodeRef<'s>,
	state: State<'s>,
}

#[derive(Debug, PartialEq)]
enum State<'s> {
	Null,
	Boolean(bool),
	Int(i32),
	Long(i64),
	Float(f32),
	Double(f64),
	Bytes(RawString),
	String(RawString),
	Fixed(Box<[u8]>),
	Enum(usize),
	Array(PackedArray<GenericValue<'s>>),
	Map(OrderedMap<GenericValue<'s>>),
	Record(Vec<GenericValue<'s>>),
	Union(Option<(usize, Box<GenericValue<'s>>)>),
}

impl<'s> GenericValue<'s> {
	/// Build a default-initialized value for `schema`
	pub fn new(schema: &'s Schema) -> Result<Self, ValueError> {
		Self::for_node(schema.root(), MAX_VALUE_DEPTH)
	}

	pub(crate) fn for_node(node: NodeRef<'s>, depth: usize) -> Result<Self, ValueError> {
		let depth = depth.checked_sub(1).ok_or(ValueError::DepthLimit)?;
		let state = match node.as_ref() {
			SchemaNode::Null => State::Null,
			SchemaNode::Boolean => State::Boolean(false),
			SchemaNode::Int => State::Int(0),
			SchemaNode::Long => State::Long(0),
			SchemaNode::Float => State::Float(0.0),
			SchemaNode::Double => State::Double(0.0),
			SchemaNode::Bytes => State::Bytes(RawString::new()),
			SchemaNode::String => State::String(RawString::new()),
			SchemaNode::Fixed(fixed) => State::Fixed(vec![0u8; fixed.size].into_boxed_slice()),
			SchemaNode::Enum(_) => State::Enum(0),
			SchemaNode::Array(_) => State::Array(PackedArray::new()),
			SchemaNode::Map(_) => State::Map(OrderedMap::new()),
			SchemaNode::Record(record) => State::Record(
				record
					.fields
					.iter()
					.map(|field| Self::for_node(field.schema, depth))
					.collect::<Result<_, _>>()?,
			),
			SchemaNode::Union(_) => State::Union(None),
		};
		Ok(Self {
			schema: node,
			state,
		})
	}
}

impl<'s> Value for GenericValue<'s> {
	fn kind(&self) -> ValueKind {
		match &self.state {
			State::Null => ValueKind::Null,
			State::Boolean(_) => ValueKind::Boolean,
			State::Int(_) => ValueKind::Int,
			State::Long(_) => ValueKind::Long,
			State::Float(_) => ValueKind::Float,
			State::Double(_) => ValueKind::Double,
			State::Bytes(_) => ValueKind::Bytes,
			State::String(_) => ValueKind::String,
			State::Fixed(_) => ValueKind::Fixed,
			State::Enum(_) => ValueKind::Enum,
			State::Array(_) => ValueKind::Array,
			State::Map(_) => ValueKind::Map,
			State::Record(_) => ValueKind::Record,
			State::Union(_) => ValueKind::Union,
		}
	}

	fn get_null(&self) -> Result<(), ValueError> {
		match &self.state {
			State::Null => Ok(()),
			_ => Err(ValueError::wrong_type("get_null", self.kind())),
		}
	}
	fn set_null(&mut self) -> Result<(), ValueError> {
		match &self.state {
			State::Null => Ok(()),
			_ => Err(ValueError::wrong_type("set_null", self.kind())),
		}
	}

	fn get_boolean(&self) -> Result<bool, ValueError> {
		match &self.state {
			State::Boolean(v) => Ok(*v),
			_ => Err(ValueError::wrong_type("get_boolean", self.kind())),
		}
	}
	fn set_boolean(&mut self, value: bool) -> Result<(), ValueError> {
		match &mut self.state {
			State::Boolean(v) => {
				*v = value;
				Ok(())
			}
			_ => Err(ValueError::wrong_type("set_boolean", self.kind())),
		}
	}

	fn get_int(&self) -> Result<i32, ValueError> {
		match &self.state {
			State::Int(v) => Ok(*v),
			_ => Err(ValueError::wrong_type("get_int", self.kind())),
		}
	}
	fn set_int(&mut self, value: i32) -> Result<(), ValueError> {
		match &mut self.state {
			State::Int(v) => {
				*v = value;
				Ok(())
			}
			_ => Err(ValueError::wrong_type("set_int", self.kind())),
		}
	}

	fn get_long(&self) -> Result<i64, ValueError> {
		match &self.state {
			State::Long(v) => Ok(*v),
			_ => Err(ValueError::wrong_type("get_long", self.kind())),
		}
	}
	fn set_long(&mut self, value: i64) -> Result<(), ValueError> {
		match &mut self.state {
			State::Long(v) => {
				*v = value;
				Ok(())
			}
			_ => Err(ValueError::wrong_type("set_long", self.kind())),
		}
	}

	fn get_float(&self) -> Result<f32, ValueError> {
		match &self.state {
			State::Float(v) => Ok(*v),
			_ => Err(ValueError::wrong_type("get_float", self.kind())),
		}
	}
	fn set_float(&mut self, value: f32) -> Result<(), ValueError> {
		match &mut self.state {
			State::Float(v) => {
				*v = value;
				Ok(())
			}
			_ => Err(ValueError::wrong_type("set_float", self.kind())),
		}
	}

	fn get_double(&self) -> Result<f64, ValueError> {
		match &self.state {
			State::Double(v) => Ok(*v),
			_ => Err(ValueError::wrong_type("get_double", self.kind())),
		}
	}
	fn set_double(&mut self, value: f64) -> Result<(), ValueError> {
		match &mut self.state {
			State::Double(v) => {
				*v = value;
				Ok(())
			}
			_ => Err(ValueError::wrong_type("set_double", self.kind())),
		}
	}

	fn get_bytes(&self) -> Result<&[u8], ValueError> {
		match &self.state {
			State::Bytes(buf) => Ok(buf.as_bytes()),
			_ => Err(ValueError::wrong_type("get_bytes", self.kind())),
		}
	}
	fn set_bytes(&mut self, value: &[u8]) -> Result<(), ValueError> {
		match &mut self.state {
			State::Bytes(buf) => {
				buf.set(value);
				Ok(())
			}
			_ => Err(ValueError::wrong_type("set_bytes", self.kind())),
		}
	}
	fn give_bytes(&mut self, value: Vec<u8>) -> Result<(), ValueError> {
		match &mut self.state {
			State::Bytes(buf) => {
				buf.give(value);
				Ok(())
			}
			_ => Err(ValueError::wrong_type("give_bytes", self.kind())),
		}
	}

	fn get_string(&self) -> Result<&str, ValueError> {
		match &self.state {
			State::String(buf) => buf.try_as_str().map_err(|_| ValueError::InvalidUtf8),
			_ => Err(ValueError::wrong_type("get_string", self.kind())),
		}
	}
	fn set_string(&mut self, value: &str) -> Result<(), ValueError> {
		match &mut self.state {
			State::String(buf) => {
				buf.set(value.as_bytes());
				Ok(())
			}
			_ => Err(ValueError::wrong_type("set_string", self.kind())),
		}
	}
	fn give_string(&mut self, value: String) -> Result<(), ValueError> {
		match &mut self.state {
			State::String(buf) => {
				buf.give(value.into_bytes());
				Ok(())
			}
			_ => Err(ValueError::wrong_type("give_string", self.kind())),
		}
	}

	fn get_fixed(&self) -> Result<&[u8], ValueError> {
		match &self.state {
			State::Fixed(buf) => Ok(buf),
			_ => Err(ValueError::wrong_type("get_fixed", self.kind())),
		}
	}
	fn set_fixed(&mut self, value: &[u8]) -> Result<(), ValueError> {
		match &mut self.state {
			State::Fixed(buf) => {
				if value.len() != buf.len() {
					return Err(ValueError::FixedSize {
						expected: buf.len(),
						actual: value.len(),
					});
				}
				buf.copy_from_slice(value);
				Ok(())
			}
			_ => Err(ValueError::wrong_type("set_fixed", self.kind())),
		}
	}

	fn get_enum(&self) -> Result<usize, ValueError> {
		match &self.state {
			State::Enum(v) => Ok(*v),
			_ => Err(ValueError::wrong_type("get_enum", self.kind())),
		}
	}
	fn set_enum(&mut self, symbol: usize) -> Result<(), ValueError> {
		match (&mut self.state, self.schema.as_ref()) {
			(State::Enum(v), SchemaNode::Enum(enum_)) => {
				if symbol >= enum_.symbols.len() {
					return Err(ValueError::out_of_range(
						ValueKind::Enum,
						symbol,
						enum_.symbols.len(),
					));
				}
				*v = symbol;
				Ok(())
			}
			_ => Err(ValueError::wrong_type("set_enum", self.kind())),
		}
	}

	fn size(&self) -> Result<usize, ValueError> {
		match &self.state {
			State::Array(items) => Ok(items.len()),
			State::Map(map) => Ok(map.len()),
			State::Record(fields) => Ok(fields.len()),
			_ => Err(ValueError::wrong_type("size", self.kind())),
		}
	}

	fn get_by_index(&self, index: usize) -> Result<(&dyn Value, Option<&str>), ValueError> {
		match (&self.state, self.schema.as_ref()) {
			(State::Array(items), _) => match items.get(index) {
				Some(element) => Ok((element as &dyn Value, None)),
				None => Err(ValueError::out_of_range(
					ValueKind::Array,
					index,
					items.len(),
				)),
			},
			(State::Map(map), _) => match map.get_index(index) {
				Some((key, element)) => Ok((element as &dyn Value, Some(key))),
				None => Err(ValueError::out_of_range(ValueKind::Map, index, map.len())),
			},
			(State::Record(fields), SchemaNode::Record(record)) => match fields.get(index) {
				Some(field) => Ok((
					field as &dyn Value,
					record.fields.get(index).map(|f| f.name.as_str()),
				)),
				None => Err(ValueError::out_of_range(
					ValueKind::Record,
					index,
					fields.len(),
				)),
			},
			_ => Err(ValueError::wrong_type("get_by_index", self.kind())),
		}
	}

	fn get_by_index_mut(&mut self, index: usize) -> Result<&mut dyn Value, ValueError> {
		let kind = self.kind();
		match &mut self.state {
			State::Array(items) => {
				let size = items.len();
				match items.get_mut(index) {
					Some(element) => Ok(element as &mut dyn Value),
					None => Err(ValueError::out_of_range(ValueKind::Array, index, size)),
				}
			}
			State::Map(map) => {
				let size = map.len();
				match map.get_index_mut(index) {
					Some(element) => Ok(element as &mut dyn Value),
					None => Err(ValueError::out_of_range(ValueKind::Map, index, size)),
				}
			}
			State::Record(fields) => {
				let size = fields.len();
				match fields.get_mut(index) {
					Some(field) => Ok(field as &mut dyn Value),
					None => Err(ValueError::out_of_range(ValueKind::Record, index, size)),
				}
			}
			_ => Err(ValueError::wrong_type("get_by_index_mut", kind)),
		}
	}

	fn get_by_name(&self, name: &str) -> Result<Option<(&dyn Value, usize)>, ValueError> {
		match (&self.state, self.schema.as_ref()) {
			(State::Map(map), _) => Ok(map
				.get_full(name)
				.map(|(index, element)| (element as &dyn Value, index))),
			(State::Record(fields), SchemaNode::Record(record)) => {
				Ok(record.per_name_lookup.get(name).map(|&index| {
					// per_name_lookup indexes are in bounds by construction
					(&fields[index] as &dyn Value, index)
				}))
			}
			_ => Err(ValueError::wrong_type("get_by_name", self.kind())),
		}
	}

	fn get_by_name_mut(&mut self, name: &str) -> Result<Option<&mut dyn Value>, ValueError> {
		let kind = self.kind();
		match (&mut self.state, self.schema.as_ref()) {
			(State::Map(map), _) => Ok(map.get_mut(name).map(|element| element as &mut dyn Value)),
			(State::Record(fields), SchemaNode::Record(record)) => Ok(record
				.per_name_lookup
				.get(name)
				.map(|&index| &mut fields[index] as &mut dyn Value)),
			_ => Err(ValueError::wrong_type("get_by_name_mut", kind)),
		}
	}

	fn append(&mut self) -> Result<&mut dyn Value, ValueError> {
		let kind = self.kind();
		match (&mut self.state, self.schema.as_ref()) {
			(State::Array(items), SchemaNode::Array(item_schema)) => {
				let element = GenericValue::for_node(*item_schema, MAX_VALUE_DEPTH)?;
				Ok(items.push(element) as &mut dyn Value)
			}
			_ => Err(ValueError::wrong_type("append", kind)),
		}
	}

	fn add(&mut self, key: &str) -> Result<(&mut dyn Value, bool), ValueError> {
		let kind = self.kind();
		match (&mut self.state, self.schema.as_ref()) {
			(State::Map(map), SchemaNode::Map(value_schema)) => {
				if map.get(key).is_none() {
					let element = GenericValue::for_node(*value_schema, MAX_VALUE_DEPTH)?;
					let (slot, _) = map.get_or_create_with(key, move || element);
					Ok((slot as &mut dyn Value, true))
				} else {
					match map.get_mut(key) {
						Some(slot) => Ok((slot as &mut dyn Value, false)),
						// checked just above
						None => unreachable!(),
					}
				}
			}
			_ => Err(ValueError::wrong_type("add", kind)),
		}
	}

	fn reset(&mut self) -> Result<(), ValueError> {
		match &mut self.state {
			State::Array(items) => {
				items.clear();
				Ok(())
			}
			State::Map(map) => {
				map.clear();
				Ok(())
			}
			_ => Err(ValueError::wrong_type("reset", self.kind())),
		}
	}

	fn discriminant(&self) -> Result<usize, ValueError> {
		match &self.state {
			State::Union(Some((discriminant, _))) => Ok(*discriminant),
			State::Union(None) => Err(ValueError::NoBranch),
			_ => Err(ValueError::wrong_type("discriminant", self.kind())),
		}
	}

	fn current_branch(&self) -> Result<&dyn Value, ValueError> {
		match &self.state {
			State::Union(Some((_, branch))) => Ok(&**branch as &dyn Value),
			State::Union(None) => Err(ValueError::NoBranch),
			_ => Err(ValueError::wrong_type("current_branch", self.kind())),
		}
	}

	fn current_branch_mut(&mut self) -> Result<&mut dyn Value, ValueError> {
		let kind = self.kind();
		match &mut self.state {
			State::Union(Some((_, branch))) => Ok(&mut **branch as &mut dyn Value),
			State::Union(None) => Err(ValueError::NoBranch),
			_ => Err(ValueError::wrong_type("current_branch_mut", kind)),
		}
	}

	fn set_branch(&mut self, branch: usize) -> Result<(), ValueError> {
		match (&mut self.state, self.schema.as_ref()) {
			(State::Union(current), SchemaNode::Union(union)) => {
				let branch_schema = match union.variants.get(branch) {
					Some(&branch_schema) => branch_schema,
					None => {
						return Err(ValueError::out_of_range(
							ValueKind::Union,
							branch,
							union.variants.len(),
						))
					}
				};
				match current {
					// Re-selecting the active branch keeps its storage
					Some((discriminant, _)) if *discriminant == branch => Ok(()),
					_ => {
						let value = GenericValue::for_node(branch_schema, MAX_VALUE_DEPTH)?;
						*current = Some((branch, Box::new(value)));
						Ok(())
					}
				}
			}
			_ => Err(ValueError::wrong_type("set_branch", self.kind())),
		}
	}
}

impl PartialEq for GenericValue<'_> {
	fn eq(&self, other: &Self) -> bool {
		self.state == other.state
	}
}

impl std::fmt::Debug for GenericValue<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&self.state, f)
	}
}
