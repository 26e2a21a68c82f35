//! Fixed layouts participating in the decode protocol
//!
//! These layouts are written the way the generator emits them (struct per
//! record, enum per union with boxed record branches, `PackedArray` /
//! `RawString` slots) and exercise the same wiring: a resolver compiled
//! against the layout's own schema deposits wire data straight into it.

use avro_specific::{
	data::{PackedArray, RawString},
	resolve::{ResolveError, Resolved},
	value::{GenericValue, Value, ValueError, ValueKind},
	Schema,
};

use pretty_assertions::assert_eq;

const PERSON_SCHEMA_JSON: &str = r#"
{
	"type": "record",
	"name": "person",
	"fields": [
		{"name": "first_name", "type": "string"},
		{"name": "last_name", "type": "string"},
		{"name": "age", "type": "int"},
		{"name": "children", "type": {"type": "array", "items": "person"}}
	]
}
"#;

pub type ArrayPerson = PackedArray<Person>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Person {
	pub first_name: RawString,
	pub last_name: RawString,
	pub age: i32,
	pub children: ArrayPerson,
}

impl Value for Person {
	fn kind(&self) -> ValueKind {
		ValueKind::Record
	}
	fn size(&self) -> Result<usize, ValueError> {
		Ok(4)
	}
	fn get_by_index(&self, index: usize) -> Result<(&dyn Value, Option<&str>), ValueError> {
		match index {
			0 => Ok((&self.first_name as &dyn Value, Some("first_name"))),
			1 => Ok((&self.last_name as &dyn Value, Some("last_name"))),
			2 => Ok((&self.age as &dyn Value, Some("age"))),
			3 => Ok((&self.children as &dyn Value, Some("children"))),
			_ => Err(ValueError::OutOfRange {
				kind: ValueKind::Record,
				index,
				size: 4,
			}),
		}
	}
	fn get_by_index_mut(&mut self, index: usize) -> Result<&mut dyn Value, ValueError> {
		match index {
			0 => Ok(&mut self.first_name as &mut dyn Value),
			1 => Ok(&mut self.last_name as &mut dyn Value),
			2 => Ok(&mut self.age as &mut dyn Value),
			3 => Ok(&mut self.children as &mut dyn Value),
			_ => Err(ValueError::OutOfRange {
				kind: ValueKind::Record,
				index,
				size: 4,
			}),
		}
	}
	fn get_by_name(&self, name: &str) -> Result<Option<(&dyn Value, usize)>, ValueError> {
		Ok(match name {
			"first_name" => Some((&self.first_name as &dyn Value, 0)),
			"last_name" => Some((&self.last_name as &dyn Value, 1)),
			"age" => Some((&self.age as &dyn Value, 2)),
			"children" => Some((&self.children as &dyn Value, 3)),
			_ => None,
		})
	}
	fn get_by_name_mut(&mut self, name: &str) -> Result<Option<&mut dyn Value>, ValueError> {
		Ok(match name {
			"first_name" => Some(&mut self.first_name as &mut dyn Value),
			"last_name" => Some(&mut self.last_name as &mut dyn Value),
			"age" => Some(&mut self.age as &mut dyn Value),
			"children" => Some(&mut self.children as &mut dyn Value),
			_ => None,
		})
	}
}

pub fn person_resolver_new<'s>(writer: &'s Schema) -> Result<Resolved<'s>, ResolveError> {
	let reader: Schema = PERSON_SCHEMA_JSON.parse().map_err(ResolveError::from)?;
	Resolved::new(writer, &reader)
}

const LIST_SCHEMA_JSON: &str = r#"
{
	"type": "record",
	"name": "Node",
	"fields": [
		{"name": "value", "type": "int"},
		{"name": "next", "type": ["null", "Node"]}
	]
}
"#;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
	pub value: i32,
	pub next: NullNode,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NullNode {
	Null,
	Node(Box<Node>),
}

impl Default for NullNode {
	fn default() -> Self {
		Self::Null
	}
}

impl NullNode {
	pub fn discriminant(&self) -> usize {
		match self {
			Self::Null => 0,
			Self::Node(_) => 1,
		}
	}

	pub fn set_null(&mut self) {
		*self = Self::Null;
	}

	pub fn set_node(&mut self, value: Node) {
		*self = Self::Node(Box::new(value));
	}
}

impl Value for Node {
	fn kind(&self) -> ValueKind {
		ValueKind::Record
	}
	fn size(&self) -> Result<usize, ValueError> {
		Ok(2)
	}
	fn get_by_index(&self, index: usize) -> Result<(&dyn Value, Option<&str>), ValueError> {
		match index {
			0 => Ok((&self.value as &dyn Value, Some("value"))),
			1 => Ok((&self.next as &dyn Value, Some("next"))),
			_ => Err(ValueError::OutOfRange {
				kind: ValueKind::Record,
				index,
				size: 2,
			}),
		}
	}
	fn get_by_index_mut(&mut self, index: usize) -> Result<&mut dyn Value, ValueError> {
		match index {
			0 => Ok(&mut self.value as &mut dyn Value),
			1 => Ok(&mut self.next as &mut dyn Value),
			_ => Err(ValueError::OutOfRange {
				kind: ValueKind::Record,
				index,
				size: 2,
			}),
		}
	}
	fn get_by_name(&self, name: &str) -> Result<Option<(&dyn Value, usize)>, ValueError> {
		Ok(match name {
			"value" => Some((&self.value as &dyn Value, 0)),
			"next" => Some((&self.next as &dyn Value, 1)),
			_ => None,
		})
	}
	fn get_by_name_mut(&mut self, name: &str) -> Result<Option<&mut dyn Value>, ValueError> {
		Ok(match name {
			"value" => Some(&mut self.value as &mut dyn Value),
			"next" => Some(&mut self.next as &mut dyn Value),
			_ => None,
		})
	}
}

impl Value for NullNode {
	fn kind(&self) -> ValueKind {
		ValueKind::Union
	}
	fn discriminant(&self) -> Result<usize, ValueError> {
		Ok(NullNode::discriminant(self))
	}
	fn current_branch(&self) -> Result<&dyn Value, ValueError> {
		match self {
			Self::Null => Err(ValueError::WrongType {
				operation: "current_branch",
				kind: ValueKind::Null,
			}),
			Self::Node(value) => Ok(&**value as &dyn Value),
		}
	}
	fn current_branch_mut(&mut self) -> Result<&mut dyn Value, ValueError> {
		match self {
			Self::Null => Err(ValueError::WrongType {
				operation: "current_branch_mut",
				kind: ValueKind::Null,
			}),
			Self::Node(value) => Ok(&mut **value as &mut dyn Value),
		}
	}
	fn set_branch(&mut self, branch: usize) -> Result<(), ValueError> {
		if NullNode::discriminant(self) == branch {
			return Ok(());
		}
		*self = match branch {
			0 => Self::Null,
			1 => Self::Node(Box::default()),
			_ => {
				return Err(ValueError::OutOfRange {
					kind: ValueKind::Union,
					index: branch,
					size: 2,
				})
			}
		};
		Ok(())
	}
}

pub fn node_resolver_new<'s>(writer: &'s Schema) -> Result<Resolved<'s>, ResolveError> {
	let reader: Schema = LIST_SCHEMA_JSON.parse().map_err(ResolveError::from)?;
	Resolved::new(writer, &reader)
}

const INT_STRING_SCHEMA_JSON: &str = r#"["int", "string"]"#;

#[derive(Clone, Debug, PartialEq)]
pub enum IntString {
	Int(i32),
	String(RawString),
}

impl Default for IntString {
	fn default() -> Self {
		Self::Int(Default::default())
	}
}

impl IntString {
	pub fn discriminant(&self) -> usize {
		match self {
			Self::Int(_) => 0,
			Self::String(_) => 1,
		}
	}
}

impl Value for IntString {
	fn kind(&self) -> ValueKind {
		ValueKind::Union
	}
	fn discriminant(&self) -> Result<usize, ValueError> {
		Ok(IntString::discriminant(self))
	}
	fn current_branch(&self) -> Result<&dyn Value, ValueError> {
		match self {
			Self::Int(value) => Ok(value as &dyn Value),
			Self::String(value) => Ok(value as &dyn Value),
		}
	}
	fn current_branch_mut(&mut self) -> Result<&mut dyn Value, ValueError> {
		match self {
			Self::Int(value) => Ok(value as &mut dyn Value),
			Self::String(value) => Ok(value as &mut dyn Value),
		}
	}
	fn set_branch(&mut self, branch: usize) -> Result<(), ValueError> {
		if IntString::discriminant(self) == branch {
			return Ok(());
		}
		*self = match branch {
			0 => Self::Int(Default::default()),
			1 => Self::String(Default::default()),
			_ => {
				return Err(ValueError::OutOfRange {
					kind: ValueKind::Union,
					index: branch,
					size: 2,
				})
			}
		};
		Ok(())
	}
}

#[test]
fn decode_into_person_layout() {
	let writer: Schema = PERSON_SCHEMA_JSON.parse().unwrap();
	let mut source = GenericValue::new(&writer).unwrap();
	source
		.get_by_name_mut("first_name")
		.unwrap()
		.unwrap()
		.set_string("Ada")
		.unwrap();
	source
		.get_by_name_mut("last_name")
		.unwrap()
		.unwrap()
		.set_string("Lovelace")
		.unwrap();
	source
		.get_by_name_mut("age")
		.unwrap()
		.unwrap()
		.set_int(36)
		.unwrap();
	{
		let children = source.get_by_name_mut("children").unwrap().unwrap();
		for name in ["Byron", "Anne"] {
			let child = children.append().unwrap();
			child
				.get_by_name_mut("first_name")
				.unwrap()
				.unwrap()
				.set_string(name)
				.unwrap();
			child
				.get_by_name_mut("last_name")
				.unwrap()
				.unwrap()
				.set_string("Lovelace")
				.unwrap();
			child
				.get_by_name_mut("age")
				.unwrap()
				.unwrap()
				.set_int(10)
				.unwrap();
		}
	}
	let datum = avro_specific::encode_datum_vec(&writer, &source).unwrap();

	let resolved = person_resolver_new(&writer).unwrap();
	let mut person = Person::default();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut person).unwrap();

	assert_eq!(person.first_name.try_as_str().unwrap(), "Ada");
	assert_eq!(person.last_name.try_as_str().unwrap(), "Lovelace");
	assert_eq!(person.age, 36);
	assert_eq!(person.children.len(), 2);
	assert_eq!(person.children[0].first_name.try_as_str().unwrap(), "Byron");
	assert_eq!(person.children[1].first_name.try_as_str().unwrap(), "Anne");
	assert_eq!(person.children[0].children.len(), 0);

	// encoding back from the layout reproduces the wire bytes
	let re_encoded = avro_specific::encode_datum_vec(&writer, &person).unwrap();
	assert_eq!(re_encoded, datum);

	// decoding into the same layout again reuses its storage
	avro_specific::decode_datum_slice(&resolved, &datum, &mut person).unwrap();
	assert_eq!(person.children.len(), 2);
}

#[test]
fn decode_into_recursive_list_layout() {
	let writer: Schema = LIST_SCHEMA_JSON.parse().unwrap();
	let mut source = GenericValue::new(&writer).unwrap();
	fn build(node: &mut dyn Value, values: &[i32]) {
		node.get_by_name_mut("value")
			.unwrap()
			.unwrap()
			.set_int(values[0])
			.unwrap();
		let next = node.get_by_name_mut("next").unwrap().unwrap();
		match values.len() {
			1 => next.set_branch(0).unwrap(),
			_ => {
				next.set_branch(1).unwrap();
				build(next.current_branch_mut().unwrap(), &values[1..]);
			}
		}
	}
	build(&mut source, &[1, 2, 3]);
	let datum = avro_specific::encode_datum_vec(&writer, &source).unwrap();

	let resolved = node_resolver_new(&writer).unwrap();
	let mut list = Node::default();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut list).unwrap();

	let expected = Node {
		value: 1,
		next: NullNode::Node(Box::new(Node {
			value: 2,
			next: NullNode::Node(Box::new(Node {
				value: 3,
				next: NullNode::Null,
			})),
		})),
	};
	assert_eq!(list, expected);
	assert_eq!(list.next.discriminant(), 1);
	match &list.next {
		NullNode::Node(node) => {
			assert_eq!(node.value, 2);
			match &node.next {
				NullNode::Node(node) => {
					assert_eq!(node.value, 3);
					assert_eq!(node.next.discriminant(), 0);
				}
				NullNode::Null => panic!("list ended early"),
			}
		}
		NullNode::Null => panic!("list ended early"),
	}

	// the layout encodes back to the same bytes
	let re_encoded = avro_specific::encode_datum_vec(&writer, &list).unwrap();
	assert_eq!(re_encoded, datum);
}

#[test]
fn union_layout_round_trip() {
	let writer: Schema = INT_STRING_SCHEMA_JSON.parse().unwrap();
	let reader: Schema = INT_STRING_SCHEMA_JSON.parse().unwrap();
	let resolved = Resolved::new(&writer, &reader).unwrap();

	let mut source = GenericValue::new(&writer).unwrap();
	source.set_branch(0).unwrap();
	source.current_branch_mut().unwrap().set_int(7).unwrap();
	let datum = avro_specific::encode_datum_vec(&writer, &source).unwrap();
	let mut target = IntString::default();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut target).unwrap();
	assert_eq!(target.discriminant(), 0);
	assert_eq!(target, IntString::Int(7));

	source.set_branch(1).unwrap();
	source
		.current_branch_mut()
		.unwrap()
		.set_string("hello")
		.unwrap();
	let datum = avro_specific::encode_datum_vec(&writer, &source).unwrap();
	let mut target = IntString::default();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut target).unwrap();
	assert_eq!(target.discriminant(), 1);
	assert_eq!(target, IntString::String(RawString::from("hello")));

	// and back out through the layout's getters
	let re_encoded = avro_specific::encode_datum_vec(&writer, &target).unwrap();
	assert_eq!(re_encoded, datum);
}

#[test]
fn union_set_helpers_keep_discriminant_and_storage_in_sync() {
	let mut next = NullNode::default();
	assert_eq!(next.discriminant(), 0);
	next.set_node(Node {
		value: 9,
		next: NullNode::Null,
	});
	assert_eq!(next.discriminant(), 1);
	assert_eq!(next.current_branch().unwrap().size().unwrap(), 2);
	next.set_null();
	assert_eq!(next.discriminant(), 0);
	assert!(matches!(
		next.current_branch(),
		Err(ValueError::WrongType { .. })
	));
}

#[test]
fn writer_evolution_into_person_layout() {
	// the writer has an extra field and a promotable age type
	let writer: Schema = r#"
	{
		"type": "record",
		"name": "person",
		"fields": [
			{"name": "nickname", "type": "string"},
			{"name": "first_name", "type": "string"},
			{"name": "last_name", "type": "string"},
			{"name": "age", "type": "int"},
			{"name": "children", "type": {"type": "array", "items": "person"}}
		]
	}
	"#
	.parse()
	.unwrap();

	let mut source = GenericValue::new(&writer).unwrap();
	for (field, content) in [
		("nickname", "Al"),
		("first_name", "Alonzo"),
		("last_name", "Church"),
	] {
		source
			.get_by_name_mut(field)
			.unwrap()
			.unwrap()
			.set_string(content)
			.unwrap();
	}
	source
		.get_by_name_mut("age")
		.unwrap()
		.unwrap()
		.set_int(33)
		.unwrap();
	let datum = avro_specific::encode_datum_vec(&writer, &source).unwrap();

	let resolved = person_resolver_new(&writer).unwrap();
	let mut person = Person::default();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut person).unwrap();
	assert_eq!(person.first_name.try_as_str().unwrap(), "Alonzo");
	assert_eq!(person.last_name.try_as_str().unwrap(), "Church");
	assert_eq!(person.age, 33);
	assert_eq!(person.children.len(), 0);
}
