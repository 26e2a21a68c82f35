//! Encode/decode round trips through the resolver compiler and the
//! generic value implementation, including schema evolution pairings

use avro_specific::{
	de::DeErrorKind,
	resolve::{RawTarget, Resolved, ResolveErrorKind, ResolverConfig},
	value::{GenericValue, Value},
	Schema,
};

use {lazy_static::lazy_static, pretty_assertions::assert_eq};

fn schema(json: &str) -> Schema {
	json.parse().expect("schema should parse")
}

const PERSON_SCHEMA: &str = r#"
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

const LIST_SCHEMA: &str = r#"
{
	"type": "record",
	"name": "Node",
	"fields": [
		{"name": "value", "type": "int"},
		{"name": "next", "type": ["null", "Node"]}
	]
}
"#;

lazy_static! {
	static ref PERSON: Schema = PERSON_SCHEMA.parse().unwrap();
	static ref LIST: Schema = LIST_SCHEMA.parse().unwrap();
}

#[test]
fn primitive_round_trip() {
	let s = schema(r#""int""#);
	let mut value = GenericValue::new(&s).unwrap();
	value.set_int(42).unwrap();
	let datum = avro_specific::encode_datum_vec(&s, &value).unwrap();
	assert_eq!(datum, [84]);

	let resolved = Resolved::new(&s, &s).unwrap();
	let mut decoded = GenericValue::new(&s).unwrap();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut decoded).unwrap();
	assert_eq!(decoded.get_int().unwrap(), 42);

	// the raw target decodes straight into a native slot
	let raw = Resolved::new_raw(&s, RawTarget::Int).unwrap();
	let mut slot: i32 = 0;
	avro_specific::decode_datum_slice(&raw, &datum, &mut slot).unwrap();
	assert_eq!(slot, 42);
}

fn fill_person(person: &mut dyn Value, first_name: &str, age: i32, children: usize) {
	person
		.get_by_name_mut("first_name")
		.unwrap()
		.unwrap()
		.set_string(first_name)
		.unwrap();
	person
		.get_by_name_mut("last_name")
		.unwrap()
		.unwrap()
		.set_string("Smith")
		.unwrap();
	person
		.get_by_name_mut("age")
		.unwrap()
		.unwrap()
		.set_int(age)
		.unwrap();
	let kids = person.get_by_name_mut("children").unwrap().unwrap();
	for i in 0..children {
		let child = kids.append().unwrap();
		fill_person(child, &format!("kid{i}"), age - 25, 0);
	}
}

#[test]
fn recursive_person_tree_round_trip() {
	let s: &Schema = &PERSON;
	let mut value = GenericValue::new(s).unwrap();
	fill_person(&mut value, "Ada", 60, 2);
	// give the two children two children each
	for i in 0..2 {
		let kids = value.get_by_name_mut("children").unwrap().unwrap();
		let child = kids.get_by_index_mut(i).unwrap();
		let grandkids = child.get_by_name_mut("children").unwrap().unwrap();
		for j in 0..2 {
			let grandchild = grandkids.append().unwrap();
			fill_person(grandchild, &format!("grandkid{i}{j}"), 10, 0);
		}
	}

	let datum = avro_specific::encode_datum_vec(s, &value).unwrap();
	let resolved = Resolved::new(s, s).unwrap();
	let mut decoded = GenericValue::new(s).unwrap();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut decoded).unwrap();
	assert_eq!(decoded, value);

	let children = decoded.get_by_name("children").unwrap().unwrap().0;
	assert_eq!(children.size().unwrap(), 2);
	for i in 0..2 {
		let child = children.get_by_index(i).unwrap().0;
		assert_eq!(
			child.get_by_name("children").unwrap().unwrap().0.size().unwrap(),
			2
		);
	}

	// decoding again into the same target reuses its storage and yields
	// the same value
	avro_specific::decode_datum_slice(&resolved, &datum, &mut decoded).unwrap();
	assert_eq!(decoded, value);
}

#[test]
fn recursive_list_round_trip() {
	let s: &Schema = &LIST;
	let mut list = GenericValue::new(s).unwrap();

	// Node(1, Node(2, Node(3, null)))
	fn build_list(node: &mut dyn Value, values: &[i32]) {
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
				build_list(next.current_branch_mut().unwrap(), &values[1..]);
			}
		}
	}
	build_list(&mut list, &[1, 2, 3]);

	let datum = avro_specific::encode_datum_vec(s, &list).unwrap();
	let resolved = Resolved::new(s, s).unwrap();
	// resolution of a recursive schema terminates on a small, shared plan
	assert!(resolved.consumer_count() <= 8);

	let mut decoded = GenericValue::new(s).unwrap();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut decoded).unwrap();
	assert_eq!(decoded, list);

	// walk the decoded structure
	let mut node: &dyn Value = &decoded;
	for expected in [1, 2, 3] {
		assert_eq!(
			node.get_by_name("value").unwrap().unwrap().0.get_int().unwrap(),
			expected
		);
		let next = node.get_by_name("next").unwrap().unwrap().0;
		if expected == 3 {
			assert_eq!(next.discriminant().unwrap(), 0);
		} else {
			assert_eq!(next.discriminant().unwrap(), 1);
			node = next.current_branch().unwrap();
		}
	}
}

#[test]
fn union_round_trip_on_both_sides() {
	let s = schema(r#"["int", "string"]"#);
	let resolved = Resolved::new(&s, &s).unwrap();

	let mut value = GenericValue::new(&s).unwrap();
	value.set_branch(0).unwrap();
	value.current_branch_mut().unwrap().set_int(7).unwrap();
	let datum = avro_specific::encode_datum_vec(&s, &value).unwrap();
	assert_eq!(datum, [0, 14]);
	let mut decoded = GenericValue::new(&s).unwrap();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut decoded).unwrap();
	assert_eq!(decoded.discriminant().unwrap(), 0);
	assert_eq!(decoded.current_branch().unwrap().get_int().unwrap(), 7);

	value.set_branch(1).unwrap();
	value
		.current_branch_mut()
		.unwrap()
		.set_string("hello")
		.unwrap();
	let datum = avro_specific::encode_datum_vec(&s, &value).unwrap();
	let mut decoded = GenericValue::new(&s).unwrap();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut decoded).unwrap();
	assert_eq!(decoded.discriminant().unwrap(), 1);
	assert_eq!(
		decoded.current_branch().unwrap().get_string().unwrap(),
		"hello"
	);
}

#[test]
fn int_promotes_to_long_float_double() {
	let writer = schema(r#""int""#);
	let mut value = GenericValue::new(&writer).unwrap();
	value.set_int(-1).unwrap();
	let datum = avro_specific::encode_datum_vec(&writer, &value).unwrap();
	assert_eq!(datum, [1]);

	let reader = schema(r#""long""#);
	let resolved = Resolved::new(&writer, &reader).unwrap();
	let mut decoded = GenericValue::new(&reader).unwrap();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut decoded).unwrap();
	assert_eq!(decoded.get_long().unwrap(), -1);

	let reader = schema(r#""double""#);
	let resolved = Resolved::new(&writer, &reader).unwrap();
	let mut decoded = GenericValue::new(&reader).unwrap();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut decoded).unwrap();
	assert_eq!(decoded.get_double().unwrap(), -1.0);

	// the reverse direction is not a valid promotion
	assert_eq!(
		Resolved::new(&reader, &writer).unwrap_err().kind(),
		ResolveErrorKind::Incompatible
	);
}

#[test]
fn float_promotes_to_double() {
	let writer = schema(r#""float""#);
	let mut value = GenericValue::new(&writer).unwrap();
	value.set_float(1.5).unwrap();
	let datum = avro_specific::encode_datum_vec(&writer, &value).unwrap();

	let reader = schema(r#""double""#);
	let resolved = Resolved::new(&writer, &reader).unwrap();
	let mut decoded = GenericValue::new(&reader).unwrap();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut decoded).unwrap();
	assert_eq!(decoded.get_double().unwrap(), 1.5);
}

#[test]
fn bytes_and_string_interchange() {
	let writer = schema(r#""bytes""#);
	let mut value = GenericValue::new(&writer).unwrap();
	value.set_bytes(b"raw").unwrap();
	let datum = avro_specific::encode_datum_vec(&writer, &value).unwrap();

	let reader = schema(r#""string""#);
	let resolved = Resolved::new(&writer, &reader).unwrap();
	let mut decoded = GenericValue::new(&reader).unwrap();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut decoded).unwrap();
	assert_eq!(decoded.get_string().unwrap(), "raw");

	let resolved = Resolved::new(&reader, &writer).unwrap();
	let mut value = GenericValue::new(&reader).unwrap();
	value.set_string("text").unwrap();
	let datum = avro_specific::encode_datum_vec(&reader, &value).unwrap();
	let mut decoded = GenericValue::new(&writer).unwrap();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut decoded).unwrap();
	assert_eq!(decoded.get_bytes().unwrap(), b"text");
}

#[test]
fn map_round_trip_preserves_wire_order() {
	let s = schema(r#"{"type": "map", "values": "long"}"#);
	let mut value = GenericValue::new(&s).unwrap();
	for (key, v) in [("b", 3i64), ("a", 1), ("c", 2)] {
		value.add(key).unwrap().0.set_long(v).unwrap();
	}
	let datum = avro_specific::encode_datum_vec(&s, &value).unwrap();
	let resolved = Resolved::new(&s, &s).unwrap();
	let mut decoded = GenericValue::new(&s).unwrap();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut decoded).unwrap();
	assert_eq!(decoded, value);
	// wire order becomes insertion order on the target
	assert_eq!(decoded.get_by_index(0).unwrap().1, Some("b"));
	assert_eq!(decoded.get_by_index(2).unwrap().1, Some("c"));
}

#[test]
fn enum_symbols_map_by_name() {
	let writer = schema(r#"{"type": "enum", "name": "Suit", "symbols": ["A", "B", "C"]}"#);
	let reader = schema(r#"{"type": "enum", "name": "Suit", "symbols": ["C", "B", "A"]}"#);
	let resolved = Resolved::new(&writer, &reader).unwrap();

	let mut value = GenericValue::new(&writer).unwrap();
	value.set_enum(0).unwrap(); // "A"
	let datum = avro_specific::encode_datum_vec(&writer, &value).unwrap();
	let mut decoded = GenericValue::new(&reader).unwrap();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut decoded).unwrap();
	// "A" sits at position 2 on the reader side
	assert_eq!(decoded.get_enum().unwrap(), 2);
}

#[test]
fn enum_mapping_is_strict_by_default_lenient_on_request() {
	let writer = schema(r#"{"type": "enum", "name": "Suit", "symbols": ["A", "B", "X"]}"#);
	let reader = schema(r#"{"type": "enum", "name": "Suit", "symbols": ["A", "B"]}"#);

	assert_eq!(
		Resolved::new(&writer, &reader).unwrap_err().kind(),
		ResolveErrorKind::Incompatible
	);

	let config = ResolverConfig {
		lenient_enums: true,
		..ResolverConfig::default()
	};
	let resolved = Resolved::with_config(&writer, &reader, &config).unwrap();

	// mapped symbols still decode
	let mut value = GenericValue::new(&writer).unwrap();
	value.set_enum(1).unwrap();
	let datum = avro_specific::encode_datum_vec(&writer, &value).unwrap();
	let mut decoded = GenericValue::new(&reader).unwrap();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut decoded).unwrap();
	assert_eq!(decoded.get_enum().unwrap(), 1);

	// the unmapped one only fails if it actually arrives
	value.set_enum(2).unwrap();
	let datum = avro_specific::encode_datum_vec(&writer, &value).unwrap();
	let mut decoded = GenericValue::new(&reader).unwrap();
	assert!(avro_specific::decode_datum_slice(&resolved, &datum, &mut decoded).is_err());
}

#[test]
fn writer_only_fields_are_skipped_with_offsets_preserved() {
	let writer = schema(
		r#"{
			"type": "record",
			"name": "R",
			"fields": [
				{"name": "a", "type": "int"},
				{"name": "note", "type": "string"},
				{"name": "tags", "type": {"type": "array", "items": "string"}},
				{"name": "b", "type": "int"}
			]
		}"#,
	);
	let reader = schema(
		r#"{
			"type": "record",
			"name": "R",
			"fields": [
				{"name": "a", "type": "int"},
				{"name": "b", "type": "int"}
			]
		}"#,
	);

	let mut value = GenericValue::new(&writer).unwrap();
	value.get_by_index_mut(0).unwrap().set_int(1).unwrap();
	value
		.get_by_index_mut(1)
		.unwrap()
		.set_string("to be discarded")
		.unwrap();
	let tags = value.get_by_index_mut(2).unwrap();
	for tag in ["x", "y"] {
		tags.append().unwrap().set_string(tag).unwrap();
	}
	value.get_by_index_mut(3).unwrap().set_int(2).unwrap();

	let datum = avro_specific::encode_datum_vec(&writer, &value).unwrap();
	let resolved = Resolved::new(&writer, &reader).unwrap();
	let mut decoded = GenericValue::new(&reader).unwrap();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut decoded).unwrap();
	// the skipped string and array were fully consumed, so `b` decodes
	// from the right offset
	assert_eq!(decoded.get_by_index(0).unwrap().0.get_int().unwrap(), 1);
	assert_eq!(decoded.get_by_index(1).unwrap().0.get_int().unwrap(), 2);
}

#[test]
fn reader_only_fields_require_a_default() {
	let writer = schema(
		r#"{"type": "record", "name": "R", "fields": [{"name": "a", "type": "int"}]}"#,
	);
	let reader_no_default = schema(
		r#"{
			"type": "record",
			"name": "R",
			"fields": [
				{"name": "a", "type": "int"},
				{"name": "b", "type": "int"}
			]
		}"#,
	);
	assert_eq!(
		Resolved::new(&writer, &reader_no_default).unwrap_err().kind(),
		ResolveErrorKind::MissingDefault
	);

	let reader_with_default = schema(
		r#"{
			"type": "record",
			"name": "R",
			"fields": [
				{"name": "a", "type": "int"},
				{"name": "b", "type": "int", "default": 7}
			]
		}"#,
	);
	let resolved = Resolved::new(&writer, &reader_with_default).unwrap();
	let mut value = GenericValue::new(&writer).unwrap();
	value.get_by_index_mut(0).unwrap().set_int(5).unwrap();
	let datum = avro_specific::encode_datum_vec(&writer, &value).unwrap();
	let mut decoded = GenericValue::new(&reader_with_default).unwrap();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut decoded).unwrap();
	assert_eq!(decoded.get_by_index(0).unwrap().0.get_int().unwrap(), 5);
	// default materialization is not the decoder's job; the field is
	// simply left at its initialized state
	assert_eq!(decoded.get_by_index(1).unwrap().0.get_int().unwrap(), 0);
}

#[test]
fn fixed_sizes_must_match() {
	let writer = schema(r#"{"type": "fixed", "name": "F", "size": 4}"#);
	let reader = schema(r#"{"type": "fixed", "name": "F", "size": 8}"#);
	assert_eq!(
		Resolved::new(&writer, &reader).unwrap_err().kind(),
		ResolveErrorKind::Incompatible
	);

	let same = Resolved::new(&writer, &writer).unwrap();
	let mut value = GenericValue::new(&writer).unwrap();
	value.set_fixed(b"abcd").unwrap();
	let datum = avro_specific::encode_datum_vec(&writer, &value).unwrap();
	assert_eq!(datum, b"abcd");
	let mut decoded = GenericValue::new(&writer).unwrap();
	avro_specific::decode_datum_slice(&same, &datum, &mut decoded).unwrap();
	assert_eq!(decoded.get_fixed().unwrap(), b"abcd");
}

#[test]
fn union_with_no_compatible_branch_fails_to_resolve() {
	let writer = schema(r#"["int", "string"]"#);
	let reader = schema(r#""boolean""#);
	assert_eq!(
		Resolved::new(&writer, &reader).unwrap_err().kind(),
		ResolveErrorKind::Incompatible
	);
}

#[test]
fn incompatible_branch_only_fails_if_selected() {
	let writer = schema(r#"["int", "string"]"#);
	let reader = schema(r#""int""#);
	// one branch suffices for compilation to succeed
	let resolved = Resolved::new(&writer, &reader).unwrap();

	let mut value = GenericValue::new(&writer).unwrap();
	value.set_branch(0).unwrap();
	value.current_branch_mut().unwrap().set_int(9).unwrap();
	let datum = avro_specific::encode_datum_vec(&writer, &value).unwrap();
	let mut slot = GenericValue::new(&reader).unwrap();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut slot).unwrap();
	assert_eq!(slot.get_int().unwrap(), 9);

	// selecting the unresolved branch at decode time is the error
	value.set_branch(1).unwrap();
	value
		.current_branch_mut()
		.unwrap()
		.set_string("nope")
		.unwrap();
	let datum = avro_specific::encode_datum_vec(&writer, &value).unwrap();
	let mut slot = GenericValue::new(&reader).unwrap();
	let error = avro_specific::decode_datum_slice(&resolved, &datum, &mut slot).unwrap_err();
	assert_eq!(error.kind(), DeErrorKind::IncompatibleBranch);
}

#[test]
fn non_union_writer_into_reader_union() {
	let writer = schema(r#""int""#);
	let reader = schema(r#"["null", "int"]"#);
	let resolved = Resolved::new(&writer, &reader).unwrap();

	let mut value = GenericValue::new(&writer).unwrap();
	value.set_int(5).unwrap();
	let datum = avro_specific::encode_datum_vec(&writer, &value).unwrap();
	// no discriminant on the wire: the branch selector picks it on the
	// reader side
	assert_eq!(datum, [10]);
	let mut decoded = GenericValue::new(&reader).unwrap();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut decoded).unwrap();
	assert_eq!(decoded.discriminant().unwrap(), 1);
	assert_eq!(decoded.current_branch().unwrap().get_int().unwrap(), 5);
}

#[test]
fn writer_union_into_raw_slot() {
	let writer = schema(r#"["null", "long"]"#);
	let resolved = Resolved::new_raw(&writer, RawTarget::Long).unwrap();

	let mut value = GenericValue::new(&writer).unwrap();
	value.set_branch(1).unwrap();
	value.current_branch_mut().unwrap().set_long(1234).unwrap();
	let datum = avro_specific::encode_datum_vec(&writer, &value).unwrap();
	let mut slot: i64 = 0;
	avro_specific::decode_datum_slice(&resolved, &datum, &mut slot).unwrap();
	assert_eq!(slot, 1234);

	// the null branch did not resolve against the long target
	value.set_branch(0).unwrap();
	let datum = avro_specific::encode_datum_vec(&writer, &value).unwrap();
	let mut slot: i64 = 0;
	let error = avro_specific::decode_datum_slice(&resolved, &datum, &mut slot).unwrap_err();
	assert_eq!(error.kind(), DeErrorKind::IncompatibleBranch);
}

#[test]
fn resolution_depth_is_bounded() {
	use avro_specific::schema::{Name, Record, RecordField, SchemaKey, SchemaMut, SchemaNode};

	let depth = 80;
	let mut nodes = Vec::new();
	for i in 0..depth {
		nodes.push(SchemaNode::Record(Record::new(
			Name::from_fully_qualified_name(format!("R{i}")),
			vec![RecordField::new("f", SchemaKey::from_idx(i + 1))],
		)));
	}
	nodes.push(SchemaNode::Int);
	let deep: Schema = SchemaMut::from_nodes(nodes).freeze().unwrap();

	assert_eq!(
		Resolved::new(&deep, &deep).unwrap_err().kind(),
		ResolveErrorKind::RecursionLimit
	);

	// a tighter bound can be requested for shallow schemas too
	let config = ResolverConfig {
		max_depth: 2,
		..ResolverConfig::default()
	};
	assert_eq!(
		Resolved::with_config(&PERSON, &PERSON, &config)
			.unwrap_err()
			.kind(),
		ResolveErrorKind::RecursionLimit
	);
}

#[test]
fn decode_from_reader_matches_decode_from_slice() {
	let s: &Schema = &PERSON;
	let mut value = GenericValue::new(s).unwrap();
	fill_person(&mut value, "Grace", 46, 1);
	let datum = avro_specific::encode_datum_vec(s, &value).unwrap();

	let resolved = Resolved::new(s, s).unwrap();
	let mut from_slice = GenericValue::new(s).unwrap();
	avro_specific::decode_datum_slice(&resolved, &datum, &mut from_slice).unwrap();
	let mut from_reader = GenericValue::new(s).unwrap();
	avro_specific::decode_datum_reader(&resolved, std::io::BufReader::new(&datum[..]), &mut from_reader)
		.unwrap();
	assert_eq!(from_slice, value);
	assert_eq!(from_reader, value);
}
