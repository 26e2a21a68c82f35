//! Schema parsing, validation and re-serialization

use avro_specific::{schema::SchemaMut, Schema};

use pretty_assertions::assert_eq;

#[test]
fn forbids_zero_sized_cycles() {
	let schema = r#"
	{
		"type": "record",
		"name": "A",
		"fields": [
			{
				"name": "a",
				"type": {
					"type": "record",
					"name": "B",
					"fields": [
						{
							"name": "b",
							"type": "A"
						}
					]
				}
			}
		]
	}"#;
	let error = schema.parse::<Schema>().unwrap_err().to_string();
	assert!(error.contains("record-only cycle"));
	assert!(error.contains("cannot be finite"));
}

#[test]
fn conditional_self_reference_is_allowed() {
	let schema: Schema = r#"
	{
		"type": "record",
		"name": "Node",
		"fields": [
			{"name": "value", "type": "int"},
			{"name": "next", "type": ["null", "Node"]}
		]
	}"#
	.parse()
	.unwrap();
	assert!(schema.json().contains(r#""name":"Node""#));
}

#[test]
fn unknown_references_are_rejected() {
	let error = r#"
	{
		"type": "record",
		"name": "R",
		"fields": [{"name": "f", "type": "Mystery"}]
	}"#
	.parse::<Schema>()
	.unwrap_err();
	assert!(error.to_string().contains("undefined type"));
	assert!(error.to_string().contains("Mystery"));
}

#[test]
fn duplicate_record_fields_are_rejected() {
	let error = r#"
	{
		"type": "record",
		"name": "R",
		"fields": [
			{"name": "f", "type": "int"},
			{"name": "f", "type": "string"}
		]
	}"#
	.parse::<Schema>()
	.unwrap_err();
	assert!(error.to_string().contains("duplicate field"));
}

#[test]
fn duplicate_enum_symbols_are_rejected() {
	let error = r#"{"type": "enum", "name": "E", "symbols": ["A", "A"]}"#
		.parse::<Schema>()
		.unwrap_err();
	assert!(error.to_string().contains("duplicate symbol"));
}

#[test]
fn union_branches_must_be_distinguishable() {
	let error = r#"["int", "int"]"#.parse::<Schema>().unwrap_err();
	assert!(error.to_string().contains("multiple branches"));

	let error = r#"["int", ["null", "string"]]"#.parse::<Schema>().unwrap_err();
	assert!(error
		.to_string()
		.contains("may not immediately contain other unions"));

	// two named branches of the same kind are fine
	let ok: Schema = r#"[
		{"type": "fixed", "name": "A", "size": 1},
		{"type": "fixed", "name": "B", "size": 2}
	]"#
	.parse()
	.unwrap();
	assert!(ok.json().contains(r#""name":"A""#));
}

#[test]
fn references_resolve_against_earlier_definitions() {
	// the definition comes first, the reference after
	let schema: Schema = r#"
	{
		"type": "record",
		"name": "Outer",
		"fields": [
			{"name": "first", "type": {"type": "fixed", "name": "Inner", "size": 2}},
			{"name": "second", "type": "Inner"}
		]
	}"#
	.parse()
	.unwrap();
	assert!(schema.json().contains(r#""size":2"#));

	// a reference ahead of its definition is an undefined name
	let error = r#"
	{
		"type": "record",
		"name": "Outer",
		"fields": [
			{"name": "first", "type": "Inner"},
			{"name": "second", "type": {"type": "fixed", "name": "Inner", "size": 2}}
		]
	}"#
	.parse::<Schema>()
	.unwrap_err();
	assert!(error.to_string().contains("undefined type"));
}

#[test]
fn namespaces_qualify_names() {
	let schema: Schema = r#"
	{
		"type": "record",
		"name": "Rec",
		"namespace": "com.example",
		"fields": [
			{"name": "next", "type": ["null", "com.example.Rec"]},
			{"name": "sibling", "type": ["null", "Rec"]}
		]
	}"#
	.parse()
	.unwrap();
	// both the qualified and the enclosing-namespace-relative reference
	// resolved to the same record
	assert!(schema.json().contains(r#""name":"com.example.Rec""#));
}

#[test]
fn json_round_trips_through_parse() {
	let original = r#"
	{
		"type": "record",
		"name": "person",
		"fields": [
			{"name": "first_name", "type": "string"},
			{"name": "age", "type": "int", "default": 0},
			{"name": "children", "type": {"type": "array", "items": "person"}}
		]
	}"#;
	let schema: Schema = original.parse().unwrap();
	// the regenerated JSON parses back to an equivalent schema
	let reparsed: Schema = schema.json().parse().unwrap();
	assert_eq!(schema.json(), reparsed.json());
	// defaults survive the round trip
	assert!(schema.json().contains(r#""default":0"#));
}

#[test]
fn sub_schema_json_is_self_contained() {
	let schema: SchemaMut = r#"
	{
		"type": "record",
		"name": "Node",
		"fields": [
			{"name": "value", "type": "int"},
			{"name": "next", "type": ["null", "Node"]}
		]
	}"#
	.parse()
	.unwrap();

	// the union node is index 2 (root record, int, union, ...)
	let union_key = schema
		.nodes()
		.iter()
		.position(|node| matches!(node, avro_specific::schema::SchemaNode::Union(_)))
		.unwrap();
	let json = schema
		.node_json(avro_specific::schema::SchemaKey::from_idx(union_key))
		.unwrap();
	// the first occurrence of the record is a full definition, the
	// recursive one a name reference
	let parsed: Schema = json.parse().unwrap();
	assert!(parsed.json().contains(r#""fields""#));
}
