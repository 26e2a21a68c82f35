//! Stable name derivation for generated layouts
//!
//! Named types (records, enums, fixeds) use their schema name. Structural
//! types get a name derived from their shape: `array_<item>`,
//! `map_<value>`, and unions join their branches' type names with
//! underscores. Deriving names from shape is also what deduplicates
//! structurally identical layouts: two occurrences of `array<long>` both
//! derive `array_long` and are emitted once.

use crate::schema::{SchemaKey, SchemaMut, SchemaNode};

// The full list of Rust keywords, in use and reserved, that a schema field
// name could collide with.
const RUST_KEYWORDS: &[&str] = &[
	"abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
	"dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
	"let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
	"return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
	"use", "virtual", "where", "while", "yield",
];

// Keywords that cannot be used as raw identifiers either.
const UNRAWABLE: &[&str] = &["self", "Self", "super", "crate"];

/// The flat type name of a node: its schema name for named types, its kind
/// name otherwise
pub(crate) fn simple_name(node: &SchemaNode) -> &str {
	match node.name() {
		Some(name) => name.name(),
		None => node.kind_name(),
	}
}

/// The raw (unprefixed, not-yet-cased) layout name derived for a node
pub(crate) fn raw_type_name(schema: &SchemaMut, key: SchemaKey) -> String {
	match &schema[key] {
		SchemaNode::Array(array) => format!("array_{}", element_name(schema, array.items)),
		SchemaNode::Map(map) => format!("map_{}", element_name(schema, map.values)),
		SchemaNode::Union(union) => union_name(schema, &union.variants),
		node => simple_name(node).to_owned(),
	}
}

fn element_name(schema: &SchemaMut, key: SchemaKey) -> String {
	match &schema[key] {
		SchemaNode::Array(array) => format!("array_{}", element_name(schema, array.items)),
		SchemaNode::Map(map) => format!("map_{}", element_name(schema, map.values)),
		SchemaNode::Union(union) => union_name(schema, &union.variants),
		node => simple_name(node).to_owned(),
	}
}

fn union_name(schema: &SchemaMut, variants: &[SchemaKey]) -> String {
	variants
		.iter()
		.map(|&variant| simple_name(&schema[variant]))
		.collect::<Vec<_>>()
		.join("_")
}

/// `person` -> `Person`, `null_Node` -> `NullNode`, `SPADES` -> `Spades`
pub(crate) fn pascal_case(s: &str) -> String {
	let mut out = String::with_capacity(s.len());
	for segment in s.split(|c: char| !c.is_ascii_alphanumeric()) {
		let mut chars = segment.chars();
		if let Some(first) = chars.next() {
			out.extend(first.to_uppercase());
			for c in chars {
				out.extend(c.to_lowercase());
			}
		}
	}
	out
}

/// `NullNode` -> `null_node`, `person` -> `person`
pub(crate) fn snake_case(s: &str) -> String {
	let mut out = String::with_capacity(s.len() + 4);
	let mut prev_lower = false;
	for c in s.chars() {
		if c.is_ascii_uppercase() {
			if prev_lower {
				out.push('_');
			}
			out.extend(c.to_lowercase());
			prev_lower = false;
		} else if c.is_ascii_alphanumeric() {
			out.push(c);
			prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
		} else {
			if !out.ends_with('_') {
				out.push('_');
			}
			prev_lower = false;
		}
	}
	out
}

/// `null_Node` -> `NULL_NODE`
pub(crate) fn upper_snake_case(s: &str) -> String {
	snake_case(s).to_uppercase()
}

/// Make a schema field name usable as a Rust struct field identifier
pub(crate) fn field_ident(name: &str) -> String {
	if UNRAWABLE.contains(&name) {
		format!("{name}_")
	} else if RUST_KEYWORDS.contains(&name) {
		format!("r#{name}")
	} else {
		name.to_owned()
	}
}
