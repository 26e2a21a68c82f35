//! Schema JSON -> [`SchemaMut`]
//!
//! The JSON is parsed into a `serde_json::Value` tree first and walked
//! from there: schema documents are small, and working on the parsed tree
//! keeps every structural rule (wrapper objects, namespaces, name
//! references) in one readable pass.
//!
//! Name references resolve against the named types defined earlier in the
//! document, which is also what the wire specification requires; a
//! self-reference works because a named type is registered before its
//! children are walked, and that is the sole mechanism through which a
//! schema becomes recursive.

use crate::schema::{
	safe::{Array, Enum, Map, Record, RecordField, SchemaKey, SchemaMut, SchemaNode, Union},
	Fixed, Name, SchemaError,
};

use {serde_json::Value as Json, std::collections::HashMap};

impl std::str::FromStr for SchemaMut {
	type Err = SchemaError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let document: Json = serde_json::from_str(s).map_err(SchemaError::serde_json)?;
		let mut parser = Parser {
			nodes: Vec::new(),
			names: HashMap::new(),
		};
		parser.parse_node(&document, None)?;
		let schema = SchemaMut {
			nodes: parser.nodes,
		};
		schema.validate()?;
		Ok(schema)
	}
}

fn primitive_node(type_name: &str) -> Option<SchemaNode> {
	Some(match type_name {
		"null" => SchemaNode::Null,
		"boolean" => SchemaNode::Boolean,
		"int" => SchemaNode::Int,
		"long" => SchemaNode::Long,
		"float" => SchemaNode::Float,
		"double" => SchemaNode::Double,
		"bytes" => SchemaNode::Bytes,
		"string" => SchemaNode::String,
		_ => return None,
	})
}

struct Parser {
	nodes: Vec<SchemaNode>,
	/// Fully qualified name -> node index, for every named type defined so
	/// far in the walk
	names: HashMap<String, usize>,
}

impl Parser {
	fn add(&mut self, node: SchemaNode) -> SchemaKey {
		let idx = self.nodes.len();
		self.nodes.push(node);
		SchemaKey::from_idx(idx)
	}

	fn parse_node(
		&mut self,
		json: &Json,
		enclosing_namespace: Option<&str>,
	) -> Result<SchemaKey, SchemaError> {
		match json {
			Json::String(type_name) => self.parse_type_name(type_name, enclosing_namespace),
			// A bare JSON array is a union
			Json::Array(branches) => {
				let slot = self.add(SchemaNode::Null);
				let variants = branches
					.iter()
					.map(|branch| self.parse_node(branch, enclosing_namespace))
					.collect::<Result<_, _>>()?;
				self.nodes[slot.idx()] = SchemaNode::Union(Union::new(variants));
				Ok(slot)
			}
			Json::Object(_) => self.parse_object(json, enclosing_namespace),
			other => Err(SchemaError::msg(format_args!(
				"Expected a type name, a union array or a type object, got: {other}"
			))),
		}
	}

	/// A bare string: a primitive kind, or the name of an
	/// already-defined type
	fn parse_type_name(
		&mut self,
		type_name: &str,
		enclosing_namespace: Option<&str>,
	) -> Result<SchemaKey, SchemaError> {
		if let Some(node) = primitive_node(type_name) {
			return Ok(self.add(node));
		}
		if matches!(
			type_name,
			"record" | "enum" | "fixed" | "array" | "map" | "union"
		) {
			return Err(SchemaError::msg(format_args!(
				"Complex type {type_name} must be spelled as a JSON object"
			)));
		}
		let name = qualified(type_name, None, enclosing_namespace);
		match self.names.get(name.fully_qualified_name()) {
			Some(&idx) => Ok(SchemaKey::from_idx(idx)),
			None => Err(SchemaError::msg(format_args!(
				"Reference to undefined type {} (named types must be defined before use)",
				name.fully_qualified_name()
			))),
		}
	}

	fn parse_object(
		&mut self,
		json: &Json,
		enclosing_namespace: Option<&str>,
	) -> Result<SchemaKey, SchemaError> {
		let type_field = json
			.get("type")
			.ok_or_else(|| SchemaError::new("Type object is missing its `type` field"))?;

		let type_name = match type_field {
			// An object whose `type` is itself a type (or a union) is just
			// a wrapper; refuse it if it carries attributes that would
			// silently be ignored.
			Json::Array(_) | Json::Object(_) => {
				for attribute in ["name", "fields", "symbols", "items", "values", "size"] {
					if json.get(attribute).is_some() {
						return Err(SchemaError::msg(format_args!(
							"Wrapper object around a nested type would ignore its `{attribute}` attribute"
						)));
					}
				}
				return self.parse_node(type_field, enclosing_namespace);
			}
			Json::String(type_name) => type_name.as_str(),
			other => {
				return Err(SchemaError::msg(format_args!(
					"Invalid `type` field: {other}"
				)))
			}
		};

		let required = |attribute: &'static str| {
			json.get(attribute).ok_or_else(|| {
				SchemaError::msg(format_args!(
					"Missing `{attribute}` on a {type_name} schema"
				))
			})
		};

		Ok(match type_name {
			"array" => {
				let slot = self.add(SchemaNode::Null);
				let items = self.parse_node(required("items")?, enclosing_namespace)?;
				self.nodes[slot.idx()] = SchemaNode::Array(Array::new(items));
				slot
			}
			"map" => {
				let slot = self.add(SchemaNode::Null);
				let values = self.parse_node(required("values")?, enclosing_namespace)?;
				self.nodes[slot.idx()] = SchemaNode::Map(Map::new(values));
				slot
			}
			"fixed" => {
				let slot = self.add(SchemaNode::Null);
				let name = self.define_name(json, enclosing_namespace, slot)?;
				let size = required("size")?
					.as_u64()
					.and_then(|size| usize::try_from(size).ok())
					.ok_or_else(|| SchemaError::new("`size` of a fixed schema must be an unsigned integer"))?;
				self.nodes[slot.idx()] = SchemaNode::Fixed(Fixed::new(name, size));
				slot
			}
			"enum" => {
				let slot = self.add(SchemaNode::Null);
				let name = self.define_name(json, enclosing_namespace, slot)?;
				let symbols = required("symbols")?
					.as_array()
					.ok_or_else(|| SchemaError::new("`symbols` of an enum schema must be an array"))?
					.iter()
					.map(|symbol| {
						symbol.as_str().map(str::to_owned).ok_or_else(|| {
							SchemaError::msg(format_args!("Enum symbol is not a string: {symbol}"))
						})
					})
					.collect::<Result<_, _>>()?;
				self.nodes[slot.idx()] = SchemaNode::Enum(Enum::new(name, symbols));
				slot
			}
			"record" => {
				let slot = self.add(SchemaNode::Null);
				// Registered before the fields are walked, so that fields
				// may refer back to the record being defined
				let name = self.define_name(json, enclosing_namespace, slot)?;
				let fields_json = required("fields")?
					.as_array()
					.ok_or_else(|| SchemaError::new("`fields` of a record schema must be an array"))?;
				let mut fields = Vec::with_capacity(fields_json.len());
				for field_json in fields_json {
					let field_name = field_json
						.get("name")
						.and_then(Json::as_str)
						.ok_or_else(|| SchemaError::new("Record field is missing its `name`"))?;
					let field_type = field_json.get("type").ok_or_else(|| {
						SchemaError::msg(format_args!("Record field {field_name} is missing its `type`"))
					})?;
					let mut field =
						RecordField::new(field_name, self.parse_node(field_type, name.namespace())?);
					field.default = field_json.get("default").cloned();
					fields.push(field);
				}
				self.nodes[slot.idx()] = SchemaNode::Record(Record::new(name, fields));
				slot
			}
			// e.g. {"type": "string"} or {"type": "SomeName"}, possibly
			// carrying extra attributes we have no use for
			other => self.parse_type_name(other, enclosing_namespace)?,
		})
	}

	/// Resolve the object's `name`/`namespace` attributes and register the
	/// result as pointing at `slot`
	fn define_name(
		&mut self,
		json: &Json,
		enclosing_namespace: Option<&str>,
		slot: SchemaKey,
	) -> Result<Name, SchemaError> {
		let local = json
			.get("name")
			.and_then(Json::as_str)
			.ok_or_else(|| SchemaError::new("Missing `name` on a named type"))?;
		let explicit_namespace = json.get("namespace").and_then(Json::as_str);
		let name = qualified(local, explicit_namespace, enclosing_namespace);
		if self
			.names
			.insert(name.fully_qualified_name().to_owned(), slot.idx())
			.is_some()
		{
			return Err(SchemaError::msg(format_args!(
				"Type {} is defined more than once",
				name.fully_qualified_name()
			)));
		}
		Ok(name)
	}
}

/// Apply the name qualification rules: a dotted name is taken as already
/// fully qualified; otherwise the explicit `namespace` attribute applies
/// (an empty string selecting the null namespace), falling back to the
/// enclosing type's namespace.
fn qualified(local: &str, explicit_namespace: Option<&str>, enclosing_namespace: Option<&str>) -> Name {
	if local.contains('.') {
		return Name::from_fully_qualified_name(local);
	}
	let namespace = match explicit_namespace {
		Some("") => None,
		Some(explicit) => Some(explicit),
		None => enclosing_namespace,
	};
	match namespace {
		Some(namespace) => Name::from_fully_qualified_name(format!("{namespace}.{local}")),
		None => Name::from_fully_qualified_name(local),
	}
}
