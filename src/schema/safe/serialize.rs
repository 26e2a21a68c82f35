//! Re-serialization of a [`SchemaMut`] (or any of its sub-nodes) to schema
//! JSON
//!
//! Named types are written in full the first time they are encountered and
//! as name references afterwards, which is also what keeps recursive
//! schemas finite.

use super::{SchemaError, SchemaKey, SchemaMut, SchemaNode};

use {
	serde_json::{json, Value as Json},
	std::collections::HashSet,
};

impl SchemaMut {
	/// Obtain the schema JSON for the whole schema
	pub fn serialize_to_json(&self) -> Result<String, SchemaError> {
		self.node_json(SchemaKey::root())
	}

	/// Obtain the schema JSON for the sub-schema rooted at `key`
	///
	/// This is notably used by the specific-type generator to embed, in
	/// each generated layout, the schema that layout was generated from.
	pub fn node_json(&self, key: SchemaKey) -> Result<String, SchemaError> {
		let mut written_names = HashSet::new();
		let value = self.node_json_value(key, &mut written_names)?;
		serde_json::to_string(&value).map_err(SchemaError::serde_json)
	}

	fn node_json_value(
		&self,
		key: SchemaKey,
		written_names: &mut HashSet<String>,
	) -> Result<Json, SchemaError> {
		let node = self.get(key).ok_or_else(|| {
			SchemaError::msg(format_args!(
				"SchemaKey index {} is out of bounds (len: {})",
				key.idx,
				self.nodes.len()
			))
		})?;

		if let Some(name) = node.name() {
			if !written_names.insert(name.fully_qualified_name().to_owned()) {
				// Already defined earlier in this serialization: refer to
				// it by name.
				return Ok(Json::String(name.fully_qualified_name().to_owned()));
			}
		}

		Ok(match node {
			SchemaNode::Null
			| SchemaNode::Boolean
			| SchemaNode::Int
			| SchemaNode::Long
			| SchemaNode::Float
			| SchemaNode::Double
			| SchemaNode::Bytes
			| SchemaNode::String => Json::String(node.kind_name().to_owned()),
			SchemaNode::Array(array) => json!({
				"type": "array",
				"items": self.node_json_value(array.items, written_names)?,
			}),
			SchemaNode::Map(map) => json!({
				"type": "map",
				"values": self.node_json_value(map.values, written_names)?,
			}),
			SchemaNode::Union(union) => Json::Array(
				union
					.variants
					.iter()
					.map(|&variant| self.node_json_value(variant, written_names))
					.collect::<Result<_, _>>()?,
			),
			SchemaNode::Record(record) => json!({
				"type": "record",
				"name": record.name.fully_qualified_name(),
				"fields": record
					.fields
					.iter()
					.map(|field| {
						let mut field_json = json!({
							"name": field.name,
							"type": self.node_json_value(field.type_, written_names)?,
						});
						if let (Some(default), Json::Object(obj)) =
							(&field.default, &mut field_json)
						{
							obj.insert("default".to_owned(), default.clone());
						}
						Ok(field_json)
					})
					.collect::<Result<Vec<_>, SchemaError>>()?,
			}),
			SchemaNode::Enum(enum_) => json!({
				"type": "enum",
				"name": enum_.name.fully_qualified_name(),
				"symbols": enum_.symbols,
			}),
			SchemaNode::Fixed(fixed) => json!({
				"type": "fixed",
				"name": fixed.name.fully_qualified_name(),
				"size": fixed.size,
			}),
		})
	}
}
