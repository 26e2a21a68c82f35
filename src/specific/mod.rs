//! Generation of specific types: fixed in-memory Rust layouts mirroring a
//! schema
//!
//! For every named type and every structural array/map/union reachable
//! from the schema root, the generator emits a layout declaration (struct,
//! enum or type alias), its lifecycle (`Default` for init, `Drop` for tear
//! down, a `clear` method for storage reuse, `PartialEq` for equality),
//! a [`Value`](crate::value::Value) implementation wiring the layout into
//! the polymorphic access protocol, the schema JSON the layout was
//! generated from, and a `<name>_resolver_new` constructor that compiles a
//! decode plan targeting the layout. Decoding therefore writes directly
//! into the generated layout with no intermediate generic tree.
//!
//! Three files are emitted per schema root, mirroring a
//! definitions/header/implementation split:
//! `<prefix><root>_def.rs` (declarations), `<prefix><root>_impl.rs`
//! (protocol wiring) and `<prefix><root>.rs`, the entry point that
//! `include!`s the other two and is meant to be declared as a module of
//! the consuming crate.

mod names;

use crate::schema::{SchemaError, SchemaKey, SchemaMut, SchemaNode};

use std::{collections::HashSet, fmt::Write};

/// Bound on schema nesting during generation
const MAX_RECURSION_DEPTH: usize = 64;

/// Any error that may happen while generating specific types
#[derive(thiserror::Error, Debug)]
pub enum GenError {
	/// The input schema is invalid
	#[error(transparent)]
	Schema(#[from] SchemaError),
	/// Schema nesting exceeds the generator's recursion limit
	#[error("Schema nesting exceeds the generator recursion limit")]
	RecursionLimit,
}

/// Naming configuration for generated code
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
	/// Prepended to every generated type name (default: empty)
	pub type_prefix: String,
	/// Prepended to every generated file name (default: `specific_`)
	pub filename_prefix: String,
}

impl Default for GeneratorConfig {
	fn default() -> Self {
		Self {
			type_prefix: String::new(),
			filename_prefix: "specific_".to_owned(),
		}
	}
}

/// One generated file: a name (no directory) and its full contents
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedFile {
	pub name: String,
	pub contents: String,
}

/// Generate the specific-type files for `schema`
///
/// The schema is validated first. Returns the three generated files; the
/// caller decides where (and whether) to write them.
pub fn generate(schema: &SchemaMut, config: &GeneratorConfig) -> Result<Vec<GeneratedFile>, GenError> {
	schema.validate()?;

	let mut generator = Generator {
		schema,
		config,
		started: HashSet::new(),
		defs: String::new(),
		impls: String::new(),
		uses_packed_array: false,
		uses_ordered_map: false,
		uses_raw_string: false,
	};
	generator.emit_type(SchemaKey::root(), MAX_RECURSION_DEPTH)?;

	// A primitive root emits no layout, but still gets its schema constant
	// and resolver constructor so the generated module is usable.
	if !matches!(
		&schema[SchemaKey::root()],
		SchemaNode::Array(_)
			| SchemaNode::Map(_)
			| SchemaNode::Union(_)
			| SchemaNode::Record(_)
			| SchemaNode::Enum(_)
			| SchemaNode::Fixed(_)
	) {
		let raw_name = names::raw_type_name(schema, SchemaKey::root());
		generator.emit_resolver_entry_points(&raw_name, SchemaKey::root(), None)?;
	}

	let root_file_name = names::snake_case(&names::raw_type_name(schema, SchemaKey::root()));
	let prefix = &config.filename_prefix;

	let def_name = format!("{prefix}{root_file_name}_def.rs");
	let impl_name = format!("{prefix}{root_file_name}_impl.rs");
	let module_name = format!("{prefix}{root_file_name}.rs");

	let mut def_contents = String::from("// Generated by avrosc. Do not edit.\n\n");
	{
		let mut data_imports = Vec::new();
		if generator.uses_ordered_map {
			data_imports.push("OrderedMap");
		}
		if generator.uses_packed_array {
			data_imports.push("PackedArray");
		}
		if generator.uses_raw_string {
			data_imports.push("RawString");
		}
		if !data_imports.is_empty() {
			def_contents.push_str(&format!(
				"use avro_specific::data::{{{}}};\n\n",
				data_imports.join(", ")
			));
		}
	}
	def_contents.push_str(&generator.defs);

	let mut impl_contents = String::from("// Generated by avrosc. Do not edit.\n\n");
	impl_contents.push_str(
		"use avro_specific::{\n\
		\tresolve::{ResolveError, Resolved},\n\
		\tvalue::{Value, ValueError, ValueKind},\n\
		\tSchema,\n\
		};\n\n",
	);
	impl_contents.push_str(&generator.impls);

	let module_contents = format!(
		"// Generated by avrosc. Do not edit.\n\n\
		include!(\"{def_name}\");\n\
		include!(\"{impl_name}\");\n"
	);

	Ok(vec![
		GeneratedFile {
			name: def_name,
			contents: def_contents,
		},
		GeneratedFile {
			name: impl_name,
			contents: impl_contents,
		},
		GeneratedFile {
			name: module_name,
			contents: module_contents,
		},
	])
}

struct Generator<'a> {
	schema: &'a SchemaMut,
	config: &'a GeneratorConfig,
	/// Layout names already emitted or being emitted; prevents re-entry on
	/// recursive records and deduplicates structurally identical layouts
	started: HashSet<String>,
	defs: String,
	impls: String,
	uses_packed_array: bool,
	uses_ordered_map: bool,
	uses_raw_string: bool,
}

impl Generator<'_> {
	/// The Rust type name for the layout of `raw_name`
	fn rust_name(&self, raw_name: &str) -> String {
		if self.config.type_prefix.is_empty() {
			names::pascal_case(raw_name)
		} else {
			names::pascal_case(&format!("{}_{}", self.config.type_prefix, raw_name))
		}
	}

	/// The Rust type a field/element of schema `key` has inside a layout
	fn rust_type_of(&mut self, key: SchemaKey) -> String {
		match &self.schema[key] {
			SchemaNode::Null => "()".to_owned(),
			SchemaNode::Boolean => "bool".to_owned(),
			SchemaNode::Int => "i32".to_owned(),
			SchemaNode::Long => "i64".to_owned(),
			SchemaNode::Float => "f32".to_owned(),
			SchemaNode::Double => "f64".to_owned(),
			SchemaNode::Bytes | SchemaNode::String => {
				self.uses_raw_string = true;
				"RawString".to_owned()
			}
			_ => self.rust_name(&names::raw_type_name(self.schema, key)),
		}
	}

	/// Whether a slot of schema `key` is cleared with `.clear()` (as
	/// opposed to being reset by plain reassignment)
	fn clears_with_method(&self, key: SchemaKey) -> bool {
		!matches!(
			&self.schema[key],
			SchemaNode::Null
				| SchemaNode::Boolean
				| SchemaNode::Int
				| SchemaNode::Long
				| SchemaNode::Float
				| SchemaNode::Double
		)
	}

	fn emit_type(&mut self, key: SchemaKey, depth: usize) -> Result<(), GenError> {
		let depth = depth.checked_sub(1).ok_or(GenError::RecursionLimit)?;

		match &self.schema[key] {
			// Primitives map to native slots; there is nothing to emit
			SchemaNode::Null
			| SchemaNode::Boolean
			| SchemaNode::Int
			| SchemaNode::Long
			| SchemaNode::Float
			| SchemaNode::Double
			| SchemaNode::Bytes
			| SchemaNode::String => return Ok(()),
			_ => {}
		}

		let raw_name = names::raw_type_name(self.schema, key);
		if !self.started.insert(raw_name.clone()) {
			// Already emitted (or in progress, for recursive records)
			return Ok(());
		}

		// Children first, so that a reader encounters layouts before their
		// uses; the started set above is what stops recursive descent.
		match self.schema[key].clone() {
			SchemaNode::Array(array) => self.emit_type(array.items, depth)?,
			SchemaNode::Map(map) => self.emit_type(map.values, depth)?,
			SchemaNode::Union(union) => {
				for &variant in &union.variants {
					self.emit_type(variant, depth)?;
				}
			}
			SchemaNode::Record(record) => {
				for field in &record.fields {
					self.emit_type(field.type_, depth)?;
				}
			}
			SchemaNode::Enum(_) | SchemaNode::Fixed(_) => {}
			_ => {}
		}

		match self.schema[key].clone() {
			SchemaNode::Array(array) => self.emit_array(&raw_name, key, array.items)?,
			SchemaNode::Map(map) => self.emit_map(&raw_name, key, map.values)?,
			SchemaNode::Union(union) => self.emit_union(&raw_name, key, &union.variants)?,
			SchemaNode::Record(record) => self.emit_record(&raw_name, key, &record)?,
			SchemaNode::Enum(enum_) => self.emit_enum(&raw_name, key, &enum_)?,
			SchemaNode::Fixed(fixed) => self.emit_fixed(&raw_name, key, &fixed)?,
			_ => {}
		}

		Ok(())
	}

	fn emit_array(&mut self, raw_name: &str, key: SchemaKey, items: SchemaKey) -> Result<(), GenError> {
		self.uses_packed_array = true;
		let name = self.rust_name(raw_name);
		let item_type = self.rust_type_of(items);
		let _ = writeln!(
			self.defs,
			"/// Layout for `{raw_name}`\npub type {name} = PackedArray<{item_type}>;\n"
		);
		self.emit_resolver_entry_points(raw_name, key, Some(&name))
	}

	fn emit_map(&mut self, raw_name: &str, key: SchemaKey, values: SchemaKey) -> Result<(), GenError> {
		self.uses_ordered_map = true;
		let name = self.rust_name(raw_name);
		let value_type = self.rust_type_of(values);
		let _ = writeln!(
			self.defs,
			"/// Layout for `{raw_name}`\npub type {name} = OrderedMap<{value_type}>;\n"
		);
		self.emit_resolver_entry_points(raw_name, key, Some(&name))
	}

	fn emit_fixed(
		&mut self,
		raw_name: &str,
		key: SchemaKey,
		fixed: &crate::schema::Fixed,
	) -> Result<(), GenError> {
		let name = self.rust_name(raw_name);
		let size = fixed.size;
		let _ = writeln!(
			self.defs,
			"/// Layout for fixed `{fq}` ({size} bytes)\n\
			#[derive(Clone, Debug, PartialEq, Eq)]\n\
			pub struct {name}(pub [u8; {size}]);\n\
			\n\
			impl Default for {name} {{\n\
			\tfn default() -> Self {{\n\
			\t\tSelf([0; {size}])\n\
			\t}}\n\
			}}\n\
			\n\
			impl {name} {{\n\
			\tpub fn clear(&mut self) {{\n\
			\t\tself.0 = [0; {size}];\n\
			\t}}\n\
			}}\n",
			fq = fixed.name.fully_qualified_name(),
		);

		let _ = writeln!(
			self.impls,
			"impl Value for {name} {{\n\
			\tfn kind(&self) -> ValueKind {{\n\
			\t\tValueKind::Fixed\n\
			\t}}\n\
			\tfn get_fixed(&self) -> Result<&[u8], ValueError> {{\n\
			\t\tOk(&self.0)\n\
			\t}}\n\
			\tfn set_fixed(&mut self, value: &[u8]) -> Result<(), ValueError> {{\n\
			\t\tif value.len() != {size} {{\n\
			\t\t\treturn Err(ValueError::FixedSize {{\n\
			\t\t\t\texpected: {size},\n\
			\t\t\t\tactual: value.len(),\n\
			\t\t\t}});\n\
			\t\t}}\n\
			\t\tself.0.copy_from_slice(value);\n\
			\t\tOk(())\n\
			\t}}\n\
			}}\n"
		);
		self.emit_resolver_entry_points(raw_name, key, Some(&name))
	}

	fn emit_enum(
		&mut self,
		raw_name: &str,
		key: SchemaKey,
		enum_: &crate::schema::Enum,
	) -> Result<(), GenError> {
		let name = self.rust_name(raw_name);
		let mut variants = Vec::with_capacity(enum_.symbols.len());
		for symbol in &enum_.symbols {
			let mut variant = names::pascal_case(symbol);
			while variants.contains(&variant) {
				variant.push('_');
			}
			variants.push(variant);
		}

		let _ = writeln!(
			self.defs,
			"/// Layout for enum `{fq}`\n\
			#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]\n\
			pub enum {name} {{",
			fq = enum_.name.fully_qualified_name(),
		);
		for (index, variant) in variants.iter().enumerate() {
			if index == 0 {
				let _ = writeln!(self.defs, "\t#[default]");
			}
			let _ = writeln!(self.defs, "\t{variant},");
		}
		let _ = writeln!(self.defs, "}}\n");

		let symbols_list = enum_
			.symbols
			.iter()
			.map(|s| format!("{s:?}"))
			.collect::<Vec<_>>()
			.join(", ");
		let _ = writeln!(
			self.defs,
			"impl {name} {{\n\
			\t/// The symbols of this enum, in schema order\n\
			\tpub const SYMBOLS: &'static [&'static str] = &[{symbols_list}];\n\
			\n\
			\tpub fn from_index(index: usize) -> Option<Self> {{\n\
			\t\tmatch index {{"
		);
		for (index, variant) in variants.iter().enumerate() {
			let _ = writeln!(self.defs, "\t\t\t{index} => Some(Self::{variant}),");
		}
		let _ = writeln!(
			self.defs,
			"\t\t\t_ => None,\n\
			\t\t}}\n\
			\t}}\n\
			\n\
			\tpub fn index(self) -> usize {{\n\
			\t\tself as usize\n\
			\t}}\n\
			\n\
			\tpub fn symbol(self) -> &'static str {{\n\
			\t\tSelf::SYMBOLS[self.index()]\n\
			\t}}\n\
			\n\
			\tpub fn clear(&mut self) {{\n\
			\t\t*self = Self::default();\n\
			\t}}\n\
			}}\n"
		);

		let _ = writeln!(
			self.impls,
			"impl Value for {name} {{\n\
			\tfn kind(&self) -> ValueKind {{\n\
			\t\tValueKind::Enum\n\
			\t}}\n\
			\tfn get_enum(&self) -> Result<usize, ValueError> {{\n\
			\t\tOk(self.index())\n\
			\t}}\n\
			\tfn set_enum(&mut self, symbol: usize) -> Result<(), ValueError> {{\n\
			\t\tmatch Self::from_index(symbol) {{\n\
			\t\t\tSome(value) => {{\n\
			\t\t\t\t*self = value;\n\
			\t\t\t\tOk(())\n\
			\t\t\t}}\n\
			\t\t\tNone => Err(ValueError::OutOfRange {{\n\
			\t\t\t\tkind: ValueKind::Enum,\n\
			\t\t\t\tindex: symbol,\n\
			\t\t\t\tsize: Self::SYMBOLS.len(),\n\
			\t\t\t}}),\n\
			\t\t}}\n\
			\t}}\n\
			}}\n"
		);
		self.emit_resolver_entry_points(raw_name, key, Some(&name))
	}

	fn emit_record(
		&mut self,
		raw_name: &str,
		key: SchemaKey,
		record: &crate::schema::Record,
	) -> Result<(), GenError> {
		let name = self.rust_name(raw_name);
		let fields: Vec<(String, String, SchemaKey)> = record
			.fields
			.iter()
			.map(|field| {
				(
					names::field_ident(&field.name),
					field.name.clone(),
					field.type_,
				)
			})
			.collect();

		let _ = writeln!(
			self.defs,
			"/// Layout for record `{fq}`\n\
			#[derive(Clone, Debug, Default, PartialEq)]\n\
			pub struct {name} {{",
			fq = record.name.fully_qualified_name(),
		);
		for (ident, _, field_key) in &fields {
			let field_type = self.rust_type_of(*field_key);
			let _ = writeln!(self.defs, "\tpub {ident}: {field_type},");
		}
		let _ = writeln!(self.defs, "}}\n");

		let _ = writeln!(
			self.defs,
			"impl {name} {{\n\
			\t/// Reset every field, retaining nested storage for reuse\n\
			\tpub fn clear(&mut self) {{"
		);
		for (ident, _, field_key) in &fields {
			if self.clears_with_method(*field_key) {
				let _ = writeln!(self.defs, "\t\tself.{ident}.clear();");
			} else {
				let _ = writeln!(self.defs, "\t\tself.{ident} = Default::default();");
			}
		}
		let _ = writeln!(self.defs, "\t}}\n}}\n");

		// Value protocol wiring
		let n = fields.len();
		let _ = writeln!(
			self.impls,
			"impl Value for {name} {{\n\
			\tfn kind(&self) -> ValueKind {{\n\
			\t\tValueKind::Record\n\
			\t}}\n\
			\tfn size(&self) -> Result<usize, ValueError> {{\n\
			\t\tOk({n})\n\
			\t}}\n\
			\tfn get_by_index(&self, index: usize) -> Result<(&dyn Value, Option<&str>), ValueError> {{\n\
			\t\tmatch index {{"
		);
		for (index, (ident, schema_name, _)) in fields.iter().enumerate() {
			let _ = writeln!(
				self.impls,
				"\t\t\t{index} => Ok((&self.{ident} as &dyn Value, Some({schema_name:?}))),"
			);
		}
		let _ = writeln!(
			self.impls,
			"\t\t\t_ => Err(ValueError::OutOfRange {{\n\
			\t\t\t\tkind: ValueKind::Record,\n\
			\t\t\t\tindex,\n\
			\t\t\t\tsize: {n},\n\
			\t\t\t}}),\n\
			\t\t}}\n\
			\t}}\n\
			\tfn get_by_index_mut(&mut self, index: usize) -> Result<&mut dyn Value, ValueError> {{\n\
			\t\tmatch index {{"
		);
		for (index, (ident, _, _)) in fields.iter().enumerate() {
			let _ = writeln!(
				self.impls,
				"\t\t\t{index} => Ok(&mut self.{ident} as &mut dyn Value),"
			);
		}
		let _ = writeln!(
			self.impls,
			"\t\t\t_ => Err(ValueError::OutOfRange {{\n\
			\t\t\t\tkind: ValueKind::Record,\n\
			\t\t\t\tindex,\n\
			\t\t\t\tsize: {n},\n\
			\t\t\t}}),\n\
			\t\t}}\n\
			\t}}\n\
			\tfn get_by_name(&self, name: &str) -> Result<Option<(&dyn Value, usize)>, ValueError> {{\n\
			\t\tOk(match name {{"
		);
		for (index, (ident, schema_name, _)) in fields.iter().enumerate() {
			let _ = writeln!(
				self.impls,
				"\t\t\t{schema_name:?} => Some((&self.{ident} as &dyn Value, {index})),"
			);
		}
		let _ = writeln!(
			self.impls,
			"\t\t\t_ => None,\n\
			\t\t}})\n\
			\t}}\n\
			\tfn get_by_name_mut(&mut self, name: &str) -> Result<Option<&mut dyn Value>, ValueError> {{\n\
			\t\tOk(match name {{"
		);
		for (ident, schema_name, _) in &fields {
			let _ = writeln!(
				self.impls,
				"\t\t\t{schema_name:?} => Some(&mut self.{ident} as &mut dyn Value),"
			);
		}
		let _ = writeln!(
			self.impls,
			"\t\t\t_ => None,\n\
			\t\t}})\n\
			\t}}\n\
			}}\n"
		);
		self.emit_resolver_entry_points(raw_name, key, Some(&name))
	}

	fn emit_union(
		&mut self,
		raw_name: &str,
		key: SchemaKey,
		branches: &[SchemaKey],
	) -> Result<(), GenError> {
		let name = self.rust_name(raw_name);

		struct Branch {
			variant: String,
			/// `None` for null branches (no payload)
			payload: Option<String>,
			/// Record branches are stored by reference so recursive
			/// record cycles can be represented
			boxed: bool,
			snake: String,
		}

		let mut infos: Vec<Branch> = Vec::with_capacity(branches.len());
		for &branch_key in branches {
			let branch_node = &self.schema[branch_key];
			let mut variant = names::pascal_case(names::simple_name(branch_node));
			while infos.iter().any(|b| b.variant == variant) {
				variant.push('_');
			}
			let snake = names::snake_case(&variant);
			let (payload, boxed) = match branch_node {
				SchemaNode::Null => (None, false),
				SchemaNode::Record(_) => (Some(self.rust_type_of(branch_key)), true),
				_ => (Some(self.rust_type_of(branch_key)), false),
			};
			infos.push(Branch {
				variant,
				payload,
				boxed,
				snake,
			});
		}

		let _ = writeln!(
			self.defs,
			"/// Layout for union `{raw_name}`: the discriminant is the enum tag\n\
			#[derive(Clone, Debug, PartialEq)]\n\
			pub enum {name} {{"
		);
		for branch in &infos {
			match (&branch.payload, branch.boxed) {
				(None, _) => {
					let _ = writeln!(self.defs, "\t{},", branch.variant);
				}
				(Some(ty), false) => {
					let _ = writeln!(self.defs, "\t{}({ty}),", branch.variant);
				}
				(Some(ty), true) => {
					let _ = writeln!(self.defs, "\t{}(Box<{ty}>),", branch.variant);
				}
			}
		}
		let _ = writeln!(self.defs, "}}\n");

		// Initial variant: the first by-value branch, so that boxed
		// recursive branches cannot make default construction unbounded
		let default_index = infos
			.iter()
			.position(|branch| !branch.boxed)
			.unwrap_or(0);
		let default_expr = Self::branch_init_expr(&infos[default_index].variant, {
			let branch = &infos[default_index];
			(branch.payload.is_some(), branch.boxed)
		});
		let _ = writeln!(
			self.defs,
			"impl Default for {name} {{\n\
			\tfn default() -> Self {{\n\
			\t\t{default_expr}\n\
			\t}}\n\
			}}\n"
		);

		let _ = writeln!(self.defs, "impl {name} {{");
		let _ = writeln!(
			self.defs,
			"\t/// Index of the active branch\n\
			\tpub fn discriminant(&self) -> usize {{\n\
			\t\tmatch self {{"
		);
		for (index, branch) in infos.iter().enumerate() {
			let pattern = match &branch.payload {
				None => branch.variant.clone(),
				Some(_) => format!("{}(_)", branch.variant),
			};
			let _ = writeln!(self.defs, "\t\t\tSelf::{pattern} => {index},");
		}
		let _ = writeln!(self.defs, "\t\t}}\n\t}}\n");
		for branch in &infos {
			match (&branch.payload, branch.boxed) {
				(None, _) => {
					let _ = writeln!(
						self.defs,
						"\tpub fn set_{snake}(&mut self) {{\n\
						\t\t*self = Self::{variant};\n\
						\t}}\n",
						snake = branch.snake,
						variant = branch.variant,
					);
				}
				(Some(ty), false) => {
					let _ = writeln!(
						self.defs,
						"\tpub fn set_{snake}(&mut self, value: {ty}) {{\n\
						\t\t*self = Self::{variant}(value);\n\
						\t}}\n",
						snake = branch.snake,
						variant = branch.variant,
					);
				}
				(Some(ty), true) => {
					let _ = writeln!(
						self.defs,
						"\tpub fn set_{snake}(&mut self, value: {ty}) {{\n\
						\t\t*self = Self::{variant}(Box::new(value));\n\
						\t}}\n",
						snake = branch.snake,
						variant = branch.variant,
					);
				}
			}
		}
		let _ = writeln!(
			self.defs,
			"\tpub fn clear(&mut self) {{\n\
			\t\t*self = Self::default();\n\
			\t}}\n\
			}}\n"
		);

		// Value protocol wiring
		let n = infos.len();
		let _ = writeln!(
			self.impls,
			"impl Value for {name} {{\n\
			\tfn kind(&self) -> ValueKind {{\n\
			\t\tValueKind::Union\n\
			\t}}\n\
			\tfn discriminant(&self) -> Result<usize, ValueError> {{\n\
			\t\tOk({name}::discriminant(self))\n\
			\t}}\n\
			\tfn current_branch(&self) -> Result<&dyn Value, ValueError> {{\n\
			\t\tmatch self {{"
		);
		for branch in &infos {
			match (&branch.payload, branch.boxed) {
				(None, _) => {
					let _ = writeln!(
						self.impls,
						"\t\t\tSelf::{} => Err(ValueError::WrongType {{\n\
						\t\t\t\toperation: \"current_branch\",\n\
						\t\t\t\tkind: ValueKind::Null,\n\
						\t\t\t}}),",
						branch.variant,
					);
				}
				(Some(_), false) => {
					let _ = writeln!(
						self.impls,
						"\t\t\tSelf::{}(value) => Ok(value as &dyn Value),",
						branch.variant,
					);
				}
				(Some(_), true) => {
					let _ = writeln!(
						self.impls,
						"\t\t\tSelf::{}(value) => Ok(&**value as &dyn Value),",
						branch.variant,
					);
				}
			}
		}
		let _ = writeln!(
			self.impls,
			"\t\t}}\n\
			\t}}\n\
			\tfn current_branch_mut(&mut self) -> Result<&mut dyn Value, ValueError> {{\n\
			\t\tmatch self {{"
		);
		for branch in &infos {
			match (&branch.payload, branch.boxed) {
				(None, _) => {
					let _ = writeln!(
						self.impls,
						"\t\t\tSelf::{} => Err(ValueError::WrongType {{\n\
						\t\t\t\toperation: \"current_branch_mut\",\n\
						\t\t\t\tkind: ValueKind::Null,\n\
						\t\t\t}}),",
						branch.variant,
					);
				}
				(Some(_), false) => {
					let _ = writeln!(
						self.impls,
						"\t\t\tSelf::{}(value) => Ok(value as &mut dyn Value),",
						branch.variant,
					);
				}
				(Some(_), true) => {
					let _ = writeln!(
						self.impls,
						"\t\t\tSelf::{}(value) => Ok(&mut **value as &mut dyn Value),",
						branch.variant,
					);
				}
			}
		}
		let _ = writeln!(
			self.impls,
			"\t\t}}\n\
			\t}}\n\
			\tfn set_branch(&mut self, branch: usize) -> Result<(), ValueError> {{\n\
			\t\tif {name}::discriminant(self) == branch {{\n\
			\t\t\t// re-selecting the active branch keeps its storage\n\
			\t\t\treturn Ok(());\n\
			\t\t}}\n\
			\t\t*self = match branch {{"
		);
		for (index, branch) in infos.iter().enumerate() {
			let init = Self::branch_init_expr(
				&branch.variant,
				(branch.payload.is_some(), branch.boxed),
			);
			let _ = writeln!(self.impls, "\t\t\t{index} => {init},");
		}
		let _ = writeln!(
			self.impls,
			"\t\t\t_ => {{\n\
			\t\t\t\treturn Err(ValueError::OutOfRange {{\n\
			\t\t\t\t\tkind: ValueKind::Union,\n\
			\t\t\t\t\tindex: branch,\n\
			\t\t\t\t\tsize: {n},\n\
			\t\t\t\t}})\n\
			\t\t\t}}\n\
			\t\t}};\n\
			\t\tOk(())\n\
			\t}}\n\
			}}\n"
		);
		self.emit_resolver_entry_points(raw_name, key, Some(&name))
	}

	fn branch_init_expr(variant: &str, (has_payload, boxed): (bool, bool)) -> String {
		match (has_payload, boxed) {
			(false, _) => format!("Self::{variant}"),
			(true, false) => format!("Self::{variant}(Default::default())"),
			(true, true) => format!("Self::{variant}(Box::default())"),
		}
	}

	/// Emit the schema constant and the resolver constructor for a layout
	fn emit_resolver_entry_points(
		&mut self,
		raw_name: &str,
		key: SchemaKey,
		rust_name: Option<&str>,
	) -> Result<(), GenError> {
		let json = self.schema.node_json(key)?;
		let const_prefix = if self.config.type_prefix.is_empty() {
			names::upper_snake_case(raw_name)
		} else {
			format!(
				"{}_{}",
				names::upper_snake_case(&self.config.type_prefix),
				names::upper_snake_case(raw_name)
			)
		};
		let fn_prefix = const_prefix.to_lowercase();
		let doc_target = match rust_name {
			Some(rust_name) => format!("[`{rust_name}`]"),
			None => format!("a `{raw_name}` slot"),
		};
		let _ = writeln!(
			self.impls,
			"/// Schema this layout was generated from\n\
			pub const {const_prefix}_SCHEMA_JSON: &str = r#\"{json}\"#;\n\
			\n\
			/// Build a decode plan that reads `writer`-shaped data into {doc_target}\n\
			pub fn {fn_prefix}_resolver_new<'s>(writer: &'s Schema) -> Result<Resolved<'s>, ResolveError> {{\n\
			\tlet reader: Schema = {const_prefix}_SCHEMA_JSON\n\
			\t\t.parse()\n\
			\t\t.map_err(ResolveError::from)?;\n\
			\tResolved::new(writer, &reader)\n\
			}}\n"
		);
		Ok(())
	}
}
