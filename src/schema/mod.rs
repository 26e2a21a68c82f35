//! Navigate, modify and initialize the [`Schema`]

mod error;
mod safe;
pub(crate) mod self_referential;

pub use {error::SchemaError, safe::*, self_referential::Schema};

impl std::str::FromStr for Schema {
	type Err = SchemaError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let safe_schema: safe::SchemaMut = s.parse()?;
		safe_schema.try_into()
	}
}

/// Component of a [`SchemaMut`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fixed {
	/// The size in bytes of the *fixed* type
	pub size: usize,
	/// The name of the *fixed* type, including the namespace
	pub name: Name,
}

impl Fixed {
	/// `name` is the name of the *fixed* type, including the namespace,
	/// `size` is the size in bytes of the fixed type
	pub fn new(name: Name, size: usize) -> Self {
		Self { size, name }
	}
}

/// Schema component for named nodes of a [`SchemaMut`]
///
/// This holds both the "name" and the "namespace".
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Name {
	fully_qualified_name: String,
	namespace_delimiter_idx: Option<usize>,
}

impl std::fmt::Debug for Name {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&self.fully_qualified_name, f)
	}
}

impl Name {
	/// The rightmost component of the fully qualified name
	///
	/// e.g. in `a.b.c` it's `c`
	pub fn name(&self) -> &str {
		match self.namespace_delimiter_idx {
			None => &self.fully_qualified_name,
			Some(delimiter_idx) => &self.fully_qualified_name[delimiter_idx + 1..],
		}
	}

	/// The namespace component of the fully qualified name
	///
	/// e.g. in `a.b.c` it's `a.b`
	pub fn namespace(&self) -> Option<&str> {
		self.namespace_delimiter_idx
			.map(|idx| &self.fully_qualified_name[..idx])
	}

	/// The fully qualified name
	///
	/// e.g. in `a.b.c` it's `a.b.c`
	pub fn fully_qualified_name(&self) -> &str {
		&self.fully_qualified_name
	}

	/// Build a [`Name`] from a fully qualified name
	///
	/// If the only `.` in the fully qualified name is at the beginning of
	/// the string it is stripped, that is, `.x` parses as
	/// `namespace: None, name: "x"`, for consistency with the parsing
	/// logic.
	pub fn from_fully_qualified_name(fully_qualified_name: impl Into<String>) -> Self {
		fn non_generic_inner(mut fully_qualified_name: String) -> Name {
			Name {
				namespace_delimiter_idx: match fully_qualified_name.rfind('.') {
					Some(0) => {
						fully_qualified_name.remove(0);
						None
					}
					other => other,
				},
				fully_qualified_name,
			}
		}
		non_generic_inner(fully_qualified_name.into())
	}
}
