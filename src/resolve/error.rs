use crate::schema::SchemaError;

/// What made a resolver compilation fail
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveErrorKind {
	/// The writer schema cannot be resolved to the given target
	Incompatible,
	/// A reader field is not present in the writer and declares no default
	MissingDefault,
	/// Schema nesting exceeded the configured depth bound
	RecursionLimit,
	/// A schema could not be built (only raised by generated resolver
	/// constructors, which parse their embedded reader schema)
	Schema,
}

/// Any error that may happen when compiling a resolver
#[derive(thiserror::Error, Debug)]
#[error("{message}")]
pub struct ResolveError {
	kind: ResolveErrorKind,
	message: String,
}

impl ResolveError {
	/// What made the compilation fail
	pub fn kind(&self) -> ResolveErrorKind {
		self.kind
	}

	pub(crate) fn incompatible(msg: impl std::fmt::Display) -> Self {
		Self {
			kind: ResolveErrorKind::Incompatible,
			message: msg.to_string(),
		}
	}

	pub(crate) fn missing_default(record_name: &str, field_name: &str) -> Self {
		Self {
			kind: ResolveErrorKind::MissingDefault,
			message: format!(
				"Reader field {record_name}.{field_name} is not present in the \
					writer schema and declares no default"
			),
		}
	}

	pub(crate) fn recursion_limit() -> Self {
		Self {
			kind: ResolveErrorKind::RecursionLimit,
			message: "Resolution exceeds the configured schema recursion limit".to_owned(),
		}
	}

	/// `true` for the failure kinds that merely rule out one candidate
	/// pairing (another reader-union branch or writer-union branch may
	/// still resolve)
	pub(crate) fn is_pairing_failure(&self) -> bool {
		matches!(
			self.kind,
			ResolveErrorKind::Incompatible | ResolveErrorKind::MissingDefault
		)
	}
}

impl From<SchemaError> for ResolveError {
	fn from(schema_error: SchemaError) -> Self {
		Self {
			kind: ResolveErrorKind::Schema,
			message: schema_error.to_string(),
		}
	}
}
