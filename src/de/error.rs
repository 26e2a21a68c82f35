use crate::value::ValueError;

use std::borrow::Cow;

/// Broad classification of a [`DeError`]
///
/// Most decode failures are data or IO problems; `IncompatibleBranch` is
/// singled out because it is part of the schema-resolution contract: it is
/// raised when the writer selected a union branch that could not be
/// resolved against the reader side at compile time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeErrorKind {
	/// Malformed or unexpected data in the stream
	Data,
	/// The underlying reader failed
	Io,
	/// The target value rejected an operation
	Value,
	/// The writer selected a union branch with no compatible resolver
	IncompatibleBranch,
}

/// Any error that may happen during decoding
#[derive(thiserror::Error)]
#[error("{}", inner.value)]
pub struct DeError {
	inner: Box<ErrorInner>,
}

impl std::fmt::Debug for DeError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.inner.io_error.as_ref() {
			Some(io_error) => write!(f, "{}: {}", self.inner.value, io_error),
			None => std::fmt::Debug::fmt(&*self.inner.value, f),
		}
	}
}

struct ErrorInner {
	value: Cow<'static, str>,
	io_error: Option<std::io::Error>,
	kind: DeErrorKind,
}

impl DeError {
	/// If you need a dynamic string use `DeError::custom(format_args!(...))`
	pub(crate) fn new(s: &'static str) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				value: Cow::Borrowed(s),
				io_error: None,
				kind: DeErrorKind::Data,
			}),
		}
	}

	pub(crate) fn custom(msg: impl std::fmt::Display) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				value: Cow::Owned(msg.to_string()),
				io_error: None,
				kind: DeErrorKind::Data,
			}),
		}
	}

	pub(crate) fn unexpected_eof() -> Self {
		Self::new("Unexpected end of input while decoding")
	}

	pub(crate) fn io(io_error: std::io::Error) -> Self {
		Self::custom_io(
			"Encountered IO error when attempting to read for decoding",
			io_error,
		)
	}

	pub(crate) fn custom_io(msg: &'static str, io_error: std::io::Error) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				value: Cow::Borrowed(msg),
				io_error: Some(io_error),
				kind: DeErrorKind::Io,
			}),
		}
	}

	pub(crate) fn value(value_error: ValueError) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				value: Cow::Owned(format!("Decode target rejected value: {value_error}")),
				io_error: None,
				kind: DeErrorKind::Value,
			}),
		}
	}

	pub(crate) fn incompatible_branch(discriminant: usize) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				value: Cow::Owned(format!(
					"Writer union branch {discriminant} is incompatible with the decode target"
				)),
				io_error: None,
				kind: DeErrorKind::IncompatibleBranch,
			}),
		}
	}

	/// What class of failure this is
	pub fn kind(&self) -> DeErrorKind {
		self.inner.kind
	}

	/// If this error was caused by an IO error, return it
	pub fn io_error(&self) -> Option<&std::io::Error> {
		self.inner.io_error.as_ref()
	}
}
