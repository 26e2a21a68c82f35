use crate::value::ValueError;

use std::borrow::Cow;

/// Any error that may happen during encoding
#[derive(thiserror::Error)]
#[error("{}", inner.value)]
pub struct SerError {
	inner: Box<ErrorInner>,
}

impl std::fmt::Debug for SerError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&*self.inner.value, f)
	}
}

struct ErrorInner {
	value: Cow<'static, str>,
}

impl SerError {
	/// If you need a dynamic string use `SerError::custom(format_args!(...))`
	pub(crate) fn new(s: &'static str) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				value: Cow::Borrowed(s),
			}),
		}
	}

	pub(crate) fn custom(msg: impl std::fmt::Display) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				value: Cow::Owned(msg.to_string()),
			}),
		}
	}

	pub(crate) fn io(io_error: std::io::Error) -> Self {
		Self::custom(format_args!(
			"Encountered IO error when attempting to write for encoding: {io_error}"
		))
	}

	pub(crate) fn value(value_error: ValueError) -> Self {
		Self::custom(format_args!(
			"Encode source rejected operation: {value_error}"
		))
	}
}
