//! [`Value`] implementations for the raw slots that specific layouts are
//! assembled from
//!
//! A generated record stores an `int` field as a plain `i32`, a `string`
//! field as a [`RawString`], an array field as a [`PackedArray`], and so
//! on. These implementations are what let the decoder write straight into
//! such a layout (and the encoder read straight out of it) with no
//! intermediate representation. They are also usable standalone: a
//! resolver built for a raw target decodes directly into an `i32` on the
//! stack.

use super::{Value, ValueError, ValueKind};

use crate::data::{OrderedMap, PackedArray, RawString};

impl Value for () {
	fn kind(&self) -> ValueKind {
		ValueKind::Null
	}
	fn get_null(&self) -> Result<(), ValueError> {
		Ok(())
	}
	fn set_null(&mut self) -> Result<(), ValueError> {
		Ok(())
	}
}

impl Value for bool {
	fn kind(&self) -> ValueKind {
		ValueKind::Boolean
	}
	fn get_boolean(&self) -> Result<bool, ValueError> {
		Ok(*self)
	}
	fn set_boolean(&mut self, value: bool) -> Result<(), ValueError> {
		*self = value;
		Ok(())
	}
}

impl Value for i32 {
	fn kind(&self) -> ValueKind {
		ValueKind::Int
	}
	fn get_int(&self) -> Result<i32, ValueError> {
		Ok(*self)
	}
	fn set_int(&mut self, value: i32) -> Result<(), ValueError> {
		*self = value;
		Ok(())
	}
}

impl Value for i64 {
	fn kind(&self) -> ValueKind {
		ValueKind::Long
	}
	fn get_long(&self) -> Result<i64, ValueError> {
		Ok(*self)
	}
	fn set_long(&mut self, value: i64) -> Result<(), ValueError> {
		*self = value;
		Ok(())
	}
}

impl Value for f32 {
	fn kind(&self) -> ValueKind {
		ValueKind::Float
	}
	fn get_float(&self) -> Result<f32, ValueError> {
		Ok(*self)
	}
	fn set_float(&mut self, value: f32) -> Result<(), ValueError> {
		*self = value;
		Ok(())
	}
}

impl Value for f64 {
	fn kind(&self) -> ValueKind {
		ValueKind::Double
	}
	fn get_double(&self) -> Result<f64, ValueError> {
		Ok(*self)
	}
	fn set_double(&mut self, value: f64) -> Result<(), ValueError> {
		*self = value;
		Ok(())
	}
}

/// A [`RawString`] serves as the slot for both `bytes` and `string`
/// fields, so it answers both operation families; its nominal kind is
/// `string`. Text accessors check UTF-8.
impl Value for RawString {
	fn kind(&self) -> ValueKind {
		ValueKind::String
	}
	fn get_bytes(&self) -> Result<&[u8], ValueError> {
		Ok(self.as_bytes())
	}
	fn set_bytes(&mut self, value: &[u8]) -> Result<(), ValueError> {
		self.set(value);
		Ok(())
	}
	fn give_bytes(&mut self, value: Vec<u8>) -> Result<(), ValueError> {
		self.give(value);
		Ok(())
	}
	fn get_string(&self) -> Result<&str, ValueError> {
		self.try_as_str().map_err(|_| ValueError::InvalidUtf8)
	}
	fn set_string(&mut self, value: &str) -> Result<(), ValueError> {
		self.set(value.as_bytes());
		Ok(())
	}
	fn give_string(&mut self, value: String) -> Result<(), ValueError> {
		self.give(value.into_bytes());
		Ok(())
	}
}

impl<T: Value + Default> Value for PackedArray<T> {
	fn kind(&self) -> ValueKind {
		ValueKind::Array
	}
	fn size(&self) -> Result<usize, ValueError> {
		Ok(self.len())
	}
	fn get_by_index(&self, index: usize) -> Result<(&dyn Value, Option<&str>), ValueError> {
		match self.get(index) {
			Some(element) => Ok((element as &dyn Value, None)),
			None => Err(ValueError::out_of_range(
				ValueKind::Array,
				index,
				self.len(),
			)),
		}
	}
	fn get_by_index_mut(&mut self, index: usize) -> Result<&mut dyn Value, ValueError> {
		let size = self.len();
		match self.get_mut(index) {
			Some(element) => Ok(element as &mut dyn Value),
			None => Err(ValueError::out_of_range(ValueKind::Array, index, size)),
		}
	}
	fn append(&mut self) -> Result<&mut dyn Value, ValueError> {
		Ok(PackedArray::append(self) as &mut dyn Value)
	}
	fn reset(&mut self) -> Result<(), ValueError> {
		self.clear();
		Ok(())
	}
}

impl<T: Value + Default> Value for OrderedMap<T> {
	fn kind(&self) -> ValueKind {
		ValueKind::Map
	}
	fn size(&self) -> Result<usize, ValueError> {
		Ok(self.len())
	}
	fn get_by_index(&self, index: usize) -> Result<(&dyn Value, Option<&str>), ValueError> {
		match self.get_index(index) {
			Some((key, element)) => Ok((element as &dyn Value, Some(key))),
			None => Err(ValueError::out_of_range(ValueKind::Map, index, self.len())),
		}
	}
	fn get_by_index_mut(&mut self, index: usize) -> Result<&mut dyn Value, ValueError> {
		let size = self.len();
		match self.get_index_mut(index) {
			Some(element) => Ok(element as &mut dyn Value),
			None => Err(ValueError::out_of_range(ValueKind::Map, index, size)),
		}
	}
	fn get_by_name(&self, name: &str) -> Result<Option<(&dyn Value, usize)>, ValueError> {
		Ok(self
			.get_full(name)
			.map(|(index, element)| (element as &dyn Value, index)))
	}
	fn get_by_name_mut(&mut self, name: &str) -> Result<Option<&mut dyn Value>, ValueError> {
		Ok(self.get_mut(name).map(|element| element as &mut dyn Value))
	}
	fn add(&mut self, key: &str) -> Result<(&mut dyn Value, bool), ValueError> {
		let (element, is_new) = self.get_or_create(key);
		Ok((element as &mut dyn Value, is_new))
	}
	fn reset(&mut self) -> Result<(), ValueError> {
		self.clear();
		Ok(())
	}
}
