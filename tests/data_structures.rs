//! Lifecycle and reuse behavior of the engine's helper containers

use avro_specific::data::{OrderedMap, PackedArray, RawString};

use pretty_assertions::assert_eq;

#[test]
fn packed_array_grows_by_doubling() {
	let mut array: PackedArray<u64> = PackedArray::new();
	assert_eq!(array.capacity(), 0);
	array.push(1);
	assert_eq!(array.capacity(), 1);
	array.push(2);
	assert_eq!(array.capacity(), 2);
	array.push(3);
	assert_eq!(array.capacity(), 4);
	for i in 3..100 {
		array.push(i);
	}
	assert_eq!(array.capacity(), 128);
	assert_eq!(array.len(), 100);
}

#[test]
fn packed_array_clear_retains_storage() {
	let mut array: PackedArray<u32> = PackedArray::new();
	for i in 0..100 {
		*array.append() = i;
	}
	let peak_capacity = array.capacity();
	array.clear();
	assert_eq!(array.len(), 0);
	assert_eq!(array.capacity(), peak_capacity);
	for i in 0..100 {
		*array.append() = i;
	}
	// Refilling up to the previous peak must not have allocated
	assert_eq!(array.capacity(), peak_capacity);
	assert_eq!(array.len(), 100);
	assert_eq!(array[99], 99);
}

#[test]
fn packed_array_append_zero_initializes() {
	let mut array: PackedArray<i64> = PackedArray::new();
	*array.append() = 17;
	array.clear();
	assert_eq!(*array.append(), 0);
}

#[test]
fn packed_array_ensure_capacity() {
	let mut array: PackedArray<u8> = PackedArray::new();
	array.ensure_capacity(50);
	let capacity = array.capacity();
	assert!(capacity >= 50);
	for _ in 0..50 {
		array.append();
	}
	assert_eq!(array.capacity(), capacity);
}

#[test]
fn ordered_map_get_or_create_is_idempotent() {
	let mut map: OrderedMap<i32> = OrderedMap::new();
	let (element, is_new) = map.get_or_create("a");
	assert!(is_new);
	*element = 7;
	let (element, is_new) = map.get_or_create("a");
	assert!(!is_new);
	assert_eq!(*element, 7);
	assert_eq!(map.len(), 1);
}

#[test]
fn ordered_map_iterates_in_insertion_order() {
	let mut map: OrderedMap<i32> = OrderedMap::new();
	for (i, key) in ["zebra", "apple", "mango"].iter().enumerate() {
		*map.get_or_create(key).0 = i as i32;
	}
	let entries: Vec<(&str, i32)> = map.iter().map(|(k, &v)| (k, v)).collect();
	assert_eq!(entries, vec![("zebra", 0), ("apple", 1), ("mango", 2)]);
	assert_eq!(map.get_index(0), Some(("zebra", &0)));
	assert_eq!(map.key(2), Some("mango"));
}

#[test]
fn ordered_map_clear_retains_element_storage() {
	let mut map: OrderedMap<u32> = OrderedMap::new();
	for i in 0..20 {
		*map.get_or_create(&format!("key{i}")).0 = i;
	}
	map.clear();
	assert_eq!(map.len(), 0);
	assert_eq!(map.get("key3"), None);
	let (_, is_new) = map.get_or_create("key3");
	assert!(is_new);
}

#[test]
fn raw_string_set_copies() {
	let mut s = RawString::new();
	s.set(b"hello");
	assert_eq!(s.as_bytes(), b"hello");
	assert_eq!(s.len(), 5);
	assert_eq!(s.try_as_str().unwrap(), "hello");
}

#[test]
fn raw_string_give_adopts_without_copying() {
	let buffer = vec![1u8, 2, 3];
	let original_ptr = buffer.as_ptr();
	let mut s = RawString::new();
	s.give(buffer);
	assert_eq!(s.as_bytes(), &[1, 2, 3]);
	// The borrow returned aliases the buffer that was given
	assert_eq!(s.as_bytes().as_ptr(), original_ptr);
}

#[test]
fn raw_string_clear_reuses_owned_storage_only() {
	let mut s = RawString::new();
	s.set(b"some fairly long contents");
	let capacity = s.capacity();
	assert!(capacity >= 25);
	s.clear();
	assert!(s.is_empty());
	// Own buffer kept for reuse
	assert_eq!(s.capacity(), capacity);
	s.set(b"short");
	assert_eq!(s.capacity(), capacity);

	// A given buffer is released on clear
	s.give(vec![1, 2, 3]);
	s.clear();
	assert!(s.is_empty());
	assert_eq!(s.capacity(), 0);
}

#[test]
fn raw_string_alias_references_static_data() {
	static DATA: &[u8] = b"static contents";
	let mut s = RawString::new();
	s.alias(DATA);
	assert_eq!(s.as_bytes().as_ptr(), DATA.as_ptr());
	// Overwriting the alias with a copy switches back to owned storage
	s.set(b"own");
	assert_eq!(s.as_bytes(), b"own");
}

#[test]
fn raw_string_equality_is_by_content() {
	let mut a = RawString::new();
	a.set(b"same");
	let b = RawString::from("same");
	let c = RawString::from(b"different".as_slice());
	assert_eq!(a, b);
	assert_ne!(a, c);
	a.clear();
	assert_eq!(a, RawString::new());
}
