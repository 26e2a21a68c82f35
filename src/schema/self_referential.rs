use super::{
	safe::{self, SchemaMut},
	SchemaError,
};

use std::{collections::HashMap, marker::PhantomData};

pub(crate) use super::{Fixed, Name};

/// Main schema type, opaque representation of a fully-checked schema
///
/// This is the fully pre-computed type used by the resolver compiler, the
/// encoder, the decoder and the generic value implementation.
///
/// To achieve the ideal performance and ease of use via self-referencing
/// nodes, it is built using `unsafe`, so it can only be built through
/// [its safe counterpart](crate::schema::SchemaMut) (via
/// [`.freeze()`](crate::schema::SchemaMut::freeze) or [`TryFrom`]) because
/// that makes the conversion code simple enough that we can reasonably
/// guarantee its correctness despite the usage of `unsafe`.
///
/// It is useful to implement it this way because, due to how referencing
/// named types works, the most performant representation of a schema is
/// not a tree but a possibly-cyclic general directed graph.
pub struct Schema {
	// First node in the array is considered to be the root
	//
	// This lifetime is fake, but since all elements have to be accessed by the
	// `root` function which will downcast it and we never push anything more in
	// there (which would cause reallocation and invalidate all nodes) this is
	// correct.
	nodes: Vec<SchemaNode<'static>>,
	schema_json: String,
}

impl Schema {
	/// The schema represented internally as a directed graph of nodes, all
	/// stored in [`Schema`]
	///
	/// The root node represents the whole schema.
	pub(crate) fn root<'a>(&'a self) -> NodeRef<'a> {
		// the signature of this function downgrades the fake 'static lifetime in a
		// way that makes it correct
		assert!(
			!self.nodes.is_empty(),
			"Schema must have at least one node (the root)"
		);
		// SAFETY: bounds checked
		unsafe { NodeRef::new(self.nodes.as_ptr() as *mut _) }
	}

	/// Obtain the JSON for this schema
	pub fn json(&self) -> &str {
		&self.schema_json
	}
}

/// A `NodeRef` is a pointer to a node in a [`Schema`]
///
/// This is morally equivalent to `&'a SchemaNode<'a>`, only Rust will not
/// assume as much when it comes to aliasing constraints.
///
/// For ease of use, it can be `Deref`d to a [`SchemaNode`], so this module
/// is responsible for ensuring that no `NodeRef` is leaked that would be
/// incorrect on that regard.
///
/// SAFETY: The invariant that we need to uphold is that with regards to
/// lifetimes, this behaves the same as an `&'a SchemaNode<'a>`.
///
/// We don't directly use references because we need to update the pointees
/// after creating references to them when building the schema, and that
/// doesn't pass Miri's Stacked Borrows checks. This abstraction should be
/// reasonably ergonomic, but pass miri.
pub(crate) struct NodeRef<'a, N = SchemaNode<'a>> {
	node: std::ptr::NonNull<N>,
	_spooky: PhantomData<&'a N>,
}
impl<N> Copy for NodeRef<'_, N> {}
impl<N> Clone for NodeRef<'_, N> {
	fn clone(&self) -> Self {
		*self
	}
}
/// SAFETY: NonNull is !Send !Sync, but NodeRef is really just a reference,
/// so we can implement Sync and Send
unsafe impl<T: Sync> Sync for NodeRef<'_, T> {}
/// SAFETY: NonNull is !Send !Sync, but NodeRef is really just a reference,
/// so we can implement Sync and Send
unsafe impl<T: Sync> Send for NodeRef<'_, T> {}
impl<N> NodeRef<'static, N> {
	const unsafe fn new(ptr: *mut N) -> Self {
		Self {
			node: std::ptr::NonNull::new_unchecked(ptr),
			_spooky: PhantomData,
		}
	}
}
impl<'a, N> NodeRef<'a, N> {
	/// Compared to `Deref`, this propagates the lifetime of the reference
	pub(crate) fn as_ref(self) -> &'a N {
		// SAFETY: this module is responsible for never leaking a `NodeRef` that
		// isn't tied to the appropriate lifetime
		unsafe { self.node.as_ref() }
	}
}
impl<'a, N> std::ops::Deref for NodeRef<'a, N> {
	type Target = N;
	fn deref(&self) -> &Self::Target {
		self.as_ref()
	}
}

/// A node of a schema, borrowed from a [`Schema`]
///
/// This enum is borrowed from a [`Schema`] and is used to navigate it.
/// References to other nodes (array items, map values, union branches,
/// record field types) are direct [`NodeRef`]s; a named reference in the
/// schema JSON has already been resolved to the node it designates, so
/// recursive schemas show up here as cycles in the graph.
pub(crate) enum SchemaNode<'a> {
	Null,
	Boolean,
	Int,
	Long,
	Float,
	Double,
	Bytes,
	String,
	Array(NodeRef<'a>),
	Map(NodeRef<'a>),
	Union(Union<'a>),
	Record(Record<'a>),
	Enum(Enum),
	Fixed(Fixed),
}

/// Component of a [`SchemaNode`]
pub(crate) struct Union<'a> {
	pub(crate) variants: Vec<NodeRef<'a>>,
}

/// Component of a [`SchemaNode`]
pub(crate) struct Record<'a> {
	pub(crate) fields: Vec<RecordField<'a>>,
	pub(crate) name: Name,
	pub(crate) per_name_lookup: HashMap<String, usize>,
}

/// Component of a [`SchemaNode`]
pub(crate) struct RecordField<'a> {
	pub(crate) name: String,
	pub(crate) schema: NodeRef<'a>,
	pub(crate) default: Option<serde_json::Value>,
}

/// Component of a [`SchemaNode`]
#[derive(Clone)]
pub(crate) struct Enum {
	pub(crate) symbols: Vec<String>,
	pub(crate) name: Name,
	pub(crate) per_name_lookup: HashMap<String, usize>,
}

impl SchemaNode<'_> {
	/// The name of this node's kind, as spelled in schema JSON
	pub(crate) fn kind_name(&self) -> &'static str {
		match self {
			SchemaNode::Null => "null",
			SchemaNode::Boolean => "boolean",
			SchemaNode::Int => "int",
			SchemaNode::Long => "long",
			SchemaNode::Float => "float",
			SchemaNode::Double => "double",
			SchemaNode::Bytes => "bytes",
			SchemaNode::String => "string",
			SchemaNode::Array(_) => "array",
			SchemaNode::Map(_) => "map",
			SchemaNode::Union(_) => "union",
			SchemaNode::Record(_) => "record",
			SchemaNode::Enum(_) => "enum",
			SchemaNode::Fixed(_) => "fixed",
		}
	}
}

impl TryFrom<SchemaMut> for Schema {
	type Error = SchemaError;
	fn try_from(safe: SchemaMut) -> Result<Self, SchemaError> {
		safe.validate()?;

		// The `nodes` allocation should never be moved otherwise references
		// will become invalid
		let mut ret = Self {
			nodes: (0..safe.nodes.len()).map(|_| SchemaNode::Null).collect(),
			schema_json: safe.serialize_to_json()?,
		};
		let len = ret.nodes.len();
		// Let's be extra-sure (second condition is for calls to add)
		assert!(len > 0 && len == safe.nodes.len() && len <= (isize::MAX as usize));
		let storage_start_ptr = ret.nodes.as_mut_ptr();
		// Validation checked all keys, but let's not propagate UB on a logic
		// error here
		let key_to_ref =
			|schema_key: safe::SchemaKey| -> Result<NodeRef<'static>, SchemaError> {
				let idx = schema_key.idx();
				if idx >= len {
					return Err(SchemaError::msg(format_args!(
						"SchemaKey index {} is out of bounds (len: {})",
						idx, len
					)));
				}
				// SAFETY: see below
				Ok(unsafe { NodeRef::new(storage_start_ptr.add(idx)) })
			};

		// Now we can initialize the nodes
		let mut curr_storage_node_ptr = storage_start_ptr;
		for safe_node in safe.nodes {
			// SAFETY:
			// - The nodes we create here are never moving in memory since the entire
			//   vec is preallocated, and even when moving a vec, the pointed space
			//   doesn't move.
			// - The fake `'static` lifetimes are always downgraded before being made
			//   available.
			// - We only use pointers from the point at which we call `as_mut_ptr` so
			//   the compiler will not have aliasing constraints.
			// - We don't dereference the ~references (NodeRef) we create in key_to_ref
			//   until all nodes are initialized.

			let new_node = match safe_node {
				safe::SchemaNode::Null => SchemaNode::Null,
				safe::SchemaNode::Boolean => SchemaNode::Boolean,
				safe::SchemaNode::Int => SchemaNode::Int,
				safe::SchemaNode::Long => SchemaNode::Long,
				safe::SchemaNode::Float => SchemaNode::Float,
				safe::SchemaNode::Double => SchemaNode::Double,
				safe::SchemaNode::Bytes => SchemaNode::Bytes,
				safe::SchemaNode::String => SchemaNode::String,
				safe::SchemaNode::Array(array) => SchemaNode::Array(key_to_ref(array.items)?),
				safe::SchemaNode::Map(map) => SchemaNode::Map(key_to_ref(map.values)?),
				safe::SchemaNode::Union(union) => SchemaNode::Union(Union {
					variants: {
						let mut variants = Vec::with_capacity(union.variants.len());
						for schema_key in union.variants {
							variants.push(key_to_ref(schema_key)?);
						}
						variants
					},
				}),
				safe::SchemaNode::Record(record) => SchemaNode::Record(Record {
					per_name_lookup: record
						.fields
						.iter()
						.enumerate()
						.map(|(i, v)| (v.name.clone(), i))
						.collect(),
					fields: {
						let mut fields = Vec::with_capacity(record.fields.len());
						for field in record.fields {
							fields.push(RecordField {
								name: field.name,
								schema: key_to_ref(field.type_)?,
								default: field.default,
							});
						}
						fields
					},
					name: record.name,
				}),
				safe::SchemaNode::Enum(enum_) => SchemaNode::Enum(Enum {
					per_name_lookup: enum_
						.symbols
						.iter()
						.enumerate()
						.map(|(i, v)| (v.clone(), i))
						.collect(),
					symbols: enum_.symbols,
					name: enum_.name,
				}),
				safe::SchemaNode::Fixed(fixed) => SchemaNode::Fixed(fixed),
			};
			// SAFETY: see comment at beginning of loop
			unsafe {
				*curr_storage_node_ptr = new_node;
				curr_storage_node_ptr = curr_storage_node_ptr.add(1);
			};
		}

		Ok(ret)
	}
}

impl std::fmt::Debug for Schema {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		<SchemaNode<'_> as std::fmt::Debug>::fmt(self.root().as_ref(), f)
	}
}

impl<N: std::fmt::Debug> std::fmt::Debug for NodeRef<'_, N> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		<N as std::fmt::Debug>::fmt(self.as_ref(), f)
	}
}

impl std::fmt::Debug for SchemaNode<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		// Avoid going into stack overflow when rendering SchemaNode's debug
		// impl, in case there are loops

		use std::cell::Cell;
		struct SchemaNodeRenderingDepthGuard;
		thread_local! {
			static DEPTH: Cell<u32> = const { Cell::new(0) };
		}
		impl Drop for SchemaNodeRenderingDepthGuard {
			fn drop(&mut self) {
				DEPTH.with(|cell| cell.set(cell.get().checked_sub(1).unwrap()));
			}
		}
		const MAX_DEPTH: u32 = 2;
		let depth = DEPTH.with(|cell| {
			let val = cell.get();
			cell.set(val + 1);
			val
		});
		let _decrement_depth_guard = SchemaNodeRenderingDepthGuard;

		match *self {
			SchemaNode::Null => f.debug_tuple("Null").finish(),
			SchemaNode::Boolean => f.debug_tuple("Boolean").finish(),
			SchemaNode::Int => f.debug_tuple("Int").finish(),
			SchemaNode::Long => f.debug_tuple("Long").finish(),
			SchemaNode::Float => f.debug_tuple("Float").finish(),
			SchemaNode::Double => f.debug_tuple("Double").finish(),
			SchemaNode::Bytes => f.debug_tuple("Bytes").finish(),
			SchemaNode::String => f.debug_tuple("String").finish(),
			SchemaNode::Array(inner) => {
				let mut d = f.debug_tuple("Array");
				if depth < MAX_DEPTH {
					d.field(inner.as_ref());
				}
				d.finish()
			}
			SchemaNode::Map(inner) => {
				let mut d = f.debug_tuple("Map");
				if depth < MAX_DEPTH {
					d.field(inner.as_ref());
				}
				d.finish()
			}
			SchemaNode::Union(ref inner) => {
				let mut d = f.debug_tuple("Union");
				if depth < MAX_DEPTH {
					d.field(&inner.variants);
				}
				d.finish()
			}
			SchemaNode::Record(ref inner) => {
				let mut d = f.debug_tuple("Record");
				if depth < MAX_DEPTH {
					d.field(&inner.name);
					d.field(
						&inner
							.fields
							.iter()
							.map(|field| &field.name)
							.collect::<Vec<_>>(),
					);
				}
				d.finish()
			}
			SchemaNode::Enum(ref inner) => {
				let mut d = f.debug_tuple("Enum");
				if depth < MAX_DEPTH {
					d.field(&inner.name);
					d.field(&inner.symbols);
				}
				d.finish()
			}
			SchemaNode::Fixed(ref inner) => {
				let mut d = f.debug_tuple("Fixed");
				if depth < MAX_DEPTH {
					d.field(inner);
				}
				d.finish()
			}
		}
	}
}
