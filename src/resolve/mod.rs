//! Compilation of a writer schema against a decode target
//!
//! Given the schema data was written with (the *writer* schema) and a
//! description of where it should land (the *target*: a reader schema, or
//! one of the raw per-primitive targets), this module produces a
//! [`Resolved`] decode plan: a graph of *consumers*, one per position in
//! the writer schema, that the decode driver walks in lock-step with the
//! wire data to deposit writer-shaped data directly into the target's
//! native layout, honoring the schema evolution rules (numeric promotion,
//! bytes/string interchange, enum mapping by symbol name, record field
//! matching by name, union branch selection on both sides).
//!
//! Compilation is memoized on `(target identity, writer node identity)`:
//! the cache entry is installed *before* recursing into children, which is
//! what lets recursive schemas close into cycles instead of diverging, and
//! what makes shared sub-schemas compile once. Consumers live in an arena
//! owned by the [`Resolved`] value, so the possibly-cyclic consumer graph
//! is released in one pass when it is dropped, each node exactly once.
//!
//! A failed compilation returns no partial plan: every cache entry
//! installed by the failing subtree is rolled back, and the whole arena is
//! dropped when the error propagates out of the entry points.

mod error;

pub use error::{ResolveError, ResolveErrorKind};

use crate::{
	schema::self_referential::{NodeRef, SchemaNode},
	Schema,
};

use std::collections::HashMap;

/// Tunables for resolver compilation
#[derive(Clone, Debug)]
pub struct ResolverConfig {
	/// Bound on schema nesting during compilation (default 64)
	///
	/// Exceeding it fails compilation with
	/// [`ResolveErrorKind::RecursionLimit`]. Recursion through named
	/// references does not count against this bound (it is closed through
	/// the memoization cache); only genuine nesting does.
	pub max_depth: usize,
	/// Accept writer enum symbols that have no counterpart on the reader
	/// side (default `false`)
	///
	/// By default such a symbol makes compilation fail with
	/// [`ResolveErrorKind::Incompatible`]. When this is set, compilation
	/// succeeds and the symbol only becomes an error if it actually shows
	/// up in the data being decoded.
	pub lenient_enums: bool,
}

impl Default for ResolverConfig {
	fn default() -> Self {
		Self {
			max_depth: 64,
			lenient_enums: false,
		}
	}
}

/// The raw per-primitive decode targets
///
/// A resolver built for one of these deposits directly into the matching
/// native slot (`&mut i32`, `&mut RawString`, ...) with no reader schema
/// involved. The writer schema must be of exactly the matching kind, or a
/// union containing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RawTarget {
	Null,
	Boolean,
	Int,
	Long,
	Float,
	Double,
	Bytes,
	String,
}

impl RawTarget {
	fn name(self) -> &'static str {
		match self {
			RawTarget::Null => "null",
			RawTarget::Boolean => "boolean",
			RawTarget::Int => "int",
			RawTarget::Long => "long",
			RawTarget::Float => "float",
			RawTarget::Double => "double",
			RawTarget::Bytes => "bytes",
			RawTarget::String => "string",
		}
	}
}

/// Identity of a consumer inside a [`Resolved`] plan's arena
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct ConsumerKey {
	idx: usize,
}

/// Where a numeric writer value lands on the reader side
#[derive(Clone, Copy, Debug)]
pub(crate) enum NumericDest {
	Int,
	Long,
	Float,
	Double,
}

/// Where a length-delimited writer value lands on the reader side
#[derive(Clone, Copy, Debug)]
pub(crate) enum TextDest {
	Bytes,
	String,
}

/// One decode-plan node, covering one position of the writer schema
#[derive(Debug)]
pub(crate) struct Consumer<'s> {
	/// The writer schema node this consumer decodes
	pub(crate) writer: NodeRef<'s>,
	/// Set when the reader side wraps this position in a union: before
	/// delegating, the decoder selects this branch on the target and
	/// narrows to the branch's storage
	pub(crate) reader_branch: Option<usize>,
	pub(crate) action: Action,
}

#[derive(Debug)]
pub(crate) enum Action {
	Null,
	Boolean,
	Int(NumericDest),
	Long(NumericDest),
	Float(NumericDest),
	Double,
	Bytes(TextDest),
	String(TextDest),
	Fixed {
		size: usize,
	},
	Enum {
		/// Writer symbol index -> reader symbol index; `None` entries are
		/// unmapped symbols admitted by
		/// [`ResolverConfig::lenient_enums`]
		mapping: Vec<Option<usize>>,
	},
	Array {
		items: ConsumerKey,
	},
	Map {
		values: ConsumerKey,
	},
	Record {
		/// One action per writer field, in writer declaration order
		fields: Vec<FieldAction>,
		/// Reader field indexes with no writer counterpart; they carry a
		/// default (checked at compile time) and are left untouched by
		/// the decoder
		#[allow(dead_code)]
		defaulted: Vec<usize>,
	},
	WriterUnion {
		/// One entry per writer-union branch; `None` marks a branch that
		/// did not resolve (selecting it at decode time is an error)
		branches: Vec<Option<ConsumerKey>>,
	},
	/// Advance the decoder past this writer position without touching the
	/// target
	Skip,
}

#[derive(Debug)]
pub(crate) enum FieldAction {
	/// Decode into the reader field at `index`
	Read {
		index: usize,
		consumer: ConsumerKey,
	},
	/// Writer-only field: decode and discard
	Skip { consumer: ConsumerKey },
}

/// A compiled decode plan
///
/// Produced by [`Resolved::new`] (reader-schema target) or
/// [`Resolved::new_raw`] (raw primitive target), consumed by the decode
/// entry points in [`crate::de`]. It retains the writer schema for its
/// whole lifetime; the reader schema is only needed during compilation.
#[derive(Debug)]
pub struct Resolved<'s> {
	consumers: Vec<Option<Consumer<'s>>>,
	root: ConsumerKey,
}

impl<'s> Resolved<'s> {
	/// Compile `writer` against the reader schema `reader`, with default
	/// [`ResolverConfig`]
	pub fn new(writer: &'s Schema, reader: &Schema) -> Result<Self, ResolveError> {
		Self::with_config(writer, reader, &ResolverConfig::default())
	}

	/// Compile `writer` against the reader schema `reader`
	pub fn with_config(
		writer: &'s Schema,
		reader: &Schema,
		config: &ResolverConfig,
	) -> Result<Self, ResolveError> {
		let mut compiler = Compiler::new(config);
		let root = compiler.resolve(writer.root(), Target::Node(reader.root()), config.max_depth)?;
		Ok(Self {
			consumers: compiler.slots,
			root,
		})
	}

	/// Compile `writer` against a raw primitive target, with default
	/// [`ResolverConfig`]
	pub fn new_raw(writer: &'s Schema, target: RawTarget) -> Result<Self, ResolveError> {
		Self::raw_with_config(writer, target, &ResolverConfig::default())
	}

	/// Compile `writer` against a raw primitive target
	pub fn raw_with_config(
		writer: &'s Schema,
		target: RawTarget,
		config: &ResolverConfig,
	) -> Result<Self, ResolveError> {
		let mut compiler = Compiler::new(config);
		let root = compiler.resolve(writer.root(), Target::Raw(target), config.max_depth)?;
		Ok(Self {
			consumers: compiler.slots,
			root,
		})
	}

	/// Number of consumers in the plan (shared nodes counted once)
	pub fn consumer_count(&self) -> usize {
		self.consumers.iter().filter(|slot| slot.is_some()).count()
	}

	pub(crate) fn root_key(&self) -> ConsumerKey {
		self.root
	}

	pub(crate) fn consumer(&self, key: ConsumerKey) -> Option<&Consumer<'s>> {
		self.consumers.get(key.idx).and_then(Option::as_ref)
	}
}

/// Memoization key: the identity of the decode destination
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum TargetKey {
	/// A reader schema node, by address
	Node(usize),
	/// One of the per-primitive raw targets
	Raw(RawTarget),
	/// The decode-and-discard pseudo-target
	Skip,
}

#[derive(Clone, Copy)]
enum Target<'r> {
	Node(NodeRef<'r>),
	Raw(RawTarget),
}

fn node_id(node: NodeRef<'_>) -> usize {
	node.as_ref() as *const SchemaNode<'_> as *const () as usize
}

fn target_key(target: Target<'_>) -> TargetKey {
	match target {
		Target::Node(node) => TargetKey::Node(node_id(node)),
		Target::Raw(raw) => TargetKey::Raw(raw),
	}
}

fn describe_target(target: Target<'_>) -> &'static str {
	match target {
		Target::Node(node) => node.as_ref().kind_name(),
		Target::Raw(raw) => raw.name(),
	}
}

/// Whether writer kind `w` may pair with reader kind `r` at all
///
/// This is the kind-level half of the compatibility rules; metadata checks
/// (fixed sizes, enum symbols, record fields) happen when the pairing is
/// actually built.
fn kinds_pair(w: &SchemaNode<'_>, r: &SchemaNode<'_>) -> bool {
	use SchemaNode::*;
	matches!(
		(w, r),
		(Null, Null)
			| (Boolean, Boolean)
			| (Int, Int | Long | Float | Double)
			| (Long, Long | Float | Double)
			| (Float, Float | Double)
			| (Double, Double)
			| (Bytes, Bytes | String)
			| (String, String | Bytes)
			| (Fixed(_), Fixed(_))
			| (Enum(_), Enum(_))
			| (Array(_), Array(_))
			| (Map(_), Map(_))
			| (Record(_), Record(_))
	)
}

struct Compiler<'s, 'c> {
	slots: Vec<Option<Consumer<'s>>>,
	memo: HashMap<(TargetKey, usize), ConsumerKey>,
	/// Insertion log so a failing subtree can roll back every cache entry
	/// it installed (a removed entry must not leave descendants behind
	/// that reference its dead arena slot)
	memo_log: Vec<(TargetKey, usize)>,
	config: &'c ResolverConfig,
}

impl<'s, 'c> Compiler<'s, 'c> {
	fn new(config: &'c ResolverConfig) -> Self {
		Self {
			slots: Vec::new(),
			memo: HashMap::new(),
			memo_log: Vec::new(),
			config,
		}
	}

	fn alloc_slot(&mut self) -> ConsumerKey {
		let idx = self.slots.len();
		self.slots.push(None);
		ConsumerKey { idx }
	}

	fn insert_memo(&mut self, key: (TargetKey, usize), consumer: ConsumerKey) {
		self.memo.insert(key, consumer);
		self.memo_log.push(key);
	}

	fn checkpoint(&self) -> usize {
		self.memo_log.len()
	}

	fn rollback(&mut self, checkpoint: usize) {
		for key in self.memo_log.drain(checkpoint..) {
			self.memo.remove(&key);
		}
	}

	/// Resolve one `(writer, target)` pairing, memoized
	fn resolve(
		&mut self,
		writer: NodeRef<'s>,
		target: Target<'_>,
		depth: usize,
	) -> Result<ConsumerKey, ResolveError> {
		let depth = depth
			.checked_sub(1)
			.ok_or_else(ResolveError::recursion_limit)?;

		let memo_key = (target_key(target), node_id(writer));
		if let Some(&key) = self.memo.get(&memo_key) {
			return Ok(key);
		}

		if let Some(key) = self.try_direct(writer, target, depth)? {
			return Ok(key);
		}

		if let SchemaNode::Union(_) = writer.as_ref() {
			return self.resolve_writer_union(writer, target, depth);
		}

		Err(ResolveError::incompatible(format_args!(
			"Cannot resolve writer {} into {} target",
			writer.as_ref().kind_name(),
			describe_target(target)
		)))
	}

	/// Attempt the non-union pairings of `writer` against `target`
	///
	/// `Ok(None)` means the kinds simply don't pair here (the caller may
	/// still try the writer-union path); an error means the pairing was
	/// attempted and genuinely failed.
	fn try_direct(
		&mut self,
		writer: NodeRef<'s>,
		target: Target<'_>,
		depth: usize,
	) -> Result<Option<ConsumerKey>, ResolveError> {
		if let SchemaNode::Union(_) = writer.as_ref() {
			// Writer unions are handled by the writer-union path only
			return Ok(None);
		}
		match target {
			Target::Raw(raw) => Ok(self.try_raw(writer, raw)),
			Target::Node(reader) => match reader.as_ref() {
				SchemaNode::Union(reader_union) => {
					// Reader-side union: the first branch this writer
					// resolves against wins, and the consumer gets wrapped
					// with a branch selector so decode first narrows the
					// target to that branch's storage.
					for (branch_index, &branch) in reader_union.variants.iter().enumerate() {
						if !kinds_pair(writer.as_ref(), branch.as_ref()) {
							continue;
						}
						match self.build_direct(
							writer,
							branch,
							TargetKey::Node(node_id(reader)),
							Some(branch_index),
							depth,
						) {
							Ok(key) => return Ok(Some(key)),
							Err(e) if e.is_pairing_failure() => continue,
							Err(e) => return Err(e),
						}
					}
					Ok(None)
				}
				_ => {
					if !kinds_pair(writer.as_ref(), reader.as_ref()) {
						return Ok(None);
					}
					self.build_direct(
						writer,
						reader,
						TargetKey::Node(node_id(reader)),
						None,
						depth,
					)
					.map(Some)
				}
			},
		}
	}

	/// Build the consumer for a kind-compatible `(writer, reader)` pairing
	///
	/// The cache entry is installed under `memo_under` *before* recursing
	/// into children so that recursive schemas resolve to the pending
	/// consumer instead of recursing forever; on failure everything the
	/// subtree installed is rolled back.
	fn build_direct(
		&mut self,
		writer: NodeRef<'s>,
		reader: NodeRef<'_>,
		memo_under: TargetKey,
		reader_branch: Option<usize>,
		depth: usize,
	) -> Result<ConsumerKey, ResolveError> {
		let checkpoint = self.checkpoint();
		let memo_key = (memo_under, node_id(writer));
		let key = self.alloc_slot();
		self.insert_memo(memo_key, key);

		match self.direct_action(writer, reader, depth) {
			Ok(action) => {
				self.slots[key.idx] = Some(Consumer {
					writer,
					reader_branch,
					action,
				});
				Ok(key)
			}
			Err(e) => {
				self.rollback(checkpoint);
				Err(e)
			}
		}
	}

	fn direct_action(
		&mut self,
		writer: NodeRef<'s>,
		reader: NodeRef<'_>,
		depth: usize,
	) -> Result<Action, ResolveError> {
		Ok(match (writer.as_ref(), reader.as_ref()) {
			(SchemaNode::Null, SchemaNode::Null) => Action::Null,
			(SchemaNode::Boolean, SchemaNode::Boolean) => Action::Boolean,
			(SchemaNode::Int, SchemaNode::Int) => Action::Int(NumericDest::Int),
			(SchemaNode::Int, SchemaNode::Long) => Action::Int(NumericDest::Long),
			(SchemaNode::Int, SchemaNode::Float) => Action::Int(NumericDest::Float),
			(SchemaNode::Int, SchemaNode::Double) => Action::Int(NumericDest::Double),
			(SchemaNode::Long, SchemaNode::Long) => Action::Long(NumericDest::Long),
			(SchemaNode::Long, SchemaNode::Float) => Action::Long(NumericDest::Float),
			(SchemaNode::Long, SchemaNode::Double) => Action::Long(NumericDest::Double),
			(SchemaNode::Float, SchemaNode::Float) => Action::Float(NumericDest::Float),
			(SchemaNode::Float, SchemaNode::Double) => Action::Float(NumericDest::Double),
			(SchemaNode::Double, SchemaNode::Double) => Action::Double,
			(SchemaNode::Bytes, SchemaNode::Bytes) => Action::Bytes(TextDest::Bytes),
			(SchemaNode::Bytes, SchemaNode::String) => Action::Bytes(TextDest::String),
			(SchemaNode::String, SchemaNode::String) => Action::String(TextDest::String),
			(SchemaNode::String, SchemaNode::Bytes) => Action::String(TextDest::Bytes),
			(SchemaNode::Fixed(w_fixed), SchemaNode::Fixed(r_fixed)) => {
				if w_fixed.size != r_fixed.size {
					return Err(ResolveError::incompatible(format_args!(
						"Fixed size mismatch: writer {} has size {}, reader {} has size {}",
						w_fixed.name.fully_qualified_name(),
						w_fixed.size,
						r_fixed.name.fully_qualified_name(),
						r_fixed.size
					)));
				}
				Action::Fixed { size: w_fixed.size }
			}
			(SchemaNode::Enum(w_enum), SchemaNode::Enum(r_enum)) => {
				let mut mapping = Vec::with_capacity(w_enum.symbols.len());
				for symbol in &w_enum.symbols {
					match r_enum.per_name_lookup.get(symbol) {
						Some(&reader_index) => mapping.push(Some(reader_index)),
						None if self.config.lenient_enums => mapping.push(None),
						None => {
							return Err(ResolveError::incompatible(format_args!(
								"Writer enum symbol {} has no counterpart in reader enum {}",
								symbol,
								r_enum.name.fully_qualified_name()
							)))
						}
					}
				}
				Action::Enum { mapping }
			}
			(SchemaNode::Array(w_items), SchemaNode::Array(r_items)) => Action::Array {
				items: self.resolve(*w_items, Target::Node(*r_items), depth)?,
			},
			(SchemaNode::Map(w_values), SchemaNode::Map(r_values)) => Action::Map {
				values: self.resolve(*w_values, Target::Node(*r_values), depth)?,
			},
			(SchemaNode::Record(w_record), SchemaNode::Record(r_record)) => {
				let mut fields = Vec::with_capacity(w_record.fields.len());
				let mut matched = vec![false; r_record.fields.len()];
				for w_field in &w_record.fields {
					match r_record.per_name_lookup.get(&w_field.name) {
						Some(&reader_index) => {
							matched[reader_index] = true;
							let consumer = self.resolve(
								w_field.schema,
								Target::Node(r_record.fields[reader_index].schema),
								depth,
							)?;
							fields.push(FieldAction::Read {
								index: reader_index,
								consumer,
							});
						}
						None => {
							let consumer = self.resolve_skip(w_field.schema, depth)?;
							fields.push(FieldAction::Skip { consumer });
						}
					}
				}
				let mut defaulted = Vec::new();
				for (reader_index, r_field) in r_record.fields.iter().enumerate() {
					if !matched[reader_index] {
						if r_field.default.is_none() {
							return Err(ResolveError::missing_default(
								r_record.name.fully_qualified_name(),
								&r_field.name,
							));
						}
						defaulted.push(reader_index);
					}
				}
				Action::Record { fields, defaulted }
			}
			_ => {
				return Err(ResolveError::incompatible(format_args!(
					"Cannot resolve writer {} into reader {}",
					writer.as_ref().kind_name(),
					reader.as_ref().kind_name()
				)))
			}
		})
	}

	fn try_raw(&mut self, writer: NodeRef<'s>, raw: RawTarget) -> Option<ConsumerKey> {
		let action = match (writer.as_ref(), raw) {
			(SchemaNode::Null, RawTarget::Null) => Action::Null,
			(SchemaNode::Boolean, RawTarget::Boolean) => Action::Boolean,
			(SchemaNode::Int, RawTarget::Int) => Action::Int(NumericDest::Int),
			(SchemaNode::Long, RawTarget::Long) => Action::Long(NumericDest::Long),
			(SchemaNode::Float, RawTarget::Float) => Action::Float(NumericDest::Float),
			(SchemaNode::Double, RawTarget::Double) => Action::Double,
			(SchemaNode::Bytes, RawTarget::Bytes) => Action::Bytes(TextDest::Bytes),
			(SchemaNode::String, RawTarget::String) => Action::String(TextDest::String),
			_ => return None,
		};
		let key = self.alloc_slot();
		self.insert_memo((TargetKey::Raw(raw), node_id(writer)), key);
		self.slots[key.idx] = Some(Consumer {
			writer,
			reader_branch: None,
			action,
		});
		Some(key)
	}

	/// A consumer that advances the decoder past `writer` without writing
	/// anywhere (used for writer-only record fields)
	fn resolve_skip(
		&mut self,
		writer: NodeRef<'s>,
		depth: usize,
	) -> Result<ConsumerKey, ResolveError> {
		let _ = depth;
		let memo_key = (TargetKey::Skip, node_id(writer));
		if let Some(&key) = self.memo.get(&memo_key) {
			return Ok(key);
		}
		let key = self.alloc_slot();
		self.insert_memo(memo_key, key);
		self.slots[key.idx] = Some(Consumer {
			writer,
			reader_branch: None,
			action: Action::Skip,
		});
		Ok(key)
	}

	/// Writer-union dispatch: one child per writer branch, resolved
	/// against the same target
	///
	/// Branches that do not resolve are recorded as `None`; selecting one
	/// of those at decode time is an `IncompatibleBranch` error. If no
	/// branch resolves at all, the whole pairing is incompatible.
	fn resolve_writer_union(
		&mut self,
		writer: NodeRef<'s>,
		target: Target<'_>,
		depth: usize,
	) -> Result<ConsumerKey, ResolveError> {
		let variants = match writer.as_ref() {
			SchemaNode::Union(union) => &union.variants,
			_ => {
				return Err(ResolveError::incompatible(
					"resolve_writer_union called on a non-union writer",
				))
			}
		};

		let checkpoint = self.checkpoint();
		let memo_key = (target_key(target), node_id(writer));
		let key = self.alloc_slot();
		self.insert_memo(memo_key, key);

		let mut branches = Vec::with_capacity(variants.len());
		let mut any_compatible = false;
		for &branch in variants {
			match self.resolve(branch, target, depth) {
				Ok(branch_key) => {
					any_compatible = true;
					branches.push(Some(branch_key));
				}
				Err(e) if e.is_pairing_failure() => branches.push(None),
				Err(e) => {
					self.rollback(checkpoint);
					return Err(e);
				}
			}
		}

		if !any_compatible {
			self.rollback(checkpoint);
			return Err(ResolveError::incompatible(format_args!(
				"No branch in the writer union is compatible with the {} target",
				describe_target(target)
			)));
		}

		self.slots[key.idx] = Some(Consumer {
			writer,
			reader_branch: None,
			action: Action::WriterUnion { branches },
		});
		Ok(key)
	}
}
