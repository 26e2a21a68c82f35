use super::{SchemaMut, SchemaNode};

/// Error: the schema contains records whose values could never be finite
///
/// A record field whose type is itself a record contributes a mandatory,
/// always-present sub-value. If such fields form a cycle, every value of
/// the schema would have to nest forever. Unions, arrays and maps break
/// the chain, because they may select another branch or be empty; that is
/// why conditional self-references like `Node { next: union { null, Node } }`
/// stay legal.
#[derive(Debug, thiserror::Error)]
#[error("Schema has a record-only cycle through {name}; values of such a schema cannot be finite")]
pub struct UnconditionalCycle {
	name: String,
}

impl SchemaMut {
	/// Reject record-only cycles.
	///
	/// Works by elimination: a record none of whose fields is a record is
	/// trivially finite, and a record becomes finite once every
	/// record-typed field of it points at a finite record. Whatever
	/// survives the elimination is part of (or feeds into) a record-only
	/// cycle.
	pub(crate) fn check_for_cycles(&self) -> Result<(), UnconditionalCycle> {
		let is_record = |idx: usize| matches!(self.nodes[idx], SchemaNode::Record(_));

		// Count each record's record-typed fields and remember the reverse
		// edges, so eliminating a record can release its dependents.
		let mut blocking_fields = vec![0usize; self.nodes.len()];
		let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
		let mut record_count = 0usize;
		for (idx, node) in self.nodes.iter().enumerate() {
			if let SchemaNode::Record(record) = node {
				record_count += 1;
				for field in &record.fields {
					if is_record(field.type_.idx()) {
						blocking_fields[idx] += 1;
						dependents[field.type_.idx()].push(idx);
					}
				}
			}
		}

		let mut finite: Vec<usize> = (0..self.nodes.len())
			.filter(|&idx| is_record(idx) && blocking_fields[idx] == 0)
			.collect();
		let mut unresolved = record_count;
		while let Some(idx) = finite.pop() {
			unresolved -= 1;
			for dependent in std::mem::take(&mut dependents[idx]) {
				blocking_fields[dependent] -= 1;
				if blocking_fields[dependent] == 0 {
					finite.push(dependent);
				}
			}
		}

		if unresolved > 0 {
			// Any survivor makes for a truthful report
			let name = self
				.nodes
				.iter()
				.enumerate()
				.find_map(|(idx, node)| match node {
					SchemaNode::Record(record) if blocking_fields[idx] > 0 => {
						Some(record.name.fully_qualified_name().to_owned())
					}
					_ => None,
				})
				.unwrap_or_default();
			return Err(UnconditionalCycle { name });
		}
		Ok(())
	}
}
