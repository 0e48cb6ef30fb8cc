use std::collections::HashMap;
use anyhow::Result;
use crate::error::{bail_consistency, bail_format, consistency_error};
use crate::tree::method::code::{Label, LabelRange};

/// Hands out a [`Label`] for each bytecode offset referenced while reading.
///
/// Labels are numbered in the order they're first asked for.
pub(super) struct OffsetLabels {
	code_length: u16,
	labels: HashMap<u16, Label>,
	next_id: u32,
}

impl OffsetLabels {
	/// `code_length` must already be checked to be at most `u16::MAX`.
	pub(super) fn new(code_length: u16) -> OffsetLabels {
		OffsetLabels {
			code_length,
			labels: HashMap::with_capacity(code_length as usize / 3),
			next_id: 0,
		}
	}

	fn get_or_add_unchecked(&mut self, pc: u16) -> Label {
		*self.labels.entry(pc).or_insert_with(|| {
			let label = Label::new(self.next_id);
			self.next_id += 1;
			label
		})
	}

	/// Gets the label for an offset inside the bytecode.
	pub(super) fn get_or_create(&mut self, pc: u16) -> Result<Label> {
		if pc >= self.code_length {
			bail_format!("label for bytecode offset {pc} out of bounds for code length {}", self.code_length);
		}
		Ok(self.get_or_add_unchecked(pc))
	}

	/// Gets the label for an offset inside the bytecode, or for the offset right after it.
	pub(super) fn get_or_create_end(&mut self, pc: u32) -> Result<Label> {
		match u16::try_from(pc) {
			Ok(pc) if pc <= self.code_length => Ok(self.get_or_add_unchecked(pc)),
			_ => bail_format!("label for exclusive bytecode offset {pc} out of bounds for code length {}", self.code_length),
		}
	}

	pub(super) fn get_or_create_range(&mut self, start_pc: u16, length: u16) -> Result<LabelRange> {
		Ok(LabelRange {
			start: self.get_or_create(start_pc)?,
			end: self.get_or_create_end(start_pc as u32 + length as u32)?,
		})
	}

	pub(super) fn get(&self, pc: u16) -> Option<Label> {
		self.labels.get(&pc).copied()
	}

	/// Iterates over all offsets that have a label.
	pub(super) fn offsets(&self) -> impl Iterator<Item=u16> + '_ {
		self.labels.keys().copied()
	}
}

/// Maps [`Label`]s to the bytecode offsets they were placed at while writing.
pub(super) struct LabelOffsets {
	labels: HashMap<Label, u16>,
}

impl LabelOffsets {
	pub(super) fn new() -> LabelOffsets {
		LabelOffsets {
			labels: HashMap::new(),
		}
	}

	/// Places a label at an offset. Each label may only be placed once.
	pub(super) fn place(&mut self, label: Label, offset: u16) -> Result<()> {
		if let Some(old) = self.labels.insert(label, offset) {
			bail_consistency!("label {label:?} is placed twice, at bytecode offsets {old} and {offset}");
		}
		Ok(())
	}

	pub(super) fn get(&self, label: &Label) -> Option<u16> {
		self.labels.get(label).copied()
	}

	pub(super) fn try_get(&self, label: &Label) -> Result<u16> {
		self.get(label)
			.ok_or_else(|| consistency_error!("label {label:?} isn't placed at any instruction"))
	}

	/// Returns the start offset and the length of the range.
	pub(super) fn try_get_range(&self, range: &LabelRange) -> Result<(u16, u16)> {
		let start = self.try_get(&range.start)?;
		let end = self.try_get(&range.end)?;
		let Some(length) = end.checked_sub(start) else {
			bail_consistency!("range {range:?} ends at bytecode offset {end} before its start at {start}");
		};
		Ok((start, length))
	}

	/// Forgets all placed labels, for another attempt of writing the code.
	pub(super) fn next_attempt(&mut self) {
		self.labels = HashMap::with_capacity(self.labels.len());
	}
}
