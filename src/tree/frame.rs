//! The entries of the `StackMapTable` attribute.
//!
//! Both the byte level [`StackMapFrame`] and the frames attached to instructions share [`FrameData`]. The two differ only
//! in how an uninitialized value names the `new` instruction that created it: by bytecode offset, or by [`Label`].
//!
//! [`Label`]: crate::tree::method::code::Label

use anyhow::Result;
use crate::error::bail_format;
use crate::tree::class::ClassName;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VerificationType<U> {
	Top,
	Integer,
	Float,
	Double,
	Long,
	Null,
	UninitializedThis,
	Object(ClassName),
	/// An object created by the `new` instruction at the given position that wasn't initialized yet.
	Uninitialized(U),
}

impl<U> VerificationType<U> {
	pub fn try_map<V>(self, f: impl FnOnce(U) -> Result<V>) -> Result<VerificationType<V>> {
		Ok(match self {
			VerificationType::Top => VerificationType::Top,
			VerificationType::Integer => VerificationType::Integer,
			VerificationType::Float => VerificationType::Float,
			VerificationType::Double => VerificationType::Double,
			VerificationType::Long => VerificationType::Long,
			VerificationType::Null => VerificationType::Null,
			VerificationType::UninitializedThis => VerificationType::UninitializedThis,
			VerificationType::Object(class) => VerificationType::Object(class),
			VerificationType::Uninitialized(u) => VerificationType::Uninitialized(f(u)?),
		})
	}
}

/// The shape of a stack map frame, relative to the previous frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameData<U> {
	/// Same locals as the previous frame, and an empty stack.
	Same,
	/// Same locals as the previous frame, and exactly one stack item.
	SameLocals1StackItem(VerificationType<U>),
	/// The last `1..=3` locals of the previous frame are absent, and the stack is empty.
	///
	/// Use [`FrameData::chop`] to check the bounds when creating this.
	Chop(u8),
	/// `1..=3` locals are added to the ones of the previous frame, and the stack is empty.
	///
	/// Use [`FrameData::append`] to check the bounds when creating this.
	Append(Vec<VerificationType<U>>),
	Full {
		locals: Vec<VerificationType<U>>,
		stack: Vec<VerificationType<U>>,
	},
}

impl<U> FrameData<U> {
	pub fn chop(k: u8) -> Result<FrameData<U>> {
		let frame = FrameData::Chop(k);
		frame.check_bounds()?;
		Ok(frame)
	}

	pub fn append(locals: Vec<VerificationType<U>>) -> Result<FrameData<U>> {
		let frame = FrameData::Append(locals);
		frame.check_bounds()?;
		Ok(frame)
	}

	/// Checks that a chop or append frame removes or adds between one and three locals.
	pub fn check_bounds(&self) -> Result<()> {
		match self {
			FrameData::Chop(k) if !(1..=3).contains(k) => {
				bail_format!("chop frame must remove between 1 and 3 locals, got {k}")
			},
			FrameData::Append(locals) if !(1..=3).contains(&locals.len()) => {
				bail_format!("append frame must add between 1 and 3 locals, got {}", locals.len())
			},
			_ => Ok(()),
		}
	}

	pub fn try_map<V>(self, mut f: impl FnMut(U) -> Result<V>) -> Result<FrameData<V>> {
		fn map_all<U, V>(vec: Vec<VerificationType<U>>, f: &mut impl FnMut(U) -> Result<V>) -> Result<Vec<VerificationType<V>>> {
			vec.into_iter()
				.map(|x| x.try_map(&mut *f))
				.collect()
		}

		Ok(match self {
			FrameData::Same => FrameData::Same,
			FrameData::SameLocals1StackItem(stack) => FrameData::SameLocals1StackItem(stack.try_map(f)?),
			FrameData::Chop(k) => FrameData::Chop(k),
			FrameData::Append(locals) => FrameData::Append(map_all(locals, &mut f)?),
			FrameData::Full { locals, stack } => FrameData::Full {
				locals: map_all(locals, &mut f)?,
				stack: map_all(stack, &mut f)?,
			},
		})
	}
}

/// A frame as stored in the `StackMapTable` attribute.
///
/// The first frame is at the bytecode offset `offset_delta`, every later frame is at the offset of the previous frame
/// plus `offset_delta + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackMapFrame {
	pub offset_delta: u16,
	pub data: FrameData<u16>,
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::error::{kind_of, ErrorKind};
	use crate::tree::frame::{FrameData, VerificationType};

	#[test]
	fn chop_bounds() {
		for k in [0, 4, 255] {
			let error = FrameData::<u16>::chop(k).unwrap_err();
			assert_eq!(kind_of(&error), Some(ErrorKind::Format));
		}
		for k in 1..=3 {
			assert_eq!(FrameData::<u16>::chop(k).ok(), Some(FrameData::Chop(k)));
		}
	}

	#[test]
	fn append_bounds() {
		let error = FrameData::<u16>::append(vec![]).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Format));

		let error = FrameData::<u16>::append(vec![VerificationType::Integer; 4]).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Format));

		assert!(FrameData::<u16>::append(vec![VerificationType::Integer; 3]).is_ok());
	}

	#[test]
	fn map_uninitialized() -> Result<()> {
		let frame: FrameData<u16> = FrameData::Full {
			locals: vec![VerificationType::Uninitialized(3), VerificationType::Long],
			stack: vec![VerificationType::Uninitialized(7)],
		};
		let mapped = frame.try_map(|offset| Ok(offset as u32 * 2))?;
		assert_eq!(mapped, FrameData::Full {
			locals: vec![VerificationType::Uninitialized(6), VerificationType::Long],
			stack: vec![VerificationType::Uninitialized(14)],
		});
		Ok(())
	}
}
