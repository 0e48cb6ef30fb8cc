//! The `StackMapTable` codec.
//!
//! Every frame starts with a tag byte. For the frame kinds that have an implicit offset delta, the range of the tag
//! gives both the kind and the delta.

use std::io::Cursor;
use anyhow::{anyhow, Context, Result};
use crate::attribute::mismatch;
use crate::class_constants::{attribute, frame_type, verification_type};
use crate::error::bail_format;
use crate::pool::ConstantPool;
use crate::tree::attribute::AttributeValue;
use crate::tree::frame::{FrameData, StackMapFrame, VerificationType};
use crate::{ClassRead, ClassWrite};

pub(super) fn parse(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<AttributeValue> {
	let count = reader.read_u16_as_usize()?;
	let mut frames = Vec::with_capacity(count);
	for i in 0..count {
		let frame = read_frame(reader, pool)
			.with_context(|| anyhow!("failed to read stack map frame {i}"))?;
		frames.push(frame);
	}
	Ok(AttributeValue::StackMapTable(frames))
}

pub(super) fn write(writer: &mut Vec<u8>, value: &AttributeValue, pool: &mut ConstantPool) -> Result<()> {
	let AttributeValue::StackMapTable(frames) = value else {
		return Err(mismatch(attribute::STACK_MAP_TABLE, value));
	};
	// check all before anything is written
	for frame in frames {
		frame.data.check_bounds()?;
	}
	writer.write_slice(
		frames,
		|w, size| w.write_usize_as_u16(size),
		|w, frame| write_frame(w, frame, pool)
	)
}

fn read_frame(reader: &mut impl ClassRead, pool: &ConstantPool) -> Result<StackMapFrame> {
	let tag = reader.read_u8()?;
	let (offset_delta, data) = match tag {
		0..=frame_type::SAME_MAX => (tag as u16, FrameData::Same),
		frame_type::SAME_LOCALS_1_STACK_ITEM..=frame_type::SAME_LOCALS_1_STACK_ITEM_MAX => {
			let stack = read_verification_type(reader, pool)?;
			((tag - frame_type::SAME_LOCALS_1_STACK_ITEM) as u16, FrameData::SameLocals1StackItem(stack))
		},
		frame_type::SAME_LOCALS_1_STACK_ITEM_EXTENDED => {
			let offset_delta = reader.read_u16()?;
			let stack = read_verification_type(reader, pool)?;
			(offset_delta, FrameData::SameLocals1StackItem(stack))
		},
		frame_type::CHOP_MIN..=frame_type::CHOP_MAX => {
			(reader.read_u16()?, FrameData::Chop(frame_type::SAME_FRAME_EXTENDED - tag))
		},
		frame_type::SAME_FRAME_EXTENDED => (reader.read_u16()?, FrameData::Same),
		frame_type::APPEND_MIN..=frame_type::APPEND_MAX => {
			let offset_delta = reader.read_u16()?;
			let count = tag - frame_type::SAME_FRAME_EXTENDED;
			let locals = (0..count)
				.map(|_| read_verification_type(reader, pool))
				.collect::<Result<_>>()?;
			(offset_delta, FrameData::Append(locals))
		},
		frame_type::FULL_FRAME => {
			let offset_delta = reader.read_u16()?;
			let locals = reader.read_vec(
				|r| r.read_u16_as_usize(),
				|r| read_verification_type(r, pool)
			)?;
			let stack = reader.read_vec(
				|r| r.read_u16_as_usize(),
				|r| read_verification_type(r, pool)
			)?;
			(offset_delta, FrameData::Full { locals, stack })
		},
		tag => bail_format!("unknown stack map frame type {tag}"),
	};
	Ok(StackMapFrame { offset_delta, data })
}

fn write_frame(writer: &mut impl ClassWrite, frame: &StackMapFrame, pool: &mut ConstantPool) -> Result<()> {
	let offset_delta = frame.offset_delta;
	match &frame.data {
		FrameData::Same => {
			if offset_delta <= frame_type::SAME_MAX as u16 {
				writer.write_u8(offset_delta as u8)?;
			} else {
				writer.write_u8(frame_type::SAME_FRAME_EXTENDED)?;
				writer.write_u16(offset_delta)?;
			}
		},
		FrameData::SameLocals1StackItem(stack) => {
			if offset_delta <= (frame_type::SAME_LOCALS_1_STACK_ITEM_MAX - frame_type::SAME_LOCALS_1_STACK_ITEM) as u16 {
				writer.write_u8(frame_type::SAME_LOCALS_1_STACK_ITEM + offset_delta as u8)?;
			} else {
				writer.write_u8(frame_type::SAME_LOCALS_1_STACK_ITEM_EXTENDED)?;
				writer.write_u16(offset_delta)?;
			}
			write_verification_type(writer, stack, pool)?;
		},
		FrameData::Chop(k) => {
			writer.write_u8(frame_type::SAME_FRAME_EXTENDED - k)?;
			writer.write_u16(offset_delta)?;
		},
		FrameData::Append(locals) => {
			writer.write_u8(frame_type::SAME_FRAME_EXTENDED + locals.len() as u8)?;
			writer.write_u16(offset_delta)?;
			for local in locals {
				write_verification_type(writer, local, pool)?;
			}
		},
		FrameData::Full { locals, stack } => {
			writer.write_u8(frame_type::FULL_FRAME)?;
			writer.write_u16(offset_delta)?;
			writer.write_slice(
				locals,
				|w, size| w.write_usize_as_u16(size),
				|w, local| write_verification_type(w, local, pool)
			)?;
			writer.write_slice(
				stack,
				|w, size| w.write_usize_as_u16(size),
				|w, item| write_verification_type(w, item, pool)
			)?;
		},
	}
	Ok(())
}

fn read_verification_type(reader: &mut impl ClassRead, pool: &ConstantPool) -> Result<VerificationType<u16>> {
	Ok(match reader.read_u8()? {
		verification_type::TOP => VerificationType::Top,
		verification_type::INTEGER => VerificationType::Integer,
		verification_type::FLOAT => VerificationType::Float,
		verification_type::DOUBLE => VerificationType::Double,
		verification_type::LONG => VerificationType::Long,
		verification_type::NULL => VerificationType::Null,
		verification_type::UNINITIALIZED_THIS => VerificationType::UninitializedThis,
		verification_type::OBJECT => VerificationType::Object(pool.get_class(reader.read_u16()?)?.clone()),
		verification_type::UNINITIALIZED => VerificationType::Uninitialized(reader.read_u16()?),
		tag => bail_format!("unknown verification_type_info tag {tag}"),
	})
}

fn write_verification_type(writer: &mut impl ClassWrite, value: &VerificationType<u16>, pool: &mut ConstantPool) -> Result<()> {
	match value {
		VerificationType::Top => writer.write_u8(verification_type::TOP),
		VerificationType::Integer => writer.write_u8(verification_type::INTEGER),
		VerificationType::Float => writer.write_u8(verification_type::FLOAT),
		VerificationType::Double => writer.write_u8(verification_type::DOUBLE),
		VerificationType::Long => writer.write_u8(verification_type::LONG),
		VerificationType::Null => writer.write_u8(verification_type::NULL),
		VerificationType::UninitializedThis => writer.write_u8(verification_type::UNINITIALIZED_THIS),
		VerificationType::Object(class) => {
			writer.write_u8(verification_type::OBJECT)?;
			writer.write_u16(pool.put_class(class)?)
		},
		VerificationType::Uninitialized(offset) => {
			writer.write_u8(verification_type::UNINITIALIZED)?;
			writer.write_u16(*offset)
		},
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use java_string::JavaStr;
	use pretty_assertions::assert_eq;
	use crate::attribute::{parse, write, AttributeScope};
	use crate::error::{kind_of, ErrorKind};
	use crate::pool::ConstantPool;
	use crate::tree::attribute::AttributeValue;
	use crate::tree::class::ClassName;
	use crate::tree::frame::{FrameData, StackMapFrame, VerificationType};

	fn name() -> &'static JavaStr {
		JavaStr::from_str("StackMapTable")
	}

	fn encode(frames: Vec<StackMapFrame>, pool: &mut ConstantPool) -> Result<Vec<u8>> {
		write(name(), &AttributeValue::StackMapTable(frames), pool, AttributeScope::Code)
	}

	fn decode(bytes: Vec<u8>, pool: &ConstantPool) -> Result<Vec<StackMapFrame>> {
		match parse(name(), bytes, pool, AttributeScope::Code)? {
			AttributeValue::StackMapTable(frames) => Ok(frames),
			value => panic!("expected a stack map table, got {value:?}"),
		}
	}

	fn frame(offset_delta: u16, data: FrameData<u16>) -> StackMapFrame {
		StackMapFrame { offset_delta, data }
	}

	#[test]
	fn same_frame_boundary() -> Result<()> {
		let mut pool = ConstantPool::new();

		let bytes = encode(vec![frame(63, FrameData::Same)], &mut pool)?;
		assert_eq!(bytes, vec![0, 1, 63]);
		assert_eq!(decode(bytes, &pool)?, vec![frame(63, FrameData::Same)]);

		let bytes = encode(vec![frame(64, FrameData::Same)], &mut pool)?;
		assert_eq!(bytes, vec![0, 1, 251, 0, 64]);
		assert_eq!(decode(bytes, &pool)?, vec![frame(64, FrameData::Same)]);
		Ok(())
	}

	#[test]
	fn same_locals_1_stack_item_boundary() -> Result<()> {
		let mut pool = ConstantPool::new();
		let item = || FrameData::SameLocals1StackItem(VerificationType::Integer);

		let bytes = encode(vec![frame(63, item())], &mut pool)?;
		assert_eq!(bytes, vec![0, 1, 127, 1]);
		assert_eq!(decode(bytes, &pool)?, vec![frame(63, item())]);

		let bytes = encode(vec![frame(64, item())], &mut pool)?;
		assert_eq!(bytes, vec![0, 1, 247, 0, 64, 1]);
		assert_eq!(decode(bytes, &pool)?, vec![frame(64, item())]);

		let bytes = encode(vec![frame(0, item())], &mut pool)?;
		assert_eq!(bytes, vec![0, 1, 64, 1]);
		Ok(())
	}

	#[test]
	fn all_frame_kinds() -> Result<()> {
		let mut pool = ConstantPool::new();
		let string = ClassName::try_from("java/lang/String")?;
		let frames = vec![
			frame(0, FrameData::Same),
			frame(5, FrameData::chop(1)?),
			frame(6, FrameData::chop(3)?),
			frame(7, FrameData::append(vec![VerificationType::Long])?),
			frame(8, FrameData::append(vec![VerificationType::Top, VerificationType::Float, VerificationType::Null])?),
			frame(300, FrameData::SameLocals1StackItem(VerificationType::Uninitialized(12))),
			frame(9, FrameData::Full {
				locals: vec![VerificationType::UninitializedThis, VerificationType::Object(string.clone()), VerificationType::Double],
				stack: vec![VerificationType::Object(string)],
			}),
		];

		let bytes = encode(frames.clone(), &mut pool)?;
		assert_eq!(&bytes[..6], &[0, 7, 0, 250, 0, 5]);
		assert_eq!(&bytes[6..9], &[248, 0, 6]);
		assert_eq!(&bytes[9..13], &[252, 0, 7, 4]);
		assert_eq!(decode(bytes, &pool)?, frames);
		Ok(())
	}

	#[test]
	fn bad_frame_types() {
		let pool = ConstantPool::new();
		for tag in [128, 200, 246] {
			let error = decode(vec![0, 1, tag], &pool).unwrap_err();
			assert_eq!(kind_of(&error), Some(ErrorKind::Format), "tag {tag}");
		}
	}

	#[test]
	fn bad_verification_type() {
		let error = decode(vec![0, 1, 64, 9], &ConstantPool::new()).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Format));
	}

	#[test]
	fn out_of_bounds_frames_are_not_written() {
		let mut pool = ConstantPool::new();
		for data in [
			FrameData::Chop(0),
			FrameData::Chop(4),
			FrameData::Append(Vec::new()),
			FrameData::Append(vec![VerificationType::Integer; 4]),
		] {
			let mut buffer = Vec::new();
			let value = AttributeValue::StackMapTable(vec![frame(0, FrameData::Same), frame(1, data)]);
			let error = super::write(&mut buffer, &value, &mut pool).unwrap_err();
			assert_eq!(kind_of(&error), Some(ErrorKind::Format));
			assert_eq!(buffer, Vec::<u8>::new());
		}
	}
}
