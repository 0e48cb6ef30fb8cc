//! The `Code` codec, keeping the bytecode as raw bytes.

use std::io::Cursor;
use anyhow::{anyhow, Context, Result};
use crate::attribute::{mismatch, read_attributes, write_attributes, AttributeScope};
use crate::class_constants::attribute;
use crate::error::{bail_capacity, bail_format};
use crate::pool::ConstantPool;
use crate::tree::attribute::{AttributeValue, CodeAttribute, ExceptionTableEntry};
use crate::{ClassRead, ClassWrite};

pub(super) fn parse(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<AttributeValue> {
	let max_stack = reader.read_u16()?;
	let max_locals = reader.read_u16()?;

	let code_length = reader.read_u32()? as usize;
	if code_length == 0 || code_length > CodeAttribute::MAX_CODE_LENGTH {
		bail_format!("`code_length` must be greater than zero and less than 65536, got {code_length}");
	}
	let code = reader.read_u8_vec(code_length)?;

	let exception_table = reader.read_vec(
		|r| r.read_u16_as_usize(),
		|r| Ok(ExceptionTableEntry {
			start_pc: r.read_u16()?,
			end_pc: r.read_u16()?,
			handler_pc: r.read_u16()?,
			catch_type: pool.get_optional(r.read_u16()?, ConstantPool::get_class)?.cloned(),
		})
	).context("while reading the exception table")?;

	let attributes = read_attributes(reader, pool, AttributeScope::Code)?;

	Ok(AttributeValue::Code(CodeAttribute { max_stack, max_locals, code, exception_table, attributes }))
}

pub(super) fn write(writer: &mut Vec<u8>, value: &AttributeValue, pool: &mut ConstantPool) -> Result<()> {
	let AttributeValue::Code(code) = value else {
		return Err(mismatch(attribute::CODE, value));
	};

	if code.code.is_empty() {
		bail_format!("cannot write a `Code` attribute without any bytecode");
	}
	if code.code.len() > CodeAttribute::MAX_CODE_LENGTH {
		bail_capacity!("bytecode of {} bytes is too long, at most {} bytes are allowed", code.code.len(), CodeAttribute::MAX_CODE_LENGTH);
	}

	writer.write_u16(code.max_stack)?;
	writer.write_u16(code.max_locals)?;
	writer.write_usize_as_u32(code.code.len())?;
	writer.write_u8_slice(&code.code)?;

	writer.write_slice(
		&code.exception_table,
		|w, size| w.write_usize_as_u16(size),
		|w, entry| {
			w.write_u16(entry.start_pc)?;
			w.write_u16(entry.end_pc)?;
			w.write_u16(entry.handler_pc)?;
			w.write_u16(pool.put_optional(entry.catch_type.as_ref(), ConstantPool::put_class)?)
		}
	).with_context(|| anyhow!("while writing the exception table of {} entries", code.exception_table.len()))?;

	write_attributes(writer, &code.attributes, pool, AttributeScope::Code)
}
