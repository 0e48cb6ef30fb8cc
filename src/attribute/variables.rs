//! The codecs of the debug tables inside the `Code` attribute: line numbers and local variables.

use std::io::Cursor;
use anyhow::Result;
use crate::attribute::mismatch;
use crate::class_constants::attribute;
use crate::pool::ConstantPool;
use crate::tree::attribute::{AttributeValue, LineNumber, LocalVariable};
use crate::{ClassRead, ClassWrite};

pub(super) fn parse_line_numbers(reader: &mut Cursor<&[u8]>, _: &ConstantPool) -> Result<AttributeValue> {
	let line_numbers = reader.read_vec(
		|r| r.read_u16_as_usize(),
		|r| Ok(LineNumber {
			start_pc: r.read_u16()?,
			line_number: r.read_u16()?,
		})
	)?;
	Ok(AttributeValue::LineNumberTable(line_numbers))
}

pub(super) fn write_line_numbers(writer: &mut Vec<u8>, value: &AttributeValue, _: &mut ConstantPool) -> Result<()> {
	let AttributeValue::LineNumberTable(line_numbers) = value else {
		return Err(mismatch(attribute::LINE_NUMBER_TABLE, value));
	};
	writer.write_slice(
		line_numbers,
		|w, size| w.write_usize_as_u16(size),
		|w, line| {
			w.write_u16(line.start_pc)?;
			w.write_u16(line.line_number)
		}
	)
}

fn read_rows(reader: &mut impl ClassRead, pool: &ConstantPool) -> Result<Vec<LocalVariable>> {
	reader.read_vec(
		|r| r.read_u16_as_usize(),
		|r| Ok(LocalVariable {
			start_pc: r.read_u16()?,
			length: r.read_u16()?,
			name: pool.get_utf8(r.read_u16()?)?.to_owned(),
			descriptor: pool.get_utf8(r.read_u16()?)?.to_owned(),
			index: r.read_u16()?,
		})
	)
}

fn write_rows(writer: &mut impl ClassWrite, local_variables: &[LocalVariable], pool: &mut ConstantPool) -> Result<()> {
	writer.write_slice(
		local_variables,
		|w, size| w.write_usize_as_u16(size),
		|w, lv| {
			w.write_u16(lv.start_pc)?;
			w.write_u16(lv.length)?;
			w.write_u16(pool.put_utf8(&lv.name)?)?;
			w.write_u16(pool.put_utf8(&lv.descriptor)?)?;
			w.write_u16(lv.index)
		}
	)
}

pub(super) fn parse_local_variables(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<AttributeValue> {
	Ok(AttributeValue::LocalVariableTable(read_rows(reader, pool)?))
}

pub(super) fn write_local_variables(writer: &mut Vec<u8>, value: &AttributeValue, pool: &mut ConstantPool) -> Result<()> {
	let AttributeValue::LocalVariableTable(local_variables) = value else {
		return Err(mismatch(attribute::LOCAL_VARIABLE_TABLE, value));
	};
	write_rows(writer, local_variables, pool)
}

pub(super) fn parse_local_variable_types(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<AttributeValue> {
	Ok(AttributeValue::LocalVariableTypeTable(read_rows(reader, pool)?))
}

pub(super) fn write_local_variable_types(writer: &mut Vec<u8>, value: &AttributeValue, pool: &mut ConstantPool) -> Result<()> {
	let AttributeValue::LocalVariableTypeTable(local_variables) = value else {
		return Err(mismatch(attribute::LOCAL_VARIABLE_TYPE_TABLE, value));
	};
	write_rows(writer, local_variables, pool)
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use java_string::JavaStr;
	use pretty_assertions::assert_eq;
	use crate::attribute::{parse, write, AttributeScope};
	use crate::pool::ConstantPool;
	use crate::tree::attribute::{AttributeValue, LineNumber, LocalVariable};

	#[test]
	fn line_numbers() -> Result<()> {
		let name = JavaStr::from_str("LineNumberTable");
		let mut pool = ConstantPool::new();
		let value = AttributeValue::LineNumberTable(vec![
			LineNumber { start_pc: 0, line_number: 10 },
			LineNumber { start_pc: 4, line_number: 11 },
		]);

		let bytes = write(name, &value, &mut pool, AttributeScope::Code)?;
		assert_eq!(bytes, vec![0, 2, 0, 0, 0, 10, 0, 4, 0, 11]);
		assert_eq!(pool.count(), 1);
		assert_eq!(parse(name, bytes, &pool, AttributeScope::Code)?, value);
		Ok(())
	}

	#[test]
	fn local_variables() -> Result<()> {
		let mut pool = ConstantPool::new();
		let rows = vec![
			LocalVariable { start_pc: 0, length: 12, name: "this".into(), descriptor: "La/B;".into(), index: 0 },
			LocalVariable { start_pc: 2, length: 10, name: "list".into(), descriptor: "Ljava/util/List;".into(), index: 1 },
		];

		for (name, value) in [
			("LocalVariableTable", AttributeValue::LocalVariableTable(rows.clone())),
			("LocalVariableTypeTable", AttributeValue::LocalVariableTypeTable(rows.clone())),
		] {
			let name = JavaStr::from_str(name);
			let bytes = write(name, &value, &mut pool, AttributeScope::Code)?;
			assert_eq!(bytes.len(), 2 + 2 * 10);
			assert_eq!(parse(name, bytes, &pool, AttributeScope::Code)?, value);
		}
		Ok(())
	}
}
