use std::io::Write;
use anyhow::{anyhow, Context, Result};
use log::debug;
use crate::attribute::{write_attributes, AttributeScope};
use crate::class_constants::attribute;
use crate::error::bail_consistency;
use crate::pool::ConstantPool;
use crate::tree::attribute::{Attribute, AttributeValue};
use crate::tree::class::ClassFile;
use crate::tree::field::Field;
use crate::tree::method::Method;
use crate::{class_constants, instruction_list, ClassWrite};

pub(crate) fn write(writer: &mut impl Write, class: &ClassFile) -> Result<()> {
	// Entries are only appended, so that indices in attributes kept as raw bytes stay valid.
	let mut pool = class.pool.clone();

	// The body is rendered first, since that fills the constant pool.
	let mut body = Vec::new();

	body.write_u16(class.access)?;
	body.write_u16(pool.put_class(&class.name)?)?;
	body.write_u16(pool.put_optional(class.super_class.as_ref(), ConstantPool::put_class)?)?;
	body.write_slice(
		&class.interfaces,
		|w, size| w.write_usize_as_u16(size).with_context(|| anyhow!("too many interfaces on class {:?}", class.name)),
		|w, interface| w.write_u16(pool.put_class(interface)?)
	)?;

	body.write_slice(
		&class.fields,
		|w, size| w.write_usize_as_u16(size).with_context(|| anyhow!("too many fields on class {:?}", class.name)),
		|w, field| write_field(w, field, &mut pool)
	)?;

	body.write_slice(
		&class.methods,
		|w, size| w.write_usize_as_u16(size).with_context(|| anyhow!("too many methods on class {:?}", class.name)),
		|w, method| write_method(w, method, &mut pool)
	)?;

	write_attributes(&mut body, &class.attributes, &mut pool, AttributeScope::Class)
		.with_context(|| anyhow!("while writing the attributes of class {:?}", class.name))?;

	writer.write_u32(class_constants::MAGIC)?;
	writer.write_u16(class.version.minor)?;
	writer.write_u16(class.version.major)?;
	pool.write(writer)?;
	writer.write_u8_slice(&body)?;

	debug!("wrote class {:?} with {} constant pool slots", class.name, pool.count());
	Ok(())
}

fn write_field(writer: &mut impl ClassWrite, field: &Field, pool: &mut ConstantPool) -> Result<()> {
	writer.write_u16(field.access)?;
	writer.write_u16(pool.put_utf8(&field.name)?)?;
	writer.write_u16(pool.put_utf8(&field.descriptor)?)?;

	write_attributes(writer, &field.attributes, pool, AttributeScope::Field)
		.with_context(|| anyhow!("while writing field {:?}", field.name))
}

/// Writes a method, with [`Method::code`] as its first attribute.
fn write_method(writer: &mut impl ClassWrite, method: &Method, pool: &mut ConstantPool) -> Result<()> {
	writer.write_u16(method.access)?;
	writer.write_u16(pool.put_utf8(&method.name)?)?;
	writer.write_u16(pool.put_utf8(&method.descriptor)?)?;

	let code = match &method.code {
		Some(code) => {
			if method.attributes.iter().any(|a| a.name.as_java_str() == attribute::CODE) {
				bail_consistency!("method {:?} {:?} has both code and a `Code` attribute", method.name, method.descriptor);
			}
			let code = instruction_list::encode(code, pool)
				.with_context(|| anyhow!("while encoding the code of method {:?} {:?}", method.name, method.descriptor))?;
			Attribute::from_value(AttributeValue::Code(code))
		},
		None => None,
	};

	write_attributes(writer, code.iter().chain(&method.attributes), pool, AttributeScope::Method)
		.with_context(|| anyhow!("while writing method {:?} {:?}", method.name, method.descriptor))
}
