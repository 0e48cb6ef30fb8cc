use std::io::{Read, Seek};
use anyhow::{anyhow, Context, Result};
use log::debug;
use crate::attribute::{read_attributes, AttributeScope};
use crate::error::bail_format;
use crate::pool::ConstantPool;
use crate::tree::attribute::AttributeValue;
use crate::tree::class::ClassFile;
use crate::tree::field::Field;
use crate::tree::method::Method;
use crate::tree::version::Version;
use crate::{class_constants, instruction_list, ClassRead};

pub(crate) fn read(reader: &mut (impl Read + Seek)) -> Result<ClassFile> {
	let magic = reader.read_u32()?;
	if magic != class_constants::MAGIC {
		bail_format!("wrong magic: got {magic:#x}, expected 0xCAFEBABE");
	}

	let minor = reader.read_u16()?;
	let major = reader.read_u16()?;
	let version = Version::new(major, minor);
	if !version.is_supported() {
		bail_format!("unsupported class file version {version}, the latest supported one is {}", Version::LATEST);
	}

	let pool = ConstantPool::read(reader)?;

	let access = reader.read_u16()?;
	let name = pool.get_class(reader.read_u16()?)?.clone();
	let super_class = pool.get_optional(reader.read_u16()?, ConstantPool::get_class)?.cloned();
	let interfaces = reader.read_vec(
		|r| r.read_u16_as_usize(),
		|r| Ok(pool.get_class(r.read_u16()?)?.clone())
	).with_context(|| anyhow!("while reading the interfaces of class {name:?}"))?;

	let fields = reader.read_vec(
		|r| r.read_u16_as_usize(),
		|r| read_field(r, &pool)
	).with_context(|| anyhow!("while reading the fields of class {name:?}"))?;

	let methods = reader.read_vec(
		|r| r.read_u16_as_usize(),
		|r| read_method(r, &pool)
	).with_context(|| anyhow!("while reading the methods of class {name:?}"))?;

	let attributes = read_attributes(reader, &pool, AttributeScope::Class)
		.with_context(|| anyhow!("while reading the attributes of class {name:?}"))?;

	debug!("read class {name:?} of version {version} with {} constant pool slots", pool.count());

	Ok(ClassFile {
		version,
		access,
		name,
		super_class,
		interfaces,
		fields,
		methods,
		attributes,
		pool,
	})
}

fn read_field(reader: &mut impl ClassRead, pool: &ConstantPool) -> Result<Field> {
	let access = reader.read_u16()?;
	let name = pool.get_utf8(reader.read_u16()?)?.to_owned();
	let descriptor = pool.get_utf8(reader.read_u16()?)?.to_owned();

	let attributes = read_attributes(reader, pool, AttributeScope::Field)
		.with_context(|| anyhow!("while reading field {name:?}"))?;

	Ok(Field { access, name, descriptor, attributes })
}

/// Reads a method, turning its `Code` attribute into [`Method::code`].
fn read_method(reader: &mut impl ClassRead, pool: &ConstantPool) -> Result<Method> {
	let access = reader.read_u16()?;
	let name = pool.get_utf8(reader.read_u16()?)?.to_owned();
	let descriptor = pool.get_utf8(reader.read_u16()?)?.to_owned();

	let mut attributes = read_attributes(reader, pool, AttributeScope::Method)
		.with_context(|| anyhow!("while reading method {name:?} {descriptor:?}"))?;

	let mut code = None;
	let mut index = 0;
	while index < attributes.len() {
		if let AttributeValue::Code(raw) = &attributes[index].value {
			if code.is_some() {
				bail_format!("method {name:?} {descriptor:?} has more than one `Code` attribute");
			}
			let decoded = instruction_list::decode(raw, pool)
				.with_context(|| anyhow!("while decoding the code of method {name:?} {descriptor:?}"))?;
			code = Some(decoded);
			attributes.remove(index);
		} else {
			index += 1;
		}
	}

	Ok(Method { access, name, descriptor, code, attributes })
}
