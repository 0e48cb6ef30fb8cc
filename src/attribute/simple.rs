//! The codecs of attributes with a flat layout.

use std::io::{Cursor, Read};
use anyhow::Result;
use crate::attribute::mismatch;
use crate::class_constants::attribute;
use crate::error::format_error;
use crate::pool::ConstantPool;
use crate::tree::attribute::{AttributeValue, BootstrapMethod, EnclosingMethod, InnerClass, MethodParameter};
use crate::tree::class::ClassName;
use crate::{ClassRead, ClassWrite};

fn read_class(reader: &mut impl ClassRead, pool: &ConstantPool) -> Result<ClassName> {
	Ok(pool.get_class(reader.read_u16()?)?.clone())
}

fn read_classes(reader: &mut impl ClassRead, pool: &ConstantPool) -> Result<Vec<ClassName>> {
	reader.read_vec(
		|r| r.read_u16_as_usize(),
		|r| read_class(r, pool)
	)
}

fn write_classes(writer: &mut impl ClassWrite, classes: &[ClassName], pool: &mut ConstantPool) -> Result<()> {
	writer.write_slice(
		classes,
		|w, size| w.write_usize_as_u16(size),
		|w, class| w.write_u16(pool.put_class(class)?)
	)
}

pub(super) fn parse_constant_value(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<AttributeValue> {
	Ok(AttributeValue::ConstantValue(pool.get_constant_value(reader.read_u16()?)?))
}

pub(super) fn write_constant_value(writer: &mut Vec<u8>, value: &AttributeValue, pool: &mut ConstantPool) -> Result<()> {
	let AttributeValue::ConstantValue(value) = value else {
		return Err(mismatch(attribute::CONSTANT_VALUE, value));
	};
	writer.write_u16(pool.put_constant_value(value)?)
}

pub(super) fn parse_exceptions(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<AttributeValue> {
	Ok(AttributeValue::Exceptions(read_classes(reader, pool)?))
}

pub(super) fn write_exceptions(writer: &mut Vec<u8>, value: &AttributeValue, pool: &mut ConstantPool) -> Result<()> {
	let AttributeValue::Exceptions(exceptions) = value else {
		return Err(mismatch(attribute::EXCEPTIONS, value));
	};
	write_classes(writer, exceptions, pool)
}

pub(super) fn parse_inner_classes(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<AttributeValue> {
	let inner_classes = reader.read_vec(
		|r| r.read_u16_as_usize(),
		|r| Ok(InnerClass {
			inner_class: read_class(r, pool)?,
			outer_class: pool.get_optional(r.read_u16()?, ConstantPool::get_class)?.cloned(),
			inner_name: pool.get_optional(r.read_u16()?, ConstantPool::get_utf8)?.map(ToOwned::to_owned),
			flags: r.read_u16()?,
		})
	)?;
	Ok(AttributeValue::InnerClasses(inner_classes))
}

pub(super) fn write_inner_classes(writer: &mut Vec<u8>, value: &AttributeValue, pool: &mut ConstantPool) -> Result<()> {
	let AttributeValue::InnerClasses(inner_classes) = value else {
		return Err(mismatch(attribute::INNER_CLASSES, value));
	};
	writer.write_slice(
		inner_classes,
		|w, size| w.write_usize_as_u16(size),
		|w, inner_class| {
			w.write_u16(pool.put_class(&inner_class.inner_class)?)?;
			w.write_u16(pool.put_optional(inner_class.outer_class.as_ref(), ConstantPool::put_class)?)?;
			w.write_u16(pool.put_optional(inner_class.inner_name.as_deref(), ConstantPool::put_utf8)?)?;
			w.write_u16(inner_class.flags)
		}
	)
}

pub(super) fn parse_enclosing_method(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<AttributeValue> {
	let class = read_class(reader, pool)?;
	let method = pool.get_optional(reader.read_u16()?, ConstantPool::get_name_and_type)?.cloned();
	Ok(AttributeValue::EnclosingMethod(EnclosingMethod { class, method }))
}

pub(super) fn write_enclosing_method(writer: &mut Vec<u8>, value: &AttributeValue, pool: &mut ConstantPool) -> Result<()> {
	let AttributeValue::EnclosingMethod(enclosing_method) = value else {
		return Err(mismatch(attribute::ENCLOSING_METHOD, value));
	};
	writer.write_u16(pool.put_class(&enclosing_method.class)?)?;
	let method = pool.put_optional(
		enclosing_method.method.as_ref(),
		|pool, method| pool.put_name_and_type(&method.name, &method.descriptor)
	)?;
	writer.write_u16(method)
}

pub(super) fn parse_synthetic(_: &mut Cursor<&[u8]>, _: &ConstantPool) -> Result<AttributeValue> {
	Ok(AttributeValue::Synthetic)
}

pub(super) fn parse_deprecated(_: &mut Cursor<&[u8]>, _: &ConstantPool) -> Result<AttributeValue> {
	Ok(AttributeValue::Deprecated)
}

/// Writes the empty contents of `Synthetic` and `Deprecated`.
pub(super) fn write_marker(_: &mut Vec<u8>, value: &AttributeValue, _: &mut ConstantPool) -> Result<()> {
	match value {
		AttributeValue::Synthetic | AttributeValue::Deprecated => Ok(()),
		value => Err(mismatch("Synthetic or Deprecated", value)),
	}
}

pub(super) fn parse_signature(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<AttributeValue> {
	Ok(AttributeValue::Signature(pool.get_utf8(reader.read_u16()?)?.to_owned()))
}

pub(super) fn write_signature(writer: &mut Vec<u8>, value: &AttributeValue, pool: &mut ConstantPool) -> Result<()> {
	let AttributeValue::Signature(signature) = value else {
		return Err(mismatch(attribute::SIGNATURE, value));
	};
	writer.write_u16(pool.put_utf8(signature)?)
}

pub(super) fn parse_source_file(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<AttributeValue> {
	Ok(AttributeValue::SourceFile(pool.get_utf8(reader.read_u16()?)?.to_owned()))
}

pub(super) fn write_source_file(writer: &mut Vec<u8>, value: &AttributeValue, pool: &mut ConstantPool) -> Result<()> {
	let AttributeValue::SourceFile(source_file) = value else {
		return Err(mismatch(attribute::SOURCE_FILE, value));
	};
	writer.write_u16(pool.put_utf8(source_file)?)
}

pub(super) fn parse_source_debug_extension(reader: &mut Cursor<&[u8]>, _: &ConstantPool) -> Result<AttributeValue> {
	let mut vec = Vec::new();
	reader.read_to_end(&mut vec)
		.map_err(|e| format_error!("failed to read `SourceDebugExtension`: {e}"))?;
	Ok(AttributeValue::SourceDebugExtension(vec))
}

pub(super) fn write_source_debug_extension(writer: &mut Vec<u8>, value: &AttributeValue, _: &mut ConstantPool) -> Result<()> {
	let AttributeValue::SourceDebugExtension(bytes) = value else {
		return Err(mismatch(attribute::SOURCE_DEBUG_EXTENSION, value));
	};
	writer.write_u8_slice(bytes)
}

pub(super) fn parse_bootstrap_methods(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<AttributeValue> {
	let bootstrap_methods = reader.read_vec(
		|r| r.read_u16_as_usize(),
		|r| Ok(BootstrapMethod {
			handle: pool.get_method_handle(r.read_u16()?)?.clone(),
			arguments: r.read_vec(
				|r| r.read_u16_as_usize(),
				|r| pool.get_loadable(r.read_u16()?)
			)?,
		})
	)?;
	Ok(AttributeValue::BootstrapMethods(bootstrap_methods))
}

pub(super) fn write_bootstrap_methods(writer: &mut Vec<u8>, value: &AttributeValue, pool: &mut ConstantPool) -> Result<()> {
	let AttributeValue::BootstrapMethods(bootstrap_methods) = value else {
		return Err(mismatch(attribute::BOOTSTRAP_METHODS, value));
	};
	writer.write_slice(
		bootstrap_methods,
		|w, size| w.write_usize_as_u16(size),
		|w, method| {
			w.write_u16(pool.put_method_handle(&method.handle)?)?;
			w.write_slice(
				&method.arguments,
				|w, size| w.write_usize_as_u16(size),
				|w, argument| w.write_u16(pool.put_loadable(argument)?)
			)
		}
	)
}

pub(super) fn parse_method_parameters(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<AttributeValue> {
	let parameters = reader.read_vec(
		|r| r.read_u8_as_usize(),
		|r| Ok(MethodParameter {
			name: pool.get_optional(r.read_u16()?, ConstantPool::get_utf8)?.map(ToOwned::to_owned),
			flags: r.read_u16()?,
		})
	)?;
	Ok(AttributeValue::MethodParameters(parameters))
}

pub(super) fn write_method_parameters(writer: &mut Vec<u8>, value: &AttributeValue, pool: &mut ConstantPool) -> Result<()> {
	let AttributeValue::MethodParameters(parameters) = value else {
		return Err(mismatch(attribute::METHOD_PARAMETERS, value));
	};
	writer.write_slice(
		parameters,
		|w, size| w.write_usize_as_u8(size),
		|w, parameter| {
			w.write_u16(pool.put_optional(parameter.name.as_deref(), ConstantPool::put_utf8)?)?;
			w.write_u16(parameter.flags)
		}
	)
}

pub(super) fn parse_nest_host(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<AttributeValue> {
	Ok(AttributeValue::NestHost(read_class(reader, pool)?))
}

pub(super) fn write_nest_host(writer: &mut Vec<u8>, value: &AttributeValue, pool: &mut ConstantPool) -> Result<()> {
	let AttributeValue::NestHost(host) = value else {
		return Err(mismatch(attribute::NEST_HOST, value));
	};
	writer.write_u16(pool.put_class(host)?)
}

pub(super) fn parse_nest_members(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<AttributeValue> {
	Ok(AttributeValue::NestMembers(read_classes(reader, pool)?))
}

pub(super) fn write_nest_members(writer: &mut Vec<u8>, value: &AttributeValue, pool: &mut ConstantPool) -> Result<()> {
	let AttributeValue::NestMembers(members) = value else {
		return Err(mismatch(attribute::NEST_MEMBERS, value));
	};
	write_classes(writer, members, pool)
}

pub(super) fn parse_permitted_subclasses(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<AttributeValue> {
	Ok(AttributeValue::PermittedSubclasses(read_classes(reader, pool)?))
}

pub(super) fn write_permitted_subclasses(writer: &mut Vec<u8>, value: &AttributeValue, pool: &mut ConstantPool) -> Result<()> {
	let AttributeValue::PermittedSubclasses(subclasses) = value else {
		return Err(mismatch(attribute::PERMITTED_SUBCLASSES, value));
	};
	write_classes(writer, subclasses, pool)
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use java_string::{JavaStr, JavaString};
	use pretty_assertions::assert_eq;
	use crate::attribute::{parse, write, AttributeScope};
	use crate::error::{kind_of, ErrorKind};
	use crate::pool::entry::{HandleReference, MemberRef, MethodHandle, NameAndType, ReferenceKind};
	use crate::pool::ConstantPool;
	use crate::tree::attribute::{AttributeValue, BootstrapMethod, EnclosingMethod, InnerClass, MethodParameter};
	use crate::tree::class::ClassName;
	use crate::tree::field::ConstantValue;
	use crate::tree::method::code::Loadable;

	fn round_trip(name: &str, value: AttributeValue, scope: AttributeScope) -> Result<()> {
		let name = JavaStr::from_str(name);
		let mut pool = ConstantPool::new();
		let bytes = write(name, &value, &mut pool, scope)?;
		assert_eq!(parse(name, bytes, &pool, scope)?, value);
		Ok(())
	}

	#[test]
	fn constant_values() -> Result<()> {
		for value in [
			ConstantValue::Integer(-5),
			ConstantValue::Float(1.5),
			ConstantValue::Long(1 << 40),
			ConstantValue::Double(-2.25),
			ConstantValue::String(JavaString::from("constant")),
			ConstantValue::Float(f32::NAN),
			ConstantValue::Float(-0.0),
			ConstantValue::Double(f64::from_bits(0x7ff8_0000_0000_0001)),
			ConstantValue::Double(-0.0),
		] {
			round_trip("ConstantValue", AttributeValue::ConstantValue(value), AttributeScope::Field)?;
		}
		Ok(())
	}

	#[test]
	fn float_constant_values_compare_bits() -> Result<()> {
		let name = JavaStr::from_str("ConstantValue");
		let mut pool = ConstantPool::new();
		let positive = write(name, &AttributeValue::ConstantValue(ConstantValue::Double(0.0)), &mut pool, AttributeScope::Field)?;
		let negative = write(name, &AttributeValue::ConstantValue(ConstantValue::Double(-0.0)), &mut pool, AttributeScope::Field)?;
		assert_eq!(positive, vec![0, 1]);
		assert_eq!(negative, vec![0, 3]);

		assert_eq!(ConstantValue::Float(f32::NAN), ConstantValue::Float(f32::NAN));
		assert_ne!(ConstantValue::Float(0.0), ConstantValue::Float(-0.0));
		assert_ne!(ConstantValue::Float(1.0), ConstantValue::Double(1.0));
		Ok(())
	}

	#[test]
	fn constant_value_must_be_a_constant() -> Result<()> {
		let mut pool = ConstantPool::new();
		let index = pool.put_class(&ClassName::try_from("A")?)?;
		let error = parse(JavaStr::from_str("ConstantValue"), index.to_be_bytes().to_vec(), &pool, AttributeScope::Field).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Format));
		Ok(())
	}

	#[test]
	fn class_attributes() -> Result<()> {
		let outer = ClassName::try_from("a/Outer")?;
		let inner = ClassName::try_from("a/Outer$Inner")?;

		round_trip("InnerClasses", AttributeValue::InnerClasses(vec![
			InnerClass { inner_class: inner.clone(), outer_class: Some(outer.clone()), inner_name: Some("Inner".into()), flags: 0x0009 },
			InnerClass { inner_class: ClassName::try_from("a/Outer$1")?, outer_class: None, inner_name: None, flags: 0 },
		]), AttributeScope::Class)?;
		round_trip("EnclosingMethod", AttributeValue::EnclosingMethod(EnclosingMethod {
			class: outer.clone(),
			method: Some(NameAndType { name: "run".into(), descriptor: "()V".into() }),
		}), AttributeScope::Class)?;
		round_trip("EnclosingMethod", AttributeValue::EnclosingMethod(EnclosingMethod { class: outer.clone(), method: None }), AttributeScope::Class)?;
		round_trip("SourceFile", AttributeValue::SourceFile("Outer.java".into()), AttributeScope::Class)?;
		round_trip("SourceDebugExtension", AttributeValue::SourceDebugExtension(b"SMAP\n".to_vec()), AttributeScope::Class)?;
		round_trip("NestHost", AttributeValue::NestHost(outer.clone()), AttributeScope::Class)?;
		round_trip("NestMembers", AttributeValue::NestMembers(vec![inner.clone()]), AttributeScope::Class)?;
		round_trip("PermittedSubclasses", AttributeValue::PermittedSubclasses(vec![inner, outer]), AttributeScope::Class)?;
		Ok(())
	}

	#[test]
	fn bootstrap_methods() -> Result<()> {
		let factory = MemberRef::new(
			ClassName::try_from("java/lang/invoke/LambdaMetafactory")?,
			"metafactory",
			"(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;",
		);
		let handle = MethodHandle::new(ReferenceKind::InvokeStatic, HandleReference::Method(factory))?;
		let target = MethodHandle::new(ReferenceKind::InvokeStatic, HandleReference::Method(MemberRef::new(
			ClassName::try_from("a/B")?, "lambda$main$0", "()V",
		)))?;

		round_trip("BootstrapMethods", AttributeValue::BootstrapMethods(vec![
			BootstrapMethod {
				handle,
				arguments: vec![
					Loadable::MethodType("()V".into()),
					Loadable::MethodHandle(target),
					Loadable::MethodType("()V".into()),
				],
			},
		]), AttributeScope::Class)
	}

	#[test]
	fn method_attributes() -> Result<()> {
		round_trip("Exceptions", AttributeValue::Exceptions(vec![ClassName::try_from("java/io/IOException")?]), AttributeScope::Method)?;
		round_trip("MethodParameters", AttributeValue::MethodParameters(vec![
			MethodParameter { name: Some("a".into()), flags: 0x0010 },
			MethodParameter { name: None, flags: 0x1000 },
		]), AttributeScope::Method)?;
		round_trip("Signature", AttributeValue::Signature("<T:Ljava/lang/Object;>()TT;".into()), AttributeScope::Method)?;
		round_trip("Synthetic", AttributeValue::Synthetic, AttributeScope::Method)?;
		round_trip("Deprecated", AttributeValue::Deprecated, AttributeScope::Method)?;
		Ok(())
	}

	#[test]
	fn too_many_method_parameters() {
		let value = AttributeValue::MethodParameters(vec![MethodParameter { name: None, flags: 0 }; 256]);
		let error = write(JavaStr::from_str("MethodParameters"), &value, &mut ConstantPool::new(), AttributeScope::Method).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Capacity));
	}
}
