//! The codecs of attributes, looked up by the name of the attribute.
//!
//! Each known attribute name has an [`AttributeCodec`], a pair of functions turning the bytes of the attribute into an
//! [`AttributeValue`] and back. Attributes without a codec are kept as [`AttributeValue::Unknown`] bytes, and written out
//! unchanged.
//!
//! Attributes are only allowed in certain places, given by their [`AttributeScope`]s. An attribute with a codec found
//! somewhere it isn't allowed is kept as unknown bytes too.

mod annotations;
mod code;
mod simple;
mod stack_map;
mod variables;

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::io::Cursor;
use anyhow::{anyhow, Context, Result};
use java_string::JavaStr;
use log::{debug, warn};
use crate::class_constants::attribute;
use crate::error::{bail_consistency, bail_format, consistency_error};
use crate::pool::ConstantPool;
use crate::tree::attribute::{Attribute, AttributeValue};
use crate::{ClassRead, ClassWrite};

/// The places an attribute can appear at.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AttributeScope {
	Class,
	Field,
	Method,
	/// In the attributes of a `Code` attribute.
	Code,
}

impl Display for AttributeScope {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			AttributeScope::Class => write!(f, "class"),
			AttributeScope::Field => write!(f, "field"),
			AttributeScope::Method => write!(f, "method"),
			AttributeScope::Code => write!(f, "code"),
		}
	}
}

type ParseFn = fn(&mut Cursor<&[u8]>, &ConstantPool) -> Result<AttributeValue>;
type WriteFn = fn(&mut Vec<u8>, &AttributeValue, &mut ConstantPool) -> Result<()>;

/// How to read and write one kind of attribute.
pub struct AttributeCodec {
	pub name: &'static str,
	pub scopes: &'static [AttributeScope],
	parse: ParseFn,
	write: WriteFn,
}

impl AttributeCodec {
	const fn new(name: &'static str, scopes: &'static [AttributeScope], parse: ParseFn, write: WriteFn) -> AttributeCodec {
		AttributeCodec { name, scopes, parse, write }
	}

	pub fn allowed_in(&self, scope: AttributeScope) -> bool {
		self.scopes.contains(&scope)
	}
}

const CLASS: &[AttributeScope] = &[AttributeScope::Class];
const FIELD: &[AttributeScope] = &[AttributeScope::Field];
const METHOD: &[AttributeScope] = &[AttributeScope::Method];
const CODE: &[AttributeScope] = &[AttributeScope::Code];
const MEMBERS: &[AttributeScope] = &[AttributeScope::Class, AttributeScope::Field, AttributeScope::Method];

static CODECS: &[AttributeCodec] = &[
	AttributeCodec::new(attribute::CONSTANT_VALUE, FIELD, simple::parse_constant_value, simple::write_constant_value),
	AttributeCodec::new(attribute::CODE, METHOD, code::parse, code::write),
	AttributeCodec::new(attribute::STACK_MAP_TABLE, CODE, stack_map::parse, stack_map::write),
	AttributeCodec::new(attribute::EXCEPTIONS, METHOD, simple::parse_exceptions, simple::write_exceptions),
	AttributeCodec::new(attribute::INNER_CLASSES, CLASS, simple::parse_inner_classes, simple::write_inner_classes),
	AttributeCodec::new(attribute::ENCLOSING_METHOD, CLASS, simple::parse_enclosing_method, simple::write_enclosing_method),
	AttributeCodec::new(attribute::SYNTHETIC, MEMBERS, simple::parse_synthetic, simple::write_marker),
	AttributeCodec::new(attribute::SIGNATURE, MEMBERS, simple::parse_signature, simple::write_signature),
	AttributeCodec::new(attribute::SOURCE_FILE, CLASS, simple::parse_source_file, simple::write_source_file),
	AttributeCodec::new(attribute::SOURCE_DEBUG_EXTENSION, CLASS, simple::parse_source_debug_extension, simple::write_source_debug_extension),
	AttributeCodec::new(attribute::LINE_NUMBER_TABLE, CODE, variables::parse_line_numbers, variables::write_line_numbers),
	AttributeCodec::new(attribute::LOCAL_VARIABLE_TABLE, CODE, variables::parse_local_variables, variables::write_local_variables),
	AttributeCodec::new(attribute::LOCAL_VARIABLE_TYPE_TABLE, CODE, variables::parse_local_variable_types, variables::write_local_variable_types),
	AttributeCodec::new(attribute::DEPRECATED, MEMBERS, simple::parse_deprecated, simple::write_marker),
	AttributeCodec::new(attribute::RUNTIME_VISIBLE_ANNOTATIONS, MEMBERS, annotations::parse_visible, annotations::write_visible),
	AttributeCodec::new(attribute::RUNTIME_INVISIBLE_ANNOTATIONS, MEMBERS, annotations::parse_invisible, annotations::write_invisible),
	AttributeCodec::new(attribute::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS, METHOD, annotations::parse_visible_parameters, annotations::write_visible_parameters),
	AttributeCodec::new(attribute::RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS, METHOD, annotations::parse_invisible_parameters, annotations::write_invisible_parameters),
	AttributeCodec::new(attribute::ANNOTATION_DEFAULT, METHOD, annotations::parse_default, annotations::write_default),
	AttributeCodec::new(attribute::BOOTSTRAP_METHODS, CLASS, simple::parse_bootstrap_methods, simple::write_bootstrap_methods),
	AttributeCodec::new(attribute::METHOD_PARAMETERS, METHOD, simple::parse_method_parameters, simple::write_method_parameters),
	AttributeCodec::new(attribute::NEST_HOST, CLASS, simple::parse_nest_host, simple::write_nest_host),
	AttributeCodec::new(attribute::NEST_MEMBERS, CLASS, simple::parse_nest_members, simple::write_nest_members),
	AttributeCodec::new(attribute::PERMITTED_SUBCLASSES, CLASS, simple::parse_permitted_subclasses, simple::write_permitted_subclasses),
];

/// Finds the codec for attributes of the given name.
pub fn codec(name: &JavaStr) -> Option<&'static AttributeCodec> {
	CODECS.iter().find(|codec| name == codec.name)
}

/// Parses the contents of an attribute.
///
/// Attributes without a codec, or with a codec not allowed in `scope`, are kept as [`AttributeValue::Unknown`]. A codec
/// must read exactly the given bytes.
pub fn parse(name: &JavaStr, bytes: Vec<u8>, pool: &ConstantPool, scope: AttributeScope) -> Result<AttributeValue> {
	let Some(codec) = codec(name) else {
		debug!("keeping unknown attribute {name:?} of {} bytes on {scope} as is", bytes.len());
		return Ok(AttributeValue::Unknown(bytes));
	};
	if !codec.allowed_in(scope) {
		warn!("attribute {name:?} isn't allowed on a {scope}, keeping its {} bytes as is", bytes.len());
		return Ok(AttributeValue::Unknown(bytes));
	}

	let mut reader = Cursor::new(&bytes[..]);
	let value = (codec.parse)(&mut reader, pool)?;

	let read = reader.marker()?;
	if read != bytes.len() as u64 {
		bail_format!("attribute {name:?} has {} bytes, but only {read} of them were read", bytes.len());
	}

	Ok(value)
}

/// Writes the contents of an attribute, without its name and length.
///
/// [`AttributeValue::Unknown`] bytes are returned unchanged. For any other value, the value must belong to `name`,
/// and `name` must be allowed in `scope`.
pub fn write(name: &JavaStr, value: &AttributeValue, pool: &mut ConstantPool, scope: AttributeScope) -> Result<Vec<u8>> {
	if let AttributeValue::Unknown(bytes) = value {
		return Ok(bytes.clone());
	}
	if !value.has_name(name) {
		bail_consistency!("attribute named {name:?} holds a value of a {:?} attribute", value.name());
	}
	let codec = codec(name)
		.ok_or_else(|| consistency_error!("attribute {name:?} has no codec"))?;
	if !codec.allowed_in(scope) {
		bail_consistency!("attribute {name:?} isn't allowed on a {scope}");
	}

	let mut buffer = Vec::new();
	(codec.write)(&mut buffer, value, pool)?;
	Ok(buffer)
}

/// Reads the `attributes_count` and that many attributes.
pub(crate) fn read_attributes(reader: &mut impl ClassRead, pool: &ConstantPool, scope: AttributeScope) -> Result<Vec<Attribute>> {
	reader.read_vec(
		|r| r.read_u16_as_usize(),
		|r| {
			let name = pool.get_utf8(r.read_u16()?)?.to_owned();
			let length = r.read_u32()? as usize;
			let bytes = r.read_u8_vec(length)
				.with_context(|| anyhow!("while reading the {length} bytes of attribute {name:?}"))?;
			let value = parse(&name, bytes, pool, scope)
				.with_context(|| anyhow!("while parsing attribute {name:?} on {scope}"))?;
			Ok(Attribute { name, value })
		}
	)
}

/// Writes the `attributes_count` and the attributes.
///
/// Having more than one attribute with the same name on one owner is an error, if that name has a codec.
pub(crate) fn write_attributes<'a>(
	writer: &mut impl ClassWrite,
	attributes: impl IntoIterator<Item=&'a Attribute>,
	pool: &mut ConstantPool,
	scope: AttributeScope,
) -> Result<()> {
	let attributes: Vec<&Attribute> = attributes.into_iter().collect();

	let mut seen = HashSet::new();
	for attribute in &attributes {
		if codec(&attribute.name).is_some() && !seen.insert(attribute.name.as_java_str()) {
			bail_consistency!("{:?} attribute is present more than once on the same {scope}", attribute.name);
		}
	}

	writer.write_usize_as_u16(attributes.len())
		.with_context(|| anyhow!("too many attributes on {scope}"))?;
	for attribute in attributes {
		let name = &attribute.name;
		let buffer = write(name, &attribute.value, pool, scope)
			.with_context(|| anyhow!("while writing attribute {name:?} on {scope}"))?;
		writer.write_u16(pool.put_utf8(name)?)?;
		writer.write_usize_as_u32(buffer.len()).with_context(|| anyhow!("attribute {name:?} is too large"))?;
		writer.write_u8_slice(&buffer)?;
	}
	Ok(())
}

/// The error for a codec given a value of another attribute.
fn mismatch(expected: &str, value: &AttributeValue) -> anyhow::Error {
	consistency_error!("expected a value of a {expected:?} attribute, got one of {:?}", value.name())
}

#[cfg(test)]
mod testing {
	use std::io::Cursor;
	use anyhow::Result;
	use java_string::{JavaStr, JavaString};
	use pretty_assertions::assert_eq;
	use crate::attribute::{codec, parse, read_attributes, write, write_attributes, AttributeScope};
	use crate::error::{kind_of, ErrorKind};
	use crate::pool::ConstantPool;
	use crate::tree::attribute::{Attribute, AttributeValue};

	fn name(x: &str) -> &JavaStr {
		JavaStr::from_str(x)
	}

	#[test]
	fn lookup() {
		assert!(codec(name("StackMapTable")).is_some_and(|c| c.allowed_in(AttributeScope::Code)));
		assert!(codec(name("Signature")).is_some_and(|c| !c.allowed_in(AttributeScope::Code)));
		assert!(codec(name("Signature")).is_some_and(|c| c.allowed_in(AttributeScope::Field)));
		assert!(codec(name("SomethingElse")).is_none());
	}

	#[test]
	fn unknown_attributes_pass_through() -> Result<()> {
		let mut pool = ConstantPool::new();
		let bytes = vec![0xca, 0xfe, 0xba, 0xbe];

		let value = parse(name("Custom"), bytes.clone(), &pool, AttributeScope::Method)?;
		assert_eq!(value, AttributeValue::Unknown(bytes.clone()));
		assert_eq!(write(name("Custom"), &value, &mut pool, AttributeScope::Method)?, bytes);
		assert_eq!(pool.count(), 1);
		Ok(())
	}

	#[test]
	fn wrong_scope_is_kept_as_is() -> Result<()> {
		let mut pool = ConstantPool::new();
		let index = pool.put_utf8(name("foo"))?;
		let bytes = index.to_be_bytes().to_vec();

		assert_eq!(parse(name("Signature"), bytes.clone(), &pool, AttributeScope::Code)?, AttributeValue::Unknown(bytes.clone()));
		assert_eq!(parse(name("Signature"), bytes, &pool, AttributeScope::Field)?, AttributeValue::Signature(JavaString::from("foo")));
		Ok(())
	}

	#[test]
	fn trailing_bytes() -> Result<()> {
		let mut pool = ConstantPool::new();
		let index = pool.put_utf8(name("foo"))?;
		let mut bytes = index.to_be_bytes().to_vec();
		bytes.push(0);

		let error = parse(name("Signature"), bytes, &pool, AttributeScope::Class).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Format));

		let error = parse(name("Deprecated"), vec![0], &pool, AttributeScope::Class).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Format));
		Ok(())
	}

	#[test]
	fn value_must_match_name_and_scope() {
		let mut pool = ConstantPool::new();

		let error = write(name("Deprecated"), &AttributeValue::Synthetic, &mut pool, AttributeScope::Class).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Consistency));

		let error = write(name("Custom"), &AttributeValue::Synthetic, &mut pool, AttributeScope::Class).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Consistency));

		let error = write(name("Synthetic"), &AttributeValue::Synthetic, &mut pool, AttributeScope::Code).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Consistency));
	}

	#[test]
	fn duplicates() -> Result<()> {
		let mut pool = ConstantPool::new();

		let attributes = [
			Attribute::new("Signature", AttributeValue::Signature(JavaString::from("a"))),
			Attribute::new("Signature", AttributeValue::Signature(JavaString::from("b"))),
		];
		let mut buffer = Vec::new();
		let error = write_attributes(&mut buffer, &attributes, &mut pool, AttributeScope::Field).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Consistency));
		assert!(buffer.is_empty());

		// unknown attributes may be present more than once
		let attributes = [
			Attribute::unknown("Custom", vec![1]),
			Attribute::unknown("Custom", vec![2]),
		];
		write_attributes(&mut buffer, &attributes, &mut pool, AttributeScope::Field)?;
		Ok(())
	}

	#[test]
	fn list_round_trip() -> Result<()> {
		let mut pool = ConstantPool::new();
		let attributes = vec![
			Attribute::new("Synthetic", AttributeValue::Synthetic),
			Attribute::unknown("Custom", vec![1, 2, 3]),
			Attribute::new("Signature", AttributeValue::Signature(JavaString::from("TT;"))),
		];

		let mut buffer = Vec::new();
		write_attributes(&mut buffer, &attributes, &mut pool, AttributeScope::Method)?;

		// payloads are registered before the names of their attribute
		assert_eq!(pool.get_utf8(1)?, "Synthetic");
		assert_eq!(pool.get_utf8(2)?, "Custom");
		assert_eq!(pool.get_utf8(3)?, "TT;");
		assert_eq!(pool.get_utf8(4)?, "Signature");

		let read = read_attributes(&mut Cursor::new(&buffer), &pool, AttributeScope::Method)?;
		assert_eq!(read, attributes);
		Ok(())
	}
}
