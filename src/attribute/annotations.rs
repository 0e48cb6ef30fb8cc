//! The codecs of the annotation attributes and `AnnotationDefault`.

use std::io::Cursor;
use anyhow::{anyhow, Context, Result};
use crate::attribute::mismatch;
use crate::class_constants::attribute;
use crate::error::{bail_capacity, bail_format, format_error};
use crate::pool::ConstantPool;
use crate::tree::annotation::{Annotation, ElementValue, ElementValuePair, Object};
use crate::tree::attribute::{AttributeValue, ParameterAnnotations};
use crate::{ClassRead, ClassWrite};

pub(super) fn parse_visible(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<AttributeValue> {
	Ok(AttributeValue::RuntimeVisibleAnnotations(read_annotations(reader, pool)?))
}

pub(super) fn write_visible(writer: &mut Vec<u8>, value: &AttributeValue, pool: &mut ConstantPool) -> Result<()> {
	let AttributeValue::RuntimeVisibleAnnotations(annotations) = value else {
		return Err(mismatch(attribute::RUNTIME_VISIBLE_ANNOTATIONS, value));
	};
	write_annotations(writer, annotations, pool)
}

pub(super) fn parse_invisible(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<AttributeValue> {
	Ok(AttributeValue::RuntimeInvisibleAnnotations(read_annotations(reader, pool)?))
}

pub(super) fn write_invisible(writer: &mut Vec<u8>, value: &AttributeValue, pool: &mut ConstantPool) -> Result<()> {
	let AttributeValue::RuntimeInvisibleAnnotations(annotations) = value else {
		return Err(mismatch(attribute::RUNTIME_INVISIBLE_ANNOTATIONS, value));
	};
	write_annotations(writer, annotations, pool)
}

pub(super) fn parse_visible_parameters(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<AttributeValue> {
	Ok(AttributeValue::RuntimeVisibleParameterAnnotations(read_parameter_annotations(reader, pool)?))
}

pub(super) fn write_visible_parameters(writer: &mut Vec<u8>, value: &AttributeValue, pool: &mut ConstantPool) -> Result<()> {
	let AttributeValue::RuntimeVisibleParameterAnnotations(parameters) = value else {
		return Err(mismatch(attribute::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS, value));
	};
	write_parameter_annotations(writer, parameters, pool)
}

pub(super) fn parse_invisible_parameters(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<AttributeValue> {
	Ok(AttributeValue::RuntimeInvisibleParameterAnnotations(read_parameter_annotations(reader, pool)?))
}

pub(super) fn write_invisible_parameters(writer: &mut Vec<u8>, value: &AttributeValue, pool: &mut ConstantPool) -> Result<()> {
	let AttributeValue::RuntimeInvisibleParameterAnnotations(parameters) = value else {
		return Err(mismatch(attribute::RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS, value));
	};
	write_parameter_annotations(writer, parameters, pool)
}

pub(super) fn parse_default(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<AttributeValue> {
	Ok(AttributeValue::AnnotationDefault(read_element_value(reader, pool)?))
}

pub(super) fn write_default(writer: &mut Vec<u8>, value: &AttributeValue, pool: &mut ConstantPool) -> Result<()> {
	let AttributeValue::AnnotationDefault(element_value) = value else {
		return Err(mismatch(attribute::ANNOTATION_DEFAULT, value));
	};
	write_element_value(writer, element_value, pool)
}

fn read_parameter_annotations(reader: &mut impl ClassRead, pool: &ConstantPool) -> Result<ParameterAnnotations> {
	let parameters = reader.read_vec(
		|r| r.read_u8_as_usize(),
		|r| read_annotations(r, pool)
	)?;
	ParameterAnnotations::new(parameters)
}

fn write_parameter_annotations(writer: &mut impl ClassWrite, parameters: &ParameterAnnotations, pool: &mut ConstantPool) -> Result<()> {
	let parameters = parameters.parameters();
	if parameters.len() > ParameterAnnotations::MAX_PARAMETERS {
		bail_capacity!("cannot write annotations of {} parameters, at most {} fit", parameters.len(), ParameterAnnotations::MAX_PARAMETERS);
	}
	writer.write_slice(
		parameters,
		|w, size| w.write_usize_as_u8(size),
		|w, annotations| write_annotations(w, annotations, pool)
	)
}

fn read_annotations(reader: &mut impl ClassRead, pool: &ConstantPool) -> Result<Vec<Annotation>> {
	reader.read_vec(
		|r| r.read_u16_as_usize(),
		|r| read_annotation(r, pool)
	)
}

fn write_annotations(writer: &mut impl ClassWrite, annotations: &[Annotation], pool: &mut ConstantPool) -> Result<()> {
	writer.write_slice(
		annotations,
		|w, size| w.write_usize_as_u16(size),
		|w, annotation| write_annotation(w, annotation, pool)
	)
}

fn read_annotation(reader: &mut impl ClassRead, pool: &ConstantPool) -> Result<Annotation> {
	let type_descriptor = pool.get_utf8(reader.read_u16()?)?.to_owned();
	let element_value_pairs = reader.read_vec(
		|r| r.read_u16_as_usize(),
		|r| Ok(ElementValuePair {
			name: pool.get_utf8(r.read_u16()?)?.to_owned(),
			value: read_element_value(r, pool)?,
		})
	).with_context(|| anyhow!("in annotation {type_descriptor:?}"))?;
	Ok(Annotation { type_descriptor, element_value_pairs })
}

fn write_annotation(writer: &mut impl ClassWrite, annotation: &Annotation, pool: &mut ConstantPool) -> Result<()> {
	writer.write_u16(pool.put_utf8(&annotation.type_descriptor)?)?;
	writer.write_slice(
		&annotation.element_value_pairs,
		|w, size| w.write_usize_as_u16(size),
		|w, pair| {
			w.write_u16(pool.put_utf8(&pair.name)?)?;
			write_element_value(w, &pair.value, pool)
		}
	)
}

/// Reads an integer constant, and narrows it to the type the tag asks for.
fn read_narrowed<T: TryFrom<i32>>(reader: &mut impl ClassRead, pool: &ConstantPool, tag: u8) -> Result<T> {
	let integer = pool.get_integer(reader.read_u16()?)?;
	T::try_from(integer)
		.map_err(|_| format_error!("constant {integer} is out of range for element value tag {:?}", tag as char))
}

fn read_element_value(reader: &mut impl ClassRead, pool: &ConstantPool) -> Result<ElementValue> {
	Ok(match reader.read_u8()? {
		b'B' => ElementValue::Object(Object::Byte(read_narrowed(reader, pool, b'B')?)),
		b'C' => ElementValue::Object(Object::Char(read_narrowed(reader, pool, b'C')?)),
		b'D' => ElementValue::Object(Object::Double(pool.get_double(reader.read_u16()?)?)),
		b'F' => ElementValue::Object(Object::Float(pool.get_float(reader.read_u16()?)?)),
		b'I' => ElementValue::Object(Object::Integer(pool.get_integer(reader.read_u16()?)?)),
		b'J' => ElementValue::Object(Object::Long(pool.get_long(reader.read_u16()?)?)),
		b'S' => ElementValue::Object(Object::Short(read_narrowed(reader, pool, b'S')?)),
		b'Z' => match pool.get_integer(reader.read_u16()?)? {
			0 => ElementValue::Object(Object::Boolean(false)),
			1 => ElementValue::Object(Object::Boolean(true)),
			integer => bail_format!("constant {integer} is not a boolean"),
		},
		b's' => ElementValue::Object(Object::String(pool.get_utf8(reader.read_u16()?)?.to_owned())),
		b'e' => ElementValue::Enum {
			type_name: pool.get_utf8(reader.read_u16()?)?.to_owned(),
			const_name: pool.get_utf8(reader.read_u16()?)?.to_owned(),
		},
		b'c' => ElementValue::Class(pool.get_utf8(reader.read_u16()?)?.to_owned()),
		b'@' => ElementValue::AnnotationInterface(read_annotation(reader, pool)?),
		b'[' => ElementValue::ArrayType(reader.read_vec(
			|r| r.read_u16_as_usize(),
			|r| read_element_value(r, pool)
		)?),
		tag => bail_format!("unknown element_value tag {:?}", tag as char),
	})
}

fn write_element_value(writer: &mut impl ClassWrite, value: &ElementValue, pool: &mut ConstantPool) -> Result<()> {
	match value {
		ElementValue::Object(object) => {
			let (tag, index) = match object {
				Object::Byte(byte) => (b'B', pool.put_integer(*byte as i32)?),
				Object::Char(char) => (b'C', pool.put_integer(*char as i32)?),
				Object::Double(double) => (b'D', pool.put_double(*double)?),
				Object::Float(float) => (b'F', pool.put_float(*float)?),
				Object::Integer(integer) => (b'I', pool.put_integer(*integer)?),
				Object::Long(long) => (b'J', pool.put_long(*long)?),
				Object::Short(short) => (b'S', pool.put_integer(*short as i32)?),
				Object::Boolean(boolean) => (b'Z', pool.put_integer(*boolean as i32)?),
				Object::String(string) => (b's', pool.put_utf8(string)?),
			};
			writer.write_u8(tag)?;
			writer.write_u16(index)
		},
		ElementValue::Enum { type_name, const_name } => {
			writer.write_u8(b'e')?;
			writer.write_u16(pool.put_utf8(type_name)?)?;
			writer.write_u16(pool.put_utf8(const_name)?)
		},
		ElementValue::Class(class) => {
			writer.write_u8(b'c')?;
			writer.write_u16(pool.put_utf8(class)?)
		},
		ElementValue::AnnotationInterface(annotation) => {
			writer.write_u8(b'@')?;
			write_annotation(writer, annotation, pool)
		},
		ElementValue::ArrayType(values) => {
			writer.write_u8(b'[')?;
			writer.write_slice(
				values,
				|w, size| w.write_usize_as_u16(size),
				|w, value| write_element_value(w, value, pool)
			)
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
	use crate::tree::annotation::{Annotation, ElementValue, ElementValuePair, Object};
	use crate::tree::attribute::{AttributeValue, ParameterAnnotations};

	fn annotation() -> Annotation {
		let mut annotation = Annotation::new("Lorg/example/Marker;".into());
		annotation.element_value_pairs = vec![
			ElementValuePair { name: "byte".into(), value: ElementValue::Object(Object::Byte(-3)) },
			ElementValuePair { name: "char".into(), value: ElementValue::Object(Object::Char(0x263a)) },
			ElementValuePair { name: "flag".into(), value: ElementValue::Object(Object::Boolean(true)) },
			ElementValuePair { name: "long".into(), value: ElementValue::Object(Object::Long(-1)) },
			ElementValuePair { name: "text".into(), value: ElementValue::Object(Object::String("hello".into())) },
			ElementValuePair { name: "policy".into(), value: ElementValue::Enum {
				type_name: "Ljava/lang/annotation/RetentionPolicy;".into(),
				const_name: "RUNTIME".into(),
			} },
			ElementValuePair { name: "type".into(), value: ElementValue::Class("V".into()) },
			ElementValuePair { name: "values".into(), value: ElementValue::ArrayType(vec![
				ElementValue::Object(Object::Short(7)),
				ElementValue::AnnotationInterface(Annotation::new("Lorg/example/Inner;".into())),
			]) },
		];
		annotation
	}

	#[test]
	fn annotations() -> Result<()> {
		let mut pool = ConstantPool::new();
		for name in ["RuntimeVisibleAnnotations", "RuntimeInvisibleAnnotations"] {
			let value = if name == "RuntimeVisibleAnnotations" {
				AttributeValue::RuntimeVisibleAnnotations(vec![annotation()])
			} else {
				AttributeValue::RuntimeInvisibleAnnotations(vec![annotation(), Annotation::new("La;".into())])
			};
			let name = JavaStr::from_str(name);
			let bytes = write(name, &value, &mut pool, AttributeScope::Field)?;
			assert_eq!(parse(name, bytes, &pool, AttributeScope::Field)?, value);
		}
		Ok(())
	}

	#[test]
	fn parameter_annotations() -> Result<()> {
		let name = JavaStr::from_str("RuntimeVisibleParameterAnnotations");
		let mut pool = ConstantPool::new();
		let value = AttributeValue::RuntimeVisibleParameterAnnotations(ParameterAnnotations::new(vec![
			vec![annotation()],
			Vec::new(),
		])?);

		let bytes = write(name, &value, &mut pool, AttributeScope::Method)?;
		assert_eq!(bytes[0], 2);
		assert_eq!(parse(name, bytes, &pool, AttributeScope::Method)?, value);
		Ok(())
	}

	#[test]
	fn annotation_default() -> Result<()> {
		let name = JavaStr::from_str("AnnotationDefault");
		let mut pool = ConstantPool::new();
		let value = AttributeValue::AnnotationDefault(ElementValue::Object(Object::Integer(42)));

		let bytes = write(name, &value, &mut pool, AttributeScope::Method)?;
		assert_eq!(bytes, vec![b'I', 0, 1]);
		assert_eq!(parse(name, bytes, &pool, AttributeScope::Method)?, value);
		Ok(())
	}

	#[test]
	fn float_constants() -> Result<()> {
		let name = JavaStr::from_str("RuntimeVisibleAnnotations");
		let mut pool = ConstantPool::new();
		let mut annotation = Annotation::new("Lorg/example/Limits;".into());
		annotation.element_value_pairs = vec![
			ElementValuePair { name: "nan".into(), value: ElementValue::Object(Object::Float(f32::NAN)) },
			ElementValuePair { name: "negativeZero".into(), value: ElementValue::Object(Object::Float(-0.0)) },
			ElementValuePair { name: "zero".into(), value: ElementValue::Object(Object::Float(0.0)) },
			ElementValuePair { name: "doubles".into(), value: ElementValue::ArrayType(vec![
				ElementValue::Object(Object::Double(f64::NAN)),
				ElementValue::Object(Object::Double(-0.0)),
			]) },
		];
		let value = AttributeValue::RuntimeVisibleAnnotations(vec![annotation]);

		let bytes = write(name, &value, &mut pool, AttributeScope::Class)?;
		assert_eq!(parse(name, bytes, &pool, AttributeScope::Class)?, value);

		assert_ne!(Object::Double(0.0), Object::Double(-0.0));
		Ok(())
	}

	#[test]
	fn out_of_range_constants() -> Result<()> {
		let name = JavaStr::from_str("AnnotationDefault");
		let mut pool = ConstantPool::new();
		let index = pool.put_integer(300)?.to_be_bytes();

		for tag in [b'B', b'Z'] {
			let error = parse(name, vec![tag, index[0], index[1]], &pool, AttributeScope::Method).unwrap_err();
			assert_eq!(kind_of(&error), Some(ErrorKind::Format));
		}
		let error = parse(name, vec![b'?', index[0], index[1]], &pool, AttributeScope::Method).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Format));
		Ok(())
	}

	#[test]
	fn parameter_count_limit() -> Result<()> {
		let name = JavaStr::from_str("RuntimeInvisibleParameterAnnotations");
		let value = AttributeValue::RuntimeInvisibleParameterAnnotations(ParameterAnnotations::new(vec![Vec::new(); 255])?);
		let bytes = write(name, &value, &mut ConstantPool::new(), AttributeScope::Method)?;
		assert_eq!(bytes.len(), 1 + 255 * 2);
		assert_eq!(bytes[0], 255);

		let error = ParameterAnnotations::new(vec![Vec::new(); 256]).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Capacity));
		Ok(())
	}
}
