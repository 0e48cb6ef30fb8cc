//! Attributes of classes, fields, methods and code, and the values they hold.
//!
//! See [`crate::attribute`] for the codecs reading and writing these.

use anyhow::Result;
use java_string::{JavaStr, JavaString};
use crate::class_constants::attribute;
use crate::error::bail_capacity;
use crate::pool::entry::{MethodHandle, NameAndType};
use crate::tree::annotation::{Annotation, ElementValue};
use crate::tree::class::ClassName;
use crate::tree::field::ConstantValue;
use crate::tree::frame::StackMapFrame;
use crate::tree::method::code::Loadable;

/// An attribute, as a name and the parsed contents.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
	pub name: JavaString,
	pub value: AttributeValue,
}

impl Attribute {
	pub fn new(name: impl Into<JavaString>, value: AttributeValue) -> Attribute {
		Attribute { name: name.into(), value }
	}

	/// Creates an attribute with the name that belongs to the kind of value given.
	///
	/// Returns [`None`] for [`AttributeValue::Unknown`], as such a value could have any name.
	pub fn from_value(value: AttributeValue) -> Option<Attribute> {
		let name = value.name()?;
		Some(Attribute::new(name, value))
	}

	/// Creates an attribute that is kept as raw bytes.
	pub fn unknown(name: impl Into<JavaString>, bytes: Vec<u8>) -> Attribute {
		Attribute::new(name, AttributeValue::Unknown(bytes))
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
	ConstantValue(ConstantValue),
	Code(CodeAttribute),
	StackMapTable(Vec<StackMapFrame>),
	Exceptions(Vec<ClassName>),
	InnerClasses(Vec<InnerClass>),
	EnclosingMethod(EnclosingMethod),
	Synthetic,
	Signature(JavaString),
	SourceFile(JavaString),
	/// The raw contents, which are "extended" modified utf8 without a length prefix.
	SourceDebugExtension(Vec<u8>),
	LineNumberTable(Vec<LineNumber>),
	LocalVariableTable(Vec<LocalVariable>),
	/// The rows have a signature instead of a descriptor.
	LocalVariableTypeTable(Vec<LocalVariable>),
	Deprecated,
	RuntimeVisibleAnnotations(Vec<Annotation>),
	RuntimeInvisibleAnnotations(Vec<Annotation>),
	RuntimeVisibleParameterAnnotations(ParameterAnnotations),
	RuntimeInvisibleParameterAnnotations(ParameterAnnotations),
	AnnotationDefault(ElementValue),
	BootstrapMethods(Vec<BootstrapMethod>),
	MethodParameters(Vec<MethodParameter>),
	NestHost(ClassName),
	NestMembers(Vec<ClassName>),
	PermittedSubclasses(Vec<ClassName>),
	/// An attribute this crate has no codec for, or one that appeared where it isn't allowed.
	Unknown(Vec<u8>),
}

impl AttributeValue {
	/// The name of attributes holding this kind of value, or [`None`] for [`AttributeValue::Unknown`].
	pub fn name(&self) -> Option<&'static str> {
		Some(match self {
			AttributeValue::ConstantValue(_) => attribute::CONSTANT_VALUE,
			AttributeValue::Code(_) => attribute::CODE,
			AttributeValue::StackMapTable(_) => attribute::STACK_MAP_TABLE,
			AttributeValue::Exceptions(_) => attribute::EXCEPTIONS,
			AttributeValue::InnerClasses(_) => attribute::INNER_CLASSES,
			AttributeValue::EnclosingMethod(_) => attribute::ENCLOSING_METHOD,
			AttributeValue::Synthetic => attribute::SYNTHETIC,
			AttributeValue::Signature(_) => attribute::SIGNATURE,
			AttributeValue::SourceFile(_) => attribute::SOURCE_FILE,
			AttributeValue::SourceDebugExtension(_) => attribute::SOURCE_DEBUG_EXTENSION,
			AttributeValue::LineNumberTable(_) => attribute::LINE_NUMBER_TABLE,
			AttributeValue::LocalVariableTable(_) => attribute::LOCAL_VARIABLE_TABLE,
			AttributeValue::LocalVariableTypeTable(_) => attribute::LOCAL_VARIABLE_TYPE_TABLE,
			AttributeValue::Deprecated => attribute::DEPRECATED,
			AttributeValue::RuntimeVisibleAnnotations(_) => attribute::RUNTIME_VISIBLE_ANNOTATIONS,
			AttributeValue::RuntimeInvisibleAnnotations(_) => attribute::RUNTIME_INVISIBLE_ANNOTATIONS,
			AttributeValue::RuntimeVisibleParameterAnnotations(_) => attribute::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS,
			AttributeValue::RuntimeInvisibleParameterAnnotations(_) => attribute::RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS,
			AttributeValue::AnnotationDefault(_) => attribute::ANNOTATION_DEFAULT,
			AttributeValue::BootstrapMethods(_) => attribute::BOOTSTRAP_METHODS,
			AttributeValue::MethodParameters(_) => attribute::METHOD_PARAMETERS,
			AttributeValue::NestHost(_) => attribute::NEST_HOST,
			AttributeValue::NestMembers(_) => attribute::NEST_MEMBERS,
			AttributeValue::PermittedSubclasses(_) => attribute::PERMITTED_SUBCLASSES,
			AttributeValue::Unknown(_) => return None,
		})
	}

	pub(crate) fn has_name(&self, name: &JavaStr) -> bool {
		self.name().is_some_and(|x| name == x)
	}
}

/// The contents of the `Code` attribute, with the bytecode as raw bytes.
///
/// Use [`crate::instruction_list::decode`] to get the instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeAttribute {
	pub max_stack: u16,
	pub max_locals: u16,
	pub code: Vec<u8>,
	pub exception_table: Vec<ExceptionTableEntry>,
	pub attributes: Vec<Attribute>,
}

impl CodeAttribute {
	/// The largest allowed `code_length`.
	pub const MAX_CODE_LENGTH: usize = u16::MAX as usize;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionTableEntry {
	pub start_pc: u16,
	pub end_pc: u16,
	pub handler_pc: u16,
	/// [`None`] catches everything, like for `finally`.
	pub catch_type: Option<ClassName>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InnerClass {
	pub inner_class: ClassName,
	pub outer_class: Option<ClassName>,
	pub inner_name: Option<JavaString>,
	/// The raw `inner_class_access_flags`.
	pub flags: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnclosingMethod {
	pub class: ClassName,
	pub method: Option<NameAndType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapMethod {
	pub handle: MethodHandle,
	pub arguments: Vec<Loadable>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodParameter {
	pub name: Option<JavaString>,
	/// The raw `access_flags` of the parameter.
	pub flags: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineNumber {
	pub start_pc: u16,
	pub line_number: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVariable {
	pub start_pc: u16,
	pub length: u16,
	pub name: JavaString,
	/// The field descriptor, or the field signature for rows of the `LocalVariableTypeTable`.
	pub descriptor: JavaString,
	pub index: u16,
}

/// The annotations of each parameter of a method.
///
/// The count of parameters is stored in a single byte, so there can be at most 255 parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterAnnotations {
	parameters: Vec<Vec<Annotation>>,
}

impl ParameterAnnotations {
	pub const MAX_PARAMETERS: usize = u8::MAX as usize;

	pub fn new(parameters: Vec<Vec<Annotation>>) -> Result<ParameterAnnotations> {
		if parameters.len() > Self::MAX_PARAMETERS {
			bail_capacity!("annotations for {} parameters given, but at most {} can be stored", parameters.len(), Self::MAX_PARAMETERS);
		}
		Ok(ParameterAnnotations { parameters })
	}

	pub fn parameters(&self) -> &[Vec<Annotation>] {
		&self.parameters
	}

	pub fn into_inner(self) -> Vec<Vec<Annotation>> {
		self.parameters
	}
}
