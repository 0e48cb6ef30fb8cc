use std::fmt::{Debug, Formatter};
use java_string::JavaString;

#[derive(Clone, PartialEq)]
pub struct Annotation {
	/// The field descriptor of the annotation interface, like `Ljava/lang/Deprecated;`.
	pub type_descriptor: JavaString,
	pub element_value_pairs: Vec<ElementValuePair>,
}

impl Annotation {
	pub fn new(type_descriptor: JavaString) -> Annotation {
		Annotation {
			type_descriptor,
			element_value_pairs: Vec::new(),
		}
	}
}

impl Debug for Annotation {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "@{:?}", self.type_descriptor)?;
		f.debug_map()
			.entries(self.element_value_pairs.iter()
				.map(|pair| (&pair.name, &pair.value))
			)
			.finish()
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementValuePair {
	pub name: JavaString,
	pub value: ElementValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
	Object(Object),
	Enum {
		/// The field descriptor of the enum class.
		type_name: JavaString,
		const_name: JavaString,
	},
	/// The return descriptor of a class literal, like `Ljava/lang/String;` or `V`.
	Class(JavaString),
	AnnotationInterface(Annotation),
	ArrayType(Vec<ElementValue>),
}

/// A constant element value. `Double` and `Float` compare their bits.
#[derive(Debug, Clone)]
pub enum Object {
	Byte(i8),
	Char(u16),
	Double(f64),
	Float(f32),
	Integer(i32),
	Long(i64),
	Short(i16),
	Boolean(bool),
	String(JavaString),
}

impl PartialEq for Object {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Object::Byte(a), Object::Byte(b)) => a == b,
			(Object::Char(a), Object::Char(b)) => a == b,
			(Object::Double(a), Object::Double(b)) => a.to_bits() == b.to_bits(),
			(Object::Float(a), Object::Float(b)) => a.to_bits() == b.to_bits(),
			(Object::Integer(a), Object::Integer(b)) => a == b,
			(Object::Long(a), Object::Long(b)) => a == b,
			(Object::Short(a), Object::Short(b)) => a == b,
			(Object::Boolean(a), Object::Boolean(b)) => a == b,
			(Object::String(a), Object::String(b)) => a == b,
			_ => false,
		}
	}
}

impl Eq for Object {}
