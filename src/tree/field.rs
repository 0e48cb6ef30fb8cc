use java_string::JavaString;
use crate::tree::attribute::Attribute;

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
	/// The raw `access_flags` of the field.
	pub access: u16,
	pub name: JavaString,
	pub descriptor: JavaString,

	pub attributes: Vec<Attribute>,
}

impl Field {
	pub fn new(access: u16, name: JavaString, descriptor: JavaString) -> Field {
		Field {
			access,
			name,
			descriptor,
			attributes: Vec::new(),
		}
	}
}

/// The value of a `ConstantValue` attribute.
///
/// `Float` and `Double` compare their bits, so that `NaN` equals itself and `-0.0` doesn't equal `0.0`.
#[derive(Debug, Clone)]
pub enum ConstantValue {
	Integer(i32),
	Float(f32),
	Long(i64),
	Double(f64),
	String(JavaString),
}

impl PartialEq for ConstantValue {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(ConstantValue::Integer(a), ConstantValue::Integer(b)) => a == b,
			(ConstantValue::Float(a), ConstantValue::Float(b)) => a.to_bits() == b.to_bits(),
			(ConstantValue::Long(a), ConstantValue::Long(b)) => a == b,
			(ConstantValue::Double(a), ConstantValue::Double(b)) => a.to_bits() == b.to_bits(),
			(ConstantValue::String(a), ConstantValue::String(b)) => a == b,
			_ => false,
		}
	}
}

impl Eq for ConstantValue {}
