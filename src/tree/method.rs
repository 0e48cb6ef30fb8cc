pub mod code;

use java_string::JavaString;
use crate::tree::attribute::Attribute;
use crate::tree::method::code::Code;

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
	/// The raw `access_flags` of the method.
	pub access: u16,
	pub name: JavaString,
	pub descriptor: JavaString,

	/// The body of the method, written as its `Code` attribute.
	///
	/// Having this set while [`Method::attributes`] also contains a `Code` attribute is an error when writing.
	pub code: Option<Code>,

	pub attributes: Vec<Attribute>,
}

impl Method {
	pub fn new(access: u16, name: JavaString, descriptor: JavaString) -> Method {
		Method {
			access,
			name,
			descriptor,
			code: None,
			attributes: Vec::new(),
		}
	}
}
