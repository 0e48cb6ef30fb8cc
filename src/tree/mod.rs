//! The object model of a class file.

pub mod class;
pub mod field;
pub mod method;
pub mod attribute;
pub mod annotation;
pub mod frame;
pub mod version;

mod names {
	use java_string::JavaStr;

	/// Checks if a class name is valid according to JVMS 4.2.1 (also accepting array class names).
	pub(super) fn is_valid_class_name(x: &JavaStr) -> bool {
		let bytes = x.as_bytes();
		if bytes.starts_with(b"[") {
			// array classes are named by their descriptor, which needs an element type
			bytes.iter().any(|&b| b != b'[')
		} else {
			// a list of identifiers split by /
			// each identifier must be an unqualified name
			bytes.split(|&b| b == b'/').all(is_valid_unqualified_bytes)
		}
	}

	// Unqualified names, JVMS 4.2.2. The forbidden characters are all ascii, and ascii bytes only ever encode ascii characters.
	fn is_valid_unqualified_bytes(x: &[u8]) -> bool {
		!x.is_empty() && x.iter().all(|b| !matches!(b, b'.' | b';' | b'[' | b'/'))
	}

}
