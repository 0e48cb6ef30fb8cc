use std::fmt::{Display, Formatter};
use anyhow::Result;
use java_string::{JavaStr, JavaString};
use crate::error::bail_format;
use crate::pool::ConstantPool;
use crate::tree::attribute::Attribute;
use crate::tree::field::Field;
use crate::tree::method::Method;
use crate::tree::names::is_valid_class_name;
use crate::tree::version::Version;

#[derive(Debug, Clone)]
pub struct ClassFile {
	pub version: Version,
	/// The raw `access_flags` of the class.
	pub access: u16,
	pub name: ClassName,
	pub super_class: Option<ClassName>,
	pub interfaces: Vec<ClassName>,

	pub fields: Vec<Field>,
	pub methods: Vec<Method>,

	pub attributes: Vec<Attribute>,

	/// The constant pool the class was read with.
	///
	/// Writing starts from this pool and only appends entries to it, so indices into it stay valid. It isn't compared
	/// by [`PartialEq`], since it only decides the layout of the written bytes.
	pub pool: ConstantPool,
}

impl PartialEq for ClassFile {
	fn eq(&self, other: &ClassFile) -> bool {
		self.version == other.version &&
			self.access == other.access &&
			self.name == other.name &&
			self.super_class == other.super_class &&
			self.interfaces == other.interfaces &&
			self.fields == other.fields &&
			self.methods == other.methods &&
			self.attributes == other.attributes
	}
}

impl ClassFile {
	pub fn new(version: Version, access: u16, name: ClassName, super_class: Option<ClassName>) -> ClassFile {
		ClassFile {
			version,
			access,
			name,
			super_class,
			interfaces: Vec::new(),
			fields: Vec::new(),
			methods: Vec::new(),
			attributes: Vec::new(),
			pool: ConstantPool::new(),
		}
	}
}

/// The binary name of a class, like `java/lang/Object`, or the descriptor of an array class, like `[I`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassName(JavaString);

impl ClassName {
	pub const JAVA_LANG_OBJECT: &'static str = "java/lang/Object";

	fn check_valid(inner: &JavaStr) -> Result<()> {
		if is_valid_class_name(inner) {
			Ok(())
		} else {
			bail_format!("invalid class name {inner:?}: must be non-empty and not contain any of `.`, `;`, `[` (except for arrays) and empty segments")
		}
	}

	pub fn is_valid(inner: &JavaStr) -> bool {
		Self::check_valid(inner).is_ok()
	}

	pub fn as_java_str(&self) -> &JavaStr {
		&self.0
	}

	pub fn into_inner(self) -> JavaString {
		self.0
	}
}

impl TryFrom<JavaString> for ClassName {
	type Error = anyhow::Error;

	fn try_from(value: JavaString) -> Result<ClassName> {
		ClassName::check_valid(&value)?;
		Ok(ClassName(value))
	}
}

impl TryFrom<&str> for ClassName {
	type Error = anyhow::Error;

	fn try_from(value: &str) -> Result<ClassName> {
		ClassName::try_from(JavaString::from(value))
	}
}

impl AsRef<JavaStr> for ClassName {
	fn as_ref(&self) -> &JavaStr {
		&self.0
	}
}

/// Displays the class name as it would appear in java source code, with `.` as package separator.
impl Display for ClassName {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let lossy = self.0.as_str_lossy();
		write!(f, "{}", lossy.replace('/', "."))
	}
}
