//! The entries of the constant pool.
//!
//! An [`Entry`] holds the values it refers to, not their indices. Two entries are equal exactly when they'd be the same
//! constant, which is what the deduplication of [`ConstantPool::find`] is built on.
//!
//! The indices of an entry as stored in the class file are held by a [`RawEntry`]. Reading resolves raw entries against
//! the completely read [`RawPool`], writing registers the values an entry refers to with [`Entry::register`].

use std::fmt::{Debug, Formatter};
use anyhow::{anyhow, Context, Result};
use java_string::JavaString;
use crate::class_constants::pool;
use crate::class_constants::pool::method_handle_reference;
use crate::error::{bail_consistency, bail_format};
use crate::pool::ConstantPool;
use crate::tree::class::ClassName;
use crate::tree::field::ConstantValue;
use crate::tree::method::code::Loadable;
use crate::{jstring, ClassRead, ClassWrite};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameAndType {
	pub name: JavaString,
	pub descriptor: JavaString,
}

/// A reference to a field or a method, as stored by the `FieldRef`, `MethodRef` and `InterfaceMethodRef` entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
	pub class: ClassName,
	pub name: JavaString,
	pub descriptor: JavaString,
}

impl MemberRef {
	pub fn new(class: ClassName, name: impl Into<JavaString>, descriptor: impl Into<JavaString>) -> MemberRef {
		MemberRef { class, name: name.into(), descriptor: descriptor.into() }
	}
}

/// The `reference_kind` of a `MethodHandle` entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
	GetField,
	GetStatic,
	PutField,
	PutStatic,
	InvokeVirtual,
	InvokeStatic,
	InvokeSpecial,
	NewInvokeSpecial,
	InvokeInterface,
}

impl ReferenceKind {
	pub fn to_u8(self) -> u8 {
		match self {
			ReferenceKind::GetField => method_handle_reference::GET_FIELD,
			ReferenceKind::GetStatic => method_handle_reference::GET_STATIC,
			ReferenceKind::PutField => method_handle_reference::PUT_FIELD,
			ReferenceKind::PutStatic => method_handle_reference::PUT_STATIC,
			ReferenceKind::InvokeVirtual => method_handle_reference::INVOKE_VIRTUAL,
			ReferenceKind::InvokeStatic => method_handle_reference::INVOKE_STATIC,
			ReferenceKind::InvokeSpecial => method_handle_reference::INVOKE_SPECIAL,
			ReferenceKind::NewInvokeSpecial => method_handle_reference::NEW_INVOKE_SPECIAL,
			ReferenceKind::InvokeInterface => method_handle_reference::INVOKE_INTERFACE,
		}
	}

	/// Checks if a method handle of this kind may refer to the given kind of reference.
	pub fn accepts(self, reference: &HandleReference) -> bool {
		match self {
			ReferenceKind::GetField | ReferenceKind::GetStatic | ReferenceKind::PutField | ReferenceKind::PutStatic =>
				matches!(reference, HandleReference::Field(_)),
			ReferenceKind::InvokeVirtual | ReferenceKind::NewInvokeSpecial =>
				matches!(reference, HandleReference::Method(_)),
			ReferenceKind::InvokeStatic | ReferenceKind::InvokeSpecial =>
				matches!(reference, HandleReference::Method(_) | HandleReference::InterfaceMethod(_)),
			ReferenceKind::InvokeInterface =>
				matches!(reference, HandleReference::InterfaceMethod(_)),
		}
	}
}

impl TryFrom<u8> for ReferenceKind {
	type Error = anyhow::Error;

	fn try_from(value: u8) -> Result<ReferenceKind> {
		Ok(match value {
			method_handle_reference::GET_FIELD => ReferenceKind::GetField,
			method_handle_reference::GET_STATIC => ReferenceKind::GetStatic,
			method_handle_reference::PUT_FIELD => ReferenceKind::PutField,
			method_handle_reference::PUT_STATIC => ReferenceKind::PutStatic,
			method_handle_reference::INVOKE_VIRTUAL => ReferenceKind::InvokeVirtual,
			method_handle_reference::INVOKE_STATIC => ReferenceKind::InvokeStatic,
			method_handle_reference::INVOKE_SPECIAL => ReferenceKind::InvokeSpecial,
			method_handle_reference::NEW_INVOKE_SPECIAL => ReferenceKind::NewInvokeSpecial,
			method_handle_reference::INVOKE_INTERFACE => ReferenceKind::InvokeInterface,
			kind => bail_format!("unknown `reference_kind` {kind} for `MethodHandle` pool entry"),
		})
	}
}

/// The entry a `MethodHandle` refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HandleReference {
	Field(MemberRef),
	Method(MemberRef),
	InterfaceMethod(MemberRef),
}

impl HandleReference {
	pub fn member(&self) -> &MemberRef {
		match self {
			HandleReference::Field(member) => member,
			HandleReference::Method(member) => member,
			HandleReference::InterfaceMethod(member) => member,
		}
	}

	fn to_entry(&self) -> Entry {
		match self {
			HandleReference::Field(member) => Entry::FieldRef(member.clone()),
			HandleReference::Method(member) => Entry::MethodRef(member.clone()),
			HandleReference::InterfaceMethod(member) => Entry::InterfaceMethodRef(member.clone()),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodHandle {
	pub kind: ReferenceKind,
	pub reference: HandleReference,
}

impl MethodHandle {
	/// Creates a method handle, checking that the kind of reference is allowed for the `kind`.
	pub fn new(kind: ReferenceKind, reference: HandleReference) -> Result<MethodHandle> {
		let handle = MethodHandle { kind, reference };
		handle.check()?;
		Ok(handle)
	}

	fn check(&self) -> Result<()> {
		if self.kind.accepts(&self.reference) {
			Ok(())
		} else {
			bail_consistency!("method handle of kind {:?} cannot refer to {:?}", self.kind, self.reference)
		}
	}
}

/// The contents of a `Dynamic` or `InvokeDynamic` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DynamicRef {
	/// The index into the `bootstrap_methods` of the `BootstrapMethods` attribute of the class.
	pub bootstrap_method_attr_index: u16,
	pub name: JavaString,
	pub descriptor: JavaString,
}

/// A constant pool entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Entry {
	Utf8(JavaString),
	Integer(i32),
	/// The raw bits, as given by [`f32::to_bits`].
	Float { bits: u32 },
	Long(i64),
	/// The raw bits, as given by [`f64::to_bits`].
	Double { bits: u64 },
	Class(ClassName),
	String(JavaString),
	FieldRef(MemberRef),
	MethodRef(MemberRef),
	InterfaceMethodRef(MemberRef),
	NameAndType(NameAndType),
	MethodHandle(MethodHandle),
	/// A method descriptor.
	MethodType(JavaString),
	Dynamic(DynamicRef),
	InvokeDynamic(DynamicRef),
	Module(JavaString),
	Package(JavaString),
}

impl Entry {
	pub fn float(value: f32) -> Entry {
		Entry::Float { bits: value.to_bits() }
	}

	pub fn double(value: f64) -> Entry {
		Entry::Double { bits: value.to_bits() }
	}

	/// `true` for entries taking up two slots: [`Entry::Long`] and [`Entry::Double`].
	pub fn is_wide(&self) -> bool {
		matches!(self, Entry::Long(_) | Entry::Double { .. })
	}

	pub fn kind_name(&self) -> &'static str {
		match self {
			Entry::Utf8(_) => "Utf8",
			Entry::Integer(_) => "Integer",
			Entry::Float { .. } => "Float",
			Entry::Long(_) => "Long",
			Entry::Double { .. } => "Double",
			Entry::Class(_) => "Class",
			Entry::String(_) => "String",
			Entry::FieldRef(_) => "FieldRef",
			Entry::MethodRef(_) => "MethodRef",
			Entry::InterfaceMethodRef(_) => "InterfaceMethodRef",
			Entry::NameAndType(_) => "NameAndType",
			Entry::MethodHandle(_) => "MethodHandle",
			Entry::MethodType(_) => "MethodType",
			Entry::Dynamic(_) => "Dynamic",
			Entry::InvokeDynamic(_) => "InvokeDynamic",
			Entry::Module(_) => "Module",
			Entry::Package(_) => "Package",
		}
	}

	/// Adds all entries this entry refers to to the pool, and returns the raw form of this entry.
	pub(crate) fn register(&self, pool: &mut ConstantPool) -> Result<RawEntry> {
		Ok(match self {
			Entry::Utf8(string) => {
				// fail here already if the string can't be written
				jstring::encode(string)?;
				RawEntry::Utf8 { string: string.clone() }
			},
			&Entry::Integer(bytes) => RawEntry::Integer { bytes },
			&Entry::Float { bits } => RawEntry::Float { bytes: bits },
			&Entry::Long(bytes) => RawEntry::Long { bytes },
			&Entry::Double { bits } => RawEntry::Double { bytes: bits },
			Entry::Class(name) => RawEntry::Class { name_index: pool.put_utf8(name.as_java_str())? },
			Entry::String(string) => RawEntry::String { string_index: pool.put_utf8(string)? },
			Entry::FieldRef(member) => {
				let (class_index, name_and_type_index) = register_member(pool, member)?;
				RawEntry::FieldRef { class_index, name_and_type_index }
			},
			Entry::MethodRef(member) => {
				let (class_index, name_and_type_index) = register_member(pool, member)?;
				RawEntry::MethodRef { class_index, name_and_type_index }
			},
			Entry::InterfaceMethodRef(member) => {
				let (class_index, name_and_type_index) = register_member(pool, member)?;
				RawEntry::InterfaceMethodRef { class_index, name_and_type_index }
			},
			Entry::NameAndType(name_and_type) => RawEntry::NameAndType {
				name_index: pool.put_utf8(&name_and_type.name)?,
				descriptor_index: pool.put_utf8(&name_and_type.descriptor)?,
			},
			Entry::MethodHandle(handle) => {
				handle.check()?;
				RawEntry::MethodHandle {
					reference_kind: handle.kind.to_u8(),
					reference_index: pool.find(&handle.reference.to_entry())?,
				}
			},
			Entry::MethodType(descriptor) => RawEntry::MethodType { descriptor_index: pool.put_utf8(descriptor)? },
			Entry::Dynamic(dynamic) => RawEntry::Dynamic {
				bootstrap_method_attr_index: dynamic.bootstrap_method_attr_index,
				name_and_type_index: pool.put_name_and_type(&dynamic.name, &dynamic.descriptor)?,
			},
			Entry::InvokeDynamic(dynamic) => RawEntry::InvokeDynamic {
				bootstrap_method_attr_index: dynamic.bootstrap_method_attr_index,
				name_and_type_index: pool.put_name_and_type(&dynamic.name, &dynamic.descriptor)?,
			},
			Entry::Module(name) => RawEntry::Module { name_index: pool.put_utf8(name)? },
			Entry::Package(name) => RawEntry::Package { name_index: pool.put_utf8(name)? },
		})
	}
}

fn register_member(pool: &mut ConstantPool, member: &MemberRef) -> Result<(u16, u16)> {
	let class_index = pool.put_class(&member.class)?;
	let name_and_type_index = pool.put_name_and_type(&member.name, &member.descriptor)?;
	Ok((class_index, name_and_type_index))
}

impl From<&Loadable> for Entry {
	fn from(value: &Loadable) -> Entry {
		match *value {
			Loadable::Integer(value) => Entry::Integer(value),
			Loadable::Float(value) => Entry::float(value),
			Loadable::Long(value) => Entry::Long(value),
			Loadable::Double(value) => Entry::double(value),
			Loadable::Class(ref value) => Entry::Class(value.clone()),
			Loadable::String(ref value) => Entry::String(value.clone()),
			Loadable::MethodHandle(ref value) => Entry::MethodHandle(value.clone()),
			Loadable::MethodType(ref value) => Entry::MethodType(value.clone()),
			Loadable::Dynamic(ref value) => Entry::Dynamic(value.clone()),
		}
	}
}

impl TryFrom<&Entry> for Loadable {
	type Error = anyhow::Error;

	fn try_from(value: &Entry) -> Result<Loadable> {
		Ok(match *value {
			Entry::Integer(value) => Loadable::Integer(value),
			Entry::Float { bits } => Loadable::Float(f32::from_bits(bits)),
			Entry::Long(value) => Loadable::Long(value),
			Entry::Double { bits } => Loadable::Double(f64::from_bits(bits)),
			Entry::Class(ref value) => Loadable::Class(value.clone()),
			Entry::String(ref value) => Loadable::String(value.clone()),
			Entry::MethodHandle(ref value) => Loadable::MethodHandle(value.clone()),
			Entry::MethodType(ref value) => Loadable::MethodType(value.clone()),
			Entry::Dynamic(ref value) => Loadable::Dynamic(value.clone()),
			ref entry => bail_format!("pool entry is not loadable: {}", entry.kind_name()),
		})
	}
}

impl From<&ConstantValue> for Entry {
	fn from(value: &ConstantValue) -> Entry {
		match *value {
			ConstantValue::Integer(value) => Entry::Integer(value),
			ConstantValue::Float(value) => Entry::float(value),
			ConstantValue::Long(value) => Entry::Long(value),
			ConstantValue::Double(value) => Entry::double(value),
			ConstantValue::String(ref value) => Entry::String(value.clone()),
		}
	}
}

impl TryFrom<&Entry> for ConstantValue {
	type Error = anyhow::Error;

	fn try_from(value: &Entry) -> Result<ConstantValue> {
		Ok(match *value {
			Entry::Integer(value) => ConstantValue::Integer(value),
			Entry::Float { bits } => ConstantValue::Float(f32::from_bits(bits)),
			Entry::Long(value) => ConstantValue::Long(value),
			Entry::Double { bits } => ConstantValue::Double(f64::from_bits(bits)),
			Entry::String(ref value) => ConstantValue::String(value.clone()),
			ref entry => bail_format!("pool entry may not be used in a `ConstantValue` attribute: {}", entry.kind_name()),
		})
	}
}

/// A constant pool entry as stored in the class file, referring to other entries by their index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum RawEntry {
	Class { name_index: u16 },
	FieldRef { class_index: u16, name_and_type_index: u16 },
	MethodRef { class_index: u16, name_and_type_index: u16 },
	InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
	String { string_index: u16 },
	Integer { bytes: i32 },
	Float { bytes: u32 },
	Long { bytes: i64 },
	Double { bytes: u64 },
	NameAndType { name_index: u16, descriptor_index: u16 },
	Utf8 { string: JavaString },
	MethodHandle { reference_kind: u8, reference_index: u16 },
	MethodType { descriptor_index: u16 },
	Dynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
	InvokeDynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
	Module { name_index: u16 },
	Package { name_index: u16 },
}

impl RawEntry {
	pub(crate) fn is_wide(&self) -> bool {
		matches!(self, RawEntry::Long { .. } | RawEntry::Double { .. })
	}

	/// Reads the contents of an entry, after its `tag` was already read.
	pub(crate) fn read(reader: &mut impl ClassRead, tag: u8) -> Result<RawEntry> {
		Ok(match tag {
			pool::UTF8 => {
				let length = reader.read_u16_as_usize()?;
				let vec = reader.read_u8_vec(length)?;
				RawEntry::Utf8 { string: jstring::decode(vec)? }
			},
			pool::INTEGER => RawEntry::Integer { bytes: reader.read_i32()? },
			pool::FLOAT => RawEntry::Float { bytes: reader.read_u32()? },
			pool::LONG => RawEntry::Long { bytes: reader.read_i64()? },
			pool::DOUBLE => RawEntry::Double { bytes: reader.read_u64()? },
			pool::CLASS => RawEntry::Class { name_index: reader.read_u16()? },
			pool::STRING => RawEntry::String { string_index: reader.read_u16()? },
			pool::FIELD_REF => RawEntry::FieldRef {
				class_index: reader.read_u16()?,
				name_and_type_index: reader.read_u16()?,
			},
			pool::METHOD_REF => RawEntry::MethodRef {
				class_index: reader.read_u16()?,
				name_and_type_index: reader.read_u16()?,
			},
			pool::INTERFACE_METHOD_REF => RawEntry::InterfaceMethodRef {
				class_index: reader.read_u16()?,
				name_and_type_index: reader.read_u16()?,
			},
			pool::NAME_AND_TYPE => RawEntry::NameAndType {
				name_index: reader.read_u16()?,
				descriptor_index: reader.read_u16()?,
			},
			pool::METHOD_HANDLE => RawEntry::MethodHandle {
				reference_kind: reader.read_u8()?,
				reference_index: reader.read_u16()?,
			},
			pool::METHOD_TYPE => RawEntry::MethodType { descriptor_index: reader.read_u16()? },
			pool::DYNAMIC => RawEntry::Dynamic {
				bootstrap_method_attr_index: reader.read_u16()?,
				name_and_type_index: reader.read_u16()?,
			},
			pool::INVOKE_DYNAMIC => RawEntry::InvokeDynamic {
				bootstrap_method_attr_index: reader.read_u16()?,
				name_and_type_index: reader.read_u16()?,
			},
			pool::MODULE => RawEntry::Module { name_index: reader.read_u16()? },
			pool::PACKAGE => RawEntry::Package { name_index: reader.read_u16()? },
			tag => bail_format!("unknown constant pool tag {tag}"),
		})
	}

	/// Writes the tag and the contents of this entry.
	pub(crate) fn write(&self, writer: &mut impl ClassWrite) -> Result<()> {
		match *self {
			RawEntry::Utf8 { ref string } => {
				writer.write_u8(pool::UTF8)?;
				let vec = jstring::encode(string)?;
				writer.write_usize_as_u16(vec.len()).context("failed to write length of string")?;
				writer.write_u8_slice(&vec)?;
			},
			RawEntry::Integer { bytes } => {
				writer.write_u8(pool::INTEGER)?;
				writer.write_i32(bytes)?;
			},
			RawEntry::Float { bytes } => {
				writer.write_u8(pool::FLOAT)?;
				writer.write_u32(bytes)?;
			},
			RawEntry::Long { bytes } => {
				writer.write_u8(pool::LONG)?;
				writer.write_i64(bytes)?;
			},
			RawEntry::Double { bytes } => {
				writer.write_u8(pool::DOUBLE)?;
				writer.write_u64(bytes)?;
			},
			RawEntry::Class { name_index } => {
				writer.write_u8(pool::CLASS)?;
				writer.write_u16(name_index)?;
			},
			RawEntry::String { string_index } => {
				writer.write_u8(pool::STRING)?;
				writer.write_u16(string_index)?;
			},
			RawEntry::FieldRef { class_index, name_and_type_index } => {
				writer.write_u8(pool::FIELD_REF)?;
				writer.write_u16(class_index)?;
				writer.write_u16(name_and_type_index)?;
			},
			RawEntry::MethodRef { class_index, name_and_type_index } => {
				writer.write_u8(pool::METHOD_REF)?;
				writer.write_u16(class_index)?;
				writer.write_u16(name_and_type_index)?;
			},
			RawEntry::InterfaceMethodRef { class_index, name_and_type_index } => {
				writer.write_u8(pool::INTERFACE_METHOD_REF)?;
				writer.write_u16(class_index)?;
				writer.write_u16(name_and_type_index)?;
			},
			RawEntry::NameAndType { name_index, descriptor_index } => {
				writer.write_u8(pool::NAME_AND_TYPE)?;
				writer.write_u16(name_index)?;
				writer.write_u16(descriptor_index)?;
			},
			RawEntry::MethodHandle { reference_kind, reference_index } => {
				writer.write_u8(pool::METHOD_HANDLE)?;
				writer.write_u8(reference_kind)?;
				writer.write_u16(reference_index)?;
			},
			RawEntry::MethodType { descriptor_index } => {
				writer.write_u8(pool::METHOD_TYPE)?;
				writer.write_u16(descriptor_index)?;
			},
			RawEntry::Dynamic { bootstrap_method_attr_index, name_and_type_index } => {
				writer.write_u8(pool::DYNAMIC)?;
				writer.write_u16(bootstrap_method_attr_index)?;
				writer.write_u16(name_and_type_index)?;
			},
			RawEntry::InvokeDynamic { bootstrap_method_attr_index, name_and_type_index } => {
				writer.write_u8(pool::INVOKE_DYNAMIC)?;
				writer.write_u16(bootstrap_method_attr_index)?;
				writer.write_u16(name_and_type_index)?;
			},
			RawEntry::Module { name_index } => {
				writer.write_u8(pool::MODULE)?;
				writer.write_u16(name_index)?;
			},
			RawEntry::Package { name_index } => {
				writer.write_u8(pool::PACKAGE)?;
				writer.write_u16(name_index)?;
			},
		}
		Ok(())
	}

	/// Turns the indices of this entry into the values they refer to.
	pub(crate) fn resolve(&self, pool: &RawPool) -> Result<Entry> {
		Ok(match *self {
			RawEntry::Utf8 { ref string } => Entry::Utf8(string.clone()),
			RawEntry::Integer { bytes } => Entry::Integer(bytes),
			RawEntry::Float { bytes } => Entry::Float { bits: bytes },
			RawEntry::Long { bytes } => Entry::Long(bytes),
			RawEntry::Double { bytes } => Entry::Double { bits: bytes },
			RawEntry::Class { .. } => Entry::Class(self.as_class(pool)?),
			RawEntry::String { string_index } => Entry::String(pool.get_utf8(string_index)?),
			RawEntry::FieldRef { .. } => Entry::FieldRef(self.as_field_ref(pool)?),
			RawEntry::MethodRef { .. } => Entry::MethodRef(self.as_method_ref(pool)?),
			RawEntry::InterfaceMethodRef { .. } => Entry::InterfaceMethodRef(self.as_interface_method_ref(pool)?),
			RawEntry::NameAndType { .. } => Entry::NameAndType(self.as_name_and_type(pool)?),
			RawEntry::MethodHandle { reference_kind, reference_index } => {
				let kind = ReferenceKind::try_from(reference_kind)?;
				let reference = resolve_handle_reference(kind, reference_index, pool)?;
				Entry::MethodHandle(MethodHandle { kind, reference })
			},
			RawEntry::MethodType { descriptor_index } => Entry::MethodType(pool.get_utf8(descriptor_index)?),
			RawEntry::Dynamic { bootstrap_method_attr_index, name_and_type_index } => {
				let NameAndType { name, descriptor } = pool.get_name_and_type(name_and_type_index)?;
				Entry::Dynamic(DynamicRef { bootstrap_method_attr_index, name, descriptor })
			},
			RawEntry::InvokeDynamic { bootstrap_method_attr_index, name_and_type_index } => {
				let NameAndType { name, descriptor } = pool.get_name_and_type(name_and_type_index)?;
				Entry::InvokeDynamic(DynamicRef { bootstrap_method_attr_index, name, descriptor })
			},
			RawEntry::Module { name_index } => Entry::Module(pool.get_utf8(name_index)?),
			RawEntry::Package { name_index } => Entry::Package(pool.get_utf8(name_index)?),
		})
	}

	fn as_utf8(&self) -> Result<&JavaString> {
		let RawEntry::Utf8 { string } = self else {
			bail_format!("pool entry not `Utf8`: {self:?}");
		};
		Ok(string)
	}

	fn as_class(&self, pool: &RawPool) -> Result<ClassName> {
		let RawEntry::Class { name_index } = *self else {
			bail_format!("pool entry not `Class`: {self:?}");
		};
		ClassName::try_from(pool.get_utf8(name_index)?)
	}

	fn as_name_and_type(&self, pool: &RawPool) -> Result<NameAndType> {
		let RawEntry::NameAndType { name_index, descriptor_index } = *self else {
			bail_format!("pool entry not `NameAndType`: {self:?}");
		};
		Ok(NameAndType {
			name: pool.get_utf8(name_index)?,
			descriptor: pool.get_utf8(descriptor_index)?,
		})
	}

	fn as_field_ref(&self, pool: &RawPool) -> Result<MemberRef> {
		let RawEntry::FieldRef { class_index, name_and_type_index } = *self else {
			bail_format!("pool entry not `FieldRef`: {self:?}");
		};
		member(pool, class_index, name_and_type_index)
	}

	fn as_method_ref(&self, pool: &RawPool) -> Result<MemberRef> {
		let RawEntry::MethodRef { class_index, name_and_type_index } = *self else {
			bail_format!("pool entry not `MethodRef`: {self:?}");
		};
		member(pool, class_index, name_and_type_index)
	}

	fn as_interface_method_ref(&self, pool: &RawPool) -> Result<MemberRef> {
		let RawEntry::InterfaceMethodRef { class_index, name_and_type_index } = *self else {
			bail_format!("pool entry not `InterfaceMethodRef`: {self:?}");
		};
		member(pool, class_index, name_and_type_index)
	}
}

fn member(pool: &RawPool, class_index: u16, name_and_type_index: u16) -> Result<MemberRef> {
	let class = pool.get(class_index)?.as_class(pool).pool_context(class_index)?;
	let NameAndType { name, descriptor } = pool.get_name_and_type(name_and_type_index)?;
	Ok(MemberRef { class, name, descriptor })
}

/// Finds the entry a `MethodHandle` of the given kind refers to.
///
/// Handles invoking static or special methods may refer to either a `MethodRef` or an `InterfaceMethodRef`: the first
/// is tried first, and the second is the fallback.
pub(crate) fn resolve_handle_reference(kind: ReferenceKind, index: u16, pool: &RawPool) -> Result<HandleReference> {
	let entry = pool.get(index)?;
	let reference = match kind {
		ReferenceKind::GetField | ReferenceKind::GetStatic | ReferenceKind::PutField | ReferenceKind::PutStatic => {
			HandleReference::Field(entry.as_field_ref(pool)?)
		},
		ReferenceKind::InvokeVirtual | ReferenceKind::NewInvokeSpecial => {
			HandleReference::Method(entry.as_method_ref(pool)?)
		},
		ReferenceKind::InvokeStatic | ReferenceKind::InvokeSpecial => {
			if let RawEntry::MethodRef { .. } = entry {
				HandleReference::Method(entry.as_method_ref(pool)?)
			} else {
				HandleReference::InterfaceMethod(entry.as_interface_method_ref(pool)?)
			}
		},
		ReferenceKind::InvokeInterface => {
			HandleReference::InterfaceMethod(entry.as_interface_method_ref(pool)?)
		},
	};
	Ok(reference)
}

/// The constant pool as read from the class file, before any entry is resolved.
pub(crate) struct RawPool {
	/// We store a [`None`] for the zero index, as well as for the upper indices of [`RawEntry::Double`] and [`RawEntry::Long`].
	inner: Vec<Option<RawEntry>>,
}

impl RawPool {
	/// Reads the constant pool from the specified reader. The first thing read is an `u16` specifying the size of the constant pool.
	pub(crate) fn read(reader: &mut impl ClassRead) -> Result<RawPool> {
		let constant_pool_count = reader.read_u16_as_usize()?;
		if constant_pool_count == 0 {
			bail_format!("constant pool count must be at least 1");
		}

		let mut pool = Vec::with_capacity(constant_pool_count);
		pool.push(None);

		while pool.len() < constant_pool_count {
			let index = pool.len();
			let tag = reader.read_u8()?;
			let entry = RawEntry::read(reader, tag)
				.with_context(|| anyhow!("while reading pool entry at index {index}"))?;

			let wide = entry.is_wide();
			pool.push(Some(entry));
			if wide {
				if pool.len() >= constant_pool_count {
					bail_format!("long or double pool entry at index {index} is the last one, so its second slot is missing");
				}
				pool.push(None); // long and double take up two pool slots
			}
		}

		Ok(RawPool { inner: pool })
	}

	pub(crate) fn len(&self) -> usize {
		self.inner.len()
	}

	pub(crate) fn get(&self, index: u16) -> Result<&RawEntry> {
		if let Some(Some(entry)) = self.inner.get(index as usize) {
			Ok(entry)
		} else {
			bail_format!("pool entry at index {index:?} is not there: either index zero, too large or the upper half of long or double");
		}
	}

	/// Iterates over the slots, with [`None`] for the zero index and for the upper halves of long and double entries.
	pub(crate) fn slots(&self) -> impl Iterator<Item=Option<&RawEntry>> {
		self.inner.iter().map(Option::as_ref)
	}

	fn get_utf8(&self, index: u16) -> Result<JavaString> {
		self.get(index)?.as_utf8().pool_context(index).cloned()
	}

	fn get_name_and_type(&self, index: u16) -> Result<NameAndType> {
		self.get(index)?.as_name_and_type(self).pool_context(index)
	}
}

impl Debug for RawPool {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_map()
			.entries(self.inner.iter().enumerate().filter_map(|(i, x)| x.as_ref().map(|x| (i, x))))
			.finish()
	}
}

/// Tiny helper trait for adding pool indices to errors.
trait PoolContext {
	fn pool_context(self, index: u16) -> Self;
}
impl<T> PoolContext for Result<T> {
	fn pool_context(self, index: u16) -> Self {
		self.with_context(|| anyhow!("while getting pool index {index}"))
	}
}
