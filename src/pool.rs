//! The constant pool of a class file.
//!
//! A [`ConstantPool`] is an append-only table of [`Entry`]s addressed by 1-based `u16` indices. [`Entry::Long`] and
//! [`Entry::Double`] take up two slots, the second of which can never be accessed.
//!
//! When writing, entries are added with [`ConstantPool::find`] (or one of the `put_*` helpers), which returns the index
//! of an equal entry if there's one already.

pub mod entry;

use std::collections::HashMap;
use std::io::{Read, Seek, Write};
use anyhow::{anyhow, Context, Result};
use java_string::JavaStr;
use crate::ClassWrite;
use crate::error::{bail_capacity, bail_consistency, bail_format, format_error};
use crate::pool::entry::{DynamicRef, Entry, MemberRef, MethodHandle, NameAndType, RawEntry, RawPool};
use crate::tree::class::ClassName;
use crate::tree::field::ConstantValue;
use crate::tree::method::code::Loadable;

#[derive(Debug, Clone)]
enum Slot {
	/// The zero index.
	Unused,
	Entry {
		entry: Entry,
		raw: RawEntry,
	},
	/// The upper index of a long or double.
	Wide,
}

#[derive(Debug, Clone)]
pub struct ConstantPool {
	slots: Vec<Slot>,
	/// Maps each distinct entry to the first index holding it.
	map: HashMap<Entry, u16>,
}

impl Default for ConstantPool {
	fn default() -> Self {
		ConstantPool::new()
	}
}

impl ConstantPool {
	/// The largest value of `constant_pool_count`, making `65534` the largest usable index.
	pub const MAX_COUNT: usize = u16::MAX as usize;

	pub fn new() -> ConstantPool {
		ConstantPool {
			slots: vec![Slot::Unused],
			map: HashMap::new(),
		}
	}

	/// The value of `constant_pool_count`, one more than the largest index used.
	pub fn count(&self) -> usize {
		self.slots.len()
	}

	/// Iterates over all entries with their index, in the order of the indices.
	pub fn iter(&self) -> impl Iterator<Item=(u16, &Entry)> {
		self.slots.iter()
			.enumerate()
			.filter_map(|(index, slot)| match slot {
				// indices are never larger than `u16::MAX`
				Slot::Entry { entry, .. } => Some((index as u16, entry)),
				_ => None,
			})
	}

	/// Returns the index of an entry equal to the given one, adding it (and all entries it refers to) if there's none.
	pub fn find(&mut self, entry: &Entry) -> Result<u16> {
		if let Some(&index) = self.map.get(entry) {
			return match self.slots.get(index as usize) {
				Some(Slot::Entry { entry: found, .. }) if found == entry => Ok(index),
				found => bail_consistency!("constant pool map points to index {index} for {entry:?}, but that slot holds {found:?}"),
			};
		}

		let raw = entry.register(self)
			.with_context(|| anyhow!("while adding the entries {entry:?} refers to"))?;

		let index = self.slots.len();
		let width = if entry.is_wide() { 2 } else { 1 };
		if index + width > Self::MAX_COUNT {
			bail_capacity!("constant pool is full: cannot add {} entry at index {index}", entry.kind_name());
		}
		let index = u16::try_from(index)
			.with_context(|| anyhow!("pool count overflowed while adding pool entry {entry:?}"))?;

		self.slots.push(Slot::Entry { entry: entry.clone(), raw });
		if width == 2 {
			self.slots.push(Slot::Wide);
		}
		self.map.insert(entry.clone(), index);

		Ok(index)
	}

	pub fn get(&self, index: u16) -> Result<&Entry> {
		match self.slots.get(index as usize) {
			Some(Slot::Entry { entry, .. }) => Ok(entry),
			Some(Slot::Unused) => bail_format!("constant pool index 0 is never valid"),
			Some(Slot::Wide) => bail_format!("constant pool index {index} is the upper half of a long or double"),
			None => bail_format!("constant pool index {index} is out of bounds, the pool count is {}", self.slots.len()),
		}
	}

	/// Reads the constant pool, starting with the `u16` of `constant_pool_count`.
	///
	/// All entries are read first, and resolved afterwards, so that entries may refer to later ones. Entries appearing
	/// more than once are kept at their index, and [`ConstantPool::find`] returns the first index of such an entry.
	pub fn read(reader: &mut (impl Read + Seek)) -> Result<ConstantPool> {
		let raw_pool = RawPool::read(reader)?;

		let mut slots = Vec::with_capacity(raw_pool.len());
		let mut map = HashMap::new();
		for (index, slot) in raw_pool.slots().enumerate() {
			match slot {
				None if index == 0 => slots.push(Slot::Unused),
				None => slots.push(Slot::Wide),
				Some(raw) => {
					let entry = raw.resolve(&raw_pool)
						.with_context(|| anyhow!("while resolving pool entry at index {index}"))?;
					// the raw pool has at most `u16::MAX` slots
					map.entry(entry.clone()).or_insert(index as u16);
					slots.push(Slot::Entry { entry, raw: raw.clone() });
				},
			}
		}

		Ok(ConstantPool { slots, map })
	}

	/// Writes the constant pool, starting with the `u16` of `constant_pool_count`.
	pub fn write(&self, writer: &mut impl Write) -> Result<()> {
		writer.write_usize_as_u16(self.slots.len())?;
		for slot in &self.slots {
			if let Slot::Entry { raw, .. } = slot {
				raw.write(writer)?;
			}
		}
		Ok(())
	}

	/// Returns [`None`] if `index` is zero, otherwise returns [`Some`] of the result of the function `f`.
	pub fn get_optional<'a, T: 'a>(&'a self, index: u16, f: impl FnOnce(&'a ConstantPool, u16) -> Result<T>) -> Result<Option<T>> {
		if index == 0 {
			Ok(None)
		} else {
			Ok(Some(f(self, index)?))
		}
	}

	pub fn get_utf8(&self, index: u16) -> Result<&JavaStr> {
		let entry = self.get(index)?;
		let Entry::Utf8(string) = entry else {
			return Err(unexpected("Utf8", index, entry));
		};
		Ok(string)
	}

	pub fn get_class(&self, index: u16) -> Result<&ClassName> {
		let entry = self.get(index)?;
		let Entry::Class(class) = entry else {
			return Err(unexpected("Class", index, entry));
		};
		Ok(class)
	}

	pub fn get_string(&self, index: u16) -> Result<&JavaStr> {
		let entry = self.get(index)?;
		let Entry::String(string) = entry else {
			return Err(unexpected("String", index, entry));
		};
		Ok(string)
	}

	pub fn get_integer(&self, index: u16) -> Result<i32> {
		let entry = self.get(index)?;
		let &Entry::Integer(value) = entry else {
			return Err(unexpected("Integer", index, entry));
		};
		Ok(value)
	}

	pub fn get_float(&self, index: u16) -> Result<f32> {
		let entry = self.get(index)?;
		let &Entry::Float { bits } = entry else {
			return Err(unexpected("Float", index, entry));
		};
		Ok(f32::from_bits(bits))
	}

	pub fn get_long(&self, index: u16) -> Result<i64> {
		let entry = self.get(index)?;
		let &Entry::Long(value) = entry else {
			return Err(unexpected("Long", index, entry));
		};
		Ok(value)
	}

	pub fn get_double(&self, index: u16) -> Result<f64> {
		let entry = self.get(index)?;
		let &Entry::Double { bits } = entry else {
			return Err(unexpected("Double", index, entry));
		};
		Ok(f64::from_bits(bits))
	}

	pub fn get_name_and_type(&self, index: u16) -> Result<&NameAndType> {
		let entry = self.get(index)?;
		let Entry::NameAndType(name_and_type) = entry else {
			return Err(unexpected("NameAndType", index, entry));
		};
		Ok(name_and_type)
	}

	pub fn get_field_ref(&self, index: u16) -> Result<&MemberRef> {
		let entry = self.get(index)?;
		let Entry::FieldRef(field) = entry else {
			return Err(unexpected("FieldRef", index, entry));
		};
		Ok(field)
	}

	pub fn get_method_ref(&self, index: u16) -> Result<&MemberRef> {
		let entry = self.get(index)?;
		let Entry::MethodRef(method) = entry else {
			return Err(unexpected("MethodRef", index, entry));
		};
		Ok(method)
	}

	pub fn get_interface_method_ref(&self, index: u16) -> Result<&MemberRef> {
		let entry = self.get(index)?;
		let Entry::InterfaceMethodRef(method) = entry else {
			return Err(unexpected("InterfaceMethodRef", index, entry));
		};
		Ok(method)
	}

	/// `true` indicates it was an [`Entry::InterfaceMethodRef`], `false` that it was an [`Entry::MethodRef`].
	pub fn get_method_ref_or_interface_method_ref(&self, index: u16) -> Result<(&MemberRef, bool)> {
		match self.get(index)? {
			Entry::MethodRef(method) => Ok((method, false)),
			Entry::InterfaceMethodRef(method) => Ok((method, true)),
			entry => Err(unexpected("MethodRef or InterfaceMethodRef", index, entry)),
		}
	}

	pub fn get_method_handle(&self, index: u16) -> Result<&MethodHandle> {
		let entry = self.get(index)?;
		let Entry::MethodHandle(handle) = entry else {
			return Err(unexpected("MethodHandle", index, entry));
		};
		Ok(handle)
	}

	pub fn get_method_type(&self, index: u16) -> Result<&JavaStr> {
		let entry = self.get(index)?;
		let Entry::MethodType(descriptor) = entry else {
			return Err(unexpected("MethodType", index, entry));
		};
		Ok(descriptor)
	}

	pub fn get_dynamic(&self, index: u16) -> Result<&DynamicRef> {
		let entry = self.get(index)?;
		let Entry::Dynamic(dynamic) = entry else {
			return Err(unexpected("Dynamic", index, entry));
		};
		Ok(dynamic)
	}

	pub fn get_invoke_dynamic(&self, index: u16) -> Result<&DynamicRef> {
		let entry = self.get(index)?;
		let Entry::InvokeDynamic(dynamic) = entry else {
			return Err(unexpected("InvokeDynamic", index, entry));
		};
		Ok(dynamic)
	}

	pub fn get_module(&self, index: u16) -> Result<&JavaStr> {
		let entry = self.get(index)?;
		let Entry::Module(name) = entry else {
			return Err(unexpected("Module", index, entry));
		};
		Ok(name)
	}

	pub fn get_package(&self, index: u16) -> Result<&JavaStr> {
		let entry = self.get(index)?;
		let Entry::Package(name) = entry else {
			return Err(unexpected("Package", index, entry));
		};
		Ok(name)
	}

	/// Gets an entry that can be loaded with `ldc` or be an argument to a bootstrap method.
	pub fn get_loadable(&self, index: u16) -> Result<Loadable> {
		Loadable::try_from(self.get(index)?)
			.with_context(|| anyhow!("while getting pool index {index}"))
	}

	pub fn get_constant_value(&self, index: u16) -> Result<ConstantValue> {
		ConstantValue::try_from(self.get(index)?)
			.with_context(|| anyhow!("while getting pool index {index}"))
	}

	pub fn put_utf8(&mut self, value: &JavaStr) -> Result<u16> {
		self.find(&Entry::Utf8(value.to_owned()))
	}

	pub fn put_class(&mut self, value: &ClassName) -> Result<u16> {
		self.find(&Entry::Class(value.clone()))
	}

	pub fn put_string(&mut self, value: &JavaStr) -> Result<u16> {
		self.find(&Entry::String(value.to_owned()))
	}

	pub fn put_integer(&mut self, value: i32) -> Result<u16> {
		self.find(&Entry::Integer(value))
	}

	pub fn put_float(&mut self, value: f32) -> Result<u16> {
		self.find(&Entry::float(value))
	}

	pub fn put_long(&mut self, value: i64) -> Result<u16> {
		self.find(&Entry::Long(value))
	}

	pub fn put_double(&mut self, value: f64) -> Result<u16> {
		self.find(&Entry::double(value))
	}

	pub fn put_name_and_type(&mut self, name: &JavaStr, descriptor: &JavaStr) -> Result<u16> {
		self.find(&Entry::NameAndType(NameAndType {
			name: name.to_owned(),
			descriptor: descriptor.to_owned(),
		}))
	}

	pub fn put_field_ref(&mut self, value: &MemberRef) -> Result<u16> {
		self.find(&Entry::FieldRef(value.clone()))
	}

	pub fn put_method_ref(&mut self, value: &MemberRef) -> Result<u16> {
		self.find(&Entry::MethodRef(value.clone()))
	}

	pub fn put_interface_method_ref(&mut self, value: &MemberRef) -> Result<u16> {
		self.find(&Entry::InterfaceMethodRef(value.clone()))
	}

	/// `true` indicates to add an [`Entry::InterfaceMethodRef`], `false` an [`Entry::MethodRef`].
	pub fn put_method_ref_or_interface_method_ref(&mut self, value: &MemberRef, is_interface: bool) -> Result<u16> {
		if is_interface {
			self.put_interface_method_ref(value)
		} else {
			self.put_method_ref(value)
		}
	}

	pub fn put_method_handle(&mut self, value: &MethodHandle) -> Result<u16> {
		self.find(&Entry::MethodHandle(value.clone()))
	}

	pub fn put_method_type(&mut self, descriptor: &JavaStr) -> Result<u16> {
		self.find(&Entry::MethodType(descriptor.to_owned()))
	}

	pub fn put_dynamic(&mut self, value: &DynamicRef) -> Result<u16> {
		self.find(&Entry::Dynamic(value.clone()))
	}

	pub fn put_invoke_dynamic(&mut self, value: &DynamicRef) -> Result<u16> {
		self.find(&Entry::InvokeDynamic(value.clone()))
	}

	pub fn put_module(&mut self, name: &JavaStr) -> Result<u16> {
		self.find(&Entry::Module(name.to_owned()))
	}

	pub fn put_package(&mut self, name: &JavaStr) -> Result<u16> {
		self.find(&Entry::Package(name.to_owned()))
	}

	pub fn put_loadable(&mut self, value: &Loadable) -> Result<u16> {
		self.find(&Entry::from(value))
	}

	pub fn put_constant_value(&mut self, value: &ConstantValue) -> Result<u16> {
		self.find(&Entry::from(value))
	}

	/// Returns zero if the value is [`None`], otherwise returns the result of the function `f` called on the value of [`Some`].
	pub fn put_optional<T: ?Sized>(&mut self, value: Option<&T>, f: impl FnOnce(&mut ConstantPool, &T) -> Result<u16>) -> Result<u16> {
		if let Some(value) = value {
			f(self, value)
		} else {
			Ok(0)
		}
	}
}

fn unexpected(expected: &str, index: u16, found: &Entry) -> anyhow::Error {
	format_error!("expected `{expected}` pool entry at index {index}, got `{}`", found.kind_name())
}

#[cfg(test)]
mod testing {
	use std::io::Cursor;
	use anyhow::Result;
	use java_string::{JavaStr, JavaString};
	use pretty_assertions::assert_eq;
	use crate::error::{kind_of, ErrorKind};
	use crate::pool::ConstantPool;
	use crate::pool::entry::{DynamicRef, Entry, HandleReference, MemberRef, MethodHandle, NameAndType, ReferenceKind};
	use crate::tree::class::ClassName;

	fn member(class: &str, name: &str, descriptor: &str) -> Result<MemberRef> {
		Ok(MemberRef::new(ClassName::try_from(class)?, name, descriptor))
	}

	fn sample_entries() -> Result<Vec<Entry>> {
		Ok(vec![
			Entry::Utf8(JavaString::from("hello")),
			Entry::Utf8(JavaString::from("")),
			Entry::Integer(0),
			Entry::Integer(-1),
			Entry::float(0.0),
			Entry::float(-0.0),
			Entry::float(f32::NAN),
			Entry::Long(0),
			Entry::Long(i64::MIN),
			Entry::double(0.0),
			Entry::double(-0.0),
			Entry::double(f64::INFINITY),
			Entry::Class(ClassName::try_from("java/lang/Object")?),
			Entry::Class(ClassName::try_from("[I")?),
			Entry::String(JavaString::from("hello")),
			Entry::FieldRef(member("a/B", "c", "I")?),
			Entry::MethodRef(member("a/B", "c", "()V")?),
			Entry::InterfaceMethodRef(member("a/B", "c", "()V")?),
			Entry::NameAndType(NameAndType { name: "c".into(), descriptor: "I".into() }),
			Entry::MethodHandle(MethodHandle::new(ReferenceKind::InvokeStatic, HandleReference::InterfaceMethod(member("a/B", "c", "()V")?))?),
			Entry::MethodHandle(MethodHandle::new(ReferenceKind::GetField, HandleReference::Field(member("a/B", "c", "I")?))?),
			Entry::MethodType(JavaString::from("()V")),
			Entry::Dynamic(DynamicRef { bootstrap_method_attr_index: 0, name: "x".into(), descriptor: "I".into() }),
			Entry::InvokeDynamic(DynamicRef { bootstrap_method_attr_index: 1, name: "run".into(), descriptor: "()Ljava/lang/Runnable;".into() }),
			Entry::Module(JavaString::from("java.base")),
			Entry::Package(JavaString::from("java/lang")),
		])
	}

	#[test]
	fn dedup() -> Result<()> {
		let entries = sample_entries()?;

		let mut pool = ConstantPool::new();
		let indices: Vec<u16> = entries.iter()
			.map(|entry| pool.find(entry))
			.collect::<Result<_>>()?;
		let count = pool.count();

		// finding equal entries again, in any order, gives the same indices and doesn't grow the pool
		for (entry, &index) in entries.iter().zip(&indices).rev() {
			assert_eq!(pool.find(&entry.clone())?, index);
			assert_eq!(pool.get(index)?, entry);
		}
		assert_eq!(pool.count(), count);

		// all distinct, including the floats differing only in sign or being NaN
		let mut sorted = indices.clone();
		sorted.sort();
		sorted.dedup();
		assert_eq!(sorted.len(), entries.len());
		Ok(())
	}

	#[test]
	fn dependencies_come_first() -> Result<()> {
		let mut pool = ConstantPool::new();
		let index = pool.put_field_ref(&member("a/B", "c", "I")?)?;

		// Utf8 "a/B", Class, Utf8 "c", Utf8 "I", NameAndType, FieldRef
		assert_eq!(index, 6);
		assert_eq!(pool.get_class(2)?, &ClassName::try_from("a/B")?);
		assert_eq!(pool.get_name_and_type(5)?, &NameAndType { name: "c".into(), descriptor: "I".into() });
		Ok(())
	}

	#[test]
	fn double_wide() -> Result<()> {
		let mut pool = ConstantPool::new();
		let long = pool.put_long(7)?;
		let next = pool.put_integer(7)?;
		let double = pool.put_double(7.0)?;
		let last = pool.put_utf8(JavaStr::from_str("x"))?;

		assert_eq!((long, next, double, last), (1, 3, 4, 6));
		assert_eq!(pool.count(), 7);

		for index in [long + 1, double + 1] {
			let error = pool.get(index).unwrap_err();
			assert_eq!(kind_of(&error), Some(ErrorKind::Format));
		}
		assert_eq!(pool.get_long(long)?, 7);
		assert_eq!(pool.get_double(double)?, 7.0);
		Ok(())
	}

	#[test]
	fn bad_indices() -> Result<()> {
		let mut pool = ConstantPool::new();
		pool.put_integer(1)?;

		for index in [0, 2, u16::MAX] {
			let error = pool.get(index).unwrap_err();
			assert_eq!(kind_of(&error), Some(ErrorKind::Format));
		}

		let error = pool.get_utf8(1).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Format));
		assert_eq!(pool.get_optional(0, ConstantPool::get_utf8)?, None);
		Ok(())
	}

	#[test]
	fn invalid_class_name_names_the_index() {
		// count 3, Utf8 "a.b", Class #1
		let bytes = [0, 3, 1, 0, 3, b'a', b'.', b'b', 7, 0, 1];
		let error = ConstantPool::read(&mut Cursor::new(&bytes)).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Format));
		assert!(format!("{error:#}").contains("at index 2"), "{error:#}");
	}

	#[test]
	fn capacity() -> Result<()> {
		let mut pool = ConstantPool::new();
		for i in 1..=65534 {
			assert_eq!(pool.put_integer(i)?, i as u16);
		}
		assert_eq!(pool.count(), ConstantPool::MAX_COUNT);

		// already there
		assert_eq!(pool.put_integer(65534)?, 65534);

		let error = pool.put_integer(0).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Capacity));
		assert_eq!(pool.count(), ConstantPool::MAX_COUNT);
		Ok(())
	}

	#[test]
	fn capacity_of_wide_entries() -> Result<()> {
		let mut pool = ConstantPool::new();
		for i in 1..=65533 {
			pool.put_integer(i)?;
		}

		// index 65534 is free, but index 65535 is not
		let error = pool.put_long(0).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Capacity));
		assert_eq!(pool.put_integer(0)?, 65534);
		Ok(())
	}

	#[test]
	fn corrupted_map_is_detected() -> Result<()> {
		let mut pool = ConstantPool::new();
		pool.put_integer(1)?;
		pool.put_integer(2)?;
		pool.map.insert(Entry::Integer(1), 2);

		let error = pool.put_integer(1).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Consistency));
		Ok(())
	}

	#[test]
	fn mismatched_method_handle() -> Result<()> {
		let handle = MethodHandle {
			kind: ReferenceKind::InvokeVirtual,
			reference: HandleReference::Field(member("a/B", "c", "I")?),
		};
		let error = ConstantPool::new().put_method_handle(&handle).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Consistency));
		Ok(())
	}

	#[test]
	fn read_write() -> Result<()> {
		let mut pool = ConstantPool::new();
		for entry in sample_entries()? {
			pool.find(&entry)?;
		}

		let mut bytes = Vec::new();
		pool.write(&mut bytes)?;

		let read = ConstantPool::read(&mut Cursor::new(&bytes))?;
		assert_eq!(read.count(), pool.count());
		assert_eq!(read.iter().collect::<Vec<_>>(), pool.iter().collect::<Vec<_>>());

		let mut again = Vec::new();
		read.write(&mut again)?;
		assert_eq!(again, bytes);
		Ok(())
	}

	#[test]
	fn read_forward_references_and_duplicates() -> Result<()> {
		let bytes = [
			0x00, 0x05,
			7, 0x00, 0x03, // Class #3
			7, 0x00, 0x03, // Class #3 again
			1, 0x00, 0x01, b'A', // Utf8 "A"
			7, 0x00, 0x03, // Class #3 a third time
		];
		let mut pool = ConstantPool::read(&mut Cursor::new(&bytes[..]))?;

		let a = ClassName::try_from("A")?;
		assert_eq!(pool.get_class(1)?, &a);
		assert_eq!(pool.get_class(2)?, &a);
		assert_eq!(pool.get_class(4)?, &a);
		assert_eq!(pool.put_class(&a)?, 1);

		// duplicates are written back as they were
		let mut again = Vec::new();
		pool.write(&mut again)?;
		assert_eq!(again, bytes);
		Ok(())
	}

	#[test]
	fn method_handle_falls_back_to_interface_method_ref() -> Result<()> {
		let bytes = [
			0x00, 0x09,
			15, 6, 0x00, 0x02, // MethodHandle InvokeStatic #2
			11, 0x00, 0x03, 0x00, 0x05, // InterfaceMethodRef #3.#5
			7, 0x00, 0x04, // Class #4
			1, 0x00, 0x01, b'I', // Utf8 "I"
			12, 0x00, 0x06, 0x00, 0x07, // NameAndType #6:#7
			1, 0x00, 0x01, b'm', // Utf8 "m"
			1, 0x00, 0x03, b'(', b')', b'V', // Utf8 "()V"
			1, 0x00, 0x01, b'x', // Utf8 "x"
		];
		let pool = ConstantPool::read(&mut Cursor::new(&bytes[..]))?;

		let handle = pool.get_method_handle(1)?;
		assert_eq!(handle.kind, ReferenceKind::InvokeStatic);
		assert_eq!(handle.reference, HandleReference::InterfaceMethod(member("I", "m", "()V")?));
		Ok(())
	}

	#[test]
	fn method_handle_needs_the_right_entry() {
		let bytes = [
			0x00, 0x04,
			15, 9, 0x00, 0x02, // MethodHandle InvokeInterface #2
			7, 0x00, 0x03, // Class #3
			1, 0x00, 0x01, b'I', // Utf8 "I"
		];
		let error = ConstantPool::read(&mut Cursor::new(&bytes[..])).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Format));

		let bytes = [
			0x00, 0x02,
			15, 10, 0x00, 0x01, // MethodHandle with kind 10
		];
		let error = ConstantPool::read(&mut Cursor::new(&bytes[..])).unwrap_err();
		assert_eq!(kind_of(&error), Some(ErrorKind::Format));
	}

	#[test]
	fn bad_pool_data() {
		for bytes in [
			&[0x00, 0x00][..], // count zero
			&[0x00, 0x02, 2, 0x00][..], // tag 2 doesn't exist
			&[0x00, 0x02, 5, 0, 0, 0, 0, 0, 0, 0, 0][..], // long at the last index
			&[0x00, 0x03, 3, 0, 0][..], // truncated
		] {
			let error = ConstantPool::read(&mut Cursor::new(bytes)).unwrap_err();
			assert_eq!(kind_of(&error), Some(ErrorKind::Format), "{bytes:?}: {error:?}");
		}
	}

	#[test]
	fn hash_and_equality_agree() -> Result<()> {
		// a deterministic mix of entries built independently twice: equal entries must always find the same index
		fn build(i: u32) -> Result<Entry> {
			Ok(match i % 6 {
				0 => Entry::Integer((i / 6 % 50) as i32),
				1 => Entry::float((i / 6 % 40) as f32 * 0.5),
				2 => Entry::Utf8(JavaString::from(format!("s{}", i / 6 % 30))),
				3 => Entry::Long((i / 6 % 20) as i64),
				4 => Entry::Class(ClassName::try_from(format!("c/C{}", i / 6 % 10).as_str())?),
				_ => Entry::MethodRef(member(&format!("c/C{}", i / 6 % 7), "m", &format!("(I)V{}", i / 6 % 3))?),
			})
		}

		let mut pool = ConstantPool::new();
		for i in 0..3000 {
			let index = pool.find(&build(i)?)?;
			assert_eq!(pool.get(index)?, &build(i)?);
			assert_eq!(pool.find(&build(i)?)?, index);
		}
		Ok(())
	}
}
