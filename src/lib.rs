//! A crate for reading and writing [Java Class Files](https://docs.oracle.com/javase/specs/jvms/se22/html/jvms-4.html).
//!
//! Reading a class file resolves its constant pool, parses every known attribute into a typed value and turns the
//! bytecode of each method into a list of instructions that refer to each other using [`Label`](tree::method::code::Label)s
//! instead of bytecode offsets. Writing does the reverse, adding any constants that are missing to the constant pool.
//!
//! Attributes with names this crate doesn't know are kept as raw bytes, and written out again unchanged.
//!
//! ```no_run
//! # use std::fs::File;
//! # use std::io::BufReader;
//! # fn main() -> anyhow::Result<()> {
//! let mut reader = BufReader::new(File::open("Main.class")?);
//! let class = espresso::read_class(&mut reader)?;
//!
//! let mut bytes = Vec::new();
//! espresso::write_class(&mut bytes, &class)?;
//! # Ok(())
//! # }
//! ```

pub mod tree;
pub mod pool;
pub mod attribute;
pub mod instruction_list;
pub mod error;
mod class_reader;
mod class_writer;
mod jstring;

pub mod class_constants;

use std::io::{Read, Seek, Write};
use anyhow::{anyhow, Context, Result};
use crate::error::{capacity_error, format_error};
use crate::tree::class::ClassFile;

/// Reads a single java class file from the reader.
pub fn read_class(reader: &mut (impl Read + Seek)) -> Result<ClassFile> {
	class_reader::read(reader)
}

/// Writes a single java class file to the writer.
///
/// Writing starts from [`ClassFile::pool`] and only appends to it, so a class file read before keeps its constant pool
/// layout. Writing the same [`ClassFile`] twice always produces the same bytes.
pub fn write_class(writer: &mut impl Write, class: &ClassFile) -> Result<()> {
	class_writer::write(writer, class)
}

pub(crate) trait ClassRead {
	fn marker(&mut self) -> Result<u64>;

	fn read_n<const N: usize>(&mut self) -> Result<[u8; N]>;
	fn read_u8(&mut self) -> Result<u8> {
		Ok(u8::from_be_bytes(self.read_n().context("couldn't read u8, perhaps the data's end is reached?")?))
	}
	fn read_u16(&mut self) -> Result<u16> {
		Ok(u16::from_be_bytes(self.read_n().context("couldn't read u16, perhaps the data's end is reached?")?))
	}
	fn read_u32(&mut self) -> Result<u32> {
		Ok(u32::from_be_bytes(self.read_n().context("couldn't read u32, perhaps the data's end is reached?")?))
	}
	fn read_u64(&mut self) -> Result<u64> {
		Ok(u64::from_be_bytes(self.read_n().context("couldn't read u64, perhaps the data's end is reached?")?))
	}
	fn read_i8(&mut self) -> Result<i8> {
		Ok(i8::from_be_bytes(self.read_n().context("couldn't read i8, perhaps the data's end is reached?")?))
	}
	fn read_i16(&mut self) -> Result<i16> {
		Ok(i16::from_be_bytes(self.read_n().context("couldn't read i16, perhaps the data's end is reached?")?))
	}
	fn read_i32(&mut self) -> Result<i32> {
		Ok(i32::from_be_bytes(self.read_n().context("couldn't read i32, perhaps the data's end is reached?")?))
	}
	fn read_i64(&mut self) -> Result<i64> {
		Ok(i64::from_be_bytes(self.read_n().context("couldn't read i64, perhaps the data's end is reached?")?))
	}

	fn read_u8_as_usize(&mut self) -> Result<usize> {
		Ok(self.read_u8()? as usize)
	}
	fn read_u16_as_usize(&mut self) -> Result<usize> {
		Ok(self.read_u16()? as usize)
	}
	fn read_u8_vec(&mut self, size: usize) -> Result<Vec<u8>>;
	fn read_vec<T, S, E>(&mut self, get_size: S, mut get_element: E) -> Result<Vec<T>>
		where
			S: FnOnce(&mut Self) -> Result<usize>,
			E: FnMut(&mut Self) -> Result<T>
	{
		let size = get_size(self)?;
		let mut vec = Vec::with_capacity(size);
		for _ in 0..size {
			vec.push(get_element(self)?);
		}
		Ok(vec)
	}
}

impl<T: Read + Seek> ClassRead for T {
	fn marker(&mut self) -> Result<u64> {
		Ok(self.stream_position()?)
	}

	fn read_n<const N: usize>(&mut self) -> Result<[u8; N]> {
		let mut buf = [0u8; N];
		self.read_exact(&mut buf)
			.map_err(|e| format_error!("unexpected end of data while reading {N} bytes: {e}"))?;
		Ok(buf)
	}
	fn read_u8_vec(&mut self, size: usize) -> Result<Vec<u8>> {
		let mut vec = vec![0; size];
		self.read_exact(&mut vec)
			.map_err(|e| format_error!("unexpected end of data while reading {size} bytes: {e}"))?;
		Ok(vec)
	}
}

pub(crate) trait ClassWrite {
	fn write_u8(&mut self, a: u8) -> Result<()> {
		self.write_u8_slice(&[a]).context("couldn't write u8")
	}
	fn write_u16(&mut self, value: u16) -> Result<()> {
		self.write_u8_slice(&value.to_be_bytes()).context("couldn't write u16")
	}
	fn write_u32(&mut self, value: u32) -> Result<()> {
		self.write_u8_slice(&value.to_be_bytes()).context("couldn't write u32")
	}
	fn write_u64(&mut self, value: u64) -> Result<()> {
		self.write_u8_slice(&value.to_be_bytes()).context("couldn't write u64")
	}
	fn write_i8(&mut self, value: i8) -> Result<()> {
		self.write_u8_slice(&value.to_be_bytes()).context("couldn't write i8")
	}
	fn write_i16(&mut self, value: i16) -> Result<()> {
		self.write_u8_slice(&value.to_be_bytes()).context("couldn't write i16")
	}
	fn write_i32(&mut self, value: i32) -> Result<()> {
		self.write_u8_slice(&value.to_be_bytes()).context("couldn't write i32")
	}
	fn write_i64(&mut self, value: i64) -> Result<()> {
		self.write_u8_slice(&value.to_be_bytes()).context("couldn't write i64")
	}

	fn write_usize_as_u8(&mut self, value: usize) -> Result<()> {
		let value = u8::try_from(value)
			.map_err(|_| capacity_error!("failed to convert {value} to u8 for writing: value too large"))?;
		self.write_u8(value)
	}
	fn write_usize_as_u16(&mut self, value: usize) -> Result<()> {
		let value = u16::try_from(value)
			.map_err(|_| capacity_error!("failed to convert {value} to u16 for writing: value too large"))?;
		self.write_u16(value)
	}
	fn write_usize_as_u32(&mut self, value: usize) -> Result<()> {
		let value = u32::try_from(value)
			.map_err(|_| capacity_error!("failed to convert {value} to u32 for writing: value too large"))?;
		self.write_u32(value)
	}

	fn write_u8_slice(&mut self, buf: &[u8]) -> Result<()>;
	fn write_slice<'t, T>(
		&mut self,
		slice: &'t [T],
		put_size: impl FnOnce(&mut Self, usize) -> Result<()>,
		mut put_element: impl FnMut(&mut Self, &'t T) -> Result<()>
	) -> Result<()> {
		put_size(self, slice.len())?;
		for value in slice {
			put_element(self, value)?;
		}
		Ok(())
	}
}

impl<T: Write> ClassWrite for T {
	fn write_u8_slice(&mut self, buf: &[u8]) -> Result<()> {
		self.write_all(buf).with_context(|| anyhow!("failed to write {} bytes", buf.len()))
	}
}
