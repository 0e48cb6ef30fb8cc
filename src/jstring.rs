//! Conversion between the contents of `CONSTANT_Utf8_info` entries and [`JavaString`]s.
//!
//! The class file format stores strings in a modified UTF-8: `\0` takes two bytes, and supplementary characters are
//! stored as a surrogate pair of three bytes each.
//!
//! See <https://docs.oracle.com/javase/specs/jvms/se22/html/jvms-4.html#jvms-4.4.7> for the exact format.

use std::borrow::Cow;
use anyhow::Result;
use java_string::{JavaStr, JavaString};
use crate::error::{bail_capacity, format_error};

/// Decodes the bytes of an Utf8 entry.
pub(crate) fn decode(bytes: Vec<u8>) -> Result<JavaString> {
	JavaString::from_modified_utf8(bytes)
		.map_err(|e| format_error!("invalid modified utf8 contents: {e:?}"))
}

/// Encodes a string for an Utf8 entry, checking that its length fits into the `u16` length field.
pub(crate) fn encode(string: &JavaStr) -> Result<Cow<[u8]>> {
	let bytes = string.to_modified_utf8();
	if bytes.len() > u16::MAX as usize {
		bail_capacity!("string of {} bytes in modified utf8 doesn't fit into an utf8 pool entry", bytes.len());
	}
	Ok(bytes)
}
