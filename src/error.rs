//! The error taxonomy of this crate.
//!
//! Every fallible function returns an [`anyhow::Result`]. Errors raised by the codec itself carry a [`CodecError`] at the
//! root of their context chain, which tells apart malformed input ([`ErrorKind::Format`]), values that don't fit into
//! their encoded bit width ([`ErrorKind::Capacity`]) and broken contracts ([`ErrorKind::Consistency`]).
//!
//! Use [`kind_of`] to classify an error returned from any function of this crate.

use std::fmt::{Display, Formatter};

/// The class of a [`CodecError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Malformed data: unknown tags, out of range frame types, invalid or wrongly typed pool indices, truncated input.
	Format,
	/// A count, index or length doesn't fit into the bit width the class file format gives it.
	Capacity,
	/// The object model given violates a contract, or an internal table turned out inconsistent.
	Consistency,
}

impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorKind::Format => write!(f, "format"),
			ErrorKind::Capacity => write!(f, "capacity"),
			ErrorKind::Consistency => write!(f, "consistency"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecError {
	kind: ErrorKind,
	message: String,
}

impl CodecError {
	pub fn new(kind: ErrorKind, message: impl Into<String>) -> CodecError {
		CodecError { kind, message: message.into() }
	}

	pub fn kind(&self) -> ErrorKind {
		self.kind
	}

	pub fn message(&self) -> &str {
		&self.message
	}
}

impl Display for CodecError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} error: {}", self.kind, self.message)
	}
}

impl std::error::Error for CodecError {}

/// Finds the [`ErrorKind`] of an error, looking through all the context added to it.
///
/// Returns [`None`] if the error didn't originate from a [`CodecError`].
pub fn kind_of(error: &anyhow::Error) -> Option<ErrorKind> {
	error.chain()
		.find_map(|e| e.downcast_ref::<CodecError>())
		.map(CodecError::kind)
}

macro_rules! format_error {
	($($arg:tt)*) => {
		anyhow::Error::new($crate::error::CodecError::new($crate::error::ErrorKind::Format, format!($($arg)*)))
	}
}

macro_rules! capacity_error {
	($($arg:tt)*) => {
		anyhow::Error::new($crate::error::CodecError::new($crate::error::ErrorKind::Capacity, format!($($arg)*)))
	}
}

macro_rules! consistency_error {
	($($arg:tt)*) => {
		anyhow::Error::new($crate::error::CodecError::new($crate::error::ErrorKind::Consistency, format!($($arg)*)))
	}
}

macro_rules! bail_format {
	($($arg:tt)*) => {
		return Err($crate::error::format_error!($($arg)*))
	}
}

macro_rules! bail_capacity {
	($($arg:tt)*) => {
		return Err($crate::error::capacity_error!($($arg)*))
	}
}

macro_rules! bail_consistency {
	($($arg:tt)*) => {
		return Err($crate::error::consistency_error!($($arg)*))
	}
}

pub(crate) use {format_error, capacity_error, consistency_error, bail_format, bail_capacity, bail_consistency};

#[cfg(test)]
mod testing {
	use anyhow::{anyhow, Context, Result};
	use pretty_assertions::assert_eq;
	use crate::error::{kind_of, ErrorKind};

	fn fails_with_capacity() -> Result<()> {
		bail_capacity!("{} doesn't fit", 70000);
	}

	#[test]
	fn kind_survives_context() {
		let error = fails_with_capacity()
			.context("while writing something")
			.with_context(|| anyhow!("while writing something else"))
			.unwrap_err();

		assert_eq!(kind_of(&error), Some(ErrorKind::Capacity));
		assert_eq!(format!("{}", error.root_cause()), "capacity error: 70000 doesn't fit");
	}

	#[test]
	fn foreign_errors_have_no_kind() {
		let error = anyhow!("something else");
		assert_eq!(kind_of(&error), None);
	}
}
