//! Recoverable error conditions the library surfaces to its callers.

use std::fmt;
use std::io;

/// Errors a library operation can return. Invariant violations (double-unlink,
/// reclaiming a bit already marked free) are not represented here: they mean the
/// image is already inconsistent and are raised as panics instead, matching this
/// crate's policy that only genuinely recoverable conditions are ordinary values
/// (see the command drivers for where these get mapped to process exit codes).
#[derive(Debug)]
pub enum Ext2Error {
	/// A path did not resolve, or a copy-in source was missing or not a regular
	/// file.
	NotFound,
	/// A directory entry by that name already exists.
	Exists,
	/// Refusing to hard-link to, or remove, a directory.
	IsDirectory,
	/// No free bit in a bitmap, or a directory could not grow to fit a new entry.
	OutOfSpace,
	/// Propagated I/O failure opening or reading the image or a host file.
	Io(io::Error),
}

impl fmt::Display for Ext2Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Ext2Error::NotFound => write!(f, "No such file or directory"),
			Ext2Error::Exists => write!(f, "File exists"),
			Ext2Error::IsDirectory => write!(f, "Is a directory"),
			Ext2Error::OutOfSpace => write!(f, "No space left on device"),
			Ext2Error::Io(e) => write!(f, "{e}"),
		}
	}
}

impl std::error::Error for Ext2Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Ext2Error::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for Ext2Error {
	fn from(e: io::Error) -> Self {
		Ext2Error::Io(e)
	}
}

impl Ext2Error {
	/// The POSIX errno a command driver should exit with for this error.
	pub fn errno(&self) -> i32 {
		match self {
			Ext2Error::NotFound => libc::ENOENT,
			Ext2Error::Exists => libc::EEXIST,
			Ext2Error::IsDirectory => libc::EISDIR,
			Ext2Error::OutOfSpace => libc::ENOSPC,
			Ext2Error::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
		}
	}
}

pub type Result<T> = std::result::Result<T, Ext2Error>;
