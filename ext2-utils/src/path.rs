//! Absolute path resolution over directory-entry chains, in the three
//! traversal modes the command drivers need.

use crate::error::{Ext2Error, Result};
use crate::image::Ext2Image;
use crate::layout::FileType;

/// Splits an absolute path into its non-empty components, and reports whether
/// the path carried a (non-root) trailing slash. Fails `NotFound` if the path
/// does not start with `/`.
fn split_path(path: &str) -> Result<(Vec<&str>, bool)> {
	if !path.starts_with('/') {
		return Err(Ext2Error::NotFound);
	}
	let trailing_slash = path.len() > 1 && path.ends_with('/');
	let components = path.split('/').filter(|s| !s.is_empty()).collect();
	Ok((components, trailing_slash))
}

impl Ext2Image {
	/// Resolves an absolute path that is expected to already exist, used when
	/// looking up a hard-link source. Every intermediate component must be a
	/// directory (symlinks are not followed, so an intermediate symlink fails
	/// just like any other non-directory); the final component may be of any
	/// type. A trailing `/` is only valid when the final component is a
	/// directory.
	pub fn resolve_existing(&self, path: &str) -> Result<(u32, FileType)> {
		let (components, trailing_slash) = split_path(path)?;
		let Some((last, init)) = components.split_last() else {
			return Ok((self.root_inode_num(), FileType::Directory));
		};

		let mut current = self.root_inode_num();
		for comp in init {
			let entry = self
				.find_entry(current, comp.as_bytes())
				.ok_or(Ext2Error::NotFound)?;
			if FileType::from_dirent_type(entry.file_type) != Some(FileType::Directory) {
				return Err(Ext2Error::NotFound);
			}
			current = entry.inode;
		}

		let entry = self
			.find_entry(current, last.as_bytes())
			.ok_or(Ext2Error::NotFound)?;
		let entry_type = FileType::from_dirent_type(entry.file_type).ok_or(Ext2Error::NotFound)?;
		if trailing_slash && entry_type != FileType::Directory {
			return Err(Ext2Error::NotFound);
		}
		Ok((entry.inode, entry_type))
	}

	/// Resolves the parent directory and name to use for a new entry (file,
	/// link, or directory). Every component up to the last must already exist
	/// and be a directory; the last component must NOT exist (`Exists` if it
	/// does).
	pub fn resolve_parent_for_create(&self, path: &str) -> Result<(u32, Vec<u8>)> {
		let (components, _trailing_slash) = split_path(path)?;
		let (last, init) = components.split_last().ok_or(Ext2Error::NotFound)?;

		let mut current = self.root_inode_num();
		for comp in init {
			let entry = self
				.find_entry(current, comp.as_bytes())
				.ok_or(Ext2Error::NotFound)?;
			if FileType::from_dirent_type(entry.file_type) != Some(FileType::Directory) {
				return Err(Ext2Error::NotFound);
			}
			current = entry.inode;
		}

		if self.find_entry(current, last.as_bytes()).is_some() {
			return Err(Ext2Error::Exists);
		}
		Ok((current, last.as_bytes().to_vec()))
	}

	/// Resolves the parent directory and name to remove. Refuses a trailing
	/// `/` outright (matching `ext2-rm`'s restriction). The final component is
	/// not required to exist here, `delete_entry` reports `NotFound` itself.
	pub fn resolve_parent_for_delete(&self, path: &str) -> Result<(u32, Vec<u8>)> {
		let (components, trailing_slash) = split_path(path)?;
		if trailing_slash {
			return Err(Ext2Error::IsDirectory);
		}
		let (last, init) = components.split_last().ok_or(Ext2Error::NotFound)?;

		let mut current = self.root_inode_num();
		for comp in init {
			let entry = self
				.find_entry(current, comp.as_bytes())
				.ok_or(Ext2Error::NotFound)?;
			if FileType::from_dirent_type(entry.file_type) != Some(FileType::Directory) {
				return Err(Ext2Error::NotFound);
			}
			current = entry.inode;
		}
		Ok((current, last.as_bytes().to_vec()))
	}
}
