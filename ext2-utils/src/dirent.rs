//! Directory entries: the variable-length `rec_len` chain packed into a
//! directory's data blocks, and the find/create/delete operations that walk it.
//!
//! All three operations share one entry walk (`block_entries`/`dir_entries`)
//! instead of three hand-duplicated loops, following the design note that the
//! record chain is a natural lazy sequence of entries.

use crate::error::{Ext2Error, Result};
use crate::image::Ext2Image;
use crate::layout::{
	align4, read_struct, write_struct, FileType, BLOCK_SIZE, DIRECT_BLOCK_COUNT,
	DIRENT_HEADER_SIZE,
};

/// On-disk directory entry header (the part before the name bytes).
#[derive(Clone, Copy)]
#[repr(C)]
struct RawDirEntryHeader {
	inode: u32,
	rec_len: u16,
	name_len: u8,
	file_type: u8,
}

const _: () = assert!(std::mem::size_of::<RawDirEntryHeader>() == DIRENT_HEADER_SIZE);

/// An owned view of one directory record, located by `(block_num, offset)`.
/// `inode == 0` marks a hole: reclaimable space with no live name.
#[derive(Clone, Debug)]
pub struct DirEntryDescriptor {
	pub block_num: u32,
	pub offset: usize,
	pub inode: u32,
	pub rec_len: u16,
	pub name_len: u8,
	pub file_type: u8,
	pub name: Vec<u8>,
}

impl DirEntryDescriptor {
	pub fn is_hole(&self) -> bool {
		self.inode == 0
	}
}

/// Walks one directory block's record chain from offset 0 to the block's end.
pub struct BlockEntryIter<'a> {
	block: &'a [u8],
	block_num: u32,
	offset: usize,
}

impl<'a> Iterator for BlockEntryIter<'a> {
	type Item = DirEntryDescriptor;

	fn next(&mut self) -> Option<Self::Item> {
		if self.offset >= BLOCK_SIZE {
			return None;
		}
		let header: RawDirEntryHeader = read_struct(self.block, self.offset);
		let name_start = self.offset + DIRENT_HEADER_SIZE;
		let name = self.block[name_start..name_start + header.name_len as usize].to_vec();
		let desc = DirEntryDescriptor {
			block_num: self.block_num,
			offset: self.offset,
			inode: header.inode,
			rec_len: header.rec_len,
			name_len: header.name_len,
			file_type: header.file_type,
			name,
		};
		assert!(
			header.rec_len > 0,
			"zero rec_len at block {} offset {} would loop forever",
			self.block_num,
			self.offset
		);
		self.offset += header.rec_len as usize;
		Some(desc)
	}
}

impl Ext2Image {
	/// Walks a single block's record chain.
	pub fn block_entries(&self, block_num: u32) -> BlockEntryIter<'_> {
		BlockEntryIter {
			block: self.block(block_num),
			block_num,
			offset: 0,
		}
	}

	/// Walks every direct block of a directory inode, in `i_block` order.
	pub fn dir_entries(&self, dir_inode_num: u32) -> impl Iterator<Item = DirEntryDescriptor> + '_ {
		let inode = self.read_inode(dir_inode_num);
		let blocks: Vec<u32> = inode.i_block[..DIRECT_BLOCK_COUNT]
			.iter()
			.copied()
			.filter(|&b| b != 0)
			.collect();
		blocks.into_iter().flat_map(move |b| self.block_entries(b))
	}

	/// Finds a live entry by name within a directory. Holes never match.
	pub fn find_entry(&self, dir_inode_num: u32, name: &[u8]) -> Option<DirEntryDescriptor> {
		self.dir_entries(dir_inode_num)
			.find(|e| !e.is_hole() && e.name == name)
	}

	/// Creates a directory entry for `name` inside `parent_inode_num`.
	///
	/// If `existing_inode` is `Some`, the entry links to that inode (its
	/// `links_count` is incremented), used by hard links. If `None`, a fresh
	/// inode of `file_type` is allocated first.
	pub fn create_entry(
		&mut self,
		parent_inode_num: u32,
		existing_inode: Option<u32>,
		name: &[u8],
		file_type: FileType,
	) -> Result<u32> {
		if self.find_entry(parent_inode_num, name).is_some() {
			return Err(Ext2Error::Exists);
		}
		let needed = align4(DIRENT_HEADER_SIZE + name.len());

		enum Slot {
			Reuse {
				block_num: u32,
				offset: usize,
				rec_len: u16,
			},
			Split {
				block_num: u32,
				shrink_offset: usize,
				shrink_rec_len: u16,
				new_offset: usize,
				new_rec_len: u16,
			},
			NewBlock,
		}

		let parent_inode = self.read_inode(parent_inode_num);
		let used_blocks: Vec<u32> = parent_inode.i_block[..DIRECT_BLOCK_COUNT]
			.iter()
			.copied()
			.filter(|&b| b != 0)
			.collect();

		let mut slot = None;
		'search: for &block_num in &used_blocks {
			for entry in self.block_entries(block_num) {
				if entry.is_hole() {
					if needed <= entry.rec_len as usize {
						slot = Some(Slot::Reuse {
							block_num,
							offset: entry.offset,
							rec_len: entry.rec_len,
						});
						break 'search;
					}
					continue;
				}
				let used = align4(DIRENT_HEADER_SIZE + entry.name_len as usize);
				if (entry.rec_len as usize) >= used && needed <= entry.rec_len as usize - used {
					slot = Some(Slot::Split {
						block_num,
						shrink_offset: entry.offset,
						shrink_rec_len: used as u16,
						new_offset: entry.offset + used,
						new_rec_len: entry.rec_len - used as u16,
					});
					break 'search;
				}
			}
		}

		let slot = match slot {
			Some(s) => s,
			None if used_blocks.len() < DIRECT_BLOCK_COUNT => Slot::NewBlock,
			None => return Err(Ext2Error::OutOfSpace),
		};

		let inode_num = match existing_inode {
			Some(n) => n,
			None => self.alloc_inode(file_type)?,
		};

		let (block_num, offset, rec_len) = match slot {
			Slot::Reuse {
				block_num,
				offset,
				rec_len,
			} => (block_num, offset, rec_len),
			Slot::Split {
				block_num,
				shrink_offset,
				shrink_rec_len,
				new_offset,
				new_rec_len,
			} => {
				let mut header: RawDirEntryHeader = read_struct(self.block(block_num), shrink_offset);
				header.rec_len = shrink_rec_len;
				write_struct(self.block_mut(block_num), shrink_offset, &header);
				(block_num, new_offset, new_rec_len)
			}
			Slot::NewBlock => {
				let new_block = self.allocate_block()?;
				let mut parent = self.read_inode(parent_inode_num);
				let slot_idx = parent.i_block[..DIRECT_BLOCK_COUNT]
					.iter()
					.position(|&b| b == 0)
					.expect("a free direct slot was confirmed to exist above");
				parent.i_block[slot_idx] = new_block;
				parent.size_low += BLOCK_SIZE as u32;
				Ext2Image::account_block(&mut parent, BLOCK_SIZE as u32);
				self.write_inode(parent_inode_num, &parent);
				(new_block, 0, BLOCK_SIZE as u16)
			}
		};

		let header = RawDirEntryHeader {
			inode: inode_num,
			rec_len,
			name_len: name.len() as u8,
			file_type: file_type.dirent_type(),
		};
		let block = self.block_mut(block_num);
		write_struct(block, offset, &header);
		block[offset + DIRENT_HEADER_SIZE..offset + DIRENT_HEADER_SIZE + name.len()]
			.copy_from_slice(name);

		let mut inode = self.read_inode(inode_num);
		inode.links_count += 1;
		self.write_inode(inode_num, &inode);

		tracing::debug!(
			parent_inode_num,
			inode_num,
			name = %String::from_utf8_lossy(name),
			"created directory entry"
		);
		Ok(inode_num)
	}

	/// Deletes the entry named `name` from `parent_inode_num`.
	///
	/// Refuses (`IsDirectory`) when the entry's file type is a directory.
	/// Otherwise unlinks the entry's inode and either turns the record into a
	/// hole (if it was the first in its block) or absorbs its `rec_len` into
	/// the previous record.
	pub fn delete_entry(&mut self, parent_inode_num: u32, name: &[u8]) -> Result<()> {
		let parent_inode = self.read_inode(parent_inode_num);
		let blocks: Vec<u32> = parent_inode.i_block[..DIRECT_BLOCK_COUNT]
			.iter()
			.copied()
			.filter(|&b| b != 0)
			.collect();

		for block_num in blocks {
			let entries: Vec<DirEntryDescriptor> = self.block_entries(block_num).collect();
			let Some(idx) = entries
				.iter()
				.position(|e| !e.is_hole() && e.name == name)
			else {
				continue;
			};

			let entry = &entries[idx];
			if FileType::from_dirent_type(entry.file_type) == Some(FileType::Directory) {
				return Err(Ext2Error::IsDirectory);
			}
			let target_inode = entry.inode;
			let entry_offset = entry.offset;
			let entry_rec_len = entry.rec_len;

			self.unlink_inode(target_inode);

			if idx == 0 {
				let mut header: RawDirEntryHeader = read_struct(self.block(block_num), entry_offset);
				header.inode = 0;
				write_struct(self.block_mut(block_num), entry_offset, &header);
			} else {
				let prev = &entries[idx - 1];
				let mut prev_header: RawDirEntryHeader =
					read_struct(self.block(block_num), prev.offset);
				prev_header.rec_len += entry_rec_len;
				write_struct(self.block_mut(block_num), prev.offset, &prev_header);
			}

			tracing::debug!(parent_inode_num, target_inode, "deleted directory entry");
			return Ok(());
		}
		Err(Ext2Error::NotFound)
	}

	/// Initializes a freshly allocated directory block with `.` (self) and `..`
	/// (parent) entries filling the whole block.
	pub fn init_directory_block(&mut self, block_num: u32, self_inode: u32, parent_inode: u32) {
		let block = self.block_mut(block_num);
		block.fill(0);

		let dot_rec_len = align4(DIRENT_HEADER_SIZE + 1) as u16;
		let dot_header = RawDirEntryHeader {
			inode: self_inode,
			rec_len: dot_rec_len,
			name_len: 1,
			file_type: FileType::Directory.dirent_type(),
		};
		write_struct(block, 0, &dot_header);
		block[DIRENT_HEADER_SIZE] = b'.';

		let dotdot_offset = dot_rec_len as usize;
		let dotdot_rec_len = BLOCK_SIZE as u16 - dot_rec_len;
		let dotdot_header = RawDirEntryHeader {
			inode: parent_inode,
			rec_len: dotdot_rec_len,
			name_len: 2,
			file_type: FileType::Directory.dirent_type(),
		};
		write_struct(block, dotdot_offset, &dotdot_header);
		block[dotdot_offset + DIRENT_HEADER_SIZE] = b'.';
		block[dotdot_offset + DIRENT_HEADER_SIZE + 1] = b'.';
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::testutil::make_test_image;

	#[test]
	fn root_starts_with_dot_and_dotdot() {
		let image = make_test_image();
		let root = image.root_inode_num();
		let entries: Vec<_> = image.dir_entries(root).collect();
		assert_eq!(entries[0].name, b".");
		assert_eq!(entries[0].inode, root);
		assert_eq!(entries[1].name, b"..");
		assert_eq!(entries[1].inode, root);
	}

	#[test]
	fn rec_len_chain_sums_to_block_size() {
		let image = make_test_image();
		let root = image.root_inode_num();
		let mut by_block: std::collections::HashMap<u32, u32> = Default::default();
		for e in image.dir_entries(root) {
			*by_block.entry(e.block_num).or_default() += e.rec_len as u32;
		}
		for (_, total) in by_block {
			assert_eq!(total, BLOCK_SIZE as u32);
		}
	}

	#[test]
	fn create_then_find() {
		let mut image = make_test_image();
		let root = image.root_inode_num();
		let inode_num = image
			.create_entry(root, None, b"hello", FileType::RegularFile)
			.unwrap();
		let found = image.find_entry(root, b"hello").unwrap();
		assert_eq!(found.inode, inode_num);
		assert_eq!(image.read_inode(inode_num).links_count, 1);
	}

	#[test]
	fn create_duplicate_name_fails() {
		let mut image = make_test_image();
		let root = image.root_inode_num();
		image
			.create_entry(root, None, b"hello", FileType::RegularFile)
			.unwrap();
		let err = image
			.create_entry(root, None, b"hello", FileType::RegularFile)
			.unwrap_err();
		assert!(matches!(err, Ext2Error::Exists));
	}

	#[test]
	fn create_reuses_hole_left_by_delete() {
		let mut image = make_test_image();
		let root = image.root_inode_num();
		image
			.create_entry(root, None, b"hello", FileType::RegularFile)
			.unwrap();
		image.delete_entry(root, b"hello").unwrap();
		let freed_inodes = image.superblock().free_inodes_count;

		image
			.create_entry(root, None, b"world", FileType::RegularFile)
			.unwrap();
		assert_eq!(image.superblock().free_inodes_count, freed_inodes - 1);
		assert!(image.find_entry(root, b"world").is_some());
		assert!(image.find_entry(root, b"hello").is_none());
	}

	#[test]
	fn delete_directory_is_refused() {
		let mut image = make_test_image();
		let root = image.root_inode_num();
		let child = image.alloc_inode(FileType::Directory).unwrap();
		image
			.create_entry(root, Some(child), b"sub", FileType::Directory)
			.unwrap();
		let err = image.delete_entry(root, b"sub").unwrap_err();
		assert!(matches!(err, Ext2Error::IsDirectory));
	}

	#[test]
	fn delete_missing_name_is_not_found() {
		let mut image = make_test_image();
		let root = image.root_inode_num();
		let err = image.delete_entry(root, b"nope").unwrap_err();
		assert!(matches!(err, Ext2Error::NotFound));
	}

	#[test]
	fn delete_absorbs_rec_len_into_previous() {
		let mut image = make_test_image();
		let root = image.root_inode_num();
		image
			.create_entry(root, None, b"a", FileType::RegularFile)
			.unwrap();
		image
			.create_entry(root, None, b"b", FileType::RegularFile)
			.unwrap();
		let b_entry = image.find_entry(root, b"b").unwrap();
		image.delete_entry(root, b"b").unwrap();

		let a_entry = image.find_entry(root, b"a").unwrap();
		assert_eq!(a_entry.block_num, b_entry.block_num);
		let entries: Vec<_> = image.block_entries(a_entry.block_num).collect();
		let a = entries.iter().find(|e| e.name == b"a").unwrap();
		assert!(a.rec_len as usize >= align4(DIRENT_HEADER_SIZE + 1) * 2);
	}
}
