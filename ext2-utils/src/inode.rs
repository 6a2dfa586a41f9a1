//! Inode lifecycle: allocation, reference-counted unlink, and data-block
//! reclamation.

use crate::error::Result;
use crate::image::{now, Ext2Image};
use crate::layout::{FileType, RawInode, DIRECT_BLOCK_COUNT, INDIRECT_BLOCK_INDEX};

impl Ext2Image {
	/// Allocates a fresh inode of the given type, zeroed apart from `mode` and
	/// the creation timestamps. `links_count`, `size` and `blocks` all start at
	/// zero; the caller (directory-entry creation) is responsible for bumping
	/// `links_count` once the new entry points at it.
	pub fn alloc_inode(&mut self, file_type: FileType) -> Result<u32> {
		let inode_num = self.allocate_inode()?;
		let t = now();
		let inode = RawInode {
			mode: file_type.mode_bits(),
			uid: 0,
			size_low: 0,
			atime: t,
			ctime: t,
			mtime: t,
			dtime: 0,
			gid: 0,
			links_count: 0,
			blocks: 0,
			flags: 0,
			os_specific_0: 0,
			i_block: [0; 15],
			generation: 0,
			file_acl: 0,
			size_high: 0,
			frag_addr: 0,
			os_specific_1: [0; 12],
		};
		self.write_inode(inode_num, &inode);
		tracing::debug!(inode_num, ?file_type, "allocated inode");
		Ok(inode_num)
	}

	/// Decrements `links_count`. When it reaches zero, stamps `dtime`, reclaims
	/// every data block the inode owns, and frees the inode bit.
	///
	/// Unlinking an inode whose `links_count` is already zero is an invariant
	/// violation (the image is already inconsistent) and panics rather than
	/// returning an error.
	pub fn unlink_inode(&mut self, inode_num: u32) {
		let mut inode = self.read_inode(inode_num);
		assert!(
			inode.links_count > 0,
			"unlinking inode {inode_num} with links_count already 0"
		);
		inode.links_count -= 1;
		if inode.links_count == 0 {
			inode.dtime = now();
			self.write_inode(inode_num, &inode);
			self.free_inode_data_blocks(&inode);
			self.free_inode(inode_num);
			tracing::debug!(inode_num, "unlinked inode, links reached 0");
		} else {
			self.write_inode(inode_num, &inode);
			tracing::debug!(inode_num, links_count = inode.links_count, "unlinked inode");
		}
	}

	/// Frees every data block an inode owns: its direct pointers, then (if
	/// present) every entry of its single-indirect block followed by the
	/// indirect block itself.
	pub fn free_inode_data_blocks(&mut self, inode: &RawInode) {
		for &b in &inode.i_block[..DIRECT_BLOCK_COUNT] {
			if b != 0 {
				self.free_block(b);
			}
		}
		let indirect = inode.i_block[INDIRECT_BLOCK_INDEX];
		if indirect != 0 {
			for b in self.indirect_block_entries(indirect) {
				self.free_block(b);
			}
			self.free_block(indirect);
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::testutil::make_test_image;

	#[test]
	fn alloc_inode_starts_at_zero_links() {
		let mut image = make_test_image();
		let inode_num = image.alloc_inode(FileType::RegularFile).unwrap();
		let inode = image.read_inode(inode_num);
		assert_eq!(inode.links_count, 0);
		assert_eq!(inode.size_low, 0);
		assert_eq!(inode.blocks, 0);
		assert_eq!(FileType::from_mode(inode.mode), Some(FileType::RegularFile));
		assert!(image.is_inode_in_use(inode_num));
	}

	#[test]
	fn unlink_frees_blocks_and_bit_at_zero_links() {
		let mut image = make_test_image();
		let inode_num = image.alloc_inode(FileType::RegularFile).unwrap();
		let block_num = image.allocate_block().unwrap();
		let mut inode = image.read_inode(inode_num);
		inode.i_block[0] = block_num;
		inode.links_count = 1;
		Ext2Image::account_block(&mut inode, 1024);
		image.write_inode(inode_num, &inode);

		image.unlink_inode(inode_num);

		assert!(!image.is_inode_in_use(inode_num));
		assert!(!image.is_block_in_use(block_num));
		let inode = image.read_inode(inode_num);
		assert_ne!(inode.dtime, 0);
	}

	#[test]
	fn unlink_with_multiple_links_only_decrements() {
		let mut image = make_test_image();
		let inode_num = image.alloc_inode(FileType::RegularFile).unwrap();
		let mut inode = image.read_inode(inode_num);
		inode.links_count = 2;
		image.write_inode(inode_num, &inode);

		image.unlink_inode(inode_num);

		assert!(image.is_inode_in_use(inode_num));
		let inode = image.read_inode(inode_num);
		assert_eq!(inode.links_count, 1);
		assert_eq!(inode.dtime, 0);
	}

	#[test]
	#[should_panic(expected = "links_count already 0")]
	fn unlink_already_zero_is_fatal() {
		let mut image = make_test_image();
		let inode_num = image.alloc_inode(FileType::RegularFile).unwrap();
		let mut inode = image.read_inode(inode_num);
		inode.links_count = 1;
		image.write_inode(inode_num, &inode);

		image.unlink_inode(inode_num); // links_count 1 -> 0, inode freed
		image.unlink_inode(inode_num); // already free: fatal
	}
}
