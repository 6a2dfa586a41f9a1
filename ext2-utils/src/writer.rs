//! Streams bytes from an external source into a freshly allocated file inode,
//! using up to 12 direct pointers and one single-indirect block.

use std::io::{self, Read};

use crate::error::Result;
use crate::image::Ext2Image;
use crate::layout::{DIRECT_BLOCK_COUNT, INDIRECT_BLOCK_INDEX};

/// Reads up to `buf.len()` bytes from `reader`, looping over short reads so a
/// chunk is only shorter than `buf.len()` at genuine end-of-stream. Returns the
/// number of bytes read (`0` only at EOF).
fn read_chunk(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
	let mut total = 0;
	while total < buf.len() {
		let n = reader.read(&mut buf[total..])?;
		if n == 0 {
			break;
		}
		total += n;
	}
	Ok(total)
}

impl Ext2Image {
	/// Writes `reader`'s bytes into `inode_num`'s data blocks: up to 12 direct
	/// blocks, then (if more data remains) one single-indirect block's worth.
	/// Bytes beyond the indirect block's capacity are silently dropped, matching
	/// this system's documented non-goal of larger files.
	///
	/// `inode_num` is expected to name a freshly allocated inode (`i_block` all
	/// zero, `size` and `blocks` both zero); this is always the case for the
	/// regular-file and symlink-target inodes the command drivers create.
	pub fn write_data(&mut self, inode_num: u32, mut reader: impl Read) -> Result<()> {
		let block_size = self.block_size();
		let mut buf = vec![0u8; block_size];
		let mut inode = self.read_inode(inode_num);

		let mut filled_all_direct = true;
		for i in 0..DIRECT_BLOCK_COUNT {
			let n = read_chunk(&mut reader, &mut buf)?;
			if n == 0 {
				filled_all_direct = false;
				break;
			}
			let block_num = self.allocate_block()?;
			let block = self.block_mut(block_num);
			block[..n].copy_from_slice(&buf[..n]);
			inode.i_block[i] = block_num;
			inode.size_low += n as u32;
			Ext2Image::account_block(&mut inode, block_size as u32);
		}

		if filled_all_direct {
			let n = read_chunk(&mut reader, &mut buf)?;
			if n > 0 {
				self.write_indirect(&mut inode, &mut reader, &mut buf, n)?;
			}
		}

		self.write_inode(inode_num, &inode);
		tracing::debug!(inode_num, size = inode.size_low, "wrote file data");
		Ok(())
	}

	/// Handles the single-indirect spillover once all 12 direct blocks are
	/// full. `first_chunk_len` is the length of a chunk already read into `buf`
	/// that still needs to land in the first indirect slot.
	fn write_indirect(
		&mut self,
		inode: &mut crate::layout::RawInode,
		reader: &mut impl Read,
		buf: &mut [u8],
		first_chunk_len: usize,
	) -> Result<()> {
		let block_size = self.block_size();
		let indirect_block = self.allocate_block()?;
		inode.i_block[INDIRECT_BLOCK_INDEX] = indirect_block;
		Ext2Image::account_block(inode, block_size as u32);

		let max_entries = block_size / 4;
		let mut entry_idx = 0;
		let mut chunk_len = first_chunk_len;

		while chunk_len > 0 && entry_idx < max_entries {
			let data_block = self.allocate_block()?;
			let block = self.block_mut(data_block);
			block[..chunk_len].copy_from_slice(&buf[..chunk_len]);

			let indirect = self.block_mut(indirect_block);
			indirect[entry_idx * 4..entry_idx * 4 + 4].copy_from_slice(&data_block.to_le_bytes());

			inode.size_low += chunk_len as u32;
			Ext2Image::account_block(inode, block_size as u32);
			entry_idx += 1;

			chunk_len = read_chunk(reader, buf)?;
		}
		// Bytes still unread past `max_entries` worth of indirect slots are
		// dropped here: out of scope for this system (no double-indirect).
		Ok(())
	}
}
