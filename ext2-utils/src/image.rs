//! Owns the image's byte region and the named entry points every other
//! component reads and writes through.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::layout::{
	read_struct, write_struct, FileType, GroupDescriptor, RawInode, Superblock, BLOCK_SIZE,
	DIRECT_BLOCK_COUNT, INDIRECT_BLOCK_INDEX, INODE_SIZE, ROOT_INODE,
};

/// Returns the current Unix timestamp, for `ctime`/`atime`/`mtime`/`dtime` fields.
pub fn now() -> u32 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("system clock is before the Unix epoch")
		.as_secs() as u32
}

/// Owns the writable byte region backing an ext2 image, whether that's a real
/// file on the host (production) or an in-memory buffer assembled by hand
/// (tests). The whole image is staged into one owned buffer; `sync` is the only
/// point at which it is written back to the file.
pub struct Ext2Image {
	buf: Vec<u8>,
	file: Option<File>,
}

impl Ext2Image {
	/// Opens `path` read/write and stages its contents into memory.
	pub fn open(path: &Path) -> io::Result<Self> {
		let mut file = OpenOptions::new().read(true).write(true).open(path)?;
		let mut buf = Vec::new();
		file.read_to_end(&mut buf)?;
		if buf.len() < 3 * BLOCK_SIZE {
			return Err(io::Error::new(
				io::ErrorKind::InvalidData,
				"image too small to hold a superblock and group descriptor",
			));
		}
		Ok(Self {
			buf,
			file: Some(file),
		})
	}

	/// Wraps an already-laid-out buffer directly, without an associated file.
	/// Used by tests to build synthetic images without touching the host
	/// filesystem.
	pub fn from_buffer(buf: Vec<u8>) -> Self {
		Self { buf, file: None }
	}

	/// Writes the in-memory buffer back to the backing file. A no-op for
	/// buffer-only images (tests).
	pub fn sync(&mut self) -> io::Result<()> {
		if let Some(file) = &mut self.file {
			file.seek(SeekFrom::Start(0))?;
			file.write_all(&self.buf)?;
			file.flush()?;
		}
		Ok(())
	}

	pub fn block_size(&self) -> usize {
		BLOCK_SIZE
	}

	pub fn buf(&self) -> &[u8] {
		&self.buf
	}

	pub fn buf_mut(&mut self) -> &mut [u8] {
		&mut self.buf
	}

	pub fn superblock(&self) -> Superblock {
		Superblock::read(&self.buf)
	}

	pub fn set_superblock(&mut self, sb: &Superblock) {
		sb.write(&mut self.buf);
	}

	pub fn group_desc(&self) -> GroupDescriptor {
		GroupDescriptor::read(&self.buf)
	}

	pub fn set_group_desc(&mut self, gd: &GroupDescriptor) {
		gd.write(&mut self.buf);
	}

	/// Byte offset of the block-usage bitmap.
	pub fn block_bitmap_offset(&self) -> usize {
		self.group_desc().block_bitmap as usize * BLOCK_SIZE
	}

	/// Byte offset of the inode-usage bitmap.
	pub fn inode_bitmap_offset(&self) -> usize {
		self.group_desc().inode_bitmap as usize * BLOCK_SIZE
	}

	/// Byte offset of the `n`th (1-based) inode record in the inode table.
	pub fn inode_offset(&self, inode_num: u32) -> usize {
		assert!(inode_num >= 1, "inode numbers are 1-based");
		let table_off = self.group_desc().inode_table as usize * BLOCK_SIZE;
		table_off + (inode_num as usize - 1) * INODE_SIZE
	}

	/// Byte offset of logical block `block_num`.
	pub fn block_offset(&self, block_num: u32) -> usize {
		block_num as usize * BLOCK_SIZE
	}

	pub fn read_inode(&self, inode_num: u32) -> RawInode {
		read_struct(&self.buf, self.inode_offset(inode_num))
	}

	pub fn write_inode(&mut self, inode_num: u32, inode: &RawInode) {
		let off = self.inode_offset(inode_num);
		write_struct(&mut self.buf, off, inode);
	}

	/// Returns the block region for `block_num` as a fixed-size slice.
	pub fn block(&self, block_num: u32) -> &[u8] {
		let off = self.block_offset(block_num);
		&self.buf[off..off + BLOCK_SIZE]
	}

	pub fn block_mut(&mut self, block_num: u32) -> &mut [u8] {
		let off = self.block_offset(block_num);
		&mut self.buf[off..off + BLOCK_SIZE]
	}

	pub fn root_inode_num(&self) -> u32 {
		ROOT_INODE
	}

	/// Bumps `new = (old * 512 + delta) / 512` on `inode.blocks`, the sector
	/// accounting convention ext2 uses regardless of the logical block size.
	pub fn account_block(inode: &mut RawInode, delta: u32) {
		inode.blocks = ((inode.blocks as u64 * 512 + delta as u64) / 512) as u32;
	}

	/// Returns the file type an inode's `mode` field encodes, if any.
	pub fn inode_file_type(inode: &RawInode) -> Option<FileType> {
		FileType::from_mode(inode.mode)
	}

	/// Iterates the data-block numbers referenced by an inode: direct pointers
	/// first, then (if present) the contents of the single-indirect block.
	pub fn data_blocks(&self, inode: &RawInode) -> Vec<u32> {
		let mut blocks = Vec::new();
		for &b in &inode.i_block[..DIRECT_BLOCK_COUNT] {
			if b != 0 {
				blocks.push(b);
			}
		}
		let indirect = inode.i_block[INDIRECT_BLOCK_INDEX];
		if indirect != 0 {
			blocks.extend(self.indirect_block_entries(indirect));
		}
		blocks
	}

	/// Reads the array of block numbers stored in a single-indirect block, up to
	/// `block_size / 4` entries. A zero entry terminates the scan.
	pub fn indirect_block_entries(&self, indirect_block: u32) -> Vec<u32> {
		let entries = BLOCK_SIZE / 4;
		let block = self.block(indirect_block);
		let mut out = Vec::new();
		for i in 0..entries {
			let raw = &block[i * 4..i * 4 + 4];
			let b = u32::from_le_bytes(raw.try_into().unwrap());
			if b == 0 {
				break;
			}
			out.push(b);
		}
		out
	}
}
