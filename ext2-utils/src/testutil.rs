//! Builds a minimal, single-group ext2 image entirely in memory, for unit
//! tests that would otherwise need a real file on disk.

use crate::image::{now, Ext2Image};
use crate::layout::{
	FileType, GroupDescriptor, Superblock, BLOCK_SIZE, EXT2_MAGIC, FIRST_USABLE_INODE, ROOT_INODE,
};

const TOTAL_BLOCKS: u32 = 300;
const INODES_PER_GROUP: u32 = 128;
const INODE_TABLE_BLOCKS: u32 = 16; // ceil(128 inodes * 128 bytes / 1024)
const INODE_TABLE_START: u32 = 5;

/// Builds a fresh image: superblock, group descriptor, bitmaps with the
/// metadata region reserved, and a root directory containing only `.` and
/// `..`.
pub(crate) fn make_test_image() -> Ext2Image {
	let buf = vec![0u8; TOTAL_BLOCKS as usize * BLOCK_SIZE];
	let mut image = Ext2Image::from_buffer(buf);

	let inode_table_end = INODE_TABLE_START + INODE_TABLE_BLOCKS;

	let sb = Superblock {
		inodes_count: INODES_PER_GROUP,
		blocks_count: TOTAL_BLOCKS - 1,
		r_blocks_count: 0,
		free_blocks_count: TOTAL_BLOCKS - 1,
		free_inodes_count: INODES_PER_GROUP,
		first_data_block: 1,
		log_block_size: 0,
		log_frag_size: 0,
		blocks_per_group: TOTAL_BLOCKS,
		frags_per_group: 0,
		inodes_per_group: INODES_PER_GROUP,
		mtime: 0,
		wtime: 0,
		mnt_count: 0,
		max_mnt_count: 0xffff,
		magic: EXT2_MAGIC,
		state: 1,
		errors: 1,
		minor_rev_level: 0,
		lastcheck: now(),
		checkinterval: 0,
		creator_os: 0,
		rev_level: 1,
		def_resuid: 0,
		def_resgid: 0,
		first_ino: FIRST_USABLE_INODE,
		inode_size: 128,
		block_group_nr: 0,
		feature_compat: 0,
		feature_incompat: 0,
		feature_ro_compat: 0,
		uuid: [0; 16],
		volume_name: [0; 16],
		last_mounted: [0; 64],
		algo_bitmap: 0,
		prealloc_blocks: 0,
		prealloc_dir_blocks: 0,
		_alignment: 0,
		journal_uuid: [0; 16],
		journal_inum: 0,
		journal_dev: 0,
		last_orphan: 0,
		_padding: [0; 788],
	};
	image.set_superblock(&sb);

	let gd = GroupDescriptor {
		block_bitmap: 3,
		inode_bitmap: 4,
		inode_table: INODE_TABLE_START,
		free_blocks_count: (TOTAL_BLOCKS - 1) as u16,
		free_inodes_count: INODES_PER_GROUP as u16,
		used_dirs_count: 0,
		_padding: [0; 14],
	};
	image.set_group_desc(&gd);

	// Superblock's own block, the group descriptor's block, both bitmaps, and
	// the inode table stay permanently in use.
	for b in 1..inode_table_end {
		image.mark_block_in_use(b);
	}
	// Inodes 1..10 are reserved; 2 is root, 11 is the first usable inode.
	for i in 1..FIRST_USABLE_INODE {
		image.mark_inode_in_use(i);
	}

	let root_block = image.allocate_block().expect("room for root's first block");
	image.init_directory_block(root_block, ROOT_INODE, ROOT_INODE);

	let t = now();
	let mut root_inode = image.read_inode(ROOT_INODE);
	root_inode.mode = FileType::Directory.mode_bits();
	root_inode.links_count = 2;
	root_inode.atime = t;
	root_inode.ctime = t;
	root_inode.mtime = t;
	root_inode.size_low = BLOCK_SIZE as u32;
	root_inode.i_block[0] = root_block;
	Ext2Image::account_block(&mut root_inode, BLOCK_SIZE as u32);
	image.write_inode(ROOT_INODE, &root_inode);

	let mut gd = image.group_desc();
	gd.used_dirs_count = 1;
	image.set_group_desc(&gd);

	image
}
