//! `ext2-mkdir` creates a directory inside an ext2 image.

use std::env;
use std::path::{Path, PathBuf};
use std::process::exit;

use ext2_utils::{Ext2Image, FileType, BLOCK_SIZE};

#[derive(Default)]
struct Args {
	prog: String,
	image_path: Option<PathBuf>,
	dir_path: Option<String>,
}

fn parse_args() -> Args {
	let mut args: Args = Default::default();
	let mut iter = env::args();
	args.prog = iter.next().unwrap_or_else(|| "ext2-mkdir".to_owned());

	let positional: Vec<String> = iter.collect();
	if positional.len() == 2 {
		args.image_path = Some(PathBuf::from(&positional[0]));
		args.dir_path = Some(positional[1].clone());
	}
	args
}

fn print_usage(prog: &str) {
	eprintln!("{prog}: usage: {prog} <image> <ext2-path>");
}

fn main() {
	tracing_subscriber::fmt::try_init().ok();
	let args = parse_args();

	let (Some(image_path), Some(dir_path)) = (args.image_path, args.dir_path) else {
		print_usage(&args.prog);
		exit(libc::EINVAL);
	};

	let mut image = Ext2Image::open(Path::new(&image_path)).unwrap_or_else(|e| {
		eprintln!("{}: {}: {}", args.prog, image_path.display(), e);
		exit(libc::EIO);
	});

	if let Err(e) = make_directory(&mut image, &dir_path) {
		eprintln!("{}: {}: {}", args.prog, dir_path, e);
		exit(e.errno());
	}

	if let Err(e) = image.sync() {
		eprintln!("{}: {}: {}", args.prog, image_path.display(), e);
		exit(libc::EIO);
	}
}

/// Creates a directory entry of type directory, gives it a first data block
/// holding `.` and `..`, and accounts for the two extra links this introduces:
/// the child's own `.` (self) and the child's `..` (parent).
fn make_directory(image: &mut Ext2Image, dir_path: &str) -> ext2_utils::Result<()> {
	let (parent_inode_num, name) = image.resolve_parent_for_create(dir_path)?;
	let child_inode_num = image.create_entry(parent_inode_num, None, &name, FileType::Directory)?;

	let dir_block = image.allocate_block()?;
	image.init_directory_block(dir_block, child_inode_num, parent_inode_num);

	let mut child_inode = image.read_inode(child_inode_num);
	child_inode.i_block[0] = dir_block;
	child_inode.size_low = BLOCK_SIZE as u32;
	child_inode.links_count += 1; // `.` pointing at itself
	Ext2Image::account_block(&mut child_inode, BLOCK_SIZE as u32);
	image.write_inode(child_inode_num, &child_inode);

	let mut parent_inode = image.read_inode(parent_inode_num);
	parent_inode.links_count += 1; // child's `..` pointing back at the parent
	image.write_inode(parent_inode_num, &parent_inode);

	let mut group_desc = image.group_desc();
	group_desc.used_dirs_count += 1;
	image.set_group_desc(&group_desc);

	tracing::info!(dir_path, child_inode_num, "created directory");
	Ok(())
}
