//! `ext2-ln` creates a hard link or, with `-s`, a symbolic link inside an
//! ext2 image.

use std::env;
use std::path::{Path, PathBuf};
use std::process::exit;

use ext2_utils::{Ext2Error, Ext2Image, FileType};

#[derive(Default)]
struct Args {
	prog: String,
	symbolic: bool,
	image_path: Option<PathBuf>,
	src_path: Option<String>,
	link_path: Option<String>,
}

fn parse_args() -> Args {
	let mut args: Args = Default::default();
	let mut iter = env::args();
	args.prog = iter.next().unwrap_or_else(|| "ext2-ln".to_owned());

	let mut positional = Vec::new();
	for arg in iter {
		match arg.as_str() {
			"-s" => args.symbolic = true,
			_ => positional.push(arg),
		}
	}
	if positional.len() == 3 {
		args.image_path = Some(PathBuf::from(&positional[0]));
		args.src_path = Some(positional[1].clone());
		args.link_path = Some(positional[2].clone());
	}
	args
}

fn print_usage(prog: &str) {
	eprintln!("{prog}: usage: {prog} <image> [-s] <src-ext2-path> <link-ext2-path>");
}

fn main() {
	tracing_subscriber::fmt::try_init().ok();
	let args = parse_args();

	let (Some(image_path), Some(src_path), Some(link_path)) =
		(args.image_path, args.src_path, args.link_path)
	else {
		print_usage(&args.prog);
		exit(libc::EINVAL);
	};

	let mut image = Ext2Image::open(Path::new(&image_path)).unwrap_or_else(|e| {
		eprintln!("{}: {}: {}", args.prog, image_path.display(), e);
		exit(libc::EIO);
	});

	let result = if args.symbolic {
		make_symlink(&mut image, &src_path, &link_path)
	} else {
		make_hardlink(&mut image, &src_path, &link_path)
	};
	if let Err(e) = result {
		eprintln!("{}: {}: {}", args.prog, link_path, e);
		exit(e.errno());
	}

	if let Err(e) = image.sync() {
		eprintln!("{}: {}: {}", args.prog, image_path.display(), e);
		exit(libc::EIO);
	}
}

fn make_hardlink(image: &mut Ext2Image, src_path: &str, link_path: &str) -> ext2_utils::Result<()> {
	let (src_inode_num, src_type) = image.resolve_existing(src_path)?;
	if src_type == FileType::Directory {
		return Err(Ext2Error::IsDirectory);
	}
	let (parent_inode_num, name) = image.resolve_parent_for_create(link_path)?;
	image.create_entry(parent_inode_num, Some(src_inode_num), &name, src_type)?;
	tracing::info!(src_path, link_path, "created hard link");
	Ok(())
}

fn make_symlink(image: &mut Ext2Image, src_path: &str, link_path: &str) -> ext2_utils::Result<()> {
	let (parent_inode_num, name) = image.resolve_parent_for_create(link_path)?;
	let inode_num = image.create_entry(parent_inode_num, None, &name, FileType::Symlink)?;

	let target_bytes = src_path.as_bytes();
	let block_num = image.allocate_block()?;
	let block = image.block_mut(block_num);
	block[..target_bytes.len()].copy_from_slice(target_bytes);
	block[target_bytes.len()..].fill(0);

	let mut inode = image.read_inode(inode_num);
	inode.i_block[0] = block_num;
	inode.size_low = target_bytes.len() as u32;
	Ext2Image::account_block(&mut inode, ext2_utils::BLOCK_SIZE as u32);
	image.write_inode(inode_num, &inode);

	tracing::info!(src_path, link_path, "created symbolic link");
	Ok(())
}
