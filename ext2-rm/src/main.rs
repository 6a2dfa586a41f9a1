//! `ext2-rm` removes a directory entry from an ext2 image.

use std::env;
use std::path::{Path, PathBuf};
use std::process::exit;

use ext2_utils::Ext2Image;

#[derive(Default)]
struct Args {
	prog: String,
	image_path: Option<PathBuf>,
	target_path: Option<String>,
}

fn parse_args() -> Args {
	let mut args: Args = Default::default();
	let mut iter = env::args();
	args.prog = iter.next().unwrap_or_else(|| "ext2-rm".to_owned());

	let positional: Vec<String> = iter.collect();
	if positional.len() == 2 {
		args.image_path = Some(PathBuf::from(&positional[0]));
		args.target_path = Some(positional[1].clone());
	}
	args
}

fn print_usage(prog: &str) {
	eprintln!("{prog}: usage: {prog} <image> <ext2-path>");
}

fn main() {
	tracing_subscriber::fmt::try_init().ok();
	let args = parse_args();

	let (Some(image_path), Some(target_path)) = (args.image_path, args.target_path) else {
		print_usage(&args.prog);
		exit(libc::EINVAL);
	};

	let mut image = Ext2Image::open(Path::new(&image_path)).unwrap_or_else(|e| {
		eprintln!("{}: {}: {}", args.prog, image_path.display(), e);
		exit(libc::EIO);
	});

	if let Err(e) = remove(&mut image, &target_path) {
		eprintln!("{}: {}: {}", args.prog, target_path, e);
		exit(e.errno());
	}

	if let Err(e) = image.sync() {
		eprintln!("{}: {}: {}", args.prog, image_path.display(), e);
		exit(libc::EIO);
	}
}

fn remove(image: &mut Ext2Image, target_path: &str) -> ext2_utils::Result<()> {
	let (parent_inode_num, name) = image.resolve_parent_for_delete(target_path)?;
	image.delete_entry(parent_inode_num, &name)?;
	tracing::info!(target_path, "removed directory entry");
	Ok(())
}
