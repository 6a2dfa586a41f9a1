//! `ext2-cp` copies a file from the host filesystem into an ext2 image.

use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::exit;

use ext2_utils::{Ext2Error, Ext2Image, FileType};

/// Structure storing command line arguments.
#[derive(Default)]
struct Args {
	/// The name of the current program used in command line.
	prog: String,
	/// Path to the ext2 image file.
	image_path: Option<PathBuf>,
	/// Path to the host file to copy in.
	host_path: Option<PathBuf>,
	/// Destination path inside the image.
	dest_path: Option<String>,
}

fn parse_args() -> Args {
	let mut args: Args = Default::default();
	let mut iter = env::args();
	args.prog = iter.next().unwrap_or_else(|| "ext2-cp".to_owned());

	let positional: Vec<String> = iter.collect();
	if positional.len() == 3 {
		args.image_path = Some(PathBuf::from(&positional[0]));
		args.host_path = Some(PathBuf::from(&positional[1]));
		args.dest_path = Some(positional[2].clone());
	}
	args
}

fn print_usage(prog: &str) {
	eprintln!("{prog}: usage: {prog} <image> <host-file> <ext2-path>");
}

fn main() {
	tracing_subscriber::fmt::try_init().ok();
	let args = parse_args();

	let (Some(image_path), Some(host_path), Some(dest_path)) =
		(args.image_path, args.host_path, args.dest_path)
	else {
		print_usage(&args.prog);
		exit(libc::EINVAL);
	};

	let host_meta = fs::metadata(&host_path).unwrap_or_else(|e| {
		eprintln!("{}: {}: {}", args.prog, host_path.display(), e);
		exit(libc::ENOENT);
	});
	if !host_meta.is_file() {
		eprintln!(
			"{}: {}: not a regular file",
			args.prog,
			host_path.display()
		);
		exit(libc::ENOENT);
	}

	let mut image = Ext2Image::open(Path::new(&image_path)).unwrap_or_else(|e| {
		eprintln!("{}: {}: {}", args.prog, image_path.display(), e);
		exit(libc::EIO);
	});

	if let Err(e) = copy_in(&mut image, &host_path, &dest_path) {
		eprintln!("{}: {}: {}", args.prog, dest_path, e);
		exit(e.errno());
	}

	if let Err(e) = image.sync() {
		eprintln!("{}: {}: {}", args.prog, image_path.display(), e);
		exit(libc::EIO);
	}
}

fn copy_in(image: &mut Ext2Image, host_path: &Path, dest_path: &str) -> ext2_utils::Result<()> {
	let (parent, name) = image.resolve_parent_for_create(dest_path)?;
	let inode_num = image.create_entry(parent, None, &name, FileType::RegularFile)?;
	let host_file = File::open(host_path).map_err(Ext2Error::Io)?;
	image.write_data(inode_num, host_file)?;
	tracing::info!(dest_path, "copied file into image");
	Ok(())
}
