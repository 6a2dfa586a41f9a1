//! `ext2_utils` implements the on-disk manipulation core shared by the
//! `ext2-cp`, `ext2-ln`, `ext2-mkdir`, and `ext2-rm` command drivers: path
//! resolution, bitmap allocation, inode lifecycle, directory-entry records,
//! and data-block writing for a single-group, revision-0 ext2 image with a
//! 1 KiB block size.
//!
//! Every operation takes an explicit `&mut Ext2Image` (or `&Ext2Image` for
//! read-only lookups) rather than reaching for process-wide state, so images
//! can be built and asserted on entirely in memory in tests.

mod bitmap;
mod dirent;
mod error;
mod image;
mod inode;
mod layout;
mod path;
mod writer;

#[cfg(test)]
mod testutil;

pub use dirent::DirEntryDescriptor;
pub use error::{Ext2Error, Result};
pub use image::{now, Ext2Image};
pub use layout::{FileType, BLOCK_SIZE, ROOT_INODE};
