//! Image builder behind the `mkassoofs` formatter.

use core::mem;

use alloc::vec;
use alloc::vec::Vec;

use crate::block::BLOCK_SIZE;
use crate::sys::dir::DirRecord;
use crate::sys::inode::{FileMode, Inode, Timestamp, LAST_RESERVED_INODE};
use crate::sys::superblock::{
    Superblock, INODE_STORE_BLOCK, LAST_RESERVED_BLOCK, MAX_OBJECTS,
    ROOTDIR_BLOCK,
};

pub const WELCOME_FILENAME: &[u8] = b"README.txt";
pub const WELCOME_CONTENT: &[u8] = b"Hello world from assoofs";
/// Inode number of the optional welcome file
pub const WELCOME_INODE: u64 = LAST_RESERVED_INODE + 1;
/// Data block of the optional welcome file
pub const WELCOME_BLOCK: u32 = LAST_RESERVED_BLOCK + 1;

// bits 0..=2 cover the reserved blocks; bit 3 drops too when the welcome
// file occupies that block
const FREE_BLOCKS_BARE: u64 = 0xFFFF_FFFF_FFFF_FFF8;
const FREE_BLOCKS_WELCOME: u64 = 0xFFFF_FFFF_FFFF_FFF0;

/// Lay out a fresh image covering the whole 64-block address space:
/// superblock, inode store holding the root directory, the root
/// directory's data block, and optionally a welcome file in the first
/// unreserved block.
pub fn build_image(welcome: bool, time: Timestamp) -> Vec<u8> {
    let mut image = vec![0_u8; BLOCK_SIZE * MAX_OBJECTS as usize];

    let (inodes_count, free_blocks) = if welcome {
        (WELCOME_INODE, FREE_BLOCKS_WELCOME)
    } else {
        (LAST_RESERVED_INODE, FREE_BLOCKS_BARE)
    };
    let superblock = Superblock::new(inodes_count, free_blocks);
    put(&mut image, 0, superblock.as_bytes());

    let root_mode = FileMode::U_READ
        | FileMode::U_WRITE
        | FileMode::U_EXEC
        | FileMode::G_READ
        | FileMode::G_EXEC
        | FileMode::O_READ
        | FileMode::O_EXEC;
    let mut root = Inode::root(root_mode, time);
    let store_base = INODE_STORE_BLOCK as usize * BLOCK_SIZE;

    if welcome {
        root.set_dir_children_count(1);

        let file_mode = FileMode::REGULAR
            | FileMode::U_READ
            | FileMode::U_WRITE
            | FileMode::G_READ
            | FileMode::O_READ;
        let mut file =
            Inode::new(file_mode, WELCOME_INODE, WELCOME_BLOCK as u64, time);
        file.set_file_size(WELCOME_CONTENT.len() as u64);
        put(
            &mut image,
            store_base + mem::size_of::<Inode>(),
            file.as_bytes(),
        );

        let record = DirRecord::new(WELCOME_FILENAME, WELCOME_INODE)
            .unwrap_or_else(|_| unreachable!());
        put(
            &mut image,
            ROOTDIR_BLOCK as usize * BLOCK_SIZE,
            record.as_bytes(),
        );
        put(
            &mut image,
            WELCOME_BLOCK as usize * BLOCK_SIZE,
            WELCOME_CONTENT,
        );
    }

    put(&mut image, store_base, root.as_bytes());
    image
}

fn put(image: &mut [u8], offset: usize, bytes: &[u8]) {
    image[offset..offset + bytes.len()].copy_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sys::superblock::{ASSOOFS_MAGIC, ASSOOFS_VERSION};

    #[test]
    fn bare_image() {
        let image = build_image(false, Timestamp::zero());
        assert_eq!(image.len(), BLOCK_SIZE * 64);

        let superblock = unsafe { Superblock::find(&image) }.unwrap().0;
        assert_eq!(superblock.magic, ASSOOFS_MAGIC);
        assert_eq!(superblock.version, ASSOOFS_VERSION);
        assert_eq!(superblock.block_size, BLOCK_SIZE as u64);
        assert_eq!(superblock.inodes_count, 1);
        assert_eq!(superblock.free_blocks, 0xFFFF_FFFF_FFFF_FFF8);
    }

    #[test]
    fn welcome_image() {
        let image = build_image(true, Timestamp::zero());

        let superblock = unsafe { Superblock::find(&image) }.unwrap().0;
        assert_eq!(superblock.inodes_count, 2);
        assert_eq!(superblock.free_blocks, 0xFFFF_FFFF_FFFF_FFF0);

        // the welcome payload sits at the start of block 3
        let base = WELCOME_BLOCK as usize * BLOCK_SIZE;
        assert_eq!(
            &image[base..base + WELCOME_CONTENT.len()],
            WELCOME_CONTENT,
        );
    }
}
