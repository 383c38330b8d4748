use core::fmt::{self, Debug};
use core::mem;
use core::slice;

use crate::block::{Address, BLOCK_SIZE};
use crate::error::Error;
use crate::volume::Volume;

/// assoofs signature, stored in the first field of block 0 to help confirm
/// the presence of the filesystem on a volume
pub const ASSOOFS_MAGIC: u64 = 0x2023_0602;

/// On-disk format revision
pub const ASSOOFS_VERSION: u64 = 1;

/// Block number of the superblock
pub const SUPERBLOCK_BLOCK: u32 = 0;
/// Block number of the inode store
pub const INODE_STORE_BLOCK: u32 = 1;
/// Block number of the root directory's data
pub const ROOTDIR_BLOCK: u32 = 2;
/// Highest block number that is never handed out by the allocator
pub const LAST_RESERVED_BLOCK: u32 = ROOTDIR_BLOCK;

/// Maximum number of filesystem objects (files plus directories, root
/// included). One data block per object, one bitmap bit per block.
pub const MAX_OBJECTS: u64 = 64;

// free_blocks bits 0..=2 cover the reserved blocks and stay zero
const ALLOCATABLE_MASK: u64 = !((1_u64 << (LAST_RESERVED_BLOCK + 1)) - 1);

/// The Superblock holds the filesystem-wide counters and the free-block
/// bitmap. It occupies the whole of block 0; every field is a
/// little-endian u64 and the remainder of the block is padding.
///
/// `free_blocks` is a bit per block on the volume: bit `i` is 1 iff block
/// `i` is free. The reserved blocks 0..=2 are always marked in use.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Superblock {
    /// Must be `ASSOOFS_MAGIC`
    pub magic: u64,
    /// Must be `ASSOOFS_VERSION`
    pub version: u64,
    /// Must be `BLOCK_SIZE`
    pub block_size: u64,
    /// Number of live entries in the inode store
    pub inodes_count: u64,
    /// Free-block bitmap, one bit per block
    pub free_blocks: u64,
    #[doc(hidden)]
    _padding: [u8; 4056],
}

impl Debug for Superblock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Superblock")
            .field("magic", &self.magic)
            .field("version", &self.version)
            .field("block_size", &self.block_size)
            .field("inodes_count", &self.inodes_count)
            .field("free_blocks", &self.free_blocks)
            .finish()
    }
}

impl Superblock {
    pub fn new(inodes_count: u64, free_blocks: u64) -> Superblock {
        Superblock {
            magic: ASSOOFS_MAGIC,
            version: ASSOOFS_VERSION,
            block_size: BLOCK_SIZE as u64,
            inodes_count,
            free_blocks,
            _padding: [0; 4056],
        }
    }

    /// Read the superblock out of block 0 of `haystack` and validate it,
    /// with a distinct error per mismatching field.
    pub unsafe fn find<V: Volume<u8>>(
        haystack: &V,
    ) -> Result<(Superblock, Address), Error> {
        let offset = Address::new(SUPERBLOCK_BLOCK, 0);
        let end = offset + Address::from(mem::size_of::<Superblock>());
        if haystack.size() < end {
            return Err(Error::AddressOutOfBounds(end.block(), end.offset()));
        }

        let (superblock, addr) = {
            haystack
                .slice_unchecked(offset..end)
                .dynamic_cast::<Superblock>()
        };

        if superblock.magic != ASSOOFS_MAGIC {
            return Err(Error::BadMagic(superblock.magic));
        }
        if superblock.version != ASSOOFS_VERSION {
            return Err(Error::BadVersion(superblock.version));
        }
        if superblock.block_size != BLOCK_SIZE as u64 {
            return Err(Error::BadBlockSize(superblock.block_size));
        }
        Ok((superblock, addr))
    }

    pub fn as_bytes(&self) -> &[u8] {
        unsafe {
            slice::from_raw_parts(
                self as *const Superblock as *const u8,
                mem::size_of::<Superblock>(),
            )
        }
    }

    /// Claim the lowest free unreserved block: clear its bit and return
    /// its number.
    pub fn allocate_block(&mut self) -> Result<u32, Error> {
        // block numbers reach 63, so the mask has to be a shifted u64
        for i in (LAST_RESERVED_BLOCK as u64 + 1)..MAX_OBJECTS {
            if self.free_blocks & (1_u64 << i) != 0 {
                self.free_blocks &= !(1_u64 << i);
                return Ok(i as u32);
            }
        }
        Err(Error::NoFreeBlocks)
    }

    /// Return a block to the bitmap.
    pub fn release_block(&mut self, block: u32) {
        self.free_blocks |= 1_u64 << block as u64;
    }

    pub fn is_free(&self, block: u32) -> bool {
        self.free_blocks & (1_u64 << block as u64) != 0
    }

    /// Number of unreserved blocks still free.
    pub fn free_block_count(&self) -> u32 {
        (self.free_blocks & ALLOCATABLE_MASK).count_ones()
    }
}
