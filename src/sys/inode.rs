use core::mem;
use core::slice;

use super::superblock::ROOTDIR_BLOCK;

/// Inode number of the root directory
pub const ROOT_INODE: u64 = 1;
/// Highest inode number handed out by the formatter rather than `create`
pub const LAST_RESERVED_INODE: u64 = ROOT_INODE;

bitflags! {
    /// Type and permission bits of an inode's `mode` field.
    pub struct FileMode: u64 {
        /// Directory
        const DIRECTORY = 0x4000;
        /// Regular file
        const REGULAR = 0x8000;
        /// Other—execute permission
        const O_EXEC = 0x001;
        /// Other—write permission
        const O_WRITE = 0x002;
        /// Other—read permission
        const O_READ = 0x004;
        /// Group—execute permission
        const G_EXEC = 0x008;
        /// Group—write permission
        const G_WRITE = 0x010;
        /// Group—read permission
        const G_READ = 0x020;
        /// User—execute permission
        const U_EXEC = 0x040;
        /// User—write permission
        const U_WRITE = 0x080;
        /// User—read permission
        const U_READ = 0x100;
    }
}

impl FileMode {
    /// Mask selecting the object-type nibble of a mode.
    pub const TYPE_MASK: u64 = 0xF000;

    pub fn is_dir(&self) -> bool {
        self.bits() & Self::TYPE_MASK == Self::DIRECTORY.bits()
    }

    pub fn is_regular(&self) -> bool {
        self.bits() & Self::TYPE_MASK == Self::REGULAR.bits()
    }
}

/// Creation time of an inode, seconds and nanoseconds since the epoch.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Timestamp {
    pub secs: u64,
    pub nsecs: u64,
}

impl Timestamp {
    pub const fn zero() -> Timestamp {
        Timestamp { secs: 0, nsecs: 0 }
    }

    #[cfg(any(test, not(feature = "no_std")))]
    pub fn now() -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp {
            secs: now.as_secs(),
            nsecs: now.subsec_nanos() as u64,
        }
    }

    /// Freestanding builds have no clock; the embedding host stamps inodes.
    #[cfg(not(any(test, not(feature = "no_std"))))]
    pub fn now() -> Timestamp {
        Timestamp::zero()
    }
}

/// One entry of the inode store: the metadata record of a single file or
/// directory. Records do not hold data; `data_block_number` names the one
/// block that does. The store in block 1 is a packed array of these,
/// live entries first, in creation order.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Inode {
    /// Type and permissions
    pub mode: u64,
    /// Inode number, 1-based; the root directory is inode 1
    pub inode_no: u64,
    /// Number of the single block holding this object's data
    pub data_block_number: u64,
    /// Creation time
    pub time: Timestamp,
    /// file_size for a regular file, dir_children_count for a directory
    size: u64,
}

impl Inode {
    pub fn new(
        mode: FileMode,
        inode_no: u64,
        data_block_number: u64,
        time: Timestamp,
    ) -> Inode {
        Inode {
            mode: mode.bits(),
            inode_no,
            data_block_number,
            time,
            size: 0,
        }
    }

    /// The root directory record as the formatter lays it down.
    pub fn root(mode: FileMode, time: Timestamp) -> Inode {
        Inode::new(
            mode | FileMode::DIRECTORY,
            ROOT_INODE,
            ROOTDIR_BLOCK as u64,
            time,
        )
    }

    pub fn mode(&self) -> FileMode {
        FileMode::from_bits_truncate(self.mode)
    }

    pub fn is_dir(&self) -> bool {
        self.mode & FileMode::TYPE_MASK == FileMode::DIRECTORY.bits()
    }

    pub fn is_regular(&self) -> bool {
        self.mode & FileMode::TYPE_MASK == FileMode::REGULAR.bits()
    }

    /// Payload length in bytes. Only meaningful for regular files.
    pub fn file_size(&self) -> u64 {
        self.size
    }

    /// Number of live records in this directory's data block. Only
    /// meaningful for directories.
    pub fn dir_children_count(&self) -> u64 {
        self.size
    }

    pub fn set_file_size(&mut self, size: u64) {
        self.size = size;
    }

    pub fn set_dir_children_count(&mut self, count: u64) {
        self.size = count;
    }

    pub fn as_bytes(&self) -> &[u8] {
        unsafe {
            slice::from_raw_parts(
                self as *const Inode as *const u8,
                mem::size_of::<Inode>(),
            )
        }
    }
}
