use core::fmt::{self, Debug};
use core::mem;
use core::slice;

use crate::block::BLOCK_SIZE;
use crate::error::Error;

/// Size of the fixed filename field of a directory record. Stored names
/// keep a terminating NUL inside the field, so they are at most one byte
/// shorter.
pub const FILENAME_MAX_LENGTH: usize = 255;

/// How many directory records fit in one data block.
pub const RECORDS_PER_BLOCK: usize = BLOCK_SIZE / mem::size_of::<DirRecord>();

/// One entry of a directory's data block: a filename bound to an inode
/// number. The block is a packed array of these; only the first
/// `dir_children_count` records of the owning directory are live.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct DirRecord {
    /// NUL-padded filename
    pub filename: [u8; FILENAME_MAX_LENGTH],
    /// Inode number of the named child
    pub inode_no: u64,
}

impl DirRecord {
    pub fn new(name: &[u8], inode_no: u64) -> Result<DirRecord, Error> {
        if name.len() >= FILENAME_MAX_LENGTH {
            return Err(Error::NameTooLong(name.len()));
        }
        let mut filename = [0_u8; FILENAME_MAX_LENGTH];
        filename[..name.len()].copy_from_slice(name);
        Ok(DirRecord { filename, inode_no })
    }

    /// The stored name, up to its first NUL.
    pub fn name(&self) -> &[u8] {
        let len = self
            .filename
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(FILENAME_MAX_LENGTH);
        &self.filename[..len]
    }

    pub fn name_matches(&self, name: &[u8]) -> bool {
        self.name() == name
    }

    pub fn as_bytes(&self) -> &[u8] {
        unsafe {
            slice::from_raw_parts(
                self as *const DirRecord as *const u8,
                mem::size_of::<DirRecord>(),
            )
        }
    }
}

impl Debug for DirRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DirRecord")
            .field("filename", &self.name())
            .field("inode_no", &{ self.inode_no })
            .finish()
    }
}

impl PartialEq for DirRecord {
    fn eq(&self, rhs: &DirRecord) -> bool {
        self.filename == rhs.filename && { self.inode_no } == { rhs.inode_no }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity() {
        assert_eq!(RECORDS_PER_BLOCK, 15);
    }

    #[test]
    fn names() {
        let record = DirRecord::new(b"README.txt", 2).unwrap();
        assert_eq!(record.name(), b"README.txt");
        assert!(record.name_matches(b"README.txt"));
        assert!(!record.name_matches(b"README"));
        assert!(!record.name_matches(b"README.txt.bak"));
        assert_eq!({ record.inode_no }, 2);
    }

    #[test]
    fn name_length_bound() {
        let longest = [b'a'; FILENAME_MAX_LENGTH - 1];
        assert!(DirRecord::new(&longest, 2).is_ok());

        let too_long = [b'a'; FILENAME_MAX_LENGTH];
        assert_eq!(
            DirRecord::new(&too_long, 2).err(),
            Some(Error::NameTooLong(FILENAME_MAX_LENGTH)),
        );
    }
}
