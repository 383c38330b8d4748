#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate bitflags;

extern crate alloc;
#[cfg(any(test, not(feature = "no_std")))]
extern crate std;

pub mod block;
pub mod error;
pub mod fs;
pub mod sys;
pub mod volume;

#[cfg(test)]
mod tests {
    use crate::sys::dir::DirRecord;
    use crate::sys::inode::Inode;
    use crate::sys::superblock::Superblock;

    #[test]
    fn sizes() {
        use core::mem::size_of;
        assert_eq!(size_of::<Superblock>(), 4096);
        assert_eq!(size_of::<Inode>(), 48);
        assert_eq!(size_of::<DirRecord>(), 263);
    }
}
