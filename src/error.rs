use core::convert::Infallible;

#[cfg(any(test, not(feature = "no_std")))]
use std::io;

/// The set of all possible errors
#[derive(Debug)]
pub enum Error {
    BadMagic(u64),
    BadVersion(u64),
    BadBlockSize(u64),
    AddressOutOfBounds(u32, u32),
    InodeStoreFull,
    NoFreeBlocks,
    NotFound,
    InodeNotFound(u64),
    UnsupportedMode(u64),
    NameTooLong(usize),
    DirectoryFull(u64),
    NotADirectory(u64),
    LockInterrupted,
    #[cfg(any(test, not(feature = "no_std")))]
    Io(io::Error),
}

impl From<Infallible> for Error {
    fn from(_: Infallible) -> Error {
        unreachable!()
    }
}

#[cfg(any(test, not(feature = "no_std")))]
impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl PartialEq for Error {
    fn eq(&self, rhs: &Error) -> bool {
        match (self, rhs) {
            (&Error::BadMagic(a), &Error::BadMagic(b)) => a == b,
            (&Error::BadVersion(a), &Error::BadVersion(b)) => a == b,
            (&Error::BadBlockSize(a), &Error::BadBlockSize(b)) => a == b,
            (
                &Error::AddressOutOfBounds(a1, a2),
                &Error::AddressOutOfBounds(b1, b2),
            ) => a1 == b1 && a2 == b2,
            (&Error::InodeStoreFull, &Error::InodeStoreFull) => true,
            (&Error::NoFreeBlocks, &Error::NoFreeBlocks) => true,
            (&Error::NotFound, &Error::NotFound) => true,
            (&Error::InodeNotFound(a), &Error::InodeNotFound(b)) => a == b,
            (&Error::UnsupportedMode(a), &Error::UnsupportedMode(b)) => a == b,
            (&Error::NameTooLong(a), &Error::NameTooLong(b)) => a == b,
            (&Error::DirectoryFull(a), &Error::DirectoryFull(b)) => a == b,
            (&Error::NotADirectory(a), &Error::NotADirectory(b)) => a == b,
            (&Error::LockInterrupted, &Error::LockInterrupted) => true,
            _ => false,
        }
    }
}
