use core::mem;
use core::ops::{Deref, DerefMut, Range};
use core::ptr;
use core::slice;

use alloc::borrow::{Cow, ToOwned};
use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::block::Address;
use crate::error::Error;

pub mod size;
use self::size::Size;

/// Byte-addressed storage under the filesystem: a block device, a disk
/// image in memory, anything that can hand out slices and take commits.
///
/// A `slice` borrows bytes from the device, mutating the slice turns it
/// into an owned copy, and `commit` writes a mutated slice back. Dropping
/// a slice without committing releases it with the device untouched.
pub trait Volume<T: Clone> {
    type Error: Into<Error>;

    fn size(&self) -> Size;
    fn commit(
        &mut self,
        slice: Option<VolumeCommit<T>>,
    ) -> Result<(), Self::Error>;
    unsafe fn slice_unchecked<'a>(
        &'a self,
        range: Range<Address>,
    ) -> VolumeSlice<'a, T>;

    fn slice<'a>(
        &'a self,
        range: Range<Address>,
    ) -> Result<VolumeSlice<'a, T>, Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Hash)]
pub struct VolumeSlice<'a, T: 'a + Clone> {
    inner: Cow<'a, [T]>,
    index: Address,
}

impl<T: Clone> VolumeSlice<'static, T> {
    pub fn new_owned(
        inner: <[T] as ToOwned>::Owned,
        index: Address,
    ) -> VolumeSlice<'static, T> {
        VolumeSlice {
            inner: Cow::Owned(inner),
            index,
        }
    }
}

impl<'a, T: Clone> VolumeSlice<'a, T> {
    pub fn new(inner: &'a [T], index: Address) -> VolumeSlice<'a, T> {
        VolumeSlice {
            inner: Cow::Borrowed(inner),
            index,
        }
    }

    pub fn is_mutated(&self) -> bool {
        match self.inner {
            Cow::Borrowed(_) => false,
            Cow::Owned(_) => true,
        }
    }

    pub fn address(&self) -> Address {
        self.index
    }
}

impl<'a> VolumeSlice<'a, u8> {
    /// Read a `T` from the start of the slice. The bytes need not be
    /// aligned for `T`.
    pub unsafe fn dynamic_cast<T: Copy>(&self) -> (T, Address) {
        (self.dynamic_cast_at(0), self.index)
    }

    /// Read a `T` starting `offset` bytes into the slice.
    pub unsafe fn dynamic_cast_at<T: Copy>(&self, offset: usize) -> T {
        assert!(offset + mem::size_of::<T>() <= self.inner.len());
        ptr::read_unaligned(self.inner.as_ptr().add(offset) as *const T)
    }

    pub fn from_cast<T: Copy>(
        cast: &'a T,
        index: Address,
    ) -> VolumeSlice<'a, u8> {
        let len = mem::size_of::<T>();
        let ptr = cast as *const T as *const u8;
        let slice = unsafe { slice::from_raw_parts(ptr, len) };
        VolumeSlice::new(slice, index)
    }
}

impl<'a, T: Clone> VolumeSlice<'a, T> {
    pub fn commit(self) -> Option<VolumeCommit<T>> {
        if self.is_mutated() {
            Some(VolumeCommit::new(self.inner.into_owned(), self.index))
        } else {
            None
        }
    }
}

impl<'a, T: Clone> AsRef<[T]> for VolumeSlice<'a, T> {
    fn as_ref(&self) -> &[T] {
        self.inner.as_ref()
    }
}

impl<'a, T: Clone> AsMut<[T]> for VolumeSlice<'a, T> {
    fn as_mut(&mut self) -> &mut [T] {
        self.inner.to_mut().as_mut()
    }
}

impl<'a, T: Clone> Deref for VolumeSlice<'a, T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.as_ref()
    }
}

impl<'a, T: Clone> DerefMut for VolumeSlice<'a, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut()
    }
}

pub struct VolumeCommit<T> {
    inner: Vec<T>,
    index: Address,
}

impl<T: Clone> VolumeCommit<T> {
    pub fn with_vec(inner: Vec<T>) -> VolumeCommit<T> {
        VolumeCommit {
            inner,
            index: Address::new(0, 0),
        }
    }
}

impl<T: Clone> VolumeCommit<T> {
    pub fn new(inner: Vec<T>, index: Address) -> VolumeCommit<T> {
        VolumeCommit { inner, index }
    }

    pub fn into_inner(self) -> Vec<T> {
        self.inner
    }

    pub fn address(&self) -> Address {
        self.index
    }
}

impl<T: Clone> AsRef<[T]> for VolumeCommit<T> {
    fn as_ref(&self) -> &[T] {
        self.inner.as_ref()
    }
}

impl<T: Clone> AsMut<[T]> for VolumeCommit<T> {
    fn as_mut(&mut self) -> &mut [T] {
        self.inner.as_mut()
    }
}

impl<T: Clone> Deref for VolumeCommit<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.as_ref()
    }
}

impl<T: Clone> DerefMut for VolumeCommit<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut()
    }
}

macro_rules! impl_slice {
    (@inner $volume:ty $( , $lt:lifetime )* ) => {
        impl<$( $lt, )* T: Clone> Volume<T> for $volume {
            type Error = Error;

            fn size(&self) -> Size {
                Size::Bounded(
                    Address::from(<Self as AsRef<[T]>>::as_ref(self).len())
                )
            }

            fn commit(
                &mut self,
                slice: Option<VolumeCommit<T>>,
            ) -> Result<(), Self::Error> {
                slice.map(|slice| {
                    let index = slice.address().into_index() as usize;
                    let end = index + slice.as_ref().len();
                    let dst =
                        &mut <Self as AsMut<[T]>>::as_mut(self)[index..end];
                    dst.clone_from_slice(slice.as_ref());
                });
                Ok(())
            }

            unsafe fn slice_unchecked<'a>(
                &'a self,
                range: Range<Address>,
            ) -> VolumeSlice<'a, T> {
                let index = range.start;
                let range = range.start.into_index() as usize
                    ..range.end.into_index() as usize;
                VolumeSlice::new(
                    <Self as AsRef<[T]>>::as_ref(self).get_unchecked(range),
                    index,
                )
            }

            fn slice<'a>(
                &'a self,
                range: Range<Address>,
            ) -> Result<VolumeSlice<'a, T>, Self::Error> {
                if self.size() >= range.end {
                    unsafe { Ok(self.slice_unchecked(range)) }
                } else {
                    Err(Error::AddressOutOfBounds(
                        range.end.block(),
                        range.end.offset(),
                    ))
                }
            }
        }
    };
    ($volume:ty) => {
        impl_slice!(@inner $volume);
    };
    ($volume:ty $( , $lt:lifetime )* ) => {
        impl_slice!(@inner $volume $( , $lt )* );
    };
}

impl_slice!(&'b mut [T], 'b);
impl_slice!(Vec<T>);
impl_slice!(Box<[T]>);

#[cfg(any(test, not(feature = "no_std")))]
mod file {
    use std::cell::RefCell;
    use std::fs::File;
    use std::io::{self, Read, Seek, SeekFrom, Write};
    use std::ops::Range;

    use alloc::vec;

    use crate::block::Address;

    use super::size::Size;
    use super::{Volume, VolumeCommit, VolumeSlice};

    impl Volume<u8> for RefCell<File> {
        type Error = io::Error;

        fn size(&self) -> Size {
            Size::Bounded(
                self.borrow()
                    .metadata()
                    .map(|data| Address::from(data.len()))
                    .unwrap_or(Address::new(0, 0)),
            )
        }

        fn commit(
            &mut self,
            slice: Option<VolumeCommit<u8>>,
        ) -> Result<(), Self::Error> {
            slice
                .map(|slice| {
                    let index = slice.address();
                    let mut refmut = self.borrow_mut();
                    refmut
                        .seek(SeekFrom::Start(index.into_index()))
                        .and_then(|_| refmut.write_all(slice.as_ref()))
                })
                .unwrap_or(Ok(()))
        }

        unsafe fn slice_unchecked<'a>(
            &'a self,
            range: Range<Address>,
        ) -> VolumeSlice<'a, u8> {
            let index = range.start;
            let len = (range.end - range.start).into_index() as usize;
            let mut vec = vec![0; len];
            let mut refmut = self.borrow_mut();
            refmut
                .seek(SeekFrom::Start(index.into_index()))
                .and_then(|_| refmut.read_exact(&mut vec[..]))
                .unwrap_or_else(|err| {
                    panic!("couldn't read from File Volume: {:?}", err)
                });
            VolumeSlice::new_owned(vec, index)
        }

        fn slice<'a>(
            &'a self,
            range: Range<Address>,
        ) -> Result<VolumeSlice<'a, u8>, Self::Error> {
            let index = range.start;
            let len = (range.end - range.start).into_index() as usize;
            let mut vec = vec![0; len];
            let mut refmut = self.borrow_mut();
            refmut
                .seek(SeekFrom::Start(index.into_index()))
                .and_then(|_| refmut.read_exact(&mut vec[..]))
                .map(move |_| VolumeSlice::new_owned(vec, index))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume() {
        let mut volume = vec![0; 8192];
        let commit = {
            let mut slice = volume
                .slice(Address::from(2048_u64)..Address::from(4096_u64))
                .unwrap();
            slice.iter_mut().for_each(|x| *x = 1);
            slice.commit()
        };
        assert!(volume.commit(commit).is_ok());

        for (i, &x) in volume.iter().enumerate() {
            if i < 2048 || i >= 4096 {
                assert_eq!(x, 0);
            } else {
                assert_eq!(x, 1);
            }
        }
    }

    #[test]
    fn cast() {
        let volume = vec![0xab_u8; 4096];
        let slice = volume
            .slice(Address::new(0, 0)..Address::new(0, 16))
            .unwrap();
        let (word, addr) = unsafe { slice.dynamic_cast::<u64>() };
        assert_eq!(word, 0xabab_abab_abab_abab);
        assert_eq!(addr, Address::new(0, 0));
    }
}
