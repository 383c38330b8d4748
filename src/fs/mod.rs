use core::mem;

use alloc::vec::Vec;

use crate::block::{Address, BLOCK_SIZE};
use crate::error::Error;
use crate::sys::dir::{DirRecord, RECORDS_PER_BLOCK};
use crate::sys::inode::{FileMode, Inode, Timestamp, ROOT_INODE};
use crate::sys::superblock::{Superblock, INODE_STORE_BLOCK, MAX_OBJECTS};
use crate::volume::{Volume, VolumeCommit, VolumeSlice};

pub mod mkfs;
pub mod sync;

pub(crate) struct Struct<T> {
    pub inner: T,
    pub offset: Address,
}

impl<T> From<(T, Address)> for Struct<T> {
    #[inline]
    fn from((inner, offset): (T, Address)) -> Struct<T> {
        Struct { inner, offset }
    }
}

/// Safe wrapper for the raw on-disk structures of a mounted image.
///
/// The superblock is pinned in memory for the lifetime of the mount;
/// every mutation updates the pinned copy and writes block 0 back.
pub struct Assoofs<V: Volume<u8>> {
    pub(crate) volume: V,
    pub(crate) superblock: Struct<Superblock>,
}

impl<V: Volume<u8>> Assoofs<V> {
    /// Mount: validate block 0, then check the root directory inode is in
    /// place.
    pub fn new(volume: V) -> Result<Assoofs<V>, Error> {
        let superblock = unsafe { Struct::from(Superblock::find(&volume)?) };
        let fs = Assoofs { volume, superblock };
        let root = fs.inode(ROOT_INODE)?;
        if !root.is_dir() {
            return Err(Error::NotADirectory(ROOT_INODE));
        }
        Ok(fs)
    }

    /// Borrow block `n` of the volume.
    fn block(&self, n: u32) -> Result<VolumeSlice<u8>, Error> {
        let offset = Address::new(n, 0);
        let end = Address::new(n + 1, 0);
        self.volume.slice(offset..end).map_err(Into::into)
    }

    /// Write the pinned superblock back to block 0.
    pub fn sync_superblock(&mut self) -> Result<(), Error> {
        let commit = {
            let slice = VolumeSlice::from_cast(
                &self.superblock.inner,
                self.superblock.offset,
            );
            VolumeCommit::new(slice.to_vec(), slice.address())
        };
        self.volume.commit(Some(commit)).map_err(Into::into)
    }

    /// Fetch an owned copy of inode `inode_no` from the store.
    pub fn inode(&self, inode_no: u64) -> Result<Inode, Error> {
        let count = self.superblock.inner.inodes_count as usize;
        let store = self.block(INODE_STORE_BLOCK)?;
        for i in 0..count {
            let record: Inode =
                unsafe { store.dynamic_cast_at(i * mem::size_of::<Inode>()) };
            if record.inode_no == inode_no {
                return Ok(record);
            }
        }
        Err(Error::InodeNotFound(inode_no))
    }

    /// Append `record` after the last live store entry and bump the count.
    /// Persists the store block and the superblock.
    pub fn append_inode(&mut self, record: Inode) -> Result<(), Error> {
        let count = self.superblock.inner.inodes_count;
        if count >= MAX_OBJECTS {
            return Err(Error::InodeStoreFull);
        }
        let commit = {
            let mut store = self.block(INODE_STORE_BLOCK)?;
            let offset = count as usize * mem::size_of::<Inode>();
            store.as_mut()[offset..offset + mem::size_of::<Inode>()]
                .copy_from_slice(record.as_bytes());
            store.commit()
        };
        self.volume.commit(commit).map_err(Into::into)?;
        self.superblock.inner.inodes_count = count + 1;
        self.sync_superblock()
    }

    /// Copy `record` over the live store entry with the same number.
    pub fn save_inode(&mut self, record: &Inode) -> Result<(), Error> {
        let count = self.superblock.inner.inodes_count as usize;
        let commit = {
            let mut store = self.block(INODE_STORE_BLOCK)?;
            let mut found = None;
            for i in 0..count {
                let offset = i * mem::size_of::<Inode>();
                let current: Inode =
                    unsafe { store.dynamic_cast_at(offset) };
                if current.inode_no == record.inode_no {
                    found = Some(offset);
                    break;
                }
            }
            let offset =
                found.ok_or(Error::InodeNotFound(record.inode_no))?;
            store.as_mut()[offset..offset + mem::size_of::<Inode>()]
                .copy_from_slice(record.as_bytes());
            store.commit()
        };
        self.volume.commit(commit).map_err(Into::into)
    }

    /// Drop inode `inode_no` from the store: compact the array over it,
    /// return its data block to the bitmap. The caller owns any directory
    /// record still naming the inode.
    pub fn remove_inode(&mut self, inode_no: u64) -> Result<(), Error> {
        let count = self.superblock.inner.inodes_count as usize;
        let record_size = mem::size_of::<Inode>();
        let (commit, data_block) = {
            let mut store = self.block(INODE_STORE_BLOCK)?;
            let mut found = None;
            for i in 0..count {
                let record: Inode =
                    unsafe { store.dynamic_cast_at(i * record_size) };
                if record.inode_no == inode_no {
                    found = Some((i, record.data_block_number));
                    break;
                }
            }
            let (index, data_block) =
                found.ok_or(Error::InodeNotFound(inode_no))?;
            let bytes = store.as_mut();
            bytes.copy_within(
                (index + 1) * record_size..count * record_size,
                index * record_size,
            );
            bytes[(count - 1) * record_size..count * record_size].fill(0);
            (store.commit(), data_block)
        };
        self.volume.commit(commit).map_err(Into::into)?;
        self.superblock.inner.inodes_count -= 1;
        self.superblock.inner.release_block(data_block as u32);
        self.sync_superblock()
    }

    /// Claim a free data block and persist the bitmap.
    pub fn allocate_block(&mut self) -> Result<u32, Error> {
        let block = self.superblock.inner.allocate_block()?;
        self.sync_superblock()?;
        Ok(block)
    }

    /// Return a data block to the bitmap and persist it.
    pub fn release_block(&mut self, block: u32) -> Result<(), Error> {
        self.superblock.inner.release_block(block);
        self.sync_superblock()
    }

    /// Find `name` among the live records of `dir`'s data block. First
    /// match wins.
    pub fn dir_lookup(&self, dir: &Inode, name: &[u8]) -> Result<u64, Error> {
        if !dir.is_dir() {
            return Err(Error::NotADirectory(dir.inode_no));
        }
        let block = self.block(dir.data_block_number as u32)?;
        for i in 0..dir.dir_children_count() as usize {
            let record: DirRecord = unsafe {
                block.dynamic_cast_at(i * mem::size_of::<DirRecord>())
            };
            if record.name_matches(name) {
                return Ok({ record.inode_no });
            }
        }
        Err(Error::NotFound)
    }

    /// All live records of `dir`'s data block, in creation order.
    pub fn dir_entries(&self, dir: &Inode) -> Result<Vec<DirRecord>, Error> {
        if !dir.is_dir() {
            return Err(Error::NotADirectory(dir.inode_no));
        }
        let block = self.block(dir.data_block_number as u32)?;
        let mut records = Vec::with_capacity(dir.dir_children_count() as usize);
        for i in 0..dir.dir_children_count() as usize {
            records.push(unsafe {
                block.dynamic_cast_at(i * mem::size_of::<DirRecord>())
            });
        }
        Ok(records)
    }

    /// Write `record` at index `dir_children_count` of `dir`'s data block.
    /// The caller is responsible for bumping the count and saving `dir`
    /// afterwards.
    pub fn dir_append(
        &mut self,
        dir: &Inode,
        record: &DirRecord,
    ) -> Result<(), Error> {
        if !dir.is_dir() {
            return Err(Error::NotADirectory(dir.inode_no));
        }
        let index = dir.dir_children_count() as usize;
        if index >= RECORDS_PER_BLOCK {
            return Err(Error::DirectoryFull(dir.inode_no));
        }
        let commit = {
            let mut block = self.block(dir.data_block_number as u32)?;
            let offset = index * mem::size_of::<DirRecord>();
            block.as_mut()[offset..offset + mem::size_of::<DirRecord>()]
                .copy_from_slice(record.as_bytes());
            block.commit()
        };
        self.volume.commit(commit).map_err(Into::into)
    }

    /// Read from `inode`'s data block starting at `*pos`, at most
    /// `buf.len()` bytes and never past the end of the file. Returns the
    /// byte count and advances `*pos` by it; a position at or past the end
    /// of the file reads nothing.
    pub fn read(
        &self,
        inode: &Inode,
        pos: &mut u64,
        buf: &mut [u8],
    ) -> Result<usize, Error> {
        let size = inode.file_size();
        if *pos >= size {
            return Ok(0);
        }
        let block = self.block(inode.data_block_number as u32)?;
        let start = *pos as usize;
        let left = (size - *pos) as usize;
        let nbytes = left.min(buf.len());
        buf[..nbytes].copy_from_slice(&block[start..start + nbytes]);
        *pos += nbytes as u64;
        Ok(nbytes)
    }

    /// Write `buf` into `inode`'s data block at `*pos`, then persist the
    /// grown `file_size` through the store. A write that would cross the
    /// block boundary is refused and reports zero bytes.
    pub fn write(
        &mut self,
        inode: &mut Inode,
        pos: &mut u64,
        buf: &[u8],
    ) -> Result<usize, Error> {
        if *pos as usize + buf.len() >= BLOCK_SIZE {
            return Ok(0);
        }
        let commit = {
            let mut block = self.block(inode.data_block_number as u32)?;
            let start = *pos as usize;
            block.as_mut()[start..start + buf.len()].copy_from_slice(buf);
            block.commit()
        };
        self.volume.commit(commit).map_err(Into::into)?;
        *pos += buf.len() as u64;
        inode.set_file_size(*pos);
        self.save_inode(inode)?;
        Ok(buf.len())
    }

    /// Create a file or directory named `name` under `parent`.
    ///
    /// Persistence order: data block claimed first, then the inode
    /// appended, then the parent's directory record, then the parent's
    /// grown child count. A crash between any two steps leaves at worst an
    /// unreferenced inode or block, never a dangling directory entry.
    pub fn create(
        &mut self,
        parent: &mut Inode,
        name: &[u8],
        mode: FileMode,
        time: Timestamp,
    ) -> Result<Inode, Error> {
        if !parent.is_dir() {
            return Err(Error::NotADirectory(parent.inode_no));
        }
        let count = self.superblock.inner.inodes_count;
        if count >= MAX_OBJECTS {
            return Err(Error::InodeStoreFull);
        }
        if !mode.is_dir() && !mode.is_regular() {
            return Err(Error::UnsupportedMode(mode.bits()));
        }
        if parent.dir_children_count() as usize >= RECORDS_PER_BLOCK {
            return Err(Error::DirectoryFull(parent.inode_no));
        }
        let inode_no = count + 1;
        let record = DirRecord::new(name, inode_no)?;

        let data_block = self.superblock.inner.allocate_block()?;
        self.sync_superblock()?;

        let inode = Inode::new(mode, inode_no, data_block as u64, time);
        self.append_inode(inode)?;

        self.dir_append(parent, &record)?;
        parent.set_dir_children_count(parent.dir_children_count() + 1);
        self.save_inode(parent)?;

        Ok(inode)
    }

    /// `create` with the directory bit forced on.
    pub fn mkdir(
        &mut self,
        parent: &mut Inode,
        name: &[u8],
        mode: FileMode,
        time: Timestamp,
    ) -> Result<Inode, Error> {
        self.create(parent, name, mode | FileMode::DIRECTORY, time)
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock.inner
    }

    pub fn version(&self) -> u64 {
        self.superblock.inner.version
    }

    pub fn block_size(&self) -> usize {
        self.superblock.inner.block_size as usize
    }

    pub fn inodes_count(&self) -> u64 {
        self.superblock.inner.inodes_count
    }

    pub fn free_block_count(&self) -> u32 {
        self.superblock.inner.free_block_count()
    }
}
