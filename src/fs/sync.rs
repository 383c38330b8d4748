use core::fmt::{self, Debug};
use core::mem;

use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::{Mutex, MutexGuard};

use crate::error::Error;
use crate::sys::dir::DirRecord;
use crate::sys::inode::{
    FileMode, Inode as RawInode, Timestamp, ROOT_INODE,
};
use crate::volume::Volume;

use super::Assoofs;

/// Mount handle, shared with every inode handed to the host.
///
/// Two locks guard the core: the fs lock covers the pinned superblock and
/// the device, the store lock serialises inode-store rewrites. They are
/// always taken in that order. Acquisition never blocks; a contended lock
/// surfaces as `Error::LockInterrupted` with nothing changed.
pub struct Synced<T> {
    inner: Arc<Shared<T>>,
}

struct Shared<T> {
    fs: Mutex<T>,
    inode_store: Mutex<()>,
}

impl<T> Synced<T> {
    pub fn with_inner(inner: T) -> Synced<T> {
        Synced {
            inner: Arc::new(Shared {
                fs: Mutex::new(inner),
                inode_store: Mutex::new(()),
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<T>, Error> {
        self.inner.fs.try_lock().ok_or(Error::LockInterrupted)
    }

    fn lock_store(&self) -> Result<MutexGuard<()>, Error> {
        self.inner
            .inode_store
            .try_lock()
            .ok_or(Error::LockInterrupted)
    }
}

impl<T> Clone for Synced<T> {
    fn clone(&self) -> Self {
        Synced {
            inner: self.inner.clone(),
        }
    }
}

impl<V: Volume<u8>> Synced<Assoofs<V>> {
    /// Mount `volume`.
    pub fn new(volume: V) -> Result<Synced<Assoofs<V>>, Error> {
        Assoofs::new(volume).map(Synced::with_inner)
    }

    pub fn root_inode(&self) -> Result<Inode<V>, Error> {
        self.inode_nth(ROOT_INODE)
    }

    /// Materialise a handle for inode `inode_no`. Both locks are held to
    /// walk the store and dropped before the handle is built.
    pub fn inode_nth(&self, inode_no: u64) -> Result<Inode<V>, Error> {
        let raw = {
            let fs = self.lock()?;
            let _store = self.lock_store()?;
            fs.inode(inode_no)?
        };
        Ok(Inode::new(self.clone(), raw))
    }

    /// Resolve `name` under `parent` to a fresh inode handle.
    pub fn lookup(
        &self,
        parent: &Inode<V>,
        name: &[u8],
    ) -> Result<Inode<V>, Error> {
        let raw = {
            let fs = self.lock()?;
            let inode_no = fs.dir_lookup(&parent.inner, name)?;
            let _store = self.lock_store()?;
            fs.inode(inode_no)?
        };
        Ok(Inode::new(self.clone(), raw))
    }

    /// Create a regular file or directory under `parent`.
    pub fn create(
        &self,
        parent: &mut Inode<V>,
        name: &[u8],
        mode: FileMode,
    ) -> Result<Inode<V>, Error> {
        let raw = {
            let mut fs = self.lock()?;
            let _store = self.lock_store()?;
            fs.create(&mut parent.inner, name, mode, Timestamp::now())?
        };
        Ok(Inode::new(self.clone(), raw))
    }

    /// `create` with the directory bit forced on.
    pub fn mkdir(
        &self,
        parent: &mut Inode<V>,
        name: &[u8],
        mode: FileMode,
    ) -> Result<Inode<V>, Error> {
        self.create(parent, name, mode | FileMode::DIRECTORY)
    }

    /// Emit all of `dir`'s children on the first call of a cursor; later
    /// calls with the advanced cursor emit nothing.
    pub fn iterate(
        &self,
        dir: &Inode<V>,
        ctx: &mut DirContext,
    ) -> Result<Vec<DirectoryEntry>, Error> {
        if !dir.is_dir() {
            return Err(Error::NotADirectory(dir.inode_no()));
        }
        if ctx.pos != 0 {
            return Ok(Vec::new());
        }
        let records = {
            let fs = self.lock()?;
            fs.dir_entries(&dir.inner)?
        };
        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            entries.push(DirectoryEntry {
                name: record.name().to_vec(),
                inode_no: { record.inode_no },
            });
            ctx.pos += mem::size_of::<DirRecord>() as u64;
        }
        Ok(entries)
    }

    pub fn read(
        &self,
        file: &Inode<V>,
        pos: &mut u64,
        buf: &mut [u8],
    ) -> Result<usize, Error> {
        let fs = self.lock()?;
        fs.read(&file.inner, pos, buf)
    }

    /// Write through the handle; the grown file size is saved to the
    /// store under both locks.
    pub fn write(
        &self,
        file: &mut Inode<V>,
        pos: &mut u64,
        buf: &[u8],
    ) -> Result<usize, Error> {
        let mut fs = self.lock()?;
        let _store = self.lock_store()?;
        fs.write(&mut file.inner, pos, buf)
    }

    pub fn version(&self) -> u64 {
        self.inner.fs.lock().version()
    }

    pub fn block_size(&self) -> usize {
        self.inner.fs.lock().block_size()
    }

    pub fn inodes_count(&self) -> u64 {
        self.inner.fs.lock().inodes_count()
    }

    pub fn free_block_count(&self) -> u32 {
        self.inner.fs.lock().free_block_count()
    }
}

impl<V: Volume<u8>> Debug for Synced<Assoofs<V>> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Synced<Assoofs>")
    }
}

/// Readdir cursor. A fresh cursor emits everything at once; an advanced
/// one is exhausted.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirContext {
    pub pos: u64,
}

impl DirContext {
    pub fn new() -> DirContext {
        DirContext { pos: 0 }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DirectoryEntry {
    pub name: Vec<u8>,
    pub inode_no: u64,
}

/// Host-side inode: an owned copy of the on-disk record plus the mount it
/// came from, so it outlives any device buffer.
pub struct Inode<V: Volume<u8>> {
    fs: Synced<Assoofs<V>>,
    pub(crate) inner: RawInode,
}

impl<V: Volume<u8>> Clone for Inode<V> {
    fn clone(&self) -> Self {
        Inode {
            fs: self.fs.clone(),
            inner: self.inner,
        }
    }
}

impl<V: Volume<u8>> Debug for Inode<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Debug::fmt(&self.inner, f)
    }
}

impl<V: Volume<u8>> Inode<V> {
    pub fn new(fs: Synced<Assoofs<V>>, inner: RawInode) -> Inode<V> {
        Inode { fs, inner }
    }

    pub fn inode_no(&self) -> u64 {
        self.inner.inode_no
    }

    pub fn mode(&self) -> FileMode {
        self.inner.mode()
    }

    pub fn is_dir(&self) -> bool {
        self.inner.is_dir()
    }

    pub fn is_regular(&self) -> bool {
        self.inner.is_regular()
    }

    pub fn file_size(&self) -> u64 {
        self.inner.file_size()
    }

    pub fn dir_children_count(&self) -> u64 {
        self.inner.dir_children_count()
    }

    pub fn data_block(&self) -> u64 {
        self.inner.data_block_number
    }

    pub fn time(&self) -> Timestamp {
        self.inner.time
    }

    pub fn lookup(&self, name: &[u8]) -> Result<Inode<V>, Error> {
        self.fs.lookup(self, name)
    }

    pub fn create(
        &mut self,
        name: &[u8],
        mode: FileMode,
    ) -> Result<Inode<V>, Error> {
        let fs = self.fs.clone();
        fs.create(self, name, mode)
    }

    pub fn mkdir(
        &mut self,
        name: &[u8],
        mode: FileMode,
    ) -> Result<Inode<V>, Error> {
        let fs = self.fs.clone();
        fs.mkdir(self, name, mode)
    }

    pub fn iterate(
        &self,
        ctx: &mut DirContext,
    ) -> Result<Vec<DirectoryEntry>, Error> {
        self.fs.iterate(self, ctx)
    }

    pub fn read(&self, pos: &mut u64, buf: &mut [u8]) -> Result<usize, Error> {
        self.fs.read(self, pos, buf)
    }

    pub fn write(&mut self, pos: &mut u64, buf: &[u8]) -> Result<usize, Error> {
        let fs = self.fs.clone();
        fs.write(self, pos, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::super::mkfs;
    use super::*;
    use crate::sys::dir::FILENAME_MAX_LENGTH;

    fn mounted(welcome: bool) -> Synced<Assoofs<Vec<u8>>> {
        Synced::new(mkfs::build_image(welcome, Timestamp::zero())).unwrap()
    }

    fn file_mode() -> FileMode {
        FileMode::REGULAR | FileMode::U_READ | FileMode::U_WRITE
    }

    #[test]
    fn mount_and_walk_welcome() {
        let fs = mounted(true);
        assert_eq!(fs.inodes_count(), 2);
        assert_eq!(fs.block_size(), 4096);
        assert_eq!(fs.version(), 1);

        let root = fs.root_inode().unwrap();
        assert!(root.is_dir());
        assert_eq!(root.dir_children_count(), 1);

        let welcome = root.lookup(mkfs::WELCOME_FILENAME).unwrap();
        assert!(welcome.is_regular());

        let mut buf = [0_u8; 64];
        let mut pos = 0;
        let n = welcome.read(&mut pos, &mut buf).unwrap();
        assert_eq!(&buf[..n], mkfs::WELCOME_CONTENT);
    }

    #[test]
    fn lookup_miss() {
        let fs = mounted(false);
        let root = fs.root_inode().unwrap();
        assert!(matches!(
            root.lookup(b"nope").err(),
            Some(Error::NotFound)
        ));
    }

    #[test]
    fn create_then_lookup() {
        let fs = mounted(false);
        let mut root = fs.root_inode().unwrap();

        let mode = file_mode();
        let created = root.create(b"notes.txt", mode).unwrap();
        let found = root.lookup(b"notes.txt").unwrap();
        assert_eq!(found.inode_no(), created.inode_no());
        assert_eq!(found.mode(), mode);
        assert!(found.is_regular());
    }

    #[test]
    fn write_read_roundtrip() {
        let fs = mounted(false);
        let mut root = fs.root_inode().unwrap();
        let mut file = root.create(b"data", file_mode()).unwrap();

        let mut pos = 0;
        assert_eq!(file.write(&mut pos, b"hello").unwrap(), 5);
        assert_eq!(file.file_size(), 5);

        let mut buf = [0_u8; 5];
        let mut pos = 0;
        assert_eq!(file.read(&mut pos, &mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn iterate_two_phase() {
        let fs = mounted(true);
        let root = fs.root_inode().unwrap();

        let mut ctx = DirContext::new();
        let entries = root.iterate(&mut ctx).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, mkfs::WELCOME_FILENAME);
        assert_eq!(entries[0].inode_no, mkfs::WELCOME_INODE);
        assert_eq!(ctx.pos, mem::size_of::<DirRecord>() as u64);

        // an advanced cursor is exhausted
        assert_eq!(root.iterate(&mut ctx).unwrap().len(), 0);
    }

    #[test]
    fn iterate_empty_root() {
        let fs = mounted(false);
        let root = fs.root_inode().unwrap();
        let mut ctx = DirContext::new();
        assert_eq!(root.iterate(&mut ctx).unwrap().len(), 0);
        assert_eq!(ctx.pos, 0);
    }

    #[test]
    fn iterate_non_directory() {
        let fs = mounted(true);
        let root = fs.root_inode().unwrap();
        let welcome = root.lookup(mkfs::WELCOME_FILENAME).unwrap();
        let mut ctx = DirContext::new();
        assert_eq!(
            welcome.iterate(&mut ctx).err(),
            Some(Error::NotADirectory(welcome.inode_no())),
        );
    }

    #[test]
    fn nested_directories() {
        let fs = mounted(false);
        let mut root = fs.root_inode().unwrap();
        let mut sub = root
            .mkdir(b"sub", FileMode::U_READ | FileMode::U_EXEC)
            .unwrap();
        let mut leaf = sub.create(b"leaf", file_mode()).unwrap();

        let mut pos = 0;
        leaf.write(&mut pos, b"deep").unwrap();

        let found = fs
            .root_inode()
            .unwrap()
            .lookup(b"sub")
            .unwrap()
            .lookup(b"leaf")
            .unwrap();
        let mut buf = [0_u8; 4];
        let mut pos = 0;
        found.read(&mut pos, &mut buf).unwrap();
        assert_eq!(&buf, b"deep");
    }

    #[test]
    fn long_name_refused() {
        let fs = mounted(false);
        let mut root = fs.root_inode().unwrap();
        let name = [b'n'; FILENAME_MAX_LENGTH];
        assert_eq!(
            root.create(&name, file_mode()).err(),
            Some(Error::NameTooLong(FILENAME_MAX_LENGTH)),
        );
    }

    #[test]
    fn contended_fs_lock() {
        let fs = mounted(false);
        let mut root = fs.root_inode().unwrap();
        let _guard = fs.inner.fs.try_lock().unwrap();
        assert_eq!(
            root.create(b"foo", file_mode()).err(),
            Some(Error::LockInterrupted),
        );
        assert_eq!(
            root.lookup(b"foo").err(),
            Some(Error::LockInterrupted),
        );
    }

    #[test]
    fn contended_store_lock() {
        let fs = mounted(false);
        let mut root = fs.root_inode().unwrap();
        let _guard = fs.inner.inode_store.try_lock().unwrap();
        assert_eq!(
            root.create(b"foo", file_mode()).err(),
            Some(Error::LockInterrupted),
        );
        // reads that never touch the store still go through
        let mut ctx = DirContext::new();
        assert!(root.iterate(&mut ctx).is_ok());
    }
}
