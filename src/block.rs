use core::fmt::{self, Debug, Display, LowerHex};
use core::ops::{Add, Sub};

/// Size of every on-disk block, fixed by the image format.
pub const BLOCK_SIZE: usize = 4096;
/// log_2(BLOCK_SIZE)
pub const LOG_BLOCK_SIZE: u32 = 12;

const OFFSET_MASK: u32 = (BLOCK_SIZE - 1) as u32;

/// Address of a byte on the volume, split into the number of the 4096-byte
/// block that holds it and the offset inside that block.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address {
    block: u32,
    offset: u32,
}

impl Address {
    pub unsafe fn new_unchecked(block: u32, offset: u32) -> Address {
        assert!((offset as usize) < BLOCK_SIZE, "offset out of block bounds");
        Address { block, offset }
    }

    pub fn new(block: u32, offset: i32) -> Address {
        let block = (block as i32 + (offset >> LOG_BLOCK_SIZE)) as u32;
        let offset = offset.abs() as u32 & OFFSET_MASK;
        unsafe { Address::new_unchecked(block, offset) }
    }

    pub fn into_index(&self) -> u64 {
        ((self.block as u64) << LOG_BLOCK_SIZE) + self.offset as u64
    }

    pub fn block(&self) -> u32 {
        self.block
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Address")
            .field("block", &self.block)
            .field("offset", &self.offset)
            .finish()
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.block, self.offset)
    }
}

impl LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:x}:{:x}", self.block, self.offset)
    }
}

impl From<u64> for Address {
    fn from(idx: u64) -> Address {
        let block = idx >> LOG_BLOCK_SIZE;
        let offset = idx & OFFSET_MASK as u64;
        Address::new(block as u32, offset as i32)
    }
}

impl From<usize> for Address {
    fn from(idx: usize) -> Address {
        let block = idx >> LOG_BLOCK_SIZE;
        let offset = idx & OFFSET_MASK as usize;
        Address::new(block as u32, offset as i32)
    }
}

impl Add for Address {
    type Output = Address;
    fn add(self, rhs: Address) -> Address {
        Address::new(
            self.block + rhs.block,
            (self.offset + rhs.offset) as i32,
        )
    }
}

impl Sub for Address {
    type Output = Address;
    fn sub(self, rhs: Address) -> Address {
        Address::new(
            self.block - rhs.block,
            self.offset as i32 - rhs.offset as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conv() {
        assert_eq!(Address::new(0, 4096).into_index(), 4096);
        assert_eq!(Address::from(4096_u64).into_index(), 4096);
        assert_eq!(Address::from(10240_usize).into_index(), 10240);
        assert_eq!(Address::new(2, 0).into_index(), 8192);
    }

    #[test]
    fn arithmetic() {
        assert_eq!(Address::new(0, 4096), Address::new(1, 0));
        assert_eq!(Address::new(2, -2048), Address::new(1, 2048));

        let a = Address::new(0, 2048);
        let b = Address::new(0, 2048);
        assert_eq!(a + b, Address::new(1, 0));
        assert_eq!((a + b).into_index(), 4096);

        let a = Address::new(0, 8192);
        let b = Address::new(0, 2048);
        assert_eq!(a - b, Address::new(1, 2048));
        assert_eq!((a - b).into_index(), 8192 - 2048);
    }
}
