use core::cmp::Ordering;
use core::fmt::{self, Display};

use crate::block::Address;

#[derive(Clone, Copy, Debug, Hash)]
pub enum Size {
    Unbounded,
    Bounded(Address),
}

impl Size {
    pub fn try_len(&self) -> Option<Address> {
        match *self {
            Size::Unbounded => None,
            Size::Bounded(n) => Some(n),
        }
    }

    pub unsafe fn len(&self) -> Address {
        match *self {
            Size::Unbounded => panic!(
                "attempt to convert `Size::Unbounded` to a concrete length"
            ),
            Size::Bounded(n) => n,
        }
    }

    pub fn is_bounded(&self) -> bool {
        match *self {
            Size::Unbounded => false,
            Size::Bounded(_) => true,
        }
    }
}

impl Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Size::Unbounded => write!(f, "Unbounded"),
            Size::Bounded(n) => write!(f, "Bounded({})", n),
        }
    }
}

impl PartialEq for Size {
    fn eq(&self, rhs: &Self) -> bool {
        match (self, rhs) {
            (&Size::Unbounded, _) => false,
            (_, &Size::Unbounded) => false,
            (&Size::Bounded(ref a), &Size::Bounded(ref b)) => a.eq(b),
        }
    }
}

impl PartialEq<Address> for Size {
    fn eq(&self, rhs: &Address) -> bool {
        match *self {
            Size::Unbounded => false,
            Size::Bounded(ref n) => n.eq(rhs),
        }
    }
}

impl PartialOrd for Size {
    fn partial_cmp(&self, rhs: &Self) -> Option<Ordering> {
        match (self, rhs) {
            (&Size::Unbounded, &Size::Unbounded) => None,
            (&Size::Unbounded, _) => Some(Ordering::Greater),
            (_, &Size::Unbounded) => Some(Ordering::Less),
            (&Size::Bounded(ref a), &Size::Bounded(ref b)) => {
                a.partial_cmp(b)
            }
        }
    }
}

impl PartialOrd<Address> for Size {
    fn partial_cmp(&self, rhs: &Address) -> Option<Ordering> {
        match *self {
            Size::Unbounded => Some(Ordering::Greater),
            Size::Bounded(ref n) => n.partial_cmp(rhs),
        }
    }
}
