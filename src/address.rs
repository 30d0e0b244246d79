use std::fmt;

use crate::constants::*;
use crate::error::{Error, Result};

/// Combine a page number and an offset into a linear address.
///
/// No validation: the caller must keep `offset < PAGE_SIZE`.
#[inline]
pub fn make_address(page: u32, offset: u32) -> u32 {
    (page << PAGE_SHIFT) | offset
}

/// Inverse of [`make_address`].
#[inline]
pub fn split_address(address: u32) -> (u32, u32) {
    (address >> PAGE_SHIFT, address & OFFSET_MASK)
}

macro_rules! page_number {
    ($(#[$meta:meta])* $name:ident, $err:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u8);

        impl $name {
            pub fn new(raw: u32) -> Result<Self> {
                if (raw as usize) < PAGE_COUNT {
                    Ok($name(raw as u8))
                } else {
                    Err(Error::$err(raw))
                }
            }

            #[inline]
            pub fn get(self) -> u8 {
                self.0
            }

            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// All values of this type, ascending.
            pub fn all() -> impl Iterator<Item = Self> {
                (0..PAGE_COUNT).map(|i| $name(i as u8))
            }
        }

        impl TryFrom<u32> for $name {
            type Error = Error;

            fn try_from(raw: u32) -> Result<Self> {
                Self::new(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

page_number!(
    /// Process identifier; doubles as the index of its process-directory slot.
    ProcessId,
    InvalidProcessId
);
page_number!(
    /// Index into a process's page table.
    VirtualPage,
    InvalidVirtualPage
);
page_number!(
    /// Index of a page in physical memory.
    PhysicalPage,
    InvalidPhysicalPage
);

impl PhysicalPage {
    /// Page 0 holds the allocation table and process directory.
    pub const RESERVED: PhysicalPage = PhysicalPage(RESERVED_PAGE);

    #[inline]
    pub fn is_reserved(self) -> bool {
        self == Self::RESERVED
    }

    /// First byte of this page in physical memory.
    #[inline]
    pub fn base(self) -> usize {
        make_address(self.0 as u32, 0) as usize
    }
}

/// Address in a process's virtual space, decomposed into page and offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualAddress {
    raw: u32,
    page: VirtualPage,
    offset: u32,
}

impl VirtualAddress {
    pub fn new(raw: u32) -> Result<Self> {
        let (page, offset) = split_address(raw);
        let page = VirtualPage::new(page).map_err(|_| Error::InvalidVirtualAddress(raw))?;
        Ok(VirtualAddress { raw, page, offset })
    }

    /// Rejects an offset that would spill into the next page.
    pub fn from_parts(page: VirtualPage, offset: u32) -> Result<Self> {
        let raw = make_address(page.get() as u32, offset);
        if offset as usize >= PAGE_SIZE {
            return Err(Error::InvalidVirtualAddress(raw));
        }
        Ok(VirtualAddress { raw, page, offset })
    }

    #[inline]
    pub fn raw(&self) -> u32 {
        self.raw
    }

    #[inline]
    pub fn page(&self) -> VirtualPage {
        self.page
    }

    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// A byte index into physical memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalAddress {
    page: PhysicalPage,
    offset: u32,
}

impl PhysicalAddress {
    /// Only built from a validated offset: a `VirtualAddress` or a test.
    pub(crate) fn new(page: PhysicalPage, offset: u32) -> Self {
        PhysicalAddress { page, offset: offset & OFFSET_MASK }
    }

    #[inline]
    pub fn page(&self) -> PhysicalPage {
        self.page
    }

    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    #[inline]
    pub fn raw(&self) -> u32 {
        make_address(self.page.get() as u32, self.offset)
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.raw() as usize
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw())
    }
}
