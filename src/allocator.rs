//! Page allocator over the allocation table in the zero page.
//!
//! One byte per physical page, `PAGE_FREE` or `PAGE_USED`. Allocation is
//! first fit from page 0 upward; page 0 is marked used at initialization and
//! can never be freed, so it is never handed out.

use log::debug;

use crate::address::PhysicalPage;
use crate::constants::*;
use crate::error::{Error, Result};
use crate::memory::PhysicalMemory;

/// Allocate the lowest free physical page.
///
/// The page is zeroed before it is returned. `None` means every page is in
/// use; this is an ordinary outcome, not an error.
pub fn allocate_page(pm: &mut PhysicalMemory) -> Option<PhysicalPage> {
    let page = PhysicalPage::all().find(|&page| pm.alloc_flag(page) == PAGE_FREE)?;
    pm.set_alloc_flag(page, PAGE_USED);
    pm.clear_page(page);
    debug!("allocated physical page {}", page);
    Some(page)
}

/// Return `page` to the free pool.
pub fn free_page(pm: &mut PhysicalMemory, page: PhysicalPage) -> Result<()> {
    if page.is_reserved() {
        return Err(Error::ReservedPage(page));
    }
    if pm.alloc_flag(page) == PAGE_FREE {
        return Err(Error::DoubleFree(page));
    }
    pm.set_alloc_flag(page, PAGE_FREE);
    debug!("freed physical page {}", page);
    Ok(())
}

#[inline]
pub fn is_used(pm: &PhysicalMemory, page: PhysicalPage) -> bool {
    pm.alloc_flag(page) != PAGE_FREE
}

/// Number of used pages, the zero page included.
pub fn used_count(pm: &PhysicalMemory) -> usize {
    pm.alloc_table().iter().filter(|&&flag| flag != PAGE_FREE).count()
}

pub fn free_count(pm: &PhysicalMemory) -> usize {
    PAGE_COUNT - used_count(pm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::PhysicalAddress;

    fn pp(n: u32) -> PhysicalPage {
        PhysicalPage::new(n).unwrap()
    }

    #[test]
    fn test_fresh_memory_counts() {
        let pm = PhysicalMemory::new();
        assert_eq!(used_count(&pm), 1);
        assert_eq!(free_count(&pm), PAGE_COUNT - 1);
        assert!(is_used(&pm, PhysicalPage::RESERVED));
    }

    #[test]
    fn test_first_fit_ordering() {
        let mut pm = PhysicalMemory::new();
        // Pages 0, 1, 2 used
        assert_eq!(allocate_page(&mut pm), Some(pp(1)));
        assert_eq!(allocate_page(&mut pm), Some(pp(2)));
        assert_eq!(allocate_page(&mut pm), Some(pp(3)));
    }

    #[test]
    fn test_exhaustion_then_reuse() {
        let mut pm = PhysicalMemory::new();
        for expected in 1..PAGE_COUNT as u32 {
            assert_eq!(allocate_page(&mut pm), Some(pp(expected)));
        }
        assert_eq!(free_count(&pm), 0);
        assert_eq!(allocate_page(&mut pm), None);

        // Freeing one page makes exactly that page the next allocation
        free_page(&mut pm, pp(17)).unwrap();
        assert_eq!(allocate_page(&mut pm), Some(pp(17)));
        assert_eq!(allocate_page(&mut pm), None);
    }

    #[test]
    fn test_lowest_free_wins() {
        let mut pm = PhysicalMemory::new();
        for _ in 0..10 {
            allocate_page(&mut pm).unwrap();
        }
        free_page(&mut pm, pp(8)).unwrap();
        free_page(&mut pm, pp(3)).unwrap();
        assert_eq!(allocate_page(&mut pm), Some(pp(3)));
        assert_eq!(allocate_page(&mut pm), Some(pp(8)));
        assert_eq!(allocate_page(&mut pm), Some(pp(11)));
    }

    #[test]
    fn test_allocated_page_is_zeroed() {
        let mut pm = PhysicalMemory::new();
        let page = allocate_page(&mut pm).unwrap();
        pm.write_at(PhysicalAddress::new(page, 3), 0xAB);
        free_page(&mut pm, page).unwrap();

        let again = allocate_page(&mut pm).unwrap();
        assert_eq!(again, page);
        assert_eq!(pm.read(page.base() + 3), Some(0));
    }

    #[test]
    fn test_double_free_rejected() {
        let mut pm = PhysicalMemory::new();
        let page = allocate_page(&mut pm).unwrap();
        free_page(&mut pm, page).unwrap();
        assert!(matches!(free_page(&mut pm, page), Err(Error::DoubleFree(p)) if p == page));
        assert!(matches!(free_page(&mut pm, pp(40)), Err(Error::DoubleFree(_))));
    }

    #[test]
    fn test_reserved_page_cannot_be_freed() {
        let mut pm = PhysicalMemory::new();
        assert!(matches!(
            free_page(&mut pm, PhysicalPage::RESERVED),
            Err(Error::ReservedPage(_))
        ));
        assert!(is_used(&pm, PhysicalPage::RESERVED));
    }

    #[test]
    fn test_reserved_page_never_allocated() {
        let mut pm = PhysicalMemory::new();
        for _ in 0..2 {
            let mut pages = Vec::new();
            while let Some(page) = allocate_page(&mut pm) {
                assert_ne!(page, PhysicalPage::RESERVED);
                pages.push(page);
            }
            assert_eq!(pages.len(), PAGE_COUNT - 1);
            for page in pages {
                free_page(&mut pm, page).unwrap();
            }
        }
        assert_eq!(pm.alloc_flag(PhysicalPage::RESERVED), PAGE_USED);
        assert_eq!(used_count(&pm), 1);
    }
}
