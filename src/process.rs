//! Per-process page tables.
//!
//! A process owns one page-table page, recorded in its process-directory slot,
//! plus one data page per mapped virtual page. Entry `i` of the table holds
//! the physical page backing virtual page `i`, or `UNMAPPED`.

use log::{info, warn};

use crate::address::{PhysicalPage, ProcessId, VirtualPage};
use crate::allocator::{allocate_page, free_page, is_used};
use crate::constants::*;
use crate::error::{Error, PageKind, Result};
use crate::memory::PhysicalMemory;

/// Build a page table for `proc_id` with `page_count` freshly allocated data
/// pages mapped at virtual pages `0..page_count`.
///
/// On exhaustion every page taken by this call is released again and the
/// directory slot is cleared, so a failed creation leaves no trace.
pub fn create_process(
    pm: &mut PhysicalMemory,
    proc_id: ProcessId,
    page_count: usize,
) -> Result<PhysicalPage> {
    if page_count > PAGE_COUNT {
        return Err(Error::TooManyPages { requested: page_count, max: PAGE_COUNT });
    }
    if pm.directory_slot(proc_id) != UNMAPPED {
        return Err(Error::ProcessExists(proc_id));
    }

    let Some(table) = allocate_page(pm) else {
        warn!("out of memory allocating page table for proc {}", proc_id);
        return Err(Error::OutOfMemory { proc_id, kind: PageKind::PageTable });
    };
    pm.set_directory_slot(proc_id, table.get());

    for page in VirtualPage::all().take(page_count) {
        match allocate_page(pm) {
            Some(frame) => pm.set_page_table_entry(table, page, frame.get()),
            None => {
                warn!(
                    "out of memory allocating data page {} for proc {}, rolling back",
                    page, proc_id
                );
                release(pm, proc_id, table)?;
                return Err(Error::OutOfMemory { proc_id, kind: PageKind::DataPage });
            }
        }
    }

    info!("created proc {} with {} pages, page table at {}", proc_id, page_count, table);
    Ok(table)
}

/// Physical page holding the page table of `proc_id`.
pub fn lookup_table(pm: &PhysicalMemory, proc_id: ProcessId) -> Result<PhysicalPage> {
    match pm.directory_slot(proc_id) {
        UNMAPPED => Err(Error::UnknownProcess(proc_id)),
        slot => PhysicalPage::new(slot as u32),
    }
}

/// Free every data page of `proc_id`, then its page table, and forget the id.
///
/// Returns the number of pages released, the page table included.
pub fn destroy_process(pm: &mut PhysicalMemory, proc_id: ProcessId) -> Result<usize> {
    let table = lookup_table(pm, proc_id)?;
    let freed = release(pm, proc_id, table)?;
    info!("destroyed proc {}, released {} pages", proc_id, freed);
    Ok(freed)
}

/// Mapped entries of `proc_id`'s page table, in virtual page order.
pub fn page_table_entries(
    pm: &PhysicalMemory,
    proc_id: ProcessId,
) -> Result<Vec<(VirtualPage, PhysicalPage)>> {
    let table = lookup_table(pm, proc_id)?;
    let mut entries = Vec::new();
    for page in VirtualPage::all() {
        match pm.page_table_entry(table, page) {
            UNMAPPED => {}
            frame => entries.push((page, PhysicalPage::new(frame as u32)?)),
        }
    }
    Ok(entries)
}

/// Ids whose directory slot points at a page table.
pub fn live_processes(pm: &PhysicalMemory) -> impl Iterator<Item = ProcessId> + '_ {
    ProcessId::all().filter(|&proc_id| pm.directory_slot(proc_id) != UNMAPPED)
}

/// Tear down `table` and its data pages. Every page is checked before any is
/// freed, so an inconsistent table leaves memory untouched.
fn release(pm: &mut PhysicalMemory, proc_id: ProcessId, table: PhysicalPage) -> Result<usize> {
    let mut owned = vec![table];
    for page in VirtualPage::all() {
        let frame = pm.page_table_entry(table, page);
        if frame != UNMAPPED {
            owned.push(PhysicalPage::new(frame as u32)?);
        }
    }
    for (i, &page) in owned.iter().enumerate() {
        if !is_used(pm, page) || owned[..i].contains(&page) {
            return Err(Error::DoubleFree(page));
        }
    }

    for &page in &owned {
        free_page(pm, page)?;
    }
    pm.clear_page(table);
    pm.set_directory_slot(proc_id, UNMAPPED);
    Ok(owned.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{free_count, used_count};

    fn pid(n: u32) -> ProcessId {
        ProcessId::new(n).unwrap()
    }

    fn pp(n: u32) -> PhysicalPage {
        PhysicalPage::new(n).unwrap()
    }

    fn vp(n: u32) -> VirtualPage {
        VirtualPage::new(n).unwrap()
    }

    #[test]
    fn test_create_process_layout() {
        let mut pm = PhysicalMemory::new();
        let table = create_process(&mut pm, pid(1), 2).unwrap();

        // Page 0 is reserved, so the table lands on 1 and data on 2, 3
        assert_eq!(table, pp(1));
        assert_eq!(pm.directory_slot(pid(1)), 1);
        assert_eq!(pm.page_table_entry(table, vp(0)), 2);
        assert_eq!(pm.page_table_entry(table, vp(1)), 3);
        assert_eq!(pm.page_table_entry(table, vp(2)), UNMAPPED);
        assert_eq!(used_count(&pm), 4);
    }

    #[test]
    fn test_create_process_zero_pages() {
        let mut pm = PhysicalMemory::new();
        let table = create_process(&mut pm, pid(0), 0).unwrap();
        assert_eq!(lookup_table(&pm, pid(0)).unwrap(), table);
        assert!(page_table_entries(&pm, pid(0)).unwrap().is_empty());
        assert_eq!(used_count(&pm), 2);
    }

    #[test]
    fn test_create_existing_process_rejected() {
        let mut pm = PhysicalMemory::new();
        create_process(&mut pm, pid(3), 1).unwrap();
        let before = used_count(&pm);
        assert!(matches!(create_process(&mut pm, pid(3), 1), Err(Error::ProcessExists(_))));
        assert_eq!(used_count(&pm), before);
    }

    #[test]
    fn test_too_many_pages_rejected() {
        let mut pm = PhysicalMemory::new();
        assert!(matches!(
            create_process(&mut pm, pid(1), PAGE_COUNT + 1),
            Err(Error::TooManyPages { requested: 65, max: 64 })
        ));
        assert_eq!(used_count(&pm), 1);
    }

    #[test]
    fn test_lookup_unknown_process() {
        let pm = PhysicalMemory::new();
        assert!(matches!(lookup_table(&pm, pid(9)), Err(Error::UnknownProcess(p)) if p == pid(9)));
    }

    #[test]
    fn test_destroy_releases_exactly_its_pages() {
        let mut pm = PhysicalMemory::new();
        create_process(&mut pm, pid(1), 3).unwrap();
        let free_before = free_count(&pm);

        create_process(&mut pm, pid(2), 5).unwrap();
        assert_eq!(free_count(&pm), free_before - 6);

        assert_eq!(destroy_process(&mut pm, pid(2)).unwrap(), 6);
        assert_eq!(free_count(&pm), free_before);

        // Process 1 is untouched
        assert_eq!(page_table_entries(&pm, pid(1)).unwrap().len(), 3);
        for (_, frame) in page_table_entries(&pm, pid(1)).unwrap() {
            assert!(is_used(&pm, frame));
        }
    }

    #[test]
    fn test_destroy_clears_directory_slot() {
        let mut pm = PhysicalMemory::new();
        create_process(&mut pm, pid(4), 1).unwrap();
        destroy_process(&mut pm, pid(4)).unwrap();

        assert_eq!(pm.directory_slot(pid(4)), UNMAPPED);
        assert!(matches!(lookup_table(&pm, pid(4)), Err(Error::UnknownProcess(_))));
        assert!(matches!(destroy_process(&mut pm, pid(4)), Err(Error::UnknownProcess(_))));

        // The id can be reused
        create_process(&mut pm, pid(4), 2).unwrap();
        assert_eq!(page_table_entries(&pm, pid(4)).unwrap().len(), 2);
    }

    #[test]
    fn test_reused_table_page_has_no_stale_entries() {
        let mut pm = PhysicalMemory::new();
        create_process(&mut pm, pid(1), 4).unwrap();
        destroy_process(&mut pm, pid(1)).unwrap();

        create_process(&mut pm, pid(2), 1).unwrap();
        let entries = page_table_entries(&pm, pid(2)).unwrap();
        assert_eq!(entries, vec![(vp(0), pp(2))]);
    }

    #[test]
    fn test_page_table_exhaustion() {
        let mut pm = PhysicalMemory::new();
        // 63 usable pages: one process with 62 data pages leaves nothing
        create_process(&mut pm, pid(0), 62).unwrap();
        assert_eq!(free_count(&pm), 0);

        let err = create_process(&mut pm, pid(1), 0).unwrap_err();
        assert!(matches!(err, Error::OutOfMemory { kind: PageKind::PageTable, .. }));
        assert_eq!(err.to_string(), "OOM: proc 1: page table");
        assert_eq!(pm.directory_slot(pid(1)), UNMAPPED);
    }

    #[test]
    fn test_data_page_exhaustion_rolls_back() {
        let mut pm = PhysicalMemory::new();
        create_process(&mut pm, pid(0), 50).unwrap();
        let alloc_before = pm.alloc_table().to_vec();
        let dir_before = pm.directory().to_vec();

        // 12 pages free: table + 11 data pages fit, the 12th data page does not
        let err = create_process(&mut pm, pid(1), 12).unwrap_err();
        assert!(matches!(err, Error::OutOfMemory { kind: PageKind::DataPage, .. }));
        assert_eq!(err.to_string(), "OOM: proc 1: data page");

        assert_eq!(pm.alloc_table(), &alloc_before[..]);
        assert_eq!(pm.directory(), &dir_before[..]);

        // Smaller request still succeeds afterwards
        create_process(&mut pm, pid(1), 11).unwrap();
        assert_eq!(free_count(&pm), 0);
    }

    #[test]
    fn test_destroy_inconsistent_table_changes_nothing() {
        let mut pm = PhysicalMemory::new();
        let table = create_process(&mut pm, pid(1), 3).unwrap();
        create_process(&mut pm, pid(2), 1).unwrap();

        // Point the last entry at a page nobody owns
        pm.set_page_table_entry(table, vp(2), 40);
        let before = pm.clone();
        assert!(matches!(destroy_process(&mut pm, pid(1)), Err(Error::DoubleFree(p)) if p == pp(40)));
        assert_eq!(pm.data(), before.data());

        // Two entries sharing one page
        pm.set_page_table_entry(table, vp(2), 2);
        assert!(matches!(destroy_process(&mut pm, pid(1)), Err(Error::DoubleFree(p)) if p == pp(2)));
        assert_eq!(pm.alloc_table(), before.alloc_table());
        assert_eq!(lookup_table(&pm, pid(1)).unwrap(), table);

        // Once the entry is dropped the rest tears down normally
        pm.set_page_table_entry(table, vp(2), UNMAPPED);
        assert_eq!(destroy_process(&mut pm, pid(1)).unwrap(), 3);
        assert!(matches!(lookup_table(&pm, pid(1)), Err(Error::UnknownProcess(_))));
    }

    #[test]
    fn test_live_processes() {
        let mut pm = PhysicalMemory::new();
        create_process(&mut pm, pid(5), 1).unwrap();
        create_process(&mut pm, pid(2), 1).unwrap();
        create_process(&mut pm, pid(9), 0).unwrap();
        destroy_process(&mut pm, pid(9)).unwrap();

        let live: Vec<ProcessId> = live_processes(&pm).collect();
        assert_eq!(live, vec![pid(2), pid(5)]);
    }
}
