#![cfg(test)]
//! Property tests for the paging engine: load/store round trips, isolation
//! between processes, and page accounting across create/destroy.

use std::collections::BTreeSet;

use proptest::prelude::*;

use crate::address::{ProcessId, VirtualAddress, VirtualPage};
use crate::allocator::{free_count, used_count};
use crate::constants::*;
use crate::memory::PhysicalMemory;
use crate::process::{create_process, destroy_process, live_processes, page_table_entries};
use crate::translation::{load, store};

fn pid(n: u32) -> ProcessId {
    ProcessId::new(n).unwrap()
}

/// Every used page except the zero page is owned by exactly one live process.
fn assert_ownership(pm: &PhysicalMemory) {
    let mut owned = BTreeSet::new();
    for proc_id in live_processes(pm) {
        let table = crate::process::lookup_table(pm, proc_id).unwrap();
        assert!(owned.insert(table.get()), "page {} owned twice", table);
        for (_, frame) in page_table_entries(pm, proc_id).unwrap() {
            assert!(owned.insert(frame.get()), "page {} owned twice", frame);
        }
    }
    assert_eq!(owned.len() + 1, used_count(pm));
}

proptest! {
    #[test]
    fn store_then_load_roundtrip(
        page_count in 1usize..=20,
        page in 0u32..20,
        offset in 0u32..PAGE_SIZE as u32,
        value in any::<u8>(),
    ) {
        prop_assume!((page as usize) < page_count);
        let mut pm = PhysicalMemory::new();
        create_process(&mut pm, pid(1), page_count).unwrap();

        let va = VirtualAddress::from_parts(VirtualPage::new(page).unwrap(), offset).unwrap();
        store(&mut pm, pid(1), va, value).unwrap();
        prop_assert_eq!(load(&pm, pid(1), va).unwrap().value, value);
    }

    #[test]
    fn processes_are_isolated(
        a_pages in 1usize..=20,
        b_pages in 1usize..=20,
        writes in proptest::collection::vec((0u32..20, 0u32..PAGE_SIZE as u32, any::<u8>()), 1..32),
    ) {
        let mut pm = PhysicalMemory::new();
        create_process(&mut pm, pid(1), a_pages).unwrap();
        create_process(&mut pm, pid(2), b_pages).unwrap();

        let a_frames: BTreeSet<u8> =
            page_table_entries(&pm, pid(1)).unwrap().iter().map(|(_, f)| f.get()).collect();
        let b_frames: BTreeSet<u8> =
            page_table_entries(&pm, pid(2)).unwrap().iter().map(|(_, f)| f.get()).collect();
        prop_assert!(a_frames.is_disjoint(&b_frames));

        let b_before: Vec<u8> = b_frames
            .iter()
            .flat_map(|&f| pm.page(crate::address::PhysicalPage::new(f as u32).unwrap()).to_vec())
            .collect();

        for (page, offset, value) in writes {
            if (page as usize) < a_pages {
                let va = VirtualAddress::from_parts(VirtualPage::new(page).unwrap(), offset).unwrap();
                store(&mut pm, pid(1), va, value).unwrap();
            }
        }

        let b_after: Vec<u8> = b_frames
            .iter()
            .flat_map(|&f| pm.page(crate::address::PhysicalPage::new(f as u32).unwrap()).to_vec())
            .collect();
        prop_assert_eq!(b_before, b_after);
    }

    #[test]
    fn destroy_restores_free_count(
        existing in 0usize..=10,
        k in 0usize..=30,
    ) {
        let mut pm = PhysicalMemory::new();
        create_process(&mut pm, pid(0), existing).unwrap();
        let before = free_count(&pm);

        create_process(&mut pm, pid(5), k).unwrap();
        prop_assert_eq!(free_count(&pm), before - (k + 1));

        prop_assert_eq!(destroy_process(&mut pm, pid(5)).unwrap(), k + 1);
        prop_assert_eq!(free_count(&pm), before);
    }

    #[test]
    fn ownership_holds_under_random_workload(
        ops in proptest::collection::vec((any::<bool>(), 0u32..8, 0usize..16), 1..64),
    ) {
        let mut pm = PhysicalMemory::new();
        for (create, proc_num, pages) in ops {
            let proc_id = pid(proc_num);
            let alloc_before = pm.alloc_table().to_vec();
            let result = if create {
                create_process(&mut pm, proc_id, pages).map(|_| ())
            } else {
                destroy_process(&mut pm, proc_id).map(|_| ())
            };
            // A failed call changes nothing
            if result.is_err() {
                prop_assert_eq!(pm.alloc_table(), &alloc_before[..]);
            }
            assert_ownership(&pm);
        }
    }
}
