use std::fmt;

use log::debug;

use crate::address::{PhysicalAddress, PhysicalPage, ProcessId, VirtualAddress};
use crate::constants::*;
use crate::error::{Error, Result};
use crate::memory::PhysicalMemory;
use crate::process::lookup_table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Load,
    Store,
}

/// Diagnostic record produced by every load and store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub kind: AccessKind,
    pub proc_id: ProcessId,
    pub virtual_address: VirtualAddress,
    pub physical_address: PhysicalAddress,
    pub value: u8,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            AccessKind::Load => "Load",
            AccessKind::Store => "Store",
        };
        write!(
            f,
            "{} proc {}: {} => {}, value={}",
            verb, self.proc_id, self.virtual_address, self.physical_address, self.value
        )
    }
}

/// Translate a virtual address of `proc_id` to a physical address
///
/// The page-table entry for the virtual page must be mapped. Physical page 0
/// is never handed out, so an entry of 0 always means a page fault.
pub fn translate(
    pm: &PhysicalMemory,
    proc_id: ProcessId,
    va: VirtualAddress,
) -> Result<PhysicalAddress> {
    // Step 1: Find the process's page table
    let table = lookup_table(pm, proc_id)?;

    // Step 2: Read the entry for the virtual page
    let frame = pm.page_table_entry(table, va.page());
    if frame == UNMAPPED {
        return Err(Error::Unmapped { proc_id, page: va.page() });
    }

    // Step 3: Same offset, new page
    Ok(PhysicalAddress::new(PhysicalPage::new(frame as u32)?, va.offset()))
}

/// Write one byte through `proc_id`'s address space
pub fn store(
    pm: &mut PhysicalMemory,
    proc_id: ProcessId,
    va: VirtualAddress,
    value: u8,
) -> Result<Access> {
    let pa = translate(pm, proc_id, va)?;
    pm.write_at(pa, value);

    let access = Access {
        kind: AccessKind::Store,
        proc_id,
        virtual_address: va,
        physical_address: pa,
        value,
    };
    debug!("{}", access);
    Ok(access)
}

/// Read one byte through `proc_id`'s address space
pub fn load(pm: &PhysicalMemory, proc_id: ProcessId, va: VirtualAddress) -> Result<Access> {
    let pa = translate(pm, proc_id, va)?;
    let access = Access {
        kind: AccessKind::Load,
        proc_id,
        virtual_address: va,
        physical_address: pa,
        value: pm.read_at(pa),
    };
    debug!("{}", access);
    Ok(access)
}
