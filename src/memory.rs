use crate::address::{make_address, PhysicalAddress, PhysicalPage, ProcessId, VirtualPage};
use crate::constants::*;

/// The simulated RAM.
///
/// Zero page holds the allocation table (one byte per physical page) followed
/// by the process directory (one byte per process id). Everything else is
/// page tables and data pages.
#[derive(Clone)]
pub struct PhysicalMemory {
    data: Box<[u8; MEM_SIZE]>,
}

impl PhysicalMemory {
    /// Create a freshly initialized physical memory
    pub fn new() -> Self {
        let mut pm = PhysicalMemory { data: Box::new([0u8; MEM_SIZE]) };
        pm.initialize();
        pm
    }

    /// Zero every byte, then mark the zero page as used
    pub fn initialize(&mut self) {
        self.data.fill(0);
        self.set_alloc_flag(PhysicalPage::RESERVED, PAGE_USED);
    }

    /// Read a byte from physical memory, `None` past the end
    #[inline]
    pub fn read(&self, address: usize) -> Option<u8> {
        self.data.get(address).copied()
    }

    #[inline]
    pub fn read_at(&self, address: PhysicalAddress) -> u8 {
        self.data[address.index()]
    }

    #[inline]
    pub(crate) fn write_at(&mut self, address: PhysicalAddress, value: u8) {
        self.data[address.index()] = value;
    }

    /// Allocation table byte for `page`
    #[inline]
    pub fn alloc_flag(&self, page: PhysicalPage) -> u8 {
        self.data[ALLOC_TABLE_BASE + page.index()]
    }

    #[inline]
    pub(crate) fn set_alloc_flag(&mut self, page: PhysicalPage, flag: u8) {
        self.data[ALLOC_TABLE_BASE + page.index()] = flag;
    }

    /// Raw process-directory slot: the page-table page of `proc_id`, or `UNMAPPED`
    #[inline]
    pub fn directory_slot(&self, proc_id: ProcessId) -> u8 {
        self.data[PROC_DIR_BASE + proc_id.index()]
    }

    #[inline]
    pub(crate) fn set_directory_slot(&mut self, proc_id: ProcessId, page: u8) {
        self.data[PROC_DIR_BASE + proc_id.index()] = page;
    }

    /// Get a Page Table entry
    #[inline]
    pub fn page_table_entry(&self, table: PhysicalPage, page: VirtualPage) -> u8 {
        self.data[make_address(table.get() as u32, page.get() as u32) as usize]
    }

    /// Set a Page Table entry
    #[inline]
    pub(crate) fn set_page_table_entry(&mut self, table: PhysicalPage, page: VirtualPage, frame: u8) {
        self.data[make_address(table.get() as u32, page.get() as u32) as usize] = frame;
    }

    /// Zero one whole page
    pub(crate) fn clear_page(&mut self, page: PhysicalPage) {
        let base = page.base();
        self.data[base..base + PAGE_SIZE].fill(0);
    }

    /// Bytes of a single page
    pub fn page(&self, page: PhysicalPage) -> &[u8] {
        let base = page.base();
        &self.data[base..base + PAGE_SIZE]
    }

    /// The allocation table region of the zero page
    pub fn alloc_table(&self) -> &[u8] {
        &self.data[ALLOC_TABLE_BASE..ALLOC_TABLE_BASE + PAGE_COUNT]
    }

    /// The process directory region of the zero page
    pub fn directory(&self) -> &[u8] {
        &self.data[PROC_DIR_BASE..PROC_DIR_BASE + PAGE_COUNT]
    }

    /// Get direct access to the underlying data
    pub fn data(&self) -> &[u8; MEM_SIZE] {
        &self.data
    }
}

impl Default for PhysicalMemory {
    fn default() -> Self {
        Self::new()
    }
}
