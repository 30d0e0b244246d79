pub const PAGE_SHIFT: u32 = 8;
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
pub const PAGE_COUNT: usize = 64;
pub const MEM_SIZE: usize = PAGE_SIZE * PAGE_COUNT;

pub const OFFSET_MASK: u32 = (1 << PAGE_SHIFT) - 1;

/// Zero page layout: the allocation table, then the process directory.
pub const ALLOC_TABLE_BASE: usize = 0;
pub const PROC_DIR_BASE: usize = ALLOC_TABLE_BASE + PAGE_COUNT;

/// Physical page 0 holds the tables above and is never handed out.
pub const RESERVED_PAGE: u8 = 0;

/// Page-table entry and directory slot value meaning "nothing here".
pub const UNMAPPED: u8 = 0;

pub const PAGE_FREE: u8 = 0;
pub const PAGE_USED: u8 = 1;

const _: () = assert!(PAGE_SIZE * PAGE_COUNT == MEM_SIZE);
const _: () = assert!(PROC_DIR_BASE + PAGE_COUNT <= PAGE_SIZE);
const _: () = assert!(PAGE_COUNT <= u8::MAX as usize + 1);
