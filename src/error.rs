use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::address::{PhysicalPage, ProcessId, VirtualPage};

/// What a failed allocation was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    PageTable,
    DataPage,
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageKind::PageTable => f.write_str("page table"),
            PageKind::DataPage => f.write_str("data page"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("OOM: proc {proc_id}: {kind}")]
    OutOfMemory { proc_id: ProcessId, kind: PageKind },
    #[error("unknown process {0}")]
    UnknownProcess(ProcessId),
    #[error("process {0} already exists")]
    ProcessExists(ProcessId),
    #[error("cannot map {requested} pages, a process has at most {max}")]
    TooManyPages { requested: usize, max: usize },
    #[error("double free of physical page {0}")]
    DoubleFree(PhysicalPage),
    #[error("physical page {0} is reserved")]
    ReservedPage(PhysicalPage),
    #[error("proc {proc_id}: virtual page {page} is not mapped")]
    Unmapped { proc_id: ProcessId, page: VirtualPage },
    #[error("process id {0} out of range")]
    InvalidProcessId(u32),
    #[error("virtual page {0} out of range")]
    InvalidVirtualPage(u32),
    #[error("physical page {0} out of range")]
    InvalidPhysicalPage(u32),
    #[error("virtual address {0} out of range")]
    InvalidVirtualAddress(u32),
    #[error("{0}")]
    Parse(String),
    #[error("failed to read script {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = core::result::Result<T, Error>;
