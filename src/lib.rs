pub mod address;
pub mod allocator;
pub mod constants;
pub mod error;
pub mod io;
pub mod memory;
pub mod process;
pub mod translation;
pub mod vm_manager;

mod tests_prop;

// Re-export commonly used items for convenience
pub use address::{make_address, PhysicalAddress, PhysicalPage, ProcessId, VirtualAddress, VirtualPage};
pub use constants::*;
pub use error::{Error, PageKind, Result};
pub use io::Command;
pub use translation::Access;
pub use vm_manager::{Report, VmManager};
