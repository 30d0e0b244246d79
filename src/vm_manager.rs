use log::warn;

use crate::address::ProcessId;
use crate::error::Result;
use crate::io::{render_free_map, render_page_table, Command};
use crate::memory::PhysicalMemory;
use crate::process::{create_process, destroy_process};
use crate::translation::{load, store};

/// Owns one simulated RAM and runs commands against it.
///
/// Every operation takes `&mut self`, so all of physical memory is updated as
/// one unit per command.
pub struct VmManager {
    pm: PhysicalMemory,
}

/// Outcome of one command in a [`VmManager::run`] batch
#[derive(Debug)]
pub struct Outcome {
    pub command: Command,
    pub result: Result<String>,
}

#[derive(Debug, Default)]
pub struct Report {
    pub outcomes: Vec<Outcome>,
}

impl Report {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    /// Printed output of all commands, errors rendered in place
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        for outcome in &self.outcomes {
            match &outcome.result {
                Ok(text) => out.push_str(text),
                Err(e) => {
                    out.push_str(&e.to_string());
                    out.push('\n');
                }
            }
        }
        out
    }
}

impl VmManager {
    pub fn new() -> Self {
        VmManager { pm: PhysicalMemory::new() }
    }

    /// Execute a single command, returning what it prints
    pub fn execute(&mut self, command: &Command) -> Result<String> {
        match *command {
            Command::NewProcess { proc_id, page_count } => {
                create_process(&mut self.pm, proc_id, page_count)?;
                Ok(String::new())
            }
            Command::PrintFreeMap => Ok(self.free_map()),
            Command::PrintPageTable { proc_id } => self.page_table(proc_id),
            Command::KillProcess { proc_id } => {
                destroy_process(&mut self.pm, proc_id)?;
                Ok(String::new())
            }
            Command::StoreByte { proc_id, address, value } => {
                let access = store(&mut self.pm, proc_id, address, value)?;
                Ok(format!("{}\n", access))
            }
            Command::LoadByte { proc_id, address } => {
                let access = load(&self.pm, proc_id, address)?;
                Ok(format!("{}\n", access))
            }
        }
    }

    /// Execute every command; a failed command does not stop the batch
    pub fn run(&mut self, commands: &[Command]) -> Report {
        let mut report = Report::default();
        for command in commands {
            let result = self.execute(command);
            if let Err(e) = &result {
                warn!("{:?} failed: {}", command, e);
            }
            report.outcomes.push(Outcome { command: *command, result });
        }
        report
    }

    pub fn free_map(&self) -> String {
        render_free_map(&self.pm)
    }

    pub fn page_table(&self, proc_id: ProcessId) -> Result<String> {
        render_page_table(&self.pm, proc_id)
    }

    pub fn memory(&self) -> &PhysicalMemory {
        &self.pm
    }

    /// Discard all processes and start over with fresh memory
    pub fn reset(&mut self) {
        self.pm.initialize();
    }
}

impl Default for VmManager {
    fn default() -> Self {
        Self::new()
    }
}
