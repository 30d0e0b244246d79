use std::fs;
use std::path::Path;

use crate::address::{PhysicalPage, ProcessId, VirtualAddress};
use crate::allocator::is_used;
use crate::error::{Error, Result};
use crate::memory::PhysicalMemory;
use crate::process::page_table_entries;

const FREE_MAP_WIDTH: usize = 16;

/// One step of a simulator run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `np <proc> <pages>`
    NewProcess { proc_id: ProcessId, page_count: usize },
    /// `pfm`
    PrintFreeMap,
    /// `ppt <proc>`
    PrintPageTable { proc_id: ProcessId },
    /// `kp <proc>`
    KillProcess { proc_id: ProcessId },
    /// `sb <proc> <vaddr> <value>`
    StoreByte { proc_id: ProcessId, address: VirtualAddress, value: u8 },
    /// `lb <proc> <vaddr>`
    LoadByte { proc_id: ProcessId, address: VirtualAddress },
}

/// Parse a whole token stream. Nothing is returned unless every token parses.
pub fn parse_commands<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<Command>> {
    let mut tokens = tokens.iter().map(AsRef::<str>::as_ref);
    let mut commands = Vec::new();

    while let Some(token) = tokens.next() {
        let command = match token {
            "np" => Command::NewProcess {
                proc_id: proc_arg(&mut tokens, token)?,
                page_count: number(&mut tokens, token, "page count")? as usize,
            },
            "pfm" => Command::PrintFreeMap,
            "ppt" => Command::PrintPageTable { proc_id: proc_arg(&mut tokens, token)? },
            "kp" => Command::KillProcess { proc_id: proc_arg(&mut tokens, token)? },
            "sb" => Command::StoreByte {
                proc_id: proc_arg(&mut tokens, token)?,
                address: address_arg(&mut tokens, token)?,
                value: byte_arg(&mut tokens, token)?,
            },
            "lb" => Command::LoadByte {
                proc_id: proc_arg(&mut tokens, token)?,
                address: address_arg(&mut tokens, token)?,
            },
            other => return Err(Error::Parse(format!("unknown command: {}", other))),
        };
        commands.push(command);
    }

    Ok(commands)
}

fn number<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    command: &str,
    what: &str,
) -> Result<u32> {
    let token = tokens
        .next()
        .ok_or_else(|| Error::Parse(format!("{}: missing {}", command, what)))?;
    token
        .parse()
        .map_err(|_| Error::Parse(format!("{}: invalid {}: {}", command, what, token)))
}

fn proc_arg<'a>(tokens: &mut impl Iterator<Item = &'a str>, command: &str) -> Result<ProcessId> {
    ProcessId::new(number(tokens, command, "process id")?)
}

fn address_arg<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    command: &str,
) -> Result<VirtualAddress> {
    VirtualAddress::new(number(tokens, command, "virtual address")?)
}

fn byte_arg<'a>(tokens: &mut impl Iterator<Item = &'a str>, command: &str) -> Result<u8> {
    let value = number(tokens, command, "value")?;
    u8::try_from(value)
        .map_err(|_| Error::Parse(format!("{}: value {} does not fit in a byte", command, value)))
}

/// Split script text into command tokens. `#` comments run to end of line.
pub fn tokenize(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .flat_map(str::split_whitespace)
        .map(str::to_string)
        .collect()
}

pub fn read_script<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let content = fs::read_to_string(path.as_ref())
        .map_err(|source| Error::Io { path: path.as_ref().to_path_buf(), source })?;
    Ok(tokenize(&content))
}

/// `#` for every used physical page, `.` for every free one, 16 per row
pub fn render_free_map(pm: &PhysicalMemory) -> String {
    let mut out = String::from("--- PAGE FREE MAP ---\n");
    for page in PhysicalPage::all() {
        out.push(if is_used(pm, page) { '#' } else { '.' });
        if (page.index() + 1) % FREE_MAP_WIDTH == 0 {
            out.push('\n');
        }
    }
    out
}

/// Mapped entries of a page table as `vv -> pp` in two-digit hex
pub fn render_page_table(pm: &PhysicalMemory, proc_id: ProcessId) -> Result<String> {
    let entries = page_table_entries(pm, proc_id)?;
    let mut out = format!("--- PROCESS {} PAGE TABLE ---\n", proc_id);
    for (page, frame) in entries {
        out.push_str(&format!("{:02x} -> {:02x}\n", page.get(), frame.get()));
    }
    Ok(out)
}
