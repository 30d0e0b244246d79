//! ptsim - paged virtual memory simulator
//!
//! Usage: ptsim [OPTIONS] [COMMANDS]...
//!
//! Commands:
//!   np <proc> <pages>          - create a process with <pages> data pages
//!   pfm                        - print the physical page free map
//!   ppt <proc>                 - print a process's page table
//!   kp <proc>                  - kill a process, releasing its pages
//!   sb <proc> <vaddr> <value>  - store a byte at a virtual address
//!   lb <proc> <vaddr>          - load a byte from a virtual address

use std::io::Write;
use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser};
use log::LevelFilter;

use ptsim::io::{parse_commands, read_script};
use ptsim::VmManager;

#[derive(Debug, Parser)]
#[command(name = "ptsim", about = "Single-level page table simulator")]
struct Cli {
    /// Read command tokens from a file before the positional ones
    #[arg(short, long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Stop at the first failed command and exit non-zero
    #[arg(long)]
    strict: bool,

    /// Log more (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Command tokens, e.g. `np 1 2 pfm ppt 1`
    #[arg(value_name = "COMMANDS")]
    commands: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli, &mut std::io::stdout().lock()) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();
}

/// Returns `Ok(false)` when the run should end with a failure status
fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<bool> {
    let mut tokens = match &cli.script {
        Some(path) => read_script(path)?,
        None => Vec::new(),
    };
    tokens.extend(cli.commands.iter().cloned());

    if tokens.is_empty() {
        eprint!("{}", Cli::command().render_help());
        return Ok(false);
    }

    let commands = parse_commands(&tokens)?;
    let mut vm = VmManager::new();

    for command in &commands {
        match vm.execute(command) {
            Ok(text) => out.write_all(text.as_bytes())?,
            Err(e) => {
                // Scoped to this command; memory stays consistent
                writeln!(out, "{}", e)?;
                if cli.strict {
                    return Ok(false);
                }
            }
        }
    }

    Ok(true)
}
