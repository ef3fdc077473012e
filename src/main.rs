//! emu16 - CLI entry point
//!
//! `emu16 CODE [DATA]` loads CODE into the code segment and, if given, DATA
//! into the data segment, then runs until `STOP`.
//!
//! Exit status: 0 after `STOP`, 1 on a usage error or if an image fails to
//! load, 2 on an execution fault, 3 if `--max-cycles` runs out first.

use clap::error::ErrorKind;
use clap::Parser;
use emu16::{load_image, Cpu, CpuError, Memory};
use log::info;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Run a program on the 16-bit emulator
#[derive(Parser)]
#[command(name = "emu16")]
#[command(version)]
#[command(about = "Run CODE with DATA as RAM")]
struct Cli {
    /// Code segment image
    code: PathBuf,

    /// Data segment image (zero-filled if omitted)
    data: Option<PathBuf>,

    /// Stop after this many instructions
    #[arg(short, long)]
    max_cycles: Option<u64>,

    /// Write the final register state as JSON to this file
    #[arg(long)]
    dump_state: Option<PathBuf>,
}

const EXIT_LOAD: u8 = 1;
const EXIT_FAULT: u8 = 2;
const EXIT_LIMIT: u8 = 3;

fn main() -> ExitCode {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match usage_status(&e) {
            Some(status) => {
                let _ = e.print();
                return ExitCode::from(status);
            }
            // --help and --version
            None => e.exit(),
        },
    };

    ExitCode::from(run(&cli))
}

/// Exit status for a command-line parse error, or `None` if clap only wants
/// to print help or version text.
fn usage_status(err: &clap::Error) -> Option<u8> {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => None,
        _ => Some(EXIT_LOAD),
    }
}

fn run(cli: &Cli) -> u8 {
    let code = match load_image(&cli.code) {
        Ok(mem) => mem,
        Err(e) => {
            eprintln!("{e}");
            return EXIT_LOAD;
        }
    };

    let data = match &cli.data {
        Some(path) => match load_image(path) {
            Ok(mem) => mem,
            Err(e) => {
                eprintln!("{e}");
                return EXIT_LOAD;
            }
        },
        None => Memory::new(),
    };

    let mut cpu = Cpu::new(code, data);

    let result = match cli.max_cycles {
        Some(max) => cpu.run_limited(max),
        None => cpu.run(),
    };

    if let Some(path) = &cli.dump_state {
        if let Err(e) = dump_state(&cpu, path) {
            eprintln!("failed to write {}: {e}", path.display());
        }
    }

    match &result {
        Ok(cycles) if cpu.is_halted() => info!("Halted after {cycles} instructions"),
        Ok(cycles) => eprintln!(
            "cycle limit reached after {cycles} instructions (pc={:#06x})",
            cpu.regs.pc
        ),
        Err(CpuError::Fault(fault)) => eprintln!("{fault}"),
        Err(e) => eprintln!("{e}"),
    }

    exit_status(&result, cpu.is_halted())
}

/// Map the outcome of a run to the process exit status.
fn exit_status(result: &Result<u64, CpuError>, halted: bool) -> u8 {
    match result {
        Ok(_) if halted => 0,
        Ok(_) => EXIT_LIMIT,
        Err(_) => EXIT_FAULT,
    }
}

fn dump_state(cpu: &Cpu, path: &Path) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(&cpu.snapshot())?;
    std::fs::write(path, json + "\n")
}
