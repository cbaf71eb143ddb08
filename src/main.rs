//! nescore - CLI Entry Point
//!
//! Commands:
//! - `nescore run <program>` - Run a raw binary or ASM file
//! - `nescore asm <source>` - Assemble to a raw binary
//! - `nescore disasm <binary>` - Disassemble a raw binary
//! - `nescore catalog` - List every opcode

use clap::{Parser, Subcommand};
use slog::{o, Drain};
use nescore::cpu::CATALOG;
use nescore::{Cpu, Memory, Mnemonic, OpCode, Word};

#[derive(Parser)]
#[command(name = "nescore")]
#[command(version = "0.1.0")]
#[command(about = "An instruction-level MOS 6502 (NES) emulator")]
struct Cli {
    /// Print library log records (reset, interrupts, every instruction) to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until BRK, a jump-to-self, or the step limit
    Run {
        /// Path to the raw binary or .asm file to execute
        program: String,
        /// Load address for raw binaries ($8000, 0x8000 or 32768)
        #[arg(short, long, default_value = "$8000", value_parser = parse_address)]
        origin: u16,
        /// Maximum number of instructions to run
        #[arg(short, long, default_value = "10000")]
        max_steps: u64,
        /// Show trace output
        #[arg(short, long)]
        trace: bool,
    },
    /// Assemble source to a raw binary
    Asm {
        /// Path to the source file
        source: String,
        /// Output binary file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble a raw binary to readable text
    Disasm {
        /// Path to the binary file
        binary: String,
        /// Load address of the first byte
        #[arg(short, long, default_value = "$8000", value_parser = parse_address)]
        origin: u16,
    },
    /// List every opcode in the instruction catalog
    Catalog,
}

fn main() {
    let cli = Cli::parse();
    let _log_guard = cli.verbose.then(init_logging);

    match cli.command {
        Some(Commands::Run { program, origin, max_steps, trace }) => {
            run_program(&program, origin, max_steps, trace);
        }
        Some(Commands::Asm { source, output }) => {
            assemble_file(&source, output);
        }
        Some(Commands::Disasm { binary, origin }) => {
            disassemble_file(&binary, origin);
        }
        Some(Commands::Catalog) => {
            print_catalog();
        }
        None => {
            println!("nescore v0.1.0");
            println!("An instruction-level MOS 6502 (NES) emulator");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn parse_address(text: &str) -> Result<u16, String> {
    let text = text.trim();
    let parsed = if let Some(hex) = text.strip_prefix('$').or_else(|| text.strip_prefix("0x")) {
        u16::from_str_radix(hex, 16)
    } else {
        text.parse::<u16>()
    };
    parsed.map_err(|e| format!("invalid address {:?}: {}", text, e))
}

fn fail(message: String) -> ! {
    eprintln!("❌ {}", message);
    std::process::exit(1);
}

/// Read a program: assemble `.asm` sources, load anything else as raw bytes.
fn load(path: &str, origin: u16) -> (u16, Vec<u8>) {
    if path.ends_with(".asm") {
        let source = std::fs::read_to_string(path)
            .unwrap_or_else(|e| fail(format!("Failed to read file: {}", e)));
        let program = nescore::assemble(&source)
            .unwrap_or_else(|e| fail(format!("Assembly error: {}", e)));
        println!("📝 Assembled {} bytes at ${:04X}", program.len(), program.origin().raw());
        (program.origin().raw(), program.into_bytes())
    } else {
        let bytes = std::fs::read(path)
            .unwrap_or_else(|e| fail(format!("Failed to read file: {}", e)));
        println!("📂 Loaded {} bytes at ${:04X}", bytes.len(), origin);
        (origin, bytes)
    }
}

fn run_program(path: &str, origin: u16, max_steps: u64, trace: bool) {
    use nescore::asm::disassemble_instruction;

    println!("🔧 Running: {}", path);
    let (origin, bytes) = load(path, origin);
    if bytes.is_empty() {
        fail("No instructions to execute".into());
    }

    // Create CPU and load program
    let mut cpu = Cpu::default();
    if let Err(e) = cpu.load_program(Word::from_u16(origin), &bytes) {
        fail(format!("Failed to load program: {}", e));
    }
    if let Err(e) = cpu.reset() {
        fail(format!("Reset failed: {}", e));
    }

    println!();
    println!("━━━ Execution ━━━");

    let mut stop_reason = None;
    while cpu.instructions() < max_steps {
        let pc = cpu.registers().program_counter;
        let window: Vec<u8> = (0..3)
            .filter_map(|i| cpu.memory().get_byte(pc.wrapping_add(i)).ok())
            .map(|byte| byte.raw())
            .collect();
        if window.first() == Some(&0x00) {
            stop_reason = Some(format!("BRK at ${:04X}", pc.raw()));
            break;
        }

        match cpu.step() {
            Ok(_) => {
                if trace {
                    let (text, _) = disassemble_instruction(&window, pc.raw());
                    println!("{:04X}: {:<14} {}", pc.raw(), text, cpu.registers());
                }
            }
            Err(e) => fail(format!("CPU error at PC=${:04X}: {}", pc.raw(), e)),
        }

        if cpu.registers().program_counter == pc {
            stop_reason = Some(format!("trapped at ${:04X}", pc.raw()));
            break;
        }
    }

    let regs = cpu.registers();
    println!();
    println!("━━━ Result ━━━");
    println!("Instructions: {}", cpu.instructions());
    println!("A:  ${:02X} ({})", regs.accumulator.raw(), regs.accumulator.as_i32());
    println!("X:  ${:02X}", regs.x.raw());
    println!("Y:  ${:02X}", regs.y.raw());
    println!("SP: ${:02X}", regs.stack_pointer.raw());
    println!("PC: ${:04X}", regs.program_counter.raw());
    println!("P:  {} (${:02X})", regs.flags_string(), regs.status.raw());

    match stop_reason {
        Some(reason) => println!("Stopped: {}", reason),
        None => {
            println!();
            println!("⚠️  Reached max steps limit ({}). Use --max-steps to increase.", max_steps);
        }
    }
}

fn assemble_file(source_path: &str, output: Option<String>) {
    let out_path = output.unwrap_or_else(|| source_path.replace(".asm", ".bin"));

    println!("📝 Assembling: {} → {}", source_path, out_path);

    let source = std::fs::read_to_string(source_path)
        .unwrap_or_else(|e| fail(format!("Failed to read file: {}", e)));
    let program = nescore::assemble(&source)
        .unwrap_or_else(|e| fail(format!("Assembly error: {}", e)));

    println!("✓ Assembled {} bytes at ${:04X}", program.len(), program.origin().raw());

    if let Err(e) = std::fs::write(&out_path, program.bytes()) {
        fail(format!("Failed to save binary: {}", e));
    }

    println!("✓ Saved to {}", out_path);
}

fn disassemble_file(path: &str, origin: u16) {
    println!("📖 Disassembling: {}", path);
    println!();

    let bytes = std::fs::read(path)
        .unwrap_or_else(|e| fail(format!("Failed to read file: {}", e)));
    println!("{}", nescore::disassemble(&bytes, origin));
}

fn print_catalog() {
    println!("━━━ 6502 Instruction Catalog ━━━");
    println!();
    for mnemonic in Mnemonic::ALL {
        println!("{}  {}", mnemonic, mnemonic.summary());
        for mode in OpCode::modes_for(*mnemonic) {
            if let Ok(opcode) = OpCode::from_mnemonic_and_mode(*mnemonic, mode) {
                println!("    ${:02X}  {:<26} {} byte(s)", opcode.code(), opcode.description(), opcode.len());
            }
        }
    }
    println!();
    println!("{} mnemonics, {} opcodes", Mnemonic::ALL.len(), CATALOG.len());
}

/// Route the library's `log` records into a terminal drain on stderr.
///
/// The returned guard keeps the global logger installed; drop it last.
fn init_logging() -> slog_scope::GlobalLoggerGuard {
    let decorator = slog_term::PlainSyncDecorator::new(std::io::stderr());
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let logger = slog::Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")));

    let guard = slog_scope::set_global_logger(logger);
    if let Err(e) = slog_stdlog::init_with_level(log::Level::Trace) {
        eprintln!("⚠️  Logging unavailable: {}", e);
    }
    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_forms() {
        assert_eq!(parse_address("$8000"), Ok(0x8000));
        assert_eq!(parse_address("0xC000"), Ok(0xC000));
        assert_eq!(parse_address("32768"), Ok(0x8000));
        assert!(parse_address("$10000").is_err());
        assert!(parse_address("zero").is_err());
    }

    #[test]
    fn test_verbose_logging_forwards_trace_records() {
        let _guard = init_logging();
        assert_eq!(log::max_level(), log::LevelFilter::Trace);
        log::trace!("trace records reach the terminal drain");
    }
}
