//! # Sym runtime entry point
//!
//! Reads a JSON-serialized AST (the boundary format for the out-of-scope
//! front end — see `SPEC_FULL.md` §2), compiles it, and runs it on the VM.
//! `--debug` enables the breakpoint hook, dropping into an interactive
//! prompt (see [`sym_runtime::debugger`]) whenever a `DBG` instruction is
//! reached.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sym_runtime::ast::Program;
use sym_runtime::compiler::Compiler;
use sym_runtime::config::RunConfig;
use sym_runtime::debugger::{InteractiveDebugger, NoopDebugger};
use sym_runtime::vm::{DebugHook, VirtualMachine};

/// The Sym bytecode compiler and virtual machine.
#[derive(Parser, Debug)]
#[command(name = "sym", version, about)]
struct Cli {
    /// Path to a JSON-serialized AST to compile and run.
    script: PathBuf,

    /// Enable the interactive breakpoint prompt on `DBG` instructions.
    #[arg(long)]
    debug: bool,

    /// Override the default `tracing` log filter (also settable via
    /// `RUST_LOG`).
    #[arg(long, default_value = "warn")]
    log_filter: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{}", msg);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let source = fs::read_to_string(&cli.script)
        .map_err(|e| format!("sym: cannot read '{}': {}", cli.script.display(), e))?;

    let program: Program = serde_json::from_str(&source)
        .map_err(|e| format!("sym: malformed AST in '{}': {}", cli.script.display(), e))?;

    let compiled = Compiler::compile(&program).map_err(|e| format!("sym: {}", e))?;

    let config = RunConfig::new(cli.debug, cli.log_filter.clone());
    let mut vm = VirtualMachine::new(compiled, config).map_err(|e| format!("sym: {}", e))?;

    let mut hook: Box<dyn DebugHook> = if cli.debug {
        Box::new(InteractiveDebugger)
    } else {
        Box::new(NoopDebugger)
    };

    // The VM's own error report (with source location) has already gone to
    // stderr by the time an error escapes here; the driver's job is just to
    // carry the failure into the process exit code.
    let result = vm.run(hook.as_mut());
    // PRINT never emits a trailing newline; the driver appends the final one
    // once the VM halts so terminal output still ends cleanly.
    println!();
    result.map_err(|_| String::new())
}
