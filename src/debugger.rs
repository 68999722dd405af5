//! # Interactive breakpoint prompt
//!
//! The VM core only exposes a breakpoint hook and a read-only inspection
//! surface ([`crate::vm::DebugHook`], [`crate::vm::VmInspect`]); the actual
//! read-prompt loop is an ambient, swappable front end, grounded in
//! `original_source/src/sym/vm.py`'s `debugger()` (`s`/`stack`, `l`/`locals`,
//! `g`/`globals` to inspect, `c`/`continue` or `n`/`next` to resume).

use std::io::{self, Write};

use crate::vm::{DebugHook, VmInspect};

/// Prints a breakpoint banner and reads commands from stdin until the user
/// continues.
pub struct InteractiveDebugger;

impl DebugHook for InteractiveDebugger {
    fn on_breakpoint(&mut self, inspect: VmInspect<'_>) {
        println!(
            "--- Breakpoint @ function '{}', line {} ---",
            inspect.function, inspect.line
        );

        loop {
            print!("(dbg) ");
            if io::stdout().flush().is_err() {
                return;
            }

            let mut line = String::new();
            if io::stdin().read_line(&mut line).is_err() {
                return;
            }
            let cmd = line.trim();

            match cmd {
                "s" | "stack" => {
                    let rendered: Vec<String> =
                        inspect.stack.iter().map(|v| v.to_display_string()).collect();
                    println!("Stack: [{}]", rendered.join(", "));
                }
                "l" | "locals" => {
                    print_map("Locals", inspect.locals);
                }
                "g" | "globals" => {
                    print_map("Globals", inspect.globals);
                }
                "c" | "continue" | "n" | "next" => return,
                "" => continue,
                other => println!("unrecognized command: {}", other),
            }
        }
    }
}

/// A [`DebugHook`] that never stops — used when `--debug` is off, or by
/// tests that want to drive the VM without a terminal attached.
pub struct NoopDebugger;

impl DebugHook for NoopDebugger {
    fn on_breakpoint(&mut self, _inspect: VmInspect<'_>) {}
}

fn print_map(label: &str, map: &std::collections::HashMap<String, crate::value::Value>) {
    let rendered: Vec<String> = map
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v.to_display_string()))
        .collect();
    println!("{}: {{{}}}", label, rendered.join(", "));
}
