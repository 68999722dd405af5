//! # Stack-Based Bytecode Virtual Machine (Runtime)
//!
//! Executes the chunks produced by [`crate::compiler::Compiler`].
//!
//! ## High-level model
//! - **Operand stack (`stack`)**: holds `Value`s consumed/produced by ops.
//! - **Globals (`globals`)**: process-wide, written only by the main frame.
//! - **Call stack (`call_stack`)**: a `Vec<Frame>`, bottom is always the
//!   `__main__` frame. Each [`Frame`] owns its own `locals` and records
//!   `stack_start`, the operand-stack height at the moment it was entered.
//! - **Program counter**: lives on the active frame (`frame.ip`), not as a
//!   separate VM field, since every frame has its own chunk to step through.
//! - **Advance flag (`advance_pc`)**: lets control-flow ops manage `ip`
//!   themselves instead of being auto-incremented.
//!
//! The VM supports arithmetic/comparison/logical ops (`ops_arith`), stack
//! shuffling (`ops_stack`), structured data (`ops_struct`), and control flow
//! plus calls (`ops_control`).
//!
//! The machine fails fast: the first unhandled `RuntimeError` aborts
//! execution and is reported with the source location of the instruction
//! that raised it (looked up in the active chunk's debug map at `ip - 1`,
//! since `ip` has already advanced past the faulting instruction).

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, error};

use crate::bytecode::{Chunk, CompiledProgram, DebugEntry, Instr, MAIN_CHUNK};
use crate::config::RunConfig;
use crate::error::RuntimeError;
use crate::ffi::ForeignBridge;
use crate::value::{Closure, Value};

mod ops_arith;
mod ops_control;
mod ops_stack;
mod ops_struct;

/// A single activation record. `is_main` is decided once, at construction,
/// rather than re-derived from `closure.name` on every `StoreName`/`LoadName`
/// — see the Design Decisions section of `SPEC_FULL.md`.
pub struct Frame {
    pub closure: Rc<Closure>,
    pub ip: usize,
    pub stack_start: usize,
    pub locals: HashMap<String, Value>,
    pub is_main: bool,
}

impl Frame {
    fn main(chunk: Rc<Chunk>) -> Self {
        Frame {
            closure: Rc::new(Closure {
                name: MAIN_CHUNK.to_string(),
                params: Vec::new(),
                chunk,
            }),
            ip: 0,
            stack_start: 0,
            locals: HashMap::new(),
            is_main: true,
        }
    }
}

/// Pop a single [`Value`] from the operand stack, or a typed underflow error.
pub(super) fn pop(stack: &mut Vec<Value>) -> Result<Value, RuntimeError> {
    stack
        .pop()
        .ok_or_else(|| RuntimeError::StackUnderflow("operand stack is empty".to_string()))
}

/// A hook invoked whenever the debugger peeks a `Dbg` instruction ahead of
/// execution. The core only exposes this inspection surface; the actual
/// read-prompt loop lives in [`crate::debugger`], which is not part of the
/// VM's own responsibilities.
pub trait DebugHook {
    fn on_breakpoint(&mut self, inspect: VmInspect<'_>);
}

/// A read-only snapshot of VM state handed to a [`DebugHook`] at a
/// breakpoint.
pub struct VmInspect<'a> {
    pub function: &'a str,
    pub line: u32,
    pub column: u32,
    pub stack: &'a [Value],
    pub locals: &'a HashMap<String, Value>,
    pub globals: &'a HashMap<String, Value>,
}

pub struct VirtualMachine {
    chunks: HashMap<String, Rc<Chunk>>,
    debug_maps: HashMap<String, Vec<DebugEntry>>,
    stack: Vec<Value>,
    call_stack: Vec<Frame>,
    globals: HashMap<String, Value>,
    ffi: ForeignBridge,
    config: RunConfig,
}

impl VirtualMachine {
    pub fn new(program: CompiledProgram, config: RunConfig) -> Result<Self, RuntimeError> {
        let main_chunk = program
            .chunks
            .get(MAIN_CHUNK)
            .cloned()
            .ok_or_else(|| RuntimeError::VmInvariant("no __main__ chunk compiled".to_string()))?;

        Ok(VirtualMachine {
            chunks: program.chunks,
            debug_maps: program.debug_maps,
            stack: Vec::new(),
            call_stack: vec![Frame::main(main_chunk)],
            globals: HashMap::new(),
            ffi: ForeignBridge::new(),
            config,
        })
    }

    fn current_frame(&self) -> &Frame {
        self.call_stack.last().expect("call stack is never empty while running")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.call_stack.last_mut().expect("call stack is never empty while running")
    }

    fn current_chunk(&self) -> &Rc<Chunk> {
        &self.current_frame().closure.chunk
    }

    /// Run until `Halt`, until the call stack empties (only reachable if
    /// `__main__` itself executes `Return`, which compiled programs never
    /// do), or until an unhandled error escapes.
    pub fn run(&mut self, hook: &mut dyn DebugHook) -> Result<(), RuntimeError> {
        let span = tracing::info_span!("vm_run");
        let _enter = span.enter();

        loop {
            let ip = self.current_frame().ip;
            if ip >= self.current_chunk().len() {
                break;
            }

            if self.config.debug {
                if let Instr::Dbg = &self.current_chunk().code[ip] {
                    self.fire_breakpoint(hook);
                }
            }

            // Advance past this instruction before dispatching it, so a
            // jump/call/return handler that needs to redirect `ip` can just
            // overwrite it, and a handler that errors out leaves `ip`
            // already one past the faulting instruction — which is exactly
            // what `report_error`'s `ip - 1` debug-map lookup expects.
            self.current_frame_mut().ip = ip + 1;

            match self.dispatch(ip) {
                Ok(DispatchOutcome::Continue) => {}
                Ok(DispatchOutcome::Halt) => break,
                Ok(DispatchOutcome::ProgramReturned) => break,
                Err(e) => {
                    self.report_error(&e);
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    fn fire_breakpoint(&self, hook: &mut dyn DebugHook) {
        let frame = self.current_frame();
        let debug_map = self.debug_maps.get(&frame.closure.name);
        let (line, column) = debug_map
            .and_then(|m| m.get(frame.ip))
            .copied()
            .unwrap_or((0, 0));
        hook.on_breakpoint(VmInspect {
            function: &frame.closure.name,
            line,
            column,
            stack: &self.stack,
            locals: &frame.locals,
            globals: &self.globals,
        });
    }

    fn dispatch(&mut self, ip: usize) -> Result<DispatchOutcome, RuntimeError> {
        // Clone is cheap for the non-Push variants and avoids holding a
        // borrow of `self.current_chunk()` across calls that need `&mut self`.
        let instr = self.current_chunk().code[ip].clone();

        match &instr {
            Instr::Push(v) => self.stack.push(v.clone()),

            Instr::Dup => ops_stack::handle_dup(&mut self.stack)?,
            Instr::Swap => ops_stack::handle_swap(&mut self.stack)?,
            Instr::Drop => ops_stack::handle_drop(&mut self.stack)?,
            Instr::Rot => ops_stack::handle_rot(&mut self.stack)?,

            Instr::Add => ops_arith::handle_add(&mut self.stack)?,
            Instr::Sub => ops_arith::handle_sub(&mut self.stack)?,
            Instr::Mul => ops_arith::handle_mul(&mut self.stack)?,
            Instr::Div => ops_arith::handle_div(&mut self.stack)?,
            Instr::Mod => ops_arith::handle_mod(&mut self.stack)?,
            Instr::Eq => ops_arith::handle_eq(&mut self.stack)?,
            Instr::Neq => ops_arith::handle_neq(&mut self.stack)?,
            Instr::Lt => ops_arith::handle_lt(&mut self.stack)?,
            Instr::Gt => ops_arith::handle_gt(&mut self.stack)?,
            Instr::Lte => ops_arith::handle_lte(&mut self.stack)?,
            Instr::Gte => ops_arith::handle_gte(&mut self.stack)?,
            Instr::And => ops_arith::handle_and(&mut self.stack)?,
            Instr::Or => ops_arith::handle_or(&mut self.stack)?,
            Instr::Not => ops_arith::handle_not(&mut self.stack)?,

            Instr::StoreName(name) => {
                let v = pop(&mut self.stack)?;
                let frame = self.current_frame_mut();
                if frame.is_main {
                    self.globals.insert(name.clone(), v);
                } else {
                    frame.locals.insert(name.clone(), v);
                }
            }
            Instr::LoadName(name) => {
                let frame = self.current_frame();
                let v = frame
                    .locals
                    .get(name)
                    .or_else(|| self.globals.get(name))
                    .cloned()
                    .ok_or_else(|| RuntimeError::NameUndefined(name.clone()))?;
                self.stack.push(v);
            }

            Instr::Jump(target) => {
                self.current_frame_mut().ip = *target;
            }
            Instr::JumpIfFalse(target) => {
                let cond = pop(&mut self.stack)?.as_bool();
                if !cond {
                    self.current_frame_mut().ip = *target;
                }
            }

            Instr::BuildClosure(name) => {
                let chunk = self
                    .chunks
                    .get(name)
                    .cloned()
                    .ok_or_else(|| RuntimeError::NameUndefined(name.clone()))?;
                self.stack.push(Value::Closure(Rc::new(Closure {
                    name: name.clone(),
                    params: chunk.params.clone(),
                    chunk,
                })));
            }
            Instr::Call => {
                debug!(stack_depth = self.stack.len(), "CALL");
                // The caller's `ip` is already past this `Call` (the main
                // loop pre-advances before dispatching); the pushed frame
                // starts fresh at its own `ip: 0`.
                ops_control::handle_call(&mut self.stack, &mut self.call_stack)?;
            }
            Instr::Return => {
                debug!(frame = %self.current_frame().closure.name, "RETURN");
                if ops_control::handle_return(&mut self.stack, &mut self.call_stack)? {
                    return Ok(DispatchOutcome::ProgramReturned);
                }
                // The exposed caller frame's `ip` was already advanced past
                // its own `Call` before the call was made; nothing to do.
            }

            Instr::BuildList(n) => ops_struct::handle_build_list(*n, &mut self.stack)?,
            Instr::BuildMap(n) => ops_struct::handle_build_map(*n, &mut self.stack)?,
            Instr::GetItem => ops_struct::handle_get_item(&mut self.stack)?,
            Instr::SetItem => ops_struct::handle_set_item(&mut self.stack)?,
            Instr::Len => ops_struct::handle_len(&mut self.stack)?,

            Instr::Print => {
                use std::io::Write;
                let v = pop(&mut self.stack)?;
                print!("{}", v.to_display_string());
                std::io::stdout()
                    .flush()
                    .map_err(|e| RuntimeError::IoError(e.to_string()))?;
            }
            Instr::Input => {
                let mut line = String::new();
                std::io::stdin()
                    .read_line(&mut line)
                    .map_err(|e| RuntimeError::IoError(e.to_string()))?;
                let trimmed = line.trim_end_matches(['\n', '\r']).to_string();
                self.stack.push(Value::Str(trimmed));
            }
            Instr::FfiCall => {
                debug!("FFI_CALL");
                self.ffi.call(&mut self.stack)?;
            }
            Instr::Dbg => {}
            Instr::Halt => return Ok(DispatchOutcome::Halt),
        }

        Ok(DispatchOutcome::Continue)
    }

    /// Look up the source location of the instruction at `frame.ip - 1` (the
    /// one that just faulted — the main loop advances `ip` past an
    /// instruction before dispatching it, so by the time an error is
    /// observed `ip` already points one past the fault) and emit a
    /// structured report naming the error, its location, and the call-stack
    /// trace from bottom to top.
    fn report_error(&self, err: &RuntimeError) {
        let frame = self.current_frame();
        let (line, column) = self
            .debug_maps
            .get(&frame.closure.name)
            .and_then(|m| {
                let ip_for_debug = frame.ip.checked_sub(1)?;
                m.get(ip_for_debug).copied()
            })
            .unwrap_or((0, 0));

        error!(error = %err, function = %frame.closure.name, line, column, "unhandled runtime error");

        eprintln!("\n--- Sym Runtime Error ---");
        eprintln!("  Error: {}", err);
        eprintln!(
            "  Location: function '{}', line {}, column {}",
            frame.closure.name, line, column
        );
        eprintln!("\n--- Call Stack Trace ---");
        for f in &self.call_stack {
            eprintln!("  - in function '{}'", f.closure.name);
        }
    }
}

enum DispatchOutcome {
    Continue,
    Halt,
    ProgramReturned,
}

#[cfg(test)]
mod tests;
