//! # AST-to-bytecode compiler
//!
//! Walks a [`Program`] twice: once to register every function definition
//! into its own [`Chunk`] (so forward references resolve via
//! `BUILD_CLOSURE` regardless of declaration order), then once to emit the
//! script body into the `__main__` chunk.
//!
//! Forward jumps (`Conditional`, `WhileLoop`) use the classic emit-a-
//! placeholder-then-patch-it-later idiom: [`emit_jump`] writes the opcode
//! with a dummy target and returns the index it was written at;
//! [`patch_jump`] goes back and overwrites that target once the real
//! destination address is known.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Program, Stmt, StmtKind};
use crate::bytecode::{Chunk, CompiledProgram, Instr, MAIN_CHUNK};
use crate::error::CompileError;

pub struct Compiler {
    /// Function name -> compiled chunk. Populated during the first pass,
    /// with `__main__` added at the end of the second.
    chunks: HashMap<String, Rc<Chunk>>,
    debug_maps: HashMap<String, Vec<(u32, u32)>>,

    /// The chunk currently being emitted into, and its parallel debug map.
    /// Swapped out and restored around `FunctionDef` bodies.
    current_code: Vec<Instr>,
    current_debug: Vec<(u32, u32)>,
}

impl Compiler {
    pub fn new() -> Self {
        Compiler {
            chunks: HashMap::new(),
            debug_maps: HashMap::new(),
            current_code: Vec::new(),
            current_debug: Vec::new(),
        }
    }

    /// Compile a whole program into a [`CompiledProgram`].
    pub fn compile(program: &Program) -> Result<CompiledProgram, CompileError> {
        let mut c = Compiler::new();

        // Pass 1: register every function definition, in any order, so
        // later BUILD_CLOSURE references resolve regardless of where in
        // the main body they're used.
        for stmt in program.statements() {
            if let StmtKind::FunctionDef { name, params, body } = &stmt.kind {
                c.compile_function(name, params, body)?;
            }
        }

        // Pass 2: emit the main body, skipping FunctionDef statements
        // (already handled above).
        c.current_code = Vec::new();
        c.current_debug = Vec::new();
        for stmt in program.statements() {
            if matches!(stmt.kind, StmtKind::FunctionDef { .. }) {
                continue;
            }
            c.compile_stmt(stmt)?;
        }
        c.emit(Instr::Halt, stmt_end_pos(program));

        let main_chunk = Chunk {
            params: Vec::new(),
            code: std::mem::take(&mut c.current_code),
        };
        c.chunks.insert(MAIN_CHUNK.to_string(), Rc::new(main_chunk));
        c.debug_maps
            .insert(MAIN_CHUNK.to_string(), std::mem::take(&mut c.current_debug));

        Ok(CompiledProgram {
            chunks: c.chunks,
            debug_maps: c.debug_maps,
        })
    }

    fn compile_function(
        &mut self,
        name: &str,
        params: &[String],
        body: &Program,
    ) -> Result<(), CompileError> {
        if self.chunks.contains_key(name) {
            return Err(CompileError::DuplicateFunction(name.to_string()));
        }

        let saved_code = std::mem::take(&mut self.current_code);
        let saved_debug = std::mem::take(&mut self.current_debug);

        for stmt in body.statements() {
            self.compile_stmt(stmt)?;
        }
        let ret_pos = body
            .statements()
            .last()
            .map(|s| (s.line, s.column))
            .unwrap_or((0, 0));
        self.emit(Instr::Return, ret_pos);

        let chunk = Chunk {
            params: params.to_vec(),
            code: std::mem::take(&mut self.current_code),
        };
        self.chunks.insert(name.to_string(), Rc::new(chunk));
        self.debug_maps
            .insert(name.to_string(), std::mem::take(&mut self.current_debug));

        self.current_code = saved_code;
        self.current_debug = saved_debug;
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        let pos = (stmt.line, stmt.column);
        match &stmt.kind {
            StmtKind::Push { value } => self.emit(Instr::Push(value.clone().into_value()), pos),

            StmtKind::Add => self.emit(Instr::Add, pos),
            StmtKind::Sub => self.emit(Instr::Sub, pos),
            StmtKind::Mul => self.emit(Instr::Mul, pos),
            StmtKind::Div => self.emit(Instr::Div, pos),
            StmtKind::Mod => self.emit(Instr::Mod, pos),
            StmtKind::Eq => self.emit(Instr::Eq, pos),
            StmtKind::Neq => self.emit(Instr::Neq, pos),
            StmtKind::Lt => self.emit(Instr::Lt, pos),
            StmtKind::Gt => self.emit(Instr::Gt, pos),
            StmtKind::Lte => self.emit(Instr::Lte, pos),
            StmtKind::Gte => self.emit(Instr::Gte, pos),
            StmtKind::And => self.emit(Instr::And, pos),
            StmtKind::Or => self.emit(Instr::Or, pos),
            StmtKind::Not => self.emit(Instr::Not, pos),

            StmtKind::Store { name } => self.emit(Instr::StoreName(name.clone()), pos),
            StmtKind::Load { name } => self.emit(Instr::LoadName(name.clone()), pos),

            StmtKind::Dup => self.emit(Instr::Dup, pos),
            StmtKind::Swap => self.emit(Instr::Swap, pos),
            StmtKind::Drop => self.emit(Instr::Drop, pos),
            StmtKind::Rot => self.emit(Instr::Rot, pos),

            StmtKind::Conditional { then_block, else_block } => {
                let jump_if_false = self.emit_jump(
                    |addr| Instr::JumpIfFalse(addr),
                    pos,
                );
                for s in then_block.statements() {
                    self.compile_stmt(s)?;
                }
                match else_block {
                    Some(else_block) => {
                        let jump_over_else = self.emit_jump(Instr::Jump, pos);
                        self.patch_jump(jump_if_false);
                        for s in else_block.statements() {
                            self.compile_stmt(s)?;
                        }
                        self.patch_jump(jump_over_else);
                    }
                    None => {
                        self.patch_jump(jump_if_false);
                    }
                }
            }

            StmtKind::WhileLoop { condition_block, body_block } => {
                let loop_start = self.current_code.len();
                for s in condition_block.statements() {
                    self.compile_stmt(s)?;
                }
                let exit_jump = self.emit_jump(Instr::JumpIfFalse, pos);
                for s in body_block.statements() {
                    self.compile_stmt(s)?;
                }
                self.emit(Instr::Jump(loop_start), pos);
                self.patch_jump(exit_jump);
            }

            StmtKind::ListLiteral { program } => {
                let count = program.statements().len();
                for s in program.statements() {
                    self.compile_stmt(s)?;
                }
                self.emit(Instr::BuildList(count), pos);
            }

            StmtKind::MapLiteral { pairs } => {
                for (key, value_program) in pairs {
                    self.emit(Instr::Push(key.clone().into_value()), pos);
                    for s in value_program.statements() {
                        self.compile_stmt(s)?;
                    }
                }
                self.emit(Instr::BuildMap(pairs.len()), pos);
            }

            StmtKind::GetItem => self.emit(Instr::GetItem, pos),
            StmtKind::SetItem => self.emit(Instr::SetItem, pos),
            StmtKind::Length => self.emit(Instr::Len, pos),

            StmtKind::FunctionDef { .. } => {
                // Already handled in pass 1; nothing to emit at the call site.
            }
            StmtKind::FunctionRef { name } => self.emit(Instr::BuildClosure(name.clone()), pos),
            StmtKind::FunctionCall => self.emit(Instr::Call, pos),

            StmtKind::Input => self.emit(Instr::Input, pos),
            StmtKind::Print => self.emit(Instr::Print, pos),
            StmtKind::FfiCall => self.emit(Instr::FfiCall, pos),
            StmtKind::DebugBreak => self.emit(Instr::Dbg, pos),

            StmtKind::ImportStmt { filename } => {
                return Err(CompileError::UnresolvedImport(filename.clone()));
            }
        }
        Ok(())
    }

    fn emit(&mut self, instr: Instr, pos: (u32, u32)) {
        self.current_code.push(instr);
        self.current_debug.push(pos);
    }

    /// Emit a jump with a placeholder target (its own current index, which
    /// is never a meaningful destination), returning the index to patch.
    fn emit_jump(&mut self, make: impl Fn(usize) -> Instr, pos: (u32, u32)) -> usize {
        let idx = self.current_code.len();
        self.emit(make(0), pos);
        idx
    }

    /// Overwrite the placeholder target at `idx` with the current end of the
    /// chunk (the address right after whatever was just emitted).
    fn patch_jump(&mut self, idx: usize) {
        let target = self.current_code.len();
        match &mut self.current_code[idx] {
            Instr::Jump(addr) | Instr::JumpIfFalse(addr) => *addr = target,
            other => unreachable!("patch_jump on non-jump instruction {:?}", other),
        }
    }
}

fn stmt_end_pos(program: &Program) -> (u32, u32) {
    program
        .statements()
        .last()
        .map(|s| (s.line, s.column))
        .unwrap_or((0, 0))
}
