//! # Bytecode for the Sym VM
//!
//! A compiled program is a table of named [`Chunk`]s (one per function, plus
//! `__main__` for the script body) and a parallel table of debug maps, one
//! `(line, column)` per emitted instruction.
//!
//! Unlike a byte-oriented format, [`Instr`] folds each instruction's operand
//! (a jump target, a constant, a name) directly into the enum variant — there
//! is no separate decode step and no encoded word stream to walk. This is
//! still "the flat instruction stream" the specification describes; it's
//! just represented as a `Vec<Instr>` instead of a `Vec<u8>`.

use std::rc::Rc;

use crate::value::Value;

/// One source position, attached 1:1 to each instruction in a [`Chunk`].
pub type DebugEntry = (u32, u32);

/// A single decoded instruction. Operands are carried inline.
#[derive(Debug, Clone)]
pub enum Instr {
    Push(Value),

    Dup,
    Swap,
    Drop,
    Rot,

    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    And,
    Or,
    Not,

    StoreName(String),
    LoadName(String),

    Jump(usize),
    JumpIfFalse(usize),

    BuildClosure(String),
    Call,
    Return,

    BuildList(usize),
    BuildMap(usize),
    GetItem,
    SetItem,
    Len,

    Print,
    Input,
    FfiCall,
    Dbg,
    Halt,
}

impl Instr {
    /// A short mnemonic for logging and the interactive debugger, matching
    /// the opcode names in the specification's instruction table.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instr::Push(_) => "PUSH",
            Instr::Dup => "DUP",
            Instr::Swap => "SWAP",
            Instr::Drop => "DROP",
            Instr::Rot => "ROT",
            Instr::Add => "ADD",
            Instr::Sub => "SUB",
            Instr::Mul => "MUL",
            Instr::Div => "DIV",
            Instr::Mod => "MOD",
            Instr::Eq => "EQ",
            Instr::Neq => "NEQ",
            Instr::Lt => "LT",
            Instr::Gt => "GT",
            Instr::Lte => "LTE",
            Instr::Gte => "GTE",
            Instr::And => "AND",
            Instr::Or => "OR",
            Instr::Not => "NOT",
            Instr::StoreName(_) => "STORE_NAME",
            Instr::LoadName(_) => "LOAD_NAME",
            Instr::Jump(_) => "JUMP",
            Instr::JumpIfFalse(_) => "JUMP_IF_FALSE",
            Instr::BuildClosure(_) => "BUILD_CLOSURE",
            Instr::Call => "CALL",
            Instr::Return => "RETURN",
            Instr::BuildList(_) => "BUILD_LIST",
            Instr::BuildMap(_) => "BUILD_MAP",
            Instr::GetItem => "GET_ITEM",
            Instr::SetItem => "SET_ITEM",
            Instr::Len => "LEN",
            Instr::Print => "PRINT",
            Instr::Input => "INPUT",
            Instr::FfiCall => "FFI_CALL",
            Instr::Dbg => "DBG",
            Instr::Halt => "HALT",
        }
    }
}

/// A function's parameter list and emitted instructions. `__main__`'s chunk
/// has an empty parameter list.
#[derive(Debug, Default)]
pub struct Chunk {
    pub params: Vec<String>,
    pub code: Vec<Instr>,
}

impl Chunk {
    pub fn new(params: Vec<String>) -> Self {
        Chunk {
            params,
            code: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

/// The name of the implicit top-level chunk compiled from a program's
/// non-function statements.
pub const MAIN_CHUNK: &str = "__main__";

/// A fully compiled program: named chunks plus their debug maps, ready to be
/// handed to [`crate::vm::VirtualMachine::new`].
#[derive(Debug, Default)]
pub struct CompiledProgram {
    pub chunks: std::collections::HashMap<String, Rc<Chunk>>,
    pub debug_maps: std::collections::HashMap<String, Vec<DebugEntry>>,
}
