//! The abstract syntax tree handed to the compiler.
//!
//! Parsing and import resolution live outside this crate; a front end
//! produces a [`Program`] (in practice by deserializing one from JSON, see
//! [`crate::main`]) and everything downstream of that is ours.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A literal constant as it appears in source: only scalars can be spelled
/// directly in the AST. Lists, maps, and closures are always *built* at
/// runtime (`ListLiteral`, `MapLiteral`, `BuildClosure`), never carried as
/// AST constants, so this is deliberately narrower than [`Value`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value")]
pub enum Const {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Const {
    pub fn into_value(self) -> Value {
        match self {
            Const::Int(i) => Value::Int(i),
            Const::Float(f) => Value::Float(f),
            Const::Str(s) => Value::Str(s),
        }
    }
}

/// A flat sequence of statements. The same type is reused for the whole
/// script, a function body, and the inner program of a list/map literal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Program(pub Vec<Stmt>);

impl Program {
    pub fn statements(&self) -> &[Stmt] {
        &self.0
    }
}

/// One AST node. `line`/`column` are carried on every node so the compiler
/// can stamp a debug entry for each instruction it emits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stmt {
    pub line: u32,
    pub column: u32,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(line: u32, column: u32, kind: StmtKind) -> Self {
        Stmt { line, column, kind }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum StmtKind {
    Push { value: Const },

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

    Store { name: String },
    Load { name: String },

    Dup,
    Swap,
    Drop,
    Rot,

    Conditional {
        then_block: Program,
        else_block: Option<Program>,
    },
    WhileLoop {
        condition_block: Program,
        body_block: Program,
    },

    ListLiteral { program: Program },
    MapLiteral { pairs: Vec<(Const, Program)> },

    GetItem,
    SetItem,
    Length,

    FunctionDef {
        name: String,
        params: Vec<String>,
        body: Program,
    },
    FunctionRef { name: String },
    FunctionCall,

    Input,
    Print,
    FfiCall,
    DebugBreak,

    ImportStmt { filename: String },
}
