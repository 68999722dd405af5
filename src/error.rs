//! # Error Handling for the Sym VM
//!
//! This module defines the error taxonomy used throughout compilation and
//! bytecode execution.
//!
//! ## Design
//! - [`CompileError`] covers failures the compiler can detect without ever
//!   constructing a VM: an unknown AST node, a duplicate function name, or a
//!   stray import statement that should already have been flattened by the
//!   (out-of-scope) import resolver.
//! - [`RuntimeError`] covers everything the VM's dispatch loop can fail on.
//!   Each variant is caught at the dispatch boundary, has a source location
//!   attached from the active frame's debug map, and is reported structurally
//!   (see [`crate::vm::VirtualMachine::report_error`]).
//!
//! ## Display
//! Both enums implement [`fmt::Display`] and [`std::error::Error`], in the
//! same manual style the rest of this codebase uses rather than a derive
//! macro — there is no error taxonomy here rich enough to need one.

use std::fmt;

/// Failures detected while compiling an AST into chunks, before any VM state
/// exists.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// The compiler's dispatcher has no visitor for this node. Unreachable
    /// given the closed `StmtKind` enum today, kept for forward
    /// compatibility with new node kinds.
    UnknownNode(String),
    /// Two `FunctionDef`s in the same program declared the same name.
    DuplicateFunction(String),
    /// An `ImportStmt` reached the compiler; import resolution must already
    /// have happened upstream.
    UnresolvedImport(String),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UnknownNode(what) => write!(f, "CompileError: unknown AST node: {}", what),
            CompileError::DuplicateFunction(name) => {
                write!(f, "CompileError: function '{}' is defined more than once", name)
            }
            CompileError::UnresolvedImport(filename) => write!(
                f,
                "CompileError: unresolved import '{}' reached the compiler",
                filename
            ),
        }
    }
}

impl std::error::Error for CompileError {}

/// Errors that can occur during Sym bytecode execution.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// Operator or `Call` applied to an incompatible value kind.
    TypeMismatch(String),
    /// `LoadName`/`BuildClosure` referenced an identifier or chunk that does
    /// not exist.
    NameUndefined(String),
    /// List index out of range, or map key not found.
    KeyOrIndex(String),
    /// Division or modulo by zero.
    ArithmeticError(String),
    /// Popped an empty operand stack, or a `Call` lacked enough arguments.
    StackUnderflow(String),
    /// Native library load, symbol resolution, or call failure.
    ForeignError(String),
    /// Failure reading from standard input.
    IoError(String),
    /// Internal VM invariant violation — a bug in the VM itself, not in the
    /// running program.
    VmInvariant(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::TypeMismatch(msg) => write!(f, "TypeMismatch: {}", msg),
            RuntimeError::NameUndefined(name) => {
                write!(f, "NameUndefined: name '{}' is not defined", name)
            }
            RuntimeError::KeyOrIndex(msg) => write!(f, "KeyOrIndex: {}", msg),
            RuntimeError::ArithmeticError(msg) => write!(f, "ArithmeticError: {}", msg),
            RuntimeError::StackUnderflow(msg) => write!(f, "StackUnderflow: {}", msg),
            RuntimeError::ForeignError(msg) => write!(f, "ForeignError: {}", msg),
            RuntimeError::IoError(msg) => write!(f, "IoError: {}", msg),
            RuntimeError::VmInvariant(msg) => write!(f, "VmInvariant: {}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {}
