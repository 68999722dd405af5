//! # Foreign function bridge
//!
//! Backs the `FFI_CALL` opcode: loads (and caches, by path) a native shared
//! library via [`libloading`], resolves a symbol in it, and invokes it
//! through [`libffi`]'s dynamic call interface, marshaling each argument as
//! a native `i64` or `f64` depending on its `Value` kind and declaring a
//! fixed `f64` return type.
//!
//! Grounded in `original_source/src/sym/vm.py`'s `ffi_call()` (which uses
//! `ctypes.CDLL` the same way — load-and-cache by path, `getattr` to resolve
//! the symbol, per-argument `c_double`/`c_int` based on the Python value's
//! type, fixed `c_double` return). `libloading` + `libffi` is the pairing
//! used for exactly this purpose elsewhere in the retrieval pack (see
//! `davehorner-rsorth` and `tayadev-luma`'s `Cargo.toml`s).

use std::collections::HashMap;

use libffi::middle::{Cif, CodePtr, Type};
use libloading::Library;
use tracing::debug;

use crate::error::RuntimeError;
use crate::value::Value;
use crate::vm::pop;

pub struct ForeignBridge {
    libraries: HashMap<String, Library>,
}

impl ForeignBridge {
    pub fn new() -> Self {
        ForeignBridge {
            libraries: HashMap::new(),
        }
    }

    /// `FFI_CALL`: stack at entry (top-down) is `[library_path, function_name,
    /// arg_count, arg_1, ..., arg_n]`, so pop order is `function_name` then
    /// `library_path`, matching `original_source`'s
    /// `func_name, lib_path = self.stack.pop(), self.stack.pop()`.
    pub fn call(&mut self, stack: &mut Vec<Value>) -> Result<(), RuntimeError> {
        let function_name = pop(stack)?;
        let library_path = pop(stack)?;

        let function_name = expect_str(function_name, "FFI_CALL function name")?;
        let library_path = expect_str(library_path, "FFI_CALL library path")?;

        let arg_count = pop(stack)?.as_int()? as usize;
        let mut args = Vec::with_capacity(arg_count);
        for _ in 0..arg_count {
            args.push(pop(stack)?);
        }
        args.reverse();

        debug!(library = %library_path, function = %function_name, arity = arg_count, "FFI_CALL");

        if !self.libraries.contains_key(&library_path) {
            let lib = unsafe { Library::new(&library_path) }.map_err(|e| {
                RuntimeError::ForeignError(format!("failed to load '{}': {}", library_path, e))
            })?;
            self.libraries.insert(library_path.clone(), lib);
        }
        let lib = self.libraries.get(&library_path).expect("just inserted");

        let symbol = unsafe {
            lib.get::<unsafe extern "C" fn()>(function_name.as_bytes())
        }
        .map_err(|e| {
            RuntimeError::ForeignError(format!(
                "symbol '{}' not found in '{}': {}",
                function_name, library_path, e
            ))
        })?;
        let code_ptr = CodePtr::from_ptr(*symbol as *const _);

        let mut arg_types = Vec::with_capacity(args.len());
        for a in &args {
            arg_types.push(match a {
                Value::Float(_) => Type::f64(),
                _ => Type::i64(),
            });
        }
        let cif = Cif::new(arg_types, Type::f64());

        // libffi::middle::Arg borrows its backing storage, so ints/floats
        // must outlive the call; keep them alive here rather than in a
        // temporary.
        let int_storage: Vec<i64> = args
            .iter()
            .map(|a| match a {
                Value::Float(_) => Ok(0),
                other => other.as_int(),
            })
            .collect::<Result<Vec<i64>, RuntimeError>>()?;
        let float_storage: Vec<f64> = args
            .iter()
            .map(|a| match a {
                Value::Float(f) => *f,
                _ => 0.0,
            })
            .collect();

        let mut call_args = Vec::with_capacity(args.len());
        for (i, a) in args.iter().enumerate() {
            match a {
                Value::Float(_) => call_args.push(libffi::middle::Arg::new(&float_storage[i])),
                _ => call_args.push(libffi::middle::Arg::new(&int_storage[i])),
            }
        }

        let result: f64 = unsafe { cif.call(code_ptr, &call_args) };
        stack.push(Value::Float(result));
        Ok(())
    }
}

fn expect_str(v: Value, what: &str) -> Result<String, RuntimeError> {
    match v {
        Value::Str(s) => Ok(s),
        other => Err(RuntimeError::TypeMismatch(format!(
            "{} must be a string, found {}",
            what,
            other.kind_name()
        ))),
    }
}
