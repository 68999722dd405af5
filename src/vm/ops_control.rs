//! Call and return protocol.
//!
//! Grounded in `original_source/src/sym/vm.py`'s `CALL`/`RETURN` handlers,
//! translated from Python's implicit `Frame` objects into this crate's
//! explicit `call_stack: Vec<Frame>` (see `SPEC_FULL.md` §4.3). Jump
//! instructions are simple enough that `vm.rs` inlines them directly rather
//! than delegating here, unlike the teacher's `ops_control.rs` which routes
//! every control-flow opcode through a handler.

use crate::error::RuntimeError;
use crate::value::Value;
use crate::vm::Frame;

use super::pop;

/// `CALL`: pop the callee (must be a closure), bind its parameters from the
/// operand stack (in reverse push order), and push a new frame.
pub(super) fn handle_call(
    stack: &mut Vec<Value>,
    call_stack: &mut Vec<Frame>,
) -> Result<(), RuntimeError> {
    let callee = pop(stack)?;
    let closure = match callee {
        Value::Closure(c) => c,
        other => {
            return Err(RuntimeError::TypeMismatch(format!(
                "'{}' is not callable",
                other.kind_name()
            )))
        }
    };

    let arity = closure.params.len();
    if stack.len() < arity {
        return Err(RuntimeError::StackUnderflow(format!(
            "not enough arguments for function '{}': expected {}, found {}",
            closure.name,
            arity,
            stack.len()
        )));
    }
    let stack_start = stack.len() - arity;

    let mut locals = std::collections::HashMap::with_capacity(arity);
    for param_name in closure.params.iter().rev() {
        let arg = pop(stack)?;
        locals.insert(param_name.clone(), arg);
    }

    call_stack.push(Frame {
        closure,
        ip: 0,
        stack_start,
        locals,
        is_main: false,
    });
    Ok(())
}

/// `RETURN`: pop the return value, pop the current frame, truncate the
/// operand stack to the popped frame's `stack_start`, and push the return
/// value back. Returns `true` if the call stack is now empty (only
/// reachable if `__main__` itself executed `Return`).
pub(super) fn handle_return(
    stack: &mut Vec<Value>,
    call_stack: &mut Vec<Frame>,
) -> Result<bool, RuntimeError> {
    let ret_val = pop(stack)?;
    let popped = call_stack
        .pop()
        .ok_or_else(|| RuntimeError::VmInvariant("RETURN with no active frame".to_string()))?;
    if call_stack.is_empty() {
        return Ok(true);
    }
    stack.truncate(popped.stack_start);
    stack.push(ret_val);
    Ok(false)
}
