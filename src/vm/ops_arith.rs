//! Arithmetic, comparison, and logical operators.
//!
//! Grounded in `original_source/src/sym/vm.py`'s binary-op dispatch (the
//! `b, a = pop(), pop()` convention — the operand pushed *second* is popped
//! *first* and becomes the left-hand side) and in the teacher's
//! `vm/ops_arith.rs` module shape (one `pub(super) fn(&mut Vec<Value>)` per
//! opcode).

use crate::error::RuntimeError;
use crate::value::Value;

use super::pop;

fn binary(stack: &mut Vec<Value>) -> Result<(Value, Value), RuntimeError> {
    let b = pop(stack)?;
    let a = pop(stack)?;
    Ok((a, b))
}

/// `SUB`/`MUL`/`DIV`/`MOD` are numeric-only: unlike `as_int()`'s lenient
/// coercion (meant for indices and FFI argument marshaling), these operators
/// must reject a `Str`/`List`/`Map`/`Closure` operand with a `TypeMismatch`
/// rather than silently coercing it (e.g. a string's `parse::<i64>()` or a
/// list's length).
fn require_numeric(op: &str, a: &Value, b: &Value) -> Result<(), RuntimeError> {
    let is_number = |v: &Value| matches!(v, Value::Int(_) | Value::Float(_));
    if !is_number(a) || !is_number(b) {
        return Err(RuntimeError::TypeMismatch(format!(
            "unsupported operand types for {}: '{}' and '{}'",
            op,
            a.kind_name(),
            b.kind_name()
        )));
    }
    Ok(())
}

/// `ADD`: list+list concatenates, list+non-list appends, string+anything
/// stringifies the right operand and concatenates, numeric+numeric sums
/// (float if either side is float).
pub(super) fn handle_add(stack: &mut Vec<Value>) -> Result<(), RuntimeError> {
    let (a, b) = binary(stack)?;
    let result = match (&a, &b) {
        (Value::List(l), Value::List(r)) => {
            let mut items = l.borrow().clone();
            items.extend(r.borrow().iter().cloned());
            Value::list(items)
        }
        (Value::List(l), other) => {
            let mut items = l.borrow().clone();
            items.push(other.clone());
            Value::list(items)
        }
        (Value::Str(s), other) => Value::Str(format!("{}{}", s, other.to_display_string())),
        (Value::Float(_), _) | (_, Value::Float(_)) => {
            Value::Float(a.as_float()? + b.as_float()?)
        }
        (Value::Int(_), Value::Int(_)) => Value::Int(a.as_int()? + b.as_int()?),
        _ => {
            return Err(RuntimeError::TypeMismatch(format!(
                "unsupported operand types for +: '{}' and '{}'",
                a.kind_name(),
                b.kind_name()
            )))
        }
    };
    stack.push(result);
    Ok(())
}

macro_rules! numeric_binop {
    ($name:ident, $op:tt, $opname:expr) => {
        pub(super) fn $name(stack: &mut Vec<Value>) -> Result<(), RuntimeError> {
            let (a, b) = binary(stack)?;
            require_numeric($opname, &a, &b)?;
            let result = if matches!(a, Value::Float(_)) || matches!(b, Value::Float(_)) {
                Value::Float(a.as_float()? $op b.as_float()?)
            } else {
                Value::Int(a.as_int()? $op b.as_int()?)
            };
            stack.push(result);
            Ok(())
        }
    };
}

numeric_binop!(handle_sub, -, "-");
numeric_binop!(handle_mul, *, "*");

/// `DIV`: float division if either operand is a float, else integer
/// division truncating toward zero.
pub(super) fn handle_div(stack: &mut Vec<Value>) -> Result<(), RuntimeError> {
    let (a, b) = binary(stack)?;
    require_numeric("/", &a, &b)?;
    if matches!(a, Value::Float(_)) || matches!(b, Value::Float(_)) {
        let bf = b.as_float()?;
        if bf == 0.0 {
            return Err(RuntimeError::ArithmeticError("float division by zero".to_string()));
        }
        stack.push(Value::Float(a.as_float()? / bf));
    } else {
        let bi = b.as_int()?;
        if bi == 0 {
            return Err(RuntimeError::ArithmeticError(
                "integer division or modulo by zero".to_string(),
            ));
        }
        stack.push(Value::Int(a.as_int()? / bi));
    }
    Ok(())
}

pub(super) fn handle_mod(stack: &mut Vec<Value>) -> Result<(), RuntimeError> {
    let (a, b) = binary(stack)?;
    require_numeric("%", &a, &b)?;
    let bi = b.as_int()?;
    if bi == 0 {
        return Err(RuntimeError::ArithmeticError(
            "integer division or modulo by zero".to_string(),
        ));
    }
    stack.push(Value::Int(a.as_int()? % bi));
    Ok(())
}

pub(super) fn handle_eq(stack: &mut Vec<Value>) -> Result<(), RuntimeError> {
    let (a, b) = binary(stack)?;
    stack.push(Value::Int(a.structural_eq(&b) as i64));
    Ok(())
}

pub(super) fn handle_neq(stack: &mut Vec<Value>) -> Result<(), RuntimeError> {
    let (a, b) = binary(stack)?;
    stack.push(Value::Int(!a.structural_eq(&b) as i64));
    Ok(())
}

fn compare(a: &Value, b: &Value) -> Result<std::cmp::Ordering, RuntimeError> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        _ => a
            .as_float()?
            .partial_cmp(&b.as_float()?)
            .ok_or_else(|| RuntimeError::TypeMismatch("cannot order NaN".to_string())),
    }
}

macro_rules! comparison {
    ($name:ident, $ord:pat) => {
        pub(super) fn $name(stack: &mut Vec<Value>) -> Result<(), RuntimeError> {
            let (a, b) = binary(stack)?;
            let ord = compare(&a, &b)?;
            stack.push(Value::Int(matches!(ord, $ord) as i64));
            Ok(())
        }
    };
}

comparison!(handle_lt, std::cmp::Ordering::Less);
comparison!(handle_gt, std::cmp::Ordering::Greater);
comparison!(handle_lte, std::cmp::Ordering::Less | std::cmp::Ordering::Equal);
comparison!(handle_gte, std::cmp::Ordering::Greater | std::cmp::Ordering::Equal);

pub(super) fn handle_and(stack: &mut Vec<Value>) -> Result<(), RuntimeError> {
    let (a, b) = binary(stack)?;
    stack.push(Value::Int((a.as_bool() && b.as_bool()) as i64));
    Ok(())
}

pub(super) fn handle_or(stack: &mut Vec<Value>) -> Result<(), RuntimeError> {
    let (a, b) = binary(stack)?;
    stack.push(Value::Int((a.as_bool() || b.as_bool()) as i64));
    Ok(())
}

pub(super) fn handle_not(stack: &mut Vec<Value>) -> Result<(), RuntimeError> {
    let a = pop(stack)?;
    stack.push(Value::Int(!a.as_bool() as i64));
    Ok(())
}
