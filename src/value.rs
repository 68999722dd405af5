//! # Value Representation for the Sym VM
//!
//! This module defines [`Value`], the universal runtime type used on the
//! Sym virtual machine's operand stack, in frame locals, and inside lists
//! and maps.
//!
//! ## Supported types
//! - `Int(i64)` – 64-bit signed integer
//! - `Float(f64)` – 64-bit floating point
//! - `Str(String)` – UTF-8 string
//! - `List(Rc<RefCell<Vec<Value>>>)` – mutable, reference-counted list
//! - `Map(Rc<RefCell<HashMap<HashableValue, Value>>>)` – mutable, reference-counted map
//! - `Closure(Rc<Closure>)` – a named, uncaptured function reference
//!
//! There is no distinct boolean type: comparisons and logical operators
//! yield `Int(0)`/`Int(1)`, and any value can be asked for its truthiness
//! via [`Value::as_bool`].
//!
//! ## Design
//! - `Rc<RefCell<...>>` gives lists and maps reference-identity sharing and
//!   interior mutability, the same trick the teacher runtime uses for its
//!   own `List`/`Dict` variants.
//! - [`HashableValue`] exists only because `f64` has no total `Eq`/`Hash` in
//!   Rust; map keys hash and compare by IEEE-754 bit pattern instead, so the
//!   map can be keyed by any `Value` as the specification requires.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::bytecode::Chunk;
use crate::error::RuntimeError;

/// A named, uncaptured function reference. `BuildClosure` produces these by
/// looking up a chunk in the VM's chunk table; there is no free-variable
/// capture (see Design Decisions in `SPEC_FULL.md`).
#[derive(Debug)]
pub struct Closure {
    pub name: String,
    pub params: Vec<String>,
    pub chunk: Rc<Chunk>,
}

impl std::fmt::Display for Closure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<closure {}>", self.name)
    }
}

/// Value type for the VM stack, locals, and containers.
#[derive(Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    List(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<HashMap<HashableValue, Value>>>),
    Closure(Rc<Closure>),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn map(pairs: Vec<(Value, Value)>) -> Value {
        let mut m = HashMap::new();
        for (k, v) in pairs {
            m.insert(HashableValue(k), v);
        }
        Value::Map(Rc::new(RefCell::new(m)))
    }

    /// Convert the value into an integer, applying Sym's lenient coercion
    /// rules (string parsing, container length). Meant for contexts where
    /// only a true number is ever meaningfully on the stack — `GET_ITEM`/
    /// `SET_ITEM` indices, `FFI_CALL` argument marshaling — not for the
    /// binary arithmetic operators, which must reject non-numeric operands
    /// outright (see `vm::ops_arith::require_numeric`).
    pub fn as_int(&self) -> Result<i64, RuntimeError> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::Float(f) => Ok(*f as i64),
            Value::Str(s) => s
                .parse::<i64>()
                .map_err(|_| RuntimeError::TypeMismatch(format!("invalid literal for int(): '{}'", s))),
            Value::List(l) => Ok(l.borrow().len() as i64),
            Value::Map(m) => Ok(m.borrow().len() as i64),
            Value::Closure(c) => Err(RuntimeError::TypeMismatch(format!(
                "closure '{}' cannot be used as an integer",
                c.name
            ))),
        }
    }

    /// Convert the value into a float, widening integers.
    pub fn as_float(&self) -> Result<f64, RuntimeError> {
        match self {
            Value::Int(i) => Ok(*i as f64),
            Value::Float(f) => Ok(*f),
            other => Err(RuntimeError::TypeMismatch(format!(
                "expected a number, found {}",
                other.kind_name()
            ))),
        }
    }

    /// Truthiness: falsy is `0`, `0.0`, `""`, an empty list, or an empty map;
    /// everything else (including any closure) is truthy.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(l) => !l.borrow().is_empty(),
            Value::Map(m) => !m.borrow().is_empty(),
            Value::Closure(_) => true,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Closure(_) => "closure",
        }
    }

    /// Convert the value into its human-readable string form.
    ///
    /// Cyclic lists/maps print as `[...]`/`{...}` instead of recursing
    /// forever, tracked by `Rc` pointer identity.
    pub fn to_display_string(&self) -> String {
        fn helper(val: &Value, seen: &mut HashSet<usize>) -> String {
            match val {
                Value::Int(i) => i.to_string(),
                Value::Float(f) => {
                    if f.fract() == 0.0 && f.is_finite() {
                        format!("{:.1}", f)
                    } else {
                        f.to_string()
                    }
                }
                Value::Str(s) => s.clone(),
                Value::Closure(c) => c.to_string(),

                Value::List(list) => {
                    let ptr = Rc::as_ptr(list) as usize;
                    if !seen.insert(ptr) {
                        return "[...]".to_string();
                    }
                    let inner: Vec<String> =
                        list.borrow().iter().map(|v| helper(v, seen)).collect();
                    format!("[{}]", inner.join(", "))
                }

                Value::Map(map) => {
                    let ptr = Rc::as_ptr(map) as usize;
                    if !seen.insert(ptr) {
                        return "{...}".to_string();
                    }
                    let inner: Vec<String> = map
                        .borrow()
                        .iter()
                        .map(|(k, v)| format!("{}: {}", helper(&k.0, seen), helper(v, seen)))
                        .collect();
                    format!("{{{}}}", inner.join(", "))
                }
            }
        }

        let mut seen = HashSet::new();
        helper(self, &mut seen)
    }

    /// Structural equality, used by `EQ`/`NEQ` and by `HashableValue`.
    pub fn structural_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                Rc::ptr_eq(a, b) || {
                    let (a, b) = (a.borrow(), b.borrow());
                    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.structural_eq(y))
                }
            }
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b) || {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).map_or(false, |bv| v.structural_eq(bv)))
            },
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Newtype wrapper giving `Value` a total `Hash`/`Eq` so it can be used as a
/// map key, as the specification requires. Floats hash and compare by bit
/// pattern (`f64::to_bits`): two floats are equal keys iff their bit
/// patterns match, so `NaN` is self-consistent as a key even though it is
/// not reflexive under IEEE-754 `==`.
#[derive(Clone)]
pub struct HashableValue(pub Value);

impl PartialEq for HashableValue {
    /// Deliberately *not* `structural_eq`: that treats `Int(3)` and
    /// `Float(3.0)` as equal (correct for the `==` operator), but equal map
    /// keys must hash identically, and `Hash` below tags `Int`/`Float`
    /// differently. So key equality is same-variant only.
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for HashableValue {}

impl Hash for HashableValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.0 {
            Value::Int(i) => {
                0u8.hash(state);
                i.hash(state);
            }
            Value::Float(f) => {
                1u8.hash(state);
                f.to_bits().hash(state);
            }
            Value::Str(s) => {
                2u8.hash(state);
                s.hash(state);
            }
            Value::List(l) => {
                3u8.hash(state);
                Rc::as_ptr(l).hash(state);
            }
            Value::Map(m) => {
                4u8.hash(state);
                Rc::as_ptr(m).hash(state);
            }
            Value::Closure(c) => {
                5u8.hash(state);
                Rc::as_ptr(c).hash(state);
            }
        }
    }
}
