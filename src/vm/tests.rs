use std::collections::HashMap;
use std::rc::Rc;

use super::*;
use crate::bytecode::{Chunk, CompiledProgram, Instr, MAIN_CHUNK};
use crate::config::RunConfig;
use crate::error::RuntimeError;
use crate::value::Value;

struct NullHook;
impl DebugHook for NullHook {
    fn on_breakpoint(&mut self, _inspect: VmInspect<'_>) {}
}

fn run_main(code: Vec<Instr>) -> Result<VirtualMachine, RuntimeError> {
    run_with_chunks(code, HashMap::new())
}

fn run_with_chunks(
    main_code: Vec<Instr>,
    mut extra: HashMap<String, Chunk>,
) -> Result<VirtualMachine, RuntimeError> {
    let mut chunks = HashMap::new();
    for (name, chunk) in extra.drain() {
        chunks.insert(name, Rc::new(chunk));
    }
    chunks.insert(
        MAIN_CHUNK.to_string(),
        Rc::new(Chunk {
            params: Vec::new(),
            code: main_code,
        }),
    );
    let program = CompiledProgram {
        chunks,
        debug_maps: HashMap::new(),
    };
    let mut vm = VirtualMachine::new(program, RunConfig::default()).expect("vm construction");
    vm.run(&mut NullHook)?;
    Ok(vm)
}

#[test]
fn rot_moves_top_to_bottom() {
    let vm = run_main(vec![
        Instr::Push(Value::Int(1)),
        Instr::Push(Value::Int(2)),
        Instr::Push(Value::Int(3)),
        Instr::Rot,
        Instr::Halt,
    ])
    .expect("program runs");
    let top_three: Vec<i64> = vm.stack.iter().map(|v| v.as_int().unwrap()).collect();
    assert_eq!(top_three, vec![3, 1, 2]);
}

#[test]
fn build_map_assigns_key_to_value_instead_of_appending() {
    let vm = run_main(vec![
        Instr::Push(Value::Str("a".to_string())),
        Instr::Push(Value::Int(1)),
        Instr::Push(Value::Str("b".to_string())),
        Instr::Push(Value::Int(2)),
        Instr::BuildMap(2),
        Instr::Halt,
    ])
    .expect("BUILD_MAP must not panic the way the append-based original does");

    match &vm.stack[0] {
        Value::Map(m) => {
            let m = m.borrow();
            assert_eq!(
                m.get(&crate::value::HashableValue(Value::Str("a".to_string())))
                    .unwrap()
                    .as_int()
                    .unwrap(),
                1
            );
            assert_eq!(
                m.get(&crate::value::HashableValue(Value::Str("b".to_string())))
                    .unwrap()
                    .as_int()
                    .unwrap(),
                2
            );
        }
        other => panic!("expected a map, got {}", other.kind_name()),
    }
}

#[test]
fn set_item_pops_container_key_value_and_pushes_container_back() {
    let vm = run_main(vec![
        Instr::Push(Value::Int(10)),
        Instr::Push(Value::Int(20)),
        Instr::Push(Value::Int(30)),
        Instr::BuildList(3),
        Instr::Push(Value::Int(1)),
        Instr::Push(Value::Int(99)),
        Instr::SetItem,
        Instr::Halt,
    ])
    .expect("program runs");

    match &vm.stack[0] {
        Value::List(items) => {
            let items = items.borrow();
            assert_eq!(items[0].as_int().unwrap(), 10);
            assert_eq!(items[1].as_int().unwrap(), 99);
            assert_eq!(items[2].as_int().unwrap(), 30);
        }
        other => panic!("expected a list, got {}", other.kind_name()),
    }
}

#[test]
fn call_protocol_consumes_args_and_leaves_one_return_value() {
    let mut double_chunk = Chunk::new(vec!["x".to_string()]);
    double_chunk.code = vec![
        Instr::LoadName("x".to_string()),
        Instr::Push(Value::Int(2)),
        Instr::Mul,
        Instr::Return,
    ];
    let mut extra = HashMap::new();
    extra.insert("double".to_string(), double_chunk);

    let vm = run_with_chunks(
        vec![
            Instr::Push(Value::Int(21)),
            Instr::BuildClosure("double".to_string()),
            Instr::Call,
            Instr::Halt,
        ],
        extra,
    )
    .expect("program runs");

    assert_eq!(vm.stack.len(), 1);
    assert_eq!(vm.stack[0].as_int().unwrap(), 42);
}

#[test]
fn divide_by_zero_raises_arithmetic_error() {
    let result = run_main(vec![
        Instr::Push(Value::Int(1)),
        Instr::Push(Value::Int(0)),
        Instr::Div,
        Instr::Halt,
    ]);
    assert!(matches!(result, Err(RuntimeError::ArithmeticError(_))));
}

#[test]
fn sub_on_numeric_strings_raises_type_mismatch_instead_of_coercing() {
    let result = run_main(vec![
        Instr::Push(Value::Str("5".to_string())),
        Instr::Push(Value::Str("2".to_string())),
        Instr::Sub,
        Instr::Halt,
    ]);
    assert!(matches!(result, Err(RuntimeError::TypeMismatch(_))));
}

#[test]
fn mul_div_mod_on_non_numeric_operand_raise_type_mismatch() {
    for instr in [Instr::Mul, Instr::Div, Instr::Mod] {
        let result = run_main(vec![
            Instr::Push(Value::Int(4)),
            Instr::BuildList(0),
            instr,
            Instr::Halt,
        ]);
        assert!(matches!(result, Err(RuntimeError::TypeMismatch(_))));
    }
}

#[test]
fn load_name_of_unbound_identifier_errors() {
    let result = run_main(vec![Instr::LoadName("missing".to_string()), Instr::Halt]);
    assert!(matches!(result, Err(RuntimeError::NameUndefined(name)) if name == "missing"));
}

#[test]
fn store_name_in_main_writes_globals_visible_after_a_call_returns() {
    let mut noop_chunk = Chunk::new(vec![]);
    noop_chunk.code = vec![Instr::Push(Value::Int(0)), Instr::Return];
    let mut extra = HashMap::new();
    extra.insert("noop".to_string(), noop_chunk);

    let vm = run_with_chunks(
        vec![
            Instr::Push(Value::Int(7)),
            Instr::StoreName("x".to_string()),
            Instr::BuildClosure("noop".to_string()),
            Instr::Call,
            Instr::Drop,
            Instr::LoadName("x".to_string()),
            Instr::Halt,
        ],
        extra,
    )
    .expect("program runs");

    assert_eq!(vm.stack.last().unwrap().as_int().unwrap(), 7);
}
