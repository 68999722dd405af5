//! End-to-end scenarios: build an AST in memory, serialize it the way the
//! out-of-scope front end would, run it through the `sym` binary, and check
//! stdout/stderr. Exercises the full compile-then-execute path rather than
//! calling `Compiler`/`VirtualMachine` directly, so a regression anywhere in
//! the pipeline — compiler emission, VM dispatch, or the CLI driver itself —
//! shows up here.

use std::io::Write;
use std::process::Command;

use sym_runtime::ast::{Const, Program, Stmt, StmtKind};

fn at(line: u32, kind: StmtKind) -> Stmt {
    Stmt::new(line, 1, kind)
}

fn push_int(line: u32, v: i64) -> Stmt {
    at(line, StmtKind::Push { value: Const::Int(v) })
}

fn run_program(program: &Program) -> std::process::Output {
    let json = serde_json::to_string(program).expect("serialize test AST");
    let mut file = tempfile_path();
    file.1.write_all(json.as_bytes()).expect("write temp AST file");
    drop(file.1);

    Command::new(env!("CARGO_BIN_EXE_sym"))
        .arg(&file.0)
        .output()
        .expect("run sym binary")
}

/// Minimal temp-file helper: write under `std::env::temp_dir()` keyed by the
/// test's thread ID so parallel tests don't collide, without pulling in a
/// dedicated tempfile crate for a handful of small JSON files.
fn tempfile_path() -> (std::path::PathBuf, std::fs::File) {
    let unique = format!(
        "sym_test_{:?}_{}.json",
        std::thread::current().id(),
        std::process::id()
    );
    let path = std::env::temp_dir().join(unique);
    let file = std::fs::File::create(&path).expect("create temp AST file");
    (path, file)
}

#[test]
fn arithmetic_and_print_yields_five() {
    let program = Program(vec![
        push_int(1, 2),
        push_int(1, 3),
        at(1, StmtKind::Add),
        at(1, StmtKind::Print),
    ]);
    let output = run_program(&program);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim_end(), "5");
}

#[test]
fn conditional_without_taken_branch_prints_f() {
    // push 0; if { print "t" } else { print "f" }
    let program = Program(vec![
        push_int(1, 0),
        at(
            1,
            StmtKind::Conditional {
                then_block: Program(vec![at(
                    2,
                    StmtKind::Push {
                        value: Const::Str("t".to_string()),
                    },
                )]),
                else_block: Some(Program(vec![
                    at(
                        3,
                        StmtKind::Push {
                            value: Const::Str("f".to_string()),
                        },
                    ),
                    at(3, StmtKind::Print),
                ])),
            },
        ),
    ]);
    // The then-block intentionally leaves a dangling value (never printed)
    // to prove the else-block executed instead, per the one-branch-only
    // invariant.
    let output = run_program(&program);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim_end(), "f");
}

#[test]
fn while_loop_counts_zero_one_two() {
    // i = 0; while i < 3 { print i; i = i + 1 }
    let program = Program(vec![
        push_int(1, 0),
        at(1, StmtKind::Store { name: "i".to_string() }),
        at(
            2,
            StmtKind::WhileLoop {
                condition_block: Program(vec![
                    at(2, StmtKind::Load { name: "i".to_string() }),
                    push_int(2, 3),
                    at(2, StmtKind::Lt),
                ]),
                body_block: Program(vec![
                    at(3, StmtKind::Load { name: "i".to_string() }),
                    at(3, StmtKind::Print),
                    at(4, StmtKind::Load { name: "i".to_string() }),
                    push_int(4, 1),
                    at(4, StmtKind::Add),
                    at(4, StmtKind::Store { name: "i".to_string() }),
                ]),
            },
        ),
    ]);
    let output = run_program(&program);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim_end(), "012");
}

#[test]
fn function_call_doubles_twenty_one() {
    // fn double(x) { x * 2 }
    // ref double; call; print
    let program = Program(vec![
        at(
            1,
            StmtKind::FunctionDef {
                name: "double".to_string(),
                params: vec!["x".to_string()],
                body: Program(vec![
                    at(1, StmtKind::Load { name: "x".to_string() }),
                    push_int(1, 2),
                    at(1, StmtKind::Mul),
                ]),
            },
        ),
        push_int(2, 21),
        at(2, StmtKind::FunctionRef { name: "double".to_string() }),
        at(2, StmtKind::FunctionCall),
        at(2, StmtKind::Print),
    ]);
    let output = run_program(&program);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim_end(), "42");
}

#[test]
fn list_build_and_length_is_three() {
    let program = Program(vec![
        at(
            1,
            StmtKind::ListLiteral {
                program: Program(vec![push_int(1, 10), push_int(1, 20), push_int(1, 30)]),
            },
        ),
        at(1, StmtKind::Length),
        at(1, StmtKind::Print),
    ]);
    let output = run_program(&program);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim_end(), "3");
}

#[test]
fn divide_by_zero_reports_location_and_exits_nonzero() {
    let program = Program(vec![
        push_int(1, 1),
        push_int(5, 0),
        at(5, StmtKind::Div),
    ]);
    let output = run_program(&program);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ArithmeticError"), "stderr: {}", stderr);
    assert!(stderr.contains("line 5"), "stderr: {}", stderr);
    assert!(stderr.contains("function '__main__'"), "stderr: {}", stderr);
}
