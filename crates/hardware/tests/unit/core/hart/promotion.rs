//! Promotion Tests.
//!
//! A straight-line block is compiled by the lookup that brings it to exactly
//! `jit_bound` hits. Compiled or not, the architectural results must match the
//! interpreter. On hosts without native code generation the JIT stays off and
//! the same programs run threaded.

use crate::common::builder::instruction::asm;
use crate::common::harness::{CODE_BASE, TestContext};
use pretty_assertions::assert_eq;
use rvjit_core::core::jit;

const DATA: u64 = 0x8000;

/// Loops `x2` times over a four-instruction straight-line body that touches memory.
fn counting_loop() -> Vec<u32> {
    vec![
        asm().addi(1, 1, 1).build(),
        asm().add(3, 3, 1).build(),
        asm().sd(10, 3, 0).build(),
        asm().ld(4, 10, 0).build(),
        asm().blt(1, 2, -16).build(),
        asm().ecall().build(),
    ]
}

fn run_loop(mut tc: TestContext, iterations: u64) -> TestContext {
    tc = tc.load_program(CODE_BASE, &counting_loop());
    tc.set_reg(2, iterations);
    tc.set_reg(10, DATA);
    let _ = tc.run(0);
    assert!(tc.hart.is_halted());
    tc
}

#[test]
fn compiled_loop_matches_interpreter() {
    let interp = run_loop(TestContext::new(), 20);
    let jitted = run_loop(TestContext::with_jit(3), 20);

    assert_eq!(jitted.hart.regs(), interp.hart.regs());
    assert_eq!(jitted.pc(), interp.pc());
    assert_eq!(jitted.hart.instr_counter(), interp.hart.instr_counter());
    assert_eq!(jitted.read_u64(DATA), interp.read_u64(DATA));

    assert_eq!(interp.get_reg(3), 210);
    assert_eq!(interp.get_reg(4), 210);
    assert_eq!(interp.hart.instr_counter(), 5 * 20 + 1);

    let body = jitted.hart.cache().peek(CODE_BASE).expect("loop body cached");
    assert_eq!(body.is_compiled(), jit::AVAILABLE);
    assert!(!interp.hart.cache().peek(CODE_BASE).expect("cached").is_compiled());
}

#[test]
fn promotion_fires_at_exactly_jit_bound_hits() {
    // The first iteration collects the body; each later one is a lookup hit.
    let below = run_loop(TestContext::with_jit(5), 5);
    let body = below.hart.cache().peek(CODE_BASE).expect("cached");
    assert_eq!(body.hits(), 4);
    assert!(!body.is_compiled());

    let at = run_loop(TestContext::with_jit(5), 6);
    let body = at.hart.cache().peek(CODE_BASE).expect("cached");
    assert_eq!(body.hits(), 5);
    assert_eq!(body.is_compiled(), jit::AVAILABLE);
    assert_eq!(at.get_reg(3), 21);
}

#[test]
fn blocks_with_branches_stay_threaded() {
    let mut tc = TestContext::with_jit(2).load_program(
        CODE_BASE,
        &[
            asm().addi(1, 1, 1).build(),
            asm().bne(0, 0, 8).build(),
            asm().blt(1, 2, -8).build(),
            asm().ecall().build(),
        ],
    );
    tc.set_reg(2, 10);
    let _ = tc.run(0);

    let body = tc.hart.cache().peek(CODE_BASE).expect("cached");
    assert_eq!(body.len(), 2);
    assert!(body.hits() >= 2);
    assert!(!body.is_straight_line());
    assert!(!body.is_compiled());
    assert_eq!(tc.get_reg(1), 10);
}

#[test]
fn disabled_jit_never_compiles() {
    let tc = run_loop(TestContext::new(), 30);
    assert!(!tc.hart.jit_enabled());
    let body = tc.hart.cache().peek(CODE_BASE).expect("cached");
    assert_eq!(body.hits(), 29);
    assert!(!body.is_compiled());
}
