//! General-Purpose Register File Tests.

use rvjit_core::EngineError;
use rvjit_core::core::arch::Gpr;

#[test]
fn x0_reads_zero_and_ignores_writes() {
    let mut gpr = Gpr::new();
    gpr.write(0, 0xDEAD).expect("valid index");
    assert_eq!(gpr.read(0), Ok(0));
}

#[test]
fn write_then_read() {
    let mut gpr = Gpr::new();
    for i in 1..32 {
        gpr.write(i, i as u64 * 3).expect("valid index");
    }
    for i in 1..32 {
        assert_eq!(gpr.read(i), Ok(i as u64 * 3));
    }
}

#[test]
fn index_32_is_rejected() {
    let mut gpr = Gpr::new();
    assert_eq!(gpr.read(32), Err(EngineError::InvalidRegisterIndex(32)));
    assert_eq!(gpr.write(99, 1), Err(EngineError::InvalidRegisterIndex(99)));
}

#[test]
fn fill_skips_x0() {
    let mut gpr = Gpr::new();
    gpr.fill(7);
    let regs = gpr.snapshot();
    assert_eq!(regs[0], 0);
    assert!(regs[1..].iter().all(|&v| v == 7));
}

#[test]
fn dump_lists_every_register_with_abi_names() {
    let mut gpr = Gpr::new();
    gpr.write(10, 0x2A).expect("valid index");
    let dump = gpr.dump();
    assert_eq!(dump.lines().count(), 16);
    assert!(dump.contains("a0=0x000000000000002a"));
    assert!(dump.contains("x31"));
}
