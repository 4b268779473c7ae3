//! Machine Driver Tests.
//!
//! Verifies setup from configuration, image placement, the step budget, fault
//! reporting and the eager-compilation path of `Machine::run`.

use crate::common::builder::instruction::asm;
use crate::common::harness::{CODE_BASE, TEST_MEMORY, test_config};
use pretty_assertions::assert_eq;
use rvjit_core::config::Config;
use rvjit_core::isa::abi::{REG_A0, REG_SP};
use rvjit_core::{EngineError, Hart, Machine};
use std::io::Write;
use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;

fn image(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

fn machine(config: Config, words: &[u32]) -> Machine {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut m = Machine::new(config).expect("guest memory");
    m.load_data(CODE_BASE, &image(words)).expect("image fits");
    m
}

/// Sums 1..=10 into a0 and halts.
fn sum_program() -> Vec<u32> {
    vec![
        asm().addi(5, 0, 10).build(),
        asm().add(10, 10, 5).build(),
        asm().addi(5, 5, -1).build(),
        asm().bne(5, 0, -8).build(),
        asm().ecall().build(),
    ]
}

#[test]
fn stack_top_seeds_sp() {
    let mut config = test_config();
    config.general.stack_top = Some(0x8_0000);
    let m = Machine::new(config).expect("guest memory");
    assert_eq!(m.hart().get_reg(REG_SP), Ok(0x8_0000));
    assert_eq!(m.hart().pc(), CODE_BASE);
    assert_eq!(m.config().general.stack_top, Some(0x8_0000));

    let m = Machine::new(test_config()).expect("guest memory");
    assert_eq!(m.hart().get_reg(REG_SP), Ok(0));
}

#[test]
fn code_built_config_is_validated() {
    let mut config = test_config();
    config.cache.bb_cache_size = 100;
    assert!(matches!(Hart::new(&config), Err(EngineError::InvalidConfig(_))));
    assert!(matches!(
        Machine::new(config.clone()),
        Err(EngineError::InvalidConfig(_))
    ));

    config.cache.bb_cache_size = 64;
    config.memory.tlb_size = 10;
    assert!(matches!(Hart::new(&config), Err(EngineError::InvalidConfig(_))));

    config.memory.tlb_size = 16;
    config.cache.cached_bb_size = 0;
    assert!(matches!(Machine::new(config), Err(EngineError::InvalidConfig(_))));
}

#[test]
fn runs_to_halt() {
    let mut m = machine(test_config(), &sum_program());
    assert_eq!(m.run(), Ok(1 + 3 * 10 + 1));
    assert!(m.hart().is_halted());
    assert_eq!(m.hart().get_reg(REG_A0), Ok(55));
    assert!(m.dump_regs().contains("halted"));
}

#[test]
fn max_steps_bounds_the_run() {
    let mut config = test_config();
    config.general.max_steps = 50;
    let mut m = machine(config, &[asm().addi(1, 1, 1).build(), asm().jal(0, -4).build()]);
    let executed = m.run().expect("no faults");
    assert!((50..=51).contains(&executed));
    assert!(!m.hart().is_halted());
    assert_eq!(m.hart().instr_counter(), executed);
}

#[test]
fn faults_are_returned() {
    let mut m = machine(test_config(), &[asm().addi(1, 0, 1).build(), 0]);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("rvjit_core=debug"))
        .with_test_writer()
        .finish();
    let result = tracing::subscriber::with_default(subscriber, || m.run());
    assert_eq!(
        result,
        Err(EngineError::UnknownInstruction {
            pc: CODE_BASE + 4,
            raw: 0
        })
    );
    assert_eq!(m.hart().get_reg(1), Ok(1));
}

#[test]
fn image_placement() {
    let mut m = Machine::new(test_config()).expect("guest memory");
    m.load_data(0x2000, &[0xAA; 16]).expect("in range");
    m.zero_init(0x2004, 8).expect("in range");
    assert_eq!(
        m.hart().memory().read_bytes(0x2000, 16).expect("in range"),
        &[0xAA, 0xAA, 0xAA, 0xAA, 0, 0, 0, 0, 0, 0, 0, 0, 0xAA, 0xAA, 0xAA, 0xAA]
    );

    let end = TEST_MEMORY as u64;
    assert!(matches!(
        m.load_data(end - 2, &[1, 2, 3, 4]),
        Err(EngineError::AccessFault { .. })
    ));
    assert!(m.zero_init(end, 1).is_err());
}

#[test]
fn image_and_config_from_disk() {
    let mut program = NamedTempFile::new().expect("temp file");
    program.write_all(&image(&sum_program())).expect("write image");
    program.flush().expect("flush");
    let mut config_file = NamedTempFile::new().expect("temp file");
    config_file
        .write_all(br#"{ "memory": { "size": 1048576 }, "general": { "max_steps": 0 } }"#)
        .expect("write config");
    config_file.flush().expect("flush");

    let json = std::fs::read_to_string(config_file.path()).expect("read config");
    let config = Config::from_json(&json).expect("valid document");
    let bytes = std::fs::read(program.path()).expect("read image");
    let mut m = Machine::new(config).expect("guest memory");
    m.load_data(CODE_BASE, &bytes).expect("image fits");

    assert_eq!(m.run(), Ok(32));
    assert_eq!(m.hart().get_reg(REG_A0), Ok(55));
}

#[test]
fn configured_jit_run_matches_interpreter() {
    let json = r#"{
        "memory": { "size": 1048576, "tlb_size": 16 },
        "cache": { "bb_cache_size": 64, "cached_bb_size": 16 },
        "jit": { "use_jit": true, "jit_bound": 2 },
        "exec_ranges": [ { "start": 4096, "end": 8192 } ]
    }"#;
    let config = Config::from_json(json).expect("valid document");
    let mut jitted = machine(config, &sum_program());
    let mut interp = machine(test_config(), &sum_program());

    assert_eq!(jitted.run(), interp.run());
    assert_eq!(jitted.hart().regs(), interp.hart().regs());
    assert_eq!(jitted.hart().pc(), interp.hart().pc());
}
