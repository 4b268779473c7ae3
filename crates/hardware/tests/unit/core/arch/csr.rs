//! Control Register Tests.

use rvjit_core::EngineError;
use rvjit_core::core::arch::csr::{SATP, Satp, check_csr};

#[test]
fn satp_fields() {
    let satp = Satp::new(8, 0x80);
    assert_eq!(satp.0, (8 << 60) | 0x80);
    assert_eq!(satp.mode(), 8);
    assert_eq!(satp.root_ppn(), 0x80);
    assert_eq!(satp.root_table(), 0x80_000);
    assert!(!satp.is_bare());
    assert!(Satp(0).is_bare());
}

#[test]
fn only_satp_is_implemented() {
    assert_eq!(SATP, 0x180);
    assert!(check_csr(0x180).is_ok());
    for csr in [0x000, 0x100, 0x300, 0xC00, 0xFFF, 0x1180] {
        assert_eq!(check_csr(csr), Err(EngineError::UnsupportedControlRegister(csr)));
    }
}
