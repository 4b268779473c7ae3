//! Page-table construction helpers shared by the MMU tests.

use rvjit_core::soc::GuestMemory;

pub const V: u64 = 1 << 0;
pub const R: u64 = 1 << 1;
pub const W: u64 = 1 << 2;
pub const X: u64 = 1 << 3;

/// Root table at 0x10000, level-1 table at 0x11000, level-0 table at 0x12000.
pub const ROOT: u64 = 0x10000;
pub const L1: u64 = 0x11000;
pub const L0: u64 = 0x12000;

pub const MEM_SIZE: usize = 4 << 20;

pub fn make_pte(pa: u64, perms: u64) -> u64 {
    ((pa >> 12) << 10) | perms
}

/// Writes the entry for `vpn_index` into the table at `table`.
pub fn write_pte(mem: &mut GuestMemory, table: u64, vpn_index: u64, pte: u64) {
    mem.store(table + vpn_index * 8, pte, 8).expect("table inside memory");
}

/// `satp` for Sv39 rooted at [`ROOT`].
pub fn sv39_satp() -> u64 {
    (8 << 60) | (ROOT >> 12)
}

/// Maps the 4 KiB page `va` to `pa` through the ROOT -> L1 -> L0 chain.
pub fn map_4k(mem: &mut GuestMemory, va: u64, pa: u64, perms: u64) {
    let vpn2 = (va >> 30) & 0x1FF;
    let vpn1 = (va >> 21) & 0x1FF;
    let vpn0 = (va >> 12) & 0x1FF;
    write_pte(mem, ROOT, vpn2, make_pte(L1, V));
    write_pte(mem, L1, vpn1, make_pte(L0, V));
    write_pte(mem, L0, vpn0, make_pte(pa, perms | V));
}
