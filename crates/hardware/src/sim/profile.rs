//! Execution profile built on the hook API.
//!
//! `OpcodeProfile` is an observer that keeps:
//! 1. **Opcode Counts:** One counter per opcode, bumped from pre-execute callbacks.
//! 2. **Memory Counts:** Loads and stores by access width, from memory-access callbacks.
//!
//! Native code does not call per-instruction callbacks, so opcode counts cover
//! interpreted and threaded execution only. Memory counts are complete: while
//! the profile is attached, compiled code takes the observed memory path.

use std::cell::Cell;
use std::rc::Rc;

use crate::common::AccessType;
use crate::core::Hart;
use crate::core::hooks::{HookEvent, HookFn, OwnerId};
use crate::isa::Opcode;

/// Access widths tracked separately: 1, 2, 4 and 8 bytes.
const WIDTHS: usize = 4;

#[derive(Debug)]
struct Counters {
    opcodes: Vec<Cell<u64>>,
    loads: [Cell<u64>; WIDTHS],
    stores: [Cell<u64>; WIDTHS],
}

/// Counts executed opcodes and memory accesses of the hart it is attached to.
#[derive(Clone, Debug)]
pub struct OpcodeProfile {
    counters: Rc<Counters>,
}

impl Default for OpcodeProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl OpcodeProfile {
    /// Creates a profile with every counter at zero.
    pub fn new() -> Self {
        Self {
            counters: Rc::new(Counters {
                opcodes: vec![Cell::new(0); Opcode::COUNT],
                loads: Default::default(),
                stores: Default::default(),
            }),
        }
    }

    /// Registers the profile's callbacks on `hart` under `owner`.
    ///
    /// Clones of the profile share counters, so the caller keeps one to read
    /// the results after the run.
    pub fn attach(&self, hart: &mut Hart, owner: OwnerId) {
        let counters = Rc::clone(&self.counters);
        let on_exec: HookFn = Rc::new(move |_: &mut Hart, event: &HookEvent<'_>, _: OwnerId| {
            if let HookEvent::PreExec(instr) = event {
                bump(&counters.opcodes[instr.opcode.index()]);
            }
        });

        let counters = Rc::clone(&self.counters);
        let on_access: HookFn = Rc::new(move |_: &mut Hart, event: &HookEvent<'_>, _: OwnerId| {
            let HookEvent::MemAccess(info) = event else {
                return;
            };
            let slot = info.size.trailing_zeros() as usize;
            let table = match info.kind {
                AccessType::Load => &counters.loads,
                AccessType::Store => &counters.stores,
                AccessType::Fetch => return,
            };
            if let Some(cell) = table.get(slot) {
                bump(cell);
            }
        });

        let hooks = hart.hooks_mut();
        hooks.register_pre_execute(owner, Opcode::ALL, on_exec);
        hooks.register_memory_access(owner, on_access);
    }

    /// Times `op` was dispatched.
    pub fn count(&self, op: Opcode) -> u64 {
        self.counters.opcodes[op.index()].get()
    }

    /// Dispatches counted across all opcodes.
    pub fn total(&self) -> u64 {
        self.counters.opcodes.iter().map(Cell::get).sum()
    }

    /// Completed loads.
    pub fn loads(&self) -> u64 {
        self.counters.loads.iter().map(Cell::get).sum()
    }

    /// Completed stores.
    pub fn stores(&self) -> u64 {
        self.counters.stores.iter().map(Cell::get).sum()
    }

    /// Completed loads of `size` bytes.
    pub fn loads_of(&self, size: usize) -> u64 {
        width_count(&self.counters.loads, size)
    }

    /// Completed stores of `size` bytes.
    pub fn stores_of(&self, size: usize) -> u64 {
        width_count(&self.counters.stores, size)
    }

    /// Formats the non-zero opcode counts, most frequent first, followed by
    /// the memory totals.
    pub fn report(&self) -> String {
        let mut rows: Vec<(Opcode, u64)> = Opcode::ALL
            .iter()
            .map(|&op| (op, self.count(op)))
            .filter(|&(_, n)| n > 0)
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.index().cmp(&b.0.index())));

        let mut out = String::from("opcode statistics:\n");
        for (op, n) in rows {
            out.push_str(&format!("  {:<8} {n}\n", op.mnemonic()));
        }
        out.push_str(&format!("loads: {}  stores: {}\n", self.loads(), self.stores()));
        out
    }
}

fn bump(cell: &Cell<u64>) {
    cell.set(cell.get() + 1);
}

fn width_count(table: &[Cell<u64>; WIDTHS], size: usize) -> u64 {
    if !size.is_power_of_two() {
        return 0;
    }
    table
        .get(size.trailing_zeros() as usize)
        .map_or(0, Cell::get)
}
