//! Engine units.
//!
//! This module contains the two caches the hart consults on every step: the
//! address translator with its TLBs, and the block cache of decoded (and
//! possibly compiled) instruction sequences.

/// Direct-mapped cache of instruction blocks.
pub mod cache;

/// Memory Management Unit with TLBs and page table walker.
pub mod mmu;
