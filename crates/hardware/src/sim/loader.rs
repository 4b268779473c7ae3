//! ELF Image Loader.
//!
//! This module places statically linked RISC-V executables in guest memory. It performs:
//! 1. **Validation:** Accepts 64-bit little-endian ELF files for `EM_RISCV` only.
//! 2. **Placement:** Copies every `PT_LOAD` segment to its virtual address (images
//!    run bare, so that is also the physical address) and clears the part of the
//!    segment beyond the file contents, which holds `.bss`.
//! 3. **Entry:** Reports `e_entry` and the executable segments so the caller can
//!    set the pc and the executable ranges.

use std::fs;
use std::path::Path;

use object::elf;
use object::read::elf::{ElfFile64, FileHeader, ProgramHeader};
use object::{Endianness, Object};

use crate::common::EngineError;
use crate::config::ExecRange;
use crate::soc::GuestMemory;

/// One `PT_LOAD` segment as placed in guest memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Load address.
    pub addr: u64,
    /// Bytes copied from the file.
    pub file_size: usize,
    /// Bytes occupied in memory; the tail past `file_size` is zeroed.
    pub mem_size: usize,
    /// `PF_X` is set.
    pub executable: bool,
}

/// Result of loading an image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedImage {
    /// `e_entry`.
    pub entry: u64,
    /// Loaded segments, in program header order.
    pub segments: Vec<Segment>,
}

impl LoadedImage {
    /// Address ranges of the executable segments.
    pub fn exec_ranges(&self) -> Vec<ExecRange> {
        self.segments
            .iter()
            .filter(|s| s.executable && s.mem_size > 0)
            .map(|s| ExecRange::new(s.addr, s.addr + s.mem_size as u64))
            .collect()
    }
}

fn invalid(reason: impl Into<String>) -> EngineError {
    EngineError::InvalidImage(reason.into())
}

/// Reads an image file from disk.
///
/// # Errors
///
/// Returns `InvalidImage` if the file cannot be read.
pub fn load_binary(path: &Path) -> Result<Vec<u8>, EngineError> {
    fs::read(path).map_err(|e| invalid(format!("could not read '{}': {e}", path.display())))
}

/// Parses `image` and places its loadable segments in `memory`.
///
/// # Arguments
///
/// * `memory` - Guest memory to load into.
/// * `image` - Raw ELF file contents.
///
/// # Returns
///
/// The entry point and the placed segments.
///
/// # Errors
///
/// Returns `InvalidImage` for anything other than a well-formed 64-bit
/// little-endian RISC-V ELF, and `AccessFault` if a segment does not fit in
/// guest memory. Segments before the failing one stay loaded.
pub fn load_elf(memory: &mut GuestMemory, image: &[u8]) -> Result<LoadedImage, EngineError> {
    let file = ElfFile64::<Endianness>::parse(image).map_err(|e| invalid(e.to_string()))?;
    let endian = file.endian();
    if endian != Endianness::Little {
        return Err(invalid("not a little-endian ELF"));
    }
    let machine = file.elf_header().e_machine(endian);
    if machine != elf::EM_RISCV {
        return Err(invalid(format!("not a RISC-V ELF (e_machine {machine})")));
    }

    let mut segments = Vec::new();
    for phdr in file.elf_program_headers() {
        if phdr.p_type(endian) != elf::PT_LOAD {
            continue;
        }
        let addr = phdr.p_vaddr(endian);
        let data = phdr
            .data(endian, image)
            .map_err(|()| invalid(format!("segment at {addr:#x} lies outside the file")))?;
        let mem_size = usize::try_from(phdr.p_memsz(endian))
            .map_err(|_| invalid(format!("segment at {addr:#x} is too large")))?;
        if mem_size < data.len() {
            return Err(invalid(format!("segment at {addr:#x} has p_memsz < p_filesz")));
        }

        memory.load_data(addr, data)?;
        if mem_size > data.len() {
            memory.zero_init(addr + data.len() as u64, mem_size - data.len())?;
        }

        let segment = Segment {
            addr,
            file_size: data.len(),
            mem_size,
            executable: phdr.p_flags(endian) & elf::PF_X != 0,
        };
        tracing::debug!(
            addr = format_args!("{addr:#x}"),
            file_size = segment.file_size,
            mem_size,
            executable = segment.executable,
            "loaded segment"
        );
        segments.push(segment);
    }

    Ok(LoadedImage {
        entry: file.entry(),
        segments,
    })
}
