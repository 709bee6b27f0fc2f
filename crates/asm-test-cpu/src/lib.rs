//! A minimal `CpuBackend`/`DataEvaluator` pair used only by `asm-core`'s own
//! tests. Not a real instruction set — just enough shape (a relative branch
//! that can flip between a short and long encoding depending on distance, a
//! fixed-width immediate load, and a data directive that can either fold to
//! a constant or defer to a relocation) to drive the resolver and final
//! pass through their interesting cases.

use asm_backend::{BackendError, CpuBackend, DataEvaluator, EncodedBlock, Reloc, SizeQuery, SymbolId};

/// Per-section options toggled by an `Opts` atom (`.option longbranch`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TestOptions {
    /// Force every branch to the long (3-byte) encoding, bypassing the
    /// usual short-range check. Mirrors a CPU directive that disables
    /// automatic relative-branch shrinking.
    pub force_long_branch: bool,
}

/// An instruction for the toy back-end.
#[derive(Debug, Clone)]
pub enum Instruction {
    /// One byte, no operand.
    Nop,
    /// A one-byte immediate load (opcode + value).
    LoadImmediate(u8),
    /// A relative branch to an already-known absolute address. Encodes as
    /// 2 bytes (`opcode`, `i8` displacement) when the target is reachable,
    /// or 3 bytes (`opcode`, `u16` displacement) otherwise — the classic
    /// case that makes a resolver's size oscillate as surrounding atoms
    /// grow or shrink.
    Branch { target_pc: i64 },
}

const BRANCH_SHORT_OPCODE: u8 = 0x10;
const BRANCH_LONG_OPCODE: u8 = 0x11;
const NOP_OPCODE: u8 = 0x00;
const LOAD_OPCODE: u8 = 0x02;

fn branch_fits_short(pc_after_short: i64, target_pc: i64) -> bool {
    let disp = target_pc - pc_after_short;
    (-128..=127).contains(&disp)
}

#[derive(Debug, Clone, Default)]
pub struct TestCpu {
    force_long_branch: bool,
}

impl TestCpu {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CpuBackend for TestCpu {
    type Instruction = Instruction;
    type Options = TestOptions;

    fn instruction_size(&self, inst: &Instruction, query: SizeQuery) -> u64 {
        match inst {
            Instruction::Nop => 1,
            Instruction::LoadImmediate(_) => 2,
            Instruction::Branch { target_pc } => {
                let short = !self.force_long_branch
                    && !query.resolve_warn
                    && branch_fits_short(query.pc + 2, *target_pc);
                if short {
                    2
                } else {
                    3
                }
            }
        }
    }

    fn eval_instruction(&self, inst: &Instruction, query: SizeQuery) -> Result<EncodedBlock, BackendError> {
        match inst {
            Instruction::Nop => Ok(EncodedBlock::new(vec![NOP_OPCODE])),
            Instruction::LoadImmediate(v) => Ok(EncodedBlock::new(vec![LOAD_OPCODE, *v])),
            Instruction::Branch { target_pc } => {
                if self.instruction_size(inst, query) == 2 {
                    let disp = (*target_pc - (query.pc + 2)) as i8;
                    Ok(EncodedBlock::new(vec![BRANCH_SHORT_OPCODE, disp as u8]))
                } else {
                    let disp = (*target_pc - (query.pc + 3)) as i16;
                    let [lo, hi] = disp.to_le_bytes();
                    Ok(EncodedBlock::new(vec![BRANCH_LONG_OPCODE, lo, hi]))
                }
            }
        }
    }

    fn apply_options(&mut self, opts: &TestOptions) {
        self.force_long_branch = opts.force_long_branch;
    }
}

/// A data-definition operand: either an already-constant value, or one that
/// must be left for a linker to patch (an external/exported symbol
/// reference).
#[derive(Debug, Clone)]
pub enum Operand {
    Constant(i64),
    Symbolic { symbol: SymbolId, addend: i64 },
}

#[derive(Debug, Clone, Default)]
pub struct TestData;

impl TestData {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DataEvaluator for TestData {
    type Operand = Operand;

    fn data_size(&self, _op: &Operand, bitsize: u8, _query: SizeQuery) -> u64 {
        u64::from(bitsize) / 8
    }

    fn eval_data(&self, op: &Operand, bitsize: u8, _query: SizeQuery) -> Result<EncodedBlock, BackendError> {
        let width = usize::from(bitsize) / 8;
        match op {
            Operand::Constant(value) => {
                let bytes = value.to_le_bytes();
                Ok(EncodedBlock::new(bytes[..width].to_vec()))
            }
            Operand::Symbolic { symbol, addend } => {
                let reloc = Reloc {
                    offset: 0,
                    symbol: *symbol,
                    size_bits: bitsize,
                    pc_relative: false,
                    addend: *addend,
                };
                Ok(EncodedBlock::with_relocs(vec![0; width], vec![reloc]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_branch_when_target_is_close() {
        let cpu = TestCpu::new();
        let query = SizeQuery { pc: 0x100, section_absolute: true, resolve_warn: false };
        let inst = Instruction::Branch { target_pc: 0x110 };
        assert_eq!(cpu.instruction_size(&inst, query), 2);
    }

    #[test]
    fn long_branch_when_target_is_far() {
        let cpu = TestCpu::new();
        let query = SizeQuery { pc: 0x100, section_absolute: true, resolve_warn: false };
        let inst = Instruction::Branch { target_pc: 0x1000 };
        assert_eq!(cpu.instruction_size(&inst, query), 3);
    }

    #[test]
    fn resolve_warn_forces_long_encoding() {
        let cpu = TestCpu::new();
        let query = SizeQuery { pc: 0x100, section_absolute: true, resolve_warn: true };
        let inst = Instruction::Branch { target_pc: 0x110 };
        assert_eq!(cpu.instruction_size(&inst, query), 3);
    }

    #[test]
    fn data_size_matches_bitwidth() {
        let data = TestData::new();
        let query = SizeQuery { pc: 0, section_absolute: false, resolve_warn: false };
        assert_eq!(data.data_size(&Operand::Constant(5), 8, query), 1);
        assert_eq!(data.data_size(&Operand::Constant(5), 16, query), 2);
        assert_eq!(data.data_size(&Operand::Constant(5), 32, query), 4);
    }

    #[test]
    fn symbolic_data_emits_a_relocation() {
        let data = TestData::new();
        let query = SizeQuery { pc: 0, section_absolute: false, resolve_warn: false };
        let op = Operand::Symbolic { symbol: SymbolId(3), addend: 4 };
        let block = data.eval_data(&op, 16, query).unwrap();
        assert_eq!(block.bytes, vec![0, 0]);
        assert_eq!(block.relocs.len(), 1);
        assert_eq!(block.relocs[0].symbol, SymbolId(3));
        assert_eq!(block.relocs[0].addend, 4);
    }
}
