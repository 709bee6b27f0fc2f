//! Builds a small fixed program to drive through the pipeline.
//!
//! Parsing is out of scope for this repository (spec §1): there is no
//! tokenizer or expression parser here to turn an arbitrary source file
//! into atoms. What the driver *can* demonstrate end to end — resolving,
//! assembling, symbol finalisation, and object emission — it does with a
//! small hand-built program, the same role the teacher's test harness
//! plays by driving `emu-core` with a fixed instruction stream rather than
//! a full disassembler.
use crate::Asm;
use asm_core::{Expr, SourcePos};
use asm_test_cpu::{Instruction, Operand};

fn at(line: u32) -> SourcePos {
    SourcePos { file: 0, line }
}

/// Emits:
/// ```text
/// start:  nop
///         dc.b 0x41
/// mid:    dc.w external_fn
///         nop
/// end:
/// answer  equ 42
///         assert answer
/// ```
pub fn build(asm: &mut Asm) {
    asm.default_section();

    asm.push_label("start", at(1));
    asm.push_instruction(Instruction::Nop, 1, at(1));
    asm.push_datadef(Operand::Constant(0x41), 8, 1, at(2));

    let external_fn = asm.intern_import("external_fn");
    asm.push_label("mid", at(3));
    asm.push_datadef(Operand::Symbolic { symbol: external_fn, addend: 0 }, 16, 1, at(3));
    asm.push_instruction(Instruction::Nop, 1, at(4));
    asm.push_label("end", at(5));

    let answer = asm.define_equate("answer", Expr::Number(42));
    asm.push_assert(Expr::Sym(answer), Some("answer must be non-zero".to_string()), at(6));
    asm.push_print_expr(Expr::Sym(answer), at(6));
}
