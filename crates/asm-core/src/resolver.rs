//! Fixed-point atom-size resolver (spec §4.3).
//!
//! Each section is resolved independently, alternating between a "fast"
//! phase (every atom whose size changed this pass is allowed to take the
//! new size immediately) and a "safe" phase entered after `FASTOPTPHASE`
//! passes, where only the first atom to change size in a given pass is
//! allowed to — every later atom keeps its previous size for that pass.
//! This bounds the worst-case growth per pass once a section has failed to
//! settle quickly, trading a few extra passes for guaranteed termination
//! within `MAXPASSES`.

use crate::atom::AtomPayload;
use crate::error::{AssemblerError, ErrorSink};
use crate::expr::eval_constant;
use crate::section::{Section, SectionFlags, SectionTable};
use crate::size::pcalign;
use crate::symbol::SymbolTable;
use asm_backend::{CpuBackend, DataEvaluator, SizeQuery};
use log::{debug, trace};

/// Passes allowed per section before giving up with error 7.
pub const MAXPASSES: u32 = 1000;
/// Pass count after which a still-unsettled section enters the safe phase.
pub const FASTOPTPHASE: u32 = 200;
/// Times an atom's size may change before its `SizeQuery::resolve_warn`
/// hint is raised, asking the back-end to break the oscillation itself.
pub const MAXSIZECHANGES: u32 = 3;

/// Resolves every section to a fixed point. Returns `false` if any section
/// failed to converge (each such section has already had error 7 reported
/// to `errors`).
pub fn resolve<C, D>(
    sections: &mut SectionTable<C::Instruction, D::Operand, C::Options>,
    symbols: &mut SymbolTable,
    cpu: &C,
    data: &D,
    errors: &mut ErrorSink,
) -> bool
where
    C: CpuBackend,
    D: DataEvaluator,
{
    let mut all_ok = true;
    for (_, sec) in sections.iter_mut() {
        if !resolve_section(sec, symbols, cpu, data, errors) {
            all_ok = false;
        }
    }
    all_ok
}

fn compute_size<C, D>(
    payload: &AtomPayload<C::Instruction, D::Operand, C::Options>,
    query: SizeQuery,
    cpu: &C,
    data: &D,
    symbols: &SymbolTable,
) -> u64
where
    C: CpuBackend,
    D: DataEvaluator,
{
    match payload {
        AtomPayload::Instruction(inst) => cpu.instruction_size(inst, query),
        AtomPayload::DataDef(op, bitsize) => data.data_size(op, *bitsize, query),
        AtomPayload::Data(bytes) => bytes.len() as u64,
        AtomPayload::Space(sp) => {
            eval_constant(&sp.size, &mut |s| symbols.resolved_value(s)).unwrap_or(0).max(0) as u64
        }
        AtomPayload::Label(_)
        | AtomPayload::Rorg(_)
        | AtomPayload::RorgEnd
        | AtomPayload::Opts(_)
        | AtomPayload::PrintText(_)
        | AtomPayload::PrintExpr(_)
        | AtomPayload::Assert(_)
        | AtomPayload::Nlist(_)
        | AtomPayload::Roffs(_) => 0,
    }
}

fn resolve_section<C, D>(
    sec: &mut Section<C::Instruction, D::Operand, C::Options>,
    symbols: &mut SymbolTable,
    cpu: &C,
    data: &D,
    errors: &mut ErrorSink,
) -> bool
where
    C: CpuBackend,
    D: DataEvaluator,
{
    let mut pass: u32 = 0;
    let mut max_passes = MAXPASSES.min(FASTOPTPHASE + 1);
    let mut fastphase = true;
    let section_absolute = sec.flags.contains(SectionFlags::ABSOLUTE);

    loop {
        let mut real_pc = sec.org;
        let mut rorg_active = false;
        let mut rorg_base_real = 0i64;
        let mut rorg_target = 0i64;
        let mut any_changed = false;
        let mut grew = false;
        let mut used_safe_slot = false;

        for atom in &mut sec.atoms {
            match &atom.payload {
                AtomPayload::Rorg(expr) => {
                    if rorg_active {
                        errors.report(AssemblerError::NestedRorg);
                    } else if let Some(target) = eval_constant(expr, &mut |s| symbols.resolved_value(s)) {
                        if target < real_pc {
                            errors.report(AssemblerError::RorgBelowPc { target, pc: real_pc });
                        }
                        rorg_active = true;
                        rorg_base_real = real_pc;
                        rorg_target = target;
                    }
                    atom.lastsize = Some(0);
                    continue;
                }
                AtomPayload::RorgEnd => {
                    if rorg_active {
                        rorg_active = false;
                    } else {
                        errors.report(AssemblerError::UnmatchedRorgEnd);
                    }
                    atom.lastsize = Some(0);
                    continue;
                }
                _ => {}
            }

            real_pc = pcalign(real_pc, atom.align);
            let presented_pc = if rorg_active {
                rorg_target + (real_pc - rorg_base_real)
            } else {
                real_pc
            };

            if let AtomPayload::Label(sym) = &atom.payload {
                if symbols.set_label_pc(*sym, presented_pc) {
                    any_changed = true;
                    trace!("moving label to pc {presented_pc:#x}");
                }
                atom.lastsize = Some(0);
                continue;
            }

            let query = SizeQuery {
                pc: presented_pc,
                section_absolute,
                resolve_warn: atom.changes >= MAXSIZECHANGES,
            };
            let computed = compute_size(&atom.payload, query, cpu, data, symbols);
            // The "one instruction per pass" safe-phase throttle (spec §4.3)
            // applies only to INSTRUCTION atoms; DataDef/Data/Space atoms
            // are always recomputed fresh, fast phase or safe, since their
            // size can legitimately depend on a symbol still settling.
            let is_instruction = matches!(atom.payload, AtomPayload::Instruction(_));

            let effective = match atom.lastsize {
                None => {
                    any_changed = true;
                    computed
                }
                Some(last) if last != computed => {
                    if fastphase || !is_instruction || !used_safe_slot {
                        if is_instruction {
                            used_safe_slot = true;
                        }
                        any_changed = true;
                        atom.changes += 1;
                        if computed > last {
                            grew = true;
                        }
                        trace!("modify size of atom at pc {presented_pc:#x}: {last} -> {computed}");
                        computed
                    } else {
                        last
                    }
                }
                Some(last) => last,
            };
            atom.lastsize = Some(effective);
            real_pc += effective as i64;
        }

        if rorg_active {
            // Missing RORGEND at section end: fall back to the underlying
            // section's real pc (the reference assembler's silent
            // workaround) but still flag it, since it almost always
            // indicates an unbalanced source file.
            errors.report(AssemblerError::UnmatchedRorgEnd);
        }

        sec.pc = real_pc;
        pass += 1;
        trace!("resolve_section({}) pass {pass}{}", sec.name, if fastphase { " (fast)" } else { "" });

        // `while(errors==0 && !done)`: an error reported this pass (nested
        // RORG, rorg below pc, unmatched RORGEND) stops the loop instead of
        // re-reporting the same diagnostic every subsequent pass against
        // unchanged atom state.
        if errors.has_errors() {
            return false;
        }
        if !any_changed {
            debug!("resolve_section({}) converged after {pass} passes", sec.name);
            return true;
        }
        if pass >= max_passes {
            if fastphase && pass < MAXPASSES {
                fastphase = false;
                max_passes = MAXPASSES;
                continue;
            }
            errors.report(AssemblerError::TooManyPasses { section: sec.name.clone() });
            return false;
        }
        if fastphase && !grew {
            // A pass that changed nothing's total size still gets one more
            // chance before the safe phase kicks in early.
            max_passes = (max_passes + 1).min(FASTOPTPHASE);
        }
    }
}
