//! Final assembly pass (spec §4.4): turns every resolved `Instruction` and
//! `DataDef` atom into literal bytes, expands `Space`/`Roffs` blocks,
//! evaluates deferred `Assert`s, and dispatches line/stab records to a
//! debug-info collaborator. Runs exactly once, after the resolver has
//! converged on every section.

use crate::atom::{AtomPayload, SpaceBlock};
use crate::error::{AssemblerError, ErrorSink};
use crate::expr::{eval_constant, find_base, BaseResult};
use crate::listing::ListingRow;
use crate::options::AssemblerOptions;
use crate::section::{Section, SectionFlags, SectionTable};
use crate::size::pcalign;
use crate::stabs::StabDef;
use crate::symbol::{SymbolKind, SymbolTable};
use asm_backend::{CpuBackend, DataEvaluator, DebugInfoSink, SizeQuery};
use log::warn;
use std::collections::HashSet;

/// Runs the final pass over every section. Returns the accumulated stab
/// records in source order; diagnostics are reported to `errors` as they
/// are found rather than collected here.
#[allow(clippy::too_many_arguments)]
pub fn assemble<C, D>(
    sections: &mut SectionTable<C::Instruction, D::Operand, C::Options>,
    symbols: &mut SymbolTable,
    cpu: &mut C,
    data: &D,
    options: &AssemblerOptions,
    mut debug_sink: Option<&mut dyn DebugInfoSink>,
    errors: &mut ErrorSink,
    listing: &mut Vec<ListingRow>,
) -> Vec<StabDef>
where
    C: CpuBackend,
    D: DataEvaluator,
{
    let mut stabs = Vec::new();
    // Dedupe BSS/offset-section-data warnings per source line, since a
    // single bad directive can expand into several atoms.
    let mut bss_warned: HashSet<(u32, u32)> = HashSet::new();

    let ids: Vec<_> = sections.iter().map(|(id, _)| id).collect();
    for id in ids {
        if errors.should_abort() {
            break;
        }
        let sec = sections.get_mut(id);
        assemble_section(id, sec, symbols, cpu, data, options, debug_sink.as_deref_mut(), errors, &mut bss_warned, &mut stabs, listing);
    }

    if let Some(sink) = debug_sink {
        sink.finish();
    }

    stabs
}

#[allow(clippy::too_many_arguments)]
fn assemble_section<C, D>(
    sec_id: asm_backend::SectionId,
    sec: &mut Section<C::Instruction, D::Operand, C::Options>,
    symbols: &mut SymbolTable,
    cpu: &mut C,
    data: &D,
    options: &AssemblerOptions,
    mut debug_sink: Option<&mut dyn DebugInfoSink>,
    errors: &mut ErrorSink,
    bss_warned: &mut HashSet<(u32, u32)>,
    stabs: &mut Vec<StabDef>,
    listing: &mut Vec<ListingRow>,
) where
    C: CpuBackend,
    D: DataEvaluator,
{
    let section_absolute = sec.flags.contains(SectionFlags::ABSOLUTE);
    let is_bss = sec.is_bss();
    let is_offset = sec.flags.contains(SectionFlags::UNALLOCATED);
    let mut pc = sec.org;
    let mut rorg_active = false;
    let mut rorg_base_real = 0i64;
    let mut rorg_target = 0i64;
    let ialign = cpu.instruction_alignment();

    for (atom_index, atom) in sec.atoms.iter_mut().enumerate() {
        if errors.should_abort() {
            break;
        }
        let errors_before = errors.errors.len();
        match &atom.payload {
            AtomPayload::Rorg(expr) => {
                if let Some(target) = eval_constant(expr, &mut |s| symbols.resolved_value(s)) {
                    rorg_active = true;
                    rorg_base_real = pc;
                    rorg_target = target;
                }
                atom.resolved_pc = pc;
                continue;
            }
            AtomPayload::RorgEnd => {
                rorg_active = false;
                atom.resolved_pc = pc;
                continue;
            }
            _ => {}
        }

        let aligned = pcalign(pc, atom.align);
        if aligned != pc {
            match &atom.payload {
                AtomPayload::Instruction(_) if !options.noialign => {
                    errors.report(AssemblerError::InstructionAutoAligned { section: sec.name.clone(), align: atom.align });
                }
                AtomPayload::DataDef(_, _) => {
                    errors.report(AssemblerError::DataAutoAligned { section: sec.name.clone(), align: atom.align });
                }
                _ => {}
            }
        }
        pc = aligned;
        atom.resolved_pc = if rorg_active { rorg_target + (pc - rorg_base_real) } else { pc };

        let query = SizeQuery {
            pc: atom.resolved_pc,
            section_absolute,
            resolve_warn: atom.changes >= crate::resolver::MAXSIZECHANGES,
        };

        let advanced = match &atom.payload {
            AtomPayload::Instruction(inst) => {
                if ialign > 1 && atom.resolved_pc % i64::from(ialign) != 0 {
                    errors.report(AssemblerError::InstructionAutoAligned { section: sec.name.clone(), align: ialign });
                }
                match cpu.eval_instruction(inst, query) {
                    Ok(block) => {
                        let size = block.size();
                        atom.relocs = block.relocs;
                        atom.payload = AtomPayload::Data(block.bytes);
                        size
                    }
                    Err(e) => {
                        warn!("instruction evaluation failed at {:#x}: {e}", atom.resolved_pc);
                        errors.report(AssemblerError::IllegalRelocation);
                        0
                    }
                }
            }
            AtomPayload::DataDef(op, bitsize) => {
                if is_offset {
                    if bss_warned.insert((atom.src.file, atom.src.line)) {
                        errors.report(AssemblerError::InitialisedDataInOffsetSection);
                    }
                } else if is_bss && bss_warned.insert((atom.src.file, atom.src.line)) {
                    errors.report(AssemblerError::InitialisedDataInBss);
                }
                match data.eval_data(op, *bitsize, query) {
                    Ok(block) => {
                        let size = block.size();
                        atom.relocs = block.relocs;
                        atom.payload = AtomPayload::Data(block.bytes);
                        size
                    }
                    Err(e) => {
                        warn!("data evaluation failed at {:#x}: {e}", atom.resolved_pc);
                        errors.report(AssemblerError::IllegalRelocation);
                        0
                    }
                }
            }
            AtomPayload::Data(bytes) => bytes.len() as u64,
            AtomPayload::Space(sp) => expand_space(sp, symbols, is_bss, is_offset, atom.src, errors, bss_warned),
            AtomPayload::Roffs(expr) => {
                match eval_constant(expr, &mut |s| symbols.resolved_value(s)) {
                    Some(target) => {
                        if target < atom.resolved_pc {
                            errors.report(AssemblerError::RorgBelowPc { target, pc: atom.resolved_pc });
                            0
                        } else {
                            (target - atom.resolved_pc) as u64
                        }
                    }
                    None => {
                        errors.report(AssemblerError::ExpressionNotConstant);
                        0
                    }
                }
            }
            AtomPayload::Assert(assertion) => {
                match eval_constant(&assertion.condition, &mut |s| symbols.resolved_value(s)) {
                    Some(0) => errors.report(AssemblerError::AssertionFailed(assertion.message.clone())),
                    Some(_) => true,
                    None => errors.report(AssemblerError::ExpressionNotConstant),
                };
                0
            }
            AtomPayload::Nlist(rec) => {
                if let Some(value) = eval_constant(&rec.value, &mut |s| symbols.resolved_value(s)) {
                    let is_reloc = |s: asm_backend::SymbolId| {
                        matches!(symbols.get(s).kind, SymbolKind::Labsym { .. } | SymbolKind::Import)
                    };
                    if let BaseResult::Ok(base) = find_base(&rec.value, &is_reloc) {
                        symbols.mark_referenced(base);
                    }
                    stabs.push(StabDef {
                        name: rec.name.clone(),
                        nlist_type: rec.nlist_type,
                        other: rec.other,
                        desc: rec.desc,
                        value,
                    });
                }
                0
            }
            AtomPayload::Opts(opt) => {
                cpu.apply_options(opt);
                0
            }
            AtomPayload::PrintExpr(_) | AtomPayload::PrintText(_) | AtomPayload::Label(_) => 0,
            AtomPayload::Rorg(_) | AtomPayload::RorgEnd => 0,
        };

        if let Some(sink) = debug_sink.as_deref_mut() {
            if options.dwarf_version.is_some() && advanced > 0 {
                sink.line(&sec.name, atom.src.file, atom.src.line);
            }
        }

        let error_code = errors.errors[errors_before..].last().map(AssemblerError::code);
        listing.push(ListingRow {
            section: sec_id,
            atom_index,
            pc: atom.resolved_pc,
            line: atom.src.line,
            error_code,
        });

        match pc.checked_add(advanced as i64) {
            Some(next) => pc = next,
            None => {
                errors.report(AssemblerError::AddressOverflow);
                pc = i64::MAX;
            }
        }
    }

    if let Some(sink) = debug_sink {
        if options.dwarf_version.is_some() {
            sink.end_sequence(&sec.name);
        }
    }

    sec.pc = pc;
}

fn expand_space(
    sp: &SpaceBlock,
    symbols: &SymbolTable,
    is_bss: bool,
    is_offset: bool,
    src: crate::atom::SourcePos,
    errors: &mut ErrorSink,
    bss_warned: &mut HashSet<(u32, u32)>,
) -> u64 {
    let size = eval_constant(&sp.size, &mut |s| symbols.resolved_value(s)).unwrap_or(0).max(0) as u64;
    if sp.fill.is_some() {
        if is_offset {
            if bss_warned.insert((src.file, src.line)) {
                errors.report(AssemblerError::InitialisedDataInOffsetSection);
            }
        } else if is_bss && bss_warned.insert((src.file, src.line)) {
            errors.report(AssemblerError::InitialisedDataInBss);
        }
    }
    size
}
