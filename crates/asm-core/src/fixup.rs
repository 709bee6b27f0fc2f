//! Post-resolution symbol and section fixups (spec §4.6), run after the
//! resolver has converged and before the final assembly pass.

use crate::error::{AssemblerError, ErrorSink};
use crate::expr::{eval_constant, find_base, BaseResult, Expr};
use crate::options::AssemblerOptions;
use crate::section::{SectionFlags, SectionTable};
use crate::symbol::{SymbolFlags, SymbolKind, SymbolTable};
use asm_backend::SymbolId;

/// Reports undefined (`Import`, never defined) symbols as error 22, or
/// unreferenced ones as warning 61, matching the reference assembler's
/// end-of-assembly sweep (priority and flag set per `vasm.c`'s
/// `if (!auto_import && !(flags & (EXPORT|COMMON|WEAK))) ... else if
/// (!REFERENCED) ...`): the hard error takes priority over the
/// unreferenced warning, and an `EXPORT`/`COMMON`/`WEAK` import is exempt
/// from it even with auto-import off. `auto_import` additionally
/// synthesises a zero-valued absolute definition so a `-x` build has
/// something concrete to resolve against.
pub fn undef_syms(symbols: &mut SymbolTable, options: &AssemblerOptions, errors: &mut ErrorSink) {
    let ids: Vec<SymbolId> = symbols.iter().map(|(id, _)| id).collect();
    for id in ids {
        let sym = symbols.get(id);
        if !matches!(sym.kind, SymbolKind::Import) {
            continue;
        }
        let name = sym.name.clone();
        let exempt = sym.flags.intersects(SymbolFlags::EXPORT | SymbolFlags::COMMON | SymbolFlags::WEAK);
        let referenced = sym.flags.contains(SymbolFlags::REFERENCED);

        if !options.auto_import && !exempt {
            errors.report(AssemblerError::UndefinedSymbol(name.clone()));
        } else if !referenced {
            errors.report(AssemblerError::UnreferencedImport(name.clone()));
        }

        if options.auto_import {
            let defined = symbols.define_equate(&name, Expr::Number(0));
            symbols.get_mut(defined).value = Some(0);
        }
    }
}

/// Reclassifies labels flagged `ABSLABEL` by the front end as plain
/// constants (unbinding them from their section), and resolves every
/// `Expression` symbol's relocatable base via [`find_base`], raising error
/// 53 for an equate that turns out not to be relocatable where one is
/// required.
pub fn fix_labels(symbols: &mut SymbolTable, errors: &mut ErrorSink) {
    let ids: Vec<SymbolId> = symbols.iter().map(|(id, _)| id).collect();
    for id in ids {
        let sym = symbols.get(id);
        match &sym.kind {
            SymbolKind::Labsym { pc, .. } => {
                let value = *pc;
                if sym.flags.contains(SymbolFlags::ABSLABEL) {
                    let s = symbols.get_mut(id);
                    s.kind = SymbolKind::Expression(Expr::Number(value));
                    s.value = Some(value);
                } else {
                    symbols.get_mut(id).value = Some(value);
                }
            }
            SymbolKind::Expression(expr) => {
                let name = sym.name.clone();
                let expr = expr.clone();
                // `find_base` decides this before any numeric fold: an
                // equate naming exactly one `Labsym`/`Import` is relocatable
                // regardless of whether that base already happens to have a
                // cached `.value` (symbol processing order within this loop
                // must not change the outcome).
                let is_reloc = |s: SymbolId| {
                    matches!(symbols.get(s).kind, SymbolKind::Labsym { .. } | SymbolKind::Import)
                };
                match find_base(&expr, &is_reloc) {
                    BaseResult::None => {
                        if let Some(v) = eval_constant(&expr, &mut |s| symbols.get(s).value) {
                            symbols.get_mut(id).value = Some(v);
                        } else {
                            errors.report(AssemblerError::ExpressionNotConstant);
                        }
                    }
                    BaseResult::Ok(base) => {
                        let offset = eval_constant(&expr, &mut |s| if s == base { Some(0) } else { symbols.get(s).value });
                        match offset {
                            Some(offset) => {
                                let new_kind = match symbols.get(base).kind {
                                    SymbolKind::Labsym { section, pc } => SymbolKind::Labsym { section, pc: pc + offset },
                                    // Rebasing onto an unresolved import can't be
                                    // reduced to a concrete section/pc here; leave
                                    // it as an unresolved equate rather than
                                    // inventing a kind the rest of the core can't
                                    // represent.
                                    SymbolKind::Import | SymbolKind::Expression(_) => {
                                        errors.report(AssemblerError::ExpressionNotConstant);
                                        continue;
                                    }
                                };
                                let value = match new_kind {
                                    SymbolKind::Labsym { pc, .. } => Some(pc),
                                    _ => None,
                                };
                                let target = symbols.get_mut(id);
                                target.kind = new_kind;
                                target.value = value;
                            }
                            None => errors.report(AssemblerError::ExpressionNotConstant),
                        }
                    }
                    BaseResult::Illegal | BaseResult::PcRel => {
                        errors.report(AssemblerError::NonRelocatableEquate(name));
                    }
                }
            }
            SymbolKind::Import => {}
        }
    }
}

/// Converts every label defined inside an `UNALLOCATED` (offset) section
/// into an absolute `Expression` symbol, so the final pass no longer needs
/// to special-case those sections once their content is torn down.
pub fn convert_offset_labels<I, Op, Opt>(symbols: &mut SymbolTable, sections: &SectionTable<I, Op, Opt>) {
    let ids: Vec<SymbolId> = symbols.iter().map(|(id, _)| id).collect();
    for id in ids {
        let sym = symbols.get(id);
        if let SymbolKind::Labsym { section, pc } = sym.kind {
            let sec = sections.get(section);
            if sec.flags.contains(SectionFlags::UNALLOCATED) {
                let value = pc;
                let replaced = symbols.get_mut(id);
                replaced.kind = SymbolKind::Expression(Expr::Number(value));
                replaced.value = Some(value);
            }
        }
    }
}

/// Drops every `UNALLOCATED` section from the final section list (spec
/// §4.6), after [`convert_offset_labels`] has preserved their labels.
pub fn remove_unalloc_sects<I, Op, Opt>(sections: &mut SectionTable<I, Op, Opt>) {
    sections.remove_unallocated();
}
