//! Flattens a finished [`asm_core::Assembler`] into the `ObjectSection`/
//! `ObjectSymbol` views an [`asm_backend::OutputWriter`] consumes. This is
//! driver-level glue, not a core concern (spec §4.8's listing note: the
//! core captures typed data, formatting/serialising it is someone else's
//! job) — it owns the byte buffers the writer borrows from.

use crate::Asm;
use asm_backend::{ObjectSection, ObjectSymbol, Reloc};
use asm_core::{AtomPayload, SymbolKind};

/// Owned byte/reloc storage for every section, built once so the
/// `ObjectSection` views below can borrow from it.
pub struct Flattened {
    bytes: Vec<Vec<u8>>,
    relocs: Vec<Vec<Reloc>>,
}

impl Flattened {
    #[must_use]
    pub fn build(asm: &Asm) -> Self {
        let mut bytes = Vec::new();
        let mut relocs = Vec::new();
        for (_, sec) in asm.sections.iter() {
            let mut sec_bytes = Vec::new();
            let mut sec_relocs = Vec::new();
            for atom in &sec.atoms {
                // Atom bytes are written in source order, but `pcalign`
                // (and a `RORG`/`ROFFS` jump) can leave a gap between this
                // atom's resolved address and the offset the buffer has
                // reached so far; pad it out with the section's fill byte
                // before writing so every later offset still lines up with
                // `resolved_pc`.
                let want = (atom.resolved_pc - sec.org).max(0) as usize;
                if want > sec_bytes.len() {
                    sec_bytes.resize(want, sec.pad);
                }
                let base = sec_bytes.len() as u32;
                match &atom.payload {
                    AtomPayload::Data(data) => {
                        for r in &atom.relocs {
                            sec_relocs.push(Reloc {
                                offset: base + r.offset,
                                symbol: r.symbol,
                                size_bits: r.size_bits,
                                pc_relative: r.pc_relative,
                                addend: r.addend,
                            });
                        }
                        sec_bytes.extend_from_slice(data);
                    }
                    AtomPayload::Space(sp) => {
                        let size = asm_core::eval_constant(&sp.size, &mut |s| asm.symbols.resolved_value(s)).unwrap_or(0).max(0) as usize;
                        sec_bytes.resize(sec_bytes.len() + size, sp.fill.unwrap_or(0) as u8);
                    }
                    _ => {}
                }
            }
            bytes.push(sec_bytes);
            relocs.push(sec_relocs);
        }
        Self { bytes, relocs }
    }

    #[must_use]
    pub fn sections<'a>(&'a self, asm: &'a Asm) -> Vec<ObjectSection<'a>> {
        asm.sections
            .iter()
            .zip(self.bytes.iter().zip(self.relocs.iter()))
            .map(|((_, sec), (data, relocs))| ObjectSection {
                name: &sec.name,
                attr: &sec.attr,
                org: sec.org,
                align: sec.align,
                data,
                relocs,
            })
            .collect()
    }

    #[must_use]
    pub fn symbols<'a>(&self, asm: &'a Asm) -> Vec<ObjectSymbol<'a>> {
        asm.symbols
            .iter()
            .map(|(_, sym)| {
                let section = match sym.kind {
                    SymbolKind::Labsym { section, .. } => Some(asm.sections.get(section).name.as_str()),
                    SymbolKind::Import | SymbolKind::Expression(_) => None,
                };
                ObjectSymbol {
                    name: &sym.name,
                    value: sym.value.unwrap_or(0),
                    section,
                    exported: sym.flags.contains(asm_core::SymbolFlags::EXPORT),
                    imported: matches!(sym.kind, SymbolKind::Import),
                    common: sym.flags.contains(asm_core::SymbolFlags::COMMON),
                    weak: sym.flags.contains(asm_core::SymbolFlags::WEAK),
                }
            })
            .collect()
    }
}
