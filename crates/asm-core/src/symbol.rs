//! Symbol table (spec §3, §4.5).

use crate::expr::Expr;
use asm_backend::{SectionId, SymbolId};
use bitflags::bitflags;
use std::collections::HashMap;

bitflags! {
    /// Per-symbol state flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SymbolFlags: u16 {
        const EXPORT      = 1 << 0;
        const COMMON      = 1 << 1;
        const WEAK        = 1 << 2;
        /// Set the first time any expression refers to this symbol.
        const REFERENCED  = 1 << 3;
        /// A label whose section turned out to contain only one absolute
        /// definition, reclassified to a plain constant (spec §4.6).
        const ABSLABEL    = 1 << 4;
    }
}

/// What a symbol currently denotes.
#[derive(Debug)]
pub enum SymbolKind {
    /// A label bound to a position within a section. `pc` is the absolute
    /// address the resolver last assigned the label's defining atom.
    Labsym { section: SectionId, pc: i64 },
    /// An as-yet-undefined symbol referenced from elsewhere (`.extern`/auto-import).
    Import,
    /// An equate: `name = expr`, resolved once `expr` is constant.
    Expression(Expr),
}

pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub flags: SymbolFlags,
    /// Cached constant value, filled in once `kind` resolves to one.
    pub value: Option<i64>,
    /// `.comm`/`ds`-style declared size, in bytes (0 for ordinary labels).
    pub size: u64,
    /// Requested alignment, in bytes (0/1 = none).
    pub alignment: u32,
}

impl Symbol {
    #[must_use]
    pub fn is_defined(&self) -> bool {
        !matches!(self.kind, SymbolKind::Import)
    }
}

/// Owns every symbol and the name index used to intern/look them up.
#[derive(Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: HashMap<String, SymbolId>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            symbols: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    #[must_use]
    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(i as u32), s))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SymbolId, &mut Symbol)> {
        self.symbols
            .iter_mut()
            .enumerate()
            .map(|(i, s)| (SymbolId(i as u32), s))
    }

    /// Returns the existing symbol of this name, or interns a fresh
    /// `Import` placeholder for it (the reference assembler's
    /// "new_import-if-not-found" idiom used by every forward reference).
    pub fn intern_import(&mut self, name: &str) -> SymbolId {
        if let Some(id) = self.find(name) {
            return id;
        }
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name: name.to_string(),
            kind: SymbolKind::Import,
            flags: SymbolFlags::empty(),
            value: None,
            size: 0,
            alignment: 0,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Binds `name` to a label position, promoting an existing `Import`
    /// placeholder in place if one exists (so every prior reference to it
    /// observes the definition). `pc` is a provisional address, refined by
    /// the resolver on every subsequent pass until it stabilises.
    pub fn define_label(&mut self, name: &str, section: SectionId, pc: i64) -> SymbolId {
        let id = self.intern_import(name);
        let sym = self.get_mut(id);
        sym.kind = SymbolKind::Labsym { section, pc };
        id
    }

    /// Updates an already-bound label's address, as found during a resolver
    /// pass. Returns `true` if the address actually changed (the resolver's
    /// `done` signal for this atom).
    pub fn set_label_pc(&mut self, id: SymbolId, pc: i64) -> bool {
        match &mut self.get_mut(id).kind {
            SymbolKind::Labsym { pc: cur, .. } if *cur != pc => {
                *cur = pc;
                true
            }
            _ => false,
        }
    }

    /// Binds `name` to an equate expression, same promote-in-place rule.
    pub fn define_equate(&mut self, name: &str, expr: Expr) -> SymbolId {
        let id = self.intern_import(name);
        let sym = self.get_mut(id);
        sym.kind = SymbolKind::Expression(expr);
        id
    }

    pub fn mark_referenced(&mut self, id: SymbolId) {
        self.get_mut(id).flags |= SymbolFlags::REFERENCED;
    }

    /// The best-effort constant value of `id` usable while folding another
    /// expression: a label's current (possibly provisional) address, an
    /// equate's cached value if already resolved, or `None` for an
    /// `Import` or an equate not yet constant.
    #[must_use]
    pub fn resolved_value(&self, id: SymbolId) -> Option<i64> {
        let sym = self.get(id);
        match sym.kind {
            SymbolKind::Labsym { pc, .. } => Some(pc),
            SymbolKind::Expression(_) => sym.value,
            SymbolKind::Import => None,
        }
    }
}
