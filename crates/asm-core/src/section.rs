//! Section & atom registry (spec §4.1).
//!
//! Sections own their atoms in a dense arena (`Vec<Atom<..>>`) rather than
//! the original's singly-linked list — atoms are referenced by index
//! everywhere a pointer would have been used in the C original (symbol
//! backrefs, listing rows). This sidesteps the aliasing a mutable linked
//! list would force on a safe-Rust port.

use crate::atom::{Atom, AtomPayload};
use crate::expr::Expr;
use asm_backend::SectionId;
use bitflags::bitflags;

bitflags! {
    /// Per-section state flags (spec §3, `Section.flags`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectionFlags: u16 {
        /// Section currently assembles to absolute addresses.
        const ABSOLUTE     = 1 << 0;
        /// Offset ("virtual"/unallocated) section — dropped after assembly.
        const UNALLOCATED  = 1 << 1;
        /// Currently inside a `RORG` block.
        const IN_RORG       = 1 << 2;
        /// Absoluteness to restore once the active `RORG` block ends.
        const PREVABS       = 1 << 3;
        /// Atom being sized has oscillated; back-end should pick conservatively.
        const RESOLVE_WARN  = 1 << 4;
    }
}

/// A named, ordered sequence of atoms with address and alignment metadata.
pub struct Section<I, Op, Opt> {
    pub name: String,
    pub attr: String,
    pub align: u32,
    pub org: i64,
    pub pc: i64,
    pub flags: SectionFlags,
    pub memattr: u8,
    pub pad: u8,
    /// Listing index, assigned once listing output is produced.
    pub idx: u32,
    pub atoms: Vec<Atom<I, Op, Opt>>,
}

impl<I, Op, Opt> Section<I, Op, Opt> {
    fn new(name: String, attr: String, align: u32) -> Self {
        Self {
            name,
            attr,
            align,
            org: 0,
            pc: 0,
            flags: SectionFlags::empty(),
            memattr: 0,
            pad: 0,
            idx: 0,
            atoms: Vec::new(),
        }
    }

    /// `true` if this section's attribute string marks it BSS-style
    /// uninitialised storage (the original's `strchr(attr,'u')`).
    #[must_use]
    pub fn is_bss(&self) -> bool {
        self.attr.contains('u')
    }

    /// Appends an atom, returning its index within this section.
    pub fn push_atom(&mut self, atom: Atom<I, Op, Opt>) -> usize {
        self.atoms.push(atom);
        self.atoms.len() - 1
    }

    /// Begins a `RORG <target>` block (spec §4.1): records a `Rorg` atom,
    /// flips the section absolute while remembering whether it already was
    /// one in `PREVABS`, and marks `IN_RORG`.
    ///
    /// # Panics
    /// Panics if a `RORG` block is already active; callers must check
    /// [`Section::in_rorg`] (the resolver reports error 43 instead of
    /// calling this twice).
    pub fn start_rorg(&mut self, target: Expr, src: crate::atom::SourcePos) {
        assert!(!self.in_rorg(), "start_rorg called while a RORG block is already active");
        if self.flags.contains(SectionFlags::ABSOLUTE) {
            self.flags |= SectionFlags::PREVABS;
        } else {
            self.flags.remove(SectionFlags::PREVABS);
        }
        self.flags |= SectionFlags::ABSOLUTE | SectionFlags::IN_RORG;
        self.push_atom(Atom::new(src, 1, AtomPayload::Rorg(target)));
    }

    /// Ends the active `RORG` block, restoring the absoluteness it had
    /// before [`Section::start_rorg`]. No-op (but still emits the closing
    /// atom, per the original's `rorgend` directive semantics) if called
    /// without a preceding `start_rorg` — the resolver reports the
    /// "rorgend without rorg" diagnostic for that case instead of this
    /// method refusing to push the atom.
    pub fn end_rorg(&mut self, src: crate::atom::SourcePos) {
        if self.in_rorg() {
            if self.flags.contains(SectionFlags::PREVABS) {
                self.flags |= SectionFlags::ABSOLUTE;
            } else {
                self.flags.remove(SectionFlags::ABSOLUTE);
            }
            self.flags.remove(SectionFlags::IN_RORG | SectionFlags::PREVABS);
        }
        self.push_atom(Atom::new(src, 1, AtomPayload::RorgEnd));
    }

    /// Idempotent `end_rorg`: does nothing, including not pushing a
    /// `RorgEnd` atom, when no `RORG` block is currently active.
    pub fn try_end_rorg(&mut self, src: crate::atom::SourcePos) {
        if self.in_rorg() {
            self.end_rorg(src);
        }
    }

    #[must_use]
    pub fn in_rorg(&self) -> bool {
        self.flags.contains(SectionFlags::IN_RORG)
    }
}

/// Owns the full section list and provides the identity-preserving
/// constructors from spec §4.1 (`new_section`, `find_section`, …).
#[derive(Default)]
pub struct SectionTable<I, Op, Opt> {
    sections: Vec<Section<I, Op, Opt>>,
    /// When set, section identity is `(name, attr)`; otherwise `name` alone
    /// (the `-unnamed-sections`-adjacent `secname_attr` mode).
    pub secname_attr: bool,
    /// When set, all sections share one anonymous name (`-unnamed-sections`).
    pub unnamed_sections: bool,
    unnamed_offset_id: u32,
}

impl<I, Op, Opt> SectionTable<I, Op, Opt> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sections: Vec::new(),
            secname_attr: false,
            unnamed_sections: false,
            unnamed_offset_id: 0,
        }
    }

    #[must_use]
    pub fn get(&self, id: SectionId) -> &Section<I, Op, Opt> {
        &self.sections[id.0 as usize]
    }

    #[must_use]
    pub fn get_mut(&mut self, id: SectionId) -> &mut Section<I, Op, Opt> {
        &mut self.sections[id.0 as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (SectionId, &Section<I, Op, Opt>)> {
        self.sections
            .iter()
            .enumerate()
            .map(|(i, s)| (SectionId(i as u32), s))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SectionId, &mut Section<I, Op, Opt>)> {
        self.sections
            .iter_mut()
            .enumerate()
            .map(|(i, s)| (SectionId(i as u32), s))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Search a section by name and attr (spec §9: "searches a section by
    /// name and attr (if secname_attr set)").
    #[must_use]
    pub fn find_section(&self, name: &str, attr: &str) -> Option<SectionId> {
        self.sections.iter().position(|s| {
            s.name == name && (!self.secname_attr || s.attr == attr)
        }).map(|i| SectionId(i as u32))
    }

    /// Returns the existing section of this identity, or appends a new one.
    pub fn new_section(&mut self, name: &str, attr: &str, align: u32) -> SectionId {
        let name = if self.unnamed_sections { "" } else { name };
        if let Some(id) = self.find_section(name, attr) {
            return id;
        }
        self.sections.push(Section::new(name.to_string(), attr.to_string(), align));
        SectionId((self.sections.len() - 1) as u32)
    }

    /// Lazily materialises the syntax front end's implicit default section
    /// (plain `.text`-equivalent, relocatable, code+data+read+write+exec),
    /// used whenever an atom is emitted before any explicit section switch.
    pub fn default_section(&mut self) -> SectionId {
        self.new_section("", "acrwx", 1)
    }

    /// Creates a dummy absolute code section for an `ORG` directive.
    pub fn new_org(&mut self, org: i64) -> SectionId {
        let name = format!("seg{org:x}");
        let id = self.new_section(&name, "acrwx", 1);
        let sec = self.get_mut(id);
        sec.org = org;
        sec.pc = org;
        sec.flags |= SectionFlags::ABSOLUTE;
        id
    }

    /// Allocates (or re-uses) a uniquely named offset section.
    pub fn switch_offset_section(&mut self, name: Option<&str>, offs: Option<i64>) -> SectionId {
        let owned;
        let name = match name {
            Some(n) => n,
            None => {
                if offs.is_some() {
                    self.unnamed_offset_id += 1;
                }
                owned = format!("OFFSET{:06}", self.unnamed_offset_id);
                &owned
            }
        };
        let id = self.new_section(name, "u", 1);
        let sec = self.get_mut(id);
        sec.flags |= SectionFlags::UNALLOCATED;
        if let Some(offs) = offs {
            sec.org = offs;
            sec.pc = offs;
        }
        id
    }

    /// Removes every `UNALLOCATED` section from the list (spec §4.6, after
    /// the final pass).
    pub fn remove_unallocated(&mut self) {
        self.sections.retain(|s| !s.flags.contains(SectionFlags::UNALLOCATED));
    }

    /// Assigns sequential listing indices in declaration order.
    pub fn assign_listing_indices(&mut self) {
        for (i, sec) in self.sections.iter_mut().enumerate() {
            sec.idx = i as u32;
        }
    }
}
