//! Retargetable assembler core.
//!
//! This crate implements the portable half of a two-sided assembler: the
//! atom/section/symbol model, the fixed-point address resolver, the final
//! assembly pass, symbol finalisation, and offset-section cleanup (spec
//! §§3–4.6). Everything CPU- or output-format-specific lives behind the
//! [`asm_backend::CpuBackend`]/[`asm_backend::DataEvaluator`]/
//! [`asm_backend::OutputWriter`] trait boundary in the sibling `asm-backend`
//! crate; this crate never assumes a concrete instruction set or object
//! format.
//!
//! [`Assembler`] is the single context value threaded through an assembly
//! run (spec §9 design note: no process-wide globals). A front end (parser,
//! directive handler — both out of scope here) drives it by calling the
//! `push_*`/section/symbol methods while walking source text, then calls
//! [`Assembler::run`] once to resolve, assemble, and finalise everything.

pub mod assemble;
pub mod atom;
pub mod error;
pub mod expr;
pub mod fixup;
pub mod listing;
pub mod options;
pub mod resolver;
pub mod section;
pub mod size;
pub mod stabs;
pub mod symbol;

pub use asm_backend::{SectionId, SymbolId};
pub use atom::{Atom, AtomPayload, AssertRecord, NlistRecord, SourcePos, SpaceBlock};
pub use error::{AssemblerError, ErrorSink};
pub use expr::{eval_constant, find_base, BaseResult, Expr};
pub use listing::ListingRow;
pub use options::AssemblerOptions;
pub use section::{Section, SectionFlags, SectionTable};
pub use stabs::StabDef;
pub use symbol::{Symbol, SymbolFlags, SymbolKind, SymbolTable};

use asm_backend::{CpuBackend, DataEvaluator, DebugInfoSink};
use std::io::Write;

/// The assembly context: owns every section, every symbol, the active
/// options, and the accumulated diagnostics for one assembler run. Generic
/// over the CPU and data back-ends so the core never names a concrete
/// instruction set (spec §1).
pub struct Assembler<C: CpuBackend, D: DataEvaluator> {
    pub sections: SectionTable<C::Instruction, D::Operand, C::Options>,
    pub symbols: SymbolTable,
    pub options: AssemblerOptions,
    pub errors: ErrorSink,
    pub listing: Vec<ListingRow>,
    cpu: C,
    data: D,
    current_section: Option<SectionId>,
    stabs: Vec<StabDef>,
    final_pass_done: bool,
}

impl<C: CpuBackend, D: DataEvaluator> Assembler<C, D> {
    #[must_use]
    pub fn new(cpu: C, data: D, options: AssemblerOptions) -> Self {
        let mut sections = SectionTable::new();
        sections.secname_attr = options.secname_attr;
        sections.unnamed_sections = options.unnamed_sections;
        let errors = ErrorSink {
            wfail: options.wfail,
            nowarn: options.nowarn.clone(),
            maxerrors: options.maxerrors,
            ..ErrorSink::new()
        };
        Self {
            sections,
            symbols: SymbolTable::new(),
            options,
            errors,
            listing: Vec::new(),
            cpu,
            data,
            current_section: None,
            stabs: Vec::new(),
            final_pass_done: false,
        }
    }

    #[must_use]
    pub fn cpu(&self) -> &C {
        &self.cpu
    }

    #[must_use]
    pub fn data(&self) -> &D {
        &self.data
    }

    #[must_use]
    pub fn stabs(&self) -> &[StabDef] {
        &self.stabs
    }

    // ---- Section & atom registry (spec §4.1) ----------------------------

    /// Returns the existing section of this identity, or appends a new one.
    /// Does not switch to it — callers emitting atoms afterwards must call
    /// [`Assembler::switch_section`] explicitly, matching the original's
    /// two-step `new_section`/`switch_section` directive handling.
    pub fn new_section(&mut self, name: &str, attr: &str, align: u32) -> SectionId {
        self.sections.new_section(name, attr, align)
    }

    #[must_use]
    pub fn find_section(&self, name: &str, attr: &str) -> Option<SectionId> {
        self.sections.find_section(name, attr)
    }

    pub fn switch_section(&mut self, id: SectionId) {
        self.current_section = Some(id);
    }

    /// Lazily materialises and switches to the syntax front end's implicit
    /// default section.
    pub fn default_section(&mut self) -> SectionId {
        if let Some(id) = self.current_section {
            return id;
        }
        let id = self.sections.default_section();
        self.current_section = Some(id);
        id
    }

    /// Creates (or returns) a synthetic absolute section for an `ORG`
    /// directive, named `seg<addr-in-hex>`, and switches to it.
    pub fn new_org(&mut self, addr: i64) -> SectionId {
        let id = self.sections.new_org(addr);
        self.current_section = Some(id);
        id
    }

    /// Allocates (or re-uses) a uniquely named offset section and switches
    /// to it.
    pub fn switch_offset_section(&mut self, name: Option<&str>, offs: Option<i64>) -> SectionId {
        let id = self.sections.switch_offset_section(name, offs);
        self.current_section = Some(id);
        id
    }

    /// The id of the currently active section, materialising the default
    /// one if nothing has switched to anything yet.
    pub fn current_section_id(&mut self) -> SectionId {
        self.default_section()
    }

    /// Begins a `RORG <target>` block in the current section.
    pub fn start_rorg(&mut self, target: Expr, src: SourcePos) {
        let id = self.current_section_id();
        if self.sections.get(id).in_rorg() {
            self.errors.report(AssemblerError::NestedRorg);
            return;
        }
        self.sections.get_mut(id).start_rorg(target, src);
    }

    /// Ends the active `RORG` block in the current section, reporting error
    /// 44 if none is active.
    pub fn end_rorg(&mut self, src: SourcePos) {
        let id = self.current_section_id();
        if !self.sections.get(id).in_rorg() {
            self.errors.report(AssemblerError::UnmatchedRorgEnd);
        }
        self.sections.get_mut(id).end_rorg(src);
    }

    /// Idempotent `end_rorg`: a no-op when no `RORG` block is active in the
    /// current section.
    pub fn try_end_rorg(&mut self, src: SourcePos) {
        let id = self.current_section_id();
        self.sections.get_mut(id).try_end_rorg(src);
    }

    // ---- Symbol interning -------------------------------------------------

    pub fn intern_import(&mut self, name: &str) -> SymbolId {
        let id = self.symbols.intern_import(name);
        self.symbols.mark_referenced(id);
        id
    }

    pub fn define_equate(&mut self, name: &str, expr: Expr) -> SymbolId {
        self.symbols.define_equate(name, expr)
    }

    // ---- Atom emission -----------------------------------------------------

    fn push(&mut self, align: u32, src: SourcePos, payload: AtomPayload<C::Instruction, D::Operand, C::Options>) -> usize {
        let id = self.current_section_id();
        self.sections.get_mut(id).push_atom(Atom::new(src, align, payload))
    }

    /// Defines `name` at the current section's running position (spec
    /// §4.1's `LABEL` atom); the symbol's address is provisional until the
    /// resolver converges.
    pub fn push_label(&mut self, name: &str, src: SourcePos) -> SymbolId {
        let section = self.current_section_id();
        let provisional = self.sections.get(section).pc;
        let sym = self.symbols.define_label(name, section, provisional);
        self.push(1, src, AtomPayload::Label(sym));
        sym
    }

    pub fn push_instruction(&mut self, inst: C::Instruction, align: u32, src: SourcePos) {
        self.push(align, src, AtomPayload::Instruction(inst));
    }

    pub fn push_datadef(&mut self, op: D::Operand, bitsize: u8, align: u32, src: SourcePos) {
        self.push(align, src, AtomPayload::DataDef(op, bitsize));
    }

    /// Pushes already-resolved literal bytes (a front-end shortcut that
    /// skips the final-pass `Instruction`/`DataDef` encoding step).
    pub fn push_data(&mut self, bytes: Vec<u8>, src: SourcePos) {
        self.push(1, src, AtomPayload::Data(bytes));
    }

    pub fn push_space(&mut self, size: Expr, fill: Option<i64>, align: u32, src: SourcePos) {
        self.push(align, src, AtomPayload::Space(SpaceBlock { size, fill }));
    }

    pub fn push_roffs(&mut self, target: Expr, src: SourcePos) {
        self.push(1, src, AtomPayload::Roffs(target));
    }

    pub fn push_opts(&mut self, opts: C::Options, src: SourcePos) {
        self.push(1, src, AtomPayload::Opts(opts));
    }

    pub fn push_print_text(&mut self, text: String, src: SourcePos) {
        self.push(1, src, AtomPayload::PrintText(text));
    }

    pub fn push_print_expr(&mut self, expr: Expr, src: SourcePos) {
        self.push(1, src, AtomPayload::PrintExpr(expr));
    }

    pub fn push_assert(&mut self, condition: Expr, message: Option<String>, src: SourcePos) {
        self.push(1, src, AtomPayload::Assert(AssertRecord { condition, message }));
    }

    pub fn push_nlist(&mut self, rec: NlistRecord, src: SourcePos) {
        self.push(1, src, AtomPayload::Nlist(rec));
    }

    // ---- Driving the pipeline (spec §2) ------------------------------------

    /// Runs the full resolve → assemble → finalise pipeline described in
    /// spec §2. Returns `true` iff the run produced no errors (warnings
    /// alone, without `-wfail`, still count as success).
    ///
    /// Safe to call at most once per `Assembler` — the final pass consumes
    /// every `Instruction`/`DataDef` atom in place.
    pub fn run(&mut self, debug_sink: Option<&mut dyn DebugInfoSink>) -> bool {
        assert!(!self.final_pass_done, "Assembler::run called twice");
        self.final_pass_done = true;

        resolver::resolve(&mut self.sections, &mut self.symbols, &self.cpu, &self.data, &mut self.errors);

        // §4.6: offset-section labels become absolute expressions before
        // the final pass starts, so the final pass itself never needs to
        // special-case an UNALLOCATED section's labels.
        fixup::convert_offset_labels(&mut self.symbols, &self.sections);

        self.stabs = assemble::assemble(
            &mut self.sections,
            &mut self.symbols,
            &mut self.cpu,
            &self.data,
            &self.options,
            debug_sink,
            &mut self.errors,
            &mut self.listing,
        );

        // §4.5: symbol finalisation.
        fixup::fix_labels(&mut self.symbols, &mut self.errors);
        fixup::undef_syms(&mut self.symbols, &self.options, &mut self.errors);

        // §4.6 (tail): drop offset sections now that their labels have been
        // preserved as absolute expressions.
        fixup::remove_unalloc_sects(&mut self.sections);
        self.sections.assign_listing_indices();

        !self.errors.has_errors()
    }

    /// Human-readable section/symbol dump for the `-debug` CLI flag (spec
    /// §6). Mirrors the reference assembler's unconditional stdout trace at
    /// exit, except it goes wherever the driver points it.
    pub fn dump_debug(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "sections:")?;
        for (_, sec) in self.sections.iter() {
            writeln!(
                out,
                "  {:<16} attr={:<6} org={:#010x} pc={:#010x} flags={:?} atoms={}",
                sec.name, sec.attr, sec.org, sec.pc, sec.flags, sec.atoms.len()
            )?;
        }
        writeln!(out, "symbols:")?;
        for (_, sym) in self.symbols.iter() {
            let kind = match &sym.kind {
                SymbolKind::Labsym { pc, .. } => format!("labsym {pc:#010x}"),
                SymbolKind::Import => "import".to_string(),
                SymbolKind::Expression(_) => format!("equate {:?}", sym.value),
            };
            writeln!(out, "  {:<24} {kind} flags={:?}", sym.name, sym.flags)?;
        }
        Ok(())
    }
}
