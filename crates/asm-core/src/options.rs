//! Assembler-wide options (spec §6), set once from the CLI surface and
//! read throughout the core instead of threaded as individual arguments.

use std::collections::HashSet;

/// Behavioural flags shared by the resolver, final assembler and symbol
/// finaliser. One value, constructed up front, rather than globals — see
/// the design note in `SPEC_FULL.md` §9.
#[derive(Debug, Clone)]
pub struct AssemblerOptions {
    /// Section identity includes `attr`, not just `name` (`secname_attr`).
    pub secname_attr: bool,
    /// All sections share one blank name (`-unnamed-sections`).
    pub unnamed_sections: bool,
    /// Ignore a file already included via `.include` (front-end concern,
    /// carried here only because the driver surfaces it as a core option).
    pub ignore_multinc: bool,
    /// Symbol names are matched case-insensitively.
    pub nocase: bool,
    /// Suppress symbol-table output entirely.
    pub no_symbols: bool,
    /// Reject absolute relocations where position-independent code is
    /// required.
    pub pic_check: bool,
    /// Treat `>>` as a logical (unsigned) shift rather than arithmetic.
    pub unsigned_shift: bool,
    /// Reject colon-less labels that collide with mnemonics.
    pub chklabels: bool,
    /// Disable automatic instruction alignment (diagnostic 50 never fires).
    pub noialign: bool,
    /// Recognise C-style escape sequences in string literals.
    pub esc_sequences: bool,
    /// Automatically import undefined symbols instead of erroring (`-x`).
    pub auto_import: bool,
    /// DWARF version requested for debug-info dispatch, if any.
    pub dwarf_version: Option<u8>,
    /// Stop after this many errors (`-maxerrors`); `None` means unlimited.
    pub maxerrors: Option<u32>,
    /// Diagnostic ids suppressed outright (`-nowarn=N`).
    pub nowarn: HashSet<u32>,
    /// Macro expansion recursion ceiling (front-end concern, carried for
    /// parity with the CLI surface).
    pub maxmacrecurs: u32,
    /// Promote every warning to an error (`-wfail`).
    pub wfail: bool,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            secname_attr: false,
            unnamed_sections: false,
            ignore_multinc: false,
            nocase: false,
            no_symbols: false,
            pic_check: false,
            unsigned_shift: false,
            chklabels: false,
            noialign: false,
            esc_sequences: false,
            auto_import: false,
            dwarf_version: None,
            maxerrors: None,
            nowarn: HashSet::new(),
            maxmacrecurs: 1000,
            wfail: false,
        }
    }
}
