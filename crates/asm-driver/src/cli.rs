//! Command-line surface (spec §6), parsed with `clap`'s derive API and
//! translated into an [`asm_core::AssemblerOptions`] plus the handful of
//! driver-only knobs (output path, listing, dependency list, debug dump)
//! that the core itself has no business knowing about.

use asm_core::AssemblerOptions;
use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;

/// A small retargetable assembler front end.
#[derive(Parser, Debug)]
#[command(name = "vasm-rs", version, about)]
pub struct Cli {
    /// Output writer: test, elf, bin, srec, vobj, hunk, aout, hunkexe, tos, xfile, atari_com.
    #[arg(short = 'F', long = "format", default_value = "test")]
    pub format: String,

    /// Output object path.
    #[arg(short = 'o', long = "output", default_value = "a.out")]
    pub output: PathBuf,

    /// Listing output path; enables listing when present.
    #[arg(short = 'L', long = "listing")]
    pub listing: Option<PathBuf>,

    /// Suppress form-feeds between listing pages.
    #[arg(long = "Lnf")]
    pub listing_no_formfeed: bool,

    /// Suppress the listing's trailing symbol table.
    #[arg(long = "Lns")]
    pub listing_no_symtab: bool,

    /// Lines per listing page.
    #[arg(long = "Ll", value_name = "N")]
    pub listing_lines_per_page: Option<u32>,

    /// Define an absolute symbol: `-Dname` or `-Dname=value`.
    #[arg(short = 'D', value_name = "NAME[=VALUE]")]
    pub defines: Vec<String>,

    /// Append an include search path (tracked for dependency output only).
    #[arg(short = 'I', value_name = "PATH")]
    pub include_paths: Vec<PathBuf>,

    /// Emit a source dependency list in `list` or `make` format.
    #[arg(long = "depend", value_name = "list|make")]
    pub depend: Option<String>,

    /// Like `-depend`, but paths are written absolute.
    #[arg(long = "dependall", value_name = "list|make")]
    pub dependall: Option<String>,

    /// Write the dependency list to a file instead of stdout.
    #[arg(long = "depfile", value_name = "PATH")]
    pub depfile: Option<PathBuf>,

    #[arg(long = "unnamed-sections")]
    pub unnamed_sections: bool,
    #[arg(long = "ignore-mult-inc")]
    pub ignore_mult_inc: bool,
    #[arg(long = "nocase")]
    pub nocase: bool,
    #[arg(long = "nosym")]
    pub nosym: bool,
    #[arg(long = "pic")]
    pub pic: bool,
    #[arg(long = "unsshift")]
    pub unsshift: bool,
    #[arg(long = "chklabels")]
    pub chklabels: bool,
    #[arg(long = "noialign")]
    pub noialign: bool,
    #[arg(long = "esc")]
    pub esc: bool,
    #[arg(long = "noesc")]
    pub noesc: bool,

    /// Automatically import undefined symbols as zero-valued externals.
    #[arg(short = 'x')]
    pub auto_import: bool,

    /// Show warnings (the reference assembler's default is to suppress them).
    #[arg(short = 'w')]
    pub show_warnings: bool,

    /// Treat warnings as errors.
    #[arg(long = "wfail")]
    pub wfail: bool,

    /// Suppress the banner and progress output.
    #[arg(long = "quiet")]
    pub quiet: bool,

    /// Dump sections/symbols to stdout at exit and enable trace-level logging.
    #[arg(long = "debug")]
    pub debug: bool,

    /// Suppress one numbered diagnostic; may be given multiple times.
    #[arg(long = "nowarn", value_name = "N")]
    pub nowarn: Vec<u32>,

    /// Stop after this many errors.
    #[arg(long = "maxerrors", value_name = "N")]
    pub maxerrors: Option<u32>,

    /// Macro expansion recursion ceiling.
    #[arg(long = "maxmacrecurs", value_name = "N")]
    pub maxmacrecurs: Option<u32>,

    /// Enable DWARF line info; an omitted value defaults to version 3.
    #[arg(long = "dwarf", value_name = "VERSION", num_args = 0..=1, default_missing_value = "3")]
    pub dwarf: Option<u8>,

    /// The one source file to assemble. More than one is error 11.
    pub input: Vec<PathBuf>,
}

impl Cli {
    #[must_use]
    pub fn to_options(&self) -> AssemblerOptions {
        let mut nowarn = HashSet::new();
        nowarn.extend(self.nowarn.iter().copied());

        AssemblerOptions {
            secname_attr: false,
            unnamed_sections: self.unnamed_sections,
            ignore_multinc: self.ignore_mult_inc,
            nocase: self.nocase,
            no_symbols: self.nosym,
            pic_check: self.pic,
            unsigned_shift: self.unsshift,
            chklabels: self.chklabels,
            noialign: self.noialign,
            esc_sequences: self.esc && !self.noesc,
            auto_import: self.auto_import,
            dwarf_version: self.dwarf,
            maxerrors: self.maxerrors,
            nowarn,
            maxmacrecurs: self.maxmacrecurs.unwrap_or(1000),
            wfail: self.wfail,
        }
    }
}
