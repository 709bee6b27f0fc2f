//! Source dependency-list emission (spec §6): `-depend=list|make`, the
//! `-dependall` absolute-path variant, and `-depfile`.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependFormat {
    List,
    Make,
}

impl DependFormat {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "list" => Some(Self::List),
            "make" => Some(Self::Make),
            _ => None,
        }
    }
}

/// A path needs make-syntax quoting if it contains anything other than
/// printable non-whitespace.
fn needs_quoting(path: &str) -> bool {
    path.chars().any(|c| c.is_whitespace() || !c.is_ascii_graphic())
}

/// Writes the dependency list for `paths` in `format` to `out`. `absolute`
/// mirrors `-dependall` by canonicalising each path before printing it
/// (falls back to the original path if canonicalisation fails, e.g. the
/// file has since been removed).
pub fn write_dependencies(
    out: &mut dyn Write,
    format: DependFormat,
    outname: &str,
    paths: &[PathBuf],
    absolute: bool,
) -> io::Result<()> {
    let rendered: Vec<String> = paths
        .iter()
        .map(|p| render_path(p, absolute))
        .collect();

    match format {
        DependFormat::List => {
            for p in &rendered {
                writeln!(out, "{p}")?;
            }
        }
        DependFormat::Make => {
            write!(out, "{outname}:")?;
            for p in &rendered {
                if needs_quoting(p) {
                    write!(out, " \"{p}\"")?;
                } else {
                    write!(out, " {p}")?;
                }
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

fn render_path(path: &Path, absolute: bool) -> String {
    if absolute {
        path.canonicalize()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| path.display().to_string())
    } else {
        path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_format_is_one_path_per_line() {
        let mut buf = Vec::new();
        write_dependencies(&mut buf, DependFormat::List, "a.out", &[PathBuf::from("a.s"), PathBuf::from("b.inc")], false).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "a.s\nb.inc\n");
    }

    #[test]
    fn make_format_quotes_paths_with_spaces() {
        let mut buf = Vec::new();
        write_dependencies(&mut buf, DependFormat::Make, "a.out", &[PathBuf::from("has space.s")], false).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "a.out: \"has space.s\"\n");
    }
}
