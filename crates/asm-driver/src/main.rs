//! `vasm-rs`: the reference driver binary wiring CLI options to
//! `asm-core`'s `Assembler`, an output-format registry, dependency-list
//! writing, and the `-debug` dump (spec §6). Plays the role the teacher's
//! `emu-test-harness` binary plays for `emu-core`: bulk-driving the engine
//! crate end to end rather than shipping a parser of its own.

mod cli;
mod demo;
mod depend;
mod flatten;
mod output;

use asm_core::{AssemblerError, ErrorSink};
use asm_test_cpu::{TestCpu, TestData};
use clap::Parser;
use cli::Cli;
use depend::DependFormat;
use log::{error, warn};
use std::fs;
use std::io;
use std::process::ExitCode;

/// The concrete assembler this driver wires up. A real distribution would
/// be generic over whichever CPU crate the user selected; this one ships a
/// single toy back-end (spec §2 item 10).
pub type Asm = asm_core::Assembler<TestCpu, TestData>;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        log::LevelFilter::Trace
    } else if cli.quiet {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new().filter_level(log_level).init();

    run(&cli).unwrap_or_else(|code| code)
}

/// Returns `Ok(code)` once a definitive exit code is known; the `Err`
/// variant is unused but keeps `?` available for I/O operations that
/// should abort with code 1 on failure.
fn run(cli: &Cli) -> Result<ExitCode, ExitCode> {
    let options = cli.to_options();
    let mut asm = Asm::new(TestCpu::new(), TestData::new(), options);

    if cli.input.len() > 1 {
        asm.errors.report(AssemblerError::DuplicatePositional);
    }
    let input_path = cli.input.first();
    if let Some(path) = input_path {
        if !path.exists() {
            asm.errors.report(AssemblerError::InputNotFound(path.display().to_string()));
        }
    } else if cli.input.is_empty() && !asm.errors.has_errors() {
        asm.errors.report(AssemblerError::MissingInput);
    }

    for raw in &cli.defines {
        match parse_define(raw) {
            Some((name, value)) => {
                asm.define_equate(&name, asm_core::Expr::Number(value));
            }
            None => {
                asm.errors.report(AssemblerError::UnknownOption(format!("-D{raw}")));
            }
        }
    }

    if !output::KNOWN_FORMATS.contains(&cli.format.as_str()) {
        asm.errors.report(AssemblerError::UnknownOutputFormat(cli.format.clone()));
    }

    if asm.errors.has_errors() {
        report_and_exit(&asm.errors, cli)
    } else {
        demo::build(&mut asm);
        if cli.dwarf.is_some() {
            warn!("-dwarf requested but this build has no DebugInfoSink wired; line records will not be emitted");
        }
        let ok = asm.run(None);

        if cli.debug {
            let mut out = io::stdout();
            let _ = asm.dump_debug(&mut out);
        }

        if ok {
            write_output(cli, &asm)?;
        }
        write_depend(cli, input_path)?;

        report_and_exit(&asm.errors, cli)
    }
}

fn parse_define(raw: &str) -> Option<(String, i64)> {
    match raw.split_once('=') {
        Some((name, value)) => parse_int(value).map(|v| (name.to_string(), v)),
        None => Some((raw.to_string(), 1)),
    }
}

fn parse_int(s: &str) -> Option<i64> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

fn write_output(cli: &Cli, asm: &Asm) -> Result<(), ExitCode> {
    let Some(mut writer) = output::lookup(&cli.format) else {
        if output::EXECUTABLE_FORMATS.contains(&cli.format.as_str()) {
            error!("output format \"{}\" produces an executable and is not built in this configuration", cli.format);
        } else {
            error!("output format \"{}\" is not built in this configuration", cli.format);
        }
        return Ok(());
    };
    let flattened = flatten::Flattened::build(asm);
    let sections = flattened.sections(asm);
    let symbols = flattened.symbols(asm);

    let result = fs::File::create(&cli.output).and_then(|mut f| writer.write(&mut f, &sections, &symbols));
    if let Err(e) = result {
        error!("failed to write \"{}\": {e}", cli.output.display());
        let _ = fs::remove_file(&cli.output);
        return Err(ExitCode::FAILURE);
    }
    Ok(())
}

fn write_depend(cli: &Cli, input_path: Option<&std::path::PathBuf>) -> Result<(), ExitCode> {
    let (fmt_str, absolute) = match (&cli.depend, &cli.dependall) {
        (Some(f), _) => (Some(f), false),
        (None, Some(f)) => (Some(f), true),
        (None, None) => (None, false),
    };
    let Some(fmt_str) = fmt_str else { return Ok(()) };
    let Some(format) = DependFormat::parse(fmt_str) else {
        error!("unknown -depend format \"{fmt_str}\" (expected list or make)");
        return Err(ExitCode::FAILURE);
    };
    let paths: Vec<_> = input_path.cloned().into_iter().collect();
    let outname = cli.output.display().to_string();

    let result = match &cli.depfile {
        Some(path) => fs::File::create(path).and_then(|mut f| depend::write_dependencies(&mut f, format, &outname, &paths, absolute)),
        None => depend::write_dependencies(&mut io::stdout(), format, &outname, &paths, absolute),
    };
    if let Err(e) = result {
        error!("failed to write dependency list: {e}");
        return Err(ExitCode::FAILURE);
    }
    Ok(())
}

fn report_and_exit(errors: &ErrorSink, cli: &Cli) -> Result<ExitCode, ExitCode> {
    if !cli.quiet {
        for warning in &errors.warnings {
            eprintln!("{warning}");
        }
        for err in &errors.errors {
            eprintln!("{err}");
        }
    }
    if errors.has_errors() {
        if cli.output.exists() {
            let _ = fs::remove_file(&cli.output);
        }
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
