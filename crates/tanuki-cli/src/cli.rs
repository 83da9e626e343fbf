//! Argument definitions and the dispatch layer.
//!
//! `CompileParams` mirrors `compile::CompileArgs` but is populated from
//! clap's `ArgMatches`; the `Into` impl bridges the two so the command
//! handler stays clap-free.

use std::path::PathBuf;

use clap::{value_parser, Arg, ArgMatches, Command};

use crate::compile::CompileArgs;

pub fn build_cli() -> Command {
    Command::new("tnk")
        .about("Compiles a typed Python subset to Rust")
        .arg(source_arg())
        .arg(output_arg())
        .arg(project_arg())
        .arg(color_arg())
}

/// Source file (positional).
fn source_arg() -> Arg {
    Arg::new("source")
        .value_name("SOURCE")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Source file to compile")
}

/// Standalone-mode output file (-o/--output).
fn output_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .help("Output file (defaults to the source name with .rs)")
}

/// Project-mode output directory (--project).
fn project_arg() -> Arg {
    Arg::new("project")
        .long("project")
        .value_name("DIR")
        .value_parser(value_parser!(PathBuf))
        .conflicts_with("output")
        .help("Emit a complete build project into DIR instead of one file")
}

/// Colorize diagnostics (--color).
fn color_arg() -> Arg {
    Arg::new("color")
        .long("color")
        .value_name("WHEN")
        .default_value("auto")
        .value_parser(["auto", "always", "never"])
        .help("Colorize diagnostics")
}

pub struct CompileParams {
    pub source: PathBuf,
    pub output: Option<PathBuf>,
    pub project: Option<PathBuf>,
    pub color: bool,
}

impl CompileParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        let color = match m.get_one::<String>("color").map(String::as_str) {
            Some("always") => true,
            Some("never") => false,
            _ => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        };
        Self {
            source: m
                .get_one::<PathBuf>("source")
                .cloned()
                .unwrap_or_default(),
            output: m.get_one::<PathBuf>("output").cloned(),
            project: m.get_one::<PathBuf>("project").cloned(),
            color,
        }
    }
}

impl From<CompileParams> for CompileArgs {
    fn from(p: CompileParams) -> Self {
        Self {
            source: p.source,
            output: p.output,
            project: p.project,
            color: p.color,
        }
    }
}
