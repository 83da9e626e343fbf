#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Tanuki compiler: a typed Python subset to idiomatic Rust.
//!
//! Pipeline:
//! - `lexer` + `parser` — source text to AST, with recovery
//! - `ir` — AST to typed IR by ordered structural matching
//! - `analyze` — scopes, types, narrowing, `may_raise`, bridge marking
//! - `codegen` — IR to Rust text (standalone file or full project)
//! - `diagnostics` — collection and rendering
//!
//! Operations the translator cannot lower natively are emitted as calls
//! into the `tanuki-runtime` bridge, which delegates them to a companion
//! interpreter process at run time.

pub mod analyze;
pub mod ast;
pub mod codegen;
pub mod diagnostics;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod span;

#[cfg(test)]
mod lib_tests;

pub use codegen::write_project;
pub use diagnostics::{Code, Diagnostics, DiagnosticsPrinter, Severity};

/// Result of one compilation.
pub struct CompileOutput {
    /// Generated Rust source; absent when diagnostics carry errors — the
    /// generator never emits code it knows will not compile.
    pub code: Option<String>,
    pub diagnostics: Diagnostics,
    /// External imports detected during analysis, for project manifests.
    pub external_imports: Vec<String>,
}

impl CompileOutput {
    pub fn is_success(&self) -> bool {
        self.code.is_some()
    }
}

/// Compiles one source file to Rust text.
pub fn compile(source: &str) -> CompileOutput {
    let lines = span::LineIndex::new(source);

    let (ast, mut diagnostics) = parser::parse(source);

    let matched = ir::matcher::match_module(&ast);
    diagnostics.extend(matched.diags);
    let mut module = matched.module;

    let analysis = analyze::analyze(&mut module, matched.scopes, Diagnostics::new());
    diagnostics.extend(analysis.diags.clone());

    let generated = codegen::generate(&module, &analysis, &lines);
    diagnostics.extend(generated.diags);

    let code = (!diagnostics.has_errors()).then_some(generated.code);
    CompileOutput {
        code,
        diagnostics,
        external_imports: generated.external_imports,
    }
}
