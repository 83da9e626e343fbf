//! The compile command.
//!
//! Exit codes: 0 on success, 1 when diagnostics were reported, 2 on I/O
//! failure.

use std::path::{Path, PathBuf};

pub struct CompileArgs {
    pub source: PathBuf,
    pub output: Option<PathBuf>,
    pub project: Option<PathBuf>,
    pub color: bool,
}

pub fn run(args: CompileArgs) -> i32 {
    let source = match std::fs::read_to_string(&args.source) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error: cannot read {}: {}", args.source.display(), e);
            return 2;
        }
    };

    let out = tanuki_compiler::compile(&source);

    if !out.diagnostics.is_empty() {
        eprint!(
            "{}",
            out.diagnostics
                .printer()
                .source(&source)
                .path(&args.source.display().to_string())
                .colored(args.color)
                .render()
        );
        eprintln!();
    }

    let Some(code) = &out.code else {
        return 1;
    };

    if let Some(dir) = &args.project {
        let name = package_name(&args.source);
        if let Err(e) =
            tanuki_compiler::write_project(dir, &name, code, &out.external_imports)
        {
            eprintln!("error: cannot write project to {}: {}", dir.display(), e);
            return 2;
        }
        return 0;
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.source.with_extension("rs"));
    if let Err(e) = std::fs::write(&output, code) {
        eprintln!("error: cannot write {}: {}", output.display(), e);
        return 2;
    }
    0
}

fn package_name(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "generated".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_source(dir: &tempfile::TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn standalone_mode_writes_next_to_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(&dir, "prog.py", "print(1)\n");
        let code = run(CompileArgs {
            source: source.clone(),
            output: None,
            project: None,
            color: false,
        });
        assert_eq!(code, 0);
        let emitted = std::fs::read_to_string(source.with_extension("rs")).unwrap();
        assert!(emitted.contains("fn main()"));
    }

    #[test]
    fn explicit_output_path_is_honored() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(&dir, "prog.py", "print(1)\n");
        let output = dir.path().join("out.rs");
        let code = run(CompileArgs {
            source,
            output: Some(output.clone()),
            project: None,
            color: false,
        });
        assert_eq!(code, 0);
        assert!(output.exists());
    }

    #[test]
    fn project_mode_writes_manifest_and_main() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(&dir, "prog.py", "import numpy as np\nprint(1)\n");
        let project = dir.path().join("proj");
        let code = run(CompileArgs {
            source,
            output: None,
            project: Some(project.clone()),
            color: false,
        });
        assert_eq!(code, 0);
        assert!(project.join("Cargo.toml").exists());
        assert!(project.join("src/main.rs").exists());
        let manifest = std::fs::read_to_string(project.join("Cargo.toml")).unwrap();
        assert!(manifest.contains("tanuki-runtime"));
        assert!(manifest.contains("numpy"));
    }

    #[test]
    fn diagnostics_exit_with_one_and_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(&dir, "bad.py", "x = eval(\"1\")\n");
        let code = run(CompileArgs {
            source: source.clone(),
            output: None,
            project: None,
            color: false,
        });
        assert_eq!(code, 1);
        assert!(!source.with_extension("rs").exists());
    }

    #[test]
    fn missing_input_exits_with_two() {
        let code = run(CompileArgs {
            source: PathBuf::from("/nonexistent/nope.py"),
            output: None,
            project: None,
            color: false,
        });
        assert_eq!(code, 2);
    }
}
