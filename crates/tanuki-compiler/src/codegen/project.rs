//! Project-mode output: a complete build project around the generated
//! source.

use std::io::Write;
use std::path::Path;

/// Writes a buildable project: `Cargo.toml`, `src/main.rs`, and a note
/// listing the external dependencies detected during import analysis.
pub fn write_project(
    dir: &Path,
    name: &str,
    code: &str,
    external_imports: &[String],
) -> std::io::Result<()> {
    std::fs::create_dir_all(dir.join("src"))?;

    let mut manifest = std::fs::File::create(dir.join("Cargo.toml"))?;
    writeln!(manifest, "[package]")?;
    writeln!(manifest, "name = {:?}", sanitize_package_name(name))?;
    writeln!(manifest, "version = \"0.1.0\"")?;
    writeln!(manifest, "edition = \"2024\"")?;
    writeln!(manifest)?;
    writeln!(manifest, "[dependencies]")?;
    writeln!(manifest, "tanuki-runtime = \"0.7\"")?;
    if !external_imports.is_empty() {
        writeln!(manifest)?;
        writeln!(
            manifest,
            "# External libraries served by the bridge worker at runtime:"
        )?;
        for import in external_imports {
            writeln!(manifest, "#   {}", import)?;
        }
    }

    std::fs::write(dir.join("src").join("main.rs"), code)?;
    Ok(())
}

/// Cargo package names: lowercase, dashes, no leading digit.
pub fn sanitize_package_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            'a'..='z' | '0'..='9' | '-' | '_' => out.push(c),
            'A'..='Z' => out.push(c.to_ascii_lowercase()),
            _ => out.push('-'),
        }
    }
    let trimmed = out.trim_matches('-').to_string();
    let mut result = if trimmed.is_empty() {
        "generated".to_string()
    } else {
        trimmed
    };
    if result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert_str(0, "p-");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_manifest_and_main() {
        let dir = tempfile::tempdir().unwrap();
        let imports = vec!["pandas".to_string(), "numpy".to_string()];
        write_project(dir.path(), "My Script", "fn main() {}\n", &imports).unwrap();

        let manifest = std::fs::read_to_string(dir.path().join("Cargo.toml")).unwrap();
        assert!(manifest.contains("name = \"my-script\""));
        assert!(manifest.contains("tanuki-runtime"));
        assert!(manifest.contains("#   pandas"));
        assert!(manifest.contains("#   numpy"));

        let main = std::fs::read_to_string(dir.path().join("src/main.rs")).unwrap();
        assert_eq!(main, "fn main() {}\n");
    }

    #[test]
    fn package_names_are_sanitized() {
        assert_eq!(sanitize_package_name("FizzBuzz5.py"), "fizzbuzz5-py");
        assert_eq!(sanitize_package_name("3body"), "p-3body");
        assert_eq!(sanitize_package_name("---"), "generated");
    }
}
