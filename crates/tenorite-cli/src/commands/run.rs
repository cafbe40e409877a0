//! Run command - execute Tenorite source files

use anyhow::{anyhow, Context, Result};
use std::fs;
use tenorite_runtime::{EvalError, Tenorite};

/// Compile and execute a source file.
///
/// Stdout carries any PRINT output followed by the `string` of the final
/// expression's value. Diagnostics go to stderr (or stdout as JSON when
/// `json_output` is set), and any failure maps to a non-zero exit.
pub fn run(file_path: &str, json_output: bool) -> Result<()> {
    let source = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read source file: {}", file_path))?;

    let mut runtime = Tenorite::new().map_err(|err| anyhow!("{}", err))?;

    // The grammar wants a terminator after the last statement.
    let source = format!("{}\n", source);

    match runtime.eval(&source, file_path) {
        Ok(value) => {
            let rendered = runtime
                .display(&value)
                .map_err(|err| anyhow!("{}", err))?;
            println!("{}", rendered);
            Ok(())
        }
        Err(EvalError::Compile(diagnostics)) => {
            for diagnostic in &diagnostics {
                if json_output {
                    println!("{}", diagnostic.to_json_string()?);
                } else {
                    eprintln!("{}", diagnostic.to_human_string());
                }
            }
            Err(anyhow!("Failed to compile {}", file_path))
        }
        Err(EvalError::Runtime(err)) => {
            eprintln!("{}", err);
            Err(anyhow!("Failed to execute {}", file_path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_run_simple_expression() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "1 + 2 :> string.").unwrap();

        let result = run(temp_file.path().to_str().unwrap(), false);
        assert!(result.is_ok());
    }

    #[test]
    fn test_run_missing_file() {
        let result = run("nonexistent.tenor", false);
        assert!(result.is_err());
    }

    #[test]
    fn test_run_compile_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "zzz_missing.").unwrap();

        let result = run(temp_file.path().to_str().unwrap(), false);
        assert!(result.is_err());
    }
}
