use anyhow::{bail, Context, Result};
use std::io::Write;
use std::process::Command;
use tempfile::Builder;

/// Pretty-printing pass over the assembled module.
pub trait Beautifier {
    fn beautify(&self, source: &str) -> Result<String>;
}

/// Leaves the text untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFormat;

impl Beautifier for NoFormat {
    fn beautify(&self, source: &str) -> Result<String> {
        Ok(source.to_string())
    }
}

/// Runs an external `prettier` executable over a temporary `.js` file.
#[derive(Debug, Clone)]
pub struct Prettier {
    pub program: String,
}

impl Default for Prettier {
    fn default() -> Self {
        Self {
            program: "prettier".to_string(),
        }
    }
}

const PRETTIER_OPTIONS: &[&str] = &[
    "--parser",
    "babel",
    "--print-width",
    "100",
    "--tab-width",
    "2",
    "--single-quote",
    "--trailing-comma",
    "es5",
    "--bracket-spacing",
    "--arrow-parens",
    "avoid",
    "--end-of-line",
    "lf",
];

impl Beautifier for Prettier {
    fn beautify(&self, source: &str) -> Result<String> {
        let mut temp = Builder::new()
            .prefix("extgen-")
            .suffix(".js")
            .tempfile()
            .context("Failed to create temporary module file for formatting.")?;
        temp.write_all(source.as_bytes())?;
        temp.flush()?;

        let output = Command::new(&self.program)
            .args(PRETTIER_OPTIONS)
            .arg(temp.path())
            .output()
            .with_context(|| {
                format!(
                    "Failed to start '{}'. Install prettier or pass --no-format.",
                    self.program
                )
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("'{}' failed: {}", self.program, stderr.trim());
        }
        let formatted = String::from_utf8(output.stdout)
            .context("Formatter produced output that is not UTF-8.")?;
        if formatted.trim().is_empty() {
            bail!("'{}' produced no output.", self.program);
        }
        Ok(formatted)
    }
}

/// Never fails: on formatter error the input comes back unchanged and a warning is logged.
pub fn beautify_or_keep(beautifier: &dyn Beautifier, source: &str) -> String {
    match beautifier.beautify(source) {
        Ok(formatted) => formatted,
        Err(err) => {
            log::warn!("Code formatting failed, keeping unformatted output: {:#}", err);
            source.to_string()
        }
    }
}
