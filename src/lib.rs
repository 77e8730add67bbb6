pub mod ast;
pub mod codegen;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod fragments;
pub mod js;
pub mod processor;
pub mod template;

#[cfg(not(target_arch = "wasm32"))]
pub mod beautify;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;

use anyhow::{Context, Result};
use ast::ExtensionConfig;
use codegen::ModuleAssembler;
use error::GenerateResult;
use fragments::Fragments;
use js::JsExpr;
use processor::{IdPolicy, ProcessOptions, ProcessWarning};

#[cfg(not(target_arch = "wasm32"))]
use std::path::Path;

#[cfg(all(target_arch = "wasm32", feature = "wasm-bindings"))]
pub mod wasm;

#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
    pub id_policy: IdPolicy,
}

#[derive(Debug, Clone)]
pub struct GeneratedModule {
    pub source: String,
    pub info: JsExpr,
    pub fragments: Fragments,
    pub warnings: Vec<ProcessWarning>,
}

/// Runs the whole pipeline on a parsed config. Pure apart from random ids.
pub fn generate(config: &ExtensionConfig, options: GenerateOptions) -> GenerateResult<GeneratedModule> {
    let report = processor::process_with_options(
        &config.blocks,
        ProcessOptions {
            id_policy: options.id_policy,
        },
    )?;
    let info = descriptor::emit_info(&config.extension, &report.blocks);
    let fragments = fragments::emit_all(&config.extension, &report.blocks);
    let source = ModuleAssembler::new(&config.extension, &info, &fragments).assemble();
    Ok(GeneratedModule {
        source,
        info,
        fragments,
        warnings: report.warnings,
    })
}

pub fn generate_from_str(source: &str, options: GenerateOptions) -> Result<GeneratedModule> {
    let config = config::parse_config_str(source)?;
    Ok(generate(&config, options)?)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn run_cli(args: &cli::Args) -> Result<()> {
    use beautify::{beautify_or_keep, Beautifier, NoFormat, Prettier};
    use clap::CommandFactory;

    let Some(config_path) = args.config.as_deref() else {
        cli::Args::command().print_help()?;
        println!();
        return Ok(());
    };

    let total_stages = 4 + usize::from(!args.no_format) + usize::from(args.emit_descriptor.is_some());
    let progress = CliProgress::new("Generate", total_stages);
    let mut stage = 0usize;

    stage += 1;
    progress.emit(stage, "Reading config");
    let source = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config '{}'.", config_path.display()))?;

    stage += 1;
    progress.emit(stage, "Validating block declarations");
    let config = config::parse_config_str(&source)
        .with_context(|| format!("Invalid config '{}'.", config_path.display()))?;

    stage += 1;
    progress.emit(stage, "Emitting descriptor and compiler patches");
    let options = GenerateOptions {
        id_policy: if args.random_ids {
            IdPolicy::Random
        } else {
            IdPolicy::Deterministic
        },
    };
    let module = generate(&config, options)
        .with_context(|| format!("Failed to generate extension from '{}'.", config_path.display()))?;
    for warning in &module.warnings {
        log::warn!("{}", warning.message);
    }

    let text = if args.no_format {
        module.source.clone()
    } else {
        stage += 1;
        progress.emit(stage, "Formatting");
        let prettier = Prettier {
            program: args.prettier.clone(),
        };
        let beautifier: &dyn Beautifier = if args.prettier.is_empty() { &NoFormat } else { &prettier };
        beautify_or_keep(beautifier, &module.source)
    };

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| codegen::default_output_path(&config.extension));
    stage += 1;
    progress.emit(stage, "Writing module");
    codegen::write_module(&text, &output)?;

    if let Some(descriptor_path) = &args.emit_descriptor {
        stage += 1;
        progress.emit(stage, "Writing descriptor");
        write_descriptor(&module.info, descriptor_path)?;
    }

    println!("Extension generated successfully: {}", output.display());
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn write_descriptor(info: &JsExpr, path: &Path) -> Result<()> {
    let mut text = serde_json::to_string_pretty(&info.to_json())?;
    text.push('\n');
    codegen::write_module(&text, path)
}

#[cfg(not(target_arch = "wasm32"))]
struct CliProgress {
    prefix: &'static str,
    total: usize,
}

#[cfg(not(target_arch = "wasm32"))]
impl CliProgress {
    fn new(prefix: &'static str, total: usize) -> Self {
        Self {
            prefix,
            total: total.max(1),
        }
    }

    fn emit(&self, step: usize, label: &str) {
        let step = step.clamp(1, self.total);
        let bar = render_progress_bar(step, self.total, 14);
        eprintln!(
            "[{}] {}... ({}/{}) {}",
            self.prefix, label, step, self.total, bar
        );
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn render_progress_bar(step: usize, total: usize, width: usize) -> String {
    let width = width.max(1);
    let filled = ((step * width) + (total / 2)) / total;
    let mut s = String::with_capacity(width + 2);
    s.push('[');
    for i in 0..width {
        s.push(if i < filled { '=' } else { '-' });
    }
    s.push(']');
    s
}
