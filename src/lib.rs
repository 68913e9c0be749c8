pub mod ast;
pub mod block;
pub mod command;
pub mod emit;
pub mod generator;
pub mod instrument;
pub mod lexer;
pub mod parser;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;

#[cfg(all(target_arch = "wasm32", feature = "wasm-bindings"))]
pub mod wasm;

use anyhow::Result;
use block::BlockProgram;
use generator::{generate_script, GeneratedProgram};
use instrument::{instrument, InstrumentedProgram};
use std::path::{Path, PathBuf};

/// Full pipeline: block program -> raw script -> guard-instrumented script.
/// The caller must bind `guard_function_name` (plus the `httpPost`/`baseUrl`
/// runtime identifiers) before evaluating `source_text`.
pub fn compile(program: &BlockProgram, model: &str, serial: &str) -> Result<InstrumentedProgram> {
    let generated = generate(program, model, serial)?;
    Ok(instrument(&generated.source_text))
}

pub fn compile_json(source: &str, model: &str, serial: &str) -> Result<InstrumentedProgram> {
    let program = BlockProgram::from_json(source)?;
    compile(&program, model, serial)
}

pub fn generate(program: &BlockProgram, model: &str, serial: &str) -> Result<GeneratedProgram> {
    generate_script(program, model, serial)
        .map_err(|e| anyhow::anyhow!("Generation error: {}", e.message))
}

#[cfg(not(target_arch = "wasm32"))]
pub fn run_cli(args: &cli::Args) -> Result<()> {
    let total_stages = 4
        + usize::from(args.emit_raw.is_some())
        + usize::from(args.output.is_some());
    let progress = CliProgress::new("Compile", total_stages);
    let mut stage = 0usize;

    stage += 1;
    progress.emit(stage, "Resolving input path");
    let input = canonicalize_file(&args.input)?;

    stage += 1;
    progress.emit(stage, "Parsing block program");
    let source = std::fs::read_to_string(&input)?;
    let program = BlockProgram::from_json(&source)?;

    stage += 1;
    progress.emit(stage, "Generating script");
    let generated = generate(&program, &args.model, &args.serial)?;

    if let Some(emit_path) = &args.emit_raw {
        stage += 1;
        progress.emit(stage, "Writing raw script");
        std::fs::write(emit_path, generated.source_text.as_bytes())?;
    }

    stage += 1;
    progress.emit(stage, "Instrumenting loops and functions");
    let instrumented = instrument(&generated.source_text);
    if !instrumented.is_protected() {
        eprintln!("warning: instrumentation fell back; the script has no loop protection.");
        if !args.allow_unprotected {
            anyhow::bail!(
                "Refusing to emit an unprotected script. Pass --allow-unprotected to override."
            );
        }
    }

    if let Some(output) = &args.output {
        stage += 1;
        progress.emit(stage, "Writing instrumented script");
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(output, instrumented.source_text.as_bytes())?;
    } else {
        print!("{}", instrumented.source_text);
    }
    eprintln!("guard function: {}", instrumented.guard_function_name);

    Ok(())
}

pub fn canonicalize_file(path: &Path) -> Result<PathBuf> {
    if !path.exists() || !path.is_file() {
        return Err(anyhow::anyhow!("Input file not found: '{}'.", path.display()));
    }
    Ok(path.canonicalize()?)
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
