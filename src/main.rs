use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use gradient_forge::{
    dsl,
    logging::{self, LoggingConfig},
    pdf::{InMemoryDocument, PdfObject},
    shader::{self, GradientCache, validation},
};

#[derive(Debug, Default, Clone)]
struct Cli {
    scene_json: Option<PathBuf>,
    output: Option<PathBuf>,
    log_filter: Option<String>,
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--scene-json" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --scene-json"));
                };
                cli.scene_json = Some(PathBuf::from(v));
                i += 2;
            }
            "--output" | "-o" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --output"));
                };
                cli.output = Some(PathBuf::from(v));
                i += 2;
            }
            "--log" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --log"));
                };
                cli.log_filter = Some(v.clone());
                i += 2;
            }
            other => {
                return Err(anyhow!(
                    "unknown argument: {other} \
                     (supported: --scene-json <scene.json>, --output <file>, --log <filter>)"
                ));
            }
        }
    }
    Ok(cli)
}

/// Compile every gradient of the scene into a fresh document.
fn compile_scene(scene: &dsl::GradientScene) -> Result<InMemoryDocument> {
    let mut doc = InMemoryDocument::new();
    let mut cache = GradientCache::new();

    for draw in &scene.gradients {
        let pattern = shader::compile_gradient(
            &mut doc,
            &mut cache,
            &draw.shader,
            &draw.canvas_matrix,
            draw.bbox,
        )
        .with_context(|| format!("failed to compile gradient '{}'", draw.id))?;
        match pattern {
            Some(p) => log::info!("gradient '{}' -> pattern {} 0 R", draw.id, p.number()),
            None => log::warn!("gradient '{}' produced no pattern", draw.id),
        }
    }

    log::info!(
        "compiled {} gradient(s) into {} object(s), {} cached pattern(s)",
        scene.gradients.len(),
        doc.len(),
        cache.len()
    );
    Ok(doc)
}

/// Parse every emitted calculator function so a malformed program fails the run.
fn validate_calculator_functions(doc: &InMemoryDocument) -> Result<()> {
    for (r, obj) in doc.iter() {
        if obj.dict.get("FunctionType").and_then(PdfObject::as_i64) != Some(4) {
            continue;
        }
        let text = obj
            .stream_text()
            .ok_or_else(|| anyhow!("function {} 0 R has no text stream", r.number()))?;
        let context = format!("function {} 0 R", r.number());
        let program = validation::validate_program_with_context(text, &context)?;
        log::debug!(
            "function {} 0 R: {} bytes, branch depth {}",
            r.number(),
            text.len(),
            program.max_branch_depth()
        );
    }
    Ok(())
}

fn write_output(doc: &InMemoryDocument, output: Option<&Path>) -> Result<()> {
    let text = doc.serialize();
    match output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            log::info!("saved: {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&argv)?;

    logging::init_logging(LoggingConfig {
        env_filter: cli.log_filter.clone(),
        ..LoggingConfig::default()
    });

    let scene_path = cli
        .scene_json
        .as_deref()
        .ok_or_else(|| anyhow!("--scene-json <scene.json> is required"))?;
    let scene = dsl::load_scene_from_path(scene_path)?;

    let doc = compile_scene(&scene)?;
    validate_calculator_functions(&doc)?;
    write_output(&doc, cli.output.as_deref())
}
