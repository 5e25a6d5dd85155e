use anyhow::{bail, Result};
use jsx2mp_compiler::Target;
use jsx2mp_context::project::Jsx2mpProject;
use std::fs;
use tracing::warn;

use super::compile::compile_source;

pub fn run(target: Option<Target>) -> Result<()> {
    let mut project = Jsx2mpProject::load_cwd()?;
    if let Some(target) = target {
        project.config.target = target;
    }
    build(&project)
}

/// Compile every source of `project` into its output directory.
///
/// A file that fails to compile is reported and not written; the build
/// fails once all files have been tried.
pub fn build(project: &Jsx2mpProject) -> Result<()> {
    let options = project.config.compile_options()?;
    let files = project.collect_sources()?;

    println!("Building '{}' for {}...", project.config.name, project.config.output_name());
    println!("  Collected {} source files", files.len());

    let out_dir = project.out_dir();
    if out_dir.exists() {
        fs::remove_dir_all(&out_dir)?;
    }
    fs::create_dir_all(&out_dir)?;

    let mut written = 0;
    let mut failed = Vec::new();
    for (rel, source) in &files {
        match compile_source(source, &options, false) {
            Ok(code) => {
                let out_path = out_dir.join(rel);
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&out_path, code)?;
                println!("  {rel}");
                written += 1;
            }
            Err(e) => {
                warn!(file = %rel, "compile failed");
                eprintln!("  {rel}: {e:#}");
                failed.push(rel.clone());
            }
        }
    }

    println!(
        "\nBuild complete: {} file(s) in {}/{}/",
        written,
        project.config.out,
        project.config.output_name()
    );
    if !failed.is_empty() {
        bail!("{} file(s) failed to compile: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}
