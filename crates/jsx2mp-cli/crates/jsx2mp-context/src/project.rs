use crate::config::Jsx2mpConfig;
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "jsx2mp.json";

/// A loaded jsx2mp project, providing source collection and output paths.
#[derive(Clone)]
pub struct Jsx2mpProject {
    pub root: PathBuf,
    pub config: Jsx2mpConfig,
}

impl Jsx2mpProject {
    /// Load a project from the given directory.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        if !config_path.exists() {
            bail!("No {CONFIG_FILE} found. Are you in a jsx2mp project directory?");
        }
        let raw = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {CONFIG_FILE}"))?;
        let config: Jsx2mpConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {CONFIG_FILE}"))?;
        Ok(Self {
            root: dir.to_path_buf(),
            config,
        })
    }

    /// Load a project from the current working directory.
    pub fn load_cwd() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::load(&cwd)
    }

    /// Collect all component sources (.jsx, .js) under the source directory.
    ///
    /// Keyed by path relative to it (e.g. `"pages/index.jsx"`), sorted.
    pub fn collect_sources(&self) -> Result<BTreeMap<String, String>> {
        let src_dir = self.src_dir();
        if !src_dir.exists() {
            bail!("No {}/ directory found.", self.config.src);
        }
        let mut files = BTreeMap::new();
        collect_sources_recursive(&src_dir, &src_dir, &mut files)?;
        Ok(files)
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root.join(&self.config.src)
    }

    /// `<out>/<target>/`
    pub fn out_dir(&self) -> PathBuf {
        self.root
            .join(&self.config.out)
            .join(self.config.output_name())
    }
}

/// Recursively collect sources into the map. Keys are relative to `base`.
fn collect_sources_recursive(
    dir: &Path,
    base: &Path,
    files: &mut BTreeMap<String, String>,
) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_sources_recursive(&path, base, files)?;
        } else if is_source_file(&path) {
            let rel = path
                .strip_prefix(base)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            files.insert(rel, content);
        }
    }
    Ok(())
}

fn is_source_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("jsx" | "js")
    )
}
