//! Discovers and parses built artifacts.
//!
//! Every artifact is a `SKILL.md` file with YAML frontmatter (name,
//! description, version, categories, source) followed by instructions.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const SKILL_FILE: &str = "SKILL.md";

/// A parsed artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillArtifact {
    pub name: String,
    pub description: String,
    pub version: String,
    pub categories: Vec<String>,
    pub source: String,
    pub instructions: String,
    pub path: PathBuf,
}

/// YAML frontmatter of a SKILL.md file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct SkillFrontmatter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Load every artifact under `dir`. Unparseable files are skipped with a
/// warning.
pub fn load_skills(dir: &Path) -> Result<Vec<SkillArtifact>> {
    let mut skills = Vec::new();
    for path in skill_files(dir)? {
        match parse_skill_file(&path) {
            Ok(skill) => {
                debug!("Loaded artifact: {} v{}", skill.name, skill.version);
                skills.push(skill);
            }
            Err(e) => warn!("Failed to parse artifact at {:?}: {}", path, e),
        }
    }
    info!("Loaded {} artifacts from {:?}", skills.len(), dir);
    Ok(skills)
}

/// Every `SKILL.md` directly in `dir` or one level below it.
pub fn skill_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        debug!("Artifacts directory does not exist: {:?}", dir);
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let entries = std::fs::read_dir(dir).context("Failed to read artifacts directory")?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.file_name().map(|n| n == SKILL_FILE).unwrap_or(false) {
            files.push(path);
        } else if path.is_dir() {
            let skill_file = path.join(SKILL_FILE);
            if skill_file.exists() {
                files.push(skill_file);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Parse a SKILL.md file.
///
/// ```markdown
/// ---
/// name: memory_decay
/// description: Forget what no longer matters
/// version: 0.1.0
/// categories: [memory_systems, agent_operations]
/// source: feed:42
/// ---
/// Instructions here...
/// ```
pub fn parse_skill_file(path: &Path) -> Result<SkillArtifact> {
    let content = std::fs::read_to_string(path).context("Failed to read artifact file")?;
    let (frontmatter, instructions) = split_frontmatter(&content);

    let fm: SkillFrontmatter = if frontmatter.is_empty() {
        SkillFrontmatter::default()
    } else {
        serde_yaml::from_str(frontmatter).context("Failed to parse SKILL.md frontmatter")?
    };

    let default_name = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();

    let name = fm.name.unwrap_or(default_name);
    if name.trim().is_empty() {
        bail!("artifact at {:?} has an empty name", path);
    }

    Ok(SkillArtifact {
        name,
        description: fm.description.unwrap_or_default(),
        version: fm.version.unwrap_or_else(|| "0.1.0".to_string()),
        categories: fm.categories,
        source: fm.source.unwrap_or_default(),
        instructions,
        path: path.to_path_buf(),
    })
}

/// Split YAML frontmatter (between `---` markers) from the rest of the content.
fn split_frontmatter(content: &str) -> (&str, String) {
    let trimmed = content.trim_start();

    let Some(after_first) = trimmed.strip_prefix("---") else {
        return ("", content.to_string());
    };

    match after_first.find("\n---") {
        Some(end_idx) => {
            let fm = after_first[..end_idx].trim();
            let body = &after_first[end_idx + 4..];
            (fm, body.trim_start_matches('\n').to_string())
        }
        None => ("", content.to_string()),
    }
}
