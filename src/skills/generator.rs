//! Writes artifacts for candidate ideas.

use super::loader::{SkillFrontmatter, SKILL_FILE};
use crate::types::CandidateIdea;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const MAX_MODULE_LEN: usize = 40;
const ARTIFACT_VERSION: &str = "0.1.0";

/// Written next to `SKILL.md` once the artifact's tests have passed.
pub const ACCEPTED_MARKER: &str = ".accepted";

/// Filesystem-safe module name for a topic: lowercase alphanumerics joined
/// by single underscores. Falls back to the candidate id.
pub fn module_name(candidate: &CandidateIdea) -> String {
    let mut name = String::new();
    for ch in candidate.topic.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            name.push(ch);
        } else if !name.is_empty() && !name.ends_with('_') {
            name.push('_');
        }
        if name.len() >= MAX_MODULE_LEN {
            break;
        }
    }
    let name = name.trim_end_matches('_').to_string();
    if name.is_empty() {
        candidate.id.replace('-', "_")
    } else {
        name
    }
}

/// Directory name for a candidate: `<module>_<id>`, so topics that share a
/// prefix or differ only in punctuation never collide.
pub fn artifact_dir(artifacts_dir: &Path, candidate: &CandidateIdea) -> PathBuf {
    let id = candidate.id.replace('-', "_");
    let module = module_name(candidate);
    if module == id {
        artifacts_dir.join(id)
    } else {
        artifacts_dir.join(format!("{module}_{id}"))
    }
}

/// An artifact counts only once its tests passed and it was accepted.
pub fn artifact_exists(artifacts_dir: &Path, candidate: &CandidateIdea) -> bool {
    let dir = artifact_dir(artifacts_dir, candidate);
    dir.join(SKILL_FILE).is_file() && dir.join(ACCEPTED_MARKER).is_file()
}

/// Mark a written artifact as accepted.
pub fn accept_artifact(dir: &Path) -> io::Result<()> {
    fs::write(dir.join(ACCEPTED_MARKER), chrono::Utc::now().to_rfc3339())
}

/// Write `<artifacts_dir>/<module>_<id>/SKILL.md` and return its directory.
/// Leftovers of an unaccepted earlier attempt are discarded first.
pub fn write_artifact(artifacts_dir: &Path, candidate: &CandidateIdea) -> io::Result<PathBuf> {
    let dir = artifact_dir(artifacts_dir, candidate);
    if dir.exists() {
        warn!("Discarding unaccepted artifact {:?}", dir);
        fs::remove_dir_all(&dir)?;
    }
    fs::create_dir_all(&dir)?;

    let frontmatter = SkillFrontmatter {
        name: Some(module_name(candidate)),
        description: Some(candidate.topic.clone()),
        version: Some(ARTIFACT_VERSION.to_string()),
        categories: candidate.categories.iter().cloned().collect(),
        source: Some(candidate.source.clone()),
    };
    let yaml = serde_yaml::to_string(&frontmatter)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let mut body = format!("---\n{}---\n# {}\n\n", yaml, candidate.topic);
    body.push_str(&format!(
        "Seen {} times since {}, relevance {:.2}.\n\nSources:\n",
        candidate.seen_count,
        candidate.first_seen.format("%Y-%m-%d"),
        candidate.score
    ));
    for source in &candidate.sources {
        body.push_str(&format!("- {source}\n"));
    }

    fs::write(dir.join(SKILL_FILE), body)?;
    info!("Wrote artifact {:?}", dir);
    Ok(dir)
}

/// Remove a partially accepted artifact. Missing directories are fine.
pub fn remove_artifact(dir: &Path) {
    match fs::remove_dir_all(dir) {
        Ok(()) => info!("Removed failed artifact {:?}", dir),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove artifact {:?}: {}", dir, e),
    }
}
