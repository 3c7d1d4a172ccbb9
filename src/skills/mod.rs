pub mod generator;
pub mod loader;

pub use generator::{
    accept_artifact, artifact_dir, artifact_exists, module_name, remove_artifact, write_artifact,
    ACCEPTED_MARKER,
};
pub use loader::{load_skills, parse_skill_file, SkillArtifact};
