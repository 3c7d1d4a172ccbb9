//! Per-day markdown log of wake cycles.

use chrono::{DateTime, NaiveDate, Utc};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct DailyLog {
    dir: PathBuf,
}

impl DailyLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/YYYY-MM-DD.md`
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.md", date.format("%Y-%m-%d")))
    }

    /// Append one bullet line to today's log, creating it with a heading.
    pub fn append(&self, at: DateTime<Utc>, line: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(at.date_naive());
        let fresh = !path.exists();

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if fresh {
            writeln!(file, "# {}\n", at.format("%Y-%m-%d"))?;
        }
        writeln!(file, "- {} {}", at.format("%H:%M:%S"), line.trim())?;
        Ok(())
    }
}
