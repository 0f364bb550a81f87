use std::path::PathBuf;
use std::str::FromStr;

use anyhow::bail;

use crate::loader::{LoadOnce, ReloadOnModified, ReloadPolicy};

pub const DEFAULT_STUDENTS_CSV: &str = "DataSet/student_marks.csv";
pub const DEFAULT_GAMES_CSV: &str = "nba.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    Once,
    #[default]
    Modified,
}

impl CachePolicy {
    pub fn build(self) -> Box<dyn ReloadPolicy> {
        match self {
            CachePolicy::Once => Box::new(LoadOnce),
            CachePolicy::Modified => Box::new(ReloadOnModified),
        }
    }
}

impl FromStr for CachePolicy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "once" => Ok(CachePolicy::Once),
            "mtime" | "modified" => Ok(CachePolicy::Modified),
            other => bail!("CACHE_POLICY must be `once` or `mtime`, got {other:?}"),
        }
    }
}

/// Where the tables live and how their cache behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub students_csv: PathBuf,
    pub games_csv: PathBuf,
    pub roster: Option<PathBuf>,
    pub cache_policy: CachePolicy,
}

impl Config {
    /// Reads `STUDENT_MARKS_CSV`, `NBA_GAMES_CSV`, `TEAM_ROSTER` and `CACHE_POLICY`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cache_policy = match non_empty("CACHE_POLICY") {
            Some(value) => value.parse()?,
            None => CachePolicy::default(),
        };

        Ok(Self {
            students_csv: non_empty("STUDENT_MARKS_CSV")
                .unwrap_or_else(|| DEFAULT_STUDENTS_CSV.to_string())
                .into(),
            games_csv: non_empty("NBA_GAMES_CSV")
                .unwrap_or_else(|| DEFAULT_GAMES_CSV.to_string())
                .into(),
            roster: non_empty("TEAM_ROSTER").map(PathBuf::from),
            cache_policy,
        })
    }
}
