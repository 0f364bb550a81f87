use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::LoadError;
use crate::models::{GameRecord, StudentRecord};
use crate::team::TeamRoster;

pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

impl Validate for StudentRecord {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Name is empty".to_string());
        }
        for (subject, score) in [
            ("Science", self.science),
            ("English", self.english),
            ("Maths", self.maths),
            ("History", self.history),
        ] {
            if !score.is_finite() || score < 0.0 {
                return Err(format!("{subject} score must be a non-negative number, got {score}"));
            }
        }
        Ok(())
    }
}

impl Validate for GameRecord {
    fn validate(&self) -> Result<(), String> {
        if self.home_team_name.is_empty() || self.away_team_name.is_empty() {
            return Err("team name is empty".to_string());
        }
        if self.home_team_name == self.away_team_name {
            return Err(format!("{} cannot play itself", self.home_team_name));
        }
        if let Some(winner) = &self.winner {
            if winner != &self.home_team_id && winner != &self.away_team_id {
                return Err(format!(
                    "winner {winner} is neither {} nor {}",
                    self.home_team_id, self.away_team_id
                ));
            }
        }
        Ok(())
    }
}

/// Rows paired with the line each record starts on.
fn read_rows<T>(path: &Path) -> Result<Vec<(u64, T)>, LoadError>
where
    T: DeserializeOwned + Validate,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());
        let row: T = record.deserialize(Some(&headers))?;
        row.validate()
            .map_err(|reason| LoadError::InvalidRow { line, reason })?;
        rows.push((line, row));
    }

    Ok(rows)
}

/// Reads and validates the student marksheet. Names must be unique.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_students(path: &Path) -> Result<Vec<StudentRecord>, LoadError> {
    let lines: Vec<(u64, StudentRecord)> = read_rows(path)?;

    let mut seen = HashSet::new();
    for (line, row) in &lines {
        if !seen.insert(row.name.as_str()) {
            return Err(LoadError::DuplicateStudent {
                name: row.name.clone(),
                line: *line,
            });
        }
    }
    let rows: Vec<StudentRecord> = lines.into_iter().map(|(_, row)| row).collect();

    info!(rows = rows.len(), "student marksheet loaded");
    Ok(rows)
}

#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_games(path: &Path) -> Result<Vec<GameRecord>, LoadError> {
    let rows: Vec<GameRecord> = read_rows(path)?
        .into_iter()
        .map(|(_, row)| row)
        .collect();
    info!(rows = rows.len(), "game log loaded");
    Ok(rows)
}

/// Reads a canonical team list, one name per line. Blank lines and `#` comments are skipped.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_roster(path: &Path) -> Result<TeamRoster, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let roster = TeamRoster::from_names(
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#')),
    );
    info!(teams = roster.len(), "team roster loaded");
    Ok(roster)
}

pub(crate) fn deserialize_game_date<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_game_date(&raw).ok_or_else(|| de::Error::custom(format!("unrecognized date {raw:?}")))
}

fn parse_game_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Integer ids written as floats (`1610612747.0`) compare equal to their integer form.
fn canonical_id(raw: &str) -> String {
    let raw = raw.trim();
    match raw.split_once('.') {
        Some((whole, fraction))
            if !whole.is_empty()
                && whole.bytes().all(|b| b.is_ascii_digit())
                && !fraction.is_empty()
                && fraction.bytes().all(|b| b == b'0') =>
        {
            whole.to_string()
        }
        _ => raw.to_string(),
    }
}

pub(crate) fn deserialize_team_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(canonical_id(&raw))
}

pub(crate) fn deserialize_winner<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|value| canonical_id(&value))
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("nan")))
}

fn parse_attendance(raw: &str) -> Result<Option<u32>, String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("attendance {raw:?} is not a number"))?;
    if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(format!(
            "attendance {raw:?} is not a non-negative whole number"
        ));
    }
    Ok(Some(value as u32))
}

pub(crate) fn deserialize_attendance<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_attendance(&raw).map_err(de::Error::custom),
        None => Ok(None),
    }
}

/// File identity used to decide whether a cached table is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStamp {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl CacheStamp {
    pub fn of(path: &Path) -> Result<Self, LoadError> {
        let metadata = fs::metadata(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }
}

/// Decides when a cached table must be re-read.
pub trait ReloadPolicy {
    fn inspects_file(&self) -> bool {
        true
    }

    fn should_reload(&self, cached: &CacheStamp, current: &CacheStamp) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOnce;

impl ReloadPolicy for LoadOnce {
    fn inspects_file(&self) -> bool {
        false
    }

    fn should_reload(&self, _cached: &CacheStamp, _current: &CacheStamp) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReloadOnModified;

impl ReloadPolicy for ReloadOnModified {
    fn should_reload(&self, cached: &CacheStamp, current: &CacheStamp) -> bool {
        cached != current
    }
}

impl<P: ReloadPolicy + ?Sized> ReloadPolicy for Box<P> {
    fn inspects_file(&self) -> bool {
        (**self).inspects_file()
    }

    fn should_reload(&self, cached: &CacheStamp, current: &CacheStamp) -> bool {
        (**self).should_reload(cached, current)
    }
}

type Loader<T> = fn(&Path) -> Result<Vec<T>, LoadError>;

pub struct TableCache<T, P> {
    path: PathBuf,
    policy: P,
    load: Loader<T>,
    entry: Option<(CacheStamp, Vec<T>)>,
    loads: usize,
}

impl<T, P: ReloadPolicy> TableCache<T, P> {
    pub fn new(path: impl Into<PathBuf>, policy: P, load: Loader<T>) -> Self {
        Self {
            path: path.into(),
            policy,
            load,
            entry: None,
            loads: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of times the file has been parsed.
    pub fn loads(&self) -> usize {
        self.loads
    }

    #[cfg(test)]
    fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Current rows, reading the file if the cache is empty or the policy says it is stale.
    pub fn get(&mut self) -> Result<&[T], LoadError> {
        let stale = match &self.entry {
            None => true,
            Some(_) if !self.policy.inspects_file() => false,
            Some((cached, _)) => {
                let current = CacheStamp::of(&self.path)?;
                self.policy.should_reload(cached, &current)
            }
        };

        if stale {
            let stamp = CacheStamp::of(&self.path)?;
            let rows = (self.load)(&self.path)?;
            self.loads += 1;
            debug!(path = %self.path.display(), loads = self.loads, "table cache refreshed");
            self.entry = Some((stamp, rows));
        }

        Ok(self
            .entry
            .as_ref()
            .map(|(_, rows)| rows.as_slice())
            .unwrap_or(&[]))
    }
}

pub type StudentTable = TableCache<StudentRecord, Box<dyn ReloadPolicy>>;
pub type GameTable = TableCache<GameRecord, Box<dyn ReloadPolicy>>;

pub struct Dataset {
    pub students: StudentTable,
    pub games: GameTable,
}

impl Dataset {
    pub fn new(
        students: impl Into<PathBuf>,
        games: impl Into<PathBuf>,
        policy: impl Fn() -> Box<dyn ReloadPolicy>,
    ) -> Self {
        Self {
            students: TableCache::new(students, policy(), load_students),
            games: TableCache::new(games, policy(), load_games),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(format!("dashboard_stats_{}_{}", std::process::id(), name))
    }

    fn write_file(path: &Path, content: &str) {
        let mut file = fs::File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    const STUDENTS: &str = "Name,Section,Gender,Age,Science,English,Maths,History\n\
        Asha,A,F,15,75,80,70,65\n\
        Bilal,B,M,16,60.5,70,90,55\n";

    const GAMES: &str = "gameDate,hometeamName,awayteamName,hometeamId,awayteamId,homeScore,awayScore,winner,attendance,gameType\n\
        2024-01-02 19:30:00,Lakers,Celtics,1610612747,1610612738,110,102,1610612747,18997.0,Regular Season\n\
        2024-01-05T20:00:00,Celtics,Lakers,1610612738,1610612747,99,99,,,Regular Season\n\
        2024-01-09,Celtics,Lakers,1610612738,1610612747,120,101,1610612738,19156,Regular Season\n";

    #[test]
    fn loads_students_with_typed_fields() {
        let path = temp_path("students.csv");
        write_file(&path, STUDENTS);

        let rows = load_students(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].name, "Bilal");
        assert_eq!(rows[1].science, 60.5);
        assert_eq!(rows[0].age, 15);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn duplicate_student_names_are_rejected() {
        let path = temp_path("dup_students.csv");
        write_file(
            &path,
            "Name,Section,Gender,Age,Science,English,Maths,History\n\
             Asha,A,F,15,75,80,70,65\n\
             Asha,B,F,15,70,80,70,65\n",
        );

        match load_students(&path) {
            Err(LoadError::DuplicateStudent { name, line }) => {
                assert_eq!(name, "Asha");
                assert_eq!(line, 3);
            }
            other => panic!("expected duplicate error, got {other:?}"),
        }

        fs::remove_file(&path).ok();
    }

    #[test]
    fn negative_scores_are_invalid() {
        let path = temp_path("negative_students.csv");
        write_file(
            &path,
            "Name,Section,Gender,Age,Science,English,Maths,History\n\
             Asha,A,F,15,-1,80,70,65\n",
        );

        assert!(matches!(
            load_students(&path),
            Err(LoadError::InvalidRow { .. })
        ));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn loads_games_with_mixed_date_formats_and_blanks() {
        let path = temp_path("games.csv");
        write_file(&path, GAMES);

        let rows = load_games(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].attendance, Some(18997));
        assert_eq!(rows[0].winner.as_deref(), Some("1610612747"));
        assert_eq!(rows[1].winner, None);
        assert_eq!(rows[1].attendance, None);
        assert_eq!(
            rows[2].game_date,
            NaiveDate::from_ymd_opt(2024, 1, 9)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );

        fs::remove_file(&path).ok();
    }

    #[test]
    fn winner_outside_the_game_is_invalid() {
        let path = temp_path("bad_winner.csv");
        write_file(
            &path,
            "gameDate,hometeamName,awayteamName,hometeamId,awayteamId,homeScore,awayScore,winner,attendance\n\
             2024-01-02,Lakers,Celtics,1,2,110,102,3,100\n",
        );

        match load_games(&path) {
            Err(LoadError::InvalidRow { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("winner"));
            }
            other => panic!("expected invalid row, got {other:?}"),
        }

        fs::remove_file(&path).ok();
    }

    #[test]
    fn date_parser_accepts_rfc3339() {
        let parsed = parse_game_date("2024-03-01T18:00:00Z").unwrap();
        assert_eq!(parsed.to_string(), "2024-03-01 18:00:00");
        assert!(parse_game_date("March 1st").is_none());
    }

    #[test]
    fn roster_file_skips_comments_and_blanks() {
        let path = temp_path("roster.txt");
        write_file(&path, "# western\nLakers\n\n  Suns \nCeltics\n");

        let roster = load_roster(&path).unwrap();
        assert_eq!(
            roster.iter().collect::<Vec<_>>(),
            vec!["Celtics", "Lakers", "Suns"]
        );

        fs::remove_file(&path).ok();
    }

    #[test]
    fn load_once_cache_never_rereads() {
        let path = temp_path("cache_once.csv");
        write_file(&path, STUDENTS);

        let mut cache = TableCache::new(&path, LoadOnce, load_students);
        assert_eq!(cache.get().unwrap().len(), 2);

        write_file(&path, "Name,Section,Gender,Age,Science,English,Maths,History\n");
        assert_eq!(cache.get().unwrap().len(), 2);
        assert_eq!(cache.loads(), 1);

        cache.invalidate();
        assert_eq!(cache.get().unwrap().len(), 0);
        assert_eq!(cache.loads(), 2);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn modified_file_is_reloaded() {
        let path = temp_path("cache_mtime.csv");
        write_file(&path, STUDENTS);

        let mut cache = TableCache::new(&path, ReloadOnModified, load_students);
        assert_eq!(cache.get().unwrap().len(), 2);
        assert_eq!(cache.get().unwrap().len(), 2);
        assert_eq!(cache.loads(), 1);

        // length changes even if the clock granularity hides the mtime bump
        write_file(&path, &format!("{STUDENTS}Chen,A,M,15,50,50,50,50\n"));
        assert_eq!(cache.get().unwrap().len(), 3);
        assert_eq!(cache.loads(), 2);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn dataset_uses_injected_policy() {
        let students = temp_path("dataset_students.csv");
        let games = temp_path("dataset_games.csv");
        write_file(&students, STUDENTS);
        write_file(&games, GAMES);

        let mut dataset = Dataset::new(&students, &games, || {
            Box::new(LoadOnce) as Box<dyn ReloadPolicy>
        });
        assert_eq!(dataset.students.get().unwrap().len(), 2);
        assert_eq!(dataset.games.get().unwrap().len(), 3);
        assert_eq!(dataset.games.path(), games.as_path());

        fs::remove_file(&students).ok();
        fs::remove_file(&games).ok();
    }

    #[test]
    fn float_written_ids_match_integer_ids() {
        let path = temp_path("float_ids.csv");
        write_file(
            &path,
            "gameDate,hometeamName,awayteamName,hometeamId,awayteamId,homeScore,awayScore,winner,attendance\n\
             2024-01-02,Lakers,Celtics,1610612747,1610612738,110,102,1610612747.0,18997.0\n\
             2024-01-04,Celtics,Lakers,1610612738.0,1610612747,99,99,,\n",
        );

        let rows = load_games(&path).unwrap();
        assert_eq!(rows[0].winner.as_deref(), Some("1610612747"));
        assert_eq!(rows[0].winner_name(), Some("Lakers"));
        assert_eq!(rows[1].home_team_id, "1610612738");
        assert_eq!(rows[1].winner, None);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn ids_keep_non_integer_text() {
        assert_eq!(canonical_id(" 42.00 "), "42");
        assert_eq!(canonical_id("42.5"), "42.5");
        assert_eq!(canonical_id("LAL"), "LAL");
        assert_eq!(canonical_id(".0"), ".0");
    }

    #[test]
    fn duplicate_line_accounts_for_multiline_fields() {
        let path = temp_path("dup_multiline.csv");
        write_file(
            &path,
            "Name,Section,Gender,Age,Science,English,Maths,History\n\
             Asha,\"A\nevening\",F,15,75,80,70,65\n\
             Asha,B,F,15,70,80,70,65\n",
        );

        match load_students(&path) {
            Err(LoadError::DuplicateStudent { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected duplicate error, got {other:?}"),
        }

        fs::remove_file(&path).ok();
    }

    #[test]
    fn attendance_accepts_whole_numbers_and_blanks() {
        assert_eq!(parse_attendance("18997"), Ok(Some(18997)));
        assert_eq!(parse_attendance("18997.0"), Ok(Some(18997)));
        assert_eq!(parse_attendance(" "), Ok(None));
        assert_eq!(parse_attendance("NaN"), Ok(None));
    }

    #[test]
    fn attendance_rejects_bad_values() {
        for raw in ["-5", "100.5", "sold out", "1e12"] {
            assert!(parse_attendance(raw).is_err(), "{raw} should be rejected");
        }
    }
}
