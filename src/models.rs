use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::loader::{
    deserialize_attendance, deserialize_game_date, deserialize_team_id, deserialize_winner,
};

/// One row of the student marksheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Section")]
    pub section: String,
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "Age")]
    pub age: u32,
    #[serde(rename = "Science")]
    pub science: f64,
    #[serde(rename = "English")]
    pub english: f64,
    #[serde(rename = "Maths")]
    pub maths: f64,
    #[serde(rename = "History")]
    pub history: f64,
}

impl StudentRecord {
    pub fn score(&self, subject: Subject) -> f64 {
        match subject {
            Subject::Science => self.science,
            Subject::English => self.english,
            Subject::History => self.history,
            Subject::Maths => self.maths,
        }
    }

    pub fn total_marks(&self) -> f64 {
        Subject::ALL.iter().map(|subject| self.score(*subject)).sum()
    }
}

/// Subjects in the order used to break best/worst ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    Science,
    English,
    History,
    Maths,
}

impl Subject {
    pub const ALL: [Subject; 4] = [
        Subject::Science,
        Subject::English,
        Subject::History,
        Subject::Maths,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Subject::Science => "Science",
            Subject::English => "English",
            Subject::History => "History",
            Subject::Maths => "Maths",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentReport {
    pub name: String,
    pub section: String,
    pub gender: String,
    pub scores: Vec<(Subject, f64)>,
    pub total_marks: f64,
    pub average_marks: f64,
    pub best_subject: Subject,
    pub worst_subject: Subject,
    pub class_rank: usize,
    pub cohort_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedStudent {
    pub name: String,
    pub total_marks: f64,
    pub rank: usize,
}

/// One row of the game log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    #[serde(rename = "gameDate", deserialize_with = "deserialize_game_date")]
    pub game_date: NaiveDateTime,
    #[serde(rename = "hometeamName")]
    pub home_team_name: String,
    #[serde(rename = "awayteamName")]
    pub away_team_name: String,
    #[serde(rename = "hometeamId", deserialize_with = "deserialize_team_id")]
    pub home_team_id: String,
    #[serde(rename = "awayteamId", deserialize_with = "deserialize_team_id")]
    pub away_team_id: String,
    #[serde(rename = "homeScore")]
    pub home_score: u32,
    #[serde(rename = "awayScore")]
    pub away_score: u32,
    #[serde(default, deserialize_with = "deserialize_winner")]
    pub winner: Option<String>,
    #[serde(default, deserialize_with = "deserialize_attendance")]
    pub attendance: Option<u32>,
}

/// A game seen from one team's side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamPerspective<'a> {
    pub opponent: &'a str,
    pub scored: u32,
    pub allowed: u32,
    pub won: bool,
    pub decided: bool,
}

impl GameRecord {
    pub fn winner_name(&self) -> Option<&str> {
        let winner = self.winner.as_ref()?;
        if *winner == self.home_team_id {
            Some(self.home_team_name.as_str())
        } else if *winner == self.away_team_id {
            Some(self.away_team_name.as_str())
        } else {
            None
        }
    }

    /// Normalizes the game to `team`'s point of view, or `None` if the team did not play.
    pub fn perspective(&self, team: &str) -> Option<TeamPerspective<'_>> {
        let (team_id, opponent, scored, allowed) = if self.home_team_name == team {
            (
                &self.home_team_id,
                self.away_team_name.as_str(),
                self.home_score,
                self.away_score,
            )
        } else if self.away_team_name == team {
            (
                &self.away_team_id,
                self.home_team_name.as_str(),
                self.away_score,
                self.home_score,
            )
        } else {
            return None;
        };

        Some(TeamPerspective {
            opponent,
            scored,
            allowed,
            won: self.winner.as_ref() == Some(team_id),
            decided: self.winner.is_some(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSummary {
    pub team: String,
    pub games_played: usize,
    pub wins: usize,
    pub losses: usize,
    /// Games without a recorded winner. Already included in `losses`.
    pub no_result: usize,
    pub avg_points_scored: Option<f64>,
    pub avg_points_allowed: Option<f64>,
    pub avg_attendance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpponentRow {
    pub opponent: String,
    pub wins: usize,
    pub losses: usize,
    pub avg_scored: Option<f64>,
    pub avg_allowed: Option<f64>,
    pub avg_attendance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDateTime,
    pub opponent: String,
    pub scored: u32,
    pub allowed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub dtype: &'static str,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDescription {
    pub rows: usize,
    pub columns: usize,
    pub summaries: Vec<ColumnSummary>,
}
