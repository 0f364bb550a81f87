use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::error::AggregateError;
use crate::models::{GameRecord, OpponentRow, TeamPerspective, TeamSummary, TrendPoint};
use crate::stats::mean;

/// Canonical list of team names, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamRoster {
    names: BTreeSet<String>,
}

impl TeamRoster {
    /// Union of every home and away team in the log.
    pub fn from_games(games: &[GameRecord]) -> Self {
        let names = games
            .iter()
            .flat_map(|g| [g.home_team_name.clone(), g.away_team_name.clone()])
            .collect();
        Self { names }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, team: &str) -> bool {
        self.names.contains(team)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Running totals for one group of games seen from the selected team.
#[derive(Debug, Default)]
struct Tally {
    games: usize,
    wins: usize,
    no_result: usize,
    scored: Vec<f64>,
    allowed: Vec<f64>,
    attendance: Vec<f64>,
}

impl Tally {
    fn add(&mut self, game: &GameRecord, view: &TeamPerspective<'_>) {
        self.games += 1;
        if view.won {
            self.wins += 1;
        }
        if !view.decided {
            self.no_result += 1;
        }
        self.scored.push(view.scored as f64);
        self.allowed.push(view.allowed as f64);
        if let Some(attendance) = game.attendance {
            self.attendance.push(attendance as f64);
        }
    }

    // Anything that is not a win counts as a loss, including games without a winner.
    fn losses(&self) -> usize {
        self.games - self.wins
    }
}

/// Team summary that never fails; zero games yields undefined averages.
pub fn summarize_team(games: &[GameRecord], team: &str) -> TeamSummary {
    let mut tally = Tally::default();
    for game in games {
        if let Some(view) = game.perspective(team) {
            tally.add(game, &view);
        }
    }

    if tally.no_result > 0 {
        warn!(
            team,
            no_result = tally.no_result,
            "games without a recorded winner counted as losses"
        );
    }
    debug!(team, games = tally.games, wins = tally.wins, "team summarized");

    TeamSummary {
        team: team.to_string(),
        games_played: tally.games,
        wins: tally.wins,
        losses: tally.losses(),
        no_result: tally.no_result,
        avg_points_scored: mean(&tally.scored),
        avg_points_allowed: mean(&tally.allowed),
        avg_attendance: mean(&tally.attendance),
    }
}

/// Team summary that reports a team absent from the log as unknown.
pub fn compute_team_summary(
    games: &[GameRecord],
    team: &str,
) -> Result<TeamSummary, AggregateError> {
    let summary = summarize_team(games, team);
    if summary.games_played == 0 {
        return Err(AggregateError::UnknownTeam(team.to_string()));
    }
    Ok(summary)
}

/// Like [`compute_team_summary`], but a rostered team with no games is a valid empty summary.
pub fn compute_team_summary_in(
    roster: &TeamRoster,
    games: &[GameRecord],
    team: &str,
) -> Result<TeamSummary, AggregateError> {
    if !roster.contains(team) {
        return Err(AggregateError::UnknownTeam(team.to_string()));
    }
    Ok(summarize_team(games, team))
}

/// One row per opponent, in the order opponents first appear in `games`.
pub fn compute_opponent_breakdown(games: &[GameRecord], team: &str) -> Vec<OpponentRow> {
    let mut order: Vec<&str> = Vec::new();
    let mut tallies: HashMap<&str, Tally> = HashMap::new();

    for game in games {
        let Some(view) = game.perspective(team) else {
            continue;
        };
        let tally = tallies.entry(view.opponent).or_insert_with(|| {
            order.push(view.opponent);
            Tally::default()
        });
        tally.add(game, &view);
    }

    order
        .into_iter()
        .filter_map(|opponent| {
            let tally = tallies.remove(opponent)?;
            Some(OpponentRow {
                opponent: opponent.to_string(),
                wins: tally.wins,
                losses: tally.losses(),
                avg_scored: mean(&tally.scored),
                avg_allowed: mean(&tally.allowed),
                avg_attendance: mean(&tally.attendance),
            })
        })
        .collect()
}

/// Scored/allowed per game for `team`, oldest first.
pub fn score_trend(games: &[GameRecord], team: &str) -> Vec<TrendPoint> {
    let mut points: Vec<TrendPoint> = games
        .iter()
        .filter_map(|game| {
            let view = game.perspective(team)?;
            Some(TrendPoint {
                date: game.game_date,
                opponent: view.opponent.to_string(),
                scored: view.scored,
                allowed: view.allowed,
            })
        })
        .collect();

    points.sort_by_key(|p| p.date);
    points
}

/// Every game `team` played, oldest first.
pub fn game_log(games: &[GameRecord], team: &str) -> Vec<GameRecord> {
    let mut played: Vec<GameRecord> = games
        .iter()
        .filter(|game| game.perspective(team).is_some())
        .cloned()
        .collect();
    played.sort_by_key(|game| game.game_date);
    played
}

/// `scored - allowed` for each of `team`'s games, in log order.
pub fn point_differentials(games: &[GameRecord], team: &str) -> Vec<i64> {
    games
        .iter()
        .filter_map(|game| game.perspective(team))
        .map(|view| view.scored as i64 - view.allowed as i64)
        .collect()
}
