use std::fmt::Write;

use serde::Serialize;

use crate::models::{
    GameRecord, HistogramBin, OpponentRow, RankedStudent, StudentReport, Subject, TableDescription,
    TeamSummary, TrendPoint,
};
use crate::student::CohortFilter;

/// Everything shown for one team.
#[derive(Debug, Clone, Serialize)]
pub struct TeamDashboard {
    pub summary: TeamSummary,
    pub opponents: Vec<OpponentRow>,
    pub trend: Vec<TrendPoint>,
    pub differentials: Vec<HistogramBin>,
    pub games: Vec<GameRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CohortDashboard {
    pub filter: CohortFilter,
    pub ranking: Vec<RankedStudent>,
    pub subject_averages: Vec<(Subject, Option<f64>)>,
}

/// Formats a possibly undefined statistic; undefined renders as `n/a`.
pub fn fmt_stat(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "n/a".to_string(),
    }
}

pub fn build_student_report(filter: &CohortFilter, report: &StudentReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Report Card: {}", report.name);
    let _ = writeln!(
        output,
        "Section {}, gender {}, ranked within {} ({} students)",
        report.section,
        report.gender,
        filter.label(),
        report.cohort_size
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Scores");
    for (subject, score) in &report.scores {
        let _ = writeln!(output, "- {subject}: {score:.1}");
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Total marks: {:.1}", report.total_marks);
    let _ = writeln!(output, "- Average marks: {:.2}", report.average_marks);
    let _ = writeln!(output, "- Best subject: {}", report.best_subject);
    let _ = writeln!(output, "- Worst subject: {}", report.worst_subject);
    let _ = writeln!(
        output,
        "- Class rank: {} of {}",
        report.class_rank, report.cohort_size
    );

    output
}

pub fn build_cohort_report(dashboard: &CohortDashboard) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Class Standings");
    let _ = writeln!(output, "Cohort: {}", dashboard.filter.label());
    let _ = writeln!(output);
    let _ = writeln!(output, "## Subject Averages");
    for (subject, average) in &dashboard.subject_averages {
        let _ = writeln!(output, "- {}: {}", subject, fmt_stat(*average, 2));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Ranking");
    if dashboard.ranking.is_empty() {
        let _ = writeln!(output, "No students match this filter.");
    } else {
        let _ = writeln!(output, "| Rank | Name | Total |");
        let _ = writeln!(output, "|---:|---|---:|");
        for student in &dashboard.ranking {
            let _ = writeln!(
                output,
                "| {} | {} | {:.1} |",
                student.rank, student.name, student.total_marks
            );
        }
    }

    output
}

pub fn build_team_report(dashboard: &TeamDashboard) -> String {
    let summary = &dashboard.summary;
    let mut output = String::new();

    let _ = writeln!(output, "# {} - Team Insights", summary.team);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Season");
    let _ = writeln!(output, "- Games played: {}", summary.games_played);
    let _ = writeln!(output, "- Wins: {}", summary.wins);
    let _ = writeln!(output, "- Losses: {}", summary.losses);
    if summary.no_result > 0 {
        let _ = writeln!(
            output,
            "- Games without a recorded winner (counted as losses): {}",
            summary.no_result
        );
    }
    let _ = writeln!(
        output,
        "- Avg points scored: {}",
        fmt_stat(summary.avg_points_scored, 1)
    );
    let _ = writeln!(
        output,
        "- Avg points allowed: {}",
        fmt_stat(summary.avg_points_allowed, 1)
    );
    let _ = writeln!(
        output,
        "- Avg attendance: {}",
        fmt_stat(summary.avg_attendance, 0)
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Performance vs Opponents");
    if dashboard.opponents.is_empty() {
        let _ = writeln!(output, "No games recorded.");
    } else {
        let _ = writeln!(
            output,
            "| Opponent | W | L | Avg scored | Avg allowed | Avg attendance |"
        );
        let _ = writeln!(output, "|---|---:|---:|---:|---:|---:|");
        for row in &dashboard.opponents {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} |",
                row.opponent,
                row.wins,
                row.losses,
                fmt_stat(row.avg_scored, 1),
                fmt_stat(row.avg_allowed, 1),
                fmt_stat(row.avg_attendance, 0)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Score Trend");
    if dashboard.trend.is_empty() {
        let _ = writeln!(output, "No games recorded.");
    } else {
        for point in &dashboard.trend {
            let _ = writeln!(
                output,
                "- {} vs {}: {}-{}",
                point.date.format("%Y-%m-%d"),
                point.opponent,
                point.scored,
                point.allowed
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Point Differential Distribution");
    if summary.games_played == 0 {
        let _ = writeln!(output, "No games recorded.");
    } else if dashboard.differentials.is_empty() {
        let _ = writeln!(output, "No histogram bins.");
    } else {
        for bin in &dashboard.differentials {
            let _ = writeln!(
                output,
                "- [{:.1}, {:.1}): {}",
                bin.lower, bin.upper, bin.count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Game Records");
    if dashboard.games.is_empty() {
        let _ = writeln!(output, "No games recorded.");
    } else {
        let _ = writeln!(
            output,
            "| Date | Home | Away | Home score | Away score | Winner | Attendance |"
        );
        let _ = writeln!(output, "|---|---|---|---:|---:|---|---:|");
        for game in &dashboard.games {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {} |",
                game.game_date.format("%Y-%m-%d"),
                game.home_team_name,
                game.away_team_name,
                game.home_score,
                game.away_score,
                game.winner_name().unwrap_or("n/a"),
                game.attendance
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "n/a".to_string())
            );
        }
    }

    output
}

pub fn build_description(title: &str, description: &TableDescription) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# {title}");
    let _ = writeln!(
        output,
        "Shape: {} rows x {} columns",
        description.rows, description.columns
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "| Column | Type | Count | Mean | Std | Min | 25% | 50% | 75% | Max |"
    );
    let _ = writeln!(output, "|---|---|---:|---:|---:|---:|---:|---:|---:|---:|");
    for s in &description.summaries {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |",
            s.column,
            s.dtype,
            s.count,
            fmt_stat(s.mean, 2),
            fmt_stat(s.std, 2),
            fmt_stat(s.min, 2),
            fmt_stat(s.p25, 2),
            fmt_stat(s.p50, 2),
            fmt_stat(s.p75, 2),
            fmt_stat(s.max, 2)
        );
    }

    output
}
