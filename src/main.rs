use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

mod config;
mod error;
mod loader;
mod models;
mod report;
mod stats;
mod student;
mod team;

use config::Config;
use loader::Dataset;
use report::{CohortDashboard, TeamDashboard};
use student::CohortFilter;
use team::TeamRoster;

#[derive(Parser)]
#[command(name = "dashboard-stats")]
#[command(about = "Report cards and team insights from marksheet and game log CSVs", long_about = None)]
struct Cli {
    /// Student marksheet CSV (overrides STUDENT_MARKS_CSV)
    #[arg(long, global = true)]
    students: Option<PathBuf>,
    /// Game log CSV (overrides NBA_GAMES_CSV)
    #[arg(long, global = true)]
    games: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Markdown,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum Table {
    Students,
    Games,
}

#[derive(Subcommand)]
enum Commands {
    /// Report card for one student, ranked within the filtered cohort
    Student {
        #[arg(long)]
        name: String,
        #[arg(long)]
        section: Option<String>,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Ranked class table and subject averages
    Cohort {
        #[arg(long)]
        section: Option<String>,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List the teams available for selection
    Teams {
        /// Canonical team list, one name per line (overrides TEAM_ROSTER)
        #[arg(long)]
        roster: Option<PathBuf>,
    },
    /// Season summary, opponent breakdown and score trend for a team
    Team {
        #[arg(long)]
        name: String,
        /// Canonical team list, one name per line (overrides TEAM_ROSTER)
        #[arg(long)]
        roster: Option<PathBuf>,
        /// Histogram bins for point differentials
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u16).range(1..=100))]
        bins: u16,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Shape and column statistics of a loaded table
    Describe {
        #[arg(long, value_enum)]
        table: Table,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn init_tracing() {
    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    tracing_subscriber::registry().with(stderr_layer).init();
}

fn render<T: Serialize>(
    format: Format,
    value: &T,
    markdown: impl FnOnce(&T) -> String,
) -> anyhow::Result<String> {
    match format {
        Format::Markdown => Ok(markdown(value)),
        Format::Json => serde_json::to_string_pretty(value).context("failed to encode JSON"),
    }
}

fn emit(output: String, out: Option<&Path>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, output)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => print!("{output}"),
    }
    Ok(())
}

fn roster_for(cli_roster: Option<PathBuf>, config: &Config) -> anyhow::Result<Option<TeamRoster>> {
    let Some(path) = cli_roster.or_else(|| config.roster.clone()) else {
        debug!("no canonical roster, team list comes from the game log");
        return Ok(None);
    };
    let roster = loader::load_roster(&path)
        .with_context(|| format!("failed to load roster {}", path.display()))?;
    Ok(Some(roster))
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(path) = cli.students {
        config.students_csv = path;
    }
    if let Some(path) = cli.games {
        config.games_csv = path;
    }
    debug!(?config, "configuration resolved");

    let mut dataset = Dataset::new(&config.students_csv, &config.games_csv, || {
        config.cache_policy.build()
    });

    match cli.command {
        Commands::Student {
            name,
            section,
            gender,
            format,
            out,
        } => {
            let filter = CohortFilter { section, gender };
            let source = dataset.students.path().display().to_string();
            let rows = dataset
                .students
                .get()
                .with_context(|| format!("failed to load {source}"))?;
            let cohort = filter.apply(rows);
            let card = student::compute_student_report(&cohort, &name)
                .with_context(|| format!("cannot build report card within {}", filter.label()))?;
            let output = render(format, &card, |c| report::build_student_report(&filter, c))?;
            emit(output, out.as_deref())?;
        }
        Commands::Cohort {
            section,
            gender,
            format,
            out,
        } => {
            let filter = CohortFilter { section, gender };
            let source = dataset.students.path().display().to_string();
            let rows = dataset
                .students
                .get()
                .with_context(|| format!("failed to load {source}"))?;
            let cohort = filter.apply(rows);
            let dashboard = CohortDashboard {
                ranking: student::rank_cohort(&cohort),
                subject_averages: student::subject_averages(&cohort),
                filter,
            };
            let output = render(format, &dashboard, report::build_cohort_report)?;
            emit(output, out.as_deref())?;
        }
        Commands::Teams { roster } => {
            let roster = match roster_for(roster, &config)? {
                Some(roster) => roster,
                None => {
                    let source = dataset.games.path().display().to_string();
                    TeamRoster::from_games(
                        dataset
                            .games
                            .get()
                            .with_context(|| format!("failed to load {source}"))?,
                    )
                }
            };
            if roster.is_empty() {
                println!("No teams found.");
                return Ok(());
            }
            for team in roster.iter() {
                println!("{team}");
            }
        }
        Commands::Team {
            name,
            roster,
            bins,
            format,
            out,
        } => {
            let roster = roster_for(roster, &config)?;
            let source = dataset.games.path().display().to_string();
            let games = dataset
                .games
                .get()
                .with_context(|| format!("failed to load {source}"))?;

            let summary = match &roster {
                Some(roster) => team::compute_team_summary_in(roster, games, &name)?,
                None => team::compute_team_summary(games, &name)?,
            };
            let differentials: Vec<f64> = team::point_differentials(games, &name)
                .into_iter()
                .map(|d| d as f64)
                .collect();
            let dashboard = TeamDashboard {
                opponents: team::compute_opponent_breakdown(games, &name),
                trend: team::score_trend(games, &name),
                games: team::game_log(games, &name),
                differentials: stats::histogram(&differentials, usize::from(bins)),
                summary,
            };
            let output = render(format, &dashboard, report::build_team_report)?;
            emit(output, out.as_deref())?;
        }
        Commands::Describe { table, format, out } => {
            let (title, description) = match table {
                Table::Students => {
                    let source = dataset.students.path().display().to_string();
                    let rows = dataset
                        .students
                        .get()
                        .with_context(|| format!("failed to load {source}"))?;
                    ("Student Marksheet", stats::describe_students(rows))
                }
                Table::Games => {
                    let source = dataset.games.path().display().to_string();
                    let rows = dataset
                        .games
                        .get()
                        .with_context(|| format!("failed to load {source}"))?;
                    ("Game Log", stats::describe_games(rows))
                }
            };
            let output = render(format, &description, |d| report::build_description(title, d))?;
            emit(output, out.as_deref())?;
        }
    }

    debug!(
        student_loads = dataset.students.loads(),
        game_loads = dataset.games.loads(),
        "tables parsed"
    );
    Ok(())
}
