use crate::models::{
    ColumnSummary, GameRecord, HistogramBin, StudentRecord, TableDescription,
};

/// Arithmetic mean, or `None` for an empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1). Needs at least two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let avg = mean(values)?;
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Percentile with linear interpolation between closest ranks. `sorted` must be ascending.
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Equal-width histogram over `[min, max]`; the last bin is closed on both ends.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let mut min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        min -= 0.5;
        max += 0.5;
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for value in values {
        let index = (((value - min) / width).floor() as usize).min(bins - 1);
        counts[index] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count,
        })
        .collect()
}

fn summarize_numeric(column: &str, dtype: &'static str, values: &[f64]) -> ColumnSummary {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    ColumnSummary {
        column: column.to_string(),
        dtype,
        count: sorted.len(),
        mean: mean(&sorted),
        std: sample_std(&sorted),
        min: sorted.first().copied(),
        p25: percentile(&sorted, 0.25),
        p50: percentile(&sorted, 0.5),
        p75: percentile(&sorted, 0.75),
        max: sorted.last().copied(),
    }
}

fn summarize_text(column: &str, count: usize) -> ColumnSummary {
    ColumnSummary {
        column: column.to_string(),
        dtype: "string",
        count,
        mean: None,
        std: None,
        min: None,
        p25: None,
        p50: None,
        p75: None,
        max: None,
    }
}

/// Shape and per-column summary of the student marksheet.
pub fn describe_students(rows: &[StudentRecord]) -> TableDescription {
    let column = |f: fn(&StudentRecord) -> f64| rows.iter().map(f).collect::<Vec<_>>();

    let summaries = vec![
        summarize_text("Name", rows.len()),
        summarize_text("Section", rows.len()),
        summarize_text("Gender", rows.len()),
        summarize_numeric("Age", "integer", &column(|r| r.age as f64)),
        summarize_numeric("Science", "float", &column(|r| r.science)),
        summarize_numeric("English", "float", &column(|r| r.english)),
        summarize_numeric("Maths", "float", &column(|r| r.maths)),
        summarize_numeric("History", "float", &column(|r| r.history)),
    ];

    TableDescription {
        rows: rows.len(),
        columns: summaries.len(),
        summaries,
    }
}

/// Shape and per-column summary of the game log. Unknown attendance is not counted.
pub fn describe_games(rows: &[GameRecord]) -> TableDescription {
    let home: Vec<f64> = rows.iter().map(|r| r.home_score as f64).collect();
    let away: Vec<f64> = rows.iter().map(|r| r.away_score as f64).collect();
    let attendance: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.attendance.map(f64::from))
        .collect();
    let decided = rows.iter().filter(|r| r.winner.is_some()).count();

    let summaries = vec![
        summarize_text("gameDate", rows.len()),
        summarize_text("hometeamName", rows.len()),
        summarize_text("awayteamName", rows.len()),
        summarize_text("hometeamId", rows.len()),
        summarize_text("awayteamId", rows.len()),
        summarize_numeric("homeScore", "integer", &home),
        summarize_numeric("awayScore", "integer", &away),
        summarize_text("winner", decided),
        summarize_numeric("attendance", "integer", &attendance),
    ];

    TableDescription {
        rows: rows.len(),
        columns: summaries.len(),
        summaries,
    }
}
