use serde::Serialize;

use crate::error::AggregateError;
use crate::models::{RankedStudent, StudentRecord, StudentReport, Subject};
use crate::stats::mean;

/// Section/Gender selection that narrows the marksheet to a cohort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CohortFilter {
    pub section: Option<String>,
    pub gender: Option<String>,
}

impl CohortFilter {
    pub fn matches(&self, record: &StudentRecord) -> bool {
        self.section.as_deref().map_or(true, |s| record.section == s)
            && self.gender.as_deref().map_or(true, |g| record.gender == g)
    }

    pub fn apply(&self, rows: &[StudentRecord]) -> Vec<StudentRecord> {
        rows.iter().filter(|r| self.matches(r)).cloned().collect()
    }

    pub fn label(&self) -> String {
        match (&self.section, &self.gender) {
            (None, None) => "all students".to_string(),
            (Some(section), None) => format!("section {section}"),
            (None, Some(gender)) => format!("gender {gender}"),
            (Some(section), Some(gender)) => format!("section {section}, gender {gender}"),
        }
    }
}

/// Competition rank: one more than the number of strictly greater totals.
fn competition_rank(total: f64, totals: &[f64]) -> usize {
    1 + totals.iter().filter(|other| **other > total).count()
}

/// Best and worst subject of a record; ties go to the earlier subject in [`Subject::ALL`].
pub fn best_and_worst(record: &StudentRecord) -> (Subject, Subject) {
    let mut best = Subject::ALL[0];
    let mut worst = Subject::ALL[0];

    for subject in Subject::ALL.iter().copied().skip(1) {
        let score = record.score(subject);
        if score > record.score(best) {
            best = subject;
        }
        if score < record.score(worst) {
            worst = subject;
        }
    }

    (best, worst)
}

/// Builds the report card for `selected_name`, ranked against `rows`.
pub fn compute_student_report(
    rows: &[StudentRecord],
    selected_name: &str,
) -> Result<StudentReport, AggregateError> {
    if rows.is_empty() {
        return Err(AggregateError::EmptyCohort);
    }

    let selected = rows
        .iter()
        .find(|r| r.name == selected_name)
        .ok_or_else(|| AggregateError::NotFound(selected_name.to_string()))?;

    let totals: Vec<f64> = rows.iter().map(StudentRecord::total_marks).collect();
    let total_marks = selected.total_marks();
    let (best_subject, worst_subject) = best_and_worst(selected);

    Ok(StudentReport {
        name: selected.name.clone(),
        section: selected.section.clone(),
        gender: selected.gender.clone(),
        scores: Subject::ALL
            .iter()
            .map(|subject| (*subject, selected.score(*subject)))
            .collect(),
        total_marks,
        average_marks: total_marks / Subject::ALL.len() as f64,
        best_subject,
        worst_subject,
        class_rank: competition_rank(total_marks, &totals),
        cohort_size: rows.len(),
    })
}

/// Every student in the cohort with their total and rank, best first.
pub fn rank_cohort(rows: &[StudentRecord]) -> Vec<RankedStudent> {
    let totals: Vec<f64> = rows.iter().map(StudentRecord::total_marks).collect();

    let mut ranked: Vec<RankedStudent> = rows
        .iter()
        .zip(totals.iter())
        .map(|(row, total)| RankedStudent {
            name: row.name.clone(),
            total_marks: *total,
            rank: competition_rank(*total, &totals),
        })
        .collect();

    ranked.sort_by_key(|r| r.rank);
    ranked
}

/// Cohort mean per subject, undefined for an empty cohort.
pub fn subject_averages(rows: &[StudentRecord]) -> Vec<(Subject, Option<f64>)> {
    Subject::ALL
        .iter()
        .map(|subject| {
            let scores: Vec<f64> = rows.iter().map(|r| r.score(*subject)).collect();
            (*subject, mean(&scores))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, section: &str, gender: &str, scores: [f64; 4]) -> StudentRecord {
        let [science, english, history, maths] = scores;
        StudentRecord {
            name: name.to_string(),
            section: section.to_string(),
            gender: gender.to_string(),
            age: 15,
            science,
            english,
            maths,
            history,
        }
    }

    fn cohort() -> Vec<StudentRecord> {
        vec![
            record("Asha", "A", "F", [75.0, 75.0, 75.0, 75.0]),
            record("Bilal", "A", "M", [70.0, 70.0, 70.0, 70.0]),
            record("Chen", "B", "M", [80.0, 60.0, 70.0, 70.0]),
            record("Dana", "B", "F", [60.0, 60.0, 65.0, 65.0]),
        ]
    }

    #[test]
    fn ranks_use_competition_ordering() {
        let rows = cohort();
        let ranks: Vec<usize> = ["Asha", "Bilal", "Chen", "Dana"]
            .iter()
            .map(|name| compute_student_report(&rows, name).unwrap().class_rank)
            .collect();
        assert_eq!(ranks, vec![1, 2, 2, 4]);
    }

    #[test]
    fn report_totals_and_average() {
        let report = compute_student_report(&cohort(), "Chen").unwrap();
        assert_eq!(report.total_marks, 280.0);
        assert_eq!(report.average_marks, 70.0);
        assert_eq!(report.cohort_size, 4);
        assert_eq!(report.section, "B");
        assert_eq!(report.scores[0], (Subject::Science, 80.0));
    }

    #[test]
    fn best_and_worst_ties_follow_declared_order() {
        let row = record("Eve", "A", "F", [80.0, 80.0, 60.0, 60.0]);
        assert_eq!(best_and_worst(&row), (Subject::Science, Subject::History));

        let flat = record("Flo", "A", "F", [50.0, 50.0, 50.0, 50.0]);
        assert_eq!(best_and_worst(&flat), (Subject::Science, Subject::Science));
    }

    #[test]
    fn empty_cohort_is_rejected_before_lookup() {
        assert_eq!(
            compute_student_report(&[], "Asha"),
            Err(AggregateError::EmptyCohort)
        );
    }

    #[test]
    fn missing_student_is_not_found() {
        assert_eq!(
            compute_student_report(&cohort(), "asha"),
            Err(AggregateError::NotFound("asha".to_string()))
        );
    }

    #[test]
    fn rank_is_relative_to_filtered_cohort() {
        let filter = CohortFilter {
            section: Some("B".to_string()),
            gender: None,
        };
        let rows = filter.apply(&cohort());
        assert_eq!(rows.len(), 2);

        let report = compute_student_report(&rows, "Dana").unwrap();
        assert_eq!(report.class_rank, 2);
        assert_eq!(report.cohort_size, 2);

        assert_eq!(
            compute_student_report(&rows, "Asha"),
            Err(AggregateError::NotFound("Asha".to_string()))
        );
    }

    #[test]
    fn filter_combines_section_and_gender() {
        let filter = CohortFilter {
            section: Some("A".to_string()),
            gender: Some("M".to_string()),
        };
        let rows = filter.apply(&cohort());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Bilal");
        assert_eq!(CohortFilter::default().apply(&cohort()).len(), 4);
        assert_eq!(filter.label(), "section A, gender M");
    }

    #[test]
    fn rank_cohort_sorts_and_keeps_ties() {
        let ranked = rank_cohort(&cohort());
        let view: Vec<(&str, usize)> = ranked.iter().map(|r| (r.name.as_str(), r.rank)).collect();
        assert_eq!(view, vec![("Asha", 1), ("Bilal", 2), ("Chen", 2), ("Dana", 4)]);

        for r in &ranked {
            assert!(r.rank >= 1 && r.rank <= ranked.len());
        }
    }

    #[test]
    fn subject_averages_are_undefined_for_empty_cohort() {
        let averages = subject_averages(&cohort());
        assert_eq!(averages[0], (Subject::Science, Some(71.25)));
        assert!(subject_averages(&[]).iter().all(|(_, avg)| avg.is_none()));
    }
}
