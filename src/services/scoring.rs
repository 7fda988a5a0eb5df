// src/services/scoring.rs

//! Net and score calculation for mock exams.
//!
//! Everything here is pure: no I/O, no logging. The write path calls
//! [`score_exam`] on every create and update, so stored derived fields are
//! never taken from the client.

use std::collections::BTreeMap;

use crate::models::test_track::{ExamType, ScoredExam, ScoredSubject, SubjectTally};

/// Multiplier applied to the total net of a TYT exam.
pub const GENERAL_NET_MULTIPLIER: f64 = 3.3;
/// Multiplier applied to the total net of an AYT exam.
pub const FIELD_NET_MULTIPLIER: f64 = 3.0;
/// Base points every raw score starts from.
pub const BASE_SCORE: f64 = 100.0;
/// Weight of the TYT raw score in the placement score.
pub const GENERAL_WEIGHT: f64 = 0.4;
/// Weight of the AYT raw score in the placement score.
pub const FIELD_WEIGHT: f64 = 0.6;

/// Rounds to two decimals, ties away from zero (104.125 -> 104.13).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `correct - incorrect / 4`, rounded to two decimals. No floor is applied.
pub fn subject_net(tally: &SubjectTally) -> f64 {
    round2(tally.correct as f64 - tally.incorrect as f64 / 4.0)
}

/// Raw score from a total net.
pub fn exam_score(exam_type: ExamType, total_net: f64) -> f64 {
    let multiplier = match exam_type {
        ExamType::General => GENERAL_NET_MULTIPLIER,
        ExamType::Field => FIELD_NET_MULTIPLIER,
    };
    round2(BASE_SCORE + total_net * multiplier)
}

/// Computes per-subject nets, the total net (sum of the rounded nets, rounded
/// again) and the raw exam score.
pub fn score_exam(exam_type: ExamType, tallies: &BTreeMap<String, SubjectTally>) -> ScoredExam {
    let subjects: BTreeMap<String, ScoredSubject> = tallies
        .iter()
        .map(|(name, tally)| {
            let scored = ScoredSubject {
                correct: tally.correct,
                incorrect: tally.incorrect,
                empty: tally.empty,
                net: subject_net(tally),
            };
            (name.clone(), scored)
        })
        .collect();

    let total_net = round2(subjects.values().map(|s| s.net).sum());

    ScoredExam {
        subjects,
        total_net,
        exam_score: exam_score(exam_type, total_net),
    }
}

/// Weighted placement score of a TYT/AYT pair.
/// `None` when either side has no raw score.
pub fn final_score(general_score: Option<f64>, field_score: Option<f64>) -> Option<f64> {
    match (general_score, field_score) {
        (Some(general), Some(field)) => {
            Some(round2(general * GENERAL_WEIGHT + field * FIELD_WEIGHT))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(correct: u32, incorrect: u32, empty: u32) -> SubjectTally {
        SubjectTally {
            correct,
            incorrect,
            empty,
        }
    }

    #[test]
    fn test_net_with_quarter_penalty() {
        assert_eq!(subject_net(&tally(30, 8, 2)), 28.0);
        assert_eq!(subject_net(&tally(10, 3, 0)), 9.25);
    }

    #[test]
    fn test_net_can_go_negative() {
        assert_eq!(subject_net(&tally(0, 10, 0)), -2.5);
    }

    #[test]
    fn test_net_is_integral_when_incorrect_divisible_by_four() {
        for incorrect in (0..40).step_by(4) {
            let net = subject_net(&tally(40 - incorrect, incorrect, 0));
            assert_eq!(net.fract(), 0.0);
            assert_eq!(net, (40 - incorrect) as f64 - (incorrect / 4) as f64);
        }
    }

    #[test]
    fn test_total_net_sums_rounded_nets() {
        let mut tallies = BTreeMap::new();
        tallies.insert("Türkçe".to_string(), tally(35, 5, 0));
        tallies.insert("Matematik".to_string(), tally(20, 6, 14));
        tallies.insert("Tarih".to_string(), tally(3, 1, 1));

        let scored = score_exam(ExamType::General, &tallies);
        let expected: f64 = scored.subjects.values().map(|s| s.net).sum();

        assert_eq!(scored.subjects["Türkçe"].net, 33.75);
        assert_eq!(scored.subjects["Matematik"].net, 18.5);
        assert_eq!(scored.subjects["Tarih"].net, 2.75);
        assert_eq!(scored.total_net, round2(expected));
        assert_eq!(scored.total_net, 55.0);
    }

    #[test]
    fn test_empty_subjects_score_base() {
        let tallies = BTreeMap::new();

        let general = score_exam(ExamType::General, &tallies);
        assert_eq!(general.total_net, 0.0);
        assert_eq!(general.exam_score, 100.0);

        let field = score_exam(ExamType::Field, &tallies);
        assert_eq!(field.total_net, 0.0);
        assert_eq!(field.exam_score, 100.0);
    }

    #[test]
    fn test_exam_score_by_type() {
        assert_eq!(exam_score(ExamType::General, 10.0), 133.0);
        assert_eq!(exam_score(ExamType::Field, 10.0), 130.0);
        assert_eq!(exam_score(ExamType::General, 20.0), 166.0);
    }

    #[test]
    fn test_exam_score_ties_round_up() {
        assert_eq!(exam_score(ExamType::General, 1.25), 104.13);
        assert_eq!(exam_score(ExamType::General, 6.25), 120.63);
        assert_eq!(exam_score(ExamType::General, -1.25), 95.88);
    }

    #[test]
    fn test_single_subject_tie_score() {
        let mut tallies = BTreeMap::new();
        tallies.insert("Türkçe".to_string(), tally(2, 3, 0));

        let scored = score_exam(ExamType::General, &tallies);

        assert_eq!(scored.total_net, 1.25);
        assert_eq!(scored.exam_score, 104.13);
    }

    #[test]
    fn test_final_score_weighting() {
        assert_eq!(final_score(Some(133.0), Some(130.0)), Some(131.2));
    }

    #[test]
    fn test_final_score_missing_side() {
        assert_eq!(final_score(None, Some(130.0)), None);
        assert_eq!(final_score(Some(133.0), None), None);
    }

    #[test]
    fn test_rescoring_is_stable() {
        let mut tallies = BTreeMap::new();
        tallies.insert("Fen Bilgisi".to_string(), tally(11, 7, 2));

        let first = score_exam(ExamType::General, &tallies);
        let again: BTreeMap<String, SubjectTally> = first
            .subjects
            .iter()
            .map(|(k, v)| (k.clone(), v.tally()))
            .collect();
        let second = score_exam(ExamType::General, &again);

        assert_eq!(first, second);
    }
}
