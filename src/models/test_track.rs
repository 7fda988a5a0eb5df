// src/models/test_track.rs

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Exam type of a mock exam ("deneme").
/// TYT is the general exam, AYT the field exam it is paired with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExamType {
    #[serde(rename = "TYT")]
    General,
    #[serde(rename = "AYT")]
    Field,
}

impl ExamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamType::General => "TYT",
            ExamType::Field => "AYT",
        }
    }

    pub fn opposite(&self) -> ExamType {
        match self {
            ExamType::General => ExamType::Field,
            ExamType::Field => ExamType::General,
        }
    }
}

/// Raised when an exam type string is neither "TYT" nor "AYT".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidExamType(pub String);

impl fmt::Display for InvalidExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid exam type '{}'", self.0)
    }
}

impl std::error::Error for InvalidExamType {}

impl FromStr for ExamType {
    type Err = InvalidExamType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TYT" => Ok(ExamType::General),
            "AYT" => Ok(ExamType::Field),
            other => Err(InvalidExamType(other.to_string())),
        }
    }
}

/// Field track of an AYT exam. Serialized with the labels the frontend uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldTrack {
    #[serde(rename = "Sayısal")]
    Quantitative,
    #[serde(rename = "Sözel")]
    Verbal,
    #[serde(rename = "Eşit Ağırlık")]
    Balanced,
    #[serde(rename = "Yabancı Dil")]
    ForeignLanguage,
}

impl FieldTrack {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldTrack::Quantitative => "Sayısal",
            FieldTrack::Verbal => "Sözel",
            FieldTrack::Balanced => "Eşit Ağırlık",
            FieldTrack::ForeignLanguage => "Yabancı Dil",
        }
    }
}

impl FromStr for FieldTrack {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sayısal" => Ok(FieldTrack::Quantitative),
            "Sözel" => Ok(FieldTrack::Verbal),
            "Eşit Ağırlık" => Ok(FieldTrack::Balanced),
            "Yabancı Dil" => Ok(FieldTrack::ForeignLanguage),
            other => Err(format!("invalid field track '{}'", other)),
        }
    }
}

/// Raw answer counts for one subject, as submitted by the client.
/// Any client-supplied `net` is ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectTally {
    pub correct: u32,
    pub incorrect: u32,
    pub empty: u32,
}

impl SubjectTally {
    pub fn total(&self) -> u32 {
        self.correct
            .saturating_add(self.incorrect)
            .saturating_add(self.empty)
    }
}

/// Answer counts for one subject together with the derived net score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredSubject {
    pub correct: u32,
    pub incorrect: u32,
    pub empty: u32,
    pub net: f64,
}

impl ScoredSubject {
    pub fn tally(&self) -> SubjectTally {
        SubjectTally {
            correct: self.correct,
            incorrect: self.incorrect,
            empty: self.empty,
        }
    }
}

/// Output of the net/score calculator.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredExam {
    pub subjects: BTreeMap<String, ScoredSubject>,
    pub total_net: f64,
    pub exam_score: f64,
}

/// A persisted mock exam attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRecord {
    pub id: i64,

    /// Owning user. Immutable after creation.
    #[serde(rename = "user")]
    pub user_id: i64,

    pub exam_name: String,

    /// Immutable after creation.
    pub exam_type: ExamType,

    /// Present only for AYT exams.
    pub ayt_field: Option<FieldTrack>,

    /// Counterpart exam of the opposite type, if linked.
    pub linked_exam_id: Option<i64>,

    pub subjects: BTreeMap<String, ScoredSubject>,

    pub total_net: f64,

    pub exam_score: Option<f64>,

    /// Placement score, set once the record has been resolved as part of a pair.
    pub final_score: Option<f64>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ExamRecord {
    pub fn tallies(&self) -> BTreeMap<String, SubjectTally> {
        self.subjects
            .iter()
            .map(|(name, scored)| (name.clone(), scored.tally()))
            .collect()
    }
}

/// Fully validated and scored record, ready for insertion.
#[derive(Debug, Clone)]
pub struct NewExamRecord {
    pub exam_name: String,
    pub exam_type: ExamType,
    pub ayt_field: Option<FieldTrack>,
    pub scores: ScoredExam,
}

/// Replacement values for the mutable, non-link fields of a record.
#[derive(Debug, Clone)]
pub struct ExamRecordChanges {
    pub exam_name: String,
    pub ayt_field: Option<FieldTrack>,
    pub scores: ScoredExam,
}

/// DTO for creating a test track entry.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestTrackRequest {
    #[validate(
        required(message = "examName is required"),
        length(min = 1, max = 200, message = "examName must be between 1 and 200 characters")
    )]
    pub exam_name: Option<String>,

    #[validate(required(message = "examType is required"))]
    pub exam_type: Option<ExamType>,

    pub ayt_field: Option<FieldTrack>,

    #[serde(default)]
    pub subjects: BTreeMap<String, SubjectTally>,

    /// Counterpart to link with right after creation.
    pub linked_exam_id: Option<i64>,
}

/// DTO for updating a test track entry. Omitted fields keep their stored values.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTestTrackRequest {
    #[validate(length(min = 1, max = 200, message = "examName must be between 1 and 200 characters"))]
    pub exam_name: Option<String>,

    /// Accepted only when equal to the stored type.
    pub exam_type: Option<ExamType>,

    pub ayt_field: Option<FieldTrack>,

    pub subjects: Option<BTreeMap<String, SubjectTally>>,

    pub linked_exam_id: Option<i64>,
}

/// DTO for linking two records.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    pub linked_exam_id: i64,
}

/// A resolved TYT/AYT pair.
/// `exam1` is always the TYT record and `exam2` the AYT record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedPair {
    pub exam1: ExamRecord,
    pub exam2: ExamRecord,
    pub final_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkIssue {
    pub exam_id: i64,
    pub linked_exam_id: i64,
}

/// Link problems found in one user's records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyReport {
    /// Target exists and is owned by the caller but does not point back.
    pub asymmetric: Vec<LinkIssue>,
    /// Target is missing or owned by another user.
    pub dangling: Vec<LinkIssue>,
    /// Target has the same exam type as the source.
    pub same_type: Vec<LinkIssue>,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.asymmetric.is_empty() && self.dangling.is_empty() && self.same_type.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exam_type_parse() {
        assert_eq!("TYT".parse::<ExamType>(), Ok(ExamType::General));
        assert_eq!("AYT".parse::<ExamType>(), Ok(ExamType::Field));
        assert_eq!(
            "YDT".parse::<ExamType>(),
            Err(InvalidExamType("YDT".to_string()))
        );
    }

    #[test]
    fn test_field_track_uses_frontend_labels() {
        let json = serde_json::to_string(&FieldTrack::Balanced).unwrap();
        assert_eq!(json, "\"Eşit Ağırlık\"");
        assert_eq!("Sözel".parse::<FieldTrack>(), Ok(FieldTrack::Verbal));
    }

    #[test]
    fn test_client_supplied_net_is_ignored() {
        let tally: SubjectTally =
            serde_json::from_str(r#"{"correct": 10, "incorrect": 4, "net": 99.0}"#).unwrap();
        assert_eq!(
            tally,
            SubjectTally {
                correct: 10,
                incorrect: 4,
                empty: 0
            }
        );
    }

    #[test]
    fn test_negative_tally_rejected() {
        let parsed = serde_json::from_str::<SubjectTally>(r#"{"correct": -1}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_create_request_requires_name_and_type() {
        let req: CreateTestTrackRequest = serde_json::from_str(r#"{"subjects": {}}"#).unwrap();
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 2);
    }
}
