use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub max_credits: i32,
}

#[derive(Debug, Clone)]
pub struct OfferingRecord {
    pub id: Uuid,
    pub term_code: String,
    pub course_code: String,
    pub credits: i32,
}

#[derive(Debug, Clone)]
pub struct EnrollmentRecord {
    pub student_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub status: CourseStatus,
}

/// Weight is an integer percent; an offering's weights must sum to
/// exactly 100 before grades can be published.
#[derive(Debug, Clone)]
pub struct GradeComponent {
    pub id: Uuid,
    pub name: String,
    pub weight: i32,
    pub max_score: f64,
}

/// Re-entry supersedes the previous score and its entry date.
#[derive(Debug, Clone)]
pub struct ComponentScore {
    pub student_id: Uuid,
    pub component_id: Uuid,
    pub score: f64,
    pub recorded_at: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentKind {
    Bonus,
    Penalty,
}

impl AdjustmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentKind::Bonus => "bonus",
            AdjustmentKind::Penalty => "penalty",
        }
    }
}

/// An outstanding bonus or penalty on a student's course grade. At
/// most one of each kind exists per (student, offering); entering a
/// new one replaces the previous.
#[derive(Debug, Clone)]
pub struct Adjustment {
    pub student_id: Uuid,
    pub offering_id: Uuid,
    pub kind: AdjustmentKind,
    pub amount: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseStatus {
    Enrolled,
    Withdrawn,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Enrolled => "enrolled",
            CourseStatus::Withdrawn => "withdrawn",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "withdrawn" => CourseStatus::Withdrawn,
            _ => CourseStatus::Enrolled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterGrade {
    pub letter: &'static str,
    pub grade_point: f64,
}

/// Frozen once published; later score edits have no effect without an
/// explicit unpublish, which this crate does not offer.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseGrade {
    pub student_id: Uuid,
    pub offering_id: Uuid,
    pub course_code: String,
    pub raw_total: f64,
    pub adjusted_total: f64,
    pub letter: String,
    pub grade_point: f64,
    pub credits: i32,
    pub status: CourseStatus,
    pub is_published: bool,
}

#[derive(Debug, Clone)]
pub struct TermGrades {
    pub student_id: Uuid,
    pub term_code: String,
    pub courses: Vec<CourseGrade>,
    pub gpa: f64,
    pub credits: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermSummary {
    pub gpa: f64,
    pub credits: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Standing {
    Excellent,
    VeryGood,
    Good,
    Acceptable,
    Probation,
    /// No published credits yet; distinct from Probation so empty
    /// records are never misreported as failing.
    NotCalculated,
}

impl Standing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Standing::Excellent => "Excellent",
            Standing::VeryGood => "Very Good",
            Standing::Good => "Good",
            Standing::Acceptable => "Acceptable",
            Standing::Probation => "Failing/Probation",
            Standing::NotCalculated => "Not Calculated",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AcademicStanding {
    pub student_id: Uuid,
    pub cgpa: f64,
    pub total_credits: i32,
    pub standing: Standing,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionLoad {
    pub section_code: String,
    pub credits: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CreditLoadCheck {
    pub ok: bool,
    pub total: i32,
    pub max_credits: i32,
    pub over_by: i32,
}

/// Per-section verdict from the external prerequisite/schedule
/// validator; this crate only merges it, it never computes it.
#[derive(Debug, Clone, Serialize)]
pub struct SectionValidation {
    pub section_code: String,
    pub valid: bool,
    pub conflicts: Vec<String>,
    pub missing_prerequisites: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentDecision {
    pub admissible: bool,
    pub credit_check: CreditLoadCheck,
    pub rejected_sections: Vec<SectionValidation>,
}
