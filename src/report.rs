use std::fmt::Write;

use crate::models::{AcademicStanding, CourseStatus, Standing, StudentRecord, TermGrades};

pub fn build_transcript(
    student: &StudentRecord,
    terms: &[TermGrades],
    standing: &AcademicStanding,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Academic Transcript");
    let _ = writeln!(output, "{} ({})", student.full_name, student.email);
    let _ = writeln!(output);

    if terms.is_empty() {
        let _ = writeln!(output, "No graded terms on record.");
    }

    for term in terms {
        let _ = writeln!(output, "## {}", term.term_code);

        if term.courses.is_empty() {
            let _ = writeln!(output, "No courses recorded for this term.");
        } else {
            for course in &term.courses {
                if course.status == CourseStatus::Withdrawn {
                    let _ = writeln!(output, "- {}: W (withdrawn)", course.course_code);
                } else if course.is_published {
                    let _ = writeln!(
                        output,
                        "- {}: {} ({:.1} pts, {} credits, {:.2}%)",
                        course.course_code,
                        course.letter,
                        course.grade_point,
                        course.credits,
                        course.adjusted_total
                    );
                } else {
                    let _ = writeln!(output, "- {}: in progress", course.course_code);
                }
            }
            let _ = writeln!(
                output,
                "Term GPA {:.2} over {} credits",
                term.gpa, term.credits
            );
        }
        let _ = writeln!(output);
    }

    let _ = writeln!(output, "## Cumulative Standing");
    if standing.standing == Standing::NotCalculated {
        let _ = writeln!(output, "Standing: Not Calculated (no published credits yet)");
    } else {
        let _ = writeln!(
            output,
            "CGPA {:.2} over {} credits - {}",
            standing.cgpa,
            standing.total_credits,
            standing.standing.as_str()
        );
    }

    output
}
