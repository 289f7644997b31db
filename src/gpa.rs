use uuid::Uuid;

use crate::models::{AcademicStanding, CourseGrade, CourseStatus, Standing, TermGrades, TermSummary};

/// Credit-weighted GPA for one term. Only published, non-withdrawn
/// courses count. A term with no countable credits reports gpa 0, not
/// NaN, so empty or brand-new terms never break dashboards.
pub fn compute_term(courses: &[CourseGrade]) -> TermSummary {
    let mut credits = 0;
    let mut quality_points = 0.0;

    for course in courses {
        if !course.is_published || course.status == CourseStatus::Withdrawn {
            continue;
        }
        credits += course.credits;
        quality_points += course.grade_point * course.credits as f64;
    }

    let gpa = if credits > 0 {
        quality_points / credits as f64
    } else {
        0.0
    };

    TermSummary { gpa, credits }
}

/// Cumulative GPA and standing across all terms. The CGPA is credit
/// weighted over every published course, not an average of term GPAs,
/// since term credit sizes differ.
pub fn compute_standing(student_id: Uuid, terms: &[TermGrades]) -> AcademicStanding {
    let mut total_credits = 0;
    let mut quality_points = 0.0;

    for term in terms {
        for course in &term.courses {
            if !course.is_published || course.status == CourseStatus::Withdrawn {
                continue;
            }
            total_credits += course.credits;
            quality_points += course.grade_point * course.credits as f64;
        }
    }

    let (cgpa, standing) = if total_credits > 0 {
        let cgpa = quality_points / total_credits as f64;
        (cgpa, standing_for(cgpa))
    } else {
        (0.0, Standing::NotCalculated)
    };

    AcademicStanding {
        student_id,
        cgpa,
        total_credits,
        standing,
    }
}

/// Groups stored grades by term code into recomputed [`TermGrades`].
/// Term summaries are always derived here, never read back from
/// storage, so they stay consistent with their constituent grades.
pub fn group_into_terms(student_id: Uuid, rows: Vec<(String, CourseGrade)>) -> Vec<TermGrades> {
    let mut by_term: std::collections::BTreeMap<String, Vec<CourseGrade>> =
        std::collections::BTreeMap::new();
    for (term_code, grade) in rows {
        by_term.entry(term_code).or_default().push(grade);
    }

    by_term
        .into_iter()
        .map(|(term_code, courses)| {
            let summary = compute_term(&courses);
            TermGrades {
                student_id,
                term_code,
                courses,
                gpa: summary.gpa,
                credits: summary.credits,
            }
        })
        .collect()
}

/// Standing classification thresholds over CGPA. Only meaningful once
/// at least one credit is published; callers with zero credits must
/// use NotCalculated instead.
pub fn standing_for(cgpa: f64) -> Standing {
    if cgpa >= 3.67 {
        Standing::Excellent
    } else if cgpa >= 3.0 {
        Standing::VeryGood
    } else if cgpa >= 2.33 {
        Standing::Good
    } else if cgpa >= 2.0 {
        Standing::Acceptable
    } else {
        Standing::Probation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn published(grade_point: f64, credits: i32) -> CourseGrade {
        CourseGrade {
            student_id: Uuid::new_v4(),
            offering_id: Uuid::new_v4(),
            course_code: "CS101".to_string(),
            raw_total: 0.0,
            adjusted_total: 0.0,
            letter: "B".to_string(),
            grade_point,
            credits,
            status: CourseStatus::Enrolled,
            is_published: true,
        }
    }

    fn term_of(courses: Vec<CourseGrade>) -> TermGrades {
        let summary = compute_term(&courses);
        TermGrades {
            student_id: Uuid::new_v4(),
            term_code: "2026-Fall".to_string(),
            courses,
            gpa: summary.gpa,
            credits: summary.credits,
        }
    }

    #[test]
    fn empty_term_reports_zero() {
        let summary = compute_term(&[]);
        assert_eq!(summary, TermSummary { gpa: 0.0, credits: 0 });
        assert!(!summary.gpa.is_nan());
    }

    #[test]
    fn term_gpa_is_credit_weighted() {
        let courses = vec![published(4.0, 4), published(3.0, 2)];
        let summary = compute_term(&courses);
        assert_eq!(summary.credits, 6);
        // (4.0*4 + 3.0*2) / 6
        assert!((summary.gpa - 22.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn unpublished_and_withdrawn_courses_are_skipped() {
        let mut draft = published(4.0, 3);
        draft.is_published = false;
        let mut withdrawn = published(4.0, 3);
        withdrawn.status = CourseStatus::Withdrawn;
        let counted = published(3.0, 3);

        let summary = compute_term(&[draft, withdrawn, counted]);
        assert_eq!(summary.credits, 3);
        assert!((summary.gpa - 3.0).abs() < 1e-9);
    }

    #[test]
    fn term_gpa_is_order_independent() {
        let a = published(4.0, 4);
        let b = published(2.0, 1);
        let c = published(3.3, 3);

        let forward = compute_term(&[a.clone(), b.clone(), c.clone()]);
        let backward = compute_term(&[c, b, a]);
        assert!((forward.gpa - backward.gpa).abs() < 1e-12);
        assert_eq!(forward.credits, backward.credits);
    }

    #[test]
    fn cgpa_weights_across_terms_not_term_averages() {
        let student_id = Uuid::new_v4();
        // Heavy 4.0 term plus light 2.0 term: averaging term GPAs would
        // give 3.0, credit weighting gives more.
        let terms = vec![
            term_of(vec![published(4.0, 15)]),
            term_of(vec![published(2.0, 3)]),
        ];

        let standing = compute_standing(student_id, &terms);
        assert_eq!(standing.total_credits, 18);
        let expected = (4.0 * 15.0 + 2.0 * 3.0) / 18.0;
        assert!((standing.cgpa - expected).abs() < 1e-9);
        assert_eq!(standing.standing, Standing::Excellent);
    }

    #[test]
    fn total_credits_match_sum_of_term_credits() {
        let terms = vec![
            term_of(vec![published(3.7, 3), published(3.0, 4)]),
            term_of(vec![published(2.3, 3)]),
            term_of(vec![]),
        ];
        let term_credit_sum: i32 = terms.iter().map(|t| t.credits).sum();

        let standing = compute_standing(Uuid::new_v4(), &terms);
        assert_eq!(standing.total_credits, term_credit_sum);
    }

    #[test]
    fn standing_thresholds() {
        assert_eq!(standing_for(3.67), Standing::Excellent);
        assert_eq!(standing_for(3.66), Standing::VeryGood);
        assert_eq!(standing_for(3.0), Standing::VeryGood);
        assert_eq!(standing_for(2.99), Standing::Good);
        assert_eq!(standing_for(2.33), Standing::Good);
        assert_eq!(standing_for(2.32), Standing::Acceptable);
        assert_eq!(standing_for(2.0), Standing::Acceptable);
        assert_eq!(standing_for(1.99), Standing::Probation);
        assert_eq!(standing_for(0.0), Standing::Probation);
    }

    #[test]
    fn grouping_splits_terms_and_recomputes_summaries() {
        let student_id = Uuid::new_v4();
        let rows = vec![
            ("2026-Fall".to_string(), published(4.0, 3)),
            ("2026-Spring".to_string(), published(3.0, 3)),
            ("2026-Fall".to_string(), published(2.0, 3)),
        ];

        let terms = group_into_terms(student_id, rows);
        assert_eq!(terms.len(), 2);
        // BTreeMap orders term codes lexically: Fall before Spring.
        assert_eq!(terms[0].term_code, "2026-Fall");
        assert_eq!(terms[1].term_code, "2026-Spring");
        assert_eq!(terms[0].courses.len(), 2);
        assert_eq!(terms[0].credits, 6);
        assert!((terms[0].gpa - 3.0).abs() < 1e-9);
    }

    #[test]
    fn standing_serializes_with_variant_names() {
        let terms = vec![term_of(vec![published(3.7, 3), published(3.7, 3)])];
        let standing = compute_standing(Uuid::new_v4(), &terms);
        let value = serde_json::to_value(&standing).unwrap();
        assert_eq!(value["standing"], "Excellent");
        assert_eq!(value["total_credits"], 6);

        let empty = compute_standing(Uuid::new_v4(), &[]);
        let value = serde_json::to_value(&empty).unwrap();
        assert_eq!(value["standing"], "NotCalculated");
    }

    #[test]
    fn zero_credit_record_is_not_calculated() {
        let standing = compute_standing(Uuid::new_v4(), &[]);
        assert_eq!(standing.standing, Standing::NotCalculated);
        assert_eq!(standing.cgpa, 0.0);
        assert_eq!(standing.total_credits, 0);

        // A term of only withdrawn courses is the same story.
        let mut withdrawn = published(3.0, 3);
        withdrawn.status = CourseStatus::Withdrawn;
        let terms = vec![term_of(vec![withdrawn])];
        let standing = compute_standing(Uuid::new_v4(), &terms);
        assert_eq!(standing.standing, Standing::NotCalculated);
    }
}
