use uuid::Uuid;

use crate::error::{GradeError, GradeResult};
use crate::models::{
    Adjustment, ComponentScore, CourseGrade, CourseStatus, GradeComponent, LetterGrade,
};

/// Fixed institutional letter scale: minimum percentage, letter, and
/// grade-point value. This table is the single source for every
/// caller; thresholds are policy and not tunable per course.
pub const LETTER_SCALE: [(f64, LetterGrade); 9] = [
    (95.0, LetterGrade { letter: "A+", grade_point: 4.0 }),
    (90.0, LetterGrade { letter: "A", grade_point: 3.7 }),
    (85.0, LetterGrade { letter: "B+", grade_point: 3.3 }),
    (80.0, LetterGrade { letter: "B", grade_point: 3.0 }),
    (75.0, LetterGrade { letter: "C+", grade_point: 2.7 }),
    (70.0, LetterGrade { letter: "C", grade_point: 2.3 }),
    (65.0, LetterGrade { letter: "D+", grade_point: 2.0 }),
    (60.0, LetterGrade { letter: "D", grade_point: 1.7 }),
    (0.0, LetterGrade { letter: "F", grade_point: 0.0 }),
];

/// Validates an offering's grading scheme: weights must sum to exactly
/// 100 (integer percents, no tolerance) and every component must carry
/// a positive weight and a positive max score. Publishing and adding
/// components are both gated on this.
pub fn validate_components(components: &[GradeComponent]) -> GradeResult<()> {
    for component in components {
        if component.weight <= 0 {
            return Err(GradeError::NonPositiveWeight {
                name: component.name.clone(),
                weight: component.weight,
            });
        }
        if component.max_score <= 0.0 {
            return Err(GradeError::NonPositiveMaxScore {
                name: component.name.clone(),
                max_score: component.max_score,
            });
        }
    }

    let actual_sum: i32 = components.iter().map(|c| c.weight).sum();
    if actual_sum != 100 {
        return Err(GradeError::WeightSum { actual_sum });
    }

    Ok(())
}

/// Gate for adding one more component to an existing scheme: the
/// candidate must carry positive weight and max score, and must not
/// push the offering's weight sum past 100. A sum still short of 100
/// is fine at entry time; it only blocks publication.
pub fn validate_component_entry(
    existing: &[GradeComponent],
    candidate: &GradeComponent,
) -> GradeResult<()> {
    if candidate.weight <= 0 {
        return Err(GradeError::NonPositiveWeight {
            name: candidate.name.clone(),
            weight: candidate.weight,
        });
    }
    if candidate.max_score <= 0.0 {
        return Err(GradeError::NonPositiveMaxScore {
            name: candidate.name.clone(),
            max_score: candidate.max_score,
        });
    }

    let actual_sum = existing.iter().map(|c| c.weight).sum::<i32>() + candidate.weight;
    if actual_sum > 100 {
        return Err(GradeError::WeightSum { actual_sum });
    }

    Ok(())
}

/// Combines per-component scores into a raw weighted percentage.
/// A component with no score yet contributes 0 so partial grading
/// never breaks reporting; an out-of-range score or a non-positive
/// max score is rejected. An offering with no components yields 0.
pub fn aggregate_scores(
    components: &[GradeComponent],
    scores: &[ComponentScore],
) -> GradeResult<f64> {
    let mut raw_total = 0.0;

    for component in components {
        // Guards the division below; a malformed component must never
        // turn into a NaN total.
        if component.max_score <= 0.0 {
            return Err(GradeError::NonPositiveMaxScore {
                name: component.name.clone(),
                max_score: component.max_score,
            });
        }

        let entered = scores.iter().find(|s| s.component_id == component.id);
        let Some(entry) = entered else {
            continue;
        };

        if entry.score < 0.0 || entry.score > component.max_score {
            return Err(GradeError::ScoreOutOfRange {
                component_id: component.id,
                score: entry.score,
                max_score: component.max_score,
            });
        }

        raw_total += (entry.score / component.max_score) * component.weight as f64;
    }

    Ok(raw_total)
}

/// Applies the outstanding bonus and penalty to a raw total, clamped
/// to [0,100]. Clamping is policy, never an error. Idempotent: each
/// call works from the current outstanding amounts, not a running
/// delta.
pub fn apply_adjustments(raw_total: f64, bonus: Option<f64>, penalty: Option<f64>) -> f64 {
    let adjusted = raw_total + bonus.unwrap_or(0.0) - penalty.unwrap_or(0.0);
    adjusted.clamp(0.0, 100.0)
}

/// Gate applied before an adjustment record is accepted: the amount
/// must be strictly positive and the reason non-empty after trimming.
pub fn validate_adjustment(adjustment: &Adjustment) -> GradeResult<()> {
    if adjustment.reason.trim().is_empty() {
        return Err(GradeError::MissingAdjustmentReason {
            kind: adjustment.kind.as_str(),
        });
    }
    if adjustment.amount <= 0.0 {
        return Err(GradeError::NonPositiveAdjustment {
            kind: adjustment.kind.as_str(),
            amount: adjustment.amount,
        });
    }
    Ok(())
}

/// Maps an adjusted total to its letter band. The input is expected to
/// already be clamped; a value outside [0,100] here is an upstream bug
/// and aborts rather than misgrading.
pub fn letter_for(adjusted_total: f64) -> LetterGrade {
    assert!(
        (0.0..=100.0).contains(&adjusted_total),
        "adjusted total {adjusted_total} escaped the [0,100] clamp"
    );

    for (min_percent, grade) in LETTER_SCALE {
        if adjusted_total >= min_percent {
            return grade;
        }
    }
    // 0.0 >= 0.0 always matches the F band.
    unreachable!("letter scale has no band for {adjusted_total}")
}

/// Full pipeline for one student in one offering: aggregate raw total,
/// apply outstanding adjustments, map to letter and grade point. The
/// result is a draft; publication is a separate one-way transition.
#[allow(clippy::too_many_arguments)]
pub fn compute_course_grade(
    student_id: Uuid,
    offering_id: Uuid,
    course_code: &str,
    credits: i32,
    status: CourseStatus,
    components: &[GradeComponent],
    scores: &[ComponentScore],
    bonus: Option<f64>,
    penalty: Option<f64>,
) -> GradeResult<CourseGrade> {
    let raw_total = aggregate_scores(components, scores)?;
    let adjusted_total = apply_adjustments(raw_total, bonus, penalty);
    let grade = letter_for(adjusted_total);

    Ok(CourseGrade {
        student_id,
        offering_id,
        course_code: course_code.to_string(),
        raw_total,
        adjusted_total,
        letter: grade.letter.to_string(),
        grade_point: grade.grade_point,
        credits,
        status,
        is_published: false,
    })
}

/// Collects every condition blocking publication for an offering, so
/// the caller can show an actionable list instead of failing on the
/// first bad row. Empty means publishable.
pub fn publication_blockers(
    components: &[GradeComponent],
    scores: &[ComponentScore],
) -> Vec<GradeError> {
    let mut blockers = Vec::new();

    if let Err(err) = validate_components(components) {
        blockers.push(err);
    }

    for score in scores {
        let Some(component) = components.iter().find(|c| c.id == score.component_id) else {
            continue;
        };
        if score.score < 0.0 || score.score > component.max_score {
            blockers.push(GradeError::ScoreOutOfRange {
                component_id: component.id,
                score: score.score,
                max_score: component.max_score,
            });
        }
    }

    blockers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AdjustmentKind;

    fn component(name: &str, weight: i32, max_score: f64) -> GradeComponent {
        GradeComponent {
            id: Uuid::new_v4(),
            name: name.to_string(),
            weight,
            max_score,
        }
    }

    fn score_for(student_id: Uuid, component: &GradeComponent, score: f64) -> ComponentScore {
        ComponentScore {
            student_id,
            component_id: component.id,
            score,
            recorded_at: chrono::NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
        }
    }

    #[test]
    fn weights_summing_to_100_validate() {
        let components = vec![
            component("Midterm", 30, 100.0),
            component("Final", 50, 100.0),
            component("Participation", 20, 100.0),
        ];
        assert!(validate_components(&components).is_ok());
    }

    #[test]
    fn weight_sum_error_reports_actual_sum() {
        let components = vec![component("Midterm", 30, 100.0), component("Final", 50, 100.0)];
        assert_eq!(
            validate_components(&components),
            Err(GradeError::WeightSum { actual_sum: 80 })
        );
    }

    #[test]
    fn zero_weight_component_rejected() {
        let components = vec![component("Quiz", 0, 10.0), component("Final", 100, 100.0)];
        assert_eq!(
            validate_components(&components),
            Err(GradeError::NonPositiveWeight {
                name: "Quiz".to_string(),
                weight: 0,
            })
        );
    }

    #[test]
    fn zero_max_score_rejected() {
        let components = vec![component("Lab", 100, 0.0)];
        assert!(matches!(
            validate_components(&components),
            Err(GradeError::NonPositiveMaxScore { .. })
        ));
    }

    #[test]
    fn component_entry_blocks_overweight_scheme() {
        let existing = vec![component("Midterm", 30, 100.0), component("Final", 50, 100.0)];

        let fits = component("Participation", 20, 100.0);
        assert!(validate_component_entry(&existing, &fits).is_ok());

        let partial = component("Quiz", 10, 10.0);
        assert!(validate_component_entry(&existing, &partial).is_ok());

        let too_heavy = component("Project", 30, 100.0);
        assert_eq!(
            validate_component_entry(&existing, &too_heavy),
            Err(GradeError::WeightSum { actual_sum: 110 })
        );
    }

    #[test]
    fn aggregate_weights_scores_by_max() {
        let student_id = Uuid::new_v4();
        let midterm = component("Midterm", 30, 100.0);
        let final_exam = component("Final", 50, 100.0);
        let participation = component("Participation", 20, 100.0);
        let scores = vec![
            score_for(student_id, &midterm, 80.0),
            score_for(student_id, &final_exam, 70.0),
            score_for(student_id, &participation, 90.0),
        ];

        let raw = aggregate_scores(&[midterm, final_exam, participation], &scores).unwrap();
        assert!((raw - 77.0).abs() < 1e-9);
    }

    #[test]
    fn missing_score_contributes_zero() {
        let student_id = Uuid::new_v4();
        let midterm = component("Midterm", 40, 50.0);
        let final_exam = component("Final", 60, 100.0);
        let scores = vec![score_for(student_id, &midterm, 25.0)];

        let raw = aggregate_scores(&[midterm, final_exam], &scores).unwrap();
        assert!((raw - 20.0).abs() < 1e-9);
    }

    #[test]
    fn no_components_yields_zero() {
        let raw = aggregate_scores(&[], &[]).unwrap();
        assert_eq!(raw, 0.0);
    }

    #[test]
    fn out_of_range_score_rejected() {
        let student_id = Uuid::new_v4();
        let quiz = component("Quiz", 100, 10.0);
        let over = vec![score_for(student_id, &quiz, 11.0)];
        assert!(matches!(
            aggregate_scores(std::slice::from_ref(&quiz), &over),
            Err(GradeError::ScoreOutOfRange { .. })
        ));

        let negative = vec![score_for(student_id, &quiz, -1.0)];
        assert!(matches!(
            aggregate_scores(&[quiz], &negative),
            Err(GradeError::ScoreOutOfRange { .. })
        ));
    }

    #[test]
    fn zero_max_score_never_reaches_the_division() {
        let student_id = Uuid::new_v4();
        let broken = component("Quiz", 100, 0.0);
        let scores = vec![score_for(student_id, &broken, 0.0)];

        let result = aggregate_scores(std::slice::from_ref(&broken), &scores);
        assert_eq!(
            result,
            Err(GradeError::NonPositiveMaxScore {
                name: "Quiz".to_string(),
                max_score: 0.0,
            })
        );

        // Same verdict when no score has been entered yet.
        assert!(matches!(
            aggregate_scores(&[broken], &[]),
            Err(GradeError::NonPositiveMaxScore { .. })
        ));
    }

    #[test]
    fn raising_one_score_never_lowers_total() {
        let student_id = Uuid::new_v4();
        let midterm = component("Midterm", 40, 100.0);
        let final_exam = component("Final", 60, 100.0);
        let components = vec![midterm.clone(), final_exam.clone()];

        let low = vec![
            score_for(student_id, &midterm, 50.0),
            score_for(student_id, &final_exam, 70.0),
        ];
        let high = vec![
            score_for(student_id, &midterm, 60.0),
            score_for(student_id, &final_exam, 70.0),
        ];

        let low_total = aggregate_scores(&components, &low).unwrap();
        let high_total = aggregate_scores(&components, &high).unwrap();
        assert!(high_total >= low_total);
    }

    #[test]
    fn bonus_adds_and_clamps() {
        assert_eq!(apply_adjustments(50.0, Some(10.0), None), 60.0);
        assert_eq!(apply_adjustments(95.0, Some(10.0), None), 100.0);
    }

    #[test]
    fn penalty_subtracts_and_clamps() {
        assert_eq!(apply_adjustments(5.0, None, Some(10.0)), 0.0);
        assert_eq!(apply_adjustments(80.0, None, Some(5.0)), 75.0);
    }

    #[test]
    fn bonus_and_penalty_can_coexist() {
        assert_eq!(apply_adjustments(70.0, Some(4.0), Some(6.0)), 68.0);
    }

    #[test]
    fn reapplying_does_not_compound() {
        let once = apply_adjustments(77.0, Some(2.0), None);
        let twice = apply_adjustments(77.0, Some(2.0), None);
        assert_eq!(once, twice);
    }

    #[test]
    fn adjustment_requires_reason_and_positive_amount() {
        let blank_reason = Adjustment {
            student_id: Uuid::new_v4(),
            offering_id: Uuid::new_v4(),
            kind: AdjustmentKind::Bonus,
            amount: 2.0,
            reason: "   ".to_string(),
        };
        assert_eq!(
            validate_adjustment(&blank_reason),
            Err(GradeError::MissingAdjustmentReason { kind: "bonus" })
        );

        let zero_amount = Adjustment {
            amount: 0.0,
            reason: "makeup work".to_string(),
            ..blank_reason.clone()
        };
        assert_eq!(
            validate_adjustment(&zero_amount),
            Err(GradeError::NonPositiveAdjustment {
                kind: "bonus",
                amount: 0.0,
            })
        );

        let valid = Adjustment {
            amount: 2.0,
            reason: "participation".to_string(),
            ..blank_reason
        };
        assert!(validate_adjustment(&valid).is_ok());
    }

    #[test]
    fn letter_boundaries_match_scale() {
        assert_eq!(letter_for(95.0).letter, "A+");
        assert_eq!(letter_for(94.99).letter, "A");
        assert_eq!(letter_for(90.0).letter, "A");
        assert_eq!(letter_for(89.99).letter, "B+");
        assert_eq!(letter_for(85.0).letter, "B+");
        assert_eq!(letter_for(80.0).letter, "B");
        assert_eq!(letter_for(75.0).letter, "C+");
        assert_eq!(letter_for(70.0).letter, "C");
        assert_eq!(letter_for(65.0).letter, "D+");
        assert_eq!(letter_for(60.0).letter, "D");
        assert_eq!(letter_for(59.99).letter, "F");
        assert_eq!(letter_for(0.0).letter, "F");
        assert_eq!(letter_for(100.0).letter, "A+");
    }

    #[test]
    fn grade_points_track_letters() {
        assert_eq!(letter_for(97.0).grade_point, 4.0);
        assert_eq!(letter_for(91.5).grade_point, 3.7);
        assert_eq!(letter_for(77.0).grade_point, 2.7);
        assert_eq!(letter_for(61.0).grade_point, 1.7);
        assert_eq!(letter_for(30.0).grade_point, 0.0);
    }

    #[test]
    #[should_panic]
    fn letter_mapper_rejects_escaped_values() {
        letter_for(100.5);
    }

    #[test]
    fn full_pipeline_scenario() {
        let student_id = Uuid::new_v4();
        let offering_id = Uuid::new_v4();
        let midterm = component("Midterm", 30, 100.0);
        let final_exam = component("Final", 50, 100.0);
        let participation = component("Participation", 20, 100.0);
        let scores = vec![
            score_for(student_id, &midterm, 80.0),
            score_for(student_id, &final_exam, 70.0),
            score_for(student_id, &participation, 90.0),
        ];
        let components = vec![midterm, final_exam, participation];

        let grade = compute_course_grade(
            student_id,
            offering_id,
            "CS101",
            3,
            CourseStatus::Enrolled,
            &components,
            &scores,
            Some(2.0),
            None,
        )
        .unwrap();

        assert!((grade.raw_total - 77.0).abs() < 1e-9);
        assert!((grade.adjusted_total - 79.0).abs() < 1e-9);
        assert_eq!(grade.letter, "C+");
        assert_eq!(grade.grade_point, 2.7);
        assert!(!grade.is_published);
    }

    #[test]
    fn recomputing_same_inputs_is_identical() {
        let student_id = Uuid::new_v4();
        let offering_id = Uuid::new_v4();
        let quiz = component("Quiz", 100, 20.0);
        let scores = vec![score_for(student_id, &quiz, 17.0)];
        let components = vec![quiz];

        let first = compute_course_grade(
            student_id,
            offering_id,
            "MATH200",
            4,
            CourseStatus::Enrolled,
            &components,
            &scores,
            None,
            Some(3.0),
        )
        .unwrap();
        let second = compute_course_grade(
            student_id,
            offering_id,
            "MATH200",
            4,
            CourseStatus::Enrolled,
            &components,
            &scores,
            None,
            Some(3.0),
        )
        .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn publication_blockers_enumerate_every_problem() {
        let student_id = Uuid::new_v4();
        let midterm = component("Midterm", 30, 100.0);
        let final_exam = component("Final", 50, 100.0);
        let scores = vec![score_for(student_id, &midterm, 120.0)];
        let components = vec![midterm, final_exam];

        let blockers = publication_blockers(&components, &scores);
        assert_eq!(blockers.len(), 2);
        assert!(matches!(blockers[0], GradeError::WeightSum { actual_sum: 80 }));
        assert!(matches!(blockers[1], GradeError::ScoreOutOfRange { .. }));
    }

    #[test]
    fn clean_offering_has_no_blockers() {
        let student_id = Uuid::new_v4();
        let exam = component("Exam", 100, 100.0);
        let scores = vec![score_for(student_id, &exam, 88.0)];
        assert!(publication_blockers(&[exam], &scores).is_empty());
    }
}
