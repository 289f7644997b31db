use crate::models::{CreditLoadCheck, EnrollmentDecision, SectionLoad, SectionValidation};

/// Checks a proposed enrollment against the student's batch credit
/// cap: already-enrolled credits plus every proposed section must fit
/// under the cap. Pure arithmetic; prerequisites and schedule
/// conflicts are someone else's verdict (see [`admissibility`]).
pub fn validate_credit_load(
    current_credits: i32,
    max_credits: i32,
    proposed: &[SectionLoad],
) -> CreditLoadCheck {
    let total = current_credits + proposed.iter().map(|s| s.credits).sum::<i32>();
    CreditLoadCheck {
        ok: total <= max_credits,
        total,
        max_credits,
        over_by: (total - max_credits).max(0),
    }
}

/// Merges the credit check with the external validator's per-section
/// verdicts. The request is admissible only when the credit cap holds
/// and every section came back valid; invalid sections are carried in
/// the decision so the caller can show exactly which rows failed and
/// why.
pub fn admissibility(
    credit_check: CreditLoadCheck,
    section_results: &[SectionValidation],
) -> EnrollmentDecision {
    let rejected_sections: Vec<SectionValidation> = section_results
        .iter()
        .filter(|r| !r.valid)
        .cloned()
        .collect();

    EnrollmentDecision {
        admissible: credit_check.ok && rejected_sections.is_empty(),
        credit_check,
        rejected_sections,
    }
}
