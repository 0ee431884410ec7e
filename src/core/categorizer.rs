//! Lead categorization rules.
//!
//! Rules are a priority list evaluated top to bottom; the first match wins
//! and "no rule matched" is itself the final outcome (`Nurture`). Unset or
//! unrecognized answers never satisfy a rule, so categorization is total.

use crate::config::RulesConfig;
use crate::core::category::LeadCategory;
use crate::core::profile::{
    ApplicationPreparation, Geography, Grade, LeadProfile, PartialFundingApproach,
    ScholarshipRequirement, TargetUniversities,
};

/// Categorize a profile with the default rule parameters.
pub fn categorize(profile: &LeadProfile) -> LeadCategory {
    categorize_with(profile, &RulesConfig::default())
}

/// Categorize a profile.
pub fn categorize_with(profile: &LeadProfile, rules: &RulesConfig) -> LeadCategory {
    if profile.is_student() {
        return LeadCategory::Nurture;
    }

    if is_spam(profile, rules) {
        return LeadCategory::Nurture;
    }

    let grade = profile.current_grade;

    if profile.scholarship_requirement == Some(ScholarshipRequirement::Full)
        && grade != Some(Grade::Masters)
    {
        return LeadCategory::Nurture;
    }

    match grade {
        Some(Grade::SevenOrBelow) => return LeadCategory::Drop,
        Some(Grade::Masters) => return categorize_masters(profile),
        _ => {}
    }

    if qualifies_bch(profile) {
        return LeadCategory::Bch;
    }

    if qualifies_luminaire(profile, ScholarshipRequirement::Optional) {
        return LeadCategory::LumL1;
    }

    if qualifies_luminaire(profile, ScholarshipRequirement::Partial) {
        return LeadCategory::LumL2;
    }

    LeadCategory::Nurture
}

/// Masters sub-rules.
pub fn categorize_masters(profile: &LeadProfile) -> LeadCategory {
    if profile.application_preparation == Some(ApplicationPreparation::UndecidedNeedHelp) {
        return LeadCategory::Nurture;
    }

    match profile.target_universities {
        Some(TargetUniversities::Top20To50) => LeadCategory::MastersL1,
        Some(TargetUniversities::Top50To100) | Some(TargetUniversities::PartnerUniversity) => {
            LeadCategory::MastersL2
        }
        _ => LeadCategory::Nurture,
    }
}

/// Re-categorize a nurture lead after the extended nurture step.
///
/// Only `Nurture -> {LumL2, Nurture}` is possible. Any other `current`
/// category is returned unchanged.
pub fn recategorize(current: LeadCategory, profile: &LeadProfile) -> LeadCategory {
    if current != LeadCategory::Nurture {
        tracing::debug!(
            category = %current,
            "re-categorization requested for non-nurture lead, keeping category"
        );
        return current;
    }

    let eligible = profile.is_parent()
        && profile
            .current_grade
            .map(|g| g.is_senior_secondary())
            .unwrap_or(false);
    if !eligible {
        return LeadCategory::Nurture;
    }

    match profile.partial_funding_approach {
        Some(PartialFundingApproach::AcceptLoans)
        | Some(PartialFundingApproach::AffordableAlternatives) => LeadCategory::LumL2,
        _ => LeadCategory::Nurture,
    }
}

/// Spam heuristic: a perfect score is almost never genuine.
fn is_spam(profile: &LeadProfile, rules: &RulesConfig) -> bool {
    profile.gpa_value == Some(rules.spam_gpa)
        || profile.percentage_value == Some(rules.spam_percentage)
}

fn pays_at_least_partly(profile: &LeadProfile) -> bool {
    matches!(
        profile.scholarship_requirement,
        Some(ScholarshipRequirement::Optional) | Some(ScholarshipRequirement::Partial)
    )
}

fn targets_non_us(profile: &LeadProfile) -> bool {
    profile.targets_region(Geography::Uk)
        || profile.targets_region(Geography::RestOfWorld)
        || profile.targets_region(Geography::NeedGuidance)
}

fn qualifies_bch(profile: &LeadProfile) -> bool {
    if !pays_at_least_partly(profile) {
        return false;
    }
    match profile.current_grade {
        Some(Grade::Eight) | Some(Grade::Nine) | Some(Grade::Ten) => true,
        Some(Grade::Eleven) => profile.targets_region(Geography::Us),
        _ => false,
    }
}

fn qualifies_luminaire(profile: &LeadProfile, scholarship: ScholarshipRequirement) -> bool {
    if profile.scholarship_requirement != Some(scholarship) {
        return false;
    }
    match profile.current_grade {
        Some(Grade::Eleven) => targets_non_us(profile),
        Some(Grade::Twelve) => true,
        _ => false,
    }
}
