//! Lead profile types.
//!
//! A `LeadProfile` is the snapshot of form answers the categorizer routes on.
//! Answers arrive step by step, so every field is optional and an unset
//! field never satisfies a rule. Every enum carries an `Unrecognized`
//! variant that absorbs unknown wire values; it also never satisfies a rule.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Who is filling in the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormFillerType {
    Parent,
    Student,
    #[serde(other)]
    Unrecognized,
}

/// Current grade of the student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "7_or_below")]
    SevenOrBelow,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "11")]
    Eleven,
    #[serde(rename = "12")]
    Twelve,
    #[serde(rename = "masters")]
    Masters,
    #[serde(rename = "unrecognized")]
    #[serde(other)]
    Unrecognized,
}

impl Grade {
    /// Grades 11 and 12, the only grades eligible for the extended nurture step.
    pub fn is_senior_secondary(&self) -> bool {
        matches!(self, Grade::Eleven | Grade::Twelve)
    }
}

/// How much scholarship funding the family needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScholarshipRequirement {
    Full,
    Partial,
    Optional,
    #[serde(other)]
    Unrecognized,
}

/// School curriculum. Recorded only; no rule reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurriculumType {
    #[serde(rename = "IB")]
    Ib,
    #[serde(rename = "IGCSE")]
    Igcse,
    #[serde(rename = "CBSE")]
    Cbse,
    #[serde(rename = "ICSE")]
    Icse,
    #[serde(rename = "State_Boards")]
    StateBoards,
    #[serde(rename = "Others")]
    Others,
    #[serde(rename = "unrecognized")]
    #[serde(other)]
    Unrecognized,
}

/// Study destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Geography {
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "UK")]
    Uk,
    #[serde(rename = "rest_of_world")]
    RestOfWorld,
    #[serde(rename = "need_guidance")]
    NeedGuidance,
    #[serde(rename = "canada")]
    Canada,
    #[serde(rename = "australia")]
    Australia,
    #[serde(rename = "europe")]
    Europe,
    #[serde(rename = "asia")]
    Asia,
    #[serde(rename = "unrecognized")]
    #[serde(other)]
    Unrecognized,
}

impl Geography {
    /// Region used by the routing rules.
    ///
    /// The extended-flow destinations fold into `RestOfWorld`.
    pub fn routing_region(&self) -> Geography {
        match self {
            Geography::Canada | Geography::Australia | Geography::Europe | Geography::Asia => {
                Geography::RestOfWorld
            }
            other => *other,
        }
    }
}

/// Masters applicants: how far along the application is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationPreparation {
    ResearchingNow,
    Shortlisted,
    ApplicationsInProgress,
    UndecidedNeedHelp,
    #[serde(other)]
    Unrecognized,
}

/// Masters applicants: target university band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetUniversities {
    #[serde(rename = "top_20_50")]
    Top20To50,
    #[serde(rename = "top_50_100")]
    Top50To100,
    PartnerUniversity,
    Unsure,
    #[serde(other)]
    Unrecognized,
}

/// Masters applicants: how much support they want.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportLevel {
    EndToEnd,
    SpecificGuidance,
    JustExploring,
    #[serde(other)]
    Unrecognized,
}

/// Extended nurture step: how the family would handle partial funding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialFundingApproach {
    AcceptLoans,
    AffordableAlternatives,
    DeferScholarships,
    OnlyFullFunding,
    #[serde(other)]
    Unrecognized,
}

/// Extended nurture step: intent to build a stronger profile first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrongProfileIntent {
    Committed,
    Considering,
    NotNow,
    #[serde(other)]
    Unrecognized,
}

/// Contact details. Recorded and forwarded, never routed on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContactDetails {
    pub parent_name: Option<String>,
    pub student_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
}

impl ContactDetails {
    fn merge(&mut self, other: ContactDetails) {
        merge_field(&mut self.parent_name, other.parent_name);
        merge_field(&mut self.student_name, other.student_name);
        merge_field(&mut self.email, other.email);
        merge_field(&mut self.phone, other.phone);
        merge_field(&mut self.location, other.location);
    }
}

/// Snapshot of every answer collected so far.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LeadProfile {
    pub form_filler_type: Option<FormFillerType>,
    pub current_grade: Option<Grade>,
    pub scholarship_requirement: Option<ScholarshipRequirement>,
    pub curriculum_type: Option<CurriculumType>,
    pub gpa_value: Option<f64>,
    pub percentage_value: Option<f64>,
    pub target_geographies: BTreeSet<Geography>,
    pub application_preparation: Option<ApplicationPreparation>,
    pub target_universities: Option<TargetUniversities>,
    pub support_level: Option<SupportLevel>,
    pub partial_funding_approach: Option<PartialFundingApproach>,
    pub strong_profile_intent: Option<StrongProfileIntent>,
    pub contact: ContactDetails,
    pub counselling_date: Option<NaiveDate>,
    pub counselling_slot: Option<String>,
}

/// Upper bound of the GPA scale.
pub const MAX_GPA: f64 = 10.0;

/// Upper bound of the percentage scale.
pub const MAX_PERCENTAGE: f64 = 100.0;

impl LeadProfile {
    /// Create an empty profile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set who fills the form.
    pub fn with_filler(mut self, filler: FormFillerType) -> Self {
        self.form_filler_type = Some(filler);
        self
    }

    /// Set the current grade.
    pub fn with_grade(mut self, grade: Grade) -> Self {
        self.current_grade = Some(grade);
        self
    }

    /// Set the scholarship requirement.
    pub fn with_scholarship(mut self, scholarship: ScholarshipRequirement) -> Self {
        self.scholarship_requirement = Some(scholarship);
        self
    }

    /// Set the GPA, clearing any percentage.
    pub fn with_gpa(mut self, gpa: f64) -> Self {
        self.gpa_value = Some(gpa);
        self.percentage_value = None;
        self
    }

    /// Set the percentage, clearing any GPA.
    pub fn with_percentage(mut self, percentage: f64) -> Self {
        self.percentage_value = Some(percentage);
        self.gpa_value = None;
        self
    }

    /// Add a target geography.
    pub fn with_geography(mut self, geography: Geography) -> Self {
        self.target_geographies.insert(geography);
        self
    }

    /// Whether the routing region set contains `region`.
    pub fn targets_region(&self, region: Geography) -> bool {
        self.target_geographies
            .iter()
            .any(|g| g.routing_region() == region)
    }

    /// Whether the form is filled by a parent.
    pub fn is_parent(&self) -> bool {
        self.form_filler_type == Some(FormFillerType::Parent)
    }

    /// Whether the form is filled by a student.
    pub fn is_student(&self) -> bool {
        self.form_filler_type == Some(FormFillerType::Student)
    }

    /// Merge newly submitted answers into this profile.
    ///
    /// Set fields in `answers` overwrite; unset fields keep what was already
    /// collected, so navigating back never loses data. A new GPA clears the
    /// percentage and vice versa. When `answers` carries both, the GPA wins,
    /// as in [`normalize`](Self::normalize).
    pub fn merge(&mut self, answers: LeadProfile) {
        merge_field(&mut self.form_filler_type, answers.form_filler_type);
        merge_field(&mut self.current_grade, answers.current_grade);
        merge_field(
            &mut self.scholarship_requirement,
            answers.scholarship_requirement,
        );
        merge_field(&mut self.curriculum_type, answers.curriculum_type);
        match (answers.gpa_value, answers.percentage_value) {
            (Some(gpa), _) => {
                self.gpa_value = Some(gpa);
                self.percentage_value = None;
            }
            (None, Some(pct)) => {
                self.percentage_value = Some(pct);
                self.gpa_value = None;
            }
            (None, None) => {}
        }
        if !answers.target_geographies.is_empty() {
            self.target_geographies = answers.target_geographies;
        }
        merge_field(
            &mut self.application_preparation,
            answers.application_preparation,
        );
        merge_field(&mut self.target_universities, answers.target_universities);
        merge_field(&mut self.support_level, answers.support_level);
        merge_field(
            &mut self.partial_funding_approach,
            answers.partial_funding_approach,
        );
        merge_field(&mut self.strong_profile_intent, answers.strong_profile_intent);
        self.contact.merge(answers.contact);
        merge_field(&mut self.counselling_date, answers.counselling_date);
        merge_field(&mut self.counselling_slot, answers.counselling_slot);
    }

    /// Coerce the profile into its documented shape before routing.
    ///
    /// - scores are dropped for grade 7 or below (never collected there)
    /// - scores outside their scale or non-finite are dropped
    /// - if both GPA and percentage are set, the GPA wins
    ///
    /// Returns a note per coercion so the caller can log it.
    pub fn normalize(&mut self) -> Vec<String> {
        let mut notes = Vec::new();

        if self.current_grade == Some(Grade::SevenOrBelow)
            && (self.gpa_value.is_some() || self.percentage_value.is_some())
        {
            self.gpa_value = None;
            self.percentage_value = None;
            notes.push("dropped academic score for grade 7_or_below".to_string());
        }

        if let Some(gpa) = self.gpa_value {
            if !gpa.is_finite() || !(0.0..=MAX_GPA).contains(&gpa) {
                self.gpa_value = None;
                notes.push(format!("dropped out-of-range gpa {}", gpa));
            }
        }

        if let Some(pct) = self.percentage_value {
            if !pct.is_finite() || !(0.0..=MAX_PERCENTAGE).contains(&pct) {
                self.percentage_value = None;
                notes.push(format!("dropped out-of-range percentage {}", pct));
            }
        }

        if self.gpa_value.is_some() && self.percentage_value.is_some() {
            self.percentage_value = None;
            notes.push("gpa and percentage both set; kept gpa".to_string());
        }

        notes
    }
}

fn merge_field<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}
