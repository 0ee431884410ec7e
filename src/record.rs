//! Session record builder.
//!
//! A [`SessionRecord`] is the outbound payload handed to the record sink at
//! every checkpoint. It carries every profile field with a stable key set
//! (unset fields serialize as `null`) plus the routing outcome.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::{
    ApplicationPreparation, CurriculumType, FlowState, FlowStep, FormFillerType, Geography, Grade,
    LeadCategory, LeadProfile, PartialFundingApproach, ScholarshipRequirement,
    StrongProfileIntent, SupportLevel, TargetUniversities,
};

/// How far a session progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStage {
    /// Answers captured, nothing submitted yet.
    InitialCapture,
    /// Counselling slot booked.
    CounselingBooked,
    /// Submitted without a counselling booking.
    ContactSubmitted,
}

impl FunnelStage {
    /// Derive the stage from the last completed step and the terminal flag.
    pub fn derive(step_completed: Option<FlowStep>, is_submitted: bool) -> Self {
        match (step_completed, is_submitted) {
            (Some(FlowStep::Counselling), _) => FunnelStage::CounselingBooked,
            (_, true) => FunnelStage::ContactSubmitted,
            _ => FunnelStage::InitialCapture,
        }
    }
}

/// Outbound record for one session checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub form_filler_type: Option<FormFillerType>,
    pub current_grade: Option<Grade>,
    pub scholarship_requirement: Option<ScholarshipRequirement>,
    pub curriculum_type: Option<CurriculumType>,
    pub gpa_value: Option<f64>,
    pub percentage_value: Option<f64>,
    /// Sorted; null until at least one destination is chosen.
    pub target_geographies: Option<Vec<Geography>>,
    pub application_preparation: Option<ApplicationPreparation>,
    pub target_universities: Option<TargetUniversities>,
    pub support_level: Option<SupportLevel>,
    pub partial_funding_approach: Option<PartialFundingApproach>,
    pub strong_profile_intent: Option<StrongProfileIntent>,
    pub parent_name: Option<String>,
    pub student_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub counselling_date: Option<NaiveDate>,
    pub counselling_slot: Option<String>,

    pub lead_category: Option<LeadCategory>,
    pub current_step: FlowStep,
    pub step_completed: Option<FlowStep>,
    pub is_qualified_lead: bool,
    pub funnel_stage: FunnelStage,
    pub counsellor: Option<String>,
    pub is_submitted: bool,
    pub elapsed_seconds: u64,
}

impl SessionRecord {
    /// Assemble the record. Pure: no clock reads, no I/O.
    pub fn build(profile: &LeadProfile, flow: &FlowState, elapsed_seconds: u64) -> Self {
        let geographies: Vec<Geography> = profile.target_geographies.iter().copied().collect();
        let contact = &profile.contact;

        Self {
            form_filler_type: profile.form_filler_type,
            current_grade: profile.current_grade,
            scholarship_requirement: profile.scholarship_requirement,
            curriculum_type: profile.curriculum_type,
            gpa_value: profile.gpa_value,
            percentage_value: profile.percentage_value,
            target_geographies: (!geographies.is_empty()).then_some(geographies),
            application_preparation: profile.application_preparation,
            target_universities: profile.target_universities,
            support_level: profile.support_level,
            partial_funding_approach: profile.partial_funding_approach,
            strong_profile_intent: profile.strong_profile_intent,
            parent_name: contact.parent_name.clone(),
            student_name: contact.student_name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            location: contact.location.clone(),
            counselling_date: profile.counselling_date,
            counselling_slot: profile.counselling_slot.clone(),

            lead_category: flow.lead_category,
            current_step: flow.current_step,
            step_completed: flow.step_completed,
            is_qualified_lead: flow
                .lead_category
                .map(|c| c.is_qualified())
                .unwrap_or(false),
            funnel_stage: FunnelStage::derive(flow.step_completed, flow.is_submitted),
            counsellor: flow.counsellor.clone(),
            is_submitted: flow.is_submitted,
            elapsed_seconds,
        }
    }

    /// Serialize to a single JSON line.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
