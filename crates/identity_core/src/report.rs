//! Immutable per-seed report and its confidence score

use crate::breach::BreachMembership;
use crate::candidates::Candidate;
use crate::config::ConfidenceConfig;
use crate::deliverability::{DeliverabilityResult, DeliverabilityState};
use crate::disposable::DomainClassification;
use crate::identifier::{Identifier, IdentifierKind};
use crate::links::ProfileLink;
use crate::phone::PhoneInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A failure collapsed into the report instead of aborting it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportIssue {
    pub field: String,
    pub reason: String,
}

impl ReportIssue {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Everything learned about one seed signal
///
/// Built once by the aggregator; fields are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    seed: Identifier,
    seed_valid: bool,
    seed_domain: Option<String>,
    phone: Option<PhoneInfo>,
    candidates: Vec<Candidate>,
    usernames: Vec<String>,
    classifications: BTreeMap<String, DomainClassification>,
    deliverability: BTreeMap<String, DeliverabilityResult>,
    breaches: Option<BreachMembership>,
    links: Vec<ProfileLink>,
    issues: Vec<ReportIssue>,
    confidence: f64,
    generated_at: DateTime<Utc>,
}

impl Report {
    pub fn seed(&self) -> &Identifier {
        &self.seed
    }

    /// Whether the seed passed format validation or phone normalization
    pub fn seed_valid(&self) -> bool {
        self.seed_valid
    }

    pub fn seed_domain(&self) -> Option<&str> {
        self.seed_domain.as_deref()
    }

    pub fn phone(&self) -> Option<&PhoneInfo> {
        self.phone.as_ref()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn usernames(&self) -> &[String] {
        &self.usernames
    }

    pub fn classifications(&self) -> &BTreeMap<String, DomainClassification> {
        &self.classifications
    }

    pub fn deliverability(&self) -> &BTreeMap<String, DeliverabilityResult> {
        &self.deliverability
    }

    /// `None` when the breach source failed; see [`issues`](Self::issues)
    pub fn breaches(&self) -> Option<&BreachMembership> {
        self.breaches.as_ref()
    }

    pub fn links(&self) -> &[ProfileLink] {
        &self.links
    }

    pub fn issues(&self) -> &[ReportIssue] {
        &self.issues
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }
}

/// Mutable staging area the aggregator fills before sealing a [`Report`]
#[derive(Debug, Clone)]
pub(crate) struct ReportDraft {
    pub seed: Identifier,
    pub seed_valid: bool,
    pub seed_domain: Option<String>,
    pub phone: Option<PhoneInfo>,
    pub candidates: Vec<Candidate>,
    pub usernames: Vec<String>,
    pub classifications: BTreeMap<String, DomainClassification>,
    pub deliverability: BTreeMap<String, DeliverabilityResult>,
    pub breaches: Option<BreachMembership>,
    pub links: Vec<ProfileLink>,
    pub issues: Vec<ReportIssue>,
}

impl ReportDraft {
    pub fn new(seed: Identifier) -> Self {
        Self {
            seed,
            seed_valid: false,
            seed_domain: None,
            phone: None,
            candidates: Vec::new(),
            usernames: Vec::new(),
            classifications: BTreeMap::new(),
            deliverability: BTreeMap::new(),
            breaches: None,
            links: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn issue(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.issues.push(ReportIssue::new(field, reason));
    }

    /// Seal the draft, scoring it from its own fields
    pub fn finish(self, model: &ConfidenceModel) -> Report {
        let mut report = Report {
            seed: self.seed,
            seed_valid: self.seed_valid,
            seed_domain: self.seed_domain,
            phone: self.phone,
            candidates: self.candidates,
            usernames: self.usernames,
            classifications: self.classifications,
            deliverability: self.deliverability,
            breaches: self.breaches,
            links: self.links,
            issues: self.issues,
            confidence: 0.0,
            generated_at: Utc::now(),
        };
        report.confidence = model.score_report(&report);
        report
    }
}

/// Sub-results feeding the confidence score; `None` means absent or unknown
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInputs {
    pub format_valid: bool,
    pub deliverability: Option<DeliverabilityState>,
    pub disposable: Option<bool>,
    pub role_likely: Option<bool>,
}

/// Weighted sum of four terms, each in `[0, 1]`
#[derive(Debug, Clone)]
pub struct ConfidenceModel {
    config: ConfidenceConfig,
}

impl ConfidenceModel {
    pub fn new(config: &ConfidenceConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn score(&self, inputs: &ConfidenceInputs) -> f64 {
        let c = &self.config;

        let format = if inputs.format_valid { 1.0 } else { 0.0 };
        let deliverability = match inputs.deliverability {
            Some(DeliverabilityState::Likely) => 1.0,
            Some(DeliverabilityState::Unknown) | None => c.neutral,
        };
        let not_disposable = inputs.disposable.map_or(c.neutral, |d| if d { 0.0 } else { 1.0 });
        let not_role = inputs.role_likely.map_or(c.neutral, |r| if r { 0.0 } else { 1.0 });

        let total = c.format * format
            + c.deliverability * deliverability
            + c.not_disposable * not_disposable
            + c.not_role * not_role;
        total.clamp(0.0, 1.0)
    }

    /// Recompute the score from a report's stored fields
    pub fn score_report(&self, report: &Report) -> f64 {
        self.score(&Self::inputs(report))
    }

    pub fn inputs(report: &Report) -> ConfidenceInputs {
        let domain = report.seed_domain();
        let classification = domain.and_then(|d| report.classifications.get(d));

        // Only an email seed has a local part to judge
        let role_likely = match report.seed.kind {
            IdentifierKind::Email if report.seed_valid => classification.map(|c| c.role_likely),
            _ => None,
        };

        ConfidenceInputs {
            format_valid: report.seed_valid,
            deliverability: domain
                .and_then(|d| report.deliverability.get(d))
                .map(|r| r.state),
            disposable: classification.map(|c| c.disposable),
            role_likely,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconConfig;
    use pretty_assertions::assert_eq;

    fn model() -> ConfidenceModel {
        ConfidenceModel::new(&ReconConfig::builtin().unwrap().confidence)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_all_positive_scores_one() {
        let score = model().score(&ConfidenceInputs {
            format_valid: true,
            deliverability: Some(DeliverabilityState::Likely),
            disposable: Some(false),
            role_likely: Some(false),
        });
        assert!(approx(score, 1.0));
    }

    #[test]
    fn test_unknown_terms_are_neutral() {
        let score = model().score(&ConfidenceInputs {
            format_valid: true,
            deliverability: Some(DeliverabilityState::Unknown),
            disposable: None,
            role_likely: None,
        });
        // 0.25 + 0.5 * (0.35 + 0.25 + 0.15)
        assert!(approx(score, 0.625));
    }

    #[test]
    fn test_invalid_disposable_role_scores_low() {
        let score = model().score(&ConfidenceInputs {
            format_valid: false,
            deliverability: None,
            disposable: Some(true),
            role_likely: Some(true),
        });
        assert!(approx(score, 0.175));
    }

    #[test]
    fn test_draft_is_scored_on_finish() {
        let mut draft = ReportDraft::new(Identifier::phone("+94771234567"));
        draft.seed_valid = true;
        draft.issue("breaches", "source unavailable");
        let report = draft.finish(&model());

        assert!(approx(report.confidence(), 0.625));
        assert!(approx(model().score_report(&report), report.confidence()));
        assert_eq!(report.issues()[0].field, "breaches");
        assert!(report.breaches().is_none());
    }

    #[test]
    fn test_report_serializes_with_stable_field_names() {
        let report = ReportDraft::new(Identifier::name("Jane Doe")).finish(&model());
        let json = serde_json::to_value(&report).unwrap();
        for field in [
            "seed",
            "candidates",
            "classifications",
            "deliverability",
            "breaches",
            "confidence",
            "generated_at",
            "issues",
        ] {
            assert!(json.get(field).is_some(), "missing field {}", field);
        }
        assert_eq!(json["seed"]["kind"], "name");
    }
}
