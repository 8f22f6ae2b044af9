//! Phone number normalization against an injectable region table
//!
//! Numbers are accepted either in international form (`+` and a calling code
//! from the table) or in national form with a leading zero, in which case the
//! default region's calling code is substituted for the zero.

use crate::config::{PhoneConfig, PrefixRule, RegionConfig};
use crate::identifier::{strip_phone, Identifier, IdentifierKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Numbering-plan classification of a number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberType {
    FixedLine,
    Mobile,
    FixedOrMobile,
    TollFree,
    PremiumRate,
    SharedCost,
    Voip,
    Personal,
    Pager,
    Uan,
    VoiceMail,
    #[default]
    Unknown,
}

impl fmt::Display for NumberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NumberType::FixedLine => "Fixed Line",
            NumberType::Mobile => "Mobile",
            NumberType::FixedOrMobile => "Fixed Line or Mobile",
            NumberType::TollFree => "Toll Free",
            NumberType::PremiumRate => "Premium Rate",
            NumberType::SharedCost => "Shared Cost",
            NumberType::Voip => "VoIP",
            NumberType::Personal => "Personal Number",
            NumberType::Pager => "Pager",
            NumberType::Uan => "UAN",
            NumberType::VoiceMail => "Voicemail",
            NumberType::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    #[error("Invalid phone format: {0}")]
    InvalidPhoneFormat(String),
    #[error("Unsupported region: {0}")]
    UnsupportedRegion(String),
}

/// A number resolved against the region table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneInfo {
    pub raw: String,
    /// Canonical `+<calling code><national number>` form
    pub e164: String,
    pub region_code: String,
    pub region_name: String,
    pub calling_code: String,
    /// National significant number (digits after the calling code)
    pub national_number: String,
    pub national_format: String,
    pub number_type: NumberType,
    pub carrier: Option<String>,
    /// IANA zones of the region, in configured order
    pub timezones: Vec<String>,
}

impl PhoneInfo {
    pub fn identifier(&self) -> Identifier {
        Identifier {
            kind: IdentifierKind::Phone,
            raw: self.raw.clone(),
            normalized: self.e164.clone(),
        }
    }
}

pub struct PhoneNormalizer {
    regions: Vec<RegionConfig>,
    default_region: Option<String>,
}

impl PhoneNormalizer {
    pub fn new(config: &PhoneConfig) -> Self {
        debug!(
            "Phone normalizer initialized with {} regions (default: {:?})",
            config.regions.len(),
            config.default_region
        );
        Self {
            regions: config.regions.clone(),
            default_region: config.default_region.clone(),
        }
    }

    /// Normalize `raw` to E.164 and classify it
    ///
    /// # Arguments
    /// * `raw` - Number as typed; separators are ignored
    /// * `default_region` - Region for leading-zero national numbers,
    ///   overriding the configured default
    pub fn normalize(
        &self,
        raw: &str,
        default_region: Option<&str>,
    ) -> Result<PhoneInfo, PhoneError> {
        let stripped = strip_phone(raw);
        if !stripped.chars().any(|c| c.is_ascii_digit()) {
            return Err(PhoneError::InvalidPhoneFormat("no digits".to_string()));
        }
        if stripped[1..].contains('+') {
            return Err(PhoneError::InvalidPhoneFormat("misplaced '+'".to_string()));
        }

        let (region, national) = if let Some(international) = stripped.strip_prefix('+') {
            let region = self.region_for_number(international).ok_or_else(|| {
                PhoneError::UnsupportedRegion(format!(
                    "no region for calling code of +{}",
                    international
                ))
            })?;
            (region, &international[region.calling_code.len()..])
        } else if let Some(national) = stripped.strip_prefix('0') {
            let code = default_region
                .or(self.default_region.as_deref())
                .ok_or_else(|| {
                    PhoneError::InvalidPhoneFormat(
                        "national number without a default region".to_string(),
                    )
                })?;
            let region = self
                .region(code)
                .ok_or_else(|| PhoneError::UnsupportedRegion(code.to_string()))?;
            (region, national)
        } else {
            return Err(PhoneError::InvalidPhoneFormat(
                "expected '+' and a country calling code".to_string(),
            ));
        };

        if !(region.min_length..=region.max_length).contains(&national.len()) {
            return Err(PhoneError::InvalidPhoneFormat(format!(
                "{} digits outside {}..={} for {}",
                national.len(),
                region.min_length,
                region.max_length,
                region.code
            )));
        }

        let (number_type, carrier) = classify(region, national);
        let info = PhoneInfo {
            raw: raw.to_string(),
            e164: format!("+{}{}", region.calling_code, national),
            region_code: region.code.clone(),
            region_name: region.name.clone(),
            calling_code: region.calling_code.clone(),
            national_number: national.to_string(),
            national_format: format!(
                "{}{}",
                region.national_prefix.as_deref().unwrap_or(""),
                national
            ),
            number_type,
            carrier,
            timezones: region.timezones.clone(),
        };

        debug!(
            "Phone normalized: region={}, type={}, digits={}",
            info.region_code,
            info.number_type,
            national.len()
        );
        Ok(info)
    }

    fn region(&self, code: &str) -> Option<&RegionConfig> {
        self.regions
            .iter()
            .find(|r| r.code.eq_ignore_ascii_case(code))
    }

    /// Longest calling code that prefixes `digits`; first configured wins ties
    fn region_for_number(&self, digits: &str) -> Option<&RegionConfig> {
        let mut best: Option<&RegionConfig> = None;
        for region in &self.regions {
            if !digits.starts_with(region.calling_code.as_str()) {
                continue;
            }
            if best.map_or(true, |b| region.calling_code.len() > b.calling_code.len()) {
                best = Some(region);
            }
        }
        best
    }
}

/// Longest matching prefix rule, else the region's fallback type
fn classify(region: &RegionConfig, national: &str) -> (NumberType, Option<String>) {
    region
        .prefixes
        .iter()
        .filter(|rule| national.starts_with(rule.prefix.as_str()))
        .fold(None, |best: Option<&PrefixRule>, rule| match best {
            Some(b) if b.prefix.len() >= rule.prefix.len() => Some(b),
            _ => Some(rule),
        })
        .map(|rule| (rule.number_type, rule.carrier.clone()))
        .unwrap_or((region.fallback_type, None))
}
