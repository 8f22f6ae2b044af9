//! Seed signals and their normalized identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    Email,
    Phone,
    Name,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierKind::Email => write!(f, "email"),
            IdentifierKind::Phone => write!(f, "phone"),
            IdentifierKind::Name => write!(f, "name"),
        }
    }
}

/// A partial identity signal with its normalized form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub kind: IdentifierKind,
    pub raw: String,
    pub normalized: String,
}

impl Identifier {
    pub fn email(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = normalize_email(&raw);
        Self {
            kind: IdentifierKind::Email,
            raw,
            normalized,
        }
    }

    /// Phone identifier before region resolution; `normalized` keeps only
    /// digits and `+`. The normalizer replaces it with E.164 once parsed.
    pub fn phone(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = strip_phone(&raw);
        Self {
            kind: IdentifierKind::Phone,
            raw,
            normalized,
        }
    }

    pub fn name(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = normalize_name(&raw);
        Self {
            kind: IdentifierKind::Name,
            raw,
            normalized,
        }
    }
}

pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub(crate) fn strip_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

pub(crate) fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(|token| token.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// One request to the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeedSignal {
    Email {
        raw: String,
    },
    Phone {
        raw: String,
        /// Overrides the configured default region for national numbers
        region: Option<String>,
    },
    Name {
        full_name: String,
        /// Domain the name-derived email candidates are appended to
        domain: Option<String>,
    },
}

impl SeedSignal {
    pub fn email(raw: impl Into<String>) -> Self {
        SeedSignal::Email { raw: raw.into() }
    }

    pub fn phone(raw: impl Into<String>) -> Self {
        SeedSignal::Phone {
            raw: raw.into(),
            region: None,
        }
    }

    pub fn name(full_name: impl Into<String>, domain: Option<&str>) -> Self {
        SeedSignal::Name {
            full_name: full_name.into(),
            domain: domain.map(str::to_string),
        }
    }

    pub fn kind(&self) -> IdentifierKind {
        match self {
            SeedSignal::Email { .. } => IdentifierKind::Email,
            SeedSignal::Phone { .. } => IdentifierKind::Phone,
            SeedSignal::Name { .. } => IdentifierKind::Name,
        }
    }

    pub fn identifier(&self) -> Identifier {
        match self {
            SeedSignal::Email { raw } => Identifier::email(raw.as_str()),
            SeedSignal::Phone { raw, .. } => Identifier::phone(raw.as_str()),
            SeedSignal::Name { full_name, .. } => Identifier::name(full_name.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot parse seed signal from '{0}'")]
pub struct SeedParseError(pub String);

/// Text form: `email:<addr>`, `phone:<number>`, `name:<full name>[,<domain>]`,
/// or an unprefixed value whose kind is detected from its shape.
impl FromStr for SeedSignal {
    type Err = SeedParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        if line.is_empty() {
            return Err(SeedParseError(s.to_string()));
        }

        if let Some((prefix, value)) = line.split_once(':') {
            let value = value.trim();
            match prefix.trim().to_ascii_lowercase().as_str() {
                "email" if !value.is_empty() => return Ok(SeedSignal::email(value)),
                "phone" if !value.is_empty() => return Ok(SeedSignal::phone(value)),
                "name" if !value.is_empty() => return Ok(parse_name(value)),
                "email" | "phone" | "name" => return Err(SeedParseError(s.to_string())),
                _ => {}
            }
        }

        if line.contains('@') && !line.contains(char::is_whitespace) {
            Ok(SeedSignal::email(line))
        } else if looks_like_phone(line) {
            Ok(SeedSignal::phone(line))
        } else {
            Ok(parse_name(line))
        }
    }
}

fn parse_name(value: &str) -> SeedSignal {
    match value.split_once(',') {
        Some((name, domain)) if !domain.trim().is_empty() => {
            SeedSignal::name(name.trim(), Some(domain.trim()))
        }
        Some((name, _)) => SeedSignal::name(name.trim(), None),
        None => SeedSignal::name(value, None),
    }
}

fn looks_like_phone(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit())
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | '.' | ' '))
}
