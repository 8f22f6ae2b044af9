//! Deterministic candidate identifiers derived from a name or phone number
//!
//! Each mode is a fixed, ordered rule list. Rule order decides output order,
//! and duplicates are dropped keeping the first occurrence.

use crate::config::CandidateConfig;
use crate::identifier::Identifier;
use crate::phone::PhoneInfo;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// A generated, unverified guess at a real identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub value: String,
    pub rule_id: String,
    pub source: Identifier,
}

/// First and last name tokens plus the domain candidates are appended to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameSeed {
    pub raw: String,
    pub first: String,
    pub last: String,
    pub domain: String,
}

impl NameSeed {
    pub fn new(first: &str, last: &str, domain: &str) -> Self {
        Self {
            raw: format!("{} {}", first.trim(), last.trim()).trim().to_string(),
            first: sanitize_token(first),
            last: sanitize_token(last),
            domain: domain.trim().to_lowercase(),
        }
    }

    /// Split a full name into its first and last token; middle names are dropped
    pub fn from_full_name(full_name: &str, domain: &str) -> Self {
        let tokens: Vec<&str> = full_name.split_whitespace().collect();
        let first = tokens.first().copied().unwrap_or("");
        let last = if tokens.len() > 1 {
            tokens.last().copied().unwrap_or("")
        } else {
            ""
        };

        Self {
            raw: full_name.to_string(),
            first: sanitize_token(first),
            last: sanitize_token(last),
            domain: domain.trim().to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSeed {
    Name(NameSeed),
    Phone(PhoneInfo),
}

impl CandidateSeed {
    pub fn identifier(&self) -> Identifier {
        match self {
            CandidateSeed::Name(seed) => Identifier::name(seed.raw.as_str()),
            CandidateSeed::Phone(info) => info.identifier(),
        }
    }
}

type NameRule = fn(&str, &str) -> Option<String>;

/// Name+domain rules in output order; `None` when a required token is empty
const NAME_RULES: &[(&str, NameRule)] = &[
    ("first.last", |f, l| both(f, l).then(|| format!("{}.{}", f, l))),
    ("flast", |f, l| both(f, l).then(|| format!("{}{}", initial(f), l))),
    ("firstlast", |f, l| both(f, l).then(|| format!("{}{}", f, l))),
    ("first_last", |f, l| both(f, l).then(|| format!("{}_{}", f, l))),
    ("firstl", |f, l| both(f, l).then(|| format!("{}{}", f, initial(l)))),
    ("last.first", |f, l| both(f, l).then(|| format!("{}.{}", l, f))),
    ("lastfirst", |f, l| both(f, l).then(|| format!("{}{}", l, f))),
    ("f.last", |f, l| both(f, l).then(|| format!("{}.{}", initial(f), l))),
    ("first", |f, _| (!f.is_empty()).then(|| f.to_string())),
    ("first123", |f, _| (!f.is_empty()).then(|| format!("{}123", f))),
    ("first.official", |f, _| (!f.is_empty()).then(|| format!("{}.official", f))),
    ("contact.first", |f, _| (!f.is_empty()).then(|| format!("contact.{}", f))),
];

/// Username rules in output order
const USERNAME_RULES: &[(&str, NameRule)] = &[
    ("first.last", |f, l| both(f, l).then(|| format!("{}.{}", f, l))),
    ("first_last", |f, l| both(f, l).then(|| format!("{}_{}", f, l))),
    ("firstlast", |f, l| both(f, l).then(|| format!("{}{}", f, l))),
    ("flast", |f, l| both(f, l).then(|| format!("{}{}", initial(f), l))),
    ("firstl", |f, l| both(f, l).then(|| format!("{}{}", f, initial(l)))),
    ("lastfirst", |f, l| both(f, l).then(|| format!("{}{}", l, f))),
    ("first", |f, _| (!f.is_empty()).then(|| f.to_string())),
];

fn both(first: &str, last: &str) -> bool {
    !first.is_empty() && !last.is_empty()
}

fn initial(token: &str) -> &str {
    token
        .char_indices()
        .nth(1)
        .map_or(token, |(end, _)| &token[..end])
}

/// Lower-case, fold accented Latin letters and keep ASCII letters and digits
///
/// A token holding any other letter is dropped whole rather than emitted
/// with letters missing.
fn sanitize_token(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    for c in token.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if let Some(folded) = fold_latin(c) {
            out.push_str(folded);
        } else if c.is_alphabetic() {
            return String::new();
        }
    }
    out
}

fn fold_latin(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'ç' | 'ć' | 'č' => "c",
        'ď' | 'đ' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'ğ' => "g",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => "i",
        'ł' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'ř' => "r",
        'ś' | 'š' | 'ş' => "s",
        'ť' | 'ţ' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        _ => return None,
    };
    Some(folded)
}

pub struct CandidateGenerator {
    config: CandidateConfig,
}

impl CandidateGenerator {
    pub fn new(config: &CandidateConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Generate candidates for a seed; pure and stable across calls
    pub fn generate_candidates(&self, seed: &CandidateSeed) -> Vec<Candidate> {
        let source = seed.identifier();
        let raw = match seed {
            CandidateSeed::Name(name) => name_candidates(name),
            CandidateSeed::Phone(info) => self.phone_candidates(info),
        };

        let candidates = dedup(
            raw.into_iter()
                .map(|(rule_id, value)| Candidate {
                    value,
                    rule_id,
                    source: source.clone(),
                })
                .collect(),
        );

        debug!(
            "Generated {} candidate(s) for {} seed",
            candidates.len(),
            source.kind
        );
        candidates
    }

    /// Username guesses for a name; same ordering and dedup contract
    pub fn generate_usernames(&self, seed: &NameSeed) -> Vec<String> {
        let mut seen = HashSet::new();
        USERNAME_RULES
            .iter()
            .filter_map(|(_, rule)| rule(&seed.first, &seed.last))
            .filter(|u| seen.insert(u.clone()))
            .collect()
    }

    fn phone_candidates(&self, info: &PhoneInfo) -> Vec<(String, String)> {
        let local = local_digits(info);
        if local.is_empty() {
            return Vec::new();
        }

        let mut out: Vec<(String, String)> = self
            .config
            .phone_providers
            .iter()
            .map(|domain| ("local_digits".to_string(), format!("{}@{}", local, domain)))
            .collect();

        let prefix_len = self.config.prefix_digits;
        if local.len() >= prefix_len {
            out.push((
                format!("prefix{}", prefix_len),
                format!("{}@{}", &local[..prefix_len], self.config.prefix_domain),
            ));
        }

        for rule in &self.config.suffix_rules {
            if local.len() < rule.digits {
                continue;
            }
            let suffix = &local[local.len() - rule.digits..];
            out.push((
                format!("suffix{}_{}", rule.digits, rule.label),
                format!("{}{}@{}", rule.label, suffix, rule.domain),
            ));
        }

        out
    }
}

fn name_candidates(seed: &NameSeed) -> Vec<(String, String)> {
    if seed.domain.is_empty() {
        debug!("Name seed without a domain, no email candidates");
        return Vec::new();
    }

    NAME_RULES
        .iter()
        .filter_map(|(id, rule)| {
            rule(&seed.first, &seed.last)
                .map(|local| (id.to_string(), format!("{}@{}", local, seed.domain)))
        })
        .collect()
}

/// E.164 form with the calling code removed
fn local_digits(info: &PhoneInfo) -> String {
    info.e164
        .strip_prefix('+')
        .and_then(|digits| digits.strip_prefix(info.calling_code.as_str()))
        .unwrap_or(info.national_number.as_str())
        .to_string()
}

/// Stable dedup keyed on the lower-cased value
fn dedup(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.value.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconConfig;
    use crate::phone::PhoneNormalizer;
    use pretty_assertions::assert_eq;

    fn generator() -> CandidateGenerator {
        CandidateGenerator::new(&ReconConfig::builtin().unwrap().candidates)
    }

    fn values(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.value.as_str()).collect()
    }

    #[test]
    fn test_name_rules_in_order() {
        let seed = CandidateSeed::Name(NameSeed::new("john", "smith", "acme.com"));
        let candidates = generator().generate_candidates(&seed);
        assert_eq!(
            values(&candidates),
            vec![
                "john.smith@acme.com",
                "jsmith@acme.com",
                "johnsmith@acme.com",
                "john_smith@acme.com",
                "johns@acme.com",
                "smith.john@acme.com",
                "smithjohn@acme.com",
                "j.smith@acme.com",
                "john@acme.com",
                "john123@acme.com",
                "john.official@acme.com",
                "contact.john@acme.com",
            ]
        );
        assert_eq!(candidates[1].rule_id, "flast");
        assert_eq!(candidates[0].source, Identifier::name("john smith"));
    }

    #[test]
    fn test_generation_is_stable() {
        let g = generator();
        let seed = CandidateSeed::Name(NameSeed::from_full_name("John Smith", "ACME.com"));
        assert_eq!(g.generate_candidates(&seed), g.generate_candidates(&seed));
    }

    #[test]
    fn test_missing_last_name_skips_rules() {
        let seed = CandidateSeed::Name(NameSeed::from_full_name("Madonna", "acme.com"));
        assert_eq!(
            values(&generator().generate_candidates(&seed)),
            vec![
                "madonna@acme.com",
                "madonna123@acme.com",
                "madonna.official@acme.com",
                "contact.madonna@acme.com",
            ]
        );
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        // Single-letter names collapse several rules onto the same value
        let seed = CandidateSeed::Name(NameSeed::new("a", "b", "x.io"));
        let candidates = generator().generate_candidates(&seed);
        assert_eq!(
            values(&candidates),
            vec![
                "a.b@x.io",
                "ab@x.io",
                "a_b@x.io",
                "b.a@x.io",
                "ba@x.io",
                "a@x.io",
                "a123@x.io",
                "a.official@x.io",
                "contact.a@x.io",
            ]
        );
        assert_eq!(candidates[1].rule_id, "flast");
    }

    #[test]
    fn test_full_name_tokens_are_sanitized() {
        let seed = NameSeed::from_full_name("  Mary-Jane  van  O'Neil ", "acme.com");
        assert_eq!(seed.first, "maryjane");
        assert_eq!(seed.last, "oneil");
    }

    #[test]
    fn test_accented_names_are_folded() {
        let seed = NameSeed::from_full_name("José Müller", "acme.com");
        assert_eq!(seed.first, "jose");
        assert_eq!(seed.last, "muller");

        let seed = NameSeed::new("ZOË", "Ångström", "acme.com");
        assert_eq!(seed.first, "zoe");
        assert_eq!(seed.last, "angstrom");

        let candidates = generator().generate_candidates(&CandidateSeed::Name(
            NameSeed::from_full_name("José Müller", "acme.com"),
        ));
        assert_eq!(candidates[0].value, "jose.muller@acme.com");
    }

    #[test]
    fn test_unfoldable_tokens_are_dropped_whole() {
        let seed = NameSeed::from_full_name("Dmitri Иванов", "acme.com");
        assert_eq!(seed.first, "dmitri");
        assert_eq!(seed.last, "");

        let seed = NameSeed::from_full_name("Đặng Thu", "acme.com");
        assert_eq!(seed.first, "");
        assert_eq!(seed.last, "thu");
    }

    #[test]
    fn test_name_without_domain_yields_nothing() {
        let seed = CandidateSeed::Name(NameSeed::new("john", "smith", ""));
        assert!(generator().generate_candidates(&seed).is_empty());
    }

    #[test]
    fn test_phone_rules() {
        let config = ReconConfig::builtin().unwrap();
        let info = PhoneNormalizer::new(&config.phone)
            .normalize("+94 77 123 4567", None)
            .unwrap();
        let candidates = generator().generate_candidates(&CandidateSeed::Phone(info));
        assert_eq!(
            values(&candidates),
            vec![
                "771234567@gmail.com",
                "771234567@yahoo.com",
                "7712345@outlook.com",
                "whatsapp234567@protonmail.com",
                "contact4567@email.com",
                "user567@gmail.com",
            ]
        );
        assert_eq!(candidates[0].source.normalized, "+94771234567");
        assert_eq!(candidates[2].rule_id, "prefix7");
        assert_eq!(candidates[5].rule_id, "suffix3_user");
    }

    #[test]
    fn test_usernames() {
        let g = generator();
        assert_eq!(
            g.generate_usernames(&NameSeed::new("John", "Smith", "")),
            vec!["john.smith", "john_smith", "johnsmith", "jsmith", "johns", "smithjohn", "john"]
        );
        assert_eq!(
            g.generate_usernames(&NameSeed::from_full_name("Cher", "")),
            vec!["cher"]
        );
    }
}
