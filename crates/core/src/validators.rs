//! Field validators. Each one is pure and idempotent: feeding its normalized
//! output back in yields the same value.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::taxonomy::TechTaxonomy;

pub const MIN_YEARS_EXPERIENCE: u32 = 0;
pub const MAX_YEARS_EXPERIENCE: u32 = 50;
pub const MIN_PHONE_DIGITS: usize = 10;
pub const MAX_PHONE_DIGITS: usize = 15;
pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_ROLE_CHARS: usize = 80;

static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();
static NUMBER_RE: OnceLock<Option<Regex>> = OnceLock::new();
static PHONE_RE: OnceLock<Option<Regex>> = OnceLock::new();
static LIST_SEPARATOR_RE: OnceLock<Option<Regex>> = OnceLock::new();
static NAME_PREFIX_RE: OnceLock<Option<Regex>> = OnceLock::new();
static TECH_FILLER_RE: OnceLock<Option<Regex>> = OnceLock::new();

const IGNORED_LIST_TOKENS: [&str; 4] = ["etc", "etc.", "others", "more"];

#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationFailure {
    #[error("no value was given")]
    EmptyInput,
    #[error("name must contain letters only and be 2 to 100 characters")]
    InvalidName,
    #[error("email address is not well formed")]
    InvalidEmailFormat,
    #[error("phone number has {digits} digits; expected 10 to 15")]
    InvalidPhoneNumber { digits: usize },
    #[error("value is not a number")]
    NotANumber,
    #[error("years of experience must be between {min} and {max}")]
    OutOfRangeExperience { min: u32, max: u32 },
    #[error("no desired role was given")]
    NoRolesGiven,
    #[error("role description is longer than 80 characters")]
    RoleTooLong,
    #[error("unknown technologies: {}", tokens.join(", "))]
    UnknownTechnology { tokens: Vec<String> },
}

/// Outcome of tech-stack validation: resolved tokens are kept even when
/// others fail, so the caller can ask only for the unresolved ones.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechStackValidation {
    /// Canonical names, deduplicated, in first-mention order.
    pub accepted: Vec<String>,
    pub unresolved: Vec<String>,
}

impl TechStackValidation {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    pub fn failure(&self) -> Option<ValidationFailure> {
        if self.unresolved.is_empty() {
            None
        } else {
            Some(ValidationFailure::UnknownTechnology { tokens: self.unresolved.clone() })
        }
    }
}

fn pattern(cell: &'static OnceLock<Option<Regex>>, source: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(source).ok()).as_ref()
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn validate_name(input: &str) -> Result<String, ValidationFailure> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationFailure::EmptyInput);
    }

    let without_prefix = match pattern(
        &NAME_PREFIX_RE,
        r"(?i)^(?:my\s+(?:full\s+)?name\s+is|my\s+name's|i'm|i\s+am|this\s+is|it's|name\s*:)\s+",
    ) {
        Some(prefix) => prefix.replace(trimmed, "").into_owned(),
        None => trimmed.to_owned(),
    };
    let name = collapse_whitespace(without_prefix.trim_end_matches(['.', '!', ',']));

    let length = name.chars().count();
    let allowed = name
        .chars()
        .all(|c| c.is_alphabetic() || matches!(c, ' ' | '\'' | '-' | '.'));
    let has_letter = name.chars().any(char::is_alphabetic);

    if !(2..=MAX_NAME_CHARS).contains(&length) || !allowed || !has_letter {
        return Err(ValidationFailure::InvalidName);
    }
    Ok(name)
}

/// Accepts `local@domain.tld`, also when embedded in a short sentence.
pub fn validate_email(input: &str) -> Result<String, ValidationFailure> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationFailure::InvalidEmailFormat);
    }

    let candidate = trimmed
        .split_whitespace()
        .find(|token| token.contains('@'))
        .unwrap_or(trimmed)
        .trim_matches(|c: char| matches!(c, '<' | '>' | '(' | ')' | ',' | ';' | '"' | '\''))
        .trim_end_matches(['.', '!', '?']);

    let email_re = pattern(&EMAIL_RE, r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .ok_or(ValidationFailure::InvalidEmailFormat)?;
    if !email_re.is_match(candidate) {
        return Err(ValidationFailure::InvalidEmailFormat);
    }
    Ok(candidate.to_lowercase())
}

/// Normalizes to digits only. Separators and a leading `+` are dropped. The
/// first phone-shaped run is used, so trailing notes such as "ext 2" are ignored.
pub fn validate_phone(input: &str) -> Result<String, ValidationFailure> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationFailure::EmptyInput);
    }

    let phone_re = pattern(&PHONE_RE, r"\+?\d(?:[\d .()-]*\d)?")
        .ok_or(ValidationFailure::InvalidPhoneNumber { digits: 0 })?;
    let Some(found) = phone_re.find(trimmed) else {
        return Err(ValidationFailure::InvalidPhoneNumber { digits: 0 });
    };

    let number = found.as_str();
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    let glued_to_text = trimmed[found.end()..].starts_with(|c: char| c.is_alphabetic())
        || trimmed[..found.start()].ends_with(|c: char| c.is_alphanumeric() || c == '(');

    let count = digits.len();
    if glued_to_text
        || !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&count)
        || digits.starts_with('0')
    {
        return Err(ValidationFailure::InvalidPhoneNumber { digits: count });
    }
    Ok(digits)
}

/// Reads the first number in the reply, so "3", "3.5" and "3 years" all parse.
pub fn validate_years_experience(input: &str) -> Result<f64, ValidationFailure> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationFailure::EmptyInput);
    }

    let number_re =
        pattern(&NUMBER_RE, r"-?\d+(?:\.\d+)?").ok_or(ValidationFailure::NotANumber)?;
    let value = number_re
        .find(trimmed)
        .and_then(|found| found.as_str().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .ok_or(ValidationFailure::NotANumber)?;

    if value < f64::from(MIN_YEARS_EXPERIENCE) || value > f64::from(MAX_YEARS_EXPERIENCE) {
        return Err(ValidationFailure::OutOfRangeExperience {
            min: MIN_YEARS_EXPERIENCE,
            max: MAX_YEARS_EXPERIENCE,
        });
    }
    Ok(value)
}

pub fn validate_desired_roles(input: &str) -> Result<Vec<String>, ValidationFailure> {
    if input.trim().is_empty() {
        return Err(ValidationFailure::EmptyInput);
    }

    let mut roles: Vec<String> = Vec::new();
    for token in split_list(input) {
        let role = collapse_whitespace(token.trim_matches(|c: char| matches!(c, '.' | '!' | '"')));
        if role.is_empty() || IGNORED_LIST_TOKENS.contains(&role.to_lowercase().as_str()) {
            continue;
        }
        if role.chars().count() > MAX_ROLE_CHARS {
            return Err(ValidationFailure::RoleTooLong);
        }
        if !roles.iter().any(|existing| existing.eq_ignore_ascii_case(&role)) {
            roles.push(role);
        }
    }

    if roles.is_empty() {
        return Err(ValidationFailure::NoRolesGiven);
    }
    Ok(roles)
}

/// Splits free text into technology tokens and resolves each against the taxonomy.
/// A chunk that names a technology as a whole (`PL/SQL`) is kept intact; otherwise
/// `/` separates alternatives such as `Golang / Postgres`.
pub fn validate_tech_stack(
    input: &str,
    taxonomy: &TechTaxonomy,
) -> Result<TechStackValidation, ValidationFailure> {
    let mut result = TechStackValidation::default();

    let whole = strip_tech_filler(input.trim());
    let chunks = if taxonomy.lookup(&whole).is_some() { vec![whole] } else { split_list(input) };

    let mut tokens = Vec::new();
    for chunk in chunks {
        let chunk = strip_tech_filler(chunk.trim());
        if chunk.contains('/') && taxonomy.lookup(&chunk).is_none() {
            tokens.extend(chunk.split('/').map(|part| strip_tech_filler(part.trim())));
        } else {
            tokens.push(chunk);
        }
    }

    for token in tokens {
        if token.is_empty() || IGNORED_LIST_TOKENS.contains(&token.to_lowercase().as_str()) {
            continue;
        }
        match taxonomy.lookup(&token) {
            Some(entry) => {
                if !result.accepted.contains(&entry.canonical_name) {
                    result.accepted.push(entry.canonical_name.clone());
                }
            }
            None => {
                if !result.unresolved.iter().any(|seen| seen.eq_ignore_ascii_case(&token)) {
                    result.unresolved.push(token);
                }
            }
        }
    }

    if result.accepted.is_empty() && result.unresolved.is_empty() {
        return Err(ValidationFailure::EmptyInput);
    }
    Ok(result)
}

/// Splits on `,` `;` `|` `&`, newlines, and the word "and".
pub fn split_list(input: &str) -> Vec<String> {
    match pattern(&LIST_SEPARATOR_RE, r"(?i)\s*(?:[,;|&\n]|\band\b)\s*") {
        Some(separator) => separator
            .split(input)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_owned)
            .collect(),
        None => input
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_owned)
            .collect(),
    }
}

fn strip_tech_filler(token: &str) -> String {
    let stripped = match pattern(
        &TECH_FILLER_RE,
        r"(?i)^(?:i\s+(?:mostly\s+|mainly\s+|also\s+)?(?:use|know|work\s+with|have\s+used)\s+|mostly\s+|mainly\s+|also\s+|some\s+|a\s+bit\s+of\s+)",
    ) {
        Some(filler) => filler.replace(token, "").into_owned(),
        None => token.to_owned(),
    };
    collapse_whitespace(stripped.trim_end_matches(['.', '!']))
}
