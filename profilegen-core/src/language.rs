//! Conversions between the language-tag conventions used by the target schemas.
//!
//! Ladder files carry three-letter codes. Live encoder profiles want them
//! lowercased, transcode profile audio tracks want an RFC 5646 primary subtag
//! and transcode caption tracks want an uppercase ISO 639-2 code.

use isolang::Language;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LanguageError {
    #[error("language code must be defined")]
    Empty,
    #[error("language code {0:?} must be exactly 3 characters")]
    Length(String),
    #[error("language code {0:?} must contain only letters and numbers")]
    Characters(String),
    #[error("language code {0:?} has no known ISO 639 mapping")]
    Unmapped(String),
}

pub type LanguageResult<T> = std::result::Result<T, LanguageError>;

/// ISO 639-2/B codes and the terminology code each one stands for.
const BIBLIOGRAPHIC: &[(&str, &str)] = &[
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("dut", "nld"),
    ("fre", "fra"),
    ("geo", "kat"),
    ("ger", "deu"),
    ("gre", "ell"),
    ("ice", "isl"),
    ("mac", "mkd"),
    ("mao", "mri"),
    ("may", "msa"),
    ("per", "fas"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("tib", "bod"),
    ("wel", "cym"),
];

/// ISO 639-2 collective and special codes, which ISO 639-3 leaves out or
/// only partly covers.
const COLLECTIVE: &[(&str, Option<&str>)] = &[
    ("afa", None),
    ("alg", None),
    ("apa", None),
    ("art", None),
    ("ath", None),
    ("aus", None),
    ("bad", None),
    ("bai", None),
    ("bat", None),
    ("ber", None),
    ("bih", Some("bh")),
    ("bnt", None),
    ("btk", None),
    ("cai", None),
    ("cau", None),
    ("cel", None),
    ("cmc", None),
    ("cpe", None),
    ("cpf", None),
    ("cpp", None),
    ("crp", None),
    ("cus", None),
    ("day", None),
    ("dra", None),
    ("fiu", None),
    ("gem", None),
    ("ijo", None),
    ("inc", None),
    ("ine", None),
    ("ira", None),
    ("iro", None),
    ("kar", None),
    ("khi", None),
    ("kro", None),
    ("map", None),
    ("mis", None),
    ("mkh", None),
    ("mno", None),
    ("mul", None),
    ("mun", None),
    ("myn", None),
    ("nah", None),
    ("nai", None),
    ("nic", None),
    ("nub", None),
    ("oto", None),
    ("paa", None),
    ("phi", None),
    ("pra", None),
    ("roa", None),
    ("sai", None),
    ("sal", None),
    ("sem", None),
    ("sgn", None),
    ("sio", None),
    ("sit", None),
    ("sla", None),
    ("smi", None),
    ("son", None),
    ("ssa", None),
    ("tai", None),
    ("tup", None),
    ("und", None),
    ("wak", None),
    ("wen", None),
    ("ypk", None),
    ("znd", None),
    ("zxx", None),
];

/// A resolved language: terminology code plus the ISO 639-1 subtag when one
/// is assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LanguageEntry {
    terminology: &'static str,
    alpha2: Option<&'static str>,
}

impl From<Language> for LanguageEntry {
    fn from(language: Language) -> Self {
        Self {
            terminology: language.to_639_3(),
            alpha2: language.to_639_1(),
        }
    }
}

/// Validates a ladder language code and returns it lowercased.
///
/// Any three alphanumeric characters are accepted here, including codes that
/// are not in the ISO table (`123`); the stricter conversions reject those.
pub fn to_lowercase_code(code: &str) -> LanguageResult<String> {
    if code.is_empty() {
        return Err(LanguageError::Empty);
    }
    if code.chars().count() != 3 {
        return Err(LanguageError::Length(code.to_string()));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(LanguageError::Characters(code.to_string()));
    }
    Ok(code.to_ascii_lowercase())
}

/// Converts a three-letter code to an RFC 5646 primary language subtag.
///
/// Languages with an ISO 639-1 code use it (`eng` -> `en`); the rest keep
/// their three-letter code, which is itself a valid subtag (`haw`).
pub fn to_rfc5646(code: &str) -> LanguageResult<String> {
    let entry = lookup(code)?;
    Ok(entry.alpha2.unwrap_or(entry.terminology).to_string())
}

/// Converts a three-letter code or a two-letter subtag to uppercase ISO 639-2.
///
/// Three-letter input keeps its own spelling (`GER` stays `GER`); subtags map
/// to the terminology code (`de` -> `DEU`).
pub fn to_iso639_2(code: &str) -> LanguageResult<String> {
    let entry = lookup(code)?;
    if code.len() == 3 {
        Ok(code.to_ascii_uppercase())
    } else {
        Ok(entry.terminology.to_ascii_uppercase())
    }
}

/// Inverse of [`to_rfc5646`]: returns the lowercase ISO 639-2/T code.
pub fn from_rfc5646(tag: &str) -> LanguageResult<String> {
    let primary = tag.split('-').next().unwrap_or_default();
    Ok(lookup(primary)?.terminology.to_string())
}

fn lookup(code: &str) -> LanguageResult<LanguageEntry> {
    if code.is_empty() {
        return Err(LanguageError::Empty);
    }
    let normalized = code.to_ascii_lowercase();
    let found = match normalized.len() {
        2 => Language::from_639_1(&normalized)
            .map(LanguageEntry::from)
            .or_else(|| collective(|(_, alpha2)| *alpha2 == Some(normalized.as_str()))),
        3 => {
            let normalized = to_lowercase_code(code)?;
            let terminology = BIBLIOGRAPHIC
                .iter()
                .find(|(bibliographic, _)| *bibliographic == normalized)
                .map(|(_, terminology)| *terminology)
                .unwrap_or(normalized.as_str());
            Language::from_639_3(terminology)
                .map(LanguageEntry::from)
                .or_else(|| collective(|(collective, _)| *collective == terminology))
        }
        _ => return Err(LanguageError::Unmapped(code.to_string())),
    };
    found.ok_or_else(|| LanguageError::Unmapped(code.to_string()))
}

fn collective<P>(predicate: P) -> Option<LanguageEntry>
where
    P: Fn(&&(&'static str, Option<&'static str>)) -> bool,
{
    COLLECTIVE
        .iter()
        .find(predicate)
        .map(|(terminology, alpha2)| LanguageEntry {
            terminology: *terminology,
            alpha2: *alpha2,
        })
}
