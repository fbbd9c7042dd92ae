//! Resolves raw search terms to the lookup index that should serve them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Caller-supplied hint describing what kind of identifier a search term is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchCriteria {
    #[default]
    All,
    SystemNumber,
    Vin,
    PartialVin,
    Vrm,
    TrailerId,
}

impl SearchCriteria {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "systemnumber" => Some(Self::SystemNumber),
            "vin" => Some(Self::Vin),
            "partialvin" => Some(Self::PartialVin),
            "vrm" => Some(Self::Vrm),
            "trailerid" => Some(Self::TrailerId),
            _ => None,
        }
    }

    /// Explicit criteria map straight onto a strategy; `All` defers to classification.
    pub const fn explicit_strategy(self) -> Option<LookupStrategy> {
        match self {
            Self::All => None,
            Self::SystemNumber => Some(LookupStrategy::SystemNumber),
            Self::Vin => Some(LookupStrategy::Vin),
            Self::PartialVin => Some(LookupStrategy::PartialVin),
            Self::Vrm => Some(LookupStrategy::Vrm),
            Self::TrailerId => Some(LookupStrategy::TrailerId),
        }
    }
}

/// Index the record store is queried through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LookupStrategy {
    SystemNumber,
    Vin,
    PartialVin,
    Vrm,
    TrailerId,
}

impl LookupStrategy {
    pub const fn label(self) -> &'static str {
        match self {
            Self::SystemNumber => "systemNumber",
            Self::Vin => "vin",
            Self::PartialVin => "partialVin",
            Self::Vrm => "vrm",
            Self::TrailerId => "trailerId",
        }
    }
}

impl fmt::Display for LookupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const PARTIAL_VIN_SYMBOLS: [char; 5] = [' ', '/', '\\', '*', '-'];

/// Picks the lookup strategy for `term`.
///
/// Explicit hints win regardless of the term's shape. Otherwise the first matching rule
/// applies: nine or more characters is a VIN, then the trailer ID shapes, then a six
/// character partial VIN, then a three to eight character VRM. An eight digit term fits both
/// the trailer ID and VRM shapes and resolves to a trailer ID. `None` means the term cannot
/// be searched.
pub fn classify(term: &str, hint: Option<SearchCriteria>) -> Option<LookupStrategy> {
    if let Some(strategy) = hint.and_then(SearchCriteria::explicit_strategy) {
        return Some(strategy);
    }

    let length = term.chars().count();
    if length >= 9 {
        return Some(LookupStrategy::Vin);
    }
    if is_trailer_id(term) {
        return Some(LookupStrategy::TrailerId);
    }
    if length == 6
        && term
            .chars()
            .all(|c| c.is_ascii_digit() || PARTIAL_VIN_SYMBOLS.contains(&c))
    {
        return Some(LookupStrategy::PartialVin);
    }
    if (3..=8).contains(&length) {
        return Some(LookupStrategy::Vrm);
    }
    None
}

/// Trailer IDs are either eight digits or one letter followed by six digits.
pub fn is_trailer_id(term: &str) -> bool {
    let chars: Vec<char> = term.chars().collect();
    match chars.as_slice() {
        digits if digits.len() == 8 => digits.iter().all(char::is_ascii_digit),
        [letter, digits @ ..] if digits.len() == 6 => {
            letter.is_ascii_alphabetic() && digits.iter().all(char::is_ascii_digit)
        }
        _ => false,
    }
}

/// Trims and upper-cases a search term before classification.
pub fn normalize_term(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}
