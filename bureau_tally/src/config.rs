// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

use crate::key::BureauKey;

/// The counts reported for one voting bureau.
///
/// Every cell may be missing in the source files. A missing value stays `None`
/// all the way to the map: it is never turned into a zero.
#[derive(PartialEq, Debug, Clone)]
pub enum TallyCounts {
    /// Raw counts, as published per district (CSV files, second round workbooks).
    Raw {
        registered: Option<f64>,
        turnout: Option<f64>,
        blank: Option<f64>,
        null: Option<f64>,
        expressed: Option<f64>,
        /// Number of votes for each candidate column, in column order.
        votes: Vec<(String, Option<f64>)>,
    },
    /// Pre-computed fractions in `[0, 1]`, as found in the consolidated workbook.
    Proportions {
        participation: Option<f64>,
        /// `Proportion_<candidate>` columns with the prefix removed, in column order.
        proportions: Vec<(String, Option<f64>)>,
    },
}

/// One row of a tally source.
#[derive(PartialEq, Debug, Clone)]
pub struct TallyRecord {
    pub key: BureauKey,
    pub counts: TallyCounts,
}

/// The display color of each political family.
///
/// The order of the entries is significant: when two families share the same
/// score, the family listed first wins.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PartyColorTable {
    pub entries: Vec<(String, String)>,
    /// Color used for a family that is not listed in the table.
    pub fallback_color: String,
}

impl PartyColorTable {
    pub fn new(entries: &[(&str, &str)], fallback_color: &str) -> PartyColorTable {
        PartyColorTable {
            entries: entries
                .iter()
                .map(|(f, c)| (f.to_string(), c.to_string()))
                .collect(),
            fallback_color: fallback_color.to_string(),
        }
    }

    pub fn position(&self, family: &str) -> Option<usize> {
        self.entries.iter().position(|(f, _)| f == family)
    }

    pub fn color_of(&self, family: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(f, _)| f == family)
            .map(|(_, c)| c.as_str())
    }

    pub fn color_or_fallback(&self, family: &str) -> String {
        self.color_of(family)
            .unwrap_or(self.fallback_color.as_str())
            .to_string()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ******** Output data structures *********

/// The summed share of all the candidates of a family, in percent.
#[derive(PartialEq, Debug, Clone)]
pub struct FamilyShare {
    pub family: String,
    /// `None` when none of the candidates of this family has a defined share.
    pub share: Option<f64>,
}

/// The family that came first in a bureau.
#[derive(PartialEq, Debug, Clone)]
pub struct Majority {
    pub family: String,
    pub score: f64,
    pub color: String,
}

/// Everything computed for a single bureau.
#[derive(PartialEq, Debug, Clone)]
pub struct BureauResults {
    /// Abstention rate in percent.
    pub abstention: Option<f64>,
    /// Share of each candidate in percent, in column order.
    pub candidate_shares: Vec<(String, Option<f64>)>,
    pub family_shares: Vec<FamilyShare>,
    pub majority: Option<Majority>,
    /// At most three (label, share) pairs, highest share first.
    pub top3: Vec<(String, f64)>,
}

/// Errors raised while interpreting the content of a tally or geometry row.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TallyError {
    /// A district or bureau field that is not a non-negative integer.
    InvalidIdentifier { district: String, bureau: String },
    /// A composite bureau field (`"7-12"`) that belongs to another district.
    MismatchedDistrict { district: u32, bureau: String },
}

impl Error for TallyError {}

impl Display for TallyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TallyError::InvalidIdentifier { district, bureau } => write!(
                f,
                "invalid bureau identifier: district {:?}, bureau {:?}",
                district, bureau
            ),
            TallyError::MismatchedDistrict { district, bureau } => write!(
                f,
                "bureau {:?} does not belong to district {}",
                bureau, district
            ),
        }
    }
}
