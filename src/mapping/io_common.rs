// Primitives shared by the tally readers.

use crate::mapping::*;

// Columns of the city hall exports that are not candidates. Every other
// column of a raw count file is taken as a candidate column.
pub const NON_CANDIDATE_COLUMNS: &[&str] = &[
    "ID_BVOTE",
    "SCRUTIN",
    "ANNEE",
    "TOUR",
    "DATE",
    "NUM_CIRC",
    "NUM_QUARTIER",
    "NUM_ARROND",
    "NUM_BUREAU",
    "NB_PROCU",
    "NB_INSCR",
    "NB_EMARG",
    "NB_VOTANT",
    "NB_BLANC",
    "NB_NUL",
    "NB_EXPRIM",
    "ID_BVOTE_FULL",
    "Taux_abstention",
    "Participation",
];

pub const PROPORTION_PREFIX: &str = "Proportion_";
// Misspelling found in some of the consolidated workbooks.
const MISSPELLED_PROPORTION_PREFIX: &str = "Porportion_";

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Cleans a header cell: BOM, surrounding spaces, misspelled prefix.
pub fn normalize_header(h: &str) -> String {
    let h = h.trim_start_matches('\u{feff}').trim();
    match h.strip_prefix(MISSPELLED_PROPORTION_PREFIX) {
        Some(rest) => format!("{}{}", PROPORTION_PREFIX, rest),
        None => h.to_string(),
    }
}

/// Reads a number written by a spreadsheet or a French export: decimal comma
/// and space thousand separators are accepted. Empty or non-finite is `None`.
pub fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|x| x.is_finite())
}

/// Finds the district number in names such as `Arr_7.csv` or
/// `Municipales_2020_Ardt_07_2nd_tour.xls`.
///
/// Only an `ardt` or `arr` word followed by one or two digits counts
/// (`Arr7`, `arr-12`, `Ardt 07`). Anything else gives `None`.
pub fn district_from_file_name(path: &str) -> Option<u32> {
    let lower = simplify_file_name(path).to_lowercase();
    let chars: Vec<char> = lower.chars().collect();
    let is_word = |c: Option<&char>| c.map_or(false, |c| c.is_alphanumeric());
    for start in 0..chars.len() {
        if start > 0 && is_word(chars.get(start - 1)) {
            continue;
        }
        for marker in ["ardt", "arr"] {
            let marker: Vec<char> = marker.chars().collect();
            if !chars[start..].starts_with(&marker) {
                continue;
            }
            let mut pos = start + marker.len();
            if matches!(chars.get(pos), Some('_' | ' ' | '-')) {
                pos += 1;
            }
            let digits: String = chars[pos..]
                .iter()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if (1..=2).contains(&digits.len()) && !is_word(chars.get(pos + digits.len())) {
                return digits.parse::<u32>().ok();
            }
        }
    }
    None
}

fn find_column(header: &[String], name: &str) -> Option<usize> {
    header.iter().position(|h| h == name)
}

fn require_column(header: &[String], name: &str, path: &str) -> MapResult<usize> {
    find_column(header, name).context(MissingColumnSnafu { column: name, path })
}

/// Positions of the columns of a raw count file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RawColumns {
    bureau: usize,
    district: Option<usize>,
    registered: usize,
    turnout: usize,
    blank: Option<usize>,
    null: Option<usize>,
    expressed: usize,
    candidates: Vec<(usize, String)>,
}

/// Positions of the columns of a consolidated workbook with proportions.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ProportionColumns {
    bureau: usize,
    district: usize,
    participation: usize,
    candidates: Vec<(usize, String)>,
}

/// The two layouts of the tally sources.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TallyLayout {
    Raw(RawColumns),
    Proportions(ProportionColumns),
}

impl TallyLayout {
    /// Detects the layout from a normalized header row: the presence of any
    /// `Proportion_` column selects the proportions layout.
    pub fn from_header(header: &[String], path: &str) -> MapResult<TallyLayout> {
        let proportion_cols: Vec<(usize, String)> = header
            .iter()
            .enumerate()
            .filter_map(|(idx, h)| {
                h.strip_prefix(PROPORTION_PREFIX)
                    .map(|name| (idx, name.to_string()))
            })
            .collect();
        if !proportion_cols.is_empty() {
            return Ok(TallyLayout::Proportions(ProportionColumns {
                bureau: require_column(header, "NUM_BUREAU", path)?,
                district: require_column(header, "NUM_ARROND", path)?,
                participation: require_column(header, "Participation", path)?,
                candidates: proportion_cols,
            }));
        }
        let candidates: Vec<(usize, String)> = header
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.is_empty() && !NON_CANDIDATE_COLUMNS.contains(&h.as_str()))
            .map(|(idx, h)| (idx, h.clone()))
            .collect();
        Ok(TallyLayout::Raw(RawColumns {
            bureau: require_column(header, "ID_BVOTE", path)?,
            district: find_column(header, "NUM_ARROND"),
            registered: require_column(header, "NB_INSCR", path)?,
            turnout: require_column(header, "NB_VOTANT", path)?,
            blank: find_column(header, "NB_BLANC"),
            null: find_column(header, "NB_NUL"),
            expressed: require_column(header, "NB_EXPRIM", path)?,
            candidates,
        }))
    }

    pub fn candidate_names(&self) -> Vec<String> {
        let cols = match self {
            TallyLayout::Raw(c) => &c.candidates,
            TallyLayout::Proportions(c) => &c.candidates,
        };
        cols.iter().map(|(_, name)| name.clone()).collect()
    }

    /// Interprets one row of text cells.
    ///
    /// Returns `None` for rows without a bureau identifier. The district is the
    /// explicit one if given, then the district column, then the one found in
    /// the file name.
    pub fn read_row(
        &self,
        cells: &[String],
        explicit_district: Option<u32>,
        file_district: Option<u32>,
        path: &str,
        lineno: u64,
    ) -> MapResult<Option<TallyRecord>> {
        let cell = move |idx: usize| cells.get(idx).map(|s| s.trim()).unwrap_or("");
        let number = |idx: usize| parse_number(cell(idx));
        let (bureau_idx, district_idx) = match self {
            TallyLayout::Raw(c) => (c.bureau, c.district),
            TallyLayout::Proportions(c) => (c.bureau, Some(c.district)),
        };
        let bureau = cell(bureau_idx);
        if bureau.is_empty() {
            debug!("read_row: {}:{}: no bureau identifier, dropped", path, lineno);
            return Ok(None);
        }
        let district: String = match explicit_district {
            Some(d) => d.to_string(),
            None => match district_idx.map(cell).filter(|s| !s.is_empty()) {
                Some(d) => d.to_string(),
                None => file_district
                    .context(MissingDistrictSnafu { path })?
                    .to_string(),
            },
        };
        let key = BureauKey::from_fields(&district, bureau)
            .context(InvalidIdentifierSnafu { path, lineno })?;

        let counts = match self {
            TallyLayout::Raw(c) => TallyCounts::Raw {
                registered: number(c.registered),
                turnout: number(c.turnout),
                blank: c.blank.and_then(number),
                null: c.null.and_then(number),
                expressed: number(c.expressed),
                votes: c
                    .candidates
                    .iter()
                    .map(|(idx, name)| (name.clone(), number(*idx)))
                    .collect(),
            },
            TallyLayout::Proportions(c) => TallyCounts::Proportions {
                participation: number(c.participation),
                proportions: c
                    .candidates
                    .iter()
                    .map(|(idx, name)| (name.clone(), number(*idx)))
                    .collect(),
            },
        };
        Ok(Some(TallyRecord { key, counts }))
    }
}
