use std::fmt::Display;

use log::debug;

use crate::config::TallyError;

/// The join key between the geometry and the tallies: district number and
/// bureau number within that district.
///
/// The canonical text form is `"<district>-<bureau>"`, e.g. `"7-12"`.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct BureauKey {
    pub district: u32,
    pub bureau: u32,
}

impl BureauKey {
    pub fn new(district: u32, bureau: u32) -> BureauKey {
        BureauKey { district, bureau }
    }

    /// Builds a key from the text of a district field and a bureau field.
    ///
    /// The bureau field may already be composite (`"7-12"`, or even `"7-7-12"`
    /// in some exports): the district part is then checked against the
    /// district field and only the last segment is kept.
    pub fn from_fields(district: &str, bureau: &str) -> Result<BureauKey, TallyError> {
        let invalid = || TallyError::InvalidIdentifier {
            district: district.to_string(),
            bureau: bureau.to_string(),
        };
        let district_num = parse_identifier_number(district).ok_or_else(invalid)?;
        let bureau_num = match bureau.trim().rsplit_once('-') {
            Some((prefix, last)) => {
                for segment in prefix.split('-') {
                    let seg = parse_identifier_number(segment).ok_or_else(invalid)?;
                    if seg != district_num {
                        return Err(TallyError::MismatchedDistrict {
                            district: district_num,
                            bureau: bureau.to_string(),
                        });
                    }
                }
                debug!(
                    "from_fields: composite bureau field {:?} in district {}",
                    bureau, district_num
                );
                parse_identifier_number(last).ok_or_else(invalid)?
            }
            None => parse_identifier_number(bureau).ok_or_else(invalid)?,
        };
        Ok(BureauKey::new(district_num, bureau_num))
    }

    /// Parses the canonical form `"<district>-<bureau>"`.
    pub fn from_composite(s: &str) -> Result<BureauKey, TallyError> {
        match s.trim().split_once('-') {
            Some((district, bureau)) => BureauKey::from_fields(district, bureau),
            None => Err(TallyError::InvalidIdentifier {
                district: "".to_string(),
                bureau: s.to_string(),
            }),
        }
    }
}

impl Display for BureauKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.district, self.bureau)
    }
}

/// Reads an identifier number written as an integer (`"7"`, `"07"`) or as a
/// float with no fractional part (`"7.0"`, the usual form in spreadsheets).
pub fn parse_identifier_number(s: &str) -> Option<u32> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    if let Ok(x) = t.parse::<u32>() {
        return Some(x);
    }
    match t.parse::<f64>() {
        Ok(x) if x.is_finite() && x >= 0.0 && x.fract() == 0.0 && x <= u32::MAX as f64 => {
            Some(x as u32)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_text_form() {
        assert_eq!(BureauKey::new(7, 12).to_string(), "7-12");
    }

    #[test]
    fn simple_fields() {
        assert_eq!(BureauKey::from_fields("7", "12"), Ok(BureauKey::new(7, 12)));
        assert_eq!(
            BureauKey::from_fields("07", "012"),
            Ok(BureauKey::new(7, 12))
        );
        assert_eq!(
            BureauKey::from_fields("7.0", " 12.0 "),
            Ok(BureauKey::new(7, 12))
        );
    }

    #[test]
    fn composite_bureau_is_not_concatenated_twice() {
        assert_eq!(
            BureauKey::from_fields("7", "7-12"),
            Ok(BureauKey::new(7, 12))
        );
        assert_eq!(
            BureauKey::from_fields("7", "7-7-12"),
            Ok(BureauKey::new(7, 12))
        );
    }

    #[test]
    fn composite_bureau_from_another_district() {
        assert_eq!(
            BureauKey::from_fields("7", "8-12"),
            Err(TallyError::MismatchedDistrict {
                district: 7,
                bureau: "8-12".to_string()
            })
        );
    }

    #[test]
    fn invalid_numbers() {
        assert!(BureauKey::from_fields("", "12").is_err());
        assert!(BureauKey::from_fields("7", "abc").is_err());
        assert!(BureauKey::from_fields("7", "12.5").is_err());
        assert!(BureauKey::from_fields("-1", "12").is_err());
    }

    #[test]
    fn parse_composite() {
        assert_eq!(
            BureauKey::from_composite("20-3"),
            Ok(BureauKey::new(20, 3))
        );
        assert!(BureauKey::from_composite("203").is_err());
    }
}
