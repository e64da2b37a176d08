use log::debug;

/// Finds the political family of a candidate from its display name.
///
/// The resolution order is:
/// 1. the first parenthesized group of the name: `"Mme DUPONT Claire (LFI)"` is `LFI`
/// 2. the party lookup table, if any (exact name first, then a lookup name contained in the candidate name)
/// 3. the special case fragments (for lists that are published without a label)
/// 4. the name itself, as a family of its own
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct FamilyResolver {
    lookup: Vec<(String, String)>,
    special_cases: Vec<(String, String)>,
}

impl FamilyResolver {
    /// `special_cases` is a list of (name fragment, family) pairs.
    pub fn new(special_cases: &[(String, String)]) -> FamilyResolver {
        FamilyResolver {
            lookup: Vec::new(),
            special_cases: special_cases.to_vec(),
        }
    }

    /// Adds a candidate name to party table, typically scraped from the
    /// election archives.
    pub fn with_lookup(self, lookup: &[(String, String)]) -> FamilyResolver {
        FamilyResolver {
            lookup: lookup.to_vec(),
            special_cases: self.special_cases,
        }
    }

    pub fn family_of(&self, candidate: &str) -> String {
        if let Some(label) = parenthesized_label(candidate) {
            return label.to_string();
        }
        if let Some((_, party)) = self.lookup.iter().find(|(name, _)| name == candidate) {
            return party.clone();
        }
        if let Some((name, party)) = self
            .lookup
            .iter()
            .find(|(name, _)| !name.is_empty() && candidate.contains(name.as_str()))
        {
            debug!(
                "family_of: {:?} matched lookup entry {:?} -> {:?}",
                candidate, name, party
            );
            return party.clone();
        }
        if let Some((_, family)) = self
            .special_cases
            .iter()
            .find(|(fragment, _)| candidate.contains(fragment.as_str()))
        {
            return family.clone();
        }
        candidate.to_string()
    }
}

/// The content of the first `( ... )` group, if it is not blank.
pub fn parenthesized_label(name: &str) -> Option<&str> {
    let start = name.find('(')?;
    let rest = &name[start + 1..];
    let end = rest.find(')')?;
    let label = rest[..end].trim();
    if label.is_empty() {
        None
    } else {
        Some(label)
    }
}
