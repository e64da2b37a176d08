mod config;
mod family;
mod key;
mod metrics;
use log::debug;

use std::{cmp::Ordering, collections::HashMap};

pub use crate::config::*;
pub use crate::family::{parenthesized_label, FamilyResolver};
pub use crate::key::{parse_identifier_number, BureauKey};
pub use crate::metrics::*;

/// Abstention rate of a bureau, in percent.
pub fn bureau_abstention(counts: &TallyCounts) -> Option<f64> {
    match counts {
        TallyCounts::Raw {
            registered,
            turnout,
            ..
        } => abstention_rate(*registered, *turnout),
        TallyCounts::Proportions { participation, .. } => {
            abstention_from_participation(*participation)
        }
    }
}

/// Share of each candidate in percent, in the column order of the source.
pub fn candidate_shares(counts: &TallyCounts) -> Vec<(String, Option<f64>)> {
    match counts {
        TallyCounts::Raw {
            expressed, votes, ..
        } => votes
            .iter()
            .map(|(name, v)| (name.clone(), vote_share(*v, *expressed)))
            .collect(),
        TallyCounts::Proportions { proportions, .. } => proportions
            .iter()
            .map(|(name, p)| (name.clone(), p.map(proportion_share)))
            .collect(),
    }
}

/// Sums the shares of the candidates by political family.
///
/// The families listed in the color table come first, in table order, followed
/// by the other families in order of first appearance. Only the families that
/// have at least one candidate are returned.
pub fn aggregate_families(
    shares: &[(String, Option<f64>)],
    palette: &PartyColorTable,
    resolver: &FamilyResolver,
) -> Vec<FamilyShare> {
    // (sort rank, family)
    let mut families: Vec<(usize, FamilyShare)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (candidate, share) in shares.iter() {
        let family = resolver.family_of(candidate);
        let pos = match index.get(&family) {
            Some(pos) => *pos,
            None => {
                let rank = palette
                    .position(&family)
                    .unwrap_or(palette.len() + families.len());
                families.push((
                    rank,
                    FamilyShare {
                        family: family.clone(),
                        share: None,
                    },
                ));
                index.insert(family, families.len() - 1);
                families.len() - 1
            }
        };
        if let Some(s) = share {
            let fs = &mut families[pos].1;
            fs.share = Some(fs.share.unwrap_or(0.0) + s);
        }
    }
    families.sort_by_key(|(rank, _)| *rank);
    families.into_iter().map(|(_, fs)| fs).collect()
}

/// The family with the largest defined share.
///
/// Ties are broken in favor of the family that comes first.
pub fn majority(families: &[FamilyShare], palette: &PartyColorTable) -> Option<Majority> {
    let mut best: Option<(&FamilyShare, f64)> = None;
    for fs in families.iter() {
        if let Some(score) = fs.share {
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((fs, score)),
            }
        }
    }
    best.map(|(fs, score)| Majority {
        family: fs.family.clone(),
        score,
        color: palette.color_or_fallback(&fs.family),
    })
}

/// The (at most) three largest defined shares, in decreasing order.
pub fn top3(families: &[FamilyShare]) -> Vec<(String, f64)> {
    let mut defined: Vec<(String, f64)> = families
        .iter()
        .filter_map(|fs| fs.share.map(|s| (fs.family.clone(), s)))
        .collect();
    // Stable sort: equal shares keep the family order.
    defined.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    defined.truncate(3);
    defined
}

/// Computes all the indicators of one bureau.
pub fn enrich(
    record: &TallyRecord,
    palette: &PartyColorTable,
    resolver: &FamilyResolver,
) -> BureauResults {
    let abstention = bureau_abstention(&record.counts);
    let candidate_shares = candidate_shares(&record.counts);
    let family_shares = aggregate_families(&candidate_shares, palette, resolver);
    let majority = majority(&family_shares, palette);
    let top3 = top3(&family_shares);
    debug!(
        "enrich: bureau {}: abstention {:?} majority {:?} top3 {:?}",
        record.key, abstention, majority, top3
    );
    BureauResults {
        abstention,
        candidate_shares,
        family_shares,
        majority,
        top3,
    }
}
