// Joining the tallies to the bureau polygons.

use std::collections::{HashMap, HashSet};

use crate::mapping::*;

/// The outcome of the join, for the logs and the run summary.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct JoinReport {
    pub matched: usize,
    /// Polygons without results, in geometry order.
    pub unmatched_geometry: Vec<BureauKey>,
    /// Results without polygon, in tally order.
    pub unmatched_tallies: Vec<BureauKey>,
}

/// A bureau with its results, if any.
#[derive(PartialEq, Debug, Clone)]
pub struct EnrichedBureau {
    pub bureau: VotingBureau,
    pub tally: Option<TallyRecord>,
    pub results: Option<BureauResults>,
}

fn check_unique<'a>(keys: impl Iterator<Item = &'a BureauKey>, table: &str) -> MapResult<()> {
    let mut seen: HashSet<BureauKey> = HashSet::new();
    for k in keys {
        if !seen.insert(*k) {
            return DuplicateKeySnafu {
                key: k.to_string(),
                table,
            }
            .fail();
        }
    }
    Ok(())
}

/// Left join from the polygons to the tallies. The geometry order is kept.
pub fn join_bureaus(
    geometry: Vec<VotingBureau>,
    tallies: Vec<TallyRecord>,
) -> MapResult<(Vec<(VotingBureau, Option<TallyRecord>)>, JoinReport)> {
    check_unique(geometry.iter().map(|b| &b.key), "geometry")?;
    check_unique(tallies.iter().map(|t| &t.key), "tally")?;

    let geometry_keys: HashSet<BureauKey> = geometry.iter().map(|b| b.key).collect();
    let mut report = JoinReport::default();
    for t in tallies.iter() {
        if !geometry_keys.contains(&t.key) {
            warn!("Bureau {} has results but no polygon", t.key);
            report.unmatched_tallies.push(t.key);
        }
    }

    let mut by_key: HashMap<BureauKey, TallyRecord> =
        tallies.into_iter().map(|t| (t.key, t)).collect();
    let joined: Vec<(VotingBureau, Option<TallyRecord>)> = geometry
        .into_iter()
        .map(|b| {
            let tally = by_key.remove(&b.key);
            if tally.is_some() {
                report.matched += 1;
            } else {
                debug!("join_bureaus: bureau {} has no results", b.key);
                report.unmatched_geometry.push(b.key);
            }
            (b, tally)
        })
        .collect();
    if !report.unmatched_geometry.is_empty() {
        warn!(
            "{} bureaus have no results: {:?}",
            report.unmatched_geometry.len(),
            report
                .unmatched_geometry
                .iter()
                .map(|k| k.to_string())
                .collect::<Vec<_>>()
        );
    }
    Ok((joined, report))
}

pub fn enrich_bureaus(
    joined: Vec<(VotingBureau, Option<TallyRecord>)>,
    palette: &PartyColorTable,
    resolver: &FamilyResolver,
) -> Vec<EnrichedBureau> {
    joined
        .into_iter()
        .map(|(bureau, tally)| {
            let results = tally.as_ref().map(|t| enrich(t, palette, resolver));
            EnrichedBureau {
                bureau,
                tally,
                results,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bureau(d: u32, b: u32) -> VotingBureau {
        VotingBureau {
            key: BureauKey::new(d, b),
            geometry: None,
            properties: JSMap::new(),
        }
    }

    fn tally(d: u32, b: u32, registered: f64, turnout: f64) -> TallyRecord {
        TallyRecord {
            key: BureauKey::new(d, b),
            counts: TallyCounts::Raw {
                registered: Some(registered),
                turnout: Some(turnout),
                blank: None,
                null: None,
                expressed: Some(turnout),
                votes: vec![("X (PS)".to_string(), Some(turnout))],
            },
        }
    }

    #[test]
    fn left_join() {
        let (joined, report) = join_bureaus(
            vec![bureau(1, 2), bureau(1, 1), bureau(2, 1)],
            vec![tally(1, 1, 100.0, 50.0), tally(3, 1, 10.0, 5.0), tally(1, 2, 10.0, 1.0)],
        )
        .unwrap();
        let keys: Vec<String> = joined.iter().map(|(b, _)| b.key.to_string()).collect();
        assert_eq!(keys, vec!["1-2", "1-1", "2-1"]);
        assert_eq!(joined[1].1.as_ref().map(|t| t.key), Some(BureauKey::new(1, 1)));
        assert_eq!(joined[2].1, None);
        assert_eq!(
            report,
            JoinReport {
                matched: 2,
                unmatched_geometry: vec![BureauKey::new(2, 1)],
                unmatched_tallies: vec![BureauKey::new(3, 1)],
            }
        );

        let palette = PartyColorTable::new(&[("PS", "hotpink")], "#ffffff");
        let enriched = enrich_bureaus(joined, &palette, &FamilyResolver::default());
        assert_eq!(enriched.len(), 3);
        assert_eq!(enriched[0].results.as_ref().unwrap().abstention, Some(90.0));
        assert_eq!(
            enriched[1].results.as_ref().unwrap().majority.as_ref().unwrap().color,
            "hotpink"
        );
        assert_eq!(enriched[2].results, None);
    }

    #[test]
    fn duplicates() {
        let res = join_bureaus(vec![bureau(1, 1), bureau(1, 1)], vec![]);
        assert!(matches!(
            res,
            Err(MapError::DuplicateKey { key, table }) if key == "1-1" && table == "geometry"
        ));
        let res = join_bureaus(
            vec![bureau(1, 1)],
            vec![tally(1, 1, 1.0, 1.0), tally(1, 1, 2.0, 1.0)],
        );
        assert!(matches!(
            res,
            Err(MapError::DuplicateKey { table, .. }) if table == "tally"
        ));
    }
}
