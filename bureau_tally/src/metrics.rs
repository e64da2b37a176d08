// Percentages derived from the raw tallies.
// Results are not clamped: inconsistent inputs give out-of-range values.

/// Share of the registered voters who did not vote, in percent.
pub fn abstention_rate(registered: Option<f64>, turnout: Option<f64>) -> Option<f64> {
    match (registered, turnout) {
        (Some(r), Some(t)) if r != 0.0 => Some((r - t) / r * 100.0),
        _ => None,
    }
}

/// Abstention rate in percent from a participation fraction in `[0, 1]`.
pub fn abstention_from_participation(participation: Option<f64>) -> Option<f64> {
    participation.map(|p| (1.0 - p) * 100.0)
}

/// Share of the expressed votes, in percent.
pub fn vote_share(votes: Option<f64>, expressed: Option<f64>) -> Option<f64> {
    match (votes, expressed) {
        (Some(v), Some(e)) if e != 0.0 => Some(v / e * 100.0),
        _ => None,
    }
}

pub fn proportion_share(fraction: f64) -> f64 {
    fraction * 100.0
}
