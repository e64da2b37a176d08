// Turning the enriched bureaus into map layers.

use crate::mapping::io_geojson::{geometry_status, GeometryStatus};
use crate::mapping::*;

/// Fill of the bureaus without data.
pub const NO_DATA_COLOR: &str = "#d9d9d9";

const OUTLINE_COLOR: &str = "black";

/// A toggleable overlay: one GeoJSON feature per drawable bureau.
#[derive(PartialEq, Debug, Clone)]
pub struct MapLayer {
    pub name: String,
    pub show: bool,
    pub features: Vec<JSValue>,
}

/// The abstention ramp, in percent.
pub fn abstention_color(rate: Option<f64>) -> &'static str {
    match rate {
        None => NO_DATA_COLOR,
        Some(r) if r < 30.0 => "#fef0d9",
        Some(r) if r < 40.0 => "#fdcc8a",
        Some(r) if r < 50.0 => "#fc8d59",
        Some(r) if r < 60.0 => "#e34a33",
        Some(_) => "#b30000",
    }
}

pub fn format_percent(x: Option<f64>) -> String {
    match x {
        Some(x) => format!("{:.1}%", x),
        None => "N/A".to_string(),
    }
}

/// Counts with a space as thousands separator: `12 345`.
pub fn format_count(x: Option<f64>) -> String {
    let x = match x {
        Some(x) => x.round() as i64,
        None => return "N/A".to_string(),
    };
    let digits = x.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    if x < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

pub fn escape_html(s: &str) -> String {
    let mut res = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => res.push_str("&amp;"),
            '<' => res.push_str("&lt;"),
            '>' => res.push_str("&gt;"),
            '"' => res.push_str("&quot;"),
            '\'' => res.push_str("&#39;"),
            _ => res.push(c),
        }
    }
    res
}

/// `(label, value)` pairs as tooltip lines. Both sides are escaped.
fn tooltip_lines(lines: &[(&str, String)]) -> String {
    lines
        .iter()
        .map(|(label, value)| format!("<b>{}</b> {}", escape_html(label), escape_html(value)))
        .collect::<Vec<_>>()
        .join("<br>")
}

pub fn top3_tooltip(key: &BureauKey, top3: &[(String, f64)]) -> String {
    let mut res = format!("<b>Bureau :</b> {}<br><hr>", key);
    if top3.is_empty() {
        res.push_str("Aucun résultat");
    }
    for (family, score) in top3.iter() {
        res.push_str(&format!(
            "{} : {}<br>",
            escape_html(family),
            format_percent(Some(*score))
        ));
    }
    res
}

fn abstention_tooltip(b: &EnrichedBureau) -> String {
    let mut lines = vec![
        ("Bureau :", b.bureau.key.to_string()),
        (
            "Taux d'abstention :",
            format_percent(b.results.as_ref().and_then(|r| r.abstention)),
        ),
    ];
    if let Some(TallyCounts::Raw {
        registered,
        turnout,
        ..
    }) = b.tally.as_ref().map(|t| &t.counts)
    {
        lines.push(("Inscrits :", format_count(*registered)));
        lines.push(("Votants :", format_count(*turnout)));
    }
    tooltip_lines(&lines)
}

fn majority_tooltip(b: &EnrichedBureau) -> String {
    let majority = b.results.as_ref().and_then(|r| r.majority.as_ref());
    tooltip_lines(&[
        ("Bureau :", b.bureau.key.to_string()),
        (
            "Parti en tête :",
            majority
                .map(|m| m.family.clone())
                .unwrap_or_else(|| "N/A".to_string()),
        ),
        ("Part des votes :", format_percent(majority.map(|m| m.score))),
    ])
}

fn style(fill_color: &str, weight: f64, fill_opacity: f64) -> JSValue {
    json!({
        "fillColor": fill_color,
        "color": OUTLINE_COLOR,
        "weight": weight,
        "fillOpacity": fill_opacity,
    })
}

fn feature(b: &EnrichedBureau, geometry: &JSValue, tooltip: String, style: JSValue) -> JSValue {
    json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": {
            "bureau": b.bureau.key.to_string(),
            "tooltip": tooltip,
            "style": style,
        },
    })
}

fn layer_feature(
    kind: LayerKind,
    b: &EnrichedBureau,
    geometry: &JSValue,
    top3_palette: &PartyColorTable,
) -> JSValue {
    let results = b.results.as_ref();
    match kind {
        LayerKind::Abstention => {
            let rate = results.and_then(|r| r.abstention);
            feature(
                b,
                geometry,
                abstention_tooltip(b),
                style(abstention_color(rate), 0.3, 0.7),
            )
        }
        LayerKind::Majority => {
            let color = results
                .and_then(|r| r.majority.as_ref())
                .map(|m| m.color.clone())
                .unwrap_or_else(|| NO_DATA_COLOR.to_string());
            feature(b, geometry, majority_tooltip(b), style(&color, 0.3, 0.8))
        }
        LayerKind::Top3 => {
            let top3: &[(String, f64)] = results.map(|r| r.top3.as_slice()).unwrap_or(&[]);
            let color = match top3.first() {
                Some((family, _)) => top3_palette.color_or_fallback(family),
                None => top3_palette.fallback_color.clone(),
            };
            feature(
                b,
                geometry,
                top3_tooltip(&b.bureau.key, top3),
                style(&color, 0.2, 0.05),
            )
        }
    }
}

/// Builds the configured layers, in order. Bureaus whose geometry cannot be
/// drawn are left out of every layer; their number is returned.
pub fn build_layers(
    enriched: &[EnrichedBureau],
    specs: &[LayerSpec],
    top3_palette: &PartyColorTable,
) -> (Vec<MapLayer>, usize) {
    let mut drawable: Vec<(&EnrichedBureau, &JSValue)> = Vec::new();
    let mut skipped: usize = 0;
    for b in enriched.iter() {
        match (geometry_status(b.bureau.geometry.as_ref()), &b.bureau.geometry) {
            (GeometryStatus::Valid(mp), Some(g)) => {
                debug!("build_layers: bureau {}: {} polygons", b.bureau.key, mp.0.len());
                drawable.push((b, g))
            }
            (status, _) => {
                debug!("build_layers: bureau {}: {:?}", b.bureau.key, status);
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        warn!("{} bureaus without a usable shape are not drawn", skipped);
    }

    let layers = specs
        .iter()
        .map(|spec| {
            let features: Vec<JSValue> = drawable
                .iter()
                .map(|(b, g)| layer_feature(spec.kind, b, g, top3_palette))
                .collect();
            debug!(
                "build_layers: layer {:?}: {} features",
                spec.name,
                features.len()
            );
            MapLayer {
                name: spec.name.clone(),
                show: spec.show.unwrap_or(false),
                features,
            }
        })
        .collect();
    (layers, skipped)
}
