// Reading the voting bureau polygons.

use geo::{Area, Coord, Intersects, Line, LineString, MultiPolygon, Polygon};

use crate::mapping::*;

/// One voting bureau polygon, as found in the GeoJSON file.
#[derive(PartialEq, Debug, Clone)]
pub struct VotingBureau {
    pub key: BureauKey,
    /// The GeoJSON geometry object, unchanged.
    pub geometry: Option<JSValue>,
    pub properties: JSMap<String, JSValue>,
}

/// What can be drawn of a geometry.
#[derive(PartialEq, Debug, Clone)]
pub enum GeometryStatus {
    Valid(MultiPolygon<f64>),
    Missing,
    /// No polygon, or polygons without area.
    Empty,
    Invalid(String),
}

/// Properties may be written as strings or as numbers.
fn property_text(value: &JSValue) -> Option<String> {
    match value {
        JSValue::String(s) => Some(s.trim().to_string()),
        JSValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn parse_geometry(
    contents: &str,
    source: &GeometrySource,
    path: &str,
) -> MapResult<Vec<VotingBureau>> {
    let js: JSValue = serde_json::from_str(contents).context(ParsingJsonSnafu { path })?;
    let features = match js.get("features").and_then(|f| f.as_array()) {
        Some(features) => features,
        None => whatever!("{} is not a GeoJSON FeatureCollection", path),
    };
    let bureau_prop = source.bureau_property();
    let district_prop = source.district_property();

    let mut res: Vec<VotingBureau> = Vec::new();
    for (idx, feature) in features.iter().enumerate() {
        let properties: JSMap<String, JSValue> = feature
            .get("properties")
            .and_then(|p| p.as_object())
            .cloned()
            .unwrap_or_default();
        let bureau = properties
            .get(bureau_prop)
            .and_then(property_text)
            .context(MissingColumnSnafu {
                column: bureau_prop,
                path,
            })?;
        let district = properties
            .get(district_prop)
            .and_then(property_text)
            .context(MissingColumnSnafu {
                column: district_prop,
                path,
            })?;
        let key = BureauKey::from_fields(&district, &bureau)
            .context(InvalidFeatureIdentifierSnafu {
                path,
                feature: idx as u64,
            })?;
        let geometry = feature.get("geometry").filter(|g| !g.is_null()).cloned();
        res.push(VotingBureau {
            key,
            geometry,
            properties,
        });
    }
    debug!("parse_geometry: {}: {} features", path, res.len());
    Ok(res)
}

pub fn read_geometry(source: &GeometrySource) -> MapResult<Vec<VotingBureau>> {
    let path = source.file_path.as_str();
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    parse_geometry(&contents, source, path)
}

fn parse_position(js: &JSValue) -> Result<Coord<f64>, String> {
    let pos = js
        .as_array()
        .ok_or_else(|| format!("position is not an array: {}", js))?;
    if pos.len() < 2 {
        return Err(format!("position with {} coordinates", pos.len()));
    }
    let x = pos[0].as_f64();
    let y = pos[1].as_f64();
    match (x, y) {
        (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Ok(Coord { x, y }),
        _ => Err(format!("non-numeric position: {}", js)),
    }
}

fn parse_ring(js: &JSValue) -> Result<LineString<f64>, String> {
    let positions = js.as_array().ok_or("ring is not an array")?;
    let coords = positions
        .iter()
        .map(parse_position)
        .collect::<Result<Vec<_>, _>>()?;
    if coords.len() < 4 {
        return Err(format!("ring with {} positions", coords.len()));
    }
    if coords.first() != coords.last() {
        return Err("ring is not closed".to_string());
    }
    if crosses_itself(&coords) {
        return Err("self-intersecting ring".to_string());
    }
    Ok(LineString::new(coords))
}

/// True when two non-adjacent edges of a closed ring touch.
fn crosses_itself(coords: &[Coord<f64>]) -> bool {
    let edges: Vec<Line<f64>> = coords.windows(2).map(|w| Line::new(w[0], w[1])).collect();
    let n = edges.len();
    for i in 0..n {
        for j in (i + 2)..n {
            // The first and last edges share the closing point.
            if i == 0 && j == n - 1 {
                continue;
            }
            if edges[i].intersects(&edges[j]) {
                return true;
            }
        }
    }
    false
}

fn parse_polygon(js: &JSValue) -> Result<Option<Polygon<f64>>, String> {
    let rings = js.as_array().ok_or("polygon is not an array")?;
    let mut rings = rings
        .iter()
        .map(parse_ring)
        .collect::<Result<Vec<_>, _>>()?;
    if rings.is_empty() {
        return Ok(None);
    }
    let exterior = rings.remove(0);
    Ok(Some(Polygon::new(exterior, rings)))
}

/// Checks that a GeoJSON geometry is a drawable (multi)polygon.
pub fn geometry_status(geometry: Option<&JSValue>) -> GeometryStatus {
    let geometry = match geometry {
        None | Some(JSValue::Null) => return GeometryStatus::Missing,
        Some(g) => g,
    };
    let coordinates = match geometry.get("coordinates") {
        Some(c) => c,
        None => return GeometryStatus::Invalid("no coordinates".to_string()),
    };
    let polygons: Result<Vec<Option<Polygon<f64>>>, String> =
        match geometry.get("type").and_then(|t| t.as_str()) {
            Some("Polygon") => parse_polygon(coordinates).map(|p| vec![p]),
            Some("MultiPolygon") => match coordinates.as_array() {
                Some(l) => l.iter().map(parse_polygon).collect(),
                None => Err("multipolygon is not an array".to_string()),
            },
            Some(t) => Err(format!("unsupported geometry type {}", t)),
            None => Err("no geometry type".to_string()),
        };
    match polygons {
        Err(msg) => GeometryStatus::Invalid(msg),
        Ok(polygons) => {
            let mp = MultiPolygon::new(polygons.into_iter().flatten().collect());
            if mp.0.is_empty() || mp.unsigned_area() == 0.0 {
                GeometryStatus::Empty
            } else {
                GeometryStatus::Valid(mp)
            }
        }
    }
}
