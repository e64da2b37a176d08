// Writing the map as a single HTML document (Leaflet).

use crate::mapping::layers::{escape_html, MapLayer};
use crate::mapping::*;

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const TILES_URL: &str = "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png";
const TILES_ATTRIBUTION: &str = "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors &copy; <a href=\"https://carto.com/attributions\">CARTO</a>";

const STYLE: &str = "html, body { height: 100%; margin: 0; }\n#map { height: 100%; }\n";

// Draws the layers and the toggle control. `layers` is defined before.
const MAP_SCRIPT: &str = r#"const overlays = {};
layers.forEach(function (layer) {
  const group = L.geoJSON(layer.data, {
    style: function (feature) { return feature.properties.style; },
    onEachFeature: function (feature, shape) {
      shape.bindTooltip(feature.properties.tooltip, { sticky: true });
      shape.on({
        mouseover: function (e) { e.target.setStyle({ weight: 2 }); },
        mouseout: function (e) { group.resetStyle(e.target); }
      });
    }
  });
  if (layer.show) {
    group.addTo(map);
  }
  overlays[layer.name] = group;
});
L.control.layers(null, overlays, { collapsed: false }).addTo(map);
"#;

// Minimal writer with deterministic push order.
struct Html {
    buf: String,
}

impl Html {
    fn new() -> Self {
        Html {
            buf: String::with_capacity(64 * 1024),
        }
    }

    fn push<S: AsRef<str>>(&mut self, s: S) {
        self.buf.push_str(s.as_ref());
    }

    fn finish(self) -> String {
        self.buf
    }
}

/// JSON text that can be placed inside a `<script>` element.
pub fn script_json(js: &JSValue) -> MapResult<String> {
    let s = serde_json::to_string(js).context(SerializingJsonSnafu {})?;
    Ok(s.replace("</", "<\\/"))
}

fn layers_json(layers: &[MapLayer]) -> JSValue {
    JSValue::Array(
        layers
            .iter()
            .map(|l| {
                json!({
                    // The layer control inserts the names as HTML.
                    "name": escape_html(&l.name),
                    "show": l.show,
                    "data": {
                        "type": "FeatureCollection",
                        "features": l.features,
                    },
                })
            })
            .collect(),
    )
}

pub fn render_map(layers: &[MapLayer], settings: &OutputSettings) -> MapResult<String> {
    let data = script_json(&layers_json(layers))?;
    let [lat, lon] = settings.center();
    let tile_options = script_json(&json!({
        "attribution": TILES_ATTRIBUTION,
        "subdomains": "abcd",
        "maxZoom": 20,
    }))?;

    let mut w = Html::new();
    w.push("<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n<meta charset=\"utf-8\">\n");
    w.push("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    w.push("<title>");
    w.push(escape_html(&settings.title()));
    w.push("</title>\n");
    w.push(format!("<link rel=\"stylesheet\" href=\"{}\">\n", LEAFLET_CSS));
    w.push(format!("<script src=\"{}\"></script>\n", LEAFLET_JS));
    w.push("<style>\n");
    w.push(STYLE);
    w.push("</style>\n</head>\n<body>\n<div id=\"map\"></div>\n<script>\n");
    w.push(format!(
        "const map = L.map(\"map\").setView([{}, {}], {});\n",
        lat,
        lon,
        settings.zoom()
    ));
    w.push(format!(
        "L.tileLayer(\"{}\", {}).addTo(map);\n",
        TILES_URL, tile_options
    ));
    w.push("const layers = ");
    w.push(data);
    w.push(";\n");
    w.push(MAP_SCRIPT);
    w.push("</script>\n</body>\n</html>\n");
    let html = w.finish();
    debug!(
        "render_map: {} layers, {} bytes",
        layers.len(),
        html.len()
    );
    Ok(html)
}
