use crate::mapping::*;

use std::path::PathBuf;

pub const PATH_EXCEL_2020: &str = "data/elections_2020/Tous_arr.xlsx";
pub const PATH_GEOJSON_2020: &str = "data/geojson/bureaux_2020.geojson";
pub const OUTPUT_FILE_2020: &str = "docs/outputs/1er_tour_municipales_2020.html";

const DEFAULT_TITLE: &str = "Municipales 2020 - Paris, 1er tour";
const DEFAULT_CENTER: [f64; 2] = [48.8566, 2.3522];
const DEFAULT_ZOOM: u8 = 12;
const DEFAULT_FALLBACK_COLOR: &str = "#ffffff";

// Layer "Parti arrivé en tête"
const MAJORITY_COLORS: &[(&str, &str)] = &[
    ("PS", "hotpink"),
    ("EELV", "green"),
    ("LREM Buzyn", "gold"),
    ("LREM Villani", "orange"),
    ("LR", "blue"),
    ("LFI", "purple"),
    ("RN", "navy"),
    ("DVD", "lightblue"),
    ("DVG", "pink"),
    ("UDI", "skyblue"),
    ("LO", "darkred"),
    ("UPR", "blue"),
    ("DIV", "grey"),
    ("SE", "grey"),
    ("EXG", "darkred"),
    ("LREM", "gold"),
    ("Les écologiste", "green"),
    ("Marcel Campion", "grey"),
];

// Layer "Top 3 partis"
const TOP3_COLORS: &[(&str, &str)] = &[
    ("PS", "hotpink"),
    ("EELV", "green"),
    ("LREM Buzyn", "gold"),
    ("LREM Villani", "brown"),
    ("LFI", "purple"),
    ("LR", "blue"),
    ("LDVD", "gray"),
    ("RN", "navy"),
    ("DVD", "lightblue"),
    ("DVG", "pink"),
    ("UDI", "skyblue"),
    ("LO", "darkred"),
    ("UPR", "blue"),
    ("DIV", "grey"),
    ("SE", "grey"),
    ("EXG", "darkred"),
    ("LREM", "gold"),
    ("Les écologiste", "green"),
    ("Marcel Campion", "grey"),
];

// Lists published without a label in parentheses.
const SPECIAL_CASES: &[(&str, &str)] = &[
    ("Les écologiste", "Les écologiste"),
    ("Marcel Campion", "Marcel Campion"),
];

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    pub title: Option<String>,
    #[serde(rename = "outputFile")]
    pub output_file: Option<String>,
    /// Initial center of the map, `[latitude, longitude]`.
    pub center: Option<[f64; 2]>,
    pub zoom: Option<u8>,
}

impl OutputSettings {
    pub fn title(&self) -> String {
        self.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string())
    }

    pub fn output_file(&self) -> String {
        self.output_file
            .clone()
            .unwrap_or_else(|| OUTPUT_FILE_2020.to_string())
    }

    pub fn center(&self) -> [f64; 2] {
        self.center.unwrap_or(DEFAULT_CENTER)
    }

    pub fn zoom(&self) -> u8 {
        self.zoom.unwrap_or(DEFAULT_ZOOM)
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct GeometrySource {
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "bureauProperty")]
    pub bureau_property: Option<String>,
    #[serde(rename = "districtProperty")]
    pub district_property: Option<String>,
}

impl GeometrySource {
    pub fn bureau_property(&self) -> &str {
        self.bureau_property.as_deref().unwrap_or("id_bv")
    }

    pub fn district_property(&self) -> &str {
        self.district_property.as_deref().unwrap_or("arrondissement")
    }
}

impl Default for GeometrySource {
    fn default() -> Self {
        GeometrySource {
            file_path: PATH_GEOJSON_2020.to_string(),
            bureau_property: None,
            district_property: None,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TallyProvider {
    /// One delimited text file per district, raw counts.
    Csv,
    /// An Excel workbook (xlsx, xls, ods), raw counts or proportions.
    Spreadsheet,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TallySource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    /// District of all the rows of this file. Takes precedence over the
    /// NUM_ARROND column and over the file name.
    pub district: Option<u32>,
    pub delimiter: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl TallySource {
    pub fn spreadsheet(path: &str) -> TallySource {
        TallySource {
            provider: "spreadsheet".to_string(),
            file_path: path.to_string(),
            district: None,
            delimiter: None,
            excel_worksheet_name: None,
        }
    }

    pub fn provider(&self) -> MapResult<TallyProvider> {
        match self.provider.as_str() {
            "csv" => Ok(TallyProvider::Csv),
            "spreadsheet" | "excel" => Ok(TallyProvider::Spreadsheet),
            x => whatever!("Provider not implemented: {:?}", x),
        }
    }

    pub fn delimiter(&self) -> MapResult<u8> {
        match self.delimiter.as_deref() {
            None => Ok(b';'),
            Some(d) if d.len() == 1 => Ok(d.as_bytes()[0]),
            Some(d) => whatever!("The delimiter must be a single ASCII character, got {:?}", d),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FamilyColor {
    pub family: String,
    pub color: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SpecialCase {
    pub fragment: String,
    pub family: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayerKind {
    /// Choropleth of the abstention rate.
    Abstention,
    /// Choropleth of the leading family.
    Majority,
    /// Tooltip-only layer listing the three leading families.
    Top3,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct LayerSpec {
    pub kind: LayerKind,
    pub name: String,
    /// Whether the layer is displayed when the map opens.
    pub show: Option<bool>,
}

/// The description of a map. Every section is optional: the defaults render
/// the first round of the 2020 Paris municipal election.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "geometrySource")]
    pub geometry_source: GeometrySource,
    #[serde(rename = "tallySources")]
    pub tally_sources: Vec<TallySource>,
    #[serde(rename = "partyLookupFile")]
    pub party_lookup_file: Option<String>,
    #[serde(rename = "familyColors")]
    pub family_colors: Vec<FamilyColor>,
    #[serde(rename = "top3Colors")]
    pub top3_colors: Vec<FamilyColor>,
    #[serde(rename = "fallbackColor")]
    pub fallback_color: Option<String>,
    #[serde(rename = "specialCases")]
    pub special_cases: Vec<SpecialCase>,
    pub layers: Vec<LayerSpec>,
}

fn to_family_colors(l: &[(&str, &str)]) -> Vec<FamilyColor> {
    l.iter()
        .map(|(family, color)| FamilyColor {
            family: family.to_string(),
            color: color.to_string(),
        })
        .collect()
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            output_settings: OutputSettings::default(),
            geometry_source: GeometrySource::default(),
            tally_sources: vec![TallySource::spreadsheet(PATH_EXCEL_2020)],
            party_lookup_file: None,
            family_colors: to_family_colors(MAJORITY_COLORS),
            top3_colors: to_family_colors(TOP3_COLORS),
            fallback_color: None,
            special_cases: SPECIAL_CASES
                .iter()
                .map(|(fragment, family)| SpecialCase {
                    fragment: fragment.to_string(),
                    family: family.to_string(),
                })
                .collect(),
            layers: vec![
                LayerSpec {
                    kind: LayerKind::Abstention,
                    name: "Taux d’abstention".to_string(),
                    show: Some(true),
                },
                LayerSpec {
                    kind: LayerKind::Majority,
                    name: "Parti arrivé en tête".to_string(),
                    show: Some(false),
                },
                LayerSpec {
                    kind: LayerKind::Top3,
                    name: "Top 3 partis".to_string(),
                    show: Some(false),
                },
            ],
        }
    }
}

fn to_palette(colors: &[FamilyColor], fallback: &str) -> PartyColorTable {
    PartyColorTable {
        entries: colors
            .iter()
            .map(|fc| (fc.family.clone(), fc.color.clone()))
            .collect(),
        fallback_color: fallback.to_string(),
    }
}

fn resolve_path(root: &Path, p: &str) -> String {
    let path = Path::new(p);
    if path.is_absolute() {
        p.to_string()
    } else {
        let full: PathBuf = root.join(path);
        full.display().to_string()
    }
}

impl MapConfig {
    pub fn fallback_color(&self) -> &str {
        self.fallback_color
            .as_deref()
            .unwrap_or(DEFAULT_FALLBACK_COLOR)
    }

    /// Colors of the leading family layer.
    pub fn family_palette(&self) -> PartyColorTable {
        to_palette(&self.family_colors, self.fallback_color())
    }

    /// Colors of the top 3 layer. Falls back to the family colors when empty.
    pub fn top3_palette(&self) -> PartyColorTable {
        if self.top3_colors.is_empty() {
            self.family_palette()
        } else {
            to_palette(&self.top3_colors, self.fallback_color())
        }
    }

    pub fn special_cases(&self) -> Vec<(String, String)> {
        self.special_cases
            .iter()
            .map(|sc| (sc.fragment.clone(), sc.family.clone()))
            .collect()
    }

    /// Makes the relative paths of a configuration file relative to the
    /// directory of that file.
    pub fn resolve_paths(&mut self, root: &Path) {
        self.geometry_source.file_path = resolve_path(root, &self.geometry_source.file_path);
        for ts in self.tally_sources.iter_mut() {
            ts.file_path = resolve_path(root, &ts.file_path);
        }
        if let Some(p) = &self.party_lookup_file {
            self.party_lookup_file = Some(resolve_path(root, p));
        }
        let output = self.output_settings.output_file();
        self.output_settings.output_file = Some(resolve_path(root, &output));
    }

    /// Applies the command line flags. They take precedence over the file.
    pub fn apply_overrides(
        &mut self,
        excel_file: Option<&str>,
        geojson_file: Option<&str>,
        output_file: Option<&str>,
    ) {
        if let Some(p) = excel_file {
            self.tally_sources = vec![TallySource::spreadsheet(p)];
        }
        if let Some(p) = geojson_file {
            self.geometry_source.file_path = p.to_string();
        }
        if let Some(p) = output_file {
            self.output_settings.output_file = Some(p.to_string());
        }
    }
}

/// Reads the configuration file, or returns the defaults when no file is given.
pub fn read_config(path: Option<&str>) -> MapResult<MapConfig> {
    let path = match path {
        Some(p) => p,
        None => {
            debug!("read_config: no configuration file, using the defaults");
            return Ok(MapConfig::default());
        }
    };
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let mut config: MapConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    if let Some(root) = Path::new(path).parent() {
        config.resolve_paths(root);
    }
    debug!("read_config: {:?}", config);
    Ok(config)
}
