use log::{debug, info, warn};

use bureau_tally::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::Path;

use calamine::{open_workbook_auto, DataType, Reader};

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::mapping::config_reader::*;
use crate::mapping::io_geojson::VotingBureau;
use crate::mapping::join::{EnrichedBureau, JoinReport};

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_excel;
mod io_geojson;
mod io_party_lookup;
mod join;
mod layers;
mod render_html;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MapError {
    #[snafu(display("Error opening file {path}: {source}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}: {source}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing JSON: {source}"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Error opening workbook {path}: {source}"))]
    OpeningExcel {
        source: calamine::Error,
        path: String,
    },
    #[snafu(display("Workbook {path} has no worksheet or no header row"))]
    EmptyExcel { path: String },
    #[snafu(display("Workbook {path} has no worksheet named {name:?}"))]
    MissingWorksheet { path: String, name: String },
    #[snafu(display("Error opening CSV file {path}: {source}"))]
    OpeningCsv { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of {path}: {source}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: u64,
    },
    #[snafu(display("Missing column {column:?} in {path}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display("Could not find the district of {path}: add a NUM_ARROND column or a district to the tally source"))]
    MissingDistrict { path: String },
    #[snafu(display("Invalid identifier at line {lineno} of {path}: {source}"))]
    InvalidIdentifier {
        source: TallyError,
        path: String,
        lineno: u64,
    },
    #[snafu(display("Invalid identifier in feature {feature} of {path}: {source}"))]
    InvalidFeatureIdentifier {
        source: TallyError,
        path: String,
        feature: u64,
    },
    #[snafu(display("Bureau {key} appears more than once in the {table} data"))]
    DuplicateKey { key: String, table: String },
    #[snafu(display("Error writing {path}: {source}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("The rendered map differs from the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type MapResult<T> = Result<T, MapError>;

/// What a run produced.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub bureaus: usize,
    pub matched: usize,
    #[serde(rename = "unmatchedGeometry")]
    pub unmatched_geometry: Vec<String>,
    #[serde(rename = "unmatchedTallies")]
    pub unmatched_tallies: Vec<String>,
    #[serde(rename = "skippedGeometries")]
    pub skipped_geometries: usize,
    #[serde(rename = "outputFile")]
    pub output_file: String,
    pub sha256: String,
}

fn read_tally_source(source: &TallySource) -> MapResult<Vec<TallyRecord>> {
    info!("Attempting to read tally file {:?}", source.file_path);
    let records = match source.provider()? {
        TallyProvider::Csv => io_csv::read_csv_tally(&source.file_path, source),
        TallyProvider::Spreadsheet => io_excel::read_spreadsheet_tally(&source.file_path, source),
    }?;
    info!(
        "Read {} bureaus from {:?}",
        records.len(),
        source.file_path
    );
    Ok(records)
}

/// Reads all the tally sources and concatenates them once.
fn read_tallies(sources: &[TallySource]) -> MapResult<Vec<TallyRecord>> {
    if sources.is_empty() {
        whatever!("No tally source configured");
    }
    let per_source: Vec<Vec<TallyRecord>> = sources
        .iter()
        .map(read_tally_source)
        .collect::<MapResult<Vec<_>>>()?;
    Ok(per_source.into_iter().flatten().collect())
}

fn build_resolver(config: &MapConfig) -> MapResult<FamilyResolver> {
    let resolver = FamilyResolver::new(&config.special_cases());
    match &config.party_lookup_file {
        Some(path) => {
            let lookup = io_party_lookup::read_party_lookup(path)?;
            info!("Read {} entries from party lookup {:?}", lookup.len(), path);
            Ok(resolver.with_lookup(&lookup))
        }
        None => Ok(resolver),
    }
}

fn write_artifact(path: &str, contents: &str) -> MapResult<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context(WritingOutputSnafu { path })?;
        }
    }
    fs::write(path, contents).context(WritingOutputSnafu { path })
}

fn check_reference(reference_path: &str, rendered: &str) -> MapResult<()> {
    let reference =
        fs::read_to_string(reference_path).context(OpeningFileSnafu {
            path: reference_path,
        })?;
    if reference != rendered {
        warn!("Found differences with the reference map");
        print_diff(reference.as_str(), rendered, "\n");
        return ReferenceMismatchSnafu {
            path: reference_path,
        }
        .fail();
    }
    info!("The rendered map matches the reference {:?}", reference_path);
    Ok(())
}

/// Runs the whole pipeline: load, join, compute, render, write.
pub fn run_map(config: &MapConfig, reference_path: Option<&str>) -> MapResult<RunSummary> {
    debug!("run_map: config: {:?}", config);
    let resolver = build_resolver(config)?;
    let palette = config.family_palette();

    info!(
        "Loading the voting bureaus from {:?}",
        config.geometry_source.file_path
    );
    let geometry: Vec<VotingBureau> = io_geojson::read_geometry(&config.geometry_source)?;
    info!("Loaded {} voting bureaus", geometry.len());

    let tallies = read_tallies(&config.tally_sources)?;
    info!("Loaded {} tally rows", tallies.len());

    let (joined, report): (Vec<(VotingBureau, Option<TallyRecord>)>, JoinReport) =
        join::join_bureaus(geometry, tallies)?;
    info!(
        "Joined {} bureaus: {} with results, {} without",
        joined.len(),
        report.matched,
        report.unmatched_geometry.len()
    );
    let enriched: Vec<EnrichedBureau> = join::enrich_bureaus(joined, &palette, &resolver);

    let (map_layers, skipped) =
        layers::build_layers(&enriched, &config.layers, &config.top3_palette());
    let rendered = render_html::render_map(&map_layers, &config.output_settings)?;

    let output_file = config.output_settings.output_file();
    write_artifact(&output_file, &rendered)?;
    let fingerprint = sha256::digest(rendered.as_str());
    info!("Map saved in {:?} (sha256 {})", output_file, fingerprint);

    if let Some(reference) = reference_path {
        check_reference(reference, &rendered)?;
    }

    Ok(RunSummary {
        bureaus: enriched.len(),
        matched: report.matched,
        unmatched_geometry: report
            .unmatched_geometry
            .iter()
            .map(|k| k.to_string())
            .collect(),
        unmatched_tallies: report
            .unmatched_tallies
            .iter()
            .map(|k| k.to_string())
            .collect(),
        skipped_geometries: skipped,
        output_file,
        sha256: fingerprint,
    })
}

/// Entry point of the command line: reads the configuration, applies the
/// flags and runs the pipeline.
pub fn run_cli(args: &Args) -> MapResult<RunSummary> {
    let mut config = read_config(args.config.as_deref())?;
    config.apply_overrides(
        args.excel_file.as_deref(),
        args.geojson_file.as_deref(),
        args.output_file.as_deref(),
    );
    run_map(&config, args.reference.as_deref())
}

/// The run summary as printed on the standard output.
pub fn summary_json(summary: &RunSummary) -> MapResult<String> {
    serde_json::to_string_pretty(summary).context(SerializingJsonSnafu {})
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const GEOJSON: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {"type": "Feature", "properties": {"id_bv": "1-1", "arrondissement": 1},
         "geometry": {"type": "Polygon", "coordinates": [[[2.30, 48.80], [2.31, 48.80], [2.31, 48.81], [2.30, 48.81], [2.30, 48.80]]]}},
        {"type": "Feature", "properties": {"id_bv": "1-2", "arrondissement": 1},
         "geometry": {"type": "Polygon", "coordinates": [[[2.31, 48.80], [2.32, 48.80], [2.32, 48.81], [2.31, 48.81], [2.31, 48.80]]]}},
        {"type": "Feature", "properties": {"id_bv": "2-1", "arrondissement": 2},
         "geometry": {"type": "Polygon", "coordinates": [[[2.32, 48.80], [2.33, 48.80], [2.33, 48.81], [2.32, 48.81], [2.32, 48.80]]]}},
        {"type": "Feature", "properties": {"id_bv": "2-2", "arrondissement": 2},
         "geometry": null}
      ]
    }"#;

    const ARR_1: &str = "ID_BVOTE;NB_INSCR;NB_VOTANT;NB_BLANC;NB_NUL;NB_EXPRIM;Mme A (PS);M. B (LR);M. C (EELV)\n\
        1;1000;600;10;10;580;290;145;145\n\
        2;800;200;0;0;200;20;150;30\n\
        ;;;;;;;;\n";

    // Bureau 2-1 has no registered voters; bureau 2-9 has no shape.
    const ARR_2: &str = "ID_BVOTE;NB_INSCR;NB_VOTANT;NB_BLANC;NB_NUL;NB_EXPRIM;Mme A (PS);M. B (LR);M. C (EELV)\n\
        1;0;0;0;0;0;0;0;0\n\
        9;100;50;0;0;50;10;20;20\n";

    fn setup(dir: &Path) -> MapConfig {
        fs::write(dir.join("bureaux.geojson"), GEOJSON).unwrap();
        fs::write(dir.join("Arr_1.csv"), ARR_1).unwrap();
        fs::write(dir.join("Arr_2.csv"), ARR_2).unwrap();
        let config_js = json!({
            "geometrySource": {"filePath": "bureaux.geojson"},
            "tallySources": [
                {"provider": "csv", "filePath": "Arr_1.csv"},
                {"provider": "csv", "filePath": "Arr_2.csv"}
            ],
            "outputSettings": {"outputFile": "out/nested/map.html", "title": "Test"}
        });
        let config_path: PathBuf = dir.join("config.json");
        fs::write(&config_path, config_js.to_string()).unwrap();
        read_config(config_path.to_str()).unwrap()
    }

    #[test]
    fn end_to_end_csv() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());
        let summary = run_map(&config, None).unwrap();
        assert_eq!(summary.bureaus, 4);
        assert_eq!(summary.matched, 3);
        assert_eq!(summary.unmatched_geometry, vec!["2-2".to_string()]);
        assert_eq!(summary.unmatched_tallies, vec!["2-9".to_string()]);
        assert_eq!(summary.skipped_geometries, 1);

        let html = fs::read_to_string(dir.path().join("out/nested/map.html")).unwrap();
        assert!(html.contains("L.control.layers"));
        // Bureau 1-1: 40% abstention, PS first.
        assert!(html.contains("#fc8d59"));
        assert!(html.contains("hotpink"));
        // Bureau 2-1: no registered voters.
        assert!(html.contains(layers::NO_DATA_COLOR));

        let js = summary_json(&summary).unwrap();
        assert!(js.contains("\"unmatchedTallies\": [\n    \"2-9\"\n  ]"), "{}", js);
        let back: RunSummary = serde_json::from_str(&js).unwrap();
        assert_eq!(back, summary);
    }

    #[test]
    fn rendering_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());
        let first = run_map(&config, None).unwrap();
        let first_html = fs::read_to_string(&first.output_file).unwrap();
        let reference = dir.path().join("reference.html");
        fs::write(&reference, &first_html).unwrap();
        let second = run_map(&config, reference.to_str()).unwrap();
        let second_html = fs::read_to_string(&second.output_file).unwrap();
        assert_eq!(first.sha256, second.sha256);
        assert_eq!(first_html, second_html);
    }

    #[test]
    fn reference_mismatch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());
        let reference = dir.path().join("reference.html");
        fs::write(&reference, "<html></html>\n").unwrap();
        let res = run_map(&config, reference.to_str());
        assert!(matches!(res, Err(MapError::ReferenceMismatch { .. })));
    }

    #[test]
    fn duplicate_tallies_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = setup(dir.path());
        let again = config.tally_sources[0].clone();
        config.tally_sources.push(again);
        let res = run_map(&config, None);
        assert!(matches!(res, Err(MapError::DuplicateKey { .. })));
    }

    #[test]
    fn missing_tally_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = setup(dir.path());
        config.tally_sources[0].file_path = dir
            .path()
            .join("Arr_404.csv")
            .to_str()
            .unwrap()
            .to_string();
        let res = run_map(&config, None);
        assert!(matches!(res, Err(MapError::OpeningCsv { .. })));
    }
}
