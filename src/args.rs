use clap::Parser;

/// Draws the results of a municipal election on a map of the voting bureaus.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file describing the map: tally sources, geometry, colors and layers.
    /// Without it, the built-in description of the first round of the 2020 Paris election is used.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A workbook with the results per bureau. Setting this option replaces the tally
    /// sources of the configuration.
    #[clap(long, value_parser)]
    pub excel_file: Option<String>,

    /// (file path) A GeoJSON file with the polygons of the voting bureaus. Overrides the configuration.
    #[clap(long, value_parser)]
    pub geojson_file: Option<String>,

    /// (file path) Where the HTML map is written. Missing directories are created. Overrides the configuration.
    #[clap(long, value_parser)]
    pub output_file: Option<String>,

    /// (file path) A previously rendered map. If provided, munimap will check that the rendered map
    /// is identical and print the differences otherwise.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags() {
        let args = Args::parse_from([
            "munimap",
            "--excel-file",
            "t.xlsx",
            "--geojson-file",
            "b.geojson",
            "--output-file",
            "out/map.html",
            "--verbose",
        ]);
        assert_eq!(args.excel_file.as_deref(), Some("t.xlsx"));
        assert_eq!(args.geojson_file.as_deref(), Some("b.geojson"));
        assert_eq!(args.output_file.as_deref(), Some("out/map.html"));
        assert_eq!(args.config, None);
        assert!(args.verbose);
    }

    #[test]
    fn defaults() {
        let args = Args::parse_from(["munimap"]);
        assert_eq!(args.excel_file, None);
        assert!(!args.verbose);
    }
}
