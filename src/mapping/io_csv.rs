// Primitives for reading the per-district CSV exports.

use std::fs::File;

use crate::mapping::io_common::{
    district_from_file_name, normalize_header, simplify_file_name, TallyLayout,
};
use crate::mapping::*;

fn get_records(path: &str, source: &TallySource) -> MapResult<csv::StringRecordsIntoIter<File>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(source.delimiter()?)
        .flexible(true)
        .from_path(path)
        .context(OpeningCsvSnafu { path })?;
    Ok(rdr.into_records())
}

pub fn read_csv_tally(path: &str, source: &TallySource) -> MapResult<Vec<TallyRecord>> {
    let mut records = get_records(path, source)?;
    let header: Vec<String> = match records.next() {
        Some(line_r) => line_r
            .context(CsvLineParseSnafu { path, lineno: 1u64 })?
            .iter()
            .map(normalize_header)
            .collect(),
        None => whatever!("The CSV file {} is empty", path),
    };
    debug!("read_csv_tally: header: {:?}", header);
    let layout = TallyLayout::from_header(&header, path)?;
    debug!("read_csv_tally: candidates: {:?}", layout.candidate_names());
    let file_district = district_from_file_name(path);
    debug!(
        "read_csv_tally: {}: file district {:?}",
        simplify_file_name(path),
        file_district
    );

    let mut res: Vec<TallyRecord> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        // The header is line 1.
        let lineno = (idx + 2) as u64;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        let cells: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        if let Some(rec) = layout.read_row(&cells, source.district, file_district, path, lineno)? {
            debug!("read_csv_tally: lineno: {:?} record: {:?}", lineno, rec);
            res.push(rec);
        }
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_source(path: &str) -> TallySource {
        TallySource {
            provider: "csv".to_string(),
            file_path: path.to_string(),
            district: None,
            delimiter: None,
            excel_worksheet_name: None,
        }
    }

    #[test]
    fn reads_an_export_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Arr_7.csv");
        fs::write(
            &path,
            "\u{feff}ID_BVOTE;NUM_BUREAU;NB_INSCR;NB_VOTANT;NB_BLANC;NB_NUL;NB_EXPRIM;Mme A (PS);M. B (LR)\n\
             12;12;1000;600;10;10;580;300;280\n\
             ;;;;;;;;\n\
             13;13;900;;0;0;0;0;0\n",
        )
        .unwrap();
        let p = path.to_str().unwrap();
        let res = read_csv_tally(p, &csv_source(p)).unwrap();
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].key, BureauKey::new(7, 12));
        assert_eq!(
            res[0].counts,
            TallyCounts::Raw {
                registered: Some(1000.0),
                turnout: Some(600.0),
                blank: Some(10.0),
                null: Some(10.0),
                expressed: Some(580.0),
                votes: vec![
                    ("Mme A (PS)".to_string(), Some(300.0)),
                    ("M. B (LR)".to_string(), Some(280.0))
                ],
            }
        );
        match &res[1].counts {
            TallyCounts::Raw { turnout, .. } => assert_eq!(*turnout, None),
            x => panic!("unexpected layout {:?}", x),
        }
    }

    #[test]
    fn composite_identifiers_are_not_doubled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Arr_5.csv");
        fs::write(
            &path,
            "ID_BVOTE,NB_INSCR,NB_VOTANT,NB_EXPRIM,X (LFI)\n5-3,10,5,5,5\n",
        )
        .unwrap();
        let p = path.to_str().unwrap();
        let mut source = csv_source(p);
        source.delimiter = Some(",".to_string());
        let res = read_csv_tally(p, &source).unwrap();
        assert_eq!(res[0].key, BureauKey::new(5, 3));
        assert_eq!(res[0].key.to_string(), "5-3");
    }

    #[test]
    fn mismatched_composite_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Arr_5.csv");
        fs::write(&path, "ID_BVOTE;NB_INSCR;NB_VOTANT;NB_EXPRIM\n6-3;10;5;5\n").unwrap();
        let p = path.to_str().unwrap();
        let res = read_csv_tally(p, &csv_source(p));
        assert!(matches!(
            res,
            Err(MapError::InvalidIdentifier { lineno: 2, .. })
        ));
    }

    #[test]
    fn explicit_district() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("premier_tour.csv");
        fs::write(&path, "ID_BVOTE;NB_INSCR;NB_VOTANT;NB_EXPRIM\n4;10;5;5\n").unwrap();
        let p = path.to_str().unwrap();
        assert!(matches!(
            read_csv_tally(p, &csv_source(p)),
            Err(MapError::MissingDistrict { .. })
        ));
        let mut source = csv_source(p);
        source.district = Some(18);
        let res = read_csv_tally(p, &source).unwrap();
        assert_eq!(res[0].key, BureauKey::new(18, 4));
    }

    #[test]
    fn digits_in_file_name_are_not_a_district() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["Tous_arr_2nd_tour.csv", "premier_tour_2020.csv"] {
            let path = dir.path().join(name);
            fs::write(&path, "ID_BVOTE;NB_INSCR;NB_VOTANT;NB_EXPRIM\n12;10;5;5\n").unwrap();
            let p = path.to_str().unwrap();
            assert!(matches!(
                read_csv_tally(p, &csv_source(p)),
                Err(MapError::MissingDistrict { .. })
            ));
        }
    }

    #[test]
    fn missing_required_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Arr_1.csv");
        fs::write(&path, "ID_BVOTE;NB_INSCR;NB_VOTANT\n1;10;5\n").unwrap();
        let p = path.to_str().unwrap();
        assert!(matches!(
            read_csv_tally(p, &csv_source(p)),
            Err(MapError::MissingColumn { .. })
        ));
    }
}
