// Primitives for reading the tally workbooks (xlsx, xls, ods).

use calamine::Range;

use crate::mapping::io_common::{district_from_file_name, normalize_header, TallyLayout};
use crate::mapping::*;

fn get_range(path: &str, source: &TallySource) -> MapResult<Range<DataType>> {
    let mut workbook = open_workbook_auto(path).context(OpeningExcelSnafu { path })?;
    let wrange = match &source.excel_worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { path, name })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?,
    }
    .context(OpeningExcelSnafu { path })?;
    Ok(wrange)
}

/// The text of a cell, as it would appear in a CSV export.
fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) => f.to_string(),
        DataType::Bool(b) => b.to_string(),
        // Dates are kept as their serial value.
        DataType::DateTime(f) => f.to_string(),
        DataType::Empty => "".to_string(),
        DataType::Error(e) => {
            debug!("cell_to_string: error cell {:?} read as empty", e);
            "".to_string()
        }
        #[allow(unreachable_patterns)]
        _ => "".to_string(),
    }
}

pub fn records_from_range(
    wrange: &Range<DataType>,
    path: &str,
    source: &TallySource,
) -> MapResult<Vec<TallyRecord>> {
    let mut rows = wrange.rows();
    let header: Vec<String> = rows
        .next()
        .context(EmptyExcelSnafu { path })?
        .iter()
        .map(|c| normalize_header(&cell_to_string(c)))
        .collect();
    debug!("records_from_range: header: {:?}", header);
    let layout = TallyLayout::from_header(&header, path)?;
    let file_district = district_from_file_name(path);

    let mut res: Vec<TallyRecord> = Vec::new();
    for (idx, row) in rows.enumerate() {
        let lineno = (idx + 2) as u64;
        let cells: Vec<String> = row.iter().map(cell_to_string).collect();
        if let Some(rec) = layout.read_row(&cells, source.district, file_district, path, lineno)? {
            debug!("records_from_range: lineno: {:?} record: {:?}", lineno, rec);
            res.push(rec);
        }
    }
    Ok(res)
}

pub fn read_spreadsheet_tally(path: &str, source: &TallySource) -> MapResult<Vec<TallyRecord>> {
    let wrange = get_range(path, source)?;
    debug!(
        "read_spreadsheet_tally: {}: {:?} cells",
        path,
        wrange.get_size()
    );
    records_from_range(&wrange, path, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(rows: &[Vec<DataType>]) -> Range<DataType> {
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(1) as u32;
        let mut range = Range::new((0, 0), (rows.len() as u32 - 1, width - 1));
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                range.set_value((r as u32, c as u32), cell.clone());
            }
        }
        range
    }

    fn s(x: &str) -> DataType {
        DataType::String(x.to_string())
    }

    #[test]
    fn proportions_workbook() {
        let range = sheet(&[
            vec![
                s("NUM_ARROND"),
                s("NUM_BUREAU"),
                s("Participation"),
                s("Porportion_Mme A (PS)"),
                s("Porportion_M. B (LR)"),
            ],
            vec![
                DataType::Float(1.0),
                s("1-1"),
                DataType::Float(0.6),
                DataType::Float(0.55),
                DataType::Float(0.45),
            ],
            vec![
                DataType::Int(1),
                DataType::Int(2),
                DataType::Float(0.5),
                DataType::Float(0.2),
                DataType::Empty,
            ],
            vec![DataType::Empty, DataType::Empty, DataType::Empty],
        ]);
        let source = TallySource::spreadsheet("Tous_arr.xlsx");
        let res = records_from_range(&range, "Tous_arr.xlsx", &source).unwrap();
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].key, BureauKey::new(1, 1));
        assert_eq!(
            res[0].counts,
            TallyCounts::Proportions {
                participation: Some(0.6),
                proportions: vec![
                    ("Mme A (PS)".to_string(), Some(0.55)),
                    ("M. B (LR)".to_string(), Some(0.45))
                ],
            }
        );
        assert_eq!(res[1].key, BureauKey::new(1, 2));
        assert_eq!(
            bureau_abstention(&res[1].counts).map(|a| a.round()),
            Some(50.0)
        );
    }

    #[test]
    fn raw_counts_workbook() {
        let range = sheet(&[
            vec![
                s("ID_BVOTE"),
                s("DATE"),
                s("NB_INSCR"),
                s("NB_VOTANT"),
                s("NB_EXPRIM"),
                s("M. X"),
                s("Mme Y"),
            ],
            vec![
                s("7-12"),
                DataType::DateTime(43906.0),
                DataType::Float(100.0),
                DataType::Float(50.0),
                DataType::Float(40.0),
                DataType::Float(30.0),
                DataType::Float(10.0),
            ],
        ]);
        let path = "Municipales_2020_Ardt_07_2nd_tour.xls";
        let source = TallySource::spreadsheet(path);
        let res = records_from_range(&range, path, &source).unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].key, BureauKey::new(7, 12));
        assert_eq!(
            candidate_shares(&res[0].counts),
            vec![
                ("M. X".to_string(), Some(75.0)),
                ("Mme Y".to_string(), Some(25.0))
            ]
        );
    }

    #[test]
    fn cells() {
        assert_eq!(cell_to_string(&DataType::Float(7.0)), "7");
        assert_eq!(cell_to_string(&DataType::Float(0.25)), "0.25");
        assert_eq!(cell_to_string(&DataType::Int(12)), "12");
        assert_eq!(cell_to_string(&DataType::Empty), "");
    }

    #[test]
    fn missing_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.xlsx");
        let p = path.to_str().unwrap();
        let res = read_spreadsheet_tally(p, &TallySource::spreadsheet(p));
        assert!(matches!(res, Err(MapError::OpeningExcel { .. })));
    }
}
