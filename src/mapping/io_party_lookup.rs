// The candidate -> party table (columns `Candidat,Parti` or `Candidat,Nuance`).

use crate::mapping::*;

pub fn read_party_lookup(path: &str) -> MapResult<Vec<(String, String)>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .context(OpeningCsvSnafu { path })?;
    let header = rdr.headers().context(OpeningCsvSnafu { path })?.clone();
    debug!("read_party_lookup: header: {:?}", header);
    if header.len() < 2 {
        return MissingColumnSnafu {
            column: "Parti",
            path,
        }
        .fail();
    }
    let mut res: Vec<(String, String)> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        let lineno = (idx + 2) as u64;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        let candidate = line.get(0).unwrap_or("").trim();
        let party = line.get(1).unwrap_or("").trim();
        if candidate.is_empty() || party.is_empty() {
            debug!("read_party_lookup: lineno {}: incomplete entry skipped", lineno);
            continue;
        }
        res.push((candidate.to_string(), party.to_string()));
    }
    Ok(res)
}
