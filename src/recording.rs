use flate2::read::GzDecoder;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::Result;
use crate::types::Sample;

/// One row of an exported recording (`Timestamp,X,Y,Z`, seconds and m/s²)
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Timestamp")]
    timestamp: f64,
    #[serde(rename = "X")]
    x: f64,
    #[serde(rename = "Y")]
    y: f64,
    #[serde(rename = "Z")]
    z: f64,
}

impl From<CsvRow> for Sample {
    fn from(row: CsvRow) -> Self {
        Sample::new(row.timestamp, row.x, row.y, row.z)
    }
}

/// True for file names `load_recording` knows how to read
pub fn is_recording_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.ends_with(".csv") || name.ends_with(".json") || name.ends_with(".json.gz")
}

/// Load raw accelerometer samples, in file order.
///
/// `.csv` files carry the `Timestamp,X,Y,Z` header; anything else is a JSON
/// array of samples, gzip-compressed when the name ends in `.gz`.
pub fn load_recording(path: &Path) -> Result<Vec<Sample>> {
    let file = File::open(path)?;
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if name.ends_with(".csv") {
        return read_csv(BufReader::new(file));
    }
    if name.ends_with(".gz") {
        let reader = BufReader::new(GzDecoder::new(file));
        return Ok(serde_json::from_reader(reader)?);
    }
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn read_csv<R: Read>(reader: R) -> Result<Vec<Sample>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut samples = Vec::new();
    for row in rdr.deserialize::<CsvRow>() {
        samples.push(row?.into());
    }
    log::debug!("Loaded {} samples from CSV", samples.len());
    Ok(samples)
}
