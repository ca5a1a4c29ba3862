use crate::config::{PROGRESS_INTERVAL, TYPE_DELIMITER};
use crate::error::PrepError;
use crate::models::{EntityRef, Triple};
use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Splits a compound identifier like `drug::DB00001` into its type prefix
/// and raw identifier.
///
/// Only the first delimiter is significant; the raw part may itself contain
/// `::`. No normalization is performed (case- and whitespace-sensitive).
pub fn parse_entity(value: &str) -> Result<EntityRef, PrepError> {
    let (entity_type, raw) = value
        .split_once(TYPE_DELIMITER)
        .ok_or_else(|| PrepError::MalformedIdentifier {
            value: value.to_string(),
        })?;

    if entity_type.is_empty() || raw.is_empty() {
        return Err(PrepError::MalformedIdentifier {
            value: value.to_string(),
        });
    }

    Ok(EntityRef {
        entity_type: entity_type.to_string(),
        raw: raw.to_string(),
    })
}

/// Reads a headerless tab-separated triple file into memory.
///
/// Every record must have exactly three fields; ragged rows are errors.
pub fn read_triples(path: &Path) -> Result<Vec<Triple>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open triple file: {:?}", path))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_reader(BufReader::new(file));

    let pb = ProgressBar::new_spinner();
    let mut triples = Vec::new();

    for (row, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read triple at row {}", row))?;
        if record.len() != 3 {
            bail!(
                "Triple file {:?} row {}: expected 3 fields, found {}",
                path,
                row,
                record.len()
            );
        }
        triples.push(Triple::new(&record[0], &record[1], &record[2]));
        if triples.len() as u64 % PROGRESS_INTERVAL == 0 {
            pb.tick();
        }
    }

    pb.finish_and_clear();
    info!(triples = triples.len(), path = ?path, "Triple file loaded");

    Ok(triples)
}
