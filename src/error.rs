use thiserror::Error;

/// Data-shape errors are fatal to the run: downstream correctness depends on
/// complete, consistent mappings, so there is no partial-output mode.
#[derive(Debug, Error)]
pub enum PrepError {
    /// A compound identifier is missing the `::` delimiter or has an
    /// empty type/raw segment.
    #[error("malformed identifier (expected 'type::raw'): {value:?}")]
    MalformedIdentifier { value: String },

    /// An edge endpoint was never registered in the entity dictionary.
    /// This is a contract violation (the indexer must see the same triples
    /// first), not a data error.
    #[error("edge references entity never indexed: {entity_type}::{raw}")]
    UnknownEntity { entity_type: String, raw: String },

    /// A relation-table row references a raw id absent from its node
    /// type's mapping.
    #[error("{table}: unmapped {node_type} id {raw}")]
    UnmappedReference {
        node_type: &'static str,
        raw: i64,
        table: String,
    },

    /// Non-2xx HTTP status or exhausted retries.
    #[error("download of {url} failed after {attempts} attempt(s): {reason}")]
    DownloadFailed {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// An input CSV lacks a required header.
    #[error("{table} is missing required column {column:?}")]
    MissingColumn { table: String, column: String },
}
