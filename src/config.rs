/// Delimiter between the entity-type prefix and the raw identifier
/// in compound identifiers like `drug::DB00001`.
pub const TYPE_DELIMITER: &str = "::";

/// Remote location of the DRKG dataset archive.
pub const DRKG_URL: &str = "https://s3.us-west-2.amazonaws.com/dgl-data/dataset/DRKG/drkg.tar.gz";

/// Archive filename inside the data directory.
pub const DRKG_ARCHIVE: &str = "drkg.tar.gz";

/// File whose presence marks a completed extraction.
pub const DRKG_SENTINEL: &str = "drkg/drkg.tsv";

/// Maximum number of unpack-then-download attempts before giving up.
pub const DOWNLOAD_MAX_RETRIES: u32 = 3;

/// Base delay between download retries (doubles per attempt).
pub const DOWNLOAD_BACKOFF_BASE_SECS: u64 = 2;

/// Timeout applied to the whole HTTP request.
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 600;

/// Progress update interval (tick every N triples)
pub const PROGRESS_INTERVAL: u64 = 100_000;

/// Buffer size for CSV writers.
pub const CSV_BUF_SIZE: usize = 128 * 1024;
