use crate::config::CSV_BUF_SIZE;
use crate::error::PrepError;
use anyhow::{Context, Result};
use csv::StringRecord;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

pub const NODE_FEAT: &str = "node-feat.csv";
pub const NODE_LABEL: &str = "node-label.csv";
pub const AUTHOR_WRITE_PAPER: &str = "author_write_paper_edge.csv";
pub const AUTHOR_AFFILIATED: &str = "author_affiliated_with_institution_edge.csv";
pub const PAPER_HAS_TOPIC: &str = "paper_has_topic_field_of_study_edge.csv";
pub const PAPER_CITES_PAPER: &str = "paper_cites_paper_edge.csv";

/// Dense id assignment for one node type, built from the sorted set of
/// distinct raw values. Sorted assignment (not first-seen) makes the
/// mapping reproducible across runs on the same dataset.
#[derive(Debug)]
pub struct NodeIdMap {
    map: BTreeMap<i64, u32>,
}

impl NodeIdMap {
    pub fn from_raw_values(values: impl IntoIterator<Item = i64>) -> Self {
        let distinct: BTreeSet<i64> = values.into_iter().collect();
        let map = distinct
            .into_iter()
            .enumerate()
            .map(|(id, raw)| (raw, id as u32))
            .collect();
        Self { map }
    }

    pub fn get(&self, raw: i64) -> Option<u32> {
        self.map.get(&raw).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// One relation table held fully in memory. The datasets here are small
/// tutorial inputs, so there is no need to stream.
struct Table {
    name: String,
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl Table {
    fn read(dir: &Path, name: &str) -> Result<Self> {
        let path = dir.join(name);
        let file =
            File::open(&path).with_context(|| format!("Failed to open table: {:?}", path))?;
        let mut reader = csv::Reader::from_reader(BufReader::new(file));

        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read headers of {:?}", path))?
            .clone();
        let mut rows = Vec::new();
        for result in reader.records() {
            rows.push(result.with_context(|| format!("Failed to read row in {:?}", path))?);
        }

        info!(table = name, rows = rows.len(), "Table loaded");
        Ok(Self {
            name: name.to_string(),
            headers,
            rows,
        })
    }

    fn column(&self, name: &str) -> Result<usize, PrepError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| PrepError::MissingColumn {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    /// Parses one column as integers, row by row.
    fn int_column(&self, idx: usize) -> Result<Vec<i64>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(row, record)| {
                record[idx].parse::<i64>().with_context(|| {
                    format!(
                        "{} row {}: expected integer in column {}, found {:?}",
                        self.name, row, idx, &record[idx]
                    )
                })
            })
            .collect()
    }
}

/// Replaces raw ids with dense ids via the node type's mapping. A raw value
/// absent from the mapping means the mapping was not built from every table
/// referencing that type; fail before anything is written.
fn densify(
    table: &str,
    node_type: &'static str,
    raws: &[i64],
    map: &NodeIdMap,
) -> Result<Vec<u32>, PrepError> {
    raws.iter()
        .map(|&raw| {
            map.get(raw).ok_or(PrepError::UnmappedReference {
                node_type,
                raw,
                table: table.to_string(),
            })
        })
        .collect()
}

/// Renames the `id` header cell to `paper`, leaving other cells untouched.
fn rename_id_to_paper(headers: &StringRecord) -> StringRecord {
    headers
        .iter()
        .map(|h| if h == "id" { "paper" } else { h })
        .collect()
}

#[derive(Debug, Default)]
pub struct ReindexSummary {
    pub authors: usize,
    pub institutions: usize,
    pub fields_of_study: usize,
    pub write_rows: usize,
    pub affiliation_rows: usize,
    pub topic_rows: usize,
    pub citation_rows: usize,
}

/// Re-indexes the small academic-citation dataset into dense integer ids.
///
/// Node id mappings are built per type from the sorted distinct raw values of
/// the columns referencing that type, then every relation table's endpoint
/// columns are rewritten. All tables are translated in memory before the
/// output directory is touched; on success the directory is recreated from
/// scratch (replace, not merge) and populated with the six CSVs.
pub fn run_reindex(input_dir: &Path, output_dir: &Path) -> Result<ReindexSummary> {
    let write = Table::read(input_dir, AUTHOR_WRITE_PAPER)?;
    let affiliation = Table::read(input_dir, AUTHOR_AFFILIATED)?;
    let topic = Table::read(input_dir, PAPER_HAS_TOPIC)?;
    let citation = Table::read(input_dir, PAPER_CITES_PAPER)?;
    let features = Table::read(input_dir, NODE_FEAT)?;
    let labels = Table::read(input_dir, NODE_LABEL)?;

    let write_authors = write.int_column(write.column("author")?)?;
    let write_papers: Vec<String> = {
        let idx = write.column("author.paper")?;
        write.rows.iter().map(|r| r[idx].to_string()).collect()
    };
    let affiliation_authors = affiliation.int_column(affiliation.column("author")?)?;
    let affiliation_institutions =
        affiliation.int_column(affiliation.column("author.institution")?)?;
    let topic_papers: Vec<String> = {
        let idx = topic.column("paper")?;
        topic.rows.iter().map(|r| r[idx].to_string()).collect()
    };
    let topic_fields = topic.int_column(topic.column("field_of_study")?)?;

    // The author map must cover every table that references authors, so it
    // is built from the union of both author columns.
    let author_map = NodeIdMap::from_raw_values(
        write_authors
            .iter()
            .chain(affiliation_authors.iter())
            .copied(),
    );
    let institution_map = NodeIdMap::from_raw_values(affiliation_institutions.iter().copied());
    let field_map = NodeIdMap::from_raw_values(topic_fields.iter().copied());

    info!(
        authors = author_map.len(),
        institutions = institution_map.len(),
        fields_of_study = field_map.len(),
        "Node id mappings built"
    );

    let write_author_ids = densify(AUTHOR_WRITE_PAPER, "author", &write_authors, &author_map)?;
    let affiliation_author_ids = densify(
        AUTHOR_AFFILIATED,
        "author",
        &affiliation_authors,
        &author_map,
    )?;
    let affiliation_institution_ids = densify(
        AUTHOR_AFFILIATED,
        "institution",
        &affiliation_institutions,
        &institution_map,
    )?;
    let topic_field_ids = densify(PAPER_HAS_TOPIC, "field_of_study", &topic_fields, &field_map)?;

    // Everything translated; now it is safe to replace the output directory.
    if output_dir.exists() {
        fs::remove_dir_all(output_dir)
            .with_context(|| format!("Failed to clean output directory: {:?}", output_dir))?;
    }
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    write_pairs(
        output_dir,
        AUTHOR_WRITE_PAPER,
        ["author", "paper"],
        write_author_ids.iter().map(u32::to_string),
        write_papers.iter().cloned(),
    )?;
    write_pairs(
        output_dir,
        AUTHOR_AFFILIATED,
        ["author", "institution"],
        affiliation_author_ids.iter().map(u32::to_string),
        affiliation_institution_ids.iter().map(u32::to_string),
    )?;
    write_pairs(
        output_dir,
        PAPER_HAS_TOPIC,
        ["paper", "field_of_study"],
        topic_papers.iter().cloned(),
        topic_field_ids.iter().map(u32::to_string),
    )?;

    write_table(output_dir, PAPER_CITES_PAPER, &citation.headers, &citation.rows)?;
    write_table(
        output_dir,
        NODE_FEAT,
        &rename_id_to_paper(&features.headers),
        &features.rows,
    )?;
    write_table(
        output_dir,
        NODE_LABEL,
        &rename_id_to_paper(&labels.headers),
        &labels.rows,
    )?;

    Ok(ReindexSummary {
        authors: author_map.len(),
        institutions: institution_map.len(),
        fields_of_study: field_map.len(),
        write_rows: write.rows.len(),
        affiliation_rows: affiliation.rows.len(),
        topic_rows: topic.rows.len(),
        citation_rows: citation.rows.len(),
    })
}

fn csv_writer(dir: &Path, name: &str) -> Result<csv::Writer<BufWriter<File>>> {
    let path = dir.join(name);
    let file =
        File::create(&path).with_context(|| format!("Failed to create output: {:?}", path))?;
    Ok(csv::Writer::from_writer(BufWriter::with_capacity(
        CSV_BUF_SIZE,
        file,
    )))
}

fn write_pairs(
    dir: &Path,
    name: &str,
    header: [&str; 2],
    left: impl Iterator<Item = String>,
    right: impl Iterator<Item = String>,
) -> Result<()> {
    let mut writer = csv_writer(dir, name)?;
    writer.write_record(header)?;
    let mut rows = 0usize;
    for (a, b) in left.zip(right) {
        writer.write_record([a, b])?;
        rows += 1;
    }
    writer.flush()?;
    info!(table = name, rows, "Relation table written");
    Ok(())
}

fn write_table(
    dir: &Path,
    name: &str,
    headers: &StringRecord,
    rows: &[StringRecord],
) -> Result<()> {
    let mut writer = csv_writer(dir, name)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    info!(table = name, rows = rows.len(), "Table written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_map_assigns_ids_in_sorted_order() {
        let map = NodeIdMap::from_raw_values([42, 7, 1000, 7, 3]);
        assert_eq!(map.len(), 4);
        assert_eq!(map.get(3), Some(0));
        assert_eq!(map.get(7), Some(1));
        assert_eq!(map.get(42), Some(2));
        assert_eq!(map.get(1000), Some(3));
    }

    #[test]
    fn node_id_map_is_a_bijection_onto_zero_to_n() {
        let raws = [9, 2, 5, 2, 9, 11];
        let map = NodeIdMap::from_raw_values(raws);
        let mut ids: Vec<u32> = raws.iter().filter_map(|&r| map.get(r)).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn node_id_map_misses_return_none() {
        let map = NodeIdMap::from_raw_values([1, 2, 3]);
        assert_eq!(map.get(4), None);
    }

    #[test]
    fn densify_translates_via_map() {
        let map = NodeIdMap::from_raw_values([30, 10, 20]);
        let dense = densify("t.csv", "author", &[10, 30, 10, 20], &map).unwrap();
        assert_eq!(dense, vec![0, 2, 0, 1]);
    }

    #[test]
    fn densify_fails_on_unmapped_reference() {
        let map = NodeIdMap::from_raw_values([10, 20]);
        let err = densify("t.csv", "author", &[10, 99], &map).unwrap_err();
        match err {
            PrepError::UnmappedReference {
                node_type, raw, ..
            } => {
                assert_eq!(node_type, "author");
                assert_eq!(raw, 99);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rename_only_touches_id_header() {
        let headers = StringRecord::from(vec!["id", "feat_0", "feat_1"]);
        let renamed = rename_id_to_paper(&headers);
        assert_eq!(renamed, StringRecord::from(vec!["paper", "feat_0", "feat_1"]));

        let no_id = StringRecord::from(vec!["paper", "label"]);
        assert_eq!(rename_id_to_paper(&no_id), no_id);
    }
}
