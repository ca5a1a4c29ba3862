use crate::config::CSV_BUF_SIZE;
use crate::entity::EntityDictionary;
use crate::error::PrepError;
use crate::models::{EdgeType, Triple};
use crate::triples::parse_entity;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

/// Edges grouped by their (src-type, predicate, dst-type) key.
///
/// Group keys keep the insertion order of their first occurrence; pairs
/// within a group keep triple order. Duplicate pairs are preserved, so the
/// total pair count always equals the input triple count.
#[derive(Debug, Default)]
pub struct EdgeDictionary {
    groups: IndexMap<EdgeType, Vec<(u32, u32)>>,
}

impl EdgeDictionary {
    /// Re-walks the triple sequence, replacing each endpoint with its dense
    /// id from `entities`. The dictionary must have been built from the same
    /// triples; a lookup miss is a contract violation, not a data error.
    pub fn build(triples: &[Triple], entities: &EntityDictionary) -> Result<Self> {
        let mut groups: IndexMap<EdgeType, Vec<(u32, u32)>> = IndexMap::new();

        for triple in triples {
            let src = parse_entity(&triple.subject)?;
            let dst = parse_entity(&triple.object)?;

            let src_id = entities.lookup(&src.entity_type, &src.raw).ok_or_else(|| {
                PrepError::UnknownEntity {
                    entity_type: src.entity_type.clone(),
                    raw: src.raw.clone(),
                }
            })?;
            let dst_id = entities.lookup(&dst.entity_type, &dst.raw).ok_or_else(|| {
                PrepError::UnknownEntity {
                    entity_type: dst.entity_type.clone(),
                    raw: dst.raw.clone(),
                }
            })?;

            let key = EdgeType::new(src.entity_type, triple.predicate.as_str(), dst.entity_type);
            groups.entry(key).or_default().push((src_id, dst_id));
        }

        info!(
            edge_types = groups.len(),
            edges = triples.len(),
            "Edge dictionary built"
        );

        Ok(Self { groups })
    }

    pub fn num_edge_types(&self) -> usize {
        self.groups.len()
    }

    pub fn total_edges(&self) -> usize {
        self.groups.values().map(|pairs| pairs.len()).sum()
    }

    pub fn pairs(&self, key: &EdgeType) -> Option<&[(u32, u32)]> {
        self.groups.get(key).map(|v| v.as_slice())
    }

    /// Groups in insertion order of their first occurrence.
    pub fn iter(&self) -> impl Iterator<Item = (&EdgeType, &[(u32, u32)])> {
        self.groups.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Writes one `{src}_{pred}_{dst}_edge.csv` per edge type into `out_dir`,
    /// header `src_id,dst_id`, rows in triple order.
    pub fn write_edge_lists(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.groups.len());

        for (key, pairs) in &self.groups {
            let path = out_dir.join(edge_list_filename(key));
            let file = File::create(&path)
                .with_context(|| format!("Failed to create edge list: {:?}", path))?;
            let mut writer =
                csv::Writer::from_writer(BufWriter::with_capacity(CSV_BUF_SIZE, file));

            writer.write_record(["src_id", "dst_id"])?;
            for (src, dst) in pairs {
                writer.write_record([src.to_string(), dst.to_string()])?;
            }
            writer.flush()?;

            info!(edge_type = %key, edges = pairs.len(), path = ?path, "Edge list written");
            written.push(path);
        }

        Ok(written)
    }
}

/// Filename for an edge type's CSV, with path-hostile characters mapped to `_`.
pub fn edge_list_filename(key: &EdgeType) -> String {
    format!(
        "{}_{}_{}_edge.csv",
        sanitize(&key.src_type),
        sanitize(&key.predicate),
        sanitize(&key.dst_type)
    )
}

fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
