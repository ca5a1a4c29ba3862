use crate::models::Triple;
use crate::triples::parse_entity;
use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// Per-type dense id assignment for knowledge-graph entities.
///
/// Each entity type owns an independent id space: ids are contiguous from 0
/// within a type and assigned in first-seen order of the input triples. Ids
/// are not globally unique across types.
#[derive(Debug, Default, Serialize)]
pub struct EntityDictionary {
    types: FxHashMap<String, FxHashMap<String, u32>>,
}

impl EntityDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the dense id for (type, raw), assigning the next id for that
    /// type on first sight. Re-inserting an existing pair is a no-op and
    /// returns the previously assigned id.
    pub fn get_or_insert(&mut self, entity_type: &str, raw: &str) -> u32 {
        let bucket = self.types.entry(entity_type.to_string()).or_default();
        let next_id = bucket.len() as u32;
        *bucket.entry(raw.to_string()).or_insert(next_id)
    }

    pub fn lookup(&self, entity_type: &str, raw: &str) -> Option<u32> {
        self.types.get(entity_type)?.get(raw).copied()
    }

    /// Number of distinct entities registered under a type.
    pub fn type_count(&self, entity_type: &str) -> usize {
        self.types.get(entity_type).map_or(0, |b| b.len())
    }

    pub fn num_types(&self) -> usize {
        self.types.len()
    }

    pub fn total_entities(&self) -> usize {
        self.types.values().map(|b| b.len()).sum()
    }

    /// Scans subjects and objects of the triple sequence and registers every
    /// (type, raw) pair in first-seen order.
    pub fn build(triples: &[Triple]) -> Result<Self> {
        let mut dict = Self::new();

        for triple in triples {
            let src = parse_entity(&triple.subject)?;
            let dst = parse_entity(&triple.object)?;
            dict.get_or_insert(&src.entity_type, &src.raw);
            dict.get_or_insert(&dst.entity_type, &dst.raw);
        }

        info!(
            types = dict.num_types(),
            entities = dict.total_entities(),
            "Entity dictionary built"
        );

        Ok(dict)
    }

    /// Writes the dictionary as JSON with keys in sorted order, so repeated
    /// runs produce identical bytes.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let stable: BTreeMap<&str, BTreeMap<&str, u32>> = self
            .types
            .iter()
            .map(|(ty, bucket)| {
                let inner = bucket.iter().map(|(k, v)| (k.as_str(), *v)).collect();
                (ty.as_str(), inner)
            })
            .collect();

        let file = File::create(path)
            .with_context(|| format!("Failed to create dictionary file: {:?}", path))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &stable)
            .with_context(|| format!("Failed to write dictionary file: {:?}", path))?;
        Ok(())
    }

    /// Per-type entity counts in sorted type order, for summary output.
    pub fn type_counts(&self) -> Vec<(&str, usize)> {
        let mut counts: Vec<_> = self
            .types
            .iter()
            .map(|(ty, bucket)| (ty.as_str(), bucket.len()))
            .collect();
        counts.sort();
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Triple;

    fn sample_triples() -> Vec<Triple> {
        vec![
            Triple::new("drug::A", "treats", "disease::X"),
            Triple::new("drug::B", "treats", "disease::X"),
            Triple::new("drug::A", "treats", "disease::Y"),
        ]
    }

    #[test]
    fn assigns_first_seen_order_per_type() {
        let dict = EntityDictionary::build(&sample_triples()).unwrap();
        assert_eq!(dict.lookup("drug", "A"), Some(0));
        assert_eq!(dict.lookup("drug", "B"), Some(1));
        assert_eq!(dict.lookup("disease", "X"), Some(0));
        assert_eq!(dict.lookup("disease", "Y"), Some(1));
    }

    #[test]
    fn ids_are_contiguous_within_type() {
        let dict = EntityDictionary::build(&sample_triples()).unwrap();
        assert_eq!(dict.type_count("drug"), 2);
        assert_eq!(dict.type_count("disease"), 2);
        for raw in ["A", "B"] {
            let id = dict.lookup("drug", raw).unwrap();
            assert!((id as usize) < dict.type_count("drug"));
        }
    }

    #[test]
    fn reinsert_is_idempotent() {
        let mut dict = EntityDictionary::new();
        let first = dict.get_or_insert("drug", "A");
        dict.get_or_insert("drug", "B");
        let again = dict.get_or_insert("drug", "A");
        assert_eq!(first, again);
        assert_eq!(dict.type_count("drug"), 2);
    }

    #[test]
    fn id_spaces_are_independent_across_types() {
        let mut dict = EntityDictionary::new();
        assert_eq!(dict.get_or_insert("drug", "A"), 0);
        assert_eq!(dict.get_or_insert("disease", "A"), 0);
        assert_eq!(dict.get_or_insert("drug", "B"), 1);
    }

    #[test]
    fn build_is_deterministic() {
        let triples = sample_triples();
        let a = EntityDictionary::build(&triples).unwrap();
        let b = EntityDictionary::build(&triples).unwrap();
        for (ty, raw) in [("drug", "A"), ("drug", "B"), ("disease", "X"), ("disease", "Y")] {
            assert_eq!(a.lookup(ty, raw), b.lookup(ty, raw));
        }
    }

    #[test]
    fn raw_ids_are_case_sensitive() {
        let mut dict = EntityDictionary::new();
        assert_eq!(dict.get_or_insert("drug", "A"), 0);
        assert_eq!(dict.get_or_insert("drug", "a"), 1);
    }

    #[test]
    fn build_fails_on_malformed_identifier() {
        let triples = vec![Triple::new("no-delimiter", "treats", "disease::X")];
        assert!(EntityDictionary::build(&triples).is_err());
    }

    #[test]
    fn lookup_misses_return_none() {
        let dict = EntityDictionary::build(&sample_triples()).unwrap();
        assert_eq!(dict.lookup("drug", "Z"), None);
        assert_eq!(dict.lookup("gene", "A"), None);
    }
}
