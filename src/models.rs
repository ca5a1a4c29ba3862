use std::fmt;

/// A (subject, predicate, object) statement in a knowledge graph.
///
/// Subject and object are compound identifiers (`type::raw`); the predicate
/// is an opaque relation name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Triple {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

/// A parsed compound identifier: type prefix plus raw identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    pub entity_type: String,
    pub raw: String,
}

/// The (source-type, predicate, destination-type) tuple that partitions
/// edges into homogeneous relation groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeType {
    pub src_type: String,
    pub predicate: String,
    pub dst_type: String,
}

impl EdgeType {
    pub fn new(
        src_type: impl Into<String>,
        predicate: impl Into<String>,
        dst_type: impl Into<String>,
    ) -> Self {
        Self {
            src_type: src_type.into(),
            predicate: predicate.into(),
            dst_type: dst_type.into(),
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.src_type, self.predicate, self.dst_type)
    }
}

/// The small labeled social-network graph (karate club), loaded from CSV.
///
/// `labels[i]` is 0 for "Mr. Hi" and 1 for "Officer"; `one_hot[i]` is the
/// corresponding one-hot encoding. Nodes appear in file order.
#[derive(Debug, Clone)]
pub struct LabeledGraph {
    pub src: Vec<u32>,
    pub dst: Vec<u32>,
    pub labels: Vec<u8>,
    pub one_hot: Vec<[u8; 2]>,
}

impl LabeledGraph {
    pub fn num_edges(&self) -> usize {
        self.src.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.labels.len()
    }
}
