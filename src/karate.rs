use crate::error::PrepError;
use crate::models::LabeledGraph;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Loads the labeled social-network example graph from its two CSV files.
///
/// `edges_csv` needs integer `Src`/`Dst` columns; `nodes_csv` needs a `Club`
/// column whose value is either "Mr. Hi" or "Officer". Labels are 0 for
/// "Mr. Hi" and 1 for "Officer", with a matching one-hot encoding. Graph
/// construction itself is left to whatever graph library consumes the result.
pub fn load_karate(nodes_csv: &Path, edges_csv: &Path) -> Result<LabeledGraph> {
    let (src, dst) = read_edges(edges_csv)?;
    let labels = read_labels(nodes_csv)?;
    let one_hot = labels
        .iter()
        .map(|&l| if l == 0 { [1, 0] } else { [0, 1] })
        .collect();

    info!(
        nodes = labels.len(),
        edges = src.len(),
        "Social graph loaded"
    );

    Ok(LabeledGraph {
        src,
        dst,
        labels,
        one_hot,
    })
}

fn open_table(path: &Path) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("Failed to open table: {:?}", path))?;
    Ok(csv::Reader::from_reader(BufReader::new(file)))
}

fn column(headers: &csv::StringRecord, path: &Path, name: &str) -> Result<usize, PrepError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| PrepError::MissingColumn {
            table: path.display().to_string(),
            column: name.to_string(),
        })
}

fn read_edges(path: &Path) -> Result<(Vec<u32>, Vec<u32>)> {
    let mut reader = open_table(path)?;
    let headers = reader.headers()?.clone();
    let src_idx = column(&headers, path, "Src")?;
    let dst_idx = column(&headers, path, "Dst")?;

    let mut src = Vec::new();
    let mut dst = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row in {:?}", path))?;
        let parse = |idx: usize| {
            record[idx]
                .parse::<u32>()
                .with_context(|| format!("{:?} row {}: expected integer node id", path, row))
        };
        src.push(parse(src_idx)?);
        dst.push(parse(dst_idx)?);
    }
    Ok((src, dst))
}

fn read_labels(path: &Path) -> Result<Vec<u8>> {
    let mut reader = open_table(path)?;
    let headers = reader.headers()?.clone();
    let club_idx = column(&headers, path, "Club")?;

    let mut labels = Vec::new();
    for result in reader.records() {
        let record = result.with_context(|| format!("Failed to read row in {:?}", path))?;
        labels.push(u8::from(&record[club_idx] == "Officer"));
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_edges_and_labels() {
        let dir = TempDir::new().unwrap();
        let nodes = write_file(
            &dir,
            "nodes.csv",
            "Id,Club\n0,Mr. Hi\n1,Mr. Hi\n2,Officer\n",
        );
        let edges = write_file(&dir, "edges.csv", "Src,Dst\n0,1\n1,2\n2,0\n");

        let graph = load_karate(&nodes, &edges).unwrap();
        assert_eq!(graph.num_nodes(), 3);
        assert_eq!(graph.num_edges(), 3);
        assert_eq!(graph.src, vec![0, 1, 2]);
        assert_eq!(graph.dst, vec![1, 2, 0]);
        assert_eq!(graph.labels, vec![0, 0, 1]);
        assert_eq!(graph.one_hot, vec![[1, 0], [1, 0], [0, 1]]);
    }

    #[test]
    fn club_match_is_exact() {
        let dir = TempDir::new().unwrap();
        let nodes = write_file(&dir, "nodes.csv", "Id,Club\n0,officer\n1,Officer\n");
        let edges = write_file(&dir, "edges.csv", "Src,Dst\n0,1\n");

        let graph = load_karate(&nodes, &edges).unwrap();
        assert_eq!(graph.labels, vec![0, 1]);
    }

    #[test]
    fn missing_club_column_is_an_error() {
        let dir = TempDir::new().unwrap();
        let nodes = write_file(&dir, "nodes.csv", "Id,Team\n0,Officer\n");
        let edges = write_file(&dir, "edges.csv", "Src,Dst\n0,0\n");

        let err = load_karate(&nodes, &edges).unwrap_err();
        assert!(err.to_string().contains("Club"));
    }

    #[test]
    fn missing_src_column_is_an_error() {
        let dir = TempDir::new().unwrap();
        let nodes = write_file(&dir, "nodes.csv", "Id,Club\n0,Officer\n");
        let edges = write_file(&dir, "edges.csv", "From,Dst\n0,0\n");

        assert!(load_karate(&nodes, &edges).is_err());
    }

    #[test]
    fn non_integer_node_id_is_an_error() {
        let dir = TempDir::new().unwrap();
        let nodes = write_file(&dir, "nodes.csv", "Id,Club\n0,Officer\n");
        let edges = write_file(&dir, "edges.csv", "Src,Dst\nzero,0\n");

        assert!(load_karate(&nodes, &edges).is_err());
    }
}
