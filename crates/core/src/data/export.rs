use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::assemble::DendrogramSet;
use crate::dendrogram::DendrogramLayout;
use crate::error::Result;

/// Write the linkage table of `layout` as TSV with a header row
/// (`left`, `right`, `distance`, `size`).
///
/// # Errors
/// Propagates I/O and CSV errors.
pub fn write_linkage_tsv<W: Write>(layout: &DendrogramLayout, writer: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    wtr.write_record(["left", "right", "distance", "size"])?;
    for row in layout.linkage() {
        wtr.write_record([
            row.left.to_string(),
            row.right.to_string(),
            row.distance.to_string(),
            row.size.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the leaves of `layout` in plotting order, one per line, with their
/// linkage index.
///
/// # Errors
/// Propagates I/O and CSV errors.
pub fn write_leaf_order<W: Write>(layout: &DendrogramLayout, writer: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    wtr.write_record(["position", "leaf", "individual"])?;
    for (position, &leaf) in layout.leaf_order().iter().enumerate() {
        wtr.write_record([
            position.to_string(),
            leaf.to_string(),
            layout.labels()[leaf].clone(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Serialize any result value as pretty-printed JSON.
///
/// # Errors
/// Propagates I/O and serialization errors.
pub fn write_json<T: Serialize, W: Write>(value: &T, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    Ok(())
}

/// Write `<network>.linkage.tsv`, `<network>.leaves.tsv` and
/// `<network>.nwk` for every network of `set` into `dir`, creating it if
/// needed. Returns the paths written.
///
/// File names are derived from network IDs and are unique within one call:
/// when two IDs map to the same name, ignoring case, the later network gets
/// a numeric suffix (`network_a_b`, `network_a_b_2`, ...).
///
/// # Errors
/// Propagates I/O and CSV errors.
pub fn write_network_files<P: AsRef<Path>>(dir: P, set: &DendrogramSet) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(set.len() * 3);
    let mut used = HashSet::with_capacity(set.len());
    for (network_id, result) in set.iter() {
        let stem = unique_stem(file_stem(network_id), &mut used);

        let path = dir.join(format!("{}.linkage.tsv", stem));
        write_linkage_tsv(&result.layout, create(&path)?)?;
        written.push(path);

        let path = dir.join(format!("{}.leaves.tsv", stem));
        write_leaf_order(&result.layout, create(&path)?)?;
        written.push(path);

        let path = dir.join(format!("{}.nwk", stem));
        let mut file = create(&path)?;
        writeln!(file, "{}", result.layout.to_newick())?;
        file.flush()?;
        written.push(path);
    }

    log::debug!("wrote {} files to {}", written.len(), dir.display());
    Ok(written)
}

fn create(path: &Path) -> Result<std::io::BufWriter<std::fs::File>> {
    Ok(std::io::BufWriter::new(std::fs::File::create(path)?))
}

/// File-system safe stem for a network ID.
fn file_stem(network_id: &str) -> String {
    let stem: String = network_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("network_{}", stem)
}

/// `stem`, or `stem_2`, `stem_3`, ... if it is already in `used`.
fn unique_stem(stem: String, used: &mut HashSet<String>) -> String {
    if used.insert(stem.to_lowercase()) {
        return stem;
    }
    let mut suffix = 2usize;
    loop {
        let candidate = format!("{}_{}", stem, suffix);
        if used.insert(candidate.to_lowercase()) {
            return candidate;
        }
        suffix += 1;
    }
}
