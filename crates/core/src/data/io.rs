use std::io::Read;
use std::path::Path;

use crate::error::{DendroError, Result};
use crate::pairwise::SegmentStats;

use super::rows::{NetworkRow, PairwiseRow, SharingMetric};

/// Column layout of a pairwise-sharing table.
#[derive(Debug, Clone)]
pub struct PairwiseSchema {
    pub delimiter: u8,
    pub id1: String,
    pub id2: String,
    /// Column holding the sharing measure described by `metric`.
    pub value: String,
    /// Optional column with the number of shared segments.
    pub segments: Option<String>,
    pub metric: SharingMetric,
}

impl Default for PairwiseSchema {
    fn default() -> Self {
        Self {
            delimiter: b'\t',
            id1: "pair_1".to_string(),
            id2: "pair_2".to_string(),
            value: "length".to_string(),
            segments: None,
            metric: SharingMetric::default(),
        }
    }
}

/// Column layout of a network-membership table.
///
/// The individual column may hold a single identifier or a comma-separated
/// list of identifiers, as emitted by network detection tools that write
/// one row per network.
#[derive(Debug, Clone)]
pub struct NetworkSchema {
    pub delimiter: u8,
    pub individual: String,
    pub network: String,
}

impl Default for NetworkSchema {
    fn default() -> Self {
        Self {
            delimiter: b'\t',
            individual: "individual".to_string(),
            network: "network".to_string(),
        }
    }
}

/// Read a pairwise-sharing table from a delimited file with a header row.
///
/// Values are converted to sharing fractions with the schema's
/// [`SharingMetric`]. When the metric is a length in cM, the raw length is
/// kept as segment metadata.
///
/// # Errors
/// Returns an error if the file cannot be read, a required column is
/// missing, or a value does not parse.
///
/// # Examples
/// ```no_run
/// use ibd_dendrogram_core::data::{read_pairwise, PairwiseSchema};
///
/// let rows = read_pairwise("pairs.tsv", &PairwiseSchema::default()).unwrap();
/// println!("{} pairs", rows.len());
/// ```
pub fn read_pairwise<P: AsRef<Path>>(path: P, schema: &PairwiseSchema) -> Result<Vec<PairwiseRow>> {
    let file = std::fs::File::open(path.as_ref())?;
    read_pairwise_from(file, schema)
}

/// Same as [`read_pairwise`] over any reader.
///
/// # Errors
/// See [`read_pairwise`].
pub fn read_pairwise_from<R: Read>(reader: R, schema: &PairwiseSchema) -> Result<Vec<PairwiseRow>> {
    schema.metric.validate()?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(schema.delimiter)
        .flexible(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let id1_col = column_position(&headers, &schema.id1)?;
    let id2_col = column_position(&headers, &schema.id2)?;
    let value_col = column_position(&headers, &schema.value)?;
    let segments_col = match &schema.segments {
        Some(name) => Some(column_position(&headers, name)?),
        None => None,
    };

    let mut rows = Vec::new();

    for (line, result) in reader.records().enumerate() {
        let record = result?;
        // Header is line 1.
        let line = line + 2;

        let field = |col: usize| {
            record.get(col).ok_or_else(|| {
                DendroError::Data(format!("Line {}: missing field {}", line, col + 1))
            })
        };

        let raw: f64 = field(value_col)?.parse().map_err(|_| {
            DendroError::Data(format!(
                "Line {}: cannot parse '{}' in column '{}' as a number",
                line,
                record.get(value_col).unwrap_or_default(),
                schema.value
            ))
        })?;
        let sharing = schema
            .metric
            .to_fraction(raw)
            .map_err(|e| DendroError::Data(format!("Line {}: {}", line, e)))?;

        let count = match segments_col {
            Some(col) => {
                let text = field(col)?;
                Some(text.parse::<u32>().map_err(|_| {
                    DendroError::Data(format!(
                        "Line {}: cannot parse segment count '{}'",
                        line, text
                    ))
                })?)
            }
            None => None,
        };
        let total_cm = schema.metric.is_length().then_some(raw);

        let mut row = PairwiseRow::new(field(id1_col)?, field(id2_col)?, sharing);
        if count.is_some() || total_cm.is_some() {
            row = row.with_segments(SegmentStats { count, total_cm });
        }
        rows.push(row);
    }

    log::debug!("read {} pairwise rows", rows.len());
    Ok(rows)
}

/// Read a network-membership table from a delimited file with a header row.
///
/// # Errors
/// Returns an error if the file cannot be read or a required column is
/// missing.
pub fn read_networks<P: AsRef<Path>>(path: P, schema: &NetworkSchema) -> Result<Vec<NetworkRow>> {
    let file = std::fs::File::open(path.as_ref())?;
    read_networks_from(file, schema)
}

/// Same as [`read_networks`] over any reader.
///
/// # Errors
/// See [`read_networks`].
pub fn read_networks_from<R: Read>(reader: R, schema: &NetworkSchema) -> Result<Vec<NetworkRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(schema.delimiter)
        .flexible(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let individual_col = column_position(&headers, &schema.individual)?;
    let network_col = column_position(&headers, &schema.network)?;

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result?;
        let network = record.get(network_col).unwrap_or_default();
        let individuals = record.get(individual_col).unwrap_or_default();
        if network.is_empty() {
            return Err(DendroError::Data(format!(
                "Line {}: empty network identifier",
                line + 2
            )));
        }
        for id in individuals.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            rows.push(NetworkRow::new(id, network));
        }
    }

    log::debug!("read {} network assignments", rows.len());
    Ok(rows)
}

fn column_position(headers: &[String], name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| DendroError::ColumnNotFound(name.to_string()))
}
