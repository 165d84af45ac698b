use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use crate::error::{DendroError, Result};
use crate::pairwise::PairwiseStore;
use crate::types::{IndividualId, Scalar};

use super::transform::{DistanceTransform, MissingDistance};

/// Symmetric pairwise distance matrix stored as its condensed upper
/// triangle (row-major, diagonal omitted).
///
/// For `n` labels the condensed vector holds `n * (n - 1) / 2` entries and
/// the distance between `i < j` lives at
/// `n * i - i * (i + 1) / 2 + (j - i - 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    labels: Vec<IndividualId>,
    data: Vec<Scalar>,
    n_missing: usize,
}

impl DistanceMatrix {
    /// Build the distance matrix for `members` from the sharing values in
    /// `store`.
    ///
    /// Pairs with no edge get the missing-pair sentinel. An observed value
    /// that the transform maps to a non-finite or negative distance is
    /// treated as missing.
    ///
    /// # Errors
    /// [`DendroError::InsufficientData`] if some pair needs the sentinel
    /// and the sentinel itself is not a finite, non-negative distance.
    pub fn from_store(
        network: &str,
        members: &[IndividualId],
        store: &PairwiseStore,
        transform: &DistanceTransform,
        missing: &MissingDistance,
    ) -> Result<Self> {
        let n = members.len();
        let len = n * n.saturating_sub(1) / 2;
        let sentinel = missing.resolve(transform);

        let position: HashMap<&str, usize> = members
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut data = vec![Scalar::NAN; len];
        let mut unusable = 0usize;

        for (a, b, sharing) in store.edges() {
            let (Some(&i), Some(&j)) = (position.get(a), position.get(b)) else {
                continue;
            };
            let d = transform.to_distance(sharing);
            if d.is_finite() && d >= 0.0 {
                data[condensed_index(n, i, j)] = d;
            } else {
                unusable += 1;
            }
        }

        let mut n_missing = 0usize;
        for d in data.iter_mut().filter(|d| d.is_nan()) {
            *d = sentinel;
            n_missing += 1;
        }

        if unusable > 0 {
            log::warn!(
                "network '{}': {} observed pair(s) gave no finite distance under '{}'",
                network,
                unusable,
                transform
            );
        }

        if n_missing > 0 && !(sentinel.is_finite() && sentinel >= 0.0) {
            return Err(DendroError::InsufficientData {
                network: network.to_string(),
                reason: format!(
                    "{} pair(s) need the missing-pair distance but transform '{}' gives {}",
                    n_missing, transform, sentinel
                ),
            });
        }

        if n_missing > 0 {
            log::debug!(
                "network '{}': {} of {} pairs use the missing-pair distance {}",
                network,
                n_missing,
                len,
                sentinel
            );
        }

        Ok(Self {
            labels: members.to_vec(),
            data,
            n_missing,
        })
    }

    /// Wrap an existing condensed vector.
    ///
    /// # Errors
    /// [`DendroError::Data`] if the length does not match the label count
    /// or any entry is negative or non-finite.
    pub fn from_condensed(labels: Vec<IndividualId>, data: Vec<Scalar>) -> Result<Self> {
        let n = labels.len();
        let expected = n * n.saturating_sub(1) / 2;
        if data.len() != expected {
            return Err(DendroError::Data(format!(
                "Condensed matrix for {} labels needs {} entries, got {}",
                n,
                expected,
                data.len()
            )));
        }
        if let Some(bad) = data.iter().find(|d| !(d.is_finite() && **d >= 0.0)) {
            return Err(DendroError::Data(format!(
                "Condensed matrix contains invalid distance {}",
                bad
            )));
        }
        Ok(Self {
            labels,
            data,
            n_missing: 0,
        })
    }

    /// Number of individuals.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[IndividualId] {
        &self.labels
    }

    pub fn condensed(&self) -> &[Scalar] {
        &self.data
    }

    /// Number of pairs that received the missing-pair sentinel.
    pub fn n_missing(&self) -> usize {
        self.n_missing
    }

    /// Distance between rows `i` and `j`; zero on the diagonal.
    ///
    /// # Panics
    /// Panics if either index is out of bounds.
    pub fn get(&self, i: usize, j: usize) -> Scalar {
        assert!(i < self.len() && j < self.len(), "index out of bounds");
        if i == j {
            0.0
        } else {
            self.data[condensed_index(self.len(), i, j)]
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<IndividualId>, Vec<Scalar>) {
        (self.labels, self.data)
    }

    /// Write the full square matrix as tab-separated rows, each prefixed by
    /// its label. No header row is written.
    ///
    /// # Errors
    /// Propagates I/O and CSV errors.
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(false)
            .from_writer(writer);

        let n = self.len();
        for i in 0..n {
            let mut record = Vec::with_capacity(n + 1);
            record.push(self.labels[i].clone());
            for j in 0..n {
                record.push(self.get(i, j).to_string());
            }
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write the square matrix to `path`. See [`DistanceMatrix::write_tsv`].
    ///
    /// # Errors
    /// Propagates I/O and CSV errors.
    pub fn write_tsv_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_tsv(std::io::BufWriter::new(file))
    }
}

/// Position of the pair `(i, j)`, `i != j`, in a condensed vector for `n`
/// points.
#[inline]
pub(crate) fn condensed_index(n: usize, i: usize, j: usize) -> usize {
    let (i, j) = if i < j { (i, j) } else { (j, i) };
    n * i - i * (i + 1) / 2 + (j - i - 1)
}
