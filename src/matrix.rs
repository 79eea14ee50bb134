use crate::error::Result;
use crate::statistics::Measure;
use ndarray::Array2;
use serde::{Serialize, Serializer};
use std::io::Write;

/// Symmetric pairwise score matrix labelled by sequence ids.
///
/// The diagonal is always zero and only [`DistanceMatrix::set_pair`] writes
/// entries, always to both halves.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    ids: Vec<String>,
    data: Array2<f64>,
    measure: Measure,
}

impl DistanceMatrix {
    pub fn zeros(ids: Vec<String>, measure: Measure) -> Self {
        let n = ids.len();
        Self {
            ids,
            data: Array2::zeros((n, n)),
            measure,
        }
    }

    pub(crate) fn set_pair(&mut self, i: usize, j: usize, value: f64) {
        self.data[[i, j]] = value;
        self.data[[j, i]] = value;
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn measure(&self) -> Measure {
        self.measure
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn value(&self, i: usize, j: usize) -> f64 {
        self.data[[i, j]]
    }

    /// Entry for two sequence ids, `None` when either is unknown
    pub fn get(&self, first: &str, second: &str) -> Option<f64> {
        let i = self.ids.iter().position(|id| id == first)?;
        let j = self.ids.iter().position(|id| id == second)?;
        Some(self.data[[i, j]])
    }

    /// Upper triangle in row order, `n * (n - 1) / 2` entries
    pub fn condensed(&self) -> Vec<f64> {
        let n = self.len();
        let mut condensed = Vec::with_capacity(n * n.saturating_sub(1) / 2);

        for i in 0..n {
            for j in (i + 1)..n {
                condensed.push(self.data[[i, j]]);
            }
        }
        condensed
    }

    /// Square PHYLIP distance layout: the count, then one labelled row per id
    pub fn write_phylip<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "{}", self.len())?;

        for (id, row) in self.ids.iter().zip(self.data.rows()) {
            write!(writer, "{:<10}", id)?;
            for value in row.iter() {
                write!(writer, " {:.6}", value)?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct MatrixRecord<'a> {
    measure: Measure,
    ids: &'a [String],
    rows: Vec<Vec<f64>>,
}

impl Serialize for DistanceMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        MatrixRecord {
            measure: self.measure,
            ids: &self.ids,
            rows: self.data.rows().into_iter().map(|row| row.to_vec()).collect(),
        }
        .serialize(serializer)
    }
}
