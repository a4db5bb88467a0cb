use std::fmt::{self, Display};

use anyhow::{anyhow, bail};
use inc_stats::{Percentiles, SummStats};

use crate::io::DataError;
use crate::Result;

/// Linearly interpolated percentiles of `values`, `probs` are in [0, 1].
pub fn percentiles(values: &[f64], probs: &[f64]) -> Result<Vec<f64>> {
    let values: Percentiles<f64> = values.iter().collect();
    match values
        .percentiles(probs.to_vec())
        .map_err(|e| anyhow!("Cannot compute percentiles: {:?}", e))?
    {
        Some(percentiles) => Ok(percentiles),
        None => bail!(DataError {
            message: String::from("Cannot compute percentiles of an empty sample")
        }),
    }
}

/// Distribution summary of branch lengths: count, mean, sample standard deviation,
/// minimum, quartiles and maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct BlenSummary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl BlenSummary {
    pub fn from_lengths(lengths: &[f64]) -> Result<Self> {
        if lengths.is_empty() {
            bail!(DataError {
                message: String::from("No branch lengths to summarise")
            });
        }
        let stats: SummStats<f64> = lengths.iter().collect();
        let quantiles = percentiles(lengths, &[0.0, 0.25, 0.5, 0.75, 1.0])?;
        Ok(Self {
            count: lengths.len(),
            mean: stats.mean().unwrap_or(f64::NAN),
            // undefined for a single value
            std: stats.standard_deviation().unwrap_or(f64::NAN),
            min: quantiles[0],
            q25: quantiles[1],
            median: quantiles[2],
            q75: quantiles[3],
            max: quantiles[4],
        })
    }
}

impl Display for BlenSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<7}{:>16}", "", "branch lengths")?;
        writeln!(f, "{:<7}{:>16}", "count", self.count)?;
        for (name, value) in [
            ("mean", self.mean),
            ("std", self.std),
            ("min", self.min),
            ("25%", self.q25),
            ("50%", self.median),
            ("75%", self.q75),
            ("max", self.max),
        ] {
            writeln!(f, "{:<7}{:>16.6}", name, value)?;
        }
        Ok(())
    }
}
