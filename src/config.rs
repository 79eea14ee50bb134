use crate::error::{Error, Result};
use crate::kmer::Alphabet;
use crate::statistics::{BackgroundModel, D2Neighbourhood, D2Normalised, LogD2, Statistic, D2};
use std::{fmt, str::FromStr, sync::Arc};

pub const DEFAULT_K: usize = 8;

/// With `threads == 0`, inputs of at most this many sequences stay on the
/// calling thread.
pub const PARALLEL_THRESHOLD: usize = 8;

/// Which member of the D2 family scores each pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatisticKind {
    D2,
    Normalised,
    Neighbourhood,
    LogD2,
    LogNormalised,
    #[default]
    LogNeighbourhood,
}

impl StatisticKind {
    pub fn needs_background(&self) -> bool {
        matches!(self, StatisticKind::Normalised | StatisticKind::LogNormalised)
    }

    pub fn name(&self) -> &'static str {
        match self {
            StatisticKind::D2 => "d2",
            StatisticKind::Normalised => "normalised",
            StatisticKind::Neighbourhood => "neighbourhood",
            StatisticKind::LogD2 => "log-d2",
            StatisticKind::LogNormalised => "log-normalised",
            StatisticKind::LogNeighbourhood => "log-neighbourhood",
        }
    }
}

impl fmt::Display for StatisticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StatisticKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "d2" => Ok(StatisticKind::D2),
            "normalised" | "normalized" => Ok(StatisticKind::Normalised),
            "neighbourhood" | "neighborhood" => Ok(StatisticKind::Neighbourhood),
            "log-d2" | "d2z" => Ok(StatisticKind::LogD2),
            "log-normalised" | "log-normalized" => Ok(StatisticKind::LogNormalised),
            "log-neighbourhood" | "log-neighborhood" => Ok(StatisticKind::LogNeighbourhood),
            other => Err(Error::invalid_config(format!("unknown statistic {}", other))),
        }
    }
}

/// Everything the distance engine needs, passed in explicitly per run
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub k: usize,
    pub alphabet: Alphabet,
    pub statistic: StatisticKind,
    /// 0 picks the worker count automatically, 1 stays sequential,
    /// N > 1 uses a pool of N workers
    pub threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            alphabet: Alphabet::dna(),
            statistic: StatisticKind::default(),
            threads: 0,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::invalid_config("k-mer length needs to be larger than zero"));
        }
        Ok(())
    }

    /// Worker count for `n_sequences` inputs; 1 means sequential
    pub fn workers(&self, n_sequences: usize) -> usize {
        resolve_workers(self.threads, n_sequences)
    }

    /// Bind the configured statistic to its k, alphabet and background tables.
    ///
    /// # Errors
    /// The normalised variants need `background`.
    pub fn build_statistic(&self, background: Option<Arc<BackgroundModel>>) -> Result<Box<dyn Statistic>> {
        self.validate()?;

        let k = self.k;
        let normalised = |background: Option<Arc<BackgroundModel>>| -> Result<D2Normalised> {
            background
                .map(|model| D2Normalised::new(k, model))
                .ok_or_else(|| {
                    Error::invalid_config(format!("{} needs background probabilities", self.statistic))
                })
        };

        let statistic: Box<dyn Statistic> = match self.statistic {
            StatisticKind::D2 => Box::new(D2::new(k)),
            StatisticKind::Normalised => Box::new(normalised(background)?),
            StatisticKind::Neighbourhood => Box::new(D2Neighbourhood::new(k, self.alphabet.clone())),
            StatisticKind::LogD2 => Box::new(LogD2::new(Box::new(D2::new(k)))),
            StatisticKind::LogNormalised => Box::new(LogD2::new(Box::new(normalised(background)?))),
            StatisticKind::LogNeighbourhood => Box::new(LogD2::new(Box::new(D2Neighbourhood::new(
                k,
                self.alphabet.clone(),
            )))),
        };
        Ok(statistic)
    }
}

pub(crate) fn resolve_workers(threads: usize, n_sequences: usize) -> usize {
    match threads {
        0 if n_sequences > PARALLEL_THRESHOLD => num_cpus::get(),
        0 => 1,
        n => n,
    }
}
