use crate::config::resolve_workers;
use crate::error::{Error, Result};
use crate::matrix::DistanceMatrix;
use crate::sequence::{check_unique_ids, Sequence};
use crate::statistics::Statistic;
use itertools::Itertools;
use log::{debug, info};
use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

/// Pairs handed to a worker per task
pub const CHUNK_SIZE: usize = 64;

/// A scored pair as returned by a worker, keyed by sequence ids
#[derive(Debug, Clone, PartialEq)]
pub struct PairScore<'a> {
    pub first: &'a str,
    pub second: &'a str,
    pub score: f64,
}

/// Scores every unordered pair of sequences with one statistic and
/// assembles the symmetric matrix
pub struct MatrixBuilder<'s> {
    statistic: &'s dyn Statistic,
    threads: usize,
}

impl<'s> MatrixBuilder<'s> {
    /// A sequential builder; see [`MatrixBuilder::threads`]
    pub fn new(statistic: &'s dyn Statistic) -> Self {
        Self {
            statistic,
            threads: 1,
        }
    }

    /// 0 picks the worker count from the input size, 1 stays on the calling
    /// thread, N > 1 runs a pool of N workers
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Build the matrix, rows in input order.
    ///
    /// Pairs of sequences with identical symbols are left at zero. Any pair
    /// failing to score, or scoring a negative or non-finite value, aborts
    /// the whole build.
    ///
    /// # Errors
    /// [`Error::DuplicateId`] or whatever the statistic's `check` rejects,
    /// before anything is scored; otherwise the first scoring failure.
    pub fn build(&self, sequences: &[Sequence]) -> Result<DistanceMatrix> {
        check_unique_ids(sequences)?;
        self.statistic.check(sequences)?;

        let index: HashMap<&str, usize> = sequences
            .iter()
            .enumerate()
            .map(|(i, sequence)| (sequence.id(), i))
            .collect();

        let pairs = pairs_to_score(sequences);
        let ids = sequences.iter().map(|s| s.id().to_string()).collect();
        let mut matrix = DistanceMatrix::zeros(ids, self.statistic.measure());

        let workers = resolve_workers(self.threads, sequences.len());
        info!(
            "scoring {} pairs of {} sequences at k={} with {} worker(s)",
            pairs.len(),
            sequences.len(),
            self.statistic.k(),
            workers
        );

        if workers <= 1 {
            self.score_sequential(sequences, &pairs, &index, &mut matrix)?;
        } else {
            self.score_parallel(sequences, &pairs, &index, &mut matrix, workers)?;
        }

        Ok(matrix)
    }

    fn score_sequential(
        &self,
        sequences: &[Sequence],
        pairs: &[(usize, usize)],
        index: &HashMap<&str, usize>,
        matrix: &mut DistanceMatrix,
    ) -> Result<()> {
        for &(i, j) in pairs {
            let scored = score_pair(self.statistic, &sequences[i], &sequences[j])?;
            place(matrix, index, &scored);
        }
        Ok(())
    }

    /// Chunks of pairs go to a fixed-size pool; results come back over a
    /// channel in any order and only this thread writes the matrix
    fn score_parallel(
        &self,
        sequences: &[Sequence],
        pairs: &[(usize, usize)],
        index: &HashMap<&str, usize>,
        matrix: &mut DistanceMatrix,
        workers: usize,
    ) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;
        debug!("nb threads in pool : {}", pool.current_num_threads());

        let statistic = self.statistic;
        let abort = AtomicBool::new(false);
        let (sender, receiver) = crossbeam_channel::unbounded::<Result<PairScore<'_>>>();

        pool.in_place_scope(|scope| {
            for chunk in pairs.chunks(CHUNK_SIZE) {
                let sender = sender.clone();
                let abort = &abort;

                scope.spawn(move |_| {
                    for &(i, j) in chunk {
                        if abort.load(Ordering::Relaxed) {
                            return;
                        }
                        let result = score_pair(statistic, &sequences[i], &sequences[j]);
                        if sender.send(result).is_err() {
                            return;
                        }
                    }
                });
            }
            // The receiver loop ends once every worker has dropped its sender
            drop(sender);

            let mut failure: Option<Error> = None;
            for result in receiver.iter() {
                match result {
                    Ok(scored) if failure.is_none() => place(matrix, index, &scored),
                    Ok(_) => {}
                    Err(e) => {
                        abort.store(true, Ordering::Relaxed);
                        failure.get_or_insert(e);
                    }
                }
            }

            failure.map_or(Ok(()), Err)
        })
    }
}

/// All `C(n, 2)` index pairs, minus those whose sequences share their symbols
fn pairs_to_score(sequences: &[Sequence]) -> Vec<(usize, usize)> {
    (0..sequences.len())
        .tuple_combinations()
        .filter(|&(i, j)| {
            let identical = sequences[i].symbols() == sequences[j].symbols();
            if identical {
                debug!(
                    "skipping {} and {}: identical sequences",
                    sequences[i].id(),
                    sequences[j].id()
                );
            }
            !identical
        })
        .collect()
}

fn score_pair<'a>(
    statistic: &dyn Statistic,
    first: &'a Sequence,
    second: &'a Sequence,
) -> Result<PairScore<'a>> {
    let score = statistic.score(first, second)?;
    // Tree builders read every entry as a distance
    if !(score.is_finite() && score >= 0.0) {
        return Err(Error::InvalidScore {
            first: first.id().to_string(),
            second: second.id().to_string(),
            score,
        });
    }
    Ok(PairScore {
        first: first.id(),
        second: second.id(),
        score,
    })
}

fn place(matrix: &mut DistanceMatrix, index: &HashMap<&str, usize>, scored: &PairScore<'_>) {
    let i = index[scored.first];
    let j = index[scored.second];
    matrix.set_pair(i, j, scored.score);
}
