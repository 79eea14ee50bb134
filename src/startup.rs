use crate::config::EngineConfig;
use crate::distance::MatrixBuilder;
use crate::error::{Error, Result};
use crate::matrix::DistanceMatrix;
use crate::sequence::SequenceCollection;
use crate::statistics::{BackgroundModel, Measure};
use log::{info, warn};
use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

/// Inputs and outputs of one run
#[derive(Debug, Clone)]
pub struct Settings {
    /// FASTA file of the sequences to compare
    pub infile: PathBuf,
    /// Square PHYLIP distance matrix
    pub outfile: PathBuf,
    /// Optional JSON copy of the matrix
    pub json: Option<PathBuf>,
    /// JSON background tables for the normalised statistics
    pub background: Option<PathBuf>,
    /// Write the raw similarity of `d2`, `normalised` or `neighbourhood`
    /// instead of refusing it
    pub allow_similarity: bool,
    pub engine: EngineConfig,
}

/// Run complete analysis: sequence loading, pairwise scoring and matrix output
pub fn run(settings: &Settings) -> Result<DistanceMatrix> {
    let engine = &settings.engine;
    engine.validate()?;

    info!("Starting {} analysis for k={}", engine.statistic, engine.k);
    info!("Input file: {}", settings.infile.display());

    let sequences = SequenceCollection::from_fasta(&settings.infile)?;
    info!("Loaded {} sequences", sequences.len());

    let background = if engine.statistic.needs_background() {
        Some(Arc::new(load_background(settings.background.as_deref(), &sequences)?))
    } else {
        None
    };

    let statistic = engine.build_statistic(background)?;
    if statistic.measure() == Measure::Similarity {
        if !settings.allow_similarity {
            return Err(Error::SimilarityOutput {
                statistic: engine.statistic.to_string(),
            });
        }
        warn!(
            "{} is a similarity, larger entries mean closer sequences; it is not a distance for tree building",
            engine.statistic
        );
    }

    let start = Instant::now();
    let matrix = MatrixBuilder::new(statistic.as_ref())
        .threads(engine.workers(sequences.len()))
        .build(sequences.as_slice())?;
    info!("Distance matrix computed in {:.2?}", start.elapsed());

    let mut writer = BufWriter::new(fs::File::create(&settings.outfile)?);
    matrix.write_phylip(&mut writer)?;
    writer.flush()?;
    info!("Distance matrix saved to: {}", settings.outfile.display());

    if let Some(json) = &settings.json {
        let mut writer = BufWriter::new(fs::File::create(json)?);
        matrix.write_json(&mut writer)?;
        writer.flush()?;
        info!("Distance matrix saved to: {}", json.display());
    }

    Ok(matrix)
}

fn load_background(path: Option<&Path>, sequences: &SequenceCollection) -> Result<BackgroundModel> {
    match path {
        Some(path) => {
            info!("Reading background probabilities from {}", path.display());
            BackgroundModel::from_json_file(path)
        }
        None => {
            info!("No background tables given, using each sequence's own composition");
            Ok(BackgroundModel::bernoulli(sequences.as_slice()))
        }
    }
}
