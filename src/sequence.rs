use crate::error::{Error, Result};
use crate::kmer::Words;
use bio::io::fasta;
use std::{collections::HashSet, fs, io, path::Path};

/// An identified symbol sequence, immutable once read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    id: String,
    symbols: Vec<u8>,
}

impl Sequence {
    pub fn new(id: impl Into<String>, symbols: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            symbols: symbols.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Overlapping `k`-length words of this sequence
    pub fn words(&self, k: usize) -> Words<'_> {
        Words::new(&self.symbols, k)
    }
}

/// Ordered sequences with unique ids
#[derive(Debug, Clone, Default)]
pub struct SequenceCollection {
    sequences: Vec<Sequence>,
}

impl SequenceCollection {
    /// # Errors
    /// [`Error::DuplicateId`] when two sequences share an id
    pub fn new(sequences: Vec<Sequence>) -> Result<Self> {
        check_unique_ids(&sequences)?;
        Ok(Self { sequences })
    }

    /// Read every record of a FASTA file, upper-casing symbols
    pub fn from_fasta<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = fs::File::open(path)?;
        Self::from_fasta_reader(file)
    }

    pub fn from_fasta_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut sequences = Vec::new();

        for record in fasta::Reader::new(reader).records() {
            let record = record?;
            sequences.push(Sequence::new(
                record.id(),
                record.seq().to_ascii_uppercase(),
            ));
        }

        Self::new(sequences)
    }

    /// Ids in input order, labelling matrix rows and columns
    pub fn ids(&self) -> Vec<&str> {
        self.sequences.iter().map(Sequence::id).collect()
    }

    pub fn get(&self, id: &str) -> Option<&Sequence> {
        self.sequences.iter().find(|s| s.id() == id)
    }

    pub fn as_slice(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sequence> {
        self.sequences.iter()
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

impl<'a> IntoIterator for &'a SequenceCollection {
    type Item = &'a Sequence;
    type IntoIter = std::slice::Iter<'a, Sequence>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub(crate) fn check_unique_ids(sequences: &[Sequence]) -> Result<()> {
    let mut seen = HashSet::with_capacity(sequences.len());

    for sequence in sequences {
        if !seen.insert(sequence.id()) {
            return Err(Error::DuplicateId {
                id: sequence.id().to_string(),
            });
        }
    }
    Ok(())
}
