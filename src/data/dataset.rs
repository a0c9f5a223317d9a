use burn::data::dataset::Dataset;

use crate::domain::sequence_pair::SequencePair;

/// In-memory dataset of sequence pairs.
pub struct PairDataset {
    pairs: Vec<SequencePair>,
}

impl PairDataset {
    pub fn new(pairs: Vec<SequencePair>) -> Self { Self { pairs } }

    pub fn pair_count(&self) -> usize { self.pairs.len() }

    /// Longest output sequence; the decode bound `Trainer::fit` hands to its inferencer.
    pub fn max_output_len(&self) -> usize {
        self.pairs.iter().map(SequencePair::output_len).max().unwrap_or(0)
    }
}

impl Dataset<SequencePair> for PairDataset {
    fn get(&self, index: usize) -> Option<SequencePair> {
        self.pairs.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }
}
