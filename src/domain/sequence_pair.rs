// ============================================================
// Layer 1 — SequencePair Domain Type
// ============================================================
// One supervised example: an input symbol sequence and the
// output symbol sequence it should be transduced into.
//
// Example (letters → ARPAbet phonemes):
//   input:  c  a  t
//   output: K  AE T  <eos>
//
// Both sides are already mapped to integer ids by whatever
// vocabulary the caller uses. The output side must carry its
// own end-of-sequence id; the start-of-sequence id is injected
// by the decoder and must NOT be stored here.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// A labelled example of symbol ids, unpadded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencePair {
    /// Input symbol ids, one per time step
    pub input_ids: Vec<usize>,

    /// Target output symbol ids (ending with end-of-sequence)
    pub output_ids: Vec<usize>,
}

impl SequencePair {
    /// Build a pair, rejecting empty sides.
    ///
    /// An empty input leaves the attention with nothing to attend
    /// over, and an empty output gives the decoder zero steps.
    pub fn new(input_ids: Vec<usize>, output_ids: Vec<usize>) -> Result<Self> {
        if input_ids.is_empty() {
            bail!("sequence pair has an empty input sequence");
        }
        if output_ids.is_empty() {
            bail!("sequence pair has an empty output sequence");
        }
        Ok(Self { input_ids, output_ids })
    }

    /// True (unpadded) input length
    pub fn input_len(&self) -> usize {
        self.input_ids.len()
    }

    /// True (unpadded) output length
    pub fn output_len(&self) -> usize {
        self.output_ids.len()
    }

    /// Check every id against the vocabulary sizes the model was built with.
    pub fn check_vocab(&self, input_size: usize, output_size: usize) -> Result<()> {
        if let Some(id) = self.input_ids.iter().find(|&&id| id >= input_size) {
            bail!("input id {id} is outside the input alphabet of size {input_size}");
        }
        if let Some(id) = self.output_ids.iter().find(|&&id| id >= output_size) {
            bail!("output id {id} is outside the output alphabet of size {output_size}");
        }
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths() {
        let pair = SequencePair::new(vec![3, 4, 5], vec![7, 1]).unwrap();
        assert_eq!(pair.input_len(), 3);
        assert_eq!(pair.output_len(), 2);
    }

    #[test]
    fn test_rejects_empty_sides() {
        assert!(SequencePair::new(vec![], vec![1]).is_err());
        assert!(SequencePair::new(vec![2], vec![]).is_err());
    }

    #[test]
    fn test_check_vocab() {
        let pair = SequencePair::new(vec![0, 9], vec![41, 1]).unwrap();
        assert!(pair.check_vocab(10, 42).is_ok());
        // input id 9 does not fit an alphabet of 9 symbols
        assert!(pair.check_vocab(9, 42).is_err());
        // output id 41 does not fit an alphabet of 41 symbols
        assert!(pair.check_vocab(10, 41).is_err());
    }
}
