// ============================================================
// Layer 3 — Tensor Helpers
// ============================================================
// Small building blocks shared by the encoder, the decoder
// and the loss:
//
//   one_hot / one_hot_ids  — positional one-hot embedding
//                            (no learned table)
//   sequence_mask          — [batch, time] 1/0 validity mask
//   step_mask              — the same mask for one time step
//   blend_rows             — per-row select between two states
//   host_rows              — pull a [batch, time] Int tensor
//                            back to Vec<Vec<usize>>

use burn::{prelude::*, tensor::TensorData};

/// One-hot encode `ids` [batch, time] into [batch, time, depth].
///
/// Ids outside `0..depth` give an all-zero row.
pub fn one_hot<B: Backend>(ids: Tensor<B, 2, Int>, depth: usize) -> Tensor<B, 3> {
    let [batch, time] = ids.dims();
    let device = ids.device();

    let classes = Tensor::<B, 1, Int>::arange(0..depth as i64, &device)
        .reshape([1, 1, depth])
        .expand([batch, time, depth]);

    ids.reshape([batch, time, 1])
        .expand([batch, time, depth])
        .equal(classes)
        .float()
}

/// One-hot encode host ids into [ids.len(), depth].
pub fn one_hot_ids<B: Backend>(ids: &[usize], depth: usize, device: &B::Device) -> Tensor<B, 2> {
    let mut flat = vec![0.0f32; ids.len() * depth];
    for (row, &id) in ids.iter().enumerate() {
        if id < depth {
            flat[row * depth + id] = 1.0;
        }
    }
    Tensor::from_data(TensorData::new(flat, [ids.len(), depth]), device)
}

/// 1.0 where `t < lengths[b]`, else 0.0 — shape [batch, maxlen].
pub fn sequence_mask<B: Backend>(lengths: &[usize], maxlen: usize, device: &B::Device) -> Tensor<B, 2> {
    let flat: Vec<f32> = lengths
        .iter()
        .flat_map(|&len| (0..maxlen).map(move |t| if t < len { 1.0 } else { 0.0 }))
        .collect();
    Tensor::from_data(TensorData::new(flat, [lengths.len(), maxlen]), device)
}

/// Validity of a single time step — shape [batch, 1].
pub fn step_mask<B: Backend>(lengths: &[usize], t: usize, device: &B::Device) -> Tensor<B, 2> {
    let flat: Vec<f32> = lengths.iter().map(|&len| if t < len { 1.0 } else { 0.0 }).collect();
    Tensor::from_data(TensorData::new(flat, [lengths.len(), 1]), device)
}

/// Row-wise `keep ? new : old`, with `keep` a [batch, 1] 1/0 mask.
///
/// Gradients reach `new` only through the kept rows.
pub fn blend_rows<B: Backend>(keep: &Tensor<B, 2>, new: Tensor<B, 2>, old: Tensor<B, 2>) -> Tensor<B, 2> {
    let dims = new.dims();
    let keep = keep.clone().expand(dims);
    let drop = keep.clone().neg().add_scalar(1.0);
    new * keep + old * drop
}

/// Copy a [batch, time] Int tensor back to the host, row by row.
pub fn host_rows<B: Backend>(ids: Tensor<B, 2, Int>) -> Vec<Vec<usize>> {
    let [batch, time] = ids.dims();
    let flat: Vec<i64> = ids.into_data().iter::<i64>().collect();
    (0..batch)
        .map(|b| flat[b * time..(b + 1) * time].iter().map(|&id| id.max(0) as usize).collect())
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    fn to_vec<const D: usize>(t: Tensor<B, D>) -> Vec<f32> {
        t.into_data().iter::<f32>().collect()
    }

    #[test]
    fn test_one_hot_tensor() {
        let device = Default::default();
        let ids = Tensor::<B, 2, Int>::from_data(TensorData::new(vec![2i64, 0, 5], [1, 3]), &device);
        let encoded = one_hot(ids, 4);
        assert_eq!(encoded.dims(), [1, 3, 4]);
        assert_eq!(
            to_vec(encoded),
            vec![
                0.0, 0.0, 1.0, 0.0,
                1.0, 0.0, 0.0, 0.0,
                // 5 is out of range → all zero
                0.0, 0.0, 0.0, 0.0,
            ]
        );
    }

    #[test]
    fn test_one_hot_host_ids() {
        let device = Default::default();
        let encoded = one_hot_ids::<B>(&[1, 3], 4, &device);
        assert_eq!(to_vec(encoded), vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_sequence_mask_is_monotone() {
        let device = Default::default();
        let mask = to_vec(sequence_mask::<B>(&[3, 1, 0], 4, &device));
        assert_eq!(
            mask,
            vec![
                1.0, 1.0, 1.0, 0.0,
                1.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0,
            ]
        );
    }

    #[test]
    fn test_blend_rows() {
        let device = Default::default();
        let keep = step_mask::<B>(&[2, 0], 1, &device); // row 0 valid, row 1 not
        let new = Tensor::<B, 2>::ones([2, 3], &device);
        let old = Tensor::<B, 2>::zeros([2, 3], &device);
        assert_eq!(to_vec(blend_rows(&keep, new, old)), vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_host_rows() {
        let device = Default::default();
        let ids = Tensor::<B, 2, Int>::from_data(TensorData::new(vec![1i64, 2, 3, 4], [2, 2]), &device);
        assert_eq!(host_rows(ids), vec![vec![1, 2], vec![3, 4]]);
    }
}
