//! Batch enumeration over the training table
//!
//! Splits the N x D training tensor into consecutive, equally sized batches:
//! - Sequential slicing, no shuffling between epochs
//! - The trailing partial batch is dropped
//! - A fresh iterator is handed out for every epoch

use ndarray::Array2;
use tch::{Device, Kind, Tensor};

use crate::error::{Result, WganError};

/// Sequential batch enumerator for one training table
#[derive(Debug)]
pub struct BatchEnumerator {
    /// Full dataset of shape (num_samples, num_features), already on the training device
    data: Tensor,
    /// Batch size
    batch_size: i64,
}

impl BatchEnumerator {
    /// Create a new enumerator
    ///
    /// Fails when `data` is not two-dimensional or when `batch_size` would
    /// produce zero batches per epoch.
    pub fn new(data: Tensor, batch_size: usize) -> Result<Self> {
        let size = data.size();
        if size.len() != 2 {
            return Err(WganError::InvalidConfig(format!(
                "training data must be a 2D table, got shape {:?}",
                size
            )));
        }

        let num_samples = size[0] as usize;
        if batch_size == 0 || batch_size > num_samples {
            return Err(WganError::EmptyBatches {
                batch_size,
                num_samples,
            });
        }

        Ok(Self {
            data,
            batch_size: batch_size as i64,
        })
    }

    /// Create an enumerator from an ndarray table, moving it to `device`
    pub fn from_array(data: &Array2<f64>, batch_size: usize, device: Device) -> Result<Self> {
        Self::new(array_to_tensor(data, device), batch_size)
    }

    /// Number of batches per epoch: floor(num_samples / batch_size)
    pub fn num_batches(&self) -> usize {
        (self.num_samples() as i64 / self.batch_size) as usize
    }

    /// Get total number of samples
    pub fn num_samples(&self) -> usize {
        self.data.size()[0] as usize
    }

    /// Get number of features
    pub fn num_features(&self) -> i64 {
        self.data.size()[1]
    }

    /// Get batch size
    pub fn batch_size(&self) -> usize {
        self.batch_size as usize
    }

    /// Device holding the table
    pub fn device(&self) -> Device {
        self.data.device()
    }

    /// The full training table
    pub fn data(&self) -> &Tensor {
        &self.data
    }

    /// Iterate over the (index, batch) pairs of one epoch
    pub fn iter(&self) -> Batches<'_> {
        Batches {
            enumerator: self,
            next_index: 0,
        }
    }
}

impl<'a> IntoIterator for &'a BatchEnumerator {
    type Item = (usize, Tensor);
    type IntoIter = Batches<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the batches of one epoch
pub struct Batches<'a> {
    enumerator: &'a BatchEnumerator,
    next_index: usize,
}

impl<'a> Iterator for Batches<'a> {
    type Item = (usize, Tensor);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_index >= self.enumerator.num_batches() {
            return None;
        }

        let index = self.next_index;
        let batch_size = self.enumerator.batch_size;
        let batch = self
            .enumerator
            .data
            .narrow(0, index as i64 * batch_size, batch_size);

        self.next_index += 1;
        Some((index, batch))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.enumerator.num_batches() - self.next_index;
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for Batches<'a> {}

/// Convert an ndarray table into a float tensor on `device`
pub fn array_to_tensor(data: &Array2<f64>, device: Device) -> Tensor {
    let (rows, cols) = data.dim();
    let flat: Vec<f32> = data.iter().map(|&v| v as f32).collect();
    Tensor::from_slice(&flat)
        .view([rows as i64, cols as i64])
        .to_device(device)
}

/// Copy a 2D tensor into row vectors
pub fn tensor_to_rows(data: &Tensor) -> Result<Vec<Vec<f64>>> {
    let size = data.size();
    if size.len() != 2 {
        return Err(WganError::InvalidConfig(format!(
            "expected a 2D tensor, got shape {:?}",
            size
        )));
    }

    let cols = size[1] as usize;
    let flat = Vec::<f64>::try_from(data.to_device(Device::Cpu).to_kind(Kind::Double).flatten(0, -1))?;

    Ok(flat.chunks(cols.max(1)).map(|row| row.to_vec()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_table(rows: usize, cols: usize) -> Array2<f64> {
        Array2::from_shape_fn((rows, cols), |(i, j)| (i * cols + j) as f64)
    }

    #[test]
    fn test_enumerator_drops_partial_batch() {
        let data = counting_table(10, 3);
        let enumerator = BatchEnumerator::from_array(&data, 3, Device::Cpu).unwrap();

        assert_eq!(enumerator.num_batches(), 3); // floor(10/3) = 3

        let batches: Vec<_> = enumerator.iter().collect();
        assert_eq!(batches.len(), 3);
        for (_, batch) in &batches {
            assert_eq!(batch.size(), vec![3, 3]);
        }
    }

    #[test]
    fn test_enumerator_preserves_order() {
        let data = counting_table(7, 2);
        let enumerator = BatchEnumerator::from_array(&data, 2, Device::Cpu).unwrap();

        let mut seen = Vec::new();
        for (index, batch) in &enumerator {
            assert_eq!(index, seen.len() / 4);
            let rows = tensor_to_rows(&batch).unwrap();
            seen.extend(rows.into_iter().flatten());
        }

        // First floor(7/2) * 2 = 6 rows, in original order
        let expected: Vec<f64> = (0..12).map(|v| v as f64).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_enumerator_counts_for_all_batch_sizes() {
        let data = counting_table(23, 2);
        for batch_size in 1..=23 {
            let enumerator = BatchEnumerator::from_array(&data, batch_size, Device::Cpu).unwrap();
            let batches: Vec<_> = enumerator.iter().collect();

            assert_eq!(batches.len(), 23 / batch_size);
            assert!(batches
                .iter()
                .all(|(_, b)| b.size()[0] == batch_size as i64));
        }
    }

    #[test]
    fn test_enumerator_restarts_each_epoch() {
        let data = counting_table(20, 2);
        let enumerator = BatchEnumerator::from_array(&data, 5, Device::Cpu).unwrap();

        assert_eq!(enumerator.iter().count(), 4);
        assert_eq!(enumerator.iter().count(), 4);
    }

    #[test]
    fn test_enumerator_rejects_oversized_batch() {
        let data = counting_table(4, 2);
        let result = BatchEnumerator::from_array(&data, 5, Device::Cpu);
        assert!(matches!(result, Err(WganError::EmptyBatches { .. })));

        let result = BatchEnumerator::from_array(&data, 0, Device::Cpu);
        assert!(matches!(result, Err(WganError::EmptyBatches { .. })));
    }
}
