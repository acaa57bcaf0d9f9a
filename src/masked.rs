//! Frame stacks viewed through a trap mask.
//!
//! The mask is frame-invariant: the same `(height, width)` mask applies to every
//! frame of a stack. Aggregates only ever see selected (unmasked) pixels.

use ndarray::{ArrayView2, ArrayView3, Axis};

use crate::data::model::FrameStacks;
use crate::error::{Error, Result};
use crate::mask::TrapMask;

/// A `(frame, height, width)` stack with a 2D mask broadcast over the frame axis.
#[derive(Debug, Clone)]
pub struct MaskedStack<'a> {
    data: ArrayView3<'a, u8>,
    mask: ArrayView2<'a, bool>,
    selected: usize,
}

impl<'a> MaskedStack<'a> {
    /// Apply `mask` to `data`; fails when the mask shape differs from the frame shape.
    pub fn apply(mask: ArrayView2<'a, bool>, data: ArrayView3<'a, u8>) -> Result<Self> {
        let (_, height, width) = data.dim();
        if mask.dim() != (height, width) {
            return Err(Error::ShapeMismatch {
                what: "mask".to_string(),
                expected: (height, width),
                actual: mask.dim(),
            });
        }
        let selected = mask.iter().filter(|&&m| m).count();
        Ok(Self {
            data,
            mask,
            selected,
        })
    }

    pub fn data(&self) -> ArrayView3<'a, u8> {
        self.data.clone()
    }

    pub fn mask(&self) -> ArrayView2<'a, bool> {
        self.mask.clone()
    }

    pub fn frame_count(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// `(height, width)` of every frame.
    pub fn frame_shape(&self) -> (usize, usize) {
        self.mask.dim()
    }

    /// Number of selected pixels in one frame.
    pub fn selected_pixels_per_frame(&self) -> usize {
        self.selected
    }

    /// Whether the sample at `(frame, row, col)` is excluded; `None` when out of bounds.
    pub fn is_masked(&self, frame: usize, row: usize, col: usize) -> Option<bool> {
        if frame >= self.frame_count() {
            return None;
        }
        self.mask.get((row, col)).map(|&selected| !selected)
    }

    /// Number of participating samples across the stack.
    pub fn count(&self) -> usize {
        self.selected * self.frame_count()
    }

    /// Sum of participating samples.
    pub fn sum(&self) -> u64 {
        self.frame_sums().into_iter().sum()
    }

    /// Mean of participating samples; `None` when nothing participates.
    pub fn mean(&self) -> Option<f64> {
        let count = self.count();
        (count > 0).then(|| self.sum() as f64 / count as f64)
    }

    /// Per-frame sum of selected pixels.
    pub fn frame_sums(&self) -> Vec<u64> {
        self.data
            .outer_iter()
            .map(|frame| masked_sum(frame, self.mask.view()))
            .collect()
    }

    /// Per-frame mean of selected pixels; `None` entries when the mask selects nothing.
    pub fn frame_means(&self) -> Vec<Option<f64>> {
        self.frame_sums()
            .into_iter()
            .map(|sum| (self.selected > 0).then(|| sum as f64 / self.selected as f64))
            .collect()
    }

    /// Participating samples, frame by frame in row-major order.
    pub fn compressed(&self) -> Vec<u8> {
        let mut values = Vec::with_capacity(self.count());
        for frame in self.data.outer_iter() {
            values.extend(
                frame
                    .iter()
                    .zip(self.mask.iter())
                    .filter(|(_, &m)| m)
                    .map(|(&v, _)| v),
            );
        }
        values
    }
}

fn masked_sum(frame: ArrayView2<'_, u8>, mask: ArrayView2<'_, bool>) -> u64 {
    frame
        .iter()
        .zip(mask.iter())
        .filter(|(_, &m)| m)
        .map(|(&v, _)| u64::from(v))
        .sum()
}

/// The four session stacks masked by one trap selection.
#[derive(Debug, Clone)]
pub struct MaskedStacks<'a> {
    stacks: &'a FrameStacks,
    mask: TrapMask,
    selected: usize,
    trap_ids: Vec<i64>,
    radius: f64,
}

impl<'a> MaskedStacks<'a> {
    /// Check `mask` against the stacks' frame shape and bundle them.
    pub fn new(stacks: &'a FrameStacks, mask: TrapMask, trap_ids: Vec<i64>, radius: f64) -> Result<Self> {
        if mask.dim() != stacks.frame_shape() {
            return Err(Error::ShapeMismatch {
                what: "mask".to_string(),
                expected: stacks.frame_shape(),
                actual: mask.dim(),
            });
        }
        let selected = mask.iter().filter(|&&m| m).count();
        Ok(Self {
            stacks,
            mask,
            selected,
            trap_ids,
            radius,
        })
    }

    pub fn mask(&self) -> &TrapMask {
        &self.mask
    }

    /// Trap ids the mask was built from.
    pub fn trap_ids(&self) -> &[i64] {
        &self.trap_ids
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn all(&self) -> MaskedStack<'_> {
        self.view(self.stacks.all().view())
    }

    pub fn first(&self) -> MaskedStack<'_> {
        self.view(self.stacks.first().view())
    }

    pub fn second(&self) -> MaskedStack<'_> {
        self.view(self.stacks.second().view())
    }

    pub fn third(&self) -> MaskedStack<'_> {
        self.view(self.stacks.third().view())
    }

    fn view<'s>(&'s self, data: ArrayView3<'s, u8>) -> MaskedStack<'s> {
        // FrameStacks guarantees one frame shape, checked against the mask in `new`.
        MaskedStack {
            data,
            mask: self.mask.view(),
            selected: self.selected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3, s};

    fn block_mask(shape: (usize, usize), rows: std::ops::Range<usize>, cols: std::ops::Range<usize>) -> TrapMask {
        let mut mask = TrapMask::from_elem(shape, false);
        mask.slice_mut(s![rows, cols]).fill(true);
        mask
    }

    #[test]
    fn test_broadcast_over_frames() {
        // 3 frames of 20x20; frame k holds value k + 1 inside the window, 200 elsewhere.
        let mask = block_mask((20, 20), 8..13, 8..13);
        let mut data = Array3::from_elem((3, 20, 20), 200u8);
        for k in 0..3 {
            data.slice_mut(s![k, 8..13, 8..13]).fill(k as u8 + 1);
        }

        let masked = MaskedStack::apply(mask.view(), data.view()).unwrap();
        assert_eq!(masked.frame_count(), 3);
        assert_eq!(masked.selected_pixels_per_frame(), 25);
        assert_eq!(masked.count(), 75);
        assert_eq!(masked.frame_sums(), vec![25, 50, 75]);
        assert_eq!(masked.frame_means(), vec![Some(1.0), Some(2.0), Some(3.0)]);
        assert_eq!(masked.mean(), Some(2.0));

        for k in 0..3 {
            assert_eq!(masked.is_masked(k, 0, 0), Some(true));
            assert_eq!(masked.is_masked(k, 10, 10), Some(false));
        }
        let excluded = (0..20)
            .flat_map(|r| (0..20).map(move |c| (r, c)))
            .filter(|&(r, c)| masked.is_masked(1, r, c) == Some(true))
            .count();
        assert_eq!(excluded, 375);
        assert_eq!(masked.is_masked(3, 0, 0), None);
        assert_eq!(masked.is_masked(0, 20, 0), None);
    }

    #[test]
    fn test_compressed_values() {
        let mask = block_mask((2, 3), 0..1, 1..3);
        let data = Array3::from_shape_vec((2, 2, 3), (0u8..12).collect()).unwrap();
        let masked = MaskedStack::apply(mask.view(), data.view()).unwrap();
        assert_eq!(masked.compressed(), vec![1, 2, 7, 8]);
        assert_eq!(masked.sum(), 18);
    }

    #[test]
    fn test_empty_selection_has_no_mean() {
        let mask = Array2::from_elem((4, 4), false);
        let data = Array3::from_elem((2, 4, 4), 9u8);
        let masked = MaskedStack::apply(mask.view(), data.view()).unwrap();
        assert_eq!(masked.mean(), None);
        assert_eq!(masked.frame_means(), vec![None, None]);
        assert_eq!(masked.sum(), 0);
    }

    #[test]
    fn test_empty_stack() {
        let mask = block_mask((4, 4), 0..2, 0..2);
        let data = Array3::<u8>::zeros((0, 4, 4));
        let masked = MaskedStack::apply(mask.view(), data.view()).unwrap();
        assert_eq!(masked.count(), 0);
        assert_eq!(masked.mean(), None);
        assert!(masked.frame_sums().is_empty());
    }

    #[test]
    fn test_shape_mismatch() {
        let mask = Array2::from_elem((4, 5), true);
        let data = Array3::<u8>::zeros((2, 4, 4));
        assert!(matches!(
            MaskedStack::apply(mask.view(), data.view()),
            Err(Error::ShapeMismatch { .. })
        ));

        let stacks = FrameStacks::from_all(data).unwrap();
        assert!(matches!(
            MaskedStacks::new(&stacks, mask, vec![1], 2.0),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_masked_stacks_share_mask() {
        let all = Array3::from_elem((3, 4, 4), 5u8);
        let first = Array3::from_elem((1, 4, 4), 1u8);
        let second = Array3::from_elem((1, 4, 4), 2u8);
        let third = Array3::from_elem((1, 4, 4), 3u8);
        let stacks = FrameStacks::new(all, first, second, third).unwrap();
        let mask = block_mask((4, 4), 1..3, 1..3);

        let masked = MaskedStacks::new(&stacks, mask.clone(), vec![54], 1.0).unwrap();
        assert_eq!(masked.all().count(), 12);
        assert_eq!(masked.first().mean(), Some(1.0));
        assert_eq!(masked.second().mean(), Some(2.0));
        assert_eq!(masked.third().mean(), Some(3.0));
        assert_eq!(masked.third().mask(), mask.view());
        assert_eq!(masked.trap_ids(), &[54]);
        assert_eq!(masked.radius(), 1.0);
    }
}
