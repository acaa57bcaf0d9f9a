//! Boolean pixel masks around trap positions.
//!
//! Each requested trap contributes a square window of `2 * radius + 1` pixels
//! per side, centered on its rounded coordinate:
//!
//! ```text
//! low  = round(coord - radius)
//! high = round(coord + radius) + 1      (exclusive)
//! ```
//!
//! Windows are clamped to the frame and OR-ed together. Rounding is half-to-even.

use ndarray::{Array2, s};

use crate::data::model::{TrapCoordinate, TrapRegistry};
use crate::error::{Error, Result};

/// `(height, width)` boolean mask, `true` where a pixel belongs to a selected trap.
pub type TrapMask = Array2<bool>;

/// Builds trap masks from a registry.
#[derive(Debug, Clone, Copy)]
pub struct TrapMaskBuilder<'a> {
    registry: &'a TrapRegistry,
    default_trap_id: i64,
}

impl<'a> TrapMaskBuilder<'a> {
    /// `default_trap_id` is used when a request names no traps.
    pub fn new(registry: &'a TrapRegistry, default_trap_id: i64) -> Self {
        Self {
            registry,
            default_trap_id,
        }
    }

    /// Trap ids a request resolves to: `trap_ids`, or the default trap when empty.
    pub fn resolve_ids(&self, trap_ids: &[i64]) -> Vec<i64> {
        if trap_ids.is_empty() {
            vec![self.default_trap_id]
        } else {
            trap_ids.to_vec()
        }
    }

    /// Mask selecting the windows of `trap_ids` (or the default trap).
    pub fn build(&self, frame_shape: (usize, usize), trap_ids: &[i64], radius: f64) -> Result<TrapMask> {
        check_radius(radius)?;
        let mut mask = TrapMask::from_elem(frame_shape, false);
        for id in self.resolve_ids(trap_ids) {
            let center = self
                .registry
                .get(id)
                .ok_or(Error::UnknownTrapId { id })?;
            mark_window(&mut mask, center, radius);
        }
        Ok(mask)
    }

    /// Mask selecting the windows of every registered trap.
    pub fn build_all(&self, frame_shape: (usize, usize), radius: f64) -> Result<TrapMask> {
        check_radius(radius)?;
        let mut mask = TrapMask::from_elem(frame_shape, false);
        for (_, center) in self.registry.iter() {
            mark_window(&mut mask, center, radius);
        }
        Ok(mask)
    }
}

fn check_radius(radius: f64) -> Result<()> {
    if radius > 0.0 && radius.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidRadius { radius })
    }
}

/// Half-open pixel range `[low, high)` covering `center ± radius`, clamped to `[0, len]`.
fn window(center: f64, radius: f64, len: usize) -> (usize, usize) {
    let low = (center - radius).round_ties_even();
    let high = (center + radius).round_ties_even() + 1.0;
    let clamp = |v: f64| v.clamp(0.0, len as f64) as usize;
    (clamp(low), clamp(high))
}

fn mark_window(mask: &mut TrapMask, center: TrapCoordinate, radius: f64) {
    let (height, width) = mask.dim();
    let (row_lo, row_hi) = window(center.y, radius, height);
    let (col_lo, col_hi) = window(center.x, radius, width);
    if row_lo < row_hi && col_lo < col_hi {
        mask.slice_mut(s![row_lo..row_hi, col_lo..col_hi]).fill(true);
    }
}
