use crate::error::{Error, Result};

/// Number of acquisition indices sharing one exposure time.
pub const BUCKET_WIDTH: u64 = 1000;

/// Number of exposure buckets; indices at or above `BUCKET_COUNT * BUCKET_WIDTH` are invalid.
pub const BUCKET_COUNT: u64 = 15;

/// Maps an acquisition index to its exposure time in milliseconds.
///
/// ```text
///      0 –    999  →  2.0 ms
///  1 000 –  1 999  →  2.5 ms
///  ...
/// 14 000 – 14 999  →  9.0 ms
/// ```
///
/// All three frames of a triplet share one index, so they always land in the same bucket.
pub fn exposure_time_ms(index: u64) -> Result<f64> {
    let bucket = index / BUCKET_WIDTH;
    if bucket >= BUCKET_COUNT {
        return Err(Error::InvalidIndex { index });
    }
    Ok(bucket as f64 * 0.5 + 2.0)
}

/// Index → exposure-time mapping for one acquisition protocol.
pub trait ExposureMap: Send + Sync {
    fn exposure_time_ms(&self, index: u64) -> Result<f64>;
}

/// The 15-bucket step table of [`exposure_time_ms`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StepExposureMap;

impl ExposureMap for StepExposureMap {
    fn exposure_time_ms(&self, index: u64) -> Result<f64> {
        exposure_time_ms(index)
    }
}

impl<F> ExposureMap for F
where
    F: Fn(u64) -> Result<f64> + Send + Sync,
{
    fn exposure_time_ms(&self, index: u64) -> Result<f64> {
        self(index)
    }
}
