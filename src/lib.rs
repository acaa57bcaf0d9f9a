//! Triplet exposure frames with trap-coordinate masking.
//!
//! A [`TrapSession`] loads the frames of one exposure time from a directory,
//! splits them by triplet role, reads `trap_positions.json`, and hands out
//! [`MaskedStacks`] for any selection of traps.
//!
//! ```no_run
//! use trapframes::{SessionConfig, TrapSession};
//!
//! # fn main() -> trapframes::Result<()> {
//! let config = SessionConfig::default().with_exposure_time_ms(2.5);
//! let session = TrapSession::open("data/run_01", config)?;
//! let masked = session.rebuild_mask(&[54, 55], Some(3.0))?;
//! println!("mean over traps: {:?}", masked.all().mean());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod mask;
pub mod masked;
pub mod progress;
pub mod session;

#[cfg(test)]
mod test_utils;

pub use config::{DecodePolicy, SessionConfig};
pub use data::exposure::{ExposureMap, StepExposureMap, exposure_time_ms};
pub use data::model::{FrameFile, FrameStacks, TrapCoordinate, TrapRegistry, TripletRole};
pub use data::naming::{FilenameScheme, RoleClassifier, SubstringClassifier, UnderscoreScheme};
pub use error::{Error, Result};
pub use mask::{TrapMask, TrapMaskBuilder};
pub use masked::{MaskedStack, MaskedStacks};
pub use progress::{LoadProgress, LoadStage, ProgressCallback};
pub use session::{SessionBuilder, TrapSession};
