//! Filename conventions: acquisition index, sequence key and triplet role.
//!
//! The default convention looks like
//!
//! ```text
//! cam_120us_first.acq_1500.png
//!     ^^^               ^^^^
//!     sequence key      acquisition index
//! ```
//!
//! Other conventions plug in through [`FilenameScheme`] and [`RoleClassifier`].

use crate::data::model::TripletRole;
use crate::error::{Error, Result};

/// Extracts the numeric keys embedded in a frame filename.
pub trait FilenameScheme: Send + Sync {
    /// Acquisition index shared by the three frames of one capture.
    fn acquisition_index(&self, name: &str) -> Result<u64>;

    /// Capture sequence number used to order frames.
    fn sequence_key(&self, name: &str) -> Result<u64>;
}

/// Decides which triplet role a filename belongs to.
pub trait RoleClassifier: Send + Sync {
    fn classify(&self, name: &str) -> TripletRole;
}

/// Default scheme.
///
/// * index: last `_`-token of the second `.`-segment;
/// * sequence key: second `_`-token of the name once the `us` unit is stripped.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnderscoreScheme;

impl FilenameScheme for UnderscoreScheme {
    fn acquisition_index(&self, name: &str) -> Result<u64> {
        name.split('.')
            .nth(1)
            .and_then(|segment| segment.rsplit('_').next())
            .and_then(|token| token.parse().ok())
            .ok_or_else(|| Error::FilenameFormat {
                name: name.to_string(),
                what: "acquisition index",
            })
    }

    fn sequence_key(&self, name: &str) -> Result<u64> {
        name.replace("us", "")
            .split('_')
            .nth(1)
            .and_then(|token| token.parse().ok())
            .ok_or_else(|| Error::FilenameFormat {
                name: name.to_string(),
                what: "sequence key",
            })
    }
}

/// Classifies by substring: the first of `first`, `second`, `third` found in the name wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringClassifier;

impl RoleClassifier for SubstringClassifier {
    fn classify(&self, name: &str) -> TripletRole {
        [TripletRole::First, TripletRole::Second, TripletRole::Third]
            .into_iter()
            .find(|role| role.tag().is_some_and(|tag| name.contains(tag)))
            .unwrap_or(TripletRole::Unknown)
    }
}

impl<F> RoleClassifier for F
where
    F: Fn(&str) -> TripletRole + Send + Sync,
{
    fn classify(&self, name: &str) -> TripletRole {
        self(name)
    }
}
