use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use ndarray::{Array3, Axis};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// TripletRole – position of a frame inside its capture group
// ---------------------------------------------------------------------------

/// Which frame of a synchronized triplet capture a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TripletRole {
    First,
    Second,
    Third,
    /// The filename carries none of the role tags; the frame only joins the `all` stack.
    Unknown,
}

impl TripletRole {
    /// Tag used in filenames for this role.
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            TripletRole::First => Some("first"),
            TripletRole::Second => Some("second"),
            TripletRole::Third => Some("third"),
            TripletRole::Unknown => None,
        }
    }
}

impl fmt::Display for TripletRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag().unwrap_or("unknown"))
    }
}

// ---------------------------------------------------------------------------
// FrameFile – one cataloged file on disk
// ---------------------------------------------------------------------------

/// A file selected into the catalog, with everything parsed from its name.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameFile {
    pub path: PathBuf,
    /// File name (last path component).
    pub name: String,
    /// Acquisition index shared by the three frames of one capture.
    pub index: u64,
    /// Capture sequence number, used for ordering.
    pub sequence: u64,
    /// Exposure time derived from `index`.
    pub exposure_ms: f64,
    pub role: TripletRole,
}

// ---------------------------------------------------------------------------
// FrameStacks – the four aligned frame stacks
// ---------------------------------------------------------------------------

/// Loaded frames as `(frame, height, width)` arrays.
///
/// `all` holds every frame in catalog order; the other three hold only the frames of
/// the matching role, also in catalog order. All four share one frame shape.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStacks {
    all: Array3<u8>,
    first: Array3<u8>,
    second: Array3<u8>,
    third: Array3<u8>,
}

impl FrameStacks {
    /// Assemble stacks, checking that every stack has the frame shape of `all`.
    ///
    /// Empty role stacks (zero frames) are accepted with any frame shape and
    /// normalized to `(0, height, width)`.
    pub fn new(
        all: Array3<u8>,
        first: Array3<u8>,
        second: Array3<u8>,
        third: Array3<u8>,
    ) -> Result<Self> {
        if all.len_of(Axis(0)) == 0 {
            return Err(Error::EmptyStack);
        }
        let shape = frame_shape_of(&all);
        let normalize = |stack: Array3<u8>, what: &str| -> Result<Array3<u8>> {
            if stack.len_of(Axis(0)) == 0 {
                return Ok(Array3::zeros((0, shape.0, shape.1)));
            }
            let actual = frame_shape_of(&stack);
            if actual != shape {
                return Err(Error::ShapeMismatch {
                    what: format!("{what} stack"),
                    expected: shape,
                    actual,
                });
            }
            Ok(stack)
        };
        Ok(Self {
            first: normalize(first, "first")?,
            second: normalize(second, "second")?,
            third: normalize(third, "third")?,
            all,
        })
    }

    /// Stacks holding only the `all` frames, with empty role stacks.
    pub fn from_all(all: Array3<u8>) -> Result<Self> {
        let empty = Array3::zeros((0, 0, 0));
        Self::new(all, empty.clone(), empty.clone(), empty)
    }

    pub fn all(&self) -> &Array3<u8> {
        &self.all
    }

    pub fn first(&self) -> &Array3<u8> {
        &self.first
    }

    pub fn second(&self) -> &Array3<u8> {
        &self.second
    }

    pub fn third(&self) -> &Array3<u8> {
        &self.third
    }

    /// `(height, width)` shared by every frame.
    pub fn frame_shape(&self) -> (usize, usize) {
        frame_shape_of(&self.all)
    }

    /// Number of frames in `all`.
    pub fn len(&self) -> usize {
        self.all.len_of(Axis(0))
    }

    /// Always false: construction rejects an empty `all` stack.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn frame_shape_of(stack: &Array3<u8>) -> (usize, usize) {
    let (_, h, w) = stack.dim();
    (h, w)
}

// ---------------------------------------------------------------------------
// TrapRegistry – trap id → pixel coordinate
// ---------------------------------------------------------------------------

/// A trap position in pixel coordinates (`x` is the column axis, `y` the row axis).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrapCoordinate {
    pub x: f64,
    pub y: f64,
}

/// Immutable mapping from trap id to coordinate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrapRegistry {
    traps: BTreeMap<i64, TrapCoordinate>,
}

impl TrapRegistry {
    pub fn new(traps: BTreeMap<i64, TrapCoordinate>) -> Self {
        Self { traps }
    }

    pub fn get(&self, id: i64) -> Option<TrapCoordinate> {
        self.traps.get(&id).copied()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.traps.contains_key(&id)
    }

    /// Trap ids in ascending order.
    pub fn ids(&self) -> Vec<i64> {
        self.traps.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, TrapCoordinate)> + '_ {
        self.traps.iter().map(|(id, c)| (*id, *c))
    }

    pub fn len(&self) -> usize {
        self.traps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traps.is_empty()
    }
}

impl FromIterator<(i64, TrapCoordinate)> for TrapRegistry {
    fn from_iter<I: IntoIterator<Item = (i64, TrapCoordinate)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
