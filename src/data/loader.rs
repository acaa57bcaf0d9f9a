use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{error, info};
use ndarray::{Array2, Array3, ArrayView2, Axis};
use rayon::prelude::*;
use serde_json::Value as JsonValue;

use super::model::{FrameFile, FrameStacks, TrapCoordinate, TrapRegistry, TripletRole};
use crate::config::{DecodePolicy, SessionConfig};
use crate::error::{Error, Result};
use crate::progress::{LoadStage, ProgressCallback, report_progress};

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// Decode one image file into an 8-bit `(height, width)` intensity grid.
///
/// Color images are converted to luma; 16-bit images are scaled down to 8 bits.
pub fn decode_frame(path: &Path) -> Result<Array2<u8>> {
    let image = image::open(path)
        .map_err(|source| Error::ImageDecode {
            path: path.to_path_buf(),
            source,
        })?
        .into_luma8();
    let (width, height) = image.dimensions();
    let shape = (height as usize, width as usize);
    let pixels = image.into_raw();
    let rows = pixels.len() / shape.1.max(1);
    Array2::from_shape_vec(shape, pixels).map_err(|_| Error::ShapeMismatch {
        what: format!("decoded pixels of '{}'", path.display()),
        expected: shape,
        actual: (rows, shape.1),
    })
}

/// Decode cataloged frames and assemble the `all`/`first`/`second`/`third` stacks.
///
/// Stacks keep the order of `frames` even when decoding runs in parallel. An
/// undecodable file is handled per [`DecodePolicy`]; a frame whose shape differs
/// from the first loaded frame fails the load.
pub fn load_frames(
    frames: &[FrameFile],
    config: &SessionConfig,
    progress: &ProgressCallback,
) -> Result<FrameStacks> {
    let total = frames.len();
    let done = AtomicUsize::new(0);
    let decode = |frame: &FrameFile| {
        let result = decode_frame(&frame.path);
        let current = done.fetch_add(1, Ordering::Relaxed) + 1;
        report_progress(progress, current, total, LoadStage::Decoding);
        result
    };

    let decoded: Vec<Result<Array2<u8>>> = if config.parallel {
        frames.par_iter().map(decode).collect()
    } else {
        frames.iter().map(decode).collect()
    };

    let mut loaded: Vec<(&FrameFile, Array2<u8>)> = Vec::with_capacity(total);
    for (frame, result) in frames.iter().zip(decoded) {
        match result {
            Ok(grid) => loaded.push((frame, grid)),
            Err(e) => match config.decode_policy {
                DecodePolicy::Abort => return Err(e),
                DecodePolicy::Skip => error!("Could not open image {}: {e}", frame.path.display()),
            },
        }
    }

    let shape = match loaded.first() {
        Some((_, grid)) => grid.dim(),
        None => return Err(Error::EmptyStack),
    };
    if let Some((frame, grid)) = loaded.iter().find(|(_, grid)| grid.dim() != shape) {
        return Err(Error::ShapeMismatch {
            what: format!("frame '{}'", frame.name),
            expected: shape,
            actual: grid.dim(),
        });
    }

    let stack_of = |role: Option<TripletRole>| {
        let grids = loaded
            .iter()
            .filter(|(frame, _)| role.map_or(true, |r| frame.role == r))
            .map(|(_, grid)| grid);
        stack_frames(grids, shape)
    };

    let all = stack_of(None)?;
    report_progress(progress, 1, 4, LoadStage::Stacking);
    let first = stack_of(Some(TripletRole::First))?;
    report_progress(progress, 2, 4, LoadStage::Stacking);
    let second = stack_of(Some(TripletRole::Second))?;
    report_progress(progress, 3, 4, LoadStage::Stacking);
    let third = stack_of(Some(TripletRole::Third))?;
    report_progress(progress, 4, 4, LoadStage::Stacking);

    info!(
        "Loaded {} frames ({} first, {} second, {} third) of {}x{} pixels",
        all.dim().0,
        first.dim().0,
        second.dim().0,
        third.dim().0,
        shape.1,
        shape.0
    );
    FrameStacks::new(all, first, second, third)
}

fn stack_frames<'a>(
    grids: impl Iterator<Item = &'a Array2<u8>>,
    (height, width): (usize, usize),
) -> Result<Array3<u8>> {
    let views: Vec<ArrayView2<'_, u8>> = grids.map(|grid| grid.view()).collect();
    if views.is_empty() {
        return Ok(Array3::zeros((0, height, width)));
    }
    if let Some(view) = views.iter().find(|view| view.dim() != (height, width)) {
        return Err(Error::ShapeMismatch {
            what: "frame stack".to_string(),
            expected: (height, width),
            actual: view.dim(),
        });
    }
    ndarray::stack(Axis(0), &views).map_err(|_| Error::ShapeMismatch {
        what: "frame stack".to_string(),
        expected: (height, width),
        actual: views[0].dim(),
    })
}

// ---------------------------------------------------------------------------
// Trap positions
// ---------------------------------------------------------------------------

/// Load trap coordinates from a JSON file.
///
/// Expected layout (ids are string-encoded integers, coordinates are numbers or
/// numeric strings):
///
/// ```json
/// {
///   "54": { "x": 63.5, "y": 64.0 },
///   "55": { "x": 75.2, "y": 64.1 }
/// }
/// ```
pub fn load_trap_registry(path: &Path) -> Result<TrapRegistry> {
    let text = std::fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => Error::TrapFileNotFound {
            path: path.to_path_buf(),
        },
        _ => Error::TrapFileRead {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let registry = parse_traps(&text).map_err(|reason| Error::TrapFileFormat {
        path: path.to_path_buf(),
        reason,
    })?;
    info!("Loaded {} trap positions from {}", registry.len(), path.display());
    Ok(registry)
}

fn parse_traps(text: &str) -> std::result::Result<TrapRegistry, String> {
    let root: JsonValue = serde_json::from_str(text).map_err(|e| format!("invalid JSON: {e}"))?;
    let traps = root
        .as_object()
        .ok_or("expected a top-level JSON object")?;

    traps
        .iter()
        .map(|(key, pos)| -> std::result::Result<(i64, TrapCoordinate), String> {
            let id: i64 = key
                .trim()
                .parse()
                .map_err(|_| format!("trap id '{key}' is not an integer"))?;
            let fields = pos
                .as_object()
                .ok_or_else(|| format!("trap {key}: expected an object with 'x' and 'y'"))?;
            let x = json_coordinate(fields.get("x"), key, "x")?;
            let y = json_coordinate(fields.get("y"), key, "y")?;
            Ok((id, TrapCoordinate { x, y }))
        })
        .collect()
}

fn json_coordinate(
    val: Option<&JsonValue>,
    key: &str,
    axis: &str,
) -> std::result::Result<f64, String> {
    let value = match val {
        Some(JsonValue::Number(n)) => n.as_f64(),
        Some(JsonValue::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("trap {key}: missing or invalid '{axis}'"))
}
