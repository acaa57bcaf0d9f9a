//! Data layer: filename conventions, cataloging, and loading.
//!
//! Architecture:
//! ```text
//!  directory (*.png + trap_positions.json)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ catalog   │  glob + exposure filter + ordering → Vec<FrameFile>
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  decode → FrameStacks (all / first / second / third)
//!   └──────────┘   parse trap file → TrapRegistry
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  model    │  FrameFile, FrameStacks, TrapRegistry
//!   └──────────┘
//! ```

pub mod catalog;
pub mod exposure;
pub mod loader;
pub mod model;
pub mod naming;
