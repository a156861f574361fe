//! Build littlefs flash images from a host directory tree.
//!
//! The image is produced by running the real littlefs library against an
//! emulated NOR flash device that lives in a host file. The emulation is
//! faithful to the hardware: a program operation can only clear bits, and
//! only an erase sets them back to `1`. Whatever littlefs writes through
//! this backend is therefore exactly what it would have written to the
//! device's flash chip.
//!
//! # Pipeline
//! ```text
//! size (kB) --> Geometry --> NorFlash::create (erase-filled file)
//!           --> littlefs format + mount --> Packager walks the source tree
//!           --> finish (flush + sync)
//! ```
//!
//! # Important Implementation Details
//! * `NorFlash` holds no session state besides the backing stream; every
//!   operation seeks to its own offset.
//! * The backend performs no alignment checks, littlefs is trusted to
//!   respect the geometry it was given.
//! * Hidden (`.`-prefixed) *directories* are not packaged, hidden regular
//!   files are.

#[macro_use]
extern crate log;

pub mod constants;
mod error;
pub mod flash;
pub mod geometry;
mod image;
pub mod packager;

pub use crate::error::{Error, Result};
pub use crate::flash::NorFlash;
pub use crate::geometry::{Geometry, SizeAdjustment};
pub use crate::image::{BuildConfig, ImageBuilder, Report};
pub use crate::packager::{HostFiles, ImageWriter, Packager, SourceFiles, Summary, TargetPath};
