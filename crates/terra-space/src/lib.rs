//! Space backdrop: procedural starfield point clouds on a spherical shell.

pub mod starfield;

pub use starfield::{PointCloud, StarPoint, StarfieldConfig, StarfieldError, StarfieldGenerator};
