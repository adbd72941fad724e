//! Helmview Core - Foundational types for the cluster-less chart renderer
//!
//! This crate provides the types shared by the engine and its collaborators:
//! - `HelmChart`: parsed chart metadata plus the seeded render context
//! - `ReleaseInfo`: the fixed placeholder release record (no cluster exists)
//! - `ChartFilesystem`: the interface the engine uses to read chart files

pub mod chart;
pub mod error;
pub mod fs;
pub mod release;

pub use chart::{HelmChart, Maintainer};
pub use error::CoreError;
pub use fs::{ChartFilesystem, FileEntry, FsError, MemoryFilesystem};
pub use release::ReleaseInfo;
