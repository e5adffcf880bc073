//! Reliquary: Fixity Reconciliation and Digital Object Assembly
//!
//! Records content digests of files on origin media and after copying into a
//! staging area, reconciles the two, and groups staged files into logical
//! digital objects whose required components and page sequences are checked.

pub mod assembly;
pub mod batch;
pub mod config;
pub mod error;
pub mod fixity;
pub mod logging;
pub mod staging;
pub mod tooling;
pub mod types;
