//! Run DelphiScript automation scripts inside Altium Designer.
//!
//! An [`AltiumRun`](run::AltiumRun) describes what to run: the installation, the scripts to
//! load, the project to open and the function to call. Each run generates a scripting
//! project (a manifest plus a logger and a main script rendered from templates), launches
//! Altium Designer on it and waits for the main script to delete its sentinel file.

pub mod config;
pub mod error;
pub mod io;
pub mod manifest;
pub mod param;
pub mod poll;
pub mod run;
pub mod template;
pub mod version;

pub(crate) mod log;

pub use arcstr;
