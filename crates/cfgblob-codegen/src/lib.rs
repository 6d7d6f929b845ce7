//! Planning and emission for configuration-record projections.
//!
//! Per record this crate emits the flat layout struct, the two-phase
//! population impl, the markup parse routines and any declared indexes.
//! Planners produce a small statement IR (`plan`) that is rendered with
//! `quote`.

pub mod analysis;
pub mod classify;
pub mod container;
pub mod error;
pub mod field;
pub mod helper;
pub mod index;
pub mod layout;
pub mod orchestrate;
pub mod parse;
pub mod paths;
pub mod plan;
pub mod record;
pub mod transcode;


use crate::{parse::MarkupOptions, paths::CratePaths};

/// Default suffix appended to a record name to form its layout name.
pub const DEFAULT_LAYOUT_SUFFIX: &str = "Layout";

///
/// CodegenOptions
///

#[derive(Clone, Debug)]
pub struct CodegenOptions {
    pub paths: CratePaths,
    pub layout_suffix: String,
    pub markup: MarkupOptions,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            paths: CratePaths::new(),
            layout_suffix: DEFAULT_LAYOUT_SUFFIX.to_string(),
            markup: MarkupOptions::default(),
        }
    }
}

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        CodegenOptions,
        error::CodegenError,
        parse::MarkupOptions,
        paths::CratePaths,
        record::{GeneratedRecord, generate_record},
    };
}
