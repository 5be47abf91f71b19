//! Render targets turn assembled functions into source text.
//!
//! A target renders each function into three fragments, then wraps the
//! collected fragments into its output files.

mod registry;

use crate::error::GenResult;
use crate::ir::GeneratedFunction;

pub use registry::{get_target, list_targets, register_target, TargetInfo};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedFunction {
    pub declaration: String,
    pub definition: String,
    pub registration: String,
}

/// Ordered fragment collections, one entry per function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentCollections {
    pub declarations: Vec<String>,
    pub definitions: Vec<String>,
    pub registrations: Vec<String>,
}

impl FragmentCollections {
    pub fn push(&mut self, rendered: RenderedFunction) {
        self.declarations.push(rendered.declaration);
        self.definitions.push(rendered.definition);
        self.registrations.push(rendered.registration);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub generated_comment: String,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub name: String,
    pub contents: String,
}

pub trait RenderTarget: Send + Sync {
    fn name(&self) -> &str;
    /// Output format version, stamped into the generated header. Bump it
    /// whenever the rendered text changes for the same input.
    fn version(&self) -> u64 {
        0
    }
    fn render_function(&self, function: &GeneratedFunction) -> GenResult<RenderedFunction>;
    fn render_files(
        &self,
        fragments: &FragmentCollections,
        header: &FileHeader,
    ) -> GenResult<Vec<OutputFile>>;
}
