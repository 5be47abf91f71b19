//! C++ render target: backward structs deriving from the autograd
//! `Function`/`TraceableFunction` bases, plus their Python binding stubs.

use std::sync::Arc;

use gradgen::error::GenResult;
use gradgen::ir::GeneratedFunction;
use gradgen::target::{
    register_target, FileHeader, FragmentCollections, OutputFile, RenderTarget, RenderedFunction,
};
use log::trace;

mod emit;
mod files;
mod utils;

pub use files::{FUNCTIONS_CPP, FUNCTIONS_H, PY_FUNCTIONS_CPP, PY_FUNCTIONS_H};

pub const TARGET_NAME: &str = "cpp";
/// Bumped whenever the emitted C++ changes shape.
pub const FORMAT_VERSION: u64 = 1;

pub struct CppTarget;

impl CppTarget {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CppTarget {
    fn default() -> Self {
        Self
    }
}

impl RenderTarget for CppTarget {
    fn name(&self) -> &str {
        TARGET_NAME
    }

    fn version(&self) -> u64 {
        FORMAT_VERSION
    }

    fn render_function(&self, function: &GeneratedFunction) -> GenResult<RenderedFunction> {
        let rendered = RenderedFunction {
            declaration: emit::emit_declaration(function),
            definition: emit::emit_definition(function)?,
            registration: emit::emit_registration(function),
        };
        trace!("rendered {} as {}", function.op, emit::superclass(function.base));
        Ok(rendered)
    }

    fn render_files(
        &self,
        fragments: &FragmentCollections,
        header: &FileHeader,
    ) -> GenResult<Vec<OutputFile>> {
        Ok(files::render_all(fragments, header))
    }
}

/// Makes the C++ target available to `gradgen::generate_to_dir`.
pub fn register_targets() -> GenResult<()> {
    register_target(Arc::new(CppTarget::new()))?;
    Ok(())
}
