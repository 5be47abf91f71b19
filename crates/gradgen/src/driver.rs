use std::path::Path;

use anyhow::{Context, Result};
use log::{info, trace};

use crate::assemble::assemble_all;
use crate::config::GenConfig;
use crate::error::{GenError, GenResult};
use crate::ir::GeneratedFunction;
use crate::schema::{parse_specs, schema_fingerprint, OperationSpec};
use crate::target::{get_target, FileHeader, FragmentCollections, OutputFile, RenderTarget};

/// Result of a generation run, fully rendered but not yet written.
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub functions: Vec<GeneratedFunction>,
    pub fragments: FragmentCollections,
    pub files: Vec<OutputFile>,
    pub fingerprint: u64,
}

impl GenerationOutput {
    pub fn file(&self, name: &str) -> Option<&OutputFile> {
        self.files.iter().find(|file| file.name == name)
    }
}

pub fn generated_comment(
    config: &GenConfig,
    target: &dyn RenderTarget,
    fingerprint: u64,
) -> String {
    let source = &config.source_label;
    let (name, version) = (target.name(), target.version());
    format!("@generated from {source} by gradgen {name}/v{version} (schema {fingerprint:016x})")
}

/// Validates, assembles and renders every spec in input order.
pub fn generate(
    specs: &[OperationSpec],
    config: &GenConfig,
    target: &dyn RenderTarget,
) -> GenResult<GenerationOutput> {
    let functions = assemble_all(specs, config)?;

    let mut fragments = FragmentCollections::default();
    for function in &functions {
        let rendered = target.render_function(function)?;
        trace!("{}:\n{}{}", function.op, rendered.declaration, rendered.definition);
        fragments.push(rendered);
    }

    let fingerprint = schema_fingerprint(specs)?;
    let header = FileHeader {
        generated_comment: generated_comment(config, target, fingerprint),
        namespace: config.namespace.clone(),
    };
    let files = target.render_files(&fragments, &header)?;
    Ok(GenerationOutput {
        functions,
        fragments,
        files,
        fingerprint,
    })
}

pub fn load_specs(path: impl AsRef<Path>) -> Result<Vec<OperationSpec>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema {}", path.display()))?;
    parse_specs(&text).with_context(|| format!("failed to parse schema {}", path.display()))
}

/// Writes every rendered file in full. Any failure aborts the run.
pub fn write_output(output: &GenerationOutput, out_dir: impl AsRef<Path>) -> Result<()> {
    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    for file in &output.files {
        let path = out_dir.join(&file.name);
        std::fs::write(&path, &file.contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    info!(
        "wrote {} files for {} functions to {}",
        output.files.len(),
        output.functions.len(),
        out_dir.display()
    );
    Ok(())
}

/// Loads a JSON schema, generates with the named target and writes the files.
pub fn generate_to_dir(
    schema_path: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    config: &GenConfig,
    target_name: &str,
) -> Result<GenerationOutput> {
    let target = get_target(target_name)
        .ok_or_else(|| GenError::UnknownTarget(target_name.to_string()))?;
    let specs = load_specs(schema_path)?;
    let output = generate(&specs, config, target.as_ref())?;
    write_output(&output, out_dir)?;
    Ok(output)
}
