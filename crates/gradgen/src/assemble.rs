use std::collections::BTreeSet;

use log::{debug, info};

use crate::config::GenConfig;
use crate::derivatives::emit_derivatives;
use crate::error::GenResult;
use crate::ir::{BaseClass, BodyStatement, GeneratedFunction};
use crate::ranges::allocate_ranges;
use crate::saved::synthesize_saves;
use crate::schema::OperationSpec;
use crate::trace::classify_base;
use crate::validate::validate_specs;

/// Composes the synthesis stages into one backward function.
///
/// Name uniqueness is not re-checked here; [`validate_specs`] owns that.
pub fn assemble_function(
    spec: &OperationSpec,
    untraceable: &BTreeSet<String>,
) -> GenResult<GeneratedFunction> {
    let ranges = allocate_ranges(&spec.args_with_gradients);
    let saves = synthesize_saves(spec)?;
    let derivatives = emit_derivatives(&spec.derivatives);
    let base = classify_base(&spec.name, untraceable);

    let mut body = Vec::with_capacity(
        usize::from(derivatives.uses_grad_alias) + saves.unpacks.len() + derivatives.blocks.len(),
    );
    if derivatives.uses_grad_alias {
        body.push(BodyStatement::GradAlias);
    }
    body.extend(saves.unpacks.into_iter().map(BodyStatement::Unpack));
    body.extend(derivatives.blocks.into_iter().map(BodyStatement::Derivative));

    let function = GeneratedFunction {
        op: spec.type_name().to_string(),
        name: spec.name.clone(),
        base,
        index_ranges: ranges.ranges,
        list_size_fields: ranges.list_size_fields,
        saved: saves.entries,
        releases: saves.releases,
        body,
    };
    debug!(
        "assembled {} ({:?}): {} ranges, {} saved, {} statements",
        function.op,
        function.base,
        function.index_ranges.len(),
        function.saved.len(),
        function.body.len()
    );
    Ok(function)
}

/// Validates the whole collection, then assembles each spec in input order.
pub fn assemble_all(
    specs: &[OperationSpec],
    config: &GenConfig,
) -> GenResult<Vec<GeneratedFunction>> {
    validate_specs(specs, config)?;
    let functions = specs
        .iter()
        .map(|spec| assemble_function(spec, &config.untraceable))
        .collect::<GenResult<Vec<_>>>()?;
    let opaque = functions
        .iter()
        .filter(|function| function.base == BaseClass::Opaque)
        .count();
    info!(
        "assembled {} autograd functions ({opaque} opaque)",
        functions.len()
    );
    Ok(functions)
}
