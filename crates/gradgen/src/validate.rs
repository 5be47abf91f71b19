//! Schema checks run before any synthesis.
//!
//! The first violation aborts the run; there is no partial output.

use std::collections::HashSet;

use log::debug;

use crate::config::GenConfig;
use crate::derivatives::tuple_arity;
use crate::error::{GenError, GenResult, SpecErrorCode};
use crate::ir::{list_size_field, range_binding, RESERVED_IDENTIFIERS};
use crate::schema::{ArgType, OperationSpec};

pub fn validate_specs(specs: &[OperationSpec], config: &GenConfig) -> GenResult<()> {
    let mut seen = HashSet::new();
    for spec in specs {
        if !seen.insert(spec.type_name()) {
            return Err(GenError::spec(
                SpecErrorCode::DuplicateOperation,
                spec.type_name(),
                None,
            ));
        }
        validate_spec(spec, config)?;
    }
    Ok(())
}

pub fn validate_spec(spec: &OperationSpec, config: &GenConfig) -> GenResult<()> {
    check_type_tags(spec)?;
    check_identifiers(spec)?;
    check_derivative_coverage(spec)?;
    check_saved_names(spec)?;
    if config.strict_arity {
        check_tuple_arity(spec)?;
    }
    Ok(())
}

fn check_type_tags(spec: &OperationSpec) -> GenResult<()> {
    let args = spec
        .args_with_gradients
        .iter()
        .chain(&spec.saved_inputs)
        .chain(&spec.saved_outputs);
    for arg in args {
        if ArgType::parse(&arg.type_tag).is_none() {
            return Err(GenError::spec(
                SpecErrorCode::MalformedTypeTag,
                spec.type_name(),
                format!("'{}' has type '{}'", arg.name, arg.type_tag),
            ));
        }
    }
    Ok(())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The type name and argument names are pasted into declarations as-is.
fn check_identifiers(spec: &OperationSpec) -> GenResult<()> {
    if !is_identifier(spec.type_name()) {
        return Err(GenError::spec(
            SpecErrorCode::MalformedIdentifier,
            spec.type_name(),
            "type name".to_string(),
        ));
    }
    let args = spec
        .args_with_gradients
        .iter()
        .chain(&spec.saved_inputs)
        .chain(&spec.saved_outputs);
    for arg in args {
        if !is_identifier(&arg.name) {
            return Err(GenError::spec(
                SpecErrorCode::MalformedIdentifier,
                spec.type_name(),
                format!("argument '{}'", arg.name),
            ));
        }
    }
    Ok(())
}

fn check_derivative_coverage(spec: &OperationSpec) -> GenResult<()> {
    let declared: HashSet<&str> = spec
        .args_with_gradients
        .iter()
        .map(|arg| arg.name.as_str())
        .collect();
    let mut covered = HashSet::new();
    for (index, derivative) in spec.derivatives.iter().enumerate() {
        if derivative.var_names.is_empty() {
            return Err(GenError::spec(
                SpecErrorCode::EmptyVarNames,
                spec.type_name(),
                format!("derivative #{index}"),
            ));
        }
        for var in &derivative.var_names {
            if !declared.contains(var.as_str()) {
                return Err(GenError::spec(
                    SpecErrorCode::UndeclaredGradientSlot,
                    spec.type_name(),
                    format!("'{var}' in derivative #{index}"),
                ));
            }
            if !covered.insert(var.as_str()) {
                return Err(GenError::spec(
                    SpecErrorCode::OverlappingDerivative,
                    spec.type_name(),
                    format!("'{var}' in derivative #{index}"),
                ));
            }
        }
    }
    Ok(())
}

fn check_saved_names(spec: &OperationSpec) -> GenResult<()> {
    let mut generated: HashSet<String> = RESERVED_IDENTIFIERS
        .iter()
        .map(|ident| ident.to_string())
        .collect();
    for arg in &spec.args_with_gradients {
        generated.insert(range_binding(&arg.name));
        generated.insert(list_size_field(&arg.name));
    }
    for arg in spec.saved_inputs.iter().chain(&spec.saved_outputs) {
        if generated.contains(&arg.name) {
            return Err(GenError::spec(
                SpecErrorCode::ReservedIdentifier,
                spec.type_name(),
                format!("saved '{}'", arg.name),
            ));
        }
    }
    Ok(())
}

fn check_tuple_arity(spec: &OperationSpec) -> GenResult<()> {
    for derivative in &spec.derivatives {
        let expected = derivative.var_names.len();
        if expected < 2 {
            continue;
        }
        match tuple_arity(&derivative.formula) {
            Some(found) if found != expected => {
                return Err(GenError::spec(
                    SpecErrorCode::TupleArityMismatch,
                    spec.type_name(),
                    format!(
                        "formula yields {found} components for {expected} var_names: {}",
                        derivative.formula
                    ),
                ));
            }
            Some(_) => {}
            None => debug!(
                "{}: arity of '{}' not statically known",
                spec.type_name(),
                derivative.formula
            ),
        }
    }
    Ok(())
}
