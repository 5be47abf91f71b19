use crate::error::{GenError, GenResult, SpecErrorCode};
use crate::ir::{ReleaseStmt, SaveOrigin, SavedEntry, StorageKind, UnpackStmt};
use crate::schema::{ArgSpec, ArgType, OperationSpec};

/// Everything a backward function keeps from its forward pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavePlan {
    pub entries: Vec<SavedEntry>,
    pub releases: Vec<ReleaseStmt>,
    pub unpacks: Vec<UnpackStmt>,
}

pub fn storage_kind(ty: &ArgType, origin: SaveOrigin) -> StorageKind {
    match ty {
        ArgType::Tensor => StorageKind::OpaqueHolder,
        ArgType::Scalar if origin == SaveOrigin::Output => StorageKind::OpaqueHolder,
        ArgType::IntList => StorageKind::ListCopy,
        _ => StorageKind::Verbatim,
    }
}

/// Builds saved entries for inputs, then outputs, preserving schema order.
pub fn synthesize_saves(spec: &OperationSpec) -> GenResult<SavePlan> {
    let inputs = spec.saved_inputs.iter().map(|arg| (arg, SaveOrigin::Input));
    let outputs = spec.saved_outputs.iter().map(|arg| (arg, SaveOrigin::Output));

    let mut plan = SavePlan::default();
    for (arg, origin) in inputs.chain(outputs) {
        let entry = saved_entry(spec, arg, origin)?;
        if let Some(release) = entry.release() {
            plan.releases.push(release);
        }
        if let Some(unpack) = entry.unpack() {
            plan.unpacks.push(unpack);
        }
        plan.entries.push(entry);
    }
    Ok(plan)
}

fn saved_entry(spec: &OperationSpec, arg: &ArgSpec, origin: SaveOrigin) -> GenResult<SavedEntry> {
    let ty = ArgType::parse(&arg.type_tag).ok_or_else(|| {
        GenError::spec(
            SpecErrorCode::MalformedTypeTag,
            spec.type_name(),
            format!("saved '{}' has type '{}'", arg.name, arg.type_tag),
        )
    })?;
    let storage = storage_kind(&ty, origin);
    Ok(SavedEntry {
        name: arg.name.clone(),
        ty,
        origin,
        storage,
    })
}
