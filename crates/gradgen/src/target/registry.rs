use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use log::debug;

use super::RenderTarget;
use crate::error::{GenError, GenResult};

type TargetMap = BTreeMap<String, Arc<dyn RenderTarget>>;

/// Name and output format version of a registered target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    pub name: String,
    pub version: u64,
}

static TARGETS: OnceLock<RwLock<TargetMap>> = OnceLock::new();

fn targets() -> &'static RwLock<TargetMap> {
    TARGETS.get_or_init(|| RwLock::new(BTreeMap::new()))
}

/// Registers `target` under its name and returns the target it replaced.
///
/// Re-registering the same name is allowed only at the same `version()`;
/// two formats under one name would make generated output depend on
/// registration order.
pub fn register_target(
    target: Arc<dyn RenderTarget>,
) -> GenResult<Option<Arc<dyn RenderTarget>>> {
    // Every update is a single insert, so a poisoned map is still consistent.
    let mut map = targets().write().unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = map.get(target.name()) {
        if existing.version() != target.version() {
            return Err(GenError::TargetConflict {
                name: target.name().to_string(),
                registered: existing.version(),
                offered: target.version(),
            });
        }
    }
    debug!("registering render target {} v{}", target.name(), target.version());
    Ok(map.insert(target.name().to_string(), target))
}

pub fn get_target(name: &str) -> Option<Arc<dyn RenderTarget>> {
    let map = targets().read().unwrap_or_else(PoisonError::into_inner);
    map.get(name).cloned()
}

pub fn list_targets() -> Vec<TargetInfo> {
    let map = targets().read().unwrap_or_else(PoisonError::into_inner);
    map.values()
        .map(|target| TargetInfo {
            name: target.name().to_string(),
            version: target.version(),
        })
        .collect()
}
