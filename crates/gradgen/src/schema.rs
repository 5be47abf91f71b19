//! Operation records consumed by the generator.
//!
//! These mirror what the external derivatives parser produces. The generator
//! only reads them; all derived state lives in [`crate::ir`].

use serde::{Deserialize, Serialize};

use crate::error::GenResult;

/// Argument of the forward operation, either one that receives a gradient or
/// one that is saved for the backward pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArgSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: String,
}

impl ArgSpec {
    pub fn new(name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_tag: type_tag.into(),
        }
    }

    pub fn tensor(name: impl Into<String>) -> Self {
        Self::new(name, "Tensor")
    }

    pub fn tensor_list(name: impl Into<String>) -> Self {
        Self::new(name, "TensorList")
    }

    /// List-typed gradient arguments occupy a runtime-sized range.
    pub fn is_list(&self) -> bool {
        matches!(ArgType::parse(&self.type_tag), Some(ArgType::TensorList))
    }
}

/// One formula computing the gradients of one or more inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DerivativeEntry {
    pub var_names: Vec<String>,
    pub formula: String,
}

impl DerivativeEntry {
    pub fn new<I, S>(var_names: I, formula: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            var_names: var_names.into_iter().map(Into::into).collect(),
            formula: formula.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationSpec {
    /// Declaration name of the forward operation, e.g. `expand`.
    pub name: String,
    /// Name of the generated backward type. Falls back to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    #[serde(default)]
    pub args_with_gradients: Vec<ArgSpec>,
    #[serde(default)]
    pub saved_inputs: Vec<ArgSpec>,
    #[serde(default)]
    pub saved_outputs: Vec<ArgSpec>,
    #[serde(default)]
    pub derivatives: Vec<DerivativeEntry>,
}

impl OperationSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op: None,
            args_with_gradients: Vec::new(),
            saved_inputs: Vec::new(),
            saved_outputs: Vec::new(),
            derivatives: Vec::new(),
        }
    }

    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    pub fn with_gradient_args(mut self, args: impl IntoIterator<Item = ArgSpec>) -> Self {
        self.args_with_gradients = args.into_iter().collect();
        self
    }

    pub fn with_saved_inputs(mut self, args: impl IntoIterator<Item = ArgSpec>) -> Self {
        self.saved_inputs = args.into_iter().collect();
        self
    }

    pub fn with_saved_outputs(mut self, args: impl IntoIterator<Item = ArgSpec>) -> Self {
        self.saved_outputs = args.into_iter().collect();
        self
    }

    pub fn with_derivatives(
        mut self,
        derivatives: impl IntoIterator<Item = DerivativeEntry>,
    ) -> Self {
        self.derivatives = derivatives.into_iter().collect();
        self
    }

    /// Type identity of the generated backward function.
    pub fn type_name(&self) -> &str {
        self.op.as_deref().unwrap_or(&self.name)
    }
}

/// Interpreted argument type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgType {
    Tensor,
    TensorList,
    Scalar,
    IntList,
    /// Any other C++ type, stored verbatim.
    Other(String),
}

impl ArgType {
    /// Parses a type tag. Returns `None` for a malformed tag.
    pub fn parse(tag: &str) -> Option<ArgType> {
        let tag = tag.trim();
        match tag {
            "Tensor" => Some(ArgType::Tensor),
            "TensorList" => Some(ArgType::TensorList),
            "Scalar" => Some(ArgType::Scalar),
            "IntList" => Some(ArgType::IntList),
            other if is_well_formed_type(other) => Some(ArgType::Other(other.to_string())),
            _ => None,
        }
    }

    pub fn spelling(&self) -> &str {
        match self {
            ArgType::Tensor => "Tensor",
            ArgType::TensorList => "TensorList",
            ArgType::Scalar => "Scalar",
            ArgType::IntList => "IntList",
            ArgType::Other(spelling) => spelling,
        }
    }
}

fn is_well_formed_type(tag: &str) -> bool {
    let Some(first) = tag.chars().next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_' || first == ':') {
        return false;
    }
    let mut depth = 0i32;
    for ch in tag.chars() {
        match ch {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            c if c.is_ascii_alphanumeric() => {}
            '_' | ':' | ',' | '*' | '&' | ' ' => {}
            _ => return false,
        }
    }
    depth == 0
}

/// Parses a schema collection from its JSON form (an array of operations).
pub fn parse_specs(json: &str) -> GenResult<Vec<OperationSpec>> {
    Ok(serde_json::from_str(json)?)
}

/// Stable hash of a spec collection, used to stamp generated files.
pub fn schema_fingerprint(specs: &[OperationSpec]) -> GenResult<u64> {
    let bytes = bincode::serialize(specs)?;
    Ok(fnv_hash(&bytes))
}

fn fnv_hash(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    let mut hash = OFFSET;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tags_parse_known_and_verbatim_spellings() {
        assert_eq!(ArgType::parse("Tensor"), Some(ArgType::Tensor));
        assert_eq!(ArgType::parse(" IntList "), Some(ArgType::IntList));
        assert_eq!(
            ArgType::parse("std::array<bool, 3>"),
            Some(ArgType::Other("std::array<bool, 3>".to_string()))
        );
        assert_eq!(ArgType::parse("int64_t"), Some(ArgType::Other("int64_t".to_string())));
    }

    #[test]
    fn malformed_type_tags_are_rejected() {
        assert_eq!(ArgType::parse(""), None);
        assert_eq!(ArgType::parse("   "), None);
        assert_eq!(ArgType::parse("3d"), None);
        assert_eq!(ArgType::parse("Tensor;"), None);
        assert_eq!(ArgType::parse("std::vector<int"), None);
        assert_eq!(ArgType::parse("a>b<"), None);
    }

    #[test]
    fn op_defaults_to_name() {
        let spec = OperationSpec::new("add");
        assert_eq!(spec.type_name(), "add");
        let spec = spec.with_op("AddBackward");
        assert_eq!(spec.type_name(), "AddBackward");
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = vec![OperationSpec::new("add")];
        let b = vec![OperationSpec::new("sub")];
        let fp_a = schema_fingerprint(&a).expect("encodes");
        assert_eq!(fp_a, schema_fingerprint(&a.clone()).expect("encodes"));
        assert_ne!(fp_a, schema_fingerprint(&b).expect("encodes"));
        assert_ne!(fp_a, fnv_hash(&[]));
    }

    #[test]
    fn encoding_failures_surface_as_errors() {
        let err: crate::error::GenError = Box::new(bincode::ErrorKind::SizeLimit).into();
        assert!(matches!(err, crate::error::GenError::Encode(_)));
        assert!(err.to_string().starts_with("schema encoding error"));
    }
}
