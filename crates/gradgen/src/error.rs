use std::fmt;

use thiserror::Error;

/// Stable set of schema violation identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecErrorCode {
    MalformedTypeTag,
    MalformedIdentifier,
    DuplicateOperation,
    EmptyVarNames,
    UndeclaredGradientSlot,
    OverlappingDerivative,
    ReservedIdentifier,
    TupleArityMismatch,
}

impl SpecErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecErrorCode::MalformedTypeTag => "SpecViolation: malformed argument type tag",
            SpecErrorCode::MalformedIdentifier => {
                "SpecViolation: name is not a valid C++ identifier"
            }
            SpecErrorCode::DuplicateOperation => "SpecViolation: duplicate operation name",
            SpecErrorCode::EmptyVarNames => "SpecViolation: derivative entry has no var_names",
            SpecErrorCode::UndeclaredGradientSlot => {
                "SpecViolation: var_name does not name an argument with gradient"
            }
            SpecErrorCode::OverlappingDerivative => {
                "SpecViolation: gradient slot covered by more than one derivative"
            }
            SpecErrorCode::ReservedIdentifier => {
                "SpecViolation: saved name collides with a reserved identifier"
            }
            SpecErrorCode::TupleArityMismatch => {
                "SpecViolation: derivative tuple arity does not match var_names"
            }
        }
    }
}

/// Schema violation detected before any code is generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecError {
    pub code: SpecErrorCode,
    pub operation: String,
    pub detail: Option<String>,
}

impl SpecError {
    pub fn new(
        code: SpecErrorCode,
        operation: impl Into<String>,
        detail: impl Into<Option<String>>,
    ) -> Self {
        Self {
            code,
            operation: operation.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = &self.operation;
        match &self.detail {
            Some(detail) => write!(f, "{} in '{op}' ({detail})", self.code.as_str()),
            None => write!(f, "{} in '{op}'", self.code.as_str()),
        }
    }
}

impl std::error::Error for SpecError {}

/// Error surfaced by a generation run. Every variant aborts the whole run.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("{0}")]
    SpecViolation(SpecError),
    #[error("render target '{0}' is not registered")]
    UnknownTarget(String),
    #[error("render target '{name}' v{registered} is already registered, refusing v{offered}")]
    TargetConflict {
        name: String,
        registered: u64,
        offered: u64,
    },
    #[error("render failure: {0}")]
    Render(String),
    #[error("schema json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("schema encoding error: {0}")]
    Encode(#[from] bincode::Error),
}

impl GenError {
    pub fn spec(
        code: SpecErrorCode,
        operation: impl Into<String>,
        detail: impl Into<Option<String>>,
    ) -> Self {
        GenError::SpecViolation(SpecError::new(code, operation, detail))
    }

    pub fn render(message: impl Into<String>) -> Self {
        GenError::Render(message.into())
    }

    /// Returns the violation code when this error is a schema violation.
    pub fn spec_code(&self) -> Option<SpecErrorCode> {
        match self {
            GenError::SpecViolation(err) => Some(err.code),
            _ => None,
        }
    }
}

impl From<SpecError> for GenError {
    fn from(err: SpecError) -> Self {
        GenError::SpecViolation(err)
    }
}

pub type GenResult<T> = Result<T, GenError>;
