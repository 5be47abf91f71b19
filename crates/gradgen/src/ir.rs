//! Typed intermediate representation of a generated backward function.
//!
//! Synthesis stages produce these records; render targets consume them. No
//! textual formatting happens here, only naming conventions shared by every
//! target.

use crate::schema::ArgType;

/// Identifier the generated body binds to the first incoming gradient.
pub const GRAD_ALIAS: &str = "grad";
/// Identifier of the per-slot mask that multi-output formulas may consult.
pub const GRAD_INPUT_MASK: &str = "grad_input_mask";
/// Identifiers owned by the generated `apply` body.
pub const RESERVED_IDENTIFIERS: &[&str] = &[
    "grads",
    "grad_inputs",
    "gen",
    "grad_result",
    GRAD_INPUT_MASK,
    GRAD_ALIAS,
];

pub fn range_binding(arg: &str) -> String {
    format!("{arg}_ix")
}

pub fn list_size_field(arg: &str) -> String {
    format!("{arg}_size_")
}

/// Length of one index range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RangeLength {
    One,
    /// Resolved at runtime from a field recorded during the forward pass.
    ListSize { field: String },
}

/// Sum of a constant and runtime list sizes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SymbolicSize {
    pub constant: usize,
    pub list_sizes: Vec<String>,
}

impl SymbolicSize {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn plus(&self, length: &RangeLength) -> Self {
        let mut out = self.clone();
        match length {
            RangeLength::One => out.constant += 1,
            RangeLength::ListSize { field } => out.list_sizes.push(field.clone()),
        }
        out
    }

    pub fn is_static(&self) -> bool {
        self.list_sizes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexRange {
    pub arg: String,
    pub start: SymbolicSize,
    pub length: RangeLength,
}

impl IndexRange {
    pub fn binding(&self) -> String {
        range_binding(&self.arg)
    }

    pub fn end(&self) -> SymbolicSize {
        self.start.plus(&self.length)
    }
}

/// Persistent field remembering a list argument's length across passes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListSizeField {
    pub arg: String,
    pub field: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveOrigin {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Lazily materialized holder with an explicit release.
    OpaqueHolder,
    /// Owned copy of an integer list.
    ListCopy,
    /// The typed value, copied as is.
    Verbatim,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SavedEntry {
    pub name: String,
    pub ty: ArgType,
    pub origin: SaveOrigin,
    pub storage: StorageKind,
}

impl SavedEntry {
    pub fn field(&self) -> String {
        match self.storage {
            StorageKind::OpaqueHolder => format!("{}_", self.name),
            StorageKind::ListCopy | StorageKind::Verbatim => self.name.clone(),
        }
    }

    pub fn release(&self) -> Option<ReleaseStmt> {
        match self.storage {
            StorageKind::OpaqueHolder => Some(ReleaseStmt { field: self.field() }),
            StorageKind::ListCopy | StorageKind::Verbatim => None,
        }
    }

    pub fn unpack(&self) -> Option<UnpackStmt> {
        match self.storage {
            StorageKind::OpaqueHolder => Some(UnpackStmt {
                name: self.name.clone(),
                field: self.field(),
                owner_ref: self.origin == SaveOrigin::Output,
            }),
            StorageKind::ListCopy | StorageKind::Verbatim => None,
        }
    }
}

/// Clears a held reference without destroying the owning struct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseStmt {
    pub field: String,
}

/// Materializes a saved value at its point of use.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnpackStmt {
    pub name: String,
    pub field: String,
    /// Pass the owning function so an output can be rebuilt with its history.
    pub owner_ref: bool,
}

/// One "is this slot requested" flag per var, in var order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GradInputMask {
    pub vars: Vec<String>,
}

impl GradInputMask {
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DerivativeBlock {
    Single {
        var: String,
        formula: String,
    },
    /// The formula yields a tuple; component `i` lands in `vars[i]`.
    Multi {
        vars: Vec<String>,
        formula: String,
        mask: Option<GradInputMask>,
    },
}

impl DerivativeBlock {
    pub fn vars(&self) -> Vec<&str> {
        match self {
            DerivativeBlock::Single { var, .. } => vec![var.as_str()],
            DerivativeBlock::Multi { vars, .. } => vars.iter().map(String::as_str).collect(),
        }
    }

    pub fn formula(&self) -> &str {
        match self {
            DerivativeBlock::Single { formula, .. } | DerivativeBlock::Multi { formula, .. } => {
                formula
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BodyStatement {
    GradAlias,
    Unpack(UnpackStmt),
    Derivative(DerivativeBlock),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseClass {
    /// Backward can be recorded and replayed symbolically.
    Traceable,
    /// Backward runs as a single opaque step.
    Opaque,
}

/// Fully assembled backward function, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeneratedFunction {
    pub op: String,
    pub name: String,
    pub base: BaseClass,
    pub index_ranges: Vec<IndexRange>,
    pub list_size_fields: Vec<ListSizeField>,
    pub saved: Vec<SavedEntry>,
    pub releases: Vec<ReleaseStmt>,
    pub body: Vec<BodyStatement>,
}

impl GeneratedFunction {
    pub fn grad_vector_size(&self) -> SymbolicSize {
        self.index_ranges
            .last()
            .map(IndexRange::end)
            .unwrap_or_else(SymbolicSize::zero)
    }

    pub fn derivative_blocks(&self) -> impl Iterator<Item = &DerivativeBlock> {
        self.body.iter().filter_map(|stmt| match stmt {
            BodyStatement::Derivative(block) => Some(block),
            _ => None,
        })
    }

    pub fn uses_grad_alias(&self) -> bool {
        self.body
            .iter()
            .any(|stmt| matches!(stmt, BodyStatement::GradAlias))
    }
}
