//! Synthesis of autograd backward functions from derivative formula schemas.
//!
//! Each [`schema::OperationSpec`] is validated, lowered through the range
//! allocator, save-set synthesizer, derivative emitter and traceability
//! classifier, and assembled into an [`ir::GeneratedFunction`]. A
//! [`target::RenderTarget`] turns the assembled functions into source files.
//!
//! ```
//! use gradgen::assemble::assemble_all;
//! use gradgen::config::GenConfig;
//! use gradgen::schema::{ArgSpec, DerivativeEntry, OperationSpec};
//!
//! let add = OperationSpec::new("add")
//!     .with_op("AddBackward")
//!     .with_gradient_args([ArgSpec::tensor("self"), ArgSpec::tensor("other")])
//!     .with_derivatives([
//!         DerivativeEntry::new(["self"], "grad"),
//!         DerivativeEntry::new(["other"], "grad"),
//!     ]);
//! let functions = assemble_all(&[add], &GenConfig::default()).expect("valid schema");
//! assert_eq!(functions[0].index_ranges.len(), 2);
//! assert!(functions[0].uses_grad_alias());
//! ```

pub mod assemble;
pub mod config;
pub mod derivatives;
pub mod driver;
pub mod error;
pub mod ir;
pub mod ranges;
pub mod saved;
pub mod schema;
pub mod target;
pub mod trace;
pub mod validate;

pub use config::GenConfig;
pub use driver::{generate, generate_to_dir, load_specs, write_output, GenerationOutput};
pub use error::{GenError, GenResult, SpecError, SpecErrorCode};
pub use ir::GeneratedFunction;
pub use schema::OperationSpec;
