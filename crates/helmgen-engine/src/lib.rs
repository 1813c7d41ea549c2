//! helmgen-engine: value loading and template rendering
//!
//! This crate provides the template renderer used by the `template`
//! generator:
//! - `Values`: format-dispatched value loading (TOML/YAML/JSON) with
//!   deep merge, normalized into one tree shape
//! - `Template`: a compiled template document
//! - `Engine`: the compile-and-render facade with an open function
//!   library (`default`, `b64enc`, `randAlphaNum`, ...)
//! - location-aware compile and eval diagnostics

pub mod ast;
pub mod engine;
pub mod error;
mod eval;
pub mod functions;
pub mod parser;
pub mod template;
pub mod values;

pub use engine::Engine;
pub use error::{EngineError, EvalErrorKind, TemplateCompileError, TemplateEvalError};
pub use functions::{FunctionError, FunctionRegistry, FunctionResult};
pub use template::Template;
pub use values::Values;
