//! JSON Model Definition
//!
//! This module provides a declarative way to describe an explicit ODE model
//! without building symbolic expressions by hand. A JSON document lists the
//! state, control and parameter names and gives the right-hand side as one
//! expression string per state. It is validated, turned into a
//! [`ModelDescriptor`](crate::model::ModelDescriptor) with the built-in
//! engine and passed through the regular generation pipeline.
//!
//! # Quick Start
//!
//! ```ignore
//! use odesens::json::generate_from_json;
//! use odesens::generator::GeneratorConfig;
//!
//! let json = r#"{
//!     "schema": "1.0",
//!     "name": "pendulum",
//!     "x": ["theta", "omega"],
//!     "u": ["tau"],
//!     "f_expl": ["omega", "-9.81 * sin(theta) + tau"]
//! }"#;
//!
//! let emitted = generate_from_json(json, &GeneratorConfig::new("build"))?;
//! for file in &emitted.files {
//!     println!("Generated: {}", file.display());
//! }
//! ```
//!
//! # JSON Schema
//!
//! | Field | Required | Description |
//! |-------|----------|-------------|
//! | `schema` | yes | Schema version (currently `"1.0"`) |
//! | `name` | yes | Model name, a C identifier |
//! | `representation` | no | `"SX"` (default) or `"MX"` |
//! | `description` | no | Free-form text |
//! | `x` | yes | State names |
//! | `u` | no | Control names |
//! | `p` | no | Parameter names, omit or `[]` for none |
//! | `f_expl` | yes | One expression per state |
//!
//! Expressions support `+ - * / ^`, parentheses, numeric literals, `pi`,
//! `pow(a, b)` and the functions `sin cos tan asin acos atan sinh cosh tanh
//! exp log sqrt`.
//!
//! # Error Handling
//!
//! ```ignore
//! match validate_json(json) {
//!     Ok(model) => println!("Valid model: {}", model.inner().name),
//!     Err(JsonModelError::LengthMismatch { expected, actual }) => {
//!         eprintln!("{} states but {} expressions", expected, actual);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

mod errors;
mod model;
mod validation;

pub use errors::JsonModelError;
pub use model::{JsonModel, SUPPORTED_SCHEMA_VERSIONS};
pub use validation::{ValidatedModel, Validator};

use crate::error::OdeGenError;
use crate::generator::{
    check_engine_version, generate_explicit_ode, EmittedModel, GeneratorConfig,
};
use crate::model::ModelDescriptor;
use crate::symbolic::{SxEngine, SymMatrix};

/// Parse a JSON string into a JsonModel
pub fn parse_json(json: &str) -> Result<JsonModel, JsonModelError> {
    JsonModel::from_str(json)
}

/// Parse and validate a JSON model
pub fn validate_json(json: &str) -> Result<ValidatedModel, JsonModelError> {
    let model = JsonModel::from_str(json)?;
    let validator = Validator::new();
    validator.validate(&model)
}

/// Parse, validate and convert a JSON model into a symbolic descriptor
pub fn descriptor_from_json(
    engine: &SxEngine,
    json: &str,
) -> Result<ModelDescriptor<SymMatrix>, OdeGenError> {
    let validated = validate_json(json)?;
    validated.inner().to_descriptor(engine)
}

/// Generate the sensitivity code of a JSON model with the built-in engine
pub fn generate_from_json(
    json: &str,
    config: &GeneratorConfig,
) -> Result<EmittedModel, OdeGenError> {
    let engine = SxEngine::new();
    check_engine_version(&engine, &config.allowed_engine_versions)?;
    let model = descriptor_from_json(&engine, json)?;
    generate_explicit_ode(&engine, &model, config)
}
