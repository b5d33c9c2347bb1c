//! Sensitivity code generation pipeline
//!
//! [`generate_explicit_ode`] runs the stages in order:
//!
//! 1. engine version gate ([`check_engine_version`])
//! 2. dimension and representation resolution ([`resolve::resolve`])
//! 3. construction of the value, forward, adjoint and Hessian functions
//!    ([`sensitivity::SensitivityBuilder`])
//! 4. C code emission ([`emit::emit`])
//!
//! # Example
//!
//! ```ignore
//! use odesens::prelude::*;
//!
//! let engine = SxEngine::new();
//! let x = engine.sym(Representation::Sx, "x", 2, 1)?;
//! let u = engine.sym(Representation::Sx, "u", 1, 1)?;
//! let f = engine.parse_column(Representation::Sx, &["x_1", "-sin(x_0) + u"], &[&x, &u])?;
//! let model = ModelDescriptor::new("pendulum", x, u, ParameterInput::none(), f);
//!
//! let emitted = generate_explicit_ode(&engine, &model, &GeneratorConfig::default())?;
//! assert_eq!(emitted.files.len(), 4);
//! ```

pub mod emit;
pub mod resolve;
pub mod sensitivity;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::OdeGenError;
use crate::model::ModelDescriptor;
use crate::symbolic::{CodegenOptions, SymbolicEngine};

pub use emit::{EmittedModel, OutputLayout, GENERATED_CODE_DIR};
pub use resolve::{resolve, ResolvedModel};
pub use sensitivity::{
    lower_triangle_column_major, FunctionKind, SensitivityBuilder, SensitivityFunctions,
};

/// Engine versions the generated code is known to work with
pub const ALLOWED_ENGINE_VERSIONS: &[&str] = &["1.0.0"];

fn default_output_base() -> PathBuf {
    PathBuf::from(".")
}

fn default_allowed_versions() -> Vec<String> {
    ALLOWED_ENGINE_VERSIONS
        .iter()
        .map(|v| v.to_string())
        .collect()
}

/// Configuration of a generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Directory below which `c_generated_code` is created
    pub output_base: PathBuf,
    pub codegen: CodegenOptions,
    /// Accepted values of [`SymbolicEngine::version`]
    pub allowed_engine_versions: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_base: default_output_base(),
            codegen: CodegenOptions::default(),
            allowed_engine_versions: default_allowed_versions(),
        }
    }
}

impl GeneratorConfig {
    pub fn new(output_base: impl Into<PathBuf>) -> Self {
        Self {
            output_base: output_base.into(),
            ..Default::default()
        }
    }

    /// Parse a configuration from JSON, missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(&self.output_base)
    }
}

/// Reject engines whose version is not in `allowed`
pub fn check_engine_version<E: SymbolicEngine>(
    engine: &E,
    allowed: &[String],
) -> Result<(), OdeGenError> {
    let detected = engine.version();
    if allowed.iter().any(|v| v == detected) {
        return Ok(());
    }
    tracing::warn!(detected, allowed = ?allowed, "incompatible symbolic engine version");
    Err(OdeGenError::IncompatibleEngineVersion {
        detected: detected.to_string(),
        allowed: allowed.to_vec(),
    })
}

/// Resolve `model` and build its sensitivity functions without touching the filesystem
pub fn build_sensitivities<E: SymbolicEngine>(
    engine: &E,
    model: &ModelDescriptor<E::Matrix>,
) -> Result<SensitivityFunctions<E::Function>, OdeGenError> {
    let resolved = resolve(engine, model)?;
    SensitivityBuilder::new(engine, model, &resolved).build()
}

/// Generate the C code of the explicit ODE `model` and its sensitivities
pub fn generate_explicit_ode<E: SymbolicEngine>(
    engine: &E,
    model: &ModelDescriptor<E::Matrix>,
    config: &GeneratorConfig,
) -> Result<EmittedModel, OdeGenError> {
    check_engine_version(engine, &config.allowed_engine_versions)?;
    let functions = build_sensitivities(engine, model)?;
    emit::emit(engine, &model.name, &functions, &config.layout(), &config.codegen)
}
