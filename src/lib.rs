//! Sensitivity code generation for explicit ODE models
//!
//! Given `dx/dt = f(x, u, p)` in symbolic form, this crate derives the value
//! function, the forward variational equations, the adjoint sensitivities and
//! the adjoint-projected Hessian, and writes each of them as a C translation
//! unit usable by a numerical optimal control solver.
//!
//! # Example
//!
//! ```ignore
//! use odesens::prelude::*;
//!
//! let engine = SxEngine::new();
//! let x = engine.sym(Representation::Sx, "x", 2, 1)?;
//! let u = engine.sym(Representation::Sx, "u", 1, 1)?;
//! let p = engine.sym(Representation::Sx, "g", 1, 1)?;
//! let f = engine.parse_column(
//!     Representation::Sx,
//!     &["x_1", "-g * sin(x_0) + u"],
//!     &[&x, &u, &p],
//! )?;
//!
//! let model = ModelDescriptor::new("pendulum", x, u, p, f);
//! let emitted = generate_explicit_ode(&engine, &model, &GeneratorConfig::new("build"))?;
//! ```

pub mod error;
pub mod generator;
pub mod json;
pub mod model;
pub mod symbolic;

pub use error::OdeGenError;
pub use generator::{
    build_sensitivities, generate_explicit_ode, EmittedModel, GeneratorConfig,
    SensitivityFunctions,
};
pub use model::{ModelDescriptor, ParameterInput};
pub use symbolic::{Representation, SxEngine, SymbolicEngine};

pub mod prelude {
    pub use crate::error::OdeGenError;
    pub use crate::generator::{
        build_sensitivities, check_engine_version, generate_explicit_ode, EmittedModel,
        FunctionKind, GeneratorConfig, OutputLayout, SensitivityFunctions,
        ALLOWED_ENGINE_VERSIONS,
    };
    pub use crate::json::{generate_from_json, JsonModel, Validator};
    pub use crate::model::{ModelDescriptor, ParameterInput};
    pub use crate::symbolic::{
        AdMode, CodegenOptions, Function, Representation, SxEngine, SymMatrix, SymbolicEngine,
    };
    pub use nalgebra::{dmatrix, DMatrix};
}
