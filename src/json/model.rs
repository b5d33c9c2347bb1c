//! Main JSON Model struct

use serde::{Deserialize, Serialize};

use crate::error::OdeGenError;
use crate::json::errors::JsonModelError;
use crate::model::{ModelDescriptor, ParameterInput};
use crate::symbolic::parser::parse_expression;
use crate::symbolic::{Representation, SxEngine, SymMatrix};

/// Supported schema versions
pub const SUPPORTED_SCHEMA_VERSIONS: &[&str] = &["1.0"];

fn default_representation() -> String {
    Representation::Sx.name().to_string()
}

/// An explicit ODE model defined in JSON
///
/// States, controls and parameters are lists of symbol names. Each entry of
/// `f_expl` is the right-hand side of the state with the same index.
///
/// # Example
///
/// ```ignore
/// use odesens::json::JsonModel;
///
/// let json = r#"{
///     "schema": "1.0",
///     "name": "pendulum",
///     "x": ["theta", "omega"],
///     "u": ["tau"],
///     "p": ["g"],
///     "f_expl": ["omega", "-g * sin(theta) + tau"]
/// }"#;
///
/// let model = JsonModel::from_str(json)?;
/// assert_eq!(model.nx(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JsonModel {
    /// Schema version (e.g., "1.0")
    pub schema: String,

    /// Model name, prefix of every generated function
    pub name: String,

    /// Symbolic representation, `"SX"` or `"MX"`
    #[serde(default = "default_representation")]
    pub representation: String,

    /// Free-form description, ignored by the generator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// State names
    pub x: Vec<String>,

    /// Control names
    #[serde(default)]
    pub u: Vec<String>,

    /// Parameter names, absent or empty for a model without parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<Vec<String>>,

    /// Right-hand side expressions, one per state
    pub f_expl: Vec<String>,
}

impl JsonModel {
    /// Parse a JSON string into a JsonModel
    pub fn from_str(json: &str) -> Result<Self, JsonModelError> {
        let model: Self = serde_json::from_str(json)?;
        model.check_schema_version()?;
        Ok(model)
    }

    /// Parse from a JSON Value
    pub fn from_value(value: serde_json::Value) -> Result<Self, JsonModelError> {
        let model: Self = serde_json::from_value(value)?;
        model.check_schema_version()?;
        Ok(model)
    }

    /// Serialize to a JSON string
    pub fn to_json(&self) -> Result<String, JsonModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn check_schema_version(&self) -> Result<(), JsonModelError> {
        if !SUPPORTED_SCHEMA_VERSIONS.contains(&self.schema.as_str()) {
            return Err(JsonModelError::UnsupportedSchema {
                version: self.schema.clone(),
                supported: SUPPORTED_SCHEMA_VERSIONS.join(", "),
            });
        }
        Ok(())
    }

    pub fn nx(&self) -> usize {
        self.x.len()
    }

    pub fn nu(&self) -> usize {
        self.u.len()
    }

    pub fn np(&self) -> usize {
        self.p.as_ref().map_or(0, Vec::len)
    }

    /// All declared symbol names with the field they belong to, in declaration order
    pub fn symbol_names(&self) -> impl Iterator<Item = (&'static str, &str)> {
        let x = self.x.iter().map(|n| ("x", n.as_str()));
        let u = self.u.iter().map(|n| ("u", n.as_str()));
        let p = self.p.iter().flatten().map(|n| ("p", n.as_str()));
        x.chain(u).chain(p)
    }

    /// Build the symbolic model descriptor with `engine`
    ///
    /// The representation name is checked here rather than during
    /// validation, so an unknown name is reported the same way as an
    /// unsupported right-hand side type.
    pub fn to_descriptor(
        &self,
        engine: &SxEngine,
    ) -> Result<ModelDescriptor<SymMatrix>, OdeGenError> {
        let repr = Representation::from_name(&self.representation).ok_or_else(|| {
            OdeGenError::UnsupportedExpressionType {
                found: self.representation.clone(),
                accepted: Representation::ACCEPTED
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }
        })?;

        let x = engine.named_symbols(repr, &self.x);
        let u = engine.named_symbols(repr, &self.u);
        let (p, p_input) = match &self.p {
            Some(names) if !names.is_empty() => {
                let p = engine.named_symbols(repr, names);
                (Some(p.clone()), ParameterInput::Symbolic(p))
            }
            _ => (None, ParameterInput::none()),
        };

        let mut vars = vec![&x, &u];
        vars.extend(p.as_ref());
        let table = SxEngine::symbol_table(&vars);

        let rows = self
            .f_expl
            .iter()
            .enumerate()
            .map(|(i, e)| {
                parse_expression(e, &table)
                    .map_err(|err| JsonModelError::invalid_expr(format!("f_expl[{}]", i), err))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let f_expl = SymMatrix::column(repr.into(), rows);

        Ok(ModelDescriptor::new(self.name.clone(), x, u, p_input, f_expl))
    }
}
