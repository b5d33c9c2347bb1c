//! Validation for JSON models

use std::collections::HashSet;

use crate::json::errors::JsonModelError;
use crate::json::model::JsonModel;
use crate::model::is_identifier;

/// A validated JSON model
///
/// This wrapper type guarantees that the contained model has passed
/// all validation checks and is ready for code generation.
#[derive(Debug, Clone)]
pub struct ValidatedModel(JsonModel);

impl ValidatedModel {
    /// Get the inner JsonModel
    pub fn inner(&self) -> &JsonModel {
        &self.0
    }

    /// Consume the wrapper and return the inner JsonModel
    pub fn into_inner(self) -> JsonModel {
        self.0
    }
}

/// Validator for JSON models
pub struct Validator {
    /// Also reject models whose controls and parameters are all unused
    strict: bool,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Create a new validator
    pub fn new() -> Self {
        Self { strict: false }
    }

    /// Create a strict validator that rejects declared but unused symbols
    pub fn strict() -> Self {
        Self { strict: true }
    }

    /// Validate a JSON model
    pub fn validate(&self, model: &JsonModel) -> Result<ValidatedModel, JsonModelError> {
        // 1. Model name
        if !is_identifier(&model.name) {
            return Err(JsonModelError::InvalidName(model.name.clone()));
        }

        // 2. Symbol declarations
        self.validate_symbols(model)?;

        // 3. Right-hand side
        self.validate_rhs(model)?;

        // 4. Unused symbols
        if self.strict {
            self.validate_usage(model)?;
        }

        Ok(ValidatedModel(model.clone()))
    }

    fn validate_symbols(&self, model: &JsonModel) -> Result<(), JsonModelError> {
        if model.x.is_empty() {
            return Err(JsonModelError::MissingStates);
        }

        let mut seen = HashSet::new();
        for (field, name) in model.symbol_names() {
            if !is_identifier(name) {
                return Err(JsonModelError::invalid_symbol(name, field));
            }
            if !seen.insert(name) {
                return Err(JsonModelError::DuplicateSymbol {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn validate_rhs(&self, model: &JsonModel) -> Result<(), JsonModelError> {
        if model.f_expl.len() != model.x.len() {
            return Err(JsonModelError::LengthMismatch {
                expected: model.x.len(),
                actual: model.f_expl.len(),
            });
        }
        for (i, expr) in model.f_expl.iter().enumerate() {
            if expr.trim().is_empty() {
                return Err(JsonModelError::EmptyExpression {
                    context: format!("f_expl[{}]", i),
                });
            }
        }
        Ok(())
    }

    /// Every control and parameter must occur as a whole word in some expression
    fn validate_usage(&self, model: &JsonModel) -> Result<(), JsonModelError> {
        let words: HashSet<&str> = model
            .f_expl
            .iter()
            .flat_map(|e| e.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_')))
            .filter(|w| !w.is_empty())
            .collect();

        for (field, name) in model.symbol_names().filter(|(f, _)| *f != "x") {
            if !words.contains(name) {
                return Err(JsonModelError::UnusedSymbol {
                    name: name.to_string(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_model() {
        let json = r#"{
            "schema": "1.0",
            "name": "pendulum",
            "x": ["theta", "omega"],
            "u": ["tau"],
            "p": [],
            "f_expl": ["omega", "-sin(theta) + tau"]
        }"#;

        let model = JsonModel::from_str(json).unwrap();
        let result = Validator::new().validate(&model);
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_invalid_name() {
        let json = r#"{
            "schema": "1.0",
            "name": "2nd-model",
            "x": ["a"],
            "f_expl": ["-a"]
        }"#;

        let model = JsonModel::from_str(json).unwrap();
        assert!(matches!(
            Validator::new().validate(&model),
            Err(JsonModelError::InvalidName(name)) if name == "2nd-model"
        ));
    }

    #[test]
    fn test_validate_duplicate_symbol() {
        let json = r#"{
            "schema": "1.0",
            "name": "test",
            "x": ["a", "b"],
            "u": ["a"],
            "f_expl": ["b", "a"]
        }"#;

        let model = JsonModel::from_str(json).unwrap();
        assert!(matches!(
            Validator::new().validate(&model),
            Err(JsonModelError::DuplicateSymbol { name }) if name == "a"
        ));
    }

    #[test]
    fn test_validate_invalid_symbol() {
        let json = r#"{
            "schema": "1.0",
            "name": "test",
            "x": ["a"],
            "p": ["k 1"],
            "f_expl": ["-a"]
        }"#;

        let model = JsonModel::from_str(json).unwrap();
        assert!(matches!(
            Validator::new().validate(&model),
            Err(JsonModelError::InvalidSymbolName { field, .. }) if field == "p"
        ));
    }

    #[test]
    fn test_validate_length_mismatch() {
        let json = r#"{
            "schema": "1.0",
            "name": "test",
            "x": ["a", "b"],
            "f_expl": ["b"]
        }"#;

        let model = JsonModel::from_str(json).unwrap();
        assert!(matches!(
            Validator::new().validate(&model),
            Err(JsonModelError::LengthMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_validate_empty_expression() {
        let json = r#"{
            "schema": "1.0",
            "name": "test",
            "x": ["a", "b"],
            "f_expl": ["b", "  "]
        }"#;

        let model = JsonModel::from_str(json).unwrap();
        assert!(matches!(
            Validator::new().validate(&model),
            Err(JsonModelError::EmptyExpression { context }) if context == "f_expl[1]"
        ));
    }

    #[test]
    fn test_validate_no_states() {
        let json = r#"{
            "schema": "1.0",
            "name": "test",
            "x": [],
            "f_expl": []
        }"#;

        let model = JsonModel::from_str(json).unwrap();
        assert!(matches!(
            Validator::new().validate(&model),
            Err(JsonModelError::MissingStates)
        ));
    }

    #[test]
    fn test_strict_rejects_unused_parameter() {
        let json = r#"{
            "schema": "1.0",
            "name": "test",
            "x": ["a"],
            "p": ["k", "ka"],
            "f_expl": ["-ka * a"]
        }"#;

        let model = JsonModel::from_str(json).unwrap();
        assert!(Validator::new().validate(&model).is_ok());
        assert!(matches!(
            Validator::strict().validate(&model),
            Err(JsonModelError::UnusedSymbol { name, .. }) if name == "k"
        ));
    }
}
