//! Model dimensions and symbolic representation
//!
//! Validates a [`ModelDescriptor`] before any derivative is built: derives
//! `nx`, `nu` and `np`, checks that the right-hand side uses one of the two
//! symbolic representations and normalises the parameter input.

use crate::error::OdeGenError;
use crate::model::{is_identifier, ModelDescriptor, ParameterInput};
use crate::symbolic::{Representation, SymbolicEngine};

/// Dimensions and representation of a validated model
#[derive(Debug, Clone)]
pub struct ResolvedModel<M> {
    pub nx: usize,
    pub nu: usize,
    pub np: usize,
    /// Representation of `f_expl`, used for every symbol created later on
    pub representation: Representation,
    /// Parameter vector, materialised as a zero-length symbol vector when the
    /// model has no parameters
    pub p: M,
}

/// Resolve dimensions and representation of `model`
pub fn resolve<E: SymbolicEngine>(
    engine: &E,
    model: &ModelDescriptor<E::Matrix>,
) -> Result<ResolvedModel<E::Matrix>, OdeGenError> {
    if !is_identifier(&model.name) {
        return Err(OdeGenError::InvalidModelName(model.name.clone()));
    }

    let nx = engine.size(&model.x).0;
    let nu = engine.size(&model.u).0;

    let representation = engine.representation(&model.f_expl).ok_or_else(|| {
        OdeGenError::UnsupportedExpressionType {
            found: engine.kind_name(&model.f_expl),
            accepted: Representation::ACCEPTED
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    })?;

    let (np, p) = match &model.p {
        ParameterInput::Symbolic(p) => (engine.size(p).0, p.clone()),
        ParameterInput::List(items) if items.is_empty() => {
            (0, engine.sym(representation, "p", 0, 0)?)
        }
        ParameterInput::List(items) => {
            return Err(OdeGenError::InvalidParameterSpec { len: items.len() })
        }
    };

    tracing::debug!(
        model = %model.name,
        nx,
        nu,
        np,
        representation = %representation,
        "resolved model dimensions"
    );

    Ok(ResolvedModel {
        nx,
        nu,
        np,
        representation,
        p,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::{MatrixKind, SxEngine, SymMatrix};
    use nalgebra::DMatrix;

    fn model(repr: Representation, p: ParameterInput<SymMatrix>) -> ModelDescriptor<SymMatrix> {
        let engine = SxEngine::new();
        let x = engine.sym(repr, "x", 2, 1).unwrap();
        let u = engine.sym(repr, "u", 1, 1).unwrap();
        let f = engine
            .parse_column(repr, &["x_1", "-sin(x_0) - u"], &[&x, &u])
            .unwrap();
        ModelDescriptor {
            name: "pendulum".to_string(),
            x,
            u,
            p,
            f_expl: f,
        }
    }

    #[test]
    fn test_dimensions() {
        let engine = SxEngine::new();
        let p = engine.sym(Representation::Sx, "p", 3, 1).unwrap();
        let resolved = resolve(&engine, &model(Representation::Sx, p.into())).unwrap();
        assert_eq!((resolved.nx, resolved.nu, resolved.np), (2, 1, 3));
        assert_eq!(resolved.representation, Representation::Sx);
    }

    #[test]
    fn test_empty_parameter_list() {
        let engine = SxEngine::new();
        let resolved = resolve(&engine, &model(Representation::Mx, ParameterInput::none())).unwrap();
        assert_eq!(resolved.np, 0);
        assert_eq!(resolved.p.size(), (0, 0));
        assert_eq!(resolved.p.kind(), MatrixKind::Mx);
    }

    #[test]
    fn test_non_empty_parameter_list() {
        let engine = SxEngine::new();
        let a = engine.sym(Representation::Sx, "a", 1, 1).unwrap();
        let b = engine.sym(Representation::Sx, "b", 1, 1).unwrap();
        let err = resolve(
            &engine,
            &model(Representation::Sx, ParameterInput::List(vec![a, b])),
        )
        .unwrap_err();
        assert!(matches!(err, OdeGenError::InvalidParameterSpec { len: 2 }));
    }

    #[test]
    fn test_numeric_rhs_is_unsupported() {
        let engine = SxEngine::new();
        let mut m = model(Representation::Sx, ParameterInput::none());
        m.f_expl = SymMatrix::from_dmatrix(&DMatrix::zeros(2, 1));
        match resolve(&engine, &m).unwrap_err() {
            OdeGenError::UnsupportedExpressionType { found, accepted } => {
                assert_eq!(found, "DM");
                assert_eq!(accepted, vec!["SX", "MX"]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_invalid_name() {
        let engine = SxEngine::new();
        let mut m = model(Representation::Sx, ParameterInput::none());
        m.name = "my model".to_string();
        assert!(matches!(
            resolve(&engine, &m),
            Err(OdeGenError::InvalidModelName(_))
        ));
    }
}
