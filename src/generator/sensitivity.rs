//! Sensitivity functions of an explicit ODE
//!
//! For `dx/dt = f(x, u, p)` four functions are derived:
//!
//! | Function | Inputs | Outputs |
//! |----------|--------|---------|
//! | `<name>_expl_ode_fun` | `x, u, p` | `f` |
//! | `<name>_expl_vde_forw` | `x, Sx, Sp, u, p` | `f, J_x Sx, J_u + J_x Sp` |
//! | `<name>_expl_vde_adj` | `x, lambdaX, u, p` | `[J_x J_u]^T lambdaX` |
//! | `<name>_expl_ode_hess` | `x, Sx, Sp, lambdaX, u, p` | adjoint, lower triangle of the projected Hessian |
//!
//! The Hessian is computed forward-over-adjoint: the adjoint expression is
//! differentiated once more in forward mode along the columns of
//! `S_forw = [[Sx, Sp], [0, I]]` and projected with `S_forw^T`, so the full
//! `(nx+nu) x (nx+nu)` Hessian of `lambdaX^T f` is never formed on its own.

use std::fmt;

use crate::error::OdeGenError;
use crate::generator::resolve::ResolvedModel;
use crate::model::ModelDescriptor;
use crate::symbolic::{AdMode, SymbolicEngine};

/// The four generated functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    OdeFun,
    VdeForw,
    VdeAdj,
    OdeHess,
}

impl FunctionKind {
    /// Emission order
    pub const ALL: [FunctionKind; 4] = [
        FunctionKind::OdeFun,
        FunctionKind::VdeForw,
        FunctionKind::VdeAdj,
        FunctionKind::OdeHess,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            Self::OdeFun => "expl_ode_fun",
            Self::VdeForw => "expl_vde_forw",
            Self::VdeAdj => "expl_vde_adj",
            Self::OdeHess => "expl_ode_hess",
        }
    }

    /// External name of the function for `model_name`
    pub fn function_name(&self, model_name: &str) -> String {
        format!("{}_{}", model_name, self.suffix())
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// Value, forward, adjoint and Hessian functions of one model
#[derive(Debug, Clone)]
pub struct SensitivityFunctions<F> {
    pub ode_fun: F,
    pub vde_forw: F,
    pub vde_adj: F,
    pub ode_hess: F,
}

impl<F> SensitivityFunctions<F> {
    pub fn get(&self, kind: FunctionKind) -> &F {
        match kind {
            FunctionKind::OdeFun => &self.ode_fun,
            FunctionKind::VdeForw => &self.vde_forw,
            FunctionKind::VdeAdj => &self.vde_adj,
            FunctionKind::OdeHess => &self.ode_hess,
        }
    }

    /// The functions in emission order: value, forward, adjoint, Hessian
    pub fn iter(&self) -> impl Iterator<Item = (FunctionKind, &F)> {
        FunctionKind::ALL.into_iter().map(move |k| (k, self.get(k)))
    }
}

/// Stack the lower triangle (diagonal included) of a square matrix into a column
///
/// Entries are taken column by column: for `j = 0..n` and `i = j..n` the
/// element `(i, j)` is appended. Consumers index the result by position.
pub fn lower_triangle_column_major<E: SymbolicEngine>(
    engine: &E,
    m: &E::Matrix,
) -> Result<E::Matrix, OdeGenError> {
    let (n, _) = engine.size(m);
    let mut entries = Vec::with_capacity(n * (n + 1) / 2);
    for j in 0..n {
        for i in j..n {
            entries.push(engine.element(m, i, j)?);
        }
    }
    let refs: Vec<&E::Matrix> = entries.iter().collect();
    Ok(engine.vertcat(&refs)?)
}

/// Builds the sensitivity functions of a resolved model
pub struct SensitivityBuilder<'a, E: SymbolicEngine> {
    engine: &'a E,
    model: &'a ModelDescriptor<E::Matrix>,
    resolved: &'a ResolvedModel<E::Matrix>,
}

impl<'a, E: SymbolicEngine> SensitivityBuilder<'a, E> {
    pub fn new(
        engine: &'a E,
        model: &'a ModelDescriptor<E::Matrix>,
        resolved: &'a ResolvedModel<E::Matrix>,
    ) -> Self {
        Self {
            engine,
            model,
            resolved,
        }
    }

    fn name(&self, kind: FunctionKind) -> String {
        kind.function_name(&self.model.name)
    }

    /// Build all four functions
    pub fn build(&self) -> Result<SensitivityFunctions<E::Function>, OdeGenError> {
        let engine = self.engine;
        let repr = self.resolved.representation;
        let (nx, nu) = (self.resolved.nx, self.resolved.nu);
        let x = &self.model.x;
        let u = &self.model.u;
        let p = &self.resolved.p;
        let f_expl = &self.model.f_expl;

        let sx = engine.sym(repr, "Sx", nx, nx)?;
        let sp = engine.sym(repr, "Sp", nx, nu)?;
        let lambda_x = engine.sym(repr, "lambdaX", nx, 1)?;

        let ode_fun = engine.function(&self.name(FunctionKind::OdeFun), &[x, u, p], &[f_expl])?;
        tracing::debug!(function = %self.name(FunctionKind::OdeFun), "built value function");

        // Adding explicit zeros keeps the sensitivities dense even if the
        // engine returns structurally sparse derivatives.
        let vde_x = engine.add(
            &engine.zeros(repr, nx, nx),
            &engine.jtimes(f_expl, x, &sx, AdMode::Forward)?,
        )?;
        let vde_p = engine.add(
            &engine.add(&engine.zeros(repr, nx, nu), &engine.jacobian(f_expl, u)?)?,
            &engine.jtimes(f_expl, x, &sp, AdMode::Forward)?,
        )?;
        let vde_forw = engine.function(
            &self.name(FunctionKind::VdeForw),
            &[x, &sx, &sp, u, p],
            &[f_expl, &vde_x, &vde_p],
        )?;
        tracing::debug!(function = %self.name(FunctionKind::VdeForw), "built forward sensitivities");

        let xu = engine.vertcat(&[x, u])?;
        let adj = engine.jtimes(f_expl, &xu, &lambda_x, AdMode::Reverse)?;
        let vde_adj = engine.function(
            &self.name(FunctionKind::VdeAdj),
            &[x, &lambda_x, u, p],
            &[&adj],
        )?;
        tracing::debug!(function = %self.name(FunctionKind::VdeAdj), "built adjoint sensitivities");

        let s_forw = engine.vertcat(&[
            &engine.horzcat(&[&sx, &sp])?,
            &engine.horzcat(&[&engine.zeros(repr, nu, nx), &engine.eye(repr, nu)])?,
        ])?;
        let hess = engine.mtimes(
            &engine.transpose(&s_forw),
            &engine.jtimes(&adj, &xu, &s_forw, AdMode::Forward)?,
        )?;
        let hess_flat = if nx + nu == 0 {
            engine.zeros(repr, 0, 1)
        } else {
            lower_triangle_column_major(engine, &hess)?
        };
        let ode_hess = engine.function(
            &self.name(FunctionKind::OdeHess),
            &[x, &sx, &sp, &lambda_x, u, p],
            &[&adj, &hess_flat],
        )?;
        tracing::debug!(function = %self.name(FunctionKind::OdeHess), "built Hessian sensitivities");

        Ok(SensitivityFunctions {
            ode_fun,
            vde_forw,
            vde_adj,
            ode_hess,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::resolve::resolve;
    use crate::model::ParameterInput;
    use crate::symbolic::{MatrixKind, Representation, SxEngine, SymMatrix};
    use nalgebra::DMatrix;

    #[test]
    fn test_function_names() {
        assert_eq!(
            FunctionKind::VdeAdj.function_name("crane"),
            "crane_expl_vde_adj"
        );
        let names: Vec<_> = FunctionKind::ALL.iter().map(|k| k.suffix()).collect();
        assert_eq!(
            names,
            vec!["expl_ode_fun", "expl_vde_forw", "expl_vde_adj", "expl_ode_hess"]
        );
    }

    #[test]
    fn test_lower_triangle_order() {
        // symmetric with distinct entries per position in the lower triangle
        let h = SymMatrix::from_dmatrix(&DMatrix::from_row_slice(
            3,
            3,
            &[11.0, 21.0, 31.0, 21.0, 22.0, 32.0, 31.0, 32.0, 33.0],
        ));
        let engine = SxEngine::new();
        let flat = lower_triangle_column_major(&engine, &h).unwrap();
        let values: Vec<f64> = flat
            .elements()
            .iter()
            .map(|e| e.as_constant().unwrap())
            .collect();
        assert_eq!(values, vec![11.0, 21.0, 31.0, 22.0, 32.0, 33.0]);
    }

    #[test]
    fn test_lower_triangle_of_empty_matrix() {
        let engine = SxEngine::new();
        let h = engine.zeros(Representation::Sx, 0, 0);
        let flat = lower_triangle_column_major(&engine, &h).unwrap();
        assert!(flat.is_empty());
    }

    #[test]
    fn test_empty_model_keeps_representation() {
        let engine = SxEngine::new();
        let repr = Representation::Mx;
        let model = ModelDescriptor::new(
            "empty",
            engine.sym(repr, "x", 0, 0).unwrap(),
            engine.sym(repr, "u", 0, 0).unwrap(),
            ParameterInput::none(),
            engine.zeros(repr, 0, 1),
        );
        let resolved = resolve(&engine, &model).unwrap();
        let fns = SensitivityBuilder::new(&engine, &model, &resolved)
            .build()
            .unwrap();

        let hess_flat = &fns.ode_hess.outputs()[1];
        assert_eq!(hess_flat.size(), (0, 1));
        assert_eq!(hess_flat.kind(), MatrixKind::Mx);
    }

    #[test]
    fn test_iteration_order() {
        let fns = SensitivityFunctions {
            ode_fun: 0,
            vde_forw: 1,
            vde_adj: 2,
            ode_hess: 3,
        };
        let order: Vec<i32> = fns.iter().map(|(_, f)| *f).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }
}
