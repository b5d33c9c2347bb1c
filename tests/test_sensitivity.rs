//! Numerical checks of the generated sensitivity functions
//!
//! The symbolic functions are evaluated with `Function::call` and compared
//! against hand-derived Jacobians and central finite differences.

use approx::assert_relative_eq;
use nalgebra::DMatrix;
use odesens::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn col(values: &[f64]) -> DMatrix<f64> {
    DMatrix::from_column_slice(values.len(), 1, values)
}

fn pendulum(repr: Representation) -> ModelDescriptor<SymMatrix> {
    let engine = SxEngine::new();
    let x = engine.sym(repr, "x", 2, 1).unwrap();
    let u = engine.sym(repr, "u", 1, 1).unwrap();
    let g = engine.sym(repr, "g", 1, 1).unwrap();
    let f = engine
        .parse_column(repr, &["x_1", "-g * sin(x_0) + u"], &[&x, &u, &g])
        .unwrap();
    ModelDescriptor::new("pendulum", x, u, g, f)
}

/// Two states, two controls, two parameters, every second derivative non-zero somewhere
fn coupled() -> ModelDescriptor<SymMatrix> {
    let engine = SxEngine::new();
    let repr = Representation::Sx;
    let x = engine.sym(repr, "x", 2, 1).unwrap();
    let u = engine.sym(repr, "u", 2, 1).unwrap();
    let p = engine.sym(repr, "p", 2, 1).unwrap();
    let f = engine
        .parse_column(
            repr,
            &[
                "x_0 * x_1 + p_0 * u_0^2 - exp(-x_0) * u_1",
                "sin(x_1 * u_1) + p_1 * x_0^2 * u_0",
            ],
            &[&x, &u, &p],
        )
        .unwrap();
    ModelDescriptor::new("coupled", x, u, p, f)
}

/// `lambda^T f` differentiated numerically with respect to `z = [x; u]`
fn adjoint_fd(
    fun: &Function,
    z: &[f64],
    nx: usize,
    p: &DMatrix<f64>,
    lambda: &DMatrix<f64>,
) -> DMatrix<f64> {
    let h = 1e-6;
    let value = |z: &[f64]| -> f64 {
        let out = fun
            .call(&[col(&z[..nx]), col(&z[nx..]), p.clone()])
            .unwrap();
        out[0].dot(lambda)
    };
    let mut grad = DMatrix::zeros(z.len(), 1);
    for j in 0..z.len() {
        let mut up = z.to_vec();
        let mut down = z.to_vec();
        up[j] += h;
        down[j] -= h;
        grad[j] = (value(&up) - value(&down)) / (2.0 * h);
    }
    grad
}

fn lower_triangle(m: &DMatrix<f64>) -> Vec<f64> {
    let n = m.nrows();
    let mut out = Vec::new();
    for j in 0..n {
        for i in j..n {
            out.push(m[(i, j)]);
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// Shapes
// ═══════════════════════════════════════════════════════════════════════════════

mod shapes {
    use super::*;

    #[test]
    fn test_function_signatures() {
        let engine = SxEngine::new();
        let fns = build_sensitivities(&engine, &pendulum(Representation::Sx)).unwrap();

        let names: Vec<_> = fns.iter().map(|(_, f)| f.name().to_string()).collect();
        assert_eq!(
            names,
            vec![
                "pendulum_expl_ode_fun",
                "pendulum_expl_vde_forw",
                "pendulum_expl_vde_adj",
                "pendulum_expl_ode_hess"
            ]
        );

        let sizes = |f: &Function| -> (Vec<(usize, usize)>, Vec<(usize, usize)>) {
            (
                f.inputs().iter().map(|m| m.size()).collect(),
                f.outputs().iter().map(|m| m.size()).collect(),
            )
        };
        assert_eq!(
            sizes(&fns.ode_fun),
            (vec![(2, 1), (1, 1), (1, 1)], vec![(2, 1)])
        );
        assert_eq!(
            sizes(&fns.vde_forw),
            (
                vec![(2, 1), (2, 2), (2, 1), (1, 1), (1, 1)],
                vec![(2, 1), (2, 2), (2, 1)]
            )
        );
        assert_eq!(
            sizes(&fns.vde_adj),
            (vec![(2, 1), (2, 1), (1, 1), (1, 1)], vec![(3, 1)])
        );
        assert_eq!(
            sizes(&fns.ode_hess),
            (
                vec![(2, 1), (2, 2), (2, 1), (2, 1), (1, 1), (1, 1)],
                vec![(3, 1), (6, 1)]
            )
        );
    }

    #[test]
    fn test_hessian_length() {
        let engine = SxEngine::new();
        let fns = build_sensitivities(&engine, &coupled()).unwrap();
        // nx + nu = 4
        assert_eq!(fns.ode_hess.outputs()[1].size(), (10, 1));
    }

    #[test]
    fn test_matrix_representation() {
        let engine = SxEngine::new();
        let fns = build_sensitivities(&engine, &pendulum(Representation::Mx)).unwrap();
        for (_, f) in fns.iter() {
            assert_eq!(f.kind(), odesens::symbolic::MatrixKind::Mx);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Values
// ═══════════════════════════════════════════════════════════════════════════════

mod values {
    use super::*;

    #[test]
    fn test_pendulum_forward_sensitivities() {
        let engine = SxEngine::new();
        let fns = build_sensitivities(&engine, &pendulum(Representation::Sx)).unwrap();

        let (x0, x1, u, g) = (0.4, -1.3, 0.7, 9.81);
        let sx = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let sp = col(&[0.5, -0.25]);
        let out = fns
            .vde_forw
            .call(&[col(&[x0, x1]), sx.clone(), sp.clone(), col(&[u]), col(&[g])])
            .unwrap();

        let jx = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, -g * f64::cos(x0), 0.0]);
        let ju = col(&[0.0, 1.0]);

        assert_relative_eq!(out[0][0], x1, epsilon = 1e-12);
        assert_relative_eq!(out[0][1], -g * f64::sin(x0) + u, epsilon = 1e-12);
        assert_relative_eq!(out[1], jx.clone() * sx, epsilon = 1e-12);
        assert_relative_eq!(out[2], ju + jx * sp, epsilon = 1e-12);
    }

    #[test]
    fn test_pendulum_adjoint() {
        let engine = SxEngine::new();
        let fns = build_sensitivities(&engine, &pendulum(Representation::Sx)).unwrap();

        let (x0, g) = (1.1, 9.81);
        let lambda = col(&[0.3, -2.0]);
        let out = fns
            .vde_adj
            .call(&[col(&[x0, 0.2]), lambda, col(&[0.0]), col(&[g])])
            .unwrap();

        assert_relative_eq!(
            out[0],
            col(&[-g * f64::cos(x0) * -2.0, 0.3, -2.0]),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_pendulum_hessian() {
        let engine = SxEngine::new();
        let fns = build_sensitivities(&engine, &pendulum(Representation::Sx)).unwrap();

        let (x0, g) = (0.9, 9.81);
        let lambda = col(&[0.0, 1.5]);
        let sx = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.5, 1.0]);
        let sp = col(&[2.0, -1.0]);
        let out = fns
            .ode_hess
            .call(&[
                col(&[x0, 0.0]),
                sx.clone(),
                sp.clone(),
                lambda,
                col(&[0.0]),
                col(&[g]),
            ])
            .unwrap();

        // only d2/dx0^2 of lambda^T f is non-zero
        let mut h = DMatrix::zeros(3, 3);
        h[(0, 0)] = g * f64::sin(x0) * 1.5;
        let mut s = DMatrix::zeros(3, 3);
        s.view_mut((0, 0), (2, 2)).copy_from(&sx);
        s.view_mut((0, 2), (2, 1)).copy_from(&sp);
        s[(2, 2)] = 1.0;
        let expected = s.transpose() * h * s;

        let flat: Vec<f64> = out[1].iter().copied().collect();
        let want = lower_triangle(&expected);
        assert_eq!(flat.len(), want.len());
        for (a, b) in flat.iter().zip(&want) {
            assert_relative_eq!(*a, *b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_adjoint_output_of_hessian_function() {
        let engine = SxEngine::new();
        let fns = build_sensitivities(&engine, &coupled()).unwrap();

        let x = col(&[0.3, -0.8]);
        let u = col(&[1.2, 0.4]);
        let p = col(&[0.7, -1.1]);
        let lambda = col(&[1.0, 2.0]);
        let adj = fns
            .vde_adj
            .call(&[x.clone(), lambda.clone(), u.clone(), p.clone()])
            .unwrap();
        let hess = fns
            .ode_hess
            .call(&[
                x,
                DMatrix::identity(2, 2),
                DMatrix::zeros(2, 2),
                lambda,
                u,
                p,
            ])
            .unwrap();
        assert_relative_eq!(adj[0], hess[0], epsilon = 1e-14);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Finite differences
// ═══════════════════════════════════════════════════════════════════════════════

mod finite_differences {
    use super::*;

    #[test]
    fn test_adjoint_matches_finite_differences() {
        let engine = SxEngine::new();
        let fns = build_sensitivities(&engine, &coupled()).unwrap();
        let mut rng = StdRng::seed_from_u64(17);

        for _ in 0..5 {
            let z: Vec<f64> = (0..4).map(|_| rng.random_range(-1.0..1.0)).collect();
            let p = col(&[rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)]);
            let lambda = col(&[rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)]);

            let adj = fns
                .vde_adj
                .call(&[col(&z[..2]), lambda.clone(), col(&z[2..]), p.clone()])
                .unwrap();
            let fd = adjoint_fd(&fns.ode_fun, &z, 2, &p, &lambda);
            assert_relative_eq!(adj[0], fd, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_hessian_matches_finite_differences() {
        let engine = SxEngine::new();
        let fns = build_sensitivities(&engine, &coupled()).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let h = 1e-5;

        for _ in 0..3 {
            let z: Vec<f64> = (0..4).map(|_| rng.random_range(-1.0..1.0)).collect();
            let p = col(&[rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)]);
            let lambda = col(&[rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)]);
            let sx = DMatrix::from_fn(2, 2, |_, _| rng.random_range(-1.0..1.0));
            let sp = DMatrix::from_fn(2, 2, |_, _| rng.random_range(-1.0..1.0));

            // full Hessian of lambda^T f by differencing the exact adjoint
            let adj = |z: &[f64]| -> DMatrix<f64> {
                fns.vde_adj
                    .call(&[col(&z[..2]), lambda.clone(), col(&z[2..]), p.clone()])
                    .unwrap()
                    .remove(0)
            };
            let mut full = DMatrix::zeros(4, 4);
            for j in 0..4 {
                let mut up = z.clone();
                let mut down = z.clone();
                up[j] += h;
                down[j] -= h;
                let diff = (adj(&up) - adj(&down)) / (2.0 * h);
                for i in 0..4 {
                    full[(i, j)] = diff[i];
                }
            }

            let mut s = DMatrix::zeros(4, 4);
            s.view_mut((0, 0), (2, 2)).copy_from(&sx);
            s.view_mut((0, 2), (2, 2)).copy_from(&sp);
            s[(2, 2)] = 1.0;
            s[(3, 3)] = 1.0;
            let expected = s.transpose() * &full * &s;

            let out = fns
                .ode_hess
                .call(&[
                    col(&z[..2]),
                    sx.clone(),
                    sp.clone(),
                    lambda.clone(),
                    col(&z[2..]),
                    p.clone(),
                ])
                .unwrap();
            let flat: Vec<f64> = out[1].iter().copied().collect();
            for (a, b) in flat.iter().zip(lower_triangle(&expected)) {
                assert_relative_eq!(*a, b, epsilon = 1e-5, max_relative = 1e-5);
            }
        }
    }
}
