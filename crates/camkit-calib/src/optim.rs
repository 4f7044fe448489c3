use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn};

/// A nonlinear least-squares problem described by its residual function.
///
/// The Jacobian is evaluated numerically; calibration problems are small
/// enough that central differences are accurate and cheap.
pub(crate) trait ResidualFn {
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64>;
}

/// Options forwarded to the Levenberg-Marquardt driver.
#[derive(Debug, Clone, Copy)]
pub struct SolveOptions {
    /// Relative reduction tolerance on the cost.
    pub ftol: f64,
    /// Orthogonality tolerance on the gradient.
    pub gtol: f64,
    /// Maximum number of solver iterations.
    pub max_iters: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            ftol: 1e-12,
            gtol: 1e-12,
            max_iters: 100,
        }
    }
}

struct NumericProblem<'a, P: ResidualFn> {
    inner: &'a P,
    params: DVector<f64>,
}

impl<P: ResidualFn> LeastSquaresProblem<f64, Dyn, Dyn> for NumericProblem<'_, P> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        Some(self.inner.residuals(&self.params))
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let m = self.inner.residuals(&self.params).len();
        let n = self.params.len();
        let mut jac = DMatrix::<f64>::zeros(m, n);

        for j in 0..n {
            let step = 1e-6 * self.params[j].abs().max(1.0);

            let mut plus = self.params.clone();
            plus[j] += step;
            let mut minus = self.params.clone();
            minus[j] -= step;

            let col = (self.inner.residuals(&plus) - self.inner.residuals(&minus))
                / (2.0 * step);
            jac.set_column(j, &col);
        }

        Some(jac)
    }
}

/// Run the Levenberg-Marquardt solver over a residual function.
///
/// Returns the refined parameters and whether the termination reason counts
/// as a successful convergence.
pub(crate) fn solve_lm<P: ResidualFn>(
    problem: &P,
    x0: DVector<f64>,
    opts: &SolveOptions,
) -> (DVector<f64>, bool) {
    let lm = LevenbergMarquardt::new()
        .with_ftol(opts.ftol)
        .with_xtol(opts.ftol)
        .with_gtol(opts.gtol)
        .with_patience(opts.max_iters.max(1));

    let wrapper = NumericProblem {
        inner: problem,
        params: x0,
    };

    let (wrapper, report) = lm.minimize(wrapper);
    (wrapper.params(), report.termination.was_successful())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Quadratic bowl: residual r_i = x_i - target_i.
    struct Bowl {
        target: DVector<f64>,
    }

    impl ResidualFn for Bowl {
        fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
            params - &self.target
        }
    }

    #[test]
    fn converges_on_quadratic() {
        let problem = Bowl {
            target: DVector::from_vec(vec![1.0, -2.0, 3.5]),
        };
        let x0 = DVector::from_vec(vec![0.0, 0.0, 0.0]);
        let (x, ok) = solve_lm(&problem, x0, &SolveOptions::default());
        assert!(ok);
        assert!((x[0] - 1.0).abs() < 1e-9);
        assert!((x[1] + 2.0).abs() < 1e-9);
        assert!((x[2] - 3.5).abs() < 1e-9);
    }
}
