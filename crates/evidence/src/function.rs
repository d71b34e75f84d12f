use crate::FunctionError;

/// The shape of a membership function over its interval.
#[derive(Debug, Clone, PartialEq)]
pub enum Curve {
    /// The same mass everywhere in the interval.
    Constant { value: f64 },
    /// `slope * x + intercept`
    Linear { slope: f64, intercept: f64 },
    /// `c₀ + c₁x + c₂x² + …`, coefficients listed from the lowest degree.
    Polynomial { coefficients: Vec<f64> },
    /// `amplitude * exp(-(x - mean)² / (2 * std_dev²))`
    Gaussian {
        amplitude: f64,
        mean: f64,
        std_dev: f64,
    },
}

impl Curve {
    fn evaluate(&self, x: f64) -> Result<f64, FunctionError> {
        match self {
            Curve::Constant { value } => Ok(*value),
            Curve::Linear { slope, intercept } => Ok(slope * x + intercept),
            Curve::Polynomial { coefficients } => {
                if coefficients.is_empty() {
                    return Err(FunctionError::InvalidParameter(
                        "polynomial needs at least one coefficient",
                    ));
                }
                // Horner's method
                Ok(coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c))
            }
            Curve::Gaussian {
                amplitude,
                mean,
                std_dev,
            } => {
                if !(*std_dev > 0.0) {
                    return Err(FunctionError::InvalidParameter(
                        "gaussian standard deviation must be positive",
                    ));
                }
                let z = (x - mean) / std_dev;
                Ok(amplitude * (-0.5 * z * z).exp())
            }
        }
    }
}

/// A calibrated function mapping a criterion value to a mass contribution for one outcome.
///
/// The function is defined over the interval `[lower, upper)` of the criterion's domain, but it only
/// [`contains`](MembershipFunction::contains) values strictly between the bounds: a value equal to `lower` is
/// not part of the interval.
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipFunction {
    lower: f64,
    upper: f64,
    curve: Curve,
}

impl MembershipFunction {
    /// Builds a membership function, returning [`FunctionError::InvalidInterval`] unless `lower < upper`.
    ///
    /// Infinite bounds are allowed to describe open-ended intervals.
    pub fn new(lower: f64, upper: f64, curve: Curve) -> Result<Self, FunctionError> {
        if !(lower < upper) {
            return Err(FunctionError::InvalidInterval { lower, upper });
        }
        Ok(Self {
            lower,
            upper,
            curve,
        })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn curve(&self) -> &Curve {
        &self.curve
    }

    /// `true` if `lower < value < upper`.
    pub fn contains(&self, value: f64) -> bool {
        self.lower < value && value < self.upper
    }

    /// Evaluates the function at `value`.
    ///
    /// Fails if the value is outside the interval, if the curve parameters are invalid, or if the result is not a
    /// mass in the 0.0 to 1.0 range.
    pub fn evaluate(&self, value: f64) -> Result<f64, FunctionError> {
        if !self.contains(value) {
            return Err(FunctionError::OutOfDomain {
                value,
                lower: self.lower,
                upper: self.upper,
            });
        }
        let mass = self.curve.evaluate(value)?;
        if !mass.is_finite() {
            return Err(FunctionError::NonFinite(value));
        }
        if !(0.0..=1.0).contains(&mass) {
            return Err(FunctionError::MassOutOfRange(mass));
        }
        Ok(mass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_function {
        ($name:ident, $curve:expr, $value:expr, $expected:expr) => {
            #[test]
            fn $name() -> Result<(), FunctionError> {
                let f = MembershipFunction::new(0.0, 100.0, $curve)?;
                assert_relative_eq!(f.evaluate($value)?, $expected, epsilon = 1e-12);
                Ok(())
            }
        };
    }

    test_function!(constant, Curve::Constant { value: 0.3 }, 12.0, 0.3);

    test_function!(
        linear,
        Curve::Linear {
            slope: -0.01,
            intercept: 0.9,
        },
        40.0,
        0.5
    );

    test_function!(
        polynomial,
        Curve::Polynomial {
            coefficients: vec![0.1, 0.0, 0.01],
        },
        5.0,
        0.35
    );

    test_function!(
        gaussian_peak,
        Curve::Gaussian {
            amplitude: 0.8,
            mean: 10.0,
            std_dev: 2.0,
        },
        10.0,
        0.8
    );

    test_function!(
        gaussian_one_sigma,
        Curve::Gaussian {
            amplitude: 1.0,
            mean: 10.0,
            std_dev: 2.0,
        },
        12.0,
        (-0.5f64).exp()
    );

    #[test]
    fn open_lower_bound() -> Result<(), FunctionError> {
        let f = MembershipFunction::new(5.0, 10.0, Curve::Constant { value: 0.5 })?;
        assert!(!f.contains(5.0));
        assert!(f.contains(5.0 + 1e-9));
        assert!(!f.contains(10.0));
        assert_eq!(
            f.evaluate(5.0),
            Err(FunctionError::OutOfDomain {
                value: 5.0,
                lower: 5.0,
                upper: 10.0
            })
        );
        Ok(())
    }

    #[test]
    fn unbounded_interval() -> Result<(), FunctionError> {
        let f = MembershipFunction::new(20.0, f64::INFINITY, Curve::Constant { value: 0.9 })?;
        assert_eq!(f.evaluate(1e9)?, 0.9);
        Ok(())
    }

    #[test]
    fn invalid_interval() {
        assert_eq!(
            MembershipFunction::new(3.0, 3.0, Curve::Constant { value: 0.5 }),
            Err(FunctionError::InvalidInterval {
                lower: 3.0,
                upper: 3.0
            })
        );
        assert!(MembershipFunction::new(f64::NAN, 3.0, Curve::Constant { value: 0.5 }).is_err());
    }

    #[test]
    fn evaluation_faults() -> Result<(), FunctionError> {
        let f = MembershipFunction::new(
            0.0,
            10.0,
            Curve::Gaussian {
                amplitude: 1.0,
                mean: 0.0,
                std_dev: 0.0,
            },
        )?;
        assert!(matches!(
            f.evaluate(1.0),
            Err(FunctionError::InvalidParameter(_))
        ));

        let f = MembershipFunction::new(
            0.0,
            10.0,
            Curve::Linear {
                slope: 1.0,
                intercept: 0.0,
            },
        )?;
        assert_eq!(f.evaluate(2.0), Err(FunctionError::MassOutOfRange(2.0)));

        let f = MembershipFunction::new(
            0.0,
            10.0,
            Curve::Polynomial {
                coefficients: vec![],
            },
        )?;
        assert!(f.evaluate(2.0).is_err());

        let f = MembershipFunction::new(0.0, 10.0, Curve::Constant { value: f64::NAN })?;
        assert_eq!(f.evaluate(2.0), Err(FunctionError::NonFinite(2.0)));
        Ok(())
    }
}
