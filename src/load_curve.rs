//! Time-dependent scaling of boundary values and tractions.
use crate::Real;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};

/// Maps the current time to a scale factor in `[0, 1]`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadCurve {
    /// Always 1.
    #[default]
    Constant,
    /// `t / end_time`, clamped to `[0, 1]`.
    Linear,
    /// `3s² - 2s³` with `s = t / end_time` clamped to `[0, 1]`.
    Smoothstep,
}

impl LoadCurve {
    #[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
    pub fn factor<T: Real>(&self, time: T, end_time: T) -> T {
        let s = || (time / end_time).max(0.0).min(1.0);
        match self {
            Self::Constant => 1.0,
            Self::Linear => s(),
            Self::Smoothstep => {
                let s = s();
                s * s * (3.0 - 2.0 * s)
            }
        }
    }
}
