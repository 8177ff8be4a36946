//! Decay kernels: elapsed time to a multiplicative weight.
//!
//! # Intuition
//!
//! Temporal measures discount old contributions. Instead of touching every
//! score at every tick, a contribution is re-weighted once, lazily, when its
//! owner is activated again: `value * W(now - last_activation)`.
//!
//! # Variants
//!
//! | Kernel | Formula | Label |
//! |--------|---------|-------|
//! | Constant | `c` | `Const(1.00)` |
//! | Power | `(1 + x/norm)^exponent`, exponent < 0 | `Pow(e:-1.000,n:1.000)` |
//! | Exponential | `base^(x/norm)`, base in (0, 1] | `Exp(b:0.500,n:7200.000)` |
//! | Rayleigh | `(1/sigma^2) * (x/norm) * exp(-(x/norm)^2 / (2 sigma^2))` | `Ray(s1.000,n:1.000)` |
//!
//! The label is used as a folder discriminator in a parameter sweep, so it is
//! part of the public contract.
//!
//! Note that the Rayleigh kernel is zero at `x = 0`: a score decayed over an
//! empty gap vanishes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Time-decay function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecayKernel {
    /// `W(x) = c`.
    Constant { c: f64 },
    /// `W(x) = (1 + x/norm)^exponent`.
    Power { norm: f64, exponent: f64 },
    /// `W(x) = base^(x/norm)`.
    Exponential { norm: f64, base: f64 },
    /// Rayleigh density shape, peaking at `x = sigma * norm`.
    Rayleigh { norm: f64, sigma: f64 },
}

impl Default for DecayKernel {
    fn default() -> Self {
        Self::Constant { c: 1.0 }
    }
}

impl DecayKernel {
    /// Constant weight `c`.
    pub fn constant(c: f64) -> Result<Self> {
        Self::Constant { c }.validated()
    }

    /// Power-law decay. `exponent` must be negative.
    pub fn power(norm: f64, exponent: f64) -> Result<Self> {
        Self::Power { norm, exponent }.validated()
    }

    /// Exponential decay. `base` must lie in `(0, 1]`.
    pub fn exponential(norm: f64, base: f64) -> Result<Self> {
        Self::Exponential { norm, base }.validated()
    }

    /// Rayleigh-shaped weight.
    pub fn rayleigh(norm: f64, sigma: f64) -> Result<Self> {
        Self::Rayleigh { norm, sigma }.validated()
    }

    fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Check the kernel parameters.
    ///
    /// Kernels that come from a deserialized config bypass the constructors,
    /// so every parameter object calls this again.
    pub fn validate(&self) -> Result<()> {
        let positive_norm = |norm: f64| {
            if norm.is_finite() && norm > 0.0 {
                Ok(())
            } else {
                Err(Error::invalid(format!("kernel 'norm' must be positive, got {norm}")))
            }
        };
        match *self {
            Self::Constant { c } => {
                if !(c.is_finite() && c >= 0.0) {
                    return Err(Error::invalid(format!("constant kernel needs c >= 0, got {c}")));
                }
            }
            Self::Power { norm, exponent } => {
                positive_norm(norm)?;
                if !(exponent.is_finite() && exponent < 0.0) {
                    return Err(Error::invalid(format!(
                        "power kernel 'exponent' must be negative, got {exponent}"
                    )));
                }
            }
            Self::Exponential { norm, base } => {
                positive_norm(norm)?;
                if !(base > 0.0 && base <= 1.0) {
                    return Err(Error::invalid(format!(
                        "exponential kernel 'base' must be from interval (0,1], got {base}"
                    )));
                }
            }
            Self::Rayleigh { norm, sigma } => {
                positive_norm(norm)?;
                if !(sigma.is_finite() && sigma > 0.0) {
                    return Err(Error::invalid(format!(
                        "rayleigh kernel 'sigma' must be positive, got {sigma}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Weight for an elapsed time.
    #[must_use]
    pub fn weight(&self, elapsed: f64) -> f64 {
        match *self {
            Self::Constant { c } => c,
            Self::Power { norm, exponent } => (1.0 + elapsed / norm).powf(exponent),
            Self::Exponential { norm, base } => base.powf(elapsed / norm),
            Self::Rayleigh { norm, sigma } => {
                let var = sigma * sigma;
                let x = elapsed / norm;
                (1.0 / var) * x * (-(x * x) / (2.0 * var)).exp()
            }
        }
    }

    /// Canonical label.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DecayKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Constant { c } => write!(f, "Const({c:.2})"),
            Self::Power { norm, exponent } => write!(f, "Pow(e:{exponent:.3},n:{norm:.3})"),
            Self::Exponential { norm, base } => write!(f, "Exp(b:{base:.3},n:{norm:.3})"),
            Self::Rayleigh { norm, sigma } => write!(f, "Ray(s{sigma:.3},n:{norm:.3})"),
        }
    }
}
