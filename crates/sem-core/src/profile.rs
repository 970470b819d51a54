//! The `Profile` input record: an ordered list of eddy variants plus an
//! opaque settings bag, validated once at construction.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// One population of eddies sharing a density, length scale, and intensity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EddyVariant {
    /// Eddies per unit volume.
    pub density: f64,
    /// Length scale σ.
    pub length_scale: f64,
    /// Intensity ι (magnitude of the orientation vector α).
    pub intensity: f64,
}

/// A validated, immutable eddy profile: one or more variants plus a
/// free-form settings bag the core does not interpret but preserves
/// opaquely so round-tripping through the CLI never loses user data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub settings: serde_json::Value,
    pub variants: Vec<EddyVariant>,
}

impl Profile {
    /// Validate a raw list of variants and settings bag into a `Profile`.
    ///
    /// Fails with `InvalidProfile` if the variant list is empty, or if any
    /// variant's `density`, `length_scale`, or `intensity` is not a finite
    /// positive number.
    pub fn new(variants: Vec<EddyVariant>, settings: serde_json::Value) -> CoreResult<Profile> {
        if variants.is_empty() {
            return Err(CoreError::InvalidProfile(
                "eddy variants list must not be empty".into(),
            ));
        }
        for (i, v) in variants.iter().enumerate() {
            if !is_finite_positive(v.density) {
                return Err(CoreError::InvalidProfile(format!(
                    "variant {i}: density must be a positive finite number, got {}",
                    v.density
                )));
            }
            if !is_finite_positive(v.length_scale) {
                return Err(CoreError::InvalidProfile(format!(
                    "variant {i}: length_scale must be a positive finite number, got {}",
                    v.length_scale
                )));
            }
            if !is_finite_positive(v.intensity) {
                return Err(CoreError::InvalidProfile(format!(
                    "variant {i}: intensity must be a positive finite number, got {}",
                    v.intensity
                )));
            }
        }
        Ok(Profile { settings, variants })
    }
}

fn is_finite_positive(x: f64) -> bool {
    x.is_finite() && x > 0.0
}
