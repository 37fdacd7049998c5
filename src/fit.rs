//! Fit classification of one SKU in one carrier, and best-orientation selection.
//!
//! Every permitted orientation is classified independently (`classify`); the
//! selector then reduces those evaluations to a single winner with a fixed,
//! total order so repeated runs pick the same orientation bit for bit.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::geometry::{Orientation, orientations_for};
use crate::model::{CarrierConfig, SkuRecord};
use crate::types::{Dimensional, EPSILON_GENERAL, Vec3, Weighted};

/// Tri-state verdict for a SKU/carrier/orientation combination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FitStatus {
    Fit,
    Borderline,
    NotFit,
}

impl FitStatus {
    /// Higher is better: Fit > Borderline > NotFit.
    #[inline]
    pub fn rank(self) -> u8 {
        match self {
            FitStatus::Fit => 2,
            FitStatus::Borderline => 1,
            FitStatus::NotFit => 0,
        }
    }

    /// Fit or Borderline, i.e. the SKU can actually be stored.
    #[inline]
    pub fn is_storable(self) -> bool {
        !matches!(self, FitStatus::NotFit)
    }
}

/// What keeps a result from being a clean fit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LimitingFactor {
    Dimension,
    Weight,
    None,
}

impl std::fmt::Display for LimitingFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitingFactor::Dimension => {
                write!(f, "SKU exceeds or nearly touches the carrier in at least one dimension")
            }
            LimitingFactor::Weight => write!(f, "SKU exceeds the carrier weight limit"),
            LimitingFactor::None => write!(f, "SKU fits with margin on every axis"),
        }
    }
}

/// Result of one SKU in one carrier in one orientation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitEvaluation {
    pub orientation: Orientation,
    /// SKU dimensions along the carrier's (length, width, height) axes.
    pub oriented_dims: Vec3,
    /// Carrier inner axis minus SKU axis, per axis.
    pub margins: Vec3,
    pub dims_ok: bool,
    pub weight_ok: bool,
    pub status: FitStatus,
    pub limiting_factor: LimitingFactor,
}

impl FitEvaluation {
    /// Smallest of the three margins.
    #[inline]
    pub fn min_margin(&self) -> f64 {
        self.margins.min_component()
    }
}

/// Classifies one orientation of a SKU against a carrier.
///
/// # Parameters
/// * `orientation` - Assignment of SKU edges to carrier axes
/// * `sku` - The SKU (dimensions and unit weight)
/// * `carrier` - The carrier (inner dimensions and weight limit)
/// * `borderline_threshold_mm` - Margin below which a fit is only borderline
///
/// NotFit is decided by raw margins and weight alone; the threshold only separates
/// Fit from Borderline.
pub fn classify<S>(
    orientation: Orientation,
    sku: &S,
    carrier: &CarrierConfig,
    borderline_threshold_mm: f64,
) -> FitEvaluation
where
    S: Dimensional + Weighted,
{
    let oriented_dims = orientation.apply(sku.dimensions());
    let margins = (carrier.inner_dims() - oriented_dims).snap_to_zero(EPSILON_GENERAL);
    let dims_ok = margins.min_component() >= 0.0;
    let weight_ok = sku.weight() <= carrier.max_weight_kg;

    let (status, limiting_factor) = if !dims_ok {
        // Dimension wins over weight when both fail.
        (FitStatus::NotFit, LimitingFactor::Dimension)
    } else if !weight_ok {
        (FitStatus::NotFit, LimitingFactor::Weight)
    } else if margins.min_component() < borderline_threshold_mm {
        (FitStatus::Borderline, LimitingFactor::Dimension)
    } else {
        (FitStatus::Fit, LimitingFactor::None)
    };

    FitEvaluation {
        orientation,
        oriented_dims,
        margins,
        dims_ok,
        weight_ok,
        status,
        limiting_factor,
    }
}

/// Classifies every orientation the carrier's loading constraint permits.
pub fn evaluate_orientations(
    sku: &SkuRecord,
    carrier: &CarrierConfig,
    borderline_threshold_mm: f64,
) -> Vec<FitEvaluation> {
    orientations_for(sku.dims_as_vec3(), carrier.loading_constraint)
        .into_iter()
        .map(|orientation| classify(orientation, sku, carrier, borderline_threshold_mm))
        .collect()
}

/// Total order over evaluations of the same SKU/carrier pair; `Greater` means `a` is better.
///
/// 1. Status: Fit > Borderline > NotFit.
/// 2. NotFit candidates: dimensionally fitting first (weight is then the limit).
/// 3. Larger minimum margin (for NotFit, the smallest overhang).
/// 4. Earlier canonical orientation.
pub fn compare_evaluations(a: &FitEvaluation, b: &FitEvaluation) -> Ordering {
    a.status
        .rank()
        .cmp(&b.status.rank())
        .then_with(|| a.dims_ok.cmp(&b.dims_ok))
        .then_with(|| a.min_margin().total_cmp(&b.min_margin()))
        .then_with(|| {
            b.orientation
                .canonical_index()
                .cmp(&a.orientation.canonical_index())
        })
}

/// Picks the best evaluation, or `None` when there are no candidates.
pub fn select_best(evaluations: &[FitEvaluation]) -> Option<FitEvaluation> {
    evaluations
        .iter()
        .copied()
        .max_by(compare_evaluations)
}
