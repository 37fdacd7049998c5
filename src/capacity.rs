//! Location and utilization calculation for one SKU in one carrier.
//!
//! Units per carrier use simple grid packing of identical units in the winning
//! orientation (floor per axis, multiplied), not true 3D bin packing.

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

use crate::fit::{FitEvaluation, FitStatus, LimitingFactor, evaluate_orientations, select_best};
use crate::geometry::Orientation;
use crate::model::{CarrierConfig, SkuRecord};
use crate::types::{EPSILON_GENERAL, Vec3};

/// Best-orientation outcome for one SKU/carrier pair.
///
/// For `NotFit` results `units_per_carrier`, `locations_required` and
/// `filling_rate` are all zero; `orientation` and `margins_mm` still describe the
/// closest candidate so the reason can be explained.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CarrierFitResult {
    pub sku_id: String,
    pub carrier_id: String,
    pub carrier_name: String,
    pub status: FitStatus,
    pub limiting_factor: LimitingFactor,
    /// Human-readable explanation of `limiting_factor`.
    pub reason: String,
    pub orientation: Option<Orientation>,
    #[schema(value_type = Option<[f64; 3]>, example = json!([470.0, 290.0, 140.0]))]
    pub margins_mm: Option<(f64, f64, f64)>,
    pub min_margin_mm: Option<f64>,
    pub units_per_carrier: u64,
    pub locations_required: u64,
    pub filling_rate: f64,
    pub unit_volume_m3: f64,
    pub stock_volume_m3: f64,
}

impl CarrierFitResult {
    fn not_fit(sku: &SkuRecord, carrier: &CarrierConfig, limiting_factor: LimitingFactor) -> Self {
        Self {
            sku_id: sku.id.clone(),
            carrier_id: carrier.id.clone(),
            carrier_name: carrier.display_name().to_string(),
            status: FitStatus::NotFit,
            limiting_factor,
            reason: limiting_factor.to_string(),
            orientation: None,
            margins_mm: None,
            min_margin_mm: None,
            units_per_carrier: 0,
            locations_required: 0,
            filling_rate: 0.0,
            unit_volume_m3: sku.unit_volume_m3(),
            stock_volume_m3: sku.stock_volume_m3(),
        }
    }

    fn with_evaluation(mut self, evaluation: &FitEvaluation) -> Self {
        self.status = evaluation.status;
        self.limiting_factor = evaluation.limiting_factor;
        self.reason = evaluation.limiting_factor.to_string();
        self.orientation = Some(evaluation.orientation);
        self.margins_mm = Some(evaluation.margins.as_tuple());
        self.min_margin_mm = Some(evaluation.min_margin());
        self
    }

    /// Fit or Borderline.
    #[inline]
    pub fn is_storable(&self) -> bool {
        self.status.is_storable()
    }
}

/// Units of one SKU that fit a single carrier location.
///
/// # Parameters
/// * `oriented_dims` - SKU dimensions along the carrier axes (winning orientation)
/// * `carrier` - The carrier
/// * `unit_weight_kg` - Weight of one unit
/// * `cap_by_weight` - Additionally limit units to `floor(max_weight / unit_weight)`
///
/// # Examples
/// ```
/// use carrier_fit::capacity::units_per_carrier;
/// use carrier_fit::model::CarrierConfig;
/// use carrier_fit::types::Vec3;
///
/// let tray = CarrierConfig::new("T", "Tray", (570.0, 370.0, 200.0), 35.0).unwrap();
/// let units = units_per_carrier(Vec3::new(100.0, 80.0, 60.0), &tray, 1.0, false);
/// assert_eq!(units, 5 * 4 * 3);
/// ```
pub fn units_per_carrier(
    oriented_dims: Vec3,
    carrier: &CarrierConfig,
    unit_weight_kg: f64,
    cap_by_weight: bool,
) -> u64 {
    let per_axis = |inner: f64, item: f64| -> u64 {
        if item <= 0.0 {
            return 0;
        }
        ((inner + EPSILON_GENERAL) / item).floor().max(0.0) as u64
    };

    let inner = carrier.inner_dims();
    // Tiny SKUs in long carriers exceed u64; the count saturates instead of wrapping.
    let grid = per_axis(inner.x, oriented_dims.x)
        .saturating_mul(per_axis(inner.y, oriented_dims.y))
        .saturating_mul(per_axis(inner.z, oriented_dims.z));

    if cap_by_weight && unit_weight_kg > 0.0 {
        let by_weight = ((carrier.max_weight_kg + EPSILON_GENERAL) / unit_weight_kg)
            .floor()
            .max(0.0) as u64;
        grid.min(by_weight)
    } else {
        grid
    }
}

/// Locations needed for the whole stock: `ceil(stock / units)`, 0 when nothing fits.
#[inline]
pub fn locations_required(stock_qty: u64, units_per_carrier: u64) -> u64 {
    if units_per_carrier == 0 {
        return 0;
    }
    stock_qty.div_ceil(units_per_carrier)
}

/// Share of the occupied locations' inner volume actually filled by stock.
///
/// Defined as 0 when no location is required.
#[inline]
pub fn filling_rate(stock_volume_m3: f64, locations_required: u64, carrier_volume_m3: f64) -> f64 {
    let capacity = locations_required as f64 * carrier_volume_m3;
    if locations_required == 0 || capacity <= 0.0 {
        return 0.0;
    }
    stock_volume_m3 / capacity
}

/// Evaluates one SKU against one carrier: orientation search, classification and
/// location math in a single pure call.
///
/// # Parameters
/// * `sku` - The SKU
/// * `carrier` - The carrier (assumed valid and active)
/// * `borderline_threshold_mm` - Borderline margin threshold for this run
/// * `cap_units_by_weight` - Whether units are also limited by the carrier weight limit
pub fn evaluate_carrier(
    sku: &SkuRecord,
    carrier: &CarrierConfig,
    borderline_threshold_mm: f64,
    cap_units_by_weight: bool,
) -> CarrierFitResult {
    let evaluations = evaluate_orientations(sku, carrier, borderline_threshold_mm);
    let Some(best) = select_best(&evaluations) else {
        return CarrierFitResult::not_fit(sku, carrier, LimitingFactor::Dimension);
    };

    let mut result =
        CarrierFitResult::not_fit(sku, carrier, best.limiting_factor).with_evaluation(&best);
    if !best.status.is_storable() {
        return result;
    }

    let units = units_per_carrier(
        best.oriented_dims,
        carrier,
        sku.weight_kg,
        cap_units_by_weight,
    );
    if units == 0 {
        result.status = FitStatus::NotFit;
        result.limiting_factor = LimitingFactor::Dimension;
        result.reason = LimitingFactor::Dimension.to_string();
        return result;
    }

    let locations = locations_required(sku.stock_qty, units);
    result.units_per_carrier = units;
    result.locations_required = locations;
    result.filling_rate = filling_rate(
        result.stock_volume_m3,
        locations,
        carrier.inner_volume_m3(),
    );
    result
}
