//! Allocation run orchestration.
//!
//! A run validates its inputs once, evaluates every SKU against every active
//! carrier, lets the configured policy select from each SKU's row, and then folds
//! the selections into per-carrier statistics. The evaluation phase is pure and
//! runs on the rayon pool when `parallel` is enabled.
//!
//! Main entry points:
//! - `allocate`: one run, returns `AllocationResult`
//! - `allocate_with_progress`: same, reporting `AllocationEvent`s along the way
//! - `validate_run`: the configuration checks performed before any SKU is evaluated

use std::collections::{BTreeMap, HashSet};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::capacity::{CarrierFitResult, evaluate_carrier};
use crate::fit::FitStatus;
use crate::model::{CarrierConfig, SkuRecord, ValidationError};
use crate::outliers::outlier_ids;
use crate::policy::AllocationMode;
use crate::stats::{CarrierStats, UnassignedSummary, aggregate};

/// Parameters of one allocation run.
///
/// Passed explicitly to every call, so concurrent runs with different thresholds
/// never share state.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AllocationConfig {
    /// Margin (mm) below which a dimensional fit is only borderline.
    pub borderline_threshold_mm: f64,
    pub mode: AllocationMode,
    /// Also limit units per carrier by the carrier weight limit.
    pub cap_units_by_weight: bool,
    /// Evaluate SKUs on the rayon thread pool.
    pub parallel: bool,
}

impl AllocationConfig {
    pub const DEFAULT_BORDERLINE_THRESHOLD_MM: f64 = 2.0;
    pub const DEFAULT_MODE: AllocationMode = AllocationMode::Independent;
    pub const DEFAULT_CAP_UNITS_BY_WEIGHT: bool = false;
    pub const DEFAULT_PARALLEL: bool = true;

    /// Creates a builder for a custom configuration.
    pub fn builder() -> AllocationConfigBuilder {
        AllocationConfigBuilder::default()
    }

    /// Checks the run parameters.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let threshold = self.borderline_threshold_mm;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ValidationError::InvalidThreshold(format!(
                "borderline threshold must be a finite value >= 0 mm, got: {}",
                threshold
            )));
        }
        Ok(())
    }
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            borderline_threshold_mm: Self::DEFAULT_BORDERLINE_THRESHOLD_MM,
            mode: Self::DEFAULT_MODE,
            cap_units_by_weight: Self::DEFAULT_CAP_UNITS_BY_WEIGHT,
            parallel: Self::DEFAULT_PARALLEL,
        }
    }
}

/// Builder for `AllocationConfig`.
#[derive(Clone, Debug, Default)]
pub struct AllocationConfigBuilder {
    config: AllocationConfig,
}

impl AllocationConfigBuilder {
    pub fn borderline_threshold_mm(mut self, threshold: f64) -> Self {
        self.config.borderline_threshold_mm = threshold;
        self
    }

    pub fn mode(mut self, mode: AllocationMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn cap_units_by_weight(mut self, enabled: bool) -> Self {
        self.config.cap_units_by_weight = enabled;
        self
    }

    pub fn parallel(mut self, enabled: bool) -> Self {
        self.config.parallel = enabled;
        self
    }

    pub fn build(self) -> AllocationConfig {
        self.config
    }
}

/// Totals over a whole run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct AllocationSummary {
    pub total_skus: u64,
    /// SKUs with at least one reported Fit or Borderline entry.
    pub assigned_skus: u64,
    pub unassigned_skus: u64,
    pub outlier_count: u64,
    pub fit_count: u64,
    pub borderline_count: u64,
    pub not_fit_count: u64,
    /// Share of reported entries that are Fit or Borderline, in percent.
    pub fit_percentage: f64,
}

/// Output of one allocation run.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct AllocationResult {
    pub mode: AllocationMode,
    pub borderline_threshold_mm: f64,
    /// Reported results per SKU id. Independent mode lists every active carrier;
    /// the exclusive modes list zero or one.
    pub assignments: BTreeMap<String, Vec<CarrierFitResult>>,
    pub carrier_stats: Vec<CarrierStats>,
    /// SKUs without an assignment (empty in Independent mode).
    pub unassigned: UnassignedSummary,
    /// SKUs that fit no active carrier, in input order.
    pub outliers: Vec<String>,
    pub summary: AllocationSummary,
}

impl AllocationResult {
    /// Reported results for one SKU.
    pub fn results_for(&self, sku_id: &str) -> &[CarrierFitResult] {
        self.assignments
            .get(sku_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Statistics for one carrier, if it was considered in this run.
    pub fn stats_for(&self, carrier_id: &str) -> Option<&CarrierStats> {
        self.carrier_stats
            .iter()
            .find(|stats| stats.carrier_id == carrier_id)
    }
}

/// Progress of an allocation run, suitable for live streaming.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum AllocationEvent {
    /// Inputs validated, evaluation starts.
    RunStarted {
        mode: AllocationMode,
        sku_count: usize,
        carrier_count: usize,
        borderline_threshold_mm: f64,
    },
    /// Selection for one SKU, reported in input order.
    SkuAllocated {
        index: usize,
        sku_id: String,
        carrier_ids: Vec<String>,
        status: Option<FitStatus>,
        outlier: bool,
    },
    /// Run complete.
    Finished {
        assigned: u64,
        unassigned: u64,
        outliers: u64,
    },
}

/// Rejects invalid configuration before any SKU is evaluated.
///
/// Inactive carriers are validated too; they are still part of the configuration.
pub fn validate_run(
    skus: &[SkuRecord],
    carriers: &[CarrierConfig],
    config: &AllocationConfig,
) -> Result<(), ValidationError> {
    config.validate()?;

    let mut carrier_ids = HashSet::with_capacity(carriers.len());
    for carrier in carriers {
        carrier.validate()?;
        if !carrier_ids.insert(carrier.id.as_str()) {
            return Err(ValidationError::DuplicateIdentifier(format!(
                "carrier '{}' is configured more than once",
                carrier.id
            )));
        }
    }

    let mut sku_ids = HashSet::with_capacity(skus.len());
    for sku in skus {
        sku.validate()?;
        if !sku_ids.insert(sku.id.as_str()) {
            return Err(ValidationError::DuplicateIdentifier(format!(
                "SKU '{}' appears more than once",
                sku.id
            )));
        }
    }
    Ok(())
}

/// Active carriers in configuration order.
pub fn active_carriers(carriers: &[CarrierConfig]) -> Vec<&CarrierConfig> {
    carriers.iter().filter(|carrier| carrier.active).collect()
}

/// Evaluates every SKU against every given carrier.
///
/// `matrix[s][c]` is SKU `s` in carrier `c`. Row order follows `skus` in both the
/// parallel and the sequential path.
pub fn evaluation_matrix(
    skus: &[SkuRecord],
    carriers: &[&CarrierConfig],
    config: &AllocationConfig,
) -> Vec<Vec<CarrierFitResult>> {
    let evaluate_row = |sku: &SkuRecord| -> Vec<CarrierFitResult> {
        carriers
            .iter()
            .map(|carrier| {
                evaluate_carrier(
                    sku,
                    carrier,
                    config.borderline_threshold_mm,
                    config.cap_units_by_weight,
                )
            })
            .collect()
    };

    if config.parallel {
        skus.par_iter().map(evaluate_row).collect()
    } else {
        skus.iter().map(evaluate_row).collect()
    }
}

/// Runs one allocation.
///
/// # Parameters
/// * `skus` - SKUs to allocate (ids unique)
/// * `carriers` - Carrier configuration; inactive carriers are ignored after validation
/// * `config` - Run parameters
///
/// # Errors
/// Configuration errors only; a SKU that fits nowhere is a normal result.
///
/// # Examples
/// ```
/// use carrier_fit::allocator::{AllocationConfig, allocate};
/// use carrier_fit::model::{CarrierConfig, SkuRecord};
///
/// let skus = vec![SkuRecord::new("A", (100.0, 80.0, 60.0), 1.0, 500).unwrap()];
/// let carriers = vec![CarrierConfig::new("T", "Tray", (570.0, 370.0, 200.0), 35.0).unwrap()];
///
/// let result = allocate(&skus, &carriers, &AllocationConfig::default()).unwrap();
/// assert_eq!(result.results_for("A")[0].locations_required, 9);
/// assert!(result.outliers.is_empty());
/// ```
pub fn allocate(
    skus: &[SkuRecord],
    carriers: &[CarrierConfig],
    config: &AllocationConfig,
) -> Result<AllocationResult, ValidationError> {
    allocate_with_progress(skus, carriers, config, |_| {})
}

/// Runs one allocation and reports progress events.
///
/// Nothing is emitted when validation fails.
pub fn allocate_with_progress(
    skus: &[SkuRecord],
    carriers: &[CarrierConfig],
    config: &AllocationConfig,
    mut on_event: impl FnMut(&AllocationEvent),
) -> Result<AllocationResult, ValidationError> {
    validate_run(skus, carriers, config)?;

    let active = active_carriers(carriers);
    let policy = config.mode.policy();
    let considered = policy.considered(&active);

    on_event(&AllocationEvent::RunStarted {
        mode: config.mode,
        sku_count: skus.len(),
        carrier_count: active.len(),
        borderline_threshold_mm: config.borderline_threshold_mm,
    });
    debug!(
        mode = %config.mode,
        skus = skus.len(),
        active_carriers = active.len(),
        considered_carriers = considered.len(),
        "Evaluating SKU/carrier matrix"
    );

    let matrix = evaluation_matrix(skus, &active, config);
    let outliers = outlier_ids(skus, &matrix);
    let outlier_set: HashSet<&str> = outliers.iter().map(String::as_str).collect();

    let selected: Vec<Vec<CarrierFitResult>> = matrix
        .iter()
        .map(|row| policy.select(row, &considered))
        .collect();

    let mut assignments = BTreeMap::new();
    let mut unassigned = UnassignedSummary::default();
    let mut summary = AllocationSummary {
        total_skus: skus.len() as u64,
        outlier_count: outliers.len() as u64,
        ..AllocationSummary::default()
    };

    for (index, (sku, picks)) in skus.iter().zip(&selected).enumerate() {
        for result in picks {
            match result.status {
                FitStatus::Fit => summary.fit_count += 1,
                FitStatus::Borderline => summary.borderline_count += 1,
                FitStatus::NotFit => summary.not_fit_count += 1,
            }
        }

        let assigned = picks.iter().any(CarrierFitResult::is_storable);
        if assigned {
            summary.assigned_skus += 1;
        } else if config.mode.is_exclusive() {
            unassigned.absorb(sku);
        }

        let status = picks
            .iter()
            .map(|result| result.status)
            .max_by_key(|status| status.rank());
        on_event(&AllocationEvent::SkuAllocated {
            index,
            sku_id: sku.id.clone(),
            carrier_ids: picks
                .iter()
                .filter(|result| result.is_storable())
                .map(|result| result.carrier_id.clone())
                .collect(),
            status,
            outlier: outlier_set.contains(sku.id.as_str()),
        });

        assignments.insert(sku.id.clone(), picks.clone());
    }
    summary.unassigned_skus = summary.total_skus - summary.assigned_skus;

    let reported = summary.fit_count + summary.borderline_count + summary.not_fit_count;
    summary.fit_percentage = if reported == 0 {
        0.0
    } else {
        (summary.fit_count + summary.borderline_count) as f64 / reported as f64 * 100.0
    };

    let stats_carriers: Vec<&CarrierConfig> = considered.iter().map(|&idx| active[idx]).collect();
    let carrier_stats = aggregate(&selected, &stats_carriers, config.parallel);

    on_event(&AllocationEvent::Finished {
        assigned: summary.assigned_skus,
        unassigned: summary.unassigned_skus,
        outliers: summary.outlier_count,
    });
    info!(
        mode = %config.mode,
        skus = summary.total_skus,
        assigned = summary.assigned_skus,
        unassigned = summary.unassigned_skus,
        outliers = summary.outlier_count,
        fit_percentage = summary.fit_percentage,
        "Allocation finished"
    );

    Ok(AllocationResult {
        mode: config.mode,
        borderline_threshold_mm: config.borderline_threshold_mm,
        assignments,
        carrier_stats,
        unassigned,
        outliers,
        summary,
    })
}
