//! Per-carrier aggregation of allocation results.
//!
//! `CarrierTally` is a mergeable partial sum. Results are folded in fixed-size
//! chunks and the partials merged in chunk order, so the floating point totals do
//! not depend on whether the chunks were processed in parallel.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::capacity::CarrierFitResult;
use crate::fit::FitStatus;
use crate::model::{CarrierConfig, SkuRecord};

/// Number of SKU rows folded into one partial tally.
pub const AGGREGATION_CHUNK_SIZE: usize = 256;

/// Partial statistics for one carrier.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CarrierTally {
    pub fit_count: u64,
    pub borderline_count: u64,
    pub not_fit_count: u64,
    pub unit_volume_m3: f64,
    pub stock_volume_m3: f64,
    pub locations: u64,
    filling_rate_sum: f64,
    filling_rate_samples: u64,
}

impl CarrierTally {
    /// Adds one result.
    pub fn absorb(&mut self, result: &CarrierFitResult) {
        match result.status {
            FitStatus::Fit => self.fit_count += 1,
            FitStatus::Borderline => self.borderline_count += 1,
            FitStatus::NotFit => self.not_fit_count += 1,
        }
        if result.is_storable() {
            self.unit_volume_m3 += result.unit_volume_m3;
            self.stock_volume_m3 += result.stock_volume_m3;
            self.locations += result.locations_required;
        }
        if result.units_per_carrier > 0 {
            self.filling_rate_sum += result.filling_rate;
            self.filling_rate_samples += 1;
        }
    }

    /// Adds another partial tally.
    pub fn merge(&mut self, other: &CarrierTally) {
        self.fit_count += other.fit_count;
        self.borderline_count += other.borderline_count;
        self.not_fit_count += other.not_fit_count;
        self.unit_volume_m3 += other.unit_volume_m3;
        self.stock_volume_m3 += other.stock_volume_m3;
        self.locations += other.locations;
        self.filling_rate_sum += other.filling_rate_sum;
        self.filling_rate_samples += other.filling_rate_samples;
    }

    pub fn total(&self) -> u64 {
        self.fit_count + self.borderline_count + self.not_fit_count
    }

    /// Finalizes the tally into the reported statistics for `carrier`.
    pub fn into_stats(self, carrier: &CarrierConfig) -> CarrierStats {
        let total = self.total();
        let fit_percentage = if total == 0 {
            0.0
        } else {
            (self.fit_count + self.borderline_count) as f64 / total as f64 * 100.0
        };
        let average_filling_rate = if self.filling_rate_samples == 0 {
            0.0
        } else {
            self.filling_rate_sum / self.filling_rate_samples as f64
        };
        let utilization_pct = carrier
            .available_locations
            .map(|available| self.locations as f64 / available as f64 * 100.0);

        CarrierStats {
            carrier_id: carrier.id.clone(),
            carrier_name: carrier.display_name().to_string(),
            fit_count: self.fit_count,
            borderline_count: self.borderline_count,
            not_fit_count: self.not_fit_count,
            total_unit_volume_m3: self.unit_volume_m3,
            total_stock_volume_m3: self.stock_volume_m3,
            total_locations: self.locations,
            average_filling_rate,
            fit_percentage,
            utilization_pct,
        }
    }
}

/// Summary of one carrier over a whole run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CarrierStats {
    pub carrier_id: String,
    pub carrier_name: String,
    pub fit_count: u64,
    pub borderline_count: u64,
    pub not_fit_count: u64,
    /// Sum over Fit and Borderline entries.
    pub total_unit_volume_m3: f64,
    /// Sum over Fit and Borderline entries.
    pub total_stock_volume_m3: f64,
    pub total_locations: u64,
    /// Mean over entries with at least one unit per carrier.
    pub average_filling_rate: f64,
    pub fit_percentage: f64,
    /// `total_locations / available_locations * 100`, only when the carrier declares
    /// how many locations exist.
    pub utilization_pct: Option<f64>,
}

/// SKUs left without an assignment in the exclusive modes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UnassignedSummary {
    pub sku_count: u64,
    pub total_unit_volume_m3: f64,
    pub total_stock_volume_m3: f64,
}

impl UnassignedSummary {
    pub fn absorb(&mut self, sku: &SkuRecord) {
        self.sku_count += 1;
        self.total_unit_volume_m3 += sku.unit_volume_m3();
        self.total_stock_volume_m3 += sku.stock_volume_m3();
    }
}

/// Folds the selected results of every SKU into one `CarrierStats` per carrier.
///
/// # Parameters
/// * `selected` - Reported results per SKU, in SKU input order
/// * `carriers` - Carriers to report, in reporting order
/// * `parallel` - Fold chunks on the rayon pool
///
/// Results for carriers not in `carriers` are ignored.
pub fn aggregate(
    selected: &[Vec<CarrierFitResult>],
    carriers: &[&CarrierConfig],
    parallel: bool,
) -> Vec<CarrierStats> {
    let index: HashMap<&str, usize> = carriers
        .iter()
        .enumerate()
        .map(|(idx, carrier)| (carrier.id.as_str(), idx))
        .collect();

    let fold_chunk = |chunk: &[Vec<CarrierFitResult>]| -> Vec<CarrierTally> {
        let mut tallies = vec![CarrierTally::default(); carriers.len()];
        for result in chunk.iter().flatten() {
            if let Some(&idx) = index.get(result.carrier_id.as_str()) {
                tallies[idx].absorb(result);
            }
        }
        tallies
    };

    let partials: Vec<Vec<CarrierTally>> = if parallel {
        selected
            .par_chunks(AGGREGATION_CHUNK_SIZE)
            .map(fold_chunk)
            .collect()
    } else {
        selected
            .chunks(AGGREGATION_CHUNK_SIZE)
            .map(fold_chunk)
            .collect()
    };

    let mut totals = vec![CarrierTally::default(); carriers.len()];
    for partial in &partials {
        for (total, part) in totals.iter_mut().zip(partial) {
            total.merge(part);
        }
    }

    totals
        .into_iter()
        .zip(carriers)
        .map(|(tally, carrier)| tally.into_stats(carrier))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::evaluate_carrier;

    fn tray() -> CarrierConfig {
        CarrierConfig::new("TRAY", "Tray", (570.0, 370.0, 200.0), 35.0).unwrap()
    }

    fn results(carrier: &CarrierConfig) -> Vec<Vec<CarrierFitResult>> {
        let skus = [
            SkuRecord::new("FIT", (100.0, 80.0, 60.0), 1.0, 500).unwrap(),
            SkuRecord::new("EDGE", (569.0, 100.0, 100.0), 1.0, 3).unwrap(),
            SkuRecord::new("HUGE", (900.0, 100.0, 100.0), 1.0, 7).unwrap(),
            SkuRecord::new("HEAVY", (100.0, 80.0, 60.0), 50.0, 1).unwrap(),
        ];
        skus.iter()
            .map(|sku| vec![evaluate_carrier(sku, carrier, 2.0, false)])
            .collect()
    }

    #[test]
    fn aggregate_counts_and_sums() {
        let carrier = tray().with_available_locations(100);
        let stats = aggregate(&results(&carrier), &[&carrier], false);
        assert_eq!(stats.len(), 1);

        let s = &stats[0];
        assert_eq!(s.carrier_id, "TRAY");
        assert_eq!(s.fit_count, 1);
        assert_eq!(s.borderline_count, 1);
        assert_eq!(s.not_fit_count, 2);
        // 60 units per tray for FIT, 1 x 3 x 2 for EDGE.
        assert_eq!(s.total_locations, 9 + 1);
        assert!((s.fit_percentage - 50.0).abs() < 1e-9);
        assert!((s.utilization_pct.unwrap() - 10.0).abs() < 1e-9);

        // NotFit SKUs contribute nothing to the volume totals.
        let expected_stock = 500.0 * 0.00048 + 3.0 * 0.00569;
        assert!((s.total_stock_volume_m3 - expected_stock).abs() < 1e-9);
    }

    #[test]
    fn utilization_unset_without_available_locations() {
        let carrier = tray();
        let stats = aggregate(&results(&carrier), &[&carrier], false);
        assert_eq!(stats[0].utilization_pct, None);
    }

    #[test]
    fn empty_input_yields_zeroed_stats() {
        let carrier = tray();
        let stats = aggregate(&[], &[&carrier], false);
        assert_eq!(stats[0].fit_count, 0);
        assert_eq!(stats[0].average_filling_rate, 0.0);
        assert_eq!(stats[0].fit_percentage, 0.0);
        assert!(aggregate(&[], &[], true).is_empty());
    }

    #[test]
    fn parallel_and_sequential_agree_exactly() {
        let carrier = tray();
        let one = results(&carrier);
        let many: Vec<Vec<CarrierFitResult>> =
            (0..(AGGREGATION_CHUNK_SIZE * 3 + 17)).map(|i| one[i % one.len()].clone()).collect();

        let sequential = aggregate(&many, &[&carrier], false);
        let parallel = aggregate(&many, &[&carrier], true);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn merge_matches_single_fold() {
        let carrier = tray();
        let rows = results(&carrier);
        let mut whole = CarrierTally::default();
        for r in rows.iter().flatten() {
            whole.absorb(r);
        }

        let mut left = CarrierTally::default();
        let mut right = CarrierTally::default();
        for r in rows[..2].iter().flatten() {
            left.absorb(r);
        }
        for r in rows[2..].iter().flatten() {
            right.absorb(r);
        }
        left.merge(&right);
        assert_eq!(left.total(), whole.total());
        assert_eq!(left.locations, whole.locations);
        assert!((left.stock_volume_m3 - whole.stock_volume_m3).abs() < 1e-12);
    }

    #[test]
    fn unassigned_summary_accumulates() {
        let mut summary = UnassignedSummary::default();
        summary.absorb(&SkuRecord::new("A", (100.0, 100.0, 100.0), 1.0, 10).unwrap());
        summary.absorb(&SkuRecord::new("B", (100.0, 100.0, 100.0), 1.0, 0).unwrap());
        assert_eq!(summary.sku_count, 2);
        assert!((summary.total_unit_volume_m3 - 0.002).abs() < 1e-12);
        assert!((summary.total_stock_volume_m3 - 0.01).abs() < 1e-12);
    }
}
