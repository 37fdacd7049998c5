//! Outlier detection: SKUs that no active carrier can hold in any permitted orientation.
//!
//! Outliers are relative to the carrier set. Activating a larger carrier can
//! remove a SKU from the list; the allocation mode plays no part.

use tracing::debug;

use crate::allocator::{AllocationConfig, active_carriers, evaluation_matrix, validate_run};
use crate::capacity::CarrierFitResult;
use crate::model::{CarrierConfig, SkuRecord, ValidationError};
use crate::types::Dimensional;

/// True when no result in the SKU's row is Fit or Borderline.
///
/// An empty row (no active carriers) is an outlier.
#[inline]
pub fn is_outlier(row: &[CarrierFitResult]) -> bool {
    !row.iter().any(CarrierFitResult::is_storable)
}

/// Outlier SKU ids, in input order, from an already evaluated matrix.
///
/// `rows[s]` must hold SKU `s` evaluated against every active carrier.
pub fn outlier_ids(skus: &[SkuRecord], rows: &[Vec<CarrierFitResult>]) -> Vec<String> {
    skus.iter()
        .zip(rows)
        .filter(|(_, row)| is_outlier(row))
        .map(|(sku, _)| sku.id.clone())
        .collect()
}

/// Evaluates `skus` against the active `carriers` and returns the outlier ids.
///
/// For callers that only need the data-quality view and not a full allocation.
pub fn find_outliers(
    skus: &[SkuRecord],
    carriers: &[CarrierConfig],
    config: &AllocationConfig,
) -> Result<Vec<String>, ValidationError> {
    validate_run(skus, carriers, config)?;

    let active = active_carriers(carriers);
    let matrix = evaluation_matrix(skus, &active, config);
    let outliers = outlier_ids(skus, &matrix);

    let largest_edge = active
        .iter()
        .map(|carrier| carrier.longest_edge())
        .fold(0.0_f64, f64::max);
    for (sku, row) in skus.iter().zip(&matrix) {
        if is_outlier(row) {
            debug!(
                sku = %sku.id,
                longest_edge_mm = sku.longest_edge(),
                largest_carrier_edge_mm = largest_edge,
                "SKU fits no active carrier"
            );
        }
    }
    Ok(outliers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tray() -> CarrierConfig {
        CarrierConfig::new("TRAY", "Tray", (570.0, 370.0, 200.0), 35.0).unwrap()
    }

    fn long_carrier() -> CarrierConfig {
        CarrierConfig::new("LONG", "Long", (3650.0, 864.0, 200.0), 440.0).unwrap()
    }

    fn catalog() -> Vec<SkuRecord> {
        vec![
            SkuRecord::new("SMALL", (100.0, 80.0, 60.0), 1.0, 5).unwrap(),
            SkuRecord::new("PIPE", (2000.0, 50.0, 50.0), 3.0, 5).unwrap(),
            SkuRecord::new("HEAVY", (100.0, 80.0, 60.0), 60.0, 5).unwrap(),
        ]
    }

    #[test]
    fn outliers_depend_on_carrier_set() {
        let config = AllocationConfig::default();
        let skus = catalog();

        let with_tray = find_outliers(&skus, &[tray()], &config).unwrap();
        assert_eq!(with_tray, vec!["PIPE".to_string(), "HEAVY".to_string()]);

        let with_both = find_outliers(&skus, &[tray(), long_carrier()], &config).unwrap();
        assert!(with_both.is_empty());
    }

    #[test]
    fn inactive_carrier_does_not_rescue() {
        let config = AllocationConfig::default();
        let carriers = [tray(), long_carrier().with_active(false)];
        let outliers = find_outliers(&catalog(), &carriers, &config).unwrap();
        assert_eq!(outliers.len(), 2);
    }

    #[test]
    fn no_active_carriers_makes_everything_an_outlier() {
        let config = AllocationConfig::default();
        let outliers = find_outliers(&catalog(), &[], &config).unwrap();
        assert_eq!(outliers, vec!["SMALL", "PIPE", "HEAVY"]);
        assert!(is_outlier(&[]));
    }

    #[test]
    fn borderline_is_not_an_outlier() {
        let config = AllocationConfig::default();
        let skus = [SkuRecord::new("EXACT", (570.0, 370.0, 200.0), 35.0, 1).unwrap()];
        assert!(find_outliers(&skus, &[tray()], &config).unwrap().is_empty());
    }
}
