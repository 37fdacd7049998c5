//! Allocation policies.
//!
//! A policy never looks at geometry. It receives one SKU's evaluated row (one
//! `CarrierFitResult` per active carrier, in carrier configuration order) and only
//! decides which of those results are reported as the SKU's assignment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::capacity::CarrierFitResult;
use crate::model::CarrierConfig;

/// How carriers are assigned to SKUs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMode {
    /// Every active carrier is reported, NotFit entries included.
    #[default]
    Independent,
    /// First Fit/Borderline carrier in ascending priority.
    Prioritized,
    /// Fit/Borderline carrier with the highest filling rate.
    BestFit,
}

impl AllocationMode {
    /// The policy implementing this mode.
    pub fn policy(self) -> &'static dyn AllocationPolicy {
        match self {
            AllocationMode::Independent => &IndependentPolicy,
            AllocationMode::Prioritized => &PrioritizedPolicy,
            AllocationMode::BestFit => &BestFitPolicy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationMode::Independent => "independent",
            AllocationMode::Prioritized => "prioritized",
            AllocationMode::BestFit => "best_fit",
        }
    }

    /// Whether the mode reports at most one carrier per SKU.
    pub fn is_exclusive(&self) -> bool {
        !matches!(self, AllocationMode::Independent)
    }
}

impl fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AllocationMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "independent" => Ok(AllocationMode::Independent),
            "prioritized" | "priority" => Ok(AllocationMode::Prioritized),
            "best_fit" | "bestfit" => Ok(AllocationMode::BestFit),
            other => Err(format!(
                "unknown allocation mode '{}' (expected independent, prioritized or best_fit)",
                other
            )),
        }
    }
}

/// Selection step of an allocation run.
///
/// Adding a policy means implementing this trait; evaluation code stays untouched.
pub trait AllocationPolicy: Send + Sync {
    fn mode(&self) -> AllocationMode;

    /// Indices into `carriers` that this policy considers, in the order they are
    /// tried and reported.
    fn considered(&self, carriers: &[&CarrierConfig]) -> Vec<usize>;

    /// Picks the reported results from one SKU's row.
    ///
    /// `row[i]` belongs to `carriers[i]`; `considered` is the output of [`Self::considered`].
    fn select(&self, row: &[CarrierFitResult], considered: &[usize]) -> Vec<CarrierFitResult>;
}

/// Reports every considered carrier, whatever its status.
#[derive(Clone, Copy, Debug, Default)]
pub struct IndependentPolicy;

impl AllocationPolicy for IndependentPolicy {
    fn mode(&self) -> AllocationMode {
        AllocationMode::Independent
    }

    fn considered(&self, carriers: &[&CarrierConfig]) -> Vec<usize> {
        (0..carriers.len()).collect()
    }

    fn select(&self, row: &[CarrierFitResult], considered: &[usize]) -> Vec<CarrierFitResult> {
        considered
            .iter()
            .filter_map(|&idx| row.get(idx))
            .cloned()
            .collect()
    }
}

/// Walks carriers with a priority in ascending order and stops at the first storable one.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrioritizedPolicy;

impl AllocationPolicy for PrioritizedPolicy {
    fn mode(&self) -> AllocationMode {
        AllocationMode::Prioritized
    }

    fn considered(&self, carriers: &[&CarrierConfig]) -> Vec<usize> {
        let mut ranked: Vec<(u32, &str, usize)> = carriers
            .iter()
            .enumerate()
            .filter_map(|(idx, carrier)| carrier.priority.map(|p| (p, carrier.id.as_str(), idx)))
            .collect();
        // Equal priorities fall back to the carrier id.
        ranked.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
        ranked.into_iter().map(|(_, _, idx)| idx).collect()
    }

    fn select(&self, row: &[CarrierFitResult], considered: &[usize]) -> Vec<CarrierFitResult> {
        considered
            .iter()
            .filter_map(|&idx| row.get(idx))
            .find(|result| result.is_storable())
            .cloned()
            .into_iter()
            .collect()
    }
}

/// Picks the storable carrier with the highest filling rate; ties go to the lowest carrier id.
#[derive(Clone, Copy, Debug, Default)]
pub struct BestFitPolicy;

impl AllocationPolicy for BestFitPolicy {
    fn mode(&self) -> AllocationMode {
        AllocationMode::BestFit
    }

    fn considered(&self, carriers: &[&CarrierConfig]) -> Vec<usize> {
        (0..carriers.len()).collect()
    }

    fn select(&self, row: &[CarrierFitResult], considered: &[usize]) -> Vec<CarrierFitResult> {
        considered
            .iter()
            .filter_map(|&idx| row.get(idx))
            .filter(|result| result.is_storable())
            .max_by(|a, b| {
                a.filling_rate
                    .total_cmp(&b.filling_rate)
                    .then_with(|| b.carrier_id.cmp(&a.carrier_id))
            })
            .cloned()
            .into_iter()
            .collect()
    }
}
