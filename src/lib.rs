//! Capacity allocation engine: decides which storage carriers can hold each SKU,
//! in which orientation, and how many locations the on-hand stock needs.
//!
//! Pipeline per run: `geometry` (orientations) → `fit` (classification and best
//! orientation) → `capacity` (units, locations, filling rate) → `policy`
//! (assignment) → `stats` (per-carrier aggregation), with `outliers` as a side
//! query over the same evaluations. `allocator` ties the stages together.

pub mod allocator;
pub mod api;
pub mod capacity;
pub mod catalog;
pub mod config;
pub mod fit;
pub mod geometry;
pub mod model;
pub mod outliers;
pub mod policy;
pub mod stats;
pub mod types;

pub use allocator::{AllocationConfig, AllocationResult, allocate, allocate_with_progress};
pub use model::{CarrierConfig, LoadingConstraint, SkuRecord, ValidationError};
pub use policy::AllocationMode;
