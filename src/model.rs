//! Data models for the capacity allocation engine.
//!
//! This module defines the typed records the engine works on:
//! - `SkuRecord`: one catalog entry with dimensions, weight and on-hand stock
//! - `CarrierConfig`: a storage carrier type with inner dimensions and limits
//! - `LoadingConstraint`: which SKU rotations a carrier permits
//!
//! Records are validated once at this boundary; the engine never re-checks raw values.

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{Dimensional, Vec3, Weighted};

/// Validation error for SKU, carrier and run data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Duplicate identifier: {0}")]
    DuplicateIdentifier(String),
    #[error("Invalid borderline threshold: {0}")]
    InvalidThreshold(String),
}

fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_weight_value(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidWeight(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_identifier(value: &str, kind: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::InvalidConfiguration(format!(
            "{} identifier must not be empty",
            kind
        )));
    }
    Ok(())
}

/// One stock-keeping unit as delivered by the ingestion pipeline.
///
/// # Fields
/// * `id` - Identifier, unique within a run
/// * `length_mm`, `width_mm`, `height_mm` - Outer dimensions in millimetres
/// * `weight_kg` - Unit weight in kilograms
/// * `stock_qty` - On-hand units (may be 0)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "SKU-0001",
    "length_mm": 100.0,
    "width_mm": 80.0,
    "height_mm": 60.0,
    "weight_kg": 1.0,
    "stock_qty": 500
}))]
pub struct SkuRecord {
    pub id: String,
    pub length_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
    pub weight_kg: f64,
    #[serde(default)]
    pub stock_qty: u64,
}

impl SkuRecord {
    /// Creates a new SKU record with validation.
    ///
    /// # Examples
    /// ```
    /// use carrier_fit::model::SkuRecord;
    ///
    /// let ok = SkuRecord::new("A", (100.0, 80.0, 60.0), 1.0, 500);
    /// assert!(ok.is_ok());
    ///
    /// let invalid = SkuRecord::new("B", (-1.0, 80.0, 60.0), 1.0, 500);
    /// assert!(invalid.is_err());
    /// ```
    pub fn new(
        id: impl Into<String>,
        dims: (f64, f64, f64),
        weight_kg: f64,
        stock_qty: u64,
    ) -> Result<Self, ValidationError> {
        let record = Self {
            id: id.into(),
            length_mm: dims.0,
            width_mm: dims.1,
            height_mm: dims.2,
            weight_kg,
            stock_qty,
        };
        record.validate()?;
        Ok(record)
    }

    /// Checks that the identifier is present and all physical fields are positive.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_identifier(&self.id, "SKU")?;
        validate_dimension(self.length_mm, &format!("SKU '{}' length", self.id))?;
        validate_dimension(self.width_mm, &format!("SKU '{}' width", self.id))?;
        validate_dimension(self.height_mm, &format!("SKU '{}' height", self.id))?;
        validate_weight_value(self.weight_kg, &format!("SKU '{}' weight", self.id))?;
        Ok(())
    }

    /// Unit volume in m³ (L × W × H / 1e9).
    #[inline]
    pub fn unit_volume_m3(&self) -> f64 {
        self.volume_m3()
    }

    /// Volume of the whole on-hand stock in m³.
    #[inline]
    pub fn stock_volume_m3(&self) -> f64 {
        self.stock_qty as f64 * self.unit_volume_m3()
    }

    /// Converts the dimensions to a Vec3 in (length, width, height) order.
    #[inline]
    pub fn dims_as_vec3(&self) -> Vec3 {
        Vec3::new(self.length_mm, self.width_mm, self.height_mm)
    }
}

impl Dimensional for SkuRecord {
    fn dimensions(&self) -> Vec3 {
        self.dims_as_vec3()
    }
}

impl Weighted for SkuRecord {
    fn weight(&self) -> f64 {
        self.weight_kg
    }
}

/// Which rotations of a SKU a carrier accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadingConstraint {
    /// All six axis permutations.
    #[default]
    Any,
    /// The SKU's own height stays vertical.
    UprightOnly,
    /// The SKU's smallest edge is vertical.
    FlatOnly,
}

fn default_active() -> bool {
    true
}

/// A storage carrier type (tray, tote, bin location).
///
/// `priority` is only consulted in prioritized allocation; carriers without one are
/// skipped by that mode. Inactive carriers take part in no computation at all.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "TRAY_600",
    "name": "Tray 600x400x220",
    "inner_length_mm": 570.0,
    "inner_width_mm": 370.0,
    "inner_height_mm": 200.0,
    "max_weight_kg": 35.0,
    "loading_constraint": "ANY",
    "priority": 1,
    "active": true
}))]
pub struct CarrierConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub inner_length_mm: f64,
    pub inner_width_mm: f64,
    pub inner_height_mm: f64,
    pub max_weight_kg: f64,
    #[serde(default)]
    pub loading_constraint: LoadingConstraint,
    #[serde(default)]
    pub priority: Option<u32>,
    #[serde(default)]
    pub is_predefined: bool,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Number of locations of this type available in the installation.
    #[serde(default)]
    pub available_locations: Option<u64>,
}

impl CarrierConfig {
    /// Creates an active carrier accepting any orientation, after validating the parameters.
    ///
    /// # Parameters
    /// * `id` - Unique carrier identifier
    /// * `name` - Display name
    /// * `inner_dims` - Inner (length, width, height) in mm
    /// * `max_weight_kg` - Weight limit for a single unit
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        inner_dims: (f64, f64, f64),
        max_weight_kg: f64,
    ) -> Result<Self, ValidationError> {
        let carrier = Self {
            id: id.into(),
            name: name.into(),
            inner_length_mm: inner_dims.0,
            inner_width_mm: inner_dims.1,
            inner_height_mm: inner_dims.2,
            max_weight_kg,
            loading_constraint: LoadingConstraint::Any,
            priority: None,
            is_predefined: false,
            active: true,
            available_locations: None,
        };
        carrier.validate()?;
        Ok(carrier)
    }

    /// Sets the loading constraint (Builder pattern light).
    pub fn with_constraint(mut self, constraint: LoadingConstraint) -> Self {
        self.loading_constraint = constraint;
        self
    }

    /// Sets the priority used by prioritized allocation.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the number of available locations of this type.
    pub fn with_available_locations(mut self, locations: u64) -> Self {
        self.available_locations = Some(locations);
        self
    }

    /// Sets the active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Marks the carrier as part of the predefined catalog.
    pub fn predefined(mut self) -> Self {
        self.is_predefined = true;
        self
    }

    /// Rejects carriers whose values would corrupt margin or volume math.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_identifier(&self.id, "Carrier")?;
        validate_dimension(
            self.inner_length_mm,
            &format!("Carrier '{}' inner length", self.id),
        )?;
        validate_dimension(
            self.inner_width_mm,
            &format!("Carrier '{}' inner width", self.id),
        )?;
        validate_dimension(
            self.inner_height_mm,
            &format!("Carrier '{}' inner height", self.id),
        )?;
        validate_weight_value(
            self.max_weight_kg,
            &format!("Carrier '{}' max weight", self.id),
        )?;
        if self.priority == Some(0) {
            return Err(ValidationError::InvalidConfiguration(format!(
                "Carrier '{}' priority must be at least 1 (omit it to exclude the carrier from prioritized allocation)",
                self.id
            )));
        }
        if self.available_locations == Some(0) {
            return Err(ValidationError::InvalidConfiguration(format!(
                "Carrier '{}' available locations must be at least 1",
                self.id
            )));
        }
        Ok(())
    }

    /// Inner volume in m³.
    #[inline]
    pub fn inner_volume_m3(&self) -> f64 {
        self.volume_m3()
    }

    /// Converts the inner dimensions to a Vec3.
    #[inline]
    pub fn inner_dims(&self) -> Vec3 {
        Vec3::new(
            self.inner_length_mm,
            self.inner_width_mm,
            self.inner_height_mm,
        )
    }

    /// Name for display, falling back to the identifier.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

impl Dimensional for CarrierConfig {
    fn dimensions(&self) -> Vec3 {
        self.inner_dims()
    }
}
