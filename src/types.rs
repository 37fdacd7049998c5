//! Common types and traits for carrier geometry.
//!
//! All lengths are millimetres and all weights kilograms. Volumes reported to
//! callers are cubic metres, see [`MM3_PER_M3`].

use std::ops::Sub;

/// Global numerical tolerance for floating-point comparisons.
///
/// Margins closer to zero than this are treated as an exact fit.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// Cubic millimetres per cubic metre.
pub const MM3_PER_M3: f64 = 1_000_000_000.0;

/// Three lengths along the carrier's length, width and height axes.
///
/// # Examples
/// ```
/// use carrier_fit::types::Vec3;
///
/// let inner = Vec3::new(570.0, 370.0, 200.0);
/// let item = Vec3::new(100.0, 80.0, 60.0);
/// let margins = inner - item;
/// assert_eq!(margins, Vec3::new(470.0, 290.0, 140.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Creates a new vector.
    ///
    /// # Parameters
    /// * `x` - Length axis
    /// * `y` - Width axis
    /// * `z` - Height axis
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Converts to tuple format for API responses.
    #[inline]
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }

    /// Product of all components (volume in mm³ for dimension vectors).
    #[inline]
    pub fn volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Smallest component.
    #[inline]
    pub fn min_component(&self) -> f64 {
        self.x.min(self.y).min(self.z)
    }

    /// Snaps components within `tolerance` of zero to exactly zero.
    #[inline]
    pub fn snap_to_zero(self, tolerance: f64) -> Self {
        let snap = |v: f64| if v.abs() < tolerance { 0.0 } else { v };
        Self::new(snap(self.x), snap(self.y), snap(self.z))
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Trait for objects with 3D dimensions in millimetres.
pub trait Dimensional {
    /// Returns the dimensions of the object.
    fn dimensions(&self) -> Vec3;

    /// Volume in cubic metres.
    fn volume_m3(&self) -> f64 {
        self.dimensions().volume() / MM3_PER_M3
    }

    /// Largest single edge.
    fn longest_edge(&self) -> f64 {
        let d = self.dimensions();
        d.x.max(d.y).max(d.z)
    }
}

/// Trait for objects with weight (or a weight limit).
pub trait Weighted {
    /// Returns the weight in kg.
    fn weight(&self) -> f64;
}
