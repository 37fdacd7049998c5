//! Orientation generation for placing a SKU into a carrier.
//!
//! An orientation assigns the SKU's three edges to the carrier's length, width and
//! height axes. Candidates are always produced in one canonical order
//! (LWH, LHW, WLH, WHL, HLW, HWL) so that every later tie-break is reproducible.

use std::fmt;

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

use crate::model::LoadingConstraint;
use crate::types::Vec3;

/// One of the SKU's own edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum SkuAxis {
    #[serde(rename = "L")]
    Length,
    #[serde(rename = "W")]
    Width,
    #[serde(rename = "H")]
    Height,
}

impl SkuAxis {
    /// Reads this edge from SKU dimensions given as (length, width, height).
    #[inline]
    pub fn pick(self, sku_dims: Vec3) -> f64 {
        match self {
            SkuAxis::Length => sku_dims.x,
            SkuAxis::Width => sku_dims.y,
            SkuAxis::Height => sku_dims.z,
        }
    }

    fn letter(self) -> char {
        match self {
            SkuAxis::Length => 'L',
            SkuAxis::Width => 'W',
            SkuAxis::Height => 'H',
        }
    }
}

/// SKU edges mapped onto the carrier's (length, width, height) axes.
///
/// `axes[0]` lies along the carrier length, `axes[1]` along its width and
/// `axes[2]` points up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Orientation {
    #[schema(value_type = [SkuAxis; 3], example = json!(["L", "W", "H"]))]
    pub axes: [SkuAxis; 3],
}

use SkuAxis::{Height as H, Length as L, Width as W};

/// All six permutations in canonical order.
pub const CANONICAL_ORIENTATIONS: [Orientation; 6] = [
    Orientation::new(L, W, H),
    Orientation::new(L, H, W),
    Orientation::new(W, L, H),
    Orientation::new(W, H, L),
    Orientation::new(H, L, W),
    Orientation::new(H, W, L),
];

impl Orientation {
    pub const fn new(along_length: SkuAxis, along_width: SkuAxis, vertical: SkuAxis) -> Self {
        Self {
            axes: [along_length, along_width, vertical],
        }
    }

    /// The SKU dimensions as seen along the carrier axes.
    #[inline]
    pub fn apply(&self, sku_dims: Vec3) -> Vec3 {
        Vec3::new(
            self.axes[0].pick(sku_dims),
            self.axes[1].pick(sku_dims),
            self.axes[2].pick(sku_dims),
        )
    }

    /// True when the SKU's own height stays vertical.
    #[inline]
    pub fn is_upright(&self) -> bool {
        self.axes[2] == SkuAxis::Height
    }

    /// Position in the canonical order, used as the last tie-break.
    pub fn canonical_index(&self) -> usize {
        CANONICAL_ORIENTATIONS
            .iter()
            .position(|o| o == self)
            .unwrap_or(CANONICAL_ORIENTATIONS.len())
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for axis in self.axes {
            write!(f, "{}", axis.letter())?;
        }
        Ok(())
    }
}

/// Candidate orientations permitted by a carrier's loading constraint.
///
/// * `Any` - all six permutations, even when edges are equal
/// * `UprightOnly` - the two permutations keeping the SKU height vertical
/// * `FlatOnly` - every permutation whose vertical edge is the SKU's smallest
///   edge; two for distinct edges, more when the smallest edge is tied
///
/// # Examples
/// ```
/// use carrier_fit::geometry::orientations_for;
/// use carrier_fit::model::LoadingConstraint;
/// use carrier_fit::types::Vec3;
///
/// let dims = Vec3::new(100.0, 80.0, 60.0);
/// assert_eq!(orientations_for(dims, LoadingConstraint::Any).len(), 6);
/// assert_eq!(orientations_for(dims, LoadingConstraint::UprightOnly).len(), 2);
/// ```
pub fn orientations_for(sku_dims: Vec3, constraint: LoadingConstraint) -> Vec<Orientation> {
    match constraint {
        LoadingConstraint::Any => CANONICAL_ORIENTATIONS.to_vec(),
        LoadingConstraint::UprightOnly => CANONICAL_ORIENTATIONS
            .iter()
            .copied()
            .filter(Orientation::is_upright)
            .collect(),
        LoadingConstraint::FlatOnly => {
            let smallest = sku_dims.min_component();
            CANONICAL_ORIENTATIONS
                .iter()
                .copied()
                .filter(|o| o.apply(sku_dims).z == smallest)
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(orientations: &[Orientation]) -> Vec<String> {
        orientations.iter().map(|o| o.to_string()).collect()
    }

    #[test]
    fn any_yields_six_in_canonical_order() {
        let result = orientations_for(Vec3::new(100.0, 80.0, 60.0), LoadingConstraint::Any);
        assert_eq!(
            codes(&result),
            vec!["LWH", "LHW", "WLH", "WHL", "HLW", "HWL"]
        );
    }

    #[test]
    fn any_yields_six_even_for_a_cube() {
        let result = orientations_for(Vec3::new(50.0, 50.0, 50.0), LoadingConstraint::Any);
        assert_eq!(result.len(), 6);
    }

    #[test]
    fn upright_keeps_height_vertical() {
        let dims = Vec3::new(100.0, 80.0, 60.0);
        let result = orientations_for(dims, LoadingConstraint::UprightOnly);
        assert_eq!(codes(&result), vec!["LWH", "WLH"]);
        for o in &result {
            assert_eq!(o.apply(dims).z, 60.0);
        }
    }

    #[test]
    fn flat_puts_smallest_edge_vertical() {
        // Height is the largest edge here, so flat must lay the SKU down.
        let dims = Vec3::new(80.0, 30.0, 120.0);
        let result = orientations_for(dims, LoadingConstraint::FlatOnly);
        assert_eq!(codes(&result), vec!["LHW", "HLW"]);
        for o in &result {
            assert_eq!(o.apply(dims).z, 30.0);
        }
    }

    #[test]
    fn flat_with_tied_smallest_edges_yields_more() {
        let dims = Vec3::new(100.0, 50.0, 50.0);
        let result = orientations_for(dims, LoadingConstraint::FlatOnly);
        assert_eq!(codes(&result), vec!["LWH", "LHW", "WLH", "HLW"]);
    }

    #[test]
    fn apply_maps_edges_onto_carrier_axes() {
        let dims = Vec3::new(100.0, 80.0, 60.0);
        let o = Orientation::new(SkuAxis::Height, SkuAxis::Length, SkuAxis::Width);
        assert_eq!(o.apply(dims), Vec3::new(60.0, 100.0, 80.0));
        assert_eq!(o.canonical_index(), 4);
        assert!(!o.is_upright());
    }

    #[test]
    fn orientation_serializes_as_axis_letters() {
        let o = Orientation::new(SkuAxis::Width, SkuAxis::Length, SkuAxis::Height);
        let json = serde_json::to_string(&o).unwrap();
        assert_eq!(json, r#"{"axes":["W","L","H"]}"#);
    }
}
