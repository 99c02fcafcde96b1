//! Axis-aligned bounding boxes.
//!
//! Cheap prefilter ahead of the exact point-in-polygon test: a point
//! outside a polygon's bounding box cannot be inside the polygon.

use geo::BoundingRect;
use geo_types::Geometry;

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BBox {
    /// Compute from a geometry. `None` for empty geometries.
    pub fn from_geometry(geom: &Geometry<f64>) -> Option<Self> {
        let rect = geom.bounding_rect()?;
        Some(Self {
            min_lat: rect.min().y,
            max_lat: rect.max().y,
            min_lng: rect.min().x,
            max_lng: rect.max().x,
        })
    }

    /// Check if this bbox contains a point. Boundary counts.
    pub fn contains_point(&self, lat: f64, lng: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lng >= self.min_lng && lng <= self.max_lng
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detfeat_census::block_set::parse_wkt;

    #[test]
    fn test_bbox_from_polygon() {
        let geom = parse_wkt("POLYGON((0 0, 10 0, 10 20, 0 20, 0 0))").unwrap();
        let bbox = BBox::from_geometry(&geom).unwrap();
        assert_eq!(bbox.min_lng, 0.0);
        assert_eq!(bbox.max_lng, 10.0);
        assert_eq!(bbox.min_lat, 0.0);
        assert_eq!(bbox.max_lat, 20.0);
    }

    #[test]
    fn test_contains_point_includes_boundary() {
        let geom = parse_wkt("POLYGON((0 0, 10 0, 10 20, 0 20, 0 0))").unwrap();
        let bbox = BBox::from_geometry(&geom).unwrap();
        assert!(bbox.contains_point(5.0, 5.0));
        assert!(bbox.contains_point(0.0, 10.0));
        assert!(!bbox.contains_point(20.5, 5.0));
    }
}
