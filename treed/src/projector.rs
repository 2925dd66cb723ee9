//! Geographic to pixel coordinate projection.
//!
//! A raster's 6-parameter geo-transform maps pixel coordinates to
//! geographic/projected coordinates:
//!
//! ```text
//! x_geo = gt[0] + col * gt[1] + row * gt[2]
//! y_geo = gt[3] + col * gt[4] + row * gt[5]
//! ```
//!
//! The projector inverts that mapping once and applies the inverse to each
//! polygon vertex, yielding pixel-space outlines plus their bounding box and
//! shoelace area.

use gdal::GeoTransform;
use geo_types::Coord;

use crate::TreedError;

/// A polygon exterior ring projected into pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRing {
    /// Pixel-space vertices, in input order.
    pub vertices: Vec<Coord<f64>>,
    /// Axis-aligned `[min_x, min_y, width, height]`.
    pub bbox: [f64; 4],
    /// Ring area in square pixels.
    pub area: f64,
}

/// Projects geographic vertices into pixel space through the inverse of a
/// raster geo-transform.
#[derive(Debug, Clone, Copy)]
pub struct PixelProjector {
    forward: GeoTransform,
    inverse: GeoTransform,
}

impl PixelProjector {
    /// Creates a projector from a raster geo-transform.
    ///
    /// Fails if the transform is singular or not finite.
    pub fn new(transform: GeoTransform) -> Result<PixelProjector, TreedError> {
        let inverse = invert(&transform).ok_or_else(|| {
            TreedError::Geometry(format!("geo-transform {transform:?} is not invertible"))
        })?;
        Ok(PixelProjector {
            forward: transform,
            inverse,
        })
    }

    /// Pixel coordinates of a single geographic point.
    pub fn to_pixel(&self, point: Coord<f64>) -> Coord<f64> {
        apply(&self.inverse, point)
    }

    /// Geographic coordinates of a single pixel point.
    pub fn to_geo(&self, point: Coord<f64>) -> Coord<f64> {
        apply(&self.forward, point)
    }

    /// Projects a polygon exterior ring into pixel space.
    ///
    /// Vertex order is preserved, including the closing vertex when the
    /// input carries one. Fails on rings with fewer than 3 distinct
    /// vertices or vertices that do not project to finite coordinates.
    pub fn project_ring(&self, ring: &[Coord<f64>]) -> Result<ProjectedRing, TreedError> {
        let vertices: Vec<Coord<f64>> = ring.iter().map(|v| self.to_pixel(*v)).collect();

        if vertices.iter().any(|v| !v.x.is_finite() || !v.y.is_finite()) {
            return Err(TreedError::Geometry(
                "ring projects to non-finite pixel coordinates".into(),
            ));
        }

        let mut distinct: Vec<Coord<f64>> = Vec::new();
        for v in &vertices {
            if !distinct.contains(v) {
                distinct.push(*v);
            }
        }
        if distinct.len() < 3 {
            return Err(TreedError::Geometry(format!(
                "ring has only {} distinct vertices",
                distinct.len()
            )));
        }

        Ok(ProjectedRing {
            bbox: bounding_box(&vertices),
            area: shoelace_area(&vertices),
            vertices,
        })
    }
}

fn apply(gt: &GeoTransform, point: Coord<f64>) -> Coord<f64> {
    Coord {
        x: gt[0] + point.x * gt[1] + point.y * gt[2],
        y: gt[3] + point.x * gt[4] + point.y * gt[5],
    }
}

fn invert(gt: &GeoTransform) -> Option<GeoTransform> {
    let det = gt[1] * gt[5] - gt[2] * gt[4];
    if !det.is_finite() || det == 0.0 {
        return None;
    }

    let inv = [
        (gt[2] * gt[3] - gt[0] * gt[5]) / det,
        gt[5] / det,
        -gt[2] / det,
        (gt[0] * gt[4] - gt[1] * gt[3]) / det,
        -gt[4] / det,
        gt[1] / det,
    ];
    inv.iter().all(|v| v.is_finite()).then_some(inv)
}

fn bounding_box(vertices: &[Coord<f64>]) -> [f64; 4] {
    let mut min = vertices[0];
    let mut max = vertices[0];
    for v in vertices {
        min.x = min.x.min(v.x);
        min.y = min.y.min(v.y);
        max.x = max.x.max(v.x);
        max.y = max.y.max(v.y);
    }
    [min.x, min.y, max.x - min.x, max.y - min.y]
}

/// Shoelace formula over the closed ring. The input ring may or may not
/// repeat its first vertex; the wrap-around edge covers both cases.
fn shoelace_area(vertices: &[Coord<f64>]) -> f64 {
    let mut doubled = 0.0;
    for (i, a) in vertices.iter().enumerate() {
        let b = vertices[(i + 1) % vertices.len()];
        doubled += a.x * b.y - b.x * a.y;
    }
    (doubled / 2.0).abs()
}
