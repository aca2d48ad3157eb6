// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Projected tile outlines.

use kurbo::{BezPath, Point, Rect};
use tessera_geo::{LatLon, Projection};
use thiserror::Error;

use crate::key::SpatialKey;
use crate::util::overlaps;

/// Why a key could not produce a usable outline.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum Degenerate {
    /// A projected point was NaN or infinite.
    #[error("projected outline is not finite")]
    NonFinite,
    /// The projected corners enclose no area.
    #[error("projected outline has zero area")]
    ZeroArea,
    /// The projected corners wind clockwise, i.e. the tile is seen from behind.
    #[error("projected outline is inverted")]
    Inverted,
}

/// The screen-space outline of one [`SpatialKey`] under a projection.
///
/// Each edge of the geographic box is sampled, so curved edges under
/// non-linear projections are approximated by a polyline rather than a chord.
/// The ring runs sw → se → ne → nw and is implicitly closed.
#[derive(Clone, Debug, PartialEq)]
pub struct VisibilityPolygon {
    points: Vec<Point>,
    bounds: Rect,
}

impl VisibilityPolygon {
    /// Project `key` and build its outline.
    ///
    /// Every edge is split into `edge_samples` segments; `0` is treated as `1`,
    /// which keeps only the corners.
    pub fn build(
        key: &SpatialKey,
        projection: &dyn Projection,
        edge_samples: usize,
    ) -> Result<Self, Degenerate> {
        let corners = key.corners();
        let projected = corners.map(|c| projection.project(c));
        if projected.iter().any(|p| !p.is_finite()) {
            return Err(Degenerate::NonFinite);
        }
        let area = signed_area(&projected);
        if area == 0.0 {
            return Err(Degenerate::ZeroArea);
        }
        if area < 0.0 {
            return Err(Degenerate::Inverted);
        }

        let samples = edge_samples.max(1);
        let mut points = Vec::with_capacity(4 * samples);
        for (i, &start) in corners.iter().enumerate() {
            let end = corners[(i + 1) % 4];
            points.push(projected[i]);
            for step in 1..samples {
                let t = step as f64 / samples as f64;
                let at = LatLon::new(
                    start.lat + (end.lat - start.lat) * t,
                    start.lon + (end.lon - start.lon) * t,
                );
                let p = projection.project(at);
                if !p.is_finite() {
                    return Err(Degenerate::NonFinite);
                }
                points.push(p);
            }
        }

        let bounds = points
            .iter()
            .skip(1)
            .fold(Rect::from_points(points[0], points[0]), |r, &p| {
                r.union_pt(p)
            });
        Ok(Self { points, bounds })
    }

    /// Outline vertices, without repeating the first one at the end.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Axis-aligned bounds of the outline.
    pub const fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Enclosed area in plane units squared.
    pub fn area(&self) -> f64 {
        signed_area(&self.points).abs()
    }

    /// Even-odd point containment.
    pub fn contains_point(&self, point: Point) -> bool {
        if !overlaps(&self.bounds, &Rect::from_points(point, point)) {
            return false;
        }
        let mut inside = false;
        let n = self.points.len();
        let mut j = n - 1;
        for i in 0..n {
            let (a, b) = (self.points[i], self.points[j]);
            if (a.y > point.y) != (b.y > point.y) {
                let x = a.x + (point.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if point.x < x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Whether the outline and `rect` share any point (edges inclusive).
    pub fn intersects_rect(&self, rect: &Rect) -> bool {
        let rect = rect.abs();
        if !overlaps(&self.bounds, &rect) {
            return false;
        }
        let in_rect =
            |p: &Point| rect.x0 <= p.x && p.x <= rect.x1 && rect.y0 <= p.y && p.y <= rect.y1;
        if self.points.iter().any(in_rect) {
            return true;
        }
        let rect_corners = [
            Point::new(rect.x0, rect.y0),
            Point::new(rect.x1, rect.y0),
            Point::new(rect.x1, rect.y1),
            Point::new(rect.x0, rect.y1),
        ];
        if rect_corners.iter().any(|&c| self.contains_point(c)) {
            return true;
        }
        let n = self.points.len();
        (0..n).any(|i| {
            let (a, b) = (self.points[i], self.points[(i + 1) % n]);
            (0..4).any(|k| segments_intersect(a, b, rect_corners[k], rect_corners[(k + 1) % 4]))
        })
    }

    /// The outline as a closed path, e.g. for debug overlays.
    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let mut iter = self.points.iter();
        if let Some(&first) = iter.next() {
            path.move_to(first);
            for &p in iter {
                path.line_to(p);
            }
            path.close_path();
        }
        path
    }
}

/// Shoelace sum over a closed ring; positive for counter-clockwise in a y-up plane.
fn signed_area(ring: &[Point]) -> f64 {
    let n = ring.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let (a, b) = (ring[i], ring[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum();
    0.5 * twice
}

fn orient(a: Point, b: Point, c: Point) -> f64 {
    (b - a).cross(c - a)
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    a.x.min(b.x) <= p.x && p.x <= a.x.max(b.x) && a.y.min(b.y) <= p.y && p.y <= a.y.max(b.y)
}

fn segments_intersect(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_geo::{PlateCarree, TangentPlane};

    #[derive(Debug)]
    struct MirrorX;

    impl Projection for MirrorX {
        fn project(&self, at: LatLon) -> Point {
            Point::new(-at.lon, at.lat)
        }

        fn unproject(&self, point: Point) -> LatLon {
            LatLon::new(point.y, -point.x)
        }
    }

    fn key(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> SpatialKey {
        SpatialKey::new(1.0, min_lat, max_lat, min_lon, max_lon).unwrap()
    }

    #[test]
    fn samples_every_edge() {
        let poly = VisibilityPolygon::build(&key(0.0, 10.0, 0.0, 10.0), &PlateCarree::new(), 5)
            .unwrap();
        assert_eq!(poly.points().len(), 20, "4 corners plus 4 interior points per edge");
        assert_eq!(
            poly.bounds(),
            Rect::new(0.0, 0.0, 10.0, 10.0),
            "bounds match the key"
        );
        assert!((poly.area() - 100.0).abs() < 1e-9, "area is {}", poly.area());

        let corners_only =
            VisibilityPolygon::build(&key(0.0, 10.0, 0.0, 10.0), &PlateCarree::new(), 0).unwrap();
        assert_eq!(corners_only.points().len(), 4, "zero samples keeps the corners");
    }

    #[test]
    fn rejects_inverted_and_flat_outlines() {
        assert_eq!(
            VisibilityPolygon::build(&key(0.0, 10.0, 0.0, 10.0), &MirrorX, 5),
            Err(Degenerate::Inverted),
            "a mirroring projection turns the ring clockwise"
        );
        assert_eq!(
            VisibilityPolygon::build(&key(5.0, 5.0, 0.0, 10.0), &PlateCarree::new(), 5),
            Err(Degenerate::ZeroArea),
            "a key with no latitude extent is flat"
        );
    }

    #[test]
    fn far_side_of_tangent_plane_is_dropped() {
        let plane = TangentPlane::new(LatLon::new(0.0, 10.0));
        let near = VisibilityPolygon::build(&key(-5.0, 5.0, 5.0, 15.0), &plane, 5);
        assert!(near.is_ok(), "tile under the tangent point must be kept");
        // This tile contains the antipode (0, -170), so it wraps the plane inside out.
        let far = VisibilityPolygon::build(&key(-5.0, 5.0, -175.0, -165.0), &plane, 5);
        assert_eq!(far, Err(Degenerate::Inverted), "tile behind the globe must be dropped");
    }

    #[test]
    fn whole_globe_outline_is_finite() {
        let poly = VisibilityPolygon::build(&key(-90.0, 90.0, -180.0, 180.0), &PlateCarree::new(), 5)
            .unwrap();
        assert!(
            poly.points().iter().all(|p| p.is_finite()),
            "clamped corners must project to finite points"
        );
        let b = poly.bounds();
        assert!(b.x0 > -180.0 && b.x1 < 180.0, "bounds clamped: {b:?}");
    }

    #[test]
    fn contains_point_even_odd() {
        let poly = VisibilityPolygon::build(&key(0.0, 10.0, 0.0, 10.0), &PlateCarree::new(), 5)
            .unwrap();
        assert!(poly.contains_point(Point::new(5.0, 5.0)), "center");
        assert!(!poly.contains_point(Point::new(15.0, 5.0)), "outside");
        assert!(!poly.contains_point(Point::new(-1.0, -1.0)), "outside bounds");
    }

    #[test]
    fn rect_intersection_cases() {
        let poly = VisibilityPolygon::build(&key(0.0, 10.0, 0.0, 10.0), &PlateCarree::new(), 5)
            .unwrap();
        assert!(
            poly.intersects_rect(&Rect::new(4.0, 4.0, 6.0, 6.0)),
            "rect inside polygon"
        );
        assert!(
            poly.intersects_rect(&Rect::new(-50.0, -50.0, 50.0, 50.0)),
            "polygon inside rect"
        );
        assert!(
            poly.intersects_rect(&Rect::new(10.0, 2.0, 20.0, 3.0)),
            "touching edge"
        );
        assert!(
            !poly.intersects_rect(&Rect::new(11.0, 0.0, 20.0, 10.0)),
            "disjoint"
        );
    }

    #[test]
    fn crossing_edges_without_contained_vertices() {
        // A diamond around (0, 0) against a thin horizontal bar: no vertex of
        // either shape lies inside the other, only the edges cross.
        #[derive(Debug)]
        struct Rotate45;
        impl Projection for Rotate45 {
            fn project(&self, at: LatLon) -> Point {
                Point::new(at.lon - at.lat, at.lon + at.lat)
            }
            fn unproject(&self, point: Point) -> LatLon {
                LatLon::new(0.5 * (point.y - point.x), 0.5 * (point.x + point.y))
            }
        }
        let diamond = VisibilityPolygon::build(&key(-1.0, 1.0, -1.0, 1.0), &Rotate45, 1).unwrap();
        // Diamond vertices at (0,-2), (2,0), (0,2), (-2,0).
        let bar = Rect::new(0.5, -10.0, 1.0, 10.0);
        assert!(
            !diamond.points().iter().any(|p| bar.contains(*p)),
            "no diamond vertex inside the bar"
        );
        assert!(diamond.intersects_rect(&bar), "edges cross");
    }

    #[test]
    fn path_is_closed() {
        let poly = VisibilityPolygon::build(&key(0.0, 1.0, 0.0, 1.0), &PlateCarree::new(), 2)
            .unwrap();
        let path = poly.to_path();
        assert_eq!(path.elements().len(), 8 + 1, "move, 7 lines, close");
    }
}
