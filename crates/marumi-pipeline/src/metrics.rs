//! Shape metrics: area, perimeter, circularity, and convex-hull ratios.
//!
//! Circularity is `2·sqrt(π·A)/P` for enclosed area `A` and perimeter
//! `P` — exactly 1.0 for an ideal circle and in (0, 1] for any simple
//! closed curve, since a circle minimizes perimeter for a given area.
//! The convex hull of a contour has area ≥ and perimeter ≤ the contour
//! itself, so `area_ratio ≥ 1.0` and convexification never lowers
//! circularity. The hull/original ratios measure how concave (and so
//! how defocused or distorted) the segmented object is.

use std::f64::consts::PI;

use geo::{ConvexHull, MultiPoint};

use crate::types::{Point, PipelineError, ShapeMetrics};

/// Area below which a contour is considered degenerate.
const DEGENERATE_AREA: f64 = 1e-9;

/// Perimeter below which a contour is considered degenerate.
const DEGENERATE_PERIMETER: f64 = 1e-9;

/// Enclosed area of an ordered closed point sequence, by the shoelace
/// (Green's theorem) formula. Orientation-independent.
#[must_use]
pub fn shoelace_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        twice_area += p.x.mul_add(q.y, -(q.x * p.y));
    }
    twice_area.abs() / 2.0
}

/// Closed-loop perimeter: Euclidean distances between consecutive
/// points, wrapping last→first.
#[must_use]
pub fn closed_perimeter(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        total += p.distance(q);
    }
    total
}

/// Circularity `2·sqrt(π·area)/perimeter`.
///
/// The caller guards against zero perimeter; this function assumes
/// `perimeter > 0`.
fn circularity(area: f64, perimeter: f64) -> f64 {
    2.0 * (PI * area).sqrt() / perimeter
}

/// Convex hull of a contour's point set.
///
/// Returns the hull vertices in counter-clockwise order without a
/// closing duplicate of the first point, so the shoelace and
/// closed-perimeter formulas apply unchanged.
#[must_use]
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let multipoint: MultiPoint<f64> = points
        .iter()
        .map(|p| geo::Point::new(p.x, p.y))
        .collect::<Vec<_>>()
        .into();
    let hull = multipoint.convex_hull();

    let ring = hull.exterior();
    let mut vertices: Vec<Point> = ring.coords().map(|c| Point::new(c.x, c.y)).collect();
    // The exterior ring closes on itself; drop the repeated endpoint.
    if vertices.len() >= 2 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    vertices
}

/// Compute [`ShapeMetrics`] for a selected contour.
///
/// Steps: shoelace area and closed perimeter of the contour, its
/// circularity, the convex hull, the same three quantities on the
/// hull, and the hull/original ratios.
///
/// # Errors
///
/// Returns [`PipelineError::DegenerateContour`] when the contour or
/// its hull encloses (near-)zero area or has (near-)zero perimeter —
/// checked before any division so no infinity or NaN can escape.
pub fn compute(contour: &[Point]) -> Result<ShapeMetrics, PipelineError> {
    let hull = convex_hull(contour);
    compute_with_hull(contour, &hull)
}

/// [`compute`] with a precomputed convex hull, for callers that keep
/// the hull around (the staged pipeline surfaces).
///
/// # Errors
///
/// Same conditions as [`compute`].
pub fn compute_with_hull(contour: &[Point], hull: &[Point]) -> Result<ShapeMetrics, PipelineError> {
    let area_original = shoelace_area(contour);
    let perimeter_original = closed_perimeter(contour);
    if area_original < DEGENERATE_AREA || perimeter_original < DEGENERATE_PERIMETER {
        return Err(PipelineError::DegenerateContour);
    }
    let circularity_original = circularity(area_original, perimeter_original);

    let area_hull = shoelace_area(hull);
    let perimeter_hull = closed_perimeter(hull);
    if area_hull < DEGENERATE_AREA || perimeter_hull < DEGENERATE_PERIMETER {
        return Err(PipelineError::DegenerateContour);
    }
    let circularity_hull = circularity(area_hull, perimeter_hull);

    Ok(ShapeMetrics {
        area_original,
        perimeter_original,
        circularity_original,
        area_hull,
        perimeter_hull,
        circularity_hull,
        area_ratio: area_hull / area_original,
        circularity_ratio: circularity_hull / circularity_original,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]
    }

    /// Concave L-shape: the unit square with one quadrant bitten out.
    fn l_shape() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 5.0),
            Point::new(5.0, 5.0),
            Point::new(5.0, 10.0),
            Point::new(0.0, 10.0),
        ]
    }

    /// `n` points sampled exactly on a circle of radius `r`.
    #[allow(clippy::cast_precision_loss)]
    fn sampled_circle(r: f64, n: usize) -> Vec<Point> {
        (0..n)
            .map(|i| {
                let theta = 2.0 * PI * (i as f64) / (n as f64);
                Point::new(r * theta.cos(), r * theta.sin())
            })
            .collect()
    }

    #[test]
    fn square_area_and_perimeter() {
        let square = unit_square();
        assert!((shoelace_area(&square) - 100.0).abs() < 1e-12);
        assert!((closed_perimeter(&square) - 40.0).abs() < 1e-12);
    }

    #[test]
    fn orientation_does_not_change_area() {
        let mut square = unit_square();
        square.reverse();
        assert!((shoelace_area(&square) - 100.0).abs() < 1e-12);
    }

    #[test]
    fn square_circularity_matches_closed_form() {
        // 2·sqrt(π·100)/40 = sqrt(π)/2 ≈ 0.8862.
        let metrics = compute(&unit_square()).unwrap();
        let expected = PI.sqrt() / 2.0;
        assert!((metrics.circularity_original - expected).abs() < 1e-12);
    }

    #[test]
    fn sampled_circle_circularity_near_one() {
        // A finely sampled exact circle is as round as a polygon gets;
        // only the finite sampling keeps it below 1.0.
        let metrics = compute(&sampled_circle(200.0, 512)).unwrap();
        assert!(
            metrics.circularity_original > 0.99 && metrics.circularity_original <= 1.0,
            "got {}",
            metrics.circularity_original,
        );
    }

    #[test]
    fn convex_square_is_its_own_hull() {
        let metrics = compute(&unit_square()).unwrap();
        assert!((metrics.area_ratio - 1.0).abs() < 1e-9);
        assert!((metrics.circularity_ratio - 1.0).abs() < 1e-9);
        assert!((metrics.area_hull - metrics.area_original).abs() < 1e-9);
    }

    #[test]
    fn hull_of_concave_shape_dominates_original() {
        let metrics = compute(&l_shape()).unwrap();
        // L-shape area 75; the hull of its vertices is the pentagon
        // (0,0) (10,0) (10,5) (5,10) (0,10) with area 87.5.
        assert!((metrics.area_original - 75.0).abs() < 1e-9);
        assert!((metrics.area_hull - 87.5).abs() < 1e-9);
        assert!(metrics.area_ratio >= 1.0);
        assert!(metrics.perimeter_hull <= metrics.perimeter_original);
        assert!(metrics.circularity_hull >= metrics.circularity_original);
        assert!(metrics.circularity_ratio >= 1.0);
    }

    #[test]
    fn hull_is_counter_clockwise_without_closing_point() {
        let hull = convex_hull(&l_shape());
        assert_eq!(hull.len(), 5, "hull of the L-shape vertices is a pentagon");
        assert_ne!(hull.first(), hull.last());
        // CCW orientation: positive signed area.
        let mut twice_signed = 0.0;
        for (i, p) in hull.iter().enumerate() {
            let q = hull[(i + 1) % hull.len()];
            twice_signed += p.x.mul_add(q.y, -(q.x * p.y));
        }
        assert!(twice_signed > 0.0, "expected CCW hull, got {twice_signed}");
    }

    #[test]
    fn two_point_contour_is_degenerate() {
        let contour = [Point::new(0.0, 0.0), Point::new(5.0, 5.0)];
        assert!(matches!(
            compute(&contour),
            Err(PipelineError::DegenerateContour)
        ));
    }

    #[test]
    fn repeated_single_point_is_degenerate() {
        let contour = [Point::new(3.0, 3.0); 4];
        assert!(matches!(
            compute(&contour),
            Err(PipelineError::DegenerateContour)
        ));
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let contour = [
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 0.0),
        ];
        assert!(matches!(
            compute(&contour),
            Err(PipelineError::DegenerateContour)
        ));
    }

    #[test]
    fn metrics_are_deterministic() {
        let a = compute(&l_shape()).unwrap();
        let b = compute(&l_shape()).unwrap();
        assert_eq!(a, b);
    }
}
