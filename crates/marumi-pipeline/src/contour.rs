//! Contour extraction: trace closed boundaries in a binary edge map.
//!
//! Uses Suzuki-Abe border following via
//! [`imageproc::contours::find_contours`], keeping only top-level
//! outer borders — nested and hole boundaries are discarded, matching
//! external-retrieval semantics.
//!
//! Contours are stored in a [`ContourSet`]: a single flat point buffer
//! with per-contour extents, addressed by [`ContourId`] handles. Batch
//! runs produce many short-lived contours, and the arena keeps them in
//! one allocation instead of one `Vec` per contour.

use image::GrayImage;
use imageproc::contours::BorderType;

use crate::metrics::shoelace_area;
use crate::types::Point;

/// Handle for a contour inside a [`ContourSet`].
///
/// Only valid for the set that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContourId(usize);

/// Arena of contour point sequences.
///
/// Point order within each contour is the boundary traversal order and
/// is significant: perimeter and shoelace area are computed over the
/// ordered sequence with an implicit closing segment.
#[derive(Debug, Clone, Default)]
pub struct ContourSet {
    points: Vec<Point>,
    ends: Vec<usize>,
}

impl ContourSet {
    /// Create an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            points: Vec::new(),
            ends: Vec::new(),
        }
    }

    /// Number of contours in the set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.ends.len()
    }

    /// Returns `true` if the set holds no contours.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// Total number of points across all contours.
    #[must_use]
    pub const fn total_points(&self) -> usize {
        self.points.len()
    }

    /// Append a contour, returning its handle.
    pub fn push<I: IntoIterator<Item = Point>>(&mut self, contour: I) -> ContourId {
        self.points.extend(contour);
        self.ends.push(self.points.len());
        ContourId(self.ends.len() - 1)
    }

    /// The point slice of one contour.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this set. Use
    /// [`try_get`](Self::try_get) when the handle's origin is uncertain.
    #[must_use]
    pub fn get(&self, id: ContourId) -> &[Point] {
        let end = self.ends[id.0];
        let start = if id.0 == 0 { 0 } else { self.ends[id.0 - 1] };
        &self.points[start..end]
    }

    /// Checked variant of [`get`](Self::get): `None` if `id` is out of
    /// range for this set.
    ///
    /// A handle is only meaningful for the set that produced it; one
    /// taken from another set may still resolve here, to an unrelated
    /// contour.
    #[must_use]
    pub fn try_get(&self, id: ContourId) -> Option<&[Point]> {
        let end = *self.ends.get(id.0)?;
        let start = if id.0 == 0 { 0 } else { self.ends[id.0 - 1] };
        Some(&self.points[start..end])
    }

    /// Iterate over contour handles in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = ContourId> + '_ {
        (0..self.ends.len()).map(ContourId)
    }

    /// Iterate over contour point slices in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &[Point]> + '_ {
        self.ids().map(|id| self.get(id))
    }
}

/// Trace all external contours in a binary edge map.
///
/// Nonzero pixels are foreground. Only outer borders of top-level
/// connected components are kept; hole borders and borders nested
/// inside holes are dropped. Contours of fewer than two points carry
/// no boundary information and are skipped.
#[must_use = "returns the traced contour set"]
pub fn find_external(edges: &GrayImage) -> ContourSet {
    let traced: Vec<imageproc::contours::Contour<u32>> =
        imageproc::contours::find_contours(edges);

    let mut set = ContourSet::new();
    for contour in traced {
        if !matches!(contour.border_type, BorderType::Outer) || contour.parent.is_some() {
            continue;
        }
        if contour.points.len() < 2 {
            continue;
        }
        set.push(
            contour
                .points
                .into_iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y))),
        );
    }
    set
}

/// Select the contour enclosing the largest shoelace area.
///
/// Ties keep the first-encountered contour, so selection is stable and
/// deterministic for a fixed traversal order of the edge map. Returns
/// `None` for an empty set.
#[must_use]
pub fn select_largest(set: &ContourSet) -> Option<ContourId> {
    let mut best: Option<(ContourId, f64)> = None;
    for id in set.ids() {
        let area = shoelace_area(set.get(id));
        match best {
            Some((_, best_area)) if area <= best_area => {}
            _ => best = Some((id, area)),
        }
    }
    best.map(|(id, _)| id)
}
