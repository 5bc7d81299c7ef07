// THEORY:
// Grid geometry shared by every pass in the engine. Everything that looks at "the
// pixels around this pixel" goes through `neighbor_locations`, so the neighbor
// order is fixed in one place: x outer, y inner, centre excluded, clipped to the
// image. The labelling pass breaks similarity ties by taking the first neighbor
// in this order, which makes the order part of the engine's contract.
//
// `bounds` and `centroid` summarise a set of points. Both accept empty input and
// return an empty result rather than failing, since groups can be emptied by a
// merge pass.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A coordinate on the pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl From<(u32, u32)> for Point {
    fn from((x, y): (u32, u32)) -> Self {
        Point { x, y }
    }
}

/// All grid positions within Chebyshev `radius` of (x, y), excluding (x, y)
/// itself and anything outside a `width` × `height` grid.
pub fn neighbor_locations(x: u32, y: u32, radius: u32, width: u32, height: u32) -> Vec<Point> {
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let min_x = x.saturating_sub(radius);
    let min_y = y.saturating_sub(radius);
    let max_x = x.saturating_add(radius).min(width - 1);
    let max_y = y.saturating_add(radius).min(height - 1);
    if min_x > max_x || min_y > max_y {
        return Vec::new();
    }

    let capacity = ((max_x - min_x + 1) * (max_y - min_y + 1)) as usize;
    let mut neighbors = Vec::with_capacity(capacity.saturating_sub(1));
    for i in min_x..=max_x {
        for j in min_y..=max_y {
            if i != x || j != y {
                neighbors.push(Point { x: i, y: j });
            }
        }
    }
    neighbors
}

/// The extent points of a point set: for every column its topmost and bottommost
/// point, and for every row its leftmost and rightmost point. De-duplicated, in
/// first-seen order.
pub fn bounds(points: &[Point]) -> Vec<Point> {
    if points.is_empty() {
        return Vec::new();
    }

    let mut column_extents: BTreeMap<u32, (u32, u32)> = BTreeMap::new();
    let mut row_extents: BTreeMap<u32, (u32, u32)> = BTreeMap::new();
    for point in points {
        let column = column_extents.entry(point.x).or_insert((point.y, point.y));
        column.0 = column.0.min(point.y);
        column.1 = column.1.max(point.y);

        let row = row_extents.entry(point.y).or_insert((point.x, point.x));
        row.0 = row.0.min(point.x);
        row.1 = row.1.max(point.x);
    }

    let mut seen = HashSet::new();
    points
        .iter()
        .filter(|point| {
            let vertical = column_extents
                .get(&point.x)
                .is_some_and(|&(min, max)| point.y == min || point.y == max);
            let horizontal = row_extents
                .get(&point.y)
                .is_some_and(|&(min, max)| point.x == min || point.x == max);
            vertical || horizontal
        })
        .filter(|point| seen.insert(**point))
        .copied()
        .collect()
}

/// The integer mean of a point set, or `None` when it is empty.
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let count = points.len() as u64;
    let (sum_x, sum_y) = points.iter().fold((0u64, 0u64), |(sx, sy), p| {
        (sx + p.x as u64, sy + p.y as u64)
    });
    Some(Point {
        x: (sum_x / count) as u32,
        y: (sum_y / count) as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: u32, y: u32) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn interior_point_has_eight_neighbors() {
        let neighbors = neighbor_locations(1, 1, 1, 3, 3);
        assert_eq!(neighbors.len(), 8);
        assert!(!neighbors.contains(&p(1, 1)));
        // x outer, y inner.
        assert_eq!(neighbors[0], p(0, 0));
        assert_eq!(neighbors[1], p(0, 1));
        assert_eq!(neighbors[3], p(1, 0));
    }

    #[test]
    fn corner_points_are_clipped() {
        assert_eq!(neighbor_locations(0, 0, 1, 3, 3), vec![p(0, 1), p(1, 0), p(1, 1)]);
        assert_eq!(neighbor_locations(2, 2, 1, 3, 3).len(), 3);
        assert!(neighbor_locations(0, 0, 1, 1, 1).is_empty());
        assert!(neighbor_locations(0, 0, 1, 0, 0).is_empty());
    }

    #[test]
    fn larger_radius() {
        assert_eq!(neighbor_locations(2, 2, 2, 5, 5).len(), 24);
    }

    #[test]
    fn bounds_drop_interior_points() {
        let points = vec![
            p(0, 0),
            p(0, 1), p(1, 1), p(2, 1),
            p(0, 2), p(1, 2), p(2, 2),
            p(0, 3), p(1, 3), p(2, 3),
        ];
        let result = bounds(&points);
        assert_eq!(result.len(), 9);
        assert!(!result.contains(&p(1, 2)));
    }

    #[test]
    fn bounds_of_a_single_point() {
        assert_eq!(bounds(&[p(0, 0)]), vec![p(0, 0)]);
        assert!(bounds(&[]).is_empty());
    }

    #[test]
    fn thin_shapes_are_all_edge() {
        let points = vec![
            p(10, 0), p(10, 1), p(10, 2),
            p(11, 0), p(11, 1), p(11, 2), p(11, 3), p(11, 4),
        ];
        assert_eq!(bounds(&points).len(), points.len());
    }

    #[test]
    fn centroid_of_points() {
        assert_eq!(centroid(&[p(0, 0), p(2, 4), p(4, 2)]), Some(p(2, 2)));
        assert_eq!(centroid(&[]), None);
    }
}
