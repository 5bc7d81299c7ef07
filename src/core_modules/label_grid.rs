// THEORY:
// The `LabelGrid` is the central data structure of the engine: a width × height
// grid where every cell holds the pixel's original color, its coordinate, and the
// integer label of the group it currently belongs to. The labelling pass creates
// it; the merge passes rewrite label fields in place; search and refinement only
// read it.
//
// Key architectural principles:
// 1.  **Complete coverage**: every in-range coordinate has exactly one cell. The
//     grid is built once from a full raster and only label fields change after.
// 2.  **Derived views are recomputed, not cached**: group membership, per-label
//     average vectors and the export shape are all computed from the current
//     labels on demand, because a merge invalidates all of them.
// 3.  **Deterministic iteration**: groupings are `BTreeMap`s keyed by label, so
//     every pass that walks labels walks them in ascending order.

use crate::core_modules::geometry::{bounds, centroid, neighbor_locations, Point};
use crate::core_modules::pixel::pixel::Pixel;
use crate::core_modules::utils::image_helper::PixelSource;
use crate::core_modules::vector::VectorN;
use crate::error::{Result, VisionError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Index;

/// Integer id of a pixel group. Assigned from 0 upward by the labelling pass.
pub type Label = u32;

/// One cell of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelLabel {
    /// The pixel's original color. Never changes after labelling.
    pub pixel: Pixel,
    /// The group this pixel currently belongs to.
    pub label: Label,
    /// Where the pixel sits in the grid.
    pub point: Point,
}

/// A width × height grid of labelled pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelGrid {
    width: u32,
    height: u32,
    /// Row-major cells: index `y * width + x`.
    cells: Vec<PixelLabel>,
}

impl LabelGrid {
    /// Builds a grid from a pixel source, asking `label_of` for every coordinate.
    pub fn from_source_with<S, F>(source: &S, mut label_of: F) -> Result<Self>
    where
        S: PixelSource + ?Sized,
        F: FnMut(u32, u32) -> Result<Label>,
    {
        let width = source.width();
        let height = source.height();
        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(PixelLabel {
                    pixel: source.get_pixel(x, y),
                    label: label_of(x, y)?,
                    point: Point { x, y },
                });
            }
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Builds a grid from row-major cells produced by the labelling pass.
    pub(crate) fn from_cells(width: u32, height: u32, cells: Vec<PixelLabel>) -> Self {
        debug_assert_eq!(cells.len(), width as usize * height as usize);
        Self {
            width,
            height,
            cells,
        }
    }

    /// Rebuilds a grid from a label dump. Every coordinate of `source` must be
    /// assigned exactly one label, and every dumped point must lie inside it.
    pub fn from_dump<S: PixelSource + ?Sized>(source: &S, dump: &LabelDump) -> Result<Self> {
        let assignments = dump.assignments(source.width(), source.height())?;
        Self::from_source_with(source, |x, y| {
            assignments
                .get(&Point { x, y })
                .copied()
                .ok_or(VisionError::MissingAssignment { x, y })
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> Option<&PixelLabel> {
        if x < self.width && y < self.height {
            self.cells.get(self.offset(x, y))
        } else {
            None
        }
    }

    pub fn label_at(&self, point: Point) -> Option<Label> {
        self.get(point.x, point.y).map(|cell| cell.label)
    }

    /// Rewrites the label of one cell. Out-of-range points are ignored.
    pub fn set_label(&mut self, point: Point, label: Label) {
        if point.x < self.width && point.y < self.height {
            let offset = self.offset(point.x, point.y);
            self.cells[offset].label = label;
        }
    }

    /// Cells in raster order (y outer, x inner).
    pub fn iter(&self) -> impl Iterator<Item = &PixelLabel> {
        self.cells.iter()
    }

    pub(crate) fn cells_mut(&mut self) -> impl Iterator<Item = &mut PixelLabel> {
        self.cells.iter_mut()
    }

    /// Cells grouped by label.
    pub fn groups(&self) -> BTreeMap<Label, Vec<PixelLabel>> {
        let mut groups: BTreeMap<Label, Vec<PixelLabel>> = BTreeMap::new();
        for cell in &self.cells {
            groups.entry(cell.label).or_default().push(*cell);
        }
        groups
    }

    /// The export shape: label → coordinates of its pixels.
    pub fn label_points(&self) -> BTreeMap<Label, Vec<Point>> {
        let mut points: BTreeMap<Label, Vec<Point>> = BTreeMap::new();
        for cell in &self.cells {
            points.entry(cell.label).or_default().push(cell.point);
        }
        points
    }

    pub fn label_sizes(&self) -> BTreeMap<Label, usize> {
        let mut sizes: BTreeMap<Label, usize> = BTreeMap::new();
        for cell in &self.cells {
            *sizes.entry(cell.label).or_default() += 1;
        }
        sizes
    }

    /// Number of distinct labels currently in the grid.
    pub fn label_count(&self) -> usize {
        self.label_sizes().len()
    }

    pub fn contains_label(&self, label: Label) -> bool {
        self.cells.iter().any(|cell| cell.label == label)
    }

    /// Per-label mean HxHySL vector.
    pub fn average_vectors(&self) -> BTreeMap<Label, VectorN> {
        self.groups()
            .into_iter()
            .filter_map(|(label, pixels)| hue_average(&pixels).map(|average| (label, average)))
            .collect()
    }

    /// Per-label average color, converted back from the mean HxHySL vector.
    pub fn average_colors(&self) -> BTreeMap<Label, Pixel> {
        self.average_vectors()
            .into_iter()
            .map(|(label, average)| (label, Pixel::from_hxhysl(&average)))
            .collect()
    }

    /// Whether the cell at `point` has an 8-neighbor with a different label.
    pub fn is_edge(&self, point: Point) -> bool {
        let Some(label) = self.label_at(point) else {
            return false;
        };
        neighbor_locations(point.x, point.y, 1, self.width, self.height)
            .into_iter()
            .any(|neighbor| self[neighbor].label != label)
    }

    /// The pixels of `label` that touch a different label.
    pub fn label_edges(&self, label: Label) -> Result<Vec<Point>> {
        let members = self.points_of(label);
        if members.is_empty() {
            return Err(VisionError::LabelNotFound(label));
        }
        Ok(members.into_iter().filter(|&point| self.is_edge(point)).collect())
    }

    fn points_of(&self, label: Label) -> Vec<Point> {
        self.cells
            .iter()
            .filter(|cell| cell.label == label)
            .map(|cell| cell.point)
            .collect()
    }

    /// Extent points of `label`. Empty when the label owns no pixels.
    pub fn label_bounds(&self, label: Label) -> Vec<Point> {
        bounds(&self.points_of(label))
    }

    /// Integer mean position of `label`, or `None` when it owns no pixels.
    pub fn label_centroid(&self, label: Label) -> Option<Point> {
        centroid(&self.points_of(label))
    }

    pub fn to_dump(&self) -> LabelDump {
        LabelDump(
            self.label_points()
                .into_iter()
                .map(|(label, points)| (label, points.into_iter().map(|p| [p.x, p.y]).collect()))
                .collect(),
        )
    }
}

impl Index<Point> for LabelGrid {
    type Output = PixelLabel;

    fn index(&self, point: Point) -> &PixelLabel {
        assert!(
            point.x < self.width && point.y < self.height,
            "point ({}, {}) outside {}x{} grid",
            point.x,
            point.y,
            self.width,
            self.height
        );
        &self.cells[self.offset(point.x, point.y)]
    }
}

/// Mean HxHySL vector of a pixel group, or `None` for an empty group.
pub fn hue_average(pixels: &[PixelLabel]) -> Option<VectorN> {
    if pixels.is_empty() {
        return None;
    }
    let mut average = VectorN::zeros(4);
    for cell in pixels {
        average += cell.pixel.to_hxhysl();
    }
    average /= pixels.len() as f64;
    Some(average)
}

/// Serializable label → `[x, y]` list, the export shape of a grid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelDump(pub BTreeMap<Label, Vec<[u32; 2]>>);

impl LabelDump {
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Point → label lookup for a `width` × `height` grid.
    fn assignments(&self, width: u32, height: u32) -> Result<BTreeMap<Point, Label>> {
        let mut assignments = BTreeMap::new();
        for (&label, points) in &self.0 {
            for &[x, y] in points {
                if x >= width || y >= height {
                    return Err(VisionError::AssignmentOutOfRange { x, y, width, height });
                }
                if assignments.insert(Point { x, y }, label).is_some() {
                    return Err(VisionError::DuplicateAssignment { x, y });
                }
            }
        }
        Ok(assignments)
    }
}
