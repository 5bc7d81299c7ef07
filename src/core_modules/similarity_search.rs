// THEORY:
// Similarity search answers "which other groups look like this one?" anywhere in
// the image, with no regard to where the groups sit.
//
// Every label gets a comparison vector: its mean HxHySL color, optionally with a
// fifth element, the normalized entropy of the group's binned lightness. Entropy
// is a cheap texture proxy (a flat region has low entropy, a speckled one high),
// so two groups with the same mean color but different texture drift apart once
// it is appended.
//
// `SimilarityIndex` freezes the comparison vectors of one grid state so repeated
// queries see the same numbers. The free functions build a fresh index per call,
// since a merge invalidates every vector.

use crate::core_modules::label_grid::{hue_average, Label, LabelGrid, PixelLabel};
use crate::core_modules::pixel::pixel::Pixel;
use crate::core_modules::vector::VectorN;
use crate::error::{Result, VisionError};
use std::collections::{BTreeMap, BTreeSet};

/// Lightness buckets are this wide on a 0..=100 scale.
const LIGHTNESS_BIN_WIDTH: i64 = 10;

/// Entropy of a uniform distribution over 100 equally likely outcomes.
pub fn max_entropy() -> f64 {
    -0.01 * 0.01_f64.log2() * 100.0
}

/// Normalized Shannon entropy of a group's binned lightness. Roughly in [0, 1],
/// not clamped. An empty group has entropy 0.
pub fn histogram_entropy(pixels: &[Pixel]) -> f64 {
    if pixels.is_empty() {
        return 0.0;
    }

    let mut bins: BTreeMap<i64, usize> = BTreeMap::new();
    for pixel in pixels {
        let (_, _, lightness) = pixel.to_hsl();
        let scaled = (lightness * 100.0).round() as i64;
        *bins.entry(scaled / LIGHTNESS_BIN_WIDTH).or_default() += 1;
    }

    let total = pixels.len() as f64;
    let entropy: f64 = bins
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum();
    entropy / max_entropy()
}

/// Per-label comparison vectors: mean HxHySL, plus entropy when `use_entropy`.
pub fn comparison_vectors(grid: &LabelGrid, use_entropy: bool) -> Result<BTreeMap<Label, VectorN>> {
    grid.groups()
        .into_iter()
        .filter_map(|(label, cells)| hue_average(&cells).map(|average| (label, cells, average)))
        .map(|(label, cells, average)| {
            let vector = if use_entropy {
                let pixels: Vec<Pixel> = cells.iter().map(|cell| cell.pixel).collect();
                average.append(&[histogram_entropy(&pixels)])?
            } else {
                average
            };
            Ok((label, vector))
        })
        .collect()
}

/// Cosine similarity of two labels, by color alone and with entropy appended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupSimilarity {
    pub color: f64,
    pub color_and_entropy: f64,
}

pub fn group_similarity(grid: &LabelGrid, first: Label, second: Label) -> Result<GroupSimilarity> {
    let color = SimilarityIndex::new(grid, false)?;
    let textured = SimilarityIndex::new(grid, true)?;
    Ok(GroupSimilarity {
        color: color.similarity(first, second)?,
        color_and_entropy: textured.similarity(first, second)?,
    })
}

/// Frozen comparison vectors and group membership for one grid state.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    vectors: BTreeMap<Label, VectorN>,
    groups: BTreeMap<Label, Vec<PixelLabel>>,
}

impl SimilarityIndex {
    pub fn new(grid: &LabelGrid, use_entropy: bool) -> Result<Self> {
        Ok(Self {
            vectors: comparison_vectors(grid, use_entropy)?,
            groups: grid.groups(),
        })
    }

    pub fn vector(&self, label: Label) -> Result<&VectorN> {
        self.vectors
            .get(&label)
            .ok_or(VisionError::LabelNotFound(label))
    }

    pub fn vectors(&self) -> &BTreeMap<Label, VectorN> {
        &self.vectors
    }

    pub fn pixels(&self, label: Label) -> Result<&[PixelLabel]> {
        self.groups
            .get(&label)
            .map(Vec::as_slice)
            .ok_or(VisionError::LabelNotFound(label))
    }

    pub fn similarity(&self, first: Label, second: Label) -> Result<f64> {
        self.vector(first)?.cosine_similarity(self.vector(second)?)
    }

    /// Every other label whose vector is at least `threshold` similar to `label`'s.
    pub fn similar_labels(&self, label: Label, threshold: f64) -> Result<BTreeSet<Label>> {
        let target = self.vector(label)?;
        let mut similar = BTreeSet::new();
        for (&other, vector) in &self.vectors {
            if other != label && vector.cosine_similarity(target)? >= threshold {
                similar.insert(other);
            }
        }
        Ok(similar)
    }

    /// Labels reachable from `label` through chains of similar labels. Excludes
    /// `label` itself.
    pub fn all_similar_labels(&self, label: Label, threshold: f64) -> Result<BTreeSet<Label>> {
        let mut visited = BTreeSet::from([label]);
        let mut stack = vec![label];
        while let Some(current) = stack.pop() {
            for similar in self.similar_labels(current, threshold)? {
                if visited.insert(similar) {
                    stack.push(similar);
                }
            }
        }
        visited.remove(&label);
        Ok(visited)
    }

    fn collect_pixels(&self, labels: BTreeSet<Label>) -> Result<BTreeMap<Label, Vec<PixelLabel>>> {
        labels
            .into_iter()
            .map(|label| Ok((label, self.pixels(label)?.to_vec())))
            .collect()
    }
}

/// Other labels similar to `label`, with their pixels. Fails if `label` is not
/// in the grid.
pub fn find_similar_labels(
    label: Label,
    grid: &LabelGrid,
    threshold: f64,
    use_entropy: bool,
) -> Result<BTreeMap<Label, Vec<PixelLabel>>> {
    let index = SimilarityIndex::new(grid, use_entropy)?;
    let similar = index.similar_labels(label, threshold)?;
    index.collect_pixels(similar)
}

/// Transitive closure of `find_similar_labels`.
pub fn find_all_similar_labels(
    label: Label,
    grid: &LabelGrid,
    threshold: f64,
    use_entropy: bool,
) -> Result<BTreeMap<Label, Vec<PixelLabel>>> {
    let index = SimilarityIndex::new(grid, use_entropy)?;
    let similar = index.all_similar_labels(label, threshold)?;
    index.collect_pixels(similar)
}
