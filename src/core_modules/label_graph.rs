// THEORY:
// The label similarity graph maps every label to the set of other labels whose
// comparison vector is at least `threshold` cosine-similar to its own. It is
// all-pairs and purely color-based; spatial position plays no part.
//
// The graph is rebuilt for every merge or refinement, because a merge changes
// group averages. Each label's row depends only on the frozen comparison vectors,
// so `build_parallel` hands labels to independent tasks that each own their
// rows and never share a mutable accumulator.

use crate::core_modules::label_grid::{Label, LabelGrid};
use crate::core_modules::similarity_search::comparison_vectors;
use crate::core_modules::vector::VectorN;
use crate::error::{Result, VisionError};
use crate::parallel_pipeline::run_label_tasks;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelGraph {
    edges: BTreeMap<Label, BTreeSet<Label>>,
}

fn similar_row(label: Label, vectors: &BTreeMap<Label, VectorN>, threshold: f64) -> Result<BTreeSet<Label>> {
    let vector = vectors.get(&label).ok_or(VisionError::LabelNotFound(label))?;
    let mut row = BTreeSet::new();
    for (&other, other_vector) in vectors {
        if other != label && other_vector.cosine_similarity(vector)? >= threshold {
            row.insert(other);
        }
    }
    Ok(row)
}

impl LabelGraph {
    /// Builds the graph on the calling thread.
    pub fn build(grid: &LabelGrid, threshold: f64, use_entropy: bool) -> Result<Self> {
        let vectors = comparison_vectors(grid, use_entropy)?;
        let mut edges = BTreeMap::new();
        for &label in vectors.keys() {
            edges.insert(label, similar_row(label, &vectors, threshold)?);
        }
        let graph = Self { edges };
        debug!(
            "label graph: {} labels, {} edges at threshold {threshold}",
            graph.len(),
            graph.edge_count()
        );
        Ok(graph)
    }

    /// Builds the graph with one task per label partition.
    pub async fn build_parallel(grid: &LabelGrid, threshold: f64, use_entropy: bool) -> Result<Self> {
        let vectors = Arc::new(comparison_vectors(grid, use_entropy)?);
        let labels: Vec<Label> = vectors.keys().copied().collect();
        let rows = run_label_tasks(labels, vectors, move |label, vectors| {
            similar_row(label, vectors, threshold)
        })
        .await?;
        Ok(Self {
            edges: rows.into_iter().collect(),
        })
    }

    pub fn neighbors(&self, label: Label) -> Result<&BTreeSet<Label>> {
        self.edges
            .get(&label)
            .ok_or(VisionError::LabelNotFound(label))
    }

    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.edges.keys().copied()
    }

    pub fn contains(&self, label: Label) -> bool {
        self.edges.contains_key(&label)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    // Four labels: two reds, a near-red and a blue.
    fn grid() -> LabelGrid {
        let image = RgbaImage::from_fn(4, 2, |x, _| match x {
            0 | 1 => Rgba([255, 0, 0, 255]),
            2 => Rgba([250, 10, 5, 255]),
            _ => Rgba([0, 0, 255, 255]),
        });
        LabelGrid::from_source_with(&image, |x, _| Ok(x)).unwrap()
    }

    #[test]
    fn graph_links_similar_labels_only() {
        let graph = LabelGraph::build(&grid(), 0.99, false).unwrap();
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.neighbors(0).unwrap(), &BTreeSet::from([1, 2]));
        assert!(graph.neighbors(3).unwrap().is_empty());
        assert!(graph.neighbors(9).is_err());
    }

    #[test]
    fn graph_is_symmetric() {
        let graph = LabelGraph::build(&grid(), 0.99, true).unwrap();
        for label in graph.labels() {
            for &other in graph.neighbors(label).unwrap() {
                assert!(graph.neighbors(other).unwrap().contains(&label));
            }
        }
    }

    #[tokio::test]
    async fn parallel_build_matches_serial_build() {
        let grid = grid();
        let serial = LabelGraph::build(&grid, 0.99, true).unwrap();
        let parallel = LabelGraph::build_parallel(&grid, 0.99, true).await.unwrap();
        assert_eq!(serial, parallel);
        assert_eq!(parallel.edge_count(), 6);
    }
}
