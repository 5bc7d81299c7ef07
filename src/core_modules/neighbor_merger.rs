// THEORY:
// The neighbor-group merger flattens every connected component of the label
// similarity graph into one label. It is a color-only grouping: two groups with
// the same look merge even if they sit at opposite corners of the image. Callers
// who want the spatially connected variant set `require_adjacency`, which only
// lets a group join a component it touches.
//
// The walk:
// 1.  Labels are visited in ascending order. An unvisited label seeds a new
//     component; its graph neighbors form the frontier.
// 2.  The lowest frontier label is popped, unioned into the seed's current root
//     and marked visited. Its own unvisited graph neighbors join the frontier.
// 3.  When the frontier is empty the next unvisited label seeds the next
//     component.
//
// Merges go through a `LabelForest` and the grid is rewritten once at the end,
// so the surviving label of each component is its lowest original label.

use crate::core_modules::geometry::Point;
use crate::core_modules::label_forest::LabelForest;
use crate::core_modules::label_graph::LabelGraph;
use crate::core_modules::label_grid::{Label, LabelGrid, PixelLabel};
use crate::error::Result;
use log::info;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Whether any pixel of `first` is an 8-neighbor of any pixel of `second`.
pub fn are_groups_neighbors(first: &[PixelLabel], second: &[PixelLabel]) -> bool {
    let others: HashSet<Point> = second.iter().map(|cell| cell.point).collect();
    first.iter().any(|cell| touches(cell.point, &others))
}

fn touches(point: Point, others: &HashSet<Point>) -> bool {
    let (x, y) = (i64::from(point.x), i64::from(point.y));
    for dx in -1..=1 {
        for dy in -1..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let (nx, ny) = (x + dx, y + dy);
            if nx < 0 || ny < 0 {
                continue;
            }
            if others.contains(&Point::new(nx as u32, ny as u32)) {
                return true;
            }
        }
    }
    false
}

/// Merges every similarity-graph component into its lowest label. Returns the
/// number of labels that were absorbed into another.
pub fn merge_neighbor_groups(
    grid: &mut LabelGrid,
    threshold: f64,
    use_entropy: bool,
    require_adjacency: bool,
) -> Result<usize> {
    let graph = LabelGraph::build(grid, threshold, use_entropy)?;
    merge_with_graph(grid, &graph, require_adjacency)
}

/// Same as `merge_neighbor_groups`, with the graph built on the worker pool.
pub async fn merge_neighbor_groups_parallel(
    grid: &mut LabelGrid,
    threshold: f64,
    use_entropy: bool,
    require_adjacency: bool,
) -> Result<usize> {
    let graph = LabelGraph::build_parallel(grid, threshold, use_entropy).await?;
    merge_with_graph(grid, &graph, require_adjacency)
}

fn merge_with_graph(grid: &mut LabelGrid, graph: &LabelGraph, require_adjacency: bool) -> Result<usize> {
    let groups: BTreeMap<Label, Vec<PixelLabel>> = grid.groups();
    let mut forest = LabelForest::new();
    let mut visited: BTreeSet<Label> = BTreeSet::new();
    let mut absorbed = 0;
    let mut components = 0;

    for seed in graph.labels() {
        if !visited.insert(seed) {
            continue;
        }
        components += 1;

        // Pixels of the component so far; only tracked when adjacency matters.
        let mut members: Vec<PixelLabel> = match (require_adjacency, groups.get(&seed)) {
            (true, Some(pixels)) => pixels.clone(),
            _ => Vec::new(),
        };
        let mut frontier: BTreeSet<Label> = graph
            .neighbors(seed)?
            .iter()
            .copied()
            .filter(|label| !visited.contains(label))
            .collect();

        loop {
            let next = frontier.iter().copied().find(|candidate| {
                !require_adjacency
                    || groups
                        .get(candidate)
                        .is_some_and(|pixels| are_groups_neighbors(&members, pixels))
            });
            let Some(label) = next else {
                break;
            };
            frontier.remove(&label);
            if !visited.insert(label) {
                continue;
            }

            forest.union_into(seed, label);
            absorbed += 1;
            if require_adjacency {
                if let Some(pixels) = groups.get(&label) {
                    members.extend_from_slice(pixels);
                }
            }
            for &neighbor in graph.neighbors(label)? {
                if !visited.contains(&neighbor) {
                    frontier.insert(neighbor);
                }
            }
        }
    }

    let changed = forest.materialize(grid);
    info!(
        "neighbor merge: {components} components, {absorbed} labels absorbed, {changed} pixels relabelled"
    );
    Ok(absorbed)
}
