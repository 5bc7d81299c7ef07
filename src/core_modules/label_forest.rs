// THEORY:
// A disjoint-set forest over labels. Merge passes record "label B now belongs to
// label A's group" here instead of rewriting every pixel of B on each merge; the
// grid is rewritten once at the end by resolving every pixel's label to its root.
//
// Unlike a textbook union-by-rank forest, `union_into` always keeps the target's
// root as the representative. Merge passes rely on that to decide which original
// label id survives.

use crate::core_modules::label_grid::{Label, LabelGrid};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct LabelForest {
    parent: HashMap<Label, Label>,
}

impl LabelForest {
    pub fn new() -> Self {
        Self::default()
    }

    /// The representative of `label`'s set. Unknown labels are their own root.
    pub fn find(&mut self, label: Label) -> Label {
        let mut root = label;
        while let Some(&parent) = self.parent.get(&root) {
            if parent == root {
                break;
            }
            root = parent;
        }

        // Path compression.
        let mut current = label;
        while current != root {
            let next = self.parent.get(&current).copied().unwrap_or(root);
            self.parent.insert(current, root);
            current = next;
        }
        root
    }

    /// Moves `label`'s whole set under `target`'s root. Returns the surviving root.
    pub fn union_into(&mut self, target: Label, label: Label) -> Label {
        let target_root = self.find(target);
        let label_root = self.find(label);
        if target_root != label_root {
            self.parent.insert(label_root, target_root);
        }
        target_root
    }

    pub fn same_set(&mut self, a: Label, b: Label) -> bool {
        self.find(a) == self.find(b)
    }

    /// Rewrites every pixel label in `grid` to its set's root. Returns the number
    /// of pixels whose label changed.
    pub fn materialize(&mut self, grid: &mut LabelGrid) -> usize {
        let mut changed = 0;
        for cell in grid.cells_mut() {
            let root = self.find(cell.label);
            if root != cell.label {
                cell.label = root;
                changed += 1;
            }
        }
        changed
    }
}
