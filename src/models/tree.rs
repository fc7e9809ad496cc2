//! CART regression tree (squared-error criterion).
//!
//! Split search sorts the node's samples once per candidate feature and scans
//! prefix sums, so each node costs `O(k · n log n)` for `k` candidate features.
//! Candidate features are a random subset drawn from the caller's RNG, which
//! is what decorrelates the trees of a forest.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split (clamped to `1..=n_features`).
    pub max_features: usize,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone, Copy)]
struct BestSplit {
    feature: usize,
    threshold: f64,
    child_sse: f64,
}

/// A fitted regression tree.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    root: Node,
}

impl RegressionTree {
    /// Grow a tree on `sample` (row indices into `features`/`targets`, repeats allowed).
    ///
    /// # Panics
    /// Panics if `sample` is empty or indexes outside `features`/`targets`.
    /// The forest validates its inputs before calling this.
    pub fn fit<R: AsRef<[f64]>>(
        features: &[R],
        targets: &[f64],
        sample: Vec<usize>,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let n_features = features[sample[0]].as_ref().len();
        let grower = Grower {
            features,
            targets,
            params,
            n_features,
        };
        Self {
            root: grower.grow(sample, 0, rng),
        }
    }

    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x[*feature] <= *threshold { &**left } else { &**right };
                }
            }
        }
    }

    /// Depth counted in levels (a single leaf has depth 1).
    pub fn depth(&self) -> usize {
        fn walk(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 1,
                Node::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        walk(&self.root)
    }
}

struct Grower<'a, R> {
    features: &'a [R],
    targets: &'a [f64],
    params: &'a TreeParams,
    n_features: usize,
}

impl<R: AsRef<[f64]>> Grower<'_, R> {
    fn grow(&self, indices: Vec<usize>, depth: usize, rng: &mut StdRng) -> Node {
        let n = indices.len();
        let sum: f64 = indices.iter().map(|&i| self.targets[i]).sum();
        let value = sum / n as f64;

        let first = self.targets[indices[0]];
        let constant = indices.iter().all(|&i| self.targets[i] == first);
        if constant
            || depth + 1 >= self.params.max_depth
            || n < self.params.min_samples_split
            || n < 2 * self.params.min_samples_leaf.max(1)
        {
            return Node::Leaf { value };
        }

        let sum_sq: f64 = indices.iter().map(|&i| self.targets[i].powi(2)).sum();
        let parent_sse = sum_sq - sum * sum / n as f64;

        let Some(best) = self.best_split(&indices, rng) else {
            return Node::Leaf { value };
        };
        if parent_sse - best.child_sse <= 1e-12 * parent_sse.abs().max(1.0) {
            return Node::Leaf { value };
        }

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.features[i].as_ref()[best.feature] <= best.threshold);
        if left.is_empty() || right.is_empty() {
            return Node::Leaf { value };
        }

        Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.grow(left, depth + 1, rng)),
            right: Box::new(self.grow(right, depth + 1, rng)),
        }
    }

    fn best_split(&self, indices: &[usize], rng: &mut StdRng) -> Option<BestSplit> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf.max(1);

        let mut candidates: Vec<usize> = (0..self.n_features).collect();
        candidates.shuffle(rng);
        candidates.truncate(self.params.max_features.clamp(1, self.n_features));

        let mut best: Option<BestSplit> = None;
        for &feature in &candidates {
            let mut pairs: Vec<(f64, f64)> = indices
                .iter()
                .map(|&i| (self.features[i].as_ref()[feature], self.targets[i]))
                .collect();
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            let total_sum: f64 = pairs.iter().map(|p| p.1).sum();
            let total_sq: f64 = pairs.iter().map(|p| p.1 * p.1).sum();
            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for split in 1..n {
                let (x_prev, y_prev) = pairs[split - 1];
                left_sum += y_prev;
                left_sq += y_prev * y_prev;

                if split < min_leaf || n - split < min_leaf {
                    continue;
                }
                let x_next = pairs[split].0;
                if x_prev >= x_next {
                    continue;
                }

                let n_left = split as f64;
                let n_right = (n - split) as f64;
                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let child_sse = (left_sq - left_sum * left_sum / n_left)
                    + (right_sq - right_sum * right_sum / n_right);

                let improves = match best {
                    Some(b) => child_sse < b.child_sse,
                    None => true,
                };
                if improves {
                    let mut threshold = (x_prev + x_next) / 2.0;
                    if threshold >= x_next {
                        threshold = x_prev;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        child_sse,
                    });
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn params() -> TreeParams {
        TreeParams {
            max_depth: 8,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: 2,
        }
    }

    #[test]
    fn learns_a_step_function() {
        let features: Vec<[f64; 2]> = (0..20).map(|i| [i as f64, 0.0]).collect();
        let targets: Vec<f64> = (0..20).map(|i| if i < 10 { 5.0 } else { 50.0 }).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let tree = RegressionTree::fit(&features, &targets, (0..20).collect(), &params(), &mut rng);

        assert_eq!(tree.predict(&[3.0, 0.0]), 5.0);
        assert_eq!(tree.predict(&[15.0, 0.0]), 50.0);
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn constant_target_is_a_single_leaf() {
        let features: Vec<[f64; 2]> = (0..10).map(|i| [i as f64, (i % 3) as f64]).collect();
        let targets = vec![100.0; 10];
        let mut rng = StdRng::seed_from_u64(9);
        let tree = RegressionTree::fit(&features, &targets, (0..10).collect(), &params(), &mut rng);

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict(&[42.0, 1.0]), 100.0);
    }

    #[test]
    fn respects_max_depth() {
        let features: Vec<[f64; 1]> = (0..64).map(|i| [i as f64]).collect();
        let targets: Vec<f64> = (0..64).map(|i| (i * i) as f64).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let shallow = TreeParams {
            max_depth: 3,
            ..params()
        };
        let tree = RegressionTree::fit(&features, &targets, (0..64).collect(), &shallow, &mut rng);
        assert!(tree.depth() <= 3);
    }
}
