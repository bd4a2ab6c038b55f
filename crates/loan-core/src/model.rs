use anyhow::{anyhow, bail, ensure, Result};
use serde::{Deserialize, Serialize};

/// Binary classifier over one dense row.
///
/// The row is already encoded and ordered; implementations never see field names.
pub trait Classifier: Send + Sync {
    fn n_features(&self) -> usize;

    /// Discrete class label.
    fn predict(&self, row: &[f64]) -> Result<f64>;

    /// Probability of the positive class (index 1).
    fn predict_proba(&self, row: &[f64]) -> Result<f64>;
}

const LEAF: i64 = -1;

/// One fitted decision tree as parallel node arrays.
///
/// Node `i` is a leaf when `children_left[i] == -1`. Otherwise the row goes left when
/// `row[feature[i]] <= threshold[i]`. `value[i]` holds per-class weights at the node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

impl Tree {
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.children_left.len()
    }

    /// Structural checks so that `leaf_of` can index without bounds failures.
    pub fn validate(&self, n_features: usize, n_classes: usize) -> Result<()> {
        let n = self.n_nodes();
        ensure!(n > 0, "tree has no nodes");
        ensure!(
            self.children_right.len() == n
                && self.feature.len() == n
                && self.threshold.len() == n
                && self.value.len() == n,
            "node arrays length mismatch: children_left={} children_right={} feature={} threshold={} value={}",
            n,
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len()
        );

        for i in 0..n {
            let (l, r) = (self.children_left[i], self.children_right[i]);
            if l == LEAF {
                ensure!(r == LEAF, "node {i}: leaf with a right child {r}");
                let v = &self.value[i];
                ensure!(
                    v.len() == n_classes,
                    "node {i}: value has {} classes, expect {n_classes}",
                    v.len()
                );
                ensure!(
                    v.iter().all(|w| w.is_finite() && *w >= 0.0),
                    "node {i}: leaf weights must be finite and non-negative"
                );
                ensure!(v.iter().sum::<f64>() > 0.0, "node {i}: leaf weights sum to zero");
                continue;
            }

            // children always come after their parent: rules out cycles
            for c in [l, r] {
                ensure!(
                    c > i as i64 && (c as usize) < n,
                    "node {i}: child index {c} out of range (n_nodes={n})"
                );
            }
            let f = self.feature[i];
            ensure!(
                f >= 0 && (f as usize) < n_features,
                "node {i}: feature index {f} out of range (n_features={n_features})"
            );
            ensure!(!self.threshold[i].is_nan(), "node {i}: threshold is NaN");
        }
        Ok(())
    }

    /// Leaf index reached by `row`. Requires a validated tree and a row of `n_features`.
    pub fn leaf_of(&self, row: &[f64]) -> usize {
        let mut node = 0usize;
        while self.children_left[node] != LEAF {
            let x = row[self.feature[node] as usize];
            // split thresholds were fitted on float32 inputs
            node = if ((x as f32) as f64) <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        node
    }
}

/// Averaged forest of classification trees, loaded from a JSON dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub n_features: usize,
    /// Class labels in output order; index 1 is the positive class.
    pub classes: Vec<f64>,
    /// Training column order, when the exporter recorded it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.n_features > 0, "n_features must be > 0");
        ensure!(
            self.classes.len() == 2,
            "binary classifier expected, got {} classes",
            self.classes.len()
        );
        ensure!(!self.trees.is_empty(), "ensemble has no trees");
        if let Some(names) = &self.feature_names {
            ensure!(
                names.len() == self.n_features,
                "feature_names has {} entries, n_features={}",
                names.len(),
                self.n_features
            );
        }
        for (t, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .map_err(|e| anyhow!("tree {t}: {e}"))?;
        }
        Ok(())
    }

    fn check_row(&self, row: &[f64]) -> Result<()> {
        ensure!(
            row.len() == self.n_features,
            "row has {} features, model expects {}",
            row.len(),
            self.n_features
        );
        if let Some(i) = row.iter().position(|x| !x.is_finite()) {
            bail!("feature {i} is not a finite number: {}", row[i]);
        }
        // splits compare in float32; larger values would turn into inf
        if let Some(i) = row.iter().position(|x| x.abs() > f32::MAX as f64) {
            bail!("feature {i}: value too large for float32: {}", row[i]);
        }
        Ok(())
    }

    /// Per-class probabilities: mean of each tree's normalized leaf weights.
    pub fn proba(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check_row(row)?;

        let mut acc = vec![0.0f64; self.classes.len()];
        for tree in &self.trees {
            let w = &tree.value[tree.leaf_of(row)];
            let total: f64 = w.iter().sum();
            for (a, x) in acc.iter_mut().zip(w) {
                *a += x / total;
            }
        }
        let n = self.trees.len() as f64;
        for a in acc.iter_mut() {
            *a /= n;
        }
        Ok(acc)
    }
}

impl Classifier for TreeEnsemble {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, row: &[f64]) -> Result<f64> {
        let p = self.proba(row)?;
        // first maximum wins on ties
        let mut best = 0usize;
        for (i, x) in p.iter().enumerate().skip(1) {
            if *x > p[best] {
                best = i;
            }
        }
        Ok(self.classes[best])
    }

    fn predict_proba(&self, row: &[f64]) -> Result<f64> {
        let p = self.proba(row)?;
        p.get(1)
            .copied()
            .ok_or_else(|| anyhow!("model returned {} class probabilities", p.len()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Stump on `feature`: `<= threshold` goes to `left`, else `right`.
    pub(crate) fn stump(feature: i64, threshold: f64, left: [f64; 2], right: [f64; 2]) -> Tree {
        Tree {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![feature, -2, -2],
            threshold: vec![threshold, -2.0, -2.0],
            value: vec![vec![0.0, 0.0], left.to_vec(), right.to_vec()],
        }
    }

    /// Two stumps over the 13-column loan layout:
    /// credit_score (11) split at 600 and previous defaults (12) split at 0.5.
    pub(crate) fn loan_forest() -> TreeEnsemble {
        TreeEnsemble {
            n_features: 13,
            classes: vec![0.0, 1.0],
            feature_names: None,
            trees: vec![
                stump(11, 600.0, [40.0, 5.0], [5.0, 40.0]),
                stump(12, 0.5, [10.0, 30.0], [45.0, 0.0]),
            ],
        }
    }

    fn row(credit: f64, defaults: f64) -> Vec<f64> {
        let mut r = vec![0.0; 13];
        r[11] = credit;
        r[12] = defaults;
        r
    }

    #[test]
    fn proba_is_mean_of_leaf_fractions() {
        let m = loan_forest();
        m.validate().unwrap();

        let p = m.predict_proba(&row(650.0, 0.0)).unwrap();
        let expect = (40.0 / 45.0 + 30.0 / 40.0) / 2.0;
        assert!((p - expect).abs() < 1e-12, "p={p}");
        assert_eq!(m.predict(&row(650.0, 0.0)).unwrap(), 1.0);

        let p = m.predict_proba(&row(550.0, 1.0)).unwrap();
        let expect = (5.0 / 45.0 + 0.0) / 2.0;
        assert!((p - expect).abs() < 1e-12, "p={p}");
        assert_eq!(m.predict(&row(550.0, 1.0)).unwrap(), 0.0);
    }

    #[test]
    fn threshold_is_inclusive_on_the_left() {
        let m = loan_forest();
        let at = m.proba(&row(600.0, 0.0)).unwrap();
        let below = m.proba(&row(599.0, 0.0)).unwrap();
        assert_eq!(at, below);
    }

    #[test]
    fn tie_goes_to_first_class() {
        let m = TreeEnsemble {
            n_features: 1,
            classes: vec![0.0, 1.0],
            feature_names: None,
            trees: vec![stump(0, 0.0, [1.0, 1.0], [1.0, 1.0])],
        };
        assert_eq!(m.predict(&[3.0]).unwrap(), 0.0);
        assert!((m.predict_proba(&[3.0]).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_wrong_width_and_non_finite() {
        let m = loan_forest();
        assert!(m.predict(&[1.0, 2.0]).is_err());
        assert!(m.predict_proba(&row(f64::NAN, 0.0)).is_err());
    }

    #[test]
    fn rejects_values_beyond_float32_range() {
        let m = loan_forest();
        let e = m.predict(&row(1e39, 0.0)).unwrap_err();
        assert!(
            e.to_string().starts_with("feature 11: value too large for float32"),
            "{e}"
        );
        assert!(m.predict_proba(&row(-1e39, 0.0)).is_err());
        assert!(m.predict(&row(f32::MAX as f64, 0.0)).is_ok());
    }

    #[test]
    fn validate_catches_bad_structure() {
        let mut m = loan_forest();
        m.trees[0].children_left[0] = 0;
        assert!(m.validate().is_err());

        let mut m = loan_forest();
        m.trees[1].feature[0] = 13;
        assert!(m.validate().is_err());

        let mut m = loan_forest();
        m.trees[0].value[1] = vec![0.0, 0.0];
        assert!(m.validate().is_err());

        let mut m = loan_forest();
        m.classes = vec![0.0, 1.0, 2.0];
        assert!(m.validate().is_err());
    }
}
