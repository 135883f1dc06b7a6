//! Tschuprow's T association between categorical variables

use ndarray::{Array2, ArrayD};
use serde::{Deserialize, Serialize};

use crate::error::{MetricError, Result};
use crate::metric::Metric;

use super::contingency::{
    check_pairs, drop_empty_rows_and_cols, paired_categories, NanStrategy,
};

/// Chi-squared statistic of a dense table against independence.
///
/// chi^2 = sum (O - E)^2 / E with E = outer(row_sums, col_sums) / n
fn chi_squared(table: &Array2<f64>, total: f64) -> f64 {
    let row_sums: Vec<f64> = (0..table.nrows()).map(|r| table.row(r).sum()).collect();
    let col_sums: Vec<f64> = (0..table.ncols()).map(|c| table.column(c).sum()).collect();
    let mut chi = 0.0;
    for r in 0..table.nrows() {
        for c in 0..table.ncols() {
            let expected = row_sums[r] * col_sums[c] / total;
            let diff = table[[r, c]] - expected;
            chi += diff * diff / expected;
        }
    }
    chi
}

/// Tschuprow's T from a joint frequency table, clamped to [0, 1].
///
/// Empty rows and columns are dropped first; a table degenerating to a
/// single row or column reports 0.0. Bias correction shrinks both the
/// effect size and the dimension terms by their sampling bias.
pub(crate) fn tschuprows_t_from_table(table: &Array2<i64>, bias_correction: bool) -> f64 {
    let dense = drop_empty_rows_and_cols(table);
    let (rows, cols) = (dense.nrows(), dense.ncols());
    if rows < 2 || cols < 2 {
        return 0.0;
    }
    let total = dense.sum();
    let phi_squared = chi_squared(&dense, total) / total;

    let t = if bias_correction {
        let r = rows as f64;
        let k = cols as f64;
        let phi_corrected =
            (phi_squared - (r - 1.0) * (k - 1.0) / (total - 1.0)).max(0.0);
        let rows_corrected = r - (r - 1.0).powi(2) / (total - 1.0);
        let cols_corrected = k - (k - 1.0).powi(2) / (total - 1.0);
        if rows_corrected <= 1.0 || cols_corrected <= 1.0 {
            return 0.0;
        }
        (phi_corrected / ((rows_corrected - 1.0) * (cols_corrected - 1.0)).sqrt()).sqrt()
    } else {
        let degrees = ((rows - 1) * (cols - 1)) as f64;
        (phi_squared / degrees.sqrt()).sqrt()
    };
    t.clamp(0.0, 1.0)
}

/// Configuration for [`TschuprowsT`]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TschuprowsTConfig {
    /// Category bound shared by both variables
    pub num_classes: usize,
    pub bias_correction: bool,
    pub nan_strategy: NanStrategy,
}

impl TschuprowsTConfig {
    #[must_use]
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            bias_correction: true,
            nan_strategy: NanStrategy::default(),
        }
    }
}

/// Streaming Tschuprow's T over a fixed category bound.
///
/// Both inputs are float arrays, either 1-d category vectors (NaN
/// allowed, resolved by the NaN strategy) or 2-d score matrices
/// reduced by arg-max along axis 1.
#[derive(Clone, Debug, PartialEq)]
pub struct TschuprowsT {
    config: TschuprowsTConfig,
    state: Array2<i64>,
}

impl TschuprowsT {
    /// # Errors
    /// Returns an error when `num_classes` is below 2.
    pub fn new(config: TschuprowsTConfig) -> Result<Self> {
        if config.num_classes < 2 {
            return Err(MetricError::InvalidNumClasses(config.num_classes));
        }
        Ok(Self {
            config,
            state: Array2::zeros((config.num_classes, config.num_classes)),
        })
    }

    /// The validated configuration
    #[must_use]
    pub fn config(&self) -> &TschuprowsTConfig {
        &self.config
    }

    /// The accumulated joint frequency table
    #[must_use]
    pub fn table(&self) -> &Array2<i64> {
        &self.state
    }
}

impl<'a> Metric<'a> for TschuprowsT {
    type Input = (&'a ArrayD<f64>, &'a ArrayD<f64>);
    type Output = f64;

    fn update(&mut self, (preds, target): Self::Input) -> Result<()> {
        let pairs = paired_categories(preds, target, self.config.nan_strategy)?;
        let pairs = check_pairs(&pairs, self.config.num_classes)?;
        for (row, col) in pairs {
            self.state[[row, col]] += 1;
        }
        Ok(())
    }

    fn compute(&self) -> Result<Self::Output> {
        Ok(tschuprows_t_from_table(
            &self.state,
            self.config.bias_correction,
        ))
    }

    fn merge(&mut self, other: &Self) {
        debug_assert_eq!(self.config.num_classes, other.config.num_classes);
        self.state += &other.state;
    }

    fn reset(&mut self) {
        self.state.fill(0);
    }

    fn name(&self) -> &'static str {
        "tschuprows_t"
    }
}

/// One-shot Tschuprow's T with the category bound inferred from the
/// data. NaN resolves by the default replace-with-zero strategy.
///
/// # Errors
/// Returns an error on malformed inputs or negative categories.
pub fn tschuprows_t(
    preds: &ArrayD<f64>,
    target: &ArrayD<f64>,
    bias_correction: bool,
) -> Result<f64> {
    let pairs = paired_categories(preds, target, NanStrategy::default())?;
    let bound = pairs
        .iter()
        .map(|&(p, t)| p.max(t))
        .max()
        .unwrap_or(-1)
        + 1;
    let bound = usize::try_from(bound).unwrap_or(0);
    let pairs = check_pairs(&pairs, bound)?;
    let mut table = Array2::zeros((bound, bound));
    for (row, col) in pairs {
        table[[row, col]] += 1;
    }
    Ok(tschuprows_t_from_table(&table, bias_correction))
}

/// Pairwise Tschuprow's T over the columns of an observation matrix.
///
/// Each column of the `(N, V)` input is one categorical variable; the
/// result is a symmetric `(V, V)` matrix with unit diagonal.
///
/// # Errors
/// Returns an error on negative categories.
pub fn tschuprows_t_matrix(
    observations: &Array2<f64>,
    bias_correction: bool,
) -> Result<Array2<f64>> {
    let num_variables = observations.ncols();
    let mut out = Array2::zeros((num_variables, num_variables));
    for i in 0..num_variables {
        out[[i, i]] = 1.0;
        let left = observations.column(i).to_owned().into_dyn();
        for j in (i + 1)..num_variables {
            let right = observations.column(j).to_owned().into_dyn();
            let value = tschuprows_t(&left, &right, bias_correction)?;
            out[[i, j]] = value;
            out[[j, i]] = value;
        }
    }
    Ok(out)
}
