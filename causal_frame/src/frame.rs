//! DataFrame helpers shared by the selector and the estimators.
//!
//! None of these mutate their input; every transformation returns a new frame.

use crate::options::VariableSpec;
use crate::{CausalError, Result};
use nalgebra::{DMatrix, DVector};
use polars::prelude::*;
use tracing::warn;

/// Fails with `MissingColumn` for the first column absent from `df`.
pub fn require_columns(df: &DataFrame, cols: &[String]) -> Result<()> {
    for c in cols {
        if df.column(c).is_err() {
            return Err(CausalError::MissingColumn(c.clone()));
        }
    }
    Ok(())
}

/// Returns a copy of `df` without rows holding nulls in any analysis column.
pub fn clean_dataframe(df: &DataFrame, vars: &VariableSpec) -> Result<DataFrame> {
    let cols = vars.required_columns();
    require_columns(df, &cols)?;

    let clean_df = df.drop_nulls(Some(cols.as_slice()))?;
    let dropped = df.height() - clean_df.height();
    if dropped > 0 {
        warn!(
            dropped,
            remaining = clean_df.height(),
            "Dropped rows with missing values in analysis columns"
        );
    }
    if clean_df.height() == 0 {
        return Err(CausalError::InvalidParameter(
            "No complete rows left after dropping missing values".to_string(),
        ));
    }
    Ok(clean_df)
}

/// Reads a column as `f64`. Nulls become `NaN`.
///
/// Fails with `InvalidParameter` when the cast to Float64 turns values into
/// nulls, i.e. the column holds non-numeric data.
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    Ok(float_column(df, name)?
        .f64()?
        .into_iter()
        .map(|opt| opt.unwrap_or(f64::NAN))
        .collect())
}

/// The non-null, non-NaN values of a column as a Float64 array, in row order.
pub fn observed_values(df: &DataFrame, name: &str) -> Result<Float64Chunked> {
    let column = float_column(df, name)?;
    let values = column.f64()?;
    Ok(values.filter(&values.is_not_nan())?)
}

fn float_column(df: &DataFrame, name: &str) -> Result<Column> {
    let column = df
        .column(name)
        .map_err(|_| CausalError::MissingColumn(name.to_string()))?;
    let nulls_before = column.null_count();
    let cast = column.cast(&DataType::Float64)?;
    if cast.null_count() > nulls_before {
        return Err(CausalError::InvalidParameter(format!(
            "Column '{}' contains non-numeric data",
            name
        )));
    }
    Ok(cast)
}

/// Builds the `rows x cols` feature matrix for `cols`, in the given order.
pub fn design_matrix(df: &DataFrame, cols: &[String]) -> Result<DMatrix<f64>> {
    let columns = cols
        .iter()
        .map(|c| numeric_values(df, c))
        .collect::<Result<Vec<_>>>()?;
    Ok(DMatrix::from_fn(df.height(), cols.len(), |i, j| columns[j][i]))
}

pub fn target_vector(df: &DataFrame, col: &str) -> Result<DVector<f64>> {
    Ok(DVector::from_vec(numeric_values(df, col)?))
}

/// Returns a copy of `df` whose `treatment` column is `value` on every row.
pub fn with_treatment(df: &DataFrame, treatment: &str, value: f64) -> Result<DataFrame> {
    let mut out = df.clone();
    out.with_column(Series::new(treatment.into(), vec![value; df.height()]))?;
    Ok(out)
}
