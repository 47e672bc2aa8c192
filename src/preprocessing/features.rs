//! Feature/label separation and frame-to-matrix conversion

use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Names of every column of `df` except `drop`, in table order.
///
/// Each dropped column must exist.
pub fn feature_columns(df: &DataFrame, drop: &[String]) -> Result<Vec<String>> {
    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();

    if let Some(missing) = drop.iter().find(|d| !names.contains(d)) {
        return Err(ForecastError::FeatureNotFound(missing.clone()));
    }

    Ok(names.into_iter().filter(|name| !drop.contains(name)).collect())
}

/// Cast the named columns to `f64` and build a row-major matrix
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| column_values(df, col_name))
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]))
}

/// Label vector from one column
pub fn target_array(df: &DataFrame, target: &str) -> Result<Array1<f64>> {
    Ok(Array1::from_vec(column_values(df, target)?))
}

/// Values of one column as `f64`; nulls are rejected
pub fn column_values(df: &DataFrame, col_name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(col_name)
        .map_err(|_| ForecastError::FeatureNotFound(col_name.to_string()))?;
    let series = column.as_materialized_series().cast(&DataType::Float64)?;

    series
        .f64()?
        .into_iter()
        .map(|v| {
            v.ok_or_else(|| {
                ForecastError::DataError(format!("column '{}' contains null values", col_name))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        df! {
            "instant" => [1i64, 2, 3],
            "hr" => [0i64, 1, 2],
            "temp" => [0.2, 0.4, 0.6],
            "cnt" => [16i64, 40, 32],
        }
        .unwrap()
    }

    #[test]
    fn test_feature_columns_keep_order() {
        let drop = vec!["cnt".to_string(), "instant".to_string()];
        let cols = feature_columns(&frame(), &drop).unwrap();
        assert_eq!(cols, vec!["hr".to_string(), "temp".to_string()]);
    }

    #[test]
    fn test_feature_columns_missing_drop() {
        let drop = vec!["casual".to_string()];
        assert!(matches!(
            feature_columns(&frame(), &drop),
            Err(ForecastError::FeatureNotFound(name)) if name == "casual"
        ));
    }

    #[test]
    fn test_columns_to_array2() {
        let x = columns_to_array2(&frame(), &["hr".to_string(), "temp".to_string()]).unwrap();
        assert_eq!(x.dim(), (3, 2));
        assert_eq!(x[[2, 0]], 2.0);
        assert_eq!(x[[1, 1]], 0.4);

        let y = target_array(&frame(), "cnt").unwrap();
        assert_eq!(y.to_vec(), vec![16.0, 40.0, 32.0]);
    }

    #[test]
    fn test_nulls_rejected() {
        let df = df! { "temp" => [Some(0.1), None] }.unwrap();
        assert!(matches!(target_array(&df, "temp"), Err(ForecastError::DataError(_))));
    }
}
