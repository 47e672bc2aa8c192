//! Seeded train/test splitting of data frames

use crate::error::Result;
use crate::training::{CVStrategy, CrossValidator};
use polars::prelude::*;
use tracing::info;

/// Split `df` into `(train, test)` with a seeded shuffle.
///
/// The first `ceil(test_size * n)` shuffled rows form the test subset. Both
/// subsets keep the shuffled row order and are new frames.
pub fn train_test_split(df: &DataFrame, test_size: f64, seed: u64) -> Result<(DataFrame, DataFrame)> {
    let splits = CrossValidator::new(CVStrategy::ShuffleSplit { test_size })
        .with_random_state(seed)
        .split(df.height())?;
    let split = &splits[0];

    let train = take_rows(df, &split.train_indices)?;
    let test = take_rows(df, &split.test_indices)?;

    info!(
        train_rows = train.height(),
        test_rows = test.height(),
        seed,
        "Split data"
    );
    Ok((train, test))
}

fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        indices.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(df.take(&idx)?)
}
