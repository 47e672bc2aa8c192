//! Integration test: model comparison and tuning

use bikeshare_forecast::optimizer::{GridSearchCV, ParamGrid, ParameterValue};
use bikeshare_forecast::training::{
    compare_models, select_model, Estimator, MaxFeatures, ModelType, RandomForest,
    SelectionPolicy, TrainingConfig,
};
use ndarray::{Array1, Array2};

/// 12 features, smooth target with an hour-of-day profile
fn hourly_matrix(n_rows: usize) -> (Array2<f64>, Array1<f64>) {
    let x = Array2::from_shape_fn((n_rows, 12), |(r, c)| match c {
        0 => (r % 24) as f64,
        1 => (r / 24) as f64,
        2 => ((r * 7) % 10) as f64 / 10.0,
        _ => ((r + c) % (c + 2)) as f64,
    });
    let y = Array1::from_shape_fn(n_rows, |r| {
        let hr = (r % 24) as f64;
        40.0 + 15.0 * hr - 0.5 * hr * hr + 2.0 * (r / 24) as f64
    });
    (x, y)
}

#[test]
fn test_compare_models_then_select() {
    let (x, y) = hourly_matrix(240);
    let config = TrainingConfig::default().with_n_estimators(15);

    let comparisons = compare_models(&x, &y, &config).unwrap();
    assert_eq!(comparisons.len(), 3);
    for c in &comparisons {
        assert_eq!(c.cv.mae.scores.len(), 10);
        for (mse, rmse) in c.cv.mse.scores.iter().zip(&c.cv.rmse.scores) {
            assert!((mse.sqrt() - rmse).abs() < 1e-9);
        }
    }

    // nonlinear hour profile: trees beat the linear fit
    let linear = comparisons
        .iter()
        .find(|c| c.model_type == ModelType::LinearRegression)
        .unwrap();
    let forest = comparisons
        .iter()
        .find(|c| c.model_type == ModelType::RandomForest)
        .unwrap();
    assert!(forest.mean_rmse() < linear.mean_rmse());

    assert_eq!(
        select_model(&SelectionPolicy::default(), &comparisons).unwrap(),
        ModelType::RandomForest
    );
    assert_ne!(
        select_model(&SelectionPolicy::MinRmse, &comparisons).unwrap(),
        ModelType::LinearRegression
    );
}

#[test]
fn test_default_grid_search_on_forest() {
    let (x, y) = hourly_matrix(120);
    let base = Estimator::default_for(ModelType::RandomForest, &TrainingConfig::default());

    let grid = ParamGrid::default();
    let result = GridSearchCV::new(grid.clone()).fit(&base, &x, &y).unwrap();

    assert_eq!(result.cv_results.len(), 8);
    assert!(grid.candidates().contains(&result.best_params));
    for c in &result.cv_results {
        assert_eq!(c.split_scores.len(), 5);
        assert!(c.mean_test_score <= result.best_score);
    }

    match &result.best_estimator {
        Estimator::RandomForest(rf) => {
            assert_eq!(
                Some(rf.n_estimators as i64),
                result.best_params["n_estimators"].as_int()
            );
            assert_eq!(rf.n_trees(), rf.n_estimators);
        }
        other => panic!("expected a forest, got {}", other.model_type()),
    }
}

#[test]
fn test_forest_deterministic_under_seed() {
    let (x, y) = hourly_matrix(96);
    let fit = || {
        let mut rf = RandomForest::new_regressor(20)
            .with_max_features(MaxFeatures::Fixed(6))
            .with_max_depth(8)
            .with_random_state(42);
        rf.fit(&x, &y).unwrap();
        rf.predict(&x).unwrap()
    };
    assert_eq!(fit(), fit());
}

#[test]
fn test_grid_rejects_parameter_of_other_family() {
    let (x, y) = hourly_matrix(48);
    let base = Estimator::default_for(ModelType::LinearRegression, &TrainingConfig::default());
    let grid = ParamGrid::new().add("max_depth", vec![ParameterValue::Int(3)]);
    assert!(GridSearchCV::new(grid).fit(&base, &x, &y).is_err());
}
