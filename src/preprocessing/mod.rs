//! Data preprocessing module
//!
//! Provides the preparation steps run before training:
//! - Seeded train/test splitting
//! - Standard scaling fitted on training rows only
//! - Feature/label separation and conversion to `ndarray` matrices

mod scaler;
mod split;
pub mod features;

pub use scaler::StandardScaler;
pub use split::train_test_split;
pub use features::{columns_to_array2, feature_columns, target_array};
