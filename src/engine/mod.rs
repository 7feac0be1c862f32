pub mod activation;
pub mod error;
pub mod layer;
pub mod trainer;

/// 学習器全体で使うスカラー型
pub type Elm = f64;

pub use activation::Activation;
pub use error::NetworkError;
pub use layer::{InitStrategy, Layer};
pub use trainer::NetworkTrainer;
