use thiserror::Error;

/// Construction and forward-pass failures. All are raised synchronously at
/// the point of violation and never retried internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// 入力ベクトル長や重み・バイアス行列の次元が宣言されたトポロジーと一致しない
    #[error("shape mismatch: expected length {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// 活性化関数のリスト長がレイヤー数と一致しない
    #[error("configuration mismatch: {layers} layers but {activations} activation functions")]
    ConfigurationMismatch { layers: usize, activations: usize },
}
