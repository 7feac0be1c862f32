use crate::engine::Elm;

/// 活性化関数の閉じた集合。
///
/// 各関数は純粋なスカラー関数で、順方向の `apply` と
/// 重み付き和に関する導関数 `derivative` を対で定義する。
/// 関数を追加するときはバリアントを増やし、必ず両方を実装する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// 恒等写像
    Unit,
    Relu,
    Sigmoid,
    Tanh,
    /// ln(1 + e^x)
    Softplus,
}

impl Activation {
    pub fn apply(self, x: Elm) -> Elm {
        match self {
            Activation::Unit => x,
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
            Activation::Softplus => (1.0 + x.exp()).ln(),
        }
    }

    /// 重み付き和 `x` における勾配
    pub fn derivative(self, x: Elm) -> Elm {
        match self {
            Activation::Unit => 1.0,
            Activation::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Sigmoid => {
                let s = 1.0 / (1.0 + (-x).exp());
                s * (1.0 - s)
            }
            Activation::Tanh => 1.0 - x.tanh().powi(2),
            // softplusの導関数はsigmoid
            Activation::Softplus => 1.0 / (1.0 + (-x).exp()),
        }
    }
}
