use ndarray::{Array1, Array2};
use tracing::debug;

use crate::engine::activation::Activation;
use crate::engine::error::NetworkError;
use crate::engine::layer::{InitStrategy, Layer};
use crate::engine::Elm;

/// 固定トポロジーのネットワークを勾配降下で学習させるトレーナー。
///
/// レイヤー列は構築時に固定され、以降は重みとバイアスの値だけが変化する。
/// `train` の1回の呼び出しが1バッチに相当し、バッチ全体の蓄積が成功した
/// 場合にのみパラメータを更新する。直近バッチの残差平方和は `ssr` で読める。
#[derive(Debug)]
pub struct NetworkTrainer {
    layers: Vec<Layer>,
    learning_rate: Elm,
    ssr: Elm,
    // レイヤーごとの勾配累積。中継レイヤーはNone。
    grad_sums: Vec<Option<(Array2<Elm>, Array2<Elm>)>>,
}

impl NetworkTrainer {
    /// レイヤー列からトレーナーを作る。
    ///
    /// 空のレイヤー列は `ConfigurationMismatch`、隣接レイヤーの入出力サイズが
    /// 連鎖しない場合は `ShapeMismatch`。
    pub fn new(layers: Vec<Layer>, learning_rate: Elm) -> Result<Self, NetworkError> {
        if layers.is_empty() {
            return Err(NetworkError::ConfigurationMismatch {
                layers: 0,
                activations: 0,
            });
        }
        for pair in layers.windows(2) {
            if pair[1].input_size() != pair[0].output_size() {
                return Err(NetworkError::ShapeMismatch {
                    expected: pair[0].output_size(),
                    actual: pair[1].input_size(),
                });
            }
        }
        let grad_sums = layers
            .iter()
            .map(|layer| {
                if layer.is_relay() {
                    None
                } else {
                    let shape = (layer.output_size(), layer.input_size());
                    Some((Array2::zeros(shape), Array2::zeros(shape)))
                }
            })
            .collect();
        Ok(Self {
            layers,
            learning_rate,
            ssr: 0.0,
            grad_sums,
        })
    }

    /// 明示的な重み・バイアス配列からの構築。
    ///
    /// `topology` はレイヤーサイズの列で、先頭が入力レイヤー。空の重み行列は
    /// 中継レイヤーを表す。活性化関数はレイヤーごとに1つで、個数が一致しない
    /// 場合は `ConfigurationMismatch`。次元の不整合はすべて構築時に
    /// `ShapeMismatch` として報告され、`train` まで遅延されることはない。
    pub fn from_arrays(
        topology: &[usize],
        weights: Vec<Vec<Vec<Elm>>>,
        biases: Vec<Vec<Vec<Elm>>>,
        activations: &[Activation],
        learning_rate: Elm,
    ) -> Result<Self, NetworkError> {
        if activations.len() != topology.len() {
            return Err(NetworkError::ConfigurationMismatch {
                layers: topology.len(),
                activations: activations.len(),
            });
        }
        if weights.len() != topology.len() {
            return Err(NetworkError::ShapeMismatch {
                expected: topology.len(),
                actual: weights.len(),
            });
        }
        if biases.len() != topology.len() {
            return Err(NetworkError::ShapeMismatch {
                expected: topology.len(),
                actual: biases.len(),
            });
        }
        let mut layers = Vec::with_capacity(topology.len());
        for (k, (layer_weights, layer_biases)) in weights.iter().zip(biases.iter()).enumerate() {
            let input_size = if k == 0 { topology[0] } else { topology[k - 1] };
            let output_size = topology[k];
            if layer_weights.is_empty() {
                if !layer_biases.is_empty() {
                    return Err(NetworkError::ShapeMismatch {
                        expected: 0,
                        actual: layer_biases.len(),
                    });
                }
                // 中継レイヤーは入出力サイズが等しい
                if input_size != output_size {
                    return Err(NetworkError::ShapeMismatch {
                        expected: input_size,
                        actual: output_size,
                    });
                }
                layers.push(Layer::relay(output_size, activations[k]));
                continue;
            }
            if layer_weights.len() != output_size {
                return Err(NetworkError::ShapeMismatch {
                    expected: output_size,
                    actual: layer_weights.len(),
                });
            }
            for row in layer_weights.iter().chain(layer_biases.iter()) {
                if row.len() != input_size {
                    return Err(NetworkError::ShapeMismatch {
                        expected: input_size,
                        actual: row.len(),
                    });
                }
            }
            if layer_biases.len() != output_size {
                return Err(NetworkError::ShapeMismatch {
                    expected: output_size,
                    actual: layer_biases.len(),
                });
            }
            let w = Array2::from_shape_fn((output_size, input_size), |(i, j)| {
                layer_weights[i][j]
            });
            let b =
                Array2::from_shape_fn((output_size, input_size), |(i, j)| layer_biases[i][j]);
            layers.push(Layer::new(w, b, activations[k])?);
        }
        Self::new(layers, learning_rate)
    }

    /// ランダム初期化による構築。
    ///
    /// 先頭レイヤーは中継、残りは `strategy` に従うランダムな全結合レイヤー。
    /// シードを与えるとネットワーク全体が再現可能になる（レイヤーごとに
    /// `seed + レイヤー添字` を使う）。
    pub fn random(
        topology: &[usize],
        activations: &[Activation],
        strategy: InitStrategy,
        learning_rate: Elm,
        seed: Option<u64>,
    ) -> Result<Self, NetworkError> {
        if activations.len() != topology.len() {
            return Err(NetworkError::ConfigurationMismatch {
                layers: topology.len(),
                activations: activations.len(),
            });
        }
        if topology.is_empty() {
            return Err(NetworkError::ConfigurationMismatch {
                layers: 0,
                activations: 0,
            });
        }
        let mut layers = vec![Layer::relay(topology[0], activations[0])];
        for k in 1..topology.len() {
            layers.push(Layer::random(
                topology[k - 1],
                topology[k],
                strategy,
                activations[k],
                seed.map(|s| s.wrapping_add(k as u64)),
            ));
        }
        Self::new(layers, learning_rate)
    }

    /// 1バッチの学習ステップ。
    ///
    /// 1. 勾配累積をゼロにリセットする。
    /// 2. 各 `(input, target)` を全レイヤーに順伝播させ、残差
    ///    `loss = target - prediction` の平方和をSSRへ蓄積し、`-2 * loss` を
    ///    出発点としてレイヤー列を逆順にたどりながらパラメータ勾配を蓄積する。
    /// 3. バッチ全体の蓄積が成功した後にのみ
    ///    `param -= learning_rate * gradient` を適用する。途中でエラーが
    ///    起きた場合、パラメータと `ssr` は変更されない。
    ///
    /// `inputs` と `targets` は同じ長さの並列な列で、位置で対応付けられる。
    pub fn train(
        &mut self,
        inputs: &[Array1<Elm>],
        targets: &[Array1<Elm>],
    ) -> Result<(), NetworkError> {
        if inputs.len() != targets.len() {
            return Err(NetworkError::ShapeMismatch {
                expected: inputs.len(),
                actual: targets.len(),
            });
        }
        for slot in &mut self.grad_sums {
            if let Some((gw, gb)) = slot {
                gw.fill(0.0);
                gb.fill(0.0);
            }
        }
        let mut ssr = 0.0;
        for (input, target) in inputs.iter().zip(targets.iter()) {
            let mut value = input.to_owned();
            for layer in &mut self.layers {
                value = layer.forward(&value)?;
            }
            let prediction = value;
            if target.len() != prediction.len() {
                return Err(NetworkError::ShapeMismatch {
                    expected: prediction.len(),
                    actual: target.len(),
                });
            }
            let loss = target - &prediction;
            ssr += loss.iter().map(|r| r * r).sum::<Elm>();
            // SSRの残差に関する勾配が逆伝播の出発点
            let mut delta = loss.mapv(|r| -2.0 * r);
            for (layer, slot) in self.layers.iter().zip(self.grad_sums.iter_mut()).rev() {
                let (downstream, grads) = layer.backward(&delta);
                if let (Some((gw_sum, gb_sum)), Some((gw, gb))) = (slot.as_mut(), grads) {
                    *gw_sum += &gw;
                    *gb_sum += &gb;
                }
                delta = downstream;
            }
        }
        for (layer, slot) in self.layers.iter_mut().zip(self.grad_sums.iter()) {
            if let Some((gw_sum, gb_sum)) = slot {
                layer.apply_step(self.learning_rate, gw_sum, gb_sum);
            }
        }
        self.ssr = ssr;
        debug!(ssr, batch = inputs.len(), "applied gradient descent step");
        Ok(())
    }

    /// パラメータを更新せずに全レイヤーを連鎖させた推論。
    pub fn predict(&mut self, input: &Array1<Elm>) -> Result<Array1<Elm>, NetworkError> {
        let mut value = input.to_owned();
        for layer in &mut self.layers {
            value = layer.forward(&value)?;
        }
        Ok(value)
    }

    /// 直近に処理したバッチの残差平方和
    pub fn ssr(&self) -> Elm {
        self.ssr
    }

    pub fn learning_rate(&self) -> Elm {
        self.learning_rate
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
}
