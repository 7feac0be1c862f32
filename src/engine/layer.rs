use ndarray::{Array1, Array2};
use ndarray_rand::{rand_distr::Normal, RandomExt};
use rand::{distributions::Uniform, rngs::StdRng, SeedableRng};

use crate::engine::activation::Activation;
use crate::engine::error::NetworkError;
use crate::engine::Elm;

// 重みの初期化戦略
#[derive(Debug, Clone, Copy)]
pub enum InitStrategy {
    XavierNormal,
    XavierUniform,
    HeNormal,
    HeUniform,
}

/// 全結合レイヤー。
///
/// `weights` は `[出力ユニット][入力]` で添字付けされた行列。
/// `biases` は `weights` と同形の行列で、出力ユニットごとの単一バイアスでは
/// ない。各接続が独自のバイアス項を持ち、総和の内側で接続ごとに加算される:
///
/// ```text
/// sum_i = Σ_j (input[j] * weights[i][j] + biases[i][j])
/// output[i] = activation(sum_i)
/// ```
///
/// 加算は入力添字の昇順で行われ、この順序は数値再現性の一部である。
/// 慣習的な「出力ユニットごとのバイアス」へ畳み込んではならない。
///
/// 直近の順伝播の入力・重み付き和・出力はレイヤー上にキャッシュされ、
/// 所有するトレーナーが逆伝播時に順伝播を再計算せずに参照する。
#[derive(Debug)]
pub struct Layer {
    input_size: usize,
    output_size: usize,
    weights: Array2<Elm>,
    biases: Array2<Elm>,
    activation: Activation,
    last_input: Array1<Elm>,
    last_sums: Array1<Elm>,
    last_output: Array1<Elm>,
}

impl Layer {
    /// 明示的な重みとバイアスからレイヤーを作る。
    ///
    /// `biases` の形が `weights` と一致しない場合は `ShapeMismatch`。
    pub fn new(
        weights: Array2<Elm>,
        biases: Array2<Elm>,
        activation: Activation,
    ) -> Result<Self, NetworkError> {
        let (out_rows, in_cols) = weights.dim();
        let (bias_rows, bias_cols) = biases.dim();
        if out_rows != bias_rows {
            return Err(NetworkError::ShapeMismatch {
                expected: out_rows,
                actual: bias_rows,
            });
        }
        if in_cols != bias_cols {
            return Err(NetworkError::ShapeMismatch {
                expected: in_cols,
                actual: bias_cols,
            });
        }
        Ok(Self {
            input_size: in_cols,
            output_size: out_rows,
            weights,
            biases,
            activation,
            last_input: Array1::zeros(in_cols),
            last_sums: Array1::zeros(out_rows),
            last_output: Array1::zeros(out_rows),
        })
    }

    /// パラメータを持たない中継レイヤー。
    ///
    /// 入力を長さを変えずに活性化関数へ通すだけで、学習対象にならない。
    /// トポロジー記述上の入力レイヤーや裸の出力ノードを表す。
    pub fn relay(size: usize, activation: Activation) -> Self {
        Self {
            input_size: size,
            output_size: size,
            weights: Array2::zeros((0, 0)),
            biases: Array2::zeros((0, 0)),
            activation,
            last_input: Array1::zeros(size),
            last_sums: Array1::zeros(size),
            last_output: Array1::zeros(size),
        }
    }

    /// ランダム初期化。バイアスは常にゼロで初期化する。
    pub fn random(
        input_size: usize,
        output_size: usize,
        strategy: InitStrategy,
        activation: Activation,
        seed: Option<u64>,
    ) -> Self {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let shape = (output_size, input_size);
        let weights = match strategy {
            InitStrategy::XavierNormal => {
                let std = (2.0 / (input_size + output_size) as Elm).sqrt();
                Array2::random_using(shape, Normal::new(0.0, std).unwrap(), &mut rng)
            }
            InitStrategy::XavierUniform => {
                let limit = (6.0 / (input_size + output_size) as Elm).sqrt();
                Array2::random_using(shape, Uniform::new(-limit, limit), &mut rng)
            }
            InitStrategy::HeNormal => {
                let std = (2.0 / input_size as Elm).sqrt();
                Array2::random_using(shape, Normal::new(0.0, std).unwrap(), &mut rng)
            }
            InitStrategy::HeUniform => {
                let limit = (6.0 / input_size as Elm).sqrt();
                Array2::random_using(shape, Uniform::new(-limit, limit), &mut rng)
            }
        };
        let biases = Array2::zeros(shape);
        Self {
            input_size,
            output_size,
            weights,
            biases,
            activation,
            last_input: Array1::zeros(input_size),
            last_sums: Array1::zeros(output_size),
            last_output: Array1::zeros(output_size),
        }
    }

    /// 順伝播。
    ///
    /// 入力長が `input_size` と異なる場合は `ShapeMismatch`。
    /// 副作用として入力・重み付き和・出力をキャッシュする。
    pub fn forward(&mut self, input: &Array1<Elm>) -> Result<Array1<Elm>, NetworkError> {
        if input.len() != self.input_size {
            return Err(NetworkError::ShapeMismatch {
                expected: self.input_size,
                actual: input.len(),
            });
        }
        let sums = if self.is_relay() {
            input.to_owned()
        } else {
            let mut sums = Array1::zeros(self.output_size);
            for (i, (w_row, b_row)) in self
                .weights
                .outer_iter()
                .zip(self.biases.outer_iter())
                .enumerate()
            {
                let mut acc = 0.0;
                for ((&w, &b), &x) in w_row.iter().zip(b_row.iter()).zip(input.iter()) {
                    acc += x * w + b;
                }
                sums[i] = acc;
            }
            sums
        };
        let act = self.activation;
        let output = sums.mapv(|s| act.apply(s));
        self.last_input = input.to_owned();
        self.last_sums = sums;
        self.last_output = output.clone();
        Ok(output)
    }

    /// 逆伝播の局所勾配。
    ///
    /// `upstream` は出力に関する損失の勾配。キャッシュされた順伝播の状態から
    /// 入力に関する勾配と、このレイヤーのパラメータ勾配 `(重み, バイアス)` を
    /// 返す。中継レイヤーはパラメータ勾配を持たない。
    /// 直前に同じ入力で `forward` が呼ばれていることが前提。
    pub fn backward(
        &self,
        upstream: &Array1<Elm>,
    ) -> (Array1<Elm>, Option<(Array2<Elm>, Array2<Elm>)>) {
        assert_eq!(
            upstream.len(),
            self.output_size,
            "Upstream gradient length must match the layer output size"
        );
        let act = self.activation;
        let dsums = Array1::from_shape_fn(self.output_size, |i| {
            upstream[i] * act.derivative(self.last_sums[i])
        });
        if self.is_relay() {
            // 中継レイヤーでは重み付き和がそのまま入力
            return (dsums, None);
        }
        let grad_weights = Array2::from_shape_fn((self.output_size, self.input_size), |(i, j)| {
            dsums[i] * self.last_input[j]
        });
        // 接続ごとのバイアスなので ∂sum_i/∂b_ij = 1
        let grad_biases =
            Array2::from_shape_fn((self.output_size, self.input_size), |(i, _)| dsums[i]);
        let downstream = self.weights.t().dot(&dsums);
        (downstream, Some((grad_weights, grad_biases)))
    }

    pub(crate) fn apply_step(
        &mut self,
        learning_rate: Elm,
        grad_weights: &Array2<Elm>,
        grad_biases: &Array2<Elm>,
    ) {
        self.weights.scaled_add(-learning_rate, grad_weights);
        self.biases.scaled_add(-learning_rate, grad_biases);
    }

    pub fn is_relay(&self) -> bool {
        self.weights.nrows() == 0
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn weights(&self) -> &Array2<Elm> {
        &self.weights
    }

    pub fn biases(&self) -> &Array2<Elm> {
        &self.biases
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// 直近の順伝播の出力
    pub fn last_output(&self) -> &Array1<Elm> {
        &self.last_output
    }
}
