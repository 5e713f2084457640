use nalgebra::Vector3;

use crate::config::FilterConfig;

/// alpha = 1 / (1 + tau/Te), tau = 1/(2*pi*fc)
fn smoothing_factor(te: f32, cutoff: f32) -> f32 {
    let r = 2.0 * std::f32::consts::PI * cutoff * te;
    r / (r + 1.0)
}

/// スカラー1成分の状態
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarState {
    /// 平滑化済みの値
    pub value: f32,
    /// 平滑化済みの変化率 (単位/秒)
    pub derivative: f32,
}

/// 1成分の One Euro Filter パラメータ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OneEuroParams {
    pub min_cutoff: f32,
    pub beta: f32,
    pub d_cutoff: f32,
}

impl OneEuroParams {
    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            min_cutoff: config.min_cutoff,
            beta: config.beta,
            d_cutoff: config.d_cutoff,
        }
    }

    /// 前状態 + 新サンプル + 経過秒 → (新状態, 出力)
    ///
    /// 前状態が無ければ素通し
    pub fn step(&self, prev: Option<ScalarState>, value: f32, dt: f32) -> (ScalarState, f32) {
        let prev = match prev {
            Some(prev) => prev,
            None => {
                let state = ScalarState { value, derivative: 0.0 };
                return (state, value);
            }
        };
        if dt <= 0.0 {
            return (prev, prev.value);
        }

        let dx = (value - prev.value) / dt;
        let a_d = smoothing_factor(dt, self.d_cutoff);
        let edx = a_d * dx + (1.0 - a_d) * prev.derivative;

        // 速いほどカットオフを上げて遅延を減らす
        let cutoff = self.min_cutoff + self.beta * edx.abs();
        let a = smoothing_factor(dt, cutoff);
        let filtered = a * value + (1.0 - a) * prev.value;

        (ScalarState { value: filtered, derivative: edx }, filtered)
    }
}

/// 3D点用 One Euro Filter（x, y, z を独立に処理）
#[derive(Debug, Clone)]
pub struct OneEuroFilter {
    params: OneEuroParams,
    state: Option<[ScalarState; 3]>,
    last_time_ms: Option<f64>,
}

impl OneEuroFilter {
    pub fn new(min_cutoff: f32, beta: f32, d_cutoff: f32) -> Self {
        Self::with_params(OneEuroParams { min_cutoff, beta, d_cutoff })
    }

    pub fn with_params(params: OneEuroParams) -> Self {
        Self {
            params,
            state: None,
            last_time_ms: None,
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::with_params(OneEuroParams::from_config(config))
    }

    /// timestamp_ms は単調増加のミリ秒。フレーム間隔は不定でよい
    pub fn filter(&mut self, value: Vector3<f32>, timestamp_ms: f64) -> Vector3<f32> {
        let (state, last_time) = match (self.state, self.last_time_ms) {
            (Some(state), Some(last)) => (state, last),
            _ => {
                self.state = Some([0, 1, 2].map(|i| ScalarState { value: value[i], derivative: 0.0 }));
                self.last_time_ms = Some(timestamp_ms);
                return value;
            }
        };

        let dt = ((timestamp_ms - last_time) / 1000.0) as f32;
        let mut next = state;
        let mut out = Vector3::zeros();
        for i in 0..3 {
            let (s, v) = self.params.step(Some(state[i]), value[i], dt);
            next[i] = s;
            out[i] = v;
        }
        self.state = Some(next);
        if dt > 0.0 {
            self.last_time_ms = Some(timestamp_ms);
        }
        out
    }

    pub fn reset(&mut self) {
        self.state = None;
        self.last_time_ms = None;
    }
}
