//! 定位置モデルのスカラー Kalman フィルタ
//!
//! x, y, z は独立に処理する。各成分で
//! 予測: P = P + Q, 更新: K = P / (P + R), x = x + K(z - x), P = (1 - K)P

use nalgebra::Vector3;

use crate::config::FilterConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanState {
    pub estimate: f32,
    /// 推定誤差の分散
    pub covariance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanParams {
    pub process_noise: f32,
    pub measurement_noise: f32,
}

impl KalmanParams {
    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            process_noise: config.process_noise,
            measurement_noise: config.measurement_noise,
        }
    }

    /// 前状態 + 観測 → (新状態, 出力)。前状態が無ければ観測値で初期化
    pub fn step(&self, prev: Option<KalmanState>, measurement: f32) -> (KalmanState, f32) {
        let prev = match prev {
            Some(prev) => prev,
            None => {
                let state = KalmanState {
                    estimate: measurement,
                    covariance: self.measurement_noise,
                };
                return (state, measurement);
            }
        };

        let predicted_cov = prev.covariance + self.process_noise;
        let gain = predicted_cov / (predicted_cov + self.measurement_noise);
        let estimate = prev.estimate + gain * (measurement - prev.estimate);
        let covariance = (1.0 - gain) * predicted_cov;

        (KalmanState { estimate, covariance }, estimate)
    }
}

/// 3D点用 Kalman フィルタ
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    params: KalmanParams,
    state: Option<[KalmanState; 3]>,
    last_time_ms: Option<f64>,
}

impl KalmanFilter {
    pub fn new(process_noise: f32, measurement_noise: f32) -> Self {
        Self::with_params(KalmanParams { process_noise, measurement_noise })
    }

    pub fn with_params(params: KalmanParams) -> Self {
        Self {
            params,
            state: None,
            last_time_ms: None,
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::with_params(KalmanParams::from_config(config))
    }

    /// 同一時刻・過去時刻の再入力は無視して直前の推定を返す
    pub fn filter(&mut self, value: Vector3<f32>, timestamp_ms: f64) -> Vector3<f32> {
        let state = match (self.state, self.last_time_ms) {
            (Some(state), Some(last)) if timestamp_ms > last => state,
            (Some(state), Some(_)) => {
                return Vector3::new(state[0].estimate, state[1].estimate, state[2].estimate);
            }
            _ => {
                self.state = Some([0, 1, 2].map(|i| self.params.step(None, value[i]).0));
                self.last_time_ms = Some(timestamp_ms);
                return value;
            }
        };

        let mut next = state;
        let mut out = Vector3::zeros();
        for i in 0..3 {
            let (s, v) = self.params.step(Some(state[i]), value[i]);
            next[i] = s;
            out[i] = v;
        }
        self.state = Some(next);
        self.last_time_ms = Some(timestamp_ms);
        out
    }

    pub fn reset(&mut self) {
        self.state = None;
        self.last_time_ms = None;
    }
}
