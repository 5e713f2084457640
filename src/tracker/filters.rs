use nalgebra::Vector3;

use super::kalman::KalmanFilter;
use super::one_euro::OneEuroFilter;
use crate::config::{FilterConfig, FilterKind};
use crate::pose::PoseKeypoint;

/// 時系列フィルタの共通インターフェース
pub trait PointFilter {
    fn filter(&mut self, value: Vector3<f32>, timestamp_ms: f64) -> Vector3<f32>;
    fn reset(&mut self);
}

impl PointFilter for OneEuroFilter {
    fn filter(&mut self, value: Vector3<f32>, timestamp_ms: f64) -> Vector3<f32> {
        OneEuroFilter::filter(self, value, timestamp_ms)
    }

    fn reset(&mut self) {
        OneEuroFilter::reset(self)
    }
}

impl PointFilter for KalmanFilter {
    fn filter(&mut self, value: Vector3<f32>, timestamp_ms: f64) -> Vector3<f32> {
        KalmanFilter::filter(self, value, timestamp_ms)
    }

    fn reset(&mut self) {
        KalmanFilter::reset(self)
    }
}

/// 設定で切り替える具体フィルタ
#[derive(Debug, Clone)]
pub enum AnyFilter {
    OneEuro(OneEuroFilter),
    Kalman(KalmanFilter),
    Passthrough,
}

impl AnyFilter {
    pub fn from_config(config: &FilterConfig) -> Self {
        match config.kind {
            FilterKind::OneEuro => AnyFilter::OneEuro(OneEuroFilter::from_config(config)),
            FilterKind::Kalman => AnyFilter::Kalman(KalmanFilter::from_config(config)),
            FilterKind::None => AnyFilter::Passthrough,
        }
    }
}

impl PointFilter for AnyFilter {
    fn filter(&mut self, value: Vector3<f32>, timestamp_ms: f64) -> Vector3<f32> {
        match self {
            AnyFilter::OneEuro(f) => f.filter(value, timestamp_ms),
            AnyFilter::Kalman(f) => f.filter(value, timestamp_ms),
            AnyFilter::Passthrough => value,
        }
    }

    fn reset(&mut self) {
        match self {
            AnyFilter::OneEuro(f) => f.reset(),
            AnyFilter::Kalman(f) => f.reset(),
            AnyFilter::Passthrough => {}
        }
    }
}

/// フィルタ対象の関節。ジッターが目立つ肩・腰・膝のみ
///
/// 手首・指は遅延が目立つため対象外
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum FilteredJoint {
    LeftShoulder = 0,
    RightShoulder = 1,
    LeftHip = 2,
    RightHip = 3,
    LeftKnee = 4,
    RightKnee = 5,
}

impl FilteredJoint {
    pub const COUNT: usize = 6;

    pub const ALL: [FilteredJoint; Self::COUNT] = [
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
    ];

    pub fn keypoint(self) -> PoseKeypoint {
        match self {
            Self::LeftShoulder => PoseKeypoint::LeftShoulder,
            Self::RightShoulder => PoseKeypoint::RightShoulder,
            Self::LeftHip => PoseKeypoint::LeftHip,
            Self::RightHip => PoseKeypoint::RightHip,
            Self::LeftKnee => PoseKeypoint::LeftKnee,
            Self::RightKnee => PoseKeypoint::RightKnee,
        }
    }

    pub fn from_keypoint(keypoint: PoseKeypoint) -> Option<Self> {
        Self::ALL.iter().copied().find(|j| j.keypoint() == keypoint)
    }
}

/// 関節ごとに独立したフィルタ（固定長配列）
///
/// 欠損→再検出の時は古い状態で飛ばないようにリセットする
#[derive(Debug, Clone)]
pub struct JointFilters {
    filters: [AnyFilter; FilteredJoint::COUNT],
    present: [bool; FilteredJoint::COUNT],
}

impl JointFilters {
    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            filters: std::array::from_fn(|_| AnyFilter::from_config(config)),
            present: [false; FilteredJoint::COUNT],
        }
    }

    /// 欠損(None)はそのまま返し、次の検出でリセットされるよう記録する
    pub fn apply(
        &mut self,
        joint: FilteredJoint,
        value: Option<Vector3<f32>>,
        timestamp_ms: f64,
    ) -> Option<Vector3<f32>> {
        let i = joint as usize;
        match value {
            Some(v) => {
                if !self.present[i] {
                    self.filters[i].reset();
                    self.present[i] = true;
                }
                Some(self.filters[i].filter(v, timestamp_ms))
            }
            None => {
                self.present[i] = false;
                None
            }
        }
    }

    pub fn reset(&mut self) {
        for f in &mut self.filters {
            f.reset();
        }
        self.present = [false; FilteredJoint::COUNT];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_euro_config() -> FilterConfig {
        FilterConfig {
            kind: FilterKind::OneEuro,
            min_cutoff: 1.0,
            beta: 0.0,
            ..FilterConfig::default()
        }
    }

    #[test]
    fn test_joint_mapping() {
        for j in FilteredJoint::ALL {
            assert_eq!(FilteredJoint::from_keypoint(j.keypoint()), Some(j));
        }
        assert_eq!(FilteredJoint::from_keypoint(PoseKeypoint::LeftWrist), None);
    }

    #[test]
    fn test_joints_do_not_share_state() {
        let mut filters = JointFilters::from_config(&one_euro_config());
        filters.apply(FilteredJoint::LeftShoulder, Some(Vector3::zeros()), 0.0);
        // 別関節の最初のサンプルは素通し
        let p = Vector3::new(5.0, 5.0, 5.0);
        assert_eq!(filters.apply(FilteredJoint::RightShoulder, Some(p), 33.0), Some(p));
    }

    #[test]
    fn test_reset_on_reappear() {
        let mut filters = JointFilters::from_config(&one_euro_config());
        filters.apply(FilteredJoint::LeftKnee, Some(Vector3::zeros()), 0.0);
        filters.apply(FilteredJoint::LeftKnee, Some(Vector3::zeros()), 33.0);
        assert_eq!(filters.apply(FilteredJoint::LeftKnee, None, 66.0), None);
        let p = Vector3::new(1.0, 0.0, 0.0);
        assert_eq!(filters.apply(FilteredJoint::LeftKnee, Some(p), 99.0), Some(p));
    }

    #[test]
    fn test_continuous_presence_is_filtered() {
        let mut filters = JointFilters::from_config(&one_euro_config());
        filters.apply(FilteredJoint::LeftHip, Some(Vector3::zeros()), 0.0);
        let out = filters
            .apply(FilteredJoint::LeftHip, Some(Vector3::new(1.0, 0.0, 0.0)), 33.0)
            .unwrap();
        assert!(out.x > 0.0 && out.x < 1.0);
    }

    #[test]
    fn test_passthrough_kind() {
        let config = FilterConfig { kind: FilterKind::None, ..FilterConfig::default() };
        let mut filters = JointFilters::from_config(&config);
        filters.apply(FilteredJoint::RightHip, Some(Vector3::zeros()), 0.0);
        let p = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(filters.apply(FilteredJoint::RightHip, Some(p), 33.0), Some(p));
    }
}
