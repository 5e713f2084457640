//! 手のランドマークから指の曲げ角を求める
//!
//! 各指は 手首→付け根→…→指先 の4区間。区間ごとに指の既定方向（伸ばした時の向き）から
//! 曲げ軸まわりの符号付き角度を測り、隣り合う区間の角度差を関節の曲げ角とする。
//! 最初の区間（手のひら）は基準にだけ使う

use nalgebra::{Unit, UnitQuaternion, Vector3};
use std::f32::consts::{PI, TAU};

use super::geometry::direction;
use crate::config::SolverConfig;
use crate::pose::{resolve, Category, HandKeypoint, Keypoint, LandmarkFrame, Side};

/// 1本の指で回転を出す関節数（MMDの指ボーン数）
pub const JOINTS_PER_FINGER: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Finger {
    Thumb = 0,
    Index = 1,
    Middle = 2,
    Ring = 3,
    Pinky = 4,
}

impl Finger {
    pub const COUNT: usize = 5;

    pub const ALL: [Finger; Self::COUNT] = [
        Self::Thumb,
        Self::Index,
        Self::Middle,
        Self::Ring,
        Self::Pinky,
    ];

    /// 手首から指先までのランドマーク列
    pub fn chain(self) -> [HandKeypoint; JOINTS_PER_FINGER + 2] {
        use HandKeypoint::*;
        match self {
            Self::Thumb => [Wrist, ThumbCmc, ThumbMcp, ThumbIp, ThumbTip],
            Self::Index => [Wrist, IndexMcp, IndexPip, IndexDip, IndexTip],
            Self::Middle => [Wrist, MiddleMcp, MiddlePip, MiddleDip, MiddleTip],
            Self::Ring => [Wrist, RingMcp, RingPip, RingDip, RingTip],
            Self::Pinky => [Wrist, PinkyMcp, PinkyPip, PinkyDip, PinkyTip],
        }
    }
}

/// 伸ばした指の向き（リグ座標）
pub fn default_direction(side: Side, finger: Finger) -> Unit<Vector3<f32>> {
    let s = side.sign();
    match finger {
        Finger::Thumb => Unit::new_normalize(Vector3::new(s, 1.0, 0.0)),
        _ => Unit::new_normalize(Vector3::new(s, 0.0, 0.0)),
    }
}

/// 曲げの回転軸
pub fn bend_axis(side: Side, finger: Finger) -> Unit<Vector3<f32>> {
    let s = side.sign();
    match finger {
        // 既定方向に垂直で、両手とも前方 (-Z) へ曲がる向き
        Finger::Thumb => Unit::new_normalize(Vector3::new(-1.0, s, 0.0)),
        _ => Unit::new_normalize(Vector3::new(0.0, 0.0, -s)),
    }
}

/// 片手分の曲げ角（ラジアン、クランプ済み）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandPose {
    pub side: Side,
    pub bends: [[f32; JOINTS_PER_FINGER]; Finger::COUNT],
}

impl HandPose {
    /// # Panics
    ///
    /// `joint >= JOINTS_PER_FINGER` のとき
    pub fn bend(&self, finger: Finger, joint: usize) -> f32 {
        self.bends[finger as usize][joint]
    }

    /// 親の指ボーンに対するローカル回転
    ///
    /// # Panics
    ///
    /// `joint >= JOINTS_PER_FINGER` のとき
    pub fn rotation(&self, finger: Finger, joint: usize) -> UnitQuaternion<f32> {
        UnitQuaternion::from_axis_angle(&bend_axis(self.side, finger), self.bend(finger, joint))
    }
}

/// `from` から `to` への `axis` まわりの角度 (-PI, PI]。軸方向の成分は無視される
fn signed_angle(from: &Vector3<f32>, to: &Vector3<f32>, axis: &Vector3<f32>) -> f32 {
    axis.dot(&from.cross(to)).atan2(from.dot(to))
}

/// (-PI, PI] に折り返す
fn wrap_angle(angle: f32) -> f32 {
    PI - (PI - angle).rem_euclid(TAU)
}

pub struct FingerSolver {
    max_bend: f32,
    tip_max_bend: f32,
}

impl FingerSolver {
    pub fn from_config(config: &SolverConfig) -> Self {
        Self {
            max_bend: config.finger_max_bend_deg.to_radians(),
            tip_max_bend: config.finger_tip_max_bend_deg.to_radians(),
        }
    }

    /// 手が検出されていなければ None（その手はスキップ）
    pub fn compute(&self, frame: &LandmarkFrame, side: Side) -> Option<HandPose> {
        if !frame.has(Category::Hand(side)) {
            return None;
        }
        let mut bends = [[0.0; JOINTS_PER_FINGER]; Finger::COUNT];
        for finger in Finger::ALL {
            bends[finger as usize] = self.compute_finger(frame, side, finger);
        }
        Some(HandPose { side, bends })
    }

    fn compute_finger(&self, frame: &LandmarkFrame, side: Side, finger: Finger) -> [f32; JOINTS_PER_FINGER] {
        let default = default_direction(side, finger).into_inner();
        let axis = bend_axis(side, finger).into_inner();
        let points = finger.chain().map(|kp| resolve(frame, Keypoint::Hand(side, kp)));

        // 区間ごとの既定方向からの角度。欠損区間は None
        let mut angles = [None; JOINTS_PER_FINGER + 1];
        for (i, angle) in angles.iter_mut().enumerate() {
            *angle = direction(points[i], points[i + 1]).map(|d| signed_angle(&default, &d, &axis));
        }

        let mut bends = [0.0; JOINTS_PER_FINGER];
        for (joint, bend) in bends.iter_mut().enumerate() {
            if let (Some(parent), Some(child)) = (angles[joint], angles[joint + 1]) {
                *bend = self.clamp_bend(wrap_angle(child - parent), joint);
            }
        }
        bends
    }

    /// 通常の関節は [0, max_bend] に飽和させる
    /// 指先の関節は max_bend を超えても tip_max_bend までは保持し、それ以上は外れ値として 0
    pub fn clamp_bend(&self, angle: f32, joint: usize) -> f32 {
        if !angle.is_finite() || angle <= 0.0 {
            return 0.0;
        }
        if joint + 1 == JOINTS_PER_FINGER {
            if angle > self.tip_max_bend {
                0.0
            } else {
                angle
            }
        } else {
            angle.min(self.max_bend)
        }
    }
}
