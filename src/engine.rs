//! 1フレームごとのリターゲット処理
//!
//! ランドマーク → visibility判定 → 肩・腰・膝のフィルタ → 回転計算（体・指・表情）→ リグ書き込み

use anyhow::Result;
use nalgebra::UnitQuaternion;

use crate::config::{Config, MotionSettings};
use crate::pose::{Category, LandmarkFrame, Side};
use crate::rig::{RigBinding, RigBone, RigWriter, Space};
use crate::tracker::body::{BodyRotations, BodySolver, PosePoints};
use crate::tracker::face::{compute_scalars, map_expression, ExpressionWeights, FaceScalars};
use crate::tracker::filters::JointFilters;
use crate::tracker::finger::{Finger, FingerSolver, HandPose, JOINTS_PER_FINGER};

/// 1フレーム分の計算結果。リグへの適用有無に関係なく全部位を返す
#[derive(Debug, Clone)]
pub struct FrameOutput {
    /// フィルタ後のposeキーポイント。poseが無いフレームは None
    pub points: Option<PosePoints>,
    pub body: Option<BodyRotations>,
    /// `Side::index()` で引く
    pub hands: [Option<HandPose>; 2],
    pub face: Option<FaceScalars>,
    pub expression: Option<ExpressionWeights>,
    /// 実際にリグへ書き込んだボーン・モーフの数
    pub writes: usize,
}

pub struct MotionEngine {
    config: Config,
    filters: JointFilters,
    body: BodySolver,
    fingers: FingerSolver,
    binding_id: Option<u64>,
}

impl MotionEngine {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            filters: JointFilters::from_config(&config.filter),
            body: BodySolver::from_config(&config.solver),
            fingers: FingerSolver::from_config(&config.solver),
            config,
            binding_id: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settings(&self) -> MotionSettings {
        self.config.motion
    }

    /// 不正な設定は拒否して現在の設定を保つ。受け入れた場合はフィルタを作り直す
    pub fn set_config(&mut self, config: Config) -> Result<()> {
        config.validate()?;
        self.filters = JointFilters::from_config(&config.filter);
        self.body = BodySolver::from_config(&config.solver);
        self.fingers = FingerSolver::from_config(&config.solver);
        self.config = config;
        log::debug!("config replaced, filters reset");
        Ok(())
    }

    /// 部位ON/OFFだけ切り替える。フィルタ状態は保持
    pub fn set_settings(&mut self, settings: MotionSettings) {
        self.config.motion = settings;
    }

    /// アバター差し替え時など、フィルタ状態を捨てる
    pub fn reset(&mut self) {
        self.filters.reset();
        self.binding_id = None;
        log::debug!("filters reset");
    }

    /// timestamp_ms は単調増加のミリ秒
    pub fn update<R: RigBinding>(&mut self, frame: &LandmarkFrame, timestamp_ms: f64, rig: &mut R) -> FrameOutput {
        let id = rig.binding_id();
        if self.binding_id != Some(id) {
            if self.binding_id.is_some() {
                log::debug!("rig binding changed to {}, resetting filters", id);
            }
            self.filters.reset();
            self.binding_id = Some(id);
        }

        // poseが無いフレームもフィルタに欠損を伝え、再検出時にリセットさせる
        let mut points = PosePoints::from_frame(frame, self.config.solver.min_visibility);
        points.apply_filters(&mut self.filters, timestamp_ms);

        let has_pose = frame.has(Category::Pose);
        let body = has_pose.then(|| self.body.compute(&points, frame));
        let hands = Side::BOTH.map(|side| self.fingers.compute(frame, side));
        let face = compute_scalars(frame);
        let expression = face.as_ref().map(map_expression);

        let mut writer = RigWriter::new(rig, self.config.motion);
        let mut writes = 0;
        if let Some(body) = &body {
            writes += self.apply_body(&mut writer, body);
        }
        for hand in hands.iter().flatten() {
            writes += self.apply_hand(&mut writer, hand);
        }
        if let Some(weights) = &expression {
            for (morph, weight) in weights.iter() {
                writes += writer.set_morph_weight(morph.name(), weight, self.config.blend.face) as usize;
            }
        }

        FrameOutput {
            points: has_pose.then_some(points),
            body,
            hands,
            face,
            expression,
            writes,
        }
    }

    fn apply_body<R: RigBinding>(&self, writer: &mut RigWriter<'_, R>, body: &BodyRotations) -> usize {
        let f = self.config.blend.body;
        let p = self.config.blend.position;
        // 首と頭で半分ずつ
        let neck = body.head.powf(0.5);

        let mut writes = 0;
        let mut rotate = |bone: RigBone, rotation: UnitQuaternion<f32>| {
            writes += writer.set_rotation(bone, rotation, Space::Local, f) as usize;
        };
        rotate(RigBone::LowerBody, body.lower_body);
        rotate(RigBone::UpperBody, body.upper_body);
        rotate(RigBone::Neck, neck);
        rotate(RigBone::Head, neck);
        for side in Side::BOTH {
            let arm = body.arm(side);
            let leg = body.leg(side);
            rotate(RigBone::Arm(side), arm.arm);
            rotate(RigBone::Elbow(side), arm.elbow);
            rotate(RigBone::Wrist(side), arm.wrist);
            rotate(RigBone::Leg(side), leg.leg);
            rotate(RigBone::Knee(side), leg.knee);
            rotate(RigBone::Ankle(side), leg.ankle);
        }

        if let Some(center) = body.center {
            writes += writer.set_position(RigBone::Center, center, p) as usize;
        }
        for side in Side::BOTH {
            if let Some(target) = body.foot_ik[side.index()] {
                writes += writer.set_position(RigBone::FootIk(side), target, p) as usize;
            }
        }
        writes
    }

    fn apply_hand<R: RigBinding>(&self, writer: &mut RigWriter<'_, R>, hand: &HandPose) -> usize {
        let f = self.config.blend.finger;
        let mut writes = 0;
        for finger in Finger::ALL {
            for joint in 0..JOINTS_PER_FINGER {
                let bone = RigBone::Finger(hand.side, finger, joint);
                writes += writer.set_rotation(bone, hand.rotation(finger, joint), Space::Local, f) as usize;
            }
        }
        writes
    }
}
