//! 外部リグ（スケルトン・モーフ）への書き込み
//!
//! リグ本体はホスト側の所有物。エンジンは名前でボーン・モーフを引き、
//! 現在値から目標値へ補間して書き込むだけで、リグの型を所有・継承しない

use nalgebra::{UnitQuaternion, Vector3};
use std::collections::HashMap;

use crate::config::{MotionGroup, MotionSettings};
use crate::pose::Side;
use crate::tracker::finger::{Finger, JOINTS_PER_FINGER};
use crate::tracker::smooth::{blend_position, blend_rotation, blend_weight};

/// ホストのリグが提供するボーン・モーフ操作
pub trait RigBinding {
    type Bone: Copy;
    type Morph: Copy;

    /// アバターを読み込み直すたびに変わる識別子
    fn binding_id(&self) -> u64;

    fn find_bone(&self, name: &str) -> Option<Self::Bone>;
    fn find_morph(&self, name: &str) -> Option<Self::Morph>;

    fn rotation(&self, bone: Self::Bone) -> UnitQuaternion<f32>;
    fn set_rotation(&mut self, bone: Self::Bone, rotation: UnitQuaternion<f32>);

    fn position(&self, bone: Self::Bone) -> Vector3<f32>;
    fn set_position(&mut self, bone: Self::Bone, position: Vector3<f32>);

    fn morph_weight(&self, morph: Self::Morph) -> f32;
    fn set_morph_weight(&mut self, morph: Self::Morph, weight: f32);

    /// 親ボーンのワールド回転。階層を持たないリグは単位回転
    fn parent_world_rotation(&self, _bone: Self::Bone) -> UnitQuaternion<f32> {
        UnitQuaternion::identity()
    }
}

/// 目標回転の座標系
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    /// 親ボーン基準
    Local,
    /// ワールド基準。親のワールド回転で割ってから書き込む
    World,
}

/// エンジンが駆動するボーン（MMD標準ボーン名）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RigBone {
    Center,
    UpperBody,
    LowerBody,
    Neck,
    Head,
    Arm(Side),
    Elbow(Side),
    Wrist(Side),
    Leg(Side),
    Knee(Side),
    Ankle(Side),
    FootIk(Side),
    /// joint は 0..JOINTS_PER_FINGER
    Finger(Side, Finger, usize),
}

const FINGER_BONES: [[[&str; JOINTS_PER_FINGER]; Finger::COUNT]; 2] = [
    [
        ["左親指０", "左親指１", "左親指２"],
        ["左人指１", "左人指２", "左人指３"],
        ["左中指１", "左中指２", "左中指３"],
        ["左薬指１", "左薬指２", "左薬指３"],
        ["左小指１", "左小指２", "左小指３"],
    ],
    [
        ["右親指０", "右親指１", "右親指２"],
        ["右人指１", "右人指２", "右人指３"],
        ["右中指１", "右中指２", "右中指３"],
        ["右薬指１", "右薬指２", "右薬指３"],
        ["右小指１", "右小指２", "右小指３"],
    ],
];

fn sided(side: Side, left: &'static str, right: &'static str) -> &'static str {
    match side {
        Side::Left => left,
        Side::Right => right,
    }
}

impl RigBone {
    /// # Panics
    ///
    /// `Finger` の joint が `JOINTS_PER_FINGER` 以上のとき
    pub fn name(self) -> &'static str {
        match self {
            Self::Center => "センター",
            Self::UpperBody => "上半身",
            Self::LowerBody => "下半身",
            Self::Neck => "首",
            Self::Head => "頭",
            Self::Arm(s) => sided(s, "左腕", "右腕"),
            Self::Elbow(s) => sided(s, "左ひじ", "右ひじ"),
            Self::Wrist(s) => sided(s, "左手首", "右手首"),
            Self::Leg(s) => sided(s, "左足", "右足"),
            Self::Knee(s) => sided(s, "左ひざ", "右ひざ"),
            Self::Ankle(s) => sided(s, "左足首", "右足首"),
            Self::FootIk(s) => sided(s, "左足ＩＫ", "右足ＩＫ"),
            Self::Finger(s, finger, joint) => FINGER_BONES[s.index()][finger as usize][joint],
        }
    }

    /// 適用ON/OFFの判定に使うグループ
    pub fn group(self) -> MotionGroup {
        match self {
            Self::Center | Self::UpperBody | Self::LowerBody => MotionGroup::Body,
            Self::Neck | Self::Head => MotionGroup::Head,
            Self::Arm(_) | Self::Elbow(_) | Self::Wrist(_) | Self::Finger(..) => MotionGroup::Arms,
            Self::Leg(_) | Self::Knee(_) | Self::Ankle(_) | Self::FootIk(_) => MotionGroup::Legs,
        }
    }

    /// 全ボーン（指を含む）
    pub fn all() -> Vec<RigBone> {
        let mut bones = vec![Self::Center, Self::UpperBody, Self::LowerBody, Self::Neck, Self::Head];
        for side in Side::BOTH {
            bones.extend([
                Self::Arm(side),
                Self::Elbow(side),
                Self::Wrist(side),
                Self::Leg(side),
                Self::Knee(side),
                Self::Ankle(side),
                Self::FootIk(side),
            ]);
        }
        for side in Side::BOTH {
            for finger in Finger::ALL {
                for joint in 0..JOINTS_PER_FINGER {
                    bones.push(Self::Finger(side, finger, joint));
                }
            }
        }
        bones
    }
}

/// 部位ON/OFFを見ながら補間付きでリグに書き込む
///
/// 戻り値の bool は実際に書き込んだかどうか。無効グループ・リグに無いボーンは false
pub struct RigWriter<'a, R: RigBinding> {
    rig: &'a mut R,
    settings: MotionSettings,
}

impl<'a, R: RigBinding> RigWriter<'a, R> {
    pub fn new(rig: &'a mut R, settings: MotionSettings) -> Self {
        Self { rig, settings }
    }

    pub fn set_rotation(
        &mut self,
        bone: RigBone,
        target: UnitQuaternion<f32>,
        space: Space,
        factor: f32,
    ) -> bool {
        self.set_rotation_by_name(bone.group(), bone.name(), target, space, factor)
    }

    pub fn set_rotation_by_name(
        &mut self,
        group: MotionGroup,
        name: &str,
        target: UnitQuaternion<f32>,
        space: Space,
        factor: f32,
    ) -> bool {
        if !self.settings.is_enabled(group) {
            return false;
        }
        let Some(bone) = self.rig.find_bone(name) else {
            log::trace!("bone {} not found in rig", name);
            return false;
        };
        let target = match space {
            Space::Local => target,
            Space::World => self.rig.parent_world_rotation(bone).inverse() * target,
        };
        let current = self.rig.rotation(bone);
        self.rig.set_rotation(bone, blend_rotation(&current, &target, factor));
        true
    }

    pub fn set_position(&mut self, bone: RigBone, target: Vector3<f32>, factor: f32) -> bool {
        if !self.settings.is_enabled(bone.group()) {
            return false;
        }
        let Some(handle) = self.rig.find_bone(bone.name()) else {
            log::trace!("bone {} not found in rig", bone.name());
            return false;
        };
        let current = self.rig.position(handle);
        self.rig.set_position(handle, blend_position(&current, &target, factor));
        true
    }

    /// モーフは Face グループ
    pub fn set_morph_weight(&mut self, name: &str, target: f32, factor: f32) -> bool {
        if !self.settings.is_enabled(MotionGroup::Face) {
            return false;
        }
        let Some(morph) = self.rig.find_morph(name) else {
            log::trace!("morph {} not found in rig", name);
            return false;
        };
        let current = self.rig.morph_weight(morph);
        self.rig.set_morph_weight(morph, blend_weight(current, target, factor));
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
struct MemoryBone {
    name: String,
    rotation: UnitQuaternion<f32>,
    position: Vector3<f32>,
    parent_world: UnitQuaternion<f32>,
}

/// メモリ上のリグ。テストとリプレイ用
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRig {
    id: u64,
    bones: Vec<MemoryBone>,
    bone_index: HashMap<String, usize>,
    morphs: Vec<(String, f32)>,
    morph_index: HashMap<String, usize>,
}

impl MemoryRig {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            bones: Vec::new(),
            bone_index: HashMap::new(),
            morphs: Vec::new(),
            morph_index: HashMap::new(),
        }
    }

    /// MMD標準ボーン・表情モーフ一式
    pub fn mmd(id: u64) -> Self {
        let mut rig = Self::new(id);
        for bone in RigBone::all() {
            rig.add_bone(bone.name());
        }
        for morph in crate::tracker::face::ExpressionMorph::ALL {
            rig.add_morph(morph.name());
        }
        rig
    }

    /// 指ボーンを持たない体だけのリグ
    pub fn mmd_body_only(id: u64) -> Self {
        let mut rig = Self::new(id);
        for bone in RigBone::all() {
            if !matches!(bone, RigBone::Finger(..)) {
                rig.add_bone(bone.name());
            }
        }
        rig
    }

    pub fn add_bone(&mut self, name: &str) -> usize {
        if let Some(&i) = self.bone_index.get(name) {
            return i;
        }
        let i = self.bones.len();
        self.bones.push(MemoryBone {
            name: name.to_string(),
            rotation: UnitQuaternion::identity(),
            position: Vector3::zeros(),
            parent_world: UnitQuaternion::identity(),
        });
        self.bone_index.insert(name.to_string(), i);
        i
    }

    pub fn add_morph(&mut self, name: &str) -> usize {
        if let Some(&i) = self.morph_index.get(name) {
            return i;
        }
        let i = self.morphs.len();
        self.morphs.push((name.to_string(), 0.0));
        self.morph_index.insert(name.to_string(), i);
        i
    }

    /// 新しいアバターの読み込みを模す
    pub fn set_binding_id(&mut self, id: u64) {
        self.id = id;
    }

    pub fn set_parent_world(&mut self, name: &str, rotation: UnitQuaternion<f32>) {
        if let Some(&i) = self.bone_index.get(name) {
            self.bones[i].parent_world = rotation;
        }
    }

    pub fn bone_rotation(&self, name: &str) -> Option<UnitQuaternion<f32>> {
        self.bone_index.get(name).map(|&i| self.bones[i].rotation)
    }

    pub fn bone_position(&self, name: &str) -> Option<Vector3<f32>> {
        self.bone_index.get(name).map(|&i| self.bones[i].position)
    }

    pub fn morph(&self, name: &str) -> Option<f32> {
        self.morph_index.get(name).map(|&i| self.morphs[i].1)
    }

    /// 登録順
    pub fn bones(&self) -> impl Iterator<Item = (&str, UnitQuaternion<f32>, Vector3<f32>)> + '_ {
        self.bones.iter().map(|b| (b.name.as_str(), b.rotation, b.position))
    }

    pub fn morphs(&self) -> impl Iterator<Item = (&str, f32)> + '_ {
        self.morphs.iter().map(|(name, w)| (name.as_str(), *w))
    }
}

impl RigBinding for MemoryRig {
    type Bone = usize;
    type Morph = usize;

    fn binding_id(&self) -> u64 {
        self.id
    }

    fn find_bone(&self, name: &str) -> Option<usize> {
        self.bone_index.get(name).copied()
    }

    fn find_morph(&self, name: &str) -> Option<usize> {
        self.morph_index.get(name).copied()
    }

    fn rotation(&self, bone: usize) -> UnitQuaternion<f32> {
        self.bones[bone].rotation
    }

    fn set_rotation(&mut self, bone: usize, rotation: UnitQuaternion<f32>) {
        self.bones[bone].rotation = rotation;
    }

    fn position(&self, bone: usize) -> Vector3<f32> {
        self.bones[bone].position
    }

    fn set_position(&mut self, bone: usize, position: Vector3<f32>) {
        self.bones[bone].position = position;
    }

    fn morph_weight(&self, morph: usize) -> f32 {
        self.morphs[morph].1
    }

    fn set_morph_weight(&mut self, morph: usize, weight: f32) {
        self.morphs[morph].1 = weight;
    }

    fn parent_world_rotation(&self, bone: usize) -> UnitQuaternion<f32> {
        self.bones[bone].parent_world
    }
}
