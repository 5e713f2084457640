use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub motion: MotionSettings,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub blend: BlendConfig,
    #[serde(default)]
    pub solver: SolverConfig,
}

/// 部位ごとのボーン適用ON/OFF
/// 無効化しても計算は続行し、リグへの書き込みだけを止める
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct MotionSettings {
    #[serde(default = "default_true")]
    pub body: bool,
    #[serde(default = "default_true")]
    pub legs: bool,
    #[serde(default = "default_true")]
    pub arms: bool,
    #[serde(default = "default_true")]
    pub head: bool,
    #[serde(default = "default_true")]
    pub face: bool,
}

/// ボーン・モーフの所属グループ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionGroup {
    Body,
    Legs,
    Arms,
    Head,
    Face,
}

impl MotionSettings {
    pub fn is_enabled(&self, group: MotionGroup) -> bool {
        match group {
            MotionGroup::Body => self.body,
            MotionGroup::Legs => self.legs,
            MotionGroup::Arms => self.arms,
            MotionGroup::Head => self.head,
            MotionGroup::Face => self.face,
        }
    }

    pub fn set(&mut self, group: MotionGroup, enabled: bool) {
        match group {
            MotionGroup::Body => self.body = enabled,
            MotionGroup::Legs => self.legs = enabled,
            MotionGroup::Arms => self.arms = enabled,
            MotionGroup::Head => self.head = enabled,
            MotionGroup::Face => self.face = enabled,
        }
    }
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            body: true,
            legs: true,
            arms: true,
            head: true,
            face: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    OneEuro,
    Kalman,
    None,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FilterConfig {
    #[serde(default = "default_filter_kind")]
    pub kind: FilterKind,
    /// One Euro: 最小カットオフ周波数 (Hz)
    #[serde(default = "default_min_cutoff")]
    pub min_cutoff: f32,
    /// One Euro: 速度係数
    #[serde(default = "default_beta")]
    pub beta: f32,
    /// One Euro: 微分のカットオフ周波数 (Hz)
    #[serde(default = "default_d_cutoff")]
    pub d_cutoff: f32,
    /// Kalman: プロセスノイズ
    #[serde(default = "default_process_noise")]
    pub process_noise: f32,
    /// Kalman: 観測ノイズ
    #[serde(default = "default_measurement_noise")]
    pub measurement_noise: f32,
}

/// 1フレームあたりの目標値への補間率 (0.0..=1.0)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BlendConfig {
    #[serde(default = "default_body_blend")]
    pub body: f32,
    #[serde(default = "default_finger_blend")]
    pub finger: f32,
    #[serde(default = "default_face_blend")]
    pub face: f32,
    #[serde(default = "default_position_blend")]
    pub position: f32,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SolverConfig {
    /// poseキーポイントの最低visibility
    #[serde(default = "default_min_visibility")]
    pub min_visibility: f32,
    /// ワールド座標(m) → リグ座標のスケール
    #[serde(default = "default_pose_scale")]
    pub pose_scale: f32,
    /// 足IKの高さオフセット（リグ単位）
    #[serde(default = "default_vertical_offset")]
    pub vertical_offset: f32,
    /// 直立時の センター 高さ（足首平均からの距離、リグ単位）
    #[serde(default = "default_center_rest_height")]
    pub center_rest_height: f32,
    /// 首→鼻ベクトルの前傾補正角（度）
    #[serde(default = "default_head_tilt_deg")]
    pub head_tilt_deg: f32,
    /// 腕の初期姿勢の水平からの下げ角（度）
    #[serde(default = "default_arm_rest_drop_deg")]
    pub arm_rest_drop_deg: f32,
    #[serde(default = "default_finger_max_bend_deg")]
    pub finger_max_bend_deg: f32,
    #[serde(default = "default_finger_tip_max_bend_deg")]
    pub finger_tip_max_bend_deg: f32,
}

fn default_true() -> bool { true }
fn default_filter_kind() -> FilterKind { FilterKind::OneEuro }
fn default_min_cutoff() -> f32 { 1.0 }
fn default_beta() -> f32 { 0.05 }
fn default_d_cutoff() -> f32 { 1.0 }
fn default_process_noise() -> f32 { 0.01 }
fn default_measurement_noise() -> f32 { 0.1 }
fn default_body_blend() -> f32 { 0.5 }
fn default_finger_blend() -> f32 { 0.7 }
fn default_face_blend() -> f32 { 0.5 }
fn default_position_blend() -> f32 { 0.5 }
fn default_min_visibility() -> f32 { 0.1 }
fn default_pose_scale() -> f32 { 10.0 }
fn default_vertical_offset() -> f32 { 7.0 }
fn default_center_rest_height() -> f32 { 10.0 }
fn default_head_tilt_deg() -> f32 { 20.0 }
fn default_arm_rest_drop_deg() -> f32 { 35.0 }
fn default_finger_max_bend_deg() -> f32 { 70.0 }
fn default_finger_tip_max_bend_deg() -> f32 { 90.0 }

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            kind: default_filter_kind(),
            min_cutoff: default_min_cutoff(),
            beta: default_beta(),
            d_cutoff: default_d_cutoff(),
            process_noise: default_process_noise(),
            measurement_noise: default_measurement_noise(),
        }
    }
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            body: default_body_blend(),
            finger: default_finger_blend(),
            face: default_face_blend(),
            position: default_position_blend(),
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            min_visibility: default_min_visibility(),
            pose_scale: default_pose_scale(),
            vertical_offset: default_vertical_offset(),
            center_rest_height: default_center_rest_height(),
            head_tilt_deg: default_head_tilt_deg(),
            arm_rest_drop_deg: default_arm_rest_drop_deg(),
            finger_max_bend_deg: default_finger_max_bend_deg(),
            finger_tip_max_bend_deg: default_finger_tip_max_bend_deg(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// ファイルが無ければデフォルト値。内容が不正な場合はエラー
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::warn!("{} not found, using default config", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let blends = [
            ("blend.body", self.blend.body),
            ("blend.finger", self.blend.finger),
            ("blend.face", self.blend.face),
            ("blend.position", self.blend.position),
        ];
        for (name, value) in blends {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                bail!("{} must be within 0.0..=1.0, got {}", name, value);
            }
        }

        let positives = [
            ("filter.min_cutoff", self.filter.min_cutoff),
            ("filter.d_cutoff", self.filter.d_cutoff),
            ("filter.process_noise", self.filter.process_noise),
            ("filter.measurement_noise", self.filter.measurement_noise),
            ("solver.pose_scale", self.solver.pose_scale),
            ("solver.finger_max_bend_deg", self.solver.finger_max_bend_deg),
            ("solver.finger_tip_max_bend_deg", self.solver.finger_tip_max_bend_deg),
        ];
        for (name, value) in positives {
            if !value.is_finite() || value <= 0.0 {
                bail!("{} must be positive, got {}", name, value);
            }
        }

        if !self.filter.beta.is_finite() || self.filter.beta < 0.0 {
            bail!("filter.beta must be non-negative, got {}", self.filter.beta);
        }
        if !(0.0..=1.0).contains(&self.solver.min_visibility) {
            bail!(
                "solver.min_visibility must be within 0.0..=1.0, got {}",
                self.solver.min_visibility
            );
        }
        for (name, value) in [
            ("solver.vertical_offset", self.solver.vertical_offset),
            ("solver.center_rest_height", self.solver.center_rest_height),
            ("solver.head_tilt_deg", self.solver.head_tilt_deg),
            ("solver.arm_rest_drop_deg", self.solver.arm_rest_drop_deg),
        ] {
            if !value.is_finite() {
                bail!("{} must be finite", name);
            }
        }
        if self.solver.finger_max_bend_deg > 180.0 || self.solver.finger_tip_max_bend_deg > 180.0 {
            bail!("finger bend limits must not exceed 180 degrees");
        }
        Ok(())
    }
}
