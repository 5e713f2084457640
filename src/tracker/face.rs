//! 顔ランドマークの距離比から表情スカラーを求め、モーフ重みに変換する

use nalgebra::Vector3;

use super::geometry::{midpoint, to_rig, MIN_DIRECTION_LENGTH};
use crate::pose::{resolve, Category, FaceKeypoint, Keypoint, LandmarkFrame};

/// 唇の隙間 / 口幅
const OPEN_RANGE: (f32, f32) = (0.05, 0.75);
const OPEN_CEILING: f32 = 0.7;
/// 口幅 / 顔幅
const WIDTH_RANGE: (f32, f32) = (0.30, 0.50);
/// 口角の持ち上がり / 口幅
const SMILE_RANGE: (f32, f32) = (-0.1, 0.1);
/// (眉 - 目の上端) / 顔幅
const BROW_RANGE: (f32, f32) = (0.08, 0.16);

/// 表情スカラー。欠損時はすべて 0（中立）
///
/// - `openness`: 0..=0.7
/// - `width`, `smile`, `brow`: -1..=1
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FaceScalars {
    pub openness: f32,
    pub width: f32,
    pub smile: f32,
    pub brow: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum ExpressionMorph {
    A = 0,
    I = 1,
    U = 2,
    E = 3,
    O = 4,
    Smile = 5,
    MouthCornerDown = 6,
    BrowUp = 7,
    BrowDown = 8,
}

impl ExpressionMorph {
    pub const COUNT: usize = 9;

    pub const ALL: [ExpressionMorph; Self::COUNT] = [
        Self::A,
        Self::I,
        Self::U,
        Self::E,
        Self::O,
        Self::Smile,
        Self::MouthCornerDown,
        Self::BrowUp,
        Self::BrowDown,
    ];

    /// MMDモデルのモーフ名
    pub fn name(self) -> &'static str {
        match self {
            Self::A => "あ",
            Self::I => "い",
            Self::U => "う",
            Self::E => "え",
            Self::O => "お",
            Self::Smile => "にこり",
            Self::MouthCornerDown => "口角下げ",
            Self::BrowUp => "上",
            Self::BrowDown => "下",
        }
    }
}

/// モーフごとの目標重み (0..=1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpressionWeights {
    weights: [f32; ExpressionMorph::COUNT],
}

impl ExpressionWeights {
    pub fn get(&self, morph: ExpressionMorph) -> f32 {
        self.weights[morph as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ExpressionMorph, f32)> + '_ {
        ExpressionMorph::ALL.iter().map(move |&m| (m, self.get(m)))
    }
}

fn normalize(value: f32, (lo, hi): (f32, f32)) -> f32 {
    (value - lo) / (hi - lo)
}

/// [lo, hi] → [-1, 1]
fn normalize_signed(value: f32, range: (f32, f32)) -> f32 {
    (2.0 * normalize(value, range) - 1.0).clamp(-1.0, 1.0)
}

fn point(frame: &LandmarkFrame, kp: FaceKeypoint) -> Option<Vector3<f32>> {
    resolve(frame, Keypoint::Face(kp)).map(to_rig)
}

fn distance(a: Option<Vector3<f32>>, b: Option<Vector3<f32>>) -> Option<f32> {
    let d = (a? - b?).norm();
    (d > MIN_DIRECTION_LENGTH).then_some(d)
}

fn mean(values: impl Iterator<Item = f32>) -> Option<f32> {
    let (sum, n) = values.fold((0.0, 0), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f32)
}

/// 顔が検出されていなければ None
pub fn compute_scalars(frame: &LandmarkFrame) -> Option<FaceScalars> {
    if !frame.has(Category::Face) {
        return None;
    }
    use FaceKeypoint::*;
    let p = |kp| point(frame, kp);

    let mouth_width = distance(p(MouthLeft), p(MouthRight));
    let face_width = distance(p(FaceLeft), p(FaceRight));

    let openness = mouth_width
        .and_then(|w| {
            // 閉じた唇は 0 距離なので distance() ではなく直接測る
            let gap = (p(UpperLipInner)? - p(LowerLipInner)?).norm();
            Some(normalize(gap / w, OPEN_RANGE).clamp(0.0, OPEN_CEILING))
        })
        .unwrap_or(0.0);

    let width = match (mouth_width, face_width) {
        (Some(m), Some(f)) => normalize_signed(m / f, WIDTH_RANGE),
        _ => 0.0,
    };

    let smile = mouth_width
        .and_then(|w| {
            let center = midpoint(p(UpperLipInner), p(LowerLipInner))?;
            let lift = mean([MouthLeft, MouthRight].into_iter().filter_map(|kp| p(kp)).map(|c| c.y - center.y))?;
            Some(normalize_signed(lift / w, SMILE_RANGE))
        })
        .unwrap_or(0.0);

    let brow_side = |brows: [FaceKeypoint; 3], eye_top: FaceKeypoint| -> Option<f32> {
        let brow_y = mean(brows.into_iter().filter_map(|kp| p(kp)).map(|b| b.y))?;
        Some(brow_y - p(eye_top)?.y)
    };
    let brow = face_width
        .and_then(|f| {
            let lift = mean(
                [
                    brow_side([LeftBrowInner, LeftBrowMid, LeftBrowOuter], LeftEyeTop),
                    brow_side([RightBrowInner, RightBrowMid, RightBrowOuter], RightEyeTop),
                ]
                .into_iter()
                .flatten(),
            )?;
            Some(normalize_signed(lift / f, BROW_RANGE))
        })
        .unwrap_or(0.0);

    Some(FaceScalars {
        openness,
        width,
        smile,
        brow,
    })
}

/// 表情スカラー → モーフ重み
pub fn map_expression(s: &FaceScalars) -> ExpressionWeights {
    let mut weights = [0.0; ExpressionMorph::COUNT];
    let wide = s.width.max(0.0);
    let narrow = (-s.width).max(0.0);
    weights[ExpressionMorph::A as usize] = s.openness.max(0.0).powf(1.5);
    weights[ExpressionMorph::I as usize] = wide * (1.0 - s.openness);
    weights[ExpressionMorph::U as usize] = narrow;
    weights[ExpressionMorph::E as usize] = s.openness * wide;
    weights[ExpressionMorph::O as usize] = narrow * s.openness;
    weights[ExpressionMorph::Smile as usize] = s.smile.max(0.0);
    weights[ExpressionMorph::MouthCornerDown as usize] = (-s.smile).max(0.0);
    weights[ExpressionMorph::BrowUp as usize] = s.brow.max(0.0);
    weights[ExpressionMorph::BrowDown as usize] = (-s.brow).max(0.0);
    for w in &mut weights {
        *w = w.clamp(0.0, 1.0);
    }
    ExpressionWeights { weights }
}
