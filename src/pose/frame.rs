use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::keypoint::{Category, Keypoint, PoseKeypoint, Side};

/// Face Mesh の出力は正規化座標のため、X/Yを広げてZを圧縮する
pub const FACE_SCALE: [f32; 3] = [10.0, 10.0, 5.0];

/// 単一ランドマーク（モデル座標系: X右, Y下）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// poseのみ。検出モデルの可視性スコア (0.0〜1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, visibility: None }
    }

    pub fn with_visibility(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility: Some(visibility) }
    }

    pub fn position(&self) -> Vector3<f32> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// visibilityが閾値を超える点だけ有効。visibilityが無い点は常に有効とみなす
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility.map_or(true, |v| v > threshold)
    }
}

/// 1時刻分の検出結果。領域ごとに未検出(None)または空があり得る
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// ワールド座標の全身ポーズ (33点)
    #[serde(default)]
    pub pose: Option<Vec<Landmark>>,
    #[serde(default)]
    pub left_hand: Option<Vec<Landmark>>,
    #[serde(default)]
    pub right_hand: Option<Vec<Landmark>>,
    /// Face Mesh (468点)
    #[serde(default)]
    pub face: Option<Vec<Landmark>>,
}

impl LandmarkFrame {
    pub fn collection(&self, category: Category) -> Option<&[Landmark]> {
        let landmarks = match category {
            Category::Pose => self.pose.as_ref(),
            Category::Hand(Side::Left) => self.left_hand.as_ref(),
            Category::Hand(Side::Right) => self.right_hand.as_ref(),
            Category::Face => self.face.as_ref(),
        }?;
        if landmarks.is_empty() {
            None
        } else {
            Some(landmarks.as_slice())
        }
    }

    pub fn has(&self, category: Category) -> bool {
        self.collection(category).is_some()
    }

    pub fn is_empty(&self) -> bool {
        [
            Category::Pose,
            Category::Hand(Side::Left),
            Category::Hand(Side::Right),
            Category::Face,
        ]
        .iter()
        .all(|c| !self.has(*c))
    }
}

/// キーポイントを3D点として取り出す。未検出・配列不足は None
///
/// faceは `FACE_SCALE` を適用、pose/handは等倍
pub fn resolve(frame: &LandmarkFrame, keypoint: Keypoint) -> Option<Vector3<f32>> {
    let landmark = frame.collection(keypoint.category())?.get(keypoint.index())?;
    let p = landmark.position();
    if !p.iter().all(|c| c.is_finite()) {
        return None;
    }
    Some(match keypoint {
        Keypoint::Face(_) => Vector3::new(
            p.x * FACE_SCALE[0],
            p.y * FACE_SCALE[1],
            p.z * FACE_SCALE[2],
        ),
        _ => p,
    })
}

/// poseキーポイントをvisibility閾値付きで取り出す
pub fn resolve_visible(
    frame: &LandmarkFrame,
    keypoint: PoseKeypoint,
    min_visibility: f32,
) -> Option<Vector3<f32>> {
    let landmark = frame.collection(Category::Pose)?.get(keypoint.index())?;
    if !landmark.is_visible(min_visibility) {
        return None;
    }
    resolve(frame, Keypoint::Pose(keypoint))
}

/// 名前指定版
///
/// # Panics
///
/// `name` がカテゴリの表に無い場合（呼び出し側のバグ）
pub fn resolve_by_name(frame: &LandmarkFrame, category: Category, name: &str) -> Option<Vector3<f32>> {
    let keypoint = Keypoint::from_name(category, name)
        .unwrap_or_else(|| panic!("unknown keypoint name {:?} for {:?}", name, category));
    resolve(frame, keypoint)
}
