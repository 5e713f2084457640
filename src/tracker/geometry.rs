//! モデル座標 → リグ座標の変換と、回転を求めるための幾何ヘルパー
//!
//! 検出モデルは Y 下向き、リグは Y 上向き。変換は Y 成分の符号反転のみで、
//! 方向ベクトル・位置ともにここを一度だけ通す。

use nalgebra::{Unit, UnitQuaternion, Vector3};
use std::f32::consts::PI;

/// これ未満の長さの方向ベクトルは「2点が一致」とみなす
pub const MIN_DIRECTION_LENGTH: f32 = 1e-6;

/// モデル座標 (Y下) → リグ座標 (Y上)
pub fn to_rig(p: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(p.x, -p.y, p.z)
}

/// from→to の単位方向（リグ座標）。どちらかが欠損または2点が一致すれば None
pub fn direction(from: Option<Vector3<f32>>, to: Option<Vector3<f32>>) -> Option<Unit<Vector3<f32>>> {
    let (from, to) = (from?, to?);
    Unit::try_new(to_rig(to - from), MIN_DIRECTION_LENGTH)
}

pub fn midpoint(a: Option<Vector3<f32>>, b: Option<Vector3<f32>>) -> Option<Vector3<f32>> {
    Some((a? + b?) * 0.5)
}

/// `v` に垂直な任意の単位ベクトル
fn any_perpendicular(v: &Unit<Vector3<f32>>) -> Unit<Vector3<f32>> {
    let helper = if v.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
    Unit::new_normalize(v.cross(&helper))
}

/// `from` を `to` に写す最小回転
///
/// 平行なら単位回転、反平行なら `from` に垂直な軸まわりの180度回転
pub fn shortest_arc(from: &Unit<Vector3<f32>>, to: &Unit<Vector3<f32>>) -> UnitQuaternion<f32> {
    UnitQuaternion::rotation_between_axis(from, to)
        .map(finite_or_identity)
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&any_perpendicular(from), PI))
}

/// 親ボーンのワールド回転で方向をローカル空間に戻し、初期方向からの最小回転を返す
///
/// 方向が無い（点の欠損・一致）場合は単位回転
pub fn local_rotation(
    rest: &Unit<Vector3<f32>>,
    dir: Option<Unit<Vector3<f32>>>,
    parent_world: &UnitQuaternion<f32>,
) -> UnitQuaternion<f32> {
    match dir {
        Some(dir) => {
            let local = Unit::new_normalize(parent_world.inverse() * dir.into_inner());
            shortest_arc(rest, &local)
        }
        None => UnitQuaternion::identity(),
    }
}

/// NaN/inf を含む回転は単位回転に置き換える
pub fn finite_or_identity(q: UnitQuaternion<f32>) -> UnitQuaternion<f32> {
    if q.coords.iter().all(|c| c.is_finite()) {
        q
    } else {
        UnitQuaternion::identity()
    }
}
