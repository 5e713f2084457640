//! 現在値から目標値へ、固定の割合だけ近づける補間
//!
//! 回転: SLERP（最短経路）, 位置: 成分ごとの線形補間, モーフ: 線形補間 + [0,1] クランプ

use nalgebra::{UnitQuaternion, Vector3};

pub fn blend_rotation(
    current: &UnitQuaternion<f32>,
    target: &UnitQuaternion<f32>,
    factor: f32,
) -> UnitQuaternion<f32> {
    let t = factor.clamp(0.0, 1.0);
    current
        .try_slerp(target, t, 1e-6)
        .unwrap_or_else(|| nlerp(current, target, t))
}

/// SLERPが定義できない（ほぼ同じ回転）時の代替。符号を揃えてから正規化線形補間
fn nlerp(a: &UnitQuaternion<f32>, b: &UnitQuaternion<f32>, t: f32) -> UnitQuaternion<f32> {
    if a.coords.dot(&b.coords) < 0.0 {
        a.nlerp(&UnitQuaternion::new_unchecked(-b.into_inner()), t)
    } else {
        a.nlerp(b, t)
    }
}

pub fn blend_position(current: &Vector3<f32>, target: &Vector3<f32>, factor: f32) -> Vector3<f32> {
    current.lerp(target, factor.clamp(0.0, 1.0))
}

pub fn blend_weight(current: f32, target: f32, factor: f32) -> f32 {
    let t = factor.clamp(0.0, 1.0);
    (current + (target - current) * t).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx_eq_f32(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_factor_extremes() {
        let a = UnitQuaternion::identity();
        let b = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2);
        assert!(blend_rotation(&a, &b, 0.0).angle_to(&a) < 1e-6);
        assert!(blend_rotation(&a, &b, 1.0).angle_to(&b) < 1e-5);
    }

    #[test]
    fn test_rotation_halfway() {
        let a = UnitQuaternion::identity();
        let b = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2);
        let mid = blend_rotation(&a, &b, 0.5);
        assert!(approx_eq_f32(mid.angle(), FRAC_PI_2 / 2.0, 1e-5));
    }

    #[test]
    fn test_repeated_blend_converges_monotonically() {
        let target = UnitQuaternion::from_euler_angles(0.4, -1.2, 2.0);
        for &factor in &[0.1, 0.3, 0.5, 0.9] {
            let mut current = UnitQuaternion::from_euler_angles(-0.3, 0.2, -2.5);
            let mut prev_angle = current.angle_to(&target);
            for _ in 0..60 {
                let next = blend_rotation(&current, &target, factor);
                let angle = next.angle_to(&target);
                assert!(angle <= prev_angle + 1e-5, "factor={} angle grew {} -> {}", factor, prev_angle, angle);
                // 目標を通り過ぎない: 移動量は残り角度以下
                assert!(current.angle_to(&next) <= prev_angle + 1e-5);
                prev_angle = angle;
                current = next;
            }
            assert!(prev_angle < 1e-2, "factor={} did not converge: {}", factor, prev_angle);
        }
    }

    #[test]
    fn test_takes_shortest_path() {
        let a = UnitQuaternion::identity();
        let b = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.5);
        let negated = UnitQuaternion::new_unchecked(-b.into_inner());
        let r1 = blend_rotation(&a, &b, 0.5);
        let r2 = blend_rotation(&a, &negated, 0.5);
        assert!(r1.angle_to(&r2) < 1e-5);
    }

    #[test]
    fn test_nearly_equal_negated_target_stays_unit() {
        let a = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.2);
        let b = UnitQuaternion::new_unchecked(-a.into_inner());
        let r = blend_rotation(&a, &b, 0.5);
        assert!((r.coords.norm() - 1.0).abs() < 1e-5);
        assert!((r.coords - a.coords).norm() < 1e-5);
        assert!((nlerp(&a, &b, 0.5).coords - a.coords).norm() < 1e-5);
    }

    #[test]
    fn test_position_blend() {
        let a = Vector3::new(0.0, 0.0, 0.0);
        let b = Vector3::new(2.0, 4.0, 6.0);
        let r = blend_position(&a, &b, 0.5);
        assert!((r - Vector3::new(1.0, 2.0, 3.0)).norm() < 1e-6);
    }

    #[test]
    fn test_weight_blend_clamped() {
        assert!(approx_eq_f32(blend_weight(0.0, 1.0, 0.5), 0.5, 1e-6));
        assert_eq!(blend_weight(0.9, 3.0, 1.0), 1.0);
        assert_eq!(blend_weight(0.1, -2.0, 1.0), 0.0);
    }
}
