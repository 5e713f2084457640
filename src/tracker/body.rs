use nalgebra::{Unit, UnitQuaternion, Vector3};

use super::filters::{FilteredJoint, JointFilters};
use super::geometry::{direction, local_rotation, midpoint, to_rig};
use crate::config::SolverConfig;
use crate::pose::{resolve, resolve_visible, HandKeypoint, Keypoint, LandmarkFrame, PoseKeypoint, Side};

/// 1フレーム分のposeキーポイント（visibility判定・フィルタ適用済み、モデル座標）
#[derive(Debug, Clone)]
pub struct PosePoints {
    points: [Option<Vector3<f32>>; PoseKeypoint::COUNT],
}

impl PosePoints {
    pub fn empty() -> Self {
        Self {
            points: [None; PoseKeypoint::COUNT],
        }
    }

    /// visibility が閾値以下の点は欠損扱い
    pub fn from_frame(frame: &LandmarkFrame, min_visibility: f32) -> Self {
        let mut points = Self::empty();
        for kp in PoseKeypoint::ALL {
            points.points[kp.index()] = resolve_visible(frame, kp, min_visibility);
        }
        points
    }

    pub fn get(&self, keypoint: PoseKeypoint) -> Option<Vector3<f32>> {
        self.points[keypoint.index()]
    }

    pub fn set(&mut self, keypoint: PoseKeypoint, value: Option<Vector3<f32>>) {
        self.points[keypoint.index()] = value;
    }

    /// 肩・腰・膝だけ時系列フィルタを通す
    pub fn apply_filters(&mut self, filters: &mut JointFilters, timestamp_ms: f64) {
        for joint in FilteredJoint::ALL {
            let kp = joint.keypoint();
            let filtered = filters.apply(joint, self.get(kp), timestamp_ms);
            self.set(kp, filtered);
        }
    }

    fn sided(&self, side: Side, left: PoseKeypoint, right: PoseKeypoint) -> Option<Vector3<f32>> {
        self.get(PoseKeypoint::sided(side, left, right))
    }

    fn shoulder_center(&self) -> Option<Vector3<f32>> {
        midpoint(self.get(PoseKeypoint::LeftShoulder), self.get(PoseKeypoint::RightShoulder))
    }

    fn hip_center(&self) -> Option<Vector3<f32>> {
        midpoint(self.get(PoseKeypoint::LeftHip), self.get(PoseKeypoint::RightHip))
    }
}

/// 片腕（腕・ひじ・手首）のローカル回転
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmRotations {
    pub arm: UnitQuaternion<f32>,
    pub elbow: UnitQuaternion<f32>,
    pub wrist: UnitQuaternion<f32>,
}

/// 片脚（足・ひざ・足首）のローカル回転
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegRotations {
    pub leg: UnitQuaternion<f32>,
    pub knee: UnitQuaternion<f32>,
    pub ankle: UnitQuaternion<f32>,
}

impl ArmRotations {
    fn identity() -> Self {
        Self {
            arm: UnitQuaternion::identity(),
            elbow: UnitQuaternion::identity(),
            wrist: UnitQuaternion::identity(),
        }
    }
}

impl LegRotations {
    fn identity() -> Self {
        Self {
            leg: UnitQuaternion::identity(),
            knee: UnitQuaternion::identity(),
            ankle: UnitQuaternion::identity(),
        }
    }
}

/// 体の回転・位置の計算結果
///
/// 回転はすべて親ボーン基準のローカル回転。計算できなかった関節は単位回転
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyRotations {
    pub lower_body: UnitQuaternion<f32>,
    pub upper_body: UnitQuaternion<f32>,
    pub head: UnitQuaternion<f32>,
    /// `Side::index()` で引く
    pub arms: [ArmRotations; 2],
    pub legs: [LegRotations; 2],
    /// センター の目標位置
    pub center: Option<Vector3<f32>>,
    /// 足ＩＫ の目標位置
    pub foot_ik: [Option<Vector3<f32>>; 2],
}

impl BodyRotations {
    pub fn identity() -> Self {
        Self {
            lower_body: UnitQuaternion::identity(),
            upper_body: UnitQuaternion::identity(),
            head: UnitQuaternion::identity(),
            arms: [ArmRotations::identity(); 2],
            legs: [LegRotations::identity(); 2],
            center: None,
            foot_ik: [None; 2],
        }
    }

    pub fn arm(&self, side: Side) -> &ArmRotations {
        &self.arms[side.index()]
    }

    pub fn leg(&self, side: Side) -> &LegRotations {
        &self.legs[side.index()]
    }
}

pub struct BodySolver {
    pose_scale: f32,
    vertical_offset: f32,
    center_rest_height: f32,
    head_rest: Unit<Vector3<f32>>,
    arm_rest: [Unit<Vector3<f32>>; 2],
}

impl BodySolver {
    pub fn from_config(config: &SolverConfig) -> Self {
        Self {
            pose_scale: config.pose_scale,
            vertical_offset: config.vertical_offset,
            center_rest_height: config.center_rest_height,
            head_rest: head_rest_direction(config.head_tilt_deg),
            arm_rest: Side::BOTH.map(|side| arm_rest_direction(side, config.arm_rest_drop_deg)),
        }
    }

    /// 親から子の順に解く: 下半身 → 脚、上半身 → 頭・腕
    pub fn compute(&self, points: &PosePoints, frame: &LandmarkFrame) -> BodyRotations {
        let lower_body = self.compute_lower_body(points);
        let upper_body = self.compute_upper_body(points);

        let head = local_rotation(
            &self.head_rest,
            direction(points.shoulder_center(), points.get(PoseKeypoint::Nose)),
            &upper_body,
        );

        BodyRotations {
            lower_body,
            upper_body,
            head,
            arms: Side::BOTH.map(|side| self.compute_arm(points, frame, side, &upper_body)),
            legs: Side::BOTH.map(|side| self.compute_leg(points, side, &lower_body)),
            center: self.compute_center(points),
            foot_ik: Side::BOTH.map(|side| self.compute_foot_ik(points, side)),
        }
    }

    /// 右腰→左腰 を +X に合わせる
    fn compute_lower_body(&self, points: &PosePoints) -> UnitQuaternion<f32> {
        local_rotation(
            &Vector3::x_axis(),
            direction(points.get(PoseKeypoint::RightHip), points.get(PoseKeypoint::LeftHip)),
            &UnitQuaternion::identity(),
        )
    }

    /// 肩のラインで左右の向きを決め、その座標系で腰→肩の前後・左右の傾きを足す
    fn compute_upper_body(&self, points: &PosePoints) -> UnitQuaternion<f32> {
        let line = local_rotation(
            &Vector3::x_axis(),
            direction(points.get(PoseKeypoint::RightShoulder), points.get(PoseKeypoint::LeftShoulder)),
            &UnitQuaternion::identity(),
        );
        let lean = local_rotation(
            &Vector3::y_axis(),
            direction(points.hip_center(), points.shoulder_center()),
            &line,
        );
        line * lean
    }

    fn compute_arm(
        &self,
        points: &PosePoints,
        frame: &LandmarkFrame,
        side: Side,
        upper_body: &UnitQuaternion<f32>,
    ) -> ArmRotations {
        use PoseKeypoint::*;
        let rest = &self.arm_rest[side.index()];
        let shoulder = points.sided(side, LeftShoulder, RightShoulder);
        let elbow = points.sided(side, LeftElbow, RightElbow);
        let wrist = points.sided(side, LeftWrist, RightWrist);

        let arm = local_rotation(rest, direction(shoulder, elbow), upper_body);
        let arm_world = upper_body * arm;
        let elbow_rot = local_rotation(rest, direction(elbow, wrist), &arm_world);
        let elbow_world = arm_world * elbow_rot;
        // 手首は下半身ではなくひじの子として解く（MMDの階層に合わせる）
        let wrist_rot = local_rotation(rest, hand_direction(points, frame, side), &elbow_world);

        ArmRotations {
            arm,
            elbow: elbow_rot,
            wrist: wrist_rot,
        }
    }

    fn compute_leg(&self, points: &PosePoints, side: Side, lower_body: &UnitQuaternion<f32>) -> LegRotations {
        use PoseKeypoint::*;
        let down = Unit::new_unchecked(-Vector3::y());
        let foot_rest = foot_rest_direction();
        let hip = points.sided(side, LeftHip, RightHip);
        let knee = points.sided(side, LeftKnee, RightKnee);
        let ankle = points.sided(side, LeftAnkle, RightAnkle);
        let toe = points.sided(side, LeftFootIndex, RightFootIndex);

        let leg = local_rotation(&down, direction(hip, knee), lower_body);
        let leg_world = lower_body * leg;
        let knee_rot = local_rotation(&down, direction(knee, ankle), &leg_world);
        let knee_world = leg_world * knee_rot;
        let ankle_rot = local_rotation(&foot_rest, direction(ankle, toe), &knee_world);

        LegRotations {
            leg,
            knee: knee_rot,
            ankle: ankle_rot,
        }
    }

    /// 肩中心と腰中心の中点を、両足首の平均高さを床として配置する
    fn compute_center(&self, points: &PosePoints) -> Option<Vector3<f32>> {
        let torso = to_rig(midpoint(points.shoulder_center(), points.hip_center())?);
        let ankles: Vec<f32> = [PoseKeypoint::LeftAnkle, PoseKeypoint::RightAnkle]
            .iter()
            .filter_map(|&kp| points.get(kp))
            .map(|p| to_rig(p).y)
            .collect();
        if ankles.is_empty() {
            return None;
        }
        let ground = ankles.iter().sum::<f32>() / ankles.len() as f32;
        let s = self.pose_scale;
        Some(Vector3::new(
            torso.x * s,
            (torso.y - ground) * s - self.center_rest_height,
            torso.z * s,
        ))
    }

    /// 同じ側の腰と足首が揃っている時だけ
    fn compute_foot_ik(&self, points: &PosePoints, side: Side) -> Option<Vector3<f32>> {
        points.sided(side, PoseKeypoint::LeftHip, PoseKeypoint::RightHip)?;
        let ankle = points.sided(side, PoseKeypoint::LeftAnkle, PoseKeypoint::RightAnkle)?;
        Some(to_rig(ankle) * self.pose_scale + Vector3::new(0.0, self.vertical_offset, 0.0))
    }
}

/// 手首の向き。手のランドマークがあれば 手首→中指付け根、無ければ pose の 手首→人差し指
fn hand_direction(points: &PosePoints, frame: &LandmarkFrame, side: Side) -> Option<Unit<Vector3<f32>>> {
    let from_hand = direction(
        resolve(frame, Keypoint::Hand(side, HandKeypoint::Wrist)),
        resolve(frame, Keypoint::Hand(side, HandKeypoint::MiddleMcp)),
    );
    from_hand.or_else(|| {
        direction(
            points.sided(side, PoseKeypoint::LeftWrist, PoseKeypoint::RightWrist),
            points.sided(side, PoseKeypoint::LeftIndex, PoseKeypoint::RightIndex),
        )
    })
}

/// 首→鼻の初期方向: +Y を前方 (-Z) へ傾けたもの
pub fn head_rest_direction(tilt_deg: f32) -> Unit<Vector3<f32>> {
    let (sin, cos) = tilt_deg.to_radians().sin_cos();
    Unit::new_normalize(Vector3::new(0.0, cos, -sin))
}

/// 腕の初期方向: 外側へ水平から `drop_deg` 下げた向き
pub fn arm_rest_direction(side: Side, drop_deg: f32) -> Unit<Vector3<f32>> {
    let (sin, cos) = drop_deg.to_radians().sin_cos();
    Unit::new_normalize(Vector3::new(side.sign() * cos, -sin, 0.0))
}

/// 足首→つま先の初期方向: 下前方
pub fn foot_rest_direction() -> Unit<Vector3<f32>> {
    Unit::new_normalize(Vector3::new(0.0, -1.0, -2.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::pose::Landmark;

    const EPS: f32 = 1e-4;

    fn approx_vec(a: &Vector3<f32>, b: &Vector3<f32>, eps: f32) -> bool {
        (a - b).norm() < eps
    }

    fn solver() -> BodySolver {
        BodySolver::from_config(&SolverConfig::default())
    }

    /// モデル座標 (Y下) で指定
    fn make_points(entries: &[(PoseKeypoint, (f32, f32, f32))]) -> PosePoints {
        let mut points = PosePoints::empty();
        for &(kp, (x, y, z)) in entries {
            points.set(kp, Some(Vector3::new(x, y, z)));
        }
        points
    }

    /// 直立・腕は初期姿勢の向き
    fn standing_points() -> Vec<(PoseKeypoint, (f32, f32, f32))> {
        use PoseKeypoint::*;
        let config = SolverConfig::default();
        let left = arm_rest_direction(Side::Left, config.arm_rest_drop_deg);
        let right = arm_rest_direction(Side::Right, config.arm_rest_drop_deg);
        // リグ座標の方向をモデル座標のオフセットへ
        let arm = |origin: (f32, f32, f32), d: &Unit<Vector3<f32>>, len: f32| {
            (origin.0 + d.x * len, origin.1 - d.y * len, origin.2 + d.z * len)
        };
        let ls = (0.2, -0.5, 0.0);
        let rs = (-0.2, -0.5, 0.0);
        let le = arm(ls, &left, 0.3);
        let re = arm(rs, &right, 0.3);
        let lw = arm(le, &left, 0.25);
        let rw = arm(re, &right, 0.25);
        let head = head_rest_direction(config.head_tilt_deg);
        vec![
            (Nose, (0.0, -0.5 - head.y * 0.2, head.z * 0.2)),
            (LeftShoulder, ls),
            (RightShoulder, rs),
            (LeftElbow, le),
            (RightElbow, re),
            (LeftWrist, lw),
            (RightWrist, rw),
            (LeftIndex, arm(lw, &left, 0.08)),
            (RightIndex, arm(rw, &right, 0.08)),
            (LeftHip, (0.1, 0.0, 0.0)),
            (RightHip, (-0.1, 0.0, 0.0)),
            (LeftKnee, (0.1, 0.45, 0.0)),
            (RightKnee, (-0.1, 0.45, 0.0)),
            (LeftAnkle, (0.1, 0.9, 0.0)),
            (RightAnkle, (-0.1, 0.9, 0.0)),
            (LeftFootIndex, (0.1, 0.95, -0.1)),
            (RightFootIndex, (-0.1, 0.95, -0.1)),
        ]
    }

    fn with(
        mut entries: Vec<(PoseKeypoint, (f32, f32, f32))>,
        kp: PoseKeypoint,
        value: (f32, f32, f32),
    ) -> Vec<(PoseKeypoint, (f32, f32, f32))> {
        entries.retain(|(k, _)| *k != kp);
        entries.push((kp, value));
        entries
    }

    fn is_identity(q: &UnitQuaternion<f32>) -> bool {
        q.angle() < 1e-3
    }

    #[test]
    fn test_rest_pose_is_identity() {
        let result = solver().compute(&make_points(&standing_points()), &LandmarkFrame::default());
        assert!(is_identity(&result.lower_body));
        assert!(is_identity(&result.upper_body));
        assert!(is_identity(&result.head), "head angle {}", result.head.angle());
        for side in Side::BOTH {
            let arm = result.arm(side);
            assert!(is_identity(&arm.arm), "{:?} arm {}", side, arm.arm.angle());
            assert!(is_identity(&arm.elbow));
            assert!(is_identity(&arm.wrist));
            let leg = result.leg(side);
            assert!(is_identity(&leg.leg));
            assert!(is_identity(&leg.knee));
            assert!(is_identity(&leg.ankle));
        }
    }

    #[test]
    fn test_empty_points_all_identity() {
        let result = solver().compute(&PosePoints::empty(), &LandmarkFrame::default());
        assert_eq!(result, BodyRotations::identity());
    }

    #[test]
    fn test_arm_raised_horizontal() {
        // 左ひじを肩の真横 (+X) へ
        let entries = with(standing_points(), PoseKeypoint::LeftElbow, (0.5, -0.5, 0.0));
        let result = solver().compute(&make_points(&entries), &LandmarkFrame::default());
        let arm = result.arm(Side::Left).arm;
        let rest = arm_rest_direction(Side::Left, SolverConfig::default().arm_rest_drop_deg);
        assert!(approx_vec(&(arm * rest.into_inner()), &Vector3::x(), EPS));
        assert!((arm.angle() - 35f32.to_radians()).abs() < EPS);
    }

    #[test]
    fn test_lean_forward_upper_body() {
        use PoseKeypoint::*;
        let entries = with(standing_points(), LeftShoulder, (0.2, -0.5, -0.2));
        let entries = with(entries, RightShoulder, (-0.2, -0.5, -0.2));
        let result = solver().compute(&make_points(&entries), &LandmarkFrame::default());
        let spine = Vector3::new(0.0, 0.5, -0.2).normalize();
        assert!(approx_vec(&(result.upper_body * Vector3::y()), &spine, EPS));
        assert!(approx_vec(&(result.upper_body * Vector3::x()), &Vector3::x(), EPS));
    }

    #[test]
    fn test_chain_reproduces_observed_directions() {
        use PoseKeypoint::*;
        // 体をひねり、腕を曲げた姿勢
        let entries = vec![
            (LeftShoulder, (0.18, -0.5, 0.08)),
            (RightShoulder, (-0.18, -0.48, -0.08)),
            (LeftHip, (0.1, 0.0, -0.03)),
            (RightHip, (-0.1, 0.0, 0.03)),
            (LeftElbow, (0.35, -0.3, -0.1)),
            (LeftWrist, (0.3, -0.55, -0.3)),
            (LeftIndex, (0.28, -0.62, -0.35)),
            (LeftKnee, (0.15, 0.4, -0.2)),
            (LeftAnkle, (0.12, 0.8, 0.05)),
            (LeftFootIndex, (0.12, 0.85, -0.08)),
        ];
        let points = make_points(&entries);
        let s = solver();
        let result = s.compute(&points, &LandmarkFrame::default());

        let rest = arm_rest_direction(Side::Left, SolverConfig::default().arm_rest_drop_deg);
        let arm = result.arm(Side::Left);
        let arm_world = result.upper_body * arm.arm;
        let elbow_world = arm_world * arm.elbow;
        let wrist_world = elbow_world * arm.wrist;
        let observed = |a, b| direction(points.get(a), points.get(b)).unwrap().into_inner();
        assert!(approx_vec(&(arm_world * rest.into_inner()), &observed(LeftShoulder, LeftElbow), EPS));
        assert!(approx_vec(&(elbow_world * rest.into_inner()), &observed(LeftElbow, LeftWrist), EPS));
        assert!(approx_vec(&(wrist_world * rest.into_inner()), &observed(LeftWrist, LeftIndex), EPS));

        let leg = result.leg(Side::Left);
        let leg_world = result.lower_body * leg.leg;
        let knee_world = leg_world * leg.knee;
        let ankle_world = knee_world * leg.ankle;
        let down = -Vector3::y();
        assert!(approx_vec(&(leg_world * down), &observed(LeftHip, LeftKnee), EPS));
        assert!(approx_vec(&(knee_world * down), &observed(LeftKnee, LeftAnkle), EPS));
        assert!(approx_vec(
            &(ankle_world * foot_rest_direction().into_inner()),
            &observed(LeftAnkle, LeftFootIndex),
            EPS
        ));
    }

    #[test]
    fn test_missing_elbow_gives_identity_arm() {
        let mut points = make_points(&standing_points());
        points.set(PoseKeypoint::LeftElbow, None);
        let result = solver().compute(&points, &LandmarkFrame::default());
        let arm = result.arm(Side::Left);
        assert_eq!(arm.arm, UnitQuaternion::identity());
        assert_eq!(arm.elbow, UnitQuaternion::identity());
        // 手首は前腕と独立に計算できる
        assert!(is_identity(&arm.wrist));
    }

    #[test]
    fn test_wrist_prefers_hand_landmarks() {
        // 手のランドマークは手首から真下 (モデル座標 +Y) を向く
        let mut hand = vec![Landmark::new(0.0, 0.0, 0.0); HandKeypoint::COUNT];
        hand[HandKeypoint::MiddleMcp.index()] = Landmark::new(0.0, 0.1, 0.0);
        let frame = LandmarkFrame {
            left_hand: Some(hand),
            ..LandmarkFrame::default()
        };
        let points = make_points(&standing_points());
        let result = solver().compute(&points, &frame);
        let arm = result.arm(Side::Left);
        let rest = arm_rest_direction(Side::Left, SolverConfig::default().arm_rest_drop_deg);
        let world = result.upper_body * arm.arm * arm.elbow * arm.wrist;
        assert!(approx_vec(&(world * rest.into_inner()), &-Vector3::y(), EPS));
        // 右手は pose の人差し指で初期姿勢のまま
        assert!(is_identity(&result.arm(Side::Right).wrist));
    }

    #[test]
    fn test_center_position() {
        let result = solver().compute(&make_points(&standing_points()), &LandmarkFrame::default());
        // 胴体中点 y=0.25, 足首 y=-0.9 → (1.15 * 10) - 10
        let center = result.center.unwrap();
        assert!(approx_vec(&center, &Vector3::new(0.0, 1.5, 0.0), EPS));
    }

    #[test]
    fn test_center_requires_ankle() {
        let mut points = make_points(&standing_points());
        points.set(PoseKeypoint::LeftAnkle, None);
        points.set(PoseKeypoint::RightAnkle, None);
        let result = solver().compute(&points, &LandmarkFrame::default());
        assert!(result.center.is_none());
    }

    #[test]
    fn test_foot_ik_position() {
        let result = solver().compute(&make_points(&standing_points()), &LandmarkFrame::default());
        let left = result.foot_ik[Side::Left.index()].unwrap();
        assert!(approx_vec(&left, &Vector3::new(1.0, -2.0, 0.0), EPS));
        let right = result.foot_ik[Side::Right.index()].unwrap();
        assert!(approx_vec(&right, &Vector3::new(-1.0, -2.0, 0.0), EPS));
    }

    #[test]
    fn test_foot_ik_requires_hip() {
        let mut points = make_points(&standing_points());
        points.set(PoseKeypoint::RightHip, None);
        let result = solver().compute(&points, &LandmarkFrame::default());
        assert!(result.foot_ik[Side::Right.index()].is_none());
        assert!(result.foot_ik[Side::Left.index()].is_some());
    }

    #[test]
    fn test_low_visibility_dropped() {
        let mut pose = vec![Landmark::with_visibility(0.0, 0.0, 0.0, 0.9); PoseKeypoint::COUNT];
        pose[PoseKeypoint::LeftKnee.index()] = Landmark::with_visibility(0.1, 0.45, 0.0, 0.05);
        let frame = LandmarkFrame {
            pose: Some(pose),
            ..LandmarkFrame::default()
        };
        let points = PosePoints::from_frame(&frame, 0.1);
        assert!(points.get(PoseKeypoint::LeftKnee).is_none());
        assert!(points.get(PoseKeypoint::RightKnee).is_some());
    }

    #[test]
    fn test_apply_filters_only_touches_filtered_joints() {
        let config = FilterConfig::default();
        let mut filters = JointFilters::from_config(&config);
        let mut points = make_points(&standing_points());
        points.apply_filters(&mut filters, 0.0);

        let moved = with(standing_points(), PoseKeypoint::LeftKnee, (0.3, 0.45, 0.0));
        let moved = with(moved, PoseKeypoint::LeftElbow, (0.5, -0.5, 0.0));
        let mut next = make_points(&moved);
        next.apply_filters(&mut filters, 33.0);

        // 膝は遅れる、ひじは素通し
        let knee = next.get(PoseKeypoint::LeftKnee).unwrap();
        assert!(knee.x > 0.1 && knee.x < 0.3);
        assert_eq!(next.get(PoseKeypoint::LeftElbow), Some(Vector3::new(0.5, -0.5, 0.0)));
    }
}
