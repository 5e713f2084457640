/// 左右
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    /// 符号: 左 +1, 右 -1（リグ座標のX方向）
    pub fn sign(self) -> f32 {
        match self {
            Side::Left => 1.0,
            Side::Right => -1.0,
        }
    }
}

/// ランドマークのカテゴリ。カテゴリごとに名前→インデックス表を持つ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Pose,
    Hand(Side),
    Face,
}

/// MediaPipe Pose の 33 キーポイントインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum PoseKeypoint {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl PoseKeypoint {
    pub const COUNT: usize = 33;

    pub const ALL: [PoseKeypoint; Self::COUNT] = [
        Self::Nose,
        Self::LeftEyeInner,
        Self::LeftEye,
        Self::LeftEyeOuter,
        Self::RightEyeInner,
        Self::RightEye,
        Self::RightEyeOuter,
        Self::LeftEar,
        Self::RightEar,
        Self::MouthLeft,
        Self::MouthRight,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftPinky,
        Self::RightPinky,
        Self::LeftIndex,
        Self::RightIndex,
        Self::LeftThumb,
        Self::RightThumb,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::LeftHeel,
        Self::RightHeel,
        Self::LeftFootIndex,
        Self::RightFootIndex,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEyeInner => "left_eye_inner",
            Self::LeftEye => "left_eye",
            Self::LeftEyeOuter => "left_eye_outer",
            Self::RightEyeInner => "right_eye_inner",
            Self::RightEye => "right_eye",
            Self::RightEyeOuter => "right_eye_outer",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::MouthLeft => "mouth_left",
            Self::MouthRight => "mouth_right",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftPinky => "left_pinky",
            Self::RightPinky => "right_pinky",
            Self::LeftIndex => "left_index",
            Self::RightIndex => "right_index",
            Self::LeftThumb => "left_thumb",
            Self::RightThumb => "right_thumb",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
            Self::LeftHeel => "left_heel",
            Self::RightHeel => "right_heel",
            Self::LeftFootIndex => "left_foot_index",
            Self::RightFootIndex => "right_foot_index",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kp| kp.name() == name)
    }

    /// 左右で対応するキーポイントを選ぶ
    pub fn sided(side: Side, left: Self, right: Self) -> Self {
        match side {
            Side::Left => left,
            Side::Right => right,
        }
    }
}

/// MediaPipe Hand の 21 キーポイント
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum HandKeypoint {
    Wrist = 0,
    ThumbCmc = 1,
    ThumbMcp = 2,
    ThumbIp = 3,
    ThumbTip = 4,
    IndexMcp = 5,
    IndexPip = 6,
    IndexDip = 7,
    IndexTip = 8,
    MiddleMcp = 9,
    MiddlePip = 10,
    MiddleDip = 11,
    MiddleTip = 12,
    RingMcp = 13,
    RingPip = 14,
    RingDip = 15,
    RingTip = 16,
    PinkyMcp = 17,
    PinkyPip = 18,
    PinkyDip = 19,
    PinkyTip = 20,
}

impl HandKeypoint {
    pub const COUNT: usize = 21;

    pub const ALL: [HandKeypoint; Self::COUNT] = [
        Self::Wrist,
        Self::ThumbCmc,
        Self::ThumbMcp,
        Self::ThumbIp,
        Self::ThumbTip,
        Self::IndexMcp,
        Self::IndexPip,
        Self::IndexDip,
        Self::IndexTip,
        Self::MiddleMcp,
        Self::MiddlePip,
        Self::MiddleDip,
        Self::MiddleTip,
        Self::RingMcp,
        Self::RingPip,
        Self::RingDip,
        Self::RingTip,
        Self::PinkyMcp,
        Self::PinkyPip,
        Self::PinkyDip,
        Self::PinkyTip,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Wrist => "wrist",
            Self::ThumbCmc => "thumb_cmc",
            Self::ThumbMcp => "thumb_mcp",
            Self::ThumbIp => "thumb_ip",
            Self::ThumbTip => "thumb_tip",
            Self::IndexMcp => "index_finger_mcp",
            Self::IndexPip => "index_finger_pip",
            Self::IndexDip => "index_finger_dip",
            Self::IndexTip => "index_finger_tip",
            Self::MiddleMcp => "middle_finger_mcp",
            Self::MiddlePip => "middle_finger_pip",
            Self::MiddleDip => "middle_finger_dip",
            Self::MiddleTip => "middle_finger_tip",
            Self::RingMcp => "ring_finger_mcp",
            Self::RingPip => "ring_finger_pip",
            Self::RingDip => "ring_finger_dip",
            Self::RingTip => "ring_finger_tip",
            Self::PinkyMcp => "pinky_mcp",
            Self::PinkyPip => "pinky_pip",
            Self::PinkyDip => "pinky_dip",
            Self::PinkyTip => "pinky_tip",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kp| kp.name() == name)
    }
}

/// Face Mesh (468点) のうち表情計算に使う点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceKeypoint {
    UpperLipInner,
    LowerLipInner,
    UpperLipOuter,
    LowerLipOuter,
    MouthLeft,
    MouthRight,
    FaceLeft,
    FaceRight,
    LeftBrowInner,
    LeftBrowMid,
    LeftBrowOuter,
    RightBrowInner,
    RightBrowMid,
    RightBrowOuter,
    LeftEyeTop,
    LeftEyeBottom,
    RightEyeTop,
    RightEyeBottom,
    NoseTip,
    Chin,
    Forehead,
}

impl FaceKeypoint {
    pub const COUNT: usize = 21;

    pub const ALL: [FaceKeypoint; Self::COUNT] = [
        Self::UpperLipInner,
        Self::LowerLipInner,
        Self::UpperLipOuter,
        Self::LowerLipOuter,
        Self::MouthLeft,
        Self::MouthRight,
        Self::FaceLeft,
        Self::FaceRight,
        Self::LeftBrowInner,
        Self::LeftBrowMid,
        Self::LeftBrowOuter,
        Self::RightBrowInner,
        Self::RightBrowMid,
        Self::RightBrowOuter,
        Self::LeftEyeTop,
        Self::LeftEyeBottom,
        Self::RightEyeTop,
        Self::RightEyeBottom,
        Self::NoseTip,
        Self::Chin,
        Self::Forehead,
    ];

    /// Face Mesh 上のインデックス
    pub fn index(self) -> usize {
        match self {
            Self::UpperLipInner => 13,
            Self::LowerLipInner => 14,
            Self::UpperLipOuter => 0,
            Self::LowerLipOuter => 17,
            Self::MouthLeft => 291,
            Self::MouthRight => 61,
            Self::FaceLeft => 454,
            Self::FaceRight => 234,
            Self::LeftBrowInner => 336,
            Self::LeftBrowMid => 334,
            Self::LeftBrowOuter => 300,
            Self::RightBrowInner => 107,
            Self::RightBrowMid => 105,
            Self::RightBrowOuter => 70,
            Self::LeftEyeTop => 386,
            Self::LeftEyeBottom => 374,
            Self::RightEyeTop => 159,
            Self::RightEyeBottom => 145,
            Self::NoseTip => 1,
            Self::Chin => 152,
            Self::Forehead => 10,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::UpperLipInner => "upper_lip_inner",
            Self::LowerLipInner => "lower_lip_inner",
            Self::UpperLipOuter => "upper_lip_outer",
            Self::LowerLipOuter => "lower_lip_outer",
            Self::MouthLeft => "mouth_left",
            Self::MouthRight => "mouth_right",
            Self::FaceLeft => "face_left",
            Self::FaceRight => "face_right",
            Self::LeftBrowInner => "left_brow_inner",
            Self::LeftBrowMid => "left_brow_mid",
            Self::LeftBrowOuter => "left_brow_outer",
            Self::RightBrowInner => "right_brow_inner",
            Self::RightBrowMid => "right_brow_mid",
            Self::RightBrowOuter => "right_brow_outer",
            Self::LeftEyeTop => "left_eye_top",
            Self::LeftEyeBottom => "left_eye_bottom",
            Self::RightEyeTop => "right_eye_top",
            Self::RightEyeBottom => "right_eye_bottom",
            Self::NoseTip => "nose_tip",
            Self::Chin => "chin",
            Self::Forehead => "forehead",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kp| kp.name() == name)
    }
}

/// カテゴリ付きのキーポイント
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keypoint {
    Pose(PoseKeypoint),
    Hand(Side, HandKeypoint),
    Face(FaceKeypoint),
}

impl Keypoint {
    /// カテゴリの表から名前を引く。表に無い名前は None
    pub fn from_name(category: Category, name: &str) -> Option<Self> {
        match category {
            Category::Pose => PoseKeypoint::from_name(name).map(Keypoint::Pose),
            Category::Hand(side) => HandKeypoint::from_name(name).map(|kp| Keypoint::Hand(side, kp)),
            Category::Face => FaceKeypoint::from_name(name).map(Keypoint::Face),
        }
    }

    pub fn category(self) -> Category {
        match self {
            Keypoint::Pose(_) => Category::Pose,
            Keypoint::Hand(side, _) => Category::Hand(side),
            Keypoint::Face(_) => Category::Face,
        }
    }

    /// カテゴリ内のランドマーク配列上の位置
    pub fn index(self) -> usize {
        match self {
            Keypoint::Pose(kp) => kp.index(),
            Keypoint::Hand(_, kp) => kp.index(),
            Keypoint::Face(kp) => kp.index(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_keypoint_table() {
        assert_eq!(PoseKeypoint::COUNT, 33);
        for (i, kp) in PoseKeypoint::ALL.iter().enumerate() {
            assert_eq!(kp.index(), i);
            assert_eq!(PoseKeypoint::from_name(kp.name()), Some(*kp));
        }
        assert_eq!(PoseKeypoint::from_index(33), None);
    }

    #[test]
    fn test_hand_keypoint_table() {
        for (i, kp) in HandKeypoint::ALL.iter().enumerate() {
            assert_eq!(kp.index(), i);
            assert_eq!(HandKeypoint::from_name(kp.name()), Some(*kp));
        }
        assert_eq!(HandKeypoint::from_index(20), Some(HandKeypoint::PinkyTip));
    }

    #[test]
    fn test_face_keypoint_names_unique() {
        for kp in FaceKeypoint::ALL {
            assert_eq!(FaceKeypoint::from_name(kp.name()), Some(kp));
            assert!(kp.index() < 468);
        }
    }

    #[test]
    fn test_from_name_is_category_specific() {
        assert_eq!(
            Keypoint::from_name(Category::Pose, "right_elbow"),
            Some(Keypoint::Pose(PoseKeypoint::RightElbow))
        );
        assert_eq!(
            Keypoint::from_name(Category::Face, "mouth_left"),
            Some(Keypoint::Face(FaceKeypoint::MouthLeft))
        );
        // poseの"mouth_left"(9)とfaceの"mouth_left"(291)は別物
        assert_eq!(Keypoint::from_name(Category::Pose, "mouth_left").unwrap().index(), 9);
        assert_eq!(Keypoint::from_name(Category::Face, "mouth_left").unwrap().index(), 291);
        assert_eq!(Keypoint::from_name(Category::Hand(Side::Left), "right_elbow"), None);
    }
}
