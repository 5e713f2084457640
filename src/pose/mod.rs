pub mod frame;
pub mod keypoint;

pub use frame::{resolve, resolve_by_name, resolve_visible, Landmark, LandmarkFrame, FACE_SCALE};
pub use keypoint::{Category, FaceKeypoint, HandKeypoint, Keypoint, PoseKeypoint, Side};
