pub mod config;
pub mod engine;
pub mod pose;
pub mod rig;
pub mod tracker;

pub use config::{Config, MotionGroup, MotionSettings};
pub use engine::{FrameOutput, MotionEngine};
pub use pose::{Landmark, LandmarkFrame};
pub use rig::{MemoryRig, RigBinding, RigBone, RigWriter, Space};
