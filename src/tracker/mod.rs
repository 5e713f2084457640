pub mod body;
pub mod face;
pub mod filters;
pub mod finger;
pub mod geometry;
pub mod kalman;
pub mod one_euro;
pub mod smooth;

pub use body::{ArmRotations, BodyRotations, BodySolver, LegRotations, PosePoints};
pub use face::{compute_scalars, map_expression, ExpressionMorph, ExpressionWeights, FaceScalars};
pub use filters::{AnyFilter, FilteredJoint, JointFilters, PointFilter};
pub use finger::{Finger, FingerSolver, HandPose};
pub use kalman::KalmanFilter;
pub use one_euro::OneEuroFilter;
