//! Camera module - fly camera and its uniform block.

mod camera;

pub use camera::{Camera, CameraInput, CameraTransform, FIELD_OF_VIEW_DEGREES, NEAR_PLANE, FAR_PLANE};
