pub mod capture;
pub mod frame;

pub use capture::{probe_device, CameraSource, FrameSource};
pub use frame::Frame;
