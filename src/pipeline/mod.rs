pub mod camera;
pub mod compositor;
pub mod detector;
pub mod raster;
pub mod rgba_converter;
pub mod session;
pub mod snapshot;

pub use camera::{CameraDevice, CameraId, CameraStream, available_cameras, start_camera_stream};
pub use compositor::{Canvas, CompositorOptions, composite_frame, landmarks_for_frame};
pub use detector::{DetectorBackend, DetectorHandle, DetectorStatus, start_detector};
pub use session::{CameraPhase, CameraSession};
pub use snapshot::{encode_snapshot, export_snapshot};
