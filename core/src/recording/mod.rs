//! I/O boundary of the decoder: recordings come in, raster images go out.

pub mod loader;
pub mod writer;

pub use loader::{Recording, RecordingInfo, SignalLoader};
pub use writer::{image_file_name, ImageWriter};
