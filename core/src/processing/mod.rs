pub mod decimation;
pub mod envelope;
pub mod false_color;
pub mod frame;
pub mod normalize;
pub mod resample;
pub mod sync;

pub use decimation::DecimationStage;
pub use envelope::EnvelopeStage;
pub use false_color::{ChannelPair, FalseColorComposer};
pub use frame::FrameAssembler;
pub use normalize::IntensityNormalizer;
pub use resample::ResampleStage;
pub use sync::LineSynchronizer;
