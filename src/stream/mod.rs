pub mod aggregate;
pub mod emitter;
pub mod events;
pub mod line_decoder;
pub mod sse;
pub mod translation;

pub use aggregate::{aggregate, finalize, Completion};
pub use emitter::{translate_stream, ChunkEmitter, Frame, FrameKind};
pub use events::dify_event_stream;
pub use line_decoder::LineDecoder;
pub use translation::{Phase, ResponseMode, Step, Translation};
