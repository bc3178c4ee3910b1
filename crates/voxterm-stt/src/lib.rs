pub mod session;
pub mod transcript;

pub use session::{AudioSink, SttConfig, TokenStream, TranscriptionSession};
pub use transcript::TranscriptState;
