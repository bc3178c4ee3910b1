pub mod corrector;
pub mod host;
pub mod terminal;

pub use corrector::{Corrector, GrokCorrector, NoopCorrector};
pub use host::DispatchHost;
pub use terminal::{KittyTerminal, Terminal};
