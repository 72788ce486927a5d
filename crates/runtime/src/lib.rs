pub mod clock;
pub mod listeners;
pub mod timers;

pub use clock::*;
pub use listeners::*;
pub use timers::*;
