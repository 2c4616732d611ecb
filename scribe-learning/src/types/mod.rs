//! Types for scribe-learning

mod pattern;
mod preference;
mod session;

pub use pattern::*;
pub use preference::*;
pub use session::*;
