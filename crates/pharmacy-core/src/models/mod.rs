//! Domain models for the pharmacy catalog.

mod key;
mod medicine;
mod seed;
mod session;

pub use key::*;
pub use medicine::*;
pub use seed::*;
pub use session::*;
