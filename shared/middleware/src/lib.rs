pub mod cors;
pub mod identity;

pub use cors::*;
pub use identity::*;
