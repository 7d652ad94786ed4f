mod constants;
mod fake;
mod pods;
mod store;

pub use constants::*;
pub use fake::*;
pub use pods::*;
pub use store::*;
