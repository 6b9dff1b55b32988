//! Identity resolution and connection construction.

mod alias;
mod helper;
mod info;

pub use alias::Aliases;
pub use helper::AuthHelper;
pub use info::{AuthFields, AuthInfo};
