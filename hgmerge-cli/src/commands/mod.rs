//! CLI command implementations

pub mod clone;
pub mod gitify;

pub use clone::CloneArgs;
pub use gitify::GitifyArgs;
