pub mod diff;
pub mod extent;

pub use diff::*;
pub use extent::*;
