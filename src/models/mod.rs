pub mod change;
pub mod media_item;
pub mod snapshot;

pub use change::*;
pub use media_item::*;
pub use snapshot::*;
