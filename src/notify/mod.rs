//! Change delivery.
//!
//! - `ChangeHub` - explicit subscribe/unsubscribe notification source
//! - `MainContext` - the single thread allowed to mutate grid state; other
//!   threads hand work to it through a `MainHandle`

pub mod context;
pub mod hub;

pub use context::{MainContext, MainHandle};
pub use hub::{ChangeHub, ChangeNotificationSource, ChangeObserver, SubscriptionId};
