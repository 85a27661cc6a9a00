pub mod relay;

pub use relay::{NotificationRelay, Subscription};
