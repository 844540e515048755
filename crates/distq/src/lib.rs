pub mod config;
pub mod error;
mod handle;
mod ids;
mod object;
mod peer;
mod quota;
mod system;

pub use config::Config;
pub use distq_core::MessageKind;
pub use error::{EntryError, Result};
pub use handle::Handle;
pub use ids::{HandleId, ObjectId, PeerId};
pub use object::Object;
pub use peer::{Delivery, Peer};
pub use quota::Quota;
pub use system::System;
