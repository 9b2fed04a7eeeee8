//! Plugins that ship with the client.

mod ban;
mod beep;
mod cqd;

pub use ban::BanPlugin;
pub use beep::BeepPlugin;
pub use cqd::CqdPlugin;
