//! Client core for the pcrdb statistics lookup site: session handling, authenticated
//! fetch, roster sorting and the per-tab query modules. Views render from the module
//! stores; nothing here depends on a UI toolkit.

pub mod admin;
pub mod app;
pub mod clan;
pub mod clan_battle;
pub mod config;
pub mod error;
pub mod grand;
pub mod http;
pub mod player;
pub mod query;
pub mod roster;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod store;
pub mod time_format;

#[cfg(test)]
mod test_support;

pub use app::{App, Tab};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use roster::{RosterSchema, RosterTable, SortState, sort_roster};
pub use session::{Session, SessionStore};
