pub mod auth;
pub mod battle;

pub use auth::*;
pub use battle::{
    BattleEnvelope, BattleSearchRequest, CurrentTimes, HistoryPeriods, ScorelineRequest,
};
