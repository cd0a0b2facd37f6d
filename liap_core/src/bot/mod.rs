pub mod decision;
mod manager;

pub use decision::BotSkill;
pub use manager::{BotTiming, spawn_driver};
