pub mod action_log;
pub mod command_audit;
pub mod matches;
pub mod players;
pub mod preferences;
pub mod ratings;
pub mod replays;

pub use action_log::{ActionSource, Model as ActionLog};
pub use command_audit::Model as CommandAudit;
pub use matches::{MatchStatus, Model as Match, ReportedResult};
pub use players::Model as Player;
pub use preferences::Model as Preferences;
pub use ratings::{Model as Rating, RaceCode};
pub use replays::Model as Replay;
