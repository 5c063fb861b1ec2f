pub use sea_orm_migration::prelude::*;

mod m20250801_100000_players_table;
mod m20250801_100100_ratings_table;
mod m20250801_100200_matches_table;
mod m20250801_100300_replays_table;
mod m20250801_100400_preferences_table;
mod m20250801_100500_action_log_table;
mod m20250801_100600_command_audit_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250801_100000_players_table::Migration),
            Box::new(m20250801_100100_ratings_table::Migration),
            Box::new(m20250801_100200_matches_table::Migration),
            Box::new(m20250801_100300_replays_table::Migration),
            Box::new(m20250801_100400_preferences_table::Migration),
            Box::new(m20250801_100500_action_log_table::Migration),
            Box::new(m20250801_100600_command_audit_table::Migration),
        ]
    }
}
