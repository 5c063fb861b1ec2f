//! Command handlers exposed to the view layer. Each handler runs the
//! guard chain, records a command-audit row and returns typed results;
//! rendering (embeds, modals, deferral tokens) belongs entirely to the
//! caller.

use crate::catalog::{Catalog, RegionCode};
use crate::config::Config;
use crate::database::entities::{Player, Preferences, RaceCode, Rating};
use crate::errors::{LadderError, LadderResult};
use crate::services::data::{DataLayer, FieldDelta, SetupFields};
use crate::services::leaderboard::models::{Page, QueryFilters};
use crate::services::leaderboard::Leaderboard;
use crate::services::matchmaking::Matchmaking;
use crate::utils::types::PlayerId;
use crate::utils::validate::{
    validate_battle_tag, validate_country_shape, validate_display_name, NameAlphabet,
};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;

pub mod guards;

/// The command surface the view layer dispatches into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Setup,
    Activate,
    TermsOfService,
    SetCountry,
    Profile,
    Leaderboard,
    Queue,
    Prune,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Setup => "setup",
            Command::Activate => "activate",
            Command::TermsOfService => "termsofservice",
            Command::SetCountry => "setcountry",
            Command::Profile => "profile",
            Command::Leaderboard => "leaderboard",
            Command::Queue => "queue",
            Command::Prune => "prune",
        }
    }

    /// Commands only usable from a direct-message channel
    pub fn dm_only(&self) -> bool {
        matches!(self, Command::Queue | Command::Prune)
    }
}

/// Who is invoking a command, and from where
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub player_id: PlayerId,
    /// Platform username, used to seed a first-contact player row
    pub username: String,
    pub is_dm: bool,
}

/// `/setup` arguments as collected by the view layer
#[derive(Debug, Clone, Default)]
pub struct SetupArgs {
    pub display_name: String,
    pub battle_tag: Option<String>,
    pub alt_name_1: Option<String>,
    pub alt_name_2: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
}

/// Read-only view of the caller's own profile
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub player: Player,
    pub ratings: Vec<Rating>,
    pub preferences: Option<Preferences>,
}

pub struct Commands {
    data: Arc<DataLayer>,
    catalog: Arc<Catalog>,
    matchmaking: Arc<Matchmaking>,
    leaderboard: Arc<Leaderboard>,
    name_alphabet: NameAlphabet,
    activation_code: Option<String>,
}

impl Commands {
    pub fn new(
        data: Arc<DataLayer>,
        catalog: Arc<Catalog>,
        matchmaking: Arc<Matchmaking>,
        leaderboard: Arc<Leaderboard>,
        config: &Config,
    ) -> Self {
        Self {
            data,
            catalog,
            matchmaking,
            leaderboard,
            name_alphabet: config.name_alphabet,
            activation_code: config.activation_code.clone(),
        }
    }

    fn enter(&self, ctx: &CommandContext, command: Command) -> LadderResult<Player> {
        let player = guards::check(&self.data, ctx, command)?;
        self.data.append_command_audit(ctx.player_id, command.name());
        Ok(player)
    }

    /// `/setup`: creates or updates the profile and logs every field
    /// change
    pub fn setup(&self, ctx: &CommandContext, args: SetupArgs) -> LadderResult<Vec<FieldDelta>> {
        self.enter(ctx, Command::Setup)?;

        validate_display_name(&args.display_name, self.name_alphabet)?;
        for alt in [&args.alt_name_1, &args.alt_name_2].into_iter().flatten() {
            validate_display_name(alt, self.name_alphabet)?;
        }
        if let Some(tag) = &args.battle_tag {
            validate_battle_tag(tag)?;
        }
        if let Some(country) = &args.country {
            self.check_country(country)?;
        }
        let region = match &args.region {
            Some(code) => Some(
                RegionCode::from_str(code)
                    .map_err(|_| {
                        LadderError::Validation(format!("{code:?} is not a known region"))
                    })?
                    .code()
                    .to_string(),
            ),
            None => None,
        };

        self.data.complete_setup(
            ctx.player_id,
            SetupFields {
                display_name: args.display_name,
                battle_tag: args.battle_tag,
                alt_name_1: args.alt_name_1,
                alt_name_2: args.alt_name_2,
                country: args.country,
                region,
            },
        )
    }

    /// `/activate`: one-shot account activation
    pub fn activate(&self, ctx: &CommandContext, code: &str) -> LadderResult<()> {
        self.enter(ctx, Command::Activate)?;

        let accepted = match &self.activation_code {
            Some(expected) => code == expected,
            None => !code.trim().is_empty(),
        };
        if !accepted {
            return Err(LadderError::Validation(
                "that activation code is not valid".to_string(),
            ));
        }
        self.data.activate(ctx.player_id)
    }

    /// `/termsofservice`: records the decision; the acceptance date is
    /// write-once
    pub fn terms_of_service(&self, ctx: &CommandContext, accept: bool) -> LadderResult<()> {
        self.enter(ctx, Command::TermsOfService)?;
        self.data.accept_tos(ctx.player_id, accept)
    }

    /// `/setcountry`
    pub fn set_country(&self, ctx: &CommandContext, code: &str) -> LadderResult<FieldDelta> {
        self.enter(ctx, Command::SetCountry)?;
        self.check_country(code)?;
        self.data.update_country(ctx.player_id, code)
    }

    /// `/profile`: read-only self view
    pub fn profile(&self, ctx: &CommandContext) -> LadderResult<ProfileView> {
        let player = self.enter(ctx, Command::Profile)?;
        Ok(ProfileView {
            ratings: self.data.get_ratings_for(player.id),
            preferences: self.data.get_preferences(player.id),
            player,
        })
    }

    /// `/leaderboard`: paginated, filtered read
    pub async fn leaderboard(
        &self,
        ctx: &CommandContext,
        filters: QueryFilters,
        page: usize,
        page_size: usize,
    ) -> LadderResult<Page> {
        self.enter(ctx, Command::Leaderboard)?;
        if let Some(country) = &filters.country {
            self.check_country(country)?;
        }
        Ok(self.leaderboard.query(&filters, page, page_size).await)
    }

    /// `/queue`: enters matchmaking with the chosen races and vetoes
    pub fn queue(
        &self,
        ctx: &CommandContext,
        races: Vec<RaceCode>,
        vetoes: Vec<String>,
    ) -> LadderResult<()> {
        self.enter(ctx, Command::Queue)?;
        self.matchmaking.join(ctx.player_id, races, vetoes)
    }

    /// Cancels a pending queue entry; safe against a concurrent wave
    pub fn leave_queue(&self, ctx: &CommandContext) -> LadderResult<bool> {
        self.enter(ctx, Command::Queue)?;
        Ok(self.matchmaking.leave(ctx.player_id))
    }

    fn check_country(&self, code: &str) -> LadderResult<()> {
        validate_country_shape(code)?;
        if !self.catalog.is_known_country(code) {
            return Err(LadderError::Validation(format!(
                "{code:?} is not a known country code"
            )));
        }
        Ok(())
    }
}
