//! Guard chain run before every command handler. Guards only read the
//! data layer (plus the one auto-create on first contact) and return
//! violations as data for the view layer to render.

use super::{Command, CommandContext};
use crate::database::entities::Player;
use crate::errors::{LadderError, LadderResult};
use crate::services::data::DataLayer;

/// Runs the full guard chain for `command`, returning the caller's
/// player row on success. The row is auto-created with minimal fields
/// on a player's first interaction.
pub fn check(data: &DataLayer, ctx: &CommandContext, command: Command) -> LadderResult<Player> {
    let player = data.ensure_player(ctx.player_id, &ctx.username);

    if command.dm_only() && !ctx.is_dm {
        return Err(LadderError::Validation(format!(
            "/{} is only available in direct messages",
            command.name()
        )));
    }

    // Gate order matters: each gate exempts its own path and the
    // paths a player must be able to reach before it
    if !player.accepted_tos && command != Command::TermsOfService {
        return Err(LadderError::Validation(
            "accept the terms of service with /termsofservice first".to_string(),
        ));
    }

    if !player.completed_setup
        && !matches!(command, Command::Setup | Command::TermsOfService)
    {
        return Err(LadderError::Validation(
            "complete your profile with /setup first".to_string(),
        ));
    }

    if !player.activated
        && !matches!(
            command,
            Command::Activate | Command::Setup | Command::TermsOfService
        )
    {
        return Err(LadderError::Validation(
            "activate your account with /activate first".to_string(),
        ));
    }

    Ok(player)
}
