//! Player renames and guild management
//!
//! Names are read from string player variables filled in beforehand,
//! usually by an input prompt.

use super::ExecContext;
use crate::application::api::{EntityChange, Notification, Recipients};
use crate::domain::player::Guild;
use crate::domain::value_objects::*;
use crate::runtime::{InterpreterError, variables};

/// Length in `min..=max` characters; letters, digits, spaces and underscores
pub(crate) fn valid_name(name: &str, min: usize, max: usize) -> bool {
    let length = name.chars().count();
    (min..=max).contains(&length)
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == ' ' || c == '_')
}

fn name_from(ctx: &ExecContext<'_>, variable: VariableId) -> String {
    variables::read_string(&*ctx.world, &*ctx.player, VariableRef::player(variable))
        .trim()
        .to_string()
}

pub(super) fn change_name(ctx: &mut ExecContext<'_>, variable: VariableId, branch_ids: &[BranchId]) {
    let name = name_from(ctx, variable);
    let limits = &ctx.world.config().player;
    let valid = valid_name(&name, limits.min_name_length, limits.max_name_length)
        && !ctx.world.player_name_taken(&name, ctx.player.id);
    if valid {
        log::info!(target: "eventweave::engine", "player {} renamed to {name}", ctx.player.id);
        ctx.player.name = name;
        ctx.entity_changed(EntityChange::Name);
    }
    ctx.branch_on(valid, branch_ids);
}

pub(super) fn create_guild(ctx: &mut ExecContext<'_>, variable: VariableId, branch_ids: &[BranchId]) {
    let name = name_from(ctx, variable);
    let limits = &ctx.world.config().player;
    let error = if ctx.player.guild.is_some() {
        Some("You are already in a guild.".to_string())
    } else if !valid_name(&name, limits.min_guild_name_length, limits.max_guild_name_length) {
        Some(format!(
            "Guild names must be {} to {} letters or digits.",
            limits.min_guild_name_length, limits.max_guild_name_length
        ))
    } else if ctx.world.guild_by_name(&name).is_some() {
        Some(format!("The guild name {name} is already in use."))
    } else {
        None
    };

    if let Some(error) = error {
        ctx.chat(error, Color::RED, ChatMessageKind::Guild);
        ctx.branch_on(false, branch_ids);
        return;
    }

    let guild = Guild::new(name.clone(), ctx.player.id);
    ctx.player.guild = Some(ctx.world.add_guild(guild));
    log::info!(target: "eventweave::engine", "player {} founded guild {name}", ctx.player.id);
    ctx.chat(format!("You founded the guild {name}!"), Color::GREEN, ChatMessageKind::Guild);
    ctx.entity_changed(EntityChange::Guild);
    ctx.branch_on(true, branch_ids);
}

/// Only the guild leader can disband; every member leaves the guild
pub(super) fn disband_guild(ctx: &mut ExecContext<'_>, branch_ids: &[BranchId]) -> Result<(), InterpreterError> {
    let Some(guild_id) = ctx.player.guild else {
        ctx.branch_on(false, branch_ids);
        return Ok(());
    };
    let is_leader = ctx
        .world
        .guild(guild_id)
        .is_some_and(|guild| guild.leader == ctx.player.id);
    if !is_leader {
        ctx.chat("Only the guild leader can disband the guild.", Color::RED, ChatMessageKind::Guild);
        ctx.branch_on(false, branch_ids);
        return Ok(());
    }

    ctx.world.send(
        Recipients::Guild(guild_id),
        Notification::ChatMessage {
            text: "Your guild has been disbanded.".to_string(),
            color: Color::RED,
            kind: ChatMessageKind::Guild,
            sender: None,
        },
    );
    let members = ctx
        .world
        .remove_guild(guild_id)
        .map(|guild| guild.members)
        .unwrap_or_default();
    for member in members {
        if member == ctx.player.id {
            continue;
        }
        if let Some(handle) = ctx.world.player(member) {
            handle.lock()?.guild = None;
        }
    }
    ctx.player.guild = None;
    log::info!(target: "eventweave::engine", "guild {guild_id} disbanded");
    ctx.entity_changed(EntityChange::Guild);
    ctx.branch_on(true, branch_ids);
    Ok(())
}

/// Applied only for a positive count that differs from the current one
pub(super) fn set_guild_bank_slots(ctx: &mut ExecContext<'_>, slots: VariableRef) {
    let requested = variables::read_integer(&*ctx.world, &*ctx.player, slots);
    let Some(guild) = ctx.player.guild.and_then(|id| ctx.world.guild_mut(id)) else {
        return;
    };
    if let Ok(requested) = usize::try_from(requested)
        && requested > 0
        && requested != guild.bank_slots
    {
        log::debug!(target: "eventweave::engine", "guild {} bank slots {} -> {requested}", guild.id, guild.bank_slots);
        guild.bank_slots = requested;
    }
}
