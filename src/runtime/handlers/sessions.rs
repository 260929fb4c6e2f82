//! Bank, shop and crafting sessions
//!
//! Opening a session holds the instance until the client closes it.

use super::ExecContext;
use crate::application::api::Notification;
use crate::domain::entities::Suspension;
use crate::domain::value_objects::*;

fn open(ctx: &mut ExecContext<'_>, kind: SessionKind, name: String, guild: bool) {
    ctx.player.open_session = Some(kind);
    ctx.send_to_player(Notification::OpenSession { kind, name, guild });
    ctx.suspend(Suspension::Session(kind));
}

pub(super) fn open_bank(ctx: &mut ExecContext<'_>) {
    open(ctx, SessionKind::Bank, "Bank".to_string(), false);
}

pub(super) fn open_shop(ctx: &mut ExecContext<'_>, shop: ShopId) {
    let Some(name) = ctx.world.descriptors().shop(shop).map(|shop| shop.name.clone()) else {
        log::debug!(target: "eventweave::engine", "shop {shop} does not exist");
        return;
    };
    open(ctx, SessionKind::Shop, name, false);
}

pub(super) fn open_crafting_table(ctx: &mut ExecContext<'_>, table: CraftingTableId, journal_mode: bool) {
    let Some(name) = ctx
        .world
        .descriptors()
        .crafting_table(table)
        .map(|table| table.name.clone())
    else {
        log::debug!(target: "eventweave::engine", "crafting table {table} does not exist");
        return;
    };
    log::trace!(target: "eventweave::engine", "crafting table {table} journal mode: {journal_mode}");
    open(ctx, SessionKind::Crafting, name, false);
}

pub(super) fn open_guild_bank(ctx: &mut ExecContext<'_>) {
    let Some(name) = ctx
        .player
        .guild
        .and_then(|guild| ctx.world.guild(guild))
        .map(|guild| guild.name.clone())
    else {
        return;
    };
    open(ctx, SessionKind::Bank, name, true);
}
