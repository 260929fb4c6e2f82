use super::ExecContext;
use crate::application::api::EntityChange;
use crate::domain::value_objects::*;

pub(super) fn change_sprite(ctx: &mut ExecContext<'_>, sprite: &str) {
    ctx.player.sprite = sprite.to_string();
    ctx.entity_changed(EntityChange::Appearance);
}

pub(super) fn change_face(ctx: &mut ExecContext<'_>, face: &str) {
    ctx.player.face = face.to_string();
    ctx.entity_changed(EntityChange::Appearance);
}

pub(super) fn change_gender(ctx: &mut ExecContext<'_>, gender: Gender) {
    ctx.player.gender = gender;
    ctx.entity_changed(EntityChange::Appearance);
}

/// Staff name colours are left alone unless the command overrides them
pub(super) fn change_name_color(ctx: &mut ExecContext<'_>, color: Color, remove: bool, override_access: bool) {
    if ctx.world.access_of(&*ctx.player) != Access::None && !override_access {
        return;
    }
    ctx.player.name_color = if remove { None } else { Some(color) };
    ctx.entity_changed(EntityChange::Appearance);
}

pub(super) fn change_label(
    ctx: &mut ExecContext<'_>,
    value: &str,
    position: LabelPosition,
    color: Color,
    match_name_color: bool,
) {
    let label = EntityLabel {
        text: ctx.expand(value),
        // Transparent tells clients to reuse the name colour
        color: if match_name_color { Color::TRANSPARENT } else { color },
    };
    match position {
        LabelPosition::Header => ctx.player.header_label = label,
        LabelPosition::Footer => ctx.player.footer_label = label,
    }
    ctx.entity_changed(EntityChange::Appearance);
}

pub(super) fn change_color(ctx: &mut ExecContext<'_>, color: Color) {
    ctx.player.color = color;
    ctx.entity_changed(EntityChange::Appearance);
}

pub(super) fn set_access(ctx: &mut ExecContext<'_>, access: Access) {
    let Some(user) = ctx.world.user_mut(ctx.player.user) else {
        log::debug!(target: "eventweave::engine", "player {} has no account", ctx.player.id);
        return;
    };
    user.access = access;
    ctx.entity_changed(EntityChange::Access);
    ctx.chat(
        "Your access level has changed.",
        Color::RED,
        ChatMessageKind::Notice,
    );
}

pub(super) fn set_hidden(ctx: &mut ExecContext<'_>, hidden: bool) {
    ctx.player.hidden = hidden;
    ctx.entity_changed(EntityChange::Visibility);
}
