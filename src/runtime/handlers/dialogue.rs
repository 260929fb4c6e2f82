use super::ExecContext;
use crate::application::api::{Notification, Recipients};
use crate::domain::entities::{Prompt, Suspension};
use crate::domain::value_objects::*;

pub(super) fn show_text(ctx: &mut ExecContext<'_>, text: &str, face: &str) {
    ctx.send_to_player(Notification::ShowText {
        instance: ctx.instance.id(),
        text: ctx.expand(text),
        face: face.to_string(),
    });
    ctx.suspend(Suspension::Dialogue(Prompt::Text));
}

pub(super) fn show_options(
    ctx: &mut ExecContext<'_>,
    text: &str,
    face: &str,
    options: &[String],
    branch_ids: &[BranchId],
) {
    let options = options.iter().map(|option| ctx.expand(option)).collect();
    ctx.send_to_player(Notification::ShowOptions {
        instance: ctx.instance.id(),
        text: ctx.expand(text),
        face: face.to_string(),
        options,
    });
    ctx.suspend(Suspension::Dialogue(Prompt::Options {
        branch_ids: branch_ids.to_vec(),
    }));
}

/// A variable without a descriptor cannot be filled in: take the cancel branch
pub(super) fn input_variable(
    ctx: &mut ExecContext<'_>,
    title: &str,
    text: &str,
    variable: VariableRef,
    branch_ids: &[BranchId],
) {
    let Some(data_type) = ctx
        .world
        .descriptors()
        .variable(variable)
        .map(|descriptor| descriptor.data_type)
    else {
        ctx.push_branch(branch_ids, 1);
        return;
    };

    ctx.send_to_player(Notification::InputVariable {
        instance: ctx.instance.id(),
        title: ctx.expand(title),
        text: ctx.expand(text),
        data_type,
    });
    ctx.suspend(Suspension::Dialogue(Prompt::Input {
        variable,
        branch_ids: branch_ids.to_vec(),
    }));
}

pub(super) fn add_chatbox_text(
    ctx: &mut ExecContext<'_>,
    text: &str,
    color: Color,
    channel: ChatChannel,
    show_chat_bubble: bool,
    bubble_in_proximity: bool,
) {
    let text = ctx.expand(text);
    let target = match channel {
        ChatChannel::Player => Some((Recipients::Player(ctx.player.id), ChatMessageKind::Notice)),
        ChatChannel::Local => Some((ctx.proximity(), ChatMessageKind::Local)),
        ChatChannel::Global => Some((Recipients::Global, ChatMessageKind::Global)),
        ChatChannel::Party => (!ctx.player.party.is_empty())
            .then(|| (Recipients::Party(ctx.player.id), ChatMessageKind::Party)),
        ChatChannel::Guild => ctx
            .player
            .guild
            .map(|guild| (Recipients::Guild(guild), ChatMessageKind::Guild)),
    };

    if let Some((to, kind)) = target {
        ctx.world.send(
            to,
            Notification::ChatMessage {
                text: text.clone(),
                color,
                kind,
                sender: None,
            },
        );
    }

    if show_chat_bubble {
        let to = if bubble_in_proximity {
            ctx.proximity()
        } else {
            Recipients::Player(ctx.player.id)
        };
        ctx.world.send(
            to,
            Notification::ChatBubble {
                entity: RouteEntity::Event(ctx.instance.event()),
                map: ctx.player.map,
                text,
            },
        );
    }
}
