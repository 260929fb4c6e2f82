use super::ExecContext;
use crate::domain::commands::VariableMod;
use crate::domain::conditions::Condition;
use crate::domain::entities::{Frame, Suspension};
use crate::domain::value_objects::*;
use crate::runtime::world::{CommonEventRequest, SelfSwitchUpdate};
use crate::runtime::{InterpreterError, conditions, labels, variables};
use std::sync::Arc;

pub(super) fn set_variable(
    ctx: &mut ExecContext<'_>,
    variable: VariableRef,
    modification: &VariableMod,
    sync_party: bool,
) {
    variables::apply_modification(
        ctx.world,
        ctx.player,
        Some(&*ctx.instance),
        variable,
        modification,
        sync_party,
    );
}

/// Global events share their self switches across every clone
pub(super) fn set_self_switch(ctx: &mut ExecContext<'_>, switch: usize, value: bool) {
    ctx.instance.set_self_switch(switch, value);
    if ctx.instance.is_global() {
        ctx.world.push_self_switch_update(SelfSwitchUpdate {
            event: ctx.instance.event(),
            map: ctx.instance.map(),
            switch,
            value,
        });
    }
}

pub(super) fn conditional_branch(ctx: &mut ExecContext<'_>, condition: &Condition, branch_ids: &[BranchId]) {
    let met = conditions::meets(condition, &*ctx.world, &*ctx.player, Some(&*ctx.instance));
    log::debug!(target: "eventweave::flow", "condition {:?} -> {met}", condition.kind);
    if met {
        ctx.push_branch(branch_ids, 0);
    } else if condition.else_enabled {
        ctx.push_branch(branch_ids, 1);
    }
}

pub(super) fn exit_event_processing(ctx: &mut ExecContext<'_>) {
    log::debug!(target: "eventweave::flow", "instance {} exits", ctx.instance.id());
    ctx.instance.cancel();
}

/// Unknown labels leave the stack as it is
pub(super) fn go_to_label(ctx: &mut ExecContext<'_>, label: &str) {
    match labels::resolve_label(ctx.page(), label) {
        Some(path) => {
            log::debug!(target: "eventweave::flow", "jump to label '{label}' ({} frames)", path.len());
            ctx.instance.call_stack_mut().replace_running_page(path);
        }
        None => log::debug!(target: "eventweave::flow", "label '{label}' not found, continuing"),
    }
}

/// Run every page of a common event whose conditions hold inside this
/// instance, optionally asking other players of the map instance to run it
/// too.
pub(super) fn start_common_event(
    ctx: &mut ExecContext<'_>,
    event: EventId,
    all_in_instance: bool,
    allow_in_overworld: bool,
) -> Result<(), InterpreterError> {
    let pages: Vec<_> = match ctx.world.descriptors().common_event(event) {
        Some(descriptor) => descriptor
            .pages
            .iter()
            .filter(|page| conditions::meets_all(&page.conditions, &*ctx.world, &*ctx.player, None))
            .map(|page| Arc::clone(&page.page))
            .collect(),
        None => {
            log::debug!(target: "eventweave::flow", "common event {event} does not exist");
            return Ok(());
        }
    };
    for page in pages {
        ctx.instance.call_stack_mut().push(Frame::root(page));
    }

    if !all_in_instance {
        return Ok(());
    }
    let map_instance = ctx.player.map_instance;
    if map_instance.is_nil() && !allow_in_overworld {
        return Ok(());
    }
    for other in ctx.world.online_players() {
        if other == ctx.player.id {
            continue;
        }
        let Some(handle) = ctx.world.player(other) else {
            continue;
        };
        let same_instance = handle.lock()?.map_instance == map_instance;
        if same_instance {
            ctx.world.request_common_event(CommonEventRequest::Start {
                player: other,
                event,
            });
        }
    }
    Ok(())
}

pub(super) fn wait(ctx: &mut ExecContext<'_>, time_ms: u64) {
    let deadline_ms = ctx.world.now_ms().saturating_add(time_ms);
    ctx.suspend(Suspension::Timer { deadline_ms });
}
