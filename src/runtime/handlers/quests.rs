//! Quest start, task completion and quest end

use super::ExecContext;
use crate::application::api::{EntityChange, Notification};
use crate::domain::entities::Suspension;
use crate::domain::player::QuestProgress;
use crate::domain::repositories::PersistedRecord;
use crate::domain::value_objects::*;
use crate::runtime::conditions;

fn save_progress(ctx: &mut ExecContext<'_>, quest: QuestId) {
    let progress = ctx.player.quest(quest).cloned().unwrap_or_default();
    ctx.world.persistence_mut().enqueue(PersistedRecord::Quest {
        player: ctx.player.id,
        quest,
        progress,
    });
    ctx.entity_changed(EntityChange::Quests);
}

/// Start `quest` at its first task; false when it cannot be started
pub(crate) fn start_quest(ctx: &mut ExecContext<'_>, quest: QuestId) -> bool {
    if !conditions::can_start_quest(&*ctx.world, &*ctx.player, quest) {
        return false;
    }
    let Some((first_task, start_event)) = ctx
        .world
        .descriptors()
        .quest(quest)
        .and_then(|descriptor| Some((descriptor.tasks.first()?.id, descriptor.start_event)))
    else {
        return false;
    };

    let progress = ctx.player.quests.entry(quest).or_default();
    progress.task = Some(first_task);
    log::info!(target: "eventweave::engine", "player {} started quest {quest}", ctx.player.id);
    save_progress(ctx, quest);
    if let Some(event) = start_event {
        ctx.start_common_event(event);
    }
    true
}

/// Offered quests wait for the player's answer; others start right away
pub(super) fn start_quest_command(ctx: &mut ExecContext<'_>, quest: QuestId, offer: bool, branch_ids: &[BranchId]) {
    if offer && conditions::can_start_quest(&*ctx.world, &*ctx.player, quest) {
        ctx.send_to_player(Notification::QuestOffer {
            instance: ctx.instance.id(),
            quest,
        });
        ctx.suspend(Suspension::QuestOffer {
            quest,
            branch_ids: branch_ids.to_vec(),
        });
        return;
    }
    let started = start_quest(ctx, quest);
    ctx.branch_on(started, branch_ids);
}

fn finish(ctx: &mut ExecContext<'_>, quest: QuestId, skip_completion_event: bool) {
    let end_event = ctx
        .world
        .descriptors()
        .quest(quest)
        .and_then(|descriptor| descriptor.end_event);
    let progress: &mut QuestProgress = ctx.player.quests.entry(quest).or_default();
    progress.task = None;
    progress.completed = true;
    progress.completion_count += 1;
    log::info!(target: "eventweave::engine", "player {} completed quest {quest}", ctx.player.id);
    save_progress(ctx, quest);
    if !skip_completion_event && let Some(event) = end_event {
        ctx.start_common_event(event);
    }
}

/// Completing the active task moves to the next one or ends the quest
pub(super) fn complete_task(ctx: &mut ExecContext<'_>, quest: QuestId, task: TaskId) {
    if ctx.player.quest(quest).and_then(|progress| progress.task) != Some(task) {
        return;
    }
    let Some((completion_event, next_task)) = ctx.world.descriptors().quest(quest).and_then(|descriptor| {
        let index = descriptor.task_index(task)?;
        Some((
            descriptor.tasks[index].completion_event,
            descriptor.tasks.get(index + 1).map(|next| next.id),
        ))
    }) else {
        return;
    };

    if let Some(event) = completion_event {
        ctx.start_common_event(event);
    }
    match next_task {
        Some(next) => {
            if let Some(progress) = ctx.player.quests.get_mut(&quest) {
                progress.task = Some(next);
            }
            save_progress(ctx, quest);
        }
        None => finish(ctx, quest, false),
    }
}

pub(super) fn end_quest(ctx: &mut ExecContext<'_>, quest: QuestId, skip_completion_event: bool) {
    if ctx.player.quest_in_progress(quest) {
        finish(ctx, quest, skip_completion_event);
    }
}
