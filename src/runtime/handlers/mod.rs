//! Command handlers
//!
//! [`execute`] is the static dispatch table from command kind to handler.
//! Handlers receive an [`ExecContext`] holding the world, the running
//! instance, the locked player and the page of the executing frame. The
//! frame has already been advanced past the command, so anything a handler
//! pushes runs before the command that follows it.

mod appearance;
mod dialogue;
mod flow;
mod guilds;
mod media;
mod movement;
mod progression;
pub(crate) mod quests;
mod sessions;

use crate::application::api::{EntityChange, Notification, Recipients};
use crate::domain::commands::Command;
use crate::domain::descriptors::CommonEventTrigger;
use crate::domain::entities::{EventInstance, Frame, Page, Suspension};
use crate::domain::errors::DomainError;
use crate::domain::player::Player;
use crate::domain::value_objects::*;
use crate::runtime::InterpreterError;
use crate::runtime::template::TemplateContext;
use crate::runtime::world::{CommonEventRequest, World};
use std::sync::Arc;

/// Everything a handler may read or change while one command executes
pub struct ExecContext<'a> {
    pub world: &'a mut World,
    pub instance: &'a mut EventInstance,
    /// Running player, locked for the whole command
    pub player: &'a mut Player,
    page: Arc<Page>,
}

impl<'a> ExecContext<'a> {
    pub fn new(
        world: &'a mut World,
        instance: &'a mut EventInstance,
        player: &'a mut Player,
        page: Arc<Page>,
    ) -> Self {
        Self {
            world,
            instance,
            player,
            page,
        }
    }

    /// Page of the executing frame
    pub fn page(&self) -> &Arc<Page> {
        &self.page
    }

    pub fn player_id(&self) -> PlayerId {
        self.player.id
    }

    /// Expand inline tokens for the running player and instance
    pub fn expand(&self, text: &str) -> String {
        let templater = self.world.templater();
        templater.expand(
            text,
            &TemplateContext {
                world: &*self.world,
                player: &*self.player,
                instance: Some(&*self.instance),
            },
        )
    }

    /// Hold the executing frame
    pub fn suspend(&mut self, suspension: Suspension) {
        log::debug!(
            target: "eventweave::flow",
            "instance {} suspended on {:?}",
            self.instance.id(),
            suspension.kind()
        );
        if let Some(frame) = self.instance.call_stack_mut().top_mut() {
            frame.suspend(suspension);
        }
    }

    /// Push a frame for `branch_ids[position]` at index 0.
    ///
    /// Nothing is pushed when the position is missing or the list is not
    /// registered in the page; execution then simply continues.
    pub fn push_branch(&mut self, branch_ids: &[BranchId], position: usize) -> bool {
        let Some(&branch) = branch_ids.get(position) else {
            return false;
        };
        if !self.page.contains_list(branch) {
            log::debug!(target: "eventweave::flow", "branch {position} ({branch}) not registered, continuing");
            return false;
        }
        log::debug!(target: "eventweave::flow", "entering branch {position} ({branch})");
        self.instance
            .call_stack_mut()
            .push(Frame::at(Arc::clone(&self.page), branch, 0));
        true
    }

    /// Branch 0 on success, branch 1 on failure
    pub fn branch_on(&mut self, success: bool, branch_ids: &[BranchId]) {
        self.push_branch(branch_ids, if success { 0 } else { 1 });
    }

    pub fn send_to_player(&self, notification: Notification) {
        self.world
            .send(Recipients::Player(self.player.id), notification);
    }

    /// Players near the running player
    pub fn proximity(&self) -> Recipients {
        Recipients::Proximity {
            map: self.player.map,
            instance: self.player.map_instance,
        }
    }

    /// Tell nearby clients that a field of the running player changed
    pub fn entity_changed(&self, change: EntityChange) {
        self.world.send(
            self.proximity(),
            Notification::EntityUpdate {
                player: self.player.id,
                change,
            },
        );
    }

    pub fn chat(&self, text: impl Into<String>, color: Color, kind: ChatMessageKind) {
        self.send_to_player(Notification::ChatMessage {
            text: text.into(),
            color,
            kind,
            sender: None,
        });
    }

    pub fn trigger(&mut self, trigger: CommonEventTrigger) {
        self.world.request_common_event(CommonEventRequest::Trigger {
            player: self.player.id,
            trigger,
        });
    }

    pub fn start_common_event(&mut self, event: EventId) {
        self.world.request_common_event(CommonEventRequest::Start {
            player: self.player.id,
            event,
        });
    }
}

/// Execute one command
pub fn execute(ctx: &mut ExecContext<'_>, command: &Command) -> Result<(), InterpreterError> {
    log::trace!(target: "eventweave::engine", "instance {} executes {}", ctx.instance.id(), command.kind());

    match command {
        Command::ShowText { text, face } => dialogue::show_text(ctx, text, face),
        Command::ShowOptions {
            text,
            face,
            options,
            branch_ids,
        } => dialogue::show_options(ctx, text, face, options, branch_ids),
        Command::InputVariable {
            title,
            text,
            variable,
            branch_ids,
        } => dialogue::input_variable(ctx, title, text, *variable, branch_ids),
        Command::AddChatboxText {
            text,
            color,
            channel,
            show_chat_bubble,
            bubble_in_proximity,
        } => dialogue::add_chatbox_text(
            ctx,
            text,
            *color,
            *channel,
            *show_chat_bubble,
            *bubble_in_proximity,
        ),

        Command::SetVariable {
            variable,
            modification,
            sync_party,
        } => flow::set_variable(ctx, *variable, modification, *sync_party),
        Command::SetSelfSwitch { switch, value } => flow::set_self_switch(ctx, *switch, *value),
        Command::ConditionalBranch {
            condition,
            branch_ids,
        } => flow::conditional_branch(ctx, condition, branch_ids),
        Command::ExitEventProcessing => flow::exit_event_processing(ctx),
        Command::Label { .. } => {}
        Command::GoToLabel { label } => flow::go_to_label(ctx, label),
        Command::StartCommonEvent {
            event,
            all_in_instance,
            allow_in_overworld,
        } => flow::start_common_event(ctx, *event, *all_in_instance, *allow_in_overworld)?,
        Command::Wait { time_ms } => flow::wait(ctx, *time_ms),

        Command::RestoreHp { amount } => progression::restore_vital(ctx, Vital::Health, *amount),
        Command::RestoreMp { amount } => progression::restore_vital(ctx, Vital::Mana, *amount),
        Command::LevelUp => progression::level_up(ctx),
        Command::GiveExperience {
            amount,
            enable_losing_levels,
        } => progression::give_experience(ctx, amount, *enable_losing_levels),
        Command::ChangeLevel { level } => progression::change_level(ctx, *level),
        Command::ChangeSpells {
            spell,
            add,
            remove_bound_spell,
            branch_ids,
        } => progression::change_spells(ctx, *spell, *add, *remove_bound_spell, branch_ids),
        Command::ChangeItems {
            item,
            add,
            quantity,
            handling,
            branch_ids,
        } => progression::change_items(ctx, *item, *add, quantity, *handling, branch_ids),
        Command::EquipItem {
            item,
            unequip,
            by_slot,
            slot,
            trigger_cooldown,
        } => progression::equip_item(ctx, *item, *unequip, *by_slot, *slot, *trigger_cooldown),
        Command::SetClass { class } => progression::set_class(ctx, *class),
        Command::ResetStatPointAllocations => progression::reset_stat_allocations(ctx),
        Command::CastSpellOn {
            spell,
            on_self,
            party_members,
            guild_members,
        } => progression::cast_spell_on(ctx, *spell, *on_self, *party_members, *guild_members),

        Command::ChangeSprite { sprite } => appearance::change_sprite(ctx, sprite),
        Command::ChangeFace { face } => appearance::change_face(ctx, face),
        Command::ChangeGender { gender } => appearance::change_gender(ctx, *gender),
        Command::ChangeNameColor {
            color,
            remove,
            override_access,
        } => appearance::change_name_color(ctx, *color, *remove, *override_access),
        Command::ChangePlayerLabel {
            value,
            position,
            color,
            match_name_color,
        } => appearance::change_label(ctx, value, *position, *color, *match_name_color),
        Command::ChangePlayerColor { color } => appearance::change_color(ctx, *color),
        Command::SetAccess { access } => appearance::set_access(ctx, *access),
        Command::HidePlayer => appearance::set_hidden(ctx, true),
        Command::ShowPlayer => appearance::set_hidden(ctx, false),

        Command::Warp {
            map,
            x,
            y,
            direction,
            instance_type,
        } => movement::warp(ctx, *map, *x, *y, *direction, *instance_type),
        Command::SetMoveRoute { route } => movement::set_move_route(ctx, route),
        Command::WaitForRoute { target } => movement::wait_for_route(ctx, *target),
        Command::SpawnNpc { npc, at } => movement::spawn_npc(ctx, *npc, at),
        Command::DespawnNpcs => movement::despawn_npcs(ctx),
        Command::PlayAnimation {
            animation,
            at,
            to_player_only,
        } => movement::play_animation(ctx, *animation, at, *to_player_only),
        Command::HoldPlayer => movement::hold_player(ctx),
        Command::ReleasePlayer => movement::release_player(ctx),

        Command::PlayBgm { file } => media::play_bgm(ctx, file),
        Command::FadeoutBgm => media::fadeout_bgm(ctx),
        Command::PlaySound { file } => media::play_sound(ctx, file),
        Command::StopSounds => media::stop_sounds(ctx),
        Command::ShowPicture {
            file,
            size,
            clickable,
            hide_time_ms,
            wait_until_closed,
        } => media::show_picture(ctx, file, *size, *clickable, *hide_time_ms, *wait_until_closed),
        Command::HidePicture => media::hide_picture(ctx),
        Command::ScreenFade {
            fade,
            wait_for_completion,
            duration_ms,
        } => media::screen_fade(ctx, *fade, *wait_for_completion, *duration_ms),

        Command::OpenBank => sessions::open_bank(ctx),
        Command::OpenShop { shop } => sessions::open_shop(ctx, *shop),
        Command::OpenCraftingTable {
            table,
            journal_mode,
        } => sessions::open_crafting_table(ctx, *table, *journal_mode),
        Command::OpenGuildBank => sessions::open_guild_bank(ctx),

        Command::StartQuest {
            quest,
            offer,
            branch_ids,
        } => quests::start_quest_command(ctx, *quest, *offer, branch_ids),
        Command::CompleteQuestTask { quest, task } => quests::complete_task(ctx, *quest, *task),
        Command::EndQuest {
            quest,
            skip_completion_event,
        } => quests::end_quest(ctx, *quest, *skip_completion_event),

        Command::ChangeName {
            variable,
            branch_ids,
        } => guilds::change_name(ctx, *variable, branch_ids),
        Command::CreateGuild {
            variable,
            branch_ids,
        } => guilds::create_guild(ctx, *variable, branch_ids),
        Command::DisbandGuild { branch_ids } => guilds::disband_guild(ctx, branch_ids)?,
        Command::SetGuildBankSlots { slots } => guilds::set_guild_bank_slots(ctx, *slots),

        Command::Unsupported => return Err(DomainError::unsupported(command.kind()).into()),
    }
    Ok(())
}
