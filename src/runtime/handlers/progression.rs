//! Vitals, experience, spells, items and class changes

use super::ExecContext;
use crate::application::api::EntityChange;
use crate::domain::commands::Quantity;
use crate::domain::descriptors::{CommonEventTrigger, ItemDescriptor};
use crate::domain::value_objects::*;
use crate::runtime::variables;
use crate::runtime::world::{DroppedItem, SpellCast};

/// Positive amounts heal, negative amounts damage and start the combat
/// timer, zero restores the vital fully. Only health damage can kill.
pub(super) fn restore_vital(ctx: &mut ExecContext<'_>, vital: Vital, amount: i64) {
    if amount > 0 {
        ctx.player.add_vital(vital, amount);
    } else if amount < 0 {
        ctx.player.add_vital(vital, amount);
        ctx.player.combat_until_ms = ctx
            .world
            .now_ms()
            .saturating_add(ctx.world.config().combat.combat_time_ms);
        if vital == Vital::Health && ctx.player.vital(Vital::Health) <= 0 && !ctx.player.dead {
            ctx.player.dead = true;
            log::info!(target: "eventweave::engine", "player {} died from scripted damage", ctx.player.id);
            ctx.entity_changed(EntityChange::Died);
        }
    } else {
        ctx.player.restore_vital(vital);
    }
    ctx.entity_changed(EntityChange::Vitals);
}

fn experience_to_next_level(ctx: &ExecContext<'_>) -> Option<i64> {
    if ctx.player.level >= ctx.world.config().player.max_level {
        return None;
    }
    ctx.world
        .descriptors()
        .class(ctx.player.class)
        .map(|class| class.experience_to_next_level(ctx.player.level))
}

/// Raise the level by one, up to the configured maximum
fn gain_level(ctx: &mut ExecContext<'_>, reset_experience: bool) -> bool {
    if ctx.player.level >= ctx.world.config().player.max_level {
        return false;
    }
    ctx.player.level += 1;
    ctx.player.stat_points += ctx.world.config().player.stat_points_per_level;
    if let Some(class) = ctx.world.descriptors().class(ctx.player.class) {
        for (max, gain) in ctx.player.max_vitals.iter_mut().zip(class.vitals_per_level) {
            *max = max.saturating_add(gain);
        }
    }
    ctx.player.restore_vital(Vital::Health);
    ctx.player.restore_vital(Vital::Mana);
    if reset_experience {
        ctx.player.exp = 0;
    }
    ctx.trigger(CommonEventTrigger::LevelUp);
    ctx.entity_changed(EntityChange::Level);
    true
}

pub(super) fn level_up(ctx: &mut ExecContext<'_>) {
    gain_level(ctx, true);
}

pub(super) fn give_experience(ctx: &mut ExecContext<'_>, amount: &Quantity, enable_losing_levels: bool) {
    let amount = variables::resolve_quantity(&*ctx.world, &*ctx.player, amount);
    if amount > 0 {
        ctx.player.exp = ctx.player.exp.saturating_add(amount);
        while let Some(needed) = experience_to_next_level(ctx) {
            if ctx.player.exp < needed {
                break;
            }
            ctx.player.exp -= needed;
            if !gain_level(ctx, false) {
                break;
            }
        }
    } else if amount < 0 {
        ctx.player.exp = ctx.player.exp.saturating_add(amount);
        if enable_losing_levels {
            while ctx.player.exp < 0 && ctx.player.level > 1 {
                ctx.player.level -= 1;
                let refund = experience_to_next_level(ctx).unwrap_or(0);
                ctx.player.exp += refund;
                ctx.entity_changed(EntityChange::Level);
            }
        }
        ctx.player.exp = ctx.player.exp.max(0);
    }
    ctx.entity_changed(EntityChange::Experience);
}

pub(super) fn change_level(ctx: &mut ExecContext<'_>, level: i32) {
    let max = ctx.world.config().player.max_level.max(1);
    ctx.player.level = level.clamp(1, max);
    ctx.player.exp = 0;
    ctx.entity_changed(EntityChange::Level);
}

/// Bound spells are only forgotten when removal is forced
pub(super) fn change_spells(
    ctx: &mut ExecContext<'_>,
    spell: SpellId,
    add: bool,
    remove_bound_spell: bool,
    branch_ids: &[BranchId],
) {
    let descriptor = ctx.world.descriptors().spell(spell);
    let success = if add {
        descriptor.is_some() && ctx.player.learn_spell(spell)
    } else {
        let bound = descriptor.is_some_and(|descriptor| descriptor.bound);
        (!bound || remove_bound_spell) && ctx.player.forget_spell(spell)
    };
    if success {
        ctx.entity_changed(EntityChange::Spells);
    }
    ctx.branch_on(success, branch_ids);
}

pub(super) fn change_items(
    ctx: &mut ExecContext<'_>,
    item: ItemId,
    add: bool,
    quantity: &Quantity,
    handling: ItemHandling,
    branch_ids: &[BranchId],
) {
    let quantity = match quantity {
        Quantity::Fixed(amount) => (*amount).max(1),
        Quantity::Variable(variable) => {
            let amount = variables::read_integer(&*ctx.world, &*ctx.player, *variable);
            if amount <= 0 {
                ctx.branch_on(true, branch_ids);
                return;
            }
            amount
        }
    };

    let Some(descriptor) = ctx.world.descriptors().item(item).cloned() else {
        ctx.branch_on(false, branch_ids);
        return;
    };

    let success = if add {
        give_items(ctx, &descriptor, quantity, handling)
    } else {
        take_items(ctx, item, quantity, handling)
    };
    if success {
        ctx.entity_changed(EntityChange::Inventory);
    }
    ctx.branch_on(success, branch_ids);
}

fn give_items(ctx: &mut ExecContext<'_>, item: &ItemDescriptor, quantity: i64, handling: ItemHandling) -> bool {
    let capacity = ctx
        .player
        .inventory_capacity_for(item.id, item.stackable, item.max_stack);
    let granted = match handling {
        ItemHandling::Normal if capacity < quantity => return false,
        ItemHandling::Normal => quantity,
        ItemHandling::Overflow | ItemHandling::UpTo => capacity.min(quantity),
    };
    if granted > 0 {
        ctx.player
            .insert_items(item.id, granted, item.stackable, item.max_stack);
    }

    match handling {
        ItemHandling::Overflow => {
            let dropped = quantity - granted;
            if dropped > 0 {
                ctx.world.drop_item(DroppedItem {
                    item: item.id,
                    quantity: dropped,
                    map: ctx.player.map,
                    x: ctx.player.x,
                    y: ctx.player.y,
                    owner: ctx.player.id,
                });
            }
            true
        }
        ItemHandling::UpTo => granted > 0,
        ItemHandling::Normal => true,
    }
}

fn take_items(ctx: &mut ExecContext<'_>, item: ItemId, quantity: i64, handling: ItemHandling) -> bool {
    let held = ctx.player.item_count(item);
    match handling {
        ItemHandling::UpTo => ctx.player.remove_items(item, quantity.min(held)) > 0,
        ItemHandling::Normal | ItemHandling::Overflow => {
            if held < quantity {
                return false;
            }
            ctx.player.remove_items(item, quantity);
            true
        }
    }
}

pub(super) fn equip_item(
    ctx: &mut ExecContext<'_>,
    item: ItemId,
    unequip: bool,
    by_slot: bool,
    slot: usize,
    trigger_cooldown: bool,
) {
    if unequip {
        let slot = if by_slot {
            Some(slot)
        } else {
            ctx.player
                .equipment
                .iter()
                .find(|(_, equipped)| **equipped == item)
                .map(|(slot, _)| *slot)
        };
        if let Some(slot) = slot
            && ctx.player.equipment.remove(&slot).is_some()
        {
            ctx.entity_changed(EntityChange::Equipment);
        }
        return;
    }

    let Some(descriptor) = ctx.world.descriptors().item(item) else {
        return;
    };
    let (Some(slot), cooldown_ms) = (descriptor.equipment_slot, descriptor.cooldown_ms) else {
        return;
    };
    if ctx.player.item_count(item) == 0 {
        return;
    }
    ctx.player.equipment.insert(slot, item);
    if trigger_cooldown && cooldown_ms > 0 {
        let until = ctx.world.now_ms().saturating_add(cooldown_ms);
        ctx.player.item_cooldowns.insert(item, until);
    }
    ctx.entity_changed(EntityChange::Equipment);
}

pub(super) fn set_class(ctx: &mut ExecContext<'_>, class: ClassId) {
    if ctx.world.descriptors().class(class).is_some() {
        ctx.player.class = class;
    }
    ctx.entity_changed(EntityChange::Class);
}

pub(super) fn reset_stat_allocations(ctx: &mut ExecContext<'_>) {
    ctx.player.reset_stat_allocations();
    ctx.entity_changed(EntityChange::Stats);
}

/// Queue the spell on each selected target once; offline targets are skipped
pub(super) fn cast_spell_on(
    ctx: &mut ExecContext<'_>,
    spell: SpellId,
    on_self: bool,
    party_members: bool,
    guild_members: bool,
) {
    if !ctx.world.is_online(ctx.player.id) || ctx.world.descriptors().spell(spell).is_none() {
        return;
    }

    let mut targets = Vec::new();
    if on_self {
        targets.push(ctx.player.id);
    }
    if party_members {
        targets.extend(ctx.player.party.iter().copied());
    }
    if guild_members && let Some(guild) = ctx.player.guild.and_then(|id| ctx.world.guild(id)) {
        targets.extend(guild.members.iter().copied());
    }

    let mut seen = std::collections::BTreeSet::new();
    targets.retain(|target| seen.insert(*target) && ctx.world.is_online(*target));

    for target in targets {
        ctx.world.queue_spell_cast(SpellCast {
            caster: ctx.player.id,
            target,
            spell,
        });
    }
}
