//! Condition evaluation, one evaluator per condition kind

use crate::domain::conditions::{Condition, ConditionKind, LevelOrStat, Operand, VariableComparison};
use crate::domain::entities::EventInstance;
use crate::domain::player::Player;
use crate::domain::value_objects::*;
use crate::runtime::template::TemplateContext;
use crate::runtime::variables;
use crate::runtime::world::World;
use chrono::Timelike;

/// Whether `condition` holds, with negation applied
pub fn meets(
    condition: &Condition,
    world: &World,
    player: &Player,
    instance: Option<&EventInstance>,
) -> bool {
    let result = evaluate(&condition.kind, world, player, instance);
    result != condition.negated
}

/// All conditions hold; an empty list always holds
pub fn meets_all(
    conditions: &[Condition],
    world: &World,
    player: &Player,
    instance: Option<&EventInstance>,
) -> bool {
    conditions
        .iter()
        .all(|condition| meets(condition, world, player, instance))
}

fn evaluate(
    kind: &ConditionKind,
    world: &World,
    player: &Player,
    instance: Option<&EventInstance>,
) -> bool {
    match kind {
        ConditionKind::VariableIs {
            variable,
            comparison,
        } => variable_is(world, player, instance, *variable, comparison),
        ConditionKind::HasItem { item, quantity } => {
            player.item_count(*item) >= variables::resolve_quantity(world, player, quantity)
        }
        ConditionKind::ClassIs { class } => player.class == *class,
        ConditionKind::KnowsSpell { spell } => player.knows_spell(*spell),
        ConditionKind::LevelOrStat {
            target,
            comparator,
            value,
        } => {
            let current = match target {
                LevelOrStat::Level => i64::from(player.level),
                LevelOrStat::Stat(stat) => player.stats[stat.index()],
            };
            comparator.compare(current, *value)
        }
        ConditionKind::SelfSwitch { switch, value } => {
            instance.is_some_and(|instance| instance.self_switch(*switch) == *value)
        }
        ConditionKind::AccessIs { access } => world.access_of(player) == *access,
        ConditionKind::TimeBetween {
            start_minute,
            end_minute,
        } => {
            let time = world.clock().local_time();
            minute_in_range(time.hour() * 60 + time.minute(), *start_minute, *end_minute)
        }
        ConditionKind::CanStartQuest { quest } => can_start_quest(world, player, *quest),
        ConditionKind::QuestInProgress { quest, task } => match player.quest(*quest) {
            Some(progress) if progress.in_progress() => task.is_none() || progress.task == *task,
            _ => false,
        },
        ConditionKind::QuestCompleted { quest } => player.quest_completed(*quest),
        ConditionKind::GenderIs { gender } => player.gender == *gender,
        ConditionKind::MapIs { map } => player.map == *map,
        ConditionKind::IsItemEquipped { item } => player.is_equipped(*item),
        ConditionKind::HasFreeInventorySlots { quantity } => {
            player.free_inventory_slots() >= *quantity
        }
        ConditionKind::InGuild => player.guild.is_some(),
    }
}

fn variable_is(
    world: &World,
    player: &Player,
    instance: Option<&EventInstance>,
    variable: VariableRef,
    comparison: &VariableComparison,
) -> bool {
    let Some(current) = variables::current_value(world, player, variable) else {
        return false;
    };
    match comparison {
        VariableComparison::Boolean { equal, value } => {
            let Some(current) = current.as_boolean() else {
                return false;
            };
            let other = match value {
                Operand::Literal(value) => *value,
                Operand::Variable(source) => variables::read_boolean(world, player, *source),
            };
            (current == other) == *equal
        }
        VariableComparison::Integer { comparator, value } => {
            let Some(current) = current.as_integer() else {
                return false;
            };
            let other = match value {
                Operand::Literal(value) => *value,
                Operand::Variable(source) => variables::read_integer(world, player, *source),
            };
            comparator.compare(current, other)
        }
        VariableComparison::StringEquals(text) => {
            current.as_string() == Some(expand(world, player, instance, text).as_str())
        }
        VariableComparison::StringContains(text) => current
            .as_string()
            .is_some_and(|current| current.contains(&expand(world, player, instance, text))),
    }
}

fn expand(world: &World, player: &Player, instance: Option<&EventInstance>, text: &str) -> String {
    world.templater().expand(
        text,
        &TemplateContext {
            world,
            player,
            instance,
        },
    )
}

/// Minute of day in `start..=end`; ranges with `start > end` wrap past midnight
pub fn minute_in_range(minute: u32, start: u32, end: u32) -> bool {
    if start <= end {
        (start..=end).contains(&minute)
    } else {
        minute >= start || minute <= end
    }
}

/// Quest exists, is not running, is repeatable or not yet completed, and its
/// requirements hold
pub fn can_start_quest(world: &World, player: &Player, quest: QuestId) -> bool {
    let Some(descriptor) = world.descriptors().quest(quest) else {
        return false;
    };
    if descriptor.tasks.is_empty() || player.quest_in_progress(quest) {
        return false;
    }
    if player.quest_completed(quest) && !descriptor.repeatable {
        return false;
    }
    meets_all(&descriptor.requirements, world, player, None)
}
