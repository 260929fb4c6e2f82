//! Variable mutation engine
//!
//! Computes the new value of a variable from a [`VariableMod`], stores it in
//! the owning scope and, when the value actually changed, starts the change
//! triggers and queues shared scopes for persistence. It never decides
//! gameplay outcomes on its own.

use crate::domain::commands::{BooleanMod, CombineOp, IntegerMod, Quantity, StringMod, VariableMod};
use crate::domain::descriptors::CommonEventTrigger;
use crate::domain::entities::EventInstance;
use crate::domain::player::Player;
use crate::domain::repositories::PersistedRecord;
use crate::domain::value_objects::*;
use crate::runtime::template::TemplateContext;
use crate::runtime::world::{CommonEventRequest, World};
use rand::Rng;

/// Current value as seen by `player`, zero-valued when nothing is stored.
///
/// `None` only when the variable has no descriptor.
pub fn current_value(world: &World, player: &Player, variable: VariableRef) -> Option<VariableValue> {
    let descriptor = world.descriptors().variable(variable)?;
    Some(
        world
            .stored_variable(player, variable)
            .filter(|value| value.data_type() == descriptor.data_type)
            .cloned()
            .unwrap_or_else(|| VariableValue::zero(descriptor.data_type)),
    )
}

pub fn read_integer(world: &World, player: &Player, variable: VariableRef) -> i64 {
    world
        .stored_variable(player, variable)
        .and_then(VariableValue::as_integer)
        .unwrap_or(0)
}

pub fn read_boolean(world: &World, player: &Player, variable: VariableRef) -> bool {
    world
        .stored_variable(player, variable)
        .and_then(VariableValue::as_boolean)
        .unwrap_or(false)
}

pub fn read_string(world: &World, player: &Player, variable: VariableRef) -> String {
    world
        .stored_variable(player, variable)
        .and_then(VariableValue::as_string)
        .map(str::to_string)
        .unwrap_or_default()
}

/// Literal quantity, or the integer held by the referenced variable
pub fn resolve_quantity(world: &World, player: &Player, quantity: &Quantity) -> i64 {
    match quantity {
        Quantity::Fixed(amount) => *amount,
        Quantity::Variable(variable) => read_integer(world, player, *variable),
    }
}

/// Integer arithmetic shared by direct and variable-sourced operations.
///
/// Returns `None` for a division by zero. Arithmetic wraps on overflow.
pub fn combine_integer(current: i64, op: CombineOp, operand: i64) -> Option<i64> {
    match op {
        CombineOp::Set => Some(operand),
        CombineOp::Add => Some(current.wrapping_add(operand)),
        CombineOp::Subtract => Some(current.wrapping_sub(operand)),
        CombineOp::Multiply => Some(current.wrapping_mul(operand)),
        CombineOp::Divide => (operand != 0).then(|| current.wrapping_div(operand)),
        CombineOp::LeftShift => Some(current.wrapping_shl(operand as u32)),
        CombineOp::RightShift => Some(current.wrapping_shr(operand as u32)),
    }
}

/// Apply `modification` to `variable` on behalf of `player`.
///
/// Returns whether the stored value changed. Missing descriptors, tag
/// mismatches, a guild variable without a guild and skipped operations
/// (division by zero, empty find text, missing source) leave everything as it
/// was.
pub fn apply_modification(
    world: &mut World,
    player: &mut Player,
    instance: Option<&EventInstance>,
    variable: VariableRef,
    modification: &VariableMod,
    sync_party: bool,
) -> bool {
    let Some(current) = current_value(world, player, variable) else {
        log::debug!(target: "eventweave::variables", "no descriptor for {} variable {}", variable.scope, variable.id);
        return false;
    };
    if current.data_type() != modification.data_type() {
        log::warn!(
            target: "eventweave::variables",
            "{:?} modification on {:?} variable {} ignored",
            modification.data_type(),
            current.data_type(),
            variable.id
        );
        return false;
    }

    let next = match modification {
        VariableMod::Boolean(op) => next_boolean(world, player, op).map(VariableValue::Boolean),
        VariableMod::Integer(op) => {
            let value = current.as_integer().unwrap_or(0);
            next_integer(world, player, value, op).map(VariableValue::Integer)
        }
        VariableMod::String(op) => {
            let value = current.as_string().unwrap_or_default();
            next_string(world, player, instance, value, op).map(VariableValue::String)
        }
    };

    match next {
        Some(next) => commit(world, player, variable, current, next, sync_party),
        None => false,
    }
}

/// Store a value entered by the player, with the usual change propagation
pub fn set_value(world: &mut World, player: &mut Player, variable: VariableRef, value: VariableValue) -> bool {
    match current_value(world, player, variable) {
        Some(current) if current.data_type() == value.data_type() => {
            commit(world, player, variable, current, value, false)
        }
        _ => false,
    }
}

fn next_boolean(world: &World, player: &Player, op: &BooleanMod) -> Option<bool> {
    match op {
        BooleanMod::Set(value) => Some(*value),
        BooleanMod::Duplicate(source) => {
            world.descriptors().variable(*source)?;
            Some(read_boolean(world, player, *source))
        }
    }
}

fn next_integer(world: &mut World, player: &Player, current: i64, op: &IntegerMod) -> Option<i64> {
    match op {
        IntegerMod::Set(value) => combine_integer(current, CombineOp::Set, *value),
        IntegerMod::Add(value) => combine_integer(current, CombineOp::Add, *value),
        IntegerMod::Subtract(value) => combine_integer(current, CombineOp::Subtract, *value),
        IntegerMod::Multiply(value) => combine_integer(current, CombineOp::Multiply, *value),
        IntegerMod::Divide(value) => combine_integer(current, CombineOp::Divide, *value),
        IntegerMod::LeftShift(value) => combine_integer(current, CombineOp::LeftShift, *value),
        IntegerMod::RightShift(value) => combine_integer(current, CombineOp::RightShift, *value),
        IntegerMod::Random { low, high } => {
            let (low, high) = if low <= high { (*low, *high) } else { (*high, *low) };
            Some(world.rng_mut().gen_range(low..=high))
        }
        IntegerMod::SystemTime => Some(world.clock().unix_ms()),
        IntegerMod::Combine { op, source } => {
            world.descriptors().variable(*source)?;
            let operand = read_integer(world, player, *source);
            combine_integer(current, *op, operand)
        }
    }
}

fn next_string(
    world: &World,
    player: &Player,
    instance: Option<&EventInstance>,
    current: &str,
    op: &StringMod,
) -> Option<String> {
    let templater = world.templater();
    let ctx = TemplateContext {
        world,
        player,
        instance,
    };
    match op {
        StringMod::Set(text) => Some(templater.expand(text, &ctx)),
        StringMod::Replace { find, replace } => {
            let find = templater.expand(find, &ctx);
            if find.is_empty() {
                return None;
            }
            let replace = templater.expand(replace, &ctx);
            Some(current.replace(&find, &replace))
        }
    }
}

fn commit(
    world: &mut World,
    player: &mut Player,
    variable: VariableRef,
    old: VariableValue,
    new: VariableValue,
    sync_party: bool,
) -> bool {
    if old == new {
        return false;
    }
    if !store(world, player, variable, new.clone()) {
        return false;
    }
    log::debug!(
        target: "eventweave::variables",
        "{} variable {} changed: {} -> {}",
        variable.scope,
        variable.id,
        old,
        new
    );
    propagate(world, player, variable, new, sync_party);
    true
}

fn store(world: &mut World, player: &mut Player, variable: VariableRef, value: VariableValue) -> bool {
    match variable.scope {
        VariableScope::Player => {
            player.variables.insert(variable.id, value);
            true
        }
        VariableScope::Server => {
            world.server_variables_mut().insert(variable.id, value);
            true
        }
        VariableScope::Guild => match player.guild.and_then(|id| world.guild_mut(id)) {
            Some(guild) => {
                guild.variables.insert(variable.id, value);
                true
            }
            None => false,
        },
        VariableScope::User => match world.user_mut(player.user) {
            Some(user) => {
                user.variables.insert(variable.id, value);
                true
            }
            None => false,
        },
    }
}

fn propagate(world: &mut World, player: &Player, variable: VariableRef, value: VariableValue, sync_party: bool) {
    let trigger = CommonEventTrigger::variable_change(variable);
    match variable.scope {
        VariableScope::Player => {
            world.request_common_event(CommonEventRequest::Trigger {
                player: player.id,
                trigger,
            });
            if sync_party {
                sync_party_members(world, player, variable.id, &value, trigger);
            }
        }
        VariableScope::Server => {
            for online in world.online_players() {
                world.request_common_event(CommonEventRequest::Trigger {
                    player: online,
                    trigger,
                });
            }
            world.persistence_mut().enqueue(PersistedRecord::ServerVariable {
                id: variable.id,
                value,
            });
        }
        VariableScope::Guild => {
            let Some(guild) = player.guild.and_then(|id| world.guild(id)) else {
                return;
            };
            let guild_id = guild.id;
            let members: Vec<PlayerId> = guild
                .members
                .iter()
                .copied()
                .filter(|member| world.is_online(*member))
                .collect();
            for member in members {
                world.request_common_event(CommonEventRequest::Trigger {
                    player: member,
                    trigger,
                });
            }
            world.persistence_mut().enqueue(PersistedRecord::GuildVariable {
                guild: guild_id,
                id: variable.id,
                value,
            });
        }
        VariableScope::User => {
            let players: Vec<PlayerId> = world
                .user(player.user)
                .map(|user| user.players.clone())
                .unwrap_or_default()
                .into_iter()
                .filter(|id| world.is_online(*id))
                .collect();
            for owned in players {
                world.request_common_event(CommonEventRequest::Trigger {
                    player: owned,
                    trigger,
                });
            }
            world.persistence_mut().enqueue(PersistedRecord::UserVariable {
                user: player.user,
                id: variable.id,
                value,
            });
        }
    }
}

fn sync_party_members(
    world: &mut World,
    player: &Player,
    id: VariableId,
    value: &VariableValue,
    trigger: CommonEventTrigger,
) {
    for member in player.party.iter().copied().filter(|member| *member != player.id) {
        let Some(handle) = world.player(member) else {
            continue;
        };
        let changed = match handle.lock() {
            Ok(mut other) => {
                if other.variables.get(&id) == Some(value) {
                    false
                } else {
                    other.variables.insert(id, value.clone());
                    true
                }
            }
            Err(err) => {
                log::warn!(target: "eventweave::variables", "party sync skipped: {err}");
                false
            }
        };
        if changed {
            world.request_common_event(CommonEventRequest::Trigger {
                player: member,
                trigger,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_by_zero_is_skipped() {
        assert_eq!(combine_integer(10, CombineOp::Divide, 0), None);
        assert_eq!(combine_integer(10, CombineOp::Divide, 3), Some(3));
    }

    #[test]
    fn arithmetic_wraps() {
        assert_eq!(combine_integer(i64::MAX, CombineOp::Add, 1), Some(i64::MIN));
        assert_eq!(combine_integer(1, CombineOp::LeftShift, 4), Some(16));
        assert_eq!(combine_integer(-16, CombineOp::RightShift, 2), Some(-4));
    }
}
