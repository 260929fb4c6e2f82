//! Warps, movement routes, NPC spawns, animations and player holds

use super::ExecContext;
use crate::application::api::{Notification, Recipients};
use crate::domain::commands::{MoveRoute, SpawnTarget};
use crate::domain::entities::Suspension;
use crate::domain::value_objects::*;
use crate::runtime::world::SpawnedNpc;

pub(super) fn warp(
    ctx: &mut ExecContext<'_>,
    map: MapId,
    x: i32,
    y: i32,
    direction: WarpDirection,
    instance_type: Option<MapInstanceType>,
) {
    let dir = match direction {
        WarpDirection::Retain => ctx.player.dir,
        WarpDirection::Face(dir) => dir,
    };
    let player = &mut *ctx.player;
    player.map = map;
    player.x = x;
    player.y = y;
    player.dir = dir;
    if let Some(instance_type) = instance_type {
        player.map_instance_type = Some(instance_type);
        player.map_instance = match instance_type {
            MapInstanceType::Overworld => MapInstanceId::nil(),
            MapInstanceType::Personal => MapInstanceId::from(*player.id.as_uuid()),
            MapInstanceType::Guild => player
                .guild
                .map(|guild| MapInstanceId::from(*guild.as_uuid()))
                .unwrap_or_else(|| MapInstanceId::from(*player.id.as_uuid())),
            // Parties share the instance of their first member
            MapInstanceType::Shared => {
                let owner = player.party.first().copied().unwrap_or(player.id);
                MapInstanceId::from(*owner.as_uuid())
            }
        };
    }
    ctx.send_to_player(Notification::Warp {
        player: ctx.player.id,
        map,
        x,
        y,
        dir,
    });
}

/// A nil route target moves the running player
pub(super) fn set_move_route(ctx: &mut ExecContext<'_>, route: &MoveRoute) {
    if route.target.is_nil() {
        ctx.player.move_route = Some(route.clone());
        ctx.send_to_player(Notification::MoveRouteToggle {
            player: ctx.player.id,
            active: true,
        });
    } else if let Some(event) = ctx.world.map_event_mut(route.target) {
        event.move_route = Some(route.clone());
    } else {
        log::debug!(target: "eventweave::engine", "move route target {} not found", route.target);
    }
}

/// Suspend only while the target actually has a route to finish
pub(super) fn wait_for_route(ctx: &mut ExecContext<'_>, target: EventId) {
    let watched = if target.is_nil() {
        ctx.player.move_route.is_some().then_some(RouteTarget {
            entity: RouteEntity::Player(ctx.player.id),
            map: ctx.player.map,
        })
    } else {
        ctx.world
            .map_event(target)
            .filter(|event| event.move_route.is_some())
            .map(|event| RouteTarget {
                entity: RouteEntity::Event(event.id),
                map: event.map,
            })
    };
    if let Some(watched) = watched {
        ctx.suspend(Suspension::Route(watched));
    }
}

/// Resolved tile of a spawn or animation target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tile {
    pub map: MapId,
    pub x: i32,
    pub y: i32,
    pub dir: Direction,
}

/// Rotate an offset so that "up" points where the target faces
pub(crate) fn rotate_offset(dx: i32, dy: i32, facing: Direction) -> (i32, i32) {
    match facing {
        Direction::Up => (dx, dy),
        Direction::Down => (-dx, -dy),
        Direction::Left => (dy, dx),
        Direction::Right => (-dy, dx),
    }
}

fn resolve_tile(ctx: &ExecContext<'_>, at: &SpawnTarget) -> Option<Tile> {
    let tile = match *at {
        SpawnTarget::Tile { map, x, y, dir } => Tile { map, x, y, dir },
        SpawnTarget::Relative {
            event,
            dx,
            dy,
            relative_to_facing,
        } => {
            let (map, x, y, facing) = match event.and_then(|id| ctx.world.map_event(id)) {
                Some(event) => (event.map, event.x, event.y, event.dir),
                None => (ctx.player.map, ctx.player.x, ctx.player.y, ctx.player.dir),
            };
            let ((dx, dy), dir) = if relative_to_facing {
                (rotate_offset(dx, dy, facing), facing)
            } else {
                ((dx, dy), Direction::Up)
            };
            Tile {
                map,
                x: x + dx,
                y: y + dy,
                dir,
            }
        }
    };

    let bounds = &ctx.world.config().map;
    let inside = (0..bounds.width).contains(&tile.x) && (0..bounds.height).contains(&tile.y);
    inside.then_some(tile)
}

pub(super) fn spawn_npc(ctx: &mut ExecContext<'_>, npc: NpcId, at: &SpawnTarget) {
    if ctx.world.descriptors().npc(npc).is_none() {
        return;
    }
    let Some(tile) = resolve_tile(ctx, at) else {
        log::debug!(target: "eventweave::engine", "npc spawn target {at:?} is off the map");
        return;
    };
    let entity = EntityId::new();
    ctx.world.spawn_npc(SpawnedNpc {
        entity,
        npc,
        map: tile.map,
        map_instance: ctx.player.map_instance,
        x: tile.x,
        y: tile.y,
        dir: tile.dir,
        spawned_by: ctx.player.id,
    });
    ctx.player.spawned_npcs.push(entity);
}

pub(super) fn despawn_npcs(ctx: &mut ExecContext<'_>) {
    for entity in std::mem::take(&mut ctx.player.spawned_npcs) {
        ctx.world.despawn_npc(entity);
    }
}

pub(super) fn play_animation(
    ctx: &mut ExecContext<'_>,
    animation: AnimationId,
    at: &SpawnTarget,
    to_player_only: bool,
) {
    let Some(tile) = resolve_tile(ctx, at) else {
        return;
    };
    // Unshifted, unrotated relative animations follow their entity
    let entity = match *at {
        SpawnTarget::Relative {
            event,
            dx: 0,
            dy: 0,
            relative_to_facing: false,
        } => Some(match event.filter(|id| ctx.world.map_event(*id).is_some()) {
            Some(event) => RouteEntity::Event(event),
            None => RouteEntity::Player(ctx.player.id),
        }),
        _ => None,
    };
    let to = if to_player_only {
        Recipients::Player(ctx.player.id)
    } else {
        Recipients::Proximity {
            map: tile.map,
            instance: ctx.player.map_instance,
        }
    };
    ctx.world.send(
        to,
        Notification::Animation {
            animation,
            entity,
            map: tile.map,
            x: tile.x,
            y: tile.y,
            dir: tile.dir,
        },
    );
}

pub(super) fn hold_player(ctx: &mut ExecContext<'_>) {
    ctx.instance.set_holding_player(true);
    ctx.send_to_player(Notification::HoldPlayer {
        event: ctx.instance.event(),
        map: ctx.instance.map(),
    });
}

pub(super) fn release_player(ctx: &mut ExecContext<'_>) {
    ctx.instance.set_holding_player(false);
    ctx.send_to_player(Notification::ReleasePlayer {
        event: ctx.instance.event(),
    });
}
