//! Event scheduler - Owns every running event instance and drives it
//!
//! The scheduler is the only place instances live. It starts them, ticks
//! them with a per-instance command budget, routes responses and
//! collaborator signals to them, and removes them once they finish, fail,
//! or lose their owning context.

use crate::application::api::{ApiError, EventResponse, Notification, Recipients, Signal};
use crate::domain::descriptors::CommonEventTrigger;
use crate::domain::entities::{EventInstance, Page, SELF_SWITCH_COUNT};
use crate::domain::value_objects::*;
use crate::runtime::world::{CommonEventRequest, World};
use crate::runtime::{self, StepOutcome, conditions};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Counters of one scheduling pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Instances that executed at least one command
    pub advanced: usize,
    /// Instances removed because their stack emptied
    pub completed: usize,
    /// Instances terminated by an interpreter error
    pub failed: usize,
    /// Instances started from queued common-event requests
    pub started: usize,
}

/// Scheduler of event instances, keyed by owning player
pub struct EventScheduler {
    world: World,
    instances: BTreeMap<PlayerId, Vec<EventInstance>>,
}

impl EventScheduler {
    pub fn new(world: World) -> Self {
        Self {
            world,
            instances: BTreeMap::new(),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Running instances of one player
    pub fn instances(&self, player: PlayerId) -> &[EventInstance] {
        self.instances
            .get(&player)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn instance(&self, player: PlayerId, id: InstanceId) -> Option<&EventInstance> {
        self.instances(player).iter().find(|instance| instance.id() == id)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.values().map(Vec::len).sum()
    }

    pub fn is_running(&self, player: PlayerId, event: EventId) -> bool {
        self.instances(player)
            .iter()
            .any(|instance| instance.event() == event)
    }

    /// Whether any instance currently holds the player in place
    pub fn is_player_held(&self, player: PlayerId) -> bool {
        self.instances(player)
            .iter()
            .any(EventInstance::is_holding_player)
    }

    fn spawn(&mut self, instance: EventInstance) -> Option<InstanceId> {
        let player = instance.player();
        if self.is_running(player, instance.event()) {
            log::debug!(
                target: "eventweave::scheduler",
                "event {} already running for player {player}",
                instance.event()
            );
            return None;
        }
        let id = instance.id();
        log::debug!(
            target: "eventweave::scheduler",
            "started instance {id} ({}) for player {player}",
            instance.name()
        );
        self.instances.entry(player).or_default().push(instance);
        Some(id)
    }

    /// Start a map event the player interacted with.
    ///
    /// Returns `None` when the player already runs this event.
    pub fn start_event(
        &mut self,
        player: PlayerId,
        event: EventId,
        page: Arc<Page>,
    ) -> Result<Option<InstanceId>, ApiError> {
        let map = self.player_map(player)?;
        Ok(self.spawn(EventInstance::new(event, player, page).on_map(map)))
    }

    /// Start a common event on the last page whose conditions hold
    pub fn start_common_event(
        &mut self,
        player: PlayerId,
        event: EventId,
    ) -> Result<Option<InstanceId>, ApiError> {
        let handle = self
            .world
            .player(player)
            .ok_or(ApiError::UnknownPlayer(player))?;
        let page = {
            let guard = handle.lock().map_err(|e| ApiError::engine(e.to_string()))?;
            let Some(descriptor) = self.world.descriptors().common_event(event) else {
                log::debug!(target: "eventweave::scheduler", "common event {event} does not exist");
                return Ok(None);
            };
            descriptor
                .pages
                .iter()
                .rev()
                .find(|page| conditions::meets_all(&page.conditions, &self.world, &guard, None))
                .map(|page| Arc::clone(&page.page))
        };
        Ok(page.and_then(|page| self.spawn(EventInstance::new(event, player, page))))
    }

    /// Start every common event with a page listening for `trigger`
    pub fn trigger_common_events(
        &mut self,
        player: PlayerId,
        trigger: CommonEventTrigger,
    ) -> Result<Vec<InstanceId>, ApiError> {
        let handle = self
            .world
            .player(player)
            .ok_or(ApiError::UnknownPlayer(player))?;
        let mut matched = {
            let guard = handle.lock().map_err(|e| ApiError::engine(e.to_string()))?;
            self.world
                .descriptors()
                .common_events()
                .into_iter()
                .filter_map(|descriptor| {
                    descriptor
                        .pages
                        .iter()
                        .rev()
                        .filter(|page| page.trigger == trigger)
                        .find(|page| conditions::meets_all(&page.conditions, &self.world, &guard, None))
                        .map(|page| (descriptor.id, Arc::clone(&page.page)))
                })
                .collect::<Vec<_>>()
        };
        matched.sort_by_key(|(event, _)| *event);

        log::trace!(
            target: "eventweave::scheduler",
            "{trigger:?} for player {player} matched {} common events",
            matched.len()
        );
        Ok(matched
            .into_iter()
            .filter_map(|(event, page)| self.spawn(EventInstance::new(event, player, page)))
            .collect())
    }

    /// Start a global event: one clone per online player on `map`
    pub fn start_global(
        &mut self,
        event: EventId,
        map: MapId,
        page: Arc<Page>,
        self_switches: [bool; SELF_SWITCH_COUNT],
    ) -> Vec<InstanceId> {
        let members: Vec<PlayerId> = self
            .world
            .online_players()
            .into_iter()
            .filter(|id| {
                self.world
                    .player(*id)
                    .and_then(|handle| handle.lock().ok().map(|player| player.map == map))
                    .unwrap_or(false)
            })
            .collect();

        members
            .into_iter()
            .filter_map(|player| {
                let instance = EventInstance::new(event, player, Arc::clone(&page))
                    .on_map(map)
                    .as_global()
                    .with_self_switches(self_switches);
                self.spawn(instance)
            })
            .collect()
    }

    /// Run one scheduling pass over every instance.
    ///
    /// Common-event requests queued before the pass start instances that
    /// run in this pass; requests queued during it start instances for the
    /// next one.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport {
            started: self.process_requests(),
            ..TickReport::default()
        };
        let budget = self.world.config().scheduler.commands_per_tick;

        for (player, instances) in self.instances.iter_mut() {
            for instance in instances.iter_mut().filter(|instance| instance.is_running()) {
                match runtime::tick(&mut self.world, instance, budget) {
                    Ok(StepOutcome::Waiting(_)) => {}
                    Ok(_) => report.advanced += 1,
                    Err(err) => {
                        log::error!(
                            target: "eventweave::scheduler",
                            "instance {} of player {player} terminated: {err}",
                            instance.id()
                        );
                        instance.cancel();
                        if instance.is_holding_player() {
                            instance.set_holding_player(false);
                            self.world.send(
                                Recipients::Player(*player),
                                Notification::ReleasePlayer {
                                    event: instance.event(),
                                },
                            );
                        }
                        report.failed += 1;
                    }
                }
            }
        }

        self.apply_self_switch_updates();
        report.started += self.process_requests();
        report.completed = self.reap();
        report
    }

    /// Deliver a client response to one instance.
    ///
    /// Responses for unknown instances or for a different suspension are
    /// ignored and reported as `false`.
    pub fn respond(
        &mut self,
        player: PlayerId,
        instance: InstanceId,
        response: &EventResponse,
    ) -> Result<bool, ApiError> {
        let Some(target) = self
            .instances
            .get_mut(&player)
            .and_then(|instances| instances.iter_mut().find(|i| i.id() == instance))
        else {
            log::debug!(
                target: "eventweave::scheduler",
                "response for unknown instance {instance} of player {player} ignored"
            );
            return Ok(false);
        };

        match runtime::respond(&mut self.world, target, response) {
            Ok(accepted) => Ok(accepted),
            Err(err) => {
                log::error!(
                    target: "eventweave::scheduler",
                    "instance {instance} of player {player} terminated: {err}"
                );
                target.cancel();
                Err(ApiError::engine(err.to_string()))
            }
        }
    }

    /// Report a collaborator signal; returns how many instances it released.
    ///
    /// Route completions release every instance watching the route;
    /// session and fade signals only concern `player`.
    pub fn signal(&mut self, player: PlayerId, signal: Signal) -> Result<usize, ApiError> {
        if let Some(handle) = self.world.player(player) {
            let mut guard = handle.lock().map_err(|e| ApiError::engine(e.to_string()))?;
            match signal {
                Signal::RouteCompleted(RouteTarget {
                    entity: RouteEntity::Player(id),
                    ..
                }) if id == player => guard.move_route = None,
                Signal::SessionClosed(kind) if guard.open_session == Some(kind) => {
                    guard.open_session = None;
                }
                Signal::FadeCompleted => guard.fading = false,
                _ => {}
            }
        }
        if let Signal::RouteCompleted(RouteTarget {
            entity: RouteEntity::Event(event),
            ..
        }) = signal
            && let Some(map_event) = self.world.map_event_mut(event)
        {
            map_event.move_route = None;
        }

        let route = matches!(signal, Signal::RouteCompleted(_));
        let mut released = 0;
        for (owner, instances) in self.instances.iter_mut() {
            if !route && *owner != player {
                continue;
            }
            for instance in instances.iter_mut() {
                if runtime::release_on_signal(instance, &signal) {
                    released += 1;
                }
            }
        }
        Ok(released)
    }

    /// Cancel everything the player runs and take the player offline
    pub fn disconnect(&mut self, player: PlayerId) -> Result<usize, ApiError> {
        let cancelled = self
            .instances
            .remove(&player)
            .map(|mut instances| {
                instances.iter_mut().for_each(EventInstance::cancel);
                instances.len()
            })
            .unwrap_or(0);

        if let Some(handle) = self.world.player(player) {
            let spawned = {
                let mut guard = handle.lock().map_err(|e| ApiError::engine(e.to_string()))?;
                guard.open_session = None;
                std::mem::take(&mut guard.spawned_npcs)
            };
            for entity in spawned {
                self.world.despawn_npc(entity);
            }
        }
        self.world.set_online(player, false);
        log::info!(
            target: "eventweave::scheduler",
            "player {player} disconnected, {cancelled} instances cancelled"
        );
        Ok(cancelled)
    }

    /// Cancel the instances of every event running on `map`
    pub fn unload_map(&mut self, map: MapId) -> usize {
        let mut cancelled = 0;
        for instances in self.instances.values_mut() {
            instances.retain_mut(|instance| {
                if instance.map() != map {
                    return true;
                }
                instance.cancel();
                cancelled += 1;
                false
            });
        }
        self.instances.retain(|_, instances| !instances.is_empty());
        if cancelled > 0 {
            log::info!(target: "eventweave::scheduler", "map {map} unloaded, {cancelled} instances cancelled");
        }
        cancelled
    }

    fn player_map(&self, player: PlayerId) -> Result<MapId, ApiError> {
        let handle = self
            .world
            .player(player)
            .ok_or(ApiError::UnknownPlayer(player))?;
        let map = handle
            .lock()
            .map_err(|e| ApiError::engine(e.to_string()))?
            .map;
        Ok(map)
    }

    fn process_requests(&mut self) -> usize {
        let mut started = 0;
        for request in self.world.drain_common_event_requests() {
            let result = match request {
                CommonEventRequest::Trigger { player, trigger } => self
                    .trigger_common_events(player, trigger)
                    .map(|ids| ids.len()),
                CommonEventRequest::Start { player, event } => self
                    .start_common_event(player, event)
                    .map(|id| usize::from(id.is_some())),
            };
            match result {
                Ok(count) => started += count,
                Err(err) => {
                    log::warn!(target: "eventweave::scheduler", "dropped {request:?}: {err}");
                }
            }
        }
        started
    }

    fn apply_self_switch_updates(&mut self) {
        for update in self.world.drain_self_switch_updates() {
            let clones = self
                .instances
                .values_mut()
                .flatten()
                .filter(|instance| {
                    instance.is_global() && instance.event() == update.event && instance.map() == update.map
                });
            for instance in clones {
                instance.set_self_switch(update.switch, update.value);
            }
        }
    }

    /// Lift every hold the player's instances keep.
    ///
    /// Finished instances that were only kept alive by their hold are
    /// removed. Returns how many holds were lifted.
    pub fn release_player(&mut self, player: PlayerId) -> usize {
        let mut released = 0;
        if let Some(instances) = self.instances.get_mut(&player) {
            for instance in instances.iter_mut().filter(|instance| instance.is_holding_player()) {
                instance.set_holding_player(false);
                self.world.send(
                    Recipients::Player(player),
                    Notification::ReleasePlayer {
                        event: instance.event(),
                    },
                );
                released += 1;
            }
        }
        self.reap();
        released
    }

    /// Remove instances whose stack emptied and that no longer hold their player
    fn reap(&mut self) -> usize {
        let mut completed = 0;
        for instances in self.instances.values_mut() {
            instances.retain(|instance| {
                if !instance.is_complete() {
                    return true;
                }
                log::debug!(target: "eventweave::scheduler", "instance {} completed", instance.id());
                completed += 1;
                false
            });
        }
        self.instances.retain(|_, instances| !instances.is_empty());
        completed
    }
}
