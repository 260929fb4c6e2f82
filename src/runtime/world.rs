//! Explicit world context handed to the interpreter and every handler
//!
//! Everything a command may read or touch outside its own event instance
//! lives here: live entities, shared variables, collaborators and the queues
//! that carry work out of the interpreter (common-event requests, global
//! self-switch updates, persistence records).

use crate::application::api::{Notification, NotificationSink, Recipients};
use crate::config::EngineConfig;
use crate::domain::commands::MoveRoute;
use crate::domain::descriptors::{CommonEventTrigger, DescriptorLookup};
use crate::domain::errors::DomainError;
use crate::domain::player::{Guild, Player, UserAccount};
use crate::domain::value_objects::*;
use crate::runtime::persistence::PersistenceQueue;
use crate::runtime::template::{StandardTemplater, TextTemplater};
use chrono::NaiveDateTime;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Game clock
pub trait Clock: Send + Sync {
    /// Monotonic game time in milliseconds
    fn now_ms(&self) -> u64;
    /// Wall-clock unix time in milliseconds
    fn unix_ms(&self) -> i64;
    /// Local wall-clock time, used by time tokens and time conditions
    fn local_time(&self) -> NaiveDateTime;
}

/// Clock backed by the system timers
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn unix_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn local_time(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Manually advanced clock for tests and offline runs
pub struct ManualClock {
    now_ms: AtomicU64,
    local: NaiveDateTime,
}

impl ManualClock {
    pub fn new(local: NaiveDateTime) -> Self {
        Self {
            now_ms: AtomicU64::new(0),
            local,
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn unix_ms(&self) -> i64 {
        self.local.and_utc().timestamp_millis() + self.now_ms() as i64
    }

    fn local_time(&self) -> NaiveDateTime {
        self.local + chrono::Duration::milliseconds(self.now_ms() as i64)
    }
}

/// Shared handle to a player entity; the mutex is the entity lock
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    id: PlayerId,
    inner: Arc<Mutex<Player>>,
}

impl PlayerHandle {
    pub fn new(player: Player) -> Self {
        Self {
            id: player.id,
            inner: Arc::new(Mutex::new(player)),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, Player>, DomainError> {
        self.inner
            .lock()
            .map_err(|_| DomainError::PoisonedLock { player: self.id })
    }
}

/// A map event entity scripts can move or spawn relative to
#[derive(Debug, Clone, PartialEq)]
pub struct MapEvent {
    pub id: EventId,
    pub map: MapId,
    pub x: i32,
    pub y: i32,
    pub dir: Direction,
    pub move_route: Option<MoveRoute>,
}

/// An NPC spawned by a script
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedNpc {
    pub entity: EntityId,
    pub npc: NpcId,
    pub map: MapId,
    pub map_instance: MapInstanceId,
    pub x: i32,
    pub y: i32,
    pub dir: Direction,
    pub spawned_by: PlayerId,
}

/// A spell cast requested by a script, executed by the combat subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpellCast {
    pub caster: PlayerId,
    pub target: PlayerId,
    pub spell: SpellId,
}

/// Items that did not fit into an inventory and were dropped on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DroppedItem {
    pub item: ItemId,
    pub quantity: i64,
    pub map: MapId,
    pub x: i32,
    pub y: i32,
    pub owner: PlayerId,
}

/// Common-event work queued by the interpreter for the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommonEventRequest {
    /// Start every common event whose page matches the trigger
    Trigger {
        player: PlayerId,
        trigger: CommonEventTrigger,
    },
    /// Start one common event
    Start { player: PlayerId, event: EventId },
}

/// Self-switch change that must reach every clone of a global event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfSwitchUpdate {
    pub event: EventId,
    pub map: MapId,
    pub switch: usize,
    pub value: bool,
}

/// Explicit world handle
pub struct World {
    config: EngineConfig,
    descriptors: Arc<dyn DescriptorLookup>,
    sink: Arc<dyn NotificationSink>,
    templater: Arc<dyn TextTemplater>,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    players: HashMap<PlayerId, PlayerHandle>,
    online: BTreeSet<PlayerId>,
    users: HashMap<UserId, UserAccount>,
    guilds: HashMap<GuildId, Guild>,
    server_variables: VariableStore,
    map_events: HashMap<EventId, MapEvent>,
    npcs: HashMap<EntityId, SpawnedNpc>,
    spell_casts: Vec<SpellCast>,
    dropped_items: Vec<DroppedItem>,
    persistence: PersistenceQueue,
    common_event_requests: VecDeque<CommonEventRequest>,
    self_switch_updates: Vec<SelfSwitchUpdate>,
}

impl World {
    pub fn new(
        config: EngineConfig,
        descriptors: Arc<dyn DescriptorLookup>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            descriptors,
            sink,
            templater: Arc::new(StandardTemplater),
            clock: Arc::new(SystemClock::new()),
            rng,
            players: HashMap::new(),
            online: BTreeSet::new(),
            users: HashMap::new(),
            guilds: HashMap::new(),
            server_variables: VariableStore::new(),
            map_events: HashMap::new(),
            npcs: HashMap::new(),
            spell_casts: Vec::new(),
            dropped_items: Vec::new(),
            persistence: PersistenceQueue::new(),
            common_event_requests: VecDeque::new(),
            self_switch_updates: Vec::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_templater(mut self, templater: Arc<dyn TextTemplater>) -> Self {
        self.templater = templater;
        self
    }

    // Collaborators

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn descriptors(&self) -> &dyn DescriptorLookup {
        self.descriptors.as_ref()
    }

    pub fn templater(&self) -> Arc<dyn TextTemplater> {
        Arc::clone(&self.templater)
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn send(&self, to: Recipients, notification: Notification) {
        self.sink.send(to, notification);
    }

    // Players

    /// Register a player, linking it to its account when the account exists
    pub fn add_player(&mut self, player: Player) -> PlayerId {
        let id = player.id;
        if let Some(user) = self.users.get_mut(&player.user)
            && !user.players.contains(&id)
        {
            user.players.push(id);
        }
        self.players.insert(id, PlayerHandle::new(player));
        id
    }

    pub fn player(&self, id: PlayerId) -> Option<PlayerHandle> {
        self.players.get(&id).cloned()
    }

    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.keys().copied()
    }

    pub fn set_online(&mut self, id: PlayerId, online: bool) {
        if online && self.players.contains_key(&id) {
            self.online.insert(id);
        } else {
            self.online.remove(&id);
        }
    }

    pub fn is_online(&self, id: PlayerId) -> bool {
        self.online.contains(&id)
    }

    pub fn online_players(&self) -> Vec<PlayerId> {
        self.online.iter().copied().collect()
    }

    pub fn online_count(&self) -> usize {
        self.online.len()
    }

    /// Names of online players; `current` is already locked by the caller
    pub fn online_player_names(&self, current: &Player) -> Vec<String> {
        self.online
            .iter()
            .filter_map(|id| {
                if *id == current.id {
                    return Some(current.name.clone());
                }
                let handle = self.players.get(id)?;
                handle.lock().ok().map(|player| player.name.clone())
            })
            .collect()
    }

    /// Whether another player already uses this name
    pub fn player_name_taken(&self, name: &str, except: PlayerId) -> bool {
        self.players.values().any(|handle| {
            handle.id() != except
                && handle
                    .lock()
                    .map(|player| player.name.eq_ignore_ascii_case(name))
                    .unwrap_or(false)
        })
    }

    // Accounts and guilds

    pub fn add_user(&mut self, user: UserAccount) -> UserId {
        let id = user.id;
        self.users.insert(id, user);
        id
    }

    pub fn user(&self, id: UserId) -> Option<&UserAccount> {
        self.users.get(&id)
    }

    pub fn user_mut(&mut self, id: UserId) -> Option<&mut UserAccount> {
        self.users.get_mut(&id)
    }

    pub fn access_of(&self, player: &Player) -> Access {
        self.user(player.user)
            .map(|user| user.access)
            .unwrap_or_default()
    }

    pub fn add_guild(&mut self, guild: Guild) -> GuildId {
        let id = guild.id;
        self.guilds.insert(id, guild);
        id
    }

    pub fn guild(&self, id: GuildId) -> Option<&Guild> {
        self.guilds.get(&id)
    }

    pub fn guild_mut(&mut self, id: GuildId) -> Option<&mut Guild> {
        self.guilds.get_mut(&id)
    }

    pub fn guild_by_name(&self, name: &str) -> Option<&Guild> {
        self.guilds
            .values()
            .find(|guild| guild.name.eq_ignore_ascii_case(name))
    }

    pub fn remove_guild(&mut self, id: GuildId) -> Option<Guild> {
        self.guilds.remove(&id)
    }

    // Variables

    pub fn server_variables(&self) -> &VariableStore {
        &self.server_variables
    }

    pub fn server_variables_mut(&mut self) -> &mut VariableStore {
        &mut self.server_variables
    }

    /// Stored value of a variable as seen by `player`
    ///
    /// `None` when nothing is stored yet or the owning guild/account does not
    /// exist.
    pub fn stored_variable<'a>(&'a self, player: &'a Player, variable: VariableRef) -> Option<&'a VariableValue> {
        match variable.scope {
            VariableScope::Player => player.variables.get(&variable.id),
            VariableScope::Server => self.server_variables.get(&variable.id),
            VariableScope::Guild => player
                .guild
                .and_then(|guild| self.guilds.get(&guild))
                .and_then(|guild| guild.variables.get(&variable.id)),
            VariableScope::User => self
                .users
                .get(&player.user)
                .and_then(|user| user.variables.get(&variable.id)),
        }
    }

    // Map entities

    pub fn add_map_event(&mut self, event: MapEvent) {
        self.map_events.insert(event.id, event);
    }

    pub fn map_event(&self, id: EventId) -> Option<&MapEvent> {
        self.map_events.get(&id)
    }

    pub fn map_event_mut(&mut self, id: EventId) -> Option<&mut MapEvent> {
        self.map_events.get_mut(&id)
    }

    pub fn spawn_npc(&mut self, npc: SpawnedNpc) {
        self.npcs.insert(npc.entity, npc);
    }

    pub fn despawn_npc(&mut self, entity: EntityId) -> Option<SpawnedNpc> {
        self.npcs.remove(&entity)
    }

    pub fn npcs(&self) -> impl Iterator<Item = &SpawnedNpc> {
        self.npcs.values()
    }

    pub fn queue_spell_cast(&mut self, cast: SpellCast) {
        self.spell_casts.push(cast);
    }

    pub fn drain_spell_casts(&mut self) -> Vec<SpellCast> {
        std::mem::take(&mut self.spell_casts)
    }

    pub fn drop_item(&mut self, item: DroppedItem) {
        self.dropped_items.push(item);
    }

    pub fn dropped_items(&self) -> &[DroppedItem] {
        &self.dropped_items
    }

    // Outbound queues

    pub fn persistence(&self) -> &PersistenceQueue {
        &self.persistence
    }

    pub fn persistence_mut(&mut self) -> &mut PersistenceQueue {
        &mut self.persistence
    }

    pub fn request_common_event(&mut self, request: CommonEventRequest) {
        self.common_event_requests.push_back(request);
    }

    pub fn pending_common_events(&self) -> impl Iterator<Item = &CommonEventRequest> {
        self.common_event_requests.iter()
    }

    pub fn drain_common_event_requests(&mut self) -> Vec<CommonEventRequest> {
        self.common_event_requests.drain(..).collect()
    }

    pub fn push_self_switch_update(&mut self, update: SelfSwitchUpdate) {
        self.self_switch_updates.push(update);
    }

    pub fn drain_self_switch_updates(&mut self) -> Vec<SelfSwitchUpdate> {
        std::mem::take(&mut self.self_switch_updates)
    }
}
