//! Live game entities a script acts on: players, accounts and guilds

use crate::domain::commands::MoveRoute;
use crate::domain::value_objects::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One occupied inventory slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySlot {
    pub item: ItemId,
    pub quantity: i64,
}

/// Progress of one quest
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuestProgress {
    /// Active task, `None` once the quest is no longer in progress
    pub task: Option<TaskId>,
    pub completed: bool,
    pub completion_count: u32,
}

impl QuestProgress {
    pub fn in_progress(&self) -> bool {
        self.task.is_some()
    }
}

/// A player character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub user: UserId,
    #[serde(default)]
    pub guild: Option<GuildId>,
    #[serde(default)]
    pub party: Vec<PlayerId>,

    pub map: MapId,
    #[serde(default)]
    pub map_instance: MapInstanceId,
    #[serde(default)]
    pub map_instance_type: Option<MapInstanceType>,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub dir: Direction,

    pub class: ClassId,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub sprite: String,
    #[serde(default)]
    pub face: String,
    #[serde(default)]
    pub name_color: Option<Color>,
    #[serde(default)]
    pub header_label: EntityLabel,
    #[serde(default)]
    pub footer_label: EntityLabel,
    #[serde(default)]
    pub color: Color,
    #[serde(default)]
    pub hidden: bool,

    pub level: i32,
    #[serde(default)]
    pub exp: i64,
    pub vitals: [i64; 2],
    pub max_vitals: [i64; 2],
    #[serde(default)]
    pub stats: [i64; Stat::COUNT],
    #[serde(default)]
    pub stat_points: i64,
    #[serde(default)]
    pub stat_allocations: [i64; Stat::COUNT],

    #[serde(default)]
    pub inventory: Vec<Option<InventorySlot>>,
    /// Equipment slot to item
    #[serde(default)]
    pub equipment: BTreeMap<usize, ItemId>,
    #[serde(default)]
    pub spells: Vec<Option<SpellId>>,
    #[serde(default)]
    pub quests: BTreeMap<QuestId, QuestProgress>,
    #[serde(default)]
    pub variables: VariableStore,

    #[serde(skip)]
    pub open_session: Option<SessionKind>,
    #[serde(skip)]
    pub fading: bool,
    /// Game-clock time until which the player counts as in combat
    #[serde(skip)]
    pub combat_until_ms: u64,
    #[serde(skip)]
    pub dead: bool,
    #[serde(skip)]
    pub move_route: Option<MoveRoute>,
    #[serde(skip)]
    pub spawned_npcs: Vec<EntityId>,
    /// Game-clock time until which an item cannot be used again
    #[serde(skip)]
    pub item_cooldowns: BTreeMap<ItemId, u64>,
}

impl Player {
    pub fn new(name: impl Into<String>, user: UserId, inventory_slots: usize, spell_slots: usize) -> Self {
        Self {
            id: PlayerId::new(),
            name: name.into(),
            user,
            guild: None,
            party: Vec::new(),
            map: MapId::nil(),
            map_instance: MapInstanceId::nil(),
            map_instance_type: None,
            x: 0,
            y: 0,
            dir: Direction::Down,
            class: ClassId::nil(),
            gender: Gender::default(),
            sprite: String::new(),
            face: String::new(),
            name_color: None,
            header_label: EntityLabel::default(),
            footer_label: EntityLabel::default(),
            color: Color::WHITE,
            hidden: false,
            level: 1,
            exp: 0,
            vitals: [100, 100],
            max_vitals: [100, 100],
            stats: [10; Stat::COUNT],
            stat_points: 0,
            stat_allocations: [0; Stat::COUNT],
            inventory: vec![None; inventory_slots],
            equipment: BTreeMap::new(),
            spells: vec![None; spell_slots],
            quests: BTreeMap::new(),
            variables: VariableStore::new(),
            open_session: None,
            fading: false,
            combat_until_ms: 0,
            dead: false,
            move_route: None,
            spawned_npcs: Vec::new(),
            item_cooldowns: BTreeMap::new(),
        }
    }

    pub fn vital(&self, vital: Vital) -> i64 {
        self.vitals[vital.index()]
    }

    pub fn max_vital(&self, vital: Vital) -> i64 {
        self.max_vitals[vital.index()]
    }

    /// Add to a vital, clamped to `0..=max`
    pub fn add_vital(&mut self, vital: Vital, amount: i64) {
        let max = self.max_vital(vital);
        let slot = &mut self.vitals[vital.index()];
        *slot = slot.saturating_add(amount).clamp(0, max);
    }

    pub fn restore_vital(&mut self, vital: Vital) {
        self.vitals[vital.index()] = self.max_vital(vital);
    }

    pub fn in_combat(&self, now_ms: u64) -> bool {
        self.combat_until_ms > now_ms
    }

    // Inventory

    pub fn item_count(&self, item: ItemId) -> i64 {
        self.inventory
            .iter()
            .flatten()
            .filter(|slot| slot.item == item)
            .map(|slot| slot.quantity)
            .sum()
    }

    pub fn free_inventory_slots(&self) -> usize {
        self.inventory.iter().filter(|slot| slot.is_none()).count()
    }

    /// How many of an item the inventory can still take
    pub fn inventory_capacity_for(&self, item: ItemId, stackable: bool, max_stack: i64) -> i64 {
        if !stackable {
            return self.free_inventory_slots() as i64;
        }
        let max_stack = max_stack.max(1);
        let in_stacks: i64 = self
            .inventory
            .iter()
            .flatten()
            .filter(|slot| slot.item == item)
            .map(|slot| (max_stack - slot.quantity).max(0))
            .sum();
        in_stacks.saturating_add((self.free_inventory_slots() as i64).saturating_mul(max_stack))
    }

    /// Place `quantity` items, assuming capacity was checked
    pub fn insert_items(&mut self, item: ItemId, quantity: i64, stackable: bool, max_stack: i64) {
        let mut remaining = quantity;
        if stackable {
            let max_stack = max_stack.max(1);
            for slot in self.inventory.iter_mut().flatten() {
                if remaining == 0 {
                    return;
                }
                if slot.item == item && slot.quantity < max_stack {
                    let added = (max_stack - slot.quantity).min(remaining);
                    slot.quantity += added;
                    remaining -= added;
                }
            }
            for slot in self.inventory.iter_mut().filter(|slot| slot.is_none()) {
                if remaining == 0 {
                    return;
                }
                let added = max_stack.min(remaining);
                *slot = Some(InventorySlot {
                    item,
                    quantity: added,
                });
                remaining -= added;
            }
        } else {
            for slot in self.inventory.iter_mut().filter(|slot| slot.is_none()) {
                if remaining == 0 {
                    return;
                }
                *slot = Some(InventorySlot { item, quantity: 1 });
                remaining -= 1;
            }
        }
    }

    /// Take up to `quantity` items, returning how many were removed
    pub fn remove_items(&mut self, item: ItemId, quantity: i64) -> i64 {
        let mut remaining = quantity;
        for entry in self.inventory.iter_mut() {
            if remaining == 0 {
                break;
            }
            let Some(slot) = entry.as_mut() else {
                continue;
            };
            if slot.item != item {
                continue;
            }
            let taken = slot.quantity.min(remaining);
            slot.quantity -= taken;
            remaining -= taken;
            if slot.quantity == 0 {
                *entry = None;
            }
        }
        if self.item_count(item) == 0 {
            self.equipment.retain(|_, equipped| *equipped != item);
        }
        quantity - remaining
    }

    pub fn is_equipped(&self, item: ItemId) -> bool {
        self.equipment.values().any(|equipped| *equipped == item)
    }

    // Spells

    pub fn knows_spell(&self, spell: SpellId) -> bool {
        self.spells.iter().flatten().any(|known| *known == spell)
    }

    /// Learn into the first free slot; false when already known or full
    pub fn learn_spell(&mut self, spell: SpellId) -> bool {
        if self.knows_spell(spell) {
            return false;
        }
        match self.spells.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(spell);
                true
            }
            None => false,
        }
    }

    pub fn forget_spell(&mut self, spell: SpellId) -> bool {
        match self.spells.iter_mut().find(|slot| **slot == Some(spell)) {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    }

    // Quests

    pub fn quest(&self, quest: QuestId) -> Option<&QuestProgress> {
        self.quests.get(&quest)
    }

    pub fn quest_in_progress(&self, quest: QuestId) -> bool {
        self.quest(quest).is_some_and(QuestProgress::in_progress)
    }

    pub fn quest_completed(&self, quest: QuestId) -> bool {
        self.quest(quest).is_some_and(|progress| progress.completed)
    }

    /// Return spent stat points to the pool
    pub fn reset_stat_allocations(&mut self) {
        let refunded: i64 = self.stat_allocations.iter().sum();
        for (stat, allocated) in self.stats.iter_mut().zip(self.stat_allocations.iter_mut()) {
            *stat -= *allocated;
            *allocated = 0;
        }
        self.stat_points += refunded;
    }

    pub fn variable(&self, id: VariableId) -> Option<&VariableValue> {
        self.variables.get(&id)
    }
}

/// An account that owns one or more players
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub access: Access,
    #[serde(default)]
    pub players: Vec<PlayerId>,
    #[serde(default)]
    pub variables: VariableStore,
}

impl UserAccount {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            access: Access::None,
            players: Vec::new(),
            variables: VariableStore::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guild {
    pub id: GuildId,
    pub name: String,
    pub leader: PlayerId,
    #[serde(default)]
    pub members: Vec<PlayerId>,
    #[serde(default)]
    pub bank_slots: usize,
    #[serde(default)]
    pub variables: VariableStore,
}

impl Guild {
    pub fn new(name: impl Into<String>, leader: PlayerId) -> Self {
        Self {
            id: GuildId::new(),
            name: name.into(),
            leader,
            members: vec![leader],
            bank_slots: 0,
            variables: VariableStore::new(),
        }
    }
}
