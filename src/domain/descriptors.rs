//! Read-only game content descriptors, loaded at startup

use crate::domain::conditions::Condition;
use crate::domain::entities::Page;
use crate::domain::value_objects::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDescriptor {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub stackable: bool,
    #[serde(default = "default_max_stack")]
    pub max_stack: i64,
    /// Equipment slot this item occupies, when equippable
    #[serde(default)]
    pub equipment_slot: Option<usize>,
    /// Cooldown applied when equipped with cooldown triggering
    #[serde(default)]
    pub cooldown_ms: u64,
}

fn default_max_stack() -> i64 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellDescriptor {
    pub id: SpellId,
    pub name: String,
    /// Bound spells can only be forgotten when removal is forced
    #[serde(default)]
    pub bound: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestTask {
    pub id: TaskId,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completion_event: Option<EventId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestDescriptor {
    pub id: QuestId,
    pub name: String,
    pub tasks: Vec<QuestTask>,
    #[serde(default)]
    pub repeatable: bool,
    #[serde(default)]
    pub requirements: Vec<Condition>,
    #[serde(default)]
    pub start_event: Option<EventId>,
    #[serde(default)]
    pub end_event: Option<EventId>,
}

impl QuestDescriptor {
    pub fn task_index(&self, task: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == task)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    pub id: ClassId,
    pub name: String,
    #[serde(default)]
    pub sprite: String,
    /// Experience needed to leave level 1
    pub base_exp: i64,
    /// Additional experience needed per level after the first
    #[serde(default)]
    pub exp_increase: i64,
    #[serde(default)]
    pub vitals_per_level: [i64; 2],
}

impl ClassDescriptor {
    pub fn experience_to_next_level(&self, level: i32) -> i64 {
        let steps = i64::from(level.max(1) - 1);
        self.base_exp
            .saturating_add(self.exp_increase.saturating_mul(steps))
            .max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopDescriptor {
    pub id: ShopId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CraftingTableDescriptor {
    pub id: CraftingTableId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcDescriptor {
    pub id: NpcId,
    pub name: String,
    #[serde(default)]
    pub sprite: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDescriptor {
    pub id: VariableId,
    pub scope: VariableScope,
    pub name: String,
    pub data_type: VariableDataType,
    /// Key used by text tokens such as `\pv{gold}`
    #[serde(default)]
    pub text_id: String,
}

/// What causes a common-event page to start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommonEventTrigger {
    /// Only started explicitly
    None,
    Login,
    LevelUp,
    PlayerVariableChange(VariableId),
    ServerVariableChange(VariableId),
    GuildVariableChange(VariableId),
    UserVariableChange(VariableId),
}

impl CommonEventTrigger {
    pub fn variable_change(variable: VariableRef) -> Self {
        match variable.scope {
            VariableScope::Player => CommonEventTrigger::PlayerVariableChange(variable.id),
            VariableScope::Server => CommonEventTrigger::ServerVariableChange(variable.id),
            VariableScope::Guild => CommonEventTrigger::GuildVariableChange(variable.id),
            VariableScope::User => CommonEventTrigger::UserVariableChange(variable.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonEventPage {
    pub trigger: CommonEventTrigger,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub page: Arc<Page>,
}

/// Globally defined script triggerable across many players
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonEventDescriptor {
    pub id: EventId,
    pub name: String,
    pub pages: Vec<CommonEventPage>,
}

/// Read-only id to descriptor lookup
pub trait DescriptorLookup: Send + Sync {
    fn item(&self, id: ItemId) -> Option<&ItemDescriptor>;
    fn spell(&self, id: SpellId) -> Option<&SpellDescriptor>;
    fn quest(&self, id: QuestId) -> Option<&QuestDescriptor>;
    fn class(&self, id: ClassId) -> Option<&ClassDescriptor>;
    fn shop(&self, id: ShopId) -> Option<&ShopDescriptor>;
    fn crafting_table(&self, id: CraftingTableId) -> Option<&CraftingTableDescriptor>;
    fn npc(&self, id: NpcId) -> Option<&NpcDescriptor>;
    fn variable(&self, variable: VariableRef) -> Option<&VariableDescriptor>;
    fn variable_by_text_id(&self, scope: VariableScope, text_id: &str) -> Option<&VariableDescriptor>;
    fn common_event(&self, id: EventId) -> Option<&CommonEventDescriptor>;
    fn common_events(&self) -> Vec<&CommonEventDescriptor>;
}
