//! Descriptor tables held in memory, optionally loaded from a JSON file

use crate::domain::descriptors::*;
use crate::domain::repositories::RepositoryError;
use crate::domain::value_objects::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Serialized form of every descriptor table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptorSet {
    pub items: Vec<ItemDescriptor>,
    pub spells: Vec<SpellDescriptor>,
    pub quests: Vec<QuestDescriptor>,
    pub classes: Vec<ClassDescriptor>,
    pub shops: Vec<ShopDescriptor>,
    pub crafting_tables: Vec<CraftingTableDescriptor>,
    pub npcs: Vec<NpcDescriptor>,
    pub variables: Vec<VariableDescriptor>,
    pub common_events: Vec<CommonEventDescriptor>,
}

impl DescriptorSet {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RepositoryError::IoError {
                message: format!("Failed to read descriptors {}: {}", path.display(), e),
            })?;
        serde_json::from_str(&content).map_err(|e| RepositoryError::InvalidFormat {
            message: format!("Failed to parse descriptors {}: {}", path.display(), e),
        })
    }
}

/// Id-keyed descriptor lookup
#[derive(Debug, Clone, Default)]
pub struct InMemoryDescriptors {
    items: HashMap<ItemId, ItemDescriptor>,
    spells: HashMap<SpellId, SpellDescriptor>,
    quests: HashMap<QuestId, QuestDescriptor>,
    classes: HashMap<ClassId, ClassDescriptor>,
    shops: HashMap<ShopId, ShopDescriptor>,
    crafting_tables: HashMap<CraftingTableId, CraftingTableDescriptor>,
    npcs: HashMap<NpcId, NpcDescriptor>,
    variables: HashMap<VariableRef, VariableDescriptor>,
    common_events: HashMap<EventId, CommonEventDescriptor>,
}

impl InMemoryDescriptors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, item: ItemDescriptor) -> Self {
        self.items.insert(item.id, item);
        self
    }

    pub fn with_spell(mut self, spell: SpellDescriptor) -> Self {
        self.spells.insert(spell.id, spell);
        self
    }

    pub fn with_quest(mut self, quest: QuestDescriptor) -> Self {
        self.quests.insert(quest.id, quest);
        self
    }

    pub fn with_class(mut self, class: ClassDescriptor) -> Self {
        self.classes.insert(class.id, class);
        self
    }

    pub fn with_shop(mut self, shop: ShopDescriptor) -> Self {
        self.shops.insert(shop.id, shop);
        self
    }

    pub fn with_crafting_table(mut self, table: CraftingTableDescriptor) -> Self {
        self.crafting_tables.insert(table.id, table);
        self
    }

    pub fn with_npc(mut self, npc: NpcDescriptor) -> Self {
        self.npcs.insert(npc.id, npc);
        self
    }

    pub fn with_variable(mut self, variable: VariableDescriptor) -> Self {
        self.variables
            .insert(VariableRef::new(variable.scope, variable.id), variable);
        self
    }

    pub fn with_common_event(mut self, event: CommonEventDescriptor) -> Self {
        self.common_events.insert(event.id, event);
        self
    }
}

impl From<DescriptorSet> for InMemoryDescriptors {
    fn from(set: DescriptorSet) -> Self {
        let mut descriptors = InMemoryDescriptors::new();
        descriptors.items = set.items.into_iter().map(|d| (d.id, d)).collect();
        descriptors.spells = set.spells.into_iter().map(|d| (d.id, d)).collect();
        descriptors.quests = set.quests.into_iter().map(|d| (d.id, d)).collect();
        descriptors.classes = set.classes.into_iter().map(|d| (d.id, d)).collect();
        descriptors.shops = set.shops.into_iter().map(|d| (d.id, d)).collect();
        descriptors.crafting_tables = set.crafting_tables.into_iter().map(|d| (d.id, d)).collect();
        descriptors.npcs = set.npcs.into_iter().map(|d| (d.id, d)).collect();
        descriptors.variables = set
            .variables
            .into_iter()
            .map(|d| (VariableRef::new(d.scope, d.id), d))
            .collect();
        descriptors.common_events = set.common_events.into_iter().map(|d| (d.id, d)).collect();
        descriptors
    }
}

impl DescriptorLookup for InMemoryDescriptors {
    fn item(&self, id: ItemId) -> Option<&ItemDescriptor> {
        self.items.get(&id)
    }

    fn spell(&self, id: SpellId) -> Option<&SpellDescriptor> {
        self.spells.get(&id)
    }

    fn quest(&self, id: QuestId) -> Option<&QuestDescriptor> {
        self.quests.get(&id)
    }

    fn class(&self, id: ClassId) -> Option<&ClassDescriptor> {
        self.classes.get(&id)
    }

    fn shop(&self, id: ShopId) -> Option<&ShopDescriptor> {
        self.shops.get(&id)
    }

    fn crafting_table(&self, id: CraftingTableId) -> Option<&CraftingTableDescriptor> {
        self.crafting_tables.get(&id)
    }

    fn npc(&self, id: NpcId) -> Option<&NpcDescriptor> {
        self.npcs.get(&id)
    }

    fn variable(&self, variable: VariableRef) -> Option<&VariableDescriptor> {
        self.variables.get(&variable)
    }

    fn variable_by_text_id(&self, scope: VariableScope, text_id: &str) -> Option<&VariableDescriptor> {
        self.variables
            .values()
            .find(|d| d.scope == scope && !d.text_id.is_empty() && d.text_id.eq_ignore_ascii_case(text_id))
    }

    fn common_event(&self, id: EventId) -> Option<&CommonEventDescriptor> {
        self.common_events.get(&id)
    }

    fn common_events(&self) -> Vec<&CommonEventDescriptor> {
        self.common_events.values().collect()
    }
}
