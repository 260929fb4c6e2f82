//! Condition descriptors used by conditional branches and common-event pages

use crate::domain::commands::Quantity;
use crate::domain::value_objects::*;
use serde::{Deserialize, Serialize};

/// Right-hand side of a variable comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand<T> {
    Literal(T),
    Variable(VariableRef),
}

/// Comparison applied to a variable's current value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariableComparison {
    Boolean {
        equal: bool,
        value: Operand<bool>,
    },
    Integer {
        comparator: Comparator,
        value: Operand<i64>,
    },
    StringEquals(String),
    StringContains(String),
}

/// What a level-or-stat condition reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelOrStat {
    Level,
    Stat(Stat),
}

/// Condition kinds, each with its own evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ConditionKind {
    VariableIs {
        variable: VariableRef,
        comparison: VariableComparison,
    },
    HasItem {
        item: ItemId,
        quantity: Quantity,
    },
    ClassIs {
        class: ClassId,
    },
    KnowsSpell {
        spell: SpellId,
    },
    LevelOrStat {
        target: LevelOrStat,
        comparator: Comparator,
        value: i64,
    },
    SelfSwitch {
        switch: usize,
        value: bool,
    },
    AccessIs {
        access: Access,
    },
    /// Wall-clock minute of day in `start..=end`, wrapping past midnight
    TimeBetween {
        start_minute: u32,
        end_minute: u32,
    },
    CanStartQuest {
        quest: QuestId,
    },
    QuestInProgress {
        quest: QuestId,
        #[serde(default)]
        task: Option<TaskId>,
    },
    QuestCompleted {
        quest: QuestId,
    },
    GenderIs {
        gender: Gender,
    },
    MapIs {
        map: MapId,
    },
    IsItemEquipped {
        item: ItemId,
    },
    HasFreeInventorySlots {
        quantity: usize,
    },
    InGuild,
}

/// A condition with its negation and else flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(flatten)]
    pub kind: ConditionKind,
    #[serde(default)]
    pub negated: bool,
    /// Conditional branches take branch 1 on failure only when set
    #[serde(default)]
    pub else_enabled: bool,
}

impl Condition {
    pub fn new(kind: ConditionKind) -> Self {
        Self {
            kind,
            negated: false,
            else_enabled: false,
        }
    }

    pub fn with_else(mut self) -> Self {
        self.else_enabled = true;
        self
    }

    pub fn negated(mut self) -> Self {
        self.negated = true;
        self
    }
}
