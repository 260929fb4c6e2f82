//! Domain value objects - Immutable objects that describe aspects of the domain

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Macro to implement the common surface of uuid-backed identifier types
macro_rules! impl_id_wrapper {
    ($type:ident) => {
        impl $type {
            /// Fresh random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// The "no reference" identifier
            pub const fn nil() -> Self {
                Self(Uuid::nil())
            }

            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $type {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

macro_rules! id_types {
    ($($(#[$meta:meta])* $type:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(
                Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize,
                Deserialize,
            )]
            #[serde(transparent)]
            pub struct $type(Uuid);

            impl_id_wrapper!($type);
        )*
    };
}

id_types!(
    /// Identifier of a compiled page
    PageId,
    /// Identifier of a command list inside a page
    BranchId,
    /// Identifier of an authored event (map event or common event)
    EventId,
    /// Identifier of one running event instance
    InstanceId,
    PlayerId,
    /// Identifier of an account owning one or more players
    UserId,
    GuildId,
    MapId,
    /// Identifier of a map instance; nil is the overworld
    MapInstanceId,
    VariableId,
    ItemId,
    SpellId,
    QuestId,
    TaskId,
    ClassId,
    ShopId,
    CraftingTableId,
    NpcId,
    AnimationId,
    /// Identifier of a spawned NPC entity
    EntityId,
);

/// Visibility and persistence domain of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VariableScope {
    Player,
    User,
    Guild,
    Server,
}

impl std::fmt::Display for VariableScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VariableScope::Player => "player",
            VariableScope::User => "user",
            VariableScope::Guild => "guild",
            VariableScope::Server => "server",
        };
        f.write_str(name)
    }
}

/// Addresses one variable in one scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableRef {
    pub scope: VariableScope,
    pub id: VariableId,
}

impl VariableRef {
    pub fn new(scope: VariableScope, id: VariableId) -> Self {
        Self { scope, id }
    }

    pub fn player(id: VariableId) -> Self {
        Self::new(VariableScope::Player, id)
    }

    pub fn server(id: VariableId) -> Self {
        Self::new(VariableScope::Server, id)
    }

    pub fn guild(id: VariableId) -> Self {
        Self::new(VariableScope::Guild, id)
    }

    pub fn user(id: VariableId) -> Self {
        Self::new(VariableScope::User, id)
    }
}

/// Tag of a variable value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableDataType {
    Boolean,
    Integer,
    String,
}

/// Variable value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum VariableValue {
    Boolean(bool),
    Integer(i64),
    String(String),
}

impl VariableValue {
    /// Zero-valued instance of the given tag
    pub fn zero(data_type: VariableDataType) -> Self {
        match data_type {
            VariableDataType::Boolean => VariableValue::Boolean(false),
            VariableDataType::Integer => VariableValue::Integer(0),
            VariableDataType::String => VariableValue::String(String::new()),
        }
    }

    pub fn data_type(&self) -> VariableDataType {
        match self {
            VariableValue::Boolean(_) => VariableDataType::Boolean,
            VariableValue::Integer(_) => VariableDataType::Integer,
            VariableValue::String(_) => VariableDataType::String,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            VariableValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            VariableValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            VariableValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Parse player-entered text into a value of the given tag
    pub fn parse(data_type: VariableDataType, input: &str) -> Option<Self> {
        let trimmed = input.trim();
        match data_type {
            VariableDataType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(VariableValue::Boolean(true)),
                "false" | "no" | "0" => Some(VariableValue::Boolean(false)),
                _ => None,
            },
            VariableDataType::Integer => trimmed.parse().ok().map(VariableValue::Integer),
            VariableDataType::String => Some(VariableValue::String(input.to_string())),
        }
    }
}

impl std::fmt::Display for VariableValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableValue::Boolean(b) => write!(f, "{b}"),
            VariableValue::Integer(i) => write!(f, "{i}"),
            VariableValue::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for VariableValue {
    fn from(b: bool) -> Self {
        VariableValue::Boolean(b)
    }
}

impl From<i64> for VariableValue {
    fn from(i: i64) -> Self {
        VariableValue::Integer(i)
    }
}

impl From<&str> for VariableValue {
    fn from(s: &str) -> Self {
        VariableValue::String(s.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(s: String) -> Self {
        VariableValue::String(s)
    }
}

/// Store for variables of one owner
pub type VariableStore = BTreeMap<VariableId, VariableValue>;

/// Facing direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Up,
    Down,
    Left,
    Right,
}

/// Direction requested by a warp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WarpDirection {
    #[default]
    Retain,
    Face(Direction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    Male,
    Female,
}

/// Access rights of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Access {
    #[default]
    None,
    Moderator,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vital {
    Health,
    Mana,
}

impl Vital {
    pub fn index(self) -> usize {
        match self {
            Vital::Health => 0,
            Vital::Mana => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stat {
    Attack,
    AbilityPower,
    Defense,
    MagicResist,
    Speed,
}

impl Stat {
    pub const COUNT: usize = 5;

    pub fn index(self) -> usize {
        match self {
            Stat::Attack => 0,
            Stat::AbilityPower => 1,
            Stat::Defense => 2,
            Stat::MagicResist => 3,
            Stat::Speed => 4,
        }
    }
}

/// RGBA colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const RED: Color = Color::rgba(255, 0, 0, 255);
    pub const GREEN: Color = Color::rgba(0, 200, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Text shown above or below a player's name
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityLabel {
    pub text: String,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelPosition {
    Header,
    Footer,
}

/// Chat channel for scripted chat text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatChannel {
    Player,
    Local,
    Global,
    Party,
    Guild,
}

/// Classifies a chat message for the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatMessageKind {
    Notice,
    Local,
    Global,
    Party,
    Guild,
    Error,
}

/// How item grants and removals behave when they cannot be satisfied fully
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ItemHandling {
    /// All or nothing
    #[default]
    Normal,
    /// Grants what fits and drops the rest on the map
    Overflow,
    /// Grants or takes as many as possible
    UpTo,
}

/// A blocking interface session opened by a script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKind {
    Bank,
    Shop,
    Crafting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FadeType {
    FadeIn,
    FadeOut,
}

/// Kind of map instance a warp may move the player into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapInstanceType {
    Overworld,
    Personal,
    Guild,
    Shared,
}

/// Entity whose movement route a script may wait on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteEntity {
    Player(PlayerId),
    Event(EventId),
}

/// Target of a wait-for-route suspension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteTarget {
    pub entity: RouteEntity,
    pub map: MapId,
}

/// Comparison used by integer and stat conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl Comparator {
    pub fn compare(self, left: i64, right: i64) -> bool {
        match self {
            Comparator::Equal => left == right,
            Comparator::NotEqual => left != right,
            Comparator::Greater => left > right,
            Comparator::GreaterOrEqual => left >= right,
            Comparator::Less => left < right,
            Comparator::LessOrEqual => left <= right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_match_their_tag() {
        assert_eq!(
            VariableValue::zero(VariableDataType::Boolean),
            VariableValue::Boolean(false)
        );
        assert_eq!(
            VariableValue::zero(VariableDataType::Integer),
            VariableValue::Integer(0)
        );
        assert_eq!(
            VariableValue::zero(VariableDataType::String),
            VariableValue::String(String::new())
        );
    }

    #[test]
    fn parse_respects_tag() {
        assert_eq!(
            VariableValue::parse(VariableDataType::Integer, " 42 "),
            Some(VariableValue::Integer(42))
        );
        assert_eq!(VariableValue::parse(VariableDataType::Integer, "abc"), None);
        assert_eq!(
            VariableValue::parse(VariableDataType::Boolean, "Yes"),
            Some(VariableValue::Boolean(true))
        );
        assert_eq!(
            VariableValue::parse(VariableDataType::String, "Ayumi"),
            Some(VariableValue::String("Ayumi".to_string()))
        );
    }

    #[test]
    fn nil_ids_are_distinct_from_fresh_ones() {
        let id = BranchId::new();
        assert!(!id.is_nil());
        assert!(BranchId::nil().is_nil());
        assert_eq!(BranchId::default(), BranchId::nil());
    }

    #[test]
    fn comparator_orders_integers() {
        assert!(Comparator::GreaterOrEqual.compare(5, 5));
        assert!(!Comparator::Less.compare(5, 5));
        assert!(Comparator::NotEqual.compare(1, 2));
    }
}
