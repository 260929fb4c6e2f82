//! Script commands - the instruction set of a compiled page
//!
//! Branch-carrying commands keep their branch ids in a positional vector:
//! index 0 is the true/success/first-option branch, index 1 the
//! false/failure/second-option branch, and so on. Positions are never
//! reordered.

use crate::domain::conditions::Condition;
use crate::domain::value_objects::*;
use serde::{Deserialize, Serialize};

/// Operation applied to a boolean variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BooleanMod {
    Set(bool),
    /// Copy the boolean held by another variable
    Duplicate(VariableRef),
}

/// Operator used when an integer variable is combined with another variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombineOp {
    Set,
    Add,
    Subtract,
    Multiply,
    Divide,
    LeftShift,
    RightShift,
}

/// Operation applied to an integer variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IntegerMod {
    Set(i64),
    Add(i64),
    Subtract(i64),
    Multiply(i64),
    /// No-op when the divisor is zero
    Divide(i64),
    LeftShift(i64),
    RightShift(i64),
    /// Uniform value in `low..=high`
    Random { low: i64, high: i64 },
    /// Current unix time in milliseconds
    SystemTime,
    /// Combine with the integer held by another variable
    Combine { op: CombineOp, source: VariableRef },
}

/// Operation applied to a string variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StringMod {
    /// Template-expanded assignment
    Set(String),
    /// Template-expanded find/replace
    Replace { find: String, replace: String },
}

/// Variable modification descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "op")]
pub enum VariableMod {
    Boolean(BooleanMod),
    Integer(IntegerMod),
    String(StringMod),
}

impl VariableMod {
    pub fn data_type(&self) -> VariableDataType {
        match self {
            VariableMod::Boolean(_) => VariableDataType::Boolean,
            VariableMod::Integer(_) => VariableDataType::Integer,
            VariableMod::String(_) => VariableDataType::String,
        }
    }
}

/// Literal amount or an amount read from a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantity {
    Fixed(i64),
    Variable(VariableRef),
}

/// Target entity of an animation or relative NPC spawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnTarget {
    /// Absolute tile on a map
    Tile {
        map: MapId,
        x: i32,
        y: i32,
        dir: Direction,
    },
    /// Offset from the running player, or from a map event when `event` is set
    Relative {
        event: Option<EventId>,
        dx: i32,
        dy: i32,
        /// Rotate the offset and inherit the target's facing
        relative_to_facing: bool,
    },
}

/// One movement step of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveStep {
    Move(Direction),
    Turn(Direction),
    Wait(u32),
}

/// Movement route assigned to a player or map event
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MoveRoute {
    /// Nil targets the running player
    pub target: EventId,
    pub steps: Vec<MoveStep>,
    pub repeat: bool,
    pub ignore_if_blocked: bool,
}

/// Script command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    ShowText {
        text: String,
        #[serde(default)]
        face: String,
    },
    ShowOptions {
        text: String,
        #[serde(default)]
        face: String,
        options: Vec<String>,
        branch_ids: Vec<BranchId>,
    },
    InputVariable {
        title: String,
        text: String,
        variable: VariableRef,
        branch_ids: Vec<BranchId>,
    },
    AddChatboxText {
        text: String,
        #[serde(default)]
        color: Color,
        channel: ChatChannel,
        #[serde(default)]
        show_chat_bubble: bool,
        #[serde(default)]
        bubble_in_proximity: bool,
    },
    SetVariable {
        variable: VariableRef,
        modification: VariableMod,
        #[serde(default)]
        sync_party: bool,
    },
    SetSelfSwitch {
        switch: usize,
        value: bool,
    },
    ConditionalBranch {
        condition: Condition,
        branch_ids: Vec<BranchId>,
    },
    ExitEventProcessing,
    Label {
        label: String,
    },
    GoToLabel {
        label: String,
    },
    StartCommonEvent {
        event: EventId,
        #[serde(default)]
        all_in_instance: bool,
        #[serde(default)]
        allow_in_overworld: bool,
    },
    RestoreHp {
        amount: i64,
    },
    RestoreMp {
        amount: i64,
    },
    LevelUp,
    GiveExperience {
        amount: Quantity,
        #[serde(default)]
        enable_losing_levels: bool,
    },
    ChangeLevel {
        level: i32,
    },
    ChangeSpells {
        spell: SpellId,
        add: bool,
        #[serde(default)]
        remove_bound_spell: bool,
        branch_ids: Vec<BranchId>,
    },
    ChangeItems {
        item: ItemId,
        add: bool,
        quantity: Quantity,
        #[serde(default)]
        handling: ItemHandling,
        branch_ids: Vec<BranchId>,
    },
    EquipItem {
        item: ItemId,
        #[serde(default)]
        unequip: bool,
        /// When unequipping, use `slot` instead of `item`
        #[serde(default)]
        by_slot: bool,
        #[serde(default)]
        slot: usize,
        #[serde(default)]
        trigger_cooldown: bool,
    },
    ChangeSprite {
        sprite: String,
    },
    ChangeFace {
        face: String,
    },
    ChangeGender {
        gender: Gender,
    },
    ChangeNameColor {
        color: Color,
        #[serde(default)]
        remove: bool,
        /// Also applies to players with elevated access
        #[serde(default)]
        override_access: bool,
    },
    ChangePlayerLabel {
        value: String,
        position: LabelPosition,
        #[serde(default)]
        color: Color,
        #[serde(default)]
        match_name_color: bool,
    },
    ChangePlayerColor {
        color: Color,
    },
    SetAccess {
        access: Access,
    },
    Warp {
        map: MapId,
        x: i32,
        y: i32,
        #[serde(default)]
        direction: WarpDirection,
        #[serde(default)]
        instance_type: Option<MapInstanceType>,
    },
    SetMoveRoute {
        route: MoveRoute,
    },
    WaitForRoute {
        /// Nil waits on the running player
        target: EventId,
    },
    SpawnNpc {
        npc: NpcId,
        at: SpawnTarget,
    },
    DespawnNpcs,
    PlayAnimation {
        animation: AnimationId,
        at: SpawnTarget,
        /// Only the running player sees the animation
        #[serde(default)]
        to_player_only: bool,
    },
    HoldPlayer,
    ReleasePlayer,
    HidePlayer,
    ShowPlayer,
    PlayBgm {
        file: String,
    },
    FadeoutBgm,
    PlaySound {
        file: String,
    },
    StopSounds,
    ShowPicture {
        file: String,
        #[serde(default)]
        size: u32,
        #[serde(default)]
        clickable: bool,
        #[serde(default)]
        hide_time_ms: u64,
        #[serde(default)]
        wait_until_closed: bool,
    },
    HidePicture,
    Wait {
        time_ms: u64,
    },
    OpenBank,
    OpenShop {
        shop: ShopId,
    },
    OpenCraftingTable {
        table: CraftingTableId,
        #[serde(default)]
        journal_mode: bool,
    },
    SetClass {
        class: ClassId,
    },
    StartQuest {
        quest: QuestId,
        #[serde(default)]
        offer: bool,
        branch_ids: Vec<BranchId>,
    },
    CompleteQuestTask {
        quest: QuestId,
        task: TaskId,
    },
    EndQuest {
        quest: QuestId,
        #[serde(default)]
        skip_completion_event: bool,
    },
    ChangeName {
        variable: VariableId,
        branch_ids: Vec<BranchId>,
    },
    CreateGuild {
        variable: VariableId,
        branch_ids: Vec<BranchId>,
    },
    DisbandGuild {
        branch_ids: Vec<BranchId>,
    },
    OpenGuildBank,
    SetGuildBankSlots {
        slots: VariableRef,
    },
    ResetStatPointAllocations,
    CastSpellOn {
        spell: SpellId,
        #[serde(default)]
        on_self: bool,
        #[serde(default)]
        party_members: bool,
        #[serde(default)]
        guild_members: bool,
    },
    ScreenFade {
        fade: FadeType,
        #[serde(default)]
        wait_for_completion: bool,
        duration_ms: u64,
    },
    /// Any command kind this build does not recognize
    #[serde(other)]
    Unsupported,
}

impl Command {
    /// Branch ids carried by this command, in positional order
    pub fn branch_ids(&self) -> Option<&[BranchId]> {
        match self {
            Command::ShowOptions { branch_ids, .. }
            | Command::InputVariable { branch_ids, .. }
            | Command::ConditionalBranch { branch_ids, .. }
            | Command::ChangeSpells { branch_ids, .. }
            | Command::ChangeItems { branch_ids, .. }
            | Command::StartQuest { branch_ids, .. }
            | Command::ChangeName { branch_ids, .. }
            | Command::CreateGuild { branch_ids, .. }
            | Command::DisbandGuild { branch_ids } => Some(branch_ids),
            _ => None,
        }
    }

    /// Name of the command kind, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Command::ShowText { .. } => "ShowText",
            Command::ShowOptions { .. } => "ShowOptions",
            Command::InputVariable { .. } => "InputVariable",
            Command::AddChatboxText { .. } => "AddChatboxText",
            Command::SetVariable { .. } => "SetVariable",
            Command::SetSelfSwitch { .. } => "SetSelfSwitch",
            Command::ConditionalBranch { .. } => "ConditionalBranch",
            Command::ExitEventProcessing => "ExitEventProcessing",
            Command::Label { .. } => "Label",
            Command::GoToLabel { .. } => "GoToLabel",
            Command::StartCommonEvent { .. } => "StartCommonEvent",
            Command::RestoreHp { .. } => "RestoreHp",
            Command::RestoreMp { .. } => "RestoreMp",
            Command::LevelUp => "LevelUp",
            Command::GiveExperience { .. } => "GiveExperience",
            Command::ChangeLevel { .. } => "ChangeLevel",
            Command::ChangeSpells { .. } => "ChangeSpells",
            Command::ChangeItems { .. } => "ChangeItems",
            Command::EquipItem { .. } => "EquipItem",
            Command::ChangeSprite { .. } => "ChangeSprite",
            Command::ChangeFace { .. } => "ChangeFace",
            Command::ChangeGender { .. } => "ChangeGender",
            Command::ChangeNameColor { .. } => "ChangeNameColor",
            Command::ChangePlayerLabel { .. } => "ChangePlayerLabel",
            Command::ChangePlayerColor { .. } => "ChangePlayerColor",
            Command::SetAccess { .. } => "SetAccess",
            Command::Warp { .. } => "Warp",
            Command::SetMoveRoute { .. } => "SetMoveRoute",
            Command::WaitForRoute { .. } => "WaitForRoute",
            Command::SpawnNpc { .. } => "SpawnNpc",
            Command::DespawnNpcs => "DespawnNpcs",
            Command::PlayAnimation { .. } => "PlayAnimation",
            Command::HoldPlayer => "HoldPlayer",
            Command::ReleasePlayer => "ReleasePlayer",
            Command::HidePlayer => "HidePlayer",
            Command::ShowPlayer => "ShowPlayer",
            Command::PlayBgm { .. } => "PlayBgm",
            Command::FadeoutBgm => "FadeoutBgm",
            Command::PlaySound { .. } => "PlaySound",
            Command::StopSounds => "StopSounds",
            Command::ShowPicture { .. } => "ShowPicture",
            Command::HidePicture => "HidePicture",
            Command::Wait { .. } => "Wait",
            Command::OpenBank => "OpenBank",
            Command::OpenShop { .. } => "OpenShop",
            Command::OpenCraftingTable { .. } => "OpenCraftingTable",
            Command::SetClass { .. } => "SetClass",
            Command::StartQuest { .. } => "StartQuest",
            Command::CompleteQuestTask { .. } => "CompleteQuestTask",
            Command::EndQuest { .. } => "EndQuest",
            Command::ChangeName { .. } => "ChangeName",
            Command::CreateGuild { .. } => "CreateGuild",
            Command::DisbandGuild { .. } => "DisbandGuild",
            Command::OpenGuildBank => "OpenGuildBank",
            Command::SetGuildBankSlots { .. } => "SetGuildBankSlots",
            Command::ResetStatPointAllocations => "ResetStatPointAllocations",
            Command::CastSpellOn { .. } => "CastSpellOn",
            Command::ScreenFade { .. } => "ScreenFade",
            Command::Unsupported => "Unsupported",
        }
    }
}
