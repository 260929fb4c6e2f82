//! Domain entities - Pages, frames, call stacks and event instances

use crate::domain::commands::Command;
use crate::domain::errors::DomainError;
use crate::domain::value_objects::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Ordered sequence of commands owned by one page
pub type CommandList = Vec<Command>;

/// Immutable compiled script: a root list plus branch-addressed sub-lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    id: PageId,
    #[serde(default)]
    name: String,
    root: BranchId,
    lists: HashMap<BranchId, CommandList>,
}

impl Page {
    pub fn new(
        id: PageId,
        name: impl Into<String>,
        root: BranchId,
        lists: HashMap<BranchId, CommandList>,
    ) -> Result<Self, DomainError> {
        let page = Self {
            id,
            name: name.into(),
            root,
            lists,
        };
        page.validate()?;
        Ok(page)
    }

    /// Check that the root list is registered
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.lists.contains_key(&self.root) {
            return Err(DomainError::invalid_page(format!(
                "root list {} of page {} is not registered",
                self.root, self.id
            )));
        }
        Ok(())
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> BranchId {
        self.root
    }

    pub fn list(&self, id: BranchId) -> Option<&CommandList> {
        self.lists.get(&id)
    }

    pub fn contains_list(&self, id: BranchId) -> bool {
        self.lists.contains_key(&id)
    }

    pub fn lists(&self) -> impl Iterator<Item = (&BranchId, &CommandList)> {
        self.lists.iter()
    }

    pub fn list_count(&self) -> usize {
        self.lists.len()
    }
}

/// Builder for pages, mostly useful when authoring pages in code
pub struct PageBuilder {
    id: PageId,
    name: String,
    root: BranchId,
    lists: HashMap<BranchId, CommandList>,
}

impl PageBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PageId::new(),
            name: name.into(),
            root: BranchId::new(),
            lists: HashMap::new(),
        }
    }

    pub fn id(mut self, id: PageId) -> Self {
        self.id = id;
        self
    }

    pub fn root(mut self, commands: CommandList) -> Self {
        self.lists.insert(self.root, commands);
        self
    }

    pub fn list(mut self, id: BranchId, commands: CommandList) -> Self {
        self.lists.insert(id, commands);
        self
    }

    pub fn build(self) -> Result<Page, DomainError> {
        Page::new(self.id, self.name, self.root, self.lists)
    }
}

/// Pending prompt a dialogue suspension is waiting on
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    Text,
    Options { branch_ids: Vec<BranchId> },
    Input {
        variable: VariableRef,
        branch_ids: Vec<BranchId>,
    },
}

/// Why a frame is held
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Suspension {
    #[default]
    None,
    Dialogue(Prompt),
    Timer { deadline_ms: u64 },
    Route(RouteTarget),
    Session(SessionKind),
    Fade,
    Picture,
    QuestOffer {
        quest: QuestId,
        branch_ids: Vec<BranchId>,
    },
}

/// Discriminant of a suspension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuspensionKind {
    None,
    Dialogue,
    Timer,
    Route,
    Session,
    Fade,
    Picture,
    QuestOffer,
}

impl Suspension {
    pub fn kind(&self) -> SuspensionKind {
        match self {
            Suspension::None => SuspensionKind::None,
            Suspension::Dialogue(_) => SuspensionKind::Dialogue,
            Suspension::Timer { .. } => SuspensionKind::Timer,
            Suspension::Route(_) => SuspensionKind::Route,
            Suspension::Session(_) => SuspensionKind::Session,
            Suspension::Fade => SuspensionKind::Fade,
            Suspension::Picture => SuspensionKind::Picture,
            Suspension::QuestOffer { .. } => SuspensionKind::QuestOffer,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Suspension::None)
    }
}

/// Mutable cursor into one command list of a page
#[derive(Debug, Clone)]
pub struct Frame {
    page: Arc<Page>,
    list: BranchId,
    index: usize,
    suspension: Suspension,
}

impl Frame {
    /// Frame at the start of the page's root list
    pub fn root(page: Arc<Page>) -> Self {
        let list = page.root();
        Self::at(page, list, 0)
    }

    pub fn at(page: Arc<Page>, list: BranchId, index: usize) -> Self {
        Self {
            page,
            list,
            index,
            suspension: Suspension::None,
        }
    }

    pub fn page(&self) -> &Arc<Page> {
        &self.page
    }

    pub fn list_id(&self) -> BranchId {
        self.list
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_root(&self) -> bool {
        self.list == self.page.root()
    }

    pub fn commands(&self) -> Result<&CommandList, DomainError> {
        self.page
            .list(self.list)
            .ok_or(DomainError::MissingCommandList {
                page: self.page.id(),
                list: self.list,
            })
    }

    /// True once the index has reached the end of the list
    pub fn is_exhausted(&self) -> Result<bool, DomainError> {
        Ok(self.index >= self.commands()?.len())
    }

    pub fn advance(&mut self) {
        self.index += 1;
    }

    pub fn suspension(&self) -> &Suspension {
        &self.suspension
    }

    pub fn is_suspended(&self) -> bool {
        !self.suspension.is_none()
    }

    pub fn suspend(&mut self, suspension: Suspension) {
        self.suspension = suspension;
    }

    /// Clear the suspension, returning what was held
    pub fn release(&mut self) -> Suspension {
        std::mem::take(&mut self.suspension)
    }
}

/// LIFO sequence of frames belonging to one event instance
#[derive(Debug, Clone, Default)]
pub struct CallStack {
    frames: Vec<Frame>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Drop every frame, ending any pending suspension
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Pop exhausted frames from the top until a frame with work remains.
    ///
    /// A suspended frame is never popped, even when exhausted.
    pub fn unwind_exhausted(&mut self) -> Result<usize, DomainError> {
        let mut popped = 0;
        while let Some(top) = self.frames.last() {
            if top.is_suspended() || !top.is_exhausted()? {
                break;
            }
            self.frames.pop();
            popped += 1;
        }
        Ok(popped)
    }

    /// Replace the frames of the running page with a resolved path.
    ///
    /// Frames above the running page's root frame are discarded together
    /// with that root frame; frames of calling pages below it are kept.
    pub fn replace_running_page(&mut self, path: Vec<Frame>) {
        while let Some(top) = self.frames.last() {
            let is_root = top.is_root();
            self.frames.pop();
            if is_root {
                break;
            }
        }
        self.frames.extend(path);
    }
}

/// Number of self switches each event carries
pub const SELF_SWITCH_COUNT: usize = 4;

/// Runtime wrapper around one running execution of a page
#[derive(Debug, Clone)]
pub struct EventInstance {
    id: InstanceId,
    event: EventId,
    player: PlayerId,
    map: MapId,
    global: bool,
    name: String,
    param: String,
    parameters: BTreeMap<String, String>,
    call_stack: CallStack,
    self_switches: [bool; SELF_SWITCH_COUNT],
    holding_player: bool,
}

impl EventInstance {
    pub fn new(event: EventId, player: PlayerId, page: Arc<Page>) -> Self {
        let name = page.name().to_string();
        let mut call_stack = CallStack::new();
        call_stack.push(Frame::root(page));
        Self {
            id: InstanceId::new(),
            event,
            player,
            map: MapId::nil(),
            global: false,
            name,
            param: String::new(),
            parameters: BTreeMap::new(),
            call_stack,
            self_switches: [false; SELF_SWITCH_COUNT],
            holding_player: false,
        }
    }

    pub fn on_map(mut self, map: MapId) -> Self {
        self.map = map;
        self
    }

    pub fn as_global(mut self) -> Self {
        self.global = true;
        self
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = param.into();
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_self_switches(mut self, switches: [bool; SELF_SWITCH_COUNT]) -> Self {
        self.self_switches = switches;
        self
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn event(&self) -> EventId {
        self.event
    }

    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn map(&self) -> MapId {
        self.map
    }

    pub fn is_global(&self) -> bool {
        self.global
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param(&self) -> &str {
        &self.param
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    pub fn call_stack_mut(&mut self) -> &mut CallStack {
        &mut self.call_stack
    }

    pub fn self_switch(&self, switch: usize) -> bool {
        self.self_switches.get(switch).copied().unwrap_or(false)
    }

    pub fn set_self_switch(&mut self, switch: usize, value: bool) {
        if let Some(slot) = self.self_switches.get_mut(switch) {
            *slot = value;
        }
    }

    pub fn is_holding_player(&self) -> bool {
        self.holding_player
    }

    pub fn set_holding_player(&mut self, holding: bool) {
        self.holding_player = holding;
    }

    /// Suspension of the top frame, if any
    pub fn suspension(&self) -> SuspensionKind {
        self.call_stack
            .top()
            .map(|frame| frame.suspension().kind())
            .unwrap_or(SuspensionKind::None)
    }

    /// Deadline of a pending wait command
    pub fn wait_deadline(&self) -> Option<u64> {
        match self.call_stack.top().map(Frame::suspension) {
            Some(Suspension::Timer { deadline_ms }) => Some(*deadline_ms),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.call_stack.is_empty()
    }

    /// Nothing left to execute and no hold on the player
    pub fn is_complete(&self) -> bool {
        self.call_stack.is_empty() && !self.holding_player
    }

    /// Unconditionally end execution; applied effects stay applied
    pub fn cancel(&mut self) {
        self.call_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Command {
        Command::ShowText {
            text: s.to_string(),
            face: String::new(),
        }
    }

    #[test]
    fn page_requires_registered_root() {
        let result = Page::new(PageId::new(), "broken", BranchId::new(), HashMap::new());
        assert!(matches!(result, Err(DomainError::InvalidPage { .. })));
    }

    #[test]
    fn unwind_pops_exhausted_frames_only() {
        let branch = BranchId::new();
        let page = Arc::new(
            PageBuilder::new("p")
                .root(vec![text("a"), text("b")])
                .list(branch, vec![text("c")])
                .build()
                .unwrap(),
        );
        let mut stack = CallStack::new();
        stack.push(Frame::at(page.clone(), page.root(), 1));
        stack.push(Frame::at(page.clone(), branch, 1));

        assert_eq!(stack.unwind_exhausted().unwrap(), 1);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.top().unwrap().index(), 1);
    }

    #[test]
    fn suspended_frame_is_not_unwound() {
        let page = Arc::new(PageBuilder::new("p").root(vec![text("a")]).build().unwrap());
        let mut stack = CallStack::new();
        let mut frame = Frame::at(page, BranchId::nil(), 0);
        frame.suspend(Suspension::Fade);
        stack.push(frame);

        // Suspension check happens before the list lookup
        assert_eq!(stack.unwind_exhausted().unwrap(), 0);
    }

    #[test]
    fn replace_running_page_keeps_calling_frames() {
        let caller = Arc::new(PageBuilder::new("caller").root(vec![text("a")]).build().unwrap());
        let branch = BranchId::new();
        let callee = Arc::new(
            PageBuilder::new("callee")
                .root(vec![text("b")])
                .list(branch, vec![text("c")])
                .build()
                .unwrap(),
        );

        let mut stack = CallStack::new();
        stack.push(Frame::root(caller.clone()));
        stack.push(Frame::root(callee.clone()));
        stack.push(Frame::at(callee.clone(), branch, 0));

        stack.replace_running_page(vec![Frame::at(callee.clone(), callee.root(), 1)]);

        assert_eq!(stack.len(), 2);
        assert_eq!(stack.frames()[0].page().id(), caller.id());
        assert_eq!(stack.top().unwrap().index(), 1);
    }
}
