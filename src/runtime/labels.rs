//! Label resolution for go-to-label jumps
//!
//! The resolver walks the page depth-first, pre-order, from the root list.
//! Each branch-carrying command has its registered branch lists searched,
//! in branch order, before the walk continues past it. The result is an
//! immutable path of `(list, resume index)` positions from the root list
//! down to the list holding the label. Every position already points past
//! the command it descended through, so the jump resumes right after the
//! label and, once the inner lists exhaust, right after each enclosing
//! branch command.

use crate::domain::commands::Command;
use crate::domain::entities::{Frame, Page};
use crate::domain::value_objects::BranchId;
use std::sync::Arc;

/// Position of one frame in a resolved label path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStep {
    pub list: BranchId,
    pub index: usize,
}

struct Level<'p> {
    list: BranchId,
    commands: &'p [Command],
    index: usize,
    branches: std::slice::Iter<'p, BranchId>,
}

impl<'p> Level<'p> {
    fn new(list: BranchId, commands: &'p [Command]) -> Self {
        Self {
            list,
            commands,
            index: 0,
            branches: [].iter(),
        }
    }
}

/// Find the first `Label` named `label`, root first.
///
/// Lists that are not registered in the page are never entered, and a list
/// already on the current path is not re-entered.
pub fn find_label(page: &Page, label: &str) -> Option<Vec<PathStep>> {
    let root = page.list(page.root())?;
    let mut stack = vec![Level::new(page.root(), root)];

    while let Some(top) = stack.last_mut() {
        if let Some(&branch) = top.branches.next() {
            if let Some(commands) = page.list(branch)
                && !stack.iter().any(|level| level.list == branch)
            {
                stack.push(Level::new(branch, commands));
            }
            continue;
        }

        let Some(command) = top.commands.get(top.index) else {
            stack.pop();
            continue;
        };
        top.index += 1;

        if let Command::Label { label: name } = command
            && name == label
        {
            return Some(
                stack
                    .iter()
                    .map(|level| PathStep {
                        list: level.list,
                        index: level.index,
                    })
                    .collect(),
            );
        }

        if let Some(branch_ids) = command.branch_ids() {
            top.branches = branch_ids.iter();
        }
    }

    None
}

/// Frames positioned right after `label`, bottom first
pub fn resolve_label(page: &Arc<Page>, label: &str) -> Option<Vec<Frame>> {
    let path = find_label(page, label)?;
    Some(
        path.into_iter()
            .map(|step| Frame::at(Arc::clone(page), step.list, step.index))
            .collect(),
    )
}
