//! Static checks over a compiled page

use crate::domain::commands::Command;
use crate::domain::entities::Page;
use crate::domain::value_objects::BranchId;
use crate::runtime::labels;
use std::collections::{BTreeSet, VecDeque};

/// Findings of a page check
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageReport {
    pub lists: usize,
    pub commands: usize,
    /// Label names in the order they are found
    pub labels: Vec<String>,
    /// Registered lists no command branches into
    pub unreachable_lists: Vec<BranchId>,
    /// Branch ids referenced by commands but not registered
    pub missing_branches: Vec<BranchId>,
    /// Go-to-label targets that do not resolve
    pub unresolved_gotos: Vec<String>,
    /// Command kinds this build does not execute
    pub unsupported: usize,
}

impl PageReport {
    /// Errors make a page fail the check; missing branches are allowed
    pub fn has_errors(&self) -> bool {
        !self.unresolved_gotos.is_empty() || self.unsupported > 0
    }
}

/// Walk every list reachable from the root and collect findings
pub fn analyze(page: &Page) -> PageReport {
    let mut report = PageReport {
        lists: page.list_count(),
        ..PageReport::default()
    };

    let mut reached = BTreeSet::new();
    let mut missing = BTreeSet::new();
    let mut queue = VecDeque::from([page.root()]);
    reached.insert(page.root());

    while let Some(list) = queue.pop_front() {
        let Some(commands) = page.list(list) else {
            continue;
        };
        for command in commands {
            report.commands += 1;
            match command {
                Command::Label { label } => report.labels.push(label.clone()),
                Command::GoToLabel { label } => {
                    if labels::find_label(page, label).is_none()
                        && !report.unresolved_gotos.contains(label)
                    {
                        report.unresolved_gotos.push(label.clone());
                    }
                }
                Command::Unsupported => report.unsupported += 1,
                _ => {}
            }
            for branch in command.branch_ids().unwrap_or_default() {
                if !page.contains_list(*branch) {
                    missing.insert(*branch);
                } else if reached.insert(*branch) {
                    queue.push_back(*branch);
                }
            }
        }
    }

    let mut unreachable: Vec<BranchId> = page
        .lists()
        .map(|(id, _)| *id)
        .filter(|id| !reached.contains(id))
        .collect();
    unreachable.sort();
    report.unreachable_lists = unreachable;
    report.missing_branches = missing.into_iter().filter(|id| !id.is_nil()).collect();
    report
}

/// Print the report for `page`; returns whether the page passed
pub fn run_check(page: &Page) -> anyhow::Result<bool> {
    let report = analyze(page);

    println!("Page: {} ({})", page.name(), page.id());
    println!("  lists:    {}", report.lists);
    println!("  commands: {}", report.commands);
    if report.labels.is_empty() {
        println!("  labels:   none");
    } else {
        println!("  labels:   {}", report.labels.join(", "));
    }
    for list in &report.unreachable_lists {
        println!("  warning: list {list} is unreachable");
    }
    for branch in &report.missing_branches {
        println!("  note: branch {branch} is not registered and will be skipped");
    }
    for label in &report.unresolved_gotos {
        println!("  error: go to label '{label}' does not resolve");
    }
    if report.unsupported > 0 {
        println!("  error: {} unsupported commands", report.unsupported);
    }

    let passed = !report.has_errors();
    println!();
    println!("{}", if passed { "OK" } else { "FAILED" });
    Ok(passed)
}
