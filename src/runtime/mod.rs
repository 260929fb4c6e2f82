//! Event interpreter
//!
//! [`step`] executes exactly one command of one event instance against the
//! [`World`]. Instances hold no locks between steps: the running player is
//! locked for the duration of one command and released before `step`
//! returns. Suspended instances are only moved on by [`respond`],
//! [`release_on_signal`] or, for timers, the clock.

pub mod conditions;
pub mod debug;
pub mod handlers;
pub mod labels;
pub mod persistence;
pub mod template;
pub mod variables;
pub mod world;

#[cfg(test)]
mod tests;

use crate::application::api::{EventResponse, Signal};
use crate::domain::entities::{EventInstance, Prompt, Suspension, SuspensionKind};
use crate::domain::errors::DomainError;
use crate::domain::value_objects::{PlayerId, VariableValue};
use handlers::ExecContext;
use std::sync::Arc;
use thiserror::Error;
use world::World;

/// Errors that end an event instance
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InterpreterError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Player {0} is not loaded")]
    MissingPlayer(PlayerId),
}

/// Result of advancing an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A command ran and more work remains
    Continue,
    /// The command that just ran suspended the instance
    Suspended(SuspensionKind),
    /// Nothing ran because the instance is suspended
    Waiting(SuspensionKind),
    /// The call stack is empty
    Completed,
}

/// Execute the next command of `instance`.
///
/// Exhausted frames are popped before and after the command. A timer whose
/// deadline has passed is released first, so the command following a wait
/// runs in the same call.
pub fn step(world: &mut World, instance: &mut EventInstance) -> Result<StepOutcome, InterpreterError> {
    instance.call_stack_mut().unwind_exhausted()?;

    let now = world.now_ms();
    let Some(frame) = instance.call_stack_mut().top_mut() else {
        return Ok(StepOutcome::Completed);
    };
    if let Suspension::Timer { deadline_ms } = frame.suspension()
        && now >= *deadline_ms
    {
        frame.release();
        log::debug!(target: "eventweave::flow", "timer expired at {now}");
        // A wait may have been the last command of its list
        instance.call_stack_mut().unwind_exhausted()?;
    }
    let Some(frame) = instance.call_stack_mut().top_mut() else {
        return Ok(StepOutcome::Completed);
    };
    if frame.is_suspended() {
        return Ok(StepOutcome::Waiting(frame.suspension().kind()));
    }

    let page = Arc::clone(frame.page());
    let list = frame.list_id();
    let index = frame.index();
    frame.advance();

    let commands = page.list(list).ok_or(DomainError::MissingCommandList {
        page: page.id(),
        list,
    })?;
    let command = commands.get(index).ok_or(DomainError::FrameIndexOutOfRange {
        list,
        index,
        len: commands.len(),
    })?;

    let handle = world
        .player(instance.player())
        .ok_or(InterpreterError::MissingPlayer(instance.player()))?;
    {
        let mut player = handle.lock()?;
        let mut ctx = ExecContext::new(world, instance, &mut player, Arc::clone(&page));
        handlers::execute(&mut ctx, command)?;
    }

    let suspended = instance.suspension();
    if suspended != SuspensionKind::None {
        return Ok(StepOutcome::Suspended(suspended));
    }
    instance.call_stack_mut().unwind_exhausted()?;
    if instance.call_stack().is_empty() {
        Ok(StepOutcome::Completed)
    } else {
        Ok(StepOutcome::Continue)
    }
}

/// Run up to `budget` commands, stopping early on suspension or completion
pub fn tick(
    world: &mut World,
    instance: &mut EventInstance,
    budget: usize,
) -> Result<StepOutcome, InterpreterError> {
    let mut outcome = StepOutcome::Completed;
    for _ in 0..budget.max(1) {
        outcome = step(world, instance)?;
        if outcome != StepOutcome::Continue {
            break;
        }
    }
    Ok(outcome)
}

/// Deliver a client response to a suspended instance.
///
/// Returns `false`, leaving the instance untouched, when the response does
/// not answer what the instance is waiting for.
pub fn respond(
    world: &mut World,
    instance: &mut EventInstance,
    response: &EventResponse,
) -> Result<bool, InterpreterError> {
    let Some(frame) = instance.call_stack().top() else {
        return Ok(false);
    };
    let page = Arc::clone(frame.page());
    let suspension = frame.suspension().clone();

    let accepted = matches!(
        (&suspension, response),
        (Suspension::Dialogue(Prompt::Text), EventResponse::Continue)
            | (Suspension::Dialogue(Prompt::Input { .. }), EventResponse::Input(_) | EventResponse::Cancel)
            | (Suspension::Picture, EventResponse::PictureClosed)
            | (Suspension::QuestOffer { .. }, EventResponse::QuestOffer { .. })
    ) || matches!(
        (&suspension, response),
        (Suspension::Dialogue(Prompt::Options { branch_ids }), EventResponse::Option(choice))
            if *choice < branch_ids.len()
    );
    if !accepted {
        log::debug!(
            target: "eventweave::flow",
            "instance {} ignored {:?} while waiting on {:?}",
            instance.id(),
            response,
            suspension.kind()
        );
        return Ok(false);
    }

    if let Some(frame) = instance.call_stack_mut().top_mut() {
        frame.release();
    }

    let handle = world
        .player(instance.player())
        .ok_or(InterpreterError::MissingPlayer(instance.player()))?;
    let mut player = handle.lock()?;
    let mut ctx = ExecContext::new(world, instance, &mut player, page);

    match (suspension, response) {
        (Suspension::Dialogue(Prompt::Options { branch_ids }), EventResponse::Option(choice)) => {
            ctx.push_branch(&branch_ids, *choice);
        }
        (Suspension::Dialogue(Prompt::Input { variable, branch_ids }), EventResponse::Input(text)) => {
            let parsed = ctx
                .world
                .descriptors()
                .variable(variable)
                .and_then(|descriptor| VariableValue::parse(descriptor.data_type, text));
            match parsed {
                Some(value) => {
                    variables::set_value(ctx.world, ctx.player, variable, value);
                    ctx.push_branch(&branch_ids, 0);
                }
                None => {
                    ctx.push_branch(&branch_ids, 1);
                }
            }
        }
        (Suspension::Dialogue(Prompt::Input { branch_ids, .. }), EventResponse::Cancel) => {
            ctx.push_branch(&branch_ids, 1);
        }
        (Suspension::QuestOffer { quest, branch_ids }, EventResponse::QuestOffer { accepted }) => {
            let started = *accepted && handlers::quests::start_quest(&mut ctx, quest);
            ctx.branch_on(started, &branch_ids);
        }
        _ => {}
    }
    Ok(true)
}

/// Release the instance if it waits on what `signal` reports
pub fn release_on_signal(instance: &mut EventInstance, signal: &Signal) -> bool {
    let Some(frame) = instance.call_stack_mut().top_mut() else {
        return false;
    };
    let matches = match (frame.suspension(), signal) {
        (Suspension::Route(watched), Signal::RouteCompleted(target)) => watched == target,
        (Suspension::Session(waiting), Signal::SessionClosed(closed)) => waiting == closed,
        (Suspension::Fade, Signal::FadeCompleted) => true,
        _ => false,
    };
    if matches {
        frame.release();
        log::debug!(target: "eventweave::flow", "{signal:?} released instance {}", instance.id());
    }
    matches
}
