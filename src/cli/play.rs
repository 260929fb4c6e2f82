//! Interactive player mode for running a page
//!
//! Runs one page for a synthetic player in the terminal. Notifications are
//! printed as they are sent; dialogue, options, input prompts, pictures and
//! quest offers are answered from stdin. Timers, routes and fades complete
//! on their own.

use crate::application::api::{EventResponse, Notification, RecordingSink, Signal};
use crate::application::scheduler::EventScheduler;
use crate::config::EngineConfig;
use crate::domain::entities::{EventInstance, Page, Prompt, Suspension};
use crate::domain::player::{Player, UserAccount};
use crate::domain::value_objects::*;
use crate::infrastructure::descriptors::InMemoryDescriptors;
use crate::runtime::world::{ManualClock, World};
use std::io::{self, Write};
use std::sync::Arc;

/// Ticks without progress before the player is told nothing is happening
const IDLE_TICKS: usize = 3;

/// Run the player mode
pub fn run_play(
    page: Page,
    descriptors: InMemoryDescriptors,
    config: EngineConfig,
    debug: bool,
) -> anyhow::Result<()> {
    let sink = Arc::new(RecordingSink::new());
    let clock = Arc::new(ManualClock::new(chrono::Local::now().naive_local()));
    let player_config = config.player.clone();
    let world = World::new(config, Arc::new(descriptors), sink.clone()).with_clock(clock.clone());
    let mut scheduler = EventScheduler::new(world);

    let user = UserAccount::new("player");
    let player = Player::new(
        "Player",
        user.id,
        player_config.inventory_slots,
        player_config.spellbook_size,
    );
    let player_id = player.id;
    scheduler.world_mut().add_user(user);
    scheduler.world_mut().add_player(player);
    scheduler.world_mut().set_online(player_id, true);

    println!("=== eventweave player: {} ===", page.name());
    println!();
    println!("Controls:");
    println!("  Enter: continue");
    println!("  1-9:   select option");
    println!("  q:     quit");
    println!();

    scheduler.start_event(player_id, EventId::new(), Arc::new(page))?;

    let mut idle = 0;
    loop {
        let report = scheduler.tick();
        for (_, notification) in sink.drain() {
            show_notification(&notification);
        }
        if debug {
            display_debug_info(&scheduler, player_id, report.failed);
        }

        let Some(instance) = scheduler.instances(player_id).first() else {
            println!();
            println!("(event finished)");
            return Ok(());
        };
        if !instance.is_running() {
            println!("(player released)");
            scheduler.release_player(player_id);
            continue;
        }
        let instance_id = instance.id();
        let suspension = current_suspension(instance);

        let response = match suspension {
            Suspension::None => {
                idle = if report.advanced == 0 { idle + 1 } else { 0 };
                if idle >= IDLE_TICKS {
                    anyhow::bail!("event is not making progress");
                }
                continue;
            }
            Suspension::Dialogue(Prompt::Text) => {
                if !wait_input()? {
                    return quit();
                }
                EventResponse::Continue
            }
            Suspension::Dialogue(Prompt::Options { branch_ids }) => {
                match select_option(branch_ids.len())? {
                    Some(choice) => EventResponse::Option(choice),
                    None => return quit(),
                }
            }
            Suspension::Dialogue(Prompt::Input { .. }) => {
                let input = get_input("Value (empty to cancel):")?;
                if input == "q" {
                    return quit();
                }
                if input.is_empty() {
                    EventResponse::Cancel
                } else {
                    EventResponse::Input(input)
                }
            }
            Suspension::Picture => {
                println!("(picture shown, press Enter to close)");
                if !wait_input()? {
                    return quit();
                }
                EventResponse::PictureClosed
            }
            Suspension::QuestOffer { .. } => {
                let input = get_input("Accept quest? (y/n):")?;
                if input == "q" {
                    return quit();
                }
                EventResponse::QuestOffer {
                    accepted: input.eq_ignore_ascii_case("y"),
                }
            }
            Suspension::Timer { deadline_ms } => {
                let now = scheduler.world().now_ms();
                println!("(waiting {} ms)", deadline_ms.saturating_sub(now));
                clock.set(deadline_ms.max(now));
                continue;
            }
            Suspension::Route(target) => {
                println!("(route completed)");
                scheduler.signal(player_id, Signal::RouteCompleted(target))?;
                continue;
            }
            Suspension::Session(kind) => {
                println!("({kind:?} open, press Enter to close)");
                if !wait_input()? {
                    return quit();
                }
                scheduler.signal(player_id, Signal::SessionClosed(kind))?;
                continue;
            }
            Suspension::Fade => {
                scheduler.signal(player_id, Signal::FadeCompleted)?;
                continue;
            }
        };
        idle = 0;
        if !scheduler.respond(player_id, instance_id, &response)? {
            println!("[response not accepted]");
        }
    }
}

fn current_suspension(instance: &EventInstance) -> Suspension {
    instance
        .call_stack()
        .top()
        .map(|frame| frame.suspension().clone())
        .unwrap_or_default()
}

fn quit() -> anyhow::Result<()> {
    println!("Goodbye!");
    Ok(())
}

fn show_notification(notification: &Notification) {
    match notification {
        Notification::ShowText { text, .. } => {
            println!();
            println!("{text}");
        }
        Notification::ShowOptions { text, options, .. } => {
            println!();
            println!("{text}");
            for (i, option) in options.iter().enumerate() {
                if !option.is_empty() {
                    println!("  {}. {option}", i + 1);
                }
            }
        }
        Notification::InputVariable { title, text, .. } => {
            println!();
            println!("[{title}] {text}");
        }
        Notification::ChatMessage { text, kind, .. } => println!("<{kind:?}> {text}"),
        Notification::ChatBubble { text, .. } => println!("(\"{text}\")"),
        Notification::PlayMusic { file } => println!("[BGM] {file}"),
        Notification::PlaySound { file } => println!("[SE] {file}"),
        Notification::ShowPicture { file, .. } => println!("[PICTURE] {file}"),
        Notification::Warp { x, y, map, .. } => println!("[WARP] {map} ({x}, {y})"),
        other => println!("[{other:?}]"),
    }
}

fn display_debug_info(scheduler: &EventScheduler, player: PlayerId, failed: usize) {
    println!("--- debug ---");
    let now = scheduler.world().now_ms();
    for instance in scheduler.instances(player) {
        println!(
            "instance {} depth {} waiting {:?}",
            instance.id(),
            instance.call_stack().len(),
            instance.suspension()
        );
        if let Some(deadline) = instance.wait_deadline() {
            println!("  wakes in {} ms", deadline.saturating_sub(now));
        }
    }
    if failed > 0 {
        println!("failed instances: {failed}");
    }
    if let Some(handle) = scheduler.world().player(player)
        && let Ok(player) = handle.lock()
    {
        for (id, value) in &player.variables {
            println!("  pv {id} = {value}");
        }
    }
    for (id, value) in scheduler.world().server_variables() {
        println!("  sv {id} = {value}");
    }
    println!("-------------");
}

/// Ask for a 1-based option number; `None` when the user quits
fn select_option(count: usize) -> io::Result<Option<usize>> {
    loop {
        let input = get_input(&format!("Select (1-{count}):"))?;
        if input == "q" {
            return Ok(None);
        }
        match input.parse::<usize>() {
            Ok(choice) if (1..=count).contains(&choice) => return Ok(Some(choice - 1)),
            _ => println!("[Invalid choice]"),
        }
    }
}

/// Wait for Enter; false when the user typed `q`
fn wait_input() -> io::Result<bool> {
    Ok(get_input("")? != "q")
}

fn get_input(prompt: &str) -> io::Result<String> {
    if !prompt.is_empty() {
        print!("{prompt} ");
    }
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
