//! CLI entry point for eventweave
//!
//! Runs compiled event pages interactively and checks them for problems.

use eventweave::config::EngineConfig;
use eventweave::infrastructure::descriptors::{DescriptorSet, InMemoryDescriptors};
use eventweave::infrastructure::repositories::load_page_file;
use eventweave::runtime::debug::DebugLogger;
use std::path::PathBuf;
use std::process;

struct PlayArgs {
    page: PathBuf,
    descriptors: Option<PathBuf>,
    config: Option<PathBuf>,
    debug: bool,
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = &args[1];

    let result = match command.as_str() {
        "play" => match parse_play_args(&args[2..]) {
            Ok(play) => run_play(play),
            Err(message) => {
                eprintln!("Error: {message}");
                eprintln!();
                print_usage();
                process::exit(1);
            }
        },
        "check" => {
            let Some(path) = args.get(2) else {
                eprintln!("Error: Missing page file path");
                eprintln!();
                print_usage();
                process::exit(1);
            };
            run_check(PathBuf::from(path))
        }
        "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        _ => {
            eprintln!("Error: Unknown command '{command}'");
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    if let Err(err) = result {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("eventweave - Event script runtime");
    println!();
    println!("USAGE:");
    println!("    eventweave play <page.json> [--descriptors <file>] [--config <file>] [--debug]");
    println!("    eventweave check <page.json>");
    println!();
    println!("COMMANDS:");
    println!("    play <file>     Run a page interactively for one player");
    println!("    check <file>    Report labels, unreachable lists and broken jumps");
    println!("    --help, -h      Show this help message");
    println!();
    println!("OPTIONS:");
    println!("    --descriptors <file>    Descriptor tables (items, quests, variables, ...)");
    println!("    --config <file>         Engine configuration");
    println!("    --debug                 Show instance state and debug logs");
    println!();
    println!("ENVIRONMENT:");
    println!("    EVENTWEAVE_DEBUG               Enable debug logging");
    println!("    EVENTWEAVE_COMMANDS_PER_TICK   Commands per instance per tick");
}

fn parse_play_args(args: &[String]) -> Result<PlayArgs, String> {
    let mut page = None;
    let mut descriptors = None;
    let mut config = None;
    let mut debug = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--descriptors" => {
                let path = iter.next().ok_or("--descriptors needs a file")?;
                descriptors = Some(PathBuf::from(path));
            }
            "--config" => {
                let path = iter.next().ok_or("--config needs a file")?;
                config = Some(PathBuf::from(path));
            }
            "--debug" => debug = true,
            other if other.starts_with("--") => return Err(format!("Unknown option '{other}'")),
            other => {
                if page.replace(PathBuf::from(other)).is_some() {
                    return Err("Only one page file can be played".to_string());
                }
            }
        }
    }

    Ok(PlayArgs {
        page: page.ok_or("Missing page file path")?,
        descriptors,
        config,
        debug,
    })
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

fn run_play(args: PlayArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => {
            let mut config = EngineConfig::default();
            config.apply_env()?;
            config
        }
    };
    if args.debug {
        config.debug.enabled = true;
        config.debug = config.debug.all_categories();
    }
    DebugLogger::init(config.debug.clone())?;

    let runtime = runtime()?;
    let (page, descriptors) = runtime.block_on(async {
        let page = load_page_file(&args.page).await?;
        let descriptors = match &args.descriptors {
            Some(path) => InMemoryDescriptors::from(DescriptorSet::load(path).await?),
            None => InMemoryDescriptors::new(),
        };
        anyhow::Ok((page, descriptors))
    })?;

    eventweave::cli::play::run_play(page, descriptors, config, args.debug)
}

fn run_check(path: PathBuf) -> anyhow::Result<()> {
    let page = runtime()?.block_on(load_page_file(&path))?;
    if !eventweave::cli::check::run_check(&page)? {
        process::exit(2);
    }
    Ok(())
}
