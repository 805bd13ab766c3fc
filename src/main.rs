//! CLI entry point for storyplay
//!
//! Plays a story file in the terminal or checks it for authoring problems.

use std::path::PathBuf;
use std::process;
use storyplay::config::EngineConfig;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = &args[1];

    match command.as_str() {
        "play" => {
            let Some(file_path) = args.get(2).map(PathBuf::from) else {
                eprintln!("Error: Missing story file path");
                eprintln!();
                print_usage();
                process::exit(1);
            };
            let options = parse_play_options(&args[3..]).unwrap_or_else(|message| {
                eprintln!("Error: {message}");
                eprintln!();
                print_usage();
                process::exit(1);
            });
            run_play(file_path, options).await;
        }
        "check" => {
            let Some(file_path) = args.get(2).map(PathBuf::from) else {
                eprintln!("Error: Missing story file path");
                eprintln!();
                print_usage();
                process::exit(1);
            };
            run_check(file_path).await;
        }
        "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Error: Unknown command '{}'", command);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    }
}

struct PlayOptions {
    config: Option<PathBuf>,
    debug: bool,
}

fn parse_play_options(args: &[String]) -> Result<PlayOptions, String> {
    let mut options = PlayOptions {
        config: None,
        debug: false,
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--debug" => options.debug = true,
            "--config" => {
                let path = iter.next().ok_or("--config needs a file path")?;
                options.config = Some(PathBuf::from(path));
            }
            other => return Err(format!("Unknown option '{other}'")),
        }
    }
    Ok(options)
}

fn print_usage() {
    println!("storyplay - Branching Story Playback Engine");
    println!();
    println!("USAGE:");
    println!("    storyplay play <story.json> [--config <config.json>] [--debug]");
    println!("    storyplay check <story.json>");
    println!();
    println!("COMMANDS:");
    println!("    play <file>     Play a story in the terminal");
    println!("    check <file>    Report problems in a story's ending rules");
    println!("    --help, -h      Show this help message");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>    Engine configuration (JSON)");
    println!("    --debug            Show node id, gauges and tags after every step");
    println!();
    println!("EXAMPLES:");
    println!("    storyplay play stories/lighthouse.json");
    println!("    storyplay check stories/lighthouse.json");
}

async fn run_play(file_path: PathBuf, options: PlayOptions) {
    let config = match &options.config {
        Some(path) => match EngineConfig::from_file(path).await {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Error: Failed to load config '{}'", path.display());
                eprintln!("Reason: {}", err);
                process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    if let Err(err) = storyplay::cli::play::run_play(&file_path, config, options.debug).await {
        eprintln!("Error: Player mode failed");
        eprintln!("Reason: {:#}", err);
        process::exit(1);
    }
}

async fn run_check(file_path: PathBuf) {
    match storyplay::cli::check::run_check(&file_path).await {
        Ok(result) if result.has_errors() => process::exit(1),
        Ok(_) => {}
        Err(err) => {
            eprintln!("Error: Failed to check '{}'", file_path.display());
            eprintln!("Reason: {:#}", err);
            process::exit(1);
        }
    }
}
