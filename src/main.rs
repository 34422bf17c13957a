// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{info, Level};
use vse::{Engine, EngineConfig, ListenerHandle, ListenerId, LogListener, SongFile, TokioClock};

const CHANNEL: &str = "console";
const LISTENER: &str = "console";

fn print_usage() {
    println!("VSE - Tick-driven song playback engine");
    println!();
    println!("Usage: vse [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --play <SONG.yaml>      Play a song to a logging listener");
    println!("      --loop              Loop the song");
    println!("      --ticks <N>         Stop after N ticks (required to end a looping song)");
    println!("      --config <FILE>     Engine settings (TOML)");
    println!("      --verbose           Log engine lifecycle events");
    println!("  --check <SONG.yaml>     Validate a song file and print a summary");
    println!("  --help                  Show this help message");
}

struct PlayOptions {
    song: String,
    looping: bool,
    ticks: Option<u64>,
    config: Option<String>,
    verbose: bool,
}

fn parse_play_options(args: &[String]) -> Result<PlayOptions> {
    let song = args
        .first()
        .ok_or_else(|| anyhow!("--play requires a song file"))?
        .clone();
    let mut options = PlayOptions {
        song,
        looping: false,
        ticks: None,
        config: None,
        verbose: false,
    };

    let mut rest = args[1..].iter();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--loop" => options.looping = true,
            "--verbose" | "-v" => options.verbose = true,
            "--ticks" => {
                let value = rest
                    .next()
                    .ok_or_else(|| anyhow!("--ticks requires a number"))?;
                options.ticks = Some(
                    value
                        .parse()
                        .map_err(|_| anyhow!("Invalid tick count: {}", value))?,
                );
            }
            "--config" => {
                let value = rest
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file"))?;
                options.config = Some(value.clone());
            }
            other => return Err(anyhow!("Unknown play option: {}", other)),
        }
    }

    if options.looping && options.ticks.is_none() {
        return Err(anyhow!("--loop requires --ticks"));
    }
    Ok(options)
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();
}

fn check_song(path: &str) -> Result<()> {
    let song = SongFile::load(path)?.to_song()?;
    let sustained = song.notes().iter().filter(|n| n.is_sustained()).count();

    println!("Title:      {}", song.title());
    println!("Tempo:      {}", song.tempo());
    println!("Notes:      {} ({} sustained)", song.len(), sustained);
    println!("Length:     {} ticks", song.max_end_tick() + 1);
    Ok(())
}

fn play_song(options: PlayOptions) -> Result<()> {
    let config = match &options.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let song = SongFile::load(&options.song)?.to_song()?;
    let rate = config.rate();

    // Non-looping songs end on their own one tick past their last note
    let limit = options
        .ticks
        .unwrap_or(config.start_delay_ticks.saturating_add(song.max_end_tick() as u64 + 1));

    let run_time = rate
        .ticks_to_duration(limit)
        .ok_or_else(|| anyhow!("Tick limit too large: {}", limit))?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime.block_on(async move {
        let clock = TokioClock::current(rate)?;
        let mut engine = Engine::new(config, clock)?;

        let listener: ListenerHandle = Arc::new(LogListener::new(LISTENER));
        engine.add_listener(CHANNEL, listener);

        info!(
            title = song.title(),
            notes = song.len(),
            ticks_per_second = rate.ticks_per_second(),
            "starting playback"
        );
        let id = engine.play_song(CHANNEL, song, options.looping, None);

        let deadline = tokio::time::Instant::now()
            .checked_add(run_time)
            .ok_or_else(|| anyhow!("Tick limit too large: {}", limit))?;
        loop {
            tokio::time::sleep(rate.interval()).await;
            let running = engine
                .with_channel(CHANNEL, |ch| ch.active_song(&id).is_some())
                .unwrap_or(false);
            if !running {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                engine.stop_song(CHANNEL, &id);
                // Let the next tick flush the stop events
                tokio::time::sleep(rate.interval() + Duration::from_millis(5)).await;
                break;
            }
        }

        engine.remove_listener_from_all_channels(&ListenerId::new(LISTENER));
        engine.shutdown();
        info!("playback complete");
        Ok::<_, anyhow::Error>(())
    })
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("VSE - Tick-driven song playback engine");
        println!("Run with --help for usage information");
        return Ok(());
    }

    match args[1].as_str() {
        "--play" => {
            let options = parse_play_options(&args[2..])?;
            init_logging(options.verbose);
            play_song(options)?;
        }
        "--check" => {
            if args.len() < 3 {
                eprintln!("Error: --check requires a song file");
                std::process::exit(1);
            }
            check_song(&args[2])?;
        }
        "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Unknown option: {}", args[1]);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
