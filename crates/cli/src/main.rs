mod persistence;
mod view;

use anyhow::Context;
use packrip_core::{
    KeyValueStore, MemoryStore, PackGame, RngState, SessionError, SessionPhase, TimerRequest,
    TimerTicket,
};
use packrip_data::{builtin_catalog, builtin_game_config, load_catalog, load_game_config};
use persistence::{default_save_dir, FileStore};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type Game = PackGame<Box<dyn KeyValueStore>>;

#[derive(Debug, Clone, Default)]
struct CliOptions {
    seed: Option<u64>,
    assets: Option<PathBuf>,
    save_dir: Option<PathBuf>,
    no_save: bool,
}

fn parse_cli_options(args: &[String]) -> CliOptions {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--seed" => {
                if let Some(value) = args.get(idx + 1) {
                    options.seed = value.parse::<u64>().ok();
                    idx += 1;
                }
            }
            "--assets" => {
                if let Some(value) = args.get(idx + 1) {
                    options.assets = Some(PathBuf::from(value));
                    idx += 1;
                }
            }
            "--save" => {
                if let Some(value) = args.get(idx + 1) {
                    options.save_dir = Some(PathBuf::from(value));
                    idx += 1;
                }
            }
            "--no-save" => options.no_save = true,
            _ => {}
        }
        idx += 1;
    }
    options
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("PACKRIP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Pending timers keyed by wall-clock deadline.
#[derive(Debug, Default)]
struct TimerQueue {
    pending: Vec<(Instant, TimerTicket)>,
}

impl TimerQueue {
    fn schedule(&mut self, requests: Vec<TimerRequest>) {
        let now = Instant::now();
        for request in requests {
            self.pending.push((now + request.delay, request.ticket));
        }
        self.pending.sort_by_key(|(deadline, _)| *deadline);
    }

    fn take_due(&mut self, now: Instant) -> Vec<TimerTicket> {
        let split = self
            .pending
            .iter()
            .position(|(deadline, _)| *deadline > now)
            .unwrap_or(self.pending.len());
        self.pending
            .drain(..split)
            .map(|(_, ticket)| ticket)
            .collect()
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.pending.first().map(|(deadline, _)| *deadline)
    }
}

fn open_store(options: &CliOptions) -> Box<dyn KeyValueStore> {
    if options.no_save {
        return Box::new(MemoryStore::new());
    }
    match options.save_dir.clone().or_else(default_save_dir) {
        Some(dir) => {
            info!(dir = %dir.display(), "saving progress");
            Box::new(FileStore::new(dir))
        }
        None => {
            eprintln!("packrip: no save directory (set PACKRIP_SAVE or HOME); progress is not kept");
            Box::new(MemoryStore::new())
        }
    }
}

fn build_game(options: &CliOptions) -> anyhow::Result<Game> {
    let (catalog, config) = match &options.assets {
        Some(dir) => (
            load_catalog(dir).with_context(|| format!("load catalog from {}", dir.display()))?,
            load_game_config(dir)
                .with_context(|| format!("load config from {}", dir.display()))?,
        ),
        None => (builtin_catalog()?, builtin_game_config()?),
    };
    let rng = match options.seed {
        Some(seed) => RngState::from_seed(seed),
        None => RngState::from_entropy(),
    };
    debug!(seed = rng.seed(), "random source ready");
    Ok(PackGame::load(catalog, config, open_store(options), rng))
}

fn fire_due(game: &mut Game, timers: &mut TimerQueue, now: Instant) {
    for ticket in timers.take_due(now) {
        if let Err(err) = game.fire_timer(ticket) {
            debug!(?ticket, %err, "timer rejected");
        }
    }
    flush(game, timers);
}

/// Waits out the opening animation so a reveal typed early still lands.
fn finish_opening(game: &mut Game, timers: &mut TimerQueue) {
    while game.session().phase() == SessionPhase::Opening {
        let Some(deadline) = timers.next_deadline() else {
            return;
        };
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        fire_due(game, timers, Instant::now());
    }
}

fn flush(game: &mut Game, timers: &mut TimerQueue) {
    timers.schedule(game.take_timers());
    let events = game.drain_events();
    view::print_events(game, &events);
}

fn report(result: Result<(), SessionError>) {
    if let Err(err) = result {
        println!("error: {err}");
    }
}

fn read_next_command(input: &mut impl BufRead) -> io::Result<Option<String>> {
    print!("> ");
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

fn run() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_cli_options(&args);
    init_logging();
    let mut game = build_game(&options)?;
    let mut timers = TimerQueue::default();

    println!("packrip: open packs, collect players");
    view::print_status(&game);
    view::print_help();

    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        fire_due(&mut game, &mut timers, Instant::now());
        let Some(line) = read_next_command(&mut input).context("read command")? else {
            break;
        };
        fire_due(&mut game, &mut timers, Instant::now());
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap_or("");
        let args: Vec<&str> = parts.collect();
        match cmd {
            "help" | "h" | "?" => view::print_help(),
            "quit" | "exit" | "q" => break,
            "packs" | "p" => view::print_packs(&game),
            "status" | "s" => view::print_status(&game),
            "collection" | "c" => view::print_collection(&game),
            "stats" => view::print_stats(&game.stats()),
            "open" | "o" => {
                let Some(pack_id) = args.first() else {
                    println!("usage: open <pack>");
                    continue;
                };
                if game.session().phase() == SessionPhase::Summarized {
                    report(game.reset_session());
                }
                report(game.open_pack(pack_id));
            }
            "next" | "n" => {
                finish_opening(&mut game, &mut timers);
                report(game.reveal_next());
            }
            "all" | "a" => {
                finish_opening(&mut game, &mut timers);
                report(game.reveal_all());
            }
            "done" | "complete" => {
                finish_opening(&mut game, &mut timers);
                report(game.complete_pack());
            }
            "reset" => report(game.reset_session()),
            _ => println!("unknown command '{cmd}' (try help)"),
        }
        flush(&mut game, &mut timers);
        view::print_prompt_hint(game.session().phase());
    }
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("packrip: {err:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packrip_core::TimerKind;
    use std::time::Duration;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    fn ticket(generation: u64, kind: TimerKind) -> TimerTicket {
        TimerTicket { generation, kind }
    }

    #[test]
    fn parses_flags() {
        let options = parse_cli_options(&args(&[
            "--seed", "42", "--assets", "assets", "--save", "/tmp/pr", "--no-save",
        ]));
        assert_eq!(options.seed, Some(42));
        assert_eq!(options.assets, Some(PathBuf::from("assets")));
        assert_eq!(options.save_dir, Some(PathBuf::from("/tmp/pr")));
        assert!(options.no_save);
    }

    #[test]
    fn bad_seed_and_unknown_flags_are_ignored() {
        let options = parse_cli_options(&args(&["--seed", "abc", "--loud"]));
        assert_eq!(options.seed, None);
        assert!(!options.no_save);
        assert!(options.assets.is_none());
    }

    #[test]
    fn timer_queue_releases_only_due_tickets() {
        let mut queue = TimerQueue::default();
        queue.schedule(vec![
            TimerRequest {
                ticket: ticket(1, TimerKind::Celebrate),
                delay: Duration::from_secs(60),
            },
            TimerRequest {
                ticket: ticket(1, TimerKind::StopAnimation),
                delay: Duration::ZERO,
            },
        ]);
        let due = queue.take_due(Instant::now());
        assert_eq!(due, vec![ticket(1, TimerKind::StopAnimation)]);
        assert!(queue.next_deadline().is_some());
        assert!(queue.take_due(Instant::now()).is_empty());
    }

    #[test]
    fn seeded_game_opens_and_finishes_a_pack() {
        let options = CliOptions {
            seed: Some(7),
            no_save: true,
            ..CliOptions::default()
        };
        let mut game = build_game(&options).expect("game");
        let mut timers = TimerQueue::default();
        let coins = game.ledger().coins();

        game.open_pack("bronze").expect("open");
        flush(&mut game, &mut timers);
        assert_eq!(game.session().phase(), SessionPhase::Opening);
        assert!(matches!(game.reveal_next(), Err(SessionError::StillOpening)));

        let deadline = timers.next_deadline().expect("animation timer");
        fire_due(&mut game, &mut timers, deadline);
        assert_eq!(game.session().phase(), SessionPhase::Revealing);

        game.reveal_all().expect("reveal");
        game.complete_pack().expect("complete");
        flush(&mut game, &mut timers);
        assert_eq!(game.session().phase(), SessionPhase::Summarized);
        assert!(game.ledger().coins() >= coins - 100);
        assert!(game.ledger().unlocked_count() >= 1);
    }
}
