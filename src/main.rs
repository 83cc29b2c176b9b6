use std::env;

use anyhow::{Context, Result, bail};
use endgame_client::{
    GameClient, Notice, Pending,
    config::ClientConfig,
    position::{Algorithm, PlayerMove},
    remote,
    session::{GameSession, turn_side},
    util::{parse_promotion_role, parse_square},
};
use futures::{StreamExt, stream::FuturesUnordered};
use log::{LevelFilter, error, info, warn};
use shakmaty::{File, Rank, Square};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
commands:
  load <file>        upload a position file (three squares: white king, white pawn, black king)
  random             let the engine set up a random position
  click <square>     select a piece, or move the selected piece there
  move <uci>         submit a move directly, e.g. a1b1
  promote <q|r|b|n>  finish a pending promotion
  cancel             cancel a pending promotion
  engine [algo]      let the engine move (mabp, iterative_deepening, pvs, mcts)
  algo <algo>        choose the engine's algorithm
  history            list the recorded positions
  replay <n>         look at history entry n
  commit <n>         continue the game from the viewed history entry n
  close              stop looking at history
  show               print the board
  reset              start over
  quit";

enum Flow {
    Continue(Option<Pending>),
    Quit,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logger()?;

    let config = ClientConfig::from_env(&env::current_dir()?)?;
    let remote = remote::init_remote(&config.api_base, config.timeout);
    if let Err(e) = remote.health().await {
        warn!("engine at {} not reachable yet: {e}", config.api_base);
    }

    let auto_reset = config.auto_reset;
    let mut client = GameClient::new(remote, config.human_side, config.timeout).with_confirm(
        move |prompt: &str| {
            info!(
                "{prompt} {}",
                if auto_reset {
                    "yes"
                } else {
                    "(type `reset` to start over)"
                }
            );
            auto_reset
        },
    );
    if let Some(algorithm) = config.algorithm {
        client.choose_algorithm(algorithm);
    }

    info!(
        "You play {}. Type `help` for commands.",
        config.human_side.to_string().to_uppercase()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending: FuturesUnordered<Pending> = FuturesUnordered::new();

    // event loop: operator input and finished requests, one at a time
    loop {
        tokio::select! {
            Some(completion) = pending.next(), if !pending.is_empty() => {
                match client.complete(completion) {
                    Ok(Notice::Stale) => {}
                    Ok(notice) => {
                        report(&notice);
                        print_board(client.session());
                    }
                    Err(e) => error!("{e}"),
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match run_command(&mut client, line.trim()).await {
                    Ok(Flow::Continue(Some(request))) => pending.push(request),
                    Ok(Flow::Continue(None)) => {}
                    Ok(Flow::Quit) => break,
                    Err(e) => error!("{e}"),
                }
            }
        }
    }

    info!("bye");
    Ok(())
}

fn setup_logger() -> Result<()> {
    let level = env::var("ENDGAME_LOG")
        .ok()
        .and_then(|l| l.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {:<5} {}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("reqwest", LevelFilter::Warn)
        .level_for("hyper_util", LevelFilter::Warn)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}

async fn run_command(client: &mut GameClient, line: &str) -> Result<Flow> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(Flow::Continue(None));
    };
    let arg = words.next();

    let request = match command {
        "help" => {
            println!("{HELP}");
            None
        }
        "load" => {
            let path = arg.context("usage: load <file>")?;
            let contents = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {path}"))?;
            Some(client.upload(contents)?)
        }
        "random" => Some(client.randomize()?),
        "click" => {
            let square = parse_square(arg.context("usage: click <square>")?)?;
            let request = client.click(square)?;
            print_board(client.session());
            request
        }
        "move" => {
            let mv: PlayerMove = arg.context("usage: move <uci>")?.parse()?;
            Some(client.submit_move(mv)?)
        }
        "promote" => {
            let role = parse_promotion_role(arg.context("usage: promote <q|r|b|n>")?)?;
            Some(client.complete_promotion(role)?)
        }
        "cancel" => {
            client.cancel_promotion()?;
            None
        }
        "engine" => {
            let algorithm = match arg {
                Some(name) => name.parse::<Algorithm>()?,
                None => match client.session().algorithm() {
                    Some(algorithm) => algorithm,
                    None => bail!("choose an algorithm first: algo <name>"),
                },
            };
            Some(client.request_engine_move(algorithm)?)
        }
        "algo" => {
            let algorithm = arg.context("usage: algo <name>")?.parse::<Algorithm>()?;
            client.choose_algorithm(algorithm);
            None
        }
        "history" => {
            print_history(client.session());
            None
        }
        "replay" => Some(client.replay(history_index(arg)?)?),
        "commit" => {
            client.commit_replay(history_index(arg)?)?;
            print_board(client.session());
            None
        }
        "close" => {
            client.close_replay();
            None
        }
        "show" => {
            print_board(client.session());
            None
        }
        "reset" => {
            client.reset();
            None
        }
        "quit" | "exit" => return Ok(Flow::Quit),
        other => bail!("unknown command '{other}', try `help`"),
    };

    Ok(Flow::Continue(request))
}

/// History entries are numbered from 1 for the operator.
fn history_index(arg: Option<&str>) -> Result<usize> {
    let n: usize = arg
        .context("expected a history entry number")?
        .parse()
        .context("history entries are numbered 1, 2, ...")?;
    if n == 0 {
        bail!("history entries are numbered from 1");
    }
    Ok(n - 1)
}

fn report(notice: &Notice) {
    match notice {
        Notice::PromotionRequired(prefix) => {
            info!("engine promotes with {prefix}: choose with `promote <q|r|b|n>`")
        }
        Notice::GameOver { reset: true, .. } => info!("new game: `load` or `random`"),
        _ => {}
    }
}

fn print_history(session: &GameSession) {
    if session.history().is_empty() {
        println!("no moves recorded yet");
        return;
    }
    for (i, record) in session.history().iter().enumerate() {
        println!(
            "{:>3}. {:<5} to play  {}",
            i + 1,
            record.side_to_move(),
            record
        );
    }
}

fn print_board(session: &GameSession) {
    let (position, title) = match (session.replay(), session.position()) {
        (Some(view), _) => (&view.position, format!("history entry {}", view.index + 1)),
        (None, Some(position)) => (position, "live".to_string()),
        (None, None) => {
            println!("no position loaded: `load <file>` or `random`");
            return;
        }
    };

    println!("  +-----------------+  {title}");
    for rank in Rank::ALL.iter().rev() {
        let mut row = String::new();
        for file in File::ALL {
            let square = Square::from_coords(file, *rank);
            let glyph = match position.pieces().piece_at(square) {
                Some(piece) => piece.char(),
                None if session.replay().is_none() && session.is_legal_destination(square) => '*',
                None => '.',
            };
            if session.replay().is_none() && session.selected() == Some(square) {
                row.push('[');
                row.push(glyph);
                row.push(']');
            } else {
                row.push(' ');
                row.push(glyph);
            }
        }
        println!("{} |{row} |", rank.char());
    }
    println!("  +-----------------+");
    println!("    a b c d e f g h");

    println!(
        "{} to play | moves recorded: {}{}",
        turn_side(position),
        session.history().len(),
        if session.is_busy() { " | thinking..." } else { "" }
    );
    if let Some(mate) = position.mate() {
        match mate.mate_in {
            Some(n) => println!("mate in {n} ({})", mate.status),
            None => println!("{}", mate.status),
        }
    }
    if let Some(analysis) = session.analysis() {
        let mut parts = Vec::new();
        if let Some(eval) = analysis.evaluation {
            parts.push(format!("eval {eval:+}"));
        }
        if let Some(depth) = analysis.depth {
            parts.push(format!("depth {depth}"));
        }
        if let Some(nodes) = analysis.nodes_explored {
            parts.push(format!("{nodes} nodes"));
        }
        if let Some(iterations) = analysis.iterations {
            parts.push(format!("{iterations} iterations"));
        }
        if let Some(time) = analysis.time {
            parts.push(format!("{time:.3}s"));
        }
        if analysis.game_over {
            parts.push(format!(
                "game over: {}",
                analysis.game_over_reason.as_deref().unwrap_or("game over")
            ));
        }
        if !parts.is_empty() {
            println!("analysis: {}", parts.join(", "));
        }
    }
    if let Some(promotion) = session.pending_promotion() {
        println!(
            "promotion {} pending ({:?} chooses): `promote <q|r|b|n>` or `cancel`",
            promotion.prefix, promotion.actor
        );
    }
    if let Some(err) = session.error() {
        println!("last error: {err}");
    }
}
