//! Minimal UCI read-loop binary (§2's CLI component). UCI text parsing
//! itself is a Non-goal: only the handful of commands needed to drive a
//! search end-to-end are recognized (`uci`, `isready`, `position`, `go`,
//! `stop`, `quit`, `setoption`), not a complete UCI front-end. A background
//! thread reads stdin so `stop` can interrupt a `go` running on its own
//! thread, the same split the teacher's `ugi_engine` makes between the
//! command loop and the search thread.

use crossbeam_channel::{Receiver, Sender, select, unbounded};
use gears::games::ZobristHistory;
use gears::games::chess::board_state::BoardState;
use gears::games::chess::movegen::legal_moves;
use gears::games::chess::pieces::Color;
use motors::eval::PstOnlyEval;
use motors::search::multithreading::{SearchParams, SearchSharedState};
use motors::search::time_manager::{NodeLimit, TimeControl, TimeManager};
use motors::search::{SearchResult, clear_hash, launch_search};
use motors::ugi::default_options;
use std::io::{BufRead, stdin};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("halogen-stdin".to_string())
        .spawn(move || {
            for line in stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        })
        .expect("failed to spawn stdin reader thread");
    rx
}

/// Parses the `go` tokens this binary supports into a [`TimeManager`];
/// anything outside this handful is silently ignored rather than rejected.
fn parse_go(tokens: &[&str], white_to_move: bool) -> TimeManager {
    let (mut wtime, mut btime, mut movetime) = (None, None, None);
    let (mut winc, mut binc) = (Duration::ZERO, Duration::ZERO);
    let (mut movestogo, mut depth, mut nodes, mut infinite) = (None, None, None, false);

    let mut iter = tokens.iter();
    while let Some(&tok) = iter.next() {
        match tok {
            "wtime" => wtime = iter.next().and_then(|s| s.parse::<u64>().ok()),
            "btime" => btime = iter.next().and_then(|s| s.parse::<u64>().ok()),
            "winc" => winc = iter.next().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis).unwrap_or_default(),
            "binc" => binc = iter.next().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis).unwrap_or_default(),
            "movestogo" => movestogo = iter.next().and_then(|s| s.parse::<u32>().ok()),
            "movetime" => movetime = iter.next().and_then(|s| s.parse::<u64>().ok()),
            "depth" => depth = iter.next().and_then(|s| s.parse::<i32>().ok()),
            "nodes" => nodes = iter.next().and_then(|s| s.parse::<u64>().ok()),
            "infinite" => infinite = true,
            _ => {}
        }
    }

    let node_limit = nodes.map(NodeLimit);
    if infinite {
        return TimeManager::new(Instant::now(), TimeControl::Infinite, node_limit, depth);
    }
    if let Some(ms) = movetime {
        return TimeManager::new(Instant::now(), TimeControl::MoveTime(Duration::from_millis(ms)), node_limit, depth);
    }
    let (time_left_ms, increment) = if white_to_move { (wtime, winc) } else { (btime, binc) };
    if let Some(time_left_ms) = time_left_ms {
        let time_left = Duration::from_millis(time_left_ms);
        let control = match movestogo {
            Some(moves_to_go) => TimeControl::MovesToGo { time_left, increment, moves_to_go },
            None if increment > Duration::ZERO => TimeControl::Increment { time_left, increment },
            None => TimeControl::SuddenDeath { time_left },
        };
        return TimeManager::new(Instant::now(), control, node_limit, depth);
    }
    TimeManager::new(Instant::now(), TimeControl::Infinite, node_limit, depth)
}

/// `position [startpos|fen <fen>] [moves <uci> ...]`. A move token is
/// matched against `legal_moves` by its rendered UCI text rather than
/// parsed independently, since [`gears::games::chess::moves::ChessMove`]'s
/// `Display` already produces exactly that text.
fn parse_position(tokens: &[&str]) -> Option<(BoardState, ZobristHistory)> {
    let mut idx;
    let mut board = match tokens.first() {
        Some(&"startpos") => {
            idx = 1;
            BoardState::startpos()
        }
        Some(&"fen") => {
            let fen_tokens: Vec<&str> = tokens[1..].iter().take_while(|&&t| t != "moves").copied().collect();
            idx = 1 + fen_tokens.len();
            BoardState::from_fen(&fen_tokens.join(" ")).ok()?
        }
        _ => return None,
    };
    let mut history = ZobristHistory::default();
    if tokens.get(idx) == Some(&"moves") {
        idx += 1;
        for mov_text in &tokens[idx..] {
            let mov = legal_moves(&board).into_iter().find(|m| m.to_string() == *mov_text)?;
            history.push(board.hash_pos());
            board = board.make_move(mov)?;
        }
    }
    Some((board, history))
}

fn main() {
    let mut shared_state = SearchSharedState::new(motors::ugi::UgiOutput::new(false));
    shared_state.ensure_workers(1);
    let mut shared = Arc::new(shared_state);
    let threads = 1usize;

    let mut board = BoardState::startpos();
    let mut history = ZobristHistory::default();

    let cmd_rx = spawn_stdin_reader();
    let (done_tx, done_rx): (Sender<SearchResult>, Receiver<SearchResult>) = unbounded();
    let mut searching = false;

    loop {
        select! {
            recv(cmd_rx) -> msg => {
                let Ok(line) = msg else { break };
                let tokens: Vec<&str> = line.split_whitespace().collect();
                let Some(&cmd) = tokens.first() else { continue };
                match cmd {
                    "uci" => {
                        println!("id name Halogen");
                        println!("id author ToTheAnd");
                        for opt in default_options(threads) {
                            println!("option name {} {}", opt.name, opt.value);
                        }
                        println!("uciok");
                    }
                    "isready" => println!("readyok"),
                    "ucinewgame" => {
                        clear_hash(&shared.tt);
                        board = BoardState::startpos();
                        history = ZobristHistory::default();
                    }
                    "position" => {
                        if let Some((new_board, new_history)) = parse_position(&tokens[1..]) {
                            board = new_board;
                            history = new_history;
                        } else {
                            shared.output.lock().unwrap().write_info_string("malformed position command, ignored");
                        }
                    }
                    "setoption" => {
                        // only `Hash` and `Clear Hash` are acted on; everything
                        // else is parsed-and-ignored rather than rejected
                        if tokens.get(1) == Some(&"name") && tokens.get(2) == Some(&"Hash") && tokens.get(3) == Some(&"value") {
                            if let Some(mib) = tokens.get(4).and_then(|s| s.parse::<usize>().ok()) {
                                if !searching {
                                    if let Some(state) = Arc::get_mut(&mut shared) {
                                        state.resize_hash(mib);
                                    }
                                }
                            }
                        } else if tokens.get(1) == Some(&"name") && tokens.get(2) == Some(&"Clear") && tokens.get(3) == Some(&"Hash") {
                            clear_hash(&shared.tt);
                        }
                    }
                    "go" => {
                        if searching {
                            continue;
                        }
                        let time_manager = parse_go(&tokens[1..], board.side_to_move() == Color::White);
                        let params = SearchParams { root: board, history: history.clone(), time_manager };
                        let shared_clone = Arc::clone(&shared);
                        let done_tx = done_tx.clone();
                        searching = true;
                        thread::spawn(move || {
                            let result = launch_search(shared_clone, params, PstOnlyEval::default);
                            let _ = done_tx.send(result);
                        });
                    }
                    "stop" => shared.request_stop(),
                    "quit" => break,
                    _ => {}
                }
            }
            recv(done_rx) -> msg => {
                if let Ok(result) = msg {
                    println!("bestmove {}", result.best_move);
                    searching = false;
                }
            }
        }
    }
}
