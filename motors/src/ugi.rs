//! The UCI-facing I/O sink and engine-option model. All UGI communication
//! happens over stdout (§6): a plain `info ...`/`bestmove ...` line per
//! iteration and on search completion, no pretty-printing machinery since
//! that's ambient diagnostic tooling the teacher builds with `colored` and
//! `indicatif`, and only `colored` is part of this crate's dependency stack.
//! Parsing the other direction (UCI command text) is a Non-goal; only the
//! handful of commands needed to drive a search end-to-end are recognized,
//! in [`crate::main`].

use crate::search::core::MAX_PLY;
use crate::search::tt::TranspositionTable;
use colored::Colorize;
use gears::games::chess::moves::ChessMove;
use gears::score::Score;
use std::fmt::{Display, Formatter};
use std::io::{Write, stdout};

#[derive(Debug, Copy, Clone, Default)]
pub struct UgiSpin {
    pub val: i64,
    pub default: i64,
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Copy, Clone, Default)]
pub struct UgiCheck {
    pub val: bool,
    pub default: bool,
}

#[derive(Debug, Clone)]
pub enum EngineOptionType {
    Check(UgiCheck),
    Spin(UgiSpin),
    UString(String),
    Button,
}

impl EngineOptionType {
    fn type_to_str(&self) -> &'static str {
        match self {
            EngineOptionType::Check(_) => "check",
            EngineOptionType::Spin(_) => "spin",
            EngineOptionType::UString(_) => "string",
            EngineOptionType::Button => "button",
        }
    }
}

impl Display for EngineOptionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "type {}", self.type_to_str())?;
        match self {
            EngineOptionType::Check(c) => write!(f, " default {}", c.default),
            EngineOptionType::Spin(s) => write!(f, " default {} min {} max {}", s.default, s.min, s.max),
            EngineOptionType::UString(s) => write!(f, " default {s}"),
            EngineOptionType::Button => Ok(()),
        }
    }
}

/// §6's named engine options: `Hash`, `Threads`, `MultiPV`, `SyzygyPath`,
/// `UCI_Chess960`, `Clear Hash`, `OutputLevel`. A `setoption name X value Y`
/// line is matched against this list by the caller (§1 Non-goal: UCI parsing
/// is this crate's own hand-rolled minimum, not a general parser).
#[derive(Debug, Clone)]
pub struct EngineOption {
    pub name: &'static str,
    pub value: EngineOptionType,
}

pub fn default_options(threads: usize) -> Vec<EngineOption> {
    vec![
        EngineOption {
            name: "Hash",
            value: EngineOptionType::Spin(UgiSpin {
                val: TranspositionTable::default().size_in_mib() as i64,
                default: TranspositionTable::default().size_in_mib() as i64,
                min: 1,
                max: 1 << 20,
            }),
        },
        EngineOption {
            name: "Threads",
            value: EngineOptionType::Spin(UgiSpin { val: threads as i64, default: 1, min: 1, max: 256 }),
        },
        EngineOption {
            name: "MultiPV",
            value: EngineOptionType::Spin(UgiSpin { val: 1, default: 1, min: 1, max: MAX_PLY as i64 }),
        },
        EngineOption { name: "SyzygyPath", value: EngineOptionType::UString(String::new()) },
        EngineOption { name: "UCI_Chess960", value: EngineOptionType::Check(UgiCheck { val: false, default: false }) },
        EngineOption { name: "Clear Hash", value: EngineOptionType::Button },
        EngineOption {
            name: "OutputLevel",
            value: EngineOptionType::UString("standard".to_string()),
        },
    ]
}

/// Formats a single iteration's `info depth ... score ... nodes ... pv ...`
/// line (§6). `hashfull` is in permille, as UCI expects.
#[allow(clippy::too_many_arguments)]
pub fn info_line(depth: i32, seldepth: i32, score: Score, nodes: u64, time_ms: u128, hashfull: usize, pv: &[ChessMove]) -> String {
    let nps = if time_ms > 0 { (nodes as u128 * 1000 / time_ms) as u64 } else { 0 };
    let mut pv_text = String::new();
    for mov in pv {
        pv_text.push(' ');
        pv_text.push_str(&mov.to_string());
    }
    format!(
        "info depth {depth} seldepth {seldepth} score {} nodes {nodes} nps {nps} hashfull {hashfull} time {time_ms} pv{pv_text}",
        score.format_uci()
    )
}

pub fn bestmove_line(best: ChessMove, ponder: Option<ChessMove>) -> String {
    match ponder {
        Some(p) => format!("bestmove {best} ponder {p}"),
        None => format!("bestmove {best}"),
    }
}

/// Every UGI line goes through here rather than a bare `println!` so a
/// future logging sink (file, socket) only needs to change this one spot,
/// matching the teacher's `UgiOutput::write_ugi`.
#[derive(Debug, Default)]
pub struct UgiOutput {
    pretty: bool,
}

impl UgiOutput {
    pub fn new(pretty: bool) -> Self {
        UgiOutput { pretty }
    }

    pub fn write_ugi(&mut self, message: &str) {
        println!("{message}");
        let _ = stdout().flush();
    }

    pub fn write_info(&mut self, depth: i32, seldepth: i32, score: Score, nodes: u64, time_ms: u128, hashfull: usize, pv: &[ChessMove]) {
        self.write_ugi(&info_line(depth, seldepth, score, nodes, time_ms, hashfull, pv));
    }

    pub fn write_bestmove(&mut self, best: ChessMove, ponder: Option<ChessMove>) {
        self.write_ugi(&bestmove_line(best, ponder));
    }

    /// Non-UCI diagnostic text, colored when `pretty` is on — the one place
    /// this module still reaches for `colored`, matching the teacher's own
    /// `info string`/warning lines.
    pub fn write_info_string(&mut self, message: &str) {
        if self.pretty {
            self.write_ugi(&format!("info string {}", message.dimmed()));
        } else {
            self.write_ugi(&format!("info string {message}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gears::games::chess::moves::MoveFlag;
    use gears::games::chess::squares::sq;

    #[test]
    fn info_line_includes_pv_moves() {
        let mov = ChessMove::new(sq("e2"), sq("e4"), MoveFlag::DoublePawnPush);
        let line = info_line(5, 5, Score::new(37), 1000, 100, 12, &[mov]);
        assert!(line.contains("score cp 37"));
        assert!(line.contains("pv e2e4"));
        assert!(line.starts_with("info depth 5"));
    }

    #[test]
    fn bestmove_line_without_ponder_omits_ponder_token() {
        let mov = ChessMove::new(sq("e2"), sq("e4"), MoveFlag::DoublePawnPush);
        assert_eq!(bestmove_line(mov, None), "bestmove e2e4");
    }

    #[test]
    fn mate_score_formats_as_mate_not_cp() {
        let line = info_line(1, 1, Score::mate_in(3), 0, 0, 0, &[]);
        assert!(line.contains("score mate"));
    }

    #[test]
    fn default_options_include_hash_and_threads() {
        let opts = default_options(1);
        assert!(opts.iter().any(|o| o.name == "Hash"));
        assert!(opts.iter().any(|o| o.name == "Threads"));
    }
}
