//! The `full` + `start` frames a replay opens with.
//!
//! The server expects the first frame to carry a complete player snapshot.
//! Everything except the few fields taken from [`GameOptions`] is the
//! zeroed starting state.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{kind, ReplayFrame};

/// Game setup values the snapshot is built from.
///
/// `options` and `handling` are forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOptions {
    pub seed: u64,
    pub next_pieces: Vec<String>,
    pub board_width: usize,
    pub board_height: usize,
    pub board_buffer: usize,
    pub g: f64,
    pub handling: Value,
    pub options: Value,
}

/// Build `[full, start]` for a new replay.
pub fn initial_frames(game: &GameOptions) -> Vec<ReplayFrame> {
    vec![
        ReplayFrame::new(kind::FULL, full_snapshot(game)),
        ReplayFrame::new(kind::START, json!({})),
    ]
}

fn full_snapshot(game: &GameOptions) -> Value {
    let row = vec![Value::Null; game.board_width];
    let board = vec![row; game.board_height + game.board_buffer];

    json!({
        "aggregatestats": { "apm": 0, "pps": 0, "vsscore": 0 },
        "diyusi": 0,
        "enemies": [],
        "fire": 0,
        "game": {
            "controlling": {
                "lastshift": 0,
                "ldas": 0,
                "ldasiter": 0,
                "lshift": false,
                "rdas": 0,
                "rdasiter": 0,
                "rshift": false,
                "softdrop": false
            },
            "hold": { "piece": null, "locked": false },
            "playing": true,
            "bag": game.next_pieces,
            "board": board,
            "g": game.g,
            "handling": game.handling
        },
        "gameoverreason": null,
        "killer": { "gameid": null, "name": null, "type": "sizzle" },
        "options": game.options,
        "replay": {},
        "source": {},
        "stats": initial_stats(game.seed),
        "successful": false,
        "targets": []
    })
}

fn initial_stats(seed: u64) -> Value {
    let mut stats = zeroed(&[
        "lines",
        "level_lines",
        "inputs",
        "holds",
        "score",
        "zenprogress",
        "combo",
        "currentcombopower",
        "topcombo",
        "btb",
        "topbtb",
        "currentbtbchainpower",
        "tspins",
        "piecesplaced",
        "kills",
    ]);
    stats.insert("seed".into(), json!(seed));
    stats.insert("level_lines_needed".into(), json!(1));
    stats.insert("zenlevel".into(), json!(1));
    stats.insert("level".into(), json!(1));
    stats.insert(
        "time".into(),
        json!({ "start": 0, "zero": true, "locked": false, "prev": 0, "frameoffset": 0 }),
    );
    stats.insert(
        "clears".into(),
        Value::Object(zeroed(&[
            "singles",
            "doubles",
            "triples",
            "quads",
            "pentas",
            "realtspins",
            "minitspins",
            "minitspinsingles",
            "tspinsingles",
            "minitspindoubles",
            "tspindoubles",
            "tspintriples",
            "tspinquads",
            "tspinpentas",
            "allclear",
        ])),
    );
    stats.insert(
        "garbage".into(),
        Value::Object(zeroed(&["sent", "received", "attack", "cleared"])),
    );
    stats.insert(
        "finesse".into(),
        Value::Object(zeroed(&["combo", "faults", "perfectpieces"])),
    );
    Value::Object(stats)
}

fn zeroed(keys: &[&str]) -> Map<String, Value> {
    keys.iter().map(|k| (k.to_string(), json!(0))).collect()
}
