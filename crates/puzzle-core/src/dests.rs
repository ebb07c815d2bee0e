//! Destination maps for the board UI: origin square -> reachable squares.

use std::collections::BTreeMap;

use shakmaty::Move;

use crate::moves::uci_destination;

pub type DestinationMap = BTreeMap<String, Vec<String>>;

/// Group legal moves by origin square. Promotions to different pieces share a
/// destination, which is listed once. Destinations are sorted.
pub fn dests_for_moves(moves: &[Move]) -> DestinationMap {
    let mut dests = DestinationMap::new();
    for mv in moves {
        let Some(from) = mv.from() else { continue };
        let to = uci_destination(mv).to_string();
        let entry = dests.entry(from.to_string()).or_default();
        if !entry.contains(&to) {
            entry.push(to);
        }
    }
    for squares in dests.values_mut() {
        squares.sort();
    }
    dests
}
