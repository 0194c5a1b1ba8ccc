use std::{cmp::Reverse, collections::HashMap};

use crate::round::{GuesserId, RoundResult};

const MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];

/// Per-session score table. Entry order is first-appearance order, which
/// also breaks ties in the standings.
#[derive(Debug, Default, Clone)]
pub struct ScoreBoard {
    points: HashMap<GuesserId, u32>,
    order: Vec<GuesserId>,
}

impl ScoreBoard {
    /// Create an empty score table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure the guesser has an entry, at zero if new. Called for every
    /// guess, right or wrong, so zero-scorers still appear in the standings.
    pub fn ensure_entry(&mut self, guesser: &GuesserId) {
        if !self.points.contains_key(guesser) {
            self.points.insert(guesser.clone(), 0);
            self.order.push(guesser.clone());
        }
    }

    /// Apply one closed round's result: 3 points if one participant took
    /// both kinds, otherwise 1 point per kind to whoever took it.
    pub fn apply_round(&mut self, result: &RoundResult) {
        match (&result.title_guesser, &result.artist_guesser) {
            (Some(title), Some(artist)) if title == artist => self.award(title, 3),
            (title, artist) => {
                if let Some(title) = title {
                    self.award(title, 1);
                }
                if let Some(artist) = artist {
                    self.award(artist, 1);
                }
            }
        }
    }

    fn award(&mut self, guesser: &GuesserId, points: u32) {
        self.ensure_entry(guesser);
        if let Some(entry) = self.points.get_mut(guesser) {
            *entry += points;
        }
    }

    /// Participants and their scores, sorted by descending score; ties keep
    /// first-appearance order.
    pub fn standings(&self) -> Vec<(GuesserId, u32)> {
        let mut standings: Vec<(GuesserId, u32)> = self
            .order
            .iter()
            .map(|guesser| (guesser.clone(), self.points[guesser]))
            .collect();
        // Stable sort, so insertion order survives equal scores.
        standings.sort_by_key(|(_, points)| Reverse(*points));
        standings
    }

    /// Render the standings as display text: medal markers for the top
    /// three ranks (with a spacer line after each), numeric ranks beyond.
    /// `mention` maps a guesser to however the host displays them.
    pub fn format(&self, mention: impl Fn(&GuesserId) -> String) -> String {
        format_standings(&self.standings(), mention)
    }
}

/// See [`ScoreBoard::format`].
pub fn format_standings(
    standings: &[(GuesserId, u32)],
    mention: impl Fn(&GuesserId) -> String,
) -> String {
    standings
        .iter()
        .enumerate()
        .map(|(rank, (guesser, points))| {
            let (place, spacing) = match MEDALS.get(rank) {
                Some(medal) => (medal.to_string(), "\n"),
                None => ((rank + 1).to_string(), ""),
            };
            format!("{place} - {} - {points} pts{spacing}", mention(guesser))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
