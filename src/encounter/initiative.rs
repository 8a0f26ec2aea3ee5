//! Initiative scheduling
//!
//! Characters are bucketed by initiative score, highest first. The cursor
//! walks the buckets downward; wrapping from the lowest bucket back to the
//! highest completes a turn. Characters sharing a score act in the order they
//! were added.

use std::cmp::Reverse;
use std::collections::{BTreeMap, VecDeque};
use std::ops::Bound;

use ordered_float::OrderedFloat;

use crate::core::types::Turn;

/// Whoever owns the characters the scheduler hands turns to
pub trait TurnTaker {
    fn is_turn(&self, index: usize) -> bool;
    fn can_act(&self, index: usize) -> bool;
}

/// What the scheduler needs from its caller next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// This character is mid-turn
    Acting(usize),
    /// The head's turn ended; start this character's turn next
    Start(usize),
    /// A new bucket was loaded; start its head, if anyone can act
    Loaded(Option<usize>),
}

#[derive(Debug, Clone, Default)]
pub struct InitiativeSet {
    buckets: BTreeMap<Reverse<OrderedFloat<f64>>, Vec<usize>>,
    /// Score of the bucket being played; `None` before the first load
    current_initiative: Option<f64>,
    /// Characters of the current bucket still owed a turn, head acting
    current_characters: VecDeque<usize>,
    turn: Turn,
}

impl InitiativeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_character(&mut self, index: usize, initiative: f64) {
        self.buckets
            .entry(Reverse(OrderedFloat(initiative)))
            .or_default()
            .push(index);
    }

    pub fn turn(&self) -> Turn {
        self.turn
    }

    pub fn current_initiative(&self) -> Option<f64> {
        self.current_initiative
    }

    pub fn current_character(&self) -> Option<usize> {
        self.current_characters.front().copied()
    }

    /// Scores from highest to lowest
    pub fn initiatives(&self) -> Vec<f64> {
        self.buckets.keys().map(|Reverse(score)| score.0).collect()
    }

    /// Advance the cursor one step.
    ///
    /// A head whose turn has ended is dropped and the next character in the
    /// bucket is handed back to be started. When the bucket runs dry the next
    /// lower bucket is loaded. Starting a turn is left to the caller, so the
    /// set is never borrowed while start-of-turn hooks run.
    pub fn advance(&mut self, taker: &dyn TurnTaker) -> Schedule {
        if let Some(head) = self.current_characters.front().copied() {
            if taker.is_turn(head) {
                return Schedule::Acting(head);
            }
            self.current_characters.pop_front();
            if let Some(next) = self.next_head(taker) {
                return Schedule::Start(next);
            }
        }

        self.load_next_bucket(taker);
        Schedule::Loaded(self.next_head(taker))
    }

    /// Drop characters that left play, returning whoever heads the bucket
    fn next_head(&mut self, taker: &dyn TurnTaker) -> Option<usize> {
        while let Some(head) = self.current_characters.front().copied() {
            if taker.can_act(head) {
                return Some(head);
            }
            self.current_characters.pop_front();
        }
        None
    }

    fn load_next_bucket(&mut self, taker: &dyn TurnTaker) {
        let lower = self.current_initiative.and_then(|current| {
            self.buckets
                .range((Bound::Excluded(Reverse(OrderedFloat(current))), Bound::Unbounded))
                .next()
        });

        let (score, members) = match lower {
            Some((Reverse(score), members)) => (score.0, members),
            None => {
                self.turn += 1;
                match self.buckets.iter().next() {
                    Some((Reverse(score), members)) => (score.0, members),
                    None => return,
                }
            }
        };

        self.current_initiative = Some(score);
        self.current_characters = members
            .iter()
            .copied()
            .filter(|&index| taker.can_act(index))
            .collect();
    }
}
