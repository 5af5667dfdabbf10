use std::collections::{HashMap, VecDeque};

const OUTCOME_WINDOW: usize = 100;

/// Per-strategy rolling outcome history, translated into a performance
/// factor that scales enhanced confidence up or down.
#[derive(Default)]
pub struct Scoreboard {
    outcomes: HashMap<String, VecDeque<bool>>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records whether a position opened by `strategy_name` closed as a win.
    pub fn record_outcome(&mut self, strategy_name: &str, won: bool) {
        let buf = self.outcomes.entry(strategy_name.to_string()).or_default();
        buf.push_back(won);
        if buf.len() > OUTCOME_WINDOW {
            buf.pop_front();
        }
    }

    fn win_rate(&self, strategy_name: &str) -> Option<f64> {
        let buf = self.outcomes.get(strategy_name)?;
        if buf.is_empty() {
            return None;
        }
        let wins = buf.iter().filter(|w| **w).count();
        Some(wins as f64 / buf.len() as f64)
    }

    /// Performance factor in `[0.8, 1.15]`. A strategy with no recorded
    /// outcomes yet is neutral (`1.0`).
    pub fn performance_factor(&self, strategy_name: &str) -> f64 {
        match self.win_rate(strategy_name) {
            Some(rate) => 0.8 + rate * 0.35,
            None => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_strategy_is_neutral() {
        let board = Scoreboard::new();
        assert_eq!(board.performance_factor("ghost"), 1.0);
    }

    #[test]
    fn all_wins_maps_to_upper_bound() {
        let mut board = Scoreboard::new();
        for _ in 0..20 {
            board.record_outcome("momentum_breakout", true);
        }
        assert!((board.performance_factor("momentum_breakout") - 1.15).abs() < 1e-9);
    }

    #[test]
    fn all_losses_maps_to_lower_bound() {
        let mut board = Scoreboard::new();
        for _ in 0..20 {
            board.record_outcome("momentum_breakout", false);
        }
        assert!((board.performance_factor("momentum_breakout") - 0.8).abs() < 1e-9);
    }

    #[test]
    fn window_evicts_oldest_outcomes() {
        let mut board = Scoreboard::new();
        for _ in 0..100 {
            board.record_outcome("s", false);
        }
        assert!((board.performance_factor("s") - 0.8).abs() < 1e-9);
        for _ in 0..100 {
            board.record_outcome("s", true);
        }
        assert!((board.performance_factor("s") - 1.15).abs() < 1e-9);
    }
}
