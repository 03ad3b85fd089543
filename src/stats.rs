use std::fmt;

/// Per-round counters maintained by the decision engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub score: u32,
    pub bomb_hits: u32,
    pub ice_hits: u32,
    pub flowers_skipped: u32,
    pub is_game_over: bool,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh counters for a new round
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Flowers seen this round, clicked or not.
    ///
    /// Bomb clicks zero the score, so after one this undercounts.
    pub fn flowers_seen(&self) -> u32 {
        self.score + self.flowers_skipped
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "score {} | bombs {} | ice {} | skipped {}",
            self.score, self.bomb_hits, self.ice_hits, self.flowers_skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_everything() {
        let mut stats = SessionStats {
            score: 12,
            bomb_hits: 1,
            ice_hits: 2,
            flowers_skipped: 3,
            is_game_over: true,
        };
        stats.reset();
        assert_eq!(stats, SessionStats::new());
        assert!(!stats.is_game_over);
    }

    #[test]
    fn display_summary() {
        let stats = SessionStats {
            score: 40,
            bomb_hits: 1,
            ice_hits: 2,
            flowers_skipped: 9,
            is_game_over: false,
        };
        assert_eq!(stats.to_string(), "score 40 | bombs 1 | ice 2 | skipped 9");
        assert_eq!(stats.flowers_seen(), 49);
    }
}
