//! Per-seat player board: upgrade tracks, stock, supply and tokens.

use hansa_protocol::{
    Award, Identity, Piece, PlayerColor, PlayerSection, Priviledge, Shape, Token,
};
use serde::{Deserialize, Serialize};

/// Capacity of stock and supply.
pub const POOL_SIZE: usize = 30;

/// Returned by leftmost lookups on an exhausted track.
pub const NO_PIECE: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerBoard {
    pub identity: Identity,
    pub color: PlayerColor,
    pub unused_tokens: Vec<Token>,
    pub used_tokens: Vec<Token>,
    pub stock: Vec<Piece>,
    pub supply: Vec<Piece>,
    pub keys: Vec<Piece>,
    pub priviledge: Vec<Piece>,
    pub books: Vec<Piece>,
    pub actions: Vec<Piece>,
    pub bags: Vec<Piece>,
}

fn track(color: PlayerColor, shape: Shape, len: usize) -> Vec<Piece> {
    let mut slots = vec![Piece::EMPTY];
    slots.extend(std::iter::repeat(Piece::new(color, shape)).take(len));
    slots
}

fn left(track: &[Piece]) -> usize {
    track.iter().filter(|p| !p.is_empty()).count()
}

fn leftmost(track: &[Piece]) -> usize {
    track.iter().position(|p| !p.is_empty()).unwrap_or(NO_PIECE)
}

impl PlayerBoard {
    pub fn new(color: PlayerColor) -> Self {
        Self {
            identity: Identity::default(),
            color,
            unused_tokens: Vec::new(),
            used_tokens: Vec::new(),
            stock: vec![Piece::EMPTY; POOL_SIZE],
            supply: vec![Piece::EMPTY; POOL_SIZE],
            keys: track(color, Shape::Cube, 4),
            priviledge: track(color, Shape::Cube, 3),
            books: track(color, Shape::Disc, 3),
            actions: track(color, Shape::Cube, 5),
            bags: track(color, Shape::Cube, 3),
        }
    }

    /// Piece slots of a section. Token sections have none.
    pub fn section(&self, section: PlayerSection) -> Option<&[Piece]> {
        Some(match section {
            PlayerSection::Keys => &self.keys,
            PlayerSection::Actions => &self.actions,
            PlayerSection::Priviledge => &self.priviledge,
            PlayerSection::Books => &self.books,
            PlayerSection::Bags => &self.bags,
            PlayerSection::Stock => &self.stock,
            PlayerSection::Supply => &self.supply,
            PlayerSection::TokenUnused | PlayerSection::TokenUsed => return None,
        })
    }

    pub fn section_mut(&mut self, section: PlayerSection) -> Option<&mut Vec<Piece>> {
        Some(match section {
            PlayerSection::Keys => &mut self.keys,
            PlayerSection::Actions => &mut self.actions,
            PlayerSection::Priviledge => &mut self.priviledge,
            PlayerSection::Books => &mut self.books,
            PlayerSection::Bags => &mut self.bags,
            PlayerSection::Stock => &mut self.stock,
            PlayerSection::Supply => &mut self.supply,
            PlayerSection::TokenUnused | PlayerSection::TokenUsed => return None,
        })
    }

    pub fn tokens(&self, section: PlayerSection) -> Option<&Vec<Token>> {
        match section {
            PlayerSection::TokenUnused => Some(&self.unused_tokens),
            PlayerSection::TokenUsed => Some(&self.used_tokens),
            _ => None,
        }
    }

    pub fn tokens_mut(&mut self, section: PlayerSection) -> Option<&mut Vec<Token>> {
        match section {
            PlayerSection::TokenUnused => Some(&mut self.unused_tokens),
            PlayerSection::TokenUsed => Some(&mut self.used_tokens),
            _ => None,
        }
    }

    pub fn actions(&self) -> u32 {
        match left(&self.actions) {
            5 => 2,
            4 | 3 => 3,
            2 | 1 => 4,
            _ => 5,
        }
    }

    /// Moves granted by one Move action.
    pub fn books(&self) -> u32 {
        5 - left(&self.books) as u32
    }

    pub fn priviledge(&self) -> Priviledge {
        Priviledge::from_level(4 - left(&self.priviledge) as u32)
    }

    /// Network score multiplier.
    pub fn keys(&self) -> u32 {
        match left(&self.keys) {
            4 => 1,
            3 | 2 => 2,
            1 => 3,
            _ => 4,
        }
    }

    /// Pieces moved Stock to Supply per Bags action: 3, 5, 7, then unlimited (100).
    pub fn bags(&self) -> u32 {
        match 3 + (3 - left(&self.bags) as u32) * 2 {
            9 => 100,
            r => r,
        }
    }

    /// Track backing a clearing award. Coellen has none.
    pub fn award_section(award: Award) -> Option<PlayerSection> {
        match award {
            Award::Discs => Some(PlayerSection::Books),
            Award::Priviledge => Some(PlayerSection::Priviledge),
            Award::Bags => Some(PlayerSection::Bags),
            Award::Actions => Some(PlayerSection::Actions),
            Award::Keys => Some(PlayerSection::Keys),
            Award::None | Award::Coellen => None,
        }
    }

    /// Cubes (or discs) still on the award's track.
    pub fn award_track_remaining(&self, award: Award) -> usize {
        Self::award_section(award)
            .and_then(|s| self.section(s))
            .map(left)
            .unwrap_or(0)
    }

    /// Whether the award's track can still be upgraded. Always false for Coellen.
    pub fn can_award(&self, award: Award) -> bool {
        self.award_track_remaining(award) > 0
    }

    /// Section and slot of the piece an award upgrade removes.
    pub fn award_clear_location(&self, award: Award) -> Option<(PlayerSection, usize)> {
        let section = Self::award_section(award)?;
        let slot = leftmost(self.section(section)?);
        Some((section, slot))
    }

    pub fn track_left(&self, section: PlayerSection) -> usize {
        self.section(section).map(left).unwrap_or(0)
    }

    /// Number of pieces in a section, optionally restricted to one shape.
    pub fn count(&self, section: PlayerSection, shape: Option<Shape>) -> usize {
        self.section(section)
            .map(|slots| {
                slots
                    .iter()
                    .filter(|p| !p.is_empty() && shape.map_or(true, |s| p.shape == s))
                    .count()
            })
            .unwrap_or(0)
    }

    /// First slot holding a piece of `shape`.
    pub fn find(&self, section: PlayerSection, shape: Shape) -> Option<usize> {
        self.section(section)?
            .iter()
            .position(|p| !p.is_empty() && p.shape == shape)
    }

    /// First empty slot.
    pub fn open_slot(&self, section: PlayerSection) -> Option<usize> {
        self.section(section)?.iter().position(Piece::is_empty)
    }

    /// Open slot after skipping `skip` open slots; used when planning
    /// several moves into the same section.
    pub fn nth_open_slot(&self, section: PlayerSection, skip: usize) -> Option<usize> {
        self.section(section)?
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_empty())
            .map(|(i, _)| i)
            .nth(skip)
    }
}

/// One board per color, seats unassigned.
pub fn new_base_player_boards() -> Vec<PlayerBoard> {
    PlayerColor::ALL.iter().map(|c| PlayerBoard::new(*c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starting_levels() {
        let board = PlayerBoard::new(PlayerColor::Green);
        assert_eq!(board.actions(), 2);
        assert_eq!(board.books(), 2);
        assert_eq!(board.priviledge(), Priviledge::White);
        assert_eq!(board.keys(), 1);
        assert_eq!(board.bags(), 3);
    }

    #[test]
    fn test_fully_upgraded_levels() {
        let mut board = PlayerBoard::new(PlayerColor::Green);
        for section in PlayerSection::TRACKS {
            for slot in board.section_mut(section).unwrap().iter_mut() {
                *slot = Piece::EMPTY;
            }
        }
        assert_eq!(board.actions(), 5);
        assert_eq!(board.books(), 5);
        assert_eq!(board.priviledge(), Priviledge::Black);
        assert_eq!(board.keys(), 4);
        assert_eq!(board.bags(), 100);
        assert!(!board.can_award(Award::Keys));
        assert_eq!(
            board.award_clear_location(Award::Keys),
            Some((PlayerSection::Keys, NO_PIECE))
        );
    }

    #[test]
    fn test_award_clear_location_is_leftmost() {
        let mut board = PlayerBoard::new(PlayerColor::Red);
        assert_eq!(
            board.award_clear_location(Award::Actions),
            Some((PlayerSection::Actions, 1))
        );
        board.actions[1] = Piece::EMPTY;
        assert_eq!(board.actions(), 3);
        assert_eq!(
            board.award_clear_location(Award::Actions),
            Some((PlayerSection::Actions, 2))
        );
        assert_eq!(board.award_clear_location(Award::Coellen), None);
        assert!(!board.can_award(Award::Coellen));
    }

    #[test]
    fn test_actions_progression() {
        let mut board = PlayerBoard::new(PlayerColor::Red);
        let expected = [3, 3, 4, 4, 5];
        for (i, want) in expected.iter().enumerate() {
            board.actions[i + 1] = Piece::EMPTY;
            assert_eq!(board.actions(), *want);
        }
    }

    #[test]
    fn test_counts_and_slots() {
        let mut board = PlayerBoard::new(PlayerColor::Blue);
        board.supply[0] = Piece::disc(PlayerColor::Blue);
        board.supply[2] = Piece::cube(PlayerColor::Blue);
        assert_eq!(board.count(PlayerSection::Supply, None), 2);
        assert_eq!(board.count(PlayerSection::Supply, Some(Shape::Disc)), 1);
        assert_eq!(board.find(PlayerSection::Supply, Shape::Cube), Some(2));
        assert_eq!(board.open_slot(PlayerSection::Supply), Some(1));
        assert_eq!(board.nth_open_slot(PlayerSection::Supply, 1), Some(3));
    }
}
