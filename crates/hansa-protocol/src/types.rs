use serde::{Deserialize, Serialize};

/// Seat color. `None` marks an empty slot or an unowned piece.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum PlayerColor {
    #[default]
    None,
    Yellow,
    Green,
    Blue,
    Purple,
    Red,
}

impl PlayerColor {
    pub const ALL: [PlayerColor; 5] = [
        PlayerColor::Yellow,
        PlayerColor::Green,
        PlayerColor::Blue,
        PlayerColor::Purple,
        PlayerColor::Red,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PlayerColor::None => "None",
            PlayerColor::Yellow => "Yellow",
            PlayerColor::Green => "Green",
            PlayerColor::Blue => "Blue",
            PlayerColor::Purple => "Purple",
            PlayerColor::Red => "Red",
        }
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Shape {
    #[default]
    None,
    Cube,
    Disc,
}

/// A trader (cube) or merchant (disc). The default value is "no piece".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub color: PlayerColor,
    pub shape: Shape,
}

impl Piece {
    pub const EMPTY: Piece = Piece {
        color: PlayerColor::None,
        shape: Shape::None,
    };

    pub const fn new(color: PlayerColor, shape: Shape) -> Self {
        Self { color, shape }
    }

    pub const fn cube(color: PlayerColor) -> Self {
        Self::new(color, Shape::Cube)
    }

    pub const fn disc(color: PlayerColor) -> Self {
        Self::new(color, Shape::Disc)
    }

    pub fn is_empty(&self) -> bool {
        self.color == PlayerColor::None && self.shape == Shape::None
    }

    pub fn is_disc(&self) -> bool {
        self.shape == Shape::Disc
    }
}

/// Priviledge level required by offices and Coellen spots.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Priviledge {
    #[default]
    None,
    White,
    Orange,
    Purple,
    Black,
}

impl Priviledge {
    pub fn from_level(level: u32) -> Self {
        match level {
            0 => Priviledge::None,
            1 => Priviledge::White,
            2 => Priviledge::Orange,
            3 => Priviledge::Purple,
            _ => Priviledge::Black,
        }
    }

    pub fn level(self) -> u32 {
        self as u32
    }
}

/// Reward printed on a city, claimed by clearing an adjacent route.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Award {
    #[default]
    None,
    Discs,
    Priviledge,
    Bags,
    Coellen,
    Actions,
    Keys,
}

impl Award {
    pub const TRACKS: [Award; 5] = [
        Award::Discs,
        Award::Priviledge,
        Award::Bags,
        Award::Actions,
        Award::Keys,
    ];

    pub fn track_name(self) -> &'static str {
        match self {
            Award::None => "None",
            Award::Discs => "Books",
            Award::Priviledge => "Priviledge",
            Award::Bags => "Bags",
            Award::Coellen => "Coellen",
            Award::Actions => "Actions",
            Award::Keys => "Keys",
        }
    }
}

/// Bonus markers. The `Start*` kinds are dealt onto routes at game start.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Token {
    #[default]
    None,
    StartVirtualOffice,
    StartSwapOffices,
    StartRemove3,
    VirtualOffice,
    SwapOffices,
    Action3,
    Action4,
    Levelup,
    Remove3,
}

impl Token {
    pub const START: [Token; 3] = [
        Token::StartVirtualOffice,
        Token::StartSwapOffices,
        Token::StartRemove3,
    ];

    pub fn is_start(self) -> bool {
        Self::START.contains(&self)
    }

    /// The face-down draw pile used after the start tokens.
    pub fn base_set() -> Vec<Token> {
        let mut tokens = vec![Token::VirtualOffice; 4];
        tokens.push(Token::SwapOffices);
        tokens.extend([Token::Action3; 2]);
        tokens.extend([Token::Action4; 2]);
        tokens.extend([Token::Levelup; 3]);
        tokens.push(Token::Remove3);
        tokens
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ScoreType {
    #[default]
    None,
    Game,
    Board,
    Coellen,
    Control,
    Network,
    Total,
    Place,
}

impl ScoreType {
    /// Endgame categories in reveal order.
    pub const ENDGAME: [ScoreType; 7] = [
        ScoreType::Game,
        ScoreType::Board,
        ScoreType::Coellen,
        ScoreType::Control,
        ScoreType::Network,
        ScoreType::Total,
        ScoreType::Place,
    ];
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    #[default]
    None,
    Bags,
    Place,
    Bump,
    Move,
    Clear,
    SwapOffices,
    Levelup,
    Remove3,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    #[default]
    None,
    Creating,
    Running,
    Abandoned,
    Scoring,
    Complete,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, GameStatus::Abandoned | GameStatus::Complete)
    }

    pub fn name(self) -> &'static str {
        match self {
            GameStatus::None => "None",
            GameStatus::Creating => "Creating",
            GameStatus::Running => "Running",
            GameStatus::Abandoned => "Abandoned",
            GameStatus::Scoring => "Scoring",
            GameStatus::Complete => "Complete",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationType {
    Error,
    Warn,
    Info,
    Success,
    InternalError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_piece() {
        assert!(Piece::EMPTY.is_empty());
        assert!(Piece::default().is_empty());
        assert!(!Piece::cube(PlayerColor::Red).is_empty());
        assert!(Piece::disc(PlayerColor::Red).is_disc());
    }

    #[test]
    fn test_priviledge_ordering() {
        assert!(Priviledge::White < Priviledge::Orange);
        assert!(Priviledge::Purple < Priviledge::Black);
        assert_eq!(Priviledge::from_level(3), Priviledge::Purple);
        assert_eq!(Priviledge::Black.level(), 4);
    }

    #[test]
    fn test_token_sets() {
        assert_eq!(Token::base_set().len(), 13);
        assert!(Token::StartRemove3.is_start());
        assert!(!Token::Remove3.is_start());
    }
}
