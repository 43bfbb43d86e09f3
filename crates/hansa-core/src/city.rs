use hansa_protocol::{Award, Piece, PlayerColor, Priviledge, Shape};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Office {
    pub shape: Shape,
    pub priviledge: Priviledge,
    /// Points scored immediately by whoever takes this office
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub piece: Piece,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoellenSpot {
    pub priviledge: Priviledge,
    pub points: u32,
    #[serde(default)]
    pub piece: Piece,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: usize,
    pub name: String,
    /// Filled strictly left to right
    pub offices: Vec<Office>,
    #[serde(default)]
    pub virtual_offices: Vec<Piece>,
    #[serde(default)]
    pub coellen: Vec<CoellenSpot>,
    #[serde(default)]
    pub award: Award,
    #[serde(default)]
    pub bonus_terminus: bool,
}

impl City {
    /// Offices plus virtual offices held by `color`.
    pub fn presence(&self, color: PlayerColor) -> usize {
        let offices = self
            .offices
            .iter()
            .filter(|o| !o.piece.is_empty() && o.piece.color == color)
            .count();
        let virtuals = self
            .virtual_offices
            .iter()
            .filter(|p| !p.is_empty() && p.color == color)
            .count();
        offices + virtuals
    }

    /// Color with the most presence. Ties go to whoever holds the
    /// right-most office among the tied colors.
    pub fn control(&self) -> Option<PlayerColor> {
        let counts: Vec<(PlayerColor, usize)> = PlayerColor::ALL
            .iter()
            .map(|c| (*c, self.presence(*c)))
            .collect();
        let max = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);
        if max == 0 {
            return None;
        }
        let winners: Vec<PlayerColor> = counts
            .iter()
            .filter(|(_, n)| *n == max)
            .map(|(c, _)| *c)
            .collect();
        if winners.len() == 1 {
            return Some(winners[0]);
        }

        let by_office = self.offices.iter().rev().map(|o| o.piece.color);
        let by_virtual = self.virtual_offices.iter().rev().map(|p| p.color);
        by_office.chain(by_virtual).find(|c| winners.contains(c))
    }

    /// Index of the first empty office.
    pub fn next_office(&self) -> Option<usize> {
        self.offices.iter().position(|o| o.piece.is_empty())
    }

    pub fn is_filled(&self) -> bool {
        self.offices.iter().all(|o| !o.piece.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.offices.iter().all(|o| o.piece.is_empty())
    }
}
