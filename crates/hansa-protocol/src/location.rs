//! Addressing for every place a piece or token can be.

use serde::{Deserialize, Serialize};

/// Slot within a route spot: the spot itself or its bump staging zone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteSlot {
    #[default]
    Spot,
    Bumped,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CitySlot {
    #[default]
    Office,
    Virtual,
    Coellen,
}

/// Section of a player board. The first five are upgrade tracks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlayerSection {
    #[default]
    Keys,
    Actions,
    Priviledge,
    Books,
    Bags,
    Stock,
    Supply,
    TokenUnused,
    TokenUsed,
}

impl PlayerSection {
    pub const TRACKS: [PlayerSection; 5] = [
        PlayerSection::Keys,
        PlayerSection::Actions,
        PlayerSection::Priviledge,
        PlayerSection::Books,
        PlayerSection::Bags,
    ];

    pub fn is_track(self) -> bool {
        Self::TRACKS.contains(&self)
    }

    pub fn is_token(self) -> bool {
        matches!(self, PlayerSection::TokenUnused | PlayerSection::TokenUsed)
    }

    pub fn name(self) -> &'static str {
        match self {
            PlayerSection::Keys => "Keys",
            PlayerSection::Actions => "Actions",
            PlayerSection::Priviledge => "Priviledge",
            PlayerSection::Books => "Books",
            PlayerSection::Bags => "Bags",
            PlayerSection::Stock => "Stock",
            PlayerSection::Supply => "Supply",
            PlayerSection::TokenUnused => "Unused tokens",
            PlayerSection::TokenUsed => "Used tokens",
        }
    }
}

/// Where a piece or token lives. `None` is the "does not exist" sentinel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Location {
    #[default]
    None,
    Route {
        id: usize,
        index: usize,
        slot: RouteSlot,
    },
    City {
        id: usize,
        index: usize,
        slot: CitySlot,
    },
    Player {
        seat: usize,
        section: PlayerSection,
        index: usize,
    },
}

impl Location {
    pub const fn spot(route: usize, index: usize) -> Self {
        Location::Route {
            id: route,
            index,
            slot: RouteSlot::Spot,
        }
    }

    pub const fn bumped(route: usize, index: usize) -> Self {
        Location::Route {
            id: route,
            index,
            slot: RouteSlot::Bumped,
        }
    }

    pub const fn office(city: usize, index: usize) -> Self {
        Location::City {
            id: city,
            index,
            slot: CitySlot::Office,
        }
    }

    pub const fn virtual_office(city: usize, index: usize) -> Self {
        Location::City {
            id: city,
            index,
            slot: CitySlot::Virtual,
        }
    }

    pub const fn coellen(city: usize, index: usize) -> Self {
        Location::City {
            id: city,
            index,
            slot: CitySlot::Coellen,
        }
    }

    pub const fn player(seat: usize, section: PlayerSection, index: usize) -> Self {
        Location::Player {
            seat,
            section,
            index,
        }
    }

    pub const fn stock(seat: usize, index: usize) -> Self {
        Self::player(seat, PlayerSection::Stock, index)
    }

    pub const fn supply(seat: usize, index: usize) -> Self {
        Self::player(seat, PlayerSection::Supply, index)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Location::None)
    }

    /// Route id when this is a route spot or staging slot.
    pub fn route_id(&self) -> Option<usize> {
        match *self {
            Location::Route { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn is_route_spot(&self) -> bool {
        matches!(
            self,
            Location::Route {
                slot: RouteSlot::Spot,
                ..
            }
        )
    }

    pub fn is_player(&self) -> bool {
        matches!(self, Location::Player { .. })
    }

    /// Same route position, other slot.
    pub fn with_route_slot(&self, slot: RouteSlot) -> Self {
        match *self {
            Location::Route { id, index, .. } => Location::Route { id, index, slot },
            other => other,
        }
    }
}
