//! The table as it looks when you unbox the game: board, player boards,
//! scores and the token pile. It knows nothing about turn rules.
//!
//! `validate_*` checks that a location exists and holds what the caller
//! claims. `apply_subaction` mutates without checking rules; callers must
//! validate first. Undo is apply with source and dest swapped.

use std::collections::BTreeMap;

use hansa_protocol::{
    hash_bytes_fnv1a64, CitySlot, Location, Piece, PlayerColor, PlayerSection, RouteSlot, Shape,
    Subaction, Token,
};
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::error::InvariantViolation;
use crate::player_board::PlayerBoard;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub board: Board,
    pub player_boards: Vec<PlayerBoard>,
    pub scores: Vec<i32>,
    /// Face-down token pile
    pub tokens: Vec<Token>,
}

impl Table {
    pub fn new(board: Board, player_boards: Vec<PlayerBoard>) -> Self {
        let scores = vec![0; player_boards.len()];
        Self {
            board,
            player_boards,
            scores,
            tokens: Token::base_set(),
        }
    }

    /// Check that `l` exists.
    pub fn validate_location(&self, l: Location) -> Result<(), String> {
        self.validate(l, None)
    }

    /// Check that `l` exists and holds exactly `piece` (or `token`).
    pub fn validate_location_and_piece(
        &self,
        l: Location,
        piece: Piece,
        token: Token,
    ) -> Result<(), String> {
        self.validate(l, Some((piece, token)))
    }

    fn validate(&self, l: Location, expect: Option<(Piece, Token)>) -> Result<(), String> {
        if let Some((piece, token)) = expect {
            if token != Token::None {
                if !piece.is_empty() {
                    return Err("Location specifies both Token and Piece".into());
                }
            } else {
                if piece.color == PlayerColor::None {
                    return Err("Piece does not have PlayerColor".into());
                }
                if piece.shape == Shape::None {
                    return Err("Piece does not have Shape".into());
                }
            }
        }

        match l {
            Location::None => Err("Location has no Type (0)".into()),
            Location::Route { id, index, slot } => {
                let route = self
                    .board
                    .routes
                    .get(id)
                    .ok_or_else(|| format!("Route {id} doesn't exist"))?;
                if index >= route.spots.len() {
                    return Err(format!("Route Spot {index} doesn't exist"));
                }
                match expect {
                    Some((_, token)) if token != Token::None => {
                        if route.token != token {
                            return Err("Token does not exist".into());
                        }
                    }
                    Some((piece, _)) => match slot {
                        RouteSlot::Bumped if route.bumped[index] != piece => {
                            return Err("Bumped Piece does not exist".into());
                        }
                        RouteSlot::Spot if route.spots[index] != piece => {
                            return Err("Piece does not exist".into());
                        }
                        _ => {}
                    },
                    None => {}
                }
                Ok(())
            }
            Location::City { id, index, slot } => {
                let city = self
                    .board
                    .cities
                    .get(id)
                    .ok_or_else(|| format!("City {id} doesn't exist"))?;
                match slot {
                    CitySlot::Coellen if index >= city.coellen.len() => {
                        return Err("Coellen spot doesn't exist".into());
                    }
                    CitySlot::Virtual if index > city.virtual_offices.len() => {
                        return Err("Virtual Office doesn't exist and can't be created".into());
                    }
                    CitySlot::Office if index >= city.offices.len() => {
                        return Err(format!("City Office {index} doesn't exist"));
                    }
                    _ => {}
                }
                if let Some((piece, token)) = expect {
                    if token != Token::None {
                        return Err("Tokens are not in Cities".into());
                    }
                    let found = match slot {
                        CitySlot::Coellen => city.coellen[index].piece,
                        CitySlot::Virtual => city
                            .virtual_offices
                            .get(index)
                            .copied()
                            .unwrap_or(Piece::EMPTY),
                        CitySlot::Office => city.offices[index].piece,
                    };
                    if found != piece {
                        return Err(match slot {
                            CitySlot::Coellen => "Coellen piece does not exist",
                            CitySlot::Virtual => "Virtual office piece does not exist",
                            CitySlot::Office => "Office piece does not exist",
                        }
                        .into());
                    }
                }
                Ok(())
            }
            Location::Player {
                seat,
                section,
                index,
            } => {
                let board = self
                    .player_boards
                    .get(seat)
                    .ok_or_else(|| "Player does not exist".to_string())?;
                if let Some(slots) = board.section(section) {
                    if index >= slots.len() {
                        return Err(match section {
                            PlayerSection::Stock => "Stock does not have that subindex".into(),
                            PlayerSection::Supply => "Supply does not have that subindex".into(),
                            track => format!(
                                "That {} track does not have that subindex",
                                track.name().to_lowercase()
                            ),
                        });
                    }
                }
                if let Some((piece, token)) = expect {
                    if token != Token::None {
                        let tokens = board
                            .tokens(section)
                            .ok_or_else(|| "No tokens on this section of player board".to_string())?;
                        if !tokens.contains(&token) {
                            return Err("Token does not exist".into());
                        }
                    } else {
                        let slots = board.section(section).ok_or_else(|| {
                            "There are no cubes or discs in this board section".to_string()
                        })?;
                        if slots[index] != piece {
                            return Err("Piece does not exist".into());
                        }
                    }
                }
                Ok(())
            }
        }
    }

    /// Piece at a validated location. Virtual office slots past the end read as empty.
    pub fn get_piece(&self, l: Location) -> Result<Piece, InvariantViolation> {
        let missing = || InvariantViolation::MissingLocation(l);
        match l {
            Location::None => Err(InvariantViolation::NoneLocation),
            Location::Route { id, index, slot } => {
                let route = self.board.routes.get(id).ok_or_else(missing)?;
                let slots = match slot {
                    RouteSlot::Spot => &route.spots,
                    RouteSlot::Bumped => &route.bumped,
                };
                slots.get(index).copied().ok_or_else(missing)
            }
            Location::City { id, index, slot } => {
                let city = self.board.cities.get(id).ok_or_else(missing)?;
                match slot {
                    CitySlot::Office => city.offices.get(index).map(|o| o.piece),
                    CitySlot::Coellen => city.coellen.get(index).map(|s| s.piece),
                    CitySlot::Virtual => Some(
                        city.virtual_offices
                            .get(index)
                            .copied()
                            .unwrap_or(Piece::EMPTY),
                    ),
                }
                .ok_or_else(missing)
            }
            Location::Player {
                seat,
                section,
                index,
            } => self
                .player_boards
                .get(seat)
                .and_then(|b| b.section(section))
                .and_then(|slots| slots.get(index))
                .copied()
                .ok_or_else(missing),
        }
    }

    fn set_piece(&mut self, l: Location, piece: Piece) -> Result<(), InvariantViolation> {
        let missing = || InvariantViolation::MissingLocation(l);
        let slot: &mut Piece = match l {
            Location::None => return Err(InvariantViolation::NoneLocation),
            Location::Route { id, index, slot } => {
                let route = self.board.routes.get_mut(id).ok_or_else(missing)?;
                let slots = match slot {
                    RouteSlot::Spot => &mut route.spots,
                    RouteSlot::Bumped => &mut route.bumped,
                };
                slots.get_mut(index).ok_or_else(missing)?
            }
            Location::City { id, index, slot } => {
                let city = self.board.cities.get_mut(id).ok_or_else(missing)?;
                match slot {
                    CitySlot::Office => &mut city.offices.get_mut(index).ok_or_else(missing)?.piece,
                    CitySlot::Coellen => {
                        &mut city.coellen.get_mut(index).ok_or_else(missing)?.piece
                    }
                    CitySlot::Virtual => {
                        if index == city.virtual_offices.len() {
                            city.virtual_offices.push(Piece::EMPTY);
                        }
                        city.virtual_offices.get_mut(index).ok_or_else(missing)?
                    }
                }
            }
            Location::Player {
                seat,
                section,
                index,
            } => self
                .player_boards
                .get_mut(seat)
                .and_then(|b| b.section_mut(section))
                .and_then(|slots| slots.get_mut(index))
                .ok_or_else(missing)?,
        };
        *slot = piece;
        // Virtual offices only exist while occupied.
        if let Location::City {
            id,
            slot: CitySlot::Virtual,
            ..
        } = l
        {
            if let Some(city) = self.board.cities.get_mut(id).filter(|_| piece.is_empty()) {
                while city.virtual_offices.last().is_some_and(Piece::is_empty) {
                    city.virtual_offices.pop();
                }
            }
        }
        Ok(())
    }

    fn add_token(&mut self, l: Location, token: Token) {
        match l {
            Location::Route { id, .. } => {
                if let Some(route) = self.board.routes.get_mut(id) {
                    route.token = token;
                }
            }
            Location::Player { seat, section, .. } => {
                if let Some(tokens) = self
                    .player_boards
                    .get_mut(seat)
                    .and_then(|b| b.tokens_mut(section))
                {
                    tokens.push(token);
                }
            }
            _ => {}
        }
    }

    fn remove_token(&mut self, l: Location, token: Token) {
        match l {
            Location::Route { id, .. } => {
                if let Some(route) = self.board.routes.get_mut(id) {
                    route.token = Token::None;
                }
            }
            Location::Player { seat, section, .. } => {
                if let Some(tokens) = self
                    .player_boards
                    .get_mut(seat)
                    .and_then(|b| b.tokens_mut(section))
                {
                    if let Some(i) = tokens.iter().position(|t| *t == token) {
                        tokens.remove(i);
                    }
                }
            }
            _ => {}
        }
    }

    /// Mutate the table with an already validated subaction.
    ///
    /// An empty dest is a plain move; leaving a route spot pulls any staged
    /// bumped piece back into it. An occupied route spot is a bump. Any
    /// other occupied dest is a swap, which is never legal on a player board.
    pub fn apply_subaction(&mut self, s: &Subaction) -> Result<(), InvariantViolation> {
        if s.token != Token::None {
            self.remove_token(s.source, s.token);
            self.add_token(s.dest, s.token);
            return Ok(());
        }

        let occupant = self.get_piece(s.dest)?;
        if occupant.is_empty() {
            self.set_piece(s.source, Piece::EMPTY)?;
            self.set_piece(s.dest, s.piece)?;

            if s.source.is_route_spot() {
                let staging = s.source.with_route_slot(RouteSlot::Bumped);
                let staged = self.get_piece(staging)?;
                if !staged.is_empty() {
                    self.set_piece(staging, Piece::EMPTY)?;
                    self.set_piece(s.source, staged)?;
                }
            }
            return Ok(());
        }

        if s.dest.is_route_spot() {
            let staging = s.dest.with_route_slot(RouteSlot::Bumped);
            if !self.get_piece(staging)?.is_empty() {
                return Err(InvariantViolation::BumpedSlotOccupied(staging));
            }
            self.set_piece(s.source, Piece::EMPTY)?;
            self.set_piece(s.dest, s.piece)?;
            self.set_piece(staging, occupant)?;
            return Ok(());
        }

        if s.source.is_player() || s.dest.is_player() {
            return Err(InvariantViolation::PlayerBoardSwap(*s));
        }
        self.set_piece(s.source, occupant)?;
        self.set_piece(s.dest, s.piece)
    }

    pub fn apply_subactions(&mut self, subactions: &[Subaction]) -> Result<(), InvariantViolation> {
        subactions.iter().try_for_each(|s| self.apply_subaction(s))
    }

    pub fn undo_subaction(&mut self, s: &Subaction) -> Result<(), InvariantViolation> {
        self.apply_subaction(&s.reversed())
    }

    /// Undo a sequence, last subaction first.
    pub fn undo_subactions(&mut self, subactions: &[Subaction]) -> Result<(), InvariantViolation> {
        subactions
            .iter()
            .rev()
            .try_for_each(|s| self.undo_subaction(s))
    }

    pub fn valid_bumps(&self, l: Location) -> Result<Vec<Location>, InvariantViolation> {
        self.board.valid_bumps(l)
    }

    /// Seat playing `color`.
    pub fn seat_of(&self, color: PlayerColor) -> Option<usize> {
        self.player_boards.iter().position(|b| b.color == color)
    }

    /// Stable hash of the full table contents.
    pub fn fingerprint(&self) -> u64 {
        hash_bytes_fnv1a64(&serde_json::to_vec(self).unwrap_or_default())
    }

    /// Count of every piece on the table by color and shape.
    pub fn census(&self) -> BTreeMap<(PlayerColor, Shape), usize> {
        let mut counts = BTreeMap::new();
        let mut add = |p: &Piece| {
            if !p.is_empty() {
                *counts.entry((p.color, p.shape)).or_insert(0) += 1;
            }
        };
        for route in &self.board.routes {
            route.spots.iter().chain(route.bumped.iter()).for_each(&mut add);
        }
        for city in &self.board.cities {
            city.offices.iter().map(|o| &o.piece).for_each(&mut add);
            city.coellen.iter().map(|s| &s.piece).for_each(&mut add);
            city.virtual_offices.iter().for_each(&mut add);
        }
        for board in &self.player_boards {
            for section in PlayerSection::TRACKS
                .iter()
                .chain([PlayerSection::Stock, PlayerSection::Supply].iter())
            {
                if let Some(slots) = board.section(*section) {
                    slots.iter().for_each(&mut add);
                }
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board_data::base45;
    use crate::player_board::new_base_player_boards;

    fn table() -> Table {
        let mut boards = new_base_player_boards();
        boards.truncate(4);
        let mut t = Table::new(base45().unwrap(), boards);
        for board in t.player_boards.iter_mut() {
            board.supply[0] = Piece::disc(board.color);
            for i in 1..6 {
                board.supply[i] = Piece::cube(board.color);
            }
            board.stock[0] = Piece::cube(board.color);
            board.unused_tokens.push(Token::Action3);
        }
        t
    }

    fn yellow_cube() -> Piece {
        Piece::cube(PlayerColor::Yellow)
    }

    #[test]
    fn test_validate_messages() {
        let t = table();
        assert_eq!(
            t.validate_location(Location::None),
            Err("Location has no Type (0)".into())
        );
        assert_eq!(
            t.validate_location(Location::spot(99, 0)),
            Err("Route 99 doesn't exist".into())
        );
        assert_eq!(
            t.validate_location(Location::spot(8, 2)),
            Err("Route Spot 2 doesn't exist".into())
        );
        assert_eq!(
            t.validate_location(Location::office(3, 3)),
            Err("City Office 3 doesn't exist".into())
        );
        assert_eq!(
            t.validate_location(Location::coellen(0, 0)),
            Err("Coellen spot doesn't exist".into())
        );
        assert!(t.validate_location(Location::virtual_office(0, 0)).is_ok());
        assert_eq!(
            t.validate_location(Location::virtual_office(0, 1)),
            Err("Virtual Office doesn't exist and can't be created".into())
        );
        assert_eq!(
            t.validate_location(Location::stock(7, 0)),
            Err("Player does not exist".into())
        );
        assert_eq!(
            t.validate_location(Location::stock(0, 30)),
            Err("Stock does not have that subindex".into())
        );
        assert_eq!(
            t.validate_location(Location::player(0, PlayerSection::Keys, 5)),
            Err("That keys track does not have that subindex".into())
        );
    }

    #[test]
    fn test_validate_piece_matches() {
        let t = table();
        let supply = Location::supply(0, 1);
        assert!(t
            .validate_location_and_piece(supply, yellow_cube(), Token::None)
            .is_ok());
        assert_eq!(
            t.validate_location_and_piece(supply, Piece::disc(PlayerColor::Yellow), Token::None),
            Err("Piece does not exist".into())
        );
        assert_eq!(
            t.validate_location_and_piece(supply, Piece::EMPTY, Token::None),
            Err("Piece does not have PlayerColor".into())
        );
        assert_eq!(
            t.validate_location_and_piece(supply, yellow_cube(), Token::Action3),
            Err("Location specifies both Token and Piece".into())
        );
        assert_eq!(
            t.validate_location_and_piece(Location::supply(0, 0), Piece::EMPTY, Token::Action3),
            Err("No tokens on this section of player board".into())
        );
        let unused = Location::player(0, PlayerSection::TokenUnused, 0);
        assert!(t
            .validate_location_and_piece(unused, Piece::EMPTY, Token::Action3)
            .is_ok());
        assert_eq!(
            t.validate_location_and_piece(unused, Piece::EMPTY, Token::Levelup),
            Err("Token does not exist".into())
        );
        assert_eq!(
            t.validate_location_and_piece(Location::office(0, 0), Piece::EMPTY, Token::Levelup),
            Err("Tokens are not in Cities".into())
        );
        assert_eq!(
            t.validate_location_and_piece(
                Location::player(0, PlayerSection::TokenUnused, 0),
                yellow_cube(),
                Token::None
            ),
            Err("There are no cubes or discs in this board section".into())
        );
    }

    #[test]
    fn test_place_and_undo() {
        let mut t = table();
        let before = t.clone();
        let s = Subaction::piece(Location::supply(0, 1), Location::spot(0, 0), yellow_cube());
        t.apply_subaction(&s).unwrap();
        assert_eq!(t.get_piece(Location::spot(0, 0)).unwrap(), yellow_cube());
        assert!(t.get_piece(Location::supply(0, 1)).unwrap().is_empty());
        t.undo_subaction(&s).unwrap();
        assert_eq!(t, before);
    }

    #[test]
    fn test_bump_moves_occupant_to_staging() {
        let mut t = table();
        let green = Piece::cube(PlayerColor::Green);
        t.apply_subaction(&Subaction::piece(Location::supply(1, 1), Location::spot(0, 0), green))
            .unwrap();
        let bump = Subaction::piece(Location::supply(0, 1), Location::spot(0, 0), yellow_cube());
        t.apply_subaction(&bump).unwrap();
        assert_eq!(t.get_piece(Location::spot(0, 0)).unwrap(), yellow_cube());
        assert_eq!(t.get_piece(Location::bumped(0, 0)).unwrap(), green);

        // A second bump into the same spot would overwrite the staging zone.
        let again = Subaction::piece(
            Location::supply(2, 1),
            Location::spot(0, 0),
            Piece::cube(PlayerColor::Blue),
        );
        assert_eq!(
            t.apply_subaction(&again),
            Err(InvariantViolation::BumpedSlotOccupied(Location::bumped(0, 0)))
        );
    }

    #[test]
    fn test_unbump_cascade() {
        let mut t = table();
        let green = Piece::cube(PlayerColor::Green);
        t.board.routes[0].spots[0] = yellow_cube();
        t.board.routes[0].bumped[0] = green;

        let leave = Subaction::piece(Location::spot(0, 0), Location::spot(1, 2), yellow_cube());
        t.apply_subaction(&leave).unwrap();
        assert_eq!(t.get_piece(Location::spot(0, 0)).unwrap(), green);
        assert!(t.get_piece(Location::bumped(0, 0)).unwrap().is_empty());
        assert_eq!(t.get_piece(Location::spot(1, 2)).unwrap(), yellow_cube());
    }

    #[test]
    fn test_swap_between_offices() {
        let mut t = table();
        let green = Piece::cube(PlayerColor::Green);
        t.board.cities[3].offices[0].piece = yellow_cube();
        t.board.cities[3].offices[1].piece = green;
        let swap = Subaction::piece(Location::office(3, 0), Location::office(3, 1), yellow_cube());
        t.apply_subaction(&swap).unwrap();
        assert_eq!(t.board.cities[3].offices[0].piece, green);
        assert_eq!(t.board.cities[3].offices[1].piece, yellow_cube());
    }

    #[test]
    fn test_player_board_swap_is_fatal() {
        let mut t = table();
        let swap = Subaction::piece(Location::supply(0, 1), Location::supply(0, 2), yellow_cube());
        assert!(matches!(
            t.apply_subaction(&swap),
            Err(InvariantViolation::PlayerBoardSwap(_))
        ));
    }

    #[test]
    fn test_get_piece_none_location() {
        let t = table();
        assert_eq!(
            t.get_piece(Location::None),
            Err(InvariantViolation::NoneLocation)
        );
    }

    #[test]
    fn test_token_moves() {
        let mut t = table();
        t.board.routes[9].token = Token::StartSwapOffices;
        let take = Subaction::token(
            Location::spot(9, 0),
            Location::player(0, PlayerSection::TokenUnused, 0),
            Token::StartSwapOffices,
        );
        t.apply_subaction(&take).unwrap();
        assert_eq!(t.board.routes[9].token, Token::None);
        assert!(t.player_boards[0].unused_tokens.contains(&Token::StartSwapOffices));
        t.undo_subaction(&take).unwrap();
        assert_eq!(t.board.routes[9].token, Token::StartSwapOffices);
        assert_eq!(t.player_boards[0].unused_tokens, vec![Token::Action3]);
    }

    #[test]
    fn test_virtual_office_created_on_demand() {
        let mut t = table();
        let place = Subaction::piece(
            Location::supply(0, 1),
            Location::virtual_office(5, 0),
            yellow_cube(),
        );
        let before = t.clone();
        t.apply_subaction(&place).unwrap();
        assert_eq!(t.board.cities[5].virtual_offices, vec![yellow_cube()]);
        assert_eq!(t.board.cities[5].presence(PlayerColor::Yellow), 1);

        t.undo_subaction(&place).unwrap();
        assert!(t.board.cities[5].virtual_offices.is_empty());
        assert_eq!(t, before);
    }

    #[test]
    fn test_fingerprint_tracks_changes() {
        let mut t = table();
        let before = t.fingerprint();
        let s = Subaction::piece(Location::supply(0, 1), Location::spot(0, 0), yellow_cube());
        t.apply_subaction(&s).unwrap();
        assert_ne!(t.fingerprint(), before);
        t.undo_subaction(&s).unwrap();
        assert_eq!(t.fingerprint(), before);
    }
}
