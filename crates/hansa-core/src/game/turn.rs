//! Subaction handling. Each accepted subaction advances the turn state by
//! exactly one step; a rejected one mutates nothing.

use chrono::{DateTime, Utc};
use hansa_protocol::{
    ActionType, Award, CitySlot, GameStatus, Location, Piece, PlayerSection, RouteSlot,
    Subaction, TurnStateType,
};

use super::Game;
use crate::error::{GameError, InvariantViolation};

const HEADER: &str = "Subaction Error";

fn deny<T>(content: impl Into<String>) -> Result<T, GameError> {
    Err(GameError::rule(HEADER, content))
}

impl Game {
    /// Validate and apply one subaction from `seat`. Returns the per-seat
    /// score deltas it produced.
    pub fn do_subaction(
        &mut self,
        seat: usize,
        s: Subaction,
        now: DateTime<Utc>,
    ) -> Result<Vec<i32>, GameError> {
        self.validate_subaction(seat, &s)?;
        let ts = &self.turn_state;
        if ts.kind == TurnStateType::None && ts.actions_left == 0 {
            return deny("You have no actions left");
        }

        let deltas = match s.source {
            Location::None => return deny("Location has no Type (0)"),
            Location::City { .. } => {
                return Err(GameError::rule("Nope!", "You can not move pieces from an Office"));
            }
            Location::Player {
                seat: owner,
                section,
                index,
            } => {
                if owner != seat {
                    return deny("You can not move pieces from other player boards");
                }
                match section {
                    PlayerSection::Stock => self.from_stock(seat, s)?,
                    PlayerSection::Supply => self.from_supply(seat, s, now)?,
                    PlayerSection::TokenUnused | PlayerSection::TokenUsed => {
                        return deny("Tokens can not be played yet");
                    }
                    track => self.claim_track_award(seat, s, track, index)?,
                }
            }
            Location::Route { id, index, slot } => self.from_route(seat, s, id, index, slot)?,
        };

        for (score, delta) in self.table.scores.iter_mut().zip(&deltas) {
            *score += delta;
        }
        self.game_end_if_necessary();
        Ok(deltas)
    }

    /// Turn order and location checks shared by every subaction.
    fn validate_subaction(&self, seat: usize, s: &Subaction) -> Result<(), GameError> {
        if self.status != GameStatus::Running {
            return deny("Can only move pieces when game is 'Running'");
        }
        let ts = &self.turn_state;
        if ts.kind == TurnStateType::Bumping && seat != ts.bumping_player {
            let name = self
                .identity_at(ts.bumping_player)
                .map(|i| i.name.as_str())
                .unwrap_or("another player");
            return deny(format!("It's {name}'s turn to replace after the bump"));
        }
        if ts.kind != TurnStateType::Bumping && seat != ts.player {
            return deny("It's not your turn");
        }
        self.table
            .validate_location_and_piece(s.source, s.piece, s.token)
            .map_err(|e| GameError::rule("Source Error", e))?;
        self.table
            .validate_location(s.dest)
            .map_err(|e| GameError::rule("Dest Error", e))?;
        Ok(())
    }

    fn no_scores(&self) -> Vec<i32> {
        vec![0; self.player_count()]
    }

    fn has_pieces(&self, seat: usize, section: PlayerSection) -> bool {
        self.table.player_boards[seat].count(section, None) > 0
    }

    /// A new action may interrupt an open Move or Bags action only while
    /// another action is available.
    fn check_can_switch(&self) -> Result<(), GameError> {
        let name = match self.turn_state.kind {
            TurnStateType::Moving => "Move",
            TurnStateType::Bags => "Bags",
            _ => return Ok(()),
        };
        if self.turn_state.actions_left == 0 {
            return deny(format!("You have no actions after this {name} action"));
        }
        if self.game_end {
            return deny(format!("The game is ending after this {name} action"));
        }
        Ok(())
    }

    /// Spend an action, closing whatever Move or Bags action was open.
    fn begin_action(&mut self) {
        self.close_open_action();
        self.turn_state.actions_left = self.turn_state.actions_left.saturating_sub(1);
    }

    fn check_bump_landing(&self, dest: Location) -> Result<(), GameError> {
        let valid = self.table.valid_bumps(self.turn_state.bumping_location)?;
        if !valid.contains(&dest) {
            return deny(format!(
                "Route too far for bump replacement (there are {} valid spots)",
                valid.len()
            ));
        }
        Ok(())
    }

    /// The bumped player places one of their replacement pieces.
    fn replace_after_bump(&mut self, s: Subaction) -> Result<Vec<i32>, GameError> {
        if self.turn_state.bumping_replaces == 0 {
            return deny("No bump replaces left (end bump)");
        }
        self.check_bump_landing(s.dest)?;
        // Stays in Bumping until the bumped player ends the bump.
        self.turn_state.bumping_replaces -= 1;
        self.apply(s)?;
        Ok(self.no_scores())
    }

    fn start_bump(&mut self, dest: Location, occupant: Piece, bumped_seat: usize) {
        let owed = if occupant.is_disc() { 2 } else { 1 };
        let ts = &mut self.turn_state;
        ts.kind = TurnStateType::BumpPaying;
        ts.bumping_cost = owed;
        ts.bumping_replaces = owed;
        ts.bumping_player = bumped_seat;
        ts.bumping_location = dest.with_route_slot(RouteSlot::Bumped);
        ts.bumping_moved = false;
    }

    fn clearing_route_empty(&self) -> bool {
        self.table.board.routes[self.turn_state.clearing_route].is_empty()
    }

    fn close_clear(&mut self) {
        let ts = &mut self.turn_state;
        ts.kind = TurnStateType::None;
        ts.clearing_route = 0;
        ts.clearing_can_office = false;
        ts.clearing_award = Award::None;
        self.close_action(ActionType::Clear);
    }

    /// +1 to the controller of each city at either end of `route`.
    fn control_points(&self, route: usize) -> Result<Vec<i32>, InvariantViolation> {
        let mut deltas = self.no_scores();
        let r = &self.table.board.routes[route];
        for city in [r.left_city, r.right_city] {
            if let Some(color) = self.table.board.cities[city].control() {
                deltas[self.seat_of_color(color)?] += 1;
            }
        }
        Ok(deltas)
    }

    /// Upgrade a track as the clearing award: leftmost piece to supply.
    fn claim_track_award(
        &mut self,
        seat: usize,
        s: Subaction,
        section: PlayerSection,
        index: usize,
    ) -> Result<Vec<i32>, GameError> {
        let Location::Player {
            seat: to_seat,
            section: PlayerSection::Supply,
            index: to,
        } = s.dest
        else {
            return deny("You can only clear to your supply");
        };
        if to_seat != seat {
            return deny("You can only clear to your supply");
        }
        let board = &self.table.player_boards[seat];
        if !board.supply[to].is_empty() {
            return deny("There is already a piece in Dest");
        }
        let ts = &self.turn_state;
        if ts.kind != TurnStateType::Clearing {
            return deny("You can not level up unless you are clearing a route");
        }
        let award = ts.clearing_award;
        let Some((track, leftmost)) = board.award_clear_location(award) else {
            return deny("You have no clearing award for that track");
        };
        if section != track {
            return deny(format!(
                "Your clearing award is for the {} track",
                award.track_name()
            ));
        }
        if index != leftmost {
            return deny("You must remove the left most piece");
        }

        let actions_before = board.actions();
        self.turn_state.clearing_award = Award::None;
        self.turn_state.clearing_can_office = false;
        self.apply(s)?;
        if self.table.player_boards[seat].actions() > actions_before {
            self.turn_state.actions_left += 1;
        }
        if self.clearing_route_empty() {
            self.close_clear();
        }
        Ok(self.no_scores())
    }

    fn from_stock(&mut self, seat: usize, s: Subaction) -> Result<Vec<i32>, GameError> {
        match s.dest {
            Location::None => deny("Location has no Type (0)"),
            Location::City { .. } => deny("You can not move pieces from Stock to an Office"),
            Location::Route { slot, .. } => {
                if self.turn_state.kind != TurnStateType::Bumping {
                    return deny("You can only move from Stock to Route when bumped");
                }
                let spot = s.dest.with_route_slot(RouteSlot::Spot);
                if !self.table.get_piece(spot)?.is_empty() {
                    return deny("You can not bump when resolving a bump");
                }
                if slot != RouteSlot::Spot {
                    return deny("You can not replace a bump to a bump zone");
                }
                self.replace_after_bump(s)
            }
            Location::Player {
                seat: to_seat,
                section,
                index,
            } => {
                if to_seat != seat {
                    return deny("You can not move to another player board");
                }
                if section != PlayerSection::Supply {
                    return deny("You can only move pieces from Stock to Supply");
                }
                if !self.table.player_boards[seat].supply[index].is_empty() {
                    return deny("There is already a piece in that Subindex");
                }
                match self.turn_state.kind {
                    TurnStateType::BumpPaying => {
                        deny("You must complete bump payment (drag from supply to stock)")
                    }
                    TurnStateType::Bumping => deny("You can not bags while resolving a bump"),
                    TurnStateType::Clearing => deny("You can not bags while clearing a route"),
                    TurnStateType::Bags => {
                        self.turn_state.bags_left = self.turn_state.bags_left.saturating_sub(1);
                        self.apply(s)?;
                        if self.turn_state.bags_left == 0 {
                            self.close_open_action();
                        }
                        Ok(self.no_scores())
                    }
                    TurnStateType::None | TurnStateType::Moving => {
                        self.check_can_switch()?;
                        self.begin_action();
                        let bags = self.table.player_boards[seat].bags();
                        self.turn_state.kind = TurnStateType::Bags;
                        self.turn_state.bags_left = bags - 1;
                        self.apply(s)?;
                        Ok(self.no_scores())
                    }
                    _ => deny("That action is not available"),
                }
            }
        }
    }

    fn from_supply(
        &mut self,
        seat: usize,
        s: Subaction,
        now: DateTime<Utc>,
    ) -> Result<Vec<i32>, GameError> {
        match s.dest {
            Location::None => deny("Location has no Type (0)"),
            Location::City { .. } => deny("You can only move pieces from Supply to a Route or Stock"),
            Location::Player {
                seat: to_seat,
                section,
                index,
            } => {
                if to_seat != seat {
                    return deny("You can not move pieces to another player board");
                }
                if section.is_track() {
                    return deny("You can't move on to the level up tracks");
                }
                if section == PlayerSection::Supply {
                    return deny("You can't move pieces within your supply");
                }
                if section.is_token() {
                    return deny("You can't move non tokens here");
                }
                if !self.table.player_boards[seat].stock[index].is_empty() {
                    return deny("There is already a piece in Dest");
                }
                if self.turn_state.kind != TurnStateType::BumpPaying {
                    return deny("You can only move Supply to Stock during bump pay");
                }

                self.turn_state.bumping_cost = self.turn_state.bumping_cost.saturating_sub(1);
                self.apply(s)?;
                if self.turn_state.bumping_cost == 0 {
                    self.turn_state.kind = TurnStateType::Bumping;
                    self.turn_state.bumping_start = now;
                }
                Ok(self.no_scores())
            }
            Location::Route { slot, .. } => {
                if slot != RouteSlot::Spot {
                    return deny("You can not move a piece to the bumped zone");
                }
                let occupant = self.table.get_piece(s.dest)?;
                let occupant_seat = if occupant.is_empty() {
                    None
                } else {
                    Some(self.seat_of_color(occupant.color)?)
                };
                if occupant_seat == Some(seat) {
                    return deny("You can not bump yourself");
                }

                match self.turn_state.kind {
                    TurnStateType::BumpPaying => return deny("You must pay for your bump"),
                    TurnStateType::Clearing => {
                        return deny("You can not place new pieces while clearing route");
                    }
                    TurnStateType::Bumping => {
                        if occupant_seat.is_some() {
                            return deny("You can not bump when resolving a bump");
                        }
                        if self.has_pieces(seat, PlayerSection::Stock) {
                            return deny("Can not replace from supply when there are pieces in stock.");
                        }
                        return self.replace_after_bump(s);
                    }
                    _ => {}
                }

                if occupant_seat.is_some() {
                    let need = if occupant.is_disc() { 3 } else { 2 };
                    let have = self.table.player_boards[seat].count(PlayerSection::Supply, None);
                    if have < need {
                        return deny(format!(
                            "You can not afford that bump (need {need} have {have})"
                        ));
                    }
                }
                self.check_can_switch()?;

                self.begin_action();
                match occupant_seat {
                    None => {
                        self.apply(s)?;
                        self.close_action(ActionType::Place);
                    }
                    Some(bumped_seat) => {
                        self.start_bump(s.dest, occupant, bumped_seat);
                        self.apply(s)?;
                    }
                }
                Ok(self.no_scores())
            }
        }
    }

    fn from_route(
        &mut self,
        seat: usize,
        s: Subaction,
        route: usize,
        index: usize,
        slot: RouteSlot,
    ) -> Result<Vec<i32>, GameError> {
        if s.is_token() || s.piece.is_empty() {
            return deny("You can not move tokens from routes");
        }
        if s.piece.color != self.table.player_boards[seat].color {
            return deny("You can only move your own pieces from routes");
        }
        if slot == RouteSlot::Bumped && self.turn_state.kind != TurnStateType::Bumping {
            return deny("You can only move a bumped piece while resolving the bump");
        }

        match s.dest {
            Location::None => deny("Location has no Type (0)"),
            Location::Route { slot: to_slot, .. } => self.route_to_route(seat, s, slot, to_slot),
            Location::City {
                id,
                index: to,
                slot: city_slot,
            } => match city_slot {
                CitySlot::Virtual => deny("You can not use virtual offices (yet)"),
                CitySlot::Coellen => self.route_to_coellen(seat, s, route, id, to),
                CitySlot::Office => self.route_to_office(seat, s, route, id, to),
            },
            Location::Player {
                seat: to_seat,
                section,
                index: to,
            } => self.route_to_stock(seat, s, route, index, to_seat, section, to),
        }
    }

    fn route_to_route(
        &mut self,
        seat: usize,
        s: Subaction,
        from_slot: RouteSlot,
        to_slot: RouteSlot,
    ) -> Result<Vec<i32>, GameError> {
        if to_slot != RouteSlot::Spot {
            return deny("You can not move a piece to the bumped zone");
        }
        if !self.table.get_piece(s.dest)?.is_empty() {
            return deny("You can not bump while moving");
        }

        match self.turn_state.kind {
            TurnStateType::BumpPaying => deny("You must pay for your bump"),
            TurnStateType::Clearing => deny("You can not move while clearing"),
            TurnStateType::Bumping => {
                if from_slot == RouteSlot::Bumped {
                    if s.source != self.turn_state.bumping_location {
                        return deny("You can only move the piece that was bumped");
                    }
                    if self.turn_state.bumping_moved {
                        return deny("You have already moved your bumped piece");
                    }
                    self.check_bump_landing(s.dest)?;
                    self.turn_state.bumping_moved = true;
                    self.apply(s)?;
                    return Ok(self.no_scores());
                }
                if self.has_pieces(seat, PlayerSection::Stock) {
                    return deny("Can not replace from the board when there are pieces in stock.");
                }
                if self.has_pieces(seat, PlayerSection::Supply) {
                    return deny("Can not replace from the board when there are pieces in supply.");
                }
                self.replace_after_bump(s)
            }
            TurnStateType::Moving => {
                self.turn_state.moves_left = self.turn_state.moves_left.saturating_sub(1);
                self.apply(s)?;
                if self.turn_state.moves_left == 0 {
                    self.close_open_action();
                }
                Ok(self.no_scores())
            }
            TurnStateType::Bags | TurnStateType::None => {
                self.check_can_switch()?;
                self.begin_action();
                let books = self.table.player_boards[seat].books();
                self.turn_state.kind = TurnStateType::Moving;
                self.turn_state.moves_left = books - 1;
                self.apply(s)?;
                Ok(self.no_scores())
            }
            _ => deny("That action is not available"),
        }
    }

    fn route_to_coellen(
        &mut self,
        seat: usize,
        s: Subaction,
        route: usize,
        city: usize,
        spot: usize,
    ) -> Result<Vec<i32>, GameError> {
        let ts = &self.turn_state;
        if ts.kind != TurnStateType::Clearing {
            return deny("Begin clearing the route to take a reward");
        }
        if ts.clearing_award != Award::Coellen {
            return deny("You don't have the Coellen reward");
        }
        if route != ts.clearing_route {
            return deny("Coellen piece must come from the cleared route");
        }
        if !s.piece.is_disc() {
            return deny("Coellen piece must be a disc");
        }
        let target = &self.table.board.cities[city].coellen[spot];
        if !target.piece.is_empty() {
            return deny("There is already a piece in Dest");
        }
        if target.priviledge > self.table.player_boards[seat].priviledge() {
            return deny("You do not have the priviledge for that spot");
        }

        self.turn_state.clearing_award = Award::None;
        self.turn_state.clearing_can_office = false;
        self.apply(s)?;
        if self.clearing_route_empty() {
            self.close_clear();
        }
        Ok(self.no_scores())
    }

    fn route_to_office(
        &mut self,
        seat: usize,
        s: Subaction,
        route: usize,
        city: usize,
        office: usize,
    ) -> Result<Vec<i32>, GameError> {
        let offices = &self.table.board.cities[city].offices;
        let target = &offices[office];
        if !target.piece.is_empty() {
            return deny("Office is not empty");
        }
        if offices[..office].iter().any(|o| o.piece.is_empty()) {
            return deny("Must take leftmost open office");
        }
        if target.shape != s.piece.shape {
            return deny("Piece does not fit in that Office Shape");
        }
        if self.table.player_boards[seat].priviledge() < target.priviledge {
            return deny("You lack the priviledge for that office");
        }
        let points = target.points as i32;

        match self.turn_state.kind {
            TurnStateType::BumpPaying => deny("Finish paying for your bump"),
            TurnStateType::Bumping => deny("You can not be bumped into an office"),
            TurnStateType::Clearing => {
                let ts = &self.turn_state;
                if !ts.clearing_can_office {
                    return deny("You have already taken a clearing reward");
                }
                if !self.table.board.routes[ts.clearing_route].touches(city) {
                    return deny("City is not adjacent to the cleared route");
                }
                if route != ts.clearing_route {
                    return deny("Office piece must come from cleared route");
                }

                self.turn_state.clearing_can_office = false;
                self.turn_state.clearing_award = Award::None;
                let mut deltas = self.no_scores();
                deltas[seat] = points;
                self.apply(s)?;
                deltas[seat] += self.bonus_route_score(seat);
                if self.clearing_route_empty() {
                    self.close_clear();
                }
                Ok(deltas)
            }
            _ => {
                let color = self.table.player_boards[seat].color;
                if !self.table.board.routes[route].is_full_of(color) {
                    return deny("You can't clear a non full route");
                }
                self.check_can_switch()?;

                // Control is scored before the office changes hands.
                let mut deltas = self.control_points(route)?;
                deltas[seat] += points;
                self.begin_action();
                let ts = &mut self.turn_state;
                ts.kind = TurnStateType::Clearing;
                ts.clearing_route = route;
                ts.clearing_can_office = false;
                ts.clearing_award = Award::None;
                self.apply(s)?;
                deltas[seat] += self.bonus_route_score(seat);
                Ok(deltas)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn route_to_stock(
        &mut self,
        seat: usize,
        s: Subaction,
        route: usize,
        from_index: usize,
        to_seat: usize,
        section: PlayerSection,
        to: usize,
    ) -> Result<Vec<i32>, GameError> {
        if to_seat != seat {
            return deny("You can not clear to another player board");
        }
        if section != PlayerSection::Stock {
            return deny("You can only clear from a route to stock");
        }
        if !self.table.player_boards[seat].stock[to].is_empty() {
            return deny("There is already a piece in that subindex");
        }

        match self.turn_state.kind {
            TurnStateType::BumpPaying => deny("Finish paying for your bump"),
            TurnStateType::Bumping => deny("You can not clear while resolving a bump"),
            TurnStateType::Clearing => {
                if route != self.turn_state.clearing_route {
                    return deny("Finish clearing the other route");
                }
                self.apply(s)?;
                let award = self.turn_state.clearing_award;
                if self.clearing_route_empty() && matches!(award, Award::None | Award::Coellen) {
                    self.close_clear();
                }
                Ok(self.no_scores())
            }
            _ => {
                let board = &self.table.player_boards[seat];
                let r = &self.table.board.routes[route];
                if !r.is_full_of(board.color) {
                    return deny("You can't clear a non full route");
                }
                let discs_left = r
                    .spots
                    .iter()
                    .enumerate()
                    .filter(|(i, p)| *i != from_index && p.is_disc())
                    .count();
                self.check_can_switch()?;

                let deltas = self.control_points(route)?;
                let cities = &self.table.board.cities;
                let award = match cities[r.left_city].award {
                    Award::None => cities[r.right_city].award,
                    award => award,
                };
                let award = match award {
                    Award::Coellen if discs_left == 0 => Award::None,
                    Award::Coellen => Award::Coellen,
                    other if !board.can_award(other) => Award::None,
                    other => other,
                };

                self.begin_action();
                let ts = &mut self.turn_state;
                ts.kind = TurnStateType::Clearing;
                ts.clearing_route = route;
                ts.clearing_can_office = true;
                ts.clearing_award = award;
                self.apply(s)?;
                Ok(deltas)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::test_support::*;
    use hansa_protocol::{PlayerColor, Shape};

    fn cube(game: &Game, seat: usize) -> Piece {
        Piece::cube(game.table.player_boards[seat].color)
    }

    fn place(game: &Game, seat: usize, supply: usize, route: usize, spot: usize) -> Subaction {
        let piece = game.table.player_boards[seat].supply[supply];
        Subaction::piece(Location::supply(seat, supply), Location::spot(route, spot), piece)
    }

    #[test]
    fn test_place_spends_an_action() {
        let mut game = running_game(4);
        let s = place(&game, 0, 1, 0, 0);
        let deltas = game.do_subaction(0, s, t0()).unwrap();
        assert_eq!(deltas, vec![0; 4]);
        assert_eq!(game.turn_state.actions_left, 1);
        assert_eq!(game.turn_state.kind, TurnStateType::None);
        assert_eq!(game.history.last().map(|a| a.kind), Some(ActionType::Place));
        assert_eq!(game.table.board.routes[0].spots[0], cube(&game, 0));
    }

    #[test]
    fn test_wrong_seat_rejected() {
        let mut game = running_game(4);
        let s = place(&game, 1, 1, 0, 0);
        assert_eq!(
            game.do_subaction(1, s, t0()),
            Err(GameError::rule(HEADER, "It's not your turn"))
        );
    }

    #[test]
    fn test_source_mismatch_rejected() {
        let mut game = running_game(4);
        let mut s = place(&game, 0, 1, 0, 0);
        s.piece = Piece::disc(s.piece.color);
        assert_eq!(
            game.do_subaction(0, s, t0()),
            Err(GameError::rule("Source Error", "Piece does not exist"))
        );
    }

    #[test]
    fn test_no_actions_left() {
        let mut game = running_game(4);
        game.do_subaction(0, place(&game, 0, 1, 0, 0), t0()).unwrap();
        game.do_subaction(0, place(&game, 0, 2, 0, 1), t0()).unwrap();
        assert_eq!(
            game.do_subaction(0, place(&game, 0, 3, 0, 2), t0()),
            Err(GameError::rule(HEADER, "You have no actions left"))
        );
    }

    #[test]
    fn test_bags_moves_stock_to_supply() {
        let mut game = running_game(4);
        let color = game.table.player_boards[0].color;
        // Seat 0 has 6 cubes in stock and supply slots 6.. empty.
        for (i, stock) in [0, 1, 2].iter().enumerate() {
            let s = Subaction::piece(
                Location::stock(0, *stock),
                Location::supply(0, 6 + i),
                Piece::cube(color),
            );
            game.do_subaction(0, s, t0()).unwrap();
        }
        assert_eq!(game.turn_state.kind, TurnStateType::None);
        assert_eq!(game.turn_state.actions_left, 1);
        assert_eq!(game.history.last().map(|a| a.kind), Some(ActionType::Bags));
        assert_eq!(game.history.last().map(|a| a.subactions.len()), Some(3));
    }

    #[test]
    fn test_move_uses_books() {
        let mut game = running_game(4);
        game.table.board.routes[0].spots[0] = cube(&game, 0);
        game.table.board.routes[0].spots[1] = cube(&game, 0);
        game.table.player_boards[0].supply[1] = Piece::EMPTY;
        game.table.player_boards[0].supply[2] = Piece::EMPTY;
        let c = cube(&game, 0);
        game.do_subaction(
            0,
            Subaction::piece(Location::spot(0, 0), Location::spot(1, 0), c),
            t0(),
        )
        .unwrap();
        assert_eq!(game.turn_state.kind, TurnStateType::Moving);
        assert_eq!(game.turn_state.moves_left, 1);
        game.do_subaction(
            0,
            Subaction::piece(Location::spot(0, 1), Location::spot(1, 1), c),
            t0(),
        )
        .unwrap();
        assert_eq!(game.turn_state.kind, TurnStateType::None);
        assert_eq!(game.turn_state.actions_left, 1);
        assert_eq!(game.history.last().map(|a| a.kind), Some(ActionType::Move));
    }

    #[test]
    fn test_cannot_bump_yourself() {
        let mut game = running_game(4);
        game.do_subaction(0, place(&game, 0, 1, 0, 0), t0()).unwrap();
        assert_eq!(
            game.do_subaction(0, place(&game, 0, 2, 0, 0), t0()),
            Err(GameError::rule(HEADER, "You can not bump yourself"))
        );
    }

    #[test]
    fn test_office_requires_full_route() {
        let mut game = running_game(4);
        let c = cube(&game, 0);
        game.table.board.routes[0].spots[0] = c;
        game.table.board.routes[0].spots[1] = c;
        let s = Subaction::piece(Location::spot(0, 0), Location::office(0, 0), c);
        assert_eq!(
            game.do_subaction(0, s, t0()),
            Err(GameError::rule(HEADER, "You can't clear a non full route"))
        );
    }

    #[test]
    fn test_office_clear_scores_points() {
        let mut game = running_game(4);
        let c = cube(&game, 0);
        for spot in 0..3 {
            game.table.board.routes[0].spots[spot] = c;
        }
        // Groningen's first office is worth a point.
        let take = Subaction::piece(Location::spot(0, 0), Location::office(0, 0), c);
        let deltas = game.do_subaction(0, take, t0()).unwrap();
        assert_eq!(deltas[0], 1);
        assert_eq!(game.turn_state.kind, TurnStateType::Clearing);
        assert!(!game.turn_state.clearing_can_office);

        let wrong = Subaction::piece(Location::spot(0, 1), Location::office(1, 0), c);
        assert_eq!(
            game.do_subaction(0, wrong, t0()),
            Err(GameError::rule(HEADER, "Piece does not fit in that Office Shape"))
        );
        for spot in 1..3 {
            let back = Subaction::piece(Location::spot(0, spot), Location::stock(0, 10 + spot), c);
            game.do_subaction(0, back, t0()).unwrap();
        }
        assert_eq!(game.turn_state.kind, TurnStateType::None);
        assert_eq!(game.table.scores[0], 1);
        assert_eq!(game.history.last().map(|a| a.kind), Some(ActionType::Clear));
        assert_eq!(game.table.board.cities[0].offices[0].piece, c);
    }

    #[test]
    fn test_track_award_after_clear() {
        let mut game = running_game(4);
        let c = cube(&game, 0);
        // Route 0 runs Groningen (Discs award) to Emden.
        for spot in 0..3 {
            game.table.board.routes[0].spots[spot] = c;
        }
        for spot in 0..3 {
            let s = Subaction::piece(Location::spot(0, spot), Location::stock(0, 10 + spot), c);
            game.do_subaction(0, s, t0()).unwrap();
        }
        assert_eq!(game.turn_state.kind, TurnStateType::Clearing);
        assert_eq!(game.turn_state.clearing_award, Award::Discs);

        let disc = Piece::disc(c.color);
        let wrong_track = Subaction::piece(
            Location::player(0, PlayerSection::Keys, 1),
            Location::supply(0, 20),
            c,
        );
        assert_eq!(
            game.do_subaction(0, wrong_track, t0()),
            Err(GameError::rule(HEADER, "Your clearing award is for the Books track"))
        );
        let not_leftmost = Subaction::piece(
            Location::player(0, PlayerSection::Books, 2),
            Location::supply(0, 20),
            disc,
        );
        assert_eq!(
            game.do_subaction(0, not_leftmost, t0()),
            Err(GameError::rule(HEADER, "You must remove the left most piece"))
        );
        let upgrade = Subaction::piece(
            Location::player(0, PlayerSection::Books, 1),
            Location::supply(0, 20),
            disc,
        );
        game.do_subaction(0, upgrade, t0()).unwrap();
        assert_eq!(game.turn_state.kind, TurnStateType::None);
        assert_eq!(game.table.player_boards[0].books(), 3);
    }

    #[test]
    fn test_actions_award_grants_action_now() {
        let mut game = running_game(4);
        let c = cube(&game, 0);
        // Route 31 runs Warburg to Gottingen (Actions award).
        for spot in 0..3 {
            game.table.board.routes[31].spots[spot] = c;
        }
        for spot in 0..3 {
            let s = Subaction::piece(Location::spot(31, spot), Location::stock(0, 10 + spot), c);
            game.do_subaction(0, s, t0()).unwrap();
        }
        assert_eq!(game.turn_state.actions_left, 1);
        let upgrade = Subaction::piece(
            Location::player(0, PlayerSection::Actions, 1),
            Location::supply(0, 20),
            c,
        );
        game.do_subaction(0, upgrade, t0()).unwrap();
        assert_eq!(game.table.player_boards[0].actions(), 3);
        assert_eq!(game.turn_state.actions_left, 2);
    }

    #[test]
    fn test_coellen_reward() {
        let mut game = running_game(4);
        let color = game.table.player_boards[0].color;
        // Route 30 runs Coellen to Warburg.
        game.table.board.routes[30].spots = vec![
            Piece::disc(color),
            Piece::cube(color),
            Piece::cube(color),
            Piece::cube(color),
        ];
        for spot in 1..4 {
            let s = Subaction::piece(
                Location::spot(30, spot),
                Location::stock(0, 10 + spot),
                Piece::cube(color),
            );
            game.do_subaction(0, s, t0()).unwrap();
        }
        assert_eq!(game.turn_state.clearing_award, Award::Coellen);
        let too_high = Subaction::piece(Location::spot(30, 0), Location::coellen(22, 1), Piece::disc(color));
        assert_eq!(
            game.do_subaction(0, too_high, t0()),
            Err(GameError::rule(HEADER, "You do not have the priviledge for that spot"))
        );
        let take = Subaction::piece(Location::spot(30, 0), Location::coellen(22, 0), Piece::disc(color));
        game.do_subaction(0, take, t0()).unwrap();
        assert_eq!(game.turn_state.kind, TurnStateType::None);
        assert_eq!(game.table.board.cities[22].coellen[0].piece, Piece::disc(color));
    }

    #[test]
    fn test_tokens_cannot_leave_routes() {
        let mut game = running_game(4);
        let route = game
            .table
            .board
            .routes
            .iter()
            .position(|r| r.start_token)
            .unwrap();
        let token = game.table.board.routes[route].token;
        let s = Subaction::token(
            Location::spot(route, 0),
            Location::player(0, PlayerSection::TokenUnused, 0),
            token,
        );
        assert_eq!(
            game.do_subaction(0, s, t0()),
            Err(GameError::rule(HEADER, "You can not move tokens from routes"))
        );
    }

    #[test]
    fn test_bumped_zone_is_not_a_target() {
        let mut game = running_game(4);
        let piece = game.table.player_boards[0].supply[1];
        let s = Subaction::piece(Location::supply(0, 1), Location::bumped(0, 0), piece);
        assert_eq!(
            game.do_subaction(0, s, t0()),
            Err(GameError::rule(HEADER, "You can not move a piece to the bumped zone"))
        );
        assert_eq!(piece.shape, Shape::Cube);
        assert_ne!(piece.color, PlayerColor::None);
    }
}
