//! Scratch recording of a plan against the live table.
//!
//! Every step is applied as it is recorded so the next step sees its effect;
//! `finish` undoes the lot. A sketch never outlives one plan generation.

use hansa_protocol::{Award, Location, Piece, PlayerColor, PlayerSection, Shape, Subaction};

use super::plan::{Step, StepKind};
use crate::board::Route;
use crate::error::InvariantViolation;
use crate::player_board::{PlayerBoard, NO_PIECE};
use crate::table::Table;

/// Outcome of one fill attempt: actions spent and whether the spot was filled.
pub(super) type Fill = (u32, bool);

/// How much of `route` is mine, 0 to 100.
pub(super) fn route_value(route: &Route, color: PlayerColor) -> i32 {
    let mine = route.spots.iter().filter(|p| p.color == color).count();
    (mine * 100 / route.spots.len().max(1)) as i32
}

/// Award the engine grants for clearing `route`: left city's first.
pub(super) fn route_award(table: &Table, route: usize) -> Award {
    let r = &table.board.routes[route];
    match table.board.cities[r.left_city].award {
        Award::None => table.board.cities[r.right_city].award,
        award => award,
    }
}

pub(super) struct Sketch<'t> {
    pub table: &'t mut Table,
    seat: usize,
    pub color: PlayerColor,
    pub steps: Vec<Step>,
}

impl<'t> Sketch<'t> {
    pub fn new(table: &'t mut Table, seat: usize) -> Self {
        let color = table.player_boards[seat].color;
        Self {
            table,
            seat,
            color,
            steps: Vec::new(),
        }
    }

    pub fn board(&self) -> &PlayerBoard {
        &self.table.player_boards[self.seat]
    }

    pub fn push(&mut self, kind: StepKind, subaction: Subaction) -> Result<(), InvariantViolation> {
        self.table.apply_subaction(&subaction)?;
        self.steps.push(Step { kind, subaction });
        Ok(())
    }

    /// Roll the table back and hand over the recorded steps.
    pub fn finish(self) -> Result<Vec<Step>, InvariantViolation> {
        let subactions: Vec<Subaction> = self.steps.iter().map(|s| s.subaction).collect();
        self.table.undo_subactions(&subactions)?;
        Ok(self.steps)
    }

    pub fn piece(&self, shape: Shape) -> Piece {
        Piece::new(self.color, shape)
    }

    pub fn find(&self, section: PlayerSection, piece: Piece) -> Option<Location> {
        self.board()
            .section(section)?
            .iter()
            .position(|p| *p == piece)
            .map(|i| Location::player(self.seat, section, i))
    }

    fn open(&self, section: PlayerSection) -> Option<Location> {
        self.board()
            .open_slot(section)
            .map(|i| Location::player(self.seat, section, i))
    }

    fn count(&self, section: PlayerSection) -> usize {
        self.board().count(section, None)
    }

    fn holds(&self, section: PlayerSection, shape: Shape) -> bool {
        shape == Shape::None || self.board().find(section, shape).is_some()
    }

    /// A supply piece of `shape`; any shape means cubes before discs.
    pub fn supply_piece(&self, shape: Shape) -> Option<(Piece, Location)> {
        let shapes: &[Shape] = match shape {
            Shape::None => &[Shape::Cube, Shape::Disc],
            Shape::Cube => &[Shape::Cube],
            Shape::Disc => &[Shape::Disc],
        };
        shapes.iter().find_map(|s| {
            let piece = self.piece(*s);
            self.find(PlayerSection::Supply, piece).map(|l| (piece, l))
        })
    }

    /// One Bags action: the required shape first, then discs before cubes.
    /// Returns how many pieces moved.
    pub fn bags(&mut self, shape: Shape) -> Result<u32, InvariantViolation> {
        let budget = self.board().bags();
        let mut moved = 0;
        if shape != Shape::None {
            let piece = self.piece(shape);
            let (Some(from), Some(to)) = (
                self.find(PlayerSection::Stock, piece),
                self.open(PlayerSection::Supply),
            ) else {
                return Ok(0);
            };
            self.push(StepKind::Bags, Subaction::piece(from, to, piece))?;
            moved += 1;
        }
        while moved < budget {
            let next = [Shape::Disc, Shape::Cube].iter().find_map(|s| {
                let piece = self.piece(*s);
                self.find(PlayerSection::Stock, piece).map(|l| (piece, l))
            });
            let (Some((piece, from)), Some(to)) = (next, self.open(PlayerSection::Supply)) else {
                break;
            };
            self.push(StepKind::Bags, Subaction::piece(from, to, piece))?;
            moved += 1;
        }
        Ok(moved)
    }

    /// Place onto an open spot, bagging first when supply lacks the piece.
    /// With a single action left a needed bags is all that happens.
    pub fn place(&mut self, dest: Location, shape: Shape, last_action: bool) -> Result<Fill, InvariantViolation> {
        let mut used = 1;
        if self.supply_piece(shape).is_none() {
            if self.bags(shape)? == 0 {
                return Ok((0, false));
            }
            if last_action {
                return Ok((1, false));
            }
            used = 2;
        }
        let Some((piece, from)) = self.supply_piece(shape) else {
            return Ok((used - 1, false));
        };
        self.push(StepKind::Place, Subaction::piece(from, dest, piece))?;
        Ok((used, true))
    }

    /// Bump the occupant of `dest` and pay for it, cubes before discs.
    pub fn bump(
        &mut self,
        dest: Location,
        shape: Shape,
        bumped_disc: bool,
        last_action: bool,
    ) -> Result<Fill, InvariantViolation> {
        let needed = if bumped_disc { 3 } else { 2 };
        let mut used = 1;
        if self.count(PlayerSection::Supply) < needed || !self.holds(PlayerSection::Supply, shape) {
            let total = self.count(PlayerSection::Supply) + self.count(PlayerSection::Stock);
            let has_shape =
                self.holds(PlayerSection::Supply, shape) || self.holds(PlayerSection::Stock, shape);
            if total < needed || !has_shape {
                return Ok((0, false));
            }
            if self.bags(shape)? == 0 {
                return Ok((0, false));
            }
            if last_action {
                return Ok((1, false));
            }
            used = 2;
            if self.count(PlayerSection::Supply) < needed || !self.holds(PlayerSection::Supply, shape) {
                return Ok((1, false));
            }
        }

        let Some((piece, from)) = self.supply_piece(shape) else {
            return Ok((used - 1, false));
        };
        self.push(StepKind::Bump, Subaction::piece(from, dest, piece))?;
        for _ in 1..needed {
            let (Some((piece, from)), Some(to)) =
                (self.supply_piece(Shape::None), self.open(PlayerSection::Stock))
            else {
                return Err(InvariantViolation::UnpaidBump(dest));
            };
            self.push(StepKind::BumpPay, Subaction::piece(from, to, piece))?;
        }
        Ok((used, true))
    }

    fn staged(&self, route: usize) -> bool {
        self.steps
            .iter()
            .any(|s| s.subaction.dest.route_id() == Some(route))
    }

    /// My least valuable piece outside `target` that is free to move.
    pub fn donor(&self, target: usize) -> Option<(Location, Piece, i32)> {
        let color = self.color;
        self.table
            .board
            .routes
            .iter()
            .filter(|r| r.id != target && !r.is_full_of(color) && !self.staged(r.id))
            .filter(|r| r.bumped.iter().all(Piece::is_empty))
            .filter_map(|r| {
                let i = r.spots.iter().position(|p| p.color == color)?;
                Some((r, i))
            })
            .min_by_key(|(r, _)| route_value(r, color))
            .map(|(r, i)| (Location::spot(r.id, i), r.spots[i], route_value(r, color)))
    }

    /// Move a donor piece onto `dest`. Returns the value differential.
    pub fn move_into(&mut self, dest: Location, target: usize) -> Result<Option<i32>, InvariantViolation> {
        let Some((from, piece, from_value)) = self.donor(target) else {
            return Ok(None);
        };
        let route = &self.table.board.routes[target];
        let mine = route.spots.iter().filter(|p| p.color == self.color).count();
        let to_value = ((mine + 1) * 100 / route.spots.len().max(1)) as i32;
        self.push(StepKind::Move, Subaction::piece(from, dest, piece))?;
        Ok(Some(to_value - from_value))
    }

    /// Clear a full route to stock, then claim the track award the engine
    /// will insist on.
    pub fn clear(&mut self, route: usize) -> Result<(), InvariantViolation> {
        let spots = self.table.board.routes[route].spots.len();
        for i in 0..spots {
            let piece = self.table.board.routes[route].spots[i];
            let to = self
                .open(PlayerSection::Stock)
                .ok_or(InvariantViolation::MissingLocation(Location::stock(self.seat, 0)))?;
            self.push(StepKind::Clear, Subaction::piece(Location::spot(route, i), to, piece))?;
        }

        let award = route_award(self.table, route);
        if !self.board().can_award(award) {
            return Ok(());
        }
        let Some((section, index)) = self.board().award_clear_location(award) else {
            return Ok(());
        };
        if index == NO_PIECE {
            return Err(InvariantViolation::EmptyTrack(section.name()));
        }
        let piece = self.board().section(section).map(|s| s[index]).unwrap_or_default();
        let to = self
            .open(PlayerSection::Supply)
            .ok_or(InvariantViolation::MissingLocation(Location::supply(self.seat, 0)))?;
        self.push(
            StepKind::Award,
            Subaction::piece(Location::player(self.seat, section, index), to, piece),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board_data::base45;
    use crate::player_board::new_base_player_boards;

    fn table() -> Table {
        let mut table = Table::new(base45().unwrap(), new_base_player_boards());
        table.player_boards.truncate(4);
        table.scores = vec![0; 4];
        let color = table.player_boards[0].color;
        table.player_boards[0].supply[0] = Piece::disc(color);
        for i in 1..4 {
            table.player_boards[0].supply[i] = Piece::cube(color);
        }
        for i in 0..5 {
            table.player_boards[0].stock[i] = Piece::cube(color);
        }
        table
    }

    #[test]
    fn test_finish_restores_table() {
        let mut table = table();
        let before = table.clone();
        let mut sketch = Sketch::new(&mut table, 0);
        sketch.bags(Shape::None).unwrap();
        let (used, done) = sketch.place(Location::spot(0, 0), Shape::Disc, false).unwrap();
        assert_eq!((used, done), (1, true));
        let steps = sketch.finish().unwrap();
        assert_eq!(steps.len(), 4);
        assert_eq!(table, before);
    }

    #[test]
    fn test_bags_prefers_required_shape_then_discs() {
        let mut table = table();
        let color = table.player_boards[0].color;
        table.player_boards[0].stock[7] = Piece::disc(color);
        let mut sketch = Sketch::new(&mut table, 0);
        assert_eq!(sketch.bags(Shape::Cube).unwrap(), 3);
        let moved: Vec<Shape> = sketch.steps.iter().map(|s| s.subaction.piece.shape).collect();
        assert_eq!(moved, vec![Shape::Cube, Shape::Disc, Shape::Cube]);
    }

    #[test]
    fn test_bump_pays_cubes_first() {
        let mut table = table();
        let rival = table.player_boards[1].color;
        table.board.routes[0].spots[1] = Piece::cube(rival);
        let mut sketch = Sketch::new(&mut table, 0);
        let fill = sketch.bump(Location::spot(0, 1), Shape::None, false, false).unwrap();
        assert_eq!(fill, (1, true));
        let kinds: Vec<StepKind> = sketch.steps.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![StepKind::Bump, StepKind::BumpPay]);
        assert_eq!(sketch.steps[1].subaction.piece.shape, Shape::Cube);
        assert_eq!(sketch.table.board.routes[0].bumped[1], Piece::cube(rival));
    }

    #[test]
    fn test_clear_claims_track_award() {
        let mut table = table();
        let color = table.player_boards[0].color;
        // Groningen awards Discs, which upgrades the Books track.
        for spot in table.board.routes[0].spots.iter_mut() {
            *spot = Piece::cube(color);
        }
        let mut sketch = Sketch::new(&mut table, 0);
        sketch.clear(0).unwrap();
        let last = sketch.steps.last().unwrap();
        assert_eq!(last.kind, StepKind::Award);
        assert_eq!(
            last.subaction.source,
            Location::player(0, PlayerSection::Books, 1)
        );
        assert!(sketch.table.board.routes[0].is_empty());
    }

    #[test]
    fn test_donor_is_least_valuable_piece() {
        let mut table = table();
        let color = table.player_boards[0].color;
        table.board.routes[5].spots[0] = Piece::cube(color);
        table.board.routes[5].spots[1] = Piece::cube(color);
        table.board.routes[2].spots[3] = Piece::cube(color);
        let sketch = Sketch::new(&mut table, 0);
        let (from, _, value) = sketch.donor(0).unwrap();
        assert_eq!(from, Location::spot(2, 3));
        assert_eq!(value, 25);
        assert!(sketch.donor(2).is_some());
    }
}
