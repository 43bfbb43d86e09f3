//! Board topology and the graph queries over it.

use std::collections::{HashSet, VecDeque};

use hansa_protocol::{Location, Piece, PlayerColor, Token};
use serde::{Deserialize, Serialize};

use crate::city::City;
use crate::error::InvariantViolation;

/// Hop bound for the bump landing search.
pub const MAX_BUMP_HOPS: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub id: usize,
    pub left_city: usize,
    pub right_city: usize,
    pub spots: Vec<Piece>,
    /// Staging zone parallel to `spots`
    pub bumped: Vec<Piece>,
    #[serde(default)]
    pub token: Token,
    #[serde(default)]
    pub start_token: bool,
}

impl Route {
    pub fn touches(&self, city: usize) -> bool {
        self.left_city == city || self.right_city == city
    }

    /// Two routes are adjacent when they share a city.
    pub fn adjacent(&self, other: &Route) -> bool {
        self.touches(other.left_city) || self.touches(other.right_city)
    }

    pub fn is_empty(&self) -> bool {
        self.spots.iter().all(Piece::is_empty)
    }

    /// Every spot holds a piece of `color`.
    pub fn is_full_of(&self, color: PlayerColor) -> bool {
        self.spots.iter().all(|p| !p.is_empty() && p.color == color)
    }

    pub fn holds(&self, color: PlayerColor) -> bool {
        self.spots.iter().any(|p| !p.is_empty() && p.color == color)
    }

    pub fn open_spots(&self) -> impl Iterator<Item = usize> + '_ {
        self.spots
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_empty())
            .map(|(i, _)| i)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub name: String,
    pub cities: Vec<City>,
    pub routes: Vec<Route>,
}

impl Board {
    pub fn adjacent_cities(&self, a: usize, b: usize) -> bool {
        self.routes.iter().any(|r| r.touches(a) && r.touches(b))
    }

    /// The two cities that anchor the bonus route.
    pub fn bonus_termini(&self) -> Option<(usize, usize)> {
        let mut termini = self.cities.iter().filter(|c| c.bonus_terminus);
        let start = termini.next()?.id;
        let end = termini.next()?.id;
        Some((start, end))
    }

    /// Whether `color` connects the two bonus termini through cities where
    /// it has presence.
    pub fn bonus_route_completed(&self, color: PlayerColor) -> bool {
        let Some((start, end)) = self.bonus_termini() else {
            return false;
        };
        if self.cities[start].presence(color) == 0 || self.cities[end].presence(color) == 0 {
            return false;
        }
        let component = self.component(start, |c| c.presence(color));
        component.contains(&end)
    }

    pub fn filled_city_count(&self) -> usize {
        self.cities.iter().filter(|c| c.is_filled()).count()
    }

    /// Presence summed over the largest connected network of `color`.
    /// Does not include the keys multiplier.
    pub fn network_score(&self, color: PlayerColor) -> usize {
        self.largest_network(|c| c.presence(color))
    }

    /// Network score as if `color` held one more office in `city`.
    pub fn network_score_if_city(&self, color: PlayerColor, city: usize) -> usize {
        self.largest_network(|c| {
            if c.id == city {
                c.presence(color) + 1
            } else {
                c.presence(color)
            }
        })
    }

    fn largest_network(&self, presence: impl Fn(&City) -> usize) -> usize {
        let mut seen = HashSet::new();
        let mut best = 0;
        for city in &self.cities {
            if presence(city) == 0 || seen.contains(&city.id) {
                continue;
            }
            let component = self.component(city.id, &presence);
            let score = component.iter().map(|id| presence(&self.cities[*id])).sum();
            best = best.max(score);
            seen.extend(component);
        }
        best
    }

    /// Cities reachable from `start` through cities with nonzero presence.
    fn component(&self, start: usize, presence: impl Fn(&City) -> usize) -> HashSet<usize> {
        let mut found = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for city in &self.cities {
                if found.contains(&city.id) || presence(city) == 0 {
                    continue;
                }
                if self.adjacent_cities(current, city.id) {
                    found.insert(city.id);
                    queue.push_back(city.id);
                }
            }
        }
        found
    }

    /// Empty spots on the nearest routes (by shared-city hops) that have any,
    /// excluding the route `location` is on.
    pub fn valid_bumps(&self, location: Location) -> Result<Vec<Location>, InvariantViolation> {
        let origin = location
            .route_id()
            .filter(|id| *id < self.routes.len())
            .ok_or(InvariantViolation::MissingLocation(location))?;

        let mut visited = vec![false; self.routes.len()];
        visited[origin] = true;
        let mut frontier = vec![origin];
        for _ in 0..=MAX_BUMP_HOPS {
            let mut next = Vec::new();
            for r in &frontier {
                for candidate in &self.routes {
                    if !visited[candidate.id] && self.routes[*r].adjacent(candidate) {
                        visited[candidate.id] = true;
                        next.push(candidate.id);
                    }
                }
            }
            next.sort_unstable();
            let open: Vec<Location> = next
                .iter()
                .flat_map(|r| self.routes[*r].open_spots().map(|i| Location::spot(*r, i)))
                .collect();
            if !open.is_empty() {
                return Ok(open);
            }
            frontier = next;
        }
        Err(InvariantViolation::BumpSearchExhausted {
            route: origin,
            hops: MAX_BUMP_HOPS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board_data::base45;

    #[test]
    fn test_base_board_shape() {
        let board = base45().unwrap();
        assert_eq!(board.cities.len(), 27);
        assert_eq!(board.routes.len(), 34);
        assert_eq!(board.bonus_termini(), Some((9, 16)));
        assert_eq!(board.routes.iter().filter(|r| r.start_token).count(), 3);
        assert_eq!(board.filled_city_count(), 0);
    }

    #[test]
    fn test_valid_bumps_nearest_tier() {
        let board = base45().unwrap();
        // Route 25 (Duisburg-Dortmund) touches routes 16 and 26.
        let open = board.valid_bumps(Location::spot(25, 0)).unwrap();
        let routes: HashSet<usize> = open.iter().filter_map(|l| l.route_id()).collect();
        assert_eq!(routes, HashSet::from([16, 26]));
        assert_eq!(open.len(), 6);
    }

    #[test]
    fn test_valid_bumps_skips_full_tier() {
        let mut board = base45().unwrap();
        for r in [16, 26] {
            for spot in board.routes[r].spots.iter_mut() {
                *spot = Piece::cube(PlayerColor::Red);
            }
        }
        let open = board.valid_bumps(Location::spot(25, 0)).unwrap();
        assert!(open.iter().all(|l| !matches!(l.route_id(), Some(16 | 25 | 26))));
        assert!(!open.is_empty());
    }

    #[test]
    fn test_valid_bumps_rejects_non_route() {
        let board = base45().unwrap();
        assert!(board.valid_bumps(Location::stock(0, 0)).is_err());
    }

    #[test]
    fn test_network_and_bonus_route() {
        let mut board = base45().unwrap();
        let red = PlayerColor::Red;
        // Arnheim - Munster - Minden - Brunswick - Stendal
        for (city, office) in [(9, 0), (11, 1), (12, 0), (15, 0), (16, 0)] {
            board.cities[city].offices[office].piece = Piece::cube(red);
        }
        assert!(board.bonus_route_completed(red));
        assert_eq!(board.network_score(red), 5);
        assert_eq!(board.network_score_if_city(red, 13), 6);
        // Hildesheim is not adjacent to the network
        assert_eq!(board.network_score_if_city(red, 14), 5);

        board.cities[15].offices[0].piece = Piece::EMPTY;
        assert!(!board.bonus_route_completed(red));
        assert_eq!(board.network_score(red), 3);
    }
}
