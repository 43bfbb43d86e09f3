//! Static board layouts, loaded from YAML.

use hansa_protocol::{Award, Piece, Priviledge, Shape};
use serde::Deserialize;
use thiserror::Error;

use crate::board::{Board, Route};
use crate::city::{City, CoellenSpot, Office};

#[derive(Debug, Error)]
pub enum BoardDataError {
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("route {route} references missing city {city}")]
    MissingCity { route: usize, city: usize },
    #[error("route {0} has no spots")]
    EmptyRoute(usize),
}

#[derive(Debug, Deserialize)]
struct RawBoard {
    name: String,
    cities: Vec<RawCity>,
    routes: Vec<RawRoute>,
}

#[derive(Debug, Deserialize)]
struct RawCity {
    name: String,
    offices: Vec<RawOffice>,
    #[serde(default)]
    award: Award,
    #[serde(default)]
    bonus_terminus: bool,
    #[serde(default)]
    coellen: Vec<RawCoellenSpot>,
}

#[derive(Debug, Deserialize)]
struct RawOffice {
    shape: Shape,
    priviledge: Priviledge,
    #[serde(default)]
    points: u32,
}

#[derive(Debug, Deserialize)]
struct RawCoellenSpot {
    priviledge: Priviledge,
    points: u32,
}

#[derive(Debug, Deserialize)]
struct RawRoute {
    left: usize,
    right: usize,
    spots: usize,
    #[serde(default)]
    start_token: bool,
}

/// Parse a board layout. City and route ids are their positions in the file.
pub fn load_board(yaml: &str) -> Result<Board, BoardDataError> {
    let raw: RawBoard = serde_yaml::from_str(yaml)?;

    let cities: Vec<City> = raw
        .cities
        .into_iter()
        .enumerate()
        .map(|(id, c)| City {
            id,
            name: c.name,
            offices: c
                .offices
                .into_iter()
                .map(|o| Office {
                    shape: o.shape,
                    priviledge: o.priviledge,
                    points: o.points,
                    piece: Piece::EMPTY,
                })
                .collect(),
            virtual_offices: Vec::new(),
            coellen: c
                .coellen
                .into_iter()
                .map(|s| CoellenSpot {
                    priviledge: s.priviledge,
                    points: s.points,
                    piece: Piece::EMPTY,
                })
                .collect(),
            award: c.award,
            bonus_terminus: c.bonus_terminus,
        })
        .collect();

    let mut routes = Vec::with_capacity(raw.routes.len());
    for (id, r) in raw.routes.into_iter().enumerate() {
        for city in [r.left, r.right] {
            if city >= cities.len() {
                return Err(BoardDataError::MissingCity { route: id, city });
            }
        }
        if r.spots == 0 {
            return Err(BoardDataError::EmptyRoute(id));
        }
        routes.push(Route {
            id,
            left_city: r.left,
            right_city: r.right,
            spots: vec![Piece::EMPTY; r.spots],
            bumped: vec![Piece::EMPTY; r.spots],
            token: Default::default(),
            start_token: r.start_token,
        });
    }

    Ok(Board {
        name: raw.name,
        cities,
        routes,
    })
}

/// The 4-5 player base board.
pub fn base45() -> Result<Board, BoardDataError> {
    load_board(include_str!("../data/base45.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base45_details() {
        let board = base45().unwrap();
        assert_eq!(board.name, "Base45");
        let coellen = &board.cities[22];
        assert_eq!(coellen.name, "Coellen");
        assert_eq!(coellen.award, Award::Coellen);
        let points: Vec<u32> = coellen.coellen.iter().map(|s| s.points).collect();
        assert_eq!(points, vec![7, 8, 9, 11]);
        assert_eq!(board.cities[0].offices[0].points, 1);
        assert_eq!(board.cities[26].award, Award::Keys);
        assert_eq!(board.routes[33].spots.len(), 4);
        assert_eq!(board.routes[8].bumped.len(), 2);
    }

    #[test]
    fn test_rejects_dangling_route() {
        let yaml = "name: Tiny\ncities:\n  - name: A\n    offices: []\nroutes:\n  - { left: 0, right: 3, spots: 2 }\n";
        assert!(matches!(
            load_board(yaml),
            Err(BoardDataError::MissingCity { route: 0, city: 3 })
        ));
    }
}
