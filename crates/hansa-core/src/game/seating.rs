//! Seating changes while a game is still being created.

use hansa_protocol::{GameStatus, Identity};
use tracing::debug;

use super::{Game, MAX_SEATS};
use crate::error::GameError;

const HEADER: &str = "Sitdown Error";

fn deny(content: impl Into<String>) -> Result<(), GameError> {
    Err(GameError::rule(HEADER, content))
}

impl Game {
    /// Sit `who` down at `index`, or stand them up from it.
    pub fn sitdown(&mut self, who: &Identity, index: i32, sitdown: bool) -> Result<(), GameError> {
        if self.status != GameStatus::Creating {
            return deny("You can only stand up when a game is 'Creating'");
        }
        let sitting = self.seat_of(who).is_some();
        if sitting && sitdown {
            return deny("You are already sitting at this game");
        }
        if !sitting && !sitdown {
            return deny("You can not stand up: you are not sitting at this game");
        }
        let Some(seat) = seat_index(index) else {
            return deny("Not a valid seat (expecting [0-4])");
        };
        self.change_seat(who, seat, sitdown, "You are not sitting there")
    }

    /// The creator seats or removes a bot.
    pub fn sitdown_bot(
        &mut self,
        requester: &Identity,
        bot: &Identity,
        index: i32,
        sitdown: bool,
    ) -> Result<(), GameError> {
        if self.status != GameStatus::Creating {
            return deny("A Bot can only sit down when a game is 'Creating'");
        }
        if *requester != self.creator {
            return deny(format!(
                "Only the game creator ({}) may add/remove bots",
                self.creator.name
            ));
        }
        let sitting = self.seat_of(bot).is_some();
        if sitting && sitdown {
            return deny(format!("{} is already sitting at this game", bot.name));
        }
        if !sitting && !sitdown {
            return deny(format!("{} can not stand up: not sitting at this game", bot.name));
        }
        let Some(seat) = seat_index(index) else {
            return deny(format!("Seat does not exist: {index}"));
        };
        self.change_seat(bot, seat, sitdown, "Bot is not sitting there")
    }

    fn change_seat(
        &mut self,
        who: &Identity,
        seat: usize,
        sitdown: bool,
        not_there: &str,
    ) -> Result<(), GameError> {
        let current = &self.table.player_boards[seat].identity;
        if sitdown {
            if !current.is_empty() {
                return deny(format!("{} is already there", current.name));
            }
            debug!(game = self.id, identity = %who.id, seat, "sat down");
            self.table.player_boards[seat].identity = who.clone();
        } else {
            if current != who {
                return deny(not_there);
            }
            debug!(game = self.id, identity = %who.id, seat, "stood up");
            self.table.player_boards[seat].identity = Identity::default();
        }
        Ok(())
    }
}

fn seat_index(index: i32) -> Option<usize> {
    usize::try_from(index).ok().filter(|i| *i < MAX_SEATS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board_data::base45;
    use crate::game::test_support::creator;

    fn game() -> Game {
        Game::new(2, creator(), base45().unwrap())
    }

    fn rule(content: &str) -> GameError {
        GameError::rule(HEADER, content)
    }

    #[test]
    fn test_sit_and_stand() {
        let mut g = game();
        let bo = Identity::new("P2", "Bo");
        g.sitdown(&bo, 2, true).unwrap();
        assert_eq!(g.seat_of(&bo), Some(2));
        assert_eq!(
            g.sitdown(&bo, 3, true),
            Err(rule("You are already sitting at this game"))
        );
        assert_eq!(
            g.sitdown(&creator(), 2, true),
            Err(rule("Bo is already there"))
        );
        g.sitdown(&creator(), 0, true).unwrap();
        assert_eq!(
            g.sitdown(&bo, 0, false),
            Err(rule("You are not sitting there"))
        );
        g.sitdown(&bo, 2, false).unwrap();
        assert_eq!(g.seat_of(&bo), None);
        assert_eq!(
            g.sitdown(&bo, 2, false),
            Err(rule("You can not stand up: you are not sitting at this game"))
        );
    }

    #[test]
    fn test_seat_bounds() {
        let mut g = game();
        let bo = Identity::new("P2", "Bo");
        assert_eq!(
            g.sitdown(&bo, 5, true),
            Err(rule("Not a valid seat (expecting [0-4])"))
        );
        assert_eq!(
            g.sitdown(&bo, -1, true),
            Err(rule("Not a valid seat (expecting [0-4])"))
        );
    }

    #[test]
    fn test_bots_need_creator() {
        let mut g = game();
        let bot = Identity::bot("B1", "Derek (Bot)");
        assert_eq!(
            g.sitdown_bot(&Identity::new("P2", "Bo"), &bot, 1, true),
            Err(rule("Only the game creator (Ada) may add/remove bots"))
        );
        g.sitdown_bot(&creator(), &bot, 1, true).unwrap();
        assert_eq!(g.identity_at(1), Some(&bot));
        assert_eq!(
            g.sitdown_bot(&creator(), &bot, 9, false),
            Err(rule("Seat does not exist: 9"))
        );
        assert_eq!(
            g.sitdown_bot(&creator(), &bot, 2, false),
            Err(rule("Bot is not sitting there"))
        );
        g.sitdown_bot(&creator(), &bot, 1, false).unwrap();
        assert_eq!(g.identity_at(1), None);
    }

    #[test]
    fn test_no_seating_after_start() {
        let mut g = crate::game::test_support::running_game(4);
        assert_eq!(
            g.sitdown(&Identity::new("P9", "Zed"), 4, true),
            Err(rule("You can only stand up when a game is 'Creating'"))
        );
    }
}
