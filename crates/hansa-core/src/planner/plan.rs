use hansa_protocol::Subaction;
use serde::{Deserialize, Serialize};

use super::fitness::Fitness;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Goal {
    /// Clear the route and take the adjacent city's award.
    Award,
    /// Clear the route into an office of either end city.
    Office,
    /// Clear the route for control points.
    Points,
    /// Sit on a route only opponents use.
    Block,
}

impl Goal {
    pub const ALL: [Goal; 4] = [Goal::Award, Goal::Office, Goal::Points, Goal::Block];
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum PlanLength {
    /// Done with actions to spare.
    Short,
    /// Done, cleared, using every action.
    Full,
    /// Route filled but the clear is left for next turn.
    Almost,
    /// Uses every action and does not finish.
    Long,
    /// Cannot finish even with actions to spare.
    Uncompletable,
}

impl PlanLength {
    pub fn name(self) -> &'static str {
        match self {
            PlanLength::Short => "Short",
            PlanLength::Full => "Full",
            PlanLength::Almost => "Almost",
            PlanLength::Long => "Long",
            PlanLength::Uncompletable => "Uncompletable",
        }
    }
}

/// What a planned subaction is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    Place,
    Bump,
    BumpPay,
    Bags,
    Move,
    Clear,
    Award,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub kind: StepKind,
    pub subaction: Subaction,
}

/// A candidate for some of this turn's actions.
#[derive(Clone, Debug, PartialEq)]
pub struct Plan {
    pub route: usize,
    pub goal: Goal,
    pub length: PlanLength,
    /// Actions the plan spends.
    pub actions: u32,
    /// Moves still open at the end of the plan, free for the next one.
    pub leftover_moves: u32,
    pub fitness: Fitness,
    pub value: f64,
    pub description: String,
    pub steps: Vec<Step>,
    /// Index of the last payment step of each bump. Execution hands control
    /// to the bumped player right after the first of these.
    pub handoffs: Vec<usize>,
}

impl Plan {
    /// Steps that run before control passes to someone else.
    pub fn executable(&self) -> &[Step] {
        match self.handoffs.first() {
            Some(i) => &self.steps[..=*i],
            None => &self.steps,
        }
    }

    pub fn hands_off(&self) -> bool {
        !self.handoffs.is_empty()
    }

    pub fn subactions(&self) -> impl Iterator<Item = Subaction> + '_ {
        self.steps.iter().map(|s| s.subaction)
    }
}

/// What the bot sends, in the same shape a human client would.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Subaction(Subaction),
    EndBump,
    EndTurn,
}
