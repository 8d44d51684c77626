//! Trigger boundary: the periodic caller polls `check_upkeep` and, when it
//! reports true, calls `perform_upkeep` to start the draw.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::clock::UnixTimestamp;

use crate::{
    error::RaffleError,
    machine::RaffleStateMachine,
    policy,
    state::{RaffleState, RequestId, Round},
    vrf::RandomnessOracle,
};

/// Answer to a poll, set as return data by the `CheckUpkeep` instruction
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpkeepCheck {
    pub upkeep_needed: bool,
    pub pot: u64,
    pub players: u64,
    pub state: RaffleState,
}

pub fn check_upkeep(round: &Round, now: UnixTimestamp) -> UpkeepCheck {
    UpkeepCheck {
        upkeep_needed: policy::is_draw_eligible(round, now),
        pot: round.pot(),
        players: round.number_of_players(),
        state: round.state(),
    }
}

/// What a trigger drives.
pub trait UpkeepTrigger {
    fn check_upkeep(&self, now: UnixTimestamp) -> UpkeepCheck;

    /// Starts the draw; rejected with `UpkeepNotNeeded` when ineligible, no
    /// matter how often it is called.
    fn perform_upkeep(
        &mut self,
        now: UnixTimestamp,
        oracle: &mut dyn RandomnessOracle,
    ) -> Result<RequestId, RaffleError>;
}

impl UpkeepTrigger for RaffleStateMachine {
    fn check_upkeep(&self, now: UnixTimestamp) -> UpkeepCheck {
        check_upkeep(self.round(), now)
    }

    fn perform_upkeep(
        &mut self,
        now: UnixTimestamp,
        oracle: &mut dyn RandomnessOracle,
    ) -> Result<RequestId, RaffleError> {
        self.initiate_draw(now, oracle)
    }
}

/// One tick of a trigger: start a draw if one is due.
pub fn poll<T>(
    trigger: &mut T,
    now: UnixTimestamp,
    oracle: &mut dyn RandomnessOracle,
) -> Result<Option<RequestId>, RaffleError>
where
    T: UpkeepTrigger + ?Sized,
{
    if !trigger.check_upkeep(now).upkeep_needed {
        return Ok(None);
    }
    trigger.perform_upkeep(now, oracle).map(Some)
}
