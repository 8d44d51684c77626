//! Pure eligibility rules for entering and drawing.

use solana_program::clock::UnixTimestamp;

use crate::state::{RaffleState, Round};

/// Whether the round currently takes entries.
pub fn accepts_entries(round: &Round) -> bool {
    round.state() == RaffleState::Open
}

/// Whether the interval has elapsed since the last draw. Reaching the
/// interval exactly counts as elapsed.
pub fn interval_elapsed(round: &Round, now: UnixTimestamp) -> bool {
    now.saturating_sub(round.last_timestamp()) >= round.interval()
}

/// A draw may start when the round is open, the interval has elapsed and
/// somebody has staked something.
pub fn is_draw_eligible(round: &Round, now: UnixTimestamp) -> bool {
    accepts_entries(round)
        && interval_elapsed(round, now)
        && round.number_of_players() > 0
        && round.pot() > 0
}
