//! Bookkeeping of the round: stakes on the way in, owed prizes on the way out.

use solana_program::pubkey::Pubkey;

use crate::{
    error::RaffleError,
    policy,
    state::{Round, UnclaimedPrize},
};

/// Records one stake. Re-entry by the same participant appends another
/// entry. Returns the pot after the entry.
///
/// Every precondition is checked before the round is touched. An entry is
/// only accepted while the account keeps room for one more ledger record,
/// so the draw closing this round can always keep a prize it failed to pay.
pub fn record_entry(round: &mut Round, participant: Pubkey, stake: u64) -> Result<u64, RaffleError> {
    if !policy::accepts_entries(round) {
        return Err(RaffleError::RoundNotOpen);
    }
    if stake < round.entrance_fee {
        return Err(RaffleError::InsufficientStake {
            stake,
            entrance_fee: round.entrance_fee,
        });
    }
    let entries = round.participants.len();
    if entries >= round.max_participants as usize
        || Round::table_usage(entries + 1, round.unclaimed.len() + 1) > round.table_budget()
    {
        return Err(RaffleError::RoundFull {
            capacity: entries as u32,
        });
    }
    let pot = round.pot.checked_add(stake).ok_or(RaffleError::Overflow)?;

    round.participants.push(participant);
    round.pot = pot;
    Ok(pot)
}

/// Adds `amount` to what the round owes `winner`.
///
/// Room for the record is reserved when entries are taken, see
/// `record_entry`.
pub fn credit_unclaimed(round: &mut Round, winner: Pubkey, amount: u64) -> Result<(), RaffleError> {
    if let Some(prize) = round.unclaimed.iter_mut().find(|prize| prize.winner == winner) {
        prize.amount = prize.amount.checked_add(amount).ok_or(RaffleError::Overflow)?;
        return Ok(());
    }
    round.unclaimed.push(UnclaimedPrize { winner, amount });
    Ok(())
}

/// Removes and returns everything owed to `winner`.
pub fn take_unclaimed(round: &mut Round, winner: &Pubkey) -> Result<u64, RaffleError> {
    let position = round
        .unclaimed
        .iter()
        .position(|prize| prize.winner == *winner)
        .ok_or(RaffleError::NothingToClaim)?;
    Ok(round.unclaimed.swap_remove(position).amount)
}
