//! The raffle state machine: OPEN -> DRAWING -> OPEN, forever.
//!
//! A `RaffleStateMachine` owns its `Round` and is the only code that mutates
//! it. Every precondition is checked before the first write, so a rejected
//! call leaves the round exactly as it was. On chain the runtime serializes
//! instructions that take the round account writable, and off chain
//! `&mut self` does the same.

use solana_program::{clock::UnixTimestamp, msg, pubkey::Pubkey};

use crate::{
    error::RaffleError,
    events::RaffleEvent,
    ledger,
    payout::PrizeTransfer,
    policy,
    state::{RaffleState, RequestId, Round},
    utils,
    vrf::RandomnessOracle,
};

/// The entry selected by a draw
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Winner {
    pub account: Pubkey,
    pub amount: u64,
    /// Position of the winning entry before the participants were cleared
    pub index: usize,
}

pub struct RaffleStateMachine {
    round: Round,
    events: Vec<RaffleEvent>,
}

impl RaffleStateMachine {
    pub fn new(round: Round) -> Self {
        Self {
            round,
            events: Vec::new(),
        }
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn into_round(self) -> Round {
        self.round
    }

    /// Drains the notifications produced since the last call.
    pub fn take_events(&mut self) -> Vec<RaffleEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_draw_eligible(&self, now: UnixTimestamp) -> bool {
        policy::is_draw_eligible(&self.round, now)
    }

    /// Records a stake for `participant`; returns the new pot.
    pub fn enter(&mut self, participant: Pubkey, stake: u64) -> Result<u64, RaffleError> {
        let pot = ledger::record_entry(&mut self.round, participant, stake)?;
        self.events
            .push(RaffleEvent::EntryRecorded { participant, pot });
        Ok(pot)
    }

    fn upkeep_not_needed(&self) -> RaffleError {
        RaffleError::UpkeepNotNeeded {
            pot: self.round.pot,
            players: self.round.number_of_players(),
            state: self.round.state,
        }
    }

    /// Moves the round to DRAWING and asks the oracle for randomness.
    ///
    /// The transition and the request form one unit: if the oracle refuses,
    /// the round is put back as it was.
    pub fn initiate_draw<O>(
        &mut self,
        now: UnixTimestamp,
        oracle: &mut O,
    ) -> Result<RequestId, RaffleError>
    where
        O: RandomnessOracle + ?Sized,
    {
        if !self.is_draw_eligible(now) {
            return Err(self.upkeep_not_needed());
        }

        self.round.state = RaffleState::Drawing;
        let request_id = match oracle.request_randomness(&self.round.oracle) {
            Ok(request_id) => request_id,
            Err(err) => {
                msg!("Randomness request failed: {}", err);
                self.round.state = RaffleState::Open;
                return Err(RaffleError::OracleRequestFailed);
            }
        };
        self.round.pending_request = Some(request_id);

        self.events.push(RaffleEvent::DrawInitiated { request_id });
        Ok(request_id)
    }

    /// Consumes the oracle's answer to the pending request.
    ///
    /// The round is reset to a fresh OPEN cycle before any lamports move.
    /// When the transfer then fails the reset stands, the prize is owed to
    /// the winner through the unclaimed ledger and `PayoutFailed` is
    /// returned.
    pub fn fulfill_draw<P>(
        &mut self,
        request_id: RequestId,
        random_word: u64,
        now: UnixTimestamp,
        payout: &mut P,
    ) -> Result<Winner, RaffleError>
    where
        P: PrizeTransfer + ?Sized,
    {
        if self.round.state != RaffleState::Drawing
            || self.round.pending_request != Some(request_id)
        {
            msg!(
                "Ignoring fulfillment for request {}, pending {:?}",
                request_id,
                self.round.pending_request
            );
            return Err(RaffleError::UnknownRequest);
        }
        let index = utils::winner_index(random_word, self.round.participants.len())
            .ok_or(RaffleError::UnknownRequest)?;
        let winner = Winner {
            account: self.round.participants[index],
            amount: self.round.pot,
            index,
        };

        self.round.participants.clear();
        self.round.pot = 0;
        self.round.pending_request = None;
        self.round.state = RaffleState::Open;
        self.round.last_timestamp = now;
        self.round.recent_winner = Some(winner.account);

        if let Err(err) = payout.transfer(&winner.account, winner.amount) {
            msg!("Prize transfer failed: {}", err);
            ledger::credit_unclaimed(&mut self.round, winner.account, winner.amount)?;
            self.events.push(RaffleEvent::PayoutFailed {
                winner: winner.account,
                amount: winner.amount,
            });
            return Err(RaffleError::PayoutFailed {
                winner: winner.account,
                amount: winner.amount,
            });
        }

        self.events.push(RaffleEvent::WinnerSelected {
            winner: winner.account,
            amount: winner.amount,
            timestamp: now,
        });
        Ok(winner)
    }

    /// Pays out everything owed to `claimant` from failed payouts.
    pub fn claim_prize<P>(&mut self, claimant: Pubkey, payout: &mut P) -> Result<u64, RaffleError>
    where
        P: PrizeTransfer + ?Sized,
    {
        let amount = ledger::take_unclaimed(&mut self.round, &claimant)?;
        if let Err(err) = payout.transfer(&claimant, amount) {
            msg!("Claim transfer failed: {}", err);
            ledger::credit_unclaimed(&mut self.round, claimant, amount)?;
            return Err(RaffleError::PayoutFailed {
                winner: claimant,
                amount,
            });
        }

        self.events.push(RaffleEvent::PrizeClaimed {
            winner: claimant,
            amount,
        });
        Ok(amount)
    }
}
