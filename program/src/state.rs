use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp, entrypoint::ProgramResult, program_error::ProgramError,
    pubkey::Pubkey,
};
use std::fmt;

use crate::{config::RaffleConfig, error::RaffleError};

/// Seed of the singleton round PDA
pub const RAFFLE_SEED: &[u8] = b"raffle";

/// Ledger records the round account holds beyond a full participant table.
/// The participant table and the unclaimed ledger share one byte budget.
pub const UNCLAIMED_PRIZE_SLOTS: usize = 16;

const PARTICIPANT_LEN: usize = 32;

/// Lifecycle of the rolling round
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaffleState {
    /// Accepting entries
    Open,
    /// Randomness requested, waiting for the oracle
    Drawing,
}

/// Correlates a randomness request with its fulfillment.
#[derive(
    BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct RequestId(pub u128);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Oracle parameters forwarded untouched to the randomness client
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OracleRouting {
    /// Switchboard VRF account whose authority is the round PDA
    pub vrf: Pubkey,
    /// Oracle queue serving the VRF account
    pub oracle_queue: Pubkey,
    pub permission_bump: u8,
    pub state_bump: u8,
}

impl OracleRouting {
    pub const LEN: usize = 32 + 32 + 1 + 1;
}

/// A prize owed to a winner whose payout failed
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnclaimedPrize {
    pub winner: Pubkey,
    pub amount: u64,
}

impl UnclaimedPrize {
    pub const LEN: usize = 32 + 8;
}

/// The live round, stored in the raffle PDA.
///
/// Only `RaffleStateMachine` mutates a round; everything else reads it
/// through the query methods.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Round {
    pub(crate) is_initialized: bool,
    pub(crate) bump: u8,
    pub(crate) state: RaffleState,
    pub(crate) entrance_fee: u64,
    pub(crate) interval: UnixTimestamp,
    pub(crate) last_timestamp: UnixTimestamp,
    pub(crate) pot: u64,
    pub(crate) pending_request: Option<RequestId>,
    pub(crate) recent_winner: Option<Pubkey>,
    pub(crate) max_participants: u32,
    pub(crate) oracle: OracleRouting,
    pub(crate) participants: Vec<Pubkey>,
    pub(crate) unclaimed: Vec<UnclaimedPrize>,
}

impl Round {
    /// Everything before the two variable-length tables, with both
    /// options populated.
    pub const HEADER_LEN: usize =
        1 + 1 + 1 + 8 + 8 + 8 + 8 + (1 + 16) + (1 + 32) + 4 + OracleRouting::LEN;

    /// Opens the first round at `now` with fixed configuration.
    pub fn new(config: &RaffleConfig, bump: u8, now: UnixTimestamp) -> Self {
        Self {
            is_initialized: true,
            bump,
            state: RaffleState::Open,
            entrance_fee: config.entrance_fee,
            interval: config.interval,
            last_timestamp: now,
            pot: 0,
            pending_request: None,
            recent_winner: None,
            max_participants: config.max_participants,
            oracle: config.oracle,
            participants: Vec::with_capacity(config.max_participants as usize),
            unclaimed: Vec::new(),
        }
    }

    /// Account size needed for a round holding up to `max_participants`.
    pub fn space(max_participants: u32) -> usize {
        Self::HEADER_LEN + 4 + 4 + Self::table_budget_for(max_participants)
    }

    fn table_budget_for(max_participants: u32) -> usize {
        max_participants as usize * PARTICIPANT_LEN + UNCLAIMED_PRIZE_SLOTS * UnclaimedPrize::LEN
    }

    /// Bytes available to the participant table and the unclaimed ledger together.
    pub(crate) fn table_budget(&self) -> usize {
        Self::table_budget_for(self.max_participants)
    }

    /// Bytes the two tables would use with `participants` entries and
    /// `unclaimed` ledger records.
    pub(crate) fn table_usage(participants: usize, unclaimed: usize) -> usize {
        participants * PARTICIPANT_LEN + unclaimed * UnclaimedPrize::LEN
    }

    /// Decodes an initialized round from account data. Trailing bytes past
    /// the encoded round are ignored.
    pub fn load(src: &[u8]) -> Result<Self, ProgramError> {
        let round = Self::load_unchecked(src)?;
        if !round.is_initialized {
            return Err(RaffleError::NotInitialized.into());
        }
        Ok(round)
    }

    pub(crate) fn load_unchecked(src: &[u8]) -> Result<Self, ProgramError> {
        Self::deserialize(&mut &src[..]).map_err(|_| ProgramError::InvalidAccountData)
    }

    pub fn save(&self, dst: &mut [u8]) -> ProgramResult {
        let mut writer = dst;
        self.serialize(&mut writer)
            .map_err(|_| ProgramError::AccountDataTooSmall)
    }

    pub fn is_initialized(&self) -> bool {
        self.is_initialized
    }

    pub fn bump(&self) -> u8 {
        self.bump
    }

    pub fn state(&self) -> RaffleState {
        self.state
    }

    pub fn entrance_fee(&self) -> u64 {
        self.entrance_fee
    }

    pub fn interval(&self) -> UnixTimestamp {
        self.interval
    }

    /// Time of the last successful reset (construction time before the first draw)
    pub fn last_timestamp(&self) -> UnixTimestamp {
        self.last_timestamp
    }

    pub fn pot(&self) -> u64 {
        self.pot
    }

    pub fn pending_request(&self) -> Option<RequestId> {
        self.pending_request
    }

    pub fn recent_winner(&self) -> Option<Pubkey> {
        self.recent_winner
    }

    pub fn max_participants(&self) -> u32 {
        self.max_participants
    }

    pub fn oracle(&self) -> &OracleRouting {
        &self.oracle
    }

    pub fn participants(&self) -> &[Pubkey] {
        &self.participants
    }

    pub fn player(&self, index: usize) -> Option<&Pubkey> {
        self.participants.get(index)
    }

    pub fn number_of_players(&self) -> u64 {
        self.participants.len() as u64
    }

    pub fn unclaimed(&self) -> &[UnclaimedPrize] {
        &self.unclaimed
    }

    /// Lamports owed to `winner` from failed payouts.
    pub fn unclaimed_for(&self, winner: &Pubkey) -> u64 {
        self.unclaimed
            .iter()
            .find(|prize| prize.winner == *winner)
            .map(|prize| prize.amount)
            .unwrap_or(0)
    }

    /// Sum of every unclaimed prize still held by the round account.
    pub fn total_unclaimed(&self) -> u64 {
        self.unclaimed.iter().map(|prize| prize.amount).sum()
    }
}
