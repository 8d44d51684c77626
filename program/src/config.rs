use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, msg};

use crate::{
    error::RaffleError,
    state::{OracleRouting, Round},
};

/// Minimum stake, 0.01 SOL
pub const DEFAULT_ENTRANCE_FEE: u64 = 10_000_000;
/// Seconds between draws
pub const DEFAULT_INTERVAL: UnixTimestamp = 30;
pub const DEFAULT_MAX_PARTICIPANTS: u32 = 128;
/// Largest participant table whose round account still fits the 10 KiB
/// allocation limit of a CPI `create_account`
pub const MAX_PARTICIPANTS_LIMIT: u32 = 256;

/// Construction-time parameters of the raffle, fixed for its lifetime
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RaffleConfig {
    /// Minimum stake in lamports
    pub entrance_fee: u64,
    /// Minimum seconds between two draws
    pub interval: UnixTimestamp,
    /// Capacity of the participant table
    pub max_participants: u32,
    pub oracle: OracleRouting,
}

impl RaffleConfig {
    pub fn new(oracle: OracleRouting) -> Self {
        Self {
            entrance_fee: DEFAULT_ENTRANCE_FEE,
            interval: DEFAULT_INTERVAL,
            max_participants: DEFAULT_MAX_PARTICIPANTS,
            oracle,
        }
    }

    pub fn validate(&self) -> Result<(), RaffleError> {
        if self.entrance_fee == 0 {
            msg!("Entrance fee must be greater than zero");
            return Err(RaffleError::InvalidConfig);
        }
        if self.interval < 0 {
            msg!("Interval cannot be negative");
            return Err(RaffleError::InvalidConfig);
        }
        if self.max_participants == 0 || self.max_participants > MAX_PARTICIPANTS_LIMIT {
            msg!(
                "Max participants must be between 1 and {}",
                MAX_PARTICIPANTS_LIMIT
            );
            return Err(RaffleError::InvalidConfig);
        }
        Ok(())
    }

    /// Size of the round account this configuration needs.
    pub fn account_space(&self) -> usize {
        Round::space(self.max_participants)
    }
}
