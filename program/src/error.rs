use solana_program::{decode_error::DecodeError, msg, program_error::ProgramError, pubkey::Pubkey};
use thiserror::Error;

use crate::state::RaffleState;

/// Errors that may be returned by the raffle program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstruction,

    #[error("Raffle already initialized")]
    AlreadyInitialized,

    #[error("Raffle not initialized")]
    NotInitialized,

    /// Construction-time parameters were rejected
    #[error("Invalid raffle configuration")]
    InvalidConfig,

    /// Stake below the configured entrance fee
    #[error("Insufficient stake: sent {stake} lamports, entrance fee is {entrance_fee}")]
    InsufficientStake { stake: u64, entrance_fee: u64 },

    /// Entries are only accepted while the round is open
    #[error("Raffle is not open")]
    RoundNotOpen,

    /// The participant table of the round account is full
    #[error("Raffle is full ({capacity} participants)")]
    RoundFull { capacity: u32 },

    /// A draw was requested while the round is not eligible
    #[error("Upkeep not needed: pot={pot}, players={players}, state={state:?}")]
    UpkeepNotNeeded {
        pot: u64,
        players: u64,
        state: RaffleState,
    },

    /// Fulfillment does not match the pending randomness request
    #[error("Unknown or stale randomness request")]
    UnknownRequest,

    /// The oracle account holds no result yet
    #[error("Randomness not ready")]
    RandomnessNotReady,

    #[error("Oracle account does not match the raffle routing")]
    InvalidOracleAccount,

    /// The transfer to the winner did not complete; the prize is now claimable
    #[error("Payout of {amount} lamports to {winner} failed")]
    PayoutFailed { winner: Pubkey, amount: u64 },

    #[error("Nothing to claim")]
    NothingToClaim,

    #[error("Arithmetic overflow")]
    Overflow,

    /// The oracle refused or failed the randomness request
    #[error("Randomness request failed")]
    OracleRequestFailed,

    /// Only the program's upgrade authority may open the raffle
    #[error("Signer is not the program upgrade authority")]
    Unauthorized,
}

impl RaffleError {
    /// Stable on-chain error code, surfaced as `ProgramError::Custom`.
    pub fn code(&self) -> u32 {
        match self {
            RaffleError::InvalidInstruction => 0,
            RaffleError::AlreadyInitialized => 1,
            RaffleError::NotInitialized => 2,
            RaffleError::InvalidConfig => 3,
            RaffleError::InsufficientStake { .. } => 4,
            RaffleError::RoundNotOpen => 5,
            RaffleError::RoundFull { .. } => 6,
            RaffleError::UpkeepNotNeeded { .. } => 7,
            RaffleError::UnknownRequest => 8,
            RaffleError::RandomnessNotReady => 9,
            RaffleError::InvalidOracleAccount => 10,
            RaffleError::PayoutFailed { .. } => 11,
            RaffleError::NothingToClaim => 12,
            RaffleError::Overflow => 13,
            RaffleError::OracleRequestFailed => 14,
            RaffleError::Unauthorized => 15,
        }
    }

    /// Name of the error kind behind a custom error code, for clients
    /// decoding failed transactions.
    pub fn name_of(code: u32) -> Option<&'static str> {
        let name = match code {
            0 => "InvalidInstruction",
            1 => "AlreadyInitialized",
            2 => "NotInitialized",
            3 => "InvalidConfig",
            4 => "InsufficientStake",
            5 => "RoundNotOpen",
            6 => "RoundFull",
            7 => "UpkeepNotNeeded",
            8 => "UnknownRequest",
            9 => "RandomnessNotReady",
            10 => "InvalidOracleAccount",
            11 => "PayoutFailed",
            12 => "NothingToClaim",
            13 => "Overflow",
            14 => "OracleRequestFailed",
            15 => "Unauthorized",
            _ => return None,
        };
        Some(name)
    }
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        // the custom code drops the context fields, so log them first
        msg!("Raffle error: {}", e);
        ProgramError::Custom(e.code())
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Error"
    }
}
