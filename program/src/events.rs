use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, log::sol_log_data, msg, pubkey::Pubkey};

use crate::{state::RequestId, utils::lamports_to_sol};

/// Notifications for indexers. The borsh enum tag leads every payload.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum RaffleEvent {
    EntryRecorded {
        participant: Pubkey,
        pot: u64,
    },
    DrawInitiated {
        request_id: RequestId,
    },
    WinnerSelected {
        winner: Pubkey,
        amount: u64,
        timestamp: UnixTimestamp,
    },
    /// The winner was selected but the transfer failed; the amount is claimable.
    PayoutFailed {
        winner: Pubkey,
        amount: u64,
    },
    PrizeClaimed {
        winner: Pubkey,
        amount: u64,
    },
}

impl RaffleEvent {
    pub fn log(&self) {
        match self {
            RaffleEvent::EntryRecorded { participant, pot } => {
                msg!("Entry recorded: {} (pot {} SOL)", participant, lamports_to_sol(*pot))
            }
            RaffleEvent::DrawInitiated { request_id } => {
                msg!("Draw initiated: request {}", request_id)
            }
            RaffleEvent::WinnerSelected {
                winner,
                amount,
                timestamp,
            } => msg!(
                "Winner selected: {} won {} lamports at {}",
                winner,
                amount,
                timestamp
            ),
            RaffleEvent::PayoutFailed { winner, amount } => {
                msg!("Payout failed: {} lamports now claimable by {}", amount, winner)
            }
            RaffleEvent::PrizeClaimed { winner, amount } => {
                msg!("Prize claimed: {} lamports by {}", amount, winner)
            }
        }
    }
}

/// Writes the event to the program log, readable and as borsh data.
pub fn emit(event: &RaffleEvent) {
    event.log();
    if let Ok(data) = event.try_to_vec() {
        sol_log_data(&[&data]);
    }
}
