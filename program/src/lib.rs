// VRF Raffle
// A time-triggered raffle on Solana, drawn with Switchboard VRF randomness

// Core modules
pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;
pub mod utils;

// Raffle rules
pub mod config;
pub mod ledger;
pub mod machine;
pub mod policy;
pub mod upkeep;

// Side effects: randomness, prize transfers, events
pub mod events;
pub mod payout;
pub mod vrf;

#[cfg(not(feature = "no-entrypoint"))]
mod entrypoint;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}
