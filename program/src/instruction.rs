use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program, sysvar,
};

use crate::{
    config::RaffleConfig,
    error::RaffleError,
    state::OracleRouting,
    utils::{find_program_data_address, find_raffle_address},
};

#[derive(Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Create the round account and open the first round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The payer funding the round account
    /// 1. `[writable]` The round account (PDA of `[b"raffle"]`)
    /// 2. `[]` The system program
    InitializeRaffle { config: RaffleConfig },

    /// Stake `amount` lamports for one entry in the open round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The participant
    /// 1. `[writable]` The round account
    /// 2. `[]` The system program
    EnterRaffle { amount: u64 },

    /// Report whether a draw is due; the answer is set as return data
    ///
    /// Accounts expected:
    /// 0. `[]` The round account
    CheckUpkeep,

    /// Start the draw by requesting Switchboard VRF randomness. Anyone may
    /// call it; it is rejected until the round is eligible.
    ///
    /// Accounts expected:
    /// 0. `[signer]` The payer authority owning the payer wallet
    /// 1. `[writable]` The round account (VRF authority)
    /// 2. `[writable]` The VRF account
    /// 3. `[writable]` The oracle queue
    /// 4. `[]` The queue authority
    /// 5. `[]` The queue data buffer
    /// 6. `[writable]` The permission account
    /// 7. `[writable]` The VRF escrow
    /// 8. `[writable]` The payer wallet funding the request
    /// 9. `[]` The recent blockhashes sysvar
    /// 10. `[]` The Switchboard program state
    /// 11. `[]` The token program
    /// 12. `[]` The Switchboard program
    PerformUpkeep,

    /// Oracle callback: pick the winner from the VRF result and pay out
    ///
    /// Accounts expected:
    /// 0. `[writable]` The round account
    /// 1. `[]` The VRF account holding the result
    /// 2. `[writable]` (optional) The winner, paid directly when supplied
    FulfillDraw,

    /// Withdraw a prize whose payout failed
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The winner
    /// 1. `[writable]` The round account
    ClaimPrize,
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input
            .split_first()
            .ok_or(RaffleError::InvalidInstruction)?;

        Ok(match tag {
            0 => {
                let (entrance_fee, rest) = Self::unpack_u64(rest)?;
                let (interval, rest) = Self::unpack_i64(rest)?;
                let (max_participants, rest) = Self::unpack_u32(rest)?;
                let (vrf, rest) = Self::unpack_pubkey(rest)?;
                let (oracle_queue, rest) = Self::unpack_pubkey(rest)?;
                let (permission_bump, rest) = Self::unpack_u8(rest)?;
                let (state_bump, _) = Self::unpack_u8(rest)?;
                Self::InitializeRaffle {
                    config: RaffleConfig {
                        entrance_fee,
                        interval,
                        max_participants,
                        oracle: OracleRouting {
                            vrf,
                            oracle_queue,
                            permission_bump,
                            state_bump,
                        },
                    },
                }
            }
            1 => {
                let (amount, _) = Self::unpack_u64(rest)?;
                Self::EnterRaffle { amount }
            }
            2 => Self::CheckUpkeep,
            3 => Self::PerformUpkeep,
            4 => Self::FulfillDraw,
            5 => Self::ClaimPrize,
            _ => return Err(RaffleError::InvalidInstruction.into()),
        })
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Self::InitializeRaffle { config } => {
                buf.push(0);
                buf.extend_from_slice(&config.entrance_fee.to_le_bytes());
                buf.extend_from_slice(&config.interval.to_le_bytes());
                buf.extend_from_slice(&config.max_participants.to_le_bytes());
                buf.extend_from_slice(config.oracle.vrf.as_ref());
                buf.extend_from_slice(config.oracle.oracle_queue.as_ref());
                buf.push(config.oracle.permission_bump);
                buf.push(config.oracle.state_bump);
            }
            Self::EnterRaffle { amount } => {
                buf.push(1);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::CheckUpkeep => buf.push(2),
            Self::PerformUpkeep => buf.push(3),
            Self::FulfillDraw => buf.push(4),
            Self::ClaimPrize => buf.push(5),
        }
        buf
    }

    fn unpack_u8(input: &[u8]) -> Result<(u8, &[u8]), ProgramError> {
        let (value, rest) = input
            .split_first()
            .ok_or(RaffleError::InvalidInstruction)?;
        Ok((*value, rest))
    }

    fn unpack_u32(input: &[u8]) -> Result<(u32, &[u8]), ProgramError> {
        let value = input
            .get(..4)
            .and_then(|slice| slice.try_into().ok())
            .map(u32::from_le_bytes)
            .ok_or(RaffleError::InvalidInstruction)?;
        Ok((value, &input[4..]))
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        let value = input
            .get(..8)
            .and_then(|slice| slice.try_into().ok())
            .map(u64::from_le_bytes)
            .ok_or(RaffleError::InvalidInstruction)?;
        Ok((value, &input[8..]))
    }

    fn unpack_i64(input: &[u8]) -> Result<(i64, &[u8]), ProgramError> {
        let value = input
            .get(..8)
            .and_then(|slice| slice.try_into().ok())
            .map(i64::from_le_bytes)
            .ok_or(RaffleError::InvalidInstruction)?;
        Ok((value, &input[8..]))
    }

    fn unpack_pubkey(input: &[u8]) -> Result<(Pubkey, &[u8]), ProgramError> {
        let bytes: [u8; 32] = input
            .get(..32)
            .and_then(|slice| slice.try_into().ok())
            .ok_or(RaffleError::InvalidInstruction)?;
        Ok((Pubkey::new_from_array(bytes), &input[32..]))
    }
}

/// Create initialize_raffle instruction. `authority` must be the program's
/// upgrade authority and pays for the round account.
pub fn initialize_raffle(program_id: &Pubkey, authority: &Pubkey, config: RaffleConfig) -> Instruction {
    let (raffle, _) = find_raffle_address(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*authority, true),
            AccountMeta::new(raffle, false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(find_program_data_address(program_id), false),
        ],
        data: RaffleInstruction::InitializeRaffle { config }.pack(),
    }
}

/// Create enter_raffle instruction
pub fn enter_raffle(program_id: &Pubkey, participant: &Pubkey, amount: u64) -> Instruction {
    let (raffle, _) = find_raffle_address(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*participant, true),
            AccountMeta::new(raffle, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: RaffleInstruction::EnterRaffle { amount }.pack(),
    }
}

/// Create check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey) -> Instruction {
    let (raffle, _) = find_raffle_address(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(raffle, false)],
        data: RaffleInstruction::CheckUpkeep.pack(),
    }
}

/// Switchboard accounts a trigger passes to `perform_upkeep`
#[derive(Clone, Copy, Debug)]
pub struct SwitchboardAccounts {
    pub vrf: Pubkey,
    pub oracle_queue: Pubkey,
    pub queue_authority: Pubkey,
    pub data_buffer: Pubkey,
    pub permission: Pubkey,
    pub escrow: Pubkey,
    pub payer_wallet: Pubkey,
    pub program_state: Pubkey,
    pub switchboard_program: Pubkey,
}

/// Create perform_upkeep instruction
#[allow(deprecated)]
pub fn perform_upkeep(
    program_id: &Pubkey,
    payer_authority: &Pubkey,
    switchboard: &SwitchboardAccounts,
) -> Instruction {
    let (raffle, _) = find_raffle_address(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*payer_authority, true),
            AccountMeta::new(raffle, false),
            AccountMeta::new(switchboard.vrf, false),
            AccountMeta::new(switchboard.oracle_queue, false),
            AccountMeta::new_readonly(switchboard.queue_authority, false),
            AccountMeta::new_readonly(switchboard.data_buffer, false),
            AccountMeta::new(switchboard.permission, false),
            AccountMeta::new(switchboard.escrow, false),
            AccountMeta::new(switchboard.payer_wallet, false),
            AccountMeta::new_readonly(sysvar::recent_blockhashes::id(), false),
            AccountMeta::new_readonly(switchboard.program_state, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(switchboard.switchboard_program, false),
        ],
        data: RaffleInstruction::PerformUpkeep.pack(),
    }
}

/// Create fulfill_draw instruction. Passing the winner pays it directly;
/// without it the prize becomes claimable.
pub fn fulfill_draw(program_id: &Pubkey, vrf: &Pubkey, winner: Option<&Pubkey>) -> Instruction {
    let (raffle, _) = find_raffle_address(program_id);
    let mut accounts = vec![
        AccountMeta::new(raffle, false),
        AccountMeta::new_readonly(*vrf, false),
    ];
    if let Some(winner) = winner {
        accounts.push(AccountMeta::new(*winner, false));
    }
    Instruction {
        program_id: *program_id,
        accounts,
        data: RaffleInstruction::FulfillDraw.pack(),
    }
}

/// Create claim_prize instruction
pub fn claim_prize(program_id: &Pubkey, winner: &Pubkey) -> Instruction {
    let (raffle, _) = find_raffle_address(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*winner, true),
            AccountMeta::new(raffle, false),
        ],
        data: RaffleInstruction::ClaimPrize.pack(),
    }
}
