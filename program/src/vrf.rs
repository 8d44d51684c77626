// Switchboard VRF integration for the raffle program
use solana_program::{
    account_info::AccountInfo,
    hash::hash,
    instruction::{AccountMeta, Instruction},
    msg,
    program::invoke_signed,
    program_error::ProgramError,
};
use switchboard_v2::{VrfAccountData, SWITCHBOARD_PROGRAM_ID};

use crate::{
    error::RaffleError,
    state::{OracleRouting, RequestId, RAFFLE_SEED},
    utils::random_word,
};

/// Oracle boundary used by the state machine to ask for randomness.
///
/// The answer never comes back through this call: the oracle later invokes
/// the fulfillment instruction with the request id returned here.
pub trait RandomnessOracle {
    fn request_randomness(&mut self, routing: &OracleRouting) -> Result<RequestId, ProgramError>;
}

/// Randomness delivered by the oracle for one request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fulfillment {
    pub request_id: RequestId,
    pub random_word: u64,
}

/// Accounts the Switchboard `vrf_request_randomness` instruction needs.
/// The round PDA is the VRF authority and signs the request.
pub struct SwitchboardVrf<'a, 'b> {
    pub raffle: &'a AccountInfo<'b>,
    pub raffle_bump: u8,
    pub vrf: &'a AccountInfo<'b>,
    pub oracle_queue: &'a AccountInfo<'b>,
    pub queue_authority: &'a AccountInfo<'b>,
    pub data_buffer: &'a AccountInfo<'b>,
    pub permission: &'a AccountInfo<'b>,
    pub escrow: &'a AccountInfo<'b>,
    pub payer_wallet: &'a AccountInfo<'b>,
    pub payer_authority: &'a AccountInfo<'b>,
    pub recent_blockhashes: &'a AccountInfo<'b>,
    pub program_state: &'a AccountInfo<'b>,
    pub token_program: &'a AccountInfo<'b>,
    pub switchboard_program: &'a AccountInfo<'b>,
}

impl<'a, 'b> SwitchboardVrf<'a, 'b> {
    fn verify_accounts(&self, routing: &OracleRouting) -> Result<(), ProgramError> {
        if *self.switchboard_program.key != SWITCHBOARD_PROGRAM_ID {
            msg!("Switchboard program account does not match");
            return Err(ProgramError::IncorrectProgramId);
        }
        if *self.token_program.key != spl_token::id() {
            msg!("Token program account does not match");
            return Err(ProgramError::IncorrectProgramId);
        }
        verify_vrf_account(self.vrf, routing)?;
        if *self.oracle_queue.key != routing.oracle_queue {
            msg!("Oracle queue does not match the raffle routing");
            return Err(RaffleError::InvalidOracleAccount.into());
        }
        Ok(())
    }

    fn request_instruction(&self, routing: &OracleRouting) -> Instruction {
        // anchor discriminator of Switchboard's vrf_request_randomness
        let mut data = hash(b"global:vrf_request_randomness").to_bytes()[..8].to_vec();
        data.push(routing.permission_bump);
        data.push(routing.state_bump);

        let accounts = vec![
            AccountMeta::new_readonly(*self.raffle.key, true),
            AccountMeta::new(*self.vrf.key, false),
            AccountMeta::new(*self.oracle_queue.key, false),
            AccountMeta::new_readonly(*self.queue_authority.key, false),
            AccountMeta::new_readonly(*self.data_buffer.key, false),
            AccountMeta::new(*self.permission.key, false),
            AccountMeta::new(*self.escrow.key, false),
            AccountMeta::new(*self.payer_wallet.key, false),
            AccountMeta::new_readonly(*self.payer_authority.key, true),
            AccountMeta::new_readonly(*self.recent_blockhashes.key, false),
            AccountMeta::new_readonly(*self.program_state.key, false),
            AccountMeta::new_readonly(*self.token_program.key, false),
        ];

        Instruction {
            program_id: *self.switchboard_program.key,
            accounts,
            data,
        }
    }
}

impl<'a, 'b> RandomnessOracle for SwitchboardVrf<'a, 'b> {
    fn request_randomness(&mut self, routing: &OracleRouting) -> Result<RequestId, ProgramError> {
        self.verify_accounts(routing)?;

        // the VRF bumps its counter once per request
        let counter = {
            let vrf = VrfAccountData::new(self.vrf)?;
            vrf.counter
        };
        let request_id = counter
            .checked_add(1)
            .map(RequestId)
            .ok_or(RaffleError::Overflow)?;

        invoke_signed(
            &self.request_instruction(routing),
            &[
                self.raffle.clone(),
                self.vrf.clone(),
                self.oracle_queue.clone(),
                self.queue_authority.clone(),
                self.data_buffer.clone(),
                self.permission.clone(),
                self.escrow.clone(),
                self.payer_wallet.clone(),
                self.payer_authority.clone(),
                self.recent_blockhashes.clone(),
                self.program_state.clone(),
                self.token_program.clone(),
                self.switchboard_program.clone(),
            ],
            &[&[RAFFLE_SEED, &[self.raffle_bump]]],
        )?;

        msg!("VRF randomness request {} submitted", request_id);
        Ok(request_id)
    }
}

fn verify_vrf_account(vrf: &AccountInfo, routing: &OracleRouting) -> Result<(), ProgramError> {
    if vrf.owner != &SWITCHBOARD_PROGRAM_ID {
        msg!("VRF account not owned by Switchboard program");
        return Err(ProgramError::InvalidAccountOwner);
    }
    if *vrf.key != routing.vrf {
        msg!("VRF account does not match the raffle routing");
        return Err(RaffleError::InvalidOracleAccount.into());
    }
    Ok(())
}

/// Reads the answer to the latest request from the VRF account.
///
/// The request id is the VRF counter, so a result read after a newer
/// request than the pending one will not match it.
pub fn read_fulfillment(vrf: &AccountInfo, routing: &OracleRouting) -> Result<Fulfillment, ProgramError> {
    verify_vrf_account(vrf, routing)?;

    let vrf_data = VrfAccountData::new(vrf)?;
    let result = match vrf_data.get_result() {
        Ok(result) if result != [0u8; 32] => result,
        _ => {
            msg!("VRF account does not have a result yet");
            return Err(RaffleError::RandomnessNotReady.into());
        }
    };

    Ok(Fulfillment {
        request_id: RequestId(vrf_data.counter),
        random_word: random_word(&result),
    })
}
