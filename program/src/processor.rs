use solana_program::{
    account_info::{next_account_info, AccountInfo},
    bpf_loader_upgradeable,
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

use crate::{
    config::RaffleConfig,
    error::RaffleError,
    events,
    instruction::RaffleInstruction,
    machine::RaffleStateMachine,
    payout::LamportTransfer,
    state::{Round, RAFFLE_SEED},
    upkeep,
    utils::{find_program_data_address, find_raffle_address, lamports_to_sol, upgrade_authority},
    vrf::{self, SwitchboardVrf},
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::InitializeRaffle { config } => {
                msg!("Instruction: Initialize Raffle");
                Self::process_initialize_raffle(accounts, config, program_id)
            }
            RaffleInstruction::EnterRaffle { amount } => {
                msg!("Instruction: Enter Raffle");
                Self::process_enter_raffle(accounts, amount, program_id)
            }
            RaffleInstruction::CheckUpkeep => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(accounts, program_id)
            }
            RaffleInstruction::PerformUpkeep => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(accounts, program_id)
            }
            RaffleInstruction::FulfillDraw => {
                msg!("Instruction: Fulfill Draw");
                Self::process_fulfill_draw(accounts, program_id)
            }
            RaffleInstruction::ClaimPrize => {
                msg!("Instruction: Claim Prize");
                Self::process_claim_prize(accounts, program_id)
            }
        }
    }

    /// Loads the round and checks it lives at the program's round PDA.
    fn load_round(raffle_info: &AccountInfo, program_id: &Pubkey) -> Result<Round, ProgramError> {
        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by the program");
            return Err(ProgramError::IncorrectProgramId);
        }
        let round = Round::load(&raffle_info.data.borrow())?;
        let expected = Pubkey::create_program_address(&[RAFFLE_SEED, &[round.bump()]], program_id)?;
        if *raffle_info.key != expected {
            msg!("Invalid raffle account address");
            return Err(ProgramError::InvalidArgument);
        }
        Ok(round)
    }

    /// Writes the round back, then publishes what happened.
    fn commit(machine: &mut RaffleStateMachine, raffle_info: &AccountInfo) -> ProgramResult {
        machine.round().save(&mut raffle_info.data.borrow_mut())?;
        for event in machine.take_events() {
            events::emit(&event);
        }
        Ok(())
    }

    fn process_initialize_raffle(
        accounts: &[AccountInfo],
        config: RaffleConfig,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let payer_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;
        let program_data_info = next_account_info(account_info_iter)?;

        if !payer_info.is_signer {
            msg!("Payer must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        if *program_data_info.key != find_program_data_address(program_id)
            || *program_data_info.owner != bpf_loader_upgradeable::id()
        {
            msg!("Invalid program data account");
            return Err(ProgramError::InvalidArgument);
        }
        if upgrade_authority(&program_data_info.data.borrow()) != Some(*payer_info.key) {
            msg!("Only the upgrade authority can initialize the raffle");
            return Err(RaffleError::Unauthorized.into());
        }

        config.validate()?;

        let (expected_raffle_pubkey, bump_seed) = find_raffle_address(program_id);
        if *raffle_info.key != expected_raffle_pubkey {
            msg!("Invalid raffle account address");
            return Err(ProgramError::InvalidArgument);
        }

        if raffle_info.owner == program_id {
            if Round::load_unchecked(&raffle_info.data.borrow())?.is_initialized() {
                msg!("Raffle account is already initialized");
                return Err(RaffleError::AlreadyInitialized.into());
            }
        } else {
            let space = config.account_space();
            let rent_lamports = Rent::get()?.minimum_balance(space);
            msg!("Creating raffle account with {} bytes", space);
            invoke_signed(
                &system_instruction::create_account(
                    payer_info.key,
                    raffle_info.key,
                    rent_lamports,
                    space as u64,
                    program_id,
                ),
                &[
                    payer_info.clone(),
                    raffle_info.clone(),
                    system_program_info.clone(),
                ],
                &[&[RAFFLE_SEED, &[bump_seed]]],
            )?;
        }

        let now = Clock::get()?.unix_timestamp;
        let round = Round::new(&config, bump_seed, now);
        round.save(&mut raffle_info.data.borrow_mut())?;

        msg!(
            "Raffle initialized: EntranceFee={} SOL, Interval={}s, MaxParticipants={}",
            lamports_to_sol(config.entrance_fee),
            config.interval,
            config.max_participants
        );
        Ok(())
    }

    fn process_enter_raffle(
        accounts: &[AccountInfo],
        amount: u64,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let participant_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !participant_info.is_signer {
            msg!("Participant must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut machine = RaffleStateMachine::new(Self::load_round(raffle_info, program_id)?);
        machine.enter(*participant_info.key, amount)?;

        invoke(
            &system_instruction::transfer(participant_info.key, raffle_info.key, amount),
            &[
                participant_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        Self::commit(&mut machine, raffle_info)
    }

    fn process_check_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;

        let round = Self::load_round(raffle_info, program_id)?;
        let now = Clock::get()?.unix_timestamp;
        let check = upkeep::check_upkeep(&round, now);

        msg!(
            "Upkeep needed: {} (pot={}, players={}, state={:?})",
            check.upkeep_needed,
            check.pot,
            check.players,
            check.state
        );
        set_return_data(&borsh::BorshSerialize::try_to_vec(&check)?);
        Ok(())
    }

    fn process_perform_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let payer_authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let vrf_info = next_account_info(account_info_iter)?;
        let oracle_queue_info = next_account_info(account_info_iter)?;
        let queue_authority_info = next_account_info(account_info_iter)?;
        let data_buffer_info = next_account_info(account_info_iter)?;
        let permission_info = next_account_info(account_info_iter)?;
        let escrow_info = next_account_info(account_info_iter)?;
        let payer_wallet_info = next_account_info(account_info_iter)?;
        let recent_blockhashes_info = next_account_info(account_info_iter)?;
        let program_state_info = next_account_info(account_info_iter)?;
        let token_program_info = next_account_info(account_info_iter)?;
        let switchboard_program_info = next_account_info(account_info_iter)?;

        if !payer_authority_info.is_signer {
            msg!("Payer authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let round = Self::load_round(raffle_info, program_id)?;
        let mut oracle = SwitchboardVrf {
            raffle: raffle_info,
            raffle_bump: round.bump(),
            vrf: vrf_info,
            oracle_queue: oracle_queue_info,
            queue_authority: queue_authority_info,
            data_buffer: data_buffer_info,
            permission: permission_info,
            escrow: escrow_info,
            payer_wallet: payer_wallet_info,
            payer_authority: payer_authority_info,
            recent_blockhashes: recent_blockhashes_info,
            program_state: program_state_info,
            token_program: token_program_info,
            switchboard_program: switchboard_program_info,
        };

        let now = Clock::get()?.unix_timestamp;
        let mut machine = RaffleStateMachine::new(round);
        machine.initiate_draw(now, &mut oracle)?;

        Self::commit(&mut machine, raffle_info)
    }

    fn process_fulfill_draw(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;
        let vrf_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter).ok();

        let round = Self::load_round(raffle_info, program_id)?;
        let fulfillment = vrf::read_fulfillment(vrf_info, round.oracle())?;
        let now = Clock::get()?.unix_timestamp;

        let mut payout = LamportTransfer {
            source: raffle_info,
            recipient: winner_info,
        };
        let mut machine = RaffleStateMachine::new(round);
        match machine.fulfill_draw(
            fulfillment.request_id,
            fulfillment.random_word,
            now,
            &mut payout,
        ) {
            Ok(winner) => {
                msg!(
                    "Winner is entry #{} ({}), paid {} SOL",
                    winner.index,
                    winner.account,
                    lamports_to_sol(winner.amount)
                );
                Self::commit(&mut machine, raffle_info)
            }
            // the round has already moved on; keep it and leave the prize claimable
            Err(RaffleError::PayoutFailed { winner, amount }) => {
                msg!(
                    "Prize of {} SOL for {} kept for claiming",
                    lamports_to_sol(amount),
                    winner
                );
                Self::commit(&mut machine, raffle_info)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn process_claim_prize(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let winner_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;

        if !winner_info.is_signer {
            msg!("Winner must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut machine = RaffleStateMachine::new(Self::load_round(raffle_info, program_id)?);
        let mut payout = LamportTransfer {
            source: raffle_info,
            recipient: Some(winner_info),
        };
        machine.claim_prize(*winner_info.key, &mut payout)?;

        Self::commit(&mut machine, raffle_info)
    }
}
