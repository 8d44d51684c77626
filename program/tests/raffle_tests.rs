use borsh::BorshDeserialize;
use solana_program_test::*;
use solana_sdk::{
    account::Account,
    bpf_loader_upgradeable,
    hash::hash,
    instruction::{Instruction, InstructionError},
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    signature::{Keypair, Signer},
    system_instruction, system_program,
    sysvar::clock::Clock,
    transaction::{Transaction, TransactionError},
};
use switchboard_v2::{VrfAccountData, SWITCHBOARD_PROGRAM_ID};

use vrf_raffle::{
    config::RaffleConfig,
    error::RaffleError,
    instruction::{self, SwitchboardAccounts},
    machine::RaffleStateMachine,
    process_instruction,
    state::{OracleRouting, RaffleState, RequestId, Round},
    upkeep::UpkeepCheck,
    utils::{find_program_data_address, find_raffle_address},
    vrf::RandomnessOracle,
};

const ENTRANCE_FEE: u64 = 10_000_000;
const INTERVAL: i64 = 30;
const STARTING_BALANCE: u64 = 1_000_000_000;
// bool + u64 + u64 + one-byte state tag
const UPKEEP_CHECK_LEN: usize = 1 + 8 + 8 + 1;

fn program_test(program_id: &Pubkey, authority: &Pubkey) -> ProgramTest {
    let mut program_test = ProgramTest::new(
        "vrf_raffle",
        *program_id,
        processor!(process_instruction),
    );

    // ProgramData of an upgradeable deploy: tag 3, slot, Some(authority)
    let mut program_data = 3u32.to_le_bytes().to_vec();
    program_data.extend_from_slice(&0u64.to_le_bytes());
    program_data.push(1);
    program_data.extend_from_slice(authority.as_ref());
    program_test.add_account(
        find_program_data_address(program_id),
        Account {
            lamports: STARTING_BALANCE,
            data: program_data,
            owner: bpf_loader_upgradeable::id(),
            ..Account::default()
        },
    );
    program_test.add_account(*authority, system_account(STARTING_BALANCE));
    program_test
}

fn system_account(lamports: u64) -> Account {
    Account {
        lamports,
        owner: system_program::id(),
        ..Account::default()
    }
}

async fn setup() -> (ProgramTestContext, Pubkey, Keypair) {
    let program_id = Pubkey::new_unique();
    let authority = Keypair::new();
    let context = program_test(&program_id, &authority.pubkey())
        .start_with_context()
        .await;
    (context, program_id, authority)
}

fn test_config(max_participants: u32) -> RaffleConfig {
    RaffleConfig {
        entrance_fee: ENTRANCE_FEE,
        interval: INTERVAL,
        max_participants,
        oracle: OracleRouting {
            vrf: Pubkey::new_unique(),
            oracle_queue: Pubkey::new_unique(),
            permission_bump: 254,
            state_bump: 253,
        },
    }
}

async fn send(
    context: &mut ProgramTestContext,
    instructions: &[Instruction],
    signers: &[&Keypair],
) -> Result<(), TransactionError> {
    let mut transaction =
        Transaction::new_with_payer(instructions, Some(&context.payer.pubkey()));
    let mut all_signers = vec![&context.payer];
    all_signers.extend_from_slice(signers);
    transaction.sign(&all_signers, context.last_blockhash);
    context
        .banks_client
        .process_transaction(transaction)
        .await
        .map_err(|err| err.unwrap())
}

async fn initialize(
    context: &mut ProgramTestContext,
    program_id: &Pubkey,
    authority: &Keypair,
    config: RaffleConfig,
) {
    let ix = instruction::initialize_raffle(program_id, &authority.pubkey(), config);
    send(context, &[ix], &[authority]).await.unwrap();
}

// Funds a fresh participant wallet from the test payer
async fn new_participant(context: &mut ProgramTestContext) -> Keypair {
    let participant = Keypair::new();
    let ix = system_instruction::transfer(
        &context.payer.pubkey(),
        &participant.pubkey(),
        STARTING_BALANCE,
    );
    send(context, &[ix], &[]).await.unwrap();
    participant
}

async fn load_round(context: &mut ProgramTestContext, program_id: &Pubkey) -> Round {
    let (raffle_pubkey, _) = find_raffle_address(program_id);
    let account = context
        .banks_client
        .get_account(raffle_pubkey)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.owner, *program_id);
    Round::load(&account.data).unwrap()
}

async fn balance(context: &mut ProgramTestContext, address: Pubkey) -> u64 {
    context.banks_client.get_balance(address).await.unwrap()
}

async fn advance_clock(context: &mut ProgramTestContext, seconds: i64) {
    let mut clock: Clock = context.banks_client.get_sysvar().await.unwrap();
    clock.unix_timestamp += seconds;
    context.set_sysvar(&clock);
}

fn custom(error: RaffleError) -> TransactionError {
    TransactionError::InstructionError(0, InstructionError::Custom(error.code()))
}

#[tokio::test]
async fn test_initialize_raffle() {
    let (mut context, program_id, authority) = setup().await;
    let config = test_config(8);
    initialize(&mut context, &program_id, &authority, config).await;

    let round = load_round(&mut context, &program_id).await;
    assert!(round.is_initialized());
    assert_eq!(round.state(), RaffleState::Open);
    assert_eq!(round.entrance_fee(), ENTRANCE_FEE);
    assert_eq!(round.interval(), INTERVAL);
    assert_eq!(round.max_participants(), 8);
    assert_eq!(*round.oracle(), config.oracle);
    assert_eq!(round.number_of_players(), 0);
    assert_eq!(round.recent_winner(), None);
    assert_eq!(round.pending_request(), None);

    // a second initialization with different parameters is refused
    let mut other = config;
    other.entrance_fee = ENTRANCE_FEE * 2;
    let ix = instruction::initialize_raffle(&program_id, &authority.pubkey(), other);
    assert_eq!(
        send(&mut context, &[ix], &[&authority]).await.unwrap_err(),
        custom(RaffleError::AlreadyInitialized)
    );
}

#[tokio::test]
async fn test_initialize_requires_upgrade_authority() {
    let (mut context, program_id, _authority) = setup().await;

    let ix = instruction::initialize_raffle(&program_id, &context.payer.pubkey(), test_config(8));
    assert_eq!(
        send(&mut context, &[ix], &[]).await.unwrap_err(),
        custom(RaffleError::Unauthorized)
    );

    let (raffle_pubkey, _) = find_raffle_address(&program_id);
    assert!(context
        .banks_client
        .get_account(raffle_pubkey)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_initialize_rejects_bad_config() {
    let (mut context, program_id, authority) = setup().await;
    let mut config = test_config(8);
    config.entrance_fee = 0;
    let ix = instruction::initialize_raffle(&program_id, &authority.pubkey(), config);
    assert_eq!(
        send(&mut context, &[ix], &[&authority]).await.unwrap_err(),
        custom(RaffleError::InvalidConfig)
    );
}

#[tokio::test]
async fn test_enter_raffle() {
    let (mut context, program_id, authority) = setup().await;
    initialize(&mut context, &program_id, &authority, test_config(8)).await;
    let (raffle_pubkey, _) = find_raffle_address(&program_id);
    let lamports_before = balance(&mut context, raffle_pubkey).await;

    let first = new_participant(&mut context).await;
    let second = new_participant(&mut context).await;
    let ix = instruction::enter_raffle(&program_id, &first.pubkey(), ENTRANCE_FEE);
    send(&mut context, &[ix], &[&first]).await.unwrap();
    let ix = instruction::enter_raffle(&program_id, &second.pubkey(), ENTRANCE_FEE * 2);
    send(&mut context, &[ix], &[&second]).await.unwrap();

    let round = load_round(&mut context, &program_id).await;
    assert_eq!(round.number_of_players(), 2);
    assert_eq!(round.player(0), Some(&first.pubkey()));
    assert_eq!(round.player(1), Some(&second.pubkey()));
    assert_eq!(round.pot(), ENTRANCE_FEE * 3);

    let lamports_after = balance(&mut context, raffle_pubkey).await;
    assert_eq!(lamports_after - lamports_before, ENTRANCE_FEE * 3);
}

#[tokio::test]
async fn test_enter_with_insufficient_stake() {
    let (mut context, program_id, authority) = setup().await;
    initialize(&mut context, &program_id, &authority, test_config(8)).await;

    let participant = new_participant(&mut context).await;
    let ix = instruction::enter_raffle(&program_id, &participant.pubkey(), ENTRANCE_FEE - 1);
    assert_eq!(
        send(&mut context, &[ix], &[&participant]).await.unwrap_err(),
        custom(RaffleError::InsufficientStake {
            stake: ENTRANCE_FEE - 1,
            entrance_fee: ENTRANCE_FEE,
        })
    );

    let round = load_round(&mut context, &program_id).await;
    assert_eq!(round.number_of_players(), 0);
    assert_eq!(round.pot(), 0);
}

#[tokio::test]
async fn test_enter_full_round() {
    let (mut context, program_id, authority) = setup().await;
    initialize(&mut context, &program_id, &authority, test_config(1)).await;

    let first = new_participant(&mut context).await;
    let second = new_participant(&mut context).await;
    let ix = instruction::enter_raffle(&program_id, &first.pubkey(), ENTRANCE_FEE);
    send(&mut context, &[ix], &[&first]).await.unwrap();
    let ix = instruction::enter_raffle(&program_id, &second.pubkey(), ENTRANCE_FEE);
    assert_eq!(
        send(&mut context, &[ix], &[&second]).await.unwrap_err(),
        custom(RaffleError::RoundFull { capacity: 1 })
    );
}

fn dummy_switchboard_accounts(config: &RaffleConfig) -> SwitchboardAccounts {
    SwitchboardAccounts {
        vrf: config.oracle.vrf,
        oracle_queue: config.oracle.oracle_queue,
        queue_authority: Pubkey::new_unique(),
        data_buffer: Pubkey::new_unique(),
        permission: Pubkey::new_unique(),
        escrow: Pubkey::new_unique(),
        payer_wallet: Pubkey::new_unique(),
        program_state: Pubkey::new_unique(),
        switchboard_program: SWITCHBOARD_PROGRAM_ID,
    }
}

#[tokio::test]
async fn test_perform_upkeep_before_interval() {
    let (mut context, program_id, authority) = setup().await;
    let config = test_config(8);
    initialize(&mut context, &program_id, &authority, config).await;

    let participant = new_participant(&mut context).await;
    let ix = instruction::enter_raffle(&program_id, &participant.pubkey(), ENTRANCE_FEE);
    send(&mut context, &[ix], &[&participant]).await.unwrap();

    let ix = instruction::perform_upkeep(
        &program_id,
        &context.payer.pubkey(),
        &dummy_switchboard_accounts(&config),
    );
    assert_eq!(
        send(&mut context, &[ix], &[]).await.unwrap_err(),
        custom(RaffleError::UpkeepNotNeeded {
            pot: ENTRANCE_FEE,
            players: 1,
            state: RaffleState::Open,
        })
    );
}

#[tokio::test]
async fn test_perform_upkeep_without_players() {
    let (mut context, program_id, authority) = setup().await;
    let config = test_config(8);
    initialize(&mut context, &program_id, &authority, config).await;
    advance_clock(&mut context, INTERVAL).await;

    let ix = instruction::perform_upkeep(
        &program_id,
        &context.payer.pubkey(),
        &dummy_switchboard_accounts(&config),
    );
    assert_eq!(
        send(&mut context, &[ix], &[]).await.unwrap_err(),
        custom(RaffleError::UpkeepNotNeeded {
            pot: 0,
            players: 0,
            state: RaffleState::Open,
        })
    );
}

#[tokio::test]
async fn test_perform_upkeep_oracle_failure_keeps_round_open() {
    let (mut context, program_id, authority) = setup().await;
    let config = test_config(8);
    initialize(&mut context, &program_id, &authority, config).await;

    let participant = new_participant(&mut context).await;
    let ix = instruction::enter_raffle(&program_id, &participant.pubkey(), ENTRANCE_FEE);
    send(&mut context, &[ix], &[&participant]).await.unwrap();
    advance_clock(&mut context, INTERVAL).await;

    // the dummy VRF account is not owned by Switchboard, so the request fails
    let ix = instruction::perform_upkeep(
        &program_id,
        &context.payer.pubkey(),
        &dummy_switchboard_accounts(&config),
    );
    assert_eq!(
        send(&mut context, &[ix], &[]).await.unwrap_err(),
        custom(RaffleError::OracleRequestFailed)
    );

    let round = load_round(&mut context, &program_id).await;
    assert_eq!(round.state(), RaffleState::Open);
    assert_eq!(round.pending_request(), None);
    assert_eq!(round.number_of_players(), 1);
}

async fn simulate_check_upkeep(context: &mut ProgramTestContext, program_id: &Pubkey) -> UpkeepCheck {
    let transaction = Transaction::new_signed_with_payer(
        &[instruction::check_upkeep(program_id)],
        Some(&context.payer.pubkey()),
        &[&context.payer],
        context.last_blockhash,
    );
    let simulation = context
        .banks_client
        .simulate_transaction(transaction)
        .await
        .unwrap();
    simulation.result.unwrap().unwrap();
    let data = simulation
        .simulation_details
        .and_then(|details| details.return_data)
        .map(|return_data| return_data.data)
        .unwrap_or_default();

    // the runtime drops trailing zero bytes of return data
    let mut encoded = [0u8; UPKEEP_CHECK_LEN];
    encoded[..data.len()].copy_from_slice(&data);
    UpkeepCheck::try_from_slice(&encoded).unwrap()
}

#[tokio::test]
async fn test_check_upkeep() {
    let (mut context, program_id, authority) = setup().await;
    initialize(&mut context, &program_id, &authority, test_config(8)).await;

    let participant = new_participant(&mut context).await;
    let ix = instruction::enter_raffle(&program_id, &participant.pubkey(), ENTRANCE_FEE);
    send(&mut context, &[ix], &[&participant]).await.unwrap();

    assert_eq!(
        simulate_check_upkeep(&mut context, &program_id).await,
        UpkeepCheck {
            upkeep_needed: false,
            pot: ENTRANCE_FEE,
            players: 1,
            state: RaffleState::Open,
        }
    );

    advance_clock(&mut context, INTERVAL).await;
    assert_eq!(
        simulate_check_upkeep(&mut context, &program_id).await,
        UpkeepCheck {
            upkeep_needed: true,
            pot: ENTRANCE_FEE,
            players: 1,
            state: RaffleState::Open,
        }
    );
}

/// Oracle answering every request with a fixed id, used to stage a round
/// that already waits for its randomness.
struct FixedOracle(RequestId);

impl RandomnessOracle for FixedOracle {
    fn request_randomness(&mut self, _routing: &OracleRouting) -> Result<RequestId, ProgramError> {
        Ok(self.0)
    }
}

/// Switchboard VRF account at `counter` holding `result`
fn vrf_account(counter: u128, result: [u8; 32]) -> Account {
    let mut vrf: VrfAccountData = bytemuck::Zeroable::zeroed();
    vrf.counter = counter;
    vrf.current_round.result = result;
    let mut data = hash(b"account:VrfAccountData").to_bytes()[..8].to_vec();
    data.extend_from_slice(bytemuck::bytes_of(&vrf));
    Account {
        lamports: STARTING_BALANCE,
        data,
        owner: SWITCHBOARD_PROGRAM_ID,
        ..Account::default()
    }
}

fn result_selecting(index: u64) -> [u8; 32] {
    let mut result = [0x5au8; 32];
    result[..8].copy_from_slice(&index.to_le_bytes());
    result
}

struct DrawingRaffle {
    context: ProgramTestContext,
    program_id: Pubkey,
    config: RaffleConfig,
    players: Vec<Keypair>,
}

/// Starts a test validator whose raffle already waits for request 1 from
/// two entrants, with the VRF account at `vrf_counter` holding `result`.
async fn setup_drawing(vrf_counter: u128, result: [u8; 32]) -> DrawingRaffle {
    let program_id = Pubkey::new_unique();
    let authority = Keypair::new();
    let config = test_config(8);
    let players = vec![Keypair::new(), Keypair::new()];

    let (raffle_pubkey, bump) = find_raffle_address(&program_id);
    let mut machine = RaffleStateMachine::new(Round::new(&config, bump, 0));
    for player in &players {
        machine.enter(player.pubkey(), ENTRANCE_FEE).unwrap();
    }
    machine
        .initiate_draw(INTERVAL, &mut FixedOracle(RequestId(1)))
        .unwrap();
    let round = machine.into_round();

    let space = config.account_space();
    let mut data = vec![0u8; space];
    round.save(&mut data).unwrap();

    let mut program_test = program_test(&program_id, &authority.pubkey());
    program_test.add_account(
        raffle_pubkey,
        Account {
            lamports: Rent::default().minimum_balance(space) + round.pot(),
            data,
            owner: program_id,
            ..Account::default()
        },
    );
    program_test.add_account(config.oracle.vrf, vrf_account(vrf_counter, result));
    for player in &players {
        program_test.add_account(player.pubkey(), system_account(STARTING_BALANCE));
    }

    DrawingRaffle {
        context: program_test.start_with_context().await,
        program_id,
        config,
        players,
    }
}

#[tokio::test]
async fn test_fulfill_draw_pays_winner() {
    let DrawingRaffle {
        mut context,
        program_id,
        config,
        players,
    } = setup_drawing(1, result_selecting(1)).await;
    let (raffle_pubkey, _) = find_raffle_address(&program_id);
    let winner = players[1].pubkey();
    let raffle_before = balance(&mut context, raffle_pubkey).await;

    let ix = instruction::fulfill_draw(&program_id, &config.oracle.vrf, Some(&winner));
    send(&mut context, &[ix], &[]).await.unwrap();

    assert_eq!(
        balance(&mut context, winner).await,
        STARTING_BALANCE + 2 * ENTRANCE_FEE
    );
    assert_eq!(
        balance(&mut context, raffle_pubkey).await,
        raffle_before - 2 * ENTRANCE_FEE
    );
    let round = load_round(&mut context, &program_id).await;
    assert_eq!(round.state(), RaffleState::Open);
    assert_eq!(round.pot(), 0);
    assert_eq!(round.number_of_players(), 0);
    assert_eq!(round.pending_request(), None);
    assert_eq!(round.recent_winner(), Some(winner));
    assert_eq!(round.unclaimed_for(&winner), 0);
}

#[tokio::test]
async fn test_fulfill_draw_without_winner_account_keeps_prize_claimable() {
    let DrawingRaffle {
        mut context,
        program_id,
        config,
        players,
    } = setup_drawing(1, result_selecting(1)).await;
    let (raffle_pubkey, _) = find_raffle_address(&program_id);
    let winner = &players[1];
    let raffle_before = balance(&mut context, raffle_pubkey).await;

    let ix = instruction::fulfill_draw(&program_id, &config.oracle.vrf, None);
    send(&mut context, &[ix], &[]).await.unwrap();

    let round = load_round(&mut context, &program_id).await;
    assert_eq!(round.state(), RaffleState::Open);
    assert_eq!(round.number_of_players(), 0);
    assert_eq!(round.recent_winner(), Some(winner.pubkey()));
    assert_eq!(round.unclaimed_for(&winner.pubkey()), 2 * ENTRANCE_FEE);
    assert_eq!(balance(&mut context, raffle_pubkey).await, raffle_before);

    // the loser has nothing to claim
    let ix = instruction::claim_prize(&program_id, &players[0].pubkey());
    assert_eq!(
        send(&mut context, &[ix], &[&players[0]]).await.unwrap_err(),
        custom(RaffleError::NothingToClaim)
    );

    let ix = instruction::claim_prize(&program_id, &winner.pubkey());
    send(&mut context, &[ix], &[winner]).await.unwrap();
    assert_eq!(
        balance(&mut context, winner.pubkey()).await,
        STARTING_BALANCE + 2 * ENTRANCE_FEE
    );
    assert_eq!(
        balance(&mut context, raffle_pubkey).await,
        raffle_before - 2 * ENTRANCE_FEE
    );
    let round = load_round(&mut context, &program_id).await;
    assert_eq!(round.unclaimed_for(&winner.pubkey()), 0);
}

#[tokio::test]
async fn test_fulfill_draw_rejects_stale_request() {
    let DrawingRaffle {
        mut context,
        program_id,
        config,
        players,
    } = setup_drawing(2, result_selecting(0)).await;

    let ix = instruction::fulfill_draw(&program_id, &config.oracle.vrf, Some(&players[0].pubkey()));
    assert_eq!(
        send(&mut context, &[ix], &[]).await.unwrap_err(),
        custom(RaffleError::UnknownRequest)
    );

    let round = load_round(&mut context, &program_id).await;
    assert_eq!(round.state(), RaffleState::Drawing);
    assert_eq!(round.pending_request(), Some(RequestId(1)));
}

#[tokio::test]
async fn test_fulfill_draw_before_result_is_ready() {
    let DrawingRaffle {
        mut context,
        program_id,
        config,
        ..
    } = setup_drawing(1, [0u8; 32]).await;

    let ix = instruction::fulfill_draw(&program_id, &config.oracle.vrf, None);
    assert_eq!(
        send(&mut context, &[ix], &[]).await.unwrap_err(),
        custom(RaffleError::RandomnessNotReady)
    );
    let round = load_round(&mut context, &program_id).await;
    assert_eq!(round.state(), RaffleState::Drawing);
}

#[tokio::test]
async fn test_fulfill_draw_rejects_foreign_vrf_account() {
    let (mut context, program_id, authority) = setup().await;
    initialize(&mut context, &program_id, &authority, test_config(8)).await;

    let ix = instruction::fulfill_draw(&program_id, &Pubkey::new_unique(), None);
    assert_eq!(
        send(&mut context, &[ix], &[]).await.unwrap_err(),
        TransactionError::InstructionError(0, InstructionError::InvalidAccountOwner)
    );

    let round = load_round(&mut context, &program_id).await;
    assert_eq!(round.state(), RaffleState::Open);
}

#[tokio::test]
async fn test_claim_with_nothing_owed() {
    let (mut context, program_id, authority) = setup().await;
    initialize(&mut context, &program_id, &authority, test_config(8)).await;

    let claimant = new_participant(&mut context).await;
    let ix = instruction::claim_prize(&program_id, &claimant.pubkey());
    assert_eq!(
        send(&mut context, &[ix], &[&claimant]).await.unwrap_err(),
        custom(RaffleError::NothingToClaim)
    );
}

#[tokio::test]
async fn test_enter_before_initialize() {
    let (mut context, program_id, _authority) = setup().await;

    let participant = new_participant(&mut context).await;
    let ix = instruction::enter_raffle(&program_id, &participant.pubkey(), ENTRANCE_FEE);
    assert_eq!(
        send(&mut context, &[ix], &[&participant]).await.unwrap_err(),
        TransactionError::InstructionError(0, InstructionError::IncorrectProgramId)
    );
}
