use arrayref::{array_ref, array_refs};
use solana_program::{bpf_loader_upgradeable, pubkey::Pubkey};

use crate::state::RAFFLE_SEED;

/// Find the program derived address of the round account
pub fn find_raffle_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[RAFFLE_SEED], program_id)
}

/// Find the ProgramData account holding the program's upgrade authority
pub fn find_program_data_address(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[program_id.as_ref()], &bpf_loader_upgradeable::id()).0
}

/// Bytes before the program code in a ProgramData account:
/// u32 variant tag, u64 deploy slot, optional authority
pub const PROGRAM_DATA_METADATA_LEN: usize = 4 + 8 + 1 + 32;

const PROGRAM_DATA_TAG: u32 = 3;

/// Upgrade authority recorded in a ProgramData account, `None` when the
/// program is immutable or the data is not ProgramData
pub fn upgrade_authority(program_data: &[u8]) -> Option<Pubkey> {
    if program_data.len() < PROGRAM_DATA_METADATA_LEN {
        return None;
    }
    let metadata = array_ref![program_data, 0, PROGRAM_DATA_METADATA_LEN];
    let (tag, _slot, has_authority, authority) = array_refs![metadata, 4, 8, 1, 32];
    if u32::from_le_bytes(*tag) != PROGRAM_DATA_TAG || has_authority[0] != 1 {
        return None;
    }
    Some(Pubkey::new_from_array(*authority))
}

/// Read the random word out of a 32-byte oracle result (first 8 bytes, little endian)
pub fn random_word(result: &[u8; 32]) -> u64 {
    u64::from_le_bytes(*array_ref![result, 0, 8])
}

/// Index of the winning entry among `entries`
pub fn winner_index(random_word: u64, entries: usize) -> Option<usize> {
    if entries == 0 {
        return None;
    }
    Some((random_word % entries as u64) as usize)
}

/// Convert lamports to SOL (for display purposes)
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / 1_000_000_000.0
}
