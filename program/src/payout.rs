use solana_program::{account_info::AccountInfo, msg, program_error::ProgramError, pubkey::Pubkey};

/// Settlement boundary: moves a prize out of the pot.
pub trait PrizeTransfer {
    fn transfer(&mut self, winner: &Pubkey, amount: u64) -> Result<(), ProgramError>;
}

/// Pays out of the program-owned round account by moving lamports directly.
pub struct LamportTransfer<'a, 'b> {
    pub source: &'a AccountInfo<'b>,
    /// Account the caller supplied for the winner, if any
    pub recipient: Option<&'a AccountInfo<'b>>,
}

impl<'a, 'b> PrizeTransfer for LamportTransfer<'a, 'b> {
    fn transfer(&mut self, winner: &Pubkey, amount: u64) -> Result<(), ProgramError> {
        let recipient = self.recipient.ok_or_else(|| {
            msg!("No winner account supplied");
            ProgramError::NotEnoughAccountKeys
        })?;
        if recipient.key != winner {
            msg!("Supplied account {} is not the winner {}", recipient.key, winner);
            return Err(ProgramError::InvalidArgument);
        }
        if !recipient.is_writable {
            msg!("Winner account must be writable");
            return Err(ProgramError::InvalidArgument);
        }

        let source_balance = self
            .source
            .lamports()
            .checked_sub(amount)
            .ok_or(ProgramError::InsufficientFunds)?;
        let recipient_balance = recipient
            .lamports()
            .checked_add(amount)
            .ok_or(ProgramError::InvalidArgument)?;

        **self.source.try_borrow_mut_lamports()? = source_balance;
        **recipient.try_borrow_mut_lamports()? = recipient_balance;
        Ok(())
    }
}
