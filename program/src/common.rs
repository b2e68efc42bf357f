use crate::error::TokenPoolError;
use serde::Serialize;
use solana_program::{
    account_info::AccountInfo, entrypoint::ProgramResult, msg, pubkey::Pubkey, system_program,
};

/// Signer/writable requirements for one position of an instruction's account list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountSpec {
    pub name: &'static str,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountSpec {
    pub const fn readonly(name: &'static str) -> Self {
        Self {
            name,
            is_signer: false,
            is_writable: false,
        }
    }

    pub const fn writable(name: &'static str) -> Self {
        Self {
            name,
            is_signer: false,
            is_writable: true,
        }
    }

    pub const fn signer(name: &'static str) -> Self {
        Self {
            name,
            is_signer: true,
            is_writable: false,
        }
    }

    pub const fn signer_writable(name: &'static str) -> Self {
        Self {
            name,
            is_signer: true,
            is_writable: true,
        }
    }

    fn check(&self, account: &AccountInfo) -> ProgramResult {
        if self.is_signer && !account.is_signer {
            msg!("{} must sign", self.name);
            return Err(TokenPoolError::MissingSignature.into());
        }
        if self.is_writable && !account.is_writable {
            msg!("{} must be writable", self.name);
            return Err(TokenPoolError::InvalidAccountShape.into());
        }
        Ok(())
    }
}

/// Checks the account list against `layout`, allowing `trailing` extra accounts
/// that each must satisfy `trailing_spec`.
pub fn check_accounts(
    accounts: &[AccountInfo],
    layout: &[AccountSpec],
    trailing: usize,
    trailing_spec: AccountSpec,
) -> ProgramResult {
    if accounts.len() != layout.len() + trailing {
        msg!(
            "Expected {} accounts, got {}",
            layout.len() + trailing,
            accounts.len()
        );
        return Err(TokenPoolError::InvalidAccountShape.into());
    }
    let (fixed, tail) = accounts.split_at(layout.len());
    for (spec, account) in layout.iter().zip(fixed) {
        spec.check(account)?;
    }
    for account in tail {
        trailing_spec.check(account)?;
    }
    Ok(())
}

/// Program-derived address for `seeds`. Such addresses have no private key; only
/// the program can sign for them.
pub fn derive_address(seeds: &[&[u8]], program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(seeds, program_id)
}

pub fn check_derived_address(account: &AccountInfo, expected: &Pubkey, name: &str) -> ProgramResult {
    if account.key != expected {
        msg!("Invalid seeds for {} PDA", name);
        return Err(TokenPoolError::InvalidDerivedAddress.into());
    }
    Ok(())
}

pub fn check_system_program(account: &AccountInfo) -> ProgramResult {
    if *account.key != system_program::id() {
        msg!("Invalid system program {}", account.key);
        return Err(TokenPoolError::InvalidAccountShape.into());
    }
    Ok(())
}

pub fn check_token_program(account: &AccountInfo) -> ProgramResult {
    if *account.key != spl_token::id() {
        msg!("Invalid token program {}", account.key);
        return Err(TokenPoolError::InvalidAccountShape.into());
    }
    Ok(())
}

pub fn log_accounts(accounts: &[(&AccountInfo, &str)]) {
    for (account, name) in accounts {
        msg!("{}: {}", name, account.key);
    }
}

pub fn log_params<T: Serialize>(params: &T) {
    match serde_json::to_string(params) {
        Ok(json) => msg!("{}", json),
        Err(e) => msg!("Failed to serialize params: {}", e),
    }
}
