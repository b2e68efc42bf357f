//! Value and custody movements.
//!
//! Treasury, vaults and escrow vaults are data-less system accounts at program
//! derived addresses, so moving value out of them goes through the system program
//! with the pda's signer seeds. Program-owned records are debited directly.
//! With the `test` feature (or under `cargo test`) cross-program invocations are
//! replaced by direct edits of the same accounts.

use crate::error::TokenPoolError;
use solana_program::{
    account_info::AccountInfo, entrypoint::ProgramResult, msg, program_error::ProgramError,
    program_pack::Pack, pubkey::Pubkey,
};

#[cfg(not(any(test, feature = "test")))]
use solana_program::{
    program::{invoke, invoke_signed},
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

/// Lamports a data-less custody account needs to stay rent exempt.
pub fn rent_exempt_minimum() -> Result<u64, ProgramError> {
    #[cfg(not(any(test, feature = "test")))]
    {
        Ok(Rent::get()?.minimum_balance(0))
    }
    #[cfg(any(test, feature = "test"))]
    {
        Ok(solana_program::rent::Rent::default().minimum_balance(0))
    }
}

/// Moves `amount` lamports out of a system account. `signer_seeds` is empty when
/// `from` signed the transaction and holds the pda seeds otherwise.
#[allow(unused_variables)]
pub fn transfer_lamports<'a>(
    from: &AccountInfo<'a>,
    to: &AccountInfo<'a>,
    system_program: &AccountInfo<'a>,
    amount: u64,
    signer_seeds: &[&[&[u8]]],
) -> ProgramResult {
    if amount == 0 {
        return Ok(());
    }
    if from.lamports() < amount {
        msg!("{} holds {} lamports, needs {}", from.key, from.lamports(), amount);
        return Err(TokenPoolError::InsufficientFunds.into());
    }
    #[cfg(not(any(test, feature = "test")))]
    {
        invoke_signed(
            &system_instruction::transfer(from.key, to.key, amount),
            &[from.clone(), to.clone(), system_program.clone()],
            signer_seeds,
        )
    }
    #[cfg(any(test, feature = "test"))]
    {
        move_lamports(from, to, amount)
    }
}

/// Closes a program-owned record: all of its lamports go to `destination` and its
/// data is zeroed.
pub fn close_record(record: &AccountInfo, destination: &AccountInfo) -> ProgramResult {
    move_lamports(record, destination, record.lamports())?;
    record.try_borrow_mut_data()?.fill(0);
    Ok(())
}

fn move_lamports(from: &AccountInfo, to: &AccountInfo, amount: u64) -> ProgramResult {
    let remaining = from
        .lamports()
        .checked_sub(amount)
        .ok_or(TokenPoolError::InsufficientFunds)?;
    let credited = to
        .lamports()
        .checked_add(amount)
        .ok_or(TokenPoolError::ArithmeticOverflow)?;
    **from.try_borrow_mut_lamports()? = remaining;
    **to.try_borrow_mut_lamports()? = credited;
    Ok(())
}

/// Reads a token account and checks it holds exactly the non-fungible `mint`
/// under `authority`.
pub fn check_asset_custody(
    asset_account: &AccountInfo,
    mint: &Pubkey,
    authority: &Pubkey,
) -> ProgramResult {
    if *asset_account.owner != spl_token::id() {
        msg!("Asset account {} is not a token account", asset_account.key);
        return Err(TokenPoolError::AssetMismatch.into());
    }
    let token = spl_token::state::Account::unpack(&asset_account.try_borrow_data()?)?;
    if token.mint != *mint {
        msg!("Asset account holds mint {}, expected {}", token.mint, mint);
        return Err(TokenPoolError::AssetMismatch.into());
    }
    if token.owner != *authority {
        msg!("Asset account is held by {}, expected {}", token.owner, authority);
        return Err(TokenPoolError::Unauthorized.into());
    }
    if token.amount != crate::constants::ASSET_UNITS {
        msg!("Asset account holds {} units", token.amount);
        return Err(TokenPoolError::AssetMismatch.into());
    }
    Ok(())
}

/// Hands ownership of the asset's token account from `current_authority` to
/// `new_authority`.
#[allow(unused_variables)]
pub fn hand_over_asset<'a>(
    token_program: &AccountInfo<'a>,
    asset_account: &AccountInfo<'a>,
    current_authority: &AccountInfo<'a>,
    new_authority: &Pubkey,
    signer_seeds: &[&[&[u8]]],
) -> ProgramResult {
    #[cfg(not(any(test, feature = "test")))]
    {
        let ix = spl_token::instruction::set_authority(
            token_program.key,
            asset_account.key,
            Some(new_authority),
            spl_token::instruction::AuthorityType::AccountOwner,
            current_authority.key,
            &[],
        )?;
        let account_infos = [
            asset_account.clone(),
            current_authority.clone(),
            token_program.clone(),
        ];
        if signer_seeds.is_empty() {
            invoke(&ix, &account_infos)
        } else {
            invoke_signed(&ix, &account_infos, signer_seeds)
        }
    }
    #[cfg(any(test, feature = "test"))]
    {
        let mut data = asset_account.try_borrow_mut_data()?;
        let mut token = spl_token::state::Account::unpack(&data)?;
        if token.owner != *current_authority.key {
            return Err(TokenPoolError::Unauthorized.into());
        }
        token.owner = *new_authority;
        spl_token::state::Account::pack(token, &mut data)?;
        Ok(())
    }
}

/// Splits `proceeds` over `shares` (percentage points). Returns each payout in
/// order and the rounding remainder.
pub fn split_proceeds(proceeds: u64, shares: &[f64]) -> Result<(Vec<u64>, u64), TokenPoolError> {
    let mut payouts = Vec::with_capacity(shares.len());
    let mut paid = 0u64;
    for share in shares {
        let payout = (proceeds as f64 * share / crate::constants::SHARE_TOTAL).floor();
        if !payout.is_finite() || payout < 0.0 {
            return Err(TokenPoolError::ArithmeticOverflow);
        }
        let payout = (payout as u64).min(proceeds - paid);
        paid = paid
            .checked_add(payout)
            .ok_or(TokenPoolError::ArithmeticOverflow)?;
        payouts.push(payout);
    }
    Ok((payouts, proceeds - paid))
}
