use crate::common::check_accounts;
use crate::instruction::{TokenPoolInstruction, PAYEE_ACCOUNT};
use crate::instructions::{
    add_member, buy_asset, buy_share, initialize, list_asset, sell_share, set_manager,
    transfer_asset_authority, upgrade_share,
};
use crate::share_ledger::{ProRataPolicy, SharePolicy};
use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    process_instruction_with_policy(
        program_id,
        accounts,
        instruction_data,
        &ProRataPolicy::default(),
    )
}

pub fn process_instruction_with_policy(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
    policy: &dyn SharePolicy,
) -> ProgramResult {
    let instruction = TokenPoolInstruction::unpack(instruction_data)?;
    let layout = instruction.account_layout();
    let payees = match instruction {
        TokenPoolInstruction::TransferAssetAuthority(_) => {
            accounts.len().saturating_sub(layout.len())
        }
        _ => 0,
    };
    check_accounts(accounts, layout, payees, PAYEE_ACCOUNT)?;

    match instruction {
        TokenPoolInstruction::Initialize(args) => initialize(program_id, accounts, args, policy),
        TokenPoolInstruction::AddMember { amount } => {
            add_member(program_id, accounts, amount, policy)
        }
        TokenPoolInstruction::SellShare { price } => {
            sell_share(program_id, accounts, price, policy)
        }
        TokenPoolInstruction::BuyShare => buy_share(program_id, accounts, policy),
        TokenPoolInstruction::UpgradeShare { amount } => {
            upgrade_share(program_id, accounts, amount, policy)
        }
        TokenPoolInstruction::ListAsset { price } => list_asset(program_id, accounts, price),
        TokenPoolInstruction::BuyAsset => buy_asset(program_id, accounts, policy),
        TokenPoolInstruction::SetManager => set_manager(program_id, accounts),
        TokenPoolInstruction::TransferAssetAuthority(args) => {
            transfer_asset_authority(program_id, accounts, args, policy)
        }
    }
}
