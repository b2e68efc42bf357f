use crate::{
    common::AccountSpec,
    error::TokenPoolError,
    state::{Escrow, Pool, PoolTerms},
};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::Serialize;
use solana_program::{
    instruction::{AccountMeta, Instruction},
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InitializeArgs {
    pub target_amount: u64,
    pub minimum_amount: u64,
    pub minimum_exemption_amount: u64,
    pub description: String,
    pub max_members: u32,
}

impl From<&InitializeArgs> for PoolTerms {
    fn from(args: &InitializeArgs) -> Self {
        PoolTerms {
            target_amount: args.target_amount,
            minimum_amount: args.minimum_amount,
            minimum_exemption_amount: args.minimum_exemption_amount,
            description: args.description.clone(),
            max_members: args.max_members,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FinalSaleArgs {
    /// Paid by the final buyer
    pub price: u64,
    /// Kept by the manager before proceeds are distributed
    pub exemption_amount: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenPoolInstruction {
    /// Opens a pool.
    /// Accounts:
    /// - [signer, writable] Manager
    /// - [writable] Pool record, pre-allocated to `Pool::space`
    /// - [] Pool vault (PDA)
    /// - [writable] Pool treasury (PDA)
    /// - [] Target asset mint
    /// - [] System program
    Initialize(InitializeArgs),

    /// Deposits into the treasury and takes a member slot.
    /// Accounts:
    /// - [signer, writable] Member
    /// - [writable] Pool record
    /// - [writable] Pool treasury (PDA)
    /// - [] System program
    AddMember { amount: u64 },

    /// Offers the signer's share for `price` lamports.
    /// Accounts:
    /// - [signer] Member
    /// - [writable] Pool record
    /// - [writable] Escrow record, pre-allocated to `Escrow::LEN`
    /// - [] Share escrow vault (PDA)
    SellShare { price: u64 },

    /// Buys an open share sale.
    /// Accounts:
    /// - [signer, writable] Buyer
    /// - [writable] Seller
    /// - [writable] Pool record
    /// - [writable] Escrow record
    /// - [] Share escrow vault (PDA)
    /// - [] System program
    BuyShare,

    /// Deposits more into an existing slot.
    /// Accounts:
    /// - [signer, writable] Member
    /// - [writable] Pool record
    /// - [writable] Pool treasury (PDA)
    /// - [] System program
    UpgradeShare { amount: u64 },

    /// Offers an asset for sale to a pool.
    /// Accounts:
    /// - [signer] Seller
    /// - [writable] Escrow record, pre-allocated to `Escrow::LEN`
    /// - [writable] Seller asset token account
    /// - [] Listing escrow vault (PDA)
    /// - [] Asset mint
    /// - [] Token program
    ListAsset { price: u64 },

    /// Buys the listed asset with the raised balance.
    /// Accounts:
    /// - [signer, writable] Manager
    /// - [writable] Pool record
    /// - [writable] Pool treasury (PDA)
    /// - [writable] Escrow record
    /// - [writable] Seller
    /// - [writable] Asset token account
    /// - [] Listing escrow vault (PDA)
    /// - [] Pool vault (PDA)
    /// - [] Token program
    /// - [] System program
    BuyAsset,

    /// Accounts:
    /// - [signer] Manager
    /// - [writable] Pool record
    /// - [] New manager
    SetManager,

    /// Sells the pooled asset, pays out the members and closes the pool.
    /// Accounts:
    /// - [signer, writable] Manager
    /// - [signer, writable] Buyer
    /// - [writable] Pool record
    /// - [writable] Pool treasury (PDA)
    /// - [writable] Asset token account
    /// - [] Pool vault (PDA)
    /// - [] Token program
    /// - [] System program
    /// - [writable] One account per occupied member slot, in slot order
    TransferAssetAuthority(FinalSaleArgs),
}

pub const INITIALIZE_ACCOUNTS: [AccountSpec; 6] = [
    AccountSpec::signer_writable("Manager"),
    AccountSpec::writable("Pool"),
    AccountSpec::readonly("Vault"),
    AccountSpec::writable("Treasury"),
    AccountSpec::readonly("Target Asset"),
    AccountSpec::readonly("System Program"),
];

pub const ADD_MEMBER_ACCOUNTS: [AccountSpec; 4] = [
    AccountSpec::signer_writable("Member"),
    AccountSpec::writable("Pool"),
    AccountSpec::writable("Treasury"),
    AccountSpec::readonly("System Program"),
];

pub const SELL_SHARE_ACCOUNTS: [AccountSpec; 4] = [
    AccountSpec::signer("Member"),
    AccountSpec::writable("Pool"),
    AccountSpec::writable("Escrow"),
    AccountSpec::readonly("Escrow Vault"),
];

pub const BUY_SHARE_ACCOUNTS: [AccountSpec; 6] = [
    AccountSpec::signer_writable("Buyer"),
    AccountSpec::writable("Seller"),
    AccountSpec::writable("Pool"),
    AccountSpec::writable("Escrow"),
    AccountSpec::readonly("Escrow Vault"),
    AccountSpec::readonly("System Program"),
];

pub const UPGRADE_SHARE_ACCOUNTS: [AccountSpec; 4] = ADD_MEMBER_ACCOUNTS;

pub const LIST_ASSET_ACCOUNTS: [AccountSpec; 6] = [
    AccountSpec::signer("Seller"),
    AccountSpec::writable("Escrow"),
    AccountSpec::writable("Seller Asset Account"),
    AccountSpec::readonly("Escrow Vault"),
    AccountSpec::readonly("Asset Mint"),
    AccountSpec::readonly("Token Program"),
];

pub const BUY_ASSET_ACCOUNTS: [AccountSpec; 10] = [
    AccountSpec::signer_writable("Manager"),
    AccountSpec::writable("Pool"),
    AccountSpec::writable("Treasury"),
    AccountSpec::writable("Escrow"),
    AccountSpec::writable("Seller"),
    AccountSpec::writable("Asset Account"),
    AccountSpec::readonly("Escrow Vault"),
    AccountSpec::readonly("Vault"),
    AccountSpec::readonly("Token Program"),
    AccountSpec::readonly("System Program"),
];

pub const SET_MANAGER_ACCOUNTS: [AccountSpec; 3] = [
    AccountSpec::signer("Manager"),
    AccountSpec::writable("Pool"),
    AccountSpec::readonly("New Manager"),
];

pub const FINAL_SALE_ACCOUNTS: [AccountSpec; 8] = [
    AccountSpec::signer_writable("Manager"),
    AccountSpec::signer_writable("Buyer"),
    AccountSpec::writable("Pool"),
    AccountSpec::writable("Treasury"),
    AccountSpec::writable("Asset Account"),
    AccountSpec::readonly("Vault"),
    AccountSpec::readonly("Token Program"),
    AccountSpec::readonly("System Program"),
];

/// Trailing final sale account: a member, or the seller and then the escrow
/// record of a slot with an open share sale.
pub const PAYEE_ACCOUNT: AccountSpec = AccountSpec::writable("Member");

/// Fields every instruction carries after its opcode.
#[derive(BorshSerialize, BorshDeserialize, Default)]
struct PoolPayload {
    amount: u64,
    minimum_amount: u64,
    description: String,
    max_members: u32,
}

impl TokenPoolInstruction {
    pub fn opcode(&self) -> u8 {
        match self {
            Self::Initialize(_) => 0,
            Self::AddMember { .. } => 1,
            Self::SellShare { .. } => 2,
            Self::BuyShare => 3,
            Self::UpgradeShare { .. } => 4,
            Self::ListAsset { .. } => 5,
            Self::BuyAsset => 6,
            Self::SetManager => 7,
            Self::TransferAssetAuthority(_) => 8,
        }
    }

    pub fn account_layout(&self) -> &'static [AccountSpec] {
        match self {
            Self::Initialize(_) => &INITIALIZE_ACCOUNTS,
            Self::AddMember { .. } => &ADD_MEMBER_ACCOUNTS,
            Self::SellShare { .. } => &SELL_SHARE_ACCOUNTS,
            Self::BuyShare => &BUY_SHARE_ACCOUNTS,
            Self::UpgradeShare { .. } => &UPGRADE_SHARE_ACCOUNTS,
            Self::ListAsset { .. } => &LIST_ASSET_ACCOUNTS,
            Self::BuyAsset => &BUY_ASSET_ACCOUNTS,
            Self::SetManager => &SET_MANAGER_ACCOUNTS,
            Self::TransferAssetAuthority(_) => &FINAL_SALE_ACCOUNTS,
        }
    }

    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (&variant, mut rest) = input
            .split_first()
            .ok_or(TokenPoolError::InvalidInstruction)?;
        let payload = PoolPayload::deserialize(&mut rest)
            .map_err(|_| TokenPoolError::InvalidInstruction)?;
        let instruction = match variant {
            0 => Self::Initialize(InitializeArgs {
                target_amount: payload.amount,
                minimum_amount: payload.minimum_amount,
                minimum_exemption_amount: Self::unpack_trailing(&mut rest)?,
                description: payload.description,
                max_members: payload.max_members,
            }),
            1 => Self::AddMember {
                amount: payload.amount,
            },
            2 => Self::SellShare {
                price: payload.amount,
            },
            3 => Self::BuyShare,
            4 => Self::UpgradeShare {
                amount: payload.amount,
            },
            5 => Self::ListAsset {
                price: payload.amount,
            },
            6 => Self::BuyAsset,
            7 => Self::SetManager,
            8 => Self::TransferAssetAuthority(FinalSaleArgs {
                price: payload.amount,
                exemption_amount: Self::unpack_trailing(&mut rest)?,
            }),
            _ => {
                msg!("Invalid instruction variant: {}", variant);
                return Err(TokenPoolError::InvalidInstruction.into());
            }
        };
        if !rest.is_empty() {
            msg!("{} trailing bytes in instruction data", rest.len());
            return Err(TokenPoolError::InvalidInstruction.into());
        }
        Ok(instruction)
    }

    fn unpack_trailing(rest: &mut &[u8]) -> Result<u64, ProgramError> {
        u64::deserialize(rest).map_err(|_| TokenPoolError::InvalidInstruction.into())
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut payload = PoolPayload::default();
        let mut trailing = None;
        match self {
            Self::Initialize(args) => {
                payload.amount = args.target_amount;
                payload.minimum_amount = args.minimum_amount;
                payload.description = args.description.clone();
                payload.max_members = args.max_members;
                trailing = Some(args.minimum_exemption_amount);
            }
            Self::AddMember { amount } | Self::UpgradeShare { amount } => payload.amount = *amount,
            Self::SellShare { price } | Self::ListAsset { price } => payload.amount = *price,
            Self::BuyShare | Self::BuyAsset | Self::SetManager => {}
            Self::TransferAssetAuthority(args) => {
                payload.amount = args.price;
                trailing = Some(args.exemption_amount);
            }
        }
        let mut buf = vec![self.opcode()];
        payload.serialize(&mut buf).unwrap_or_default();
        if let Some(value) = trailing {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        buf
    }
}

fn metas(layout: &[AccountSpec], keys: &[Pubkey]) -> Vec<AccountMeta> {
    layout
        .iter()
        .zip(keys)
        .map(|(spec, key)| {
            if spec.is_writable {
                AccountMeta::new(*key, spec.is_signer)
            } else {
                AccountMeta::new_readonly(*key, spec.is_signer)
            }
        })
        .collect()
}

pub fn initialize(
    program_id: &Pubkey,
    manager: &Pubkey,
    pool: &Pubkey,
    target_asset: &Pubkey,
    args: InitializeArgs,
) -> Instruction {
    let (vault, _) = Pool::find_vault_address(pool, program_id);
    let (treasury, _) = Pool::find_treasury_address(pool, program_id);
    let data = TokenPoolInstruction::Initialize(args).pack();
    Instruction {
        program_id: *program_id,
        accounts: metas(
            &INITIALIZE_ACCOUNTS,
            &[*manager, *pool, vault, treasury, *target_asset, system_program::id()],
        ),
        data,
    }
}

pub fn add_member(program_id: &Pubkey, member: &Pubkey, pool: &Pubkey, amount: u64) -> Instruction {
    let (treasury, _) = Pool::find_treasury_address(pool, program_id);
    Instruction {
        program_id: *program_id,
        accounts: metas(
            &ADD_MEMBER_ACCOUNTS,
            &[*member, *pool, treasury, system_program::id()],
        ),
        data: TokenPoolInstruction::AddMember { amount }.pack(),
    }
}

pub fn upgrade_share(
    program_id: &Pubkey,
    member: &Pubkey,
    pool: &Pubkey,
    amount: u64,
) -> Instruction {
    let (treasury, _) = Pool::find_treasury_address(pool, program_id);
    Instruction {
        program_id: *program_id,
        accounts: metas(
            &UPGRADE_SHARE_ACCOUNTS,
            &[*member, *pool, treasury, system_program::id()],
        ),
        data: TokenPoolInstruction::UpgradeShare { amount }.pack(),
    }
}

pub fn sell_share(
    program_id: &Pubkey,
    member: &Pubkey,
    pool: &Pubkey,
    escrow: &Pubkey,
    price: u64,
) -> Instruction {
    let (escrow_vault, _) = Escrow::find_share_vault_address(member, pool, program_id);
    Instruction {
        program_id: *program_id,
        accounts: metas(&SELL_SHARE_ACCOUNTS, &[*member, *pool, *escrow, escrow_vault]),
        data: TokenPoolInstruction::SellShare { price }.pack(),
    }
}

pub fn buy_share(
    program_id: &Pubkey,
    buyer: &Pubkey,
    seller: &Pubkey,
    pool: &Pubkey,
    escrow: &Pubkey,
) -> Instruction {
    let (escrow_vault, _) = Escrow::find_share_vault_address(seller, pool, program_id);
    Instruction {
        program_id: *program_id,
        accounts: metas(
            &BUY_SHARE_ACCOUNTS,
            &[*buyer, *seller, *pool, *escrow, escrow_vault, system_program::id()],
        ),
        data: TokenPoolInstruction::BuyShare.pack(),
    }
}

pub fn list_asset(
    program_id: &Pubkey,
    seller: &Pubkey,
    escrow: &Pubkey,
    seller_asset_account: &Pubkey,
    asset_mint: &Pubkey,
    price: u64,
) -> Instruction {
    let (escrow_vault, _) = Escrow::find_listing_vault_address(seller_asset_account, program_id);
    Instruction {
        program_id: *program_id,
        accounts: metas(
            &LIST_ASSET_ACCOUNTS,
            &[
                *seller,
                *escrow,
                *seller_asset_account,
                escrow_vault,
                *asset_mint,
                spl_token::id(),
            ],
        ),
        data: TokenPoolInstruction::ListAsset { price }.pack(),
    }
}

pub fn buy_asset(
    program_id: &Pubkey,
    manager: &Pubkey,
    pool: &Pubkey,
    escrow: &Pubkey,
    seller: &Pubkey,
    asset_account: &Pubkey,
) -> Instruction {
    let (treasury, _) = Pool::find_treasury_address(pool, program_id);
    let (vault, _) = Pool::find_vault_address(pool, program_id);
    let (escrow_vault, _) = Escrow::find_listing_vault_address(asset_account, program_id);
    Instruction {
        program_id: *program_id,
        accounts: metas(
            &BUY_ASSET_ACCOUNTS,
            &[
                *manager,
                *pool,
                treasury,
                *escrow,
                *seller,
                *asset_account,
                escrow_vault,
                vault,
                spl_token::id(),
                system_program::id(),
            ],
        ),
        data: TokenPoolInstruction::BuyAsset.pack(),
    }
}

pub fn set_manager(
    program_id: &Pubkey,
    manager: &Pubkey,
    pool: &Pubkey,
    new_manager: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: metas(&SET_MANAGER_ACCOUNTS, &[*manager, *pool, *new_manager]),
        data: TokenPoolInstruction::SetManager.pack(),
    }
}

/// `payees` lists the occupied slots in slot order: the member key, or for an
/// escrowed slot the seller followed by the open escrow record.
pub fn transfer_asset_authority(
    program_id: &Pubkey,
    manager: &Pubkey,
    buyer: &Pubkey,
    pool: &Pubkey,
    asset_account: &Pubkey,
    payees: &[Pubkey],
    args: FinalSaleArgs,
) -> Instruction {
    let (treasury, _) = Pool::find_treasury_address(pool, program_id);
    let (vault, _) = Pool::find_vault_address(pool, program_id);
    let mut accounts = metas(
        &FINAL_SALE_ACCOUNTS,
        &[
            *manager,
            *buyer,
            *pool,
            treasury,
            *asset_account,
            vault,
            spl_token::id(),
            system_program::id(),
        ],
    );
    accounts.extend(payees.iter().map(|payee| AccountMeta::new(*payee, false)));
    Instruction {
        program_id: *program_id,
        accounts,
        data: TokenPoolInstruction::TransferAssetAuthority(args).pack(),
    }
}
