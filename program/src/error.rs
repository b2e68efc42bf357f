use solana_program::{decode_error::DecodeError, program_error::ProgramError};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum TokenPoolError {
    // Validation
    #[error("Account list does not match the instruction layout")]
    InvalidAccountShape,

    #[error("Missing required signature")]
    MissingSignature,

    #[error("Record is not owned by the token pool program")]
    InvalidOwner,

    #[error("Derived address does not match the account passed in")]
    InvalidDerivedAddress,

    #[error("Signer is not allowed to perform this action")]
    Unauthorized,

    #[error("Amount data is invalid")]
    InvalidAmount,

    #[error("Minimum amount is greater than target amount")]
    WrongAmountData,

    #[error("Description exceeds max length")]
    DescriptionTooLong,

    #[error("Member already exists in pool")]
    MemberAlreadyExists,

    #[error("Member is not part of token pool")]
    MemberNotInPool,

    #[error("Deposit exceeds the remaining target amount")]
    DepositExceedsTarget,

    #[error("Deposit is below the pool minimum amount")]
    BelowMinimumAmount,

    #[error("Asset does not match the listing")]
    AssetMismatch,

    #[error("Buyer and seller are the same party")]
    SelfPurchase,

    // Capacity
    #[error("Maximum members in token pool should be at least one")]
    InvalidCapacity,

    #[error("Token pool has been filled")]
    NoMemberSpaceLeft,

    // State
    #[error("Record is already initialized")]
    AlreadyInitialized,

    #[error("Token pool is not initialized")]
    UninitializedTokenPool,

    #[error("Token pool stage is invalid")]
    InvalidPoolStage,

    #[error("Escrow stage is invalid")]
    InvalidEscrowStage,

    #[error("Share is already escrowed")]
    ShareAlreadyEscrowed,

    #[error("Target amount for the pool has been collected")]
    TargetBalanceReached,

    #[error("Target amount for the pool has not been collected")]
    TargetNotReached,

    #[error("A share sale is still open")]
    ShareSaleInProgress,

    // Insufficient funds
    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Last member has to reach target amount")]
    InsufficientFundsAsLastMember,

    // Arithmetic
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Member shares no longer add up")]
    ShareInvariantViolated,

    // Decode
    #[error("Invalid instruction data")]
    InvalidInstruction,

    #[error("Invalid record data")]
    InvalidRecordData,
}

/// The caller-facing taxonomy every error belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorCategory {
    Validation,
    Capacity,
    State,
    InsufficientFunds,
    Arithmetic,
    Decode,
}

impl TokenPoolError {
    pub fn category(&self) -> ErrorCategory {
        use TokenPoolError::*;
        match self {
            InvalidAccountShape | MissingSignature | InvalidOwner | InvalidDerivedAddress
            | Unauthorized | InvalidAmount | WrongAmountData | DescriptionTooLong
            | MemberAlreadyExists | MemberNotInPool | DepositExceedsTarget
            | BelowMinimumAmount | AssetMismatch | SelfPurchase => ErrorCategory::Validation,
            InvalidCapacity | NoMemberSpaceLeft => ErrorCategory::Capacity,
            AlreadyInitialized | UninitializedTokenPool | InvalidPoolStage
            | InvalidEscrowStage | ShareAlreadyEscrowed | TargetBalanceReached
            | TargetNotReached | ShareSaleInProgress => ErrorCategory::State,
            InsufficientFunds | InsufficientFundsAsLastMember => ErrorCategory::InsufficientFunds,
            ArithmeticOverflow | ShareInvariantViolated => ErrorCategory::Arithmetic,
            InvalidInstruction | InvalidRecordData => ErrorCategory::Decode,
        }
    }
}

impl From<TokenPoolError> for ProgramError {
    fn from(e: TokenPoolError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for TokenPoolError {
    fn type_of() -> &'static str {
        "Token Pool Error"
    }
}
