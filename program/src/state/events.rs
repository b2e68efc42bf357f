use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct MemberRecord {
    pub pool: String,
    pub member: String,
    pub action: MemberAction,
    pub amount: u64,
    pub share_before: f64,
    pub share_after: f64,
    pub pool_balance: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub enum MemberAction {
    Join,
    Upgrade,
    ListShare,
    BuyShare,
    Payout,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolRecord {
    /// Pool, or escrow for a listing that has no pool yet
    pub record: String,
    pub action: PoolAction,
    pub counterparty: String,
    pub amount: u64,
    pub manager_fee: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub enum PoolAction {
    Initialize,
    ListAsset,
    BuyAsset,
    SetManager,
    FinalSale,
}
