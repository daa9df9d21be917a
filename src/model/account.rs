use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::types::ids::UserId;
use crate::types::points::Points;

/// Points account of a user. The account guid is the owner's user guid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub guid: UserId,
    pub balance: Points,
    pub withdrawn_sum: Points,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(guid: UserId) -> Self {
        Account {
            guid,
            balance: Points::zero(),
            withdrawn_sum: Points::zero(),
            updated_at: Utc::now(),
        }
    }
}

/// Balance view returned to callers; zero for accounts that do not exist yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub current: Points,
    pub withdrawn: Points,
}

impl From<&Account> for BalanceSummary {
    fn from(account: &Account) -> Self {
        BalanceSummary {
            current: account.balance,
            withdrawn: account.withdrawn_sum,
        }
    }
}
