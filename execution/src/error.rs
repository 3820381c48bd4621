use greenbox_types::greenbox::PackError;
use thiserror::Error as ThisError;

/// Reasons a transaction is rejected.
///
/// Every variant except [`GreenboxError::State`] rolls the transaction back and surfaces
/// its message as the rejection reason. `State` aborts the whole block.
#[derive(Debug, ThisError)]
pub enum GreenboxError {
    // Configuration
    #[error("Empty Domain")]
    EmptyDomain,
    #[error("Over Limit")]
    OverLimit,
    #[error("Zero Boxes")]
    ZeroBoxes,
    #[error("Wrong Chance")]
    WrongChance,
    #[error("Wrong Decimal")]
    WrongDecimal,
    #[error("Node Not Exist")]
    NodeNotExist,

    // Authorization
    #[error("Not Owner")]
    NotOwner,
    #[error("Wrong Signature")]
    WrongSignature,
    #[error("Nonce Not Match")]
    NonceNotMatch,
    #[error("Expired Deadline")]
    ExpiredDeadline,

    // Resource
    #[error("Node Sold")]
    NodeSold,
    #[error("Wrong percentage")]
    WrongPercentage,
    #[error("Wrong Node Id")]
    WrongNodeId,
    #[error("Insufficient Balance")]
    InsufficientBalance,
    #[error("Insufficient Lucky Fund")]
    InsufficientLuckyFund,

    // Input
    #[error("Wrong Length")]
    WrongLength,

    // Arithmetic limits
    #[error("Price Overflow")]
    PriceOverflow,
    #[error("Balance Overflow")]
    BalanceOverflow,
    #[error("Height Overflow")]
    HeightOverflow,
    #[error("Action Overflow")]
    ActionOverflow,

    #[error("state error: {0:#}")]
    State(#[from] anyhow::Error),
}

impl GreenboxError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::State(_))
    }
}

impl From<PackError> for GreenboxError {
    fn from(err: PackError) -> Self {
        match err {
            PackError::ChanceOverflow { .. } => Self::WrongChance,
            PackError::DecimalTooLarge { .. } => Self::WrongDecimal,
            PackError::NodeIdTooLarge { .. } => Self::WrongNodeId,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_match_user_visible_strings() {
        assert_eq!(GreenboxError::EmptyDomain.to_string(), "Empty Domain");
        assert_eq!(GreenboxError::WrongPercentage.to_string(), "Wrong percentage");
        assert_eq!(
            GreenboxError::from(PackError::ChanceOverflow {
                total: 65_536,
                max: 65_535
            })
            .to_string(),
            "Wrong Chance"
        );
        assert!(!GreenboxError::OverLimit.is_fatal());
        assert!(GreenboxError::from(anyhow::anyhow!("disk")).is_fatal());
    }
}
