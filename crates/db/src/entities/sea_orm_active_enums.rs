//! `SeaORM` active enums mirroring the PostgreSQL enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `account_kind` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_kind")]
pub enum AccountKind {
    /// Credit.
    #[sea_orm(string_value = "credit")]
    Credit,
    /// Funds.
    #[sea_orm(string_value = "funds")]
    Funds,
    /// Points.
    #[sea_orm(string_value = "points")]
    Points,
}

/// `ledger_flow` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "ledger_flow")]
pub enum LedgerFlow {
    /// Income.
    #[sea_orm(string_value = "income")]
    Income,
    /// Outcome.
    #[sea_orm(string_value = "outcome")]
    Outcome,
}

/// `operation_type` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "operation_type")]
pub enum OperationType {
    /// Post.
    #[sea_orm(string_value = "post")]
    Post,
    /// Reply.
    #[sea_orm(string_value = "reply")]
    Reply,
    /// Contribute post.
    #[sea_orm(string_value = "contribute_post")]
    ContributePost,
    /// Contribute reply.
    #[sea_orm(string_value = "contribute_reply")]
    ContributeReply,
    /// Bind social.
    #[sea_orm(string_value = "bind_social")]
    BindSocial,
    /// AI usage.
    #[sea_orm(string_value = "ai_usage")]
    AiUsage,
    /// Buy.
    #[sea_orm(string_value = "buy")]
    Buy,
    /// Sell.
    #[sea_orm(string_value = "sell")]
    Sell,
    /// Deposit.
    #[sea_orm(string_value = "deposit")]
    Deposit,
    /// Withdraw.
    #[sea_orm(string_value = "withdraw")]
    Withdraw,
}

/// `social_provider` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "social_provider")]
pub enum SocialProvider {
    /// Twitter.
    #[sea_orm(string_value = "twitter")]
    Twitter,
    /// Discord.
    #[sea_orm(string_value = "discord")]
    Discord,
    /// Telegram.
    #[sea_orm(string_value = "telegram")]
    Telegram,
    /// GitHub.
    #[sea_orm(string_value = "github")]
    Github,
}

/// `related_entity_type` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "related_entity_type")]
pub enum RelatedEntityType {
    /// Post.
    #[sea_orm(string_value = "post")]
    Post,
    /// Reply.
    #[sea_orm(string_value = "reply")]
    Reply,
    /// Resource.
    #[sea_orm(string_value = "resource")]
    Resource,
    /// AI usage.
    #[sea_orm(string_value = "ai_usage")]
    AiUsage,
    /// User.
    #[sea_orm(string_value = "user")]
    User,
}
