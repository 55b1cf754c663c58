//! Shared domain enumerations aligned with persisted database enums.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum UserRole {
    Member,
    Premium,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Member => "member",
            UserRole::Premium => "premium",
            UserRole::Admin => "admin",
        }
    }
}

impl TryFrom<&str> for UserRole {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "member" => Ok(UserRole::Member),
            "premium" => Ok(UserRole::Premium),
            "admin" => Ok(UserRole::Admin),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "donation_status", rename_all = "snake_case")]
pub enum DonationStatus {
    Pending,
    Completed,
    Failed,
}

/// Month bucket for product-vote allowances, rendered as `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthKey(pub String);

impl MonthKey {
    pub fn current() -> Self {
        let now = time::OffsetDateTime::now_utc();
        Self::from_date(now)
    }

    pub fn from_date(at: time::OffsetDateTime) -> Self {
        Self(format!("{:04}-{:02}", at.year(), u8::from(at.month())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn month_key_zero_pads() {
        let key = MonthKey::from_date(datetime!(2025-03-05 10:00 UTC));
        assert_eq!(key.as_str(), "2025-03");
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [UserRole::Member, UserRole::Premium, UserRole::Admin] {
            assert_eq!(UserRole::try_from(role.as_str()), Ok(role));
        }
        assert!(UserRole::try_from("root").is_err());
    }
}
