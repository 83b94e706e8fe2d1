use std::{fmt, str::FromStr};

use chrono::{Months, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Underpaid,
    Expired,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Underpaid => "UNDERPAID",
            PaymentStatus::Expired => "EXPIRED",
            PaymentStatus::Failed => "FAILED",
        }
    }

    /// Whether a payment in this status may be moved to `next`.
    ///
    /// PAID is final. Expired and failed payments can still be settled by a
    /// late transfer. Writing the current status again is not a transition.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;

        if *self == next {
            return false;
        }
        match self {
            Pending => true,
            Underpaid => matches!(next, Paid | Expired | Failed),
            Expired | Failed => matches!(next, Paid | Underpaid),
            Paid => false,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "UNDERPAID" => Ok(PaymentStatus::Underpaid),
            "EXPIRED" => Ok(PaymentStatus::Expired),
            "FAILED" => Ok(PaymentStatus::Failed),
            other => Err(format!("Unknown payment status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Paid,
    Expired,
    Failed,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "PENDING",
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::Paid => "PAID",
            SubscriptionStatus::Expired => "EXPIRED",
            SubscriptionStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(SubscriptionStatus::Pending),
            "ACTIVE" => Ok(SubscriptionStatus::Active),
            "PAID" => Ok(SubscriptionStatus::Paid),
            "EXPIRED" => Ok(SubscriptionStatus::Expired),
            "FAILED" => Ok(SubscriptionStatus::Failed),
            other => Err(format!("Unknown subscription status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InviteStatus {
    Pending,
    Sent,
    Completed,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "PENDING",
            InviteStatus::Sent => "SENT",
            InviteStatus::Completed => "COMPLETED",
        }
    }
}

/// Billing period of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Period {
    OneMonth,
    ThreeMonths,
    SixMonths,
    TwelveMonths,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneMonth => "ONE_MONTH",
            Period::ThreeMonths => "THREE_MONTHS",
            Period::SixMonths => "SIX_MONTHS",
            Period::TwelveMonths => "TWELVE_MONTHS",
        }
    }

    pub fn months(&self) -> u32 {
        match self {
            Period::OneMonth => 1,
            Period::ThreeMonths => 3,
            Period::SixMonths => 6,
            Period::TwelveMonths => 12,
        }
    }

    /// End of a period starting at `start`. Month-end dates are clamped,
    /// so Jan 31 + one month is the last day of February.
    pub fn expiry_from(&self, start: NaiveDateTime) -> NaiveDateTime {
        start
            .checked_add_months(Months::new(self.months()))
            .unwrap_or(NaiveDateTime::MAX)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ONE_MONTH" | "1_MONTH" | "MONTHLY" => Ok(Period::OneMonth),
            "THREE_MONTHS" | "3_MONTHS" | "QUARTERLY" => Ok(Period::ThreeMonths),
            "SIX_MONTHS" | "6_MONTHS" => Ok(Period::SixMonths),
            "TWELVE_MONTHS" | "12_MONTHS" | "YEARLY" | "ANNUAL" => Ok(Period::TwelveMonths),
            other => Err(format!("Unknown subscription period: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn statuses_parse_case_insensitively() {
        assert_eq!("paid".parse::<PaymentStatus>(), Ok(PaymentStatus::Paid));
        assert_eq!("UNDERPAID".parse::<PaymentStatus>(), Ok(PaymentStatus::Underpaid));
        assert!("settled".parse::<PaymentStatus>().is_err());
        assert_eq!("active".parse::<SubscriptionStatus>(), Ok(SubscriptionStatus::Active));
    }

    #[test]
    fn pending_can_move_anywhere_but_itself() {
        use PaymentStatus::*;
        for next in [Paid, Underpaid, Expired, Failed] {
            assert!(Pending.can_transition_to(next));
        }
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn paid_is_final() {
        use PaymentStatus::*;
        for next in [Pending, Underpaid, Expired, Failed, Paid] {
            assert!(!Paid.can_transition_to(next));
        }
    }

    #[test]
    fn underpaid_and_expired_can_still_settle() {
        use PaymentStatus::*;
        assert!(Underpaid.can_transition_to(Paid));
        assert!(Expired.can_transition_to(Paid));
        assert!(Failed.can_transition_to(Underpaid));
        assert!(!Expired.can_transition_to(Pending));
        assert!(!Underpaid.can_transition_to(Pending));
    }

    #[test]
    fn period_expiry_clamps_to_month_end() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 31)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let expiry = Period::OneMonth.expiry_from(start);
        assert_eq!(expiry.date(), NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());

        let yearly = Period::TwelveMonths.expiry_from(start);
        assert_eq!(yearly.date(), NaiveDate::from_ymd_opt(2026, 1, 31).unwrap());
    }

    #[test]
    fn period_aliases() {
        assert_eq!("monthly".parse::<Period>(), Ok(Period::OneMonth));
        assert_eq!("3_months".parse::<Period>(), Ok(Period::ThreeMonths));
        assert_eq!(
            serde_json::from_str::<Period>("\"SIX_MONTHS\"").unwrap(),
            Period::SixMonths
        );
    }
}
