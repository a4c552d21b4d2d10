//! Value Objects for matrix ordering

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Add;

macro_rules! define_id {
    ($name:ident) => {
        /// Backend global id (e.g. `gid://shopify/...`).
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }
            pub fn as_str(&self) -> &str { &self.0 }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self { Self(s.to_string()) }
        }
    };
}

define_id!(ProductId);
define_id!(VariantId);
define_id!(CustomerId);
define_id!(DraftOrderId);

impl DraftOrderId {
    /// Trailing numeric segment of a global id: `gid://shopify/DraftOrder/123` -> `123`.
    pub fn numeric_tail(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

/// Money value object
///
/// Exact decimal amount. Always rendered with two decimals; rounding is
/// half away from zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self { Self(amount) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_zero(&self) -> bool { self.0.is_zero() }

    pub fn round_cents(&self) -> Money {
        Money(self.0.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// `self * qty`, rounded to cents. Each line is rounded before it is
    /// added to a subtotal so displayed line totals add up to the subtotal.
    pub fn line_total(&self, qty: u32) -> Money {
        Money(self.0 * Decimal::from(qty)).round_cents()
    }

    pub fn percentage(&self, percent: Decimal) -> Money {
        Money(self.0 * percent / Decimal::ONE_HUNDRED).round_cents()
    }

    /// `max(0, self - other)`
    pub fn saturating_sub(&self, other: Money) -> Money {
        Money((self.0 - other.0).max(Decimal::ZERO))
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, other: Money) -> Money { Money(self.0 + other.0) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.round_cents().0)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <Decimal as Deserialize>::deserialize(deserializer).map(Money)
    }
}

/// Reads a typed or pasted quantity.
///
/// Leading digits are read the way a numeric cell is typed, so `"12 pcs"`
/// is 12. Blank, negative, non-numeric or overflowing input is `None`.
pub fn parse_quantity(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    if end == 0 { return None; }
    unsigned[..end].parse().ok()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    #[default]
    FixedAmount,
    Percentage,
}

/// Manual order-level discount entered on the form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountSetting {
    pub kind: DiscountKind,
    pub value: Decimal,
}

impl DiscountSetting {
    pub fn fixed(value: Decimal) -> Self { Self { kind: DiscountKind::FixedAmount, value } }
    pub fn percentage(value: Decimal) -> Self { Self { kind: DiscountKind::Percentage, value } }

    pub fn is_active(&self) -> bool { self.value > Decimal::ZERO }

    /// Discount for `subtotal`. Fixed amounts apply verbatim, uncapped;
    /// callers clamp the final total instead.
    pub fn amount_for(&self, subtotal: Money) -> Money {
        if !self.is_active() { return Money::ZERO; }
        match self.kind {
            DiscountKind::FixedAmount => Money::new(self.value),
            DiscountKind::Percentage => subtotal.percentage(self.value),
        }
    }
}
