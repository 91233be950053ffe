//! Value Objects for the marketplace

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role, fixed at registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role { Seller, Customer }

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Seller => "seller", Self::Customer => "customer" }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = RoleError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seller" => Ok(Self::Seller),
            "customer" => Ok(Self::Customer),
            _ => Err(RoleError::Unknown(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum RoleError { Unknown(String) }
impl std::error::Error for RoleError {}
impl fmt::Display for RoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Unknown(r) => write!(f, "unknown role '{}'", r) }
    }
}

/// Unit price, never negative, kept at two decimal places.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Largest value a `NUMERIC(12,2)` column holds.
    pub const MAX: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() { return Err(PriceError::Negative); }
        let amount = amount.round_dp(2);
        if amount > Self::MAX { return Err(PriceError::TooLarge); }
        Ok(Self(amount))
    }
    pub fn amount(&self) -> Decimal { self.0 }
    /// `None` on overflow.
    pub fn times(&self, qty: Quantity) -> Option<Decimal> { self.0.checked_mul(Decimal::from(qty.value())) }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum PriceError { Negative, TooLarge }
impl std::error::Error for PriceError {}
impl fmt::Display for PriceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negative => write!(f, "price can't be negative"),
            Self::TooLarge => write!(f, "price can't exceed 9999999999.99"),
        }
    }
}

/// Cart/order line quantity. Always at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value < 1 { return Err(QuantityError::NotPositive); }
        i32::try_from(value).map(|v| Self(v as u32)).map_err(|_| QuantityError::TooLarge)
    }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: Quantity) -> Result<Self, QuantityError> {
        self.0.checked_add(other.0).filter(|v| *v <= i32::MAX as u32).map(Self).ok_or(QuantityError::TooLarge)
    }
    pub fn increment(&self) -> Result<Self, QuantityError> { self.add(Self::ONE) }
    pub fn decrement(&self) -> Result<Self, QuantityError> {
        if self.0 <= 1 { return Err(QuantityError::BelowMinimum); }
        Ok(Self(self.0 - 1))
    }
}

impl TryFrom<i32> for Quantity {
    type Error = QuantityError;
    fn try_from(value: i32) -> Result<Self, Self::Error> { Self::new(i64::from(value)) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum QuantityError { NotPositive, BelowMinimum, TooLarge }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositive => write!(f, "quantity must be a positive integer"),
            Self::BelowMinimum => write!(f, "quantity can't be less than 1"),
            Self::TooLarge => write!(f, "quantity is too large"),
        }
    }
}
