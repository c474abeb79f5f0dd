//! Purchase Orders
//!
//! The single contract purchase issued per instrument once its window has
//! elapsed. Parameters are fixed at startup.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::instrument::Instrument;

/// How the amount of a contract is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Basis {
    /// Amount is the stake paid.
    #[default]
    Stake,
    /// Amount is the payout received on a win.
    Payout,
}

/// Direction of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContractType {
    /// Rise.
    #[default]
    Call,
    /// Fall.
    Put,
}

impl ContractType {
    /// Parse a contract type, case-insensitive.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CALL" => Some(Self::Call),
            "PUT" => Some(Self::Put),
            _ => None,
        }
    }
}

/// Unit of the contract duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DurationUnit {
    /// Ticks.
    #[serde(rename = "t")]
    Ticks,
    /// Seconds.
    #[serde(rename = "s")]
    Seconds,
    /// Minutes.
    #[default]
    #[serde(rename = "m")]
    Minutes,
    /// Hours.
    #[serde(rename = "h")]
    Hours,
    /// Days.
    #[serde(rename = "d")]
    Days,
}

impl DurationUnit {
    /// Parse the single-letter venue code.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "t" => Some(Self::Ticks),
            "s" => Some(Self::Seconds),
            "m" => Some(Self::Minutes),
            "h" => Some(Self::Hours),
            "d" => Some(Self::Days),
            _ => None,
        }
    }
}

/// Contract terms shared by every purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractTerms {
    /// Stake (or payout) amount.
    pub amount: Decimal,
    /// How `amount` is interpreted.
    pub basis: Basis,
    /// Contract direction.
    pub contract_type: ContractType,
    /// Account currency.
    pub currency: String,
    /// Contract duration, in `duration_unit`.
    pub duration: u32,
    /// Unit for `duration`.
    pub duration_unit: DurationUnit,
}

impl Default for ContractTerms {
    /// 0.35 USD stake on a five minute rise contract.
    fn default() -> Self {
        Self {
            amount: Decimal::new(35, 2),
            basis: Basis::Stake,
            contract_type: ContractType::Call,
            currency: "USD".to_string(),
            duration: 5,
            duration_unit: DurationUnit::Minutes,
        }
    }
}

/// Wire parameters of a `buy` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractParameters {
    /// Stake amount, sent as a JSON number.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Amount basis.
    pub basis: Basis,
    /// Contract direction.
    pub contract_type: ContractType,
    /// Account currency.
    pub currency: String,
    /// Contract duration.
    pub duration: u32,
    /// Unit for `duration`.
    pub duration_unit: DurationUnit,
    /// Instrument to buy the contract on.
    pub symbol: Instrument,
}

/// A purchase for one instrument. Built once, sent at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    instrument: Instrument,
    parameters: ContractParameters,
}

impl PurchaseOrder {
    /// Build the purchase for `instrument` under the shared contract terms.
    #[must_use]
    pub fn new(instrument: Instrument, terms: &ContractTerms) -> Self {
        let parameters = ContractParameters {
            amount: terms.amount,
            basis: terms.basis,
            contract_type: terms.contract_type,
            currency: terms.currency.clone(),
            duration: terms.duration,
            duration_unit: terms.duration_unit,
            symbol: instrument.clone(),
        };
        Self {
            instrument,
            parameters,
        }
    }

    /// Instrument being purchased.
    #[must_use]
    pub const fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    /// Wire parameters.
    #[must_use]
    pub const fn parameters(&self) -> &ContractParameters {
        &self.parameters
    }
}
