use crate::error::PantryError;
use crate::parser::{self, Rule};
use anyhow::{anyhow, Result};
use pest::iterators::Pair;
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Amount of a product: whole items, or crates where `3/4` is a
/// three-quarters full crate.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(f64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0f64);

    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0f64
    }

    pub fn parse(token: Pair<Rule>) -> Result<Quantity> {
        match token.as_rule() {
            Rule::ratio => {
                let raw = token.as_str();
                let mut pairs = token.into_inner();
                let numerator = pairs
                    .next()
                    .ok_or(anyhow!("invalid numerator: '{}'", raw))?
                    .as_str()
                    .parse::<f64>()?;
                let denominator = pairs
                    .next()
                    .ok_or(anyhow!("invalid denominator: '{}'", raw))?
                    .as_str()
                    .parse::<f64>()?;
                if denominator == 0f64 {
                    return Err(PantryError::ZeroDenominator(raw.to_string()).into());
                }
                Ok(Self(numerator / denominator))
            }
            Rule::decimal => Ok(Self(token.as_str().parse::<f64>()?)),
            _ => Err(anyhow!(
                "unexpected token for quantity: '{}'",
                token.as_str()
            )),
        }
    }

    /// Read a form field. A blank field counts as zero and never reaches the
    /// parser.
    pub fn from_input(raw: &str) -> Result<Quantity, PantryError> {
        if raw.trim().is_empty() {
            return Ok(Self::ZERO);
        }
        parser::parse_quantity(raw)
    }
}

impl FromStr for Quantity {
    type Err = PantryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parser::parse_quantity(s)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Self::Output {
        Quantity(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Quantity) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Quantity) -> Self::Output {
        self + (-rhs)
    }
}

impl std::ops::Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Self::Output {
        Quantity(-self.0)
    }
}
