//! Turns raw CliFlo tables into calendar-aligned observation rows.

pub mod align;
pub mod normalize;

use std::{fmt, str::FromStr};

use thiserror::Error;

pub use align::{analyse_completeness, calendar_align, AlignedTable};
pub use normalize::{normalize, CleanedTable};

#[derive(Error, Debug, PartialEq)]
pub enum PrepareError {
    #[error("result table has no `{0}` column")]
    MissingColumn(String),
}

/// How complete one station year turned out to be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// CliFlo returned no rows. Never fetched again.
    Empty,
    /// Share of calendar days whose primary value was estimated, in `[0, 1]`.
    Estimated(f64),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Empty => f.write_str("empty"),
            Outcome::Estimated(fraction) => write!(f, "{}", fraction),
        }
    }
}

impl FromStr for Outcome {
    type Err = std::num::ParseFloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "empty" => Ok(Outcome::Empty),
            fraction => fraction.parse().map(Outcome::Estimated),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_store_outcome_as_text() {
        assert_eq!(Outcome::Empty.to_string(), "empty");
        assert_eq!("empty".parse::<Outcome>().unwrap(), Outcome::Empty);

        let outcome = Outcome::Estimated(10.0 / 365.0);
        assert_eq!(outcome.to_string().parse::<Outcome>().unwrap(), outcome);
        assert!("nan-ish".parse::<Outcome>().is_err());
    }
}
