//! Pricing table keyed by item name.

use std::{collections::HashMap, fs::File, io::Read, path::Path};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::CostRange;

#[derive(Error, Debug)]
pub enum PricingError {
    #[error("could not open pricing table `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed pricing table: {0}")]
    Csv(#[from] csv::Error),
    #[error("no price for item `{0}`")]
    MissingItem(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Price {
    pub unit_cost_low: f64,
    pub unit_cost_high: f64,
    pub base_cost_low: f64,
    pub base_cost_high: f64,
}

#[derive(Debug, Deserialize)]
struct Record {
    item: String,
    unit_cost_low: Option<f64>,
    unit_cost_high: Option<f64>,
    base_cost_low: Option<f64>,
    base_cost_high: Option<f64>,
}

impl From<&Record> for Price {
    fn from(record: &Record) -> Self {
        Price {
            unit_cost_low: record.unit_cost_low.unwrap_or(0.0),
            unit_cost_high: record.unit_cost_high.unwrap_or(0.0),
            base_cost_low: record.base_cost_low.unwrap_or(0.0),
            base_cost_high: record.base_cost_high.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    items: HashMap<String, Price>,
}

impl PricingTable {
    pub fn load(path: &Path) -> Result<Self, PricingError> {
        let file = File::open(path).map_err(|source| PricingError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Reads CSV with the header `item, unit_cost_low, unit_cost_high,
    /// base_cost_low, base_cost_high`. Extra columns are ignored; a blank cost
    /// is zero. Later rows replace earlier ones with the same item.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, PricingError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let mut items = HashMap::new();
        for record in rdr.deserialize() {
            let record: Record = record?;
            if record.item.is_empty() {
                continue;
            }
            let price = Price::from(&record);
            items.insert(record.item, price);
        }
        debug!(items = items.len(), "pricing table loaded");

        Ok(PricingTable { items })
    }

    /// `unit * quantity + base`, for the low and the high column.
    pub fn cost(&self, item: &str, quantity: f64) -> Result<CostRange, PricingError> {
        let price = self
            .items
            .get(item)
            .ok_or_else(|| PricingError::MissingItem(item.to_string()))?;

        Ok(CostRange::new(
            price.unit_cost_low * quantity + price.base_cost_low,
            price.unit_cost_high * quantity + price.base_cost_high,
        ))
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Table where every listed item has unit cost 1/2 and base cost 10/20.
    pub(crate) fn flat_pricing(items: &[&str]) -> PricingTable {
        let mut table = PricingTable::default();
        for item in items {
            table.items.insert(
                item.to_string(),
                Price {
                    unit_cost_low: 1.0,
                    unit_cost_high: 2.0,
                    base_cost_low: 10.0,
                    base_cost_high: 20.0,
                },
            );
        }
        table
    }

    #[test]
    fn should_price_unit_and_base() {
        let csv = "item,unit_cost_low,unit_cost_high,base_cost_low,base_cost_high,notes\n\
                   Wire - Standard, 0.5, 0.75, 10, 12, per metre\n\
                   Staples,0.01,0.02,,,\n";
        let table = PricingTable::from_reader(csv.as_bytes()).unwrap();

        assert_eq!(table.items.len(), 2);
        assert_eq!(
            table.cost("Wire - Standard", 100.0).unwrap(),
            CostRange::new(60.0, 87.0)
        );
        assert_eq!(table.cost("Staples", 0.0).unwrap(), CostRange::new(0.0, 0.0));
    }

    #[test]
    fn should_name_missing_item() {
        let table = flat_pricing(&["Staples"]);

        let err = table.cost("Gate - 12ft SS", 1.0).unwrap_err();
        assert!(matches!(err, PricingError::MissingItem(ref item) if item == "Gate - 12ft SS"));
        assert_eq!(err.to_string(), "no price for item `Gate - 12ft SS`");
    }
}
