//! Lifeforce prices.
//!
//! Fetching from poe.ninja happens elsewhere; this module turns a
//! currency-overview response into a [`PriceBook`] and keeps the on-disk
//! snapshot that is served while a refresh is pending.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::yields::SeedType;

const WILD_NAME: &str = "Wild Crystallised Lifeforce";
const VIVID_NAME: &str = "Vivid Crystallised Lifeforce";
const PRIMAL_NAME: &str = "Primal Crystallised Lifeforce";
const SACRED_NAME: &str = "Sacred Crystallised Lifeforce";

/// Chaos value of one lifeforce of each colour.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceBook {
    pub wild: f64,
    pub vivid: f64,
    pub primal: f64,
    pub sacred: f64,
}

impl PriceBook {
    pub fn unit_price(&self, kind: SeedType) -> Option<f64> {
        match kind {
            SeedType::WILD => Some(self.wild),
            SeedType::VIVID => Some(self.vivid),
            SeedType::PRIMAL => Some(self.primal),
            SeedType::SACRED => Some(self.sacred),
            _ => None,
        }
    }

    pub fn from_overview(overview: &CurrencyOverview) -> Self {
        let lookup = |name: &str| match overview.chaos_value(name) {
            Some(value) if value > 0.0 => value,
            _ => {
                warn!(currency = name, "price missing from currency overview");
                0.0
            }
        };

        Self {
            wild: lookup(WILD_NAME),
            vivid: lookup(VIVID_NAME),
            primal: lookup(PRIMAL_NAME),
            sacred: lookup(SACRED_NAME),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| Error::io(path, e))
    }

    /// Reads the disk snapshot. `Ok(None)` means nothing has been cached yet.
    pub fn load_cached(path: &Path) -> Result<Option<CachedPrices>> {
        if !path.exists() {
            info!(path = %path.display(), "cached prices don't exist");
            return Ok(None);
        }

        let json = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let book = serde_json::from_str(&json)?;
        let age = fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .unwrap_or_default();

        Ok(Some(CachedPrices { book, age }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedPrices {
    pub book: PriceBook,
    pub age: Duration,
}

impl CachedPrices {
    pub fn is_stale(&self, refresh_minutes: u32) -> bool {
        self.age >= Duration::from_secs(u64::from(refresh_minutes) * 60)
    }
}

/// The parts of poe.ninja's `currencyoverview` response that matter here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyOverview {
    #[serde(default)]
    pub lines: Vec<CurrencyLine>,
    #[serde(default)]
    pub currency_details: Vec<CurrencyDetail>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyLine {
    pub currency_type_name: String,
    #[serde(default)]
    pub chaos_equivalent: Option<f64>,
    #[serde(default)]
    pub receive: Option<ExchangeRate>,
    #[serde(default)]
    pub details_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeRate {
    #[serde(default)]
    pub pay_currency_id: i64,
    #[serde(default)]
    pub get_currency_id: i64,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub listing_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyDetail {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub trade_id: Option<String>,
}

impl CurrencyOverview {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Chaos value of a currency line. A direct chaos listing on the receive
    /// side overrides the aggregated equivalent.
    pub fn chaos_value(&self, name: &str) -> Option<f64> {
        let line = self
            .lines
            .iter()
            .find(|line| line.currency_type_name == name)?;

        if let Some(receive) = &line.receive {
            if let Some(value) = receive.value {
                if self.trade_id(receive.pay_currency_id) == Some("chaos") {
                    return Some(value);
                }
            }
        }
        line.chaos_equivalent
    }

    fn trade_id(&self, id: i64) -> Option<&str> {
        self.currency_details
            .iter()
            .find(|detail| detail.id == Some(id))
            .and_then(|detail| detail.trade_id.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OVERVIEW: &str = r#"{
        "lines": [
            {"currencyTypeName": "Vivid Crystallised Lifeforce", "chaosEquivalent": 0.02, "detailsId": "vivid"},
            {"currencyTypeName": "Wild Crystallised Lifeforce", "chaosEquivalent": 0.03,
             "receive": {"id": 0, "pay_currency_id": 1, "get_currency_id": 9, "value": 0.05, "count": 4}},
            {"currencyTypeName": "Primal Crystallised Lifeforce", "chaosEquivalent": 0.04,
             "receive": {"pay_currency_id": 2, "value": 9.0}},
            {"currencyTypeName": "Sacred Crystallised Lifeforce", "chaosEquivalent": null}
        ],
        "currencyDetails": [
            {"id": 1, "name": "Chaos Orb", "tradeId": "chaos"},
            {"id": 2, "name": "Divine Orb", "tradeId": "divine"}
        ]
    }"#;

    #[test]
    fn builds_price_book_from_overview() {
        let overview = CurrencyOverview::from_json(OVERVIEW).unwrap();
        let book = PriceBook::from_overview(&overview);

        assert_eq!(book.vivid, 0.02);
        // chaos-side receive listing wins over the equivalent
        assert_eq!(book.wild, 0.05);
        // receive priced in divines is ignored
        assert_eq!(book.primal, 0.04);
        assert_eq!(book.sacred, 0.0);
    }

    #[test]
    fn unknown_colour_has_no_price() {
        let book = PriceBook {
            wild: 1.0,
            vivid: 2.0,
            primal: 3.0,
            sacred: 4.0,
        };
        assert_eq!(book.unit_price(SeedType::PRIMAL), Some(3.0));
        assert_eq!(book.unit_price(SeedType(9)), None);
    }

    #[test]
    fn snapshot_survives_disk_cache() {
        let path = std::env::temp_dir().join(format!(
            "harvest-picker-prices-{}.json",
            std::process::id()
        ));
        let book = PriceBook {
            wild: 0.5,
            vivid: 0.25,
            primal: 0.125,
            sacred: 40.0,
        };
        book.save(&path).unwrap();

        let cached = PriceBook::load_cached(&path).unwrap().unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(cached.book, book);
        assert!(!cached.is_stale(15));
    }

    #[test]
    fn missing_cache_is_not_an_error() {
        let path = Path::new("no/such/dir/pricecache.json");
        assert!(PriceBook::load_cached(path).unwrap().is_none());
    }
}
