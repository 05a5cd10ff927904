//! # Indicator registry
//! Static, read-only table mapping each indicator key to its source,
//! unit conversion, and processing flags. Adding a source is a table
//! edit, not a new branch in the processor.

use std::fmt;

/// The public indicator key set, plus `fipezap` which the front-end
/// may also request (the aluguel index read straight from its
/// snapshot instead of the central-bank series).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKey {
    Selic,
    Ipca,
    Cdi,
    Igpm,
    Dolar,
    Cesta,
    Salario,
    Gasolina,
    Energia,
    Aluguel,
    Bigmac,
    Ibov,
    Fipezap,
}

impl IndicatorKey {
    pub const ALL: [IndicatorKey; 13] = [
        IndicatorKey::Selic,
        IndicatorKey::Ipca,
        IndicatorKey::Cdi,
        IndicatorKey::Igpm,
        IndicatorKey::Dolar,
        IndicatorKey::Cesta,
        IndicatorKey::Salario,
        IndicatorKey::Gasolina,
        IndicatorKey::Energia,
        IndicatorKey::Aluguel,
        IndicatorKey::Bigmac,
        IndicatorKey::Ibov,
        IndicatorKey::Fipezap,
    ];

    /// Case-insensitive parse of a query-string key.
    pub fn parse(s: &str) -> Option<Self> {
        let key = s.trim().to_ascii_lowercase();
        Self::ALL.iter().copied().find(|k| k.as_str() == key)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IndicatorKey::Selic => "selic",
            IndicatorKey::Ipca => "ipca",
            IndicatorKey::Cdi => "cdi",
            IndicatorKey::Igpm => "igpm",
            IndicatorKey::Dolar => "dolar",
            IndicatorKey::Cesta => "cesta",
            IndicatorKey::Salario => "salario",
            IndicatorKey::Gasolina => "gasolina",
            IndicatorKey::Energia => "energia",
            IndicatorKey::Aluguel => "aluguel",
            IndicatorKey::Bigmac => "bigmac",
            IndicatorKey::Ibov => "ibov",
            IndicatorKey::Fipezap => "fipezap",
        }
    }

    pub fn descriptor(self) -> &'static IndicatorDescriptor {
        // The registry covers ALL by construction; the fallback keeps
        // this total without a panic path.
        REGISTRY
            .iter()
            .find(|d| d.key == self)
            .unwrap_or(&REGISTRY[0])
    }
}

impl fmt::Display for IndicatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The externally maintained CSV snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotFile {
    CestaBasica,
    Fipezap,
    Gasolina,
    Energia,
}

impl SnapshotFile {
    pub const ALL: [SnapshotFile; 4] = [
        SnapshotFile::CestaBasica,
        SnapshotFile::Fipezap,
        SnapshotFile::Gasolina,
        SnapshotFile::Energia,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            SnapshotFile::CestaBasica => "cesta_basica.csv",
            SnapshotFile::Fipezap => "fipezap.csv",
            SnapshotFile::Gasolina => "gasolina.csv",
            SnapshotFile::Energia => "energia.csv",
        }
    }
}

/// Where an indicator's raw observations come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Numbered series on the central-bank SGS JSON API, fetched
    /// through the retrying cache.
    CentralBank { series: u32 },
    /// Daily closes from the market chart API.
    MarketIndex { symbol: &'static str },
    /// One of the versioned `data,valor` CSV snapshots.
    Snapshot { file: SnapshotFile },
    /// The Economist Big Mac full-index CSV, Brazil rows only,
    /// forward-filled over month starts.
    BigMac,
}

#[derive(Debug, Clone, Copy)]
pub struct IndicatorDescriptor {
    pub key: IndicatorKey,
    pub source: SourceKind,
    /// Multiplier applied by the processor to bring the raw unit to
    /// the charted unit (aluguel ×10 to currency, energia ÷100 to
    /// currency per kWh).
    pub scale: Option<f64>,
    /// Percentage-change indices reported as a trailing-12-month
    /// compounded rate.
    pub accumulate_12m: bool,
    /// Sources that are already monthly and skip the generic
    /// resample path.
    pub monthly_passthrough: bool,
}

pub static REGISTRY: &[IndicatorDescriptor] = &[
    IndicatorDescriptor {
        key: IndicatorKey::Selic,
        source: SourceKind::CentralBank { series: 432 },
        scale: None,
        accumulate_12m: false,
        monthly_passthrough: false,
    },
    IndicatorDescriptor {
        key: IndicatorKey::Ipca,
        source: SourceKind::CentralBank { series: 433 },
        scale: None,
        accumulate_12m: true,
        monthly_passthrough: false,
    },
    IndicatorDescriptor {
        key: IndicatorKey::Cdi,
        source: SourceKind::CentralBank { series: 4389 },
        scale: None,
        accumulate_12m: false,
        monthly_passthrough: false,
    },
    IndicatorDescriptor {
        key: IndicatorKey::Igpm,
        source: SourceKind::CentralBank { series: 189 },
        scale: None,
        accumulate_12m: true,
        monthly_passthrough: false,
    },
    IndicatorDescriptor {
        key: IndicatorKey::Dolar,
        source: SourceKind::CentralBank { series: 1 },
        scale: None,
        accumulate_12m: false,
        monthly_passthrough: false,
    },
    IndicatorDescriptor {
        key: IndicatorKey::Cesta,
        source: SourceKind::Snapshot {
            file: SnapshotFile::CestaBasica,
        },
        scale: None,
        accumulate_12m: false,
        monthly_passthrough: false,
    },
    IndicatorDescriptor {
        key: IndicatorKey::Salario,
        source: SourceKind::CentralBank { series: 1619 },
        scale: None,
        accumulate_12m: false,
        monthly_passthrough: false,
    },
    IndicatorDescriptor {
        key: IndicatorKey::Gasolina,
        source: SourceKind::Snapshot {
            file: SnapshotFile::Gasolina,
        },
        scale: None,
        accumulate_12m: false,
        monthly_passthrough: true,
    },
    IndicatorDescriptor {
        key: IndicatorKey::Energia,
        source: SourceKind::Snapshot {
            file: SnapshotFile::Energia,
        },
        // Tariff arrives in integer-cent-like units per 100 kWh.
        scale: Some(0.01),
        accumulate_12m: false,
        monthly_passthrough: true,
    },
    IndicatorDescriptor {
        key: IndicatorKey::Aluguel,
        source: SourceKind::CentralBank { series: 28140 },
        // FipeZap rent index scaled to currency units.
        scale: Some(10.0),
        accumulate_12m: false,
        monthly_passthrough: true,
    },
    IndicatorDescriptor {
        key: IndicatorKey::Bigmac,
        source: SourceKind::BigMac,
        scale: None,
        accumulate_12m: false,
        monthly_passthrough: false,
    },
    IndicatorDescriptor {
        key: IndicatorKey::Ibov,
        source: SourceKind::MarketIndex { symbol: "^BVSP" },
        scale: None,
        accumulate_12m: false,
        monthly_passthrough: false,
    },
    IndicatorDescriptor {
        key: IndicatorKey::Fipezap,
        source: SourceKind::Snapshot {
            file: SnapshotFile::Fipezap,
        },
        scale: None,
        accumulate_12m: false,
        monthly_passthrough: true,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_has_a_registry_entry() {
        for key in IndicatorKey::ALL {
            let d = key.descriptor();
            assert_eq!(d.key, key, "registry entry mismatch for {key}");
        }
        assert_eq!(REGISTRY.len(), IndicatorKey::ALL.len());
    }

    #[test]
    fn parse_is_case_insensitive_and_rejects_unknown() {
        assert_eq!(IndicatorKey::parse("SELIC"), Some(IndicatorKey::Selic));
        assert_eq!(IndicatorKey::parse(" ipca "), Some(IndicatorKey::Ipca));
        assert_eq!(IndicatorKey::parse("petr4"), None);
        assert_eq!(IndicatorKey::parse(""), None);
    }

    #[test]
    fn accumulation_applies_only_to_inflation_indices() {
        let accum: Vec<_> = REGISTRY
            .iter()
            .filter(|d| d.accumulate_12m)
            .map(|d| d.key)
            .collect();
        assert_eq!(accum, vec![IndicatorKey::Ipca, IndicatorKey::Igpm]);
    }

    #[test]
    fn unit_conversions_match_source_units() {
        assert_eq!(IndicatorKey::Aluguel.descriptor().scale, Some(10.0));
        assert_eq!(IndicatorKey::Energia.descriptor().scale, Some(0.01));
        assert_eq!(IndicatorKey::Selic.descriptor().scale, None);
    }
}
