use std::{collections::HashMap, fs::read_to_string, path::Path};
use serde::Deserialize;
use crate::constant::{BITRATE_CFG_FILENAME, IXXAT_ENV, IXXAT_VAR};
use crate::error::VciError;

/// The two bus timing registers of an SJA1000 style controller.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct BitrateRegisterPair {
    pub btr0: u8,
    pub btr1: u8,
}

impl BitrateRegisterPair {
    pub const BITRATE_10K: Self = Self::new(0x31, 0x1C);
    pub const BITRATE_20K: Self = Self::new(0x18, 0x1C);
    pub const BITRATE_25K: Self = Self::new(0x1F, 0x16);
    pub const BITRATE_50K: Self = Self::new(0x09, 0x1C);
    pub const BITRATE_100K: Self = Self::new(0x04, 0x1C);
    pub const BITRATE_125K: Self = Self::new(0x03, 0x1C);
    pub const BITRATE_250K: Self = Self::new(0x01, 0x1C);
    pub const BITRATE_500K: Self = Self::new(0x00, 0x1C);
    pub const BITRATE_800K: Self = Self::new(0x00, 0x16);
    pub const BITRATE_1000K: Self = Self::new(0x00, 0x14);

    /// Candidates used for auto-detection, slowest first.
    pub const COMMON: [Self; 10] = [
        Self::BITRATE_10K,
        Self::BITRATE_20K,
        Self::BITRATE_25K,
        Self::BITRATE_50K,
        Self::BITRATE_100K,
        Self::BITRATE_125K,
        Self::BITRATE_250K,
        Self::BITRATE_500K,
        Self::BITRATE_800K,
        Self::BITRATE_1000K,
    ];

    const PRESETS: [(u32, Self); 10] = [
        (10_000, Self::BITRATE_10K),
        (20_000, Self::BITRATE_20K),
        (25_000, Self::BITRATE_25K),
        (50_000, Self::BITRATE_50K),
        (100_000, Self::BITRATE_100K),
        (125_000, Self::BITRATE_125K),
        (250_000, Self::BITRATE_250K),
        (500_000, Self::BITRATE_500K),
        (800_000, Self::BITRATE_800K),
        (1_000_000, Self::BITRATE_1000K),
    ];

    #[inline]
    pub const fn new(btr0: u8, btr1: u8) -> Self {
        Self { btr0, btr1 }
    }

    /// Preset register values of a bitrate in bit/s.
    pub fn from_bitrate(bitrate: u32) -> Option<Self> {
        Self::PRESETS.iter()
            .find(|(v, _)| *v == bitrate)
            .map(|(_, p)| *p)
    }

    /// Bitrate in bit/s if the pair is one of the presets.
    pub fn bitrate(&self) -> Option<u32> {
        Self::PRESETS.iter()
            .find(|(_, p)| p == self)
            .map(|(v, _)| *v)
    }
}

/// The deserialize object mapped to `bitrate.cfg.yaml`.
#[derive(Debug, Default, Deserialize)]
struct BitrateCfg {
    #[serde(default)]
    bitrate: HashMap<u32, BitrateRegisterPair>,
}

/// Bitrate to register lookup: the presets, overridden or extended by `bitrate.cfg.yaml`.
#[derive(Debug, Clone)]
pub struct BitrateTable(HashMap<u32, BitrateRegisterPair>);

impl Default for BitrateTable {
    fn default() -> Self {
        Self(BitrateRegisterPair::PRESETS.into_iter().collect())
    }
}

impl BitrateTable {
    /// Load `bitrate.cfg.yaml` from the `IXXAT_LIBRARY` folder (see `ixxat.env`) or the working
    /// directory. A missing file yields the presets only.
    pub fn new() -> Result<Self, VciError> {
        let path = match dotenvy::from_filename(IXXAT_ENV) {
            Ok(_) => match std::env::var(IXXAT_VAR) {
                Ok(v) => match Path::new(&v).parent() {
                    Some(dir) => dir.join(BITRATE_CFG_FILENAME),
                    None => BITRATE_CFG_FILENAME.into(),
                },
                Err(_) => BITRATE_CFG_FILENAME.into(),
            },
            Err(_) => BITRATE_CFG_FILENAME.into(),
        };

        if !path.exists() {
            log::debug!("IXXAT-VCI - `{}` not found, using preset bitrates", path.display());
            return Ok(Self::default());
        }

        let data = read_to_string(&path)
            .map_err(|e| VciError::InvalidArgument(format!("Unable to read `{}`: {:?}", path.display(), e)))?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self, VciError> {
        let cfg: BitrateCfg = serde_yaml::from_str(data)
            .map_err(|e| VciError::InvalidArgument(format!("Error parsing YAML: {:?}", e)))?;

        let mut table = Self::default();
        table.0.extend(cfg.bitrate);
        Ok(table)
    }

    #[inline]
    pub fn get(&self, bitrate: u32) -> Option<BitrateRegisterPair> {
        self.0.get(&bitrate).copied()
    }

    pub fn lookup(&self, pair: BitrateRegisterPair) -> Option<u32> {
        self.0.iter()
            .find(|(_, p)| **p == pair)
            .map(|(v, _)| *v)
    }
}
