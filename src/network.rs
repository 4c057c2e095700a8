//! Ravencoin peer network. Eg. *Mainnet*.

use std::str::FromStr;

/// The Ravencoin network a peer connection is speaking to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Network {
    /// Ravencoin Mainnet.
    Mainnet,
    /// Ravencoin Testnet.
    Testnet,
    /// Ravencoin regression test net.
    Regtest,
}

impl Default for Network {
    fn default() -> Self {
        Self::Mainnet
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" | "ravencoin" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "regtest" => Ok(Self::Regtest),
            _ => Err(format!("invalid network specified {:?}", s)),
        }
    }
}

impl Network {
    /// Return the default listen port for the network.
    pub fn port(&self) -> u16 {
        match self {
            Self::Mainnet => 8767,
            Self::Testnet => 18770,
            Self::Regtest => 18444,
        }
    }

    /// Return the magic number identifying messages on this network.
    pub fn magic(&self) -> u32 {
        match self {
            Self::Mainnet => 0x4e56_4152,
            Self::Testnet => 0x544e_5652,
            Self::Regtest => 0x574f_5243,
        }
    }

    /// Return the short string representation of this network.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Regtest => "regtest",
        }
    }
}
