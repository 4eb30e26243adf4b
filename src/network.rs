use std::fmt;
use std::str::FromStr;

use crate::error::Bip86Error;

/// Version bytes and address parameters for one Bitcoin network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkParams {
    pub name: &'static str,
    pub xprv_version: u32,
    pub xpub_version: u32,
    pub wif_version: u8,
    pub bech32_hrp: &'static str,
    pub coin_type: u32,
}

pub const MAINNET: NetworkParams = NetworkParams {
    name: "mainnet",
    xprv_version: 0x0488_ADE4,
    xpub_version: 0x0488_B21E,
    wif_version: 0x80,
    bech32_hrp: "bc",
    coin_type: 0,
};

pub const TESTNET: NetworkParams = NetworkParams {
    name: "testnet",
    xprv_version: 0x0435_8394,
    xpub_version: 0x0435_87CF,
    wif_version: 0xEF,
    bech32_hrp: "tb",
    coin_type: 1,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    pub const ALL: [Network; 2] = [Network::Mainnet, Network::Testnet];

    pub fn params(self) -> &'static NetworkParams {
        match self {
            Network::Mainnet => &MAINNET,
            Network::Testnet => &TESTNET,
        }
    }

    pub fn is_testnet(self) -> bool {
        self == Network::Testnet
    }

    pub fn name(self) -> &'static str {
        self.params().name
    }

    pub fn hrp(self) -> &'static str {
        self.params().bech32_hrp
    }

    pub fn coin_type(self) -> u32 {
        self.params().coin_type
    }

    pub fn extended_version(self, private: bool) -> u32 {
        let params = self.params();
        if private {
            params.xprv_version
        } else {
            params.xpub_version
        }
    }

    /// Looks up the network and key kind (`true` for private) of a version word.
    pub fn from_extended_version(version: u32) -> Result<(Network, bool), Bip86Error> {
        for network in Network::ALL {
            let params = network.params();
            if version == params.xprv_version {
                return Ok((network, true));
            }
            if version == params.xpub_version {
                return Ok((network, false));
            }
        }
        Err(Bip86Error::UnsupportedKeyPrefix(format!("{version:#010x}")))
    }

    pub fn from_wif_version(version: u8) -> Result<Network, Bip86Error> {
        Network::ALL
            .into_iter()
            .find(|network| network.params().wif_version == version)
            .ok_or_else(|| Bip86Error::UnsupportedKeyPrefix(format!("{version:#04x}")))
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = Bip86Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "bitcoin" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            _ => Err(Bip86Error::InvalidKeyData(format!("unknown network `{s}`"))),
        }
    }
}

/// The four-character prefix of a base58 extended key string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyPrefix {
    Xprv,
    Xpub,
    Tprv,
    Tpub,
}

impl KeyPrefix {
    pub fn parse(encoded: &str) -> Result<Self, Bip86Error> {
        let prefix = encoded.get(..4).unwrap_or(encoded);
        match prefix {
            "xprv" => Ok(KeyPrefix::Xprv),
            "xpub" => Ok(KeyPrefix::Xpub),
            "tprv" => Ok(KeyPrefix::Tprv),
            "tpub" => Ok(KeyPrefix::Tpub),
            other => Err(Bip86Error::UnsupportedKeyPrefix(other.to_string())),
        }
    }

    pub fn network(self) -> Network {
        match self {
            KeyPrefix::Xprv | KeyPrefix::Xpub => Network::Mainnet,
            KeyPrefix::Tprv | KeyPrefix::Tpub => Network::Testnet,
        }
    }

    pub fn is_private(self) -> bool {
        matches!(self, KeyPrefix::Xprv | KeyPrefix::Tprv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_table_lookup() {
        assert_eq!(
            Network::from_extended_version(0x0488_ADE4).unwrap(),
            (Network::Mainnet, true)
        );
        assert_eq!(
            Network::from_extended_version(0x0435_87CF).unwrap(),
            (Network::Testnet, false)
        );
        assert!(matches!(
            Network::from_extended_version(0x04B2_430C),
            Err(Bip86Error::UnsupportedKeyPrefix(_))
        ));
        assert_eq!(Network::from_wif_version(0xEF).unwrap(), Network::Testnet);
    }

    #[test]
    fn prefix_resolution_does_not_default() {
        assert_eq!(KeyPrefix::parse("tpubDE9d").unwrap().network(), Network::Testnet);
        assert!(KeyPrefix::parse("xprv9s21").unwrap().is_private());
        assert_eq!(
            KeyPrefix::parse("zpub6r").unwrap_err(),
            Bip86Error::UnsupportedKeyPrefix("zpub".into())
        );
        assert!(KeyPrefix::parse("xp").is_err());
    }

    #[test]
    fn network_names_parse() {
        assert_eq!("Testnet".parse::<Network>().unwrap(), Network::Testnet);
        assert_eq!("bitcoin".parse::<Network>().unwrap(), Network::Mainnet);
        assert!("regtest".parse::<Network>().is_err());
        assert_eq!(Network::Testnet.hrp(), "tb");
        assert_eq!(Network::Mainnet.coin_type(), 0);
    }
}
