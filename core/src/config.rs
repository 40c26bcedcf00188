//! Process-wide configuration shared by every service.
//!
//! # Design
//! The constants below are the defaults. Code that needs them reads a
//! `SharedConfig` value instead of the constants directly, so tests can
//! build a client against a different network list or compatibility
//! version without touching global state.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::types::TokenStandard;

/// API version segment used in routes, e.g. `/api/v1`.
pub const API_VERSION: &str = "v1";

/// Compatibility version. Bump on breaking API changes that require
/// clients to update.
pub const COMPATIBILITY_CHECK: u32 = 1;

/// Header carrying the client's compatibility version.
pub const COMPATIBILITY_CHECK_HEADER: &str = "X-Compatibility-Check";

/// Name of the cookie holding the session token.
pub const AUTH_COOKIE_NAME: &str = "token";

/// A supported EVM network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub name: Cow<'static, str>,
    pub chain_id: u64,
    pub blockchain: Cow<'static, str>,
    pub token_standard: Option<TokenStandard>,
}

impl Network {
    const fn new(
        name: &'static str,
        chain_id: u64,
        blockchain: &'static str,
        token_standard: Option<TokenStandard>,
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            chain_id,
            blockchain: Cow::Borrowed(blockchain),
            token_standard,
        }
    }
}

pub const NETWORKS: &[Network] = &[
    Network::new("Ethereum", 1, "ethereum", Some(TokenStandard::Erc20)),
    Network::new("BNB Smart Chain", 56, "bsc", None),
    Network::new("Polygon", 137, "polygon", None),
    Network::new("Arbitrum One", 42161, "arbitrum", None),
    Network::new("Optimism", 10, "optimism", None),
    Network::new("Base", 8453, "base", None),
    Network::new("Avalanche C-Chain", 43114, "avalanche", None),
];

/// Display icon for a chain or token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenIcon {
    pub name: Cow<'static, str>,
    pub link: Cow<'static, str>,
}

impl TokenIcon {
    const fn new(name: &'static str, link: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            link: Cow::Borrowed(link),
        }
    }
}

pub const TOKEN_ICONS: &[TokenIcon] = &[
    TokenIcon::new("Ethereum", "https://token-icons.s3.amazonaws.com/eth.png"),
    TokenIcon::new(
        "USDT",
        "https://raw.githubusercontent.com/trustwallet/assets/master/blockchains/ethereum/assets/0xdAC17F958D2ee523a2206206994597C13D831ec7/logo.png",
    ),
    TokenIcon::new(
        "USDC",
        "https://coin-images.coingecko.com/coins/images/6319/large/USDC.png?1769615602",
    ),
    TokenIcon::new(
        "SHIB",
        "https://coin-images.coingecko.com/coins/images/11939/large/shiba.png?1696511800",
    ),
    TokenIcon::new(
        "UNI",
        "https://raw.githubusercontent.com/trustwallet/assets/master/blockchains/ethereum/assets/0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984/logo.png",
    ),
    TokenIcon::new(
        "AAVE",
        "https://coin-images.coingecko.com/coins/images/12645/large/aave-token-round.png?1720472354",
    ),
];

/// Result of comparing a peer's compatibility header against ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    Compatible,
    /// The peer is on an older version and must update.
    Outdated { peer: u32 },
    /// The peer is on a newer version than this process.
    Ahead { peer: u32 },
    Missing,
    Invalid,
}

impl Compatibility {
    pub fn is_compatible(&self) -> bool {
        matches!(self, Compatibility::Compatible)
    }
}

/// Immutable configuration handed to the client and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedConfig {
    pub api_version: Cow<'static, str>,
    pub compatibility_version: u32,
    pub compatibility_header: Cow<'static, str>,
    pub auth_cookie_name: Cow<'static, str>,
    pub networks: Vec<Network>,
    pub token_icons: Vec<TokenIcon>,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            api_version: Cow::Borrowed(API_VERSION),
            compatibility_version: COMPATIBILITY_CHECK,
            compatibility_header: Cow::Borrowed(COMPATIBILITY_CHECK_HEADER),
            auth_cookie_name: Cow::Borrowed(AUTH_COOKIE_NAME),
            networks: NETWORKS.to_vec(),
            token_icons: TOKEN_ICONS.to_vec(),
        }
    }
}

impl SharedConfig {
    pub fn network_by_chain_id(&self, chain_id: u64) -> Option<&Network> {
        self.networks.iter().find(|n| n.chain_id == chain_id)
    }

    pub fn network_by_blockchain(&self, blockchain: &str) -> Option<&Network> {
        self.networks
            .iter()
            .find(|n| n.blockchain.eq_ignore_ascii_case(blockchain))
    }

    /// Icon for a chain or token name, matched case-insensitively.
    pub fn token_icon(&self, name: &str) -> Option<&TokenIcon> {
        self.token_icons
            .iter()
            .find(|icon| icon.name.eq_ignore_ascii_case(name))
    }

    /// Versioned API route for `path`: `wallets` becomes `/api/v1/wallets`.
    pub fn api_path(&self, path: &str) -> String {
        format!(
            "/api/{}/{}",
            self.api_version,
            path.trim_start_matches('/')
        )
    }

    /// Header a caller can attach to advertise this process's version.
    pub fn compatibility_header(&self) -> (String, String) {
        (
            self.compatibility_header.to_string(),
            self.compatibility_version.to_string(),
        )
    }

    /// Compare a received compatibility header value with ours.
    pub fn check_compatibility(&self, header: Option<&str>) -> Compatibility {
        let Some(raw) = header else {
            return Compatibility::Missing;
        };
        match raw.trim().parse::<u32>() {
            Ok(peer) if peer == self.compatibility_version => Compatibility::Compatible,
            Ok(peer) if peer < self.compatibility_version => Compatibility::Outdated { peer },
            Ok(peer) => Compatibility::Ahead { peer },
            Err(_) => Compatibility::Invalid,
        }
    }
}
