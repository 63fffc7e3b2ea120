//! Chain parameters for zen-consensus
//!
//! Every chain-dependent consensus value (reward schedule, weights, EMA
//! tuning, proof-of-work limit) is read from [`ChainParameters`]. Values can be
//! built from a preset, deserialized from a config file, overridden through
//! environment variables, or passed programmatically.

use crate::constants::{DEFAULT_EMA_WINDOW, MAX_INTERVAL_FACTOR, MS_PER_SECOND};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Which chain a parameter set describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chain {
    Main,
    Test,
    Local,
}

impl FromStr for Chain {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Ok(Chain::Main),
            "test" | "testnet" => Ok(Chain::Test),
            "local" | "localnet" => Ok(Chain::Local),
            other => Err(ConfigError::UnknownChain(other.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown chain: {0}")]
    UnknownChain(String),

    #[error("invalid chain parameter {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },

    #[error("chain parameters already initialized")]
    AlreadyInitialized,
}

/// Consensus parameters of one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParameters {
    pub chain: Chain,

    /// Timestamp of the genesis block (ms). Seeds the EMA window.
    pub genesis_time: u64,

    /// Easiest allowed target, compact encoding.
    pub proof_of_work_limit: u32,

    /// Target of the first block after genesis, compact encoding.
    #[serde(default = "default_initial_difficulty")]
    pub initial_difficulty: u32,

    /// Target time between blocks (ms).
    #[serde(default = "default_block_interval")]
    pub block_interval: u64,

    /// Number of timestamps kept by the EMA window.
    #[serde(default = "default_ema_window")]
    pub ema_window: usize,

    /// Smoothing constant α = numerator / denominator, 0 < α ≤ 1.
    #[serde(default = "default_ema_alpha_numerator")]
    pub ema_alpha_numerator: u64,

    #[serde(default = "default_ema_alpha_denominator")]
    pub ema_alpha_denominator: u64,

    /// Observed interval is clamped to [interval / k, interval * k].
    #[serde(default = "default_ema_interval_clamp")]
    pub ema_interval_clamp: u64,

    /// Confirmations before a coinbase output may be spent.
    #[serde(default = "default_coinbase_maturity")]
    pub coinbase_maturity: u32,

    #[serde(default = "default_max_block_weight")]
    pub max_block_weight: u64,

    /// Weight charged per encoded transaction byte.
    #[serde(default = "default_weight_per_byte")]
    pub weight_per_byte: u64,

    /// Weight charged per PK witness (signature check).
    #[serde(default = "default_pk_witness_weight")]
    pub pk_witness_weight: u64,

    /// Reward of block 1, in the smallest Zen unit.
    #[serde(default = "default_initial_block_reward")]
    pub initial_block_reward: u64,

    /// Blocks between reward halvings.
    #[serde(default = "default_reward_halving_interval")]
    pub reward_halving_interval: u32,

    /// Zen burned per code byte per block of contract lifetime.
    #[serde(default = "default_contract_cost_per_byte")]
    pub contract_cost_per_byte: u64,

    /// How far ahead of the local clock a block timestamp may be (ms).
    #[serde(default = "default_max_time_in_future")]
    pub max_time_in_future: u64,
}

fn default_initial_difficulty() -> u32 {
    0x1d00ffff
}

fn default_block_interval() -> u64 {
    240 * MS_PER_SECOND
}

fn default_ema_window() -> usize {
    DEFAULT_EMA_WINDOW
}

fn default_ema_alpha_numerator() -> u64 {
    2
}

fn default_ema_alpha_denominator() -> u64 {
    (DEFAULT_EMA_WINDOW as u64) + 1
}

fn default_ema_interval_clamp() -> u64 {
    MAX_INTERVAL_FACTOR
}

fn default_coinbase_maturity() -> u32 {
    100
}

fn default_max_block_weight() -> u64 {
    2_000_000_000
}

fn default_weight_per_byte() -> u64 {
    4
}

fn default_pk_witness_weight() -> u64 {
    100_000
}

fn default_initial_block_reward() -> u64 {
    50 * 100_000_000
}

fn default_reward_halving_interval() -> u32 {
    800_000
}

fn default_contract_cost_per_byte() -> u64 {
    1_000
}

fn default_max_time_in_future() -> u64 {
    15 * 60 * MS_PER_SECOND
}

impl ChainParameters {
    pub fn main() -> Self {
        Self {
            chain: Chain::Main,
            genesis_time: 1_529_514_000_000,
            proof_of_work_limit: 0x1d00ffff,
            initial_difficulty: default_initial_difficulty(),
            block_interval: default_block_interval(),
            ema_window: default_ema_window(),
            ema_alpha_numerator: default_ema_alpha_numerator(),
            ema_alpha_denominator: default_ema_alpha_denominator(),
            ema_interval_clamp: default_ema_interval_clamp(),
            coinbase_maturity: default_coinbase_maturity(),
            max_block_weight: default_max_block_weight(),
            weight_per_byte: default_weight_per_byte(),
            pk_witness_weight: default_pk_witness_weight(),
            initial_block_reward: default_initial_block_reward(),
            reward_halving_interval: default_reward_halving_interval(),
            contract_cost_per_byte: default_contract_cost_per_byte(),
            max_time_in_future: default_max_time_in_future(),
        }
    }

    pub fn test() -> Self {
        Self {
            chain: Chain::Test,
            genesis_time: 1_528_905_600_000,
            proof_of_work_limit: 0x1e0fffff,
            initial_difficulty: 0x1e0fffff,
            ..Self::main()
        }
    }

    /// Local development chain: trivially easy proof of work and short maturity.
    pub fn local() -> Self {
        Self {
            chain: Chain::Local,
            genesis_time: 1_515_594_186_383,
            proof_of_work_limit: 0x207fffff,
            initial_difficulty: 0x207fffff,
            coinbase_maturity: 10,
            ..Self::main()
        }
    }

    pub fn for_chain(chain: Chain) -> Self {
        match chain {
            Chain::Main => Self::main(),
            Chain::Test => Self::test(),
            Chain::Local => Self::local(),
        }
    }

    /// Preset for `chain` with `ZEN_CONSENSUS_<FIELD>` overrides applied.
    ///
    /// Examples:
    /// - `ZEN_CONSENSUS_COINBASE_MATURITY=20`
    /// - `ZEN_CONSENSUS_MAX_BLOCK_WEIGHT=1000000`
    ///
    /// Unparsable values are ignored.
    pub fn from_env(chain: Chain) -> Self {
        let mut params = Self::for_chain(chain);

        override_from_env(&mut params.genesis_time, "ZEN_CONSENSUS_GENESIS_TIME");
        override_from_env(
            &mut params.proof_of_work_limit,
            "ZEN_CONSENSUS_PROOF_OF_WORK_LIMIT",
        );
        override_from_env(
            &mut params.initial_difficulty,
            "ZEN_CONSENSUS_INITIAL_DIFFICULTY",
        );
        override_from_env(&mut params.block_interval, "ZEN_CONSENSUS_BLOCK_INTERVAL");
        override_from_env(&mut params.ema_window, "ZEN_CONSENSUS_EMA_WINDOW");
        override_from_env(
            &mut params.ema_alpha_numerator,
            "ZEN_CONSENSUS_EMA_ALPHA_NUMERATOR",
        );
        override_from_env(
            &mut params.ema_alpha_denominator,
            "ZEN_CONSENSUS_EMA_ALPHA_DENOMINATOR",
        );
        override_from_env(
            &mut params.ema_interval_clamp,
            "ZEN_CONSENSUS_EMA_INTERVAL_CLAMP",
        );
        override_from_env(
            &mut params.coinbase_maturity,
            "ZEN_CONSENSUS_COINBASE_MATURITY",
        );
        override_from_env(&mut params.max_block_weight, "ZEN_CONSENSUS_MAX_BLOCK_WEIGHT");
        override_from_env(&mut params.weight_per_byte, "ZEN_CONSENSUS_WEIGHT_PER_BYTE");
        override_from_env(
            &mut params.pk_witness_weight,
            "ZEN_CONSENSUS_PK_WITNESS_WEIGHT",
        );
        override_from_env(
            &mut params.initial_block_reward,
            "ZEN_CONSENSUS_INITIAL_BLOCK_REWARD",
        );
        override_from_env(
            &mut params.reward_halving_interval,
            "ZEN_CONSENSUS_REWARD_HALVING_INTERVAL",
        );
        override_from_env(
            &mut params.contract_cost_per_byte,
            "ZEN_CONSENSUS_CONTRACT_COST_PER_BYTE",
        );
        override_from_env(
            &mut params.max_time_in_future,
            "ZEN_CONSENSUS_MAX_TIME_IN_FUTURE",
        );

        params
    }

    /// Reject parameter sets the EMA or reward arithmetic cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_interval == 0 {
            return Err(ConfigError::Invalid {
                field: "block_interval",
                reason: "must be positive",
            });
        }
        if self.ema_window == 0 {
            return Err(ConfigError::Invalid {
                field: "ema_window",
                reason: "must be positive",
            });
        }
        if self.ema_alpha_denominator == 0
            || self.ema_alpha_numerator == 0
            || self.ema_alpha_numerator > self.ema_alpha_denominator
        {
            return Err(ConfigError::Invalid {
                field: "ema_alpha",
                reason: "must satisfy 0 < numerator <= denominator",
            });
        }
        if self.ema_interval_clamp == 0 {
            return Err(ConfigError::Invalid {
                field: "ema_interval_clamp",
                reason: "must be positive",
            });
        }
        if self.reward_halving_interval == 0 {
            return Err(ConfigError::Invalid {
                field: "reward_halving_interval",
                reason: "must be positive",
            });
        }
        if self.contract_cost_per_byte == 0 {
            return Err(ConfigError::Invalid {
                field: "contract_cost_per_byte",
                reason: "must be positive",
            });
        }
        Ok(())
    }
}

impl Default for ChainParameters {
    fn default() -> Self {
        Self::main()
    }
}

fn override_from_env<T: FromStr>(field: &mut T, name: &str) {
    if let Ok(val) = std::env::var(name) {
        if let Ok(parsed) = val.parse::<T>() {
            *field = parsed;
        }
    }
}

/// Process-wide chain parameters.
static GLOBAL_CHAIN_PARAMETERS: OnceLock<ChainParameters> = OnceLock::new();

/// Install the process-wide chain parameters. Call once at startup.
pub fn init_chain_parameters(params: ChainParameters) -> Result<(), ConfigError> {
    params.validate()?;
    GLOBAL_CHAIN_PARAMETERS
        .set(params)
        .map_err(|_| ConfigError::AlreadyInitialized)
}

/// Process-wide chain parameters, falling back to main-chain parameters with
/// environment overrides when nothing was installed.
pub fn chain_parameters() -> ChainParameters {
    GLOBAL_CHAIN_PARAMETERS
        .get()
        .cloned()
        .unwrap_or_else(|| {
            let chain = std::env::var("ZEN_CONSENSUS_CHAIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Chain::Main);
            ChainParameters::from_env(chain)
        })
}
