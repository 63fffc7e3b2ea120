//! Configuration module tests
//!
//! Tests for chain parameter presets, serde loading and environment overrides.

use zen_consensus::config::{
    chain_parameters, init_chain_parameters, Chain, ChainParameters, ConfigError,
};

#[test]
fn test_default_is_main() {
    assert_eq!(ChainParameters::default(), ChainParameters::main());
}

#[test]
fn test_presets_differ_in_pow_limit() {
    let main = ChainParameters::main();
    let test = ChainParameters::test();
    let local = ChainParameters::local();

    assert_eq!(main.chain, Chain::Main);
    assert_eq!(test.chain, Chain::Test);
    assert_eq!(local.chain, Chain::Local);
    assert_ne!(main.proof_of_work_limit, local.proof_of_work_limit);
    assert_eq!(test.max_block_weight, main.max_block_weight);
}

#[test]
fn test_json_round_trip() {
    let params = ChainParameters::local();
    let json = serde_json::to_string(&params).unwrap();
    let parsed: ChainParameters = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, params);
}

#[test]
fn test_missing_fields_use_defaults() {
    let json = r#"{
        "chain": "Local",
        "genesis_time": 1000,
        "proof_of_work_limit": 545259519,
        "coinbase_maturity": 3
    }"#;
    let parsed: ChainParameters = serde_json::from_str(json).unwrap();
    let main = ChainParameters::main();

    assert_eq!(parsed.chain, Chain::Local);
    assert_eq!(parsed.genesis_time, 1000);
    assert_eq!(parsed.proof_of_work_limit, 0x207fffff);
    assert_eq!(parsed.coinbase_maturity, 3);
    assert_eq!(parsed.ema_window, main.ema_window);
    assert_eq!(parsed.block_interval, main.block_interval);
    assert_eq!(parsed.max_time_in_future, main.max_time_in_future);
    assert!(parsed.validate().is_ok());
}

#[test]
fn test_invalid_parameters_rejected() {
    let params = ChainParameters {
        block_interval: 0,
        ..ChainParameters::local()
    };
    assert!(matches!(
        params.validate(),
        Err(ConfigError::Invalid {
            field: "block_interval",
            ..
        })
    ));
}

#[test]
fn test_from_env_overrides() {
    std::env::set_var("ZEN_CONSENSUS_MAX_BLOCK_WEIGHT", "12345");
    std::env::set_var("ZEN_CONSENSUS_COINBASE_MATURITY", "not a number");
    let params = ChainParameters::from_env(Chain::Local);
    std::env::remove_var("ZEN_CONSENSUS_MAX_BLOCK_WEIGHT");
    std::env::remove_var("ZEN_CONSENSUS_COINBASE_MATURITY");

    assert_eq!(params.max_block_weight, 12345);
    assert_eq!(
        params.coinbase_maturity,
        ChainParameters::local().coinbase_maturity
    );
}

#[test]
fn test_global_initialized_once() {
    let params = ChainParameters::local();
    assert_eq!(init_chain_parameters(params.clone()), Ok(()));
    assert_eq!(chain_parameters(), params);
    assert_eq!(
        init_chain_parameters(ChainParameters::main()),
        Err(ConfigError::AlreadyInitialized)
    );
}
