//! Reward schedule and contract activation pricing

use crate::config::ChainParameters;
use crate::types::BlockNumber;

/// Zen minted by the coinbase of block `block_number`.
///
/// Starts at `initial_block_reward` and halves every
/// `reward_halving_interval` blocks:
///
/// ```text
/// reward(n) = initial >> ⌊n / interval⌋
/// ```
///
/// It reaches zero after 64 halvings at the latest.
pub fn block_reward(params: &ChainParameters, block_number: BlockNumber) -> u64 {
    let halvings = block_number / params.reward_halving_interval.max(1);
    if halvings >= 64 {
        return 0;
    }
    params.initial_block_reward >> halvings
}

/// Total Zen minted by blocks `1..=block_number`, saturating.
pub fn total_supply(params: &ChainParameters, block_number: BlockNumber) -> u64 {
    let interval = params.reward_halving_interval.max(1) as u64;
    let mut supply = 0u64;
    let mut start = 1u64;
    let end = block_number as u64;
    while start <= end {
        let reward = block_reward(params, start as BlockNumber);
        if reward == 0 {
            break;
        }
        let era_end = ((start / interval) + 1) * interval - 1;
        let blocks = era_end.min(end) - start + 1;
        supply = supply.saturating_add(reward.saturating_mul(blocks));
        start = era_end + 1;
    }
    supply
}

/// Blocks of lifetime bought by sacrificing `sacrifice` Zen to activate
/// `code_size` bytes of contract code. Zero means the sacrifice is too small.
pub fn activation_blocks(params: &ChainParameters, code_size: u64, sacrifice: u64) -> u64 {
    let per_block = code_size.saturating_mul(params.contract_cost_per_byte);
    if per_block == 0 {
        return 0;
    }
    sacrifice / per_block
}
