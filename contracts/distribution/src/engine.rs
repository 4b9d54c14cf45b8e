use soroban_sdk::{contracttype, Env, U256};

use crate::ContractError;

/// Square root of the fixed-point scaling factor.
///
/// Accumulator and rate values are scaled by 10^40 before storage to preserve
/// sub-unit precision without floating-point arithmetic. 10^40 exceeds u128,
/// so the constant is kept as its 10^20 root and widened into a host 256-bit
/// integer on demand.
const PRECISION_ROOT: u128 = 100_000_000_000_000_000_000; // 10^20

/// The 10^40 fixed-point scaling factor.
pub fn precision(env: &Env) -> U256 {
    let root = U256::from_u128(env, PRECISION_ROOT);
    root.mul(&root)
}

/// 256-bit zero.
pub fn zero(env: &Env) -> U256 {
    U256::from_u32(env, 0)
}

// ── State ───────────────────────────────────────────────────────────────────

/// The three ledger markers bounding a distribution.
///
/// `deposit_block` is the ledger at which the pending pool was last touched
/// while no distribution was running, `last_distribution_block` the ledger up
/// to which the accumulator has been advanced, and `last_block_with_reward`
/// the scheduled end of the current (or most recent) rate.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Timeline {
    pub deposit_block: u32,
    pub last_distribution_block: u32,
    pub last_block_with_reward: u32,
}

/// Shared state of the distribution engine.
///
/// `reward_per_unit_distributed` is the cumulative reward earned per staked
/// unit since inception, scaled by 10^40 and monotonically non-decreasing.
/// `rate` is the reward accruing per ledger per staked unit, same scale; a
/// zero rate means no distribution is running. `pending_pool` holds reward
/// mass deposited or swept back while nothing was staked to receive it.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Distribution {
    pub reward_per_unit_distributed: U256,
    pub rate: U256,
    pub total_staked: i128,
    pub pending_pool: i128,
    pub timeline: Timeline,
}

impl Distribution {
    pub fn new(env: &Env) -> Self {
        Distribution {
            reward_per_unit_distributed: zero(env),
            rate: zero(env),
            total_staked: 0,
            pending_pool: 0,
            timeline: Timeline {
                deposit_block: 0,
                last_distribution_block: 0,
                last_block_with_reward: 0,
            },
        }
    }
}

// ── Widening helpers ────────────────────────────────────────────────────────

fn widen(env: &Env, amount: i128) -> Result<U256, ContractError> {
    let unsigned = u128::try_from(amount).map_err(|_| ContractError::Overflow)?;
    Ok(U256::from_u128(env, unsigned))
}

fn narrow(value: &U256) -> Result<i128, ContractError> {
    let unsigned = value.to_u128().ok_or(ContractError::Overflow)?;
    i128::try_from(unsigned).map_err(|_| ContractError::Overflow)
}

// ── Accrual ─────────────────────────────────────────────────────────────────

/// Advance the accumulator up to `current_block`.
///
/// ```text
/// elapsed = min(current_block, end-if-reached) − last_distribution_block
/// accumulator += elapsed × rate
/// ```
///
/// `last_distribution_block` is stamped with `current_block` unconditionally,
/// so calling twice at the same ledger is a no-op on the second call. When
/// accrual reaches the scheduled end the rate is zeroed; the distribution is
/// over and must not silently continue past it.
pub fn accrue(env: &Env, dist: &mut Distribution, current_block: u32) {
    let end = dist.timeline.last_block_with_reward;
    let capped = if end != 0 && current_block > end {
        end
    } else {
        current_block
    };
    let elapsed = capped.saturating_sub(dist.timeline.last_distribution_block);

    if elapsed > 0 && dist.rate != zero(env) {
        let delta = dist.rate.mul(&U256::from_u32(env, elapsed));
        dist.reward_per_unit_distributed = dist.reward_per_unit_distributed.add(&delta);
    }
    dist.timeline.last_distribution_block = current_block;

    if end != 0 && capped == end {
        dist.rate = zero(env);
    }
}

// ── Rate computation ────────────────────────────────────────────────────────

/// Reward mass promised under the current rate but not yet accrued.
///
/// `rate × total_staked × remaining_blocks / 10^40`, where `remaining_blocks`
/// counts from `current_block` to the scheduled end. Zero once the end has
/// passed, nothing is staked, or no rate is running.
pub fn undistributed(
    env: &Env,
    dist: &Distribution,
    current_block: u32,
) -> Result<i128, ContractError> {
    let end = dist.timeline.last_block_with_reward;
    let remaining = if end > current_block { end - current_block } else { 0 };
    if remaining == 0 || dist.total_staked <= 0 || dist.rate == zero(env) {
        return Ok(0);
    }

    let mass = dist
        .rate
        .mul(&widen(env, dist.total_staked)?)
        .mul(&U256::from_u32(env, remaining))
        .div(&precision(env));
    narrow(&mass)
}

/// Compute `amount × 10^40 / (staked × duration)` and reject a result of
/// zero: a distribution that rounds to no reward per ledger would silently
/// strand the deposited funds.
pub fn validate_rate(
    env: &Env,
    amount: i128,
    staked: i128,
    duration: u32,
) -> Result<U256, ContractError> {
    if staked <= 0 {
        return Err(ContractError::NothingStaked);
    }
    if duration == 0 {
        return Err(ContractError::EndBlockTooEarly);
    }

    let denominator = widen(env, staked)?.mul(&U256::from_u32(env, duration));
    let rate = widen(env, amount)?.mul(&precision(env)).div(&denominator);
    if rate == zero(env) {
        return Err(ContractError::RewardTooLow);
    }
    Ok(rate)
}

/// Recompute the per-ledger rate after a change to the pot or the staked base.
///
/// The mass still owed under the old rate is carried forward and added to
/// `amount_delta`, then the sum is spread over the effective staked amount
/// (`total_staked + staked_delta`, applied conceptually before the new rate
/// takes effect) for the ledgers up to `new_end_block`. Rewards already
/// accrued are never touched; callers must run [`accrue`] first.
///
/// Commits the new rate and end marker, and returns the rate so callers can
/// enforce their own monotonicity policy against the previous one.
pub fn update_rate(
    env: &Env,
    dist: &mut Distribution,
    amount_delta: i128,
    new_end_block: u32,
    staked_delta: i128,
    current_block: u32,
) -> Result<U256, ContractError> {
    let carried = undistributed(env, dist, current_block)?;
    let total_amount = amount_delta
        .checked_add(carried)
        .ok_or(ContractError::Overflow)?;
    let effective_staked = dist
        .total_staked
        .checked_add(staked_delta)
        .ok_or(ContractError::Overflow)?;
    if effective_staked <= 0 {
        return Err(ContractError::NothingStaked);
    }

    let duration = if new_end_block > current_block {
        new_end_block - current_block
    } else {
        0
    };
    let rate = validate_rate(env, total_amount, effective_staked, duration)?;

    dist.rate = rate.clone();
    dist.timeline.last_block_with_reward = new_end_block;
    Ok(rate)
}

// ── Settlement math ─────────────────────────────────────────────────────────

/// Reward owed to an account since its last checkpoint.
///
/// `(accumulator − checkpoint) × staked / 10^40`. Non-negative because the
/// accumulator never decreases and checkpoints only ever advance to it.
pub fn owed(
    env: &Env,
    dist: &Distribution,
    staked: i128,
    checkpoint: &U256,
) -> Result<i128, ContractError> {
    if staked <= 0 {
        return Ok(0);
    }
    let earned = dist
        .reward_per_unit_distributed
        .sub(checkpoint)
        .mul(&widen(env, staked)?)
        .div(&precision(env));
    narrow(&earned)
}

// ── Unit tests ──────────────────────────────────────────────────────────────
// Pure-math tests; the Env is only needed to construct host 256-bit values.
