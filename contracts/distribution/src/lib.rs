#![no_std]

pub mod engine;
pub mod events;

use soroban_sdk::{
    contract, contractimpl, symbol_short, token, Address, Env, Symbol, U256,
};

use engine::{Distribution, Timeline};

// ── Storage key constants ───────────────────────────────────────────────────

const OPERATOR: Symbol = symbol_short!("OPERATOR");
const PENDING_OPERATOR: Symbol = symbol_short!("PEND_OP");
const INITIALIZED: Symbol = symbol_short!("INIT");
const STAKED_TOKEN: Symbol = symbol_short!("STK_TOK");
const REWARD_TOKEN: Symbol = symbol_short!("RWD_TOK");
const REFERENCE_STAKE: Symbol = symbol_short!("REF_STK");
const DISTRIBUTION: Symbol = symbol_short!("DIST");

// Per-account persistent storage uses tuple keys:  (prefix, account)
const USER_STAKE: Symbol = symbol_short!("STK");
const USER_CHECKPOINT: Symbol = symbol_short!("RPT_PAID");

// ── Contract errors ─────────────────────────────────────────────────────────

#[soroban_sdk::contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ContractError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,
    InvalidAmount = 4,
    InsufficientStake = 5,
    EndBlockTooEarly = 6,
    EndBlockBeforePrevious = 7,
    NothingStaked = 8,
    RewardTooLow = 9,
    RateDecreased = 10,
    Overflow = 11,
    TokensIdentical = 12,
}

// ── Contract ────────────────────────────────────────────────────────────────

#[contract]
pub struct DistributionContract;

#[contractimpl]
impl DistributionContract {
    // ── Initialisation ──────────────────────────────────────────────────────

    /// Bootstrap the contract.
    ///
    /// * `operator`        – the only address allowed to deposit rewards.
    /// * `staked_token`    – SAC address of the token participants stake.
    /// * `reward_token`    – SAC address of the token paid out as rewards.
    /// * `reference_stake` – assumed staked amount used to sanity-check
    ///   deposits made while nothing is staked; a pool whose virtual rate
    ///   over this stake rounds to zero is rejected.
    pub fn initialize(
        env: Env,
        operator: Address,
        staked_token: Address,
        reward_token: Address,
        reference_stake: i128,
    ) -> Result<(), ContractError> {
        if env.storage().instance().has(&INITIALIZED) {
            return Err(ContractError::AlreadyInitialized);
        }
        if staked_token == reward_token {
            return Err(ContractError::TokensIdentical);
        }
        if reference_stake <= 0 {
            return Err(ContractError::InvalidAmount);
        }

        env.storage().instance().set(&OPERATOR, &operator);
        env.storage().instance().set(&INITIALIZED, &true);
        env.storage().instance().set(&STAKED_TOKEN, &staked_token);
        env.storage().instance().set(&REWARD_TOKEN, &reward_token);
        env.storage()
            .instance()
            .set(&REFERENCE_STAKE, &reference_stake);
        Self::store_distribution(&env, &Distribution::new(&env));

        events::publish_initialized(&env, operator, staked_token, reward_token, reference_stake);

        Ok(())
    }

    // ── Reward deposits ─────────────────────────────────────────────────────

    /// Deposit `amount` reward tokens to be distributed linearly, ledger by
    /// ledger, until `end_block`.
    ///
    /// Only the operator may deposit. A distribution may be extended or
    /// topped up, never shortened or backdated: `end_block` must lie after
    /// both the current ledger and the previously scheduled end. A top-up
    /// that would lower the already-promised rate is rejected outright.
    ///
    /// While nothing is staked the deposit is held in the pending pool and no
    /// rate is set; the scheduled end then slides forward by however long the
    /// pool lay dormant, so dormancy never eats into the payout duration.
    pub fn deposit(
        env: Env,
        depositor: Address,
        amount: i128,
        end_block: u32,
    ) -> Result<(), ContractError> {
        Self::require_initialized(&env)?;
        depositor.require_auth();
        Self::require_operator(&env, &depositor)?;
        if amount <= 0 {
            return Err(ContractError::InvalidAmount);
        }

        let current = env.ledger().sequence();
        let mut dist = Self::load_distribution(&env)?;
        if end_block < dist.timeline.last_block_with_reward {
            return Err(ContractError::EndBlockBeforePrevious);
        }
        if end_block <= current {
            return Err(ContractError::EndBlockTooEarly);
        }

        engine::accrue(&env, &mut dist, current);

        let reward_token = Self::reward_token(&env)?;
        token::Client::new(&env, &reward_token).transfer(
            &depositor,
            &env.current_contract_address(),
            &amount,
        );

        if dist.total_staked == 0 {
            let mut end = end_block;
            if dist.pending_pool > 0 {
                let dormant = current.saturating_sub(dist.timeline.deposit_block);
                end = end.checked_add(dormant).ok_or(ContractError::Overflow)?;
            }
            dist.pending_pool = dist
                .pending_pool
                .checked_add(amount)
                .ok_or(ContractError::Overflow)?;

            // No rate is set without stakers; the pool is only checked
            // against the reference stake so it cannot round to zero once
            // staking resumes.
            let reference = Self::reference_stake(&env)?;
            engine::validate_rate(&env, dist.pending_pool, reference, end - current)?;

            dist.timeline.deposit_block = current;
            dist.timeline.last_block_with_reward = end;
            Self::store_distribution(&env, &dist);

            events::publish_deposited(&env, depositor, dist.rate.clone(), amount, dist.pending_pool);
            return Ok(());
        }

        let previous_rate = dist.rate.clone();
        let mut amount_delta = amount;
        let mut end = end_block;
        if dist.rate == engine::zero(&env) && dist.pending_pool > 0 {
            let dormant = current.saturating_sub(dist.timeline.deposit_block);
            end = end.checked_add(dormant).ok_or(ContractError::Overflow)?;
            amount_delta = amount_delta
                .checked_add(dist.pending_pool)
                .ok_or(ContractError::Overflow)?;
            dist.pending_pool = 0;
        }

        let new_rate = engine::update_rate(&env, &mut dist, amount_delta, end, 0, current)?;
        if new_rate < previous_rate {
            return Err(ContractError::RateDecreased);
        }
        Self::store_distribution(&env, &dist);

        events::publish_deposited(&env, depositor, new_rate, amount, dist.pending_pool);
        Ok(())
    }

    // ── Staking ─────────────────────────────────────────────────────────────

    /// Stake `amount` tokens for the caller's own account.
    pub fn stake(env: Env, staker: Address, amount: i128) -> Result<(), ContractError> {
        Self::stake_into(&env, &staker, &staker, amount)
    }

    /// Stake `amount` tokens pulled from `funder` for the benefit of
    /// `account`. Settlement and the reward checkpoint always target the
    /// beneficiary.
    pub fn stake_for(
        env: Env,
        funder: Address,
        account: Address,
        amount: i128,
    ) -> Result<(), ContractError> {
        Self::stake_into(&env, &funder, &account, amount)
    }

    // ── Unstaking ───────────────────────────────────────────────────────────

    /// Return `amount` staked tokens to the caller.
    pub fn unstake(env: Env, staker: Address, amount: i128) -> Result<(), ContractError> {
        Self::unstake_from(&env, &staker, &staker, amount)
    }

    /// Return `amount` of the caller's staked tokens to `recipient`. Reward
    /// settlement still pays the staker.
    pub fn unstake_for(
        env: Env,
        staker: Address,
        recipient: Address,
        amount: i128,
    ) -> Result<(), ContractError> {
        Self::unstake_from(&env, &staker, &recipient, amount)
    }

    // ── Rewards ─────────────────────────────────────────────────────────────

    /// Settle and pay out everything owed to `account` since its last
    /// checkpoint. Returns the amount paid; a zero-reward settlement is not
    /// an error, the checkpoint still advances.
    pub fn get_reward(env: Env, account: Address) -> Result<i128, ContractError> {
        Self::require_initialized(&env)?;
        account.require_auth();

        let current = env.ledger().sequence();
        let mut dist = Self::load_distribution(&env)?;
        engine::accrue(&env, &mut dist, current);
        let paid = Self::settle(&env, &dist, &account)?;
        Self::store_distribution(&env, &dist);

        Ok(paid)
    }

    // ── View functions ──────────────────────────────────────────────────────
    // Views read stored state only; none of them run the accrual step, so a
    // caller wanting ledger-fresh numbers must trigger a write operation
    // first.

    /// Staked amount of a single account.
    pub fn total_staked_for(env: Env, account: Address) -> i128 {
        Self::user_stake(&env, &account)
    }

    /// Sum of all staked amounts.
    pub fn total_staked(env: Env) -> i128 {
        Self::load_distribution(&env)
            .map(|dist| dist.total_staked)
            .unwrap_or(0)
    }

    /// The current reward rate per ledger per staked unit, scaled by 10^40.
    pub fn current_rate(env: Env) -> U256 {
        Self::load_distribution(&env)
            .map(|dist| dist.rate)
            .unwrap_or_else(|_| engine::zero(&env))
    }

    /// Cumulative reward per staked unit since inception, scaled by 10^40.
    // TODO: historical snapshots of this value, so indexers can answer
    // "what was owed at ledger N" without replaying events.
    pub fn reward_per_unit(env: Env) -> U256 {
        Self::load_distribution(&env)
            .map(|dist| dist.reward_per_unit_distributed)
            .unwrap_or_else(|_| engine::zero(&env))
    }

    /// Reward mass held while nothing is staked to receive it.
    pub fn pending_pool(env: Env) -> i128 {
        Self::load_distribution(&env)
            .map(|dist| dist.pending_pool)
            .unwrap_or(0)
    }

    /// The three ledger markers bounding the distribution.
    pub fn timeline(env: Env) -> Timeline {
        Self::load_distribution(&env)
            .map(|dist| dist.timeline)
            .unwrap_or(Timeline {
                deposit_block: 0,
                last_distribution_block: 0,
                last_block_with_reward: 0,
            })
    }

    /// Reward owed to `account` under the stored accumulator. Does not
    /// accrue, so ledgers elapsed since the last write operation are not
    /// reflected.
    pub fn current_reward(env: Env, account: Address) -> i128 {
        let Ok(dist) = Self::load_distribution(&env) else {
            return 0;
        };
        let staked = Self::user_stake(&env, &account);
        let checkpoint = Self::user_checkpoint(&env, &account);
        engine::owed(&env, &dist, staked, &checkpoint).unwrap_or(0)
    }

    pub fn is_initialized(env: Env) -> bool {
        env.storage().instance().has(&INITIALIZED)
    }

    pub fn get_operator(env: Env) -> Result<Address, ContractError> {
        env.storage()
            .instance()
            .get(&OPERATOR)
            .ok_or(ContractError::NotInitialized)
    }

    pub fn get_pending_operator(env: Env) -> Option<Address> {
        env.storage().instance().get(&PENDING_OPERATOR)
    }

    // ── Operator transfer (two-step) ────────────────────────────────────────

    /// Propose a new operator. Only the current operator can call this; the
    /// proposed operator must call `accept_operator` to complete the
    /// handover.
    pub fn propose_operator(
        env: Env,
        current_operator: Address,
        new_operator: Address,
    ) -> Result<(), ContractError> {
        Self::require_initialized(&env)?;
        current_operator.require_auth();
        Self::require_operator(&env, &current_operator)?;

        env.storage().instance().set(&PENDING_OPERATOR, &new_operator);

        events::publish_operator_proposed(&env, current_operator, new_operator);

        Ok(())
    }

    /// Accept a pending operator handover.
    pub fn accept_operator(env: Env, new_operator: Address) -> Result<(), ContractError> {
        Self::require_initialized(&env)?;
        new_operator.require_auth();

        let pending: Address = env
            .storage()
            .instance()
            .get(&PENDING_OPERATOR)
            .ok_or(ContractError::Unauthorized)?;
        if new_operator != pending {
            return Err(ContractError::Unauthorized);
        }

        let previous: Address = env
            .storage()
            .instance()
            .get(&OPERATOR)
            .ok_or(ContractError::NotInitialized)?;

        env.storage().instance().set(&OPERATOR, &new_operator);
        env.storage().instance().remove(&PENDING_OPERATOR);

        events::publish_operator_accepted(&env, previous, new_operator);

        Ok(())
    }

    // ── Internal helpers ────────────────────────────────────────────────────

    fn require_initialized(env: &Env) -> Result<(), ContractError> {
        if !env.storage().instance().has(&INITIALIZED) {
            return Err(ContractError::NotInitialized);
        }
        Ok(())
    }

    fn require_operator(env: &Env, caller: &Address) -> Result<(), ContractError> {
        let operator: Address = env
            .storage()
            .instance()
            .get(&OPERATOR)
            .ok_or(ContractError::NotInitialized)?;
        if *caller != operator {
            return Err(ContractError::Unauthorized);
        }
        Ok(())
    }

    fn load_distribution(env: &Env) -> Result<Distribution, ContractError> {
        env.storage()
            .instance()
            .get(&DISTRIBUTION)
            .ok_or(ContractError::NotInitialized)
    }

    fn store_distribution(env: &Env, dist: &Distribution) {
        env.storage().instance().set(&DISTRIBUTION, dist);
    }

    fn staked_token(env: &Env) -> Result<Address, ContractError> {
        env.storage()
            .instance()
            .get(&STAKED_TOKEN)
            .ok_or(ContractError::NotInitialized)
    }

    fn reward_token(env: &Env) -> Result<Address, ContractError> {
        env.storage()
            .instance()
            .get(&REWARD_TOKEN)
            .ok_or(ContractError::NotInitialized)
    }

    fn reference_stake(env: &Env) -> Result<i128, ContractError> {
        env.storage()
            .instance()
            .get(&REFERENCE_STAKE)
            .ok_or(ContractError::NotInitialized)
    }

    fn user_stake(env: &Env, account: &Address) -> i128 {
        env.storage()
            .persistent()
            .get(&(USER_STAKE, account.clone()))
            .unwrap_or(0)
    }

    fn set_user_stake(env: &Env, account: &Address, amount: i128) {
        env.storage()
            .persistent()
            .set(&(USER_STAKE, account.clone()), &amount);
    }

    fn user_checkpoint(env: &Env, account: &Address) -> U256 {
        env.storage()
            .persistent()
            .get(&(USER_CHECKPOINT, account.clone()))
            .unwrap_or_else(|| engine::zero(env))
    }

    fn set_user_checkpoint(env: &Env, account: &Address, checkpoint: &U256) {
        env.storage()
            .persistent()
            .set(&(USER_CHECKPOINT, account.clone()), checkpoint);
    }

    /// Pay out everything `account` is owed against the already-accrued
    /// accumulator and advance its checkpoint. The checkpoint moves even when
    /// nothing is owed, so a later settlement can never double-count.
    fn settle(env: &Env, dist: &Distribution, account: &Address) -> Result<i128, ContractError> {
        let staked = Self::user_stake(env, account);
        let checkpoint = Self::user_checkpoint(env, account);
        let owed = engine::owed(env, dist, staked, &checkpoint)?;

        Self::set_user_checkpoint(env, account, &dist.reward_per_unit_distributed);

        if owed > 0 {
            let reward_token = Self::reward_token(env)?;
            token::Client::new(env, &reward_token).transfer(
                &env.current_contract_address(),
                account,
                &owed,
            );
            events::publish_reward_paid(env, account.clone(), owed);
        }
        Ok(owed)
    }

    /// Shared stake path: accrue, settle the beneficiary, rework the rate for
    /// the larger base, then apply the stake delta and pull the tokens.
    fn stake_into(
        env: &Env,
        payer: &Address,
        account: &Address,
        amount: i128,
    ) -> Result<(), ContractError> {
        Self::require_initialized(env)?;
        payer.require_auth();
        if amount <= 0 {
            return Err(ContractError::InvalidAmount);
        }

        let current = env.ledger().sequence();
        let mut dist = Self::load_distribution(env)?;
        engine::accrue(env, &mut dist, current);
        Self::settle(env, &dist, account)?;

        if dist.rate != engine::zero(env) {
            // Same pot, same end, larger base: the per-unit rate drops but
            // the promised mass is untouched.
            let end = dist.timeline.last_block_with_reward;
            engine::update_rate(env, &mut dist, 0, end, amount, current)?;
        } else if dist.pending_pool > 0 {
            // Resuming from dormancy: the pool becomes the pot and the end
            // slides forward by however long nothing was staked.
            let dormant = current.saturating_sub(dist.timeline.deposit_block);
            let end = dist
                .timeline
                .last_block_with_reward
                .checked_add(dormant)
                .ok_or(ContractError::Overflow)?;
            let pool = dist.pending_pool;
            dist.pending_pool = 0;
            engine::update_rate(env, &mut dist, pool, end, amount, current)?;
        }

        let staked = Self::user_stake(env, account)
            .checked_add(amount)
            .ok_or(ContractError::Overflow)?;
        Self::set_user_stake(env, account, staked);
        dist.total_staked = dist
            .total_staked
            .checked_add(amount)
            .ok_or(ContractError::Overflow)?;
        Self::set_user_checkpoint(env, account, &dist.reward_per_unit_distributed);

        let staked_token = Self::staked_token(env)?;
        token::Client::new(env, &staked_token).transfer(
            payer,
            &env.current_contract_address(),
            &amount,
        );
        Self::store_distribution(env, &dist);

        events::publish_staked(env, account.clone(), dist.rate.clone(), amount, dist.total_staked);
        Ok(())
    }

    /// Shared unstake path. When the last staker leaves, the mass not yet
    /// accrued is swept into the pending pool and the distribution suspends
    /// until staking resumes.
    fn unstake_from(
        env: &Env,
        staker: &Address,
        recipient: &Address,
        amount: i128,
    ) -> Result<(), ContractError> {
        Self::require_initialized(env)?;
        staker.require_auth();
        if amount <= 0 {
            return Err(ContractError::InvalidAmount);
        }
        let staked = Self::user_stake(env, staker);
        if staked < amount {
            return Err(ContractError::InsufficientStake);
        }

        let current = env.ledger().sequence();
        let mut dist = Self::load_distribution(env)?;
        engine::accrue(env, &mut dist, current);
        Self::settle(env, &dist, staker)?;

        let remaining_total = dist
            .total_staked
            .checked_sub(amount)
            .ok_or(ContractError::Overflow)?;
        if remaining_total == 0 {
            let leftover = engine::undistributed(env, &dist, current)?;
            dist.rate = engine::zero(env);
            if leftover > 0 {
                dist.pending_pool = dist
                    .pending_pool
                    .checked_add(leftover)
                    .ok_or(ContractError::Overflow)?;
                dist.timeline.deposit_block = current;
            }
        } else if dist.rate != engine::zero(env) {
            let end = dist.timeline.last_block_with_reward;
            engine::update_rate(env, &mut dist, 0, end, -amount, current)?;
        }

        Self::set_user_stake(env, staker, staked - amount);
        dist.total_staked = remaining_total;

        let staked_token = Self::staked_token(env)?;
        token::Client::new(env, &staked_token).transfer(
            &env.current_contract_address(),
            recipient,
            &amount,
        );
        Self::store_distribution(env, &dist);

        events::publish_unstaked(env, staker.clone(), dist.rate.clone(), amount, dist.total_staked);
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
