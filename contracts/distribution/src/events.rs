use soroban_sdk::{contracttype, symbol_short, Address, Env, U256};

// Payload structs are public so test consumers can decode emitted events.

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InitializedEvent {
    pub operator: Address,
    pub staked_token: Address,
    pub reward_token: Address,
    pub reference_stake: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DepositedEvent {
    pub depositor: Address,
    pub rate: U256,
    pub amount: i128,
    pub pending_pool: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StakedEvent {
    pub account: Address,
    pub rate: U256,
    pub amount: i128,
    pub total_staked: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnstakedEvent {
    pub account: Address,
    pub rate: U256,
    pub amount: i128,
    pub total_staked: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RewardPaidEvent {
    pub account: Address,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OperatorProposedEvent {
    pub current_operator: Address,
    pub proposed_operator: Address,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OperatorAcceptedEvent {
    pub previous_operator: Address,
    pub new_operator: Address,
}

pub fn publish_initialized(
    env: &Env,
    operator: Address,
    staked_token: Address,
    reward_token: Address,
    reference_stake: i128,
) {
    let payload = InitializedEvent {
        operator,
        staked_token,
        reward_token,
        reference_stake,
    };
    env.events().publish((symbol_short!("INIT"),), payload);
}

pub fn publish_deposited(
    env: &Env,
    depositor: Address,
    rate: U256,
    amount: i128,
    pending_pool: i128,
) {
    let payload = DepositedEvent {
        depositor: depositor.clone(),
        rate,
        amount,
        pending_pool,
    };
    env.events()
        .publish((symbol_short!("DEPOSIT"), depositor), payload);
}

pub fn publish_staked(env: &Env, account: Address, rate: U256, amount: i128, total_staked: i128) {
    let payload = StakedEvent {
        account: account.clone(),
        rate,
        amount,
        total_staked,
    };
    env.events()
        .publish((symbol_short!("STAKED"), account), payload);
}

pub fn publish_unstaked(env: &Env, account: Address, rate: U256, amount: i128, total_staked: i128) {
    let payload = UnstakedEvent {
        account: account.clone(),
        rate,
        amount,
        total_staked,
    };
    env.events()
        .publish((symbol_short!("UNSTAKED"), account), payload);
}

pub fn publish_reward_paid(env: &Env, account: Address, amount: i128) {
    let payload = RewardPaidEvent {
        account: account.clone(),
        amount,
    };
    env.events()
        .publish((symbol_short!("RWD_PAID"), account), payload);
}

pub fn publish_operator_proposed(env: &Env, current_operator: Address, proposed_operator: Address) {
    let payload = OperatorProposedEvent {
        current_operator,
        proposed_operator,
    };
    env.events().publish((symbol_short!("OP_PROP"),), payload);
}

pub fn publish_operator_accepted(env: &Env, previous_operator: Address, new_operator: Address) {
    let payload = OperatorAcceptedEvent {
        previous_operator,
        new_operator,
    };
    env.events().publish((symbol_short!("OP_ACC"),), payload);
}
