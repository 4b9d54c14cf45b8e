#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use soroban_sdk::testutils::{Address as _, Ledger};
use soroban_sdk::token::StellarAssetClient;
use soroban_sdk::{Address, Env};

use distribution::{engine, DistributionContract, DistributionContractClient};

/// One step of a randomized operation sequence. Amounts and durations are
/// deliberately narrow so sequences stay in the regime where most operations
/// succeed; rejected ones are ignored, the invariants below must hold either
/// way.
#[derive(Arbitrary, Debug)]
enum Op {
    Advance { blocks: u16 },
    Deposit { amount: u32, duration: u16 },
    Stake { who: u8, amount: u32 },
    Unstake { who: u8, amount: u32 },
    Claim { who: u8 },
}

fuzz_target!(|ops: Vec<Op>| {
    let env = Env::default();
    env.mock_all_auths();

    let operator = Address::generate(&env);
    let staked_token = env
        .register_stellar_asset_contract_v2(Address::generate(&env))
        .address();
    let reward_token = env
        .register_stellar_asset_contract_v2(Address::generate(&env))
        .address();

    let contract = env.register(DistributionContract, ());
    let client = DistributionContractClient::new(&env, &contract);
    client.initialize(&operator, &staked_token, &reward_token, &10_000_000);

    let users: [Address; 4] = core::array::from_fn(|_| Address::generate(&env));
    let staked_admin = StellarAssetClient::new(&env, &staked_token);
    for user in users.iter() {
        staked_admin.mint(user, &(i128::MAX / 8));
    }
    StellarAssetClient::new(&env, &reward_token).mint(&operator, &(i128::MAX / 8));

    let mut accumulator = client.reward_per_unit();

    for op in ops {
        match op {
            Op::Advance { blocks } => {
                env.ledger().with_mut(|li| {
                    li.sequence_number = li.sequence_number.saturating_add(blocks as u32);
                });
            }
            Op::Deposit { amount, duration } => {
                let end = env.ledger().sequence().saturating_add(duration as u32);
                let _ = client.try_deposit(&operator, &(amount as i128), &end);
            }
            Op::Stake { who, amount } => {
                let user = &users[who as usize % users.len()];
                let _ = client.try_stake(user, &(amount as i128));
            }
            Op::Unstake { who, amount } => {
                let user = &users[who as usize % users.len()];
                let _ = client.try_unstake(user, &(amount as i128));
            }
            Op::Claim { who } => {
                let user = &users[who as usize % users.len()];
                let _ = client.try_get_reward(user);
            }
        }

        // The accumulator never decreases, whatever just happened.
        let current = client.reward_per_unit();
        assert!(current >= accumulator);
        accumulator = current;

        // The global total always equals the sum of per-account stakes.
        let total: i128 = users.iter().map(|u| client.total_staked_for(u)).sum();
        assert_eq!(client.total_staked(), total);

        // An empty base never carries an active rate.
        if total == 0 {
            assert_eq!(client.current_rate(), engine::zero(&env));
        }
    }
});
