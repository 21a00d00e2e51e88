use alloy_primitives::Address;
use somnia_core::Amount;
use somnia_rps::{GameChain, LocalChain, Move, Phase, SessionCoordinator};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // A simulated hub with two funded players
    let chain = Arc::new(LocalChain::new());
    let alice_addr = Address::random();
    let bob_addr = Address::random();
    let stake = Amount::from_eth_str("1")?;
    chain.fund(alice_addr, stake);
    chain.fund(bob_addr, stake);

    let alice = SessionCoordinator::new(chain.clone(), alice_addr);
    let bob = SessionCoordinator::new(chain.clone(), bob_addr);

    println!("Creating game...");
    let fee = Amount::from_eth_str("0.01")?;
    let id = alice
        .create_game(fee)
        .await?
        .expect("no other transaction is in flight");
    println!("Session {id} created, waiting for an opponent");

    bob.join_game(id, fee).await?;
    println!("Second player joined");

    // Events drive both clients into the commit phase
    while alice.state().phase != Phase::Committing {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    alice.commit_move(Move::Rock).await?;
    bob.commit_move(Move::Scissors).await?;
    println!("Both moves committed");

    alice.reveal_move().await?;
    bob.reveal_move().await?;

    while alice.state().phase != Phase::Finished {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let result = alice.state().result.expect("finished session has a result");
    println!("\nResult:");
    println!("Winner: {}", result.winner);
    println!("Moves: {:?}", result.moves);
    println!("Prize: {}", result.prize);

    let balance = chain.get_balance(result.winner).await?;
    println!("Winner now holds {}", balance.available);

    Ok(())
}
