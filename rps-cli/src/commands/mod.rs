use alloy_primitives::Address;
use anyhow::{anyhow, bail, Result};
use comfy_table::{presets::UTF8_FULL, Table};
use serde::{Deserialize, Serialize};
use somnia_core::{Account, Amount};
use somnia_rps::{
    classify, ChainState, GameChain, GameResult, LocalChain, Move, MoveSecret, Phase, RpsError,
    SessionCoordinator, SessionId, SuggestedAction,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Faucet grant for freshly generated accounts.
const FAUCET_GRANT: &str = "10";

#[derive(Debug, Serialize, Deserialize)]
struct CliStorage {
    chain: ChainState,
    accounts: BTreeMap<String, Account>,
    secrets: BTreeMap<String, MoveSecret>, // key: "session:address"
}

impl Default for CliStorage {
    fn default() -> Self {
        Self {
            chain: LocalChain::new().snapshot(),
            accounts: BTreeMap::new(),
            secrets: BTreeMap::new(),
        }
    }
}

fn storage_path(data_dir: &Path) -> PathBuf {
    data_dir.join("rps_games.json")
}

fn load_storage(data_dir: &Path) -> CliStorage {
    let path = storage_path(data_dir);
    if path.exists() {
        if let Ok(content) = std::fs::read_to_string(&path) {
            if let Ok(storage) = serde_json::from_str(&content) {
                return storage;
            }
        }
    }
    CliStorage::default()
}

fn save_storage(data_dir: &Path, storage: &CliStorage) -> Result<()> {
    let path = storage_path(data_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(storage)?;
    std::fs::write(path, content)?;
    Ok(())
}

fn secret_key(session: SessionId, address: Address) -> String {
    format!("{session}:{address}")
}

fn lookup_account(storage: &CliStorage, name: &str) -> Result<Account> {
    storage
        .accounts
        .get(name)
        .cloned()
        .ok_or_else(|| anyhow!("unknown account '{name}'; run `rps account new {name}` first"))
}

fn parse_fee(fee: &str) -> Result<Amount> {
    Ok(Amount::from_eth_str(fee)?)
}

fn action_label(action: SuggestedAction) -> &'static str {
    match action {
        SuggestedAction::Retry => "Try again",
        SuggestedAction::FundAccount => "Fund your account",
        SuggestedAction::Wait => "Wait and retry later",
        SuggestedAction::Connect => "Reconnect your wallet",
        SuggestedAction::Acknowledge => "OK",
    }
}

/// Print the classified failure the way a dApp would render it, then
/// return an error carrying the raw detail for the exit path.
fn fail(e: RpsError) -> anyhow::Error {
    let classified = classify(&e.to_string());
    println!("{}", classified.message);
    println!("Suggested action: {}", action_label(classified.action));
    anyhow!(classified.detail)
}

fn print_result(result: &GameResult) {
    if result.is_draw {
        println!("Result: draw - both stakes refunded");
    } else {
        println!("Result: {} wins {}", result.winner, result.prize);
    }
    println!("Moves: {:?}", result.moves);
}

pub async fn account_new(data_dir: &Path, name: &str) -> Result<()> {
    let mut storage = load_storage(data_dir);
    if storage.accounts.contains_key(name) {
        bail!("account '{name}' already exists");
    }

    let account = Account::generate(name);
    let chain = LocalChain::restore(storage.chain);
    chain.fund(account.address, Amount::from_eth_str(FAUCET_GRANT)?);

    println!("Created account '{name}'");
    println!("Address: {}", account.address);
    println!("Faucet granted {} STT", FAUCET_GRANT);

    storage.accounts.insert(name.to_string(), account);
    storage.chain = chain.snapshot();
    save_storage(data_dir, &storage)
}

pub async fn account_list(data_dir: &Path) -> Result<()> {
    let storage = load_storage(data_dir);
    let chain = LocalChain::restore(storage.chain.clone());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Account", "Address", "Available", "Withdrawable"]);
    for (name, account) in &storage.accounts {
        let balance = chain.get_balance(account.address).await?;
        table.add_row(vec![
            name.clone(),
            account.address.to_string(),
            balance.available.to_string(),
            balance.withdrawable.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub async fn create_game(data_dir: &Path, account_name: &str, fee: &str) -> Result<()> {
    let mut storage = load_storage(data_dir);
    let account = lookup_account(&storage, account_name)?;
    let entry_fee = parse_fee(fee)?;

    let chain = Arc::new(LocalChain::restore(storage.chain));
    let coordinator = SessionCoordinator::new(chain.clone(), account.address);

    match coordinator.create_game(entry_fee).await {
        Ok(Some(session)) => {
            println!("Created game {session} with an entry fee of {entry_fee}");
            println!("Waiting for a second player to join...");
            println!();
            println!("Share this command with another player:");
            println!("rps join <their-account> {session} {fee}");

            storage.chain = chain.snapshot();
            save_storage(data_dir, &storage)
        }
        Ok(None) => Ok(()),
        Err(e) => {
            storage.chain = chain.snapshot();
            save_storage(data_dir, &storage)?;
            Err(fail(e))
        }
    }
}

pub async fn join_game(
    data_dir: &Path,
    account_name: &str,
    session: SessionId,
    fee: &str,
) -> Result<()> {
    let mut storage = load_storage(data_dir);
    let account = lookup_account(&storage, account_name)?;
    let entry_fee = parse_fee(fee)?;

    let chain = Arc::new(LocalChain::restore(storage.chain));
    let coordinator = SessionCoordinator::new(chain.clone(), account.address);

    match coordinator.join_game(session, entry_fee).await {
        Ok(()) => {
            println!("Joined game {session}");
            println!("Both players are in - commit your move:");
            println!("rps commit {account_name} {session} <rock|paper|scissors>");

            storage.chain = chain.snapshot();
            save_storage(data_dir, &storage)
        }
        Err(e) => {
            storage.chain = chain.snapshot();
            save_storage(data_dir, &storage)?;
            Err(fail(e))
        }
    }
}

pub async fn commit_move(
    data_dir: &Path,
    account_name: &str,
    session: SessionId,
    mv: &str,
) -> Result<()> {
    let mut storage = load_storage(data_dir);
    let account = lookup_account(&storage, account_name)?;
    let mv: Move = mv.parse().map_err(|e: String| anyhow!(e))?;

    let chain = Arc::new(LocalChain::restore(storage.chain));
    let coordinator = SessionCoordinator::new(chain.clone(), account.address);
    coordinator.resume(session).await.map_err(fail)?;

    match coordinator.commit_move(mv).await {
        Ok(()) => {
            let secret = coordinator
                .committed_secret(session)
                .ok_or_else(|| anyhow!("confirmed commit left no cached secret"))?;
            storage
                .secrets
                .insert(secret_key(session, account.address), secret);
            tracing::debug!(session, "stored commitment secret");

            println!("Committed {mv} for game {session}");
            println!("The move stays secret until you reveal it.");
            println!("Do not delete local data before revealing - the move cannot be reconstructed.");

            storage.chain = chain.snapshot();
            save_storage(data_dir, &storage)
        }
        Err(e) => {
            storage.chain = chain.snapshot();
            save_storage(data_dir, &storage)?;
            Err(fail(e))
        }
    }
}

pub async fn reveal_move(data_dir: &Path, account_name: &str, session: SessionId) -> Result<()> {
    let mut storage = load_storage(data_dir);
    let account = lookup_account(&storage, account_name)?;

    let chain = Arc::new(LocalChain::restore(storage.chain));
    let coordinator = SessionCoordinator::new(chain.clone(), account.address);
    coordinator.resume(session).await.map_err(fail)?;

    if let Some(secret) = storage.secrets.get(&secret_key(session, account.address)) {
        coordinator.restore_secret(session, *secret);
    }

    match coordinator.reveal_move().await {
        Ok(()) => {
            println!("Revealed your move for game {session}");
            if let Ok(Some(result)) = coordinator.check_game_result().await {
                print_result(&result);
            } else {
                println!("Waiting for the other player to reveal.");
            }

            storage.chain = chain.snapshot();
            save_storage(data_dir, &storage)
        }
        Err(e) => {
            storage.chain = chain.snapshot();
            save_storage(data_dir, &storage)?;
            Err(fail(e))
        }
    }
}

pub async fn force_resolve(data_dir: &Path, account_name: &str, session: SessionId) -> Result<()> {
    let mut storage = load_storage(data_dir);
    let account = lookup_account(&storage, account_name)?;

    let chain = Arc::new(LocalChain::restore(storage.chain));
    let coordinator = SessionCoordinator::new(chain.clone(), account.address);
    coordinator.resume(session).await.map_err(fail)?;

    match coordinator.force_resolve_game().await {
        Ok(()) => {
            println!("Forced resolution of game {session}");
            if let Ok(Some(result)) = coordinator.check_game_result().await {
                print_result(&result);
            }

            storage.chain = chain.snapshot();
            save_storage(data_dir, &storage)
        }
        Err(e) => {
            storage.chain = chain.snapshot();
            save_storage(data_dir, &storage)?;
            Err(fail(e))
        }
    }
}

pub async fn withdraw(data_dir: &Path, account_name: &str) -> Result<()> {
    let mut storage = load_storage(data_dir);
    let account = lookup_account(&storage, account_name)?;

    let chain = Arc::new(LocalChain::restore(storage.chain));
    let coordinator = SessionCoordinator::new(chain.clone(), account.address);

    match coordinator.withdraw().await {
        Ok(Some(amount)) => {
            println!("Withdrew {amount}");
            storage.chain = chain.snapshot();
            save_storage(data_dir, &storage)
        }
        Ok(None) => Ok(()),
        Err(e) => {
            storage.chain = chain.snapshot();
            save_storage(data_dir, &storage)?;
            Err(fail(e))
        }
    }
}

fn status_of(snapshot: &somnia_rps::GameSnapshot, result: &GameResult) -> String {
    if result.is_resolved() {
        if result.is_draw {
            "resolved: draw".to_string()
        } else {
            format!("resolved: {} won", result.winner)
        }
    } else if snapshot.players.len() < 2 {
        "waiting for players".to_string()
    } else if snapshot.committed.len() < 2 {
        "commit phase".to_string()
    } else {
        "reveal phase".to_string()
    }
}

pub async fn show_status(data_dir: &Path, session: SessionId) -> Result<()> {
    let storage = load_storage(data_dir);
    let chain = LocalChain::restore(storage.chain);
    let config = chain.config();

    let snapshot = chain.get_game(session).await.map_err(fail)?;
    let result = chain.get_game_result(session).await.map_err(fail)?;
    let status = status_of(&snapshot, &result);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Session".to_string(), session.to_string()]);
    table.add_row(vec!["Chain id".to_string(), config.chain_id.to_string()]);
    table.add_row(vec![
        "Entry fee".to_string(),
        snapshot.entry_fee.to_string(),
    ]);
    table.add_row(vec![
        "Players".to_string(),
        snapshot
            .players
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join("\n"),
    ]);
    table.add_row(vec![
        "Committed".to_string(),
        format!("{}/{}", snapshot.committed.len(), snapshot.players.len()),
    ]);
    table.add_row(vec![
        "Revealed".to_string(),
        format!("{}/{}", snapshot.revealed.len(), snapshot.players.len()),
    ]);
    table.add_row(vec![
        "Reveal deadline".to_string(),
        snapshot
            .reveal_deadline
            .map(|d| {
                let rendered = d.format("%Y-%m-%d %H:%M:%S UTC").to_string();
                if d < chrono::Utc::now() {
                    format!("{rendered} (passed)")
                } else {
                    rendered
                }
            })
            .unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec!["Status".to_string(), status]);
    println!("{table}");

    if result.is_resolved() {
        print_result(&result);
    }
    Ok(())
}

pub async fn list_games(data_dir: &Path) -> Result<()> {
    let storage = load_storage(data_dir);
    let sessions = storage.chain.session_ids();
    let chain = LocalChain::restore(storage.chain);

    if sessions.is_empty() {
        println!("No games yet. Start one with `rps create <account> <fee>`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Session", "Entry fee", "Players", "Status"]);
    for session in sessions {
        let snapshot = chain.get_game(session).await?;
        let result = chain.get_game_result(session).await?;
        table.add_row(vec![
            session.to_string(),
            snapshot.entry_fee.to_string(),
            format!("{}/2", snapshot.players.len()),
            status_of(&snapshot, &result),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub async fn show_balance(data_dir: &Path, account_name: &str) -> Result<()> {
    let storage = load_storage(data_dir);
    let account = lookup_account(&storage, account_name)?;
    let chain = LocalChain::restore(storage.chain);

    let balance = chain.get_balance(account.address).await?;
    println!("Account: {account}");
    println!("Available: {}", balance.available);
    println!("Withdrawable: {}", balance.withdrawable);
    if !balance.withdrawable.is_zero() {
        println!();
        println!("Run `rps withdraw {account_name}` to claim the withdrawable balance.");
    }
    Ok(())
}

pub async fn reset(data_dir: &Path) -> Result<()> {
    let path = storage_path(data_dir);
    if !path.exists() {
        println!("Nothing to reset.");
        return Ok(());
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt("Delete all local accounts, games and commitment secrets?")
        .default(false)
        .interact()?;
    if confirmed {
        std::fs::remove_file(&path)?;
        println!("Local game data deleted.");
    } else {
        println!("Aborted.");
    }
    Ok(())
}

/// A complete two-player round against an in-process hub, showing the
/// event-driven flow end to end.
pub async fn demo() -> Result<()> {
    let chain = Arc::new(LocalChain::new());
    let alice = Account::generate("alice");
    let bob = Account::generate("bob");
    let grant = Amount::from_eth_str("1")?;
    chain.fund(alice.address, grant);
    chain.fund(bob.address, grant);

    let alice_session = SessionCoordinator::new(chain.clone(), alice.address);
    let bob_session = SessionCoordinator::new(chain.clone(), bob.address);

    let fee = Amount::from_eth_str("0.01")?;
    println!("alice creates a game with a {fee} entry fee");
    let id = alice_session
        .create_game(fee)
        .await
        .map_err(fail)?
        .ok_or_else(|| anyhow!("no transaction should be in flight"))?;

    println!("bob joins game {id}");
    bob_session.join_game(id, fee).await.map_err(fail)?;

    wait_for_phase(&alice_session, Phase::Committing).await?;
    println!("both clients reached the commit phase");

    alice_session.commit_move(Move::Rock).await.map_err(fail)?;
    bob_session.commit_move(Move::Scissors).await.map_err(fail)?;
    println!("moves committed: only the hashes are on chain");

    alice_session.reveal_move().await.map_err(fail)?;
    bob_session.reveal_move().await.map_err(fail)?;
    println!("both moves revealed");

    wait_for_phase(&alice_session, Phase::Finished).await?;
    let result = alice_session
        .state()
        .result
        .ok_or_else(|| anyhow!("finished session has no result"))?;
    print_result(&result);

    let balance = chain.get_balance(result.winner).await?;
    println!("Winner now holds {}", balance.available);
    Ok(())
}

async fn wait_for_phase(coordinator: &Arc<SessionCoordinator>, phase: Phase) -> Result<()> {
    for _ in 0..200 {
        if coordinator.state().phase == phase {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    bail!("timed out waiting for {phase:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn storage_round_trips() {
        let dir = tempdir().unwrap();
        let mut storage = CliStorage::default();
        storage
            .accounts
            .insert("alice".to_string(), Account::generate("alice"));
        storage.secrets.insert(
            "1:0x0000000000000000000000000000000000000000".to_string(),
            MoveSecret {
                mv: Move::Rock,
                nonce: somnia_rps::generate_nonce(),
            },
        );
        save_storage(dir.path(), &storage).unwrap();

        let loaded = load_storage(dir.path());
        assert_eq!(loaded.accounts.len(), 1);
        assert_eq!(loaded.secrets.len(), 1);
        assert_eq!(
            loaded.accounts["alice"].address,
            storage.accounts["alice"].address
        );
    }

    #[test]
    fn missing_storage_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let storage = load_storage(dir.path());
        assert!(storage.accounts.is_empty());
        assert!(storage.secrets.is_empty());
    }
}
