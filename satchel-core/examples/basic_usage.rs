use satchel_core::{AccountKind, AccountOptions, Network, WalletManager};
use tempfile::tempdir;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Create temp dir
    let temp_dir = tempdir()?;
    println!("Using temporary directory: {:?}", temp_dir.path());

    // Initialize wallet manager
    let manager = WalletManager::new(temp_dir.path());

    println!("Creating wallet...");
    let (store, mnemonic) =
        manager.create_wallet("example-wallet", "open sesame", Network::Regtest)?;
    println!("Wallet created!");
    println!("Mnemonic: {}", mnemonic);

    let wallet_id = {
        let wallet = store.wallet().expect("wallet is attached");
        println!("Wallet ID: {}", wallet.id());
        wallet.id().to_string()
    };

    // Add a native segwit account and show its first addresses
    let mut store = store;
    {
        let wallet = store.wallet_mut().expect("wallet is attached");
        let account = wallet.add_account(
            AccountKind::Bip84,
            None,
            "open sesame",
            AccountOptions::None,
        )?;
        println!("\nAccount: {} ({})", account.name(), account.kind());
        println!("Receive address: {}", account.receive_address(0)?);
        println!("Change address:  {}", account.change_address(0)?);
    }
    store.save()?;

    // Reload from disk and show what came back
    let (reloaded, report) = manager.load_wallet(&wallet_id, Network::Regtest)?;
    let wallet = reloaded.wallet().expect("wallet is attached");
    println!("\nReloaded wallet '{}' cleanly: {}", wallet.name(), report.is_clean());
    println!("Accounts: {}", wallet.accounts().len());
    println!("Balance (unconfirmed included): {}", wallet.balance(false));

    Ok(())
}
