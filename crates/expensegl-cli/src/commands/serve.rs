//! Server command implementation

use anyhow::Result;
use expensegl_core::Settings;

pub async fn cmd_serve(
    settings: Settings,
    host: &str,
    port: u16,
    no_auth: bool,
    allowed_origins: Vec<String>,
) -> Result<()> {
    println!("🚀 Starting ExpenseGL web server...");
    println!("   Ledger: {}", settings.expense_codes_csv.display());
    println!("   Listening: http://{}:{}", host, port);

    // Parse function keys from environment (comma-separated)
    let api_keys: Vec<String> = std::env::var("EXPENSEGL_API_KEYS")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else if api_keys.is_empty() {
        println!("   🔒 Authentication: function key required");
        println!("      Set EXPENSEGL_API_KEYS or every request will be rejected");
    } else {
        println!(
            "   🔑 Function keys: {} configured (EXPENSEGL_API_KEYS)",
            api_keys.len()
        );
    }
    if !allowed_origins.is_empty() {
        println!("   🌐 CORS origins: {}", allowed_origins.join(", "));
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let config = expensegl_server::ServerConfig {
        require_auth: !no_auth,
        allowed_origins,
        api_keys,
    };

    let state = expensegl_server::AppState::from_settings(settings, config);
    expensegl_server::serve(state, host, port).await?;

    Ok(())
}
