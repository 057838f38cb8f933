use std::env;

const HELP_TEXT: &str = include_str!("./cli-help.txt");

// Secrets (SF_WEBHOOK_HMAC_SECRET, SF_ADMIN_TOKEN) are never printed
const PRINTABLE_SETTINGS: [&str; 11] = [
    "RUST_LOG",
    "SF_HOST",
    "SF_PORT",
    "SF_DATABASE_URL",
    "SF_MAX_CONNECTIONS",
    "SF_ORDER_TIMEOUT",
    "SF_EXPIRY_SWEEP_INTERVAL",
    "SF_WEBHOOK_HMAC_CHECKS",
    "SF_WEBHOOK_HMAC_HEADER",
    "SF_USE_X_FORWARDED_FOR",
    "SF_USE_FORWARDED",
];

/// The server takes no arguments. If any are given, the help text and the current settings are printed and the caller
/// should exit.
pub fn handle_command_line_args() -> bool {
    if env::args().len() <= 1 {
        return false;
    }
    println!("\n{HELP_TEXT}\n");
    println!("{}", current_settings());
    true
}

fn current_settings() -> String {
    let lines = PRINTABLE_SETTINGS
        .iter()
        .map(|&name| {
            let value = env::var_os(name)
                .map(|v| v.into_string().unwrap_or_else(|bad| format!("Invalid value: {}", bad.to_string_lossy())))
                .unwrap_or_else(|| "Not set".into());
            format!("  {name:<35} {value}")
        })
        .collect::<Vec<_>>();
    format!("Current settings (secrets are not shown):\n{}", lines.join("\n"))
}
