use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 25] = [
        "RUST_LOG",
        "BOLT_HOST",
        "BOLT_PORT",
        "BOLT_DATABASE_URL",
        "BOLT_ADMIN_USER_IDS",
        "BOLT_SLACK_API_URL",
        "BOLT_DISABLE_SIGNATURE_VERIFICATION",
        "BOLT_INGRESS_WORKERS",
        "BOLT_INGRESS_QUEUE_SIZE",
        "BOLT_INGRESS_ACCEPT_TIMEOUT_MS",
        "BOLT_ORDER_READY_TIMEOUT_SECS",
        "BOLT_STATUS_CHECK_INTERVAL_SECS",
        "BOLT_DELIVERY_TIMEOUT_SECS",
        "BOLT_GET_READY_THRESHOLD_SECS",
        "BOLT_DEBT_REMINDER_INTERVAL_SECS",
        "BOLT_DEBT_MAXIMUM_DURATION_SECS",
        "BOLT_DONT_JOIN_AFTER",
        "BOLT_DONT_JOIN_AFTER_TZ",
        "BOLT_DESTINATION_EMOJI",
        "BOLT_PROFILE_CACHE_MAX_AGE_SECS",
        "BOLT_WOLT_BASE_ADDR",
        "BOLT_WOLT_API_BASE_ADDR",
        "BOLT_WOLT_HTTP_MAX_RETRIES",
        "BOLT_WOLT_HTTP_MIN_RETRY_MS",
        "BOLT_WOLT_HTTP_MAX_RETRY_MS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
