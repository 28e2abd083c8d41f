use std::io::{self, Write};

use court_book::storage::config::Config;
use court_book::sync::auth::{BearerAuthProvider, TokenInfo, UserIdentity};

const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

pub async fn check_or_setup_auth(auth: &BearerAuthProvider) -> Result<(), Box<dyn std::error::Error>> {
    if auth.is_signed_in() {
        return Ok(());
    }

    println!("No valid sign-in found. Setting up court booking access...\n");
    println!("1. Sign in to the booking site in your browser");
    println!("2. Copy the access token from your account page");
    println!("3. Paste it when prompted\n");
    println!("The token is stored at the auth.token_cache path in:");
    println!("{}\n", Config::config_path().display());

    let access_token = prompt("Access token: ")?;
    if access_token.is_empty() {
        return Err("No access token entered".into());
    }

    let email = prompt("Email (optional): ")?;
    let user = UserIdentity {
        uid: if email.is_empty() { "local-user".to_string() } else { email.clone() },
        display_name: None,
        email: (!email.is_empty()).then_some(email),
    };

    auth.sign_in(TokenInfo::new(access_token, DEFAULT_TOKEN_LIFETIME_SECS, user))?;
    println!("\nSigned in successfully! You can now book courts.\n");

    Ok(())
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
