use std::error::Error;

use signalhub::signaling::TokenCodec;

/// Print the `authenticate` nonce for a user id.
fn main() -> Result<(), Box<dyn Error>> {
    let userid = std::env::args()
        .nth(1)
        .ok_or("usage: signalhub-nonce <userid>")?;
    let secret = std::env::var("SIGNALHUB_SESSION_SECRET")
        .map_err(|_| "SIGNALHUB_SESSION_SECRET must be set")?;

    // Nonces only use the signing key.
    let codec = TokenCodec::new(secret.as_bytes(), &[]);
    println!("{}", codec.user_nonce(&userid));
    Ok(())
}
