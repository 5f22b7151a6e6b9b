//! Encryption key generation.

use showcase_server::services::KeyVault;

/// Print a random 32-byte key, base64 encoded, for `SHOWCASE_ENCRYPTION_KEY`.
pub fn run() {
    let key = KeyVault::generate();

    #[allow(clippy::print_stdout)]
    {
        println!("{key}");
    }
}
