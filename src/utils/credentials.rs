use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use rand::{distributions::Alphanumeric, thread_rng, Rng};

pub const ONE_TIME_PASSWORD_LEN: usize = 8;

/// Lowercased alphabetic prefix of the candidate's name, up to six chars.
/// "Alice Smith" -> "alices". Falls back to "cand" for names with no
/// usable characters.
pub fn user_id_base(name: &str) -> String {
    let base: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(6)
        .collect::<String>()
        .to_lowercase();
    if base.is_empty() {
        "cand".to_string()
    } else {
        base
    }
}

/// "alices" + 1 -> "alices001".
pub fn numbered_user_id(base: &str, suffix: u32) -> String {
    format!("{}{:03}", base, suffix)
}

pub fn generate_one_time_password(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

pub fn hash_password(plain: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2.hash_password(plain.as_bytes(), &salt)?.to_string();
    Ok(password_hash)
}

pub fn verify_password(plain: &str, hashed: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hashed)?;
    let ok = Argon2::default()
        .verify_password(plain.as_bytes(), &parsed_hash)
        .is_ok();
    Ok(ok)
}
