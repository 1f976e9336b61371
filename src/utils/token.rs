// src/utils/token.rs

use rand::{Rng, distributions::Alphanumeric, rngs::OsRng};

use crate::models::token::{AccessToken, PublicToken, TOKEN_LENGTH};

fn random_string(len: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn generate_public_token() -> PublicToken {
    PublicToken::new(random_string(TOKEN_LENGTH))
}

pub fn generate_access_token() -> AccessToken {
    AccessToken::new(random_string(TOKEN_LENGTH))
}
