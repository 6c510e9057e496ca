//! In-memory user registry.
//!
//! Passwords are stored as argon2 hashes; the registry only ever answers
//! "does this candidate password match".

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use dashmap::DashMap;

use super::token::Role;
use crate::error::{Error, Result};

/// A registered user with a hashed password.
#[derive(Clone, Debug)]
pub struct User {
    username: String,
    role: Role,
    password_hash: String,
}

impl User {
    /// Creates a user, hashing the password with a fresh random salt.
    pub fn new(username: &str, password: &str, role: Role) -> Result<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Internal(format!("failed to hash password: {e}")))?
            .to_string();

        Ok(Self {
            username: username.to_string(),
            role,
            password_hash,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Constant-behavior password check; any parse or verify failure is a
    /// mismatch.
    pub fn verify_password(&self, candidate: &str) -> bool {
        PasswordHash::new(&self.password_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(candidate.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

/// Concurrency-safe registry of users keyed by username.
#[derive(Default)]
pub struct UserRegistry {
    users: DashMap<String, User>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user; fails if the username is taken.
    pub fn add(&self, user: User) -> Result<()> {
        match self.users.entry(user.username.clone()) {
            dashmap::Entry::Occupied(_) => Err(Error::AlreadyExists(user.username)),
            dashmap::Entry::Vacant(slot) => {
                slot.insert(user);
                Ok(())
            }
        }
    }

    /// Looks up a user by username.
    pub fn find(&self, username: &str) -> Option<User> {
        self.users.get(username).map(|entry| entry.clone())
    }
}
