//! # In-Memory Stores
//!
//! Buyer accounts and placed orders. Both live behind `Arc<RwLock<..>>` so
//! the whole application state stays cheap to clone per request.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use wd_core::{Order, RegisterRequest, StorefrontError, StorefrontResult, User};

struct UserRecord {
    user: User,
    password_hash: String,
}

#[derive(Default)]
struct UserTable {
    /// Keyed by lower-cased email
    by_email: HashMap<String, UserRecord>,
    email_by_id: HashMap<u64, String>,
    last_id: u64,
}

/// Registered buyers with Argon2id password hashes
#[derive(Clone, Default)]
pub struct UserStore {
    inner: Arc<RwLock<UserTable>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a new buyer. Emails are unique case-insensitively.
    pub async fn register(&self, request: RegisterRequest) -> StorefrontResult<User> {
        let request = request.normalized();
        request.validate()?;
        let key = email_key(&request.email);

        if self.inner.read().await.by_email.contains_key(&key) {
            return Err(StorefrontError::EmailTaken {
                email: request.email,
            });
        }

        let password_hash = hash_password(request.password.clone()).await?;

        let mut table = self.inner.write().await;
        // Re-check under the write lock; another registration may have won
        if table.by_email.contains_key(&key) {
            return Err(StorefrontError::EmailTaken {
                email: request.email,
            });
        }

        table.last_id += 1;
        let user = User {
            id: table.last_id,
            email: request.email.trim().to_string(),
            company_name: request.company_name,
            country: request.country,
            region: request.region,
            street_address: request.street_address,
            city: request.city,
            postal_code: request.postal_code,
            phone: request.phone,
        };

        table.email_by_id.insert(user.id, key.clone());
        table.by_email.insert(
            key,
            UserRecord {
                user: user.clone(),
                password_hash,
            },
        );

        info!("Registered user {} ({})", user.id, user.company_name);
        Ok(user)
    }

    /// Check credentials. Unknown email and wrong password are indistinguishable.
    pub async fn authenticate(&self, email: &str, password: &str) -> StorefrontResult<User> {
        let (user, password_hash) = {
            let table = self.inner.read().await;
            let record = table
                .by_email
                .get(&email_key(email))
                .ok_or(StorefrontError::InvalidCredentials)?;
            (record.user.clone(), record.password_hash.clone())
        };

        verify_password(password.to_string(), password_hash).await?;
        debug!("Authenticated user {}", user.id);
        Ok(user)
    }

    pub async fn get(&self, id: u64) -> Option<User> {
        let table = self.inner.read().await;
        let email = table.email_by_id.get(&id)?;
        table.by_email.get(email).map(|r| r.user.clone())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.by_email.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash a password using Argon2id, off the async executor.
async fn hash_password(password: String) -> StorefrontResult<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| StorefrontError::Internal(format!("Password hashing failed: {}", e)))
    })
    .await
    .map_err(|e| StorefrontError::Internal(e.to_string()))?
}

/// Verify a password against a stored hash.
async fn verify_password(password: String, hash: String) -> StorefrontResult<()> {
    tokio::task::spawn_blocking(move || {
        let parsed_hash =
            PasswordHash::new(&hash).map_err(|_| StorefrontError::InvalidCredentials)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| StorefrontError::InvalidCredentials)
    })
    .await
    .map_err(|e| StorefrontError::Internal(e.to_string()))?
}

/// Placed orders, oldest first
#[derive(Clone, Default)]
pub struct OrderStore {
    inner: Arc<RwLock<Vec<Order>>>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an order unless its payment intent already paid for another.
    /// Check and insert happen under one write lock.
    pub async fn insert_if_intent_unused(&self, order: Order) -> StorefrontResult<()> {
        let mut orders = self.inner.write().await;
        if let Some(ref pi) = order.payment_intent_id {
            if let Some(existing) = orders
                .iter()
                .find(|o| o.payment_intent_id.as_deref() == Some(pi.as_str()))
            {
                return Err(StorefrontError::Validation(format!(
                    "Payment already used for order {}",
                    existing.id
                )));
            }
        }
        orders.push(order);
        Ok(())
    }

    /// A user's orders, newest first
    pub async fn for_user(&self, user_id: u64) -> Vec<Order> {
        self.inner
            .read()
            .await
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn find_by_payment_intent(&self, payment_intent_id: &str) -> Option<Order> {
        self.inner
            .read()
            .await
            .iter()
            .find(|o| o.payment_intent_id.as_deref() == Some(payment_intent_id))
            .cloned()
    }
}

/// Accounts seeded outside production
pub const DEMO_USERS: &[(&str, &str, &str, &str)] = &[
    ("demo@restaurant.com", "demo123", "Demo Restaurant Chain", "Germany"),
    ("test@hotel.com", "test123", "Test Hotel Group", "France"),
];

/// Register the demo buyers (both EU)
pub async fn seed_demo_users(users: &UserStore) -> StorefrontResult<()> {
    for (email, password, company, country) in DEMO_USERS {
        match users
            .register(RegisterRequest::new(*email, *password, *company, *country))
            .await
        {
            Ok(_) | Err(StorefrontError::EmailTaken { .. }) => {}
            Err(e) => return Err(e),
        }
    }
    info!("Seeded {} demo users", DEMO_USERS.len());
    Ok(())
}
