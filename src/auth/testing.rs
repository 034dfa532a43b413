//! In-memory stores and fixtures for unit tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use secrecy::SecretString;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};
use uuid::Uuid;

use super::{
    model::{NewSession, NewUser, SessionRecord, UniqueField, User},
    password::Argon2Hasher,
    service::AuthOrchestrator,
    sessions::{hash_refresh_token, SessionRegistry, ALREADY_LOGGED_OUT},
    token::{JwtCodec, ACCESS_TOKEN_TTL_SECONDS, REFRESH_TOKEN_TTL_SECONDS},
    users::{CredentialStore, InsertOutcome},
};
use crate::error::AppError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Credential store that enforces the same unique columns as the schema.
#[derive(Default)]
pub(crate) struct MemoryCredentialStore {
    users: Mutex<Vec<User>>,
    calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryCredentialStore {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub(crate) fn delete(&self, id: Uuid) {
        lock(&self.users).retain(|user| user.id != id);
    }

    fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        Ok(())
    }

    fn find(&self, predicate: impl Fn(&User) -> bool) -> Option<User> {
        lock(&self.users).iter().find(|user| predicate(user)).cloned()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn insert(&self, user: NewUser) -> Result<InsertOutcome> {
        self.enter()?;
        let mut users = lock(&self.users);
        if users.iter().any(|existing| existing.username == user.username) {
            return Ok(InsertOutcome::Conflict(UniqueField::Username));
        }
        if users.iter().any(|existing| existing.email == user.email) {
            return Ok(InsertOutcome::Conflict(UniqueField::Email));
        }
        let created = User {
            id: Uuid::now_v7(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        users.push(created.clone());
        Ok(InsertOutcome::Created(created))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.enter()?;
        Ok(self.find(|user| user.username == username))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.enter()?;
        Ok(self.find(|user| user.email == email))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.enter()?;
        Ok(self.find(|user| user.id == id))
    }
}

#[derive(Default)]
pub(crate) struct MemorySessionRegistry {
    sessions: Mutex<Vec<(Vec<u8>, SessionRecord)>>,
    unavailable: AtomicBool,
}

impl MemorySessionRegistry {
    pub(crate) fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn enter(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::internal());
        }
        Ok(())
    }
}

#[async_trait]
impl SessionRegistry for MemorySessionRegistry {
    async fn store(&self, session: NewSession) -> Result<SessionRecord, AppError> {
        self.enter()?;
        let record = SessionRecord {
            id: Uuid::now_v7(),
            user_id: session.user_id,
            username: session.username,
            user_agent: session.user_agent,
            created_at: Utc::now(),
        };
        lock(&self.sessions).push((hash_refresh_token(&session.refresh_token), record.clone()));
        Ok(record)
    }

    async fn remove(&self, refresh_token: &str) -> Result<(), AppError> {
        self.enter()?;
        let hash = hash_refresh_token(refresh_token);
        lock(&self.sessions).retain(|(stored, _)| *stored != hash);
        Ok(())
    }

    async fn find_by_token(&self, refresh_token: &str) -> Result<SessionRecord, AppError> {
        self.enter()?;
        let hash = hash_refresh_token(refresh_token);
        lock(&self.sessions)
            .iter()
            .find(|(stored, _)| *stored == hash)
            .map(|(_, record)| record.clone())
            .ok_or_else(|| AppError::authorization(ALREADY_LOGGED_OUT))
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<SessionRecord>, AppError> {
        self.enter()?;
        let mut records: Vec<SessionRecord> = lock(&self.sessions)
            .iter()
            .filter(|(_, record)| record.user_id == user_id)
            .map(|(_, record)| record.clone())
            .collect();
        records.reverse();
        Ok(records)
    }
}

pub(crate) fn test_codec() -> Result<JwtCodec> {
    JwtCodec::new(
        &SecretString::from("access-secret-for-tests"),
        &SecretString::from("refresh-secret-for-tests"),
        ACCESS_TOKEN_TTL_SECONDS,
        REFRESH_TOKEN_TTL_SECONDS,
    )
}

pub(crate) struct Fixture {
    pub(crate) users: Arc<MemoryCredentialStore>,
    pub(crate) sessions: Arc<MemorySessionRegistry>,
    pub(crate) codec: Arc<JwtCodec>,
    pub(crate) service: Arc<AuthOrchestrator>,
}

impl Fixture {
    pub(crate) fn new() -> Result<Self> {
        let users = Arc::new(MemoryCredentialStore::default());
        let sessions = Arc::new(MemorySessionRegistry::default());
        let codec = Arc::new(test_codec()?);
        let service = Arc::new(AuthOrchestrator::new(
            users.clone(),
            sessions.clone(),
            Arc::new(Argon2Hasher::new(1024, 1)?),
            codec.clone(),
        )?);
        Ok(Self {
            users,
            sessions,
            codec,
            service,
        })
    }
}
