//! Session resolution seam.
//!
//! Session issuance lives outside this service; handlers only need to turn a
//! session id into the caller's identity and company name.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::SessionSeed;
use crate::errors::ServiceError;

/// Identity attached to a resolved session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: String,
    /// Supplier identity used on exported invoices
    pub company_name: String,
}

#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, session_id: &str) -> Result<SessionContext, ServiceError>;
}

/// Session store backed by a concurrent map.
#[derive(Debug, Default, Clone)]
pub struct InMemorySessionResolver {
    sessions: Arc<DashMap<String, SessionContext>>,
}

impl InMemorySessionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seeds(seeds: impl IntoIterator<Item = SessionSeed>) -> Self {
        let resolver = Self::new();
        for seed in seeds {
            resolver.insert(
                seed.token,
                SessionContext {
                    user_id: seed.user_id,
                    company_name: seed.company_name,
                },
            );
        }
        resolver
    }

    pub fn insert(&self, session_id: impl Into<String>, context: SessionContext) {
        self.sessions.insert(session_id.into(), context);
    }

    pub fn remove(&self, session_id: &str) -> Option<SessionContext> {
        self.sessions.remove(session_id).map(|(_, ctx)| ctx)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionResolver for InMemorySessionResolver {
    async fn resolve(&self, session_id: &str) -> Result<SessionContext, ServiceError> {
        match self.sessions.get(session_id) {
            Some(entry) => {
                debug!(user_id = %entry.user_id, "Session resolved");
                Ok(entry.value().clone())
            }
            None => {
                warn!("Unknown session id presented");
                Err(ServiceError::SessionNotFound)
            }
        }
    }
}

/// Source of document UUIDs for orders that arrive without one.
pub trait UuidSource: Send + Sync {
    fn next_uuid(&self) -> Uuid;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomUuidSource;

impl UuidSource for RandomUuidSource {
    fn next_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}
