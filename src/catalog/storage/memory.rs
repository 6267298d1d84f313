//! In-process store used by tests, demos and `--store memory`.
//!
//! All state sits behind one `tokio::sync::RwLock`; writes re-check slug
//! uniqueness and parent existence under the write lock, so the memory store
//! enforces the same constraints as the database schema.

use async_trait::async_trait;
use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};
use tokio::{sync::RwLock, time::Instant};
use uuid::Uuid;

use super::{CatalogStore, MAX_SESSION_TTL_SECS, UserStore};
use crate::{
    accounts::User,
    catalog::{
        entity::{Entity, EntityKind},
        error::StoreError,
    },
};

const CHILD_KINDS: [EntityKind; 3] = [
    EntityKind::Menu,
    EntityKind::MenuSection,
    EntityKind::MenuItem,
];

#[derive(Debug)]
struct Session {
    user_id: Uuid,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct State {
    // Insertion order doubles as creation order.
    entities: Vec<Entity>,
    users: Vec<User>,
    sessions: HashMap<Vec<u8>, Session>,
}

impl State {
    fn find(&self, kind: EntityKind, id: Uuid) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|entity| entity.kind() == kind && entity.id() == id)
    }

    fn slug_taken(&self, candidate: &Entity) -> bool {
        self.entities.iter().any(|entity| {
            entity.kind() == candidate.kind()
                && entity.parent_id() == candidate.parent_id()
                && entity.slug() == candidate.slug()
                && entity.id() != candidate.id()
        })
    }

    fn check_admins(&self, entity: &Entity) -> Result<(), StoreError> {
        let Entity::Restaurant(restaurant) = entity else {
            return Ok(());
        };
        let known = restaurant
            .admin_users
            .iter()
            .all(|admin| self.users.iter().any(|user| user.id == *admin));
        if known {
            Ok(())
        } else {
            Err(StoreError::UnknownUser)
        }
    }

    fn check_parent(&self, entity: &Entity) -> Result<(), StoreError> {
        match (entity.kind().parent(), entity.parent_id()) {
            (Some(parent_kind), Some(parent_id)) if self.find(parent_kind, parent_id).is_none() => {
                Err(StoreError::ParentMissing(parent_kind))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create(&self, entity: &Entity) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.check_parent(entity)?;
        state.check_admins(entity)?;
        if state.slug_taken(entity)
            || state
                .entities
                .iter()
                .any(|existing| existing.id() == entity.id())
        {
            return Err(StoreError::UniqueViolation);
        }
        state.entities.push(entity.clone());
        Ok(())
    }

    async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Option<Entity>, StoreError> {
        Ok(self.state.read().await.find(kind, id).cloned())
    }

    async fn find_by_slug(
        &self,
        kind: EntityKind,
        parent: Option<Uuid>,
        slug: &str,
    ) -> Result<Vec<Entity>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .entities
            .iter()
            .filter(|entity| {
                entity.kind() == kind && entity.parent_id() == parent && entity.slug() == slug
            })
            .cloned()
            .collect())
    }

    async fn list(
        &self,
        kind: EntityKind,
        parent: Option<Uuid>,
    ) -> Result<Vec<Entity>, StoreError> {
        let state = self.state.read().await;
        let mut entities: Vec<Entity> = state
            .entities
            .iter()
            .filter(|entity| entity.kind() == kind && entity.parent_id() == parent)
            .cloned()
            .collect();
        if matches!(kind, EntityKind::Restaurant | EntityKind::Menu) {
            // Stable sort keeps creation order between equal names.
            entities.sort_by(|a, b| a.name().cmp(b.name()));
        }
        Ok(entities)
    }

    async fn update(&self, entity: &Entity) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.slug_taken(entity) {
            return Err(StoreError::UniqueViolation);
        }
        let Some(slot) = state
            .entities
            .iter_mut()
            .find(|stored| stored.kind() == entity.kind() && stored.id() == entity.id())
        else {
            return Err(StoreError::Missing(entity.kind()));
        };

        let mut updated = entity.clone();
        if let (Entity::Restaurant(stored), Entity::Restaurant(incoming)) = (&*slot, &mut updated) {
            incoming.admin_users.clone_from(&stored.admin_users);
        }
        *slot = updated;
        Ok(())
    }

    async fn delete(&self, kind: EntityKind, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if state.find(kind, id).is_none() {
            return Ok(false);
        }

        let mut doomed = HashSet::from([id]);
        for child_kind in CHILD_KINDS {
            for entity in &state.entities {
                if entity.kind() == child_kind
                    && entity.parent_id().is_some_and(|parent| doomed.contains(&parent))
                {
                    doomed.insert(entity.id());
                }
            }
        }
        state.entities.retain(|entity| !doomed.contains(&entity.id()));
        Ok(true)
    }

    async fn add_admin(&self, restaurant_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.users.iter().any(|user| user.id == user_id) {
            return Err(StoreError::UnknownUser);
        }
        let restaurant = state.entities.iter_mut().find_map(|entity| match entity {
            Entity::Restaurant(restaurant) if restaurant.id == restaurant_id => Some(restaurant),
            _ => None,
        });
        let Some(restaurant) = restaurant else {
            return Err(StoreError::Missing(EntityKind::Restaurant));
        };
        restaurant.admin_users.insert(user_id);
        Ok(())
    }

    async fn remove_admin(&self, restaurant_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let restaurant = state.entities.iter_mut().find_map(|entity| match entity {
            Entity::Restaurant(restaurant) if restaurant.id == restaurant_id => Some(restaurant),
            _ => None,
        });
        let Some(restaurant) = restaurant else {
            return Ok(false);
        };
        if !restaurant.admin_users.contains(&user_id) {
            return Ok(false);
        }
        if restaurant.admin_users.len() == 1 {
            return Err(StoreError::LastAdmin);
        }
        Ok(restaurant.admin_users.remove(&user_id))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let email = user.email.to_lowercase();
        if state.users.iter().any(|existing| {
            existing.id == user.id
                || existing.username == user.username
                || existing.email.to_lowercase() == email
        }) {
            return Err(StoreError::UniqueViolation);
        }
        state.users.push(user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.to_lowercase();
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .find(|user| user.email.to_lowercase() == email)
            .cloned())
    }

    async fn create_session(
        &self,
        token_hash: &[u8],
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        if ttl.as_secs() > MAX_SESSION_TTL_SECS {
            return Err(StoreError::SessionTtlOutOfRange);
        }
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .ok_or(StoreError::SessionTtlOutOfRange)?;

        let mut state = self.state.write().await;
        if !state.users.iter().any(|user| user.id == user_id) {
            return Err(StoreError::UnknownUser);
        }
        state.sessions.retain(|_, session| session.expires_at > now);
        state
            .sessions
            .insert(token_hash.to_vec(), Session { user_id, expires_at });
        Ok(())
    }

    async fn find_session_user(&self, token_hash: &[u8]) -> Result<Option<User>, StoreError> {
        let mut state = self.state.write().await;
        let Some((user_id, expires_at)) = state
            .sessions
            .get(token_hash)
            .map(|session| (session.user_id, session.expires_at))
        else {
            return Ok(None);
        };
        if expires_at <= Instant::now() {
            state.sessions.remove(token_hash);
            return Ok(None);
        }
        Ok(state
            .users
            .iter()
            .find(|user| user.id == user_id)
            .cloned())
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<bool, StoreError> {
        Ok(self.state.write().await.sessions.remove(token_hash).is_some())
    }
}
