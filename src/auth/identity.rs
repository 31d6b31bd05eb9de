//! Identity client: credentials, sessions and sign-in/out notifications.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    claims::Claims,
    password::{hash_password, verify_password},
    repo_types::User,
};
use crate::error::{AppError, AppResult};

/// A sign-in/out transition, published to every subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedUp(Uuid),
    SignedIn(Uuid),
    SignedOut(Uuid),
}

/// Authenticated user as seen by the API.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub session_version: i32,
}

impl From<User> for Identity {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            session_version: u.token_version,
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> AppResult<Identity>;

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Identity>;

    /// Ends every session of the user.
    async fn sign_out(&self, user_id: Uuid) -> AppResult<()>;

    async fn identity(&self, user_id: Uuid) -> AppResult<Option<Identity>>;

    /// Remove an identity whose sign-up could not be completed.
    async fn delete_user(&self, user_id: Uuid) -> AppResult<()>;

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;

    /// User behind verified claims, `None` once the session was signed out.
    async fn current_user(&self, claims: &Claims) -> AppResult<Option<Identity>> {
        Ok(self
            .identity(claims.sub)
            .await?
            .filter(|i| i.session_version == claims.ver))
    }
}

fn invalid_credentials() -> AppError {
    AppError::Auth("Invalid credentials".into())
}

fn email_taken() -> AppError {
    AppError::Conflict("Email already registered".into())
}

/// Users kept in the `users` table.
pub struct PgIdentity {
    db: PgPool,
    events: broadcast::Sender<SessionEvent>,
}

impl PgIdentity {
    pub fn new(db: PgPool) -> Self {
        let (events, _) = broadcast::channel(64);
        Self { db, events }
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl IdentityProvider for PgIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> AppResult<Identity> {
        let hash = hash_password(password)?;
        let user = User::create(&self.db, email, &hash)
            .await?
            .ok_or_else(email_taken)?;
        info!(user_id = %user.id, "identity created");
        self.publish(SessionEvent::SignedUp(user.id));
        Ok(user.into())
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Identity> {
        let Some(user) = User::find_by_email(&self.db, email).await? else {
            warn!(email = %email, "login unknown email");
            return Err(invalid_credentials());
        };
        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(invalid_credentials());
        }
        self.publish(SessionEvent::SignedIn(user.id));
        Ok(user.into())
    }

    async fn sign_out(&self, user_id: Uuid) -> AppResult<()> {
        User::bump_token_version(&self.db, user_id).await?;
        self.publish(SessionEvent::SignedOut(user_id));
        Ok(())
    }

    async fn identity(&self, user_id: Uuid) -> AppResult<Option<Identity>> {
        Ok(User::find_by_id(&self.db, user_id).await?.map(Identity::from))
    }

    async fn delete_user(&self, user_id: Uuid) -> AppResult<()> {
        if User::delete(&self.db, user_id).await? {
            info!(%user_id, "identity removed");
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// Users kept in process memory, keyed by email.
pub struct MemoryIdentity {
    users: RwLock<HashMap<String, User>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            users: RwLock::new(HashMap::new()),
            events,
        }
    }
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> AppResult<Identity> {
        let hash = hash_password(password)?;
        let mut users = self.users.write().await;
        if users.contains_key(email) {
            return Err(email_taken());
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: hash,
            token_version: 0,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(email.to_string(), user.clone());
        let _ = self.events.send(SessionEvent::SignedUp(user.id));
        Ok(user.into())
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Identity> {
        let user = self
            .users
            .read()
            .await
            .get(email)
            .cloned()
            .ok_or_else(invalid_credentials)?;
        if !verify_password(password, &user.password_hash)? {
            return Err(invalid_credentials());
        }
        let _ = self.events.send(SessionEvent::SignedIn(user.id));
        Ok(user.into())
    }

    async fn sign_out(&self, user_id: Uuid) -> AppResult<()> {
        let mut users = self.users.write().await;
        if let Some(u) = users.values_mut().find(|u| u.id == user_id) {
            u.token_version += 1;
        }
        let _ = self.events.send(SessionEvent::SignedOut(user_id));
        Ok(())
    }

    async fn identity(&self, user_id: Uuid) -> AppResult<Option<Identity>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.id == user_id).cloned().map(Identity::from))
    }

    async fn delete_user(&self, user_id: Uuid) -> AppResult<()> {
        self.users.write().await.retain(|_, u| u.id != user_id);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// Logs every session transition until the provider goes away.
pub async fn watch_sessions(mut rx: broadcast::Receiver<SessionEvent>) {
    loop {
        match rx.recv().await {
            Ok(SessionEvent::SignedUp(id)) => info!(user_id = %id, "session: signed up"),
            Ok(SessionEvent::SignedIn(id)) => info!(user_id = %id, "session: signed in"),
            Ok(SessionEvent::SignedOut(id)) => info!(user_id = %id, "session: signed out"),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "session watcher lagged")
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::TokenKind;

    fn claims_for(i: &Identity) -> Claims {
        Claims {
            sub: i.id,
            iat: 0,
            exp: usize::MAX,
            iss: "t".into(),
            aud: "t".into(),
            kind: TokenKind::Access,
            ver: i.session_version,
        }
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let idp = MemoryIdentity::new();
        let created = idp.sign_up("p1@clinic.in", "long-password").await.unwrap();
        let signed_in = idp.sign_in("p1@clinic.in", "long-password").await.unwrap();
        assert_eq!(created.id, signed_in.id);

        assert!(matches!(
            idp.sign_in("p1@clinic.in", "nope-nope").await.unwrap_err(),
            AppError::Auth(_)
        ));
        assert!(matches!(
            idp.sign_in("nobody@clinic.in", "long-password").await.unwrap_err(),
            AppError::Auth(_)
        ));
        assert!(matches!(
            idp.sign_up("p1@clinic.in", "another-password").await.unwrap_err(),
            AppError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn sign_out_ends_existing_sessions() {
        let idp = MemoryIdentity::new();
        let me = idp.sign_up("t1@clinic.in", "long-password").await.unwrap();
        let claims = claims_for(&me);
        assert!(idp.current_user(&claims).await.unwrap().is_some());

        idp.sign_out(me.id).await.unwrap();
        assert!(idp.current_user(&claims).await.unwrap().is_none());

        let again = idp.sign_in("t1@clinic.in", "long-password").await.unwrap();
        assert!(idp.current_user(&claims_for(&again)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn subscribers_see_every_transition() {
        let idp = MemoryIdentity::new();
        let mut rx = idp.subscribe();
        let me = idp.sign_up("p2@clinic.in", "long-password").await.unwrap();
        idp.sign_in("p2@clinic.in", "long-password").await.unwrap();
        idp.sign_out(me.id).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), SessionEvent::SignedUp(me.id));
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::SignedIn(me.id));
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::SignedOut(me.id));
    }

    #[tokio::test]
    async fn deleted_identity_frees_the_email() {
        let idp = MemoryIdentity::new();
        let me = idp.sign_up("p3@clinic.in", "long-password").await.unwrap();
        idp.delete_user(me.id).await.unwrap();

        assert!(idp.identity(me.id).await.unwrap().is_none());
        assert!(matches!(
            idp.sign_in("p3@clinic.in", "long-password").await.unwrap_err(),
            AppError::Auth(_)
        ));
        let again = idp.sign_up("p3@clinic.in", "long-password").await.unwrap();
        assert_ne!(again.id, me.id);
    }
}
