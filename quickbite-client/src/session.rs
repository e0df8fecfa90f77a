use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use quickbite_core::{read_json, write_json, Storage};

use crate::ClientContext;

/// Storage key holding the raw credential token.
pub const TOKEN_KEY: &str = "token";
/// Storage key holding the serialized [Identity].
pub const USER_KEY: &str = "user";

/// The authenticated user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Customer,
    Driver,
    RestaurantOwner,
    Admin,
}

/// Holds the authenticated identity and its credential token for the lifetime
/// of a session, durable across restarts.
///
/// The two are stored as one value, so they can only ever be set and cleared
/// together, and "authenticated" is simply their presence.
pub struct SessionStore<S> {
    storage: Arc<S>,
    current: Mutex<Option<Session>>,
}

#[derive(Debug, Clone)]
struct Session {
    identity: Identity,
    token: String,
}

impl<S> SessionStore<S>
where
    S: Storage,
{
    pub fn new(context: &ClientContext<S>) -> Self {
        Self {
            storage: context.storage.clone(),
            current: Mutex::new(None),
        }
    }

    /// Stores the identity and token, marking the session authenticated.
    /// A previous session is replaced wholesale.
    pub fn login(&self, identity: Identity, token: String) {
        let mut current = self.current.lock();

        write_json(&*self.storage, USER_KEY, &identity);

        if let Err(e) = self.storage.write(TOKEN_KEY, &token) {
            log::warn!("failed to persist session token: {e}");
        }

        *current = Some(Session { identity, token });
    }

    /// Clears the identity, token, and authenticated state.
    pub fn logout(&self) {
        let mut current = self.current.lock();

        for key in [USER_KEY, TOKEN_KEY] {
            if let Err(e) = self.storage.remove(key) {
                log::warn!("failed to clear {key} from storage: {e}");
            }
        }

        *current = None;
    }

    /// Re-establishes the session from storage on process start.
    ///
    /// Returns the restored identity. Absent or corrupt values degrade to the
    /// unauthenticated state, since a cold start is not a failure.
    pub fn restore(&self) -> Option<Identity> {
        let token = match self.storage.read(TOKEN_KEY) {
            Ok(token) => token,
            Err(e) => {
                log::warn!("failed to read session token: {e}");
                None
            }
        };

        let identity: Option<Identity> = read_json(&*self.storage, USER_KEY);

        let session = match (identity, token) {
            (Some(identity), Some(token)) => Session { identity, token },
            _ => return None,
        };

        let identity = session.identity.clone();
        *self.current.lock() = Some(session);

        Some(identity)
    }

    pub fn identity(&self) -> Option<Identity> {
        self.current.lock().as_ref().map(|s| s.identity.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.current.lock().as_ref().map(|s| s.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.lock().is_some()
    }
}
