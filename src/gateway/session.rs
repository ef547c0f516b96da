//! Local auth provider with an in-memory session and change subscriptions.

use super::{AuthProvider, Session, SessionCallback, SessionSubscription, StoreResult};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};
use tracing::debug;

/// In-memory [`AuthProvider`] for development and tests.
///
/// Holds at most one active session. Every sign-in and sign-out notifies
/// all live subscribers with the new session state.
#[derive(Clone)]
pub struct LocalAuth {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    session: RwLock<Option<Session>>,
    subscribers: Mutex<HashMap<u64, SessionCallback>>,
    next_subscriber: AtomicU64,
}

impl LocalAuth {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(AuthInner {
                session: RwLock::new(None),
                subscribers: Mutex::new(HashMap::new()),
                next_subscriber: AtomicU64::new(0),
            }),
        }
    }

    /// Activate a session for `user_id` and notify subscribers.
    pub fn sign_in(&self, user_id: impl Into<String>) {
        let session = Session {
            user_id: user_id.into(),
        };
        debug!(user_id = %session.user_id, "session started");
        *self
            .inner
            .session
            .write()
            .expect("session slot poisoned") = Some(session);
        self.inner.notify();
    }
}

impl Default for LocalAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthInner {
    fn notify(&self) {
        let session = self
            .session
            .read()
            .expect("session slot poisoned")
            .clone();
        let subscribers = self
            .subscribers
            .lock()
            .expect("subscriber registry poisoned");
        for callback in subscribers.values() {
            callback(session.as_ref());
        }
    }
}

#[async_trait]
impl AuthProvider for LocalAuth {
    async fn current_session(&self) -> StoreResult<Option<Session>> {
        Ok(self
            .inner
            .session
            .read()
            .expect("session slot poisoned")
            .clone())
    }

    fn subscribe(&self, callback: SessionCallback) -> SessionSubscription {
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .expect("subscriber registry poisoned")
            .insert(id, callback);

        let inner = Arc::clone(&self.inner);
        SessionSubscription::new(move || {
            inner
                .subscribers
                .lock()
                .expect("subscriber registry poisoned")
                .remove(&id);
        })
    }

    async fn sign_out(&self) -> StoreResult<()> {
        debug!("session ended");
        *self
            .inner
            .session
            .write()
            .expect("session slot poisoned") = None;
        self.inner.notify();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_every_session_change() {
        let auth = LocalAuth::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let subscription = auth.subscribe(Box::new(move |session| {
            sink.lock()
                .unwrap()
                .push(session.map(|s| s.user_id.clone()));
        }));

        auth.sign_in("u1");
        assert_eq!(
            auth.current_session().await.unwrap(),
            Some(Session {
                user_id: "u1".into()
            })
        );
        auth.sign_out().await.unwrap();
        assert_eq!(auth.current_session().await.unwrap(), None);

        subscription.unsubscribe();
        auth.sign_in("u2");

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![Some("u1".to_string()), None]);
    }

    #[tokio::test]
    async fn dropping_the_handle_detaches_the_callback() {
        let auth = LocalAuth::new();
        let seen = Arc::new(Mutex::new(0usize));

        let sink = Arc::clone(&seen);
        {
            let _subscription = auth.subscribe(Box::new(move |_| {
                *sink.lock().unwrap() += 1;
            }));
            auth.sign_in("u1");
        }
        auth.sign_out().await.unwrap();

        assert_eq!(*seen.lock().unwrap(), 1);
    }
}
