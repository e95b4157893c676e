//! Explicit session context over an identity provider.
//!
//! # Responsibility
//! - Hold the current signed-in identity for one process.
//! - Notify subscribers whenever the current identity changes.
//!
//! # Invariants
//! - The cached identity only changes after the provider confirmed the call.
//! - Subscribers are notified once per change, in subscription order.
//! - `sign_out` clears the cached identity even when it was already empty.

use crate::identity::{AuthResult, IdentityProvider};
use crate::model::user::{ProfileFields, UserIdentity};
use crate::service::ServiceError;
use log::debug;

/// Handle returned by [`Session::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(Option<&UserIdentity>)>;

/// Session state owned by the caller and passed to handlers explicitly.
pub struct Session<P: IdentityProvider> {
    provider: P,
    current: Option<UserIdentity>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl<P: IdentityProvider> Session<P> {
    /// Loads the provider's current identity.
    pub fn init(provider: P) -> AuthResult<Self> {
        let current = provider.current_user()?;
        debug!(
            "event=session_init module=session status=ok signed_in={}",
            current.is_some()
        );
        Ok(Self {
            provider,
            current,
            listeners: Vec::new(),
            next_subscription: 0,
        })
    }

    pub fn current_user(&self) -> Option<&UserIdentity> {
        self.current.as_ref()
    }

    /// Returns the signed-in identity or `ServiceError::NotSignedIn`.
    pub fn require_user(&self) -> Result<&UserIdentity, ServiceError> {
        self.current.as_ref().ok_or(ServiceError::NotSignedIn)
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Registers a listener invoked on every identity change.
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(Option<&UserIdentity>) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` when `id` was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        profile: &ProfileFields,
    ) -> AuthResult<UserIdentity> {
        let identity = self.provider.sign_up(email, password, profile)?;
        self.set_current(Some(identity.clone()));
        Ok(identity)
    }

    pub fn sign_in(&mut self, email: &str, password: &str) -> AuthResult<UserIdentity> {
        let identity = self.provider.sign_in(email, password)?;
        self.set_current(Some(identity.clone()));
        Ok(identity)
    }

    /// Signs out through the provider, clears the cache and notifies.
    pub fn sign_out(&mut self) -> AuthResult<()> {
        self.provider.sign_out()?;
        self.set_current(None);
        Ok(())
    }

    /// Re-reads the provider's identity, notifying on change.
    pub fn refresh(&mut self) -> AuthResult<()> {
        let current = self.provider.current_user()?;
        self.set_current(current);
        Ok(())
    }

    fn set_current(&mut self, next: Option<UserIdentity>) {
        if self.current == next {
            return;
        }
        self.current = next;
        for (_, listener) in &mut self.listeners {
            listener(self.current.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Session;
    use crate::identity::{AuthError, AuthResult, IdentityProvider};
    use crate::model::user::{ProfileFields, UserId, UserIdentity, UserProfile};
    use std::cell::RefCell;
    use std::rc::Rc;
    use uuid::Uuid;

    struct StubProvider {
        identity: UserIdentity,
        signed_in: RefCell<bool>,
    }

    impl StubProvider {
        fn new(signed_in: bool) -> Self {
            Self {
                identity: UserIdentity {
                    uid: Uuid::new_v4(),
                    email: "ada@example.com".to_string(),
                    display_name: "Ada".to_string(),
                },
                signed_in: RefCell::new(signed_in),
            }
        }
    }

    impl IdentityProvider for StubProvider {
        fn current_user(&self) -> AuthResult<Option<UserIdentity>> {
            let signed_in = *self.signed_in.borrow();
            Ok(signed_in.then(|| self.identity.clone()))
        }

        fn sign_up(&self, _: &str, _: &str, _: &ProfileFields) -> AuthResult<UserIdentity> {
            Err(AuthError::EmailAlreadyInUse)
        }

        fn sign_in(&self, _: &str, password: &str) -> AuthResult<UserIdentity> {
            if password != "secret1" {
                return Err(AuthError::InvalidCredentials);
            }
            *self.signed_in.borrow_mut() = true;
            Ok(self.identity.clone())
        }

        fn sign_out(&self) -> AuthResult<()> {
            *self.signed_in.borrow_mut() = false;
            Ok(())
        }

        fn send_password_reset(&self, _: &str) -> AuthResult<()> {
            Ok(())
        }

        fn profile(&self, _: UserId) -> AuthResult<Option<UserProfile>> {
            Ok(None)
        }
    }

    #[test]
    fn init_picks_up_existing_session() {
        let session = Session::init(StubProvider::new(true)).unwrap();
        assert_eq!(
            session.current_user().map(|u| u.display_name.as_str()),
            Some("Ada")
        );
    }

    #[test]
    fn listeners_see_sign_in_and_sign_out_once_each() {
        let mut session = Session::init(StubProvider::new(false)).unwrap();
        let seen: Rc<RefCell<Vec<bool>>> = Rc::default();
        let sink = Rc::clone(&seen);
        session.subscribe(move |user| sink.borrow_mut().push(user.is_some()));

        session.sign_in("ada@example.com", "secret1").unwrap();
        session.refresh().unwrap();
        session.sign_out().unwrap();
        session.sign_out().unwrap();

        assert_eq!(*seen.borrow(), vec![true, false]);
        assert!(session.require_user().is_err());
    }

    #[test]
    fn failed_sign_in_leaves_state_untouched() {
        let mut session = Session::init(StubProvider::new(false)).unwrap();
        let calls = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&calls);
        session.subscribe(move |_| *sink.borrow_mut() += 1);

        let err = session.sign_in("ada@example.com", "wrong").unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(session.current_user().is_none());
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn unsubscribed_listener_is_not_called() {
        let mut session = Session::init(StubProvider::new(false)).unwrap();
        let calls = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&calls);
        let id = session.subscribe(move |_| *sink.borrow_mut() += 1);

        assert!(session.unsubscribe(id));
        assert!(!session.unsubscribe(id));
        session.sign_in("ada@example.com", "secret1").unwrap();
        assert_eq!(*calls.borrow(), 0);
    }
}
