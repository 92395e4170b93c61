//! Operation outcomes.
//!
//! Every caller-facing operation yields exactly one [`Outcome`]: a value on
//! success, or a [`Rejection`] carrying a short reason meant to be shown to
//! the player. Callers that prefer a callback sink implement [`Promise`] and
//! hand it to [`Resolve::resolve`]; the sink is consumed, so it can fire once.

use tokio::sync::oneshot;

/// A business-rule refusal with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    reason: String,
}

impl Rejection {
    /// Create a rejection with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The reason shown to the player.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// The named network does not exist.
    pub fn network_not_found() -> Self {
        Self::new("Network not found")
    }

    /// The actor is not a member of the network.
    pub fn not_member() -> Self {
        Self::new("You are not a member of this network")
    }

    /// The actor lacks the permission for this action.
    pub fn no_permission() -> Self {
        Self::new("You do not have permission to perform this action")
    }

    /// Something the player cannot fix went wrong; details are in the log.
    pub fn unexpected() -> Self {
        Self::new("There was an unexpected error")
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for Rejection {}

/// Result of a caller-facing operation.
pub type Outcome<T = ()> = std::result::Result<T, Rejection>;

/// Shorthand for an early `Err(Rejection::new(reason))`.
pub fn reject<T>(reason: impl Into<String>) -> Outcome<T> {
    Err(Rejection::new(reason))
}

/// A one-shot sink for an operation's outcome.
pub trait Promise<T> {
    /// The operation succeeded.
    fn success(self, value: T);

    /// The operation was refused.
    fn fail(self, rejection: Rejection);
}

/// Deliver an outcome into a [`Promise`].
pub trait Resolve<T> {
    /// Call exactly one of `success` or `fail`.
    fn resolve<P: Promise<T>>(self, promise: P);
}

impl<T> Resolve<T> for Outcome<T> {
    fn resolve<P: Promise<T>>(self, promise: P) {
        match self {
            Ok(value) => promise.success(value),
            Err(rejection) => promise.fail(rejection),
        }
    }
}

impl<T> Promise<T> for oneshot::Sender<Outcome<T>> {
    fn success(self, value: T) {
        if self.send(Ok(value)).is_err() {
            tracing::debug!("Outcome receiver dropped before success was delivered");
        }
    }

    fn fail(self, rejection: Rejection) {
        if let Err(Err(rejection)) = self.send(Err(rejection)) {
            tracing::debug!("Outcome receiver dropped before failure was delivered: {}", rejection);
        }
    }
}

/// A promise built from a pair of closures.
pub struct Callbacks<S, F> {
    on_success: S,
    on_fail: F,
}

/// Build a [`Promise`] from success and failure closures.
pub fn callbacks<T, S, F>(on_success: S, on_fail: F) -> Callbacks<S, F>
where
    S: FnOnce(T),
    F: FnOnce(Rejection),
{
    Callbacks {
        on_success,
        on_fail,
    }
}

impl<T, S, F> Promise<T> for Callbacks<S, F>
where
    S: FnOnce(T),
    F: FnOnce(Rejection),
{
    fn success(self, value: T) {
        (self.on_success)(value);
    }

    fn fail(self, rejection: Rejection) {
        (self.on_fail)(rejection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn callbacks_fire_once() {
        let seen = RefCell::new(Vec::new());

        let ok: Outcome<u32> = Ok(3);
        ok.resolve(callbacks(
            |v: u32| seen.borrow_mut().push(format!("ok {v}")),
            |r| seen.borrow_mut().push(format!("fail {r}")),
        ));

        let refused: Outcome<u32> = reject("nope");
        refused.resolve(callbacks(
            |v: u32| seen.borrow_mut().push(format!("ok {v}")),
            |r| seen.borrow_mut().push(format!("fail {r}")),
        ));

        assert_eq!(seen.into_inner(), vec!["ok 3", "fail nope"]);
    }

    #[test]
    fn oneshot_sender_is_a_promise() {
        let (tx, mut rx) = oneshot::channel::<Outcome<()>>();
        Outcome::<()>::Err(Rejection::network_not_found()).resolve(tx);

        let delivered = rx.try_recv().unwrap();
        assert_eq!(delivered.unwrap_err().reason(), "Network not found");
    }

    #[test]
    fn dropped_receiver_is_harmless() {
        let (tx, rx) = oneshot::channel::<Outcome<u8>>();
        drop(rx);
        Outcome::Ok(1u8).resolve(tx);
    }
}
