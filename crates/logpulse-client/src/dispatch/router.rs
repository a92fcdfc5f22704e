use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use dashmap::DashMap;

use logpulse_core::error::Result;
use logpulse_core::protocol::{Envelope, MessageKind};

/// Callback registered for one message kind.
pub type Handler = Arc<dyn Fn(&Envelope) -> Result<()> + Send + Sync>;

/// Wrap a closure as a `Handler`.
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Envelope) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Handler identity is the allocation, not the vtable.
pub fn same_handler(a: &Handler, b: &Handler) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// What a single dispatch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOutcome {
    /// Handlers invoked.
    pub invoked: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

/// Registry and dispatcher: message kind -> ordered handler list.
///
/// Registering the same handler twice means it runs twice. Dispatch works on
/// a snapshot of the list, so handlers may register/unregister (themselves
/// included) while a dispatch is in flight; the change applies from the next
/// dispatch on.
#[derive(Default)]
pub struct MessageRouter {
    handlers: DashMap<MessageKind, Vec<Handler>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    pub fn register(&self, kind: MessageKind, handler: Handler) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Remove the first registration of `handler` for `kind`; no-op if absent.
    pub fn unregister(&self, kind: &MessageKind, handler: &Handler) {
        if let Some(mut list) = self.handlers.get_mut(kind) {
            if let Some(pos) = list.iter().position(|h| same_handler(h, handler)) {
                list.remove(pos);
            }
        }
        self.handlers.remove_if(kind, |_, list| list.is_empty());
    }

    pub fn handler_count(&self, kind: &MessageKind) -> usize {
        self.handlers.get(kind).map(|l| l.len()).unwrap_or(0)
    }

    pub fn registered_kinds(&self) -> Vec<MessageKind> {
        self.handlers.iter().map(|e| e.key().clone()).collect()
    }

    /// Invoke every handler for `env.kind` in registration order.
    ///
    /// Unknown kinds are not an error. A failing or panicking handler is
    /// logged and the remaining handlers still run.
    pub fn dispatch(&self, env: &Envelope) -> DispatchOutcome {
        let snapshot: Vec<Handler> = match self.handlers.get(&env.kind) {
            Some(list) => list.value().clone(),
            None => {
                tracing::debug!(kind = %env.kind, "no handlers registered, message dropped");
                return DispatchOutcome::default();
            }
        };

        let mut outcome = DispatchOutcome::default();
        for h in snapshot {
            outcome.invoked += 1;
            match catch_unwind(AssertUnwindSafe(|| h(env))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    outcome.failed += 1;
                    tracing::warn!(kind = %env.kind, code = e.code().as_str(), error = %e, "message handler failed");
                }
                Err(_) => {
                    outcome.failed += 1;
                    tracing::error!(kind = %env.kind, "message handler panicked");
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use logpulse_core::error::PulseError;
    use logpulse_core::protocol::OutboundMessage;

    fn alert() -> Envelope {
        OutboundMessage::new(MessageKind::Alert).content("cpu").into_envelope()
    }

    #[test]
    fn failing_handler_does_not_stop_the_next_one() {
        let router = MessageRouter::new();
        let seen = Arc::new(AtomicUsize::new(0));

        router.register(
            MessageKind::Alert,
            handler(|_| Err(PulseError::Handler("boom".into()))),
        );
        let s = Arc::clone(&seen);
        router.register(
            MessageKind::Alert,
            handler(move |env| {
                assert_eq!(env.content, "cpu");
                s.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        let out = router.dispatch(&alert());
        assert_eq!(out, DispatchOutcome { invoked: 2, failed: 1 });
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_handler_is_isolated() {
        let router = MessageRouter::new();
        let seen = Arc::new(AtomicUsize::new(0));
        router.register(MessageKind::Alert, handler(|_| panic!("handler bug")));
        let s = Arc::clone(&seen);
        router.register(
            MessageKind::Alert,
            handler(move |_| {
                s.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        let out = router.dispatch(&alert());
        assert_eq!(out.failed, 1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_kind_is_a_no_op() {
        let router = MessageRouter::new();
        router.register(MessageKind::Log, handler(|_| Ok(())));

        let env = OutboundMessage::new("NEVER_SEEN").into_envelope();
        let out = router.dispatch(&env);

        assert_eq!(out, DispatchOutcome::default());
        assert_eq!(router.registered_kinds(), vec![MessageKind::Log]);
        assert_eq!(router.handler_count(&MessageKind::Unknown("NEVER_SEEN".into())), 0);
    }

    #[test]
    fn duplicate_registration_runs_twice_and_unregister_removes_one() {
        let router = MessageRouter::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&seen);
        let h = handler(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        router.register(MessageKind::Alert, Arc::clone(&h));
        router.register(MessageKind::Alert, Arc::clone(&h));
        router.dispatch(&alert());
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        router.unregister(&MessageKind::Alert, &h);
        assert_eq!(router.handler_count(&MessageKind::Alert), 1);
        router.unregister(&MessageKind::Alert, &h);
        router.unregister(&MessageKind::Alert, &h);
        assert_eq!(router.handler_count(&MessageKind::Alert), 0);
        assert!(router.registered_kinds().is_empty());
    }

    #[test]
    fn unregister_during_dispatch_applies_to_next_dispatch() {
        let router = Arc::new(MessageRouter::new());
        let seen = Arc::new(AtomicUsize::new(0));

        let s = Arc::clone(&seen);
        let counting = handler(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let r = Arc::clone(&router);
        let victim = Arc::clone(&counting);
        router.register(
            MessageKind::Alert,
            handler(move |_| {
                r.unregister(&MessageKind::Alert, &victim);
                Ok(())
            }),
        );
        router.register(MessageKind::Alert, Arc::clone(&counting));

        // The in-flight pass works on its snapshot.
        router.dispatch(&alert());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        router.dispatch(&alert());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(router.handler_count(&MessageKind::Alert), 1);
    }
}
