//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a tracked value is read,
//! the runtime registers the current computation as a dependent.
//!
//! # Implementation
//!
//! We use a thread-local stack. Running an effect pushes its subscriber onto
//! the stack; the returned guard pops it again when dropped, so the previous
//! computation is restored even if the body panics. Nested runs (an effect
//! reading a computed that has to recompute) simply push another entry.
//!
//! An entry may also carry no subscriber at all. That is how
//! [`untracked`] suspends tracking for a closure without losing the
//! enclosing computation.

use std::cell::RefCell;

use super::SubscriberId;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Option<SubscriberId>>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// While this context is active, any tracked read registers the
    /// subscriber as a dependent. The context is exited when the returned
    /// guard is dropped.
    pub fn enter(subscriber_id: SubscriberId) -> Self {
        Self::push(Some(subscriber_id))
    }

    /// Enter a context in which reads are not tracked.
    pub fn pause() -> Self {
        Self::push(None)
    }

    fn push(subscriber_id: Option<SubscriberId>) -> Self {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(subscriber_id));
        Self { subscriber_id }
    }

    /// Check if a tracking computation is currently active.
    pub fn is_active() -> bool {
        Self::current_subscriber().is_some()
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().copied().flatten())
    }

    /// Whether `subscriber_id` is anywhere on the stack, i.e. currently running
    /// either directly or as the parent of a nested run.
    pub fn is_running(subscriber_id: SubscriberId) -> bool {
        CONTEXT_STACK.with(|stack| stack.borrow().contains(&Some(subscriber_id)))
    }

    /// Current nesting depth.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Catches guards dropped out of order.
            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry, self.subscriber_id,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.subscriber_id, entry
                );
            }
        });
    }
}

/// Run `f` without tracking any of the reads it performs.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::pause();
    f()
}
