//! Best-effort destruction of target instances.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::BoxError;

/// Destroy hook attached to a target source.
pub(crate) type DestroyHook<T> = Arc<dyn Fn(&T) -> Result<(), BoxError> + Send + Sync>;

/// Runs the destroy hook on one instance, logging instead of propagating.
///
/// Panics raised by the hook are caught as well. Returns true if the hook
/// completed without error.
pub(crate) fn destroy_quietly<T>(component: &str, hook: &DestroyHook<T>, instance: &T) -> bool
where
    T: ?Sized,
{
    match panic::catch_unwind(AssertUnwindSafe(|| hook(instance))) {
        Ok(Ok(())) => {
            tracing::debug!(component, "destroyed target instance");
            true
        }
        Ok(Err(error)) => {
            tracing::warn!(component, %error, "destroy hook failed; continuing disposal");
            false
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            tracing::warn!(component, panic = %message, "destroy hook panicked; continuing disposal");
            false
        }
    }
}

/// Destroys every instance, in order, and returns how many hooks failed.
pub(crate) fn destroy_all<T, I>(component: &str, hook: Option<&DestroyHook<T>>, instances: I) -> usize
where
    I: IntoIterator<Item = Arc<T>>,
{
    let mut failures = 0;
    for instance in instances {
        if let Some(hook) = hook {
            if !destroy_quietly(component, hook, &*instance) {
                failures += 1;
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn failing_and_panicking_hooks_do_not_stop_the_rest() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let hook: DestroyHook<u32> = Arc::new(move |v: &u32| -> Result<(), BoxError> {
            seen.fetch_add(1, Ordering::SeqCst);
            match *v {
                1 => Err("boom".into()),
                2 => panic!("hook panicked"),
                _ => Ok(()),
            }
        });

        let failures = destroy_all("numbers", Some(&hook), vec![Arc::new(0), Arc::new(1), Arc::new(2), Arc::new(3)]);

        assert_eq!(failures, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn missing_hook_is_a_no_op() {
        let failures = destroy_all::<u32, _>("numbers", None, vec![Arc::new(1)]);
        assert_eq!(failures, 0);
    }
}
