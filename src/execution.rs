//! Execution id tracking for request-scoped log attribution.
//!
//! Request middleware records the id of the invocation being served; every
//! log line produced while it is in flight carries that id. Ids are held per
//! request thread behind a reader-writer lock so that concurrent requests do
//! not see each other's id, while threads outside any request (helpers
//! spawned by user code) still inherit the id when exactly one request is in
//! flight.
//!
//! The lock is independent from the pipeline's batch lock: tagging never
//! contends with log throughput.

use std::{
    collections::HashMap,
    marker::PhantomData,
    thread::{self, ThreadId},
};

use parking_lot::RwLock;

/// Request header carrying the execution id.
pub const EXECUTION_ID_HEADER: &str = "Function-Execution-Id";

#[derive(Debug, Default)]
pub struct ExecutionTagger {
    ids: RwLock<HashMap<ThreadId, String>>,
}

impl ExecutionTagger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` for the calling thread, returning the id it replaces.
    ///
    /// Every `set` must be undone by [`ExecutionTagger::restore`] on the same
    /// thread; an entry left behind by an exited thread would count as in
    /// flight forever. Callers outside this module go through
    /// [`ExecutionTagger::enter`] or [`ExecutionTagger::scoped`].
    fn set(&self, id: &str) -> Option<String> {
        self.ids.write().insert(thread::current().id(), id.to_owned())
    }

    fn clear(&self) {
        self.ids.write().remove(&thread::current().id());
    }

    /// Put back the calling thread's id from before the matching `set`.
    fn restore(&self, previous: Option<String>) {
        match previous {
            Some(id) => {
                self.ids.write().insert(thread::current().id(), id);
            }
            None => self.clear(),
        }
    }

    /// Execution id to attach to a log line produced on the calling thread.
    ///
    /// Returns the calling thread's own id if it is serving a request.
    /// Otherwise returns the id of the only request in flight, or an empty
    /// string when there are none or several.
    pub fn current(&self) -> String {
        let ids = self.ids.read();
        if let Some(id) = ids.get(&thread::current().id()) {
            return id.clone();
        }
        match ids.len() {
            1 => ids.values().next().cloned().unwrap_or_default(),
            _ => String::new(),
        }
    }

    /// Number of requests currently tagged.
    pub fn in_flight(&self) -> usize {
        self.ids.read().len()
    }

    /// Tag the calling thread until the returned guard drops.
    ///
    /// Scopes nest: dropping an inner scope brings back the outer id.
    pub fn enter(&self, id: &str) -> ExecutionScope<'_> {
        let previous = self.set(id);
        ExecutionScope {
            tagger: self,
            previous,
            _not_send: PhantomData,
        }
    }

    /// Run `f` with the calling thread tagged as `id`.
    ///
    /// The tag is removed on every exit path, unwinding included.
    pub fn scoped<R>(&self, id: &str, f: impl FnOnce() -> R) -> R {
        let _scope = self.enter(id);
        f()
    }
}

/// Guard undoing its scope's execution id on drop.
///
/// The guard is `!Send`: it must be dropped on the thread that created it,
/// since ids are keyed by thread.
#[must_use = "the execution id is cleared as soon as the scope is dropped"]
#[derive(Debug)]
pub struct ExecutionScope<'a> {
    tagger: &'a ExecutionTagger,
    previous: Option<String>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ExecutionScope<'_> {
    fn drop(&mut self) {
        self.tagger.restore(self.previous.take());
    }
}

/// Find the execution id header among `headers`, ignoring name case.
pub fn execution_id_from_headers<'h, I>(headers: I) -> Option<&'h str>
where
    I: IntoIterator<Item = (&'h str, &'h str)>,
{
    headers
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(EXECUTION_ID_HEADER))
        .map(|(_, value)| value.trim())
}

/// Request middleware: tag the request's thread for the duration of
/// `handler`.
///
/// A request without the header is tagged with an empty id, which still
/// counts as in flight.
pub fn with_execution<'h, I, R>(
    tagger: &ExecutionTagger,
    headers: I,
    handler: impl FnOnce() -> R,
) -> R
where
    I: IntoIterator<Item = (&'h str, &'h str)>,
{
    let id = execution_id_from_headers(headers).unwrap_or_default();
    tagger.scoped(id, handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use rstest::{fixture, rstest};
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::{Arc, Barrier};

    #[fixture]
    fn tagger() -> ExecutionTagger {
        ExecutionTagger::new()
    }

    #[rstest]
    fn empty_outside_any_request(tagger: ExecutionTagger) {
        assert_eq!(tagger.current(), "");
        assert_eq!(tagger.in_flight(), 0);
    }

    #[rstest]
    fn returns_most_recent_id(tagger: ExecutionTagger) {
        tagger.set("first");
        tagger.set("second");
        assert_eq!(tagger.current(), "second");
        tagger.clear();
        assert_eq!(tagger.current(), "");
    }

    #[rstest]
    fn scope_clears_on_drop(tagger: ExecutionTagger) {
        {
            let _scope = tagger.enter("abc");
            assert_eq!(tagger.current(), "abc");
        }
        assert_eq!(tagger.current(), "");
    }

    #[rstest]
    fn nested_scope_restores_outer_id(tagger: ExecutionTagger) {
        let _outer = tagger.enter("outer");
        tagger.scoped("inner", || assert_eq!(tagger.current(), "inner"));
        assert_eq!(tagger.current(), "outer");
        assert_eq!(tagger.in_flight(), 1);
    }

    #[rstest]
    fn finished_request_thread_leaves_no_entry(tagger: ExecutionTagger) {
        let tagger = Arc::new(tagger);
        {
            let tagger = Arc::clone(&tagger);
            thread::spawn(move || {
                let headers = [("Function-Execution-Id", "finished")];
                with_execution(&tagger, headers, || ());
            })
            .join()
            .expect("request thread panicked");
        }
        assert_eq!(tagger.in_flight(), 0);

        let _scope = tagger.enter("next");
        let seen = {
            let tagger = Arc::clone(&tagger);
            thread::spawn(move || tagger.current())
                .join()
                .expect("helper thread panicked")
        };
        assert_eq!(seen, "next");
    }

    #[rstest]
    fn scope_clears_on_panic(tagger: ExecutionTagger) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            tagger.scoped::<()>("doomed", || panic!("handler failed"));
        }));
        assert!(result.is_err());
        assert_eq!(tagger.current(), "");
        assert_eq!(tagger.in_flight(), 0);
    }

    #[rstest]
    fn helper_thread_inherits_single_request(tagger: ExecutionTagger) {
        let tagger = Arc::new(tagger);
        let _scope = tagger.enter("only");
        let seen = {
            let tagger = Arc::clone(&tagger);
            thread::spawn(move || tagger.current())
                .join()
                .expect("helper thread panicked")
        };
        assert_eq!(seen, "only");
    }

    #[rstest]
    fn concurrent_requests_are_isolated(tagger: ExecutionTagger) {
        let tagger = Arc::new(tagger);
        let barrier = Arc::new(Barrier::new(2));
        let (tx, rx) = bounded(2);

        let handles: Vec<_> = ["req-a", "req-b"]
            .into_iter()
            .map(|id| {
                let tagger = Arc::clone(&tagger);
                let barrier = Arc::clone(&barrier);
                let tx = tx.clone();
                thread::spawn(move || {
                    tagger.scoped(id, || {
                        barrier.wait();
                        let seen = tagger.current();
                        barrier.wait();
                        tx.send((id, seen)).expect("send observation");
                    });
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("request thread panicked");
        }

        let observations: Vec<_> = rx.try_iter().collect();
        assert_eq!(observations.len(), 2);
        for (id, seen) in observations {
            assert_eq!(seen, id);
        }
        assert_eq!(tagger.current(), "");
    }

    #[rstest]
    fn unrelated_thread_sees_nothing_with_several_requests(tagger: ExecutionTagger) {
        let tagger = Arc::new(tagger);
        let barrier = Arc::new(Barrier::new(3));

        let handles: Vec<_> = ["x", "y"]
            .into_iter()
            .map(|id| {
                let tagger = Arc::clone(&tagger);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let _scope = tagger.enter(id);
                    barrier.wait();
                    barrier.wait();
                })
            })
            .collect();

        barrier.wait();
        assert_eq!(tagger.in_flight(), 2);
        assert_eq!(tagger.current(), "");
        barrier.wait();
        for handle in handles {
            handle.join().expect("request thread panicked");
        }
    }

    #[rstest]
    #[case(&[("Function-Execution-Id", "abc")], Some("abc"))]
    #[case(&[("function-execution-id", " xyz ")], Some("xyz"))]
    #[case(&[("Content-Type", "text/plain")], None)]
    fn reads_execution_header(#[case] headers: &[(&str, &str)], #[case] expected: Option<&str>) {
        assert_eq!(execution_id_from_headers(headers.iter().copied()), expected);
    }

    #[rstest]
    fn middleware_tags_request_duration(tagger: ExecutionTagger) {
        let headers = [("Function-Execution-Id", "exec-42")];
        let seen = with_execution(&tagger, headers, || tagger.current());
        assert_eq!(seen, "exec-42");
        assert_eq!(tagger.current(), "");
    }
}
