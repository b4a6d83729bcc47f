use super::{Context, ContextInner};
use std::sync::{Arc, Mutex};

/// A free list of request contexts.
///
/// Acquiring pops a cleared context (or allocates a fresh one) and pre-sizes
/// its parameter buffer; releasing clears every field and returns the
/// context to the list. A context still shared with a background task is
/// dropped instead of recycled, so a pooled context is never aliased.
pub(crate) struct ContextPool {
    free: Mutex<Vec<Arc<ContextInner>>>,
}

impl ContextPool {
    pub(crate) fn new() -> ContextPool {
        ContextPool {
            free: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn acquire(&self, max_params: usize) -> Context {
        let inner = self
            .free
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Arc::new(ContextInner::new()));
        let ctx = Context::from_inner(inner);
        ctx.reserve_params(max_params);
        ctx
    }

    pub(crate) fn release(&self, ctx: Context) {
        let inner = ctx.inner().clone();
        drop(ctx);
        if Arc::strong_count(&inner) == 1 {
            inner.clear();
            self.free.lock().unwrap().push(inner);
        }
    }
}
