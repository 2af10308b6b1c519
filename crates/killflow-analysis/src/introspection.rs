use crate::config::WatchFilter;
use killflow_core::{InstId, InstKind, Program};

/// Logs a combinator step at `info` while a watched query runs, at `trace` otherwise.
macro_rules! narrate {
    ($introspection:expr, $($arg:tt)+) => {
        if $introspection.is_active() {
            tracing::info!($($arg)+)
        } else {
            tracing::trace!($($arg)+)
        }
    };
}

pub(crate) use narrate;

/// Tracks whether the current query matches the configured watch filter.
#[derive(Debug, Clone, Default)]
pub struct Introspection {
    filter: Option<WatchFilter>,
    depth: usize,
}

impl Introspection {
    pub fn new(filter: Option<WatchFilter>) -> Self {
        Self { filter, depth: 0 }
    }

    pub fn filter(&self) -> Option<&WatchFilter> {
        self.filter.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.depth > 0
    }

    /// Whether a query of `i1` against `i2` is one the user asked to watch.
    pub fn matches(&self, program: &Program, i1: InstId, i2: InstId) -> bool {
        match &self.filter {
            None => false,
            Some(WatchFilter::CallsitePair { first, second }) => {
                callee_named(program, i1, first) && callee_named(program, i2, second)
            }
            Some(WatchFilter::CallsiteToStore { callee, store_ptr }) => {
                callee_named(program, i1, callee) && store_through(program, i2, store_ptr)
            }
            Some(WatchFilter::StoreToCallsite { store_ptr, callee }) => {
                store_through(program, i1, store_ptr) && callee_named(program, i2, callee)
            }
        }
    }

    /// Opens a watched region if the query matches. Returns whether one was opened, to be
    /// handed back to [`Introspection::exit`].
    pub fn enter(&mut self, program: &Program, i1: InstId, i2: InstId) -> bool {
        let watched = self.matches(program, i1, i2);
        if watched {
            self.depth += 1;
        }
        watched
    }

    pub fn exit(&mut self, entered: bool) {
        if entered {
            self.depth = self.depth.saturating_sub(1);
        }
    }
}

fn callee_named(program: &Program, inst: InstId, name: &str) -> bool {
    program
        .callee(inst)
        .map_or(false, |f| program.function(f).name == name)
}

fn store_through(program: &Program, inst: InstId, name: &str) -> bool {
    match program.kind(inst) {
        InstKind::Store { ptr, .. } => {
            let ptr_name = program.value_name(*ptr);
            ptr_name.trim_start_matches(['%', '@']) == name.trim_start_matches(['%', '@'])
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use killflow_core::{FunctionAttrs, ProgramBuilder, Value};

    #[test]
    fn test_watch_filters() {
        let mut builder = ProgramBuilder::new();
        let out = builder.global("out", None, false).unwrap();
        builder.declare("produce", &[], FunctionAttrs::default()).unwrap();
        builder.declare("consume", &[], FunctionAttrs::default()).unwrap();
        let mut func = builder.define("f", &[]).unwrap();
        func.block("entry");
        let produce = func.callee("produce");
        let consume = func.callee("consume");
        let first = func.call(produce, vec![]).as_inst().unwrap();
        let second = func.call(consume, vec![]).as_inst().unwrap();
        let store = func.store(Value::Const(0), out);
        func.ret(None);
        let program = builder.finish().unwrap();

        let pair = Introspection::new(Some(WatchFilter::CallsitePair {
            first: "produce".to_string(),
            second: "consume".to_string(),
        }));
        assert!(pair.matches(&program, first, second));
        assert!(!pair.matches(&program, second, first));

        let to_store = Introspection::new(Some(WatchFilter::CallsiteToStore {
            callee: "produce".to_string(),
            store_ptr: "@out".to_string(),
        }));
        assert!(to_store.matches(&program, first, store));
        assert!(!to_store.matches(&program, store, first));

        let from_store = Introspection::new(Some(WatchFilter::StoreToCallsite {
            store_ptr: "out".to_string(),
            callee: "consume".to_string(),
        }));
        assert!(from_store.matches(&program, store, second));

        assert!(!Introspection::default().matches(&program, first, second));
    }

    #[test]
    fn test_regions_nest() {
        let mut builder = ProgramBuilder::new();
        builder.declare("a", &[], FunctionAttrs::default()).unwrap();
        let mut func = builder.define("f", &[]).unwrap();
        func.block("entry");
        let a = func.callee("a");
        let call = func.call(a, vec![]).as_inst().unwrap();
        func.ret(None);
        let program = builder.finish().unwrap();

        let mut introspection = Introspection::new(Some(WatchFilter::CallsitePair {
            first: "a".to_string(),
            second: "a".to_string(),
        }));
        let outer = introspection.enter(&program, call, call);
        let inner = introspection.enter(&program, call, call);
        assert!(outer && inner);
        introspection.exit(inner);
        assert!(introspection.is_active());
        introspection.exit(outer);
        assert!(!introspection.is_active());
    }
}
