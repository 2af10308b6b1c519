use crate::budget::QueryBudget;
use crate::oracle::KillProver;
use indexmap::IndexSet;
use killflow_core::analysis::objects::is_alloca_in;
use killflow_core::analysis::{underlying_object, underlying_objects};
use killflow_core::{InstId, Program, Value};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Which side of a program point a kill must happen on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KillDirection {
    /// Overwritten on every path reaching the point.
    Before,
    /// Overwritten on every path leaving the point.
    After,
}

/// The chain of call sites through which an instruction is observed, innermost first.
///
/// The root context is empty. Contexts are immutable and share their outer frames, so descending
/// into a callee costs one allocation. Equality and hashing are structural.
#[derive(Clone, Default)]
pub struct Context(Option<Rc<Frame>>);

struct Frame {
    call: InstId,
    parent: Context,
}

impl Drop for Frame {
    fn drop(&mut self) {
        // Unlink uniquely owned ancestors one at a time so long chains never recurse.
        let mut next = self.parent.0.take();
        while let Some(frame) = next {
            match Rc::try_unwrap(frame) {
                Ok(mut frame) => next = frame.parent.0.take(),
                Err(_) => break,
            }
        }
    }
}

impl Context {
    pub fn root() -> Self {
        Self(None)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_none()
    }

    /// The context of the callee entered through `call`.
    pub fn sub_context(&self, call: InstId) -> Self {
        Self(Some(Rc::new(Frame {
            call,
            parent: self.clone(),
        })))
    }

    pub fn innermost_call(&self) -> Option<InstId> {
        self.0.as_ref().map(|frame| frame.call)
    }

    pub fn parent(&self) -> Option<&Context> {
        self.0.as_ref().map(|frame| &frame.parent)
    }

    /// Call sites from the innermost outwards.
    pub fn calls(&self) -> impl Iterator<Item = InstId> + '_ {
        std::iter::successors(self.0.as_deref(), |frame| frame.parent.0.as_deref())
            .map(|frame| frame.call)
    }

    pub fn depth(&self) -> usize {
        self.calls().count()
    }

    /// Whether `self` is the outer part of `other`: `other` extends `self` with zero or more
    /// inner frames.
    pub fn is_suffix_of(&self, other: &Context) -> bool {
        let (mine, theirs) = (self.depth(), other.depth());
        if mine > theirs {
            return false;
        }
        let mut other = other;
        for _ in mine..theirs {
            match other.parent() {
                Some(parent) => other = parent,
                None => return false,
            }
        }
        self == other
    }

    /// Observations made in one context apply to the other.
    pub fn matches(&self, other: &Context) -> bool {
        self.is_suffix_of(other) || other.is_suffix_of(self)
    }

    /// The instruction of the outermost function that leads to `inst` executing.
    pub fn toplevel_inst(&self, inst: InstId) -> InstId {
        self.calls().last().unwrap_or(inst)
    }

    pub fn display<'a>(&'a self, program: &'a Program) -> ContextDisplay<'a> {
        ContextDisplay {
            context: self,
            program,
        }
    }

    /// Whether `ptr`, observed at `loc` under this context, is provably dead on the `direction`
    /// side of `loc` from the viewpoint of every enclosing frame.
    ///
    /// Walks outwards frame by frame. A frame proves the kill when the pointer or its object is
    /// a stack slot of the frame's function, or when the prover shows it overwritten within that
    /// function. The root proves nothing: its function owns the loop, so its slots and memory
    /// persist across iterations. When `ptr_is_local` holds, formal parameters are renamed to
    /// the actual arguments of each call site on the way out.
    pub fn kills<'p>(
        &self,
        kill: &mut dyn KillProver<'p>,
        ptr: Value,
        loc: InstId,
        direction: KillDirection,
        ptr_is_local: bool,
        budget: &QueryBudget,
    ) -> bool {
        let program = kill.program();
        let mut ptr = ptr;
        let mut object = underlying_object(program, ptr);
        let mut loc = loc;
        let mut context = self;

        loop {
            let Some(frame) = context.0.as_deref() else {
                return false;
            };
            let func = program.function_of(loc);
            if is_alloca_in(program, ptr, func) || is_alloca_in(program, object, func) {
                return true;
            }
            if budget.expired() {
                return false;
            }

            let killed = match direction {
                KillDirection::Before => {
                    kill.pointer_killed_before(None, ptr, loc, false, budget)
                        || kill.aggregate_killed_before(None, object, loc, budget)
                }
                KillDirection::After => {
                    kill.pointer_killed_after(None, ptr, loc, false, budget)
                        || kill.aggregate_killed_after(None, object, loc, budget)
                }
            };
            if killed {
                return true;
            }

            if ptr_is_local {
                ptr = actual_argument(program, ptr, frame.call);
                object = actual_argument(program, object, frame.call);
            }
            loc = frame.call;
            context = &frame.parent;
        }
    }

    /// Collects the objects `ptr` may refer to as seen from outside the outermost frame.
    ///
    /// Stack slots of a frame's own function and objects proven killed within a frame are
    /// pruned; surviving parameters are renamed to the caller's actual arguments. Objects that
    /// reach the root are kept untested. Objects already present in `out` are not revisited.
    pub fn underlying_objects<'p>(
        &self,
        kill: &mut dyn KillProver<'p>,
        ptr: Value,
        loc: InstId,
        direction: KillDirection,
        budget: &QueryBudget,
        out: &mut IndexSet<Value>,
    ) {
        let program = kill.program();
        let mut worklist = vec![(ptr, self.clone(), loc)];

        while let Some((ptr, context, loc)) = worklist.pop() {
            let Some(frame) = context.0.as_deref() else {
                out.extend(underlying_objects(program, ptr));
                continue;
            };
            let func = program.function_of(loc);
            for object in underlying_objects(program, ptr) {
                if out.contains(&object) || is_alloca_in(program, object, func) {
                    continue;
                }
                let killed = match direction {
                    KillDirection::Before => kill.aggregate_killed_before(None, object, loc, budget),
                    KillDirection::After => kill.aggregate_killed_after(None, object, loc, budget),
                };
                if killed {
                    continue;
                }
                worklist.push((
                    actual_argument(program, object, frame.call),
                    frame.parent.clone(),
                    frame.call,
                ));
            }
        }
    }
}

/// Renames a formal parameter of the function called by `call` to the argument it receives.
fn actual_argument(program: &Program, value: Value, call: InstId) -> Value {
    match value {
        Value::Param(func, index) if program.callee(call) == Some(func) => program
            .call_args(call)
            .get(index as usize)
            .copied()
            .unwrap_or(Value::Undef),
        _ => value,
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        let (mut a, mut b) = (self, other);
        loop {
            match (a.0.as_ref(), b.0.as_ref()) {
                (None, None) => return true,
                (Some(x), Some(y)) if Rc::ptr_eq(x, y) => return true,
                (Some(x), Some(y)) if x.call == y.call => {
                    a = &x.parent;
                    b = &y.parent;
                }
                _ => return false,
            }
        }
    }
}

impl Eq for Context {}

impl Hash for Context {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for call in self.calls() {
            call.hash(state);
        }
        self.depth().hash(state);
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut calls: Vec<InstId> = self.calls().collect();
        calls.reverse();
        f.debug_tuple("Context").field(&calls).finish()
    }
}

/// Renders a context as the functions entered, outermost first: `>>f>>g`.
pub struct ContextDisplay<'a> {
    context: &'a Context,
    program: &'a Program,
}

impl fmt::Display for ContextDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut calls: Vec<InstId> = self.context.calls().collect();
        calls.reverse();
        for call in calls {
            match self.program.callee(call) {
                Some(func) => write!(f, ">>{}", self.program.function(func).name)?,
                None => write!(f, ">>{}", self.program.inst_label(call))?,
            }
        }
        Ok(())
    }
}
