use killflow_analysis::{
    resolve_loop, AliasOracle, AnalysisConfig, CallsiteDepthCombinator, KillFlow, KillProver,
    ModRefResult, QueryBudget, TemporalRelation,
};
use killflow_core::{InstId, Program, ProgramAnalyses, Value};
use killflow_parser::parse_program;
use std::time::Duration;

struct Fixture {
    program: Program,
    analyses: ProgramAnalyses,
}

impl Fixture {
    fn new(source: &str) -> Self {
        let program = parse_program(source).expect("fixture parses");
        let analyses = ProgramAnalyses::build(&program);
        Self { program, analyses }
    }

    fn inst(&self, function: &str, name: &str) -> InstId {
        let func = self.program.lookup_function(function).unwrap();
        self.program.lookup_inst(func, name).unwrap()
    }

    fn ptr(&self, function: &str, name: &str) -> Value {
        self.program
            .pointer_operand(self.inst(function, name))
            .unwrap()
    }

    fn kill_flow(&self) -> KillFlow<'_> {
        KillFlow::with_basic_oracle(&self.program, &self.analyses, AnalysisConfig::default())
    }
}

const STORE_THEN_LOAD: &str = r"
define @work(%q) {
entry:
  store 1, %q
  ret
}

define @main(%p) {
entry:
  jump header
header:
  %i = phi [0, entry], [%i.next, header]
  %c = call @work(%p)
  store 0, %p #s0
  %x = load %p
  %i.next = add %i, 1
  %more = icmp slt %i.next, 10
  branch %more, header, exit
exit:
  ret
}
";

#[test]
fn test_store_before_load_in_header_kills() {
    let fx = Fixture::new(STORE_THEN_LOAD);
    let lp = resolve_loop(&fx.program, &fx.analyses, "main", "header").unwrap();
    let (c, x) = (fx.inst("main", "c"), fx.inst("main", "x"));
    let p = fx.ptr("main", "x");
    let budget = QueryBudget::unbounded();

    let mut kill = fx.kill_flow();
    assert!(kill.pointer_killed_between(Some(lp), p, c, x, false, &budget));
    assert!(kill.pointer_killed_before(Some(lp), p, x, false, &budget));
    assert_eq!(
        kill.modref(c, TemporalRelation::Before, x, Some(lp)),
        ModRefResult::NoModRef
    );
    assert!(kill.stats().killed_backward_loads >= 1);

    let mut combinator =
        CallsiteDepthCombinator::with_basic_oracle(&fx.program, &fx.analyses, AnalysisConfig::default());
    let result = combinator.modref(c, TemporalRelation::Before, x, Some(lp));
    assert!(!result.may_mod());
}

const CONDITIONAL_STORE: &str = r"
define @main(%p, %c) {
entry:
  jump header
header:
  %i = phi [0, entry], [%i.next, latch]
  branch %c, then, latch
then:
  store 0, %p #s0
  jump latch
latch:
  %x = load %p
  %i.next = add %i, 1
  %more = icmp slt %i.next, 10
  branch %more, header, exit
exit:
  ret
}
";

#[test]
fn test_conditional_store_does_not_kill() {
    let fx = Fixture::new(CONDITIONAL_STORE);
    let lp = resolve_loop(&fx.program, &fx.analyses, "main", "header").unwrap();
    let main = fx.program.lookup_function("main").unwrap();
    let latch = fx.program.lookup_block(main, "latch").unwrap();
    let (s0, x) = (fx.inst("main", "s0"), fx.inst("main", "x"));
    let p = fx.ptr("main", "x");
    let budget = QueryBudget::unbounded();

    let mut kill = fx.kill_flow();
    assert!(!kill.block_must_kill(latch, p, None, Some(x), Some(lp), &budget));
    assert!(!kill.pointer_killed_before(Some(lp), p, x, true, &budget));
    assert!(!kill.pointer_killed_after(Some(lp), p, s0, true, &budget));

    let mut combinator =
        CallsiteDepthCombinator::with_basic_oracle(&fx.program, &fx.analyses, AnalysisConfig::default());
    let result = combinator.modref(s0, TemporalRelation::Before, x, Some(lp));
    assert!(result.may_mod());
}

#[test]
fn test_expired_budget_answers_not_killed() {
    let fx = Fixture::new(STORE_THEN_LOAD);
    let lp = resolve_loop(&fx.program, &fx.analyses, "main", "header").unwrap();
    let (c, x) = (fx.inst("main", "c"), fx.inst("main", "x"));
    let p = fx.ptr("main", "x");

    let budget = QueryBudget::starting_now(Some(Duration::ZERO));
    std::thread::sleep(Duration::from_millis(2));
    assert!(budget.expired());

    let mut kill = fx.kill_flow();
    assert!(!kill.pointer_killed_before(Some(lp), p, x, false, &budget));
    assert!(!kill.pointer_killed_between(Some(lp), p, c, x, false, &budget));
    assert!(kill.stats().timeouts >= 2);

    // Nothing was cached while out of time, so a fresh budget still proves the kill.
    let fresh = QueryBudget::unbounded();
    assert!(kill.pointer_killed_before(Some(lp), p, x, false, &fresh));
}

const CALLEE_KILLS: &str = r"
global @g

define @set_g() {
entry:
  store 1, @g
  ret
}

define @maybe_set_g(%c) {
entry:
  branch %c, write, done
write:
  store 1, @g
  jump done
done:
  ret
}

define @main(%c) {
entry:
  %a = call @maybe_set_g(%c)
  %x = load @g
  %b = call @set_g()
  %y = load @g
  ret
}
";

#[test]
fn test_callee_summaries() {
    let fx = Fixture::new(CALLEE_KILLS);
    let budget = QueryBudget::unbounded();
    let g = Value::Global(fx.program.global_by_name("g").unwrap());
    let (x, y) = (fx.inst("main", "x"), fx.inst("main", "y"));
    let (a, b) = (fx.inst("main", "a"), fx.inst("main", "b"));

    let mut kill = fx.kill_flow();
    assert!(!kill.inst_must_kill(a, g, &budget));
    assert!(kill.inst_must_kill(b, g, &budget));
    assert!(!kill.pointer_killed_between(None, g, a, x, false, &budget));
    assert!(kill.pointer_killed_before(None, g, y, false, &budget));
    assert!(!kill.pointer_killed_after(None, g, y, false, &budget));
    assert!(kill.pointer_killed_after(None, g, x, false, &budget));

    // Answered from the function summary the second time.
    let hits = kill.stats().fcn_summary_hits;
    assert!(kill.inst_must_kill(b, g, &budget));
    assert!(kill.stats().fcn_summary_hits > hits);
}

const AGGREGATES: &str = r"
global @arr [4]

define @main(%k) {
entry:
  %tmp = alloca
  lifetime.start %tmp
  %t = load %tmp
  memset @arr, 0, 4
  %elt = elementptr @arr, %k
  %v = load %elt
  memset @arr, 0, 2
  %w = load %elt
  ret
}
";

#[test]
fn test_lifetime_and_memset_kills() {
    let fx = Fixture::new(AGGREGATES);
    let budget = QueryBudget::unbounded();
    let (t, v, w) = (fx.inst("main", "t"), fx.inst("main", "v"), fx.inst("main", "w"));
    let tmp = fx.ptr("main", "t");
    let elt = fx.ptr("main", "v");
    let arr = Value::Global(fx.program.global_by_name("arr").unwrap());

    let mut kill = fx.kill_flow();
    assert!(kill.pointer_killed_before(None, tmp, t, false, &budget));

    // The whole array is cleared, but only the object-level check can see it.
    assert!(!kill.pointer_killed_before(None, elt, v, false, &budget));
    assert!(kill.pointer_killed_before(None, elt, v, true, &budget));
    assert!(kill.aggregate_killed_before(None, arr, v, &budget));

    // A short memset between the two loads covers only half of the array.
    assert!(!kill.aggregate_killed_between(None, arr, v, w, &budget));
    assert!(kill.aggregate_killed_after(None, arr, t, &budget));
}

const ARRAY_SWEEP: &str = r"
global @a [8]

define @main(%n, %k) {
entry:
  jump outer
outer:
  %i = phi [0, entry], [%i.next, after]
  %more = icmp slt %i, %n
  branch %more, inner, exit
inner:
  %j = phi [0, outer], [%j.next, body]
  %inner.more = icmp slt %j, 8
  branch %inner.more, body, after
body:
  %slot = elementptr @a, %j
  store 0, %slot #zero
  %j.next = add %j, 1
  jump inner
after:
  %elt = elementptr @a, %k
  %v = load %elt
  %i.next = add %i, 1
  jump outer
exit:
  ret
}
";

#[test]
fn test_inner_loop_overwrites_whole_array() {
    let fx = Fixture::new(ARRAY_SWEEP);
    let outer = resolve_loop(&fx.program, &fx.analyses, "main", "outer").unwrap();
    let v = fx.inst("main", "v");
    let elt = fx.ptr("main", "v");
    let budget = QueryBudget::unbounded();

    let mut kill = fx.kill_flow();
    assert!(kill.pointer_killed_before(Some(outer), elt, v, false, &budget));
    assert_eq!(kill.stats().array_overwrites, 1);
}

#[test]
fn test_partial_sweep_does_not_kill() {
    let fx = Fixture::new(&ARRAY_SWEEP.replace("icmp slt %j, 8", "icmp slt %j, 4"));
    let outer = resolve_loop(&fx.program, &fx.analyses, "main", "outer").unwrap();
    let v = fx.inst("main", "v");
    let elt = fx.ptr("main", "v");
    let budget = QueryBudget::unbounded();

    let mut kill = fx.kill_flow();
    assert!(!kill.pointer_killed_before(Some(outer), elt, v, false, &budget));
    assert_eq!(kill.stats().array_overwrites, 0);
}

#[test]
fn test_sweep_without_loop_bound_is_not_used() {
    let fx = Fixture::new(ARRAY_SWEEP);
    let v = fx.inst("main", "v");
    let elt = fx.ptr("main", "v");
    let budget = QueryBudget::unbounded();

    // Without an enclosing loop the structural check never runs.
    let mut kill = fx.kill_flow();
    assert!(!kill.pointer_killed_before(None, elt, v, false, &budget));
}

#[test]
fn test_invalidate_and_replace_lower_oracle() {
    let fx = Fixture::new(CALLEE_KILLS);
    let budget = QueryBudget::unbounded();
    let g = Value::Global(fx.program.global_by_name("g").unwrap());
    let y = fx.inst("main", "y");

    let mut kill = fx.kill_flow();
    assert!(kill.pointer_killed_before(None, g, y, false, &budget));
    kill.replace_lower_oracle(Box::new(killflow_analysis::BasicAliasOracle::new(&fx.program)));
    assert_eq!(kill.lower_oracle_name(), "basic");
    assert!(kill.pointer_killed_before(None, g, y, false, &budget));
}
