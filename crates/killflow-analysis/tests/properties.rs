use killflow_analysis::{AnalysisConfig, Context, KillFlow, KillProver, QueryBudget};
use killflow_core::{
    BlockId, FunctionAttrs, FunctionBuilder, InstId, InstKind, Program, ProgramAnalyses,
    ProgramBuilder, Value,
};
use proptest::prelude::*;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Nothing,
    StoreG,
    StoreH,
    CallSetG,
    CallMaybeSetG,
}

impl Op {
    fn kills_g(self) -> bool {
        matches!(self, Op::StoreG | Op::CallSetG)
    }
}

#[derive(Debug, Clone, Copy)]
enum Segment {
    Straight(Op),
    Diamond(Op, Op),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Nothing),
        Just(Op::StoreG),
        Just(Op::StoreH),
        Just(Op::CallSetG),
        Just(Op::CallMaybeSetG),
    ]
}

fn segment() -> impl Strategy<Value = Segment> {
    prop_oneof![
        op().prop_map(Segment::Straight),
        (op(), op()).prop_map(|(a, b)| Segment::Diamond(a, b)),
    ]
}

/// Builds `main(%c)` from the segments, ending in a load of `@g`. Returns the program and the
/// load.
fn build(segments: &[Segment]) -> (Program, InstId) {
    let mut builder = ProgramBuilder::new();
    let g = builder.global("g", None, false).unwrap();
    let h = builder.global("h", None, false).unwrap();

    let mut set_g = builder.define("set_g", &[]).unwrap();
    set_g.block("entry");
    set_g.store(Value::Const(1), g);
    set_g.ret(None);

    let mut maybe = builder.define("maybe_set_g", &["c"]).unwrap();
    let entry = maybe.block("entry");
    let write = maybe.block("write");
    let done = maybe.block("done");
    maybe.switch_to(entry);
    let c = maybe.param(0);
    maybe.branch(c, write, done);
    maybe.switch_to(write);
    maybe.store(Value::Const(1), g);
    maybe.jump(done);
    maybe.switch_to(done);
    maybe.ret(None);

    let mut main = builder.define("main", &["c"]).unwrap();
    main.block("entry");
    let c = main.param(0);
    let emit = |main: &mut FunctionBuilder<'_>, op: Op| match op {
        Op::Nothing => {}
        Op::StoreG => {
            main.store(Value::Const(2), g);
        }
        Op::StoreH => {
            main.store(Value::Const(3), h);
        }
        Op::CallSetG => {
            let callee = main.callee("set_g");
            main.call(callee, vec![]);
        }
        Op::CallMaybeSetG => {
            let callee = main.callee("maybe_set_g");
            main.call(callee, vec![c]);
        }
    };

    for (i, segment) in segments.iter().enumerate() {
        match *segment {
            Segment::Straight(op) => emit(&mut main, op),
            Segment::Diamond(left, right) => {
                let then_block = main.block(&format!("then{}", i));
                let else_block = main.block(&format!("else{}", i));
                let join = main.block(&format!("join{}", i));
                main.branch(c, then_block, else_block);
                main.switch_to(then_block);
                emit(&mut main, left);
                main.jump(join);
                main.switch_to(else_block);
                emit(&mut main, right);
                main.jump(join);
                main.switch_to(join);
            }
        }
    }
    let x = main.load(g).as_inst().unwrap();
    main.ret(None);

    (builder.finish().unwrap(), x)
}

/// Whether `@g` is written on every path through the segments.
fn killed_on_every_path(segments: &[Segment]) -> bool {
    segments.iter().any(|segment| match *segment {
        Segment::Straight(op) => op.kills_g(),
        Segment::Diamond(left, right) => left.kills_g() && right.kills_g(),
    })
}

/// Enumerates every CFG path from `block` to `target`, which must be acyclic, and checks that
/// each one stores to `g` directly or calls `set_g`.
fn every_path_writes(program: &Program, block: BlockId, target: BlockId, g: Value) -> bool {
    let set_g = program.function_by_name("set_g");
    let writes = program.block(block).insts.iter().any(|&inst| match program.kind(inst) {
        InstKind::Store { ptr, .. } => *ptr == g,
        InstKind::Call { .. } => program.callee(inst) == set_g,
        _ => false,
    });
    if writes {
        return true;
    }
    if block == target {
        return false;
    }
    let successors = program.successors(block);
    !successors.is_empty()
        && successors
            .into_iter()
            .all(|next| every_path_writes(program, next, target, g))
}

/// Whether some write of `@g` dominates the end of the segments.
fn killed_by_dominating_write(segments: &[Segment]) -> bool {
    segments
        .iter()
        .any(|segment| matches!(segment, Segment::Straight(op) if op.kills_g()))
}

fn call_chain(calls: usize) -> Program {
    let mut builder = ProgramBuilder::new();
    builder.declare("ext", &[], FunctionAttrs::default()).unwrap();
    let mut func = builder.define("main", &[]).unwrap();
    func.block("entry");
    let ext = func.callee("ext");
    for _ in 0..calls {
        func.call(ext, vec![]);
    }
    func.ret(None);
    builder.finish().unwrap()
}

fn context_of(calls: &[InstId], path: &[usize]) -> Context {
    path.iter()
        .fold(Context::root(), |ctx, &i| ctx.sub_context(calls[i]))
}

proptest! {
    #[test]
    fn kill_before_is_sound(segments in prop::collection::vec(segment(), 0..6)) {
        let (program, x) = build(&segments);
        let analyses = ProgramAnalyses::build(&program);
        let g = Value::Global(program.global_by_name("g").unwrap());

        let mut kill = KillFlow::with_basic_oracle(&program, &analyses, AnalysisConfig::default());
        let proven = kill.pointer_killed_before(None, g, x, false, &QueryBudget::unbounded());

        let main = program.function_by_name("main").unwrap();
        let entry = program.function(main).entry_block().unwrap();
        let exhaustive = every_path_writes(&program, entry, program.block_of(x), g);
        prop_assert_eq!(exhaustive, killed_on_every_path(&segments));
        if proven {
            prop_assert!(exhaustive);
        }
        prop_assert_eq!(proven, killed_by_dominating_write(&segments));

        // Summaries are reused, not recomputed into a different answer.
        let again = kill.pointer_killed_before(None, g, x, false, &QueryBudget::unbounded());
        prop_assert_eq!(proven, again);
    }

    #[test]
    fn contexts_match_along_call_chains(
        outer in prop::collection::vec(0usize..4, 0..5),
        inner in prop::collection::vec(0usize..4, 0..5),
        other in prop::collection::vec(0usize..4, 1..5),
    ) {
        let program = call_chain(4);
        let calls: Vec<InstId> = program.insts.keys().filter(|&i| program.is_call(i)).collect();

        let short = context_of(&calls, &outer);
        let long = context_of(&calls, &[outer.clone(), inner.clone()].concat());

        prop_assert!(short.matches(&short));
        prop_assert!(short.is_suffix_of(&long));
        prop_assert!(short.matches(&long) && long.matches(&short));
        prop_assert_eq!(long.depth(), outer.len() + inner.len());
        prop_assert_eq!(context_of(&calls, &outer), short.clone());

        let sentinel = calls[0];
        let outermost = outer.first().or(inner.first()).map_or(sentinel, |&i| calls[i]);
        prop_assert_eq!(long.toplevel_inst(sentinel), outermost);

        // Diverging outer frames never match, whatever lies inside them.
        let diverged = context_of(&calls, &[other.clone(), inner.clone()].concat());
        if !other.starts_with(&outer) && !outer.starts_with(&other) {
            prop_assert!(!diverged.matches(&long));
        }

        let mut seen = HashSet::new();
        seen.insert(long.clone());
        prop_assert!(seen.contains(&context_of(&calls, &[outer, inner].concat())));
    }
}
