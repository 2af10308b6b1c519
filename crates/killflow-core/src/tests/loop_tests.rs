use crate::analysis::{AddRec, Evolution, ProgramAnalyses, TripCount};
use crate::builder::ProgramBuilder;
use crate::entities::{BlockId, FuncId};
use crate::instructions::{ComparePred, InstKind};
use crate::program::Program;
use crate::values::Value;

struct Nest {
    program: Program,
    func: FuncId,
    outer: BlockId,
    inner: BlockId,
    j: Value,
}

/// for i in 0..n { for j in 0..8 { a[j] = 0 } }
fn nested_counted_loops() -> Nest {
    let mut builder = ProgramBuilder::new();
    let mut func = builder.define("nest", &["n"]).unwrap();
    let entry = func.block("entry");
    let outer = func.block("outer");
    let inner = func.block("inner");
    let body = func.block("body");
    let outer_latch = func.block("outer.latch");
    let exit = func.block("exit");
    let n = func.param(0);

    func.switch_to(entry);
    let a = func.alloca(Some(Value::Const(8)));
    func.jump(outer);

    func.switch_to(outer);
    let i = func.phi(vec![]);
    let more = func.compare(ComparePred::Slt, i, n);
    func.branch(more, inner, exit);

    func.switch_to(inner);
    let j = func.phi(vec![]);
    let inner_more = func.compare(ComparePred::Slt, j, Value::Const(8));
    func.branch(inner_more, body, outer_latch);

    func.switch_to(body);
    let slot = func.element_ptr(a, vec![j]);
    func.store(Value::Const(0), slot);
    let j_next = func.add(j, Value::Const(1));
    func.jump(inner);

    func.switch_to(outer_latch);
    let i_next = func.add(i, Value::Const(1));
    func.jump(outer);

    func.switch_to(exit);
    func.ret(None);

    func.replace_kind(
        i.as_inst().unwrap(),
        InstKind::Phi {
            incoming: vec![(entry, Value::Const(0)), (outer_latch, i_next)],
        },
    );
    func.replace_kind(
        j.as_inst().unwrap(),
        InstKind::Phi {
            incoming: vec![(outer, Value::Const(0)), (body, j_next)],
        },
    );
    let f = func.func_id();

    Nest {
        program: builder.finish().unwrap(),
        func: f,
        outer,
        inner,
        j,
    }
}

#[test]
fn test_loop_nest_structure() {
    let nest = nested_counted_loops();
    let analyses = ProgramAnalyses::build(&nest.program);
    let loops = &analyses.function(nest.func).unwrap().loops;

    assert_eq!(loops.len(), 2);
    let outer = loops.get(nest.outer).unwrap();
    let inner = loops.get(nest.inner).unwrap();
    assert_eq!(inner.parent, Some(nest.outer));
    assert_eq!(outer.subloops, vec![nest.inner]);
    assert!(inner.is_innermost());
    assert_eq!(inner.depth, 2);
    assert!(outer.contains_block(nest.inner));
    assert_eq!(loops.loop_for(nest.inner).unwrap().header, nest.inner);
}

#[test]
fn test_induction_and_trip_counts() {
    let nest = nested_counted_loops();
    let analyses = ProgramAnalyses::build(&nest.program);
    let info = analyses.function(nest.func).unwrap();

    assert_eq!(
        info.evolution.evolution_of(&nest.program, nest.j),
        Evolution::AddRec(AddRec {
            start: Value::Const(0),
            step: 1,
            header: nest.inner,
        })
    );
    assert_eq!(
        info.evolution.trip_count(nest.inner),
        Some(TripCount::Constant(8))
    );
    assert_eq!(
        info.evolution.trip_count(nest.outer),
        Some(TripCount::Value(Value::Param(nest.func, 0)))
    );
}
