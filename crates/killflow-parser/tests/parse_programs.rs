use killflow_core::{InstKind, Intrinsic, ProgramAnalyses, Terminator, Value};
use killflow_parser::{parse_directory, parse_program, ParseError};
use pretty_assertions::assert_eq;

const PIPELINE: &str = r"
global @table [64] zeroinit
global @count
declare @log_event(readonly %msg) semilocal
declare @fill(writeonly %dst, %n) local

define @stage(%buf, %n) {
entry:
  %tmp = alloca [8]
  lifetime.start %tmp
  memset %tmp, 0, 8
  %c = call @fill(%buf, %n)
  store 1, @count #bump
  lifetime.end %tmp
  ret
}

define @main() {
entry:
  %n = load @count
  jump header
header:
  %i = phi [0, entry], [%i.next, latch]
  %slot = elementptr @table, %i
  store 0, %slot #clear
  %r = call @stage(%slot, %n)
  %v = load %slot
  %more = icmp slt %i, 64
  branch %more, latch, exit
latch:
  %i.next = add %i, 1
  jump header
exit:
  %e = call @log_event(%v)
  ret
}
";

#[test]
fn test_pipeline_structure() {
    let program = parse_program(PIPELINE).expect("pipeline parses");

    let main = program.lookup_function("main").unwrap();
    let stage = program.lookup_function("stage").unwrap();
    let log = program.lookup_function("log_event").unwrap();
    let fill = program.lookup_function("fill").unwrap();

    assert!(program.is_defined(main));
    assert!(program.is_defined(stage));
    assert!(!program.is_defined(log));
    assert!(program.function(log).attrs.semi_local);
    assert!(program.function(log).params[0].read_only);
    assert!(program.function(fill).attrs.local);
    assert!(program.function(fill).params[0].write_only);
    assert!(!program.function(fill).params[1].write_only);

    let table = program.global_by_name("table").unwrap();
    assert_eq!(program.global(table).len, Some(64));
    assert!(program.global(table).zero_init);
    let count = program.global_by_name("count").unwrap();
    assert_eq!(program.global(count).len, None);

    let bump = program.lookup_inst(stage, "bump").unwrap();
    assert!(matches!(
        program.kind(bump),
        InstKind::Store {
            value: Value::Const(1),
            ptr: Value::Global(g),
        } if *g == count
    ));

    let clear = program.lookup_inst(main, "clear").unwrap();
    let slot = program.lookup_inst(main, "slot").unwrap();
    assert_eq!(program.pointer_operand(clear), Some(Value::Inst(slot)));

    let call = program.lookup_inst(main, "r").unwrap();
    assert_eq!(program.callee(call), Some(stage));
    assert_eq!(program.call_args(call).len(), 2);
}

#[test]
fn test_forward_references_resolve() {
    let program = parse_program(PIPELINE).unwrap();
    let main = program.lookup_function("main").unwrap();

    let phi = program.lookup_inst(main, "i").unwrap();
    let next = program.lookup_inst(main, "i.next").unwrap();
    let latch = program.lookup_block(main, "latch").unwrap();

    match program.kind(phi) {
        InstKind::Phi { incoming } => {
            assert_eq!(incoming.len(), 2);
            assert_eq!(incoming[1], (latch, Value::Inst(next)));
        }
        other => panic!("expected phi, got {:?}", other),
    }
}

#[test]
fn test_intrinsics_and_terminators() {
    let program = parse_program(PIPELINE).unwrap();
    let stage = program.lookup_function("stage").unwrap();
    let entry = program.lookup_block(stage, "entry").unwrap();

    let kinds: Vec<&InstKind> = program
        .block(entry)
        .insts
        .iter()
        .map(|&i| program.kind(i))
        .collect();

    assert!(matches!(kinds[0], InstKind::Alloca { count: Some(Value::Const(8)) }));
    assert!(matches!(kinds[1], InstKind::Intrinsic(Intrinsic::LifetimeStart(_))));
    assert!(matches!(kinds[2], InstKind::Intrinsic(Intrinsic::MemSet { .. })));
    assert!(matches!(kinds[5], InstKind::Intrinsic(Intrinsic::LifetimeEnd(_))));
    assert!(matches!(kinds[6], InstKind::Terminator(Terminator::Return(None))));
}

#[test]
fn test_parsed_loop_is_analysed() {
    let program = parse_program(PIPELINE).unwrap();
    let analyses = ProgramAnalyses::build(&program);
    let main = program.lookup_function("main").unwrap();
    let header = program.lookup_block(main, "header").unwrap();
    let latch = program.lookup_block(main, "latch").unwrap();

    let l = analyses.find_loop(main, header).expect("header heads a loop");
    assert_eq!(l.single_latch(), Some(latch));
    assert!(l.contains_block(latch));
    assert!(l.is_innermost());
}

#[test]
fn test_undefined_value_is_an_error() {
    let input = r"
define @f() {
entry:
  store 0, %nowhere
  ret
}
";
    match parse_program(input) {
        Err(ParseError::UndefinedValue { function, name }) => {
            assert_eq!(function, "f");
            assert_eq!(name, "%nowhere");
        }
        other => panic!("expected undefined value error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_undefined_block_is_an_error() {
    let input = r"
define @f() {
entry:
  jump nowhere
}
";
    assert!(matches!(
        parse_program(input),
        Err(ParseError::UndefinedBlock { .. })
    ));
}

#[test]
fn test_duplicate_local_is_an_error() {
    let input = r"
define @f(%p) {
entry:
  %x = load %p
  %x = load %p
  ret
}
";
    assert!(matches!(
        parse_program(input),
        Err(ParseError::DuplicateName { .. })
    ));
}

#[test]
fn test_parse_directory_reads_kir_files() {
    let dir = std::env::temp_dir().join(format!("killflow-parser-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("a.kir"), PIPELINE).unwrap();
    std::fs::write(dir.join("b.kir"), "define @f( {").unwrap();
    std::fs::write(dir.join("notes.txt"), "not ir").unwrap();

    let results = parse_directory(&dir);
    std::fs::remove_dir_all(&dir).unwrap();

    assert_eq!(results.len(), 2);
    assert!(results[0].1.is_ok());
    assert!(matches!(results[1].1, Err(ParseError::Syntax(_))));
}
