use killflow::{
    analysis::resolve_loop, parse_program, AliasOracle, AnalysisConfig, CallsiteDepthCombinator,
    IrEmitter, ModRefResult, ProgramAnalyses, TemporalRelation,
};

const SCRATCH: &str = r"
global @scratch

define @reset() {
entry:
  store 0, @scratch
  ret
}

define @peek() {
entry:
  %v = load @scratch
  ret
}

define @main(%n) {
entry:
  jump header
header:
  %i = phi [0, entry], [%i.next, header]
  %r = call @reset()
  %p = call @peek()
  %i.next = add %i, 1
  %more = icmp slt %i.next, %n
  branch %more, header, exit
exit:
  ret
}
";

#[test]
fn test_reset_hides_the_previous_iteration() {
    let program = parse_program(SCRATCH).unwrap();
    let analyses = ProgramAnalyses::build(&program);
    let lp = resolve_loop(&program, &analyses, "main", "header").unwrap();
    let main = program.lookup_function("main").unwrap();
    let reset = program.lookup_inst(main, "r").unwrap();
    let peek = program.lookup_inst(main, "p").unwrap();

    let mut combinator =
        CallsiteDepthCombinator::with_basic_oracle(&program, &analyses, AnalysisConfig::default());
    let result = combinator.modref(reset, TemporalRelation::Before, peek, Some(lp));
    assert_eq!(result, ModRefResult::NoModRef);

    let text = IrEmitter::default().program_to_string(&program).unwrap();
    assert!(text.contains("%p = call @peek()"));
}
