use crate::builder::ProgramBuilder;
use crate::function::FunctionAttrs;
use crate::instructions::InstKind;
use crate::values::Value;
use crate::IrError;

#[test]
fn test_define_and_lookup() {
    let mut builder = ProgramBuilder::new();
    builder
        .declare("puts", &["s"], FunctionAttrs {
            read_only: true,
            ..FunctionAttrs::default()
        })
        .unwrap();

    let mut func = builder.define("main", &["p"]).unwrap();
    let entry = func.block("entry");
    let p = func.param(0);
    let puts = func.callee("puts");
    let store = func.store(Value::Const(1), p);
    func.set_name(store, "s0");
    let call = func.call(puts, vec![p]);
    func.ret(None);
    let main = func.func_id();

    let program = builder.finish().unwrap();
    assert_eq!(program.lookup_function("main").unwrap(), main);
    assert_eq!(program.lookup_inst(main, "s0").unwrap(), store);
    assert_eq!(program.lookup_block(main, "entry").unwrap(), entry);
    assert!(program.function(program.lookup_function("puts").unwrap()).is_declaration());

    let call = call.as_inst().unwrap();
    assert!(program.may_read_memory(call));
    assert!(!program.may_write_memory(call));
    assert!(program.may_write_memory(store));
    assert_eq!(program.next_inst(store), Some(call));
    assert_eq!(program.prev_inst(call), Some(store));
    assert!(matches!(
        program.kind(program.terminator(entry).unwrap()),
        InstKind::Terminator(_)
    ));
}

#[test]
fn test_missing_terminator_is_reported() {
    let mut builder = ProgramBuilder::new();
    let mut func = builder.define("f", &[]).unwrap();
    func.block("entry");
    func.alloca(None);

    let err = builder.finish().unwrap_err();
    assert!(matches!(err, IrError::BuilderError(_)));
}

#[test]
fn test_append_after_terminator_is_reported() {
    let mut builder = ProgramBuilder::new();
    let mut func = builder.define("f", &[]).unwrap();
    func.block("entry");
    func.ret(None);
    func.alloca(None);

    assert!(builder.has_errors());
}

#[test]
fn test_duplicate_function() {
    let mut builder = ProgramBuilder::new();
    builder.function("f", &[]).unwrap();
    assert!(matches!(
        builder.function("f", &[]),
        Err(IrError::Duplicate(_))
    ));
}
