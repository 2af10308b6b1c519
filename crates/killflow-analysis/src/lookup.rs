use crate::error::{AnalysisError, Result};
use killflow_core::{FuncId, InstId, Loop, Program, ProgramAnalyses};

pub fn resolve_function(program: &Program, name: &str) -> Result<FuncId> {
    let func = program.lookup_function(name)?;
    if !program.is_defined(func) {
        return Err(AnalysisError::Declaration(name.to_string()));
    }
    Ok(func)
}

/// The loop of `function` headed by the block named `header`.
pub fn resolve_loop<'a>(
    program: &Program,
    analyses: &'a ProgramAnalyses,
    function: &str,
    header: &str,
) -> Result<&'a Loop> {
    let func = resolve_function(program, function)?;
    let block = program.lookup_block(func, name_without_sigil(header))?;
    analyses
        .find_loop(func, block)
        .ok_or_else(|| AnalysisError::NotALoop {
            function: function.to_string(),
            block: header.to_string(),
        })
}

/// An instruction named `%name` or tagged `#name` in `function`.
pub fn resolve_inst(program: &Program, function: &str, name: &str) -> Result<InstId> {
    let func = resolve_function(program, function)?;
    Ok(program.lookup_inst(func, name_without_sigil(name))?)
}

/// The loads, stores, calls and memory intrinsics of a loop, in block order.
pub fn memory_operations(program: &Program, lp: &Loop) -> Vec<InstId> {
    program
        .function(lp.func)
        .blocks
        .iter()
        .filter(|&&block| lp.contains_block(block))
        .flat_map(|&block| program.block(block).insts.iter().copied())
        .filter(|&inst| program.may_read_memory(inst) || program.may_write_memory(inst))
        .collect()
}

fn name_without_sigil(name: &str) -> &str {
    name.trim_start_matches(['%', '#', '@'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use killflow_core::{FunctionAttrs, ProgramBuilder, Value};

    fn counted_loop() -> Program {
        let mut builder = ProgramBuilder::new();
        let g = builder.global("g", None, false).unwrap();
        builder.declare("ext", &[], FunctionAttrs::default()).unwrap();
        let mut func = builder.define("f", &[]).unwrap();
        let entry = func.block("entry");
        let header = func.block("header");
        let exit = func.block("exit");
        func.switch_to(entry);
        func.jump(header);
        func.switch_to(header);
        let store = func.store(Value::Const(1), g);
        func.set_name(store, "s0");
        let x = func.load(g);
        let cond = func.compare(killflow_core::ComparePred::Ne, x, Value::Const(0));
        func.branch(cond, header, exit);
        func.switch_to(exit);
        func.ret(None);
        builder.finish().unwrap()
    }

    #[test]
    fn test_resolve_loop_and_instructions() {
        let program = counted_loop();
        let analyses = ProgramAnalyses::build(&program);

        let lp = resolve_loop(&program, &analyses, "f", "header").unwrap();
        assert_eq!(program.block(lp.header).name, "header");
        assert!(resolve_inst(&program, "f", "#s0").is_ok());
        assert_eq!(memory_operations(&program, lp).len(), 2);

        assert!(matches!(
            resolve_loop(&program, &analyses, "f", "entry"),
            Err(AnalysisError::NotALoop { .. })
        ));
        assert!(matches!(
            resolve_function(&program, "ext"),
            Err(AnalysisError::Declaration(_))
        ));
        assert!(matches!(
            resolve_inst(&program, "missing", "s0"),
            Err(AnalysisError::Ir(_))
        ));
    }
}
