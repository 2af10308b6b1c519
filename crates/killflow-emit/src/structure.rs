use crate::config::EmitterConfig;
use crate::emitter::{EmitContext, EmitHelper, EmitResult};
use killflow_core::analysis::TripCount;
use killflow_core::{BlockId, DominanceProvider, DominatorTree, FuncId, Loop, Program};
use std::io::Write;

/// Dumps the facts the prover reasons with: immediate dominators, immediate post-dominators and
/// the loop nest of every defined function.
pub struct StructureEmitter<'p> {
    program: &'p Program,
    dominance: &'p dyn DominanceProvider,
    config: EmitterConfig,
}

impl<'p> StructureEmitter<'p> {
    pub fn new(
        program: &'p Program,
        dominance: &'p dyn DominanceProvider,
        config: EmitterConfig,
    ) -> Self {
        Self {
            program,
            dominance,
            config,
        }
    }

    pub fn emit_to_string(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        let mut context = EmitContext::from_config(&self.config);
        self.emit(&mut buffer, &mut context)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn emit<W: Write>(&self, writer: &mut W, context: &mut EmitContext) -> EmitResult {
        for func in self.program.defined_functions() {
            self.emit_function(func, writer, context)?;
        }
        Ok(())
    }

    pub fn emit_function<W: Write>(
        &self,
        func: FuncId,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        let name = &self.program.function(func).name;
        EmitHelper::write_section(writer, context, &format!("@{}", name))?;

        if let Some(tree) = self.dominance.dominator_tree(func) {
            EmitHelper::write_line(writer, context, "dominators:")?;
            self.emit_tree(func, tree, "idom", writer, context)?;
        }
        if let Some(tree) = self.dominance.post_dominator_tree(func) {
            EmitHelper::write_line(writer, context, "post-dominators:")?;
            self.emit_tree(func, tree, "ipdom", writer, context)?;
        }

        let Some(loops) = self.dominance.loop_info(func) else {
            return Ok(());
        };
        if loops.is_empty() {
            return EmitHelper::write_line(writer, context, "loops: none");
        }
        EmitHelper::write_line(writer, context, "loops:")?;
        context.indent();
        for &block in &self.program.function(func).blocks {
            if let Some(lp) = loops.get(block) {
                let line = self.describe_loop(func, lp);
                EmitHelper::write_line(writer, context, &line)?;
            }
        }
        context.dedent();
        Ok(())
    }

    fn emit_tree<W: Write>(
        &self,
        func: FuncId,
        tree: &DominatorTree,
        relation: &str,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        context.indent();
        for &block in &self.program.function(func).blocks {
            if !tree.contains(block) {
                let line = format!("{} unreachable", self.label(block));
                EmitHelper::write_colored_line(writer, context, &line, "red")?;
                continue;
            }
            let parent = tree
                .idom(block)
                .map_or_else(|| "<root>".to_string(), |b| self.label(b));
            let line = format!("{}({}) = {}", relation, self.label(block), parent);
            EmitHelper::write_line(writer, context, &line)?;
        }
        context.dedent();
        Ok(())
    }

    fn describe_loop(&self, func: FuncId, lp: &Loop) -> String {
        let mut blocks: Vec<BlockId> = lp.blocks.iter().copied().collect();
        blocks.sort();
        let list = |blocks: &[BlockId]| {
            blocks
                .iter()
                .map(|&b| self.label(b))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut line = format!(
            "{} depth {}: blocks [{}] latches [{}] exits [{}]",
            self.label(lp.header),
            lp.depth,
            list(&blocks),
            list(&lp.latches),
            list(&lp.exits)
        );
        if self.config.verbosity.should_print_facts() {
            let trips = self
                .dominance
                .evolution(func)
                .and_then(|evolution| evolution.trip_count(lp.header));
            match trips {
                Some(TripCount::Constant(n)) => line.push_str(&format!(" trips {}", n)),
                Some(TripCount::Value(v)) => {
                    line.push_str(&format!(" trips {}", self.program.value_name(v)))
                }
                None => line.push_str(" trips ?"),
            }
        }
        line
    }

    fn label(&self, block: BlockId) -> String {
        self.program.block(block).name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerbosityLevel;
    use killflow_core::{ComparePred, ProgramAnalyses, ProgramBuilder, Value};

    #[test]
    fn test_counted_loop_dump() {
        let mut builder = ProgramBuilder::new();
        let mut func = builder.define("count", &[]).unwrap();
        let entry = func.block("entry");
        let header = func.block("header");
        let exit = func.block("exit");
        func.switch_to(entry);
        func.jump(header);
        func.switch_to(header);
        let i = func.phi(vec![(entry, Value::Const(0))]);
        let next = func.add(i, Value::Const(1));
        if let Some(phi) = i.as_inst() {
            func.replace_kind(
                phi,
                killflow_core::InstKind::Phi {
                    incoming: vec![(entry, Value::Const(0)), (header, next)],
                },
            );
        }
        let more = func.compare(ComparePred::Slt, next, Value::Const(10));
        func.branch(more, header, exit);
        func.switch_to(exit);
        func.ret(None);
        let program = builder.finish().unwrap();
        let analyses = ProgramAnalyses::build(&program);

        let config = EmitterConfig::default().with_verbosity(VerbosityLevel::Verbose);
        let text = StructureEmitter::new(&program, &analyses, config)
            .emit_to_string()
            .unwrap();

        assert!(text.contains("=== @count ==="));
        assert!(text.contains("idom(header) = entry"));
        assert!(text.contains("ipdom(header) = exit"));
        assert!(text.contains("idom(entry) = <root>"));
        assert!(text.contains("header depth 1: blocks [header] latches [header] exits [exit]"));
        assert!(text.contains("trips"));
    }
}
