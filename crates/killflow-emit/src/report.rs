use crate::config::VerbosityLevel;
use crate::emitter::{EmitContext, EmitHelper, EmitResult};
use killflow_analysis::{CombinatorStats, Flow, KillFlowStats, ModRefResult, TemporalRelation};
use killflow_core::Program;
use serde::Serialize;
use std::io::Write;

/// Something the driver can print as text or serialize as JSON.
pub trait Report: Serialize {
    fn emit_text<W: Write>(
        &self,
        writer: &mut W,
        context: &mut EmitContext,
        verbosity: VerbosityLevel,
    ) -> EmitResult;
}

/// A flow the combinator could not disprove, with the contexts of both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowEntry {
    pub write: String,
    pub write_context: String,
    pub read: String,
    pub read_context: String,
}

impl FlowEntry {
    pub fn from_flow(program: &Program, flow: &Flow) -> Self {
        Self {
            write: program.inst_label(flow.write.inst),
            write_context: flow.write.ctx.display(program).to_string(),
            read: program.inst_label(flow.read.inst),
            read_context: flow.read.ctx.display(program).to_string(),
        }
    }

    fn describe(&self) -> String {
        let end = |inst: &str, ctx: &str| {
            if ctx.is_empty() {
                inst.to_string()
            } else {
                format!("{} in {}", inst, ctx)
            }
        };
        format!(
            "{} -> {}",
            end(&self.write, &self.write_context),
            end(&self.read, &self.read_context)
        )
    }
}

/// The verdict on one pair of operations.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub function: String,
    pub loop_header: String,
    pub src: String,
    pub dst: String,
    pub relation: TemporalRelation,
    /// What the layers beneath the combinator answered.
    pub lower: ModRefResult,
    pub result: ModRefResult,
    pub flows: Vec<FlowEntry>,
    pub kill_flow: KillFlowStats,
    pub combinator: CombinatorStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct PairVerdict {
    pub src: String,
    pub dst: String,
    pub relation: TemporalRelation,
    pub lower: ModRefResult,
    pub result: ModRefResult,
}

/// Verdicts for every ordered pair of memory operations in a loop.
#[derive(Debug, Clone, Serialize)]
pub struct FlowsReport {
    pub function: String,
    pub loop_header: String,
    pub operations: Vec<String>,
    pub verdicts: Vec<PairVerdict>,
    pub kill_flow: KillFlowStats,
    pub combinator: CombinatorStats,
}

impl FlowsReport {
    /// Verdicts the kill reasoning made more precise than the lower answer.
    pub fn refined(&self) -> usize {
        self.verdicts.iter().filter(|v| v.result != v.lower).count()
    }
}

fn paint_result(context: &EmitContext, result: ModRefResult) -> String {
    let color = match result {
        ModRefResult::NoModRef => "green",
        ModRefResult::Ref | ModRefResult::Mod => "yellow",
        ModRefResult::ModRef => "red",
    };
    context.paint(&result.to_string(), color)
}

/// Prints the counters of one stats struct, skipping zeroes unless asked to be verbose.
fn emit_counters<W: Write, S: Serialize>(
    writer: &mut W,
    context: &mut EmitContext,
    title: &str,
    stats: &S,
    verbosity: VerbosityLevel,
) -> EmitResult {
    let serde_json::Value::Object(fields) = serde_json::to_value(stats)? else {
        return Ok(());
    };
    let shown: Vec<String> = fields
        .iter()
        .filter(|(_, value)| verbosity.should_print_facts() || value.as_u64() != Some(0))
        .map(|(name, value)| format!("{} = {}", name, value))
        .collect();
    if shown.is_empty() {
        return Ok(());
    }

    EmitHelper::write_line(writer, context, &format!("{}:", title))?;
    context.indent();
    for line in shown {
        EmitHelper::write_line(writer, context, &line)?;
    }
    context.dedent();
    Ok(())
}

impl Report for QueryReport {
    fn emit_text<W: Write>(
        &self,
        writer: &mut W,
        context: &mut EmitContext,
        verbosity: VerbosityLevel,
    ) -> EmitResult {
        EmitHelper::write_section(
            writer,
            context,
            &format!(
                "{} {} {} in loop {}",
                self.src, self.relation, self.dst, self.loop_header
            ),
        )?;
        EmitHelper::write_line(writer, context, &format!("lower:  {}", paint_result(context, self.lower)))?;
        EmitHelper::write_line(writer, context, &format!("result: {}", paint_result(context, self.result)))?;

        if !self.flows.is_empty() {
            EmitHelper::write_line(writer, context, "flows:")?;
            context.indent();
            for flow in &self.flows {
                EmitHelper::write_line(writer, context, &flow.describe())?;
            }
            context.dedent();
        }

        if verbosity.should_print_counters() {
            emit_counters(writer, context, "kill-flow", &self.kill_flow, verbosity)?;
            emit_counters(writer, context, "combinator", &self.combinator, verbosity)?;
        }
        Ok(())
    }
}

impl Report for FlowsReport {
    fn emit_text<W: Write>(
        &self,
        writer: &mut W,
        context: &mut EmitContext,
        verbosity: VerbosityLevel,
    ) -> EmitResult {
        EmitHelper::write_section(
            writer,
            context,
            &format!("@{} loop {}", self.function, self.loop_header),
        )?;
        EmitHelper::write_line(
            writer,
            context,
            &format!(
                "{} operations, {} queries, {} refined",
                self.operations.len(),
                self.verdicts.len(),
                self.refined()
            ),
        )?;

        context.indent();
        for verdict in &self.verdicts {
            let refined = verdict.result != verdict.lower;
            if !refined && !verbosity.should_print_facts() {
                continue;
            }
            let line = format!(
                "{} {} {}: {} -> {}",
                verdict.src,
                verdict.relation,
                verdict.dst,
                verdict.lower,
                paint_result(context, verdict.result)
            );
            EmitHelper::write_line(writer, context, &line)?;
        }
        context.dedent();

        if verbosity.should_print_counters() {
            emit_counters(writer, context, "kill-flow", &self.kill_flow, verbosity)?;
            emit_counters(writer, context, "combinator", &self.combinator, verbosity)?;
        }
        Ok(())
    }
}
