use crate::config::EmitterConfig;
use crate::emitter::{EmitContext, EmitHelper, EmitResult, Emitter};
use killflow_core::analysis::objects::object_extent;
use killflow_core::analysis::Extent;
use killflow_core::{
    BlockId, FuncId, Function, InstId, InstKind, Intrinsic, Program, Terminator, Value,
};
use std::io::Write;

/// Prints a program in the text format accepted by `killflow_parser`.
///
/// Every value-producing instruction is printed as an assignment; unnamed ones get their arena
/// name (`%inst12`). Named instructions without a result keep their name as a `#tag`.
#[derive(Debug, Clone, Default)]
pub struct IrEmitter {
    config: EmitterConfig,
}

impl IrEmitter {
    pub fn new(config: EmitterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    /// The whole program as text, colored if the configuration asks for it.
    pub fn program_to_string(&self, program: &Program) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        let mut context = EmitContext::from_config(&self.config);
        self.emit(program, &mut buffer, &mut context)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn emit_function<W: Write>(
        &self,
        program: &Program,
        func: FuncId,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        let function = program.function(func);
        let signature = format!("@{}({})", function.name, format_params(function));

        if function.is_declaration() {
            let mut line = format!("{} {}", context.paint("declare", "magenta"), signature);
            for attr in declaration_attrs(function) {
                line.push(' ');
                line.push_str(attr);
            }
            return EmitHelper::write_line(writer, context, &line);
        }

        let header = format!("{} {}", context.paint("define", "magenta"), signature);
        EmitHelper::write_block(writer, context, &header, |w, c| {
            for &block in &function.blocks {
                self.emit_block(program, block, w, c)?;
            }
            Ok(())
        })
    }

    fn emit_block<W: Write>(
        &self,
        program: &Program,
        block: BlockId,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        context.dedent();
        let label = format!("{}:", program.block(block).name);
        EmitHelper::write_colored_line(writer, context, &label, "blue")?;
        context.indent();

        for &inst in &program.block(block).insts {
            let mut line = self.format_inst(program, inst, context);
            if let Some(note) = self.annotation(program, inst) {
                line.push_str("  ");
                line.push_str(&context.paint(&format!("; {}", note), "dimmed"));
            }
            EmitHelper::write_line(writer, context, &line)?;
        }
        Ok(())
    }

    /// One instruction, with its assignment or tag.
    pub fn format_inst(&self, program: &Program, inst: InstId, context: &EmitContext) -> String {
        let data = program.inst(inst);
        let body = format_kind(program, &data.kind);
        let mut parts = body.splitn(2, ' ');
        let opcode = parts.next().unwrap_or_default();
        let rest = parts.next();
        let opcode = if data.kind.is_terminator() {
            context.paint(opcode, "yellow")
        } else {
            context.paint(opcode, "bold")
        };
        let body = match rest {
            Some(rest) => format!("{} {}", opcode, rest),
            None => opcode,
        };

        if data.kind.has_result() {
            format!("{} = {}", program.value_name(Value::Inst(inst)), body)
        } else {
            match &data.name {
                Some(name) => format!("{} #{}", body, name),
                None => body,
            }
        }
    }

    fn annotation(&self, program: &Program, inst: InstId) -> Option<String> {
        let verbosity = self.config.verbosity;
        let mut notes = Vec::new();
        if verbosity.should_print_facts() {
            if let InstKind::Alloca { .. } = program.kind(inst) {
                match object_extent(program, Value::Inst(inst)) {
                    Some(Extent::Elements(n)) => notes.push(format!("extent {}", n)),
                    Some(Extent::Dynamic(v)) => {
                        notes.push(format!("extent {}", program.value_name(v)))
                    }
                    None => {}
                }
            }
        }
        if verbosity.should_print_ids() {
            notes.push(inst.to_string());
        }
        (!notes.is_empty()).then(|| notes.join(", "))
    }
}

impl Emitter for IrEmitter {
    type Item = Program;

    fn emit<W: Write>(
        &self,
        program: &Program,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        for (_, global) in program.globals.iter() {
            let mut line = format!("{} @{}", context.paint("global", "magenta"), global.name);
            if let Some(len) = global.len {
                line.push_str(&format!(" [{}]", len));
            }
            if global.zero_init {
                line.push_str(" zeroinit");
            }
            EmitHelper::write_line(writer, context, &line)?;
        }

        let mut first = program.globals.is_empty();
        for (func, _) in program.functions.iter() {
            if !first {
                writeln!(writer)?;
            }
            first = false;
            self.emit_function(program, func, writer, context)?;
        }
        Ok(())
    }
}

fn format_params(function: &Function) -> String {
    function
        .params
        .iter()
        .map(|param| {
            let mut text = String::new();
            if param.read_only {
                text.push_str("readonly ");
            }
            if param.write_only {
                text.push_str("writeonly ");
            }
            text.push('%');
            text.push_str(&param.name);
            text
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn declaration_attrs(function: &Function) -> Vec<&'static str> {
    let attrs = &function.attrs;
    [
        (attrs.read_only, "readonly"),
        (attrs.local, "local"),
        (attrs.semi_local, "semilocal"),
        (attrs.no_alias_return, "noalias"),
    ]
    .into_iter()
    .filter_map(|(set, name)| set.then_some(name))
    .collect()
}

fn join_values(program: &Program, values: &[Value]) -> String {
    values
        .iter()
        .map(|&v| program.value_name(v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The instruction text without its assignment.
pub fn format_kind(program: &Program, kind: &InstKind) -> String {
    let name = |v: &Value| program.value_name(*v);
    let label = |b: &BlockId| program.block(*b).name.clone();

    match kind {
        InstKind::Alloca { count: None } => "alloca".to_string(),
        InstKind::Alloca { count: Some(n) } => format!("alloca [{}]", name(n)),
        InstKind::Load { ptr } => format!("load {}", name(ptr)),
        InstKind::Store { value, ptr } => format!("store {}, {}", name(value), name(ptr)),
        InstKind::ElementPtr { base, indices } if indices.is_empty() => {
            format!("elementptr {}", name(base))
        }
        InstKind::ElementPtr { base, indices } => {
            format!("elementptr {}, {}", name(base), join_values(program, indices))
        }
        InstKind::Cast { value } => format!("cast {}", name(value)),
        InstKind::Phi { incoming } => {
            let arms = incoming
                .iter()
                .map(|(block, value)| format!("[{}, {}]", name(value), label(block)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("phi {}", arms)
        }
        InstKind::Select {
            cond,
            if_true,
            if_false,
        } => format!("select {}, {}, {}", name(cond), name(if_true), name(if_false)),
        InstKind::Binary { op, lhs, rhs } => {
            format!("{} {}, {}", op.mnemonic(), name(lhs), name(rhs))
        }
        InstKind::Compare { pred, lhs, rhs } => {
            format!("icmp {} {}, {}", pred.mnemonic(), name(lhs), name(rhs))
        }
        InstKind::Call { callee, args } => {
            format!("call {}({})", name(callee), join_values(program, args))
        }
        InstKind::Intrinsic(intrinsic) => match intrinsic {
            Intrinsic::LifetimeStart(ptr) => format!("lifetime.start {}", name(ptr)),
            Intrinsic::LifetimeEnd(ptr) => format!("lifetime.end {}", name(ptr)),
            Intrinsic::MemCopy { dst, src, len } => {
                format!("memcpy {}, {}, {}", name(dst), name(src), name(len))
            }
            Intrinsic::MemMove { dst, src, len } => {
                format!("memmove {}, {}, {}", name(dst), name(src), name(len))
            }
            Intrinsic::MemSet { dst, value, len } => {
                format!("memset {}, {}, {}", name(dst), name(value), name(len))
            }
            Intrinsic::Marker { kind, args } => {
                format!("{}({})", kind.mnemonic(), join_values(program, args))
            }
        },
        InstKind::Terminator(term) => match term {
            Terminator::Jump(target) => format!("jump {}", label(target)),
            Terminator::Branch {
                cond,
                then_block,
                else_block,
            } => format!(
                "branch {}, {}, {}",
                name(cond),
                label(then_block),
                label(else_block)
            ),
            Terminator::Return(Some(value)) => format!("ret {}", name(value)),
            Terminator::Return(None) => "ret".to_string(),
            Terminator::Unreachable => "unreachable".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use killflow_core::{FunctionAttrs, Param, ProgramBuilder};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_emit_builder_program() {
        let mut builder = ProgramBuilder::new();
        let g = builder.global("g", Some(4), true).unwrap();
        builder
            .declare_with_params(
                "puts",
                vec![Param {
                    read_only: true,
                    ..Param::new("s")
                }],
                FunctionAttrs {
                    read_only: true,
                    ..FunctionAttrs::default()
                },
            )
            .unwrap();
        let mut func = builder.define("f", &["p"]).unwrap();
        func.block("entry");
        let p = func.param(0);
        let slot = func.alloca(Some(Value::Const(8)));
        func.set_name(slot.as_inst().unwrap(), "slot");
        let store = func.store(p, g);
        func.set_name(store, "s0");
        let puts = func.callee("puts");
        func.call(puts, vec![g]);
        func.ret(None);
        let program = builder.finish().unwrap();

        let text = IrEmitter::default().program_to_string(&program).unwrap();
        let call = program
            .insts
            .keys()
            .find(|&i| program.is_call(i))
            .unwrap();
        let expected = format!(
            "global @g [4] zeroinit\n\
             \n\
             declare @puts(readonly %s) readonly\n\
             \n\
             define @f(%p) {{\n\
             entry:\n\
             \x20 %slot = alloca [8]\n\
             \x20 store %p, @g #s0\n\
             \x20 %{} = call @puts(@g)\n\
             \x20 ret\n\
             }}\n",
            call
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_debug_verbosity_annotates() {
        let mut builder = ProgramBuilder::new();
        let mut func = builder.define("f", &["n"]).unwrap();
        func.block("entry");
        let n = func.param(0);
        let slot = func.alloca(Some(n));
        func.set_name(slot.as_inst().unwrap(), "buf");
        func.ret(None);
        let program = builder.finish().unwrap();

        let emitter =
            IrEmitter::new(EmitterConfig::default().with_verbosity(crate::VerbosityLevel::Debug));
        let text = emitter.program_to_string(&program).unwrap();
        assert!(text.contains("%buf = alloca [%n]  ; extent %n, inst0"));
    }
}
