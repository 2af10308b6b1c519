use crate::{ParseError, Rule};
use killflow_core::{
    BinaryOp, BlockId, ComparePred, FuncId, FunctionAttrs, FunctionBuilder, InstId, InstKind,
    Intrinsic, MarkerKind, Param, Program, ProgramBuilder, Terminator, Value,
};
use pest::iterators::{Pair, Pairs};
use std::collections::HashMap;

pub(crate) fn lower_program(mut pairs: Pairs<'_, Rule>) -> Result<Program, ParseError> {
    let mut builder = ProgramBuilder::new();
    let mut bodies = Vec::new();

    let Some(program) = pairs.next() else {
        return Ok(builder.finish()?);
    };

    for item in program.into_inner() {
        match item.as_rule() {
            Rule::global_def => lower_global(&mut builder, item)?,
            Rule::declare_def => {
                lower_signature(&mut builder, item)?;
            }
            Rule::define_def => {
                let func = lower_signature(&mut builder, item.clone())?;
                bodies.push((func, item));
            }
            _ => {}
        }
    }

    for (func, item) in bodies {
        BodyLowering::new(builder.body(func)).lower(item)?;
    }

    Ok(builder.finish()?)
}

fn strip_sigil(text: &str) -> &str {
    &text[1..]
}

fn lower_global(builder: &mut ProgramBuilder, pair: Pair<'_, Rule>) -> Result<(), ParseError> {
    let mut name = "";
    let mut len = None;
    let mut zero_init = false;

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::global_name => name = strip_sigil(part.as_str()),
            Rule::array_len => {
                let text = part.as_str().trim_matches(|c| c == '[' || c == ']').trim();
                len = Some(text.parse::<u64>().map_err(|_| ParseError::Malformed {
                    function: name.to_string(),
                    message: format!("bad array length '{}'", text),
                })?);
            }
            Rule::zeroinit => zero_init = true,
            _ => {}
        }
    }

    builder.global(name, len, zero_init)?;
    Ok(())
}

fn lower_signature(builder: &mut ProgramBuilder, pair: Pair<'_, Rule>) -> Result<FuncId, ParseError> {
    let mut name = "";
    let mut params = Vec::new();
    let mut attrs = FunctionAttrs::default();

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::global_name => name = strip_sigil(part.as_str()),
            Rule::param_list => {
                for param in part.into_inner() {
                    let mut lowered = Param::default();
                    for piece in param.into_inner() {
                        match (piece.as_rule(), piece.as_str()) {
                            (Rule::param_attr, "readonly") => lowered.read_only = true,
                            (Rule::param_attr, "writeonly") => lowered.write_only = true,
                            (Rule::local_name, text) => lowered.name = strip_sigil(text).to_string(),
                            _ => {}
                        }
                    }
                    params.push(lowered);
                }
            }
            Rule::fn_attr => match part.as_str() {
                "readonly" => attrs.read_only = true,
                "local" => attrs.local = true,
                "semilocal" => attrs.semi_local = true,
                "noalias" => attrs.no_alias_return = true,
                _ => {}
            },
            _ => {}
        }
    }

    Ok(builder.declare_with_params(name, params, attrs)?)
}

struct BodyLowering<'b> {
    func: FunctionBuilder<'b>,
    name: String,
    locals: HashMap<String, Value>,
    blocks: HashMap<String, BlockId>,
}

impl<'b> BodyLowering<'b> {
    fn new(func: FunctionBuilder<'b>) -> Self {
        let id = func.func_id();
        let function = func.program().function(id);
        let name = function.name.clone();
        let locals = function
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.clone(), Value::Param(id, i as u32)))
            .collect();

        Self {
            func,
            name,
            locals,
            blocks: HashMap::new(),
        }
    }

    fn lower(mut self, pair: Pair<'_, Rule>) -> Result<(), ParseError> {
        let blocks: Vec<Pair<'_, Rule>> = pair
            .into_inner()
            .filter(|p| p.as_rule() == Rule::block)
            .collect();

        for block in &blocks {
            let label = Self::block_label(block);
            if self.blocks.contains_key(label) {
                return Err(self.duplicate(label));
            }
            let id = self.func.block(label);
            self.blocks.insert(label.to_string(), id);
        }

        let base = self.func.program().next_inst_id().as_u32();
        let mut index = 0u32;
        for block in &blocks {
            for stmt in block.clone().into_inner().skip(1) {
                if stmt.as_rule() == Rule::assign_stmt {
                    let name = stmt
                        .clone()
                        .into_inner()
                        .next()
                        .map(|p| strip_sigil(p.as_str()).to_string())
                        .unwrap_or_default();
                    if self.locals.contains_key(&name) {
                        return Err(self.duplicate(&name));
                    }
                    self.locals
                        .insert(name, Value::Inst(InstId::from_u32(base + index)));
                }
                index += 1;
            }
        }

        let mut expected = base;
        for block in blocks {
            let label = Self::block_label(&block).to_string();
            self.func.switch_to(self.blocks[&label]);

            for stmt in block.into_inner().skip(1) {
                let (name, inst, tag) = self.split_statement(stmt)?;
                let kind = self.lower_inst(inst)?;
                let id = self.func.append(kind);
                if id.as_u32() != expected {
                    return Err(self.malformed("instruction numbering out of sync".to_string()));
                }
                expected += 1;
                if let Some(name) = name.or(tag) {
                    self.func.set_name(id, &name);
                }
            }
        }

        Ok(())
    }

    fn block_label<'p>(block: &Pair<'p, Rule>) -> &'p str {
        block
            .clone()
            .into_inner()
            .next()
            .map(|p| p.as_str())
            .unwrap_or_default()
    }

    #[allow(clippy::type_complexity)]
    fn split_statement<'p>(
        &self,
        stmt: Pair<'p, Rule>,
    ) -> Result<(Option<String>, Pair<'p, Rule>, Option<String>), ParseError> {
        let mut name = None;
        let mut inst = None;
        let mut tag = None;

        for part in stmt.into_inner() {
            match part.as_rule() {
                Rule::local_name => name = Some(strip_sigil(part.as_str()).to_string()),
                Rule::tag => tag = Some(strip_sigil(part.as_str()).to_string()),
                _ => inst = Some(part),
            }
        }

        let inst = inst.ok_or_else(|| self.malformed("statement without instruction".into()))?;
        Ok((name, inst, tag))
    }

    fn lower_inst(&self, pair: Pair<'_, Rule>) -> Result<InstKind, ParseError> {
        let rule = pair.as_rule();
        let mut parts = pair.into_inner();

        let kind = match rule {
            Rule::alloca_inst => InstKind::Alloca {
                count: parts.next().map(|p| self.value(p)).transpose()?,
            },
            Rule::load_inst => InstKind::Load {
                ptr: self.next_value(&mut parts)?,
            },
            Rule::store_inst => InstKind::Store {
                value: self.next_value(&mut parts)?,
                ptr: self.next_value(&mut parts)?,
            },
            Rule::elementptr_inst => {
                let base = self.next_value(&mut parts)?;
                let indices = parts.map(|p| self.value(p)).collect::<Result<_, _>>()?;
                InstKind::ElementPtr { base, indices }
            }
            Rule::cast_inst => InstKind::Cast {
                value: self.next_value(&mut parts)?,
            },
            Rule::phi_inst => {
                let mut incoming = Vec::new();
                for arm in parts {
                    let mut arm = arm.into_inner();
                    let value = self.next_value(&mut arm)?;
                    let block = self.next_block(&mut arm)?;
                    incoming.push((block, value));
                }
                InstKind::Phi { incoming }
            }
            Rule::select_inst => InstKind::Select {
                cond: self.next_value(&mut parts)?,
                if_true: self.next_value(&mut parts)?,
                if_false: self.next_value(&mut parts)?,
            },
            Rule::icmp_inst => {
                let pred = self.next_text(&mut parts)?;
                let pred = ComparePred::from_mnemonic(&pred)
                    .ok_or_else(|| self.malformed(format!("unknown predicate '{}'", pred)))?;
                InstKind::Compare {
                    pred,
                    lhs: self.next_value(&mut parts)?,
                    rhs: self.next_value(&mut parts)?,
                }
            }
            Rule::binary_inst => {
                let op = self.next_text(&mut parts)?;
                let op = BinaryOp::from_mnemonic(&op)
                    .ok_or_else(|| self.malformed(format!("unknown operator '{}'", op)))?;
                InstKind::Binary {
                    op,
                    lhs: self.next_value(&mut parts)?,
                    rhs: self.next_value(&mut parts)?,
                }
            }
            Rule::call_inst => {
                let callee = self.next_value(&mut parts)?;
                let args = match parts.next() {
                    Some(values) => self.values(values)?,
                    None => Vec::new(),
                };
                InstKind::Call { callee, args }
            }
            Rule::marker_inst => {
                let kind = self.next_text(&mut parts)?;
                let kind = MarkerKind::from_mnemonic(&kind)
                    .ok_or_else(|| self.malformed(format!("unknown marker '{}'", kind)))?;
                let args = match parts.next() {
                    Some(values) => self.values(values)?,
                    None => Vec::new(),
                };
                InstKind::Intrinsic(Intrinsic::Marker { kind, args })
            }
            Rule::lifetime_inst => {
                let which = self.next_text(&mut parts)?;
                let ptr = self.next_value(&mut parts)?;
                if which == "lifetime.start" {
                    InstKind::Intrinsic(Intrinsic::LifetimeStart(ptr))
                } else {
                    InstKind::Intrinsic(Intrinsic::LifetimeEnd(ptr))
                }
            }
            Rule::memcpy_inst => InstKind::Intrinsic(Intrinsic::MemCopy {
                dst: self.next_value(&mut parts)?,
                src: self.next_value(&mut parts)?,
                len: self.next_value(&mut parts)?,
            }),
            Rule::memmove_inst => InstKind::Intrinsic(Intrinsic::MemMove {
                dst: self.next_value(&mut parts)?,
                src: self.next_value(&mut parts)?,
                len: self.next_value(&mut parts)?,
            }),
            Rule::memset_inst => InstKind::Intrinsic(Intrinsic::MemSet {
                dst: self.next_value(&mut parts)?,
                value: self.next_value(&mut parts)?,
                len: self.next_value(&mut parts)?,
            }),
            Rule::jump_inst => InstKind::Terminator(Terminator::Jump(self.next_block(&mut parts)?)),
            Rule::branch_inst => InstKind::Terminator(Terminator::Branch {
                cond: self.next_value(&mut parts)?,
                then_block: self.next_block(&mut parts)?,
                else_block: self.next_block(&mut parts)?,
            }),
            Rule::ret_inst => InstKind::Terminator(Terminator::Return(
                parts.next().map(|p| self.value(p)).transpose()?,
            )),
            Rule::unreachable_inst => InstKind::Terminator(Terminator::Unreachable),
            other => return Err(self.malformed(format!("unexpected {:?}", other))),
        };

        Ok(kind)
    }

    fn next_value(&self, parts: &mut Pairs<'_, Rule>) -> Result<Value, ParseError> {
        let pair = parts
            .next()
            .ok_or_else(|| self.malformed("missing operand".into()))?;
        self.value(pair)
    }

    fn next_text(&self, parts: &mut Pairs<'_, Rule>) -> Result<String, ParseError> {
        parts
            .next()
            .map(|p| p.as_str().to_string())
            .ok_or_else(|| self.malformed("missing keyword".into()))
    }

    fn next_block(&self, parts: &mut Pairs<'_, Rule>) -> Result<BlockId, ParseError> {
        let label = parts
            .next()
            .ok_or_else(|| self.malformed("missing block label".into()))?;
        self.blocks
            .get(label.as_str())
            .copied()
            .ok_or_else(|| ParseError::UndefinedBlock {
                function: self.name.clone(),
                block: label.as_str().to_string(),
            })
    }

    fn values(&self, pair: Pair<'_, Rule>) -> Result<Vec<Value>, ParseError> {
        pair.into_inner().map(|p| self.value(p)).collect()
    }

    fn value(&self, pair: Pair<'_, Rule>) -> Result<Value, ParseError> {
        let inner = match pair.as_rule() {
            Rule::value => pair
                .into_inner()
                .next()
                .ok_or_else(|| self.malformed("empty operand".into()))?,
            _ => pair,
        };
        let text = inner.as_str();

        match inner.as_rule() {
            Rule::local_name => {
                self.locals
                    .get(strip_sigil(text))
                    .copied()
                    .ok_or_else(|| ParseError::UndefinedValue {
                        function: self.name.clone(),
                        name: text.to_string(),
                    })
            }
            Rule::global_name => {
                let program = self.func.program();
                let name = strip_sigil(text);
                if let Some(g) = program.global_by_name(name) {
                    Ok(Value::Global(g))
                } else if let Some(f) = program.function_by_name(name) {
                    Ok(Value::Func(f))
                } else {
                    Err(ParseError::UndefinedValue {
                        function: self.name.clone(),
                        name: text.to_string(),
                    })
                }
            }
            Rule::integer => text
                .parse::<i64>()
                .map(Value::Const)
                .map_err(|_| self.malformed(format!("integer out of range '{}'", text))),
            Rule::undef => Ok(Value::Undef),
            other => Err(self.malformed(format!("unexpected operand {:?}", other))),
        }
    }

    fn duplicate(&self, name: &str) -> ParseError {
        ParseError::DuplicateName {
            function: self.name.clone(),
            name: name.to_string(),
        }
    }

    fn malformed(&self, message: String) -> ParseError {
        ParseError::Malformed {
            function: self.name.clone(),
            message,
        }
    }
}
