/*! Fluent API for constructing programs.
 *
 * Tests and readers need to assemble functions without tracking arena ids by hand. The builders
 * handle id allocation, block membership and instruction sequencing, and collect misuse errors so
 * they can be reported once when the program is finished.
 */

pub mod function_builder;

pub use function_builder::FunctionBuilder;

use crate::entities::FuncId;
use crate::function::{Function, FunctionAttrs, Param};
use crate::program::{Global, Program};
use crate::values::Value;
use crate::{IrError, Result};

#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
    errors: Vec<IrError>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(&mut self, name: &str, len: Option<u64>, zero_init: bool) -> Result<Value> {
        let id = self.program.add_global(Global {
            name: name.to_string(),
            len,
            zero_init,
        })?;
        Ok(Value::Global(id))
    }

    pub fn declare(&mut self, name: &str, params: &[&str], attrs: FunctionAttrs) -> Result<FuncId> {
        let params = params.iter().map(|p| Param::new(*p)).collect();
        self.declare_with_params(name, params, attrs)
    }

    pub fn declare_with_params(
        &mut self,
        name: &str,
        params: Vec<Param>,
        attrs: FunctionAttrs,
    ) -> Result<FuncId> {
        let mut function = Function::new(name, params);
        function.attrs = attrs;
        self.program.add_function(function)
    }

    /// Registers a function signature; it stays a declaration until a block is added to it.
    pub fn function(&mut self, name: &str, params: &[&str]) -> Result<FuncId> {
        self.declare(name, params, FunctionAttrs::default())
    }

    pub fn body(&mut self, func: FuncId) -> FunctionBuilder<'_> {
        FunctionBuilder::new(self, func)
    }

    pub fn define(&mut self, name: &str, params: &[&str]) -> Result<FunctionBuilder<'_>> {
        let func = self.function(name, params)?;
        Ok(self.body(func))
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub(crate) fn program_mut(&mut self) -> &mut Program {
        &mut self.program
    }

    pub(crate) fn record_error(&mut self, error: IrError) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[IrError] {
        &self.errors
    }

    pub fn finish(self) -> Result<Program> {
        if let Some(first) = self.errors.into_iter().next() {
            return Err(first);
        }

        for (_, block) in self.program.blocks.iter() {
            let terminated = block
                .last_inst()
                .map_or(false, |i| self.program.kind(i).is_terminator());
            if !terminated {
                return Err(IrError::BuilderError(format!(
                    "block '{}' in @{} has no terminator",
                    block.name,
                    self.program.function(block.func).name
                )));
            }
        }

        Ok(self.program)
    }
}
