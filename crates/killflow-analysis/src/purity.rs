use killflow_core::{FuncId, Program};

/// Side-effect classification of externally defined functions.
pub trait PurityOracle {
    /// Never writes memory.
    fn is_read_only(&self, func: FuncId) -> bool;
    /// Only accesses memory reachable from its pointer arguments.
    fn is_local(&self, func: FuncId) -> bool;
    /// Local, except for a hidden effect on process I/O state.
    fn is_semi_local(&self, func: FuncId) -> bool;
    fn read_only_formal_arg(&self, func: FuncId, arg: usize) -> bool;
    fn write_only_formal_arg(&self, func: FuncId, arg: usize) -> bool;
}

/// Reads the attributes written on declarations. Defined functions are never classified: their
/// bodies are searched instead.
#[derive(Debug, Clone, Copy)]
pub struct DeclarationPurity<'p> {
    program: &'p Program,
}

impl<'p> DeclarationPurity<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self { program }
    }

    fn declaration(&self, func: FuncId) -> Option<&'p killflow_core::Function> {
        let function = self.program.function(func);
        function.is_declaration().then_some(function)
    }
}

impl PurityOracle for DeclarationPurity<'_> {
    fn is_read_only(&self, func: FuncId) -> bool {
        self.declaration(func).map_or(false, |f| f.attrs.read_only)
    }

    fn is_local(&self, func: FuncId) -> bool {
        self.declaration(func).map_or(false, |f| f.attrs.local)
    }

    fn is_semi_local(&self, func: FuncId) -> bool {
        self.declaration(func).map_or(false, |f| f.attrs.semi_local)
    }

    fn read_only_formal_arg(&self, func: FuncId, arg: usize) -> bool {
        self.declaration(func).map_or(false, |f| {
            f.attrs.read_only || f.params.get(arg).map_or(false, |p| p.read_only)
        })
    }

    fn write_only_formal_arg(&self, func: FuncId, arg: usize) -> bool {
        self.declaration(func)
            .and_then(|f| f.params.get(arg))
            .map_or(false, |p| p.write_only)
    }
}
