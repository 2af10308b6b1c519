use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitterConfig {
    pub use_colors: bool,
    pub indent_style: IndentStyle,
    pub verbosity: VerbosityLevel,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            use_colors: false,
            indent_style: IndentStyle::Spaces(2),
            verbosity: VerbosityLevel::Normal,
        }
    }
}

impl EmitterConfig {
    /// Colored output for an interactive terminal.
    pub fn for_terminal() -> Self {
        Self {
            use_colors: true,
            ..Self::default()
        }
    }

    pub fn with_verbosity(mut self, verbosity: VerbosityLevel) -> Self {
        self.verbosity = verbosity;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IndentStyle {
    Spaces(usize),
    Tabs,
}

impl IndentStyle {
    pub fn unit(&self) -> String {
        match self {
            IndentStyle::Spaces(n) => " ".repeat(*n),
            IndentStyle::Tabs => "\t".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerbosityLevel {
    Quiet,
    Normal,
    Verbose,
    Debug,
}

impl VerbosityLevel {
    /// Object extents and trip counts next to the entities they describe.
    pub fn should_print_facts(&self) -> bool {
        matches!(self, VerbosityLevel::Verbose | VerbosityLevel::Debug)
    }

    pub fn should_print_ids(&self) -> bool {
        matches!(self, VerbosityLevel::Debug)
    }

    pub fn should_print_counters(&self) -> bool {
        !matches!(self, VerbosityLevel::Quiet)
    }
}
