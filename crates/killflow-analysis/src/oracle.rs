use crate::budget::QueryBudget;
use killflow_core::{DominanceProvider, InstId, Loop, Program, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AliasResult {
    NoAlias,
    MayAlias,
    MustAlias,
}

/// Whether one operation may read (`Ref`) or write (`Mod`) memory accessed by another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModRefResult {
    NoModRef,
    Ref,
    Mod,
    ModRef,
}

impl ModRefResult {
    const REF: u8 = 0b01;
    const MOD: u8 = 0b10;

    fn bits(self) -> u8 {
        match self {
            ModRefResult::NoModRef => 0,
            ModRefResult::Ref => Self::REF,
            ModRefResult::Mod => Self::MOD,
            ModRefResult::ModRef => Self::REF | Self::MOD,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & (Self::REF | Self::MOD) {
            0 => ModRefResult::NoModRef,
            Self::REF => ModRefResult::Ref,
            Self::MOD => ModRefResult::Mod,
            _ => ModRefResult::ModRef,
        }
    }

    pub fn from_access(reads: bool, writes: bool) -> Self {
        let mut bits = 0;
        if reads {
            bits |= Self::REF;
        }
        if writes {
            bits |= Self::MOD;
        }
        Self::from_bits(bits)
    }

    pub fn may_ref(self) -> bool {
        self.bits() & Self::REF != 0
    }

    pub fn may_mod(self) -> bool {
        self.bits() & Self::MOD != 0
    }

    pub fn without_ref(self) -> Self {
        Self::from_bits(self.bits() & !Self::REF)
    }

    pub fn without_mod(self) -> Self {
        Self::from_bits(self.bits() & !Self::MOD)
    }
}

impl BitOr for ModRefResult {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self::from_bits(self.bits() | rhs.bits())
    }
}

impl BitAnd for ModRefResult {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self::from_bits(self.bits() & rhs.bits())
    }
}

impl fmt::Display for ModRefResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ModRefResult::NoModRef => "NoModRef",
            ModRefResult::Ref => "Ref",
            ModRefResult::Mod => "Mod",
            ModRefResult::ModRef => "ModRef",
        };
        f.write_str(text)
    }
}

/// Iteration of the first operation relative to the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalRelation {
    Before,
    Same,
    After,
}

impl TemporalRelation {
    pub fn reversed(self) -> Self {
        match self {
            TemporalRelation::Before => TemporalRelation::After,
            TemporalRelation::Same => TemporalRelation::Same,
            TemporalRelation::After => TemporalRelation::Before,
        }
    }
}

impl fmt::Display for TemporalRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TemporalRelation::Before => "Before",
            TemporalRelation::Same => "Same",
            TemporalRelation::After => "After",
        };
        f.write_str(text)
    }
}

/// A layer of the alias-analysis stack.
pub trait AliasOracle {
    fn name(&self) -> &'static str;

    fn alias(&mut self, p1: Value, p2: Value) -> AliasResult;

    /// Does `i1`, executing in the iteration given by `rel` relative to `i2`, read or write
    /// memory that `i2` accesses?
    fn modref(
        &mut self,
        i1: InstId,
        rel: TemporalRelation,
        i2: InstId,
        lp: Option<&Loop>,
    ) -> ModRefResult;
}

/// Proofs that memory is definitely overwritten around a program point.
///
/// Every query is bounded by `lp` when given: the dominance walk never leaves the loop. A `false`
/// answer only means "not proven".
pub trait KillProver<'p> {
    fn program(&self) -> &'p Program;

    fn dominance(&self) -> &'p dyn DominanceProvider;

    fn pointer_killed_before(
        &mut self,
        lp: Option<&Loop>,
        ptr: Value,
        before: InstId,
        also_check_aggregate: bool,
        budget: &QueryBudget,
    ) -> bool;

    fn pointer_killed_after(
        &mut self,
        lp: Option<&Loop>,
        ptr: Value,
        after: InstId,
        also_check_aggregate: bool,
        budget: &QueryBudget,
    ) -> bool;

    fn pointer_killed_between(
        &mut self,
        lp: Option<&Loop>,
        ptr: Value,
        after: InstId,
        before: InstId,
        also_check_aggregate: bool,
        budget: &QueryBudget,
    ) -> bool;

    fn aggregate_killed_before(
        &mut self,
        lp: Option<&Loop>,
        object: Value,
        before: InstId,
        budget: &QueryBudget,
    ) -> bool;

    fn aggregate_killed_after(
        &mut self,
        lp: Option<&Loop>,
        object: Value,
        after: InstId,
        budget: &QueryBudget,
    ) -> bool;

    fn aggregate_killed_between(
        &mut self,
        lp: Option<&Loop>,
        object: Value,
        after: InstId,
        before: InstId,
        budget: &QueryBudget,
    ) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modref_bit_operations() {
        assert_eq!(ModRefResult::Ref | ModRefResult::Mod, ModRefResult::ModRef);
        assert_eq!(ModRefResult::ModRef & ModRefResult::Ref, ModRefResult::Ref);
        assert_eq!(ModRefResult::ModRef.without_mod(), ModRefResult::Ref);
        assert_eq!(ModRefResult::ModRef.without_ref(), ModRefResult::Mod);
        assert_eq!(ModRefResult::Mod.without_mod(), ModRefResult::NoModRef);
        assert!(ModRefResult::ModRef.may_ref() && ModRefResult::ModRef.may_mod());
        assert!(!ModRefResult::NoModRef.may_ref());
        assert_eq!(ModRefResult::from_access(true, false), ModRefResult::Ref);
    }

    #[test]
    fn test_relation_reversal() {
        assert_eq!(TemporalRelation::Before.reversed(), TemporalRelation::After);
        assert_eq!(TemporalRelation::Same.reversed(), TemporalRelation::Same);
    }
}
