/// Deterministic budget for cooperatively slicing long enumerations.
///
/// Budgets are expressed in abstract "steps" rather than wall-clock time, so a
/// slice of work always covers the same lattice points regardless of machine
/// speed. The owner of the work decides how many steps one slice may take.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StepBudget {
    remaining: u32,
    consumed: u32,
}

impl StepBudget {
    pub fn new(steps: u32) -> Self {
        Self {
            remaining: steps,
            consumed: 0,
        }
    }

    /// A practically-unbounded budget (still deterministic).
    pub fn unlimited() -> Self {
        Self::new(u32::MAX)
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn consumed(&self) -> u32 {
        self.consumed
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Takes one step from the budget; `false` once it is spent.
    pub fn try_step(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.consumed += 1;
        true
    }
}
