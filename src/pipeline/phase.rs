/// Where the loop is within one iteration. The cycle has no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopPhase {
    Idle,
    Acquiring,
    Submitting,
    AwaitingResult,
    Updating,
}

impl LoopPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopPhase::Idle => "Idle",
            LoopPhase::Acquiring => "Acquiring",
            LoopPhase::Submitting => "Submitting",
            LoopPhase::AwaitingResult => "AwaitingResult",
            LoopPhase::Updating => "Updating",
        }
    }

    /// Phase that follows on the success path.
    pub fn next(&self) -> LoopPhase {
        match self {
            LoopPhase::Idle => LoopPhase::Acquiring,
            LoopPhase::Acquiring => LoopPhase::Submitting,
            LoopPhase::Submitting => LoopPhase::AwaitingResult,
            LoopPhase::AwaitingResult => LoopPhase::Updating,
            LoopPhase::Updating => LoopPhase::Idle,
        }
    }
}
