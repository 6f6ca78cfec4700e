use std::fmt;

/// What the user chose at a breakpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakPointAction {
    Continue,
    Skip,
    StepOver,
    StepIn,
    Interact,
    Quit,
    /// Shown instead of step-over after a command ran; behaves like step-over
    StepToNext,
}

impl BreakPointAction {
    pub fn key(self) -> &'static str {
        match self {
            Self::Continue => "c",
            Self::Skip => "s",
            Self::StepOver | Self::StepToNext => "d",
            Self::StepIn => "t",
            Self::Interact => "i",
            Self::Quit => "q",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Skip => "skip",
            Self::StepOver => "step over",
            Self::StepIn => "step in",
            Self::Interact => "interact",
            Self::Quit => "quit",
            Self::StepToNext => "step to next",
        }
    }

    /// Step-to-next is only a label; it acts as step-over
    pub fn normalized(self) -> Self {
        match self {
            Self::StepToNext => Self::StepOver,
            other => other,
        }
    }
}

impl fmt::Display for BreakPointAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Ordered actions offered at one prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceSet {
    actions: Vec<BreakPointAction>,
}

impl ChoiceSet {
    pub fn new(actions: Vec<BreakPointAction>) -> Self {
        Self { actions }
    }

    /// Choices before a command runs
    pub fn before(offer_step_in: bool) -> Self {
        let mut actions = Vec::with_capacity(6);
        if offer_step_in {
            actions.push(BreakPointAction::StepIn);
        }
        actions.extend([
            BreakPointAction::Skip,
            BreakPointAction::StepOver,
            BreakPointAction::Continue,
            BreakPointAction::Interact,
            BreakPointAction::Quit,
        ]);
        Self::new(actions)
    }

    /// Choices after a command ran
    pub fn after() -> Self {
        Self::new(vec![
            BreakPointAction::StepToNext,
            BreakPointAction::Continue,
            BreakPointAction::Interact,
            BreakPointAction::Quit,
        ])
    }

    /// Choices at the end of the main flow
    pub fn at_end() -> Self {
        Self::new(vec![
            BreakPointAction::Continue,
            BreakPointAction::Interact,
            BreakPointAction::Quit,
        ])
    }

    /// Choices before the file part of a file+flow command
    pub fn inside_file_and_flow() -> Self {
        Self::before(false)
    }

    pub fn keys(&self) -> Vec<String> {
        self.actions.iter().map(|a| a.key().to_string()).collect()
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.actions
            .iter()
            .map(|a| a.description().to_string())
            .collect()
    }

    pub fn contains(&self, action: BreakPointAction) -> bool {
        self.actions.contains(&action)
    }

    /// Match user input against the offered keys, case-insensitively
    pub fn resolve(&self, input: &str) -> Option<BreakPointAction> {
        let input = input.trim().to_ascii_lowercase();
        self.actions.iter().copied().find(|a| a.key() == input)
    }
}
