/// Stages of one analysis run, in order. The discriminant indexes the
/// progress bars.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressPhase {
    Parsing,
    Resolving,
    Saving,
}

impl ProgressPhase {
    pub fn label(self) -> &'static str {
        match self {
            ProgressPhase::Parsing => "Parsing files",
            ProgressPhase::Resolving => "Resolving bindings",
            ProgressPhase::Saving => "Saving entities",
        }
    }
}

/// Sent by the analyzer and the CLI to the progress thread
#[derive(Clone, Debug)]
pub enum ProgressMessage {
    Started {
        phase: ProgressPhase,
        total: usize,
    },
    Progress {
        phase: ProgressPhase,
        current: usize,
        /// File just handled, relative to the root
        file: Option<String>,
    },
    Finished {
        phase: ProgressPhase,
    },
    /// A file that failed to parse
    Error(String),
}
