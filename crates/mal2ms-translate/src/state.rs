use std::fmt;

/// States of the line automaton, in the order a MAL program passes them.
///
/// The automaton only moves forward. A state that does not consume a line
/// hands it to the next state within the same step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParseState {
    SkipPrologueComments,
    SkipQueryFunctionHeader,
    ProcessAssignments,
    ProcessResultDeclaration,
    SkipQueryFunctionFooter,
    SkipEpilogueComments,
}

impl ParseState {
    pub fn name(self) -> &'static str {
        match self {
            ParseState::SkipPrologueComments => "SkipPrologueComments",
            ParseState::SkipQueryFunctionHeader => "SkipQueryFunctionHeader",
            ParseState::ProcessAssignments => "ProcessAssignments",
            ParseState::ProcessResultDeclaration => "ProcessResultDeclaration",
            ParseState::SkipQueryFunctionFooter => "SkipQueryFunctionFooter",
            ParseState::SkipEpilogueComments => "SkipEpilogueComments",
        }
    }

    /// Whether the input may end in this state. A program cut off after its
    /// assignments still translates, without result columns.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ParseState::ProcessAssignments | ParseState::SkipEpilogueComments
        )
    }
}

impl fmt::Display for ParseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        let terminal: Vec<ParseState> = [
            ParseState::SkipPrologueComments,
            ParseState::SkipQueryFunctionHeader,
            ParseState::ProcessAssignments,
            ParseState::ProcessResultDeclaration,
            ParseState::SkipQueryFunctionFooter,
            ParseState::SkipEpilogueComments,
        ]
        .into_iter()
        .filter(|s| s.is_terminal())
        .collect();
        assert_eq!(
            terminal,
            vec![ParseState::ProcessAssignments, ParseState::SkipEpilogueComments]
        );
    }
}
