use std::fmt;

use crate::data::VerificationResult;
use crate::errors::TriageError;
use crate::types::NormalizedPhrase;

/// Lifecycle of one keyword inside the pipeline.
///
/// `Pending -> Scraping -> Scraped -> Verifying -> Done | Failed`, with
/// `Scraping -> Failed` when nothing usable was scraped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskState {
    Pending,
    Scraping,
    Scraped,
    Verifying,
    Done,
    Failed,
}

impl TaskState {
    pub const fn as_str(self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Scraping => "scraping",
            TaskState::Scraped => "scraped",
            TaskState::Verifying => "verifying",
            TaskState::Done => "done",
            TaskState::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed)
    }

    fn allows(self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Pending, TaskState::Scraping)
                | (TaskState::Scraping, TaskState::Scraped)
                | (TaskState::Scraping, TaskState::Failed)
                | (TaskState::Scraped, TaskState::Verifying)
                | (TaskState::Verifying, TaskState::Done)
                | (TaskState::Verifying, TaskState::Failed)
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One keyword's trip through scrape and classification.
#[derive(Clone, Debug)]
pub struct VerificationTask {
    keyword: NormalizedPhrase,
    state: TaskState,
    result: Option<VerificationResult>,
}

impl VerificationTask {
    pub fn new(keyword: impl Into<NormalizedPhrase>) -> Self {
        Self {
            keyword: keyword.into(),
            state: TaskState::Pending,
            result: None,
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn result(&self) -> Option<&VerificationResult> {
        self.result.as_ref()
    }

    /// Move to a non-terminal state; states are never revisited.
    pub fn advance(&mut self, next: TaskState) -> Result<(), TriageError> {
        if next.is_terminal() || !self.state.allows(next) {
            return Err(self.invalid(next));
        }
        self.state = next;
        Ok(())
    }

    /// Move to a terminal state and attach the result.
    pub fn finish(
        &mut self,
        terminal: TaskState,
        result: VerificationResult,
    ) -> Result<(), TriageError> {
        if !terminal.is_terminal() || !self.state.allows(terminal) {
            return Err(self.invalid(terminal));
        }
        self.state = terminal;
        self.result = Some(result);
        Ok(())
    }

    /// Consume a terminal task into its keyword and result.
    pub fn into_result(self) -> Option<(NormalizedPhrase, VerificationResult)> {
        if !self.state.is_terminal() {
            return None;
        }
        let keyword = self.keyword;
        self.result.map(|result| (keyword, result))
    }

    fn invalid(&self, next: TaskState) -> TriageError {
        TriageError::InvalidTransition {
            keyword: self.keyword.clone(),
            from: self.state.as_str(),
            to: next.as_str(),
        }
    }
}
