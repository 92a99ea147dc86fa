//! Submission status shown on the form's submit control.

use std::fmt;

/// Stage of a submission that talks to an external collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Converting,
    Uploading,
    Generating,
}

impl Stage {
    /// Status entered when this stage starts.
    pub fn status(self) -> Status {
        match self {
            Stage::Converting => Status::Converting,
            Stage::Uploading => Status::Uploading,
            Stage::Generating => Status::Generating,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Converting => "converting",
            Stage::Uploading => "uploading",
            Stage::Generating => "transcribing",
        })
    }
}

/// Progress of the current submission.
///
/// A successful run moves strictly forward through
/// `Waiting -> Converting -> Uploading -> Generating -> Success`.
/// Any in-flight stage may instead end in `Failed`. Both `Success` and
/// `Failed` are terminal: there is no way back to `Waiting`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Waiting,
    Converting,
    Uploading,
    Generating,
    Success,
    Failed { stage: Stage, reason: String },
}

impl Status {
    /// Label rendered on the submit control.
    pub fn label(&self) -> String {
        match self {
            Status::Waiting => "Upload video".to_string(),
            Status::Converting => "Converting...".to_string(),
            Status::Uploading => "Uploading...".to_string(),
            Status::Generating => "Transcribing...".to_string(),
            Status::Success => "Success!".to_string(),
            Status::Failed { stage, reason } => format!("Failed while {stage}: {reason}"),
        }
    }

    /// Whether the submit control (and the prompt input) accept interaction.
    pub fn accepts_input(&self) -> bool {
        matches!(self, Status::Waiting)
    }

    /// Whether no further transitions can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Success | Status::Failed { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: &Status) -> bool {
        match (self, next) {
            (Status::Waiting, Status::Converting)
            | (Status::Converting, Status::Uploading)
            | (Status::Uploading, Status::Generating)
            | (Status::Generating, Status::Success) => true,
            (Status::Converting, Status::Failed { stage, .. }) => *stage == Stage::Converting,
            (Status::Uploading, Status::Failed { stage, .. }) => *stage == Stage::Uploading,
            (Status::Generating, Status::Failed { stage, .. }) => *stage == Stage::Generating,
            _ => false,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
