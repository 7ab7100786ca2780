use std::sync::{Arc, Mutex, MutexGuard};

use msa_core::error::AppError;

/// Asks a human operator to allow one outbound command. Blocks until answered.
pub trait Prompter: Send + Sync {
    fn confirm(&self, command: &str) -> Result<bool, AppError>;
}

/// `y`/`yes` and the Portuguese `s`/`sim` approve; anything else rejects.
pub fn is_affirmative(answer: &str) -> bool {
    let a = answer.trim().to_lowercase();
    a.starts_with('y') || a.starts_with('s')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalMode {
    Interactive,
    AutoApprove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Locked,
    SessionApproved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalState {
    pub mode: ApprovalMode,
    pub session_approved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    AutoApproved,
    AlreadyApproved,
    ApprovedNow,
    Rejected,
}

impl Decision {
    pub fn is_approved(self) -> bool {
        !matches!(self, Decision::Rejected)
    }
}

/// Consent checkpoint for outbound web commands, shared for a whole session.
///
/// The lock is held while the operator is prompted, so at most one approval
/// decision is in flight at a time.
pub struct ApprovalGate {
    state: Mutex<ApprovalState>,
    prompter: Option<Arc<dyn Prompter>>,
}

impl ApprovalGate {
    pub fn new(mode: ApprovalMode, prompter: Option<Arc<dyn Prompter>>) -> Self {
        Self {
            state: Mutex::new(ApprovalState {
                mode,
                session_approved: false,
            }),
            prompter,
        }
    }

    pub fn interactive(prompter: Arc<dyn Prompter>) -> Self {
        Self::new(ApprovalMode::Interactive, Some(prompter))
    }

    pub fn auto_approve() -> Self {
        Self::new(ApprovalMode::AutoApprove, None)
    }

    fn lock(&self) -> MutexGuard<'_, ApprovalState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> ApprovalState {
        *self.lock()
    }

    pub fn state(&self) -> GateState {
        if self.lock().session_approved {
            GateState::SessionApproved
        } else {
            GateState::Locked
        }
    }

    pub fn set_mode(&self, mode: ApprovalMode) {
        self.lock().mode = mode;
    }

    /// Decide whether `command` may run. Prompts only while locked in interactive mode.
    pub fn request(&self, command: &str) -> Decision {
        let mut st = self.lock();
        if st.mode == ApprovalMode::AutoApprove {
            tracing::info!(command, "outbound command auto-approved");
            return Decision::AutoApproved;
        }
        if st.session_approved {
            tracing::debug!(command, "outbound command approved for this session");
            return Decision::AlreadyApproved;
        }

        let Some(prompter) = self.prompter.as_ref() else {
            tracing::warn!(command, "no approval prompter configured; command rejected");
            return Decision::Rejected;
        };
        match prompter.confirm(command) {
            Ok(true) => {
                st.session_approved = true;
                tracing::info!(command, "approval granted for this session");
                Decision::ApprovedNow
            }
            Ok(false) => {
                tracing::info!(command, "outbound command rejected by operator");
                Decision::Rejected
            }
            Err(e) => {
                tracing::warn!(command, error = %e, "approval prompt failed; command rejected");
                Decision::Rejected
            }
        }
    }

    /// Re-lock the gate for a new session.
    pub fn reset(&self) {
        let mut st = self.lock();
        if st.session_approved {
            tracing::info!("approval session reset");
        }
        st.session_approved = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affirmative_answers() {
        assert!(is_affirmative("y"));
        assert!(is_affirmative(" Yes\n"));
        assert!(is_affirmative("s"));
        assert!(is_affirmative("Sim"));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("nao"));
    }

    #[test]
    fn missing_prompter_rejects_while_locked() {
        let gate = ApprovalGate::new(ApprovalMode::Interactive, None);
        assert_eq!(gate.request("GET https://example.org"), Decision::Rejected);
        assert_eq!(gate.state(), GateState::Locked);
    }

    #[test]
    fn auto_approve_never_unlocks_the_session() {
        let gate = ApprovalGate::auto_approve();
        assert_eq!(gate.request("GET https://example.org"), Decision::AutoApproved);
        assert_eq!(gate.state(), GateState::Locked);
        assert_eq!(
            gate.snapshot(),
            ApprovalState {
                mode: ApprovalMode::AutoApprove,
                session_approved: false
            }
        );
    }
}
