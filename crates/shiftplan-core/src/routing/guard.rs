use crate::session::AuthPhase;

/// Outcome of the authentication guard for one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session is still initializing; show a placeholder and decide later.
    Interstitial,
    RedirectToLogin,
    RedirectToDefault,
    /// Resolve the location to its view.
    Proceed,
}

/// The guard transition table.
///
/// | phase         | login             | other           |
/// |---------------|-------------------|-----------------|
/// | Loading       | Interstitial      | Interstitial    |
/// | Anonymous     | Proceed           | RedirectToLogin |
/// | Authenticated | RedirectToDefault | Proceed         |
pub fn guard(phase: AuthPhase, is_login: bool) -> GuardDecision {
    match (phase, is_login) {
        (AuthPhase::Loading, _) => GuardDecision::Interstitial,
        (AuthPhase::Anonymous, true) | (AuthPhase::Authenticated, false) => GuardDecision::Proceed,
        (AuthPhase::Anonymous, false) => GuardDecision::RedirectToLogin,
        (AuthPhase::Authenticated, true) => GuardDecision::RedirectToDefault,
    }
}
