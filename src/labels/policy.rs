use crate::database::models::Label;
use crate::middleware::auth::Identity;

/// Actions a caller can attempt against a label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelAction {
    Create,
    Read,
    Update,
    Delete,
}

/// Object-level authorization for a single label.
///
/// Create is open to any authenticated identity (the resource does not exist
/// yet); everything else is owner-only. Anonymous callers are denied every
/// action. Stateless and queried per request, never cached.
pub fn can_access(identity: &Identity, label: &Label, action: LabelAction) -> bool {
    let user = match identity.user() {
        Some(user) => user,
        None => return false,
    };

    match action {
        LabelAction::Create => true,
        LabelAction::Read | LabelAction::Update | LabelAction::Delete => {
            user.user_id == label.owner_id
        }
    }
}
