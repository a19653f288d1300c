//! Reply-to address scheme for email-based submissions.
//!
//! Reminder emails carry `reply_to = update-<user_id>-<team_id>@<domain>`,
//! so an inbound reply identifies both the member and the team without any
//! sender lookup. Team ids are hyphen-free hex tokens, so the rightmost
//! hyphen in the local part is always the user/team separator.

/// The user and team a reply address resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    pub user_id: String,
    pub team_id: String,
}

/// Build the reply-to address placed on reminder emails.
pub fn encode_reply_address(user_id: &str, team_id: &str, domain: &str) -> String {
    format!("update-{user_id}-{team_id}@{domain}")
}

/// Parse an inbound recipient address back into its target. Returns `None`
/// for addresses not produced by [`encode_reply_address`].
pub fn parse_reply_address(address: &str) -> Option<ReplyTarget> {
    let (local, _domain) = address.split_once('@')?;
    let rest = local.strip_prefix("update-")?;
    let (user_id, team_id) = rest.rsplit_once('-')?;
    if user_id.is_empty() || team_id.is_empty() {
        return None;
    }
    Some(ReplyTarget {
        user_id: user_id.to_string(),
        team_id: team_id.to_string(),
    })
}
