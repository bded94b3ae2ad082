//! Best-effort avatar lookup by plain username.
//!
//! The webhook transmitter wants an avatar for the IRC user it is
//! impersonating, but all it has is a name. Resolution never guesses:
//! an ambiguous name yields nothing.

use crate::discord::state::{GuildState, MemberInfo};

/// Resolve a plain username to a unique member's avatar URL.
///
/// Exact case-sensitive match against nickname or username first;
/// if that yields nothing, a case-insensitive pass. More than one
/// match at either stage is ambiguous and returns `None`.
#[allow(dead_code)] // called by the external webhook transmitter
pub fn find_avatar(state: &dyn GuildState, username: &str) -> Option<String> {
    let members = state.members().ok()?;

    let found = unique_match(&members, |member| {
        member.nick.as_deref() == Some(username) || member.username == username
    })
    .or_else(|| {
        unique_match(&members, |member| {
            member
                .nick
                .as_deref()
                .is_some_and(|nick| nick.eq_ignore_ascii_case(username))
                || member.username.eq_ignore_ascii_case(username)
        })
    })?;

    found.avatar_url.clone()
}

/// Exactly-one match, or nothing.
#[allow(dead_code)]
fn unique_match<'a>(
    members: &'a [MemberInfo],
    predicate: impl Fn(&MemberInfo) -> bool,
) -> Option<&'a MemberInfo> {
    let mut found: Option<&MemberInfo> = None;
    for member in members.iter().filter(|m| predicate(m)) {
        if found.is_some() {
            return None;
        }
        found = Some(member);
    }
    found
}
