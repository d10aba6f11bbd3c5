//! Connection handshake and discovery literals, and the join acceptance
//! rules.

/// Literal key the initiator must present on connect.
pub const JOIN_KEY: &str = "WEREWOLF_KEY";

/// Literal prefix of an unconnected discovery probe.
pub const DISCOVERY_MAGIC: &str = "WEREWOLF_DISCOVERY";

/// Why a join request was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinRejection {
    /// The presented key did not match [`JOIN_KEY`].
    BadKey,
    /// The name duplicates a connected player's name.
    NameTaken,
    /// The name matches the responder's own.
    NameIsOwn,
    /// The game has already left the lobby.
    GameInProgress,
}

impl std::fmt::Display for JoinRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadKey => f.write_str("bad join key"),
            Self::NameTaken => f.write_str("name already taken"),
            Self::NameIsOwn => f.write_str("name matches the host's own"),
            Self::GameInProgress => f.write_str("game already in progress"),
        }
    }
}

impl std::error::Error for JoinRejection {}

/// Strip the local "(Me)" marker some displays append, then trim.
fn canonical(name: &str) -> &str {
    name.strip_suffix("(Me)").map_or(name, str::trim_end)
}

fn same_name(a: &str, b: &str) -> bool {
    canonical(a).eq_ignore_ascii_case(canonical(b))
}

/// Decide whether a join request is acceptable. Name comparison is
/// case-insensitive and ignores a local "(Me)" suffix.
///
/// # Errors
///
/// Returns the first matching [`JoinRejection`].
pub fn validate_join<'a>(
    key: &str,
    name: &str,
    own_name: &str,
    existing: impl IntoIterator<Item = &'a str>,
    in_lobby: bool,
) -> Result<(), JoinRejection> {
    if key != JOIN_KEY {
        return Err(JoinRejection::BadKey);
    }
    if !in_lobby {
        return Err(JoinRejection::GameInProgress);
    }
    if same_name(name, own_name) {
        return Err(JoinRejection::NameIsOwn);
    }
    if existing.into_iter().any(|taken| same_name(name, taken)) {
        return Err(JoinRejection::NameTaken);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_fresh_name() {
        assert_eq!(
            validate_join(JOIN_KEY, "mina", "host", ["rook", "pip"], true),
            Ok(())
        );
    }

    #[test]
    fn test_rejects_bad_key() {
        assert_eq!(
            validate_join("WRONG_KEY", "mina", "host", [], true),
            Err(JoinRejection::BadKey)
        );
    }

    #[test]
    fn test_rejects_mid_game_join() {
        assert_eq!(
            validate_join(JOIN_KEY, "mina", "host", [], false),
            Err(JoinRejection::GameInProgress)
        );
    }

    #[test]
    fn test_rejects_duplicate_case_insensitive() {
        assert_eq!(
            validate_join(JOIN_KEY, "MINA", "host", ["mina"], true),
            Err(JoinRejection::NameTaken)
        );
    }

    #[test]
    fn test_strips_me_suffix() {
        assert_eq!(
            validate_join(JOIN_KEY, "rook", "host", ["rook (Me)"], true),
            Err(JoinRejection::NameTaken)
        );
    }

    #[test]
    fn test_rejects_own_name() {
        assert_eq!(
            validate_join(JOIN_KEY, "Host", "host", [], true),
            Err(JoinRejection::NameIsOwn)
        );
    }
}
