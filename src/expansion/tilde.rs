//! Tilde Expansion
//!
//! `~` expands to `$HOME` (passwd-database fallback), `~user` to that
//! user's home directory. Unknown users leave the text untouched.

use crate::core::state::ShellState;

pub fn expand_tilde(state: &ShellState, user: Option<&str>) -> String {
    match user {
        None => match state.scopes.get_string("HOME") {
            Some(home) if !home.is_empty() => home,
            _ => passwd_home_for_uid().unwrap_or_else(|| "~".to_string()),
        },
        Some(user) => passwd_home_for_name(user).unwrap_or_else(|| format!("~{}", user)),
    }
}

fn passwd_home_for_uid() -> Option<String> {
    let uid = nix::unistd::Uid::current();
    let user = nix::unistd::User::from_uid(uid).ok()??;
    Some(user.dir.to_string_lossy().into_owned())
}

fn passwd_home_for_name(name: &str) -> Option<String> {
    let user = nix::unistd::User::from_name(name).ok()??;
    Some(user.dir.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_variable_wins() {
        let mut state = ShellState::new();
        state.scopes.set_scalar("HOME", "/custom/home", false).unwrap();
        assert_eq!(expand_tilde(&state, None), "/custom/home");
    }

    #[test]
    fn unknown_user_left_alone() {
        let state = ShellState::new();
        assert_eq!(
            expand_tilde(&state, Some("no-such-user-zzz")),
            "~no-such-user-zzz"
        );
    }
}
