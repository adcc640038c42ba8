//! Shell resolution for `ShellMode::Auto` (spec §4.3: "the shell named by
//! the `SHELL` environment variable, falling back to `/bin/sh`").

/// Resolve the shell executable to invoke for `ShellMode::Auto`.
pub fn resolve_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_bin_sh_when_shell_unset() {
        // SAFETY: test-only env mutation, single-threaded within this test.
        let saved = std::env::var("SHELL").ok();
        unsafe {
            std::env::remove_var("SHELL");
        }
        assert_eq!(resolve_shell(), "/bin/sh");
        if let Some(value) = saved {
            unsafe {
                std::env::set_var("SHELL", value);
            }
        }
    }

    #[test]
    fn honors_shell_env_var_when_set() {
        let saved = std::env::var("SHELL").ok();
        unsafe {
            std::env::set_var("SHELL", "/bin/zsh");
        }
        assert_eq!(resolve_shell(), "/bin/zsh");
        match saved {
            Some(value) => unsafe { std::env::set_var("SHELL", value) },
            None => unsafe { std::env::remove_var("SHELL") },
        }
    }
}
