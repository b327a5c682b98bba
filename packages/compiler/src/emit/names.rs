//! Emitted-name encoding.
//!
//! User names are prefixed `__u_` so emitted identifiers cannot collide with
//! C keywords or runtime symbols; extern and pub top-level names keep their
//! original spelling, and compiler temporaries are `__tmp<n>`.

use once_cell::sync::Lazy;
use regex::Regex;

static LEGAL_C_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Replace anything a C identifier cannot carry with an underscore.
pub fn sanitize_identifier(name: &str) -> String {
    if LEGAL_C_IDENT.is_match(name) {
        return name.to_string();
    }
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

pub fn user_name(name: &str) -> String {
    format!("__u_{}", sanitize_identifier(name))
}

pub fn tmp_name(id: u32) -> String {
    format!("__tmp{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_names_pass_through() {
        assert_eq!(sanitize_identifier("foo_bar9"), "foo_bar9");
        assert_eq!(user_name("main"), "__u_main");
    }

    #[test]
    fn illegal_characters_become_underscores() {
        assert_eq!(sanitize_identifier("a-b"), "a_b");
    }

    #[test]
    fn temporaries() {
        assert_eq!(tmp_name(3), "__tmp3");
    }
}
