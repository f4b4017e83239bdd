mod raw {
    // See https://docs.rs/built/latest/built/index.html for the full list of constants.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Crate version such as 0.1.0
pub const GCSTATE_PKG_VERSION: &str = raw::PKG_VERSION;

/// Comma separated features enabled for this build
pub const GCSTATE_FEATURES: &str = raw::FEATURES_STR;

lazy_static! {
    /// Git version such as a96e8f991c91a81df51e7975849441f52fdbcdcc, or a96e8f991c91a81df51e7975849441f52fdbcdcc-dirty,
    /// or unknown-git-version if the crate is not built from a git repo.
    pub static ref GCSTATE_GIT_VERSION: &'static str = &GCSTATE_GIT_VERSION_STRING;

    // Owned string
    static ref GCSTATE_GIT_VERSION_STRING: String = match raw::GIT_COMMIT_HASH {
        Some(hash) => format!("{}{}", hash, if raw::GIT_DIRTY == Some(true) { "-dirty" } else { "" }),
        None => "unknown-git-version".to_string(),
    };
}
