//! Maps a failed run to the process exit code the CLI returns: 0 success,
//! 1 generic failure, 2 configuration error, 3 Git error, 4 version-range
//! violation, 5 publication failure.

use std::fmt;

/// Synthetic error for outcomes that aren't a single propagated
/// [`nyx_core::Error`] — currently only the Publish phase's "some
/// services failed, the rest ran best-effort" case.
#[derive(Debug)]
pub struct PublicationFailed(pub String);

impl fmt::Display for PublicationFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for PublicationFailed {}

/// Process exit code for `err`. Walks the full error chain (not
/// just the outermost `anyhow::Context` wrapper) since command functions
/// attach `.context(...)` on top of the underlying [`nyx_core::Error`].
#[must_use]
pub fn code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<nyx_core::Error>() {
            return e.exit_code();
        }
        if cause.downcast_ref::<PublicationFailed>().is_some() {
            return 5;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_error_is_generic_failure() {
        let err = anyhow::anyhow!("boom");
        assert_eq!(code_for(&err), 1);
    }

    #[test]
    fn publication_failed_maps_to_five() {
        let err: anyhow::Error = PublicationFailed("svc failed".to_string()).into();
        assert_eq!(code_for(&err), 5);
    }

    #[test]
    fn context_wrapped_core_error_is_still_recognized() {
        let core_err: nyx_core::Error = nyx_core::ConfigError::NotFound.into();
        let err: anyhow::Error = anyhow::Error::from(core_err).context("failed to load configuration");
        assert_eq!(code_for(&err), 2);
    }
}
