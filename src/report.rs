//! Run summary for the calling scripts
//!
//! Success prints one JSON object on stdout. Failure prints one line on
//! stderr naming the failed stage. The return value is the process exit code.

use serde::Serialize;
use std::io::Write;
use tracing::error;

use crate::error::ResetError;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

/// Report a finished run: `value` as pretty JSON on success, a diagnostic otherwise
pub fn report<T, O, E>(outcome: &Result<T, ResetError>, out: &mut O, err: &mut E) -> u8
where
    T: Serialize,
    O: Write,
    E: Write,
{
    match outcome {
        Ok(value) => report_success(value, out, err),
        Err(e) => report_failure(e, err),
    }
}

fn report_success<T: Serialize, O: Write, E: Write>(value: &T, out: &mut O, err: &mut E) -> u8 {
    let written = serde_json::to_string_pretty(value)
        .map_err(std::io::Error::from)
        .and_then(|json| writeln!(out, "{json}"))
        .and_then(|()| out.flush());

    match written {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            error!(error = %e, "Failed to write summary");
            let _ = writeln!(err, "error: failed to write summary: {e}");
            EXIT_FAILURE
        }
    }
}

fn report_failure<E: Write>(failure: &ResetError, err: &mut E) -> u8 {
    let _ = writeln!(err, "error: {} stage failed: {failure}", failure.stage());
    EXIT_FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentitySet;
    use std::path::PathBuf;

    fn sample_ids() -> IdentitySet {
        IdentitySet {
            machine_id: "1".repeat(64),
            mac_machine_id: "2".repeat(64),
            dev_device_id: "3b241101-e2bb-4255-8caf-4136c566a962".into(),
            sqm_id: "6ec0bd7f-11c0-43da-975e-2a8ad9ebae0b".into(),
        }
    }

    #[test]
    fn test_success_prints_json_object() {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let code = report(&Ok(sample_ids()), &mut out, &mut err);

        assert_eq!(code, EXIT_SUCCESS);
        assert!(err.is_empty());
        let printed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let object = printed.as_object().unwrap();
        let mut names: Vec<&str> = object.keys().map(String::as_str).collect();
        names.sort_unstable();
        assert_eq!(names, ["devDeviceId", "macMachineId", "machineId", "sqmId"]);
        assert_eq!(printed["sqmId"], "6ec0bd7f-11c0-43da-975e-2a8ad9ebae0b");
    }

    #[test]
    fn test_failure_prints_one_line_with_stage() {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let outcome: Result<IdentitySet, ResetError> = Err(ResetError::ConfigWriteFailed {
            path: PathBuf::from("/x/storage.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        });
        let code = report(&outcome, &mut out, &mut err);

        assert_eq!(code, EXIT_FAILURE);
        assert!(out.is_empty());
        let text = String::from_utf8(err).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("error: save stage failed:"));
        assert!(text.contains("/x/storage.json"));
    }
}
