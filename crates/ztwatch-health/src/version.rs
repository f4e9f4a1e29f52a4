//! Client version check with a sticky alert flag.

use ztwatch_core::{Messages, Report, UNKNOWN_VERSION};

/// Compare a member's client version against the latest release.
///
/// Returns the report to emit (if any) and the new value of the
/// `version_alert_sent` flag. An unknown version never reports and
/// leaves the flag untouched.
pub fn check_version(
    messages: &Messages,
    name: &str,
    reported: Option<&str>,
    latest: &str,
    was_alert_sent: bool,
) -> (Option<Report>, bool) {
    let Some(version) = reported.filter(|v| *v != UNKNOWN_VERSION) else {
        return (None, was_alert_sent);
    };

    match (version == latest, was_alert_sent) {
        (false, false) => (
            Some(Report::problem(messages.version_outdated(name, version))),
            true,
        ),
        (true, true) => (
            Some(Report::recovery(messages.version_updated(name, version))),
            false,
        ),
        (_, sent) => (None, sent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ztwatch_core::ReportKind;

    const LATEST: &str = "1.14.2";

    fn check(reported: Option<&str>, sent: bool) -> (Option<Report>, bool) {
        check_version(&Messages::default(), "nas", reported, LATEST, sent)
    }

    #[test]
    fn outdated_reports_once() {
        let (report, sent) = check(Some("1.12.0"), false);
        let report = report.unwrap();
        assert_eq!(report.kind, ReportKind::Problem);
        assert_eq!(report.text, "🔧 nas: outdated version (1.12.0)");
        assert!(sent);

        let (report, sent) = check(Some("1.12.0"), sent);
        assert!(report.is_none());
        assert!(sent);
    }

    #[test]
    fn upgrade_after_alert_recovers() {
        let (report, sent) = check(Some(LATEST), true);
        let report = report.unwrap();
        assert_eq!(report.kind, ReportKind::Recovery);
        assert!(report.text.contains("version updated"));
        assert!(!sent);
    }

    #[test]
    fn current_without_alert_is_silent() {
        assert_eq!(check(Some(LATEST), false), (None, false));
    }

    #[test]
    fn unknown_version_never_reports() {
        for sent in [false, true] {
            assert_eq!(check(None, sent), (None, sent));
            assert_eq!(check(Some("N/A"), sent), (None, sent));
        }
    }
}
