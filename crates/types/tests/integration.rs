//! Integration tests for types

#[cfg(test)]
mod tests {
    use relval_types::*;

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ValidationStatus::DoneOk).unwrap();
        assert_eq!(json, r#""DONE_OK""#);

        let deserialized: ValidationStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, ValidationStatus::DoneOk);
    }

    #[test]
    fn test_poll_outcome_serialization() {
        let json = serde_json::to_value(PollOutcome::Finished(ValidationStatus::DoneFail)).unwrap();
        assert_eq!(json["outcome"], "finished");
        assert_eq!(json["status"], "DONE_FAIL");
    }

    #[test]
    fn test_full_lifecycle() {
        let package = PackageRecord::from_catalog_line(
            "aliroot-v5-05-Rev-01-Linux-x86_64-2.6-gnu-4.1.2.tar.gz AliRoot v5-05-Rev-01 \
             Linux-x86_64-2.6-gnu-4.1.2 VO_ALICE@AliRoot::v5-05-Rev-01 VO_ALICE@ROOT::v5-34-08",
        )
        .unwrap();
        assert_eq!(package.platform.as_deref(), Some("Linux"));
        assert_eq!(package.arch.as_deref(), Some("x86_64-2.6-gnu-4.1.2"));
        assert_eq!(package.modulefile_deps(), "ROOT/v5-34-08");

        let mut validation = Validation {
            id: 3,
            package,
            inserted: Timestamp::now(),
            started: None,
            ended: None,
            status: ValidationStatus::Queued,
        };
        validation.start(Timestamp::now()).unwrap();
        let map = StatusCodeMap::new(100, 101, 102, 103).unwrap();
        let polled = map.lookup(103).unwrap();
        let outcome = validation.apply_poll(polled, Timestamp::now()).unwrap();
        assert_eq!(outcome, PollOutcome::Finished(ValidationStatus::DoneFail));
        assert!(validation.describe("http://host").contains("DONE_FAIL"));
    }
}
