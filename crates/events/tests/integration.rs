//! Integration tests for events

#[cfg(test)]
mod tests {
    use relval_events::*;
    use relval_types::ValidationStatus;

    #[tokio::test]
    async fn test_event_sender_emit() {
        let (tx, mut rx) = channel();

        tx.emit_operation_failed("refresh-validations", "status command missing");
        tx.emit_debug("test debug");
        tx.emit_warning_with_context("could not remove /tmp/pkg", "permission denied");

        let first = rx.recv().await.unwrap();
        assert!(matches!(
            first.event,
            AppEvent::General(GeneralEvent::OperationFailed { .. })
        ));
        assert_eq!(first.meta.level, EventLevel::Error);
        assert_eq!(first.meta.source, EventSource::GENERAL);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.meta.level, EventLevel::Debug);

        let third = rx.recv().await.unwrap();
        assert_eq!(third.meta.level, EventLevel::Warn);
        assert!(matches!(
            third.event,
            AppEvent::General(GeneralEvent::Warning { context: Some(ref c), .. }) if c == "permission denied"
        ));
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_debug("ignored");
    }

    #[tokio::test]
    async fn test_validation_events_carry_correlation() {
        let (tx, mut rx) = channel();
        tx.emit(AppEvent::Validation(ValidationEvent::Finished {
            session_tag: "v1-Linux-x86_64-20140730210615".into(),
            status: ValidationStatus::DoneOk,
        }));
        tx.emit(AppEvent::Validation(ValidationEvent::Disappeared {
            session_tag: "v2-Linux-x86_64-20140730210615".into(),
        }));

        let finished = rx.recv().await.unwrap();
        assert_eq!(finished.meta.source, EventSource::RECONCILE);
        assert_eq!(finished.meta.level, EventLevel::Info);
        assert_eq!(
            finished.meta.correlation_id.as_deref(),
            Some("v1-Linux-x86_64-20140730210615")
        );

        let disappeared = rx.recv().await.unwrap();
        assert_eq!(disappeared.meta.level, EventLevel::Error);
    }

    #[test]
    fn test_event_levels() {
        let skipped = AppEvent::Catalog(CatalogEvent::LineSkipped {
            line_no: 3,
            reason: "too few fields".into(),
        });
        assert_eq!(skipped.log_level(), EventLevel::Warn);

        let queued = AppEvent::Validation(ValidationEvent::AlreadyQueued {
            tarball: "foo.tar.gz".into(),
        });
        assert_eq!(queued.log_level(), EventLevel::Warn);
        assert_eq!(queued.event_source(), EventSource::QUEUE);
    }

    #[test]
    fn test_event_serialization() {
        let event = AppEvent::Validation(ValidationEvent::Finished {
            session_tag: "tag".into(),
            status: ValidationStatus::DoneFail,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "validation");
        assert_eq!(json["event"]["type"], "finished");
        assert_eq!(json["event"]["status"], "DONE_FAIL");
    }
}
