//! Integration tests for events

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use gantry_events::*;

    #[tokio::test]
    async fn test_event_sender_ext() {
        let (tx, mut rx) = channel();

        // Test emit helper
        tx.emit(OutputEvent::Log(LogEvent::new(
            Utc::now(),
            "gantry.test",
            LogLevel::Error,
            "test error",
        )));
        tx.emit(OutputEvent::Flush);

        let event1 = rx.recv().await.unwrap();
        assert!(matches!(event1, OutputEvent::Log { .. }));

        let event2 = rx.recv().await.unwrap();
        assert!(matches!(event2, OutputEvent::Flush));
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit(OutputEvent::End);
    }

    #[test]
    fn test_log_level_serialization() {
        let level = LogLevel::Quiet;
        let json = serde_json::to_string(&level).unwrap();
        assert_eq!(json, r#""quiet""#);
    }

    #[test]
    fn test_styled_text_round_trip() {
        let event = OutputEvent::StyledText(
            StyledTextEvent::new(
                Utc::now(),
                "gantry.test",
                LogLevel::Lifecycle,
                vec![
                    StyledSpan::new(TextStyle::Header, "BUILD "),
                    StyledSpan::new(TextStyle::Success, "SUCCESSFUL"),
                ],
            )
            .with_operation(OperationId::new(4)),
        );

        let json = serde_json::to_string(&event).unwrap();
        let decoded: OutputEvent = serde_json::from_str(&json).unwrap();

        match decoded {
            OutputEvent::StyledText(styled) => {
                assert_eq!(styled.spans.len(), 2);
                assert_eq!(styled.spans[1].text, "SUCCESSFUL");
                assert_eq!(styled.build_operation_id, Some(OperationId::new(4)));
            }
            _ => panic!("wrong event type"),
        }
    }
}
