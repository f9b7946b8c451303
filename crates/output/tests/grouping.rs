//! Integration tests for the grouping output pipeline

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use gantry_events::{
        BuildOperationRef, BuildOperationType, LogEvent, LogLevel, LogLevelChangeEvent,
        OperationId, OutputEvent, ProgressCompleteEvent, ProgressEvent, ProgressOperationId,
        ProgressStartEvent,
    };
    use gantry_output::{BatchOutputListener, GroupingOutputPipeline};
    use parking_lot::Mutex;

    #[derive(Clone, Debug)]
    enum Emitted {
        Single(OutputEvent),
        Batch(Vec<OutputEvent>),
    }

    #[derive(Default)]
    struct CollectingListener {
        records: Mutex<Vec<Emitted>>,
    }

    impl CollectingListener {
        fn records(&self) -> Vec<Emitted> {
            self.records.lock().clone()
        }
    }

    impl BatchOutputListener for CollectingListener {
        fn on_output(&self, event: OutputEvent) {
            self.records.lock().push(Emitted::Single(event));
        }

        fn on_batch(&self, events: Vec<OutputEvent>) {
            self.records.lock().push(Emitted::Batch(events));
        }
    }

    fn pipeline() -> (GroupingOutputPipeline, Arc<CollectingListener>) {
        let collector = Arc::new(CollectingListener::default());
        let pipeline =
            GroupingOutputPipeline::new(Arc::<CollectingListener>::clone(&collector));
        (pipeline, collector)
    }

    fn start(
        progress_id: i64,
        operation_id: i64,
        parent_id: Option<i64>,
        operation_type: BuildOperationType,
        description: &str,
    ) -> OutputEvent {
        OutputEvent::ProgressStart(
            ProgressStartEvent::new(
                ProgressOperationId::new(progress_id),
                Utc::now(),
                "gantry.test",
                description,
            )
            .with_build_operation(BuildOperationRef {
                id: OperationId::new(operation_id),
                parent_id: parent_id.map(OperationId::new),
                operation_type,
            }),
        )
    }

    fn task_start(progress_id: i64, operation_id: i64, description: &str) -> OutputEvent {
        start(
            progress_id,
            operation_id,
            None,
            BuildOperationType::Task,
            description,
        )
    }

    fn log(operation_id: Option<i64>, message: &str) -> OutputEvent {
        let mut event = LogEvent::new(Utc::now(), "gantry.test", LogLevel::Warn, message);
        if let Some(operation_id) = operation_id {
            event = event.with_operation(OperationId::new(operation_id));
        }
        OutputEvent::Log(event)
    }

    fn complete(progress_id: i64, description: &str) -> OutputEvent {
        OutputEvent::ProgressComplete(ProgressCompleteEvent::new(
            ProgressOperationId::new(progress_id),
            Utc::now(),
            "gantry.test",
            description,
            String::new(),
        ))
    }

    fn log_message(event: &OutputEvent) -> Option<&str> {
        match event {
            OutputEvent::Log(log) => Some(log.message.as_str()),
            _ => None,
        }
    }

    #[test]
    fn task_output_is_emitted_as_one_batch() {
        let (pipeline, collector) = pipeline();

        pipeline.on_output(task_start(1, 10, "Execute :foo"));
        pipeline.on_output(log(Some(10), "warning: foo is deprecated"));
        pipeline.on_output(complete(1, "Execute :foo"));

        let records = collector.records();
        assert_eq!(records.len(), 1);
        let Emitted::Batch(batch) = &records[0] else {
            panic!("expected one batch, got {records:?}");
        };
        assert_eq!(batch.len(), 5);
        assert_eq!(log_message(&batch[0]), Some("[Execute :foo]"));
        assert!(matches!(batch[1], OutputEvent::ProgressStart(_)));
        assert_eq!(log_message(&batch[2]), Some("warning: foo is deprecated"));
        assert!(matches!(batch[3], OutputEvent::ProgressComplete(_)));
        assert_eq!(log_message(&batch[4]), Some(""));

        // The synthetic header is rendered at quiet level.
        match &batch[0] {
            OutputEvent::Log(header) => assert_eq!(header.level, LogLevel::Quiet),
            other => panic!("expected the header log event, got {other:?}"),
        }
    }

    #[test]
    fn nested_child_output_groups_under_the_task() {
        let (pipeline, collector) = pipeline();

        pipeline.on_output(task_start(1, 10, "Execute :foo"));
        pipeline.on_output(start(
            2,
            20,
            Some(10),
            BuildOperationType::Uncategorized,
            "Snapshot inputs",
        ));
        pipeline.on_output(log(Some(20), "warning: stale inputs"));
        pipeline.on_output(complete(2, "Snapshot inputs"));
        pipeline.on_output(complete(1, "Execute :foo"));

        let records = collector.records();
        assert_eq!(records.len(), 1);
        let Emitted::Batch(batch) = &records[0] else {
            panic!("expected one batch, got {records:?}");
        };
        assert_eq!(batch.len(), 7);
        assert_eq!(log_message(&batch[0]), Some("[Execute :foo]"));
        assert!(matches!(batch[1], OutputEvent::ProgressStart(_)));
        assert!(matches!(batch[2], OutputEvent::ProgressStart(_)));
        // The warning is preserved in its original position.
        assert_eq!(log_message(&batch[3]), Some("warning: stale inputs"));
        assert!(matches!(batch[4], OutputEvent::ProgressComplete(_)));
        assert!(matches!(batch[5], OutputEvent::ProgressComplete(_)));
        assert_eq!(log_message(&batch[6]), Some(""));
    }

    #[test]
    fn empty_groups_are_dropped_silently() {
        let (pipeline, collector) = pipeline();

        pipeline.on_output(task_start(1, 10, "Execute :foo"));
        pipeline.on_output(complete(1, "Execute :foo"));

        assert!(collector.records().is_empty());
    }

    #[test]
    fn progress_bookkeeping_alone_does_not_make_a_group_renderable() {
        let (pipeline, collector) = pipeline();

        pipeline.on_output(task_start(1, 10, "Execute :foo"));
        pipeline.on_output(start(
            2,
            20,
            Some(10),
            BuildOperationType::Uncategorized,
            "Resolve",
        ));
        pipeline.on_output(OutputEvent::Progress(ProgressEvent::new(
            ProgressOperationId::new(2),
            Utc::now(),
            "gantry.test",
            "resolving",
        )));
        pipeline.on_output(complete(2, "Resolve"));
        pipeline.on_output(complete(1, "Execute :foo"));

        assert!(collector.records().is_empty());
    }

    #[test]
    fn end_of_build_flushes_open_groups_before_forwarding_end() {
        let (pipeline, collector) = pipeline();

        pipeline.on_output(task_start(1, 10, "Execute :foo"));
        pipeline.on_output(log(Some(10), "still going"));
        pipeline.on_output(OutputEvent::End);

        let records = collector.records();
        assert_eq!(records.len(), 2);
        let Emitted::Batch(batch) = &records[0] else {
            panic!("expected the flushed group first, got {records:?}");
        };
        assert_eq!(batch.len(), 4);
        assert_eq!(log_message(&batch[0]), Some("[Execute :foo]"));
        assert!(matches!(batch[1], OutputEvent::ProgressStart(_)));
        assert_eq!(log_message(&batch[2]), Some("still going"));
        assert_eq!(log_message(&batch[3]), Some(""));
        assert!(matches!(records[1], Emitted::Single(OutputEvent::End)));
    }

    #[test]
    fn flush_skips_the_separator_when_continuing_the_last_rendered_group() {
        let (pipeline, collector) = pipeline();

        pipeline.on_output(task_start(1, 10, "Execute :foo"));
        pipeline.on_output(log(Some(10), "first"));
        pipeline.on_output(OutputEvent::End);

        // The group buffer was reset to its header; more output appended to
        // the same group flushes without a separator.
        pipeline.on_output(log(Some(10), "second"));
        pipeline.on_output(OutputEvent::End);

        let records = collector.records();
        assert_eq!(records.len(), 4);
        let Emitted::Batch(first) = &records[0] else {
            panic!("expected a batch, got {records:?}");
        };
        assert_eq!(log_message(first.last().unwrap()), Some(""));

        let Emitted::Batch(second) = &records[2] else {
            panic!("expected a batch, got {records:?}");
        };
        assert_eq!(second.len(), 2);
        assert_eq!(log_message(&second[0]), Some("[Execute :foo]"));
        assert_eq!(log_message(&second[1]), Some("second"));
    }

    #[test]
    fn flush_emits_open_groups_in_insertion_order_with_separators() {
        let (pipeline, collector) = pipeline();

        pipeline.on_output(task_start(1, 10, "Execute :foo"));
        pipeline.on_output(task_start(2, 20, "Execute :bar"));
        pipeline.on_output(log(Some(10), "foo says"));
        pipeline.on_output(log(Some(20), "bar says"));
        pipeline.on_output(OutputEvent::End);

        let records = collector.records();
        assert_eq!(records.len(), 3);
        let Emitted::Batch(first) = &records[0] else {
            panic!("expected a batch, got {records:?}");
        };
        let Emitted::Batch(second) = &records[1] else {
            panic!("expected a batch, got {records:?}");
        };
        assert_eq!(log_message(&first[0]), Some("[Execute :foo]"));
        assert_eq!(log_message(first.last().unwrap()), Some(""));
        assert_eq!(log_message(&second[0]), Some("[Execute :bar]"));
        assert_eq!(log_message(second.last().unwrap()), Some(""));
        assert!(matches!(records[2], Emitted::Single(OutputEvent::End)));
    }

    #[test]
    fn group_closed_by_completion_can_reopen_via_flush_state() {
        let (pipeline, collector) = pipeline();

        pipeline.on_output(task_start(1, 10, "Execute :foo"));
        pipeline.on_output(log(Some(10), "before flush"));
        pipeline.on_output(OutputEvent::End);
        pipeline.on_output(log(Some(10), "after flush"));
        pipeline.on_output(complete(1, "Execute :foo"));

        let records = collector.records();
        assert_eq!(records.len(), 3);
        let Emitted::Batch(last) = &records[2] else {
            panic!("expected a closing batch, got {records:?}");
        };
        assert_eq!(log_message(&last[0]), Some("[Execute :foo]"));
        assert_eq!(log_message(&last[1]), Some("after flush"));
        assert!(matches!(last[2], OutputEvent::ProgressComplete(_)));
        assert_eq!(log_message(&last[3]), Some(""));
    }

    #[test]
    fn ungrouped_events_pass_through_in_arrival_order() {
        let (pipeline, collector) = pipeline();

        pipeline.on_output(log(None, "untagged"));
        pipeline.on_output(log(Some(99), "tagged but unknown"));
        pipeline.on_output(OutputEvent::LogLevelChange(LogLevelChangeEvent {
            new_level: LogLevel::Info,
        }));
        pipeline.on_output(OutputEvent::Flush);
        pipeline.on_output(complete(42, "never started"));

        let records = collector.records();
        assert_eq!(records.len(), 5);
        for record in &records {
            assert!(matches!(record, Emitted::Single(_)));
        }
        let Emitted::Single(first) = &records[0] else {
            unreachable!()
        };
        assert_eq!(log_message(first), Some("untagged"));
    }

    #[test]
    fn start_without_operation_id_is_forwarded() {
        let (pipeline, collector) = pipeline();

        pipeline.on_output(OutputEvent::ProgressStart(ProgressStartEvent::new(
            ProgressOperationId::new(7),
            Utc::now(),
            "gantry.test",
            "Downloading",
        )));

        let records = collector.records();
        assert_eq!(records.len(), 1);
        assert!(matches!(
            records[0],
            Emitted::Single(OutputEvent::ProgressStart(_))
        ));
    }

    #[test]
    fn events_are_neither_duplicated_nor_dropped_in_a_rendered_group() {
        let (pipeline, collector) = pipeline();

        pipeline.on_output(task_start(1, 10, "Execute :foo"));
        for index in 0..5 {
            pipeline.on_output(log(Some(10), &format!("line {index}")));
        }
        pipeline.on_output(complete(1, "Execute :foo"));

        let records = collector.records();
        assert_eq!(records.len(), 1);
        let Emitted::Batch(batch) = &records[0] else {
            panic!("expected one batch, got {records:?}");
        };
        // header + start + 5 logs + complete + trailer
        assert_eq!(batch.len(), 9);
        let lines: Vec<&str> = batch.iter().filter_map(log_message).collect();
        assert_eq!(
            lines,
            vec![
                "[Execute :foo]",
                "line 0",
                "line 1",
                "line 2",
                "line 3",
                "line 4",
                ""
            ]
        );
    }
}
