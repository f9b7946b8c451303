//! The grouping state machine
//!
//! Events arrive in strict order under a single mutex. Start events for
//! grouping operations open a buffer; renderable and progress events beneath
//! an open group are appended to it by walking the operation-parent forest;
//! completing a group emits its buffer as one downstream batch. End-of-output
//! flushes every open group before it is forwarded itself.

use std::collections::HashMap;

use chrono::Utc;
use gantry_events::{
    LogEvent, LogLevel, OperationId, OutputEvent, ProgressCompleteEvent, ProgressOperationId,
    ProgressStartEvent,
};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::listener::BatchOutputListener;

/// Reorders the output stream so that everything produced beneath a grouping
/// operation renders as one contiguous block.
pub struct GroupingOutputPipeline {
    downstream: Arc<dyn BatchOutputListener>,
    state: Mutex<GroupingState>,
}

#[derive(Default)]
struct GroupingState {
    /// Maps progress and complete events back to the operation of their
    /// start event.
    progress_to_operation: HashMap<ProgressOperationId, OperationId>,
    /// Hierarchy of all seen build operation ids, so output of child
    /// operations is grouped under their grouping ancestor.
    operation_parents: HashMap<OperationId, Option<OperationId>>,
    /// Groups that are in progress and have not been completed, in insertion
    /// order.
    groups: Vec<OutputGroup>,
    last_rendered: Option<OperationId>,
}

struct OutputGroup {
    operation_id: OperationId,
    events: Vec<OutputEvent>,
}

impl GroupingOutputPipeline {
    #[must_use]
    pub fn new(downstream: Arc<dyn BatchOutputListener>) -> Self {
        Self {
            downstream,
            state: Mutex::new(GroupingState::default()),
        }
    }

    /// Dispatch one event, forwarding or buffering it.
    pub fn on_output(&self, event: OutputEvent) {
        let mut state = self.state.lock();
        match event {
            OutputEvent::End => {
                self.flush_all(&mut state);
                self.downstream.on_output(OutputEvent::End);
            }
            OutputEvent::ProgressStart(start) => self.on_start(&mut state, start),
            OutputEvent::Progress(progress) => {
                let operation_id = state
                    .progress_to_operation
                    .get(&progress.progress_operation_id)
                    .copied();
                self.group_or_forward(&mut state, operation_id, OutputEvent::Progress(progress));
            }
            OutputEvent::ProgressComplete(complete) => self.on_complete(&mut state, complete),
            OutputEvent::Log(log) => {
                let operation_id = log.build_operation_id;
                self.group_or_forward(&mut state, operation_id, OutputEvent::Log(log));
            }
            OutputEvent::StyledText(text) => {
                let operation_id = text.build_operation_id;
                self.group_or_forward(&mut state, operation_id, OutputEvent::StyledText(text));
            }
            passthrough @ (OutputEvent::LogLevelChange(_) | OutputEvent::Flush) => {
                self.downstream.on_output(passthrough);
            }
        }
    }

    fn on_start(&self, state: &mut GroupingState, start: ProgressStartEvent) {
        let Some(operation_id) = start.build_operation_id else {
            self.downstream.on_output(OutputEvent::ProgressStart(start));
            return;
        };

        state
            .operation_parents
            .insert(operation_id, start.parent_build_operation_id);
        state
            .progress_to_operation
            .insert(start.progress_operation_id, operation_id);

        if start.operation_type.is_grouping() {
            let header = LogEvent::new(
                start.timestamp,
                start.category.clone(),
                LogLevel::Quiet,
                format!("[{}]", start.description),
            );
            state.groups.push(OutputGroup {
                operation_id,
                events: vec![OutputEvent::Log(header), OutputEvent::ProgressStart(start)],
            });
        } else {
            self.group_or_forward(state, Some(operation_id), OutputEvent::ProgressStart(start));
        }
    }

    fn on_complete(&self, state: &mut GroupingState, complete: ProgressCompleteEvent) {
        let operation_id = state
            .progress_to_operation
            .get(&complete.progress_operation_id)
            .copied();

        let own_group = operation_id.and_then(|id| {
            state
                .groups
                .iter()
                .position(|group| group.operation_id == id)
        });

        if let Some(index) = own_group {
            // Render the group if complete.
            let group = state.groups.remove(index);
            if has_renderable_events(&group.events) {
                let trailer = LogEvent::new(
                    complete.timestamp,
                    complete.category.clone(),
                    LogLevel::Quiet,
                    String::new(),
                );
                let mut batch = group.events;
                batch.push(OutputEvent::ProgressComplete(complete));
                // Visually separate the group with an empty line.
                batch.push(OutputEvent::Log(trailer));
                self.downstream.on_batch(batch);
                state.last_rendered = Some(group.operation_id);
            }
        } else if let Some(index) = group_index(state, operation_id) {
            // Add to the enclosing group if possible.
            state.groups[index]
                .events
                .push(OutputEvent::ProgressComplete(complete));
        } else {
            // Otherwise just forward the event.
            self.downstream
                .on_output(OutputEvent::ProgressComplete(complete));
        }
    }

    fn group_or_forward(
        &self,
        state: &mut GroupingState,
        operation_id: Option<OperationId>,
        event: OutputEvent,
    ) {
        match group_index(state, operation_id) {
            Some(index) => state.groups[index].events.push(event),
            None => self.downstream.on_output(event),
        }
    }

    /// Flush every open non-empty group in insertion order, resetting each
    /// flushed buffer to its header so a later flush can continue the group.
    fn flush_all(&self, state: &mut GroupingState) {
        let mut last_rendered = state.last_rendered;
        for group in &mut state.groups {
            if !has_renderable_events(&group.events) {
                continue;
            }
            let mut batch = group.events.clone();
            if last_rendered != Some(group.operation_id) {
                batch.push(blank_line_after(batch.last()));
            }
            // Preserve the header for a future flush of the same group.
            group.events.truncate(1);
            self.downstream.on_batch(batch);
            last_rendered = Some(group.operation_id);
        }
        state.last_rendered = last_rendered;
    }
}

/// A group is worth emitting if anything after its header is user-visible
/// renderable output rather than progress bookkeeping.
fn has_renderable_events(events: &[OutputEvent]) -> bool {
    events.iter().skip(1).any(OutputEvent::is_renderable)
}

/// The id of the open group an operation's output belongs to, walking up the
/// operation-parent forest. The average height of the forest is very low.
fn group_index(state: &GroupingState, operation_id: Option<OperationId>) -> Option<usize> {
    let mut current = operation_id;
    while let Some(id) = current {
        if let Some(index) = state
            .groups
            .iter()
            .position(|group| group.operation_id == id)
        {
            return Some(index);
        }
        current = state.operation_parents.get(&id).copied().flatten();
    }
    None
}

/// Blank separator line styled after the event it follows.
fn blank_line_after(event: Option<&OutputEvent>) -> OutputEvent {
    let timestamp = event.and_then(OutputEvent::timestamp).unwrap_or_else(Utc::now);
    let category = event
        .and_then(OutputEvent::category)
        .unwrap_or_default()
        .to_string();
    let level = event
        .and_then(OutputEvent::log_level)
        .unwrap_or(LogLevel::Quiet);
    OutputEvent::Log(LogEvent::new(timestamp, category, level, String::new()))
}
