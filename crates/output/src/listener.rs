use gantry_events::OutputEvent;

/// Downstream consumer of the pipeline: a terminal renderer, a file logger,
/// or the next stage of event processing.
///
/// Batches carry the buffered contents of one completed group and must be
/// rendered contiguously. Listeners are invoked while the pipeline's lock is
/// held and must not re-enter the pipeline.
pub trait BatchOutputListener: Send + Sync {
    fn on_output(&self, event: OutputEvent);

    fn on_batch(&self, events: Vec<OutputEvent>) {
        for event in events {
            self.on_output(event);
        }
    }
}
