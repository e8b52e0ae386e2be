//! Ordering listens and handing them off in request sized batches

use std::fmt::Display;

use tracing::{
    debug,
    error,
};

use crate::{
    Listen,
    MAX_BATCH_SIZE,
};

/// Sorts newest first. Listens sharing a timestamp keep their relative order.
pub fn order_newest_first(listens: &mut [Listen]) { listens.sort_by(|a, b| b.listened_at().cmp(&a.listened_at())) }

/// Splits `listens` into consecutive batches of at most `size`, clamped to `1..=MAX_BATCH_SIZE`
pub fn batches(listens: &[Listen], size: usize) -> std::slice::Chunks<'_, Listen> { listens.chunks(size.clamp(1, MAX_BATCH_SIZE)) }


/// Observer for the progress of [`submit_all`]
pub trait Progress {
    /// Called after each batch with the cumulative number of listens handed off so far
    fn batch_done(&mut self, submitted: usize, total: usize);

    fn done(&mut self, _summary: &Summary) {}
}

impl Progress for () {
    fn batch_done(&mut self, _: usize, _: usize) {}
}


#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub submitted: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub failed_listens: usize,
}

impl Summary {
    /// Number of listens in batches the submitter reported as successful
    pub fn accepted(&self) -> usize { self.submitted - self.failed_listens }

    pub fn is_complete(&self) -> bool { self.failed_batches == 0 && self.submitted == self.total }
}


/// Orders `listens` newest first and passes them to `submit` one batch at a time
///
/// A batch that fails is logged and counted in the returned [`Summary`]; the remaining batches are still submitted.
pub fn submit_all<E, F, P>(mut listens: Vec<Listen>, batch_size: usize, mut submit: F, progress: &mut P) -> Summary
where
    E: Display,
    F: FnMut(&[Listen]) -> Result<(), E>,
    P: Progress + ?Sized,
{
    order_newest_first(&mut listens);

    let mut summary = Summary {
        total: listens.len(),
        ..Default::default()
    };
    for batch in batches(&listens, batch_size) {
        let first = summary.submitted;
        summary.batches += 1;
        summary.submitted += batch.len();
        debug!(batch = summary.batches, size = batch.len(), "submitting batch");

        if let Err(e) = submit(batch) {
            error!("Batch {first}-{} failed: {e:#}", summary.submitted);
            summary.failed_batches += 1;
            summary.failed_listens += batch.len();
        }
        progress.batch_done(summary.submitted, summary.total);
    }

    progress.done(&summary);
    summary
}

#[cfg(test)]
mod tests;
