use qorch_core::errors::QorchError;
use qorch_store::Store;
use serde::Serialize;

use crate::dispatch::{DispatchReport, Dispatcher};
use crate::metrics::{MetricsReport, MetricsStage};
use crate::poll::{PollReport, PollingEngine};

#[derive(Debug, Default, Clone, Serialize)]
pub struct CycleReport {
    pub dispatch: DispatchReport,
    pub poll: PollReport,
    pub metrics: MetricsReport,
}

/// One orchestration pass: dispatch, then poll, then metrics. Each stage reads its work
/// from the store, so a pass interrupted anywhere can simply be run again.
pub fn run_cycle(
    store: &mut Store,
    dispatcher: &Dispatcher<'_>,
    poller: &PollingEngine<'_>,
    metrics: &MetricsStage<'_>,
) -> Result<CycleReport, QorchError> {
    let dispatch = dispatcher.dispatch_pending(store)?;
    let poll = poller.poll_pending(store)?;
    let metrics = metrics.run(store)?;
    Ok(CycleReport {
        dispatch,
        poll,
        metrics,
    })
}
