use std::sync::Arc;

use tracing::info;

use crate::common::Context;

/// Foreground scheduler loop: fires the recompute/publish cycle and the
/// notification fan-out on the configured trigger until interrupted.
pub async fn run(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Arc::new(ctx.engine()?);
    let trigger = engine.config().trigger();
    info!(?trigger, "scheduler starting");
    quitboard_core::scheduler::run(engine, trigger).await;
    Ok(())
}
