use clap::Subcommand;

use crate::common::Context;

#[derive(Subcommand)]
pub enum BoardAction {
    /// Print the ranked board
    Top {
        /// Row limit; 0 means unbounded
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Run one recompute-and-publish cycle, then the notification fan-out
    Cycle,
}

pub async fn run(ctx: &Context, action: BoardAction) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ctx.engine()?;

    match action {
        BoardAction::Top { limit } => {
            let limit = if limit == 0 { None } else { Some(limit) };
            println!("{}", engine.get_leaderboard_text(limit)?);
        }
        BoardAction::Cycle => {
            engine.run_leaderboard_cycle().await?;
            engine.run_notification_cycle().await?;
        }
    }
    Ok(())
}
