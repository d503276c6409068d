use clap::Subcommand;
use quitboard_core::MemberId;

use crate::common::Context;

#[derive(Subcommand)]
pub enum MemberAction {
    /// Show one member's snapshot and recent actions
    Show { id: i64 },
    /// Report a relapse for a member
    Relapse { id: i64 },
    /// Soft withdrawal from the board
    Withdraw { id: i64 },
    /// Toggle morning notifications
    Notify {
        id: i64,
        #[arg(value_parser = clap::builder::BoolishValueParser::new())]
        enabled: bool,
    },
    /// Purge everything recorded for a member
    Reset { id: i64 },
}

pub async fn run(ctx: &Context, action: MemberAction) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ctx.engine()?;

    match action {
        MemberAction::Show { id } => {
            let member = MemberId(id);
            match engine.get_snapshot(member)? {
                Some(snapshot) => {
                    println!("{}", serde_json::to_string_pretty(&snapshot)?);
                    let rank = quitboard_core::RankLabel::from_days(snapshot.elapsed_days);
                    println!("rank: {rank}");
                    let actions = engine.recent_actions(member, 10)?;
                    if !actions.is_empty() {
                        println!("recent: {}", actions.join(", "));
                    }
                }
                None => println!("no snapshot for member {member}"),
            }
        }
        MemberAction::Relapse { id } => {
            let count = engine.report_relapse(MemberId(id))?;
            println!("relapse recorded, total: {count}");
        }
        MemberAction::Withdraw { id } => {
            engine.withdraw(MemberId(id))?;
            println!("member {id} withdrawn from the board");
        }
        MemberAction::Notify { id, enabled } => {
            engine.set_notifications(MemberId(id), enabled)?;
            println!(
                "notifications {} for member {id}",
                if enabled { "enabled" } else { "disabled" }
            );
        }
        MemberAction::Reset { id } => {
            engine.reset_member(MemberId(id)).await?;
            println!("member {id} reset");
        }
    }
    Ok(())
}
