use clap::Args;
use quitboard_core::{DateInput, MemberId};

use crate::common::Context;

#[derive(Args)]
pub struct RegisterArgs {
    /// Member id
    pub id: i64,
    /// Cutoff date: YYYY-MM-DD, DD.MM.YYYY, or an offset like "today",
    /// "yesterday", "7" (days ago)
    pub date: String,
    /// Unit price (comma or dot decimals)
    pub price: String,
    /// Display name
    #[arg(long)]
    pub name: Option<String>,
}

fn date_input(raw: &str) -> DateInput {
    match raw {
        "today" => DateInput::Today,
        "yesterday" => DateInput::Yesterday,
        other => match other.parse::<u32>() {
            Ok(days) => DateInput::DaysAgo(days),
            Err(_) => DateInput::Text(other.to_string()),
        },
    }
}

pub async fn run(ctx: &Context, args: RegisterArgs) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ctx.engine()?;
    let member = MemberId(args.id);

    engine.start_registration(member);
    let cutoff = engine.submit_date(member, &date_input(&args.date))?;
    let outcome = engine
        .submit_price(member, args.name.as_deref(), &args.price)
        .await?;

    println!("registered member {member}: cutoff {cutoff}");
    println!(
        "streak: {} d., saved: {:.0}, rank: {}, badge: {}",
        outcome.snapshot.elapsed_days, outcome.snapshot.saved_total, outcome.rank, outcome.title
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_and_text_both_map() {
        assert_eq!(date_input("today"), DateInput::Today);
        assert_eq!(date_input("yesterday"), DateInput::Yesterday);
        assert_eq!(date_input("7"), DateInput::DaysAgo(7));
        assert_eq!(
            date_input("2024-01-01"),
            DateInput::Text("2024-01-01".into())
        );
    }
}
