//! Categories command

use anyhow::Result;

use super::get_context;
use crate::output;

pub fn run(user: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context(user)?;
    let categories = ctx.category_service.list(ctx.user.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
        return Ok(());
    }

    if categories.is_empty() {
        println!("No categories yet. They are created by imports.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Category", "Kind"]);
    for entry in categories {
        table.add_row(vec![entry.label, entry.kind.to_string()]);
    }
    println!("{}", table);
    Ok(())
}
