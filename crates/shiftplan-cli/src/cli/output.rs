//! Table rendering for command output.

use comfy_table::modifiers::UTF8_SOLID_INNER_BORDERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use shiftplan_core::api::{Plan, PlanningPeriod, User};

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.iter().map(Cell::new));
    table
}

pub fn periods_table(periods: &[PlanningPeriod], active_id: Option<i64>) -> Table {
    let mut table = table(&["", "ID", "Name"]);
    for period in periods {
        let marker = if Some(period.id) == active_id { "*" } else { "" };
        table.add_row(vec![
            Cell::new(marker),
            Cell::new(period.id),
            Cell::new(&period.name),
        ]);
    }
    table
}

pub fn plans_table(plans: &[Plan]) -> Table {
    let mut table = table(&["ID", "Name", "Period"]);
    for plan in plans {
        let period = plan
            .planning_period_id
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        table.add_row(vec![Cell::new(plan.id), Cell::new(&plan.name), Cell::new(period)]);
    }
    table
}

pub fn users_table(users: &[User]) -> Table {
    let mut table = table(&["ID", "Identifier", "Name", "Admin"]);
    for user in users {
        table.add_row(vec![
            Cell::new(user.id),
            Cell::new(&user.identifier),
            Cell::new(&user.display_name),
            Cell::new(if user.is_admin { "yes" } else { "" }),
        ]);
    }
    table
}

pub fn print_plan(plan: &Plan) {
    println!("Plan {}: {}", plan.id, plan.name);
    if let Some(period) = plan.planning_period_id {
        println!("Planning period: {period}");
    }
    if let Some(description) = plan.description.as_deref().filter(|d| !d.trim().is_empty()) {
        println!();
        println!("{description}");
    }
}
