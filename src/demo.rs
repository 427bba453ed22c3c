// Sample `user` report over a `users` table, plus the configuration that
// goes with it. Used by the binary when no configuration file is given.

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::query::{count_by, count_by_split};
use crate::reports::{ReportContext, ReportDefinition};
use crate::types::Row;
use crate::util::{value_datetime, value_label};
use serde_json::{json, Value};

pub const USERS_TABLE: &str = "users";

const LATEST_LIMIT: usize = 10;
const LATEST_COLUMNS: [&str; 5] = ["id", "name", "email", "gender", "created_at"];

pub fn user_report() -> ReportDefinition {
    ReportDefinition::new("user")
        .producer("cards", user_cards)
        .producer("registered_users_by_date", registered_users_by_date)
        .producer("user_by_gender", user_by_gender)
        .producer("gender_by_date", gender_by_date)
        .producer("latest_users", latest_users)
}

fn user_cards(ctx: &ReportContext<'_>) -> Result<Value, ReportError> {
    let users = ctx.rows(USERS_TABLE)?;
    let gender_count = |wanted: &str| {
        users
            .iter()
            .filter(|u| u.get("gender").map(value_label).as_deref() == Some(wanted))
            .count()
    };

    let mut cards = Row::new();
    cards.insert("total_users".into(), json!(users.len()));
    cards.insert("male_users".into(), json!(gender_count("male")));
    cards.insert("female_users".into(), json!(gender_count("female")));
    Ok(ctx.card_response(cards))
}

/// Users sorted by creation date, oldest first, dropping rows without one.
fn users_by_date(ctx: &ReportContext<'_>) -> Result<Vec<Row>, ReportError> {
    let date_column = ctx.filter().date_column.clone();
    let mut users: Vec<Row> = ctx
        .rows(USERS_TABLE)?
        .into_iter()
        .filter(|u| u.get(&date_column).and_then(value_datetime).is_some())
        .collect();
    users.sort_by_key(|u| u.get(&date_column).and_then(value_datetime));
    Ok(users)
}

fn registered_users_by_date(ctx: &ReportContext<'_>) -> Result<Value, ReportError> {
    let bucket = ctx.guess_date_format(USERS_TABLE)?;
    let date_column = ctx.filter().date_column.clone();
    let users = users_by_date(ctx)?;
    let grouped = count_by(&users, "date", "count", |u| {
        u.get(&date_column).and_then(value_datetime).map(|at| bucket.label(at))
    });
    ctx.chart_response("date", grouped)
}

fn user_by_gender(ctx: &ReportContext<'_>) -> Result<Value, ReportError> {
    let users = ctx.rows(USERS_TABLE)?;
    let grouped = count_by(&users, "gender", "count", |u| {
        u.get("gender").map(value_label).filter(|g| !g.is_empty())
    });
    ctx.chart_response("gender", grouped)
}

fn gender_by_date(ctx: &ReportContext<'_>) -> Result<Value, ReportError> {
    let bucket = ctx.guess_date_format(USERS_TABLE)?;
    let date_column = ctx.filter().date_column.clone();
    let users = users_by_date(ctx)?;
    let grouped = count_by_split(&users, "date", "gender", |u| {
        u.get(&date_column).and_then(value_datetime).map(|at| bucket.label(at))
    });
    ctx.chart_response("date", grouped)
}

fn latest_users(ctx: &ReportContext<'_>) -> Result<Value, ReportError> {
    let mut users = users_by_date(ctx)?;
    users.reverse();
    let rows: Vec<Row> = users
        .into_iter()
        .take(LATEST_LIMIT)
        .map(|u| {
            LATEST_COLUMNS
                .iter()
                .map(|c| (c.to_string(), u.get(*c).cloned().unwrap_or(Value::Null)))
                .collect()
        })
        .collect();
    ctx.chart_response("name", rows)
}

/// Configuration for the sample report: the `user` page and a `dashboard`
/// mixed page pulling two of its keys.
pub fn demo_config() -> ReportConfig {
    let config = json!({
        "pages": {
            "user": {
                "type": "page",
                "report": {
                    "cards": {"type": "card", "size": {"cols": "6", "md": "3", "lg": "3"}},
                    "registered_users_by_date": {"type": "spline", "size": {"cols": "12", "md": "12", "lg": "12"}},
                    "user_by_gender": {"type": "pie"},
                    "gender_by_date": {"type": "column"},
                    "latest_users": {"type": "table", "size": {"cols": "12", "md": "12", "lg": "12"}}
                }
            },
            "dashboard": {
                "type": "mixed",
                "report": {
                    "user.cards": null,
                    "user.user_by_gender": {"type": "pie", "size": {"cols": "12", "md": "6", "lg": "4"}}
                }
            }
        }
    });
    serde_json::from_value(config).unwrap_or_default()
}
