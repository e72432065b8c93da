//! Subcommands and their dispatch onto the core services.

use crate::config::Config;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Subcommand, ValueEnum};
use log::info;
use rusqlite::Connection;
use serde::Serialize;
use std::thread;
use std::time::Duration;
use tablefire_core::model::format_amount;
use tablefire_core::model::invoice::PaymentMethod;
use tablefire_core::model::menu::MenuItem;
use tablefire_core::model::order::{NewOrderLine, OrderDetails, OrderItemId};
use tablefire_core::model::staff::{normalize_email, Role};
use tablefire_core::model::table::DiningTable;
use tablefire_core::provision::seed_demo_data;
use tablefire_core::realtime::journal::{latest_seq, read_after};
use tablefire_core::service::admin_service::AdminService;
use tablefire_core::service::auth_service::{AuthService, NewStaff};
use tablefire_core::service::kitchen_service::KitchenService;
use tablefire_core::service::notification_service::NotificationService;
use tablefire_core::service::server_service::ServerService;
use tablefire_core::{ChangeFeed, ChangeFilter, Session};

const WATCH_BATCH: u32 = 500;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the demo accounts, tables and menu where missing.
    Seed,
    /// Sign in and remember the session next to the database.
    Login {
        email: String,
        #[arg(long, env = "TABLEFIRE_PASSWORD")]
        password: String,
    },
    /// Drop the remembered session.
    Logout,
    /// Show the signed-in staff member.
    Whoami,
    /// Floor overview.
    Tables,
    /// Orderable dishes, optionally limited to one category.
    Menu {
        #[arg(long)]
        category: Option<String>,
    },
    Categories,
    /// Seat guests at a free table.
    Seat { table: i64 },
    /// Add dishes to a table's open order.
    Order {
        table: i64,
        /// `Name[:quantity[:notes]]`, repeatable.
        #[arg(long = "item", required = true)]
        items: Vec<String>,
    },
    /// Mark a prepared item as served.
    Serve { item_id: OrderItemId },
    /// Open orders taken by the signed-in server.
    MyOrders,
    #[command(subcommand)]
    Kitchen(KitchenCommand),
    /// Served tables waiting for an invoice.
    Billing,
    /// Issue the invoice for a served table and free it.
    Bill {
        table: i64,
        #[arg(long, value_enum, default_value_t = MethodArg::Cash)]
        method: MethodArg,
    },
    /// Toggle whether a dish can be ordered.
    Availability {
        name: String,
        #[arg(long)]
        unavailable: bool,
    },
    Staff,
    /// Create a staff account (admin only).
    AddStaff {
        email: String,
        full_name: String,
        #[arg(long, value_enum)]
        role: RoleArg,
        #[arg(long, env = "TABLEFIRE_NEW_PASSWORD")]
        password: String,
    },
    /// Activate or deactivate a staff account.
    StaffActive {
        email: String,
        #[arg(long)]
        inactive: bool,
    },
    Invoices,
    /// Sales summary for one UTC day (default today).
    Report {
        #[arg(long)]
        day: Option<NaiveDate>,
    },
    Audit {
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    /// Inbox for the signed-in staff member.
    Notifications {
        #[arg(long)]
        mark_read: bool,
    },
    /// Stream committed changes as JSON lines.
    Watch {
        /// Start after this sequence number; defaults to the current head.
        #[arg(long)]
        from_seq: Option<i64>,
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
        /// Only changes on this table, e.g. `order_items`.
        #[arg(long)]
        table: Option<String>,
        /// Print what is pending and exit.
        #[arg(long)]
        once: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum KitchenCommand {
    /// Open orders with unserved items, oldest first.
    Queue {
        #[arg(long)]
        by_item: bool,
    },
    /// Move an item one kitchen step forward.
    Advance { item_id: OrderItemId },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MethodArg {
    Cash,
    Upi,
}

impl From<MethodArg> for PaymentMethod {
    fn from(value: MethodArg) -> Self {
        match value {
            MethodArg::Cash => PaymentMethod::Cash,
            MethodArg::Upi => PaymentMethod::Upi,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    Server,
    Kitchen,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Server => Role::Server,
            RoleArg::Kitchen => Role::Kitchen,
            RoleArg::Admin => Role::Admin,
        }
    }
}

/// Everything a command needs: configuration plus an open store.
pub struct App<'a> {
    pub config: &'a Config,
    pub conn: &'a Connection,
    pub feed: &'a ChangeFeed,
}

impl App<'_> {
    fn session(&self) -> Result<Session> {
        let token = self
            .config
            .read_session_token()?
            .ok_or_else(|| anyhow!("not signed in; run `tablefire login <email>`"))?;
        let session = AuthService::new(self.conn, self.feed).current_user(&token)?;
        Ok(session)
    }

    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
        if self.config.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            let rendered = text(value);
            if !rendered.is_empty() {
                println!("{rendered}");
            }
        }
        Ok(())
    }
}

pub fn run(ctx: &App<'_>, command: Command) -> Result<()> {
    match command {
        Command::Seed => {
            let report = seed_demo_data(ctx.conn, ctx.feed)?;
            ctx.emit(&report, |report| {
                let mut out: Vec<String> = report
                    .accounts
                    .iter()
                    .map(|(email, status)| format!("account {email}: {}", status.as_str()))
                    .collect();
                out.push(format!(
                    "tables: {} created, {} total",
                    report.tables_created, report.tables_total
                ));
                out.push(format!(
                    "menu items: {} created, {} total",
                    report.menu_items_created, report.menu_items_total
                ));
                out.join("\n")
            })
        }
        Command::Login { email, password } => {
            let session = AuthService::new(ctx.conn, ctx.feed).sign_in(&email, &password)?;
            ctx.config.write_session_token(&session.token)?;
            ctx.emit(&session.staff, |staff| {
                format!("signed in as {} ({})", staff.full_name, staff.role.as_str())
            })
        }
        Command::Logout => {
            if let Some(token) = ctx.config.read_session_token()? {
                AuthService::new(ctx.conn, ctx.feed).sign_out(&token)?;
            }
            ctx.config.clear_session_token()?;
            ctx.emit(&true, |_| "signed out".to_string())
        }
        Command::Whoami => {
            let session = ctx.session()?;
            ctx.emit(&session.staff, |staff| {
                format!(
                    "{} <{}> role={}",
                    staff.full_name,
                    staff.email,
                    staff.role.as_str()
                )
            })
        }
        Command::Tables => {
            let session = ctx.session()?;
            let tables = ServerService::new(ctx.conn, ctx.feed, &session).list_tables()?;
            ctx.emit(&tables, |tables| {
                tables.iter().map(render_table).collect::<Vec<_>>().join("\n")
            })
        }
        Command::Menu { category } => {
            let session = ctx.session()?;
            let menu =
                ServerService::new(ctx.conn, ctx.feed, &session).list_menu(category.as_deref())?;
            ctx.emit(&menu, |menu| render_menu(menu))
        }
        Command::Categories => {
            let session = ctx.session()?;
            let categories = ServerService::new(ctx.conn, ctx.feed, &session).menu_categories()?;
            ctx.emit(&categories, |categories| categories.join("\n"))
        }
        Command::Seat { table } => {
            let session = ctx.session()?;
            let table = ServerService::new(ctx.conn, ctx.feed, &session).seat_table(table)?;
            ctx.emit(&table, render_table)
        }
        Command::Order { table, items } => {
            let session = ctx.session()?;
            let server = ServerService::new(ctx.conn, ctx.feed, &session);
            let menu = server.list_menu(None)?;
            let lines = items
                .iter()
                .map(|raw| parse_order_line(raw, &menu))
                .collect::<Result<Vec<_>>>()?;
            let details = server.submit_order(table, &lines)?;
            ctx.emit(&details, render_order)
        }
        Command::Serve { item_id } => {
            let session = ctx.session()?;
            let details = ServerService::new(ctx.conn, ctx.feed, &session).serve_item(item_id)?;
            ctx.emit(&details, render_order)
        }
        Command::MyOrders => {
            let session = ctx.session()?;
            let orders = ServerService::new(ctx.conn, ctx.feed, &session).my_orders()?;
            ctx.emit(&orders, |orders| render_orders(orders))
        }
        Command::Kitchen(KitchenCommand::Queue { by_item: false }) => {
            let session = ctx.session()?;
            let queue = KitchenService::new(ctx.conn, ctx.feed, &session).queue()?;
            ctx.emit(&queue, |queue| render_orders(queue))
        }
        Command::Kitchen(KitchenCommand::Queue { by_item: true }) => {
            let session = ctx.session()?;
            let queue = KitchenService::new(ctx.conn, ctx.feed, &session).queue_by_item()?;
            ctx.emit(&queue, |queue| {
                queue
                    .iter()
                    .map(|entry| {
                        let tables = entry
                            .instances
                            .iter()
                            .map(|item| {
                                format!("T{}:{}", item.table_number, item.status.as_str())
                            })
                            .collect::<Vec<_>>()
                            .join(", ");
                        format!(
                            "{} x{} [{tables}]",
                            entry.menu_item_name, entry.total_quantity
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Command::Kitchen(KitchenCommand::Advance { item_id }) => {
            let session = ctx.session()?;
            let item = KitchenService::new(ctx.conn, ctx.feed, &session).advance_item(item_id)?;
            ctx.emit(&item, |item| {
                format!("item {} is now {}", item.id, item.status.as_str())
            })
        }
        Command::Billing => {
            let session = ctx.session()?;
            let queue = AdminService::new(ctx.conn, ctx.feed, &session).billing_queue()?;
            ctx.emit(&queue, |queue| {
                queue
                    .iter()
                    .map(|billable| {
                        format!(
                            "table {}: {} ({} lines)",
                            billable.table.table_number,
                            format_amount(billable.total_minor),
                            billable.order.lines.len()
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Command::Bill { table, method } => {
            let session = ctx.session()?;
            let invoice =
                AdminService::new(ctx.conn, ctx.feed, &session).bill_table(table, method.into())?;
            ctx.emit(&invoice, |invoice| {
                format!(
                    "{} {} via {}",
                    invoice.invoice_number,
                    format_amount(invoice.total_amount_minor),
                    invoice.payment_method.as_str()
                )
            })
        }
        Command::Availability { name, unavailable } => {
            let session = ctx.session()?;
            let admin = AdminService::new(ctx.conn, ctx.feed, &session);
            let item = admin
                .list_menu()?
                .into_iter()
                .find(|item| item.name.eq_ignore_ascii_case(name.trim()))
                .ok_or_else(|| anyhow!("no menu item named `{name}`"))?;
            let item = admin.set_menu_availability(item.id, !unavailable)?;
            ctx.emit(&item, |item| render_menu(std::slice::from_ref(item)))
        }
        Command::Staff => {
            let session = ctx.session()?;
            let staff = AdminService::new(ctx.conn, ctx.feed, &session).list_staff()?;
            ctx.emit(&staff, |staff| {
                staff
                    .iter()
                    .map(|member| {
                        format!(
                            "{:<8} {:<32} {}{}",
                            member.role.as_str(),
                            member.email,
                            member.full_name,
                            if member.is_active { "" } else { " (inactive)" }
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Command::AddStaff {
            email,
            full_name,
            role,
            password,
        } => {
            let session = ctx.session()?;
            let member = AuthService::new(ctx.conn, ctx.feed).sign_up(
                &session,
                &NewStaff {
                    email,
                    password,
                    full_name,
                    role: role.into(),
                },
            )?;
            ctx.emit(&member, |member| {
                format!("created {} ({})", member.email, member.role.as_str())
            })
        }
        Command::StaffActive { email, inactive } => {
            let session = ctx.session()?;
            let admin = AdminService::new(ctx.conn, ctx.feed, &session);
            let wanted = normalize_email(&email);
            let member = admin
                .list_staff()?
                .into_iter()
                .find(|member| member.email == wanted)
                .ok_or_else(|| anyhow!("no staff account `{wanted}`"))?;
            let member = admin.set_staff_active(member.id, !inactive)?;
            ctx.emit(&member, |member| {
                format!("{} active={}", member.email, member.is_active)
            })
        }
        Command::Invoices => {
            let session = ctx.session()?;
            let invoices = AdminService::new(ctx.conn, ctx.feed, &session).list_invoices()?;
            ctx.emit(&invoices, |invoices| {
                invoices
                    .iter()
                    .map(|invoice| {
                        format!(
                            "{} {:>12} {}",
                            invoice.invoice_number,
                            format_amount(invoice.total_amount_minor),
                            invoice.payment_method.as_str()
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Command::Report { day } => {
            let session = ctx.session()?;
            let day = day.unwrap_or_else(|| Utc::now().date_naive());
            let report = AdminService::new(ctx.conn, ctx.feed, &session).sales_report(day)?;
            ctx.emit(&report, |report| {
                let mut out = vec![
                    format!(
                        "{}: {} from {} invoices",
                        report.day,
                        format_amount(report.today_sales_minor),
                        report.today_invoice_count
                    ),
                    format!(
                        "all time: {} from {} invoices, average {}",
                        format_amount(report.total_sales_minor),
                        report.total_invoice_count,
                        format_amount(report.average_order_minor)
                    ),
                ];
                for entry in &report.by_payment_method {
                    out.push(format!(
                        "  {}: {} ({} invoices)",
                        entry.method.as_str(),
                        format_amount(entry.amount_minor),
                        entry.invoice_count
                    ));
                }
                out.push(format!(
                    "tables ready for billing: {}",
                    report.tables_ready_for_billing
                ));
                out.join("\n")
            })
        }
        Command::Audit { limit } => {
            let session = ctx.session()?;
            let entries = AdminService::new(ctx.conn, ctx.feed, &session).audit_log(limit)?;
            ctx.emit(&entries, |entries| {
                entries
                    .iter()
                    .map(|entry| {
                        format!(
                            "{} {:<8} {:<20} {}",
                            entry.created_at,
                            entry.user_role.as_str(),
                            entry.action,
                            entry.entity_type
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Command::Notifications { mark_read } => {
            let session = ctx.session()?;
            let service = NotificationService::new(ctx.conn, ctx.feed, &session);
            if mark_read {
                let updated = service.mark_all_read()?;
                return ctx.emit(&updated, |updated| format!("marked {updated} as read"));
            }
            let inbox = service.inbox()?;
            ctx.emit(&inbox, |inbox| {
                let mut out = vec![format!("{} unread", inbox.unread_count)];
                out.extend(inbox.notifications.iter().map(|notification| {
                    format!(
                        "{} {}: {}",
                        if notification.is_read { " " } else { "*" },
                        notification.title,
                        notification.message
                    )
                }));
                out.join("\n")
            })
        }
        Command::Watch {
            from_seq,
            interval_ms,
            table,
            once,
        } => {
            ctx.session()?;
            watch(ctx.conn, from_seq, interval_ms, table, once)
        }
    }
}

fn watch(
    conn: &Connection,
    from_seq: Option<i64>,
    interval_ms: u64,
    table: Option<String>,
    once: bool,
) -> Result<()> {
    let filter = table.map(ChangeFilter::table);
    let mut last_seq = match from_seq {
        Some(seq) => seq,
        None => latest_seq(conn)?,
    };
    info!("event=watch_start module=cli status=ok from_seq={last_seq}");

    loop {
        let events = read_after(conn, last_seq, WATCH_BATCH)?;
        let drained = events.len() < WATCH_BATCH as usize;
        for event in events {
            last_seq = event.seq;
            if filter.as_ref().map_or(true, |filter| filter.matches(&event)) {
                println!("{}", serde_json::to_string(&event)?);
            }
        }
        if drained {
            if once {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(interval_ms));
        }
    }
}

/// Parses `Name[:quantity[:notes]]` against the orderable menu.
fn parse_order_line(raw: &str, menu: &[MenuItem]) -> Result<NewOrderLine> {
    let mut parts = raw.splitn(3, ':');
    let name = parts.next().unwrap_or_default().trim();
    if name.is_empty() {
        bail!("empty item in `{raw}`");
    }
    let quantity = match parts.next().map(str::trim) {
        None | Some("") => 1,
        Some(value) => value
            .parse::<i64>()
            .with_context(|| format!("invalid quantity in `{raw}`"))?,
    };
    let notes = parts.next().map(str::to_string);

    let item = menu
        .iter()
        .find(|item| item.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| anyhow!("`{name}` is not on the menu or is unavailable"))?;

    Ok(NewOrderLine {
        menu_item_id: item.id,
        quantity,
        notes,
    })
}

fn render_table(table: &DiningTable) -> String {
    format!("table {:>2}  {}", table.table_number, table.status.as_str())
}

fn render_menu(menu: &[MenuItem]) -> String {
    menu.iter()
        .map(|item| {
            format!(
                "{:<14} {:<28} {:>10}{}",
                item.category,
                item.name,
                format_amount(item.price_minor),
                if item.is_available { "" } else { "  (unavailable)" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_order(details: &OrderDetails) -> String {
    let mut out = vec![format!(
        "table {} order {} [{}] server={} total={}",
        details.table.table_number,
        details.order.id,
        details.order.status.as_str(),
        details.server.full_name,
        details
            .total_minor()
            .map(format_amount)
            .unwrap_or_else(|err| err.to_string())
    )];
    for line in &details.lines {
        out.push(format!(
            "  {} {} x{} [{}]{}",
            line.item.id,
            line.menu_item.name,
            line.item.quantity,
            line.item.status.as_str(),
            line.item
                .notes
                .as_deref()
                .map(|notes| format!(" ({notes})"))
                .unwrap_or_default()
        ));
    }
    out.join("\n")
}

fn render_orders(orders: &[OrderDetails]) -> String {
    orders
        .iter()
        .map(render_order)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::parse_order_line;
    use tablefire_core::model::menu::MenuItem;

    fn menu() -> Vec<MenuItem> {
        vec![
            MenuItem::new("Masala Dosa", "Main Course", 12_000),
            MenuItem::new("Iced Tea", "Beverages", 10_000),
        ]
    }

    #[test]
    fn order_line_defaults_to_one_and_matches_case_insensitively() {
        let menu = menu();
        let line = parse_order_line("masala dosa", &menu).unwrap();
        assert_eq!(line.menu_item_id, menu[0].id);
        assert_eq!(line.quantity, 1);
        assert_eq!(line.notes, None);
    }

    #[test]
    fn order_line_keeps_colons_inside_notes() {
        let menu = menu();
        let line = parse_order_line("Iced Tea:2:less ice: no lemon", &menu).unwrap();
        assert_eq!(line.menu_item_id, menu[1].id);
        assert_eq!(line.quantity, 2);
        assert_eq!(line.notes.as_deref(), Some("less ice: no lemon"));
    }

    #[test]
    fn order_line_rejects_unknown_dish_and_bad_quantity() {
        let menu = menu();
        assert!(parse_order_line("Pizza", &menu).is_err());
        assert!(parse_order_line("Iced Tea:two", &menu).is_err());
        assert!(parse_order_line(":1", &menu).is_err());
    }
}
