use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use po_ledger::{
    common::DateRange,
    config::{self, AppConfig},
    models::{flatten_items, Order, OrderItemView},
    orders_from_json,
    services::{
        aggregation::{aggregate, count_by_line_status, count_by_order_status, summarize_orders},
        export::{
            order_item_columns, order_summary_columns, write_delimited, ExportOptions, ExportRow,
            TabularExporter,
        },
        filtering::{filter, FilterCriteria},
        pagination::{Page, PaginationMeta, Paginator},
    },
    LineItemStatus, OrderStatus, Totals,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

fn main() -> Result<()> {
    let cli = Cli::parse();
    // Config loading logs through a scoped subscriber; the configured one comes after.
    let config =
        tracing::subscriber::with_default(config::bootstrap_subscriber(), config::load_config)
            .context("failed to load application config")?;
    config::init_tracing(config.log_level(), config.log_json);

    let orders = read_orders(cli.input.as_ref())?;
    info!(orders = orders.len(), "loaded purchase orders");

    match cli.command {
        Commands::Totals => handle_totals(&orders, &config, cli.json)?,
        Commands::List(args) => handle_list(&orders, &config, args, cli.json)?,
        Commands::Export(args) => handle_export(&orders, &config, args)?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "po-ledger",
    about = "Totals, filtered listings and sheet exports for purchase orders",
    version
)]
struct Cli {
    #[arg(
        long,
        short = 'i',
        global = true,
        help = "JSON array of orders to read (defaults to stdin)"
    )]
    input: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Order-level totals and status counters across every order
    Totals,
    /// Filtered, paginated listing of order items or PO summaries
    List(ListArgs),
    /// Delimited export of the filtered items or PO summaries
    Export(ExportArgs),
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum SheetArg {
    /// One row per order line
    #[default]
    Items,
    /// One row per purchase order
    Summary,
}

#[derive(Args, Default)]
struct FilterArgs {
    #[arg(long, help = "Case-insensitive text to match names, codes and PO numbers")]
    search: Option<String>,
    #[arg(long, help = "Status label to keep, or 'all'")]
    status: Option<String>,
    #[arg(long, help = "Platform identifier to keep, or 'all'")]
    platform: Option<String>,
    #[arg(long, help = "Earliest order date, YYYY-MM-DD (inclusive)")]
    order_from: Option<String>,
    #[arg(long, help = "Latest order date, YYYY-MM-DD (inclusive)")]
    order_to: Option<String>,
    #[arg(long, help = "Earliest expiry date, YYYY-MM-DD (inclusive)")]
    expiry_from: Option<String>,
    #[arg(long, help = "Latest expiry date, YYYY-MM-DD (inclusive)")]
    expiry_to: Option<String>,
}

impl FilterArgs {
    fn criteria(&self) -> Result<FilterCriteria> {
        let order_date = DateRange::parse(self.order_from.as_deref(), self.order_to.as_deref())
            .context("invalid order date range")?;
        let expiry_date = DateRange::parse(self.expiry_from.as_deref(), self.expiry_to.as_deref())
            .context("invalid expiry date range")?;

        let mut criteria = FilterCriteria::default()
            .with_order_date(order_date)
            .with_expiry_date(expiry_date);
        if let Some(term) = &self.search {
            criteria = criteria.with_term(term.as_str());
        }
        if let Some(status) = &self.status {
            criteria = criteria.with_status(status);
        }
        if let Some(platform) = &self.platform {
            criteria = criteria.with_counterparty(platform);
        }
        Ok(criteria)
    }
}

#[derive(Args)]
struct ListArgs {
    #[command(flatten)]
    filters: FilterArgs,
    #[arg(long, value_enum, default_value_t = SheetArg::Items, help = "Records to list")]
    sheet: SheetArg,
    #[arg(long, default_value_t = 1, help = "Page number (1-indexed)")]
    page: u64,
    #[arg(long, help = "Items per page", value_parser = parse_positive_u64)]
    page_size: Option<u64>,
}

#[derive(Args)]
struct ExportArgs {
    #[command(flatten)]
    filters: FilterArgs,
    #[arg(long, value_enum, default_value_t = SheetArg::Items, help = "Sheet to export")]
    sheet: SheetArg,
    #[arg(
        long,
        default_value = ",",
        value_parser = parse_delimiter,
        help = "Field delimiter: a single ASCII character, or 'tab'"
    )]
    delimiter: u8,
    #[arg(long, short = 'o', help = "Write to this file instead of stdout")]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct TotalsReport {
    orders: usize,
    totals: Totals,
    order_status: BTreeMap<OrderStatus, usize>,
    line_status: BTreeMap<LineItemStatus, usize>,
}

fn handle_totals(orders: &[Order], config: &AppConfig, json: bool) -> Result<()> {
    let views = flatten_items(orders);
    let report = TotalsReport {
        orders: orders.len(),
        totals: aggregate(views.iter().map(|view| view.item)),
        order_status: count_by_order_status(orders),
        line_status: count_by_line_status(views.iter().map(|view| view.item)),
    };

    if json {
        return print_json(&report);
    }

    let currency = &config.currency_code;
    let totals = &report.totals;
    println!("Orders:           {}", report.orders);
    println!("Line items:       {}", totals.item_count);
    println!("Total quantity:   {}", totals.total_quantity);
    println!("Total basic cost: {} {}", totals.total_basic_cost, currency);
    println!("Total tax:        {} {}", totals.total_tax, currency);
    println!("Grand total:      {} {}", totals.grand_total, currency);
    println!("Total litres:     {}", totals.total_litres);
    let by_order_status: Vec<String> = report
        .order_status
        .iter()
        .map(|(status, count)| format!("{status}: {count}"))
        .collect();
    println!("Orders by status: {}", by_order_status.join(", "));
    let by_line_status: Vec<String> = report
        .line_status
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(status, count)| format!("{status}: {count}"))
        .collect();
    println!("Lines by status:  {}", by_line_status.join(", "));
    Ok(())
}

fn handle_list(orders: &[Order], config: &AppConfig, args: ListArgs, json: bool) -> Result<()> {
    let criteria = args.filters.criteria()?;
    let paginator = Paginator::new(config.effective_page_size(args.page_size))
        .context("invalid page size")?;
    let exporter = TabularExporter::new(ExportOptions::from(config));

    let page: Page<ExportRow> = match args.sheet {
        SheetArg::Items => {
            let views = flatten_items(orders);
            let kept: Vec<&OrderItemView<'_>> = filter(&views, &criteria);
            let page = paginator.paginate(&kept, args.page);
            Page {
                data: exporter.to_rows(&page.data, &order_item_columns()),
                pagination: page.pagination,
            }
        }
        SheetArg::Summary => {
            let kept: Vec<&Order> = filter(orders, &criteria);
            let summaries = summarize_orders(kept);
            let page = paginator.paginate(&summaries, args.page);
            Page {
                data: exporter.to_rows(&page.data, &order_summary_columns()),
                pagination: page.pagination,
            }
        }
    };
    debug!(active_filters = criteria.is_active(), rows = page.data.len(), "listing ready");

    if json {
        return print_json(&page);
    }

    if page.is_empty() {
        println!("No records match the current filters.");
    } else {
        render_rows(&page.data);
    }
    println!("{}", page_footer(&page.pagination));
    Ok(())
}

fn page_footer(meta: &PaginationMeta) -> String {
    format!(
        "Page {} of {} ({} total){}",
        meta.page,
        meta.total_pages,
        meta.total,
        if meta.has_next() { " (more available)" } else { "" }
    )
}

fn handle_export(orders: &[Order], config: &AppConfig, args: ExportArgs) -> Result<()> {
    let criteria = args.filters.criteria()?;
    let exporter = TabularExporter::new(ExportOptions::from(config));

    let rows = match args.sheet {
        SheetArg::Items => {
            let views = flatten_items(orders);
            let kept = filter(&views, &criteria);
            exporter.to_rows(&kept, &order_item_columns())
        }
        SheetArg::Summary => {
            let summaries = summarize_orders(filter(orders, &criteria));
            exporter.to_rows(&summaries, &order_summary_columns())
        }
    };

    let written = match &args.output {
        Some(path) => {
            let file = fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_delimited(&rows, args.delimiter, io::BufWriter::new(file))
                .context("failed to write export")?
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            let written =
                write_delimited(&rows, args.delimiter, &mut handle).context("failed to write export")?;
            handle.flush().context("failed to flush stdout")?;
            written
        }
    };

    if let Some(path) = &args.output {
        eprintln!("Exported {} rows to {}", written, path.display());
    }
    Ok(())
}

fn read_orders(path: Option<&PathBuf>) -> Result<Vec<Order>> {
    let raw = match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => io::read_to_string(io::stdin()).context("failed to read orders from stdin")?,
    };
    orders_from_json(&raw).context("input is not a JSON array of orders")
}

fn render_rows(rows: &[ExportRow]) {
    if let Some(first) = rows.first() {
        println!("{}", first.labels().collect::<Vec<_>>().join(" | "));
    }
    for row in rows {
        println!("{}", row.values().collect::<Vec<_>>().join(" | "));
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_positive_u64(raw: &str) -> Result<u64, String> {
    let value: u64 = raw
        .parse()
        .map_err(|_| format!("invalid integer '{raw}'"))?;
    if value == 0 {
        Err("value must be greater than zero".to_string())
    } else {
        Ok(value)
    }
}

fn parse_delimiter(raw: &str) -> Result<u8, String> {
    match raw {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        _ => {
            let mut bytes = raw.bytes();
            match (bytes.next(), bytes.next()) {
                (Some(byte), None) if byte.is_ascii() && byte != b'"' && byte != b'\n' => Ok(byte),
                _ => Err(format!("invalid delimiter '{raw}', expected one ASCII character")),
            }
        }
    }
}
