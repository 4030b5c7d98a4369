mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use property_overlay::hub::{HubClient, PropertySource, SnapshotSource};
use property_overlay::models::{ComposedPropertyView, FlagPatch, NewPromotion, PropertyExtension};
use property_overlay::query::SearchPage;
use property_overlay::stats::{dashboard_report, DashboardReport};
use property_overlay::store::{SqliteExtensionStore, SqlitePool};
use property_overlay::{
    reconcile, search, AppConfig, Catalog, OverlayError, PageRequest, PromotionManager, Scope,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        match err.downcast_ref::<OverlayError>() {
            Some(overlay) => error!(kind = overlay.kind(), "{}", overlay),
            None => error!("{:#}", err),
        }
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;

    // Initialize logging
    let level = cli.log_level.clone().unwrap_or_else(|| config.log.level.clone());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let pool = SqlitePool::new(config.store.clone()).context("Failed to open overlay store")?;
    let store = Arc::new(SqliteExtensionStore::new(pool));

    let source: Arc<dyn PropertySource> = match &cli.snapshot {
        Some(path) => Arc::new(SnapshotSource::from_file(path).await?) as Arc<dyn PropertySource>,
        None => Arc::new(HubClient::new(&config.hub)?) as Arc<dyn PropertySource>,
    };
    info!("🏠 Property overlay using {} source", source.source_name());

    let catalog = Catalog::from_config(source, store.clone(), &config.hub);
    let manager = PromotionManager::new(store);

    match cli.command {
        Commands::Search(args) => {
            let scope = match (args.admin, args.include_hidden) {
                (false, _) => Scope::Public,
                (true, include_hidden) => Scope::Admin { include_hidden },
            };
            let page = PageRequest::new(args.page, args.page_size);
            let results = search(&catalog, &args.criteria(), scope, page).await?;
            output(cli.json, &results, print_page)?;
        }
        Commands::Show { id, admin } => {
            let scope = if admin { Scope::admin_all() } else { Scope::Public };
            let view = catalog.get(&id, scope).await?;
            output(cli.json, &view, |v| print_view(0, v))?;
        }
        Commands::Dashboard {
            limit,
            include_hidden,
        } => {
            let scope = Scope::Admin { include_hidden };
            let views = catalog.composed_set(scope).await?;
            let report = dashboard_report(&views, limit);
            output(cli.json, &report, print_report)?;
        }
        Commands::Flag {
            id,
            hidden,
            popular,
            notes,
            priority,
        } => {
            let patch = FlagPatch {
                is_hidden: hidden,
                is_featured_popular: popular,
                internal_notes: notes,
                priority,
            };
            let ext = manager.set_flags(&id, &patch).await?;
            output(cli.json, &ext, print_extension)?;
        }
        Commands::Promote {
            id,
            label,
            promotion_type,
            discounted_price,
            discounted_rental_price,
        } => {
            let input = NewPromotion {
                label,
                promotion_type,
                discounted_price,
                discounted_rental_price,
            };
            let ext = manager.add_promotion(&id, &input).await?;
            output(cli.json, &ext, print_extension)?;
        }
        Commands::Unpromote { id, promotion_id } => {
            let ext = manager.remove_promotion(&id, &promotion_id).await?;
            output(cli.json, &ext, print_extension)?;
        }
        Commands::PromoActive {
            id,
            promotion_id,
            active,
        } => {
            let ext = manager
                .set_promotion_active(&id, &promotion_id, active)
                .await?;
            output(cli.json, &ext, print_extension)?;
        }
        Commands::Tag { id, name, color } => {
            let ext = manager.add_tag(&id, &name, color.as_deref()).await?;
            output(cli.json, &ext, print_extension)?;
        }
        Commands::Untag { id, tag_id } => {
            let ext = manager.remove_tag(&id, &tag_id).await?;
            output(cli.json, &ext, print_extension)?;
        }
        Commands::Reconcile => {
            let report = reconcile::reconcile(&catalog).await?;
            output(cli.json, &report, |r| {
                println!("Scanned {} overlays against {} live properties", r.scanned, r.live);
                println!("  newly orphaned: {}", r.newly_orphaned);
                println!("  restored:       {}", r.restored);
                if r.skipped_marking {
                    println!("  hub listing was truncated, orphan marking skipped");
                }
            })?;
        }
    }

    Ok(())
}

fn output<T, F>(json: bool, value: &T, text: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&T),
{
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}

fn price(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_view(index: usize, view: &ComposedPropertyView) {
    let p = &view.property;
    let title = if p.title.en.is_empty() { &p.title.th } else { &p.title.en };
    if index > 0 {
        println!("{}. {} [{}]", index, title, p.status.as_str());
    } else {
        println!("{} [{}]", title, p.status.as_str());
    }
    if p.is_price_on_request() {
        println!("   Price: contact us");
    } else {
        println!("   Rent: {}  Sale: {}", price(p.rental_rate_num), price(p.sell_price_num));
    }
    println!(
        "   {} · {} bd · {} views",
        p.property_type,
        p.bedrooms.map(|b| b.to_string()).unwrap_or_else(|| "?".to_string()),
        p.view_count
    );
    println!("   ID: {}", p.id);

    let ext = &view.overlay;
    let mut flags = Vec::new();
    if ext.is_hidden {
        flags.push("hidden".to_string());
    }
    if ext.is_featured_popular {
        flags.push("popular".to_string());
    }
    if ext.priority != 0 {
        flags.push(format!("priority {}", ext.priority));
    }
    for promo in ext.active_promotions() {
        flags.push(format!("{}: {}", promo.promotion_type, promo.label));
    }
    if !flags.is_empty() {
        println!("   Overlay: {}", flags.join(", "));
    }
    if !ext.tags.is_empty() {
        let names: Vec<&str> = ext.tags.iter().map(|t| t.name.as_str()).collect();
        println!("   Tags: {}", names.join(", "));
    }
    if let Some(notes) = &ext.internal_notes {
        println!("   Notes: {}", notes);
    }
    println!();
}

fn print_page(page: &SearchPage) {
    println!(
        "Page {}/{} ({} matching)\n",
        page.page,
        page.total_pages.max(1),
        page.total
    );
    let offset = (page.page as usize).saturating_sub(1) * page.page_size as usize;
    for (i, view) in page.items.iter().enumerate() {
        print_view(offset + i + 1, view);
    }
}

fn print_extension(ext: &PropertyExtension) {
    println!("Overlay for {}", ext.external_property_id);
    println!(
        "   hidden: {}  popular: {}  priority: {}",
        ext.is_hidden, ext.is_featured_popular, ext.priority
    );
    if let Some(notes) = &ext.internal_notes {
        println!("   notes: {}", notes);
    }
    for promo in &ext.promotions {
        println!(
            "   promotion {} [{}{}] {}",
            promo.id,
            promo.promotion_type,
            if promo.is_active { "" } else { ", inactive" },
            promo.label
        );
    }
    for tag in &ext.tags {
        println!(
            "   tag {} {}{}",
            tag.id,
            tag.name,
            tag.color.as_deref().map(|c| format!(" ({})", c)).unwrap_or_default()
        );
    }
}

fn print_report(report: &DashboardReport<'_>) {
    let s = &report.stats;
    println!("📊 {} properties, {} total views", s.total, s.total_views);
    println!(
        "   active {} · inactive {} · sold {} · rented {}",
        s.by_status.active, s.by_status.inactive, s.by_status.sold, s.by_status.rented
    );
    println!(
        "   for rent {} · for sale {} · featured {} · promoted {} · hidden {}",
        s.for_rent, s.for_sale, s.featured, s.with_promotions, s.hidden
    );
    for (kind, count) in &s.by_property_type {
        println!("   {}: {}", kind, count);
    }

    let rankings = [
        ("Recent", &report.recent),
        ("Top viewed", &report.top_viewed),
        ("Popular", &report.popular),
        ("Closed deals", &report.closed_deals),
    ];
    for (name, views) in rankings {
        println!("\n{}:", name);
        for view in views.iter() {
            println!("   {} ({} views)", view.id(), view.property.view_count);
        }
    }

    println!("\nPromoted:");
    for promoted in &report.promoted {
        let shown = promoted
            .rental
            .or(promoted.sale)
            .map(|p| {
                if p.is_discounted() {
                    format!("{} (was {})", p.display, p.original)
                } else {
                    p.display.to_string()
                }
            })
            .unwrap_or_else(|| "contact us".to_string());
        println!(
            "   {} [{}] {}",
            promoted.view.id(),
            promoted.promotion.label,
            shown
        );
    }
}
