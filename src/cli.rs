use clap::{Args, Parser, Subcommand, ValueEnum};
use property_overlay::hub::ListingKind;
use property_overlay::query::SortOrder;
use property_overlay::SearchCriteria;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "property-overlay")]
#[command(about = "Marketing overlay for hub-managed property listings")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (TOML). Defaults apply when omitted.
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. "info" or "property_overlay=debug"
    #[arg(short = 'l', long, global = true)]
    pub log_level: Option<String>,

    /// Serve canonical records from a JSON snapshot instead of the live hub
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ListingArg {
    Rent,
    Sale,
}

impl From<ListingArg> for ListingKind {
    fn from(arg: ListingArg) -> Self {
        match arg {
            ListingArg::Rent => ListingKind::Rent,
            ListingArg::Sale => ListingKind::Sale,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Updated,
    Priority,
    Views,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Updated => SortOrder::RecentlyUpdated,
            SortArg::Priority => SortOrder::Priority,
            SortArg::Views => SortOrder::MostViewed,
        }
    }
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Matches title, agent code, or project name
    #[arg(short, long)]
    pub text: Option<String>,
    #[arg(long = "type")]
    pub property_type: Option<String>,
    #[arg(long, value_enum)]
    pub listing: Option<ListingArg>,
    /// 4 means four or more
    #[arg(long)]
    pub bedrooms: Option<u32>,
    #[arg(long)]
    pub min_price: Option<i64>,
    #[arg(long)]
    pub max_price: Option<i64>,
    #[arg(long)]
    pub popular: bool,
    /// Only properties with an active promotion
    #[arg(long)]
    pub promoted: bool,
    /// Only sold or rented properties
    #[arg(long)]
    pub closed: bool,
    /// Only hidden properties (admin)
    #[arg(long)]
    pub hidden: bool,
    #[arg(long)]
    pub tag: Option<String>,
    #[arg(long, value_enum, default_value = "updated")]
    pub sort: SortArg,
    /// Back-office view: exposes internal notes
    #[arg(long)]
    pub admin: bool,
    /// With --admin, include hidden properties alongside visible ones
    #[arg(long, requires = "admin")]
    pub include_hidden: bool,
    #[arg(long, default_value = "1")]
    pub page: u32,
    #[arg(long, default_value = "20")]
    pub page_size: u32,
}

impl SearchArgs {
    pub fn criteria(&self) -> SearchCriteria {
        SearchCriteria {
            text: self.text.clone(),
            property_type: self.property_type.clone(),
            listing_type: self.listing.map(Into::into),
            bedrooms: self.bedrooms,
            min_price: self.min_price,
            max_price: self.max_price,
            popular: self.popular,
            has_promotions: self.promoted,
            closed_deal: self.closed,
            hidden: self.hidden,
            tag: self.tag.clone(),
            sort: self.sort.into(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search composed listings
    Search(SearchArgs),

    /// Show one composed property
    Show {
        id: String,
        /// Back-office view, hidden properties included
        #[arg(long)]
        admin: bool,
    },

    /// Dashboard counters and rankings
    Dashboard {
        /// Items per ranking
        #[arg(short = 'n', long, default_value = "5")]
        limit: usize,
        /// Count hidden properties too
        #[arg(long)]
        include_hidden: bool,
    },

    /// Set overlay flags on a property
    Flag {
        id: String,
        #[arg(long)]
        hidden: Option<bool>,
        #[arg(long)]
        popular: Option<bool>,
        /// Internal notes; pass "" to clear
        #[arg(long)]
        notes: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        priority: Option<i64>,
    },

    /// Add a promotion to a property
    Promote {
        id: String,
        #[arg(long)]
        label: String,
        /// hot, new, discount, special, limited, featured
        #[arg(long = "type")]
        promotion_type: String,
        #[arg(long)]
        discounted_price: Option<i64>,
        #[arg(long)]
        discounted_rental_price: Option<i64>,
    },

    /// Remove a promotion from a property
    Unpromote { id: String, promotion_id: String },

    /// Switch a promotion on or off
    PromoActive {
        id: String,
        promotion_id: String,
        #[arg(action = clap::ArgAction::Set)]
        active: bool,
    },

    /// Attach a tag to a property
    Tag {
        id: String,
        name: String,
        #[arg(long)]
        color: Option<String>,
    },

    /// Detach a tag from a property
    Untag { id: String, tag_id: String },

    /// Flag overlays whose property left the hub
    Reconcile,
}
