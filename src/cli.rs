use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::api::{DEFAULT_FEATURED_LIMIT, DEFAULT_PAGE_SIZE};
use crate::backend::Backend;
use crate::model::{CANONICAL_AUTHOR, DEFAULT_LANGUAGE, SortField, SortOrder};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Where catalog data lives.
    #[arg(long, value_enum, default_value_t = Backend::Rest, global = true)]
    pub backend: Backend,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Books {
        #[command(subcommand)]
        command: BooksCommand,
    },
    /// List category names.
    Categories,
    Quote(QuoteArgs),
    /// Compute reading progress as a whole percentage.
    Progress(ProgressArgs),
}

#[derive(Debug, Subcommand)]
pub enum BooksCommand {
    /// One page of the catalog, newest first.
    List(ListArgs),
    Featured(FeaturedArgs),
    Search(SearchArgs),
    Get(GetArgs),
    Upload(UploadArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
}

#[derive(Debug, Args)]
pub struct FeaturedArgs {
    #[arg(long, default_value_t = DEFAULT_FEATURED_LIMIT)]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Matched against title, description and author.
    #[arg(long, default_value = "")]
    pub query: String,

    #[arg(long, default_value = "")]
    pub category: String,

    #[arg(long)]
    pub year_from: Option<i32>,

    #[arg(long)]
    pub year_to: Option<i32>,

    #[arg(long, default_value = "")]
    pub language: String,

    #[arg(long, value_enum, default_value_t = SortField::Title)]
    pub sort_by: SortField,

    #[arg(long, value_enum, default_value_t = SortOrder::Asc)]
    pub sort_order: SortOrder,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    pub id: String,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub category: String,

    /// PDF to attach (required).
    #[arg(long)]
    pub pdf: PathBuf,

    /// Optional cover image.
    #[arg(long)]
    pub cover: Option<PathBuf>,

    #[arg(long, default_value = CANONICAL_AUTHOR)]
    pub author: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Defaults to the current year.
    #[arg(long)]
    pub year: Option<i32>,

    #[arg(long, default_value_t = 0)]
    pub pages: u32,

    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    pub language: String,
}

#[derive(Debug, Args)]
pub struct QuoteArgs {
    /// The quote flagged as daily instead of a random one.
    #[arg(long)]
    pub daily: bool,

    /// All quotes taken from one book.
    #[arg(long, conflicts_with = "daily")]
    pub book: Option<String>,
}

#[derive(Debug, Args)]
pub struct ProgressArgs {
    #[arg(long)]
    pub current_page: u32,

    #[arg(long)]
    pub total_pages: u32,
}
