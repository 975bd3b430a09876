use std::path::Path;

use anyhow::Context as _;
use chrono::Datelike as _;
use serde::Serialize;

use crate::api::{ApiResponse, Library, Paginated, percentage_complete};
use crate::backend;
use crate::cli::{BooksCommand, Cli, Command, QuoteArgs, SearchArgs, UploadArgs};
use crate::model::{NewBook, SearchFilters};
use crate::store::FileUpload;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Command::Progress(args) = &cli.command {
        println!("{}", percentage_complete(args.current_page, args.total_pages));
        return Ok(());
    }

    let conn = backend::connect(cli.backend).await.context("connect backend")?;
    let library = &conn.library;
    match cli.command {
        Command::Books { command } => books(library, command).await,
        Command::Categories => {
            let categories = into_data(library.get_categories().await, "fetch categories")?;
            for category in categories {
                println!("{}", category.name);
            }
            Ok(())
        }
        Command::Quote(args) => quote(library, args).await,
        Command::Progress(_) => Ok(()),
    }
}

async fn books(library: &Library, command: BooksCommand) -> anyhow::Result<()> {
    match command {
        BooksCommand::List(args) => {
            let listing = library.get_books(args.page, args.page_size).await;
            print_json(&into_listing(listing, "list books")?)
        }
        BooksCommand::Featured(args) => {
            let books = into_data(
                library.get_featured_books(args.limit).await,
                "fetch featured books",
            )?;
            print_json(&books)
        }
        BooksCommand::Search(args) => {
            let listing = library.search_books(&search_filters(args)).await;
            print_json(&into_listing(listing, "search books")?)
        }
        BooksCommand::Get(args) => {
            let book = into_data(library.get_book_by_id(args.id.trim()).await, "fetch book")?;
            print_json(&book)
        }
        BooksCommand::Upload(args) => upload(library, args).await,
    }
}

fn search_filters(args: SearchArgs) -> SearchFilters {
    SearchFilters {
        query: args.query,
        category: args.category,
        year_from: args.year_from,
        year_to: args.year_to,
        language: args.language,
        sort_by: args.sort_by,
        sort_order: args.sort_order,
    }
}

async fn upload(library: &Library, args: UploadArgs) -> anyhow::Result<()> {
    let pdf = read_file(&args.pdf).await?;
    let cover = match &args.cover {
        Some(path) => Some(read_file(path).await?),
        None => None,
    };
    let draft = NewBook {
        title: args.title,
        author: args.author,
        description: args.description,
        category: args.category,
        cover_url: None,
        pdf_url: None,
        year: args.year.unwrap_or_else(|| chrono::Utc::now().year()),
        pages: args.pages,
        language: args.language,
        is_featured: false,
    };
    let book = into_data(
        library.upload_book(draft, cover.as_ref(), Some(&pdf)).await,
        "upload book",
    )?;
    print_json(&book)
}

async fn quote(library: &Library, args: QuoteArgs) -> anyhow::Result<()> {
    if let Some(book_id) = args.book {
        let quotes = into_data(
            library.get_quotes_by_book(book_id.trim()).await,
            "fetch quotes",
        )?;
        return print_json(&quotes);
    }
    let resp = if args.daily {
        library.get_daily_quote().await
    } else {
        library.get_random_quote().await
    };
    let quote = into_data(resp, "fetch quote")?;
    println!("\"{}\" - {}", quote.text, quote.source);
    Ok(())
}

async fn read_file(path: &Path) -> anyhow::Result<FileUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_owned());
    Ok(FileUpload {
        name,
        content_type: content_type_for(path).to_owned(),
        bytes,
    })
}

/// Best guess from the extension; validation only trusts the result.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

fn into_data<T>(resp: ApiResponse<T>, what: &str) -> anyhow::Result<T> {
    match resp.data {
        Some(data) if resp.success => Ok(data),
        _ => anyhow::bail!(
            "{what}: {}",
            resp.error.as_deref().unwrap_or("no data returned")
        ),
    }
}

fn into_listing<T>(listing: Paginated<T>, what: &str) -> anyhow::Result<Paginated<T>> {
    if let Some(error) = &listing.error {
        anyhow::bail!("{what}: {error}");
    }
    Ok(listing)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{out}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type_for(Path::new("a/Book.PDF")), "application/pdf");
        assert_eq!(content_type_for(Path::new("cover.jpeg")), "image/jpeg");
        assert_eq!(
            content_type_for(Path::new("book.docx")),
            "application/octet-stream"
        );
        assert_eq!(content_type_for(Path::new("README")), "application/octet-stream");
    }

    #[test]
    fn failed_envelope_becomes_an_error() {
        let err = into_data(ApiResponse::<u32>::fail("Book not found"), "fetch book")
            .unwrap_err()
            .to_string();
        assert_eq!(err, "fetch book: Book not found");
        assert_eq!(into_data(ApiResponse::ok(7), "x").unwrap(), 7);
    }
}
