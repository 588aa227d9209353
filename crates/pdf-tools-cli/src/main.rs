use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use pdf_compose::{
    AuthoringSession, ComposeOptions, ElementPatch, ImpositionSession, InputFile, OutputFile,
    PrintConfirmation, SessionObserver,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod logger;

use logger::StderrLogger;

#[derive(Parser)]
#[command(name = "pdfc", about = "Print composition and N-up imposition", version)]
struct Cli {
    /// JSON options file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-paginate a PDF with several pages per sheet
    Impose {
        /// Input PDF file
        #[arg(short, long)]
        input: PathBuf,

        /// Output PDF file (default: edited_<input name> in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pages to include, e.g. "1, 3, 5-10"
        #[arg(short, long)]
        pages: Option<String>,

        /// Pages per sheet
        #[arg(long, default_value = "1", value_enum)]
        per_sheet: PerSheetArg,

        /// Output orientation
        #[arg(long, default_value = "portrait", value_enum)]
        orientation: OrientationArg,

        /// Number of copies reported to the print pipeline
        #[arg(long, default_value = "1")]
        copies: u32,

        /// Show statistics only, don't generate PDF
        #[arg(long)]
        stats_only: bool,
    },

    /// Lay images out on pages and export them as a PDF
    Compose {
        /// Image files, placed in order
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Output PDF file (default: print_<timestamp>.pdf in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Images per page before a new page is started
        #[arg(long, default_value = "1")]
        per_page: usize,

        /// Page orientation
        #[arg(long, default_value = "portrait", value_enum)]
        orientation: OrientationArg,

        /// Brightness factor applied to every image
        #[arg(long)]
        brightness: Option<f32>,

        /// Contrast factor applied to every image
        #[arg(long)]
        contrast: Option<f32>,

        /// Convert every image to grayscale
        #[arg(long)]
        grayscale: bool,
    },

    /// Show the grid used for a number of pages per sheet
    Grid {
        #[arg(value_enum)]
        per_sheet: PerSheetArg,

        #[arg(long, default_value = "portrait", value_enum)]
        orientation: OrientationArg,
    },

    /// Parse a page range against a page count
    Ranges {
        /// Range text, e.g. "1, 3, 5-10"
        range: String,

        /// Number of pages in the document
        #[arg(long)]
        pages: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OrientationArg {
    Portrait,
    Landscape,
}

#[derive(Clone, Copy, ValueEnum)]
enum PerSheetArg {
    #[value(name = "1")]
    One,
    #[value(name = "2")]
    Two,
    #[value(name = "4")]
    Four,
    #[value(name = "6")]
    Six,
    #[value(name = "9")]
    Nine,
    #[value(name = "16")]
    Sixteen,
}

impl From<OrientationArg> for pdf_compose::Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Portrait => Self::Portrait,
            OrientationArg::Landscape => Self::Landscape,
        }
    }
}

impl From<PerSheetArg> for usize {
    fn from(arg: PerSheetArg) -> Self {
        match arg {
            PerSheetArg::One => 1,
            PerSheetArg::Two => 2,
            PerSheetArg::Four => 4,
            PerSheetArg::Six => 6,
            PerSheetArg::Nine => 9,
            PerSheetArg::Sixteen => 16,
        }
    }
}

/// Reports confirmed exports to stdout
struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn on_confirm(&self, confirmation: PrintConfirmation) {
        println!(
            "Ready to print: {} ({} pages, {} copies, {})",
            confirmation.file.name, confirmation.pages, confirmation.copies, confirmation.layout
        );
    }

    fn on_close(&self) {
        log::debug!("Session closed");
    }
}

async fn load_options(path: Option<&Path>) -> Result<ComposeOptions> {
    match path {
        Some(path) => ComposeOptions::load(path)
            .await
            .with_context(|| format!("Failed to load options from {}", path.display())),
        None => Ok(ComposeOptions::default()),
    }
}

async fn write_output(file: &OutputFile, output: Option<PathBuf>) -> Result<PathBuf> {
    match output {
        Some(path) => {
            tokio::fs::write(&path, &file.bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(path)
        }
        None => Ok(file.write_to(".").await?),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    StderrLogger::new(StderrLogger::level_for(cli.verbose, cli.quiet)).init()?;
    let options = load_options(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Impose {
            input,
            output,
            pages,
            per_sheet,
            orientation,
            copies,
            stats_only,
        } => {
            let file = InputFile::read(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let mut session = ImpositionSession::open(file, options, Arc::new(ConsoleObserver)).await?;

            if let Some(pages) = pages {
                session.set_range_input(pages);
                session.apply_range();
            }
            session.set_pages_per_sheet(per_sheet.into());
            session.set_orientation(orientation.into());
            session.print_settings_mut().set_copies(copies);

            let stats = session.statistics();
            println!("Imposition Statistics:");
            println!("  Source pages: {}", stats.source_pages);
            println!("  Selected pages: {}", stats.selected_pages);
            println!("  Pages per sheet: {}", stats.pages_per_sheet);
            println!("  Output sheets: {}", stats.output_sheets);
            println!("  Pages on last sheet: {}", stats.pages_on_last_sheet);
            println!("  Empty cells: {}", stats.empty_cells);

            if stats_only {
                session.close();
                return Ok(());
            }
            if stats.selected_pages == 0 {
                bail!("No pages selected");
            }

            let exported = session.export().await?;
            let path = write_output(&exported, output).await?;
            session.close();
            println!("Imposed → {}", path.display());
        }

        Commands::Compose {
            input,
            output,
            per_page,
            orientation,
            brightness,
            contrast,
            grayscale,
        } => {
            let per_page = per_page.max(1);
            let mut session =
                AuthoringSession::new(options, orientation.into(), Arc::new(ConsoleObserver))?;
            let patch = ElementPatch {
                brightness,
                contrast,
                grayscale: grayscale.then_some(true),
                ..Default::default()
            };

            let mut on_page = 0;
            let mut placed = 0;
            for path in &input {
                if on_page == per_page {
                    let page = session.add_page();
                    session.set_current_page(page)?;
                    on_page = 0;
                }

                let file = InputFile::read(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                match session.add_image(file).await {
                    Ok(_) => {
                        session.update_selected(patch)?;
                        session.deselect();
                        on_page += 1;
                        placed += 1;
                    }
                    Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
                }
            }

            if placed == 0 {
                bail!("None of the images could be decoded");
            }

            let exported = session.export().await?;
            let path = write_output(&exported, output).await?;
            let pages = session.model().page_count();
            session.close();
            println!("Composed {} images on {} pages → {}", placed, pages, path.display());
        }

        Commands::Grid {
            per_sheet,
            orientation,
        } => {
            let grid = pdf_compose::layout::create_grid_layout(per_sheet.into(), orientation.into());
            println!(
                "{} columns × {} rows on a {} × {} pt sheet",
                grid.cols, grid.rows, grid.sheet.width_pt, grid.sheet.height_pt
            );
            println!(
                "Cell: {:.1} × {:.1} pt",
                grid.cell_width_pt, grid.cell_height_pt
            );
        }

        Commands::Ranges { range, pages } => {
            let parsed = pdf_compose::parse_page_range(&range, pages);
            if parsed.is_empty() {
                println!("No pages");
            } else {
                println!("{}", pdf_compose::format_page_ranges(&parsed));
                println!("{} pages", parsed.len());
            }
        }
    }

    Ok(())
}
