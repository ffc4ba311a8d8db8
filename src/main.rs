use clap::Parser;
use pagewright::{config, output, pipeline};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pagewright")]
#[command(about = "Build tool for a hand-edited static marketing site")]
#[command(long_about = "\
Build tool for a hand-edited static marketing site

Renders Markdown posts, regenerates the blog index, resolves image
placeholders, and pins every page's header, footer, and partners strip to
its canonical form.

Site structure:

  site/
  ├── pagewright.toml          # Optional overrides (see --print-config)
  ├── index.html               # Home page
  ├── about.html               # Other root pages
  ├── blog.html                # Blog index with BLOG_POSTS markers
  ├── blog/
  │   ├── template.html        # Post template
  │   ├── archive.html         # Nested pages
  │   └── posts/*.md           # Post sources → site/*.html
  ├── fragments/               # header-{root,home,blog}.html, footer-{root,blog}.html
  └── imgs/                    # Images for placeholders and partner logos

Placeholders:
  <div class=\"image-placeholder\">team-photo</div>
    → <div class=\"image-placeholder\"><img src=\"imgs/team-photo.jpg\" alt=\"team-photo\"></div>")]
#[command(version)]
struct Cli {
    /// Site root directory
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Report every change without writing any file
    #[arg(long)]
    dry_run: bool,

    /// Only resolve image placeholders; leave headers, footers, and partners alone
    #[arg(long)]
    skip_common: bool,

    /// Log per-file progress to stderr
    #[arg(long, short)]
    verbose: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// Print a stock pagewright.toml with all options documented, then exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    init_tracing(cli.verbose);

    let site_config = config::load_config(&cli.root)?;
    let options = pipeline::Options {
        root: cli.root.clone(),
        dry_run: cli.dry_run,
        skip_common: cli.skip_common,
        build_date: chrono::Local::now().date_naive(),
    };
    let report = pipeline::run(&site_config, &options)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_report(&report);
    }

    Ok(())
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the level chosen here.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
