use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, error::ErrorKind};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;

use crate::config::TriageConfig;
use crate::constants::modifiers::TOP_RELEVANT_KEYWORDS;
use crate::data::{Category, KeywordRecord, KeywordRow};
use crate::errors::TriageError;
use crate::metrics::category_breakdown;
use crate::modifiers::{apply_competitor_categories, categorize_irrelevant, top_relevant_keywords};
use crate::resolver::{resolve, retain_exportable};
use crate::roots::{
    RootClusterer, assign_roots, rank_roots, relevant_subset, root_statistics, top_roots,
};
use crate::selector::KeywordSelector;
use crate::types::{CompetitorTitle, LogMessage};
use crate::utils::format_with_commas;
use crate::variants::VariantDetector;
use crate::verification::{
    InMemoryScraper, ProductListing, TitleOverlapClassifier, TitleScraper, VerificationPipeline,
    apply_results, select_for_verification,
};

#[derive(Debug, Parser)]
#[command(
    name = "keyword_report",
    disable_help_subcommand = true,
    about = "Resolve, verify, and cluster a keyword research export",
    long_about = "Merge keyword rows from one or more sources, optionally verify doubtful keywords against competitor titles, then report root clusters and variant groups.",
    after_help = "Verification runs only when --titles is given. Set RUST_LOG=debug for per-keyword events."
)]
/// CLI for `keyword_report`.
///
/// Common usage:
/// - Report only: `--input rows.json`
/// - Verify with a competitor title table: `--titles titles.json --product-title "..." --bullet "..."`
/// - Persist the exportable set: `--output resolved.json`
/// - Compare a keyword in use: `--alternatives-for "freeze dried fruit"`
struct KeywordReportCli {
    #[arg(
        long,
        value_name = "PATH",
        help = "JSON array of keyword rows (phrase, search_volume, category)"
    )]
    input: PathBuf,
    #[arg(long, value_name = "PATH", help = "Optional JSON config overrides")]
    config: Option<PathBuf>,
    #[arg(
        long,
        value_name = "PATH",
        help = "JSON object mapping keyword to competitor titles; enables verification"
    )]
    titles: Option<PathBuf>,
    #[arg(
        long = "product-title",
        default_value = "",
        help = "Title of our product listing"
    )]
    product_title: String,
    #[arg(
        long = "bullet",
        value_name = "TEXT",
        help = "Bullet point of our product listing, repeat as needed"
    )]
    bullets: Vec<String>,
    #[arg(
        long,
        value_name = "PATH",
        help = "Write exportable records as JSON to this path"
    )]
    output: Option<PathBuf>,
    #[arg(
        long = "top-roots",
        default_value_t = 10,
        value_parser = parse_positive_usize,
        help = "Number of ranked roots to print"
    )]
    top_roots: usize,
    #[arg(
        long = "include-design-specific",
        help = "Offer design-specific roots to the title and bullets"
    )]
    include_design_specific: bool,
    #[arg(
        long = "alternatives-for",
        value_name = "KEYWORD",
        help = "Print same-root keywords with more volume than KEYWORD, repeat as needed"
    )]
    alternatives_for: Vec<String>,
}

/// Run the keyword report over `args_iter` (program name excluded).
pub fn run_keyword_report<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) = parse_cli::<KeywordReportCli, _>(
        std::iter::once("keyword_report".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let config = match &cli.config {
        Some(path) => read_json::<TriageConfig>(path)?,
        None => TriageConfig::default(),
    };
    config.validate()?;

    let rows: Vec<KeywordRow> = read_json(&cli.input)?;
    let row_count = rows.len();
    let mut records = resolve(rows.into_iter().map(KeywordRecord::from_row).collect());
    println!(
        "Loaded {} rows from {} ({} unique keywords)",
        row_count,
        cli.input.display(),
        records.len()
    );

    if let Some(titles_path) = &cli.titles {
        let table: IndexMap<String, Vec<CompetitorTitle>> = read_json(titles_path)?;
        let scraper: InMemoryScraper = table.into_iter().collect();
        let product = ProductListing::new(cli.product_title.clone(), cli.bullets.clone());
        verify_records(&mut records, scraper, &product, &config)?;
    }

    let clusterer = RootClusterer::new(&config.clustering);
    let groups = clusterer.cluster(&records);
    assign_roots(&mut records, &groups);
    let ranked = rank_roots(root_statistics(&groups, &records));

    let on_target = relevant_subset(&records);
    let variant_groups = VariantDetector::new(&config.variants).detect_variants(&on_target);

    println!();
    println!("[CATEGORIES]");
    match category_breakdown(&records) {
        Some(breakdown) => {
            for entry in &breakdown.per_category {
                println!(
                    "  {:<20} {:>5} ({:>5.1}%)  volume {}",
                    entry.category.as_str(),
                    entry.count,
                    entry.share * 100.0,
                    format_with_commas(entry.search_volume)
                );
            }
        }
        None => println!("  no keywords"),
    }

    println!();
    println!("[TOP ROOTS]");
    for entry in top_roots(&ranked, cli.top_roots, true) {
        println!(
            "  #{:<3} {:<30} keywords {:>4}  volume {}{}",
            entry.rank,
            entry.stats.root,
            entry.stats.keyword_count,
            format_with_commas(entry.stats.total_search_volume),
            if entry.stats.is_design_specific {
                "  [design]"
            } else {
                ""
            }
        );
    }

    println!();
    println!("[VARIANT GROUPS]");
    let merged: Vec<_> = variant_groups
        .iter()
        .filter(|group| group.members.len() > 1)
        .collect();
    if merged.is_empty() {
        println!("  no variants found");
    }
    for group in merged {
        let members: Vec<&str> = group
            .members
            .iter()
            .map(|idx| on_target[*idx].phrase.as_str())
            .collect();
        println!(
            "  {} => {} (keep '{}')",
            group.normalized_key,
            members.join(" | "),
            on_target[group.representative].phrase
        );
    }

    let selector = KeywordSelector::new(&config.selection, &config.variants)
        .with_variant_groups(&variant_groups, &on_target);
    let target_groups = clusterer.cluster(&on_target);
    let target_ranked = rank_roots(root_statistics(&target_groups, &on_target));
    let representatives =
        selector.select_root_representatives(&target_ranked, &target_groups, &on_target);
    let selection = selector.select(representatives, cli.include_design_specific);

    println!();
    println!("[TITLE KEYWORDS]");
    if selection.title.is_empty() {
        println!("  no relevant roots");
    }
    for rep in selection.title.keywords() {
        println!(
            "  {:<40} volume {:>8}  root '{}'",
            rep.keyword,
            format_with_commas(rep.search_volume),
            rep.root
        );
    }

    println!();
    println!("[BULLET KEYWORDS]");
    for bullet in &selection.bullets.assignments {
        let keywords: Vec<&str> = bullet
            .keywords
            .iter()
            .map(|rep| rep.keyword.as_str())
            .collect();
        println!("  bullet {}: {}", bullet.bullet_number, keywords.join(", "));
    }

    if !cli.alternatives_for.is_empty() {
        println!();
        println!("[ALTERNATIVES]");
        for current in &cli.alternatives_for {
            let alternatives = selector.find_better_alternatives(current, &records);
            if alternatives.is_empty() {
                println!("  {current}: no better same-root keyword");
            }
            for alt in alternatives {
                println!(
                    "  {} -> {} (+{}, {:.1}%)",
                    alt.current_keyword,
                    alt.alternative_keyword,
                    format_with_commas(alt.improvement),
                    alt.improvement_percent
                );
            }
        }
    }

    if let Some(output) = &cli.output {
        let mut exportable = records.clone();
        retain_exportable(&mut exportable, config.export.min_relevance_score);
        write_json(output, &exportable)?;
        println!();
        println!(
            "Wrote {} exportable keywords to {}",
            exportable.len(),
            output.display()
        );
    }

    Ok(())
}

/// Modifier categorization followed by competitor-title verification.
fn verify_records<S: TitleScraper>(
    records: &mut [KeywordRecord],
    scraper: S,
    product: &ProductListing,
    config: &TriageConfig,
) -> Result<(), TriageError> {
    let top_relevant = top_relevant_keywords(records, TOP_RELEVANT_KEYWORDS);
    if !top_relevant.is_empty() {
        let mut competitor_titles: Vec<CompetitorTitle> = Vec::new();
        for keyword in &top_relevant {
            competitor_titles.extend(scraper.fetch_titles(keyword)?);
        }
        let irrelevant: Vec<String> = records
            .iter()
            .filter(|record| record.category == Category::Irrelevant)
            .map(|record| record.phrase.clone())
            .collect();
        let categories = categorize_irrelevant(&irrelevant, &top_relevant, &competitor_titles);
        let promoted = apply_competitor_categories(records, &categories);
        println!("Promoted {promoted} keywords to competitor_relevant");
    }

    let candidates =
        select_for_verification(records, &config.verification.candidate_categories);
    let pipeline = VerificationPipeline::from_config(
        scraper,
        TitleOverlapClassifier::default(),
        &config.verification,
    )?;
    let report = |percent: u8, message: &str| {
        let line: LogMessage = format!("[{percent:>3}%] {message}");
        println!("{line}");
    };
    let results = pipeline.verify(&candidates, product, &report);
    let relevant = apply_results(records, &results);
    let stats = pipeline.stats();
    println!(
        "Verified {} keywords: {} relevant, {} without titles, {} classifier failures",
        results.len(),
        relevant,
        stats.no_titles + stats.scrape_failures,
        stats.classifier_failures
    );
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, TriageError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn write_json(path: &Path, records: &[KeywordRecord]) -> Result<(), TriageError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush()?;
    Ok(())
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("could not parse '{raw}' as a positive integer"))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
