//! Command-line tests
//!
//! Commands run in-process against feeds and stores in a temp directory;
//! output goes to a byte buffer.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

use reeldb::cli::{self, Cli, CliError, Command};

const BASICS: &str = "tconst\ttitleType\tprimaryTitle\toriginalTitle\tisAdult\tstartYear\tendYear\truntimeMinutes\tgenres
tt0000001\tmovie\tThe Matrix\tThe Matrix\t0\t1999\t\\N\t136\tAction,Sci-Fi
tt0000002\ttvSeries\tThe Wire\tThe Wire\t0\t2002\t2008\t59\tCrime,Drama
tt0000003\tshort\tTheory\tTheory\t0\t2010\t\\N\t12\tDrama
tt0000004\tmovie\tUnrated\tUnrated\t0\t2015\t\\N\t90\tDrama
";

const RATINGS: &str = "tconst\taverageRating\tnumVotes
tt0000001\t8.7\t2000000
tt0000002\t9.3\t350000
tt0000003\t6.1\t120
";

struct Fixture {
    _temp: TempDir,
    basics: PathBuf,
    ratings: PathBuf,
    store: PathBuf,
}

fn write_gz(path: &Path, text: &str) {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    fs::write(path, encoder.finish().unwrap()).unwrap();
}

fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let basics = temp.path().join("title.basics.tsv.gz");
    let ratings = temp.path().join("title.ratings.tsv.gz");
    write_gz(&basics, BASICS);
    write_gz(&ratings, RATINGS);
    let store = temp.path().join("imdb.store");
    Fixture {
        _temp: temp,
        basics,
        ratings,
        store,
    }
}

fn parse(args: &[&str]) -> Command {
    let mut argv = vec!["reeldb"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap().command
}

fn run_load(fx: &Fixture, extra: &[&str]) -> Result<String, CliError> {
    let store = fx.store.to_str().unwrap();
    let basics = fx.basics.to_str().unwrap();
    let ratings = fx.ratings.to_str().unwrap();
    let mut args = vec!["load", "--store", store, "--basics", basics, "--ratings", ratings];
    args.extend_from_slice(extra);

    let Command::Load(load) = parse(&args) else {
        panic!("expected load command");
    };
    let mut out = Vec::new();
    cli::load(&load, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

fn run_find(fx: &Fixture, extra: &[&str]) -> Result<(usize, String), CliError> {
    let store = fx.store.to_str().unwrap();
    let mut args = vec!["find", "--store", store];
    args.extend_from_slice(extra);

    let Command::Find(find) = parse(&args) else {
        panic!("expected find command");
    };
    let mut out = Vec::new();
    let total = cli::find(&find, &mut out)?;
    Ok((total, String::from_utf8(out).unwrap()))
}

fn json_ids(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .filter_map(|v| v.get("id").and_then(|id| id.as_str()).map(str::to_string))
        .collect()
}

// =============================================================================
// load
// =============================================================================

#[test]
fn test_load_prints_summary() {
    let fx = fixture();
    let output = run_load(&fx, &["--batch-size", "2"]).unwrap();

    let summary: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(summary["titles"]["rows_loaded"], 4);
    assert_eq!(summary["titles"]["batches_committed"], 2);
    assert_eq!(summary["ratings"]["rows_loaded"], 3);
    assert_eq!(summary["joined_rows"], 3);
}

#[test]
fn test_load_refuses_existing_store() {
    let fx = fixture();
    run_load(&fx, &[]).unwrap();

    let err = run_load(&fx, &[]).unwrap_err();
    assert_eq!(err.code(), "REEL_STORE_EXISTS");

    run_load(&fx, &["--recreate"]).unwrap();
}

#[test]
fn test_missing_feed_creates_nothing() {
    let mut fx = fixture();
    fx.ratings = fx.ratings.with_file_name("absent.tsv.gz");

    let err = run_load(&fx, &[]).unwrap_err();
    assert_eq!(err.code(), "REEL_SOURCE_UNAVAILABLE");
    assert!(!fx.store.exists());
}

#[test]
fn test_non_gzip_feed_creates_nothing() {
    let fx = fixture();
    fs::write(&fx.ratings, RATINGS).unwrap();

    let err = run_load(&fx, &[]).unwrap_err();
    assert_eq!(err.code(), "REEL_SOURCE_UNAVAILABLE");
    assert!(!fx.store.exists());
}

#[test]
fn test_non_gzip_feed_keeps_existing_store() {
    let fx = fixture();
    run_load(&fx, &[]).unwrap();
    fs::write(&fx.ratings, RATINGS).unwrap();

    let err = run_load(&fx, &["--recreate"]).unwrap_err();
    assert_eq!(err.code(), "REEL_SOURCE_UNAVAILABLE");

    let (total, _) = run_find(&fx, &["--format", "json"]).unwrap();
    assert_eq!(total, 3);
}

#[test]
fn test_aborted_load_refuses_find() {
    let fx = fixture();
    let ratings = "tconst\taverageRating\tnumVotes\ntt0000001\t8.7\t2000000\ntt0000002\tbad\t1\n";
    write_gz(&fx.ratings, ratings);

    let err = run_load(&fx, &["--batch-size", "1"]).unwrap_err();
    assert_eq!(err.code(), "REEL_MALFORMED_RECORD");
    assert!(fx.store.exists());

    // every title and the first rating were committed before the bad line
    let err = run_find(&fx, &[]).unwrap_err();
    assert_eq!(err.code(), "REEL_STORE_STATE");
    assert!(err.to_string().contains("--recreate"));

    write_gz(&fx.ratings, RATINGS);
    run_load(&fx, &["--recreate"]).unwrap();
    assert_eq!(run_find(&fx, &[]).unwrap().0, 3);
}

#[test]
fn test_oversized_batch_rejected() {
    let fx = fixture();
    let err = run_load(&fx, &["--batch-size", "1000001"]).unwrap_err();
    assert_eq!(err.code(), "REEL_CLI_CONFIG");
    assert!(!fx.store.exists());
}

#[test]
fn test_config_file_supplies_paths() {
    let fx = fixture();
    let config_path = fx.store.with_file_name("reeldb.json");
    let config = serde_json::json!({
        "store_dir": fx.store,
        "basics_path": fx.basics,
        "ratings_path": fx.ratings,
        "batch_size": 3,
    });
    fs::write(&config_path, config.to_string()).unwrap();

    let Command::Load(load) = parse(&["load", "--config", config_path.to_str().unwrap()]) else {
        panic!("expected load command");
    };
    let summary = cli::load(&load, &mut Vec::new()).unwrap();
    assert_eq!(summary.store, fx.store);
    assert_eq!(summary.report.titles.batches_committed, 2);
}

// =============================================================================
// find
// =============================================================================

#[test]
fn test_find_table_output() {
    let fx = fixture();
    run_load(&fx, &[]).unwrap();

    let (total, output) = run_find(&fx, &[]).unwrap();
    assert_eq!(total, 3);
    assert!(output.contains("The Matrix"));
    assert!(output.contains("2,000,000"));
    assert!(output.contains("https://www.imdb.com/title/tt0000001/"));
    assert!(!output.contains("Unrated"));
    assert!(output.trim_end().ends_with("Total results found: 3"));
}

#[test]
fn test_find_json_filters_and_order() {
    let fx = fixture();
    run_load(&fx, &[]).unwrap();

    let (total, output) = run_find(&fx, &["-n", "the", "--format", "json"]).unwrap();
    assert_eq!(total, 3);
    assert_eq!(json_ids(&output), vec!["tt0000003", "tt0000002", "tt0000001"]);
    assert!(output.trim_end().ends_with("{\"total\":3}"));

    let (_, output) = run_find(&fx, &["-t", "tv", "movie", "--format", "json"]).unwrap();
    assert_eq!(json_ids(&output), vec!["tt0000002", "tt0000001"]);

    let args = ["--order-by", "rating", "--reverse", "-l", "1", "--format", "json"];
    let (total, output) = run_find(&fx, &args).unwrap();
    assert_eq!(total, 1);
    assert_eq!(json_ids(&output), vec!["tt0000002"]);
}

#[test]
fn test_find_thresholds() {
    let fx = fixture();
    run_load(&fx, &[]).unwrap();

    let (_, output) = run_find(&fx, &["-y", "2000", "-r", "9.3", "--format", "json"]).unwrap();
    assert_eq!(json_ids(&output), vec!["tt0000002"]);

    let (total, _) = run_find(&fx, &["--num-ratings", "350000", "--format", "json"]).unwrap();
    assert_eq!(total, 1);
}

#[test]
fn test_find_rejects_out_of_range_rating() {
    let fx = fixture();
    run_load(&fx, &[]).unwrap();

    let err = run_find(&fx, &["-r", "11"]).unwrap_err();
    assert_eq!(err.code(), "REEL_INVALID_QUERY_PARAMETER");
}

#[test]
fn test_find_without_store() {
    let fx = fixture();
    let err = run_find(&fx, &[]).unwrap_err();
    assert_eq!(err.code(), "REEL_STORE_STATE");
}

#[test]
fn test_unknown_type_rejected_by_parser() {
    assert!(Cli::try_parse_from(["reeldb", "find", "-t", "documentary"]).is_err());
}
