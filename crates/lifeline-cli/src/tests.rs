use clap::Parser;

use super::*;

#[test]
fn parses_migrate_command() {
    let cli = Cli::try_parse_from(["lifeline-cli", "migrate"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Migrate));
}

#[test]
fn parses_seed_without_file() {
    let cli = Cli::try_parse_from(["lifeline-cli", "seed"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Seed { file: None }));
}

#[test]
fn parses_seed_with_file() {
    let cli = Cli::try_parse_from(["lifeline-cli", "seed", "--file", "/tmp/hospitals.yaml"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Seed { file: Some(ref p) } if p.to_str() == Some("/tmp/hospitals.yaml")
    ));
}

#[test]
fn parses_drill_with_defaults() {
    let cli = Cli::try_parse_from(["lifeline-cli", "drill", "--lat", "18.52", "--lng", "73.85"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Drill {
            ref category,
            note: None,
            ..
        } if category == "medical"
    ));
}

#[test]
fn parses_drill_with_category_and_note() {
    let cli = Cli::try_parse_from([
        "lifeline-cli",
        "drill",
        "--lat",
        "18.52",
        "--lng",
        "73.85",
        "--category",
        "safety",
        "--note",
        "evacuation drill",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Drill {
            ref category,
            note: Some(ref n),
            ..
        } if category == "safety" && n == "evacuation drill"
    ));
}

#[test]
fn drill_requires_coordinates() {
    let result = Cli::try_parse_from(["lifeline-cli", "drill", "--lat", "18.52"]);
    assert!(result.is_err(), "missing --lng must be rejected");
}

#[test]
fn parses_expire_command() {
    let cli = Cli::try_parse_from(["lifeline-cli", "expire"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Expire));
}
